//! Shared fixtures: in-memory peers and an executor-driven router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use relaymesh_core::protocol::{decode_package, Frame, FrameKind};
use relaymesh_server::dispatch::{Context, Dispatcher};
use relaymesh_server::exec::{self, Executor};
use relaymesh_server::router::{self, RouterState};
use relaymesh_server::session::SessionRegistry;
use relaymesh_server::transport::Connection;

/// A connection with no socket behind it; frames land in `rx`.
pub struct Peer {
    pub ctx: Context,
    pub rx: mpsc::Receiver<Frame>,
}

impl Peer {
    pub fn new(addr: &str) -> Self {
        let (conn, rx) = Connection::new(addr, 256);
        Self { ctx: Context::new(conn), rx }
    }

    pub fn conn(&self) -> &Connection {
        self.ctx.conn()
    }

    /// Every queued envelope as `(Id, Body)`.
    pub fn drain(&mut self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            assert_eq!(frame.kind, FrameKind::Raw);
            let pkg = decode_package(&frame.payload).unwrap();
            let body = match &pkg.body {
                Some(raw) => serde_json::from_str(raw.get()).unwrap(),
                None => Value::Null,
            };
            out.push((pkg.id, body));
        }
        out
    }

    /// Bodies of queued envelopes with the given id.
    pub fn take(&mut self, id: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|(i, _)| i == id)
            .map(|(_, b)| b)
            .collect()
    }
}

pub struct RouterHarness {
    pub dispatcher: Dispatcher<RouterState>,
    pub executor: Executor<RouterState>,
    pub state: RouterState,
}

impl RouterHarness {
    pub fn new() -> Self {
        let (queue, executor) = exec::channel();
        let dispatcher = Dispatcher::new(queue, Arc::new(SessionRegistry::new()));
        router::register_commands(dispatcher.commands());
        Self {
            dispatcher,
            executor,
            state: RouterState::new("login"),
        }
    }

    /// Dispatch one message from `peer` and run the executor.
    pub fn send(&mut self, peer: &Peer, id: &str, body: Value) {
        let payload = serde_json::to_vec(&body).unwrap();
        self.dispatcher.handle(&peer.ctx, id, &payload).unwrap();
        self.executor.run_once(&mut self.state);
    }

    pub fn register(&mut self, peer: &Peer, name: &str, addr: &str, kind: &str) {
        self.send(
            peer,
            "C2S_Register",
            serde_json::json!({"ServerName": name, "ServerAddr": addr, "ServerType": kind}),
        );
    }
}

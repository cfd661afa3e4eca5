//! Gateway-side helpers.
//!
//! A gateway terminates client connections, forwards their routed messages
//! through the router, relays cluster broadcasts to its clients, and
//! periodically reports its session count so the router can steer new
//! clients to the least-loaded gateway.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use bytes::Bytes;
use relaymesh_core::protocol::Package;

use crate::dispatch::{builtin, CommandRegistry};
use crate::message::{Concurrent, C2S_CONCURRENT, FUNC_BROADCAST};
use crate::session::SessionRegistry;
use crate::transport::Connection;

/// Load report cadence.
pub const LOAD_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Commands a gateway process needs from the router.
pub fn register_commands<S: 'static>(commands: &CommandRegistry<S>, sessions: &Arc<SessionRegistry>) {
    builtin::register_service_directory(commands);
    builtin::register_close(commands);

    let sessions = Arc::clone(sessions);
    commands.register(FUNC_BROADCAST, move |_: &mut S, _, pkg: Package| {
        broadcast_to_clients(&sessions, &pkg);
    });
}

/// Relay `pkg` as-is to every client with a session on this gateway.
fn broadcast_to_clients(sessions: &SessionRegistry, pkg: &Package) {
    let buf = match serde_json::to_vec(pkg) {
        Ok(buf) => Bytes::from(buf),
        Err(e) => {
            tracing::warn!(msg_id = %pkg.id, error = %e, "broadcast encode failed");
            return;
        }
    };
    let clients = sessions.clients();
    tracing::debug!(msg_id = %pkg.id, clients = clients.len(), "broadcast");
    for client in clients {
        if let Err(e) = client.send(buf.clone()) {
            tracing::debug!(conn = client.id(), error = %e, "broadcast send failed");
        }
    }
}

/// Send `C2S_Concurrent{Weight}` to the router every `every` until the link closes.
pub fn spawn_load_reporter(
    router: Connection,
    sessions: Arc<SessionRegistry>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + every, every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if router.is_closed() {
                tracing::info!(peer = %router.remote_addr(), "router link closed, load reporter stopping");
                break;
            }
            let weight = sessions.count() as i64;
            if let Err(e) = router.write_json(C2S_CONCURRENT, &Concurrent { weight }) {
                tracing::warn!(error = %e, weight, "load report failed");
            }
        }
    })
}

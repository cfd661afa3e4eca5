//! Shared application state for a relaymesh server process.
//!
//! Holds the pieces every connection task needs: config, dispatcher, session
//! table, and metrics. The business state `S` itself is not here; it is owned
//! by the executor and only reachable through queued jobs.

use std::sync::Arc;

use crate::config::NodeConfig;
use crate::dispatch::Dispatcher;
use crate::exec::ExecQueue;
use crate::obs::ServerMetrics;
use crate::session::SessionRegistry;
use crate::transport::Keepalive;

pub struct AppState<S> {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

struct AppStateInner {
    cfg: NodeConfig,
    sessions: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl<S: 'static> AppState<S> {
    pub fn new(cfg: NodeConfig, queue: ExecQueue<S>) -> Self {
        Self::with_metrics(cfg, queue, Arc::new(ServerMetrics::default()))
    }

    pub fn with_metrics(cfg: NodeConfig, queue: ExecQueue<S>, metrics: Arc<ServerMetrics>) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(queue, Arc::clone(&sessions));
        Self {
            inner: Arc::new(AppStateInner { cfg, sessions, metrics }),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn cfg(&self) -> &NodeConfig {
        &self.inner.cfg
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher<S>> {
        Arc::clone(&self.dispatcher)
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.inner.sessions
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive::from_write_wait(self.inner.cfg.transport.write_wait())
    }

    pub fn send_queue_capacity(&self) -> usize {
        self.inner.cfg.transport.send_queue_capacity
    }
}

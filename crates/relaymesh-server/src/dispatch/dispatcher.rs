use std::sync::Arc;

use relaymesh_core::error::{RelayError, Result};
use relaymesh_core::protocol::{is_plain_identifier, split_message_id};

use crate::dispatch::{CommandRegistry, Context};
use crate::exec::ExecQueue;
use crate::session::SessionRegistry;

const EMPTY_BODY: &[u8] = b"{}";

/// Resolves inbound messages to a local job or a forward.
///
/// Never runs a handler itself: local commands are decoded on the calling
/// (I/O) task and queued for the executor.
pub struct Dispatcher<S> {
    commands: CommandRegistry<S>,
    sessions: Arc<SessionRegistry>,
    queue: ExecQueue<S>,
}

impl<S: 'static> Dispatcher<S> {
    pub fn new(queue: ExecQueue<S>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            commands: CommandRegistry::new(),
            sessions,
            queue,
        }
    }

    pub fn commands(&self) -> &CommandRegistry<S> {
        &self.commands
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn handle(&self, ctx: &Context, msg_id: &str, payload: &[u8]) -> Result<()> {
        let payload = if payload.is_empty() { EMPTY_BODY } else { payload };

        let (service, name) = split_message_id(msg_id);
        // gateway clients may only name plain commands, never FUNC_/C2S_ ids
        if ctx.is_gateway() && !is_plain_identifier(name) {
            return Err(RelayError::InvalidIdentifier(msg_id.to_string()));
        }
        if !service.is_empty() {
            return self.forward(ctx, service, name, payload);
        }

        self.enqueue_local(ctx, name, payload)
    }

    /// Queue a signal raised by this process itself (e.g. `FUNC_Close` on
    /// disconnect). Skips the checks applied to peer-sent ids.
    pub fn raise(&self, ctx: &Context, msg_id: &str) -> Result<()> {
        self.enqueue_local(ctx, msg_id, EMPTY_BODY)
    }

    fn enqueue_local(&self, ctx: &Context, name: &str, payload: &[u8]) -> Result<()> {
        let job = self
            .commands
            .bind(name, ctx.clone(), payload)
            .ok_or_else(|| RelayError::UnknownMessage(name.to_string()))??;
        self.queue.enqueue(job)
    }

    fn forward(&self, ctx: &Context, service: &str, name: &str, payload: &[u8]) -> Result<()> {
        if ctx.is_gateway() && !self.commands.services().is_active(service) {
            return Err(RelayError::InvalidRoute(service.to_string()));
        }

        let Some(session) = ctx.ssid().and_then(|id| self.sessions.get(id)) else {
            tracing::debug!(service, name, "routed message without session, dropped");
            return Ok(());
        };
        session.route(service, name, payload)
    }
}

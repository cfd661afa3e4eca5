//! Session table: session id -> owning connection.
//!
//! A session is a client's logical identity on a gateway. Routed messages
//! arriving on a session are handed to its owner (the router link), which
//! fans them out to the named service. The client connection itself is kept
//! so cluster broadcasts can reach it.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::value::RawValue;

use relaymesh_core::error::{RelayError, Result};

use crate::message::{ForwardArgs, C2S_ROUTE};
use crate::transport::Connection;

#[derive(Clone, Debug)]
pub struct Session {
    id: Arc<str>,
    owner: Connection,
    client: Option<Connection>,
}

impl Session {
    pub fn new(id: impl Into<Arc<str>>, owner: Connection) -> Self {
        Self {
            id: id.into(),
            owner,
            client: None,
        }
    }

    pub fn with_client(mut self, client: Connection) -> Self {
        self.client = Some(client);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &Connection {
        &self.owner
    }

    pub fn client(&self) -> Option<&Connection> {
        self.client.as_ref()
    }

    /// Forward `payload` unmodified to `service` as message `name`.
    pub fn route(&self, service: &str, name: &str, payload: &[u8]) -> Result<()> {
        let data: Box<RawValue> = serde_json::from_slice(payload)
            .map_err(|e| RelayError::Decode(format!("routed payload is not json: {e}")))?;
        let args = ForwardArgs {
            server_list: vec![service.to_string()],
            name: name.to_string(),
            data: Some(data),
        };
        self.owner.write_json(C2S_ROUTE, &args)
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.id().to_string(), session);
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|r| r.value().clone())
    }

    /// Client connections of every session that has one.
    pub fn clients(&self) -> Vec<Connection> {
        self.sessions
            .iter()
            .filter_map(|r| r.value().client.clone())
            .collect()
    }

    /// Active session count; a gateway reports this as its weight.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

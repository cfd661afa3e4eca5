use std::sync::Arc;

use serde::Serialize;

use relaymesh_core::error::Result;

use crate::transport::Connection;

/// Per-invocation context handed to every handler.
///
/// It is the handler's only way to answer the peer or drop the connection.
#[derive(Clone, Debug)]
pub struct Context {
    conn: Connection,
    ssid: Option<Arc<str>>,
    is_gateway: bool,
}

impl Context {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            ssid: None,
            is_gateway: false,
        }
    }

    /// Context for a client connection terminated by this gateway.
    pub fn gateway(conn: Connection, ssid: impl Into<Arc<str>>) -> Self {
        Self {
            conn,
            ssid: Some(ssid.into()),
            is_gateway: true,
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn ssid(&self) -> Option<&str> {
        self.ssid.as_deref()
    }

    pub fn is_gateway(&self) -> bool {
        self.is_gateway
    }

    pub fn write_json<T>(&self, id: &str, body: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.conn.write_json(id, body)
    }

    pub fn close(&self) {
        self.conn.close();
    }
}

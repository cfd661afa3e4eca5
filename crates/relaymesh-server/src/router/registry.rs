use std::collections::HashMap;

use serde_json::value::RawValue;

use crate::transport::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Generic,
    Center,
    Gateway,
}

impl ServerType {
    /// Unrecognised type strings register as generic servers.
    pub fn parse(s: &str) -> Self {
        match s {
            "center" => ServerType::Center,
            "gateway" => ServerType::Gateway,
            _ => ServerType::Generic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerType::Generic => "generic",
            ServerType::Center => "center",
            ServerType::Gateway => "gateway",
        }
    }
}

/// A registered backend process.
#[derive(Debug, Clone)]
pub struct Server {
    pub name: String,
    /// Advertised `host:port`; empty when the server exposes no service.
    pub addr: String,
    pub data: Option<Box<RawValue>>,
    pub kind: ServerType,
    pub conn: Connection,
    /// Concurrent client load; only meaningful for gateways.
    pub weight: i64,
}

impl Server {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, kind: ServerType, conn: Connection) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            data: None,
            kind,
            conn,
            weight: 0,
        }
    }

    pub fn with_data(mut self, data: Option<Box<RawValue>>) -> Self {
        self.data = data;
        self
    }
}

/// Name-keyed server table plus the ordered gateway list.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, Server>,
    gateways: Vec<String>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by name.
    ///
    /// The type recorded by the first registration of a name is kept. A
    /// re-registration over the same connection keeps the reported weight.
    pub fn add_server(&mut self, mut server: Server) -> &Server {
        if let Some(prev) = self.servers.get(&server.name) {
            server.kind = prev.kind;
            if prev.conn.same_as(&server.conn) {
                server.weight = prev.weight;
            }
        }

        if server.kind == ServerType::Gateway {
            let conn_id = server.conn.id();
            let servers = &self.servers;
            self.gateways.retain(|g| {
                g != &server.name
                    && servers.get(g).map(|s| s.conn.id() != conn_id).unwrap_or(false)
            });
            self.gateways.push(server.name.clone());
        }

        let name = server.name.clone();
        self.servers.insert(name.clone(), server);
        &self.servers[&name]
    }

    pub fn get_server(&self, name: &str) -> Option<&Server> {
        self.servers.get(name)
    }

    /// Advertised address, if the server is known.
    pub fn server_addr(&self, name: &str) -> Option<&str> {
        self.servers.get(name).map(|s| s.addr.as_str())
    }

    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    pub fn gateways(&self) -> impl Iterator<Item = &Server> {
        self.gateways.iter().filter_map(|g| self.servers.get(g))
    }

    /// Every distinct registered name.
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Least-loaded gateway. Ties resolve to whichever comes first in the
    /// gateway list; callers must not rely on that order.
    pub fn best_gateway(&self) -> Option<&Server> {
        self.gateways().min_by_key(|s| s.weight)
    }

    /// Set the weight of every gateway owned by `conn_id`. Returns how many matched.
    pub fn update_weight(&mut self, conn_id: u64, weight: i64) -> usize {
        let mut updated = 0;
        for name in &self.gateways {
            if let Some(s) = self.servers.get_mut(name) {
                if s.conn.id() == conn_id {
                    s.weight = weight;
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Drop every server registered over `conn_id`.
    pub fn remove_by_connection(&mut self, conn_id: u64) -> Vec<Server> {
        let names: Vec<String> = self
            .servers
            .values()
            .filter(|s| s.conn.id() == conn_id)
            .map(|s| s.name.clone())
            .collect();

        self.gateways.retain(|g| !names.contains(g));
        names
            .into_iter()
            .filter_map(|n| self.servers.remove(&n))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn gateway_count(&self) -> usize {
        self.gateways.len()
    }
}

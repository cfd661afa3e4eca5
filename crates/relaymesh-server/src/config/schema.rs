use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use relaymesh_core::error::{RelayError, Result};

use crate::transport::SEND_QUEUE_CAPACITY;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub version: u32,

    /// Listen address by server role (`router`, `login`, ...).
    #[serde(default)]
    pub servers: HashMap<String, ServerEndpoint>,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub router: RouterSection,

    #[serde(default)]
    pub ops: OpsSection,

    #[serde(default)]
    pub log: LogSection,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.servers.is_empty() {
            return Err(RelayError::Config("servers must not be empty".into()));
        }
        for (role, ep) in &self.servers {
            if split_port(&ep.addr).is_none() {
                return Err(RelayError::Config(format!(
                    "servers.{role}.addr must be host:port, got {:?}",
                    ep.addr
                )));
            }
        }

        self.transport.validate()?;
        self.router.validate()?;

        Ok(())
    }

    /// Configured address for `role`.
    pub fn server_addr(&self, role: &str) -> Result<&str> {
        self.servers
            .get(role)
            .map(|ep| ep.addr.as_str())
            .ok_or_else(|| RelayError::Config(format!("no address configured for server role {role:?}")))
    }

    /// Bind address for `role`: the configured port on all interfaces.
    pub fn listen_addr(&self, role: &str) -> Result<String> {
        let addr = self.server_addr(role)?;
        let port = split_port(addr)
            .ok_or_else(|| RelayError::Config(format!("invalid address for {role}: {addr}")))?;
        Ok(format!("0.0.0.0:{port}"))
    }
}

fn split_port(addr: &str) -> Option<u16> {
    let (_, port) = addr.rsplit_once(':')?;
    port.parse().ok()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerEndpoint {
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    #[serde(default = "default_send_queue_capacity")]
    pub send_queue_capacity: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            write_wait_ms: default_write_wait_ms(),
            send_queue_capacity: default_send_queue_capacity(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=60000).contains(&self.write_wait_ms) {
            return Err(RelayError::Config(
                "transport.write_wait_ms must be between 1000 and 60000".into(),
            ));
        }
        if self.send_queue_capacity == 0 {
            return Err(RelayError::Config(
                "transport.send_queue_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }
}

fn default_write_wait_ms() -> u64 {
    10_000
}
fn default_send_queue_capacity() -> usize {
    SEND_QUEUE_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Server that receives best-gateway hints.
    #[serde(default = "default_login_server")]
    pub login_server: String,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            login_server: default_login_server(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl RouterSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10_000).contains(&self.tick_interval_ms) {
            return Err(RelayError::Config(
                "router.tick_interval_ms must be between 1 and 10000".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_login_server() -> String {
    "login".into()
}
fn default_tick_interval_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsSection {
    /// `/healthz` + `/metrics` listener; disabled when absent.
    #[serde(default)]
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".into()
}

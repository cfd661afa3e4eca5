//! Node config loader (strict parsing).

pub mod schema;

use std::fs;

use relaymesh_core::error::{RelayError, Result};

pub use schema::{
    LogSection, NodeConfig, OpsSection, RouterSection, ServerEndpoint, TransportSection,
};

pub fn load_from_file(path: &str) -> Result<NodeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<NodeConfig> {
    let cfg: NodeConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

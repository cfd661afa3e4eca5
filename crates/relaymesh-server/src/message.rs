//! Cluster message catalogue: identifiers and body shapes.
//!
//! Field names follow the wire convention (`PascalCase` keys).

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

pub const C2S_REGISTER: &str = "C2S_Register";
pub const C2S_REGISTER_OK: &str = "C2S_RegisterOk";
pub const C2S_GET_SERVER_ADDR: &str = "C2S_GetServerAddr";
pub const S2C_GET_SERVER_ADDR: &str = "S2C_GetServerAddr";
pub const C2S_CONCURRENT: &str = "C2S_Concurrent";
pub const S2C_GET_BEST_GATEWAY: &str = "S2C_GetBestGateway";
pub const C2S_ROUTE: &str = "C2S_Route";
pub const C2S_BROADCAST: &str = "C2S_Broadcast";
pub const S2C_ADD_GAME: &str = "S2C_AddGame";
pub const FUNC_BROADCAST: &str = "FUNC_Broadcast";
pub const FUNC_REGISTER_SERVICE_IN_GATEWAY: &str = "FUNC_RegisterServiceInGateway";
pub const FUNC_REMOVE_SERVICE_IN_GATEWAY: &str = "FUNC_RemoveServiceInGateway";
pub const FUNC_CLOSE: &str = "FUNC_Close";

/// Body of register / lookup / load-report messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerArgs {
    #[serde(rename = "ServerName")]
    pub server_name: String,
    #[serde(rename = "ServerAddr")]
    pub server_addr: String,
    #[serde(rename = "ServerData", skip_serializing_if = "Option::is_none")]
    pub server_data: Option<Box<RawValue>>,
    #[serde(rename = "ServerType")]
    pub server_type: String,
    #[serde(rename = "Weight")]
    pub weight: i64,
}

/// `C2S_Route` body: fan `Data` out as `{Id: Name, Body: Data}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardArgs {
    #[serde(rename = "ServerList")]
    pub server_list: Vec<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddrReply {
    #[serde(rename = "ServerName")]
    pub server_name: String,
    #[serde(rename = "ServerAddr")]
    pub server_addr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestGateway {
    #[serde(rename = "Address")]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddGame {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data")]
    pub data: Option<Box<RawValue>>,
}

/// Service directory update sent to gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceName {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concurrent {
    #[serde(rename = "Weight")]
    pub weight: i64,
}

/// `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

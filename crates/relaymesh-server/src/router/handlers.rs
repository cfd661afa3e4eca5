use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use relaymesh_core::protocol::Package;

use crate::dispatch::{CommandRegistry, Context};
use crate::message::{
    AddGame, BestGateway, Empty, ForwardArgs, ServerAddrReply, ServerArgs, ServiceName,
    C2S_BROADCAST, C2S_CONCURRENT, C2S_GET_SERVER_ADDR, C2S_REGISTER, C2S_REGISTER_OK, C2S_ROUTE,
    FUNC_BROADCAST, FUNC_CLOSE, FUNC_REGISTER_SERVICE_IN_GATEWAY, FUNC_REMOVE_SERVICE_IN_GATEWAY,
    S2C_ADD_GAME, S2C_GET_BEST_GATEWAY, S2C_GET_SERVER_ADDR,
};
use crate::obs::ServerMetrics;
use crate::router::registry::{Server, ServerRegistry, ServerType};
use crate::transport::Connection;

/// Router business state, owned by the executor.
pub struct RouterState {
    pub registry: ServerRegistry,
    /// Receives `S2C_GetBestGateway` after every load report.
    pub login_server: String,
    metrics: Option<Arc<ServerMetrics>>,
}

impl RouterState {
    pub fn new(login_server: impl Into<String>) -> Self {
        Self {
            registry: ServerRegistry::new(),
            login_server: login_server.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Publish registry gauges; run from the executor tick.
    pub fn refresh_metrics(&self) {
        if let Some(m) = &self.metrics {
            m.registry_size.set(&[("kind", "servers")], self.registry.len() as i64);
            m.registry_size
                .set(&[("kind", "gateways")], self.registry.gateway_count() as i64);
        }
    }
}

pub fn register_commands(commands: &CommandRegistry<RouterState>) {
    commands.register(C2S_REGISTER, c2s_register);
    commands.register(C2S_GET_SERVER_ADDR, c2s_get_server_addr);
    commands.register(C2S_CONCURRENT, c2s_concurrent);
    commands.register(C2S_ROUTE, c2s_route);
    commands.register(C2S_BROADCAST, c2s_broadcast);
    commands.register(FUNC_CLOSE, func_close);
}

fn notify<T: Serialize + ?Sized>(conn: &Connection, id: &str, body: &T) {
    if let Err(e) = conn.write_json(id, body) {
        tracing::debug!(conn = conn.id(), peer = %conn.remote_addr(), msg_id = id, error = %e, "send failed");
    }
}

/// Address a registering server is reachable at.
///
/// A missing host falls back to the host the connection was observed from.
/// Without an explicit port the result is empty: the server offers no
/// service endpoint.
pub fn resolve_server_addr(declared: &str, remote: &str) -> String {
    let (mut host, port) = split_host_port(declared).unwrap_or(("", ""));
    if host.is_empty() {
        host = split_host_port(remote).map(|(h, _)| h).unwrap_or("");
    }
    if port.is_empty() {
        return String::new();
    }
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// `host:port`, `[v6]:port`, or `:port`.
fn split_host_port(s: &str) -> Option<(&str, &str)> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return host.parse::<IpAddr>().ok().map(|_| (host, port));
    }
    let (host, port) = s.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

fn c2s_register(state: &mut RouterState, ctx: &Context, args: ServerArgs) {
    let addr = resolve_server_addr(&args.server_addr, ctx.conn().remote_addr());
    tracing::info!(server = %args.server_name, %addr, kind = %args.server_type, "register");
    notify(ctx.conn(), C2S_REGISTER_OK, &Empty {});

    let server = Server::new(
        args.server_name,
        addr,
        ServerType::parse(&args.server_type),
        ctx.conn().clone(),
    )
    .with_data(args.server_data);

    let registry = &mut state.registry;
    let added = registry.add_server(server).clone();

    if added.kind == ServerType::Center {
        for s in registry.servers() {
            notify(ctx.conn(), S2C_ADD_GAME, &AddGame { name: s.name.clone(), data: s.data.clone() });
        }
    }
    let announce = AddGame { name: added.name.clone(), data: added.data.clone() };
    for s in registry.servers() {
        if s.kind == ServerType::Center && s.name != added.name {
            notify(&s.conn, S2C_ADD_GAME, &announce);
        }
    }

    if added.kind == ServerType::Gateway {
        for s in registry.servers() {
            notify(ctx.conn(), FUNC_REGISTER_SERVICE_IN_GATEWAY, &ServiceName { name: s.name.clone() });
        }
    } else if !added.addr.is_empty() {
        let svc = ServiceName { name: added.name.clone() };
        for gw in registry.gateways() {
            notify(&gw.conn, FUNC_REGISTER_SERVICE_IN_GATEWAY, &svc);
        }
    }
}

fn c2s_get_server_addr(state: &mut RouterState, ctx: &Context, args: ServerArgs) {
    let addr = state.registry.server_addr(&args.server_name).unwrap_or("");
    tracing::debug!(server = %args.server_name, addr, "get addr");
    let reply = ServerAddrReply {
        server_name: args.server_name.clone(),
        server_addr: addr.to_string(),
    };
    notify(ctx.conn(), S2C_GET_SERVER_ADDR, &reply);
}

/// Gateway load report.
fn c2s_concurrent(state: &mut RouterState, ctx: &Context, args: ServerArgs) {
    state.registry.update_weight(ctx.conn().id(), args.weight);

    let address = state
        .registry
        .best_gateway()
        .map(|gw| gw.addr.clone())
        .unwrap_or_default();
    if let Some(login) = state.registry.get_server(&state.login_server) {
        notify(&login.conn, S2C_GET_BEST_GATEWAY, &BestGateway { address });
    }
}

fn c2s_route(state: &mut RouterState, _ctx: &Context, args: ForwardArgs) {
    let targets = if args.server_list.len() == 1 && args.server_list[0] == "*" {
        state.registry.server_names()
    } else {
        args.server_list
    };

    for name in &targets {
        let Some(s) = state.registry.get_server(name) else { continue };
        match &args.data {
            Some(data) => notify(&s.conn, &args.name, data),
            None => notify(&s.conn, &args.name, &Empty {}),
        }
    }
}

fn c2s_broadcast(state: &mut RouterState, _ctx: &Context, pkg: Package) {
    for gw in state.registry.gateways() {
        notify(&gw.conn, FUNC_BROADCAST, &pkg);
    }
}

/// Local signal raised when a connection goes away: reap its servers.
fn func_close(state: &mut RouterState, ctx: &Context, _: Empty) {
    let removed = state.registry.remove_by_connection(ctx.conn().id());
    for s in &removed {
        tracing::info!(server = %s.name, kind = s.kind.as_str(), "server lost connection");
        if s.kind == ServerType::Gateway || s.addr.is_empty() {
            continue;
        }
        let svc = ServiceName { name: s.name.clone() };
        for gw in state.registry.gateways() {
            notify(&gw.conn, FUNC_REMOVE_SERVICE_IN_GATEWAY, &svc);
        }
    }
}

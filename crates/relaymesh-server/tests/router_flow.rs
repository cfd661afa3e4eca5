//! Router command handlers driven through dispatcher + executor.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::HashSet;

use serde_json::json;

use common::{Peer, RouterHarness};

#[test]
fn register_then_lookup_without_port_yields_empty_address() {
    let mut h = RouterHarness::new();
    let mut game = Peer::new("10.1.2.3:51000");
    h.register(&game, "game1", "", "generic");
    assert_eq!(game.take("C2S_RegisterOk"), vec![json!({})]);

    let mut other = Peer::new("10.9.9.9:40000");
    h.send(&other, "C2S_GetServerAddr", json!({"ServerName": "game1"}));
    assert_eq!(
        other.take("S2C_GetServerAddr"),
        vec![json!({"ServerName": "game1", "ServerAddr": ""})]
    );
}

#[test]
fn port_only_address_uses_observed_host() {
    let mut h = RouterHarness::new();
    let game = Peer::new("10.1.2.3:51000");
    h.register(&game, "game1", ":9000", "generic");

    let mut other = Peer::new("10.9.9.9:40000");
    h.send(&other, "C2S_GetServerAddr", json!({"ServerName": "game1"}));
    assert_eq!(
        other.take("S2C_GetServerAddr"),
        vec![json!({"ServerName": "game1", "ServerAddr": "10.1.2.3:9000"})]
    );
}

#[test]
fn unknown_server_lookup_is_empty() {
    let mut h = RouterHarness::new();
    let mut other = Peer::new("10.9.9.9:40000");
    h.send(&other, "C2S_GetServerAddr", json!({"ServerName": "nope"}));
    assert_eq!(
        other.take("S2C_GetServerAddr"),
        vec![json!({"ServerName": "nope", "ServerAddr": ""})]
    );
}

#[test]
fn reregistration_replaces_entry_in_place() {
    let mut h = RouterHarness::new();
    let first = Peer::new("10.0.0.1:1000");
    let second = Peer::new("10.0.0.2:1000");
    h.register(&first, "game1", "10.0.0.1:9000", "generic");
    h.register(&second, "game1", "10.0.0.2:9001", "center");

    assert_eq!(h.state.registry.len(), 1);
    let s = h.state.registry.get_server("game1").unwrap();
    assert_eq!(s.addr, "10.0.0.2:9001");
    assert!(s.conn.same_as(second.conn()));
    // type is fixed by the first registration
    assert_eq!(s.kind.as_str(), "generic");
}

#[test]
fn best_gateway_follows_reported_load() {
    let mut h = RouterHarness::new();
    let mut login = Peer::new("10.0.0.9:1000");
    h.register(&login, "login", "", "generic");

    let a = Peer::new("10.0.0.1:1000");
    let b = Peer::new("10.0.0.2:1000");
    let c = Peer::new("10.0.0.3:1000");
    h.register(&a, "gwA", "10.0.0.1:7000", "gateway");
    h.register(&b, "gwB", "10.0.0.2:7000", "gateway");
    h.register(&c, "gwC", "10.0.0.3:7000", "gateway");

    h.send(&a, "C2S_Concurrent", json!({"Weight": 5}));
    h.send(&b, "C2S_Concurrent", json!({"Weight": 2}));
    h.send(&c, "C2S_Concurrent", json!({"Weight": 2}));

    let best = h.state.registry.best_gateway().unwrap().addr.clone();
    assert!(best == "10.0.0.2:7000" || best == "10.0.0.3:7000", "best={best}");

    let hints = login.take("S2C_GetBestGateway");
    assert_eq!(hints.len(), 3);
    assert_eq!(hints[2]["Address"], json!(best));

    h.send(&a, "C2S_Concurrent", json!({"Weight": 0}));
    assert_eq!(h.state.registry.best_gateway().unwrap().addr, "10.0.0.1:7000");
    assert_eq!(
        login.take("S2C_GetBestGateway"),
        vec![json!({"Address": "10.0.0.1:7000"})]
    );
}

#[test]
fn load_report_without_gateways_hints_empty_address() {
    let mut h = RouterHarness::new();
    let mut login = Peer::new("10.0.0.9:1000");
    h.register(&login, "login", "", "generic");
    let stranger = Peer::new("10.0.0.5:1000");
    h.send(&stranger, "C2S_Concurrent", json!({"Weight": 3}));
    assert_eq!(login.take("S2C_GetBestGateway"), vec![json!({"Address": ""})]);
}

#[test]
fn wildcard_route_reaches_every_server_once() {
    let mut h = RouterHarness::new();
    let mut peers = vec![
        Peer::new("10.0.0.1:1000"),
        Peer::new("10.0.0.2:1000"),
        Peer::new("10.0.0.3:1000"),
    ];
    h.register(&peers[0], "game1", ":9000", "generic");
    h.register(&peers[1], "gw1", ":7000", "gateway");
    h.register(&peers[2], "center1", "", "center");
    for p in peers.iter_mut() {
        p.drain();
    }

    let sender = Peer::new("10.0.0.8:1000");
    h.send(
        &sender,
        "C2S_Route",
        json!({"ServerList": ["*"], "Name": "Hello", "Data": {"x": 1}}),
    );

    for p in peers.iter_mut() {
        assert_eq!(p.take("Hello"), vec![json!({"x": 1})]);
    }
}

#[test]
fn named_route_skips_unknown_servers() {
    let mut h = RouterHarness::new();
    let mut game = Peer::new("10.0.0.1:1000");
    h.register(&game, "game1", ":9000", "generic");
    game.drain();

    let sender = Peer::new("10.0.0.8:1000");
    h.send(
        &sender,
        "C2S_Route",
        json!({"ServerList": ["ghost", "game1"], "Name": "Ping"}),
    );
    assert_eq!(game.take("Ping"), vec![json!({})]);
}

#[test]
fn gateway_learns_existing_services_and_new_ones() {
    let mut h = RouterHarness::new();
    let game = Peer::new("10.0.0.1:1000");
    h.register(&game, "game1", ":9000", "generic");

    let mut gw = Peer::new("10.0.0.2:1000");
    h.register(&gw, "gw1", ":7000", "gateway");
    let names: HashSet<String> = gw
        .take("FUNC_RegisterServiceInGateway")
        .into_iter()
        .map(|b| b["Name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, HashSet::from(["game1".to_string(), "gw1".to_string()]));

    let hall = Peer::new("10.0.0.3:1000");
    h.register(&hall, "hall", ":9100", "generic");
    assert_eq!(
        gw.take("FUNC_RegisterServiceInGateway"),
        vec![json!({"Name": "hall"})]
    );

    // no address: nothing to route to, gateways are not told
    let tool = Peer::new("10.0.0.4:1000");
    h.register(&tool, "tool", "", "generic");
    assert!(gw.take("FUNC_RegisterServiceInGateway").is_empty());
}

#[test]
fn center_servers_sync_directory() {
    let mut h = RouterHarness::new();
    let game = Peer::new("10.0.0.1:1000");
    h.register(&game, "game1", ":9000", "generic");

    let mut center = Peer::new("10.0.0.2:1000");
    h.register(&center, "center1", "", "center");
    let names: HashSet<String> = center
        .take("S2C_AddGame")
        .into_iter()
        .map(|b| b["Name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains("game1"));
    assert!(names.contains("center1"));

    let hall = Peer::new("10.0.0.3:1000");
    h.register(&hall, "hall", ":9100", "generic");
    let added = center.take("S2C_AddGame");
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["Name"], "hall");
}

#[test]
fn broadcast_goes_to_gateways_only() {
    let mut h = RouterHarness::new();
    let mut game = Peer::new("10.0.0.1:1000");
    let mut gw1 = Peer::new("10.0.0.2:1000");
    let mut gw2 = Peer::new("10.0.0.3:1000");
    h.register(&game, "game1", ":9000", "generic");
    h.register(&gw1, "gw1", ":7000", "gateway");
    h.register(&gw2, "gw2", ":7001", "gateway");
    game.drain();
    gw1.drain();
    gw2.drain();

    h.send(&game, "C2S_Broadcast", json!({"Id": "Notice", "Body": {"Text": "maintenance"}}));
    for gw in [&mut gw1, &mut gw2] {
        assert_eq!(
            gw.take("FUNC_Broadcast"),
            vec![json!({"Id": "Notice", "Body": {"Text": "maintenance"}})]
        );
    }
    assert!(game.drain().is_empty());
}

#[test]
fn closed_connection_is_reaped_and_gateways_told() {
    let mut h = RouterHarness::new();
    let mut gw = Peer::new("10.0.0.2:1000");
    h.register(&gw, "gw1", ":7000", "gateway");
    let game = Peer::new("10.0.0.1:1000");
    h.register(&game, "game1", ":9000", "generic");
    gw.drain();

    game.ctx.close();
    h.send(&game, "FUNC_Close", json!({}));

    assert!(h.state.registry.get_server("game1").is_none());
    assert_eq!(
        gw.take("FUNC_RemoveServiceInGateway"),
        vec![json!({"Name": "game1"})]
    );

    gw.ctx.close();
    h.send(&gw, "FUNC_Close", json!({}));
    assert!(h.state.registry.is_empty());
    assert!(h.state.registry.best_gateway().is_none());
}

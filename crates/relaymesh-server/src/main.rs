//! relaymesh router
//!
//! - Tracks registered backend servers and gateways
//! - Answers address lookups and pushes best-gateway hints to the login server
//! - Fans routed and broadcast messages out to their targets
//!
//! Usage: `relaymesh-router [config.yaml]` (default `relaymesh.yaml`).

use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use relaymesh_core::error::{RelayError, Result};
use relaymesh_server::{app_state::AppState, config, exec, ops, router, transport};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args().nth(1).unwrap_or_else(|| "relaymesh.yaml".to_string());

    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("relaymesh-router: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.level));
    fmt().with_env_filter(filter).init();

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "router stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: config::NodeConfig) -> Result<()> {
    let listen = cfg.listen_addr("router")?;
    let tick_every = cfg.router.tick_interval();
    let login_server = cfg.router.login_server.clone();
    let ops_listen = cfg.ops.listen.clone();

    let (queue, executor) = exec::channel::<router::RouterState>();
    let app = AppState::new(cfg, queue);
    router::register_commands(app.dispatcher().commands());

    let mut executor = executor.with_metrics(app.metrics());
    executor.on_tick(|state: &mut router::RouterState| state.refresh_metrics());
    let state = router::RouterState::new(login_server).with_metrics(app.metrics());
    tokio::spawn(executor.run(state, tick_every));

    if let Some(addr) = ops_listen {
        let ops_listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Io(format!("bind ops {addr}: {e}")))?;
        let ops_app = ops::build_router(app.metrics());
        tracing::info!(%addr, "ops endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(ops_listener, ops_app).await {
                tracing::error!(error = %e, "ops server failed");
            }
        });
    }

    let listener = TcpListener::bind(&listen)
        .await
        .map_err(|e| RelayError::Io(format!("bind {listen}: {e}")))?;
    tracing::info!(%listen, "start router server");

    transport::serve(listener, app, transport::ServeOptions::default()).await
}

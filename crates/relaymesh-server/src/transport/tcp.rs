//! TCP connection runtime.
//!
//! Responsibilities:
//! - Accept (or dial) a peer and split the stream
//! - Writer: drain the send queue with a write deadline, ping on cadence,
//!   flush and append a `Close` frame once the handle is closed
//! - Reader: read frames under the pong deadline, answer pings, decode the
//!   envelope once and hand it to the dispatcher
//! - Disconnect: raise `FUNC_Close` locally so state owners can react

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use relaymesh_core::error::{RelayError, Result};
use relaymesh_core::protocol::{decode_package, encode_frame, read_frame, Frame, FrameKind};

use crate::app_state::AppState;
use crate::dispatch::Context;
use crate::message::FUNC_CLOSE;
use crate::session::Session;
use crate::transport::Connection;

/// Liveness timings, all derived from the write deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub write_wait: Duration,
    /// Read deadline; a silent peer is dropped after this long.
    pub pong_wait: Duration,
    pub ping_period: Duration,
}

impl Keepalive {
    pub fn from_write_wait(write_wait: Duration) -> Self {
        let pong_wait = write_wait * 6;
        Self {
            write_wait,
            pong_wait,
            ping_period: pong_wait * 9 / 10,
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::from_write_wait(Duration::from_secs(10))
    }
}

/// How accepted connections are treated.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Peers are clients terminated by this gateway: routed ids are validated.
    pub gateway_origin: bool,
    /// Owner of each accepted peer's session (typically the router link).
    pub session_owner: Option<Connection>,
}

/// Accept loop. Runs until the listener fails.
pub async fn serve<S>(listener: TcpListener, app: AppState<S>, opts: ServeOptions) -> Result<()>
where
    S: Send + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        tracing::debug!(%peer, "accepted");
        spawn_connection(stream, peer.to_string(), app.clone(), opts.clone());
    }
}

/// Dial `addr` and run the same runtime on the outbound link.
pub async fn connect<S>(addr: &str, app: &AppState<S>) -> Result<Connection>
where
    S: Send + 'static,
{
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| RelayError::Io(format!("connect {addr}: {e}")))?;
    let _ = stream.set_nodelay(true);
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    Ok(spawn_connection(stream, peer, app.clone(), ServeOptions::default()))
}

/// Start reader and writer tasks for `stream` and return its handle.
pub fn spawn_connection<S, T>(stream: T, peer: String, app: AppState<S>, opts: ServeOptions) -> Connection
where
    S: Send + 'static,
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let keepalive = app.keepalive();
    let (conn, rx) = Connection::with_metrics(peer, app.send_queue_capacity(), app.metrics());
    let (reader, writer) = tokio::io::split(stream);

    let ctx = if opts.gateway_origin {
        let ssid = conn.id().to_string();
        if let Some(owner) = &opts.session_owner {
            app.sessions()
                .insert(Session::new(ssid.as_str(), owner.clone()).with_client(conn.clone()));
        }
        Context::gateway(conn.clone(), ssid)
    } else {
        Context::new(conn.clone())
    };

    app.metrics().connections_active.inc(&[]);
    tokio::spawn(run_writer(conn.clone(), rx, writer, keepalive));
    tokio::spawn(run_reader(ctx, reader, app, keepalive));
    conn
}

async fn write_frame<W>(w: &mut W, frame: &Frame, write_wait: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode_frame(frame.kind, &frame.payload)?;
    match timeout(write_wait, w.write_all(&buf)).await {
        Ok(res) => Ok(res?),
        Err(_) => Err(RelayError::Io("write deadline exceeded".into())),
    }
}

pub(crate) async fn run_writer<W>(
    conn: Connection,
    mut rx: mpsc::Receiver<Frame>,
    mut w: W,
    keepalive: Keepalive,
) where
    W: AsyncWrite + Unpin,
{
    let mut ping = interval_at(Instant::now() + keepalive.ping_period, keepalive.ping_period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result: Result<()> = async {
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(frame) = maybe else { break; };
                    write_frame(&mut w, &frame, keepalive.write_wait).await?;
                }
                _ = ping.tick() => {
                    write_frame(&mut w, &Frame::control(FrameKind::Ping), keepalive.write_wait).await?;
                }
                _ = conn.closed() => {
                    rx.close();
                    while let Some(frame) = rx.recv().await {
                        write_frame(&mut w, &frame, keepalive.write_wait).await?;
                    }
                    break;
                }
            }
        }
        write_frame(&mut w, &Frame::control(FrameKind::Close), keepalive.write_wait).await
    }
    .await;

    if let Err(e) = result {
        tracing::debug!(conn = conn.id(), peer = %conn.remote_addr(), error = %e, "writer stopped");
    }
    conn.close();
    let _ = w.shutdown().await;
}

pub(crate) async fn run_reader<S, R>(ctx: Context, mut r: R, app: AppState<S>, keepalive: Keepalive)
where
    S: Send + 'static,
    R: AsyncRead + Unpin,
{
    let conn = ctx.conn().clone();
    let metrics = app.metrics();
    let dispatcher = app.dispatcher();

    loop {
        let frame = match timeout(keepalive.pong_wait, read_frame(&mut r)).await {
            Err(_) => {
                tracing::info!(conn = conn.id(), peer = %conn.remote_addr(), "read deadline exceeded");
                break;
            }
            Ok(Err(e)) if e.is_fatal() => {
                tracing::debug!(conn = conn.id(), peer = %conn.remote_addr(), error = %e, "read failed");
                break;
            }
            Ok(Err(e)) => {
                metrics.dispatch_errors.inc(&[("class", e.class().as_str())]);
                tracing::warn!(conn = conn.id(), error = %e, "frame rejected");
                continue;
            }
            Ok(Ok(frame)) => frame,
        };

        match frame.kind {
            FrameKind::Ping => {
                let _ = conn.send_control(FrameKind::Pong);
            }
            FrameKind::Pong => {}
            FrameKind::Close => break,
            FrameKind::Raw | FrameKind::Auth => {
                metrics.frames_in.inc(&[]);
                let res = decode_package(&frame.payload)
                    .and_then(|pkg| dispatcher.handle(&ctx, &pkg.id, pkg.body_bytes()));
                if let Err(e) = res {
                    metrics.dispatch_errors.inc(&[("class", e.class().as_str())]);
                    tracing::debug!(conn = conn.id(), peer = %conn.remote_addr(), error = %e, "dispatch failed");
                }
            }
        }
    }

    conn.close();
    metrics.connections_active.dec(&[]);
    if let Some(ssid) = ctx.ssid() {
        app.sessions().remove(ssid);
    }
    if dispatcher.commands().contains(FUNC_CLOSE) {
        if let Err(e) = dispatcher.raise(&ctx, FUNC_CLOSE) {
            tracing::warn!(conn = conn.id(), error = %e, "close notification failed");
        }
    }
}

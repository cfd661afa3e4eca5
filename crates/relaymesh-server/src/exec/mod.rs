//! Execution queue: one logical thread of control for all handlers.
//!
//! Connection readers call [`ExecQueue::enqueue`] concurrently; a single
//! [`Executor`] owns the business state `S` and runs jobs one at a time in
//! enqueue order. Handlers therefore mutate `S` without locks.
//!
//! A panicking job is caught, logged with a backtrace, and the executor moves
//! on to the next job.

use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use relaymesh_core::error::{RelayError, Result};

use crate::obs::ServerMetrics;

/// A bound handler invocation (context + decoded argument already captured).
pub type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

type Ticker<S> = Box<dyn FnMut(&mut S) + Send + 'static>;

/// Producer side; cheap to clone.
pub struct ExecQueue<S> {
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for ExecQueue<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<S: 'static> ExecQueue<S> {
    pub fn enqueue(&self, job: Job<S>) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| RelayError::Internal("execution queue stopped".into()))
    }
}

/// Consumer side; owned by exactly one task.
pub struct Executor<S> {
    rx: mpsc::UnboundedReceiver<Job<S>>,
    tickers: Vec<Ticker<S>>,
    metrics: Option<Arc<ServerMetrics>>,
}

/// Create a connected queue/executor pair.
pub fn channel<S: 'static>() -> (ExecQueue<S>, Executor<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ExecQueue { tx },
        Executor {
            rx,
            tickers: Vec::new(),
            metrics: None,
        },
    )
}

impl<S: 'static> Executor<S> {
    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Register a callback run on every tick of [`Executor::run`].
    pub fn on_tick<F>(&mut self, f: F)
    where
        F: FnMut(&mut S) + Send + 'static,
    {
        self.tickers.push(Box::new(f));
    }

    /// Run every job queued at the time of the call. Returns how many ran.
    pub fn run_once(&mut self, state: &mut S) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(job) => {
                    self.execute(state, job);
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Run the tick callbacks once.
    pub fn tick(&mut self, state: &mut S) {
        for t in self.tickers.iter_mut() {
            let res = catch_unwind(AssertUnwindSafe(|| t(state)));
            if let Err(panic) = res {
                report_panic("tick", panic.as_ref(), self.metrics.as_deref());
            }
        }
    }

    /// Drive the queue until every producer is gone, interleaving ticks.
    /// Returns the state so callers can inspect it after shutdown.
    pub async fn run(mut self, mut state: S, tick_every: Duration) -> S {
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                job = self.rx.recv() => {
                    let Some(job) = job else { break; };
                    self.execute(&mut state, job);
                    self.run_once(&mut state);
                }
                _ = ticker.tick() => {
                    self.tick(&mut state);
                }
            }
        }

        tracing::info!("execution queue drained, executor stopping");
        state
    }

    fn execute(&self, state: &mut S, job: Job<S>) {
        let res = catch_unwind(AssertUnwindSafe(|| job(state)));
        if let Some(m) = &self.metrics {
            m.jobs_executed.inc(&[]);
        }
        if let Err(panic) = res {
            report_panic("handler", panic.as_ref(), self.metrics.as_deref());
        }
    }
}

fn report_panic(
    origin: &'static str,
    panic: &(dyn std::any::Any + Send),
    metrics: Option<&ServerMetrics>,
) {
    let msg = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    let stack = Backtrace::force_capture();
    tracing::error!(origin, panic = %msg, "recovered from panic in execution queue");
    tracing::error!("{stack}");
    if let Some(m) = metrics {
        m.handler_panics.inc(&[("origin", origin)]);
    }
}

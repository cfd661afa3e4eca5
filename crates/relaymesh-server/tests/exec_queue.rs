//! Executor ordering, panic recovery, and tick callbacks.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use relaymesh_server::exec::{self, Job};
use relaymesh_server::obs::ServerMetrics;

fn push(n: i32) -> Job<Vec<i32>> {
    Box::new(move |v: &mut Vec<i32>| v.push(n))
}

#[test]
fn jobs_run_in_enqueue_order() {
    let (queue, mut executor) = exec::channel::<Vec<i32>>();
    for n in 0..100 {
        queue.enqueue(push(n)).unwrap();
    }
    let mut state = Vec::new();
    assert_eq!(executor.run_once(&mut state), 100);
    assert_eq!(state, (0..100).collect::<Vec<_>>());
}

#[test]
fn panicking_job_does_not_stop_the_queue() {
    let metrics = Arc::new(ServerMetrics::default());
    let (queue, executor) = exec::channel::<Vec<i32>>();
    let mut executor = executor.with_metrics(Arc::clone(&metrics));

    queue.enqueue(push(1)).unwrap();
    queue.enqueue(Box::new(|_: &mut Vec<i32>| panic!("boom"))).unwrap();
    queue.enqueue(push(2)).unwrap();

    let mut state = Vec::new();
    assert_eq!(executor.run_once(&mut state), 3);
    assert_eq!(state, vec![1, 2]);
    assert_eq!(metrics.handler_panics.get(&[("origin", "handler")]), 1);
    assert_eq!(metrics.jobs_executed.get(&[]), 3);
}

#[test]
fn run_once_only_takes_a_snapshot() {
    let (queue, mut executor) = exec::channel::<Vec<i32>>();
    let q2 = queue.clone();
    queue
        .enqueue(Box::new(move |v: &mut Vec<i32>| {
            v.push(1);
            q2.enqueue(push(2)).unwrap();
        }))
        .unwrap();

    let mut state = Vec::new();
    assert_eq!(executor.run_once(&mut state), 1);
    assert_eq!(state, vec![1]);
    assert_eq!(executor.run_once(&mut state), 1);
    assert_eq!(state, vec![1, 2]);
}

#[test]
fn tick_callbacks_run_and_survive_panics() {
    let (_queue, mut executor) = exec::channel::<Vec<i32>>();
    executor.on_tick(|_: &mut Vec<i32>| panic!("tick boom"));
    executor.on_tick(|v: &mut Vec<i32>| v.push(9));

    let mut state = Vec::new();
    executor.tick(&mut state);
    executor.tick(&mut state);
    assert_eq!(state, vec![9, 9]);
}

#[tokio::test]
async fn run_returns_state_once_producers_are_gone() {
    let (queue, executor) = exec::channel::<Vec<i32>>();
    let handle = tokio::spawn(executor.run(Vec::new(), Duration::from_millis(5)));

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let q = queue.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    q.enqueue(push(p * 100 + i)).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.await.unwrap();
    }
    drop(queue);

    let state = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("executor should stop")
        .unwrap();
    assert_eq!(state.len(), 100);
    // per-producer order is preserved
    for p in 0..4 {
        let mine: Vec<i32> = state.iter().copied().filter(|n| n / 100 == p).collect();
        assert_eq!(mine, (0..25).map(|i| p * 100 + i).collect::<Vec<_>>());
    }
}

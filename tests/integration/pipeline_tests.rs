//! End-to-end debounce behaviour on a running pipeline.

use crate::mock_handler::{Recorder, SETTLE, wait_until};
use edgebounce::{EdgeOutcome, Pipeline, PipelineConfig, SimLine, WindowPhase};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn start(source_id: u32, window_ms: u32, recorder: &Recorder, delay: Duration) -> (Pipeline<SimLine>, SimLine) {
    let line = SimLine::new(false);
    let config = PipelineConfig::for_source(source_id).with_window_ms(window_ms);
    let pipeline = Pipeline::new(config, line.clone(), recorder.handler(delay)).unwrap();
    (pipeline, line)
}

#[test]
fn burst_inside_one_window_delivers_once() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(101, 100, &recorder, Duration::ZERO);

    let first = pipeline.on_edge_now();
    assert!(matches!(first, EdgeOutcome::WindowOpened { .. }));
    for _ in 0..7 {
        assert_eq!(pipeline.on_edge_now(), EdgeOutcome::Absorbed);
    }

    assert!(wait_until(SETTLE, || pipeline.processed_count() == 1));
    // Nothing else may follow from the same burst.
    thread::sleep(Duration::from_millis(150));

    let snap = pipeline.snapshot();
    assert_eq!(snap.raw_edge_count(), 8);
    assert_eq!(snap.processed_count(), 1);
    assert_eq!(snap.counters.windows_closed, 1);

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].window.edges, 8);
    assert_eq!(events[0].sequence, 1);
    assert_eq!(events[0].source_id, 101);
}

#[test]
fn edges_spaced_beyond_window_each_deliver() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(102, 10, &recorder, Duration::ZERO);

    for i in 1..=5u64 {
        pipeline.on_edge_now();
        assert!(wait_until(SETTLE, || pipeline.processed_count() == i));
    }

    let snap = pipeline.snapshot();
    assert_eq!(snap.raw_edge_count(), 5);
    assert_eq!(snap.processed_count(), 5);
    assert!(snap.windows_accounted());

    let sequences: Vec<u64> = recorder.events().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
}

#[test]
fn bounce_burst_then_late_edge_gives_two_deliveries() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(103, 50, &recorder, Duration::ZERO);

    let base = Instant::now();
    let at = |ms: u64| {
        let target = base + Duration::from_millis(ms);
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        }
    };

    pipeline.on_edge_now();
    at(10);
    pipeline.on_edge_now();
    at(20);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 1));
    assert_eq!(pipeline.raw_edge_count(), 3);

    at(80);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 2));

    let snap = pipeline.snapshot();
    assert_eq!(snap.raw_edge_count(), 4);
    assert_eq!(snap.processed_count(), 2);

    let events = recorder.events();
    assert_eq!(events[0].window.edges, 3);
    assert_eq!(events[0].window.raw_edge_count, 3);
    assert_eq!(events[1].window.edges, 1);
    assert_eq!(events[1].window.raw_edge_count, 4);
    assert!(events[1].window.opened_us >= events[0].window.deadline_us);
}

#[test]
fn settled_level_is_sampled_after_the_window() {
    let recorder = Recorder::new();
    let (pipeline, line) = start(104, 30, &recorder, Duration::ZERO);
    assert!(!pipeline.level());

    // Odd number of bounces: the line ends up high.
    for _ in 0..5 {
        line.toggle();
        pipeline.on_edge_now();
    }
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 1));

    assert!(pipeline.level());
    assert!(recorder.events()[0].level);
    // One sample at start, one per delivery; edges never touch the line.
    assert_eq!(line.reads(), 2);
}

#[test]
fn slow_handler_never_overlaps_itself() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(105, 5, &recorder, Duration::from_millis(20));

    for _ in 0..30 {
        pipeline.on_edge_now();
        thread::sleep(Duration::from_millis(8));
    }

    assert!(wait_until(SETTLE, || {
        let snap = pipeline.snapshot();
        !snap.deferred_queued && !recorder.in_flight() && snap.windows_accounted()
    }));
    thread::sleep(Duration::from_millis(50));

    let snap = pipeline.snapshot();
    assert_eq!(recorder.overlaps(), 0);
    assert_eq!(snap.raw_edge_count(), 30);
    assert!(snap.processed_count() >= 1);
    assert!(snap.processed_count() <= snap.raw_edge_count());
    assert!(snap.windows_accounted());
    assert_eq!(snap.processed_count(), recorder.count() as u64);
}

#[test]
fn concurrent_producers_lose_no_edges() {
    const PRODUCERS: usize = 4;
    const EDGES_EACH: u64 = 250;

    let recorder = Recorder::new();
    let (pipeline, _line) = start(106, 2, &recorder, Duration::ZERO);
    let pipeline = Arc::new(pipeline);

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let injector = pipeline.injector();
            thread::spawn(move || {
                for i in 0..EDGES_EACH {
                    injector.on_edge_now();
                    if i % 16 == 0 {
                        thread::sleep(Duration::from_micros(500));
                    }
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let total = PRODUCERS as u64 * EDGES_EACH;
    assert_eq!(pipeline.raw_edge_count(), total);

    assert!(wait_until(SETTLE, || {
        let snap = pipeline.snapshot();
        !matches!(snap.phase, WindowPhase::Pending { .. }) && !snap.deferred_queued && !recorder.in_flight()
    }));
    thread::sleep(Duration::from_millis(20));

    let snap = pipeline.snapshot();
    assert!(snap.processed_count() >= 1);
    assert!(snap.processed_count() <= total);
    assert!(snap.windows_accounted());
    assert_eq!(recorder.overlaps(), 0);
}

#[test]
fn injector_sees_the_same_pipeline() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(107, 20, &recorder, Duration::ZERO);
    let injector = pipeline.injector();

    injector.on_edge_now();
    injector.on_edge(injector.now_us());
    assert!(wait_until(SETTLE, || injector.snapshot().processed_count() == 1));

    assert_eq!(injector.snapshot().raw_edge_count(), 2);
    assert_eq!(pipeline.raw_edge_count(), 2);
    assert_eq!(pipeline.source_id(), 107);
    assert!(pipeline.is_running());
    assert!(pipeline.is_healthy());
}

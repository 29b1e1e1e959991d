//! Handler and line failures surface as faults and clear on recovery.

use crate::mock_handler::{Mode, Recorder, SETTLE, wait_until};
use edgebounce::source::is_claimed;
use edgebounce::{Error, InitError, Pipeline, PipelineConfig, PipelineFault, SimLine};
use std::time::Duration;

fn start(source_id: u32, recorder: &Recorder) -> (Pipeline<SimLine>, SimLine) {
    let line = SimLine::new(false);
    let config = PipelineConfig::for_source(source_id).with_window_ms(10);
    let pipeline = Pipeline::new(config, line.clone(), recorder.handler(Duration::ZERO)).unwrap();
    (pipeline, line)
}

#[test]
fn handler_error_marks_unhealthy_until_next_success() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(301, &recorder);

    recorder.set_mode(Mode::Fail);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || !pipeline.is_healthy()));

    let snap = pipeline.snapshot();
    assert!(snap.has_fault(PipelineFault::HandlerFailed));
    assert!(snap.last_error.as_str().starts_with("downstream rejected event #1"));
    // The event was delivered even though the handler refused it.
    assert_eq!(snap.processed_count(), 1);
    assert!(pipeline.is_running());

    recorder.set_mode(Mode::Succeed);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 2));
    assert!(wait_until(SETTLE, || pipeline.is_healthy()));
}

#[test]
fn handler_panic_is_contained() {
    let recorder = Recorder::new();
    let (pipeline, _line) = start(302, &recorder);

    recorder.set_mode(Mode::Panic);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.snapshot().has_fault(PipelineFault::HandlerFailed)));
    assert!(pipeline.snapshot().last_error.as_str().starts_with("handler panicked"));

    // The worker survived and keeps delivering.
    recorder.set_mode(Mode::Succeed);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 2));
    assert!(wait_until(SETTLE, || pipeline.is_healthy()));
    assert_eq!(recorder.count(), 2);
}

#[test]
fn level_read_failure_skips_delivery() {
    let recorder = Recorder::new();
    let (pipeline, line) = start(303, &recorder);

    line.set_failing(true);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.snapshot().counters.failed_dispatches == 1));

    let snap = pipeline.snapshot();
    assert_eq!(snap.processed_count(), 0);
    assert!(snap.has_fault(PipelineFault::LevelReadFailed));
    assert!(snap.windows_accounted());
    assert_eq!(recorder.count(), 0);

    line.set_failing(false);
    line.set_level(true);
    pipeline.on_edge_now();
    assert!(wait_until(SETTLE, || pipeline.processed_count() == 1));

    let snap = pipeline.snapshot();
    assert!(snap.healthy);
    assert!(snap.level);
    assert_eq!(recorder.events()[0].sequence, 1);
}

#[test]
fn unreadable_line_fails_init_and_releases_source() {
    let line = SimLine::new(false);
    line.set_failing(true);
    let recorder = Recorder::new();

    let result = Pipeline::new(PipelineConfig::for_source(304), line, recorder.handler(Duration::ZERO));
    assert!(matches!(result, Err(Error::Init(InitError::LevelReadFailed))));
    assert!(!is_claimed(304));
}

#[test]
fn invalid_config_is_rejected_before_claiming() {
    let recorder = Recorder::new();
    let config = PipelineConfig::for_source(305).with_window_ms(0);

    let result = Pipeline::new(config, SimLine::new(false), recorder.handler(Duration::ZERO));
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!is_claimed(305));
}

#[test]
fn oversized_task_stack_is_rejected_before_claiming() {
    let recorder = Recorder::new();
    let config = PipelineConfig {
        timer_stack_kb: usize::MAX,
        ..PipelineConfig::for_source(306)
    };

    let result = Pipeline::new(config, SimLine::new(false), recorder.handler(Duration::ZERO));
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(!is_claimed(306));

    // The id is free for a well-formed pipeline.
    let pipeline = Pipeline::new(
        PipelineConfig::for_source(306),
        SimLine::new(false),
        recorder.handler(Duration::ZERO),
    )
    .unwrap();
    assert!(pipeline.is_running());
}

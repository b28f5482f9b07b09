//! Startup prober tests.

mod common;

use common::{
    ScriptedEngine, StampMaterializer, gop_index, index_with_random_access_points, stamp_of,
};
use framesource::{DecodeStatus, PixelFormat, ProbeState, SourceError, StartupProber, VideoFrame};

fn blank() -> Result<VideoFrame, SourceError> {
    Ok(VideoFrame::black(PixelFormat::Gray8, 2, 2))
}

// ── State machine ────────────────────────────────────────────────

#[test]
fn prober_starts_not_started() {
    let prober = StartupProber::new(10, 2);
    assert_eq!(prober.state(), &ProbeState::NotStarted);
    assert!(!prober.is_finished());
}

#[test]
fn priming_attempts_count_as_delay() {
    let mut prober = StartupProber::new(10, 2);
    assert!(!prober.observe(DecodeStatus::NeedMoreInput, blank));
    assert!(!prober.observe(DecodeStatus::NeedMoreInput, blank));
    assert_eq!(
        prober.state(),
        &ProbeState::Probing {
            attempts: 2,
            delay_count: 2
        }
    );

    assert!(prober.observe(DecodeStatus::Picture, blank));
    match prober.state() {
        ProbeState::Ready {
            delay,
            first_valid_frame,
            ..
        } => {
            assert_eq!(*delay, 2);
            assert_eq!(*first_valid_frame, 1);
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[test]
fn ready_is_final() {
    let mut prober = StartupProber::new(10, 0);
    assert!(prober.observe(DecodeStatus::Picture, blank));
    let ready = prober.state().clone();

    assert!(prober.observe(DecodeStatus::EndOfStream, || {
        panic!("materialize must not be called once ready")
    }));
    assert_eq!(prober.state(), &ready);
}

#[test]
fn end_of_stream_fails() {
    let mut prober = StartupProber::new(10, 1);
    prober.observe(DecodeStatus::NeedMoreInput, blank);
    assert!(prober.observe(DecodeStatus::EndOfStream, blank));
    assert_eq!(prober.state(), &ProbeState::Failed);
}

#[test]
fn attempt_budget_is_frame_count_plus_reported_delay() {
    let mut prober = StartupProber::new(2, 1);
    assert!(!prober.observe(DecodeStatus::NeedMoreInput, blank));
    assert!(!prober.observe(DecodeStatus::NeedMoreInput, blank));
    assert!(prober.observe(DecodeStatus::NeedMoreInput, blank));
    assert_eq!(prober.state(), &ProbeState::Failed);
}

#[test]
fn unusable_picture_is_discarded() {
    let mut prober = StartupProber::new(10, 0);
    let finished = prober.observe(DecodeStatus::Picture, || {
        Err(SourceError::UnsupportedFormat("broken".to_string()))
    });
    assert!(!finished);
    assert_eq!(
        prober.state(),
        &ProbeState::Probing {
            attempts: 1,
            delay_count: 0
        }
    );

    assert!(prober.observe(DecodeStatus::Picture, blank));
    assert!(matches!(
        prober.state(),
        ProbeState::Ready {
            first_valid_frame: 2,
            delay: 0,
            ..
        }
    ));
}

#[test]
fn under_reported_delay_labels_with_the_measured_delay() {
    // The decoder claims no delay but holds two pictures back.
    let mut prober = StartupProber::new(10, 0);
    prober.observe(DecodeStatus::NeedMoreInput, blank);
    prober.observe(DecodeStatus::NeedMoreInput, blank);
    assert!(prober.observe(DecodeStatus::Picture, blank));
    assert!(matches!(
        prober.state(),
        ProbeState::Ready {
            delay: 2,
            first_valid_frame: 1,
            ..
        }
    ));
}

#[test]
fn empty_attempt_after_an_unusable_picture_is_not_delay() {
    let mut prober = StartupProber::new(10, 0);
    prober.observe(DecodeStatus::Picture, || {
        Err(SourceError::UnsupportedFormat("broken".to_string()))
    });
    prober.observe(DecodeStatus::NeedMoreInput, blank);
    assert!(prober.observe(DecodeStatus::Picture, blank));
    assert!(matches!(
        prober.state(),
        ProbeState::Ready {
            delay: 0,
            first_valid_frame: 3,
            ..
        }
    ));
}

// ── Running against an engine ────────────────────────────────────

#[test]
fn run_discovers_the_decoder_delay() {
    let index = gop_index(20, 5);
    let mut engine = ScriptedEngine::new(20, 3);
    let mut materializer = StampMaterializer::new();

    let report = StartupProber::new(20, 3)
        .run(&mut engine, &mut materializer, &index)
        .expect("Probe failed");

    assert_eq!(report.delay, 3);
    assert_eq!(report.first_valid_frame, 1);
    assert_eq!(report.attempts, 4);
    assert_eq!(stamp_of(&report.first_frame), 1);
    assert_eq!(engine.seeks.len(), 1);
    assert_eq!(engine.seeks[0].frame, 1);
}

#[test]
fn run_without_random_access_point_for_frame_one_reads_from_the_start() {
    let index = index_with_random_access_points(10, |frame| frame == 5);
    let mut engine = ScriptedEngine::new(10, 1);
    let mut materializer = StampMaterializer::new();

    let report = StartupProber::new(10, 1)
        .run(&mut engine, &mut materializer, &index)
        .expect("Probe failed");

    assert!(engine.seeks.is_empty());
    assert_eq!(report.first_valid_frame, 1);
}

#[test]
fn run_skips_pictures_that_fail_to_materialize() {
    let index = gop_index(10, 5);
    let mut engine = ScriptedEngine::new(10, 0);
    let mut materializer = StampMaterializer::new().with_failing_frame(1);

    let report = StartupProber::new(10, 0)
        .run(&mut engine, &mut materializer, &index)
        .expect("Probe failed");

    assert_eq!(report.first_valid_frame, 2);
    assert_eq!(stamp_of(&report.first_frame), 2);
    assert_eq!(materializer.calls, 2);
}

#[test]
fn run_fails_when_nothing_decodes() {
    let index = gop_index(3, 3);
    let mut engine = ScriptedEngine::new(3, 0)
        .with_dropped_picture(1)
        .with_dropped_picture(2)
        .with_dropped_picture(3);
    let mut materializer = StampMaterializer::new();

    let error = StartupProber::new(3, 0)
        .run(&mut engine, &mut materializer, &index)
        .unwrap_err();
    assert!(matches!(error, SourceError::Setup(_)));
    assert!(error.is_setup_error());
}

#[test]
fn run_fails_when_the_first_seek_overshoots() {
    let index = gop_index(10, 5);
    let mut engine = ScriptedEngine::new(10, 1).with_overshooting_seek(1);
    let mut materializer = StampMaterializer::new();

    let error = StartupProber::new(10, 1)
        .run(&mut engine, &mut materializer, &index)
        .unwrap_err();
    assert!(matches!(error, SourceError::Setup(_)));
    assert_eq!(materializer.calls, 0);
}

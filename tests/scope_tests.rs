//! End-to-end tests for the scope controller on a headless target.
//!
//! Tests return early when no GPU adapter is available.


use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use phobz_scope::audio::{AudioError, CaptureKind};
use phobz_scope::{
    AudioInput, CaptureSource, FrameLoop, Lifecycle, LiveMode, LoadJob, ManualClock,
    OptionsPatch, Scope, ScopeCallbacks, ScopeConfig, ScopeError, StereoBuffer, Tick,
};
use scope_fixtures::*;

/// Tick until the lifecycle leaves `Loading` or five seconds pass.
fn tick_until_loaded(scope: &Scope) -> Tick {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let tick = scope.tick();
        if tick == Tick::Stopped || !scope.lifecycle().is_loading() {
            return tick;
        }
        assert!(Instant::now() < deadline, "audio never finished loading");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let inner = Rc::clone(&count);
    (count, move || inner.set(inner.get() + 1))
}

#[tokio::test]
async fn test_decoded_input_is_ready_immediately() {
    let clock = ManualClock::new();
    let (ready, on_ready) = counter();
    let Some(scope) = headless(
        circle_input(&clock),
        small_config(),
        ScopeCallbacks::new().on_ready(on_ready),
    )
    .await
    else {
        return;
    };
    assert_eq!(scope.lifecycle(), Lifecycle::Ready);
    assert_eq!(ready.get(), 1);
    assert_eq!(scope.tick(), Tick::Continue);
    assert_eq!(scope.segment_counts(), vec![1023]);
    assert_eq!(ready.get(), 1);
}

#[tokio::test]
async fn test_trace_lands_on_the_circle() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    scope.tick();
    let pixels = scope.read_pixels().unwrap();
    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);

    // The circle's center stays at the background color
    assert_eq!(&pixel(&pixels, SIZE / 2, SIZE / 2)[..3], &[0, 0, 0]);

    // Green dominates with the default color
    assert!(channel_sum(&pixels, 1) > 0);
    assert!(channel_sum(&pixels, 1) > channel_sum(&pixels, 0));
}

#[tokio::test]
async fn test_update_applies_from_next_frame() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };

    // The newest samples sit on the right, the oldest have faded out
    scope.tick();
    let plain = scope.read_pixels().unwrap();
    let half_sums = |pixels: &[u8]| {
        let mut sums = (0u64, 0u64);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let g = pixel(pixels, x, y)[1] as u64;
                if x < SIZE / 2 {
                    sums.0 += g;
                } else {
                    sums.1 += g;
                }
            }
        }
        sums
    };
    let (left, right) = half_sums(&plain);
    assert!(right > left);

    let patch = OptionsPatch::from_json(r#"{"invert": true}"#).unwrap();
    scope.update(&patch).unwrap();
    assert!(scope.config().unwrap().invert);
    scope.tick();
    let inverted = scope.read_pixels().unwrap();
    let (left, right) = half_sums(&inverted);
    assert!(left > right);
}

#[tokio::test]
async fn test_background_patch() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    let patch = OptionsPatch {
        background: Some("#ff0000".parse().unwrap()),
        ..Default::default()
    };
    scope.update(&patch).unwrap();
    scope.tick();
    let pixels = scope.read_pixels().unwrap();
    assert_eq!(&pixel(&pixels, SIZE / 2, SIZE / 2)[..3], &[255, 0, 0]);
}

#[tokio::test]
async fn test_bloom_only_adds_light() {
    let clock = ManualClock::new();
    let Some(plain_scope) =
        headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    let bloom_config = ScopeConfig {
        bloom: true,
        ..small_config()
    };
    let Some(bloom_scope) = headless(circle_input(&clock), bloom_config, ScopeCallbacks::new()).await
    else {
        return;
    };

    plain_scope.tick();
    bloom_scope.tick();
    let plain = plain_scope.read_pixels().unwrap();
    let bloom = bloom_scope.read_pixels().unwrap();

    for (i, (p, b)) in plain.iter().zip(&bloom).enumerate() {
        assert!(*b as i32 >= *p as i32 - 2, "byte {i}: bloom {b} < plain {p}");
    }
    assert!(channel_sum(&bloom, 1) > channel_sum(&plain, 1));
}

#[tokio::test]
async fn test_sweep_with_swap_draws_two_traces() {
    let clock = ManualClock::new();
    let config = ScopeConfig {
        sweep: true,
        ..small_config()
    };
    let Some(scope) = headless(circle_input(&clock), config, ScopeCallbacks::new()).await else {
        return;
    };
    scope.tick();
    assert_eq!(scope.segment_counts(), vec![1023]);

    scope.update(&OptionsPatch {
        swap: Some(true),
        ..Default::default()
    })
    .unwrap();
    scope.tick();
    assert_eq!(scope.segment_counts(), vec![1023, 1023]);

    scope.update(&OptionsPatch {
        sweep: Some(false),
        ..Default::default()
    })
    .unwrap();
    scope.tick();
    assert_eq!(scope.segment_counts(), vec![1023]);
}

#[tokio::test]
async fn test_window_shrinks_at_end_of_audio() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    // 8000 frames; 125 remain after 63/64 s
    clock.set(63.0 / 64.0);
    scope.tick();
    assert_eq!(scope.segment_counts(), vec![124]);

    clock.set(2.0);
    assert_eq!(scope.tick(), Tick::Continue);
    assert_eq!(scope.segment_counts(), vec![0]);
}

#[tokio::test]
async fn test_destroy_is_idempotent_and_stops_ticks() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    let task = scope.task();
    assert_eq!(task.tick(), Tick::Continue);

    assert!(scope.destroy().is_none());
    assert!(!scope.is_alive());
    assert_eq!(scope.lifecycle(), Lifecycle::Destroyed);
    assert_eq!(scope.tick(), Tick::Stopped);
    assert_eq!(task.tick(), Tick::Stopped);
    assert!(scope.destroy().is_none());

    assert!(matches!(scope.read_pixels(), Err(ScopeError::Destroyed)));
    assert!(matches!(
        scope.update(&OptionsPatch::default()),
        Err(ScopeError::Destroyed)
    ));

    drop(scope);
    assert!(task.is_cancelled());
}

#[tokio::test]
async fn test_frame_loop_drives_scope() {
    let clock = ManualClock::new();
    let Some(scope) = headless(circle_input(&clock), small_config(), ScopeCallbacks::new()).await
    else {
        return;
    };
    assert_eq!(scope.run(&FrameLoop::new(1000.0), Some(3)), 3);
    scope.destroy();
    assert_eq!(scope.run(&FrameLoop::new(1000.0), Some(3)), 0);
}

#[tokio::test]
async fn test_job_progress_then_ready() {
    let (release, wait) = mpsc::channel::<()>();
    let job = LoadJob::spawn("gated", move |progress| {
        progress.set_total(Some(10));
        progress.advance(5);
        let _ = wait.recv();
        progress.advance(5);
        Ok(StereoBuffer::new(vec![0.1; 2048], vec![-0.1; 2048], 8000))
    })
    .unwrap();
    let (ready, on_ready) = counter();
    let input = AudioInput::Job {
        job,
        clock: Box::new(ManualClock::new()),
    };
    let Some(scope) = headless(input, small_config(), ScopeCallbacks::new().on_ready(on_ready)).await
    else {
        return;
    };
    assert!(scope.lifecycle().is_loading());
    assert_eq!(ready.get(), 0);

    // Wait for the worker to report half of the bytes
    let deadline = Instant::now() + Duration::from_secs(5);
    while scope.lifecycle() != (Lifecycle::Loading { progress: 0.5 }) {
        assert_eq!(scope.tick(), Tick::Continue);
        assert!(Instant::now() < deadline, "progress never reached 50%");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(scope.segment_counts().is_empty());

    release.send(()).unwrap();
    assert_eq!(tick_until_loaded(&scope), Tick::Continue);
    assert_eq!(scope.lifecycle(), Lifecycle::Ready);
    assert_eq!(ready.get(), 1);
    assert_eq!(scope.segment_counts(), vec![1023]);
}

#[tokio::test]
async fn test_failed_job_reports_once() {
    let job = LoadJob::spawn("broken", |_| Err(AudioError::NoAudioTrack)).unwrap();
    let errors = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&errors);
    let input = AudioInput::Job {
        job,
        clock: Box::new(ManualClock::new()),
    };
    let Some(scope) = headless(
        input,
        small_config(),
        ScopeCallbacks::new().on_error(move |message| sink.borrow_mut().push(message.to_string())),
    )
    .await
    else {
        return;
    };

    assert_eq!(tick_until_loaded(&scope), Tick::Stopped);
    assert!(matches!(scope.lifecycle(), Lifecycle::Failed(ref m) if m.contains("No audio track")));
    assert_eq!(scope.tick(), Tick::Stopped);
    assert_eq!(errors.borrow().len(), 1);

    assert!(scope.destroy().is_none());
    assert_eq!(scope.lifecycle(), Lifecycle::Destroyed);
}

#[tokio::test]
async fn test_wav_file_loads_and_draws() {
    let dir = tempfile::tempdir().unwrap();
    for channels in [1, 2] {
        let path = dir.path().join(format!("tone_{channels}.wav"));
        write_wav(&path, channels, 8000, 4000);
        let input = AudioInput::File {
            path,
            clock: Box::new(ManualClock::new()),
        };
        let Some(scope) = headless(input, small_config(), ScopeCallbacks::new()).await else {
            return;
        };
        assert_eq!(tick_until_loaded(&scope), Tick::Continue);
        assert_eq!(scope.lifecycle(), Lifecycle::Ready, "{channels} channels");
        scope.tick();
        assert_eq!(scope.segment_counts(), vec![1023]);
    }
}

#[tokio::test]
async fn test_missing_file_fails() {
    let input = AudioInput::File {
        path: "/nonexistent/track.wav".into(),
        clock: Box::new(ManualClock::new()),
    };
    let Some(scope) = headless(input, small_config(), ScopeCallbacks::new()).await else {
        return;
    };
    assert_eq!(tick_until_loaded(&scope), Tick::Stopped);
    assert!(matches!(scope.lifecycle(), Lifecycle::Failed(_)));
}

#[tokio::test]
async fn test_invalid_config_reports_error() {
    let errors = Rc::new(Cell::new(0));
    let sink = Rc::clone(&errors);
    let config = ScopeConfig {
        samples: 1,
        ..Default::default()
    };
    let clock = ManualClock::new();
    let result = Scope::new(
        phobz_scope::TargetSpec::headless(SIZE, SIZE),
        circle_input(&clock),
        config,
        ScopeCallbacks::new().on_error(move |_| sink.set(sink.get() + 1)),
    )
    .await;
    assert!(matches!(result, Err(ScopeError::Config(_))));
    assert_eq!(errors.get(), 1);
}

#[tokio::test]
async fn test_live_capture_handoff() {
    let platform = RecordingPlatform::default();
    let config = ScopeConfig {
        samples: 256,
        ..Default::default()
    };
    let input = AudioInput::Live {
        source: CaptureSource::new(1, "player"),
        platform: Box::new(platform.clone()),
    };
    let Some(scope) = headless(input, config.clone(), ScopeCallbacks::new()).await else {
        return;
    };
    assert_eq!(scope.lifecycle(), Lifecycle::Ready);
    assert_eq!(*platform.kind.lock().unwrap(), Some(CaptureKind::Streaming));

    let left: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin()).collect();
    let right: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).cos()).collect();
    platform.push(&left, &right);
    assert_eq!(scope.tick(), Tick::Continue);
    assert_eq!(scope.segment_counts(), vec![255]);

    let source = scope.destroy().expect("live source handed back");
    assert_eq!(source.id(), 1);
    assert!(scope.destroy().is_none());
    assert_eq!(platform.events(), ["attach 1 gain=true", "detach 1"]);

    // The same source feeds the next scope
    let next_platform = RecordingPlatform::with_analyser();
    let input = AudioInput::Live {
        source,
        platform: Box::new(next_platform.clone()),
    };
    let Some(next) = headless(input, config, ScopeCallbacks::new()).await else {
        return;
    };
    assert_eq!(*next_platform.kind.lock().unwrap(), Some(CaptureKind::Analyser));
    assert_eq!(next_platform.events(), ["attach 1 gain=false"]);
    drop(next);
    assert_eq!(
        next_platform.events(),
        ["attach 1 gain=false", "detach 1"]
    );
}

#[tokio::test]
async fn test_explicit_streaming_mode_on_analyser_platform() {
    let platform = RecordingPlatform::with_analyser();
    let config = ScopeConfig {
        samples: 256,
        live: LiveMode::Streaming,
        ..Default::default()
    };
    let input = AudioInput::Live {
        source: CaptureSource::new(9, "mic"),
        platform: Box::new(platform.clone()),
    };
    let Some(_scope) = headless(input, config, ScopeCallbacks::new()).await else {
        return;
    };
    assert_eq!(*platform.kind.lock().unwrap(), Some(CaptureKind::Streaming));
}

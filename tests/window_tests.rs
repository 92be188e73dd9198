//! Integration tests for sample window extraction and routing.

use std::sync::Arc;

use phobz_scope::audio::{generate_circle, CaptureFeed, CaptureKind, StereoBuffer};
use phobz_scope::scope::{
    window_start, RoutedWindow, Routing, SweepRamp, WindowExtractor, WindowSource,
    DEFAULT_LOOKBACK,
};

/// Two 1 Hz channels (sine and cosine) at 48 samples per second.
fn slow_circle() -> StereoBuffer {
    generate_circle(1.0, 48, 4.0, 1.0)
}

#[test]
fn test_first_pair_at_position_zero() {
    let buffer = slow_circle();
    let mut extractor = WindowExtractor::new(64, DEFAULT_LOOKBACK);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 0.0,
    });
    assert_eq!(window.len(), 64);
    assert_eq!(window.left[0], buffer.left[0]);
    assert_eq!(window.right[0], buffer.right[0]);
    assert!((window.right[0] - 1.0).abs() < 1e-6, "cosine starts at 1");
}

#[test]
fn test_window_follows_playback_position() {
    let buffer = slow_circle();
    let mut extractor = WindowExtractor::new(16, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 1.0,
    });
    assert_eq!(window.left[0], buffer.left[48]);
    assert_eq!(window.right[15], buffer.right[63]);
}

#[test]
fn test_window_shortens_near_end() {
    let buffer = slow_circle();
    let total = buffer.len();
    let mut extractor = WindowExtractor::new(64, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 3.5,
    });
    assert_eq!(window.len(), total - 168);

    let past_end = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 100.0,
    });
    assert!(past_end.is_empty());
}

#[test]
fn test_lookback_never_goes_negative() {
    for position in [0.0, 0.001, 1.0 / 240.0, 1.0 / 120.0] {
        assert_eq!(window_start(position, 48_000, DEFAULT_LOOKBACK), 0);
    }
}

#[test]
fn test_swap_twice_is_identity() {
    let buffer = slow_circle();
    let mut extractor = WindowExtractor::new(32, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 0.5,
    });

    let plain = RoutedWindow::route(window, Routing::default(), &[]);
    let swapped = RoutedWindow::route(
        window,
        Routing {
            swap: true,
            sweep: false,
        },
        &[],
    );
    assert_eq!(swapped.primary.x, plain.primary.y);
    assert_eq!(swapped.primary.y, plain.primary.x);

    // Toggling swap back reproduces the original assignment
    let restored = RoutedWindow::route(window, Routing::default(), &[]);
    assert_eq!(restored.primary.x, plain.primary.x);
    assert_eq!(restored.primary.y, plain.primary.y);
    assert!(restored.secondary.is_none());
}

#[test]
fn test_sweep_ramp_properties() {
    let mut ramp = SweepRamp::new();
    for len in [2usize, 3, 7, 100, 4096] {
        let values = ramp.for_len(len).to_vec();
        assert_eq!(values.len(), len);
        assert_eq!(values[0], -1.0);
        assert_eq!(values[len - 1], 1.0);
        assert!(values.windows(2).all(|pair| pair[1] > pair[0]), "ramp of {len} not increasing");
    }
    assert!(ramp.for_len(0).is_empty());
}

#[test]
fn test_sweep_plots_left_against_ramp() {
    let buffer = slow_circle();
    let mut extractor = WindowExtractor::new(48, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 0.0,
    });
    let mut ramp = SweepRamp::new();
    let ramp = ramp.for_len(window.len());
    let routed = RoutedWindow::route(
        window,
        Routing {
            swap: false,
            sweep: true,
        },
        ramp,
    );
    let traces: Vec<_> = routed.traces().collect();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].x, ramp);
    assert_eq!(traces[0].y, window.left);
}

#[test]
fn test_sweep_with_swap_draws_both_channels() {
    let buffer = slow_circle();
    let mut extractor = WindowExtractor::new(48, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 0.0,
    });
    let mut ramp = SweepRamp::new();
    let ramp = ramp.for_len(window.len());
    let routed = RoutedWindow::route(
        window,
        Routing {
            swap: true,
            sweep: true,
        },
        ramp,
    );
    let traces: Vec<_> = routed.traces().collect();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].x, ramp);
    assert_eq!(traces[0].y, window.left);
    assert_eq!(traces[1].x, ramp);
    assert_eq!(traces[1].y, window.right);
}

#[test]
fn test_unequal_channels_use_shorter_length() {
    let buffer = StereoBuffer {
        left: vec![0.5; 10],
        right: vec![-0.5; 6],
        sample_rate: 4,
    };
    assert_eq!(buffer.len(), 6);

    let mut extractor = WindowExtractor::new(8, 0.0);
    let window = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 0.5,
    });
    assert_eq!(window.left, &[0.5; 4]);
    assert_eq!(window.right, &[-0.5; 4]);

    let past_right = extractor.extract(WindowSource::Buffer {
        buffer: &buffer,
        position: 2.0,
    });
    assert!(past_right.is_empty());
}

#[test]
fn test_live_window_reads_latest_samples() {
    for kind in [CaptureKind::Analyser, CaptureKind::Streaming] {
        let feed: Arc<dyn CaptureFeed> = kind.create_feed(8);
        let left: Vec<f32> = (0..12).map(|i| i as f32).collect();
        let right: Vec<f32> = left.iter().map(|v| -v).collect();
        feed.push_block(&left, &right);

        let mut extractor = WindowExtractor::new(4, DEFAULT_LOOKBACK);
        let window = extractor.extract(WindowSource::Live(feed.as_ref()));
        assert_eq!(window.left, &[8.0, 9.0, 10.0, 11.0], "{kind:?}");
        assert_eq!(window.right, &[-8.0, -9.0, -10.0, -11.0], "{kind:?}");

        // Snapshots are non-destructive
        let again = extractor.extract(WindowSource::Live(feed.as_ref()));
        assert_eq!(again.left, &[8.0, 9.0, 10.0, 11.0], "{kind:?}");
    }
}

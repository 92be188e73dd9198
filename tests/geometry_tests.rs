//! Integration tests for segment quad geometry.

use phobz_scope::scope::segments::{direction, expand_corner};
use phobz_scope::scope::{
    corner_indices, quad_indices, segment_count, Corner, SegmentGeometry, SegmentVertex,
};

fn approx(a: [f32; 2], b: [f32; 2]) -> bool {
    (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5
}

#[test]
fn test_segment_count_for_window_lengths() {
    assert_eq!(segment_count(0), 0);
    assert_eq!(segment_count(1), 0);
    for len in 2..=64 {
        assert_eq!(segment_count(len), len - 1);
    }
}

#[test]
fn test_static_buffers_cover_capacity() {
    let segments = 4095;
    let corners = corner_indices(segments);
    let indices = quad_indices(segments);
    assert_eq!(corners.len(), segments * 4);
    assert_eq!(indices.len(), segments * 6);
    assert_eq!(*corners.last().unwrap(), (segments * 4 - 1) as u32);
    assert!(indices.iter().all(|&i| (i as usize) < corners.len()));

    // Every quad only references its own four corners
    for (segment, quad) in indices.chunks(6).enumerate() {
        assert!(quad.iter().all(|&i| Corner::decode(i).segment == segment as u32));
    }
}

#[test]
fn test_corners_span_both_ends_and_sides() {
    let corners: Vec<_> = (0..4).map(Corner::decode).collect();
    let mut flags: Vec<_> = corners.iter().map(|c| (c.tangent as i32, c.side as i32)).collect();
    flags.sort_unstable();
    assert_eq!(flags, vec![(-1, -1), (-1, 1), (1, -1), (1, 1)]);
}

#[test]
fn test_empty_and_single_sample_windows_draw_nothing() {
    let mut geometry = SegmentGeometry::new(16);
    assert_eq!(geometry.build(&[], &[]), 0);
    assert!(geometry.vertices().is_empty());
    assert_eq!(geometry.build(&[0.3], &[0.3]), 0);
    assert_eq!(geometry.index_count(), 0);
}

#[test]
fn test_build_truncates_to_capacity() {
    let mut geometry = SegmentGeometry::new(4);
    assert_eq!(geometry.capacity(), 3);
    let x = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5];
    let y = [0.0; 6];
    assert_eq!(geometry.build(&x, &y), 3);
    assert_eq!(geometry.index_count(), 18);
    assert_eq!(geometry.vertices().len(), 12);
}

#[test]
fn test_mismatched_axes_use_shorter_length() {
    let mut geometry = SegmentGeometry::new(16);
    assert_eq!(geometry.build(&[0.0, 0.1, 0.2, 0.3], &[0.0, 0.1]), 1);
}

#[test]
fn test_degenerate_segment_points_along_x() {
    let (dir, len) = direction([0.25, -0.5], [0.25, -0.5]);
    assert_eq!(dir, [1.0, 0.0]);
    assert_eq!(len, 0.0);

    let (dir, len) = direction([0.0, 0.0], [0.0, 2.0]);
    assert!(approx(dir, [0.0, 1.0]));
    assert!((len - 2.0).abs() < 1e-6);
}

#[test]
fn test_quad_extends_half_width_past_endpoints() {
    let vertex = SegmentVertex {
        start: [0.0, 0.0],
        end: [1.0, 0.0],
    };
    let w = 0.1;
    assert!(approx(expand_corner(&vertex, 0, w, false), [-0.1, -0.1]));
    assert!(approx(expand_corner(&vertex, 1, w, false), [-0.1, 0.1]));
    assert!(approx(expand_corner(&vertex, 2, w, false), [1.1, -0.1]));
    assert!(approx(expand_corner(&vertex, 3, w, false), [1.1, 0.1]));

    // Inversion mirrors through the origin
    assert!(approx(expand_corner(&vertex, 3, w, true), [-1.1, -0.1]));
}

#[test]
fn test_degenerate_quad_is_square_around_point() {
    let vertex = SegmentVertex {
        start: [0.5, 0.5],
        end: [0.5, 0.5],
    };
    let w = 0.05;
    let corners: Vec<_> = (0..4).map(|c| expand_corner(&vertex, c, w, false)).collect();
    assert!(approx(corners[0], [0.45, 0.45]));
    assert!(approx(corners[3], [0.55, 0.55]));
}

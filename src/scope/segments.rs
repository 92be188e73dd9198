//! Segment geometry for the beam renderer.
//!
//! Every pair of consecutive window samples becomes one segment, drawn as a
//! quad of four vertices that all carry the same `(start, end)` record. The
//! vertex stage tells the corners apart through a static corner attribute
//! (the global vertex number), so only the endpoint data changes per frame.

use super::beam::SEGMENT_EPSILON;

pub const VERTICES_PER_SEGMENT: usize = 4;
pub const INDICES_PER_SEGMENT: usize = 6;

/// Per-vertex segment record, replicated across the quad's four corners.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SegmentVertex {
    pub start: [f32; 2],
    pub end: [f32; 2],
}

/// Number of segments drawn for a window of `len` samples.
#[inline]
pub fn segment_count(len: usize) -> usize {
    len.saturating_sub(1)
}

/// Static corner attribute for `max_segments` quads.
pub fn corner_indices(max_segments: usize) -> Vec<u32> {
    (0..(max_segments * VERTICES_PER_SEGMENT) as u32).collect()
}

/// Static index buffer mapping each quad to two triangles.
pub fn quad_indices(max_segments: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(max_segments * INDICES_PER_SEGMENT);
    for segment in 0..max_segments as u32 {
        let base = segment * VERTICES_PER_SEGMENT as u32;
        indices.extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
    }
    indices
}

/// Corner flags decoded from the corner attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Segment this corner belongs to.
    pub segment: u32,
    /// -1 at the segment start, +1 at its end.
    pub tangent: f32,
    /// -1 or +1 across the segment.
    pub side: f32,
}

impl Corner {
    pub fn decode(corner: u32) -> Self {
        let idx = corner % VERTICES_PER_SEGMENT as u32;
        Self {
            segment: corner / VERTICES_PER_SEGMENT as u32,
            tangent: if idx >= 2 { 1.0 } else { -1.0 },
            side: ((idx % 2) as f32 - 0.5) * 2.0,
        }
    }
}

/// Unit direction and length of a segment. Degenerate segments point along +x.
pub fn direction(start: [f32; 2], end: [f32; 2]) -> ([f32; 2], f32) {
    let d = [end[0] - start[0], end[1] - start[1]];
    let len = (d[0] * d[0] + d[1] * d[1]).sqrt();
    if len > SEGMENT_EPSILON {
        ([d[0] / len, d[1] / len], len)
    } else {
        ([1.0, 0.0], len)
    }
}

/// Clip-space position of one quad corner, as computed by the vertex stage.
pub fn expand_corner(vertex: &SegmentVertex, corner: u32, half_width: f32, invert: bool) -> [f32; 2] {
    let c = Corner::decode(corner);
    let current = if c.tangent > 0.0 { vertex.end } else { vertex.start };
    let (dir, _) = direction(vertex.start, vertex.end);
    let norm = [-dir[1], dir[0]];
    let flip = if invert { -1.0 } else { 1.0 };
    [
        (current[0] + (c.tangent * dir[0] + c.side * norm[0]) * half_width) * flip,
        (current[1] + (c.tangent * dir[1] + c.side * norm[1]) * half_width) * flip,
    ]
}

/// CPU-side segment buffer for one trace, sized for the maximum window.
#[derive(Debug, Clone)]
pub struct SegmentGeometry {
    capacity: usize,
    count: usize,
    vertices: Vec<SegmentVertex>,
}

impl SegmentGeometry {
    /// Create geometry for windows of at most `max_len` samples.
    pub fn new(max_len: usize) -> Self {
        let capacity = segment_count(max_len);
        Self {
            capacity,
            count: 0,
            vertices: Vec::with_capacity(capacity * VERTICES_PER_SEGMENT),
        }
    }

    /// Rebuild the quads from routed axis data and return the segment count.
    pub fn build(&mut self, x: &[f32], y: &[f32]) -> usize {
        let len = x.len().min(y.len());
        self.count = segment_count(len).min(self.capacity);
        self.vertices.clear();
        for i in 0..self.count {
            let record = SegmentVertex {
                start: [x[i], y[i]],
                end: [x[i + 1], y[i + 1]],
            };
            self.vertices.extend_from_slice(&[record; VERTICES_PER_SEGMENT]);
        }
        self.count
    }

    pub fn vertices(&self) -> &[SegmentVertex] {
        &self.vertices
    }

    pub fn segment_count(&self) -> usize {
        self.count
    }

    /// Indices to draw from the static index buffer.
    pub fn index_count(&self) -> u32 {
        (self.count * INDICES_PER_SEGMENT) as u32
    }

    /// Maximum number of segments.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Synthetic stereo signals for tests, benches and demos.
//!
//! Lissajous figures are the natural test pattern for an X-Y scope: a circle
//! is a sine on one channel and a cosine on the other.

use std::f32::consts::PI;

use super::source::StereoBuffer;

/// Generate a sine wave.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Amplitude (0.0 to 1.0)
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    generate_phased_sine(frequency, 0.0, sample_rate, duration, amplitude)
}

fn generate_phased_sine(
    frequency: f32,
    phase: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t + phase).sin()
        })
        .collect()
}

/// Generate a Lissajous figure: `sin(2π fx t)` on the left channel and
/// `sin(2π fy t + phase)` on the right.
pub fn generate_lissajous(
    freq_x: f32,
    freq_y: f32,
    phase: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> StereoBuffer {
    StereoBuffer::new(
        generate_sine(freq_x, sample_rate, duration, amplitude),
        generate_phased_sine(freq_y, phase, sample_rate, duration, amplitude),
        sample_rate,
    )
}

/// Generate a circle: sine on the left channel, cosine on the right.
pub fn generate_circle(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> StereoBuffer {
    generate_lissajous(frequency, frequency, PI / 2.0, sample_rate, duration, amplitude)
}

/// Generate white noise on both channels with independent streams.
///
/// Uses a simple linear congruential generator for reproducibility.
pub fn generate_white_noise(sample_rate: u32, duration: f32, amplitude: f32, seed: u64) -> StereoBuffer {
    let num_samples = (duration * sample_rate as f32) as usize;

    let mut state = seed;
    let a: u64 = 6364136223846793005;
    let c: u64 = 1442695040888963407;
    let mut next = move || {
        state = state.wrapping_mul(a).wrapping_add(c);
        amplitude * ((state as f32 / u64::MAX as f32) * 2.0 - 1.0)
    };

    let mut left = Vec::with_capacity(num_samples);
    let mut right = Vec::with_capacity(num_samples);
    for _ in 0..num_samples {
        left.push(next());
        right.push(next());
    }
    StereoBuffer::new(left, right, sample_rate)
}

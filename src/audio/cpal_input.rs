//! Live capture from the default input device via cpal.

use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, Stream, StreamConfig,
};

use super::capture::CaptureFeed;
use super::platform::{
    AttachOptions, AudioPlatform, CaptureError, CaptureSource, PlatformCapabilities,
};

/// [`AudioPlatform`] backed by a cpal input stream.
///
/// Input capture does not sit in the output path, so detaching only stops the
/// stream and no gain stage is ever needed.
pub struct CpalPlatform {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl CpalPlatform {
    pub fn new() -> Result<Self, CaptureError> {
        Self::open().map_err(|e| CaptureError::Unavailable(format!("{e:#}")))
    }

    fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no audio input device found")?;
        let supported = device
            .default_input_config()
            .context("input device does not advertise a default format")?;
        Ok(Self {
            device,
            sample_format: supported.sample_format(),
            config: supported.config(),
            stream: None,
        })
    }

    /// Handle for the default input device.
    pub fn default_source(&self) -> CaptureSource {
        let name = self.device.name().unwrap_or_else(|_| "unknown".to_string());
        CaptureSource::new(0, name)
    }
}

impl AudioPlatform for CpalPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            analyser_snapshots: true,
            needs_gain_passthrough: false,
        }
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn attach(
        &mut self,
        source: &CaptureSource,
        feed: Arc<dyn CaptureFeed>,
        _options: AttachOptions,
    ) -> Result<(), CaptureError> {
        let stream = build_input_stream(&self.device, &self.config, self.sample_format, feed)
            .and_then(|stream| {
                stream.play().context("failed to start input stream")?;
                Ok(stream)
            })
            .map_err(|e| CaptureError::Attach(format!("{}: {e:#}", source.label())))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn detach(&mut self, _source: &CaptureSource) -> Result<(), CaptureError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| CaptureError::Detach(e.to_string()))?;
        }
        Ok(())
    }
}

/// Splits interleaved callback data into planar blocks for the feed.
struct Deinterleaver {
    channels: usize,
    left: Vec<f32>,
    right: Vec<f32>,
    feed: Arc<dyn CaptureFeed>,
}

impl Deinterleaver {
    fn push<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = f32>,
    {
        self.left.clear();
        self.right.clear();
        let mut channel = 0;
        let mut first = 0.0;
        for sample in samples {
            match channel {
                0 => first = sample,
                1 => {
                    self.left.push(first);
                    self.right.push(sample);
                }
                _ => {}
            }
            channel += 1;
            if channel == self.channels {
                if self.channels == 1 {
                    self.left.push(first);
                    self.right.push(first);
                }
                channel = 0;
            }
        }
        self.feed.push_block(&self.left, &self.right);
    }
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    feed: Arc<dyn CaptureFeed>,
) -> Result<Stream> {
    let mut sink = Deinterleaver {
        channels: config.channels.max(1) as usize,
        left: Vec::new(),
        right: Vec::new(),
        feed,
    };
    let err_fn = |err: cpal::StreamError| log::warn!("Input stream error: {err}");

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _| sink.push(data.iter().copied()),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _| {
                let scale = i16::MAX as f32;
                sink.push(data.iter().map(|&sample| sample as f32 / scale));
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _| {
                let scale = u16::MAX as f32;
                sink.push(data.iter().map(|&sample| (sample as f32 / scale) * 2.0 - 1.0));
            },
            err_fn,
            None,
        )?,
        other => anyhow::bail!("unsupported input sample format: {other:?}"),
    };
    Ok(stream)
}

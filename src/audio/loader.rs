//! Audio decoding using Symphonia.
//!
//! Supports WAV, MP3, FLAC, AAC and Ogg Vorbis. Decoding can report byte
//! progress through a shared [`TransferProgress`] while the container is read.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use thiserror::Error;

use super::job::TransferProgress;

/// Errors that can occur while retrieving or decoding audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to decode audio: {0}")]
    ProbeError(#[from] symphonia::core::errors::Error),

    #[error("No audio track found in file")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    #[error("Audio request failed with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Audio transfer failed: {0}")]
    Transfer(String),
}

/// Audio data decoded from a container.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved audio samples (f32, normalized to -1.0..1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: usize,
}

impl AudioData {
    /// Duration of the audio in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }
}

/// Reader that records how far into the underlying source decoding has got.
pub struct ProgressReader<R> {
    inner: R,
    byte_len: Option<u64>,
    progress: Arc<TransferProgress>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, byte_len: Option<u64>, progress: Arc<TransferProgress>) -> Self {
        progress.set_total(byte_len);
        Self {
            inner,
            byte_len,
            progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.progress.advance(n as u64);
        Ok(n)
    }
}

impl<R: Seek> Seek for ProgressReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let position = self.inner.seek(pos)?;
        self.progress.reached(position);
        Ok(position)
    }
}

impl<R: Read + Seek + Send + Sync> MediaSource for ProgressReader<R> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }
}

/// Load audio from a file path.
///
/// The audio is decoded to interleaved f32 samples normalized to -1.0..1.0.
///
/// # Example
///
/// ```no_run
/// use phobz_scope::audio::loader::load_audio;
/// use std::path::Path;
///
/// let audio = load_audio(Path::new("song.flac")).unwrap();
/// println!("Duration: {:.2}s", audio.duration());
/// println!("Sample rate: {}Hz", audio.sample_rate);
/// ```
pub fn load_audio(path: &Path) -> Result<AudioData, AudioError> {
    load_audio_with_progress(path, &Arc::new(TransferProgress::new()))
}

/// Load audio from a file path, reporting bytes consumed to `progress`.
pub fn load_audio_with_progress(
    path: &Path,
    progress: &Arc<TransferProgress>,
) -> Result<AudioData, AudioError> {
    let file = File::open(path)?;
    let byte_len = file.metadata().ok().map(|m| m.len());
    let reader = ProgressReader::new(file, byte_len, Arc::clone(progress));

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_media(Box::new(reader), &hint)
}

/// Decode an in-memory container, e.g. a downloaded file.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioData, AudioError> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    decode_media(Box::new(Cursor::new(bytes)), &hint)
}

/// Decode every packet of the first audio track in `source`.
pub fn decode_media(source: Box<dyn MediaSource>, hint: &Hint) -> Result<AudioData, AudioError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe().format(
        hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::UnknownSampleRate)?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped, the rest of the stream is still usable
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(capacity, spec));
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

//! Background audio loading with byte progress.
//!
//! A [`LoadJob`] retrieves and decodes audio on a worker thread while the
//! frame loop keeps drawing the progress bar. The frame loop polls the job
//! once per tick and never blocks on it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::loader::{load_audio_with_progress, AudioError};
use super::source::StereoBuffer;

/// `total` before the size has been reported.
const TOTAL_PENDING: u64 = u64::MAX;

/// Byte progress of a transfer, shared between the worker and the frame loop.
#[derive(Debug)]
pub struct TransferProgress {
    loaded: AtomicU64,
    /// Expected size, 0 when unknown, [`TOTAL_PENDING`] until reported.
    total: AtomicU64,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self {
            loaded: AtomicU64::new(0),
            total: AtomicU64::new(TOTAL_PENDING),
        }
    }
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected size in bytes, if known.
    pub fn set_total(&self, total: Option<u64>) {
        let total = total.map_or(0, |bytes| bytes.min(TOTAL_PENDING - 1));
        self.total.store(total, Ordering::Relaxed);
    }

    /// Record `bytes` more bytes transferred.
    pub fn advance(&self, bytes: u64) {
        self.loaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record that the transfer has reached byte offset `position`.
    pub fn reached(&self, position: u64) {
        self.loaded.fetch_max(position, Ordering::Relaxed);
    }

    pub fn loaded(&self) -> u64 {
        self.loaded.load(Ordering::Relaxed)
    }

    /// Fraction in `0..=1`.
    ///
    /// 0.0 until the size is reported, then 1.0 if it turned out to be unknown.
    pub fn fraction(&self) -> f32 {
        match self.total.load(Ordering::Relaxed) {
            TOTAL_PENDING => 0.0,
            0 => 1.0,
            total => (self.loaded() as f64 / total as f64).min(1.0) as f32,
        }
    }
}

type LoadResult = Result<StereoBuffer, AudioError>;

/// Audio retrieval running on a worker thread.
pub struct LoadJob {
    progress: Arc<TransferProgress>,
    receiver: Receiver<LoadResult>,
    _worker: JoinHandle<()>,
}

impl LoadJob {
    /// Spawn a job running `load` on a worker thread.
    pub fn spawn<F>(name: &str, load: F) -> Result<Self, AudioError>
    where
        F: FnOnce(&Arc<TransferProgress>) -> LoadResult + Send + 'static,
    {
        let progress = Arc::new(TransferProgress::new());
        let (sender, receiver) = mpsc::channel();
        let worker_progress = Arc::clone(&progress);
        let worker = std::thread::Builder::new()
            .name(format!("scope-load-{name}"))
            .spawn(move || {
                let result = load(&worker_progress);
                // The scope may have been destroyed while loading
                let _ = sender.send(result);
            })?;
        Ok(Self {
            progress,
            receiver,
            _worker: worker,
        })
    }

    /// Decode a local file.
    pub fn file(path: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let path = path.into();
        log::info!("Loading audio from {}", path.display());
        Self::spawn("file", move |progress| {
            load_audio_with_progress(&path, progress).map(StereoBuffer::from)
        })
    }

    /// Download and decode a URL.
    #[cfg(feature = "http")]
    pub fn url(url: impl Into<String>) -> Result<Self, AudioError> {
        let url = url.into();
        log::info!("Fetching audio from {url}");
        Self::spawn("http", move |progress| {
            super::fetch::fetch_audio(&url, progress).map(StereoBuffer::from)
        })
    }

    /// Current progress fraction.
    pub fn progress(&self) -> f32 {
        self.progress.fraction()
    }

    /// Non-blocking check for the finished result.
    pub fn poll(&self) -> Option<LoadResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AudioError::Transfer(
                "loader thread exited without a result".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait(job: &LoadJob) -> LoadResult {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = job.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "load job timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_progress_starts_empty() {
        let progress = TransferProgress::new();
        assert_eq!(progress.fraction(), 0.0);
        progress.advance(1234);
        assert_eq!(progress.fraction(), 0.0);
    }

    #[test]
    fn test_unknown_total_reports_complete() {
        let progress = TransferProgress::new();
        progress.set_total(None);
        progress.advance(1234);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_empty_transfer_is_complete() {
        let progress = TransferProgress::new();
        progress.set_total(Some(0));
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_fraction_clamped() {
        let progress = TransferProgress::new();
        progress.set_total(Some(10));
        progress.advance(5);
        assert!((progress.fraction() - 0.5).abs() < 1e-6);
        progress.advance(50);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_job_delivers_result() {
        let job = LoadJob::spawn("test", |progress| {
            progress.set_total(Some(4));
            progress.advance(4);
            Ok(StereoBuffer::new(vec![0.0; 4], vec![0.0; 4], 48_000))
        })
        .unwrap();
        let buffer = wait(&job).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(job.progress(), 1.0);
    }

    #[test]
    fn test_missing_file_fails() {
        let job = LoadJob::file("/nonexistent/track.wav").unwrap();
        assert!(matches!(wait(&job), Err(AudioError::IoError(_))));
    }

    #[test]
    fn test_panicking_worker_reports_transfer_error() {
        let job = LoadJob::spawn("panic", |_| panic!("decoder crashed")).unwrap();
        assert!(matches!(wait(&job), Err(AudioError::Transfer(_))));
    }
}

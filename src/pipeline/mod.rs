//! Scope controller: ties the audio source, the sample window and the GPU
//! passes together and owns their lifetime.
//!
//! A [`Scope`] starts in [`Lifecycle::Loading`] while audio is retrieved and
//! draws a progress bar, then switches to [`Lifecycle::Ready`] and draws the
//! X/Y trace every frame. Fatal errors move it to [`Lifecycle::Failed`] and
//! are reported once through the error callback. [`Scope::destroy`] releases
//! everything and hands back a live capture source, if one was attached.

pub mod config;
pub mod error;
pub mod frame_loop;
pub mod state;

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use crate::audio::{
    AudioPlatform, CaptureKind, CaptureSource, LiveSession, LoadJob, PlaybackClock, StereoBuffer,
};
use crate::gpu::{LineStyle, ScopeRenderer, TargetSpec};
use crate::scope::{RoutedWindow, SweepRamp, Trace, WindowExtractor, WindowSource};

pub use config::{parse_hex_color, Color, ConfigError, LiveMode, OptionsPatch, ScopeConfig};
pub use error::ScopeError;
pub use frame_loop::{FrameLoop, FrameTask, Tick, Tickable};
pub use state::Lifecycle;

/// Audio feeding a scope.
pub enum AudioInput {
    /// Already decoded samples played back against `clock`.
    Decoded {
        buffer: StereoBuffer,
        clock: Box<dyn PlaybackClock>,
    },
    /// A local file decoded on a worker thread.
    File {
        path: PathBuf,
        clock: Box<dyn PlaybackClock>,
    },
    /// A remote file downloaded and decoded on a worker thread.
    #[cfg(feature = "http")]
    Url {
        url: String,
        clock: Box<dyn PlaybackClock>,
    },
    /// Any other background retrieval.
    Job {
        job: LoadJob,
        clock: Box<dyn PlaybackClock>,
    },
    /// A capture source tapped through the audio platform.
    Live {
        source: CaptureSource,
        platform: Box<dyn AudioPlatform>,
    },
}

/// Ready and error notifications.
#[derive(Default)]
pub struct ScopeCallbacks {
    on_ready: Option<Box<dyn Fn()>>,
    on_error: Option<Box<dyn Fn(&str)>>,
}

impl ScopeCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, callback: impl Fn() + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    fn ready(&self) {
        if let Some(callback) = &self.on_ready {
            callback();
        }
    }

    fn error(&self, message: &str) {
        log::error!("Scope failed: {message}");
        if let Some(callback) = &self.on_error {
            callback(message);
        }
    }
}

enum Source {
    Pending {
        job: LoadJob,
        clock: Box<dyn PlaybackClock>,
    },
    Decoded {
        buffer: StereoBuffer,
        clock: Box<dyn PlaybackClock>,
    },
    Live(LiveSession),
    /// Live capture detached after a fatal error, kept for `destroy`.
    Released(CaptureSource),
    Empty,
}

/// What a frame changed, reported after the state borrow ends.
enum FrameEvent {
    Drawn,
    BecameReady,
    Failed(String),
    Stopped,
}

struct ScopeState {
    config: ScopeConfig,
    renderer: ScopeRenderer,
    source: Source,
    extractor: WindowExtractor,
    ramp: SweepRamp,
    lifecycle: Lifecycle,
}

impl ScopeState {
    fn frame(&mut self) -> FrameEvent {
        if self.lifecycle.is_terminal() {
            return FrameEvent::Stopped;
        }

        let mut event = FrameEvent::Drawn;
        if let Source::Pending { job, .. } = &self.source {
            match job.poll() {
                None => {
                    let progress = job.progress();
                    self.lifecycle = Lifecycle::Loading { progress };
                    log::debug!("Loading audio: {:.0}%", progress * 100.0);
                    let drawn = self.renderer.draw_progress(
                        progress,
                        self.config.color.to_array(),
                        self.config.background.to_array(),
                    );
                    return match drawn {
                        Ok(_) => FrameEvent::Drawn,
                        Err(e) => self.fail(e.to_string()),
                    };
                }
                Some(Err(e)) => return self.fail(e.to_string()),
                Some(Ok(buffer)) => {
                    if let Source::Pending { clock, .. } =
                        std::mem::replace(&mut self.source, Source::Empty)
                    {
                        log::info!(
                            "Audio ready: {:.1}s at {} Hz",
                            buffer.duration(),
                            buffer.sample_rate
                        );
                        self.source = Source::Decoded { buffer, clock };
                        self.lifecycle = Lifecycle::Ready;
                        event = FrameEvent::BecameReady;
                    }
                }
            }
        }

        match self.draw_window() {
            Ok(()) => event,
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn draw_window(&mut self) -> Result<(), ScopeError> {
        let source = match &self.source {
            Source::Decoded { buffer, clock } => WindowSource::Buffer {
                buffer,
                position: clock.current_time(),
            },
            Source::Live(session) => WindowSource::Live(session.feed()),
            Source::Pending { .. } | Source::Released(_) | Source::Empty => return Ok(()),
        };
        let window = self.extractor.extract(source);
        let ramp = self.ramp.for_len(window.len());
        let routed = RoutedWindow::route(window, self.config.routing(), ramp);
        let styles = [self.config.primary_style(), self.config.secondary_style()];
        let traces: Vec<(Trace<'_>, LineStyle)> = routed.traces().zip(styles).collect();
        self.renderer.draw_traces(
            &traces,
            self.config.bloom,
            self.config.background.to_array(),
        )?;
        Ok(())
    }

    fn fail(&mut self, message: String) -> FrameEvent {
        self.lifecycle = Lifecycle::Failed(message.clone());
        if let Source::Live(session) = &mut self.source {
            if let Some(source) = session.release() {
                self.source = Source::Released(source);
            }
        }
        FrameEvent::Failed(message)
    }

    /// Release GPU resources and detach live capture.
    fn release(mut self) -> Option<CaptureSource> {
        self.renderer.release();
        match std::mem::replace(&mut self.source, Source::Empty) {
            Source::Live(mut session) => session.release(),
            Source::Released(source) => Some(source),
            _ => None,
        }
    }
}

struct ScopeShared {
    alive: Cell<bool>,
    state: RefCell<Option<ScopeState>>,
    callbacks: ScopeCallbacks,
}

impl Tickable for ScopeShared {
    fn tick(&self) -> Tick {
        if !self.alive.get() {
            return Tick::Stopped;
        }
        let event = {
            let Ok(mut guard) = self.state.try_borrow_mut() else {
                // Re-entered from a callback; the outer tick draws this frame
                return Tick::Continue;
            };
            match guard.as_mut() {
                Some(state) => state.frame(),
                None => FrameEvent::Stopped,
            }
        };

        match event {
            FrameEvent::Drawn => Tick::Continue,
            FrameEvent::BecameReady => {
                self.callbacks.ready();
                // The ready callback may have destroyed the scope
                if self.alive.get() {
                    Tick::Continue
                } else {
                    Tick::Stopped
                }
            }
            FrameEvent::Failed(message) => {
                self.callbacks.error(&message);
                Tick::Stopped
            }
            FrameEvent::Stopped => Tick::Stopped,
        }
    }
}

/// One running oscilloscope visualization.
pub struct Scope {
    shared: Rc<ScopeShared>,
}

impl Scope {
    /// Create the GPU resources and connect the audio input.
    ///
    /// Errors are returned and also reported through `on_error`. Decoded and
    /// live inputs are ready immediately; file and URL inputs start loading.
    pub async fn new(
        target: TargetSpec,
        input: AudioInput,
        config: ScopeConfig,
        callbacks: ScopeCallbacks,
    ) -> Result<Self, ScopeError> {
        match Self::build(target, input, config).await {
            Ok(state) => {
                let ready = state.lifecycle.is_ready();
                log::info!("Scope created ({})", state.lifecycle);
                let scope = Self {
                    shared: Rc::new(ScopeShared {
                        alive: Cell::new(true),
                        state: RefCell::new(Some(state)),
                        callbacks,
                    }),
                };
                if ready {
                    scope.shared.callbacks.ready();
                }
                Ok(scope)
            }
            Err(e) => {
                callbacks.error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Blocking variant of [`Scope::new`] for callers without an executor.
    pub fn new_blocking(
        target: TargetSpec,
        input: AudioInput,
        config: ScopeConfig,
        callbacks: ScopeCallbacks,
    ) -> Result<Self, ScopeError> {
        pollster::block_on(Self::new(target, input, config, callbacks))
    }

    async fn build(
        target: TargetSpec,
        input: AudioInput,
        config: ScopeConfig,
    ) -> Result<ScopeState, ScopeError> {
        config.validate()?;
        let live = matches!(input, AudioInput::Live { .. });
        if config.live.is_live() && !live {
            return Err(ScopeError::MissingCaptureSource(config.live.to_string()));
        }

        let renderer = ScopeRenderer::new(target, config.samples, config.color.to_array()).await?;

        let (source, lifecycle) = match input {
            AudioInput::Decoded { buffer, clock } => {
                (Source::Decoded { buffer, clock }, Lifecycle::Ready)
            }
            AudioInput::File { path, clock } => {
                let job = LoadJob::file(path)?;
                (Source::Pending { job, clock }, Lifecycle::Loading { progress: 0.0 })
            }
            #[cfg(feature = "http")]
            AudioInput::Url { url, clock } => {
                let job = LoadJob::url(url)?;
                (Source::Pending { job, clock }, Lifecycle::Loading { progress: 0.0 })
            }
            AudioInput::Job { job, clock } => {
                (Source::Pending { job, clock }, Lifecycle::Loading { progress: 0.0 })
            }
            AudioInput::Live { source, platform } => {
                let mode = if config.live.is_live() {
                    config.live
                } else {
                    LiveMode::Auto
                };
                let capabilities = platform.capabilities();
                let kind = CaptureKind::probe(mode, &capabilities).unwrap_or(CaptureKind::Streaming);
                let session = LiveSession::start(platform, source, kind, config.samples)?;
                (Source::Live(session), Lifecycle::Ready)
            }
        };

        Ok(ScopeState {
            extractor: WindowExtractor::new(config.samples, config.lookback),
            ramp: SweepRamp::new(),
            config,
            renderer,
            source,
            lifecycle,
        })
    }

    /// Draw one frame. After destroy or a fatal error this is a no-op
    /// returning [`Tick::Stopped`].
    pub fn tick(&self) -> Tick {
        self.shared.tick()
    }

    /// Weak handle for an external frame scheduler.
    pub fn task(&self) -> FrameTask {
        let target: Rc<dyn Tickable> = self.shared.clone();
        FrameTask::new(target)
    }

    /// Drive frames at `frame_loop`'s cadence until stopped or `max_frames` ran.
    pub fn run(&self, frame_loop: &FrameLoop, max_frames: Option<usize>) -> usize {
        frame_loop.run(&self.task(), max_frames)
    }

    /// Apply option changes from the next frame on. No GPU buffers are rebuilt.
    pub fn update(&self, patch: &OptionsPatch) -> Result<(), ScopeError> {
        self.with_state(|state| {
            state.config.apply(patch);
            log::debug!("Options updated: {patch:?}");
        })
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<(), ScopeError> {
        self.with_state(|state| state.renderer.resize(width, height))
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.shared.state.try_borrow() {
            Ok(guard) => guard
                .as_ref()
                .map_or(Lifecycle::Destroyed, |state| state.lifecycle.clone()),
            Err(_) => Lifecycle::Destroyed,
        }
    }

    /// Current options.
    pub fn config(&self) -> Option<ScopeConfig> {
        self.shared
            .state
            .try_borrow()
            .ok()
            .and_then(|guard| guard.as_ref().map(|state| state.config.clone()))
    }

    /// Segment counts of the traces drawn in the last frame.
    pub fn segment_counts(&self) -> Vec<usize> {
        self.shared
            .state
            .try_borrow()
            .ok()
            .and_then(|guard| guard.as_ref().map(|state| state.renderer.segment_counts()))
            .unwrap_or_default()
    }

    /// Read the last frame of a headless scope as RGBA rows.
    pub fn read_pixels(&self) -> Result<Vec<u8>, ScopeError> {
        let guard = self
            .shared
            .state
            .try_borrow()
            .map_err(|_| ScopeError::Destroyed)?;
        let state = guard.as_ref().ok_or(ScopeError::Destroyed)?;
        match state.renderer.read_pixels() {
            Some(pixels) => Ok(pixels?),
            None => Err(ScopeError::NotHeadless),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScopeState) -> R) -> Result<R, ScopeError> {
        let mut guard = self
            .shared
            .state
            .try_borrow_mut()
            .map_err(|_| ScopeError::Destroyed)?;
        let state = guard.as_mut().ok_or(ScopeError::Destroyed)?;
        Ok(f(state))
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.get()
    }

    /// Release every resource and return the live capture source, if any.
    ///
    /// Pending frame tasks become no-ops. Calling this again returns `None`.
    pub fn destroy(&self) -> Option<CaptureSource> {
        if !self.shared.alive.replace(false) {
            return None;
        }
        let state = match self.shared.state.try_borrow_mut() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                log::warn!("Scope destroyed while a frame was drawing");
                None
            }
        };
        let source = state.and_then(ScopeState::release);
        log::info!("Scope destroyed");
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::audio::{
        generate_circle, AttachOptions, AudioPlatform, CaptureError, CaptureFeed, ManualClock,
        PlatformCapabilities,
    };
    use crate::gpu::gpu_unavailable;

    async fn headless(input: AudioInput, config: ScopeConfig) -> Option<Scope> {
        match Scope::new(
            TargetSpec::headless(64, 64),
            input,
            config,
            ScopeCallbacks::new(),
        )
        .await
        {
            Ok(scope) => Some(scope),
            Err(ScopeError::Gpu(e)) if gpu_unavailable(&e) => {
                eprintln!("Skipping test - GPU not available");
                None
            }
            Err(e) => panic!("scope creation failed: {e}"),
        }
    }

    /// Platform that only records detaches.
    #[derive(Default, Clone)]
    struct DetachLog(Arc<Mutex<Vec<u64>>>);

    impl AudioPlatform for DetachLog {
        fn capabilities(&self) -> PlatformCapabilities {
            PlatformCapabilities::default()
        }

        fn sample_rate(&self) -> u32 {
            48_000
        }

        fn attach(
            &mut self,
            _source: &CaptureSource,
            _feed: Arc<dyn CaptureFeed>,
            _options: AttachOptions,
        ) -> Result<(), CaptureError> {
            Ok(())
        }

        fn detach(&mut self, source: &CaptureSource) -> Result<(), CaptureError> {
            self.0.lock().unwrap().push(source.id());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_live_mode_without_source_is_rejected() {
        let config = ScopeConfig {
            live: LiveMode::Streaming,
            ..Default::default()
        };
        let input = AudioInput::Decoded {
            buffer: generate_circle(1.0, 48, 1.0, 1.0),
            clock: Box::new(ManualClock::new()),
        };
        let result = Scope::new(
            TargetSpec::headless(8, 8),
            input,
            config,
            ScopeCallbacks::new(),
        )
        .await;
        assert!(matches!(result, Err(ScopeError::MissingCaptureSource(_))));
    }

    #[tokio::test]
    async fn test_decoded_scope_is_ready() {
        let input = AudioInput::Decoded {
            buffer: generate_circle(2.0, 8000, 1.0, 0.8),
            clock: Box::new(ManualClock::new()),
        };
        let Some(scope) = headless(input, ScopeConfig::default()).await else {
            return;
        };
        assert_eq!(scope.lifecycle(), Lifecycle::Ready);
        assert_eq!(scope.tick(), Tick::Continue);
        assert_eq!(scope.segment_counts(), vec![4095]);
        assert!(scope.destroy().is_none());
        assert_eq!(scope.lifecycle(), Lifecycle::Destroyed);
    }

    #[tokio::test]
    async fn test_fatal_error_keeps_capture_source() {
        let platform = DetachLog::default();
        let input = AudioInput::Live {
            source: CaptureSource::new(7, "deck"),
            platform: Box::new(platform.clone()),
        };
        let config = ScopeConfig {
            samples: 256,
            ..Default::default()
        };
        let Some(scope) = headless(input, config).await else {
            return;
        };

        let event = scope
            .shared
            .state
            .borrow_mut()
            .as_mut()
            .map(|state| state.fail("surface acquisition failed".into()));
        assert!(matches!(event, Some(FrameEvent::Failed(_))));
        assert_eq!(*platform.0.lock().unwrap(), [7]);
        assert_eq!(scope.tick(), Tick::Stopped);

        let source = scope.destroy().expect("capture source handed back");
        assert_eq!(source.id(), 7);
        assert_eq!(*platform.0.lock().unwrap(), [7]);
    }
}

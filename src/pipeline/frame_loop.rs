//! Cancellable per-frame task.
//!
//! A `FrameTask` only holds a weak handle to the scope. Once the scope is
//! destroyed or dropped the next tick returns [`Tick::Stopped`] without
//! touching any resource.

use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Schedule another frame.
    Continue,
    /// The scope is gone or failed; stop scheduling.
    Stopped,
}

/// Something driven once per display refresh.
pub trait Tickable {
    fn tick(&self) -> Tick;
}

/// Handle re-armed at each display refresh.
#[derive(Clone)]
pub struct FrameTask {
    target: Weak<dyn Tickable>,
}

impl FrameTask {
    pub fn new(target: Rc<dyn Tickable>) -> Self {
        Self {
            target: Rc::downgrade(&target),
        }
    }

    /// Run one frame if the target is still alive.
    pub fn tick(&self) -> Tick {
        match self.target.upgrade() {
            Some(target) => target.tick(),
            None => Tick::Stopped,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.target.strong_count() == 0
    }
}

/// Fixed-cadence scheduler for callers without their own refresh callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameLoop {
    interval: Duration,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FrameLoop {
    pub fn new(refresh_hz: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / refresh_hz.max(1.0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until the task stops or `max_frames` frames ran. Returns the
    /// number of frames that continued.
    pub fn run(&self, task: &FrameTask, max_frames: Option<usize>) -> usize {
        let mut frames = 0;
        let mut deadline = Instant::now();
        while max_frames.map_or(true, |max| frames < max) {
            if task.tick() == Tick::Stopped {
                break;
            }
            frames += 1;

            deadline += self.interval;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else {
                // Fell behind; drop the missed frames instead of bursting
                deadline = now;
            }
        }
        log::debug!("Frame loop ended after {frames} frames");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        ticks: Cell<usize>,
        stop_after: usize,
    }

    impl Tickable for Counter {
        fn tick(&self) -> Tick {
            self.ticks.set(self.ticks.get() + 1);
            if self.ticks.get() >= self.stop_after {
                Tick::Stopped
            } else {
                Tick::Continue
            }
        }
    }

    fn counter(stop_after: usize) -> Rc<Counter> {
        Rc::new(Counter {
            ticks: Cell::new(0),
            stop_after,
        })
    }

    #[test]
    fn test_dropped_target_stops_task() {
        let target = counter(usize::MAX);
        let task = FrameTask::new(target.clone());
        assert_eq!(task.tick(), Tick::Continue);
        drop(target);
        assert!(task.is_cancelled());
        assert_eq!(task.tick(), Tick::Stopped);
    }

    #[test]
    fn test_loop_stops_when_task_stops() {
        let target = counter(3);
        let task = FrameTask::new(target.clone());
        let frames = FrameLoop::new(1000.0).run(&task, None);
        assert_eq!(frames, 2);
        assert_eq!(target.ticks.get(), 3);
    }

    #[test]
    fn test_loop_respects_frame_limit() {
        let target = counter(usize::MAX);
        let task = FrameTask::new(target.clone());
        assert_eq!(FrameLoop::new(1000.0).run(&task, Some(5)), 5);
    }
}

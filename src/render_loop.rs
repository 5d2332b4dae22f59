//! Self-rescheduling frame loop around a [`SurfaceRenderer`].
//!
//! The host drives time: it calls [`RenderLoop::run_frame`] once per animation frame for as
//! long as it holds the [`FrameTask`] returned by [`RenderLoop::start`]. Every run consumes
//! the pending frame and schedules the next one. [`RenderLoop::stop`] takes the task by
//! value, so the pending frame can be cancelled at most once, and detaches the resize
//! listener that `start` attached.
//!
//! ```text
//! new ──start()──▶ running ──run_frame()──▶ running (next frame scheduled)
//!                     │
//!                     └──stop(task)──▶ stopped (no pending frame, resize ignored)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::{
    canvas::Canvas,
    error::{Result, SurfaceError},
    projector::Viewport,
    renderer::{FrameOutcome, SurfaceRenderer},
};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Proof of a running loop. Not `Clone`: exactly one owner may run or cancel it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a FrameTask leaves the loop running with no way to stop it"]
pub struct FrameTask {
    session: u64,
}

impl FrameTask {
    pub fn session(&self) -> u64 {
        self.session
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Stopped,
    Pending { session: u64, frame: u64 },
}

#[derive(Debug)]
pub struct RenderLoop {
    renderer: SurfaceRenderer,
    schedule: Schedule,
    resize_listener: bool,
    frames_drawn: u64,
    frames_skipped: u64,
}

impl RenderLoop {
    pub fn new(renderer: SurfaceRenderer) -> Self {
        Self {
            renderer,
            schedule: Schedule::Stopped,
            resize_listener: false,
            frames_drawn: 0,
            frames_skipped: 0,
        }
    }

    pub fn renderer(&self) -> &SurfaceRenderer {
        &self.renderer
    }

    /// Access for input forwarding and theme changes.
    pub fn renderer_mut(&mut self) -> &mut SurfaceRenderer {
        &mut self.renderer
    }

    /// Schedules the first frame and attaches the resize listener.
    pub fn start(&mut self) -> Result<FrameTask> {
        if self.is_running() {
            return Err(SurfaceError::AlreadyRunning);
        }
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        self.schedule = Schedule::Pending { session, frame: 0 };
        self.resize_listener = true;
        debug!(session, "render loop started");
        Ok(FrameTask { session })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.schedule, Schedule::Pending { .. })
    }

    pub fn is_listening(&self) -> bool {
        self.resize_listener
    }

    /// Index of the frame that will run next, if any.
    pub fn pending_frame(&self) -> Option<u64> {
        match self.schedule {
            Schedule::Pending { frame, .. } => Some(frame),
            Schedule::Stopped => None,
        }
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Runs the pending frame and schedules the next one.
    ///
    /// A missing canvas skips the frame but keeps the loop alive.
    pub fn run_frame<C: Canvas + ?Sized>(
        &mut self,
        task: &FrameTask,
        canvas: Option<&mut C>,
    ) -> Result<FrameOutcome> {
        let Schedule::Pending { session, frame } = self.schedule else {
            return Err(SurfaceError::NotScheduled);
        };
        if session != task.session {
            warn!(expected = session, got = task.session, "frame task from another loop");
            return Err(SurfaceError::NotScheduled);
        }

        let outcome = self.renderer.draw_frame(canvas);
        match outcome {
            FrameOutcome::Drawn => self.frames_drawn += 1,
            FrameOutcome::Skipped => self.frames_skipped += 1,
        }
        self.schedule = Schedule::Pending {
            session,
            frame: frame + 1,
        };
        Ok(outcome)
    }

    /// Resize notification. Returns the adopted viewport, or `None` when the listener is
    /// detached or nothing changed.
    pub fn on_resize(&mut self, viewport: Viewport) -> Option<Viewport> {
        if !self.resize_listener || viewport == self.renderer.viewport() {
            return None;
        }
        self.renderer.resize(viewport);
        Some(viewport)
    }

    /// Cancels the pending frame and detaches the resize listener.
    pub fn stop(&mut self, task: FrameTask) -> Result<()> {
        match self.schedule {
            Schedule::Pending { session, frame } if session == task.session => {
                self.schedule = Schedule::Stopped;
                self.resize_listener = false;
                debug!(
                    session,
                    cancelled_frame = frame,
                    drawn = self.frames_drawn,
                    skipped = self.frames_skipped,
                    "render loop stopped"
                );
                Ok(())
            }
            _ => Err(SurfaceError::NotScheduled),
        }
    }
}

//! Time-series playback over a [`FrameSet`].
//!
//! The engine and the session share one current-thread runtime. The session
//! sits in a `RefCell` and is only borrowed between suspension points, so
//! the host can keep handling input (scrub, pause, pan) while a loop runs.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use chrono::NaiveDate;
use layers::MapSurface;
use runtime::{EventKind, FrameRange, FrameSequencer, FrameSet};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::session::{Session, SessionError};
use crate::settle::wait_for_settle;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Pause between a frame settling and the next one starting.
    pub frame_delay: Duration,
    /// Longest wait for a frame's tiles before moving on regardless.
    pub settle_timeout: Duration,
    pub looping: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(500),
            settle_timeout: Duration::from_millis(7000),
            looping: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// How a call to [`PlaybackEngine::play`] ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Another loop was already running; nothing happened.
    AlreadyPlaying,
    /// Paused or stopped by the host.
    Stopped,
    /// Reached the last frame with looping off.
    Finished,
}

#[derive(Debug)]
pub struct PlaybackEngine {
    sequencer: FrameSequencer,
    frame_delay: Duration,
    settle_timeout: Duration,
    looping: Cell<bool>,
    range: Cell<FrameRange>,
    frames: RefCell<FrameSet>,
    state: Cell<PlaybackState>,
    /// Bumped on every `play`, so a loop left over from before a pause
    /// notices it has been superseded.
    generation: Cell<u64>,
    /// Index the running loop continues from after a scrub.
    redirect: Cell<Option<usize>>,
}

impl PlaybackEngine {
    /// An engine over the default range: the week ending today.
    pub fn new(sequencer: FrameSequencer, config: PlaybackConfig) -> Self {
        let range = sequencer.default_range();
        let frames = sequencer.build(range);
        Self {
            sequencer,
            frame_delay: config.frame_delay,
            settle_timeout: config.settle_timeout,
            looping: Cell::new(config.looping),
            range: Cell::new(range),
            frames: RefCell::new(frames),
            state: Cell::new(PlaybackState::Stopped),
            generation: Cell::new(0),
            redirect: Cell::new(None),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.state.get() == PlaybackState::Playing
    }

    pub fn frames(&self) -> FrameSet {
        self.frames.borrow().clone()
    }

    pub fn range(&self) -> FrameRange {
        self.range.get()
    }

    pub fn looping(&self) -> bool {
        self.looping.get()
    }

    pub fn set_looping(&self, looping: bool) {
        self.looping.set(looping);
    }

    /// Rebuild the frame set. A current date that is no longer a frame is
    /// moved to the first one.
    pub fn set_range<M: MapSurface>(
        &self,
        session: &RefCell<Session<M>>,
        range: FrameRange,
    ) -> Result<(), SessionError> {
        let frames = self.sequencer.build(range);
        debug!("frames {} from {} every {}d", frames.len(), frames.first(), range.step_days);
        self.range.set(range);
        let first = frames.first();
        *self.frames.borrow_mut() = frames;

        let date = session.borrow().view().date;
        let found = self.frames.borrow().index_of(date);
        let index = match found {
            Some(index) => index,
            None => {
                session.borrow_mut().set_date(first)?;
                0
            }
        };
        if self.is_playing() {
            self.redirect.set(Some(index));
        }
        Ok(())
    }

    /// Run the playback loop until paused, or until the last frame when not
    /// looping.
    ///
    /// Each step renders the next frame, waits for its tiles (bounded by the
    /// settle timeout), then waits the frame delay. Calling `play` while a
    /// loop is running returns at once.
    pub async fn play<M: MapSurface>(&self, session: &RefCell<Session<M>>) -> PlayOutcome {
        self.play_with(session, |_| {}).await
    }

    /// [`play`](Self::play), calling `on_frame` with each frame date once it
    /// is rendered. Pausing from inside `on_frame` ends the loop before that
    /// frame's settle wait.
    pub async fn play_with<M, F>(
        &self,
        session: &RefCell<Session<M>>,
        mut on_frame: F,
    ) -> PlayOutcome
    where
        M: MapSurface,
        F: FnMut(NaiveDate),
    {
        if self.is_playing() {
            return PlayOutcome::AlreadyPlaying;
        }
        self.state.set(PlaybackState::Playing);
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let running = || self.is_playing() && self.generation.get() == generation;

        let mut index = {
            let mut session = session.borrow_mut();
            session.events_mut().emit(EventKind::Playback, "play");
            let date = session.view().date;
            self.frames.borrow().index_of(date).unwrap_or(0)
        };

        loop {
            if !running() {
                return PlayOutcome::Stopped;
            }
            if let Some(scrubbed) = self.redirect.take() {
                index = scrubbed;
            }

            let next = {
                let frames = self.frames.borrow();
                let current = frames.clamp_index(index);
                frames
                    .advance(current, self.looping.get())
                    .and_then(|i| frames.get(i).map(|date| (i, date)))
            };
            let Some((next, date)) = next else {
                self.state.set(PlaybackState::Stopped);
                session
                    .borrow_mut()
                    .events_mut()
                    .emit(EventKind::Playback, "finished");
                return PlayOutcome::Finished;
            };
            index = next;

            let (tiles, handles) = {
                let mut session = session.borrow_mut();
                if let Err(err) = session.set_date(date) {
                    warn!("frame {date} not rendered: {err}");
                }
                (session.map().tile_activity(), session.active_handles())
            };
            self.prefetch_next(session);
            on_frame(date);
            if !running() {
                return PlayOutcome::Stopped;
            }

            if let Err(timeout) = wait_for_settle(tiles, &handles, self.settle_timeout).await {
                warn!("frame {date}: {timeout}; continuing");
            }
            sleep(self.frame_delay).await;
        }
    }

    pub fn pause(&self) {
        if self.is_playing() {
            debug!("pause");
            self.state.set(PlaybackState::Stopped);
        }
        self.redirect.set(None);
    }

    /// Leave `Playing` like [`pause`](Self::pause), then show the first
    /// frame. Use `pause` to keep the current frame on screen.
    pub fn stop<M: MapSurface>(&self, session: &RefCell<Session<M>>) -> Result<(), SessionError> {
        self.pause();
        let first = self.frames.borrow().first();
        session.borrow_mut().set_date(first)
    }

    /// Show frame `index` now (clamped into the set). While playing, the loop
    /// carries on from this frame.
    pub fn scrub<M: MapSurface>(
        &self,
        session: &RefCell<Session<M>>,
        index: usize,
    ) -> Result<NaiveDate, SessionError> {
        let (index, date) = {
            let frames = self.frames.borrow();
            let index = frames.clamp_index(index);
            (index, frames.get(index).unwrap_or_else(|| frames.first()))
        };
        session.borrow_mut().set_date(date)?;
        if self.is_playing() {
            self.redirect.set(Some(index));
        }
        self.prefetch_next(session);
        Ok(date)
    }

    /// Warm the tiles of the frame after the current date. Nothing to do on
    /// the last frame or off the frame set.
    pub fn prefetch_next<M: MapSurface>(&self, session: &RefCell<Session<M>>) {
        let date = session.borrow().view().date;
        let next = {
            let frames = self.frames.borrow();
            frames.index_of(date).and_then(|i| frames.get(i + 1))
        };
        if let Some(next) = next {
            session.borrow_mut().prefetch_frame(next);
        }
    }
}

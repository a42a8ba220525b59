//! Display rendering
//!
//! Renders the current lock status onto an 8x8 monochrome frame at a
//! fixed cadence. The scheduler owns the two transient-timeout
//! behaviors: the one-tick key glyph and the idle fallback to Locked.
//! The failure blink is a bounded synchronous animation inside a tick;
//! it sleeps on the async runtime and never holds the state lock.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use warden_core::{LockStatus, SharedLockState};

/// One 8x8 monochrome frame. One byte per row, MSB = leftmost pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(pub [u8; 8]);

impl Frame {
    pub const EMPTY: Frame = Frame([0; 8]);

    /// Pixel value at (x, y); origin top-left.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        y < 8 && x < 8 && self.0[y] & (0x80 >> x) != 0
    }
}

/// Closed padlock: shackle into both shoulders of the body
pub const GLYPH_LOCKED: Frame = Frame([0x3C, 0x66, 0x42, 0x42, 0x7E, 0x7E, 0x7E, 0x7E]);

/// Open padlock: shackle swung free of the right shoulder
pub const GLYPH_UNLOCKED: Frame = Frame([0x18, 0x24, 0x42, 0x40, 0x7E, 0x7E, 0x7E, 0x7E]);

/// No-entry sign: circle with a diagonal bar
pub const GLYPH_NO_ENTRY: Frame = Frame([0x3C, 0x42, 0xA1, 0x91, 0x89, 0x85, 0x42, 0x3C]);

/// Exclamation mark
pub const GLYPH_ALERT: Frame = Frame([0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x18]);

/// Capital R shown while a password reset is pending
pub const GLYPH_RESET: Frame = Frame([0x7C, 0x42, 0x42, 0x7C, 0x50, 0x48, 0x44, 0x42]);

/// Filled block for characters outside the keypad legend
const GLYPH_UNKNOWN: Frame = Frame([0xFF; 8]);

/// The sixteen keypad characters, in legend order
const KEYPAD_FONT: [(char, Frame); 16] = [
    ('0', Frame([0x3C, 0x42, 0x46, 0x5A, 0x62, 0x42, 0x3C, 0x00])),
    ('1', Frame([0x10, 0x30, 0x10, 0x10, 0x10, 0x10, 0x38, 0x00])),
    ('2', Frame([0x3C, 0x42, 0x02, 0x0C, 0x30, 0x40, 0x7E, 0x00])),
    ('3', Frame([0x3C, 0x42, 0x02, 0x1C, 0x02, 0x42, 0x3C, 0x00])),
    ('4', Frame([0x08, 0x18, 0x28, 0x48, 0x7E, 0x08, 0x08, 0x00])),
    ('5', Frame([0x7E, 0x40, 0x7C, 0x02, 0x02, 0x42, 0x3C, 0x00])),
    ('6', Frame([0x1C, 0x20, 0x40, 0x7C, 0x42, 0x42, 0x3C, 0x00])),
    ('7', Frame([0x7E, 0x02, 0x04, 0x08, 0x10, 0x10, 0x10, 0x00])),
    ('8', Frame([0x3C, 0x42, 0x42, 0x3C, 0x42, 0x42, 0x3C, 0x00])),
    ('9', Frame([0x3C, 0x42, 0x42, 0x3E, 0x02, 0x04, 0x38, 0x00])),
    ('A', Frame([0x18, 0x24, 0x42, 0x42, 0x7E, 0x42, 0x42, 0x00])),
    ('B', Frame([0x7C, 0x42, 0x42, 0x7C, 0x42, 0x42, 0x7C, 0x00])),
    ('C', Frame([0x3C, 0x42, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00])),
    ('D', Frame([0x78, 0x44, 0x42, 0x42, 0x42, 0x44, 0x78, 0x00])),
    ('*', Frame([0x00, 0x54, 0x38, 0x7C, 0x38, 0x54, 0x00, 0x00])),
    ('#', Frame([0x24, 0x7E, 0x24, 0x24, 0x24, 0x7E, 0x24, 0x00])),
];

/// Glyph for a pressed keypad character
pub fn glyph_for_key(key: char) -> Frame {
    KEYPAD_FONT
        .iter()
        .find(|(c, _)| *c == key)
        .map(|(_, frame)| *frame)
        .unwrap_or(GLYPH_UNKNOWN)
}

/// Full-frame output device boundary
pub trait DisplaySink: Send {
    fn draw(&mut self, frame: &Frame);
    fn clear(&mut self);
}

/// Periodic renderer of the shared lock state
pub struct DisplayScheduler<D: DisplaySink> {
    state: SharedLockState,
    sink: D,
    period: Duration,
    idle_timeout: Duration,
    blink_count: u32,
    /// Pending idle fallback; local to rendering, no other context
    /// reads it.
    deadline: Option<Instant>,
}

impl<D: DisplaySink> DisplayScheduler<D> {
    pub fn new(
        state: SharedLockState,
        sink: D,
        period: Duration,
        idle_timeout: Duration,
        blink_count: u32,
    ) -> Self {
        Self {
            state,
            sink,
            period,
            idle_timeout,
            blink_count,
            deadline: None,
        }
    }

    /// Render on a self-rearming interval until shutdown, then push a
    /// final cleared frame.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = self.period.as_millis() as u64, "display scheduler started");
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.render_tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.sink.clear();
        info!("display scheduler stopped");
    }

    /// One render pass over the current status.
    pub async fn render_tick(&mut self) {
        let snapshot = self.state.snapshot();
        match snapshot.status {
            LockStatus::KeyPressed => {
                self.deadline = None;
                let key = snapshot.buffer.chars().last().unwrap_or(' ');
                self.sink.draw(&glyph_for_key(key));
                // The glyph is shown for exactly one tick
                self.state.transition_from(LockStatus::KeyPressed, LockStatus::Default);
            }
            LockStatus::Unlocked => {
                self.deadline = None;
                self.sink.draw(&GLYPH_UNLOCKED);
            }
            LockStatus::Locked => {
                self.deadline = None;
                self.sink.draw(&GLYPH_LOCKED);
            }
            LockStatus::Intruder => {
                self.deadline = None;
                self.sink.draw(&GLYPH_ALERT);
            }
            LockStatus::ResetPassword => {
                self.deadline = None;
                self.sink.draw(&GLYPH_RESET);
            }
            LockStatus::Failed => {
                self.deadline = None;
                self.blink_rejection().await;
                // Compare-and-set so a reset pressed mid-blink is not
                // clobbered; rendering-wise the animation always ends
                // the Failed state.
                self.state.transition_from(LockStatus::Failed, LockStatus::Locked);
            }
            LockStatus::Default => {
                // Keep the last frame; arm the idle fallback once and
                // fire it exactly once.
                match self.deadline {
                    None => {
                        self.deadline = Some(Instant::now() + self.idle_timeout);
                    }
                    Some(deadline) if Instant::now() >= deadline => {
                        self.deadline = None;
                        if self.state.transition_from(LockStatus::Default, LockStatus::Locked) {
                            debug!("idle timeout, re-locking");
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Bounded on/off animation for a rejected password. Rare and
    /// finite, so extending the tick is acceptable.
    async fn blink_rejection(&mut self) {
        for _ in 0..self.blink_count {
            self.sink.draw(&GLYPH_NO_ENTRY);
            tokio::time::sleep(self.period).await;
            self.sink.clear();
            tokio::time::sleep(self.period).await;
        }
    }
}

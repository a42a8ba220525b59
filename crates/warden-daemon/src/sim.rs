//! Simulated drivers
//!
//! Stand-ins for the physical keypad, range sensor, and LED matrix,
//! with the same trait surface as real drivers. Used by the demo rig
//! in `main` and by the integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::info;

use crate::display::{DisplaySink, Frame};
use crate::keypad::KeyEvent;
use crate::sensor::{RangeSensor, SensorError};

/// Plays back a scripted sequence of readings, then holds the last one.
pub struct ScriptedRangeSensor {
    script: VecDeque<Result<f64, SensorError>>,
    held: f64,
}

impl ScriptedRangeSensor {
    pub fn new(readings: impl IntoIterator<Item = Result<f64, SensorError>>) -> Self {
        Self {
            script: readings.into_iter().collect(),
            held: 100.0,
        }
    }

    /// All-clear script: every reading is the same far distance.
    pub fn far(distance: f64) -> Self {
        let mut sensor = Self::new([]);
        sensor.held = distance;
        sensor
    }
}

impl RangeSensor for ScriptedRangeSensor {
    fn measure(&mut self) -> Result<f64, SensorError> {
        match self.script.pop_front() {
            Some(Ok(distance)) => {
                self.held = distance;
                Ok(distance)
            }
            Some(err) => err,
            None => Ok(self.held),
        }
    }
}

/// A sensor whose reading is set externally through a shared handle;
/// lets a test (or demo) move an "object" toward the appliance while
/// the sampling loop runs.
pub struct AdjustableRangeSensor {
    distance: Arc<Mutex<f64>>,
}

/// Control handle for [`AdjustableRangeSensor`]
#[derive(Clone)]
pub struct RangeHandle {
    distance: Arc<Mutex<f64>>,
}

impl AdjustableRangeSensor {
    pub fn new(initial: f64) -> (Self, RangeHandle) {
        let distance = Arc::new(Mutex::new(initial));
        (
            Self {
                distance: Arc::clone(&distance),
            },
            RangeHandle { distance },
        )
    }
}

impl RangeHandle {
    pub fn set_distance(&self, distance: f64) {
        *self.distance.lock().unwrap() = distance;
    }
}

impl RangeSensor for AdjustableRangeSensor {
    fn measure(&mut self) -> Result<f64, SensorError> {
        Ok(*self.distance.lock().unwrap())
    }
}

/// Logs frames as block art, skipping repeats so a 10 Hz refresh of an
/// unchanged glyph does not flood the log.
#[derive(Default)]
pub struct TextDisplay {
    last: Option<Frame>,
}

impl TextDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(frame: &Frame) -> String {
        let mut art = String::with_capacity(9 * 17);
        for y in 0..8 {
            art.push('\n');
            for x in 0..8 {
                art.push_str(if frame.pixel(x, y) { "##" } else { ".." });
            }
        }
        art
    }
}

impl DisplaySink for TextDisplay {
    fn draw(&mut self, frame: &Frame) {
        if self.last.as_ref() == Some(frame) {
            return;
        }
        self.last = Some(*frame);
        info!("display:{}", Self::render(frame));
    }

    fn clear(&mut self) {
        if self.last == Some(Frame::EMPTY) {
            return;
        }
        self.last = Some(Frame::EMPTY);
        info!("display cleared");
    }
}

/// Read keypad input from stdin on a dedicated thread.
///
/// Each non-whitespace character becomes a key press; `!` maps to the
/// reset pushbutton. The thread exits when stdin closes or the
/// receiving side of the channel is dropped.
pub fn spawn_stdin_keypad(tx: mpsc::Sender<KeyEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            for c in line.chars().filter(|c| !c.is_whitespace()) {
                let event = if c == '!' {
                    KeyEvent::Reset
                } else {
                    KeyEvent::Key(c)
                };
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
    })
}

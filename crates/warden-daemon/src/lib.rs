//! Warden Daemon - Access-control appliance runtime
//!
//! This crate provides:
//! - Configuration loading and validation
//! - The three concurrent execution contexts: range-sensor loop,
//!   keypad event processor, and display scheduler
//! - Collaborator traits for the physical drivers (range sensor,
//!   display sink, credential store)
//! - Simulated drivers for bring-up and integration testing

pub mod config;
pub mod display;
pub mod error;
pub mod intrusion;
pub mod keypad;
pub mod sensor;
pub mod sim;
pub mod store;

pub use config::WardenConfig;
pub use display::{DisplayScheduler, DisplaySink, Frame};
pub use error::{DaemonError, Result};
pub use intrusion::IntrusionMonitor;
pub use keypad::{KeyEvent, KeypadEventProcessor};
pub use sensor::{RangeSensor, SensorError};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

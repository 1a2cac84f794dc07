//! Serial command/response link to Micronix MMC multi-axis motion controllers.
//!
//! A [`Session`] owns one serial port. One-shot commands go through
//! [`Session::execute_command`], read-only queries through
//! [`Session::poll_value`], and a [`Poller`] repeats a query on a fixed
//! interval until stopped.
//!
//! The library emits `tracing` events for every frame sent and reply received;
//! installing a subscriber is left to the binary.

pub mod config;
pub mod controller;
pub mod messages;

pub use config::SerialSettings;
pub use controller::{Command, ErrorCode, Poller, Session, SessionError};
pub use messages::{PollEvent, PollResult, Reading};

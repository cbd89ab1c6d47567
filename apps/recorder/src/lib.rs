//! # Blueprint Recorder
//!
//! Library half of the `recorder` binary: the HTTP boundary, CLI commands,
//! hook dispatch and presentation, shared with the integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod present;

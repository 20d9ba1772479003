//! Testing utilities for stage flows.
//!
//! This module provides:
//! - Recording plugins and scripted middleware
//! - Sample flows
//! - Assertions on engine state

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_cancelled, assert_committed, assert_history_stages, assert_stage};
pub use fixtures::{form_flow, loading_flow, ring_flow};
pub use mocks::{
    CallLog, CancellingMiddleware, FailingMiddleware, ModifyingMiddleware, RecordingMiddleware,
    RecordingPlugin, SlowMiddleware,
};

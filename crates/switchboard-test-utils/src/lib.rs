// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchboard integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockNotifier`] - Notifier that records every event and can be told to fail
//! - [`ManualClock`] - Clock that only moves when a test advances it
//! - [`TestHarness`] - Temp SQLite directory, engine and intake wired together

pub mod clock;
pub mod harness;
pub mod mock_notifier;

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_notifier::{MockNotifier, NotifiedEvent};

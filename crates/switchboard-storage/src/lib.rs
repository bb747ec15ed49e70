// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Switchboard routing service.
//!
//! WAL-mode SQLite with embedded migrations, a single background connection
//! via `tokio-rusqlite`, and the directory and conversation stores the
//! dispatch engine runs on. Agent selection uses an immediate transaction;
//! greeting claims and releases are conditional single-row writes.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod seed;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use seed::{SeedSummary, seed_directory};

// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries, one module per table family.

pub mod assignments;
pub mod conversations;
pub mod directory;

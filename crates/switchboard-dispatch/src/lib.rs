// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing for the Switchboard service.
//!
//! The [`DispatchEngine`] is the central coordinator that:
//! - Queues conversations in departments and assigns the least-loaded agent
//! - Escalates to the company's root department on absence or timeout
//! - Redistributes an agent's conversations when the agent goes offline
//! - Resets conversations on resolution
//!
//! [`Intake`] turns inbound customer messages into engine calls, the
//! [`EscalationSweeper`] drives timeouts, and [`BroadcastNotifier`] fans
//! routing events out to subscribers.

pub mod balance;
pub mod engine;
pub mod greeting;
pub mod intake;
pub mod messages;
pub mod notify;
pub mod shutdown;
pub mod sweeper;

pub use engine::{
    DispatchEngine, DispatchSettings, EscalationOutcome, RedistributionReport, RouteOutcome,
    SweepReport,
};
pub use greeting::{ClaimOutcome, GreetingGate};
pub use intake::{InboundContact, Intake, IntakeOutcome};
pub use messages::Messages;
pub use notify::{BroadcastNotifier, RoutingEvent};
pub use sweeper::EscalationSweeper;

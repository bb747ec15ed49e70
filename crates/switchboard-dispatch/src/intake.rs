// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer intake: the single entry point for inbound contacts.
//!
//! Every ingestion path (webhook, poller, operator shell) calls
//! [`Intake::handle_inbound`]. The conversation's flow state decides what
//! the text means: a first contact, a menu choice, an answer to the sticky
//! routing suggestion, or chatter for an agent.

use std::sync::Arc;

use switchboard_core::types::{
    Conversation, ConversationPatch, ConversationStatus, Department, FlowState, Precondition,
};
use switchboard_core::SwitchboardError;
use tracing::{debug, info};

use crate::engine::{DispatchEngine, RouteOutcome};
use crate::greeting::{ClaimOutcome, GreetingGate};

const AFFIRMATIVE: [&str; 5] = ["1", "sim", "yes", "s", "y"];
const NEGATIVE: [&str; 5] = ["2", "não", "nao", "no", "n"];

/// One inbound message from a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundContact {
    pub company_id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub text: String,
}

impl InboundContact {
    pub fn new(
        company_id: impl Into<String>,
        customer_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            customer_id: customer_id.into(),
            customer_name: None,
            text: text.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }
}

/// What [`Intake::handle_inbound`] did with a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Welcome and department menu sent.
    Greeted { conversation_id: String },
    /// Offered to continue with the previous department.
    SuggestedPrevious {
        conversation_id: String,
        department_id: String,
    },
    /// Another path already greeted or routed this conversation.
    Duplicate { conversation_id: String },
    /// A department was chosen and routing ran.
    Routed {
        conversation_id: String,
        outcome: RouteOutcome,
    },
    /// The reply was not a valid choice; the menu went out again.
    MenuResent { conversation_id: String },
    /// The reply to the suggestion was neither yes nor no.
    SuggestionRepeated { conversation_id: String },
    /// Waiting in a department queue.
    Queued { conversation_id: String },
    /// An agent holds the conversation.
    Forwarded {
        conversation_id: String,
        agent_id: String,
    },
}

enum Answer {
    Yes,
    No,
    Unclear,
}

fn parse_answer(text: &str) -> Answer {
    let normalized = text.trim().to_lowercase();
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        Answer::Yes
    } else if NEGATIVE.contains(&normalized.as_str()) {
        Answer::No
    } else {
        Answer::Unclear
    }
}

/// Matches a 1-based menu index or a slug, case-insensitively.
fn parse_choice<'a>(text: &str, departments: &'a [Department]) -> Option<&'a Department> {
    let choice = text.trim();
    if let Ok(index) = choice.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| departments.get(i));
    }
    departments
        .iter()
        .find(|d| d.slug.eq_ignore_ascii_case(choice))
}

pub struct Intake {
    engine: Arc<DispatchEngine>,
    gate: GreetingGate,
}

impl Intake {
    pub fn new(engine: Arc<DispatchEngine>) -> Self {
        let gate = GreetingGate::new(engine.conversations().clone(), engine.clock().clone());
        Self { engine, gate }
    }

    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    pub async fn handle_inbound(
        &self,
        contact: &InboundContact,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        let conversations = self.engine.conversations();
        let now = self.engine.clock().now();
        let mut conversation = conversations
            .find_or_create_conversation(
                &contact.company_id,
                &contact.customer_id,
                contact.customer_name.as_deref(),
                now,
            )
            .await?;

        if conversation.status.is_closed() {
            let reopened = conversations
                .update_conversation_if(
                    &conversation.id,
                    &Precondition::status(conversation.status),
                    &ConversationPatch::new().status(ConversationStatus::Open),
                    now,
                )
                .await?;
            if reopened {
                info!(conversation_id = %conversation.id, "conversation reopened");
            }
            conversation = conversations
                .get_conversation(&conversation.id)
                .await?
                .ok_or_else(|| SwitchboardError::conversation_not_found(&conversation.id))?;
        }

        let conversation_id = conversation.id.clone();
        match conversation.flow_state {
            FlowState::Greeting if conversation.greeting_sent_at.is_none() => {
                self.first_contact(&conversation).await
            }
            FlowState::Greeting => self.menu_choice(&conversation, &contact.text).await,
            FlowState::AwaitingRoutingConfirmation => {
                self.confirm_previous(&conversation, &contact.text).await
            }
            FlowState::DepartmentSelected | FlowState::TimeoutRedirect => {
                debug!(%conversation_id, "message while queued");
                Ok(IntakeOutcome::Queued { conversation_id })
            }
            FlowState::Assigned => match conversation.assigned_user_id {
                Some(agent_id) => Ok(IntakeOutcome::Forwarded {
                    conversation_id,
                    agent_id,
                }),
                // Orphaned; the sweeper puts it back in the queue.
                None => Ok(IntakeOutcome::Queued { conversation_id }),
            },
        }
    }

    async fn first_contact(
        &self,
        conversation: &Conversation,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        let conversation_id = conversation.id.clone();
        if self.gate.try_claim(&conversation_id).await? == ClaimOutcome::AlreadyClaimed {
            return Ok(IntakeOutcome::Duplicate { conversation_id });
        }

        if let Some(previous) = self.previous_department(conversation).await? {
            let now = self.engine.clock().now();
            let moved = self
                .engine
                .conversations()
                .update_conversation_if(
                    &conversation_id,
                    &Precondition::flow_state(FlowState::Greeting),
                    &ConversationPatch::new().flow_state(FlowState::AwaitingRoutingConfirmation),
                    now,
                )
                .await?;
            if !moved {
                return Ok(IntakeOutcome::Duplicate { conversation_id });
            }

            let text = self
                .engine
                .messages()
                .routing_suggestion(conversation.customer_name.as_deref(), &previous.name);
            self.send(&conversation_id, &text).await;
            info!(%conversation_id, department_id = %previous.id, "suggested previous department");
            return Ok(IntakeOutcome::SuggestedPrevious {
                conversation_id,
                department_id: previous.id,
            });
        }

        let menu = self.menu(&conversation.company_id).await?;
        let text = self
            .engine
            .messages()
            .welcome(conversation.customer_name.as_deref(), &menu);
        self.send(&conversation_id, &text).await;
        info!(%conversation_id, "customer greeted");
        Ok(IntakeOutcome::Greeted { conversation_id })
    }

    async fn menu_choice(
        &self,
        conversation: &Conversation,
        text: &str,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        let conversation_id = conversation.id.clone();
        let departments = self
            .engine
            .directory()
            .list_departments(&conversation.company_id)
            .await?;

        match parse_choice(text, &departments) {
            Some(department) => {
                let expected = Precondition::flow_state(FlowState::Greeting).greeting_claimed();
                self.route(conversation, &department.slug, &expected).await
            }
            None => {
                let menu = self.engine.messages().menu(&departments);
                let text = self.engine.messages().invalid_choice(&menu);
                self.send(&conversation_id, &text).await;
                Ok(IntakeOutcome::MenuResent { conversation_id })
            }
        }
    }

    async fn confirm_previous(
        &self,
        conversation: &Conversation,
        text: &str,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        let conversation_id = conversation.id.clone();
        let previous = self.previous_department(conversation).await?;

        match (parse_answer(text), previous) {
            (Answer::Yes, Some(department)) => {
                let expected = Precondition::flow_state(FlowState::AwaitingRoutingConfirmation);
                self.route(conversation, &department.slug, &expected).await
            }
            (Answer::Unclear, Some(department)) => {
                let text = self
                    .engine
                    .messages()
                    .routing_suggestion(conversation.customer_name.as_deref(), &department.name);
                self.send(&conversation_id, &text).await;
                Ok(IntakeOutcome::SuggestionRepeated { conversation_id })
            }
            // Declined, or the remembered department is gone.
            _ => {
                let now = self.engine.clock().now();
                let declined = self
                    .engine
                    .conversations()
                    .update_conversation_if(
                        &conversation_id,
                        &Precondition::flow_state(FlowState::AwaitingRoutingConfirmation),
                        &ConversationPatch::new().flow_state(FlowState::Greeting),
                        now,
                    )
                    .await?;
                if !declined {
                    return Ok(IntakeOutcome::Duplicate { conversation_id });
                }
                let menu = self.menu(&conversation.company_id).await?;
                let text = self
                    .engine
                    .messages()
                    .welcome(conversation.customer_name.as_deref(), &menu);
                self.send(&conversation_id, &text).await;
                Ok(IntakeOutcome::MenuResent { conversation_id })
            }
        }
    }

    /// Routes only if the conversation is still in the state the reply was
    /// read in; a concurrent copy of the same reply gets `Duplicate`.
    async fn route(
        &self,
        conversation: &Conversation,
        department_slug: &str,
        expected: &Precondition,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        let conversation_id = conversation.id.clone();
        let routed = self
            .engine
            .route_from(
                &conversation_id,
                department_slug,
                &conversation.company_id,
                expected,
            )
            .await?;
        Ok(match routed {
            Some(outcome) => IntakeOutcome::Routed {
                conversation_id,
                outcome,
            },
            None => IntakeOutcome::Duplicate { conversation_id },
        })
    }

    async fn previous_department(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<Department>, SwitchboardError> {
        let Some(id) = conversation.last_department_id.as_deref() else {
            return Ok(None);
        };
        let department = self.engine.directory().find_department(id).await?;
        Ok(department.filter(|d| d.company_id == conversation.company_id))
    }

    async fn menu(&self, company_id: &str) -> Result<String, SwitchboardError> {
        let departments = self.engine.directory().list_departments(company_id).await?;
        Ok(self.engine.messages().menu(&departments))
    }

    async fn send(&self, conversation_id: &str, text: &str) {
        self.engine
            .deliver(
                "customer_text",
                conversation_id,
                self.engine.notifier().send_customer_text(conversation_id, text),
            )
            .await;
    }
}

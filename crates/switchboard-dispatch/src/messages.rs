// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-facing texts rendered from `[messages]` templates.

use switchboard_config::model::MessagesConfig;
use switchboard_core::types::Department;

/// Fallback for `{customer}` when the contact has no display name.
const ANONYMOUS: &str = "there";

/// Replaces each `{key}` in `template` with its value.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}

/// Rendered message set.
#[derive(Debug, Clone)]
pub struct Messages {
    templates: MessagesConfig,
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(MessagesConfig::default())
    }
}

impl Messages {
    pub fn new(templates: MessagesConfig) -> Self {
        Self { templates }
    }

    /// Numbered department menu, one line per department, in the given order.
    pub fn menu(&self, departments: &[Department]) -> String {
        departments
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let index = (i + 1).to_string();
                render(
                    &self.templates.menu_item,
                    &[("index", &index), ("department", &d.name)],
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn welcome(&self, customer: Option<&str>, menu: &str) -> String {
        render(
            &self.templates.welcome,
            &[("customer", customer.unwrap_or(ANONYMOUS)), ("menu", menu)],
        )
    }

    pub fn invalid_choice(&self, menu: &str) -> String {
        render(&self.templates.invalid_choice, &[("menu", menu)])
    }

    pub fn routing_suggestion(&self, customer: Option<&str>, department: &str) -> String {
        render(
            &self.templates.routing_suggestion,
            &[
                ("customer", customer.unwrap_or(ANONYMOUS)),
                ("department", department),
            ],
        )
    }

    pub fn assigned(&self, agent: &str, department: &str) -> String {
        render(
            &self.templates.assigned,
            &[("agent", agent), ("department", department)],
        )
    }

    pub fn connecting(&self) -> String {
        self.templates.connecting.clone()
    }

    pub fn all_unavailable(&self) -> String {
        self.templates.all_unavailable.clone()
    }
}

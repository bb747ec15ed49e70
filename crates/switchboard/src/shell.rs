// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard shell` command implementation.
//!
//! Operator REPL with colored prompt and readline history. Injects customer
//! messages through intake, resolves conversations, toggles agent presence
//! and runs sweeps by hand. Routing events are printed after each command.

use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use switchboard_config::SwitchboardConfig;
use switchboard_core::types::OnlineStatus;
use switchboard_core::{
    ConversationStore, DirectoryStore, StorageAdapter, SwitchboardError, SystemClock,
};
use switchboard_dispatch::{BroadcastNotifier, DispatchEngine, InboundContact, Intake, RoutingEvent};
use switchboard_storage::{SqliteStorage, seed_directory};
use tokio::sync::broadcast;

const HELP: &str = "\
commands:
  /company <id>                 switch the company new messages belong to
  /msg <customer> <text...>     inject an inbound customer message
  /resolve <conversation>       resolve a conversation
  /agent <id> <online|busy|offline>
  /show <conversation>          print a conversation row
  /departments                  list the company's departments
  /sweep                        run one escalation sweep
  /help
  /quit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Company(String),
    Message { customer: String, text: String },
    Resolve(String),
    AgentStatus { agent: String, status: OnlineStatus },
    Show(String),
    Departments,
    Sweep,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    match head {
        "/quit" | "/exit" => Ok(ShellCommand::Quit),
        "/help" => Ok(ShellCommand::Help),
        "/sweep" => Ok(ShellCommand::Sweep),
        "/departments" => Ok(ShellCommand::Departments),
        "/company" => args
            .next()
            .map(|id| ShellCommand::Company(id.to_string()))
            .ok_or_else(|| "usage: /company <id>".to_string()),
        "/resolve" => args
            .next()
            .map(|id| ShellCommand::Resolve(id.to_string()))
            .ok_or_else(|| "usage: /resolve <conversation>".to_string()),
        "/show" => args
            .next()
            .map(|id| ShellCommand::Show(id.to_string()))
            .ok_or_else(|| "usage: /show <conversation>".to_string()),
        "/msg" => {
            let (customer, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: /msg <customer> <text...>".to_string())?;
            Ok(ShellCommand::Message {
                customer: customer.to_string(),
                text: text.trim().to_string(),
            })
        }
        "/agent" => match (args.next(), args.next()) {
            (Some(agent), Some(status)) => {
                let status = OnlineStatus::from_str(status)
                    .map_err(|_| format!("unknown status '{status}'"))?;
                Ok(ShellCommand::AgentStatus {
                    agent: agent.to_string(),
                    status,
                })
            }
            _ => Err("usage: /agent <id> <online|busy|offline>".to_string()),
        },
        other => Err(format!("unknown command '{other}', try /help")),
    }
}

/// Runs the `switchboard shell` interactive REPL.
pub async fn run_shell(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    seed_directory(storage.as_ref(), &config).await?;

    let notifier = Arc::new(BroadcastNotifier::default());
    let mut events = notifier.subscribe();
    let engine = Arc::new(
        DispatchEngine::new(
            storage.clone(),
            storage.clone(),
            notifier.clone(),
            Arc::new(SystemClock),
        )
        .with_settings(&config.dispatch)
        .with_messages(&config.messages),
    );
    let intake = Intake::new(engine.clone());

    let mut company = config
        .departments
        .first()
        .map(|d| d.company.clone())
        .unwrap_or_else(|| "default".to_string());

    let mut rl = DefaultEditor::new()
        .map_err(|e| SwitchboardError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "switchboard shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    loop {
        let prompt = format!("{}> ", company.green());
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(usage) => {
                        eprintln!("{}", usage.yellow());
                        continue;
                    }
                };

                match command {
                    ShellCommand::Quit => break,
                    ShellCommand::Help => println!("{HELP}"),
                    ShellCommand::Company(id) => company = id,
                    other => {
                        if let Err(e) =
                            execute(&other, &company, &engine, &intake, storage.as_ref()).await
                        {
                            eprintln!("{}: {e}", "error".red());
                        }
                    }
                }
                print_events(&mut events);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    storage.close().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn execute(
    command: &ShellCommand,
    company: &str,
    engine: &DispatchEngine,
    intake: &Intake,
    storage: &SqliteStorage,
) -> Result<(), SwitchboardError> {
    match command {
        ShellCommand::Message { customer, text } => {
            let outcome = intake
                .handle_inbound(&InboundContact::new(company, customer.as_str(), text.as_str()))
                .await?;
            println!("{}", format!("{outcome:?}").cyan());
        }
        ShellCommand::Resolve(id) => {
            engine.resolve(id).await?;
            println!("{}", "resolved".green());
        }
        ShellCommand::AgentStatus { agent, status } => {
            match engine.set_agent_status(agent, *status).await? {
                Some(report) => println!("{}", format!("{report:?}").cyan()),
                None => println!("{}", format!("{agent} is {status}").green()),
            }
        }
        ShellCommand::Show(id) => match storage.get_conversation(id).await? {
            Some(conversation) => println!("{conversation:#?}"),
            None => println!("{}", "no such conversation".yellow()),
        },
        ShellCommand::Departments => {
            for department in storage.list_departments(company).await? {
                let marker = if department.is_root { " (root)" } else { "" };
                println!(
                    "  {} {}{} timeout={}m",
                    department.slug.bold(),
                    department.name,
                    marker.dimmed(),
                    department.response_timeout_minutes
                );
            }
        }
        ShellCommand::Sweep => {
            let report = engine.check_timeout_and_redirect().await?;
            println!("{}", format!("{report:?}").cyan());
        }
        ShellCommand::Company(_) | ShellCommand::Help | ShellCommand::Quit => {}
    }
    Ok(())
}

fn print_events(events: &mut broadcast::Receiver<RoutingEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            RoutingEvent::CustomerText {
                conversation_id,
                text,
            } => {
                println!("{} {}", format!("[{conversation_id}] <<").dimmed(), text);
            }
            other => println!("{}", format!("  {other:?}").dimmed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_keeps_full_text() {
        assert_eq!(
            parse_command("/msg 5511999  quero  comprar").unwrap(),
            ShellCommand::Message {
                customer: "5511999".into(),
                text: "quero  comprar".into(),
            }
        );
    }

    #[test]
    fn agent_status_is_case_insensitive() {
        assert_eq!(
            parse_command("/agent ana OFFLINE").unwrap(),
            ShellCommand::AgentStatus {
                agent: "ana".into(),
                status: OnlineStatus::Offline,
            }
        );
        assert!(parse_command("/agent ana away").is_err());
    }

    #[test]
    fn missing_arguments_report_usage() {
        assert!(parse_command("/msg onlycustomer").unwrap_err().starts_with("usage"));
        assert!(parse_command("/resolve").is_err());
        assert!(parse_command("/frobnicate").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn bare_commands() {
        assert_eq!(parse_command(" /sweep ").unwrap(), ShellCommand::Sweep);
        assert_eq!(parse_command("/exit").unwrap(), ShellCommand::Quit);
        assert_eq!(
            parse_command("/company globex").unwrap(),
            ShellCommand::Company("globex".into())
        );
    }
}

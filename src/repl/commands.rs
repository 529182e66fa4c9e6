//! Command handler for REPL built-in commands
//!
//! Slash commands inspect the session or change its settings; they never
//! reach the chat pipeline.

use anyhow::Result;
use colored::*;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use std::io;

use crate::models::ModelId;
use crate::repl::session::SessionManager;

/// Turns shown by `/history` without an argument
const DEFAULT_HISTORY_LIMIT: usize = 10;

/// REPL command types
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    History { limit: Option<usize> },
    Status,
    /// `None` lists the supported models
    Model { selector: Option<String> },
    /// `None` shows the current knowledge base
    KnowledgeBase { id: Option<String> },
    Temperature { value: Option<f64> },
    TopP { value: Option<f64> },
    /// `None` toggles
    Context { enable: Option<bool> },
    Reset,
    Clear,
    Exit,
    /// Recognized command with an argument that did not parse
    Invalid { message: String },
    Unknown { input: String },
}

/// Command handler for parsing and executing REPL commands
pub struct CommandHandler;

impl CommandHandler {
    /// Create new command handler
    pub fn new() -> Self {
        CommandHandler
    }

    /// Parse input string into a command
    pub fn parse(&self, input: &str) -> Command {
        let trimmed = input.trim();

        let Some(body) = trimmed.strip_prefix('/') else {
            return Command::Unknown {
                input: input.to_string(),
            };
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        let Some(name) = parts.first() else {
            return Command::Unknown {
                input: input.to_string(),
            };
        };
        let arg = parts.get(1).copied();

        match name.to_lowercase().as_str() {
            "help" | "h" => Command::Help,
            "exit" | "quit" | "q" => Command::Exit,
            "history" => match arg.map(str::parse::<usize>) {
                None => Command::History { limit: None },
                Some(Ok(limit)) => Command::History { limit: Some(limit) },
                Some(Err(_)) => invalid("/history takes a number of turns"),
            },
            "status" => Command::Status,
            "model" => Command::Model {
                selector: arg.map(str::to_string),
            },
            "kb" => Command::KnowledgeBase {
                id: arg.map(str::to_string),
            },
            "temperature" | "temp" => match parse_unit(arg) {
                Ok(value) => Command::Temperature { value },
                Err(()) => invalid("/temperature takes a number between 0.0 and 1.0"),
            },
            "top_p" | "topp" => match parse_unit(arg) {
                Ok(value) => Command::TopP { value },
                Err(()) => invalid("/top_p takes a number between 0.0 and 1.0"),
            },
            "context" | "ctx" => match arg.map(|s| s.to_lowercase()) {
                None => Command::Context { enable: None },
                Some(flag) if matches!(flag.as_str(), "on" | "1" | "true") => {
                    Command::Context { enable: Some(true) }
                }
                Some(flag) if matches!(flag.as_str(), "off" | "0" | "false") => {
                    Command::Context { enable: Some(false) }
                }
                Some(_) => invalid("/context takes on or off"),
            },
            "reset" => Command::Reset,
            "clear" | "cls" => Command::Clear,
            _ => Command::Unknown {
                input: input.to_string(),
            },
        }
    }

    /// Execute a command
    ///
    /// Returns true if REPL should continue, false if should exit
    pub fn execute(&mut self, command: Command, session: &mut SessionManager) -> Result<bool> {
        match command {
            Command::Help => self.show_help(),
            Command::Exit => {
                println!("{}", "Goodbye!".green());
                return Ok(false);
            }
            Command::History { limit } => {
                self.show_history(session, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            }
            Command::Status => self.show_status(session),
            Command::Model { selector: None } => self.show_models(session),
            Command::Model {
                selector: Some(selector),
            } => match resolve_model(&selector) {
                Some(model) => {
                    session.settings_mut().model = model;
                    println!("{}", format!("Model set to {}", model.label()).cyan());
                }
                None => report(&format!(
                    "Unknown model '{}'. Use /model to list choices.",
                    selector
                )),
            },
            Command::KnowledgeBase { id: None } => {
                let current = &session.settings().knowledge_base_id;
                println!("Knowledge base: {}", current.green());
            }
            Command::KnowledgeBase { id: Some(id) } => {
                session.settings_mut().knowledge_base_id = id.clone();
                println!("{}", format!("Knowledge base set to {}", id).cyan());
            }
            Command::Temperature { value: None } => {
                println!("Temperature: {}", session.settings().temperature);
            }
            Command::Temperature { value: Some(value) } => {
                match session.settings_mut().set_temperature(value) {
                    Ok(()) => println!(
                        "{}",
                        format!("Temperature set to {}", session.settings().temperature).cyan()
                    ),
                    Err(e) => report(&e.to_string()),
                }
            }
            Command::TopP { value: None } => {
                println!("Top-p: {}", session.settings().top_p);
            }
            Command::TopP { value: Some(value) } => match session.settings_mut().set_top_p(value) {
                Ok(()) => println!(
                    "{}",
                    format!("Top-p set to {}", session.settings().top_p).cyan()
                ),
                Err(e) => report(&e.to_string()),
            },
            Command::Context { enable } => {
                let settings = session.settings_mut();
                settings.show_context = enable.unwrap_or(!settings.show_context);
                let status = if settings.show_context { "shown" } else { "hidden" };
                println!("{}", format!("Retrieved context will be {}", status).cyan());
            }
            Command::Reset => {
                session.reset();
                println!("{}", "Session reset. Chat history cleared.".yellow());
            }
            Command::Clear => {
                execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
            }
            Command::Invalid { message } => report(&message),
            Command::Unknown { input } => {
                println!("{}", format!("Unknown command: {}", input).red());
                println!("Type {} for available commands", "/help".cyan());
            }
        }
        Ok(true)
    }

    /// Display help information
    fn show_help(&self) {
        println!("\n{}", "Available Commands:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());

        let commands = [
            ("/help, /h", "Show this help message"),
            ("/history [n]", "Show last n chat turns (default: 10)"),
            ("/status", "Show session status and settings"),
            ("/model [id|index]", "List models or switch model"),
            ("/kb [id]", "Show or set the knowledge base id"),
            ("/temperature [x]", "Show or set temperature (0.0-1.0)"),
            ("/top_p [x]", "Show or set top-p (0.0-1.0)"),
            ("/context [on|off]", "Show retrieved passages with answers"),
            ("/reset", "Clear chat history and start a new session"),
            ("/clear, /cls", "Clear screen"),
            ("/exit, /quit, /q", "Exit REPL"),
        ];

        for (cmd, desc) in commands {
            println!("  {:<20} {}", cmd.green(), desc);
        }

        println!("\n{}", "Usage:".bold());
        println!("  - Type your question directly (no / prefix)");
        println!("  - Use {} for input history", "UP/DOWN arrows".cyan());
        println!("  - Press {} or {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
        println!();
    }

    /// Display chat history
    fn show_history(&self, session: &SessionManager, limit: usize) {
        let turns = session.get_history(limit);

        if turns.is_empty() {
            println!("{}", "No chat history yet.".yellow());
            return;
        }

        println!("\n{}", format!("Chat History (last {}):", turns.len()).bold().cyan());
        println!("{}", "=".repeat(60).cyan());
        for turn in turns {
            println!(
                "  {} {}: {}",
                turn.at.format("%H:%M:%S").to_string().dimmed(),
                turn.role.to_string().cyan(),
                turn.content
            );
        }
        println!();
    }

    /// Display session status
    fn show_status(&self, session: &SessionManager) {
        println!("\n{}", "Session Status:".bold().cyan());
        println!("{}", "=".repeat(60).cyan());

        let duration = session.session_duration();
        let hours = duration / 3600;
        let minutes = (duration % 3600) / 60;
        let seconds = duration % 60;

        let duration_str = if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        };

        let settings = session.settings();
        println!("  Session:          {}", session.session_id().to_string().dimmed());
        println!("  Questions:        {}", session.turn_count().to_string().green());
        println!("  History Size:     {}", session.history().len().to_string().green());
        println!("  Session Duration: {}", duration_str.green());
        println!("  Model:            {}", settings.model.as_str().green());
        println!("  Knowledge Base:   {}", settings.knowledge_base_id.green());
        println!("  Temperature:      {}", settings.temperature.to_string().green());
        println!("  Top-p:            {}", settings.top_p.to_string().green());
        println!("  Top-k:            {}", settings.top_k.to_string().green());
        println!(
            "  Show Context:     {}",
            if settings.show_context { "On".green() } else { "Off".red() }
        );
        println!();
    }

    /// Display supported models, marking the active one
    fn show_models(&self, session: &SessionManager) {
        println!("\n{}", "Supported Models:".bold().cyan());
        for (i, model) in ModelId::ALL.iter().enumerate() {
            let marker = if *model == session.settings().model { "*" } else { " " };
            println!(
                "  {} {}. {} ({})",
                marker.green(),
                i + 1,
                model.label(),
                model.as_str().dimmed()
            );
        }
        println!();
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}

/// Model by 1-based index or full id
pub fn resolve_model(selector: &str) -> Option<ModelId> {
    match selector.parse::<usize>() {
        Ok(index) => ModelId::from_index(index),
        Err(_) => selector.parse().ok(),
    }
}

fn parse_unit(arg: Option<&str>) -> std::result::Result<Option<f64>, ()> {
    match arg {
        None => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| ()),
    }
}

fn invalid(message: &str) -> Command {
    Command::Invalid {
        message: message.to_string(),
    }
}

fn report(message: &str) {
    println!("{}", message.red());
}

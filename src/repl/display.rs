//! Display manager for REPL terminal UI
//!
//! Manages the waiting spinner, formatted answers and retrieved context.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::rag::context::format_score;
use crate::rag::{ChatSettings, RetrievalRecord, TurnOutcome, TurnOutput};

/// Header line for one retrieved record, numbered from 1
pub fn context_header(index: usize, record: &RetrievalRecord) -> String {
    format!(
        "Result {} | score: {} | source: {}",
        index,
        format_score(record.score),
        record.source.as_deref().unwrap_or("n/a")
    )
}

/// Display manager for REPL UI
pub struct DisplayManager {
    current_bar: Option<ProgressBar>,
    update_interval: Duration,
    show_progress: bool,
}

impl DisplayManager {
    /// Create new display manager
    pub fn new() -> Self {
        DisplayManager {
            current_bar: None,
            update_interval: Duration::from_millis(100),
            show_progress: true,
        }
    }

    /// Disable the spinner (quiet mode, non-interactive use)
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, settings: &ChatSettings) {
        let width = 64;
        let title = format!("  bedrock-chat {} - Knowledge Base Assistant", version);
        let info = format!(
            "  Model: {} | KB: {} | Context: {}",
            settings.model.label(),
            settings.knowledge_base_id,
            if settings.show_context { "shown" } else { "hidden" }
        );

        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Ask a heavy machinery question (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while Bedrock calls are in flight
    pub fn start_spinner(&mut self, message: &str) {
        self.finish_current();
        if !self.show_progress {
            return;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);
        self.current_bar = Some(pb);
    }

    /// Finish current spinner
    pub fn finish_current(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Display the assistant message and, when requested, the retrieved records
    pub fn show_answer(&mut self, output: &TurnOutput) {
        self.finish_current();

        let label = match output.outcome {
            TurnOutcome::Answered => "Assistant".green().bold(),
            TurnOutcome::Refused => "Assistant".red().bold(),
            TurnOutcome::NoPassages | TurnOutcome::GenerationFailed => "Assistant".yellow().bold(),
        };
        println!("\n{}", label);
        println!("{}\n", output.response);

        if let Some(records) = &output.context {
            self.show_context(records);
        }
    }

    /// Display retrieved records in service order
    pub fn show_context(&self, records: &[RetrievalRecord]) {
        if records.is_empty() {
            println!("{}", "No passages retrieved.".yellow());
            println!();
            return;
        }

        println!("{}", "Retrieved context".bold().cyan());
        println!("{}", "-".repeat(60).cyan());
        for (i, record) in records.iter().enumerate() {
            println!("{}", context_header(i + 1, record).bold());
            println!("{}\n", record.text);
        }
    }

    /// Display error message
    pub fn show_error(&mut self, error: &str) {
        self.finish_current();
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Display warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

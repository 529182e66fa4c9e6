//! REPL (Read-Eval-Print Loop) module for interactive chat
//!
//! Provides the chat session loop with persistent input history, slash
//! commands for session settings, and a spinner while Bedrock answers.
//! One question is fully answered before the next is read.

pub mod commands;
pub mod display;
pub mod input;
pub mod session;

use anyhow::Result;
use std::path::PathBuf;
use tracing::Instrument;

use crate::rag::{ChatPipeline, ChatSettings, TurnOutput};
use crate::repl::commands::{is_command, CommandHandler};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::{InputEvent, InputHandler};
pub use crate::repl::session::SessionManager;

/// REPL session coordinator
///
/// Manages the interactive read-eval-print loop with:
/// - Input handling (rustyline)
/// - Command processing
/// - Chat turns through the pipeline
/// - Display coordination
pub struct ReplSession {
    input_handler: InputHandler,
    command_handler: CommandHandler,
    session_manager: SessionManager,
    display_manager: DisplayManager,
    pipeline: ChatPipeline,
}

impl ReplSession {
    /// Create new REPL session
    pub fn new(pipeline: ChatPipeline, settings: ChatSettings) -> Result<Self> {
        Self::build(InputHandler::new()?, pipeline, settings)
    }

    /// Create REPL session with persistent input history
    pub fn with_history(
        pipeline: ChatPipeline,
        settings: ChatSettings,
        history_path: PathBuf,
    ) -> Result<Self> {
        Self::build(InputHandler::with_history(history_path)?, pipeline, settings)
    }

    fn build(
        input_handler: InputHandler,
        pipeline: ChatPipeline,
        settings: ChatSettings,
    ) -> Result<Self> {
        Ok(ReplSession {
            input_handler,
            command_handler: CommandHandler::new(),
            session_manager: SessionManager::new(settings),
            display_manager: DisplayManager::new(),
            pipeline,
        })
    }

    /// Replace the display manager (e.g. without the spinner)
    pub fn with_display(mut self, display_manager: DisplayManager) -> Self {
        self.display_manager = display_manager;
        self
    }

    /// Show welcome banner
    pub fn show_welcome(&self, version: &str) {
        self.display_manager
            .show_banner(version, self.session_manager.settings());
    }

    /// Main loop: read, dispatch, repeat until `/exit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.input_handler.read_line()? {
                InputEvent::Line(line) => {
                    if !self.handle_input(&line).await? {
                        break;
                    }
                }
                InputEvent::Interrupted => {
                    println!("\nUse /exit to quit gracefully");
                }
                InputEvent::Eof => break,
            }
        }

        self.save()
    }

    /// Handle user input (command or question)
    ///
    /// Returns true if session should continue, false to exit
    pub async fn handle_input(&mut self, input: &str) -> Result<bool> {
        if input.trim().is_empty() {
            return Ok(true);
        }

        if is_command(input) {
            let command = self.command_handler.parse(input);
            return self
                .command_handler
                .execute(command, &mut self.session_manager);
        }

        if self.session_manager.settings().knowledge_base_id.trim().is_empty() {
            self.display_manager
                .show_warning("No knowledge base selected. Set one with /kb <id>.");
            return Ok(true);
        }

        match self.ask(input).await {
            Ok(output) => self.display_manager.show_answer(&output),
            Err(e) => self.display_manager.show_error(&e.to_string()),
        }
        Ok(true)
    }

    /// Run one question through the pipeline
    pub async fn ask(&mut self, question: &str) -> Result<TurnOutput> {
        let turn = self.session_manager.begin_turn();
        let span = tracing::info_span!(
            "turn",
            session_id = %self.session_manager.session_id(),
            turn
        );

        self.display_manager.start_spinner("Consulting the knowledge base...");
        let (history, settings) = self.session_manager.turn_parts();
        let result = self
            .pipeline
            .run_turn(history, question, settings)
            .instrument(span)
            .await;
        self.display_manager.finish_current();

        Ok(result?)
    }

    /// Get session manager (immutable)
    pub fn session(&self) -> &SessionManager {
        &self.session_manager
    }

    /// Get session manager (mutable)
    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session_manager
    }

    /// Save input history
    pub fn save(&mut self) -> Result<()> {
        self.input_handler.save_history()
    }
}

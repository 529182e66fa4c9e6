//! Command-line argument parsing for bedrock-chat
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::config::Config;
use crate::models::ModelId;

/// bedrock-chat - Knowledge-base grounded chat over Amazon Bedrock
#[derive(Parser, Debug)]
#[command(name = "bedrock-chat")]
#[command(version)]
#[command(about = "Ask questions answered from a Bedrock knowledge base", long_about = None)]
pub struct Args {
    /// Model id used for moderation and generation
    #[arg(short, long)]
    pub model: Option<ModelId>,

    /// Knowledge base id
    #[arg(long = "kb-id")]
    pub kb_id: Option<String>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// Sampling temperature (0.0-1.0)
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Nucleus sampling top-p (0.0-1.0)
    #[arg(long = "top-p")]
    pub top_p: Option<f64>,

    /// Show retrieved passages with each answer
    #[arg(long)]
    pub show_context: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start interactive chat mode
    Start,

    /// Ask a single question and exit
    Ask {
        /// The question
        question: String,
    },

    /// List supported model ids
    Models,

    /// Display current configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Run configuration and connectivity checks
    Doctor,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Apply command-line overrides on top of file and environment values
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = self.model {
            config.chat.model = model;
        }
        if let Some(kb_id) = &self.kb_id {
            config.chat.knowledge_base_id = kb_id.clone();
        }
        if let Some(region) = &self.region {
            config.bedrock.region = region.clone();
        }
        if let Some(temperature) = self.temperature {
            config.chat.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            config.chat.top_p = top_p;
        }
        if self.show_context {
            config.chat.show_context = true;
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Terminal log level
    pub fn log_level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(parse(&["bedrock-chat", "-q"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(parse(&["bedrock-chat"]).verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(parse(&["bedrock-chat", "-v"]).verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_very_verbose() {
        assert_eq!(parse(&["bedrock-chat", "-vv"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_ask_subcommand() {
        let args = parse(&["bedrock-chat", "--kb-id", "KB1", "ask", "How do excavators work?"]);
        assert_eq!(
            args.command,
            Some(Commands::Ask {
                question: "How do excavators work?".to_string()
            })
        );
        assert_eq!(args.kb_id.as_deref(), Some("KB1"));
    }

    #[test]
    fn test_config_init_flag() {
        let args = parse(&["bedrock-chat", "config", "--init"]);
        assert_eq!(args.command, Some(Commands::Config { init: true }));
    }

    #[test]
    fn test_model_parsed_from_id() {
        let args = parse(&["bedrock-chat", "--model", "anthropic.claude-3-5-sonnet-20240620-v1:0"]);
        assert_eq!(args.model, Some(ModelId::ClaudeSonnet35));
        assert!(Args::try_parse_from(["bedrock-chat", "--model", "gpt-4"]).is_err());
    }

    #[test]
    fn test_apply_to_overrides_config() {
        let args = parse(&[
            "bedrock-chat",
            "--kb-id",
            "KB9",
            "--region",
            "eu-central-1",
            "--temperature",
            "0.2",
            "--show-context",
        ]);
        let mut config = Config::default();
        config.chat.top_p = 0.5;
        args.apply_to(&mut config);

        assert_eq!(config.chat.knowledge_base_id, "KB9");
        assert_eq!(config.bedrock.region, "eu-central-1");
        assert_eq!(config.chat.temperature, 0.2);
        assert_eq!(config.chat.top_p, 0.5);
        assert!(config.chat.show_context);
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert_eq!(Verbosity::Normal.log_level(), "warn");
        assert_eq!(Verbosity::VeryVerbose.log_level(), "debug");
    }
}

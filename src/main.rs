//! bedrock-chat - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

use bedrock_chat::bedrock::BedrockClient;
use bedrock_chat::cli::{Args, Commands, Config};
use bedrock_chat::doctor::Doctor;
use bedrock_chat::models::ModelId;
use bedrock_chat::repl::{DisplayManager, ReplSession};
use bedrock_chat::{logging, ChatHistory, ChatPipeline};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // `config --init` must work before any file exists
    let mut config = match &args.command {
        Some(Commands::Config { init: true }) => Config::default(),
        _ => Config::load(args.config.clone())?,
    };
    config.apply_env();
    args.apply_to(&mut config);

    logging::init(args.verbosity(), &config.log_dir())?;
    tracing::debug!(version = VERSION, "starting bedrock-chat");

    match &args.command {
        Some(Commands::Start) | None => run_repl(&args, &config).await?,
        Some(Commands::Ask { question }) => ask_once(&args, &config, question).await?,
        Some(Commands::Models) => list_models(&config),
        Some(Commands::Config { init }) => show_config(&args, &config, *init)?,
        Some(Commands::Doctor) => run_doctor(&config).await?,
    }

    Ok(())
}

async fn build_pipeline(config: &Config) -> Result<ChatPipeline> {
    let client = Arc::new(BedrockClient::from_config(&config.bedrock).await?);
    Ok(ChatPipeline::from_client(client)
        .with_answer_without_context(config.chat.answer_without_context))
}

async fn run_repl(args: &Args, config: &Config) -> Result<()> {
    config.validate_for_chat()?;

    let pipeline = build_pipeline(config).await?;
    let display = if args.verbosity().show_progress() {
        DisplayManager::new()
    } else {
        DisplayManager::new().without_progress()
    };

    let mut repl_session =
        ReplSession::with_history(pipeline, config.chat_settings(), config.history_path())?
            .with_display(display);

    repl_session.show_welcome(VERSION);
    repl_session.run().await
}

async fn ask_once(args: &Args, config: &Config, question: &str) -> Result<()> {
    config.validate_for_chat()?;

    let pipeline = build_pipeline(config).await?;
    let settings = config.chat_settings();
    let mut history = ChatHistory::new();
    let mut display = if args.verbosity().show_progress() {
        DisplayManager::new()
    } else {
        DisplayManager::new().without_progress()
    };

    display.start_spinner("Consulting the knowledge base...");
    let output = pipeline.run_turn(&mut history, question, &settings).await;
    display.finish_current();

    let output = output?;
    println!("{}", output.response);
    if let Some(records) = &output.context {
        println!();
        display.show_context(records);
    }

    Ok(())
}

fn list_models(config: &Config) {
    println!("\nSupported models:");
    for (i, model) in ModelId::ALL.iter().enumerate() {
        let marker = if *model == config.chat.model { "*" } else { " " };
        println!("  {} {}. {:<22} {}", marker.green(), i + 1, model.label(), model.as_str());
    }
    println!();
}

fn show_config(args: &Args, config: &Config, init: bool) -> Result<()> {
    if init {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => Config::default_path()
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?,
        };
        if path.exists() {
            println!("{} {} already exists", "Warning:".yellow().bold(), path.display());
            return Ok(());
        }
        Config::default().save(&path)?;
        println!("{} Wrote default configuration to {}", "✓".green(), path.display());
        return Ok(());
    }

    println!("\n{}", "bedrock-chat Configuration".bold().cyan());
    println!("{}", "=".repeat(56).cyan());
    println!("Bedrock:");
    println!("  Region:             {}", config.bedrock.region);
    println!("  Runtime endpoint:   {}", config.bedrock.runtime_url());
    println!("  Agent endpoint:     {}", config.bedrock.agent_runtime_url());
    println!("  API key variable:   {}", config.bedrock.api_key_env);
    println!("  AWS credentials:    {}", config.bedrock.use_aws_credentials);
    println!(
        "  Request timeout:    {}",
        match config.bedrock.request_timeout() {
            Some(timeout) => format!("{}s", timeout.as_secs()),
            None => "none".to_string(),
        }
    );
    println!();
    println!("Chat:");
    println!("  Model:              {}", config.chat.model);
    println!(
        "  Knowledge base:     {}",
        if config.chat.knowledge_base_id.is_empty() {
            "(not set)"
        } else {
            config.chat.knowledge_base_id.as_str()
        }
    );
    println!("  Temperature:        {}", config.chat.temperature);
    println!("  Top-p:              {}", config.chat.top_p);
    println!("  Top-k:              {}", config.chat.top_k);
    println!("  Show context:       {}", config.chat.show_context);
    println!("  Answer w/o context: {}", config.chat.answer_without_context);
    println!();
    println!("Paths:");
    println!("  State:              {}", config.state_dir().display());
    println!("  Logs:               {}", config.log_dir().display());
    println!("  Verbosity:          {}", args.verbosity().as_str());
    println!();

    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let client = BedrockClient::from_config(&config.bedrock).await?;
    let doctor = Doctor::new(config.clone());

    let checks = doctor.run_diagnostics(&client).await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

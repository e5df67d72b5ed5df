use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use toolchat_core::{AgentLoop, Config, agent, config, providers, tools};
use tracing_subscriber::EnvFilter;

mod input;

#[derive(Parser)]
#[command(name = "toolchat")]
#[command(about = "toolchat - chat with an LLM that can call local tools", long_about = None)]
struct Cli {
    /// Path to the config file (default: ~/.toolchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a conversation
    Chat {
        /// Send a single message and print the answer
        #[arg(short, long)]
        message: Option<String>,

        /// Provider to use: openai, ollama or gemini
        #[arg(long)]
        provider: Option<String>,

        /// Model identifier passed to the provider
        #[arg(long)]
        model: Option<String>,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("toolchat_core={},toolchat={}", level, level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn build_agent(config: &Config) -> Result<AgentLoop> {
    let provider = providers::create_provider(config)?;
    let registry = tools::default_registry().context("Failed to register built-in tools")?;

    Ok(AgentLoop::new(provider, Arc::new(registry))
        .with_system_prompt(config.system_prompt.clone())
        .with_max_tool_calls(config.max_tool_calls)
        .with_retry(config.retry))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(config::get_config_path);
    let command = cli.command.unwrap_or(Commands::Chat {
        message: None,
        provider: None,
        model: None,
    });

    match command {
        Commands::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            config::save_config(&Config::default(), &config_path)?;
            println!(
                "{} Wrote default config to {}",
                style("✓").green().bold(),
                config_path.display()
            );
        }
        Commands::Chat {
            message,
            provider,
            model,
        } => {
            let mut config = Config::load_or_default(&config_path)?;
            if provider.is_some() {
                config.provider = provider;
            }
            if model.is_some() {
                config.model = model;
            }

            tracing::info!(
                path = %config_path.display(),
                provider = config.provider.as_deref().unwrap_or("openai"),
                "Starting chat"
            );
            let mut agent_loop = build_agent(&config)?;

            if let Some(msg) = message {
                let answer = agent_loop
                    .process(&msg)
                    .await
                    .context("Agent processing failed")?;
                println!("{}{}", agent::repl::ASSISTANT_PREFIX, answer);
            } else {
                println!(
                    "{}",
                    style("toolchat - type 'end' or press Ctrl+D to exit").bold()
                );
                let mut input = input::TerminalInput::new()?;
                let mut stdout = std::io::stdout();
                let mut stderr = std::io::stderr();
                agent::run_repl(&mut agent_loop, &mut input, &mut stdout, &mut stderr).await?;
            }
        }
    }

    Ok(())
}

//! Command-line front end for the coaching API.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::client::{ClientError, CoachingClient};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "coaching-cli", about = "Manage coaching strategies, AEs and prompts")]
struct Cli {
    /// Base URL of the coaching API
    #[arg(long, env = "COACHING_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List or create strategies
    Strategies {
        #[command(subcommand)]
        action: StrategyCmd,
    },
    /// Manage account executives
    Aes {
        #[command(subcommand)]
        action: AeCmd,
    },
    /// Show or replace the active prompt
    Prompt {
        #[command(subcommand)]
        action: PromptCmd,
    },
    /// Latest email logs
    Logs {
        #[arg(long)]
        strategy: Option<Uuid>,
    },
    /// Queue a coaching email for a Gong call
    Generate {
        #[arg(long)]
        strategy: Option<Uuid>,
        #[arg(long)]
        ae_email: String,
        #[arg(long)]
        call_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum StrategyCmd {
    List,
    Create { name: String },
}

#[derive(Subcommand, Debug)]
enum AeCmd {
    List {
        #[arg(long)]
        strategy: Option<Uuid>,
    },
    Add {
        email: String,
        #[arg(long)]
        strategy: Option<Uuid>,
    },
    /// Reassign an AE to another strategy
    Move {
        ae_id: Uuid,
        #[arg(long = "to")]
        strategy_id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
enum PromptCmd {
    Show {
        #[arg(long)]
        strategy: Option<Uuid>,
    },
    Set {
        body: String,
        #[arg(long)]
        strategy: Option<Uuid>,
    },
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &CoachingClient, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Strategies { action: StrategyCmd::List } => {
            print(&checked(client.list_strategies().await)?)
        }
        Commands::Strategies { action: StrategyCmd::Create { name } } => {
            print(&checked(client.create_strategy(&name).await)?)
        }
        Commands::Aes { action: AeCmd::List { strategy } } => {
            print(&checked(client.list_aes(strategy).await)?)
        }
        Commands::Aes { action: AeCmd::Add { email, strategy } } => {
            print(&checked(client.create_ae(strategy, &email).await)?)
        }
        Commands::Aes { action: AeCmd::Move { ae_id, strategy_id } } => {
            print(&checked(client.move_ae(ae_id, strategy_id).await)?)
        }
        Commands::Prompt { action: PromptCmd::Show { strategy } } => {
            print(&checked(client.get_prompt(strategy).await)?)
        }
        Commands::Prompt { action: PromptCmd::Set { body, strategy } } => {
            print(&checked(client.update_prompt(strategy, &body).await)?)
        }
        Commands::Logs { strategy } => print(&checked(client.list_email_logs(strategy).await)?),
        Commands::Generate { strategy, ae_email, call_id } => {
            print(&checked(client.generate(strategy, &ae_email, &call_id).await)?)
        }
    }
}

fn checked<T>(res: Result<T, ClientError>) -> anyhow::Result<T> {
    res.map_err(|e| anyhow::anyhow!(describe(&e)))
}

/// Human readable text for a failed call, naming the owner on AE conflicts.
fn describe(err: &ClientError) -> String {
    match err.conflict() {
        Some(c) => match (c.existing_strategy_name, c.existing_strategy_id) {
            (Some(name), Some(id)) => format!("{}: {name} ({id})", c.error),
            _ => c.error,
        },
        None => err.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(api_url = %cli.api_url, "using coaching api");
    let client = CoachingClient::new(cli.api_url.clone());

    run(&client, cli.command)
        .await
        .with_context(|| format!("command against {} failed", client.base_url()))
}

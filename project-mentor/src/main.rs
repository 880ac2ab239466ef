use anyhow::Result;
use clap::Parser;
use project_mentor::config::MentorConfig;
use project_mentor::store::{MemoryStore, SqliteStore};
use project_mentor::Orchestrator;
use project_mentor_sdk::{
    log_agent_status, log_info, log_warning, AgentStatus, PersistenceAdapter, TurnRequest,
    TurnResponse,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Interactive chat with the project mentor.
#[derive(Parser, Debug)]
#[command(name = "project-mentor", version, about)]
struct Args {
    /// Session id (state is kept per session)
    #[arg(short, long, default_value = "default")]
    session: String,

    /// SQLite database path (defaults to ~/.project-mentor/sessions.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep state in memory only (no database)
    #[arg(long)]
    memory: bool,

    /// Manual mode: run only this collaborator (plus its prerequisites)
    #[arg(short, long)]
    agent: Option<String>,

    /// Send a single message and exit instead of starting the REPL
    #[arg(short, long)]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = MentorConfig::from_env();
    if let Some(db) = &args.db {
        config.database_path = db.clone();
    }

    let store: Arc<dyn PersistenceAdapter> = if args.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::open(config.database_path.clone())?)
    };

    let orchestrator = Orchestrator::builtin(&config, store);

    if let Some(message) = &args.message {
        let response = send(&orchestrator, &args, message).await?;
        println!("{}", response.message);
        return Ok(());
    }

    log_info!("Project mentor, session '{}'", args.session);
    if args.memory {
        log_warning!("In-memory state: everything is lost on exit");
    }
    println!("Type 'exit' or 'quit' to end.\n");

    let stdin = io::stdin();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            println!("Goodbye.");
            break;
        }

        match send(&orchestrator, &args, input).await {
            Ok(response) => print_turn(&response),
            Err(err) => log_warning!("Turn failed: {}", err),
        }
    }

    Ok(())
}

async fn send(
    orchestrator: &Orchestrator,
    args: &Args,
    message: &str,
) -> Result<TurnResponse> {
    let request = match &args.agent {
        Some(agent_id) => TurnRequest::manual(&args.session, message, agent_id),
        None => TurnRequest::auto(&args.session, message),
    };
    Ok(orchestrator.process_request(request).await?)
}

fn print_turn(response: &TurnResponse) {
    for result in &response.agent_results {
        let status = match result.status {
            AgentStatus::Success => {
                if result.state_delta_keys.is_empty() {
                    "ran".to_string()
                } else {
                    format!("updated {}", result.state_delta_keys.join(", "))
                }
            }
            AgentStatus::Skipped => "skipped (not available)".to_string(),
            AgentStatus::Error => format!(
                "failed: {}",
                result.content.as_deref().unwrap_or("unknown error")
            ),
        };
        log_agent_status!(result.agent_name, status);
    }

    println!("Mentor: {}\n", response.message);
    log_info!("Phase: {}", response.state.phase);

    if response.awaiting_selection {
        println!("Available collaborators:");
        for agent in &response.available_agents {
            let marker = if agent.available { "✓" } else { "✗" };
            println!("  {} {}: {}", marker, agent.agent_id, agent.description);
        }
    }
}

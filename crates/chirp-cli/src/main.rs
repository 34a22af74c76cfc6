use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use chirp_cli::ChirpClient;
use chirp_cli::display::{SEPARATOR, render_chirp, render_thread};
use chirp_types::events::MonitorEvent;
use chirp_types::models::{ChirpId, ROOT_PARENT};

#[derive(Parser)]
#[command(name = "chirp")]
#[command(version)]
#[command(about = "Command-line client for the chirp service", long_about = None)]
struct Cli {
    /// Service tier base URL.
    #[arg(long, global = true, env = "CHIRP_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Register a new user")]
    Register { username: String },
    #[command(about = "Post a chirp, optionally as a reply")]
    Chirp {
        username: String,
        text: String,
        #[arg(long)]
        reply: Option<ChirpId>,
    },
    #[command(about = "Replace the text of a chirp")]
    Edit {
        username: String,
        id: ChirpId,
        text: String,
    },
    #[command(about = "Delete a chirp")]
    Delete { username: String, id: ChirpId },
    #[command(about = "Follow another user")]
    Follow { username: String, to_follow: String },
    #[command(about = "Read a chirp and its replies")]
    Read { id: ChirpId },
    #[command(about = "Stream chirps from followed users")]
    Monitor {
        username: String,
        /// Replay chirps posted after this RFC 3339 time, then exit.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

impl Commands {
    fn label(&self) -> String {
        match self {
            Commands::Register { username } => format!("Registered {}", username),
            Commands::Chirp { username, .. } => format!("Posted a chirp as {}", username),
            Commands::Edit { username, id, .. } => format!("Edited chirp {} as {}", id, username),
            Commands::Delete { username, id } => format!("Deleted chirp {} as {}", id, username),
            Commands::Follow { username, to_follow } => {
                format!("Followed {} as {}", to_follow, username)
            }
            Commands::Read { id } => format!("Read a chirp with id {}", id),
            Commands::Monitor { username, .. } => format!("Monitored as {}", username),
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_cli=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let label = cli.command.label();
    let client = ChirpClient::new(&cli.server);

    if let Err(e) = run(&client, cli.command, &label).await {
        println!("{}: {:#}", label, e);
        std::process::exit(1);
    }
}

async fn run(client: &ChirpClient, command: Commands, label: &str) -> anyhow::Result<()> {
    match command {
        Commands::Register { username } => {
            client.register(&username).await?;
            println!("{}: OK", label);
        }
        Commands::Chirp {
            username,
            text,
            reply,
        } => {
            let chirp = client
                .chirp(&username, &text, reply.unwrap_or(ROOT_PARENT))
                .await?;
            println!("{}: OK\n", label);
            print!("{}", render_chirp(&chirp, 0, Utc::now()));
        }
        Commands::Edit { username, id, text } => {
            let chirp = client.edit(&username, id, &text).await?;
            println!("{}: OK\n", label);
            print!("{}", render_chirp(&chirp, 0, Utc::now()));
        }
        Commands::Delete { username, id } => {
            client.delete(&username, id).await?;
            println!("{}: OK", label);
        }
        Commands::Follow {
            username,
            to_follow,
        } => {
            client.follow(&username, &to_follow).await?;
            println!("{}: OK", label);
        }
        Commands::Read { id } => {
            let thread = client.read(id).await?;
            println!("{}: OK\n", label);
            print!("{}", render_thread(&thread, Utc::now()));
        }
        Commands::Monitor { username, since } => {
            let mut events = client.monitor(&username, since).await?;
            while let Some(event) = events.next().await {
                match event? {
                    MonitorEvent::Ready { .. } => println!("{}: OK\n", label),
                    MonitorEvent::Chirp(chirp) => {
                        print!("{}", render_chirp(&chirp, 0, Utc::now()));
                        println!("{}", SEPARATOR);
                    }
                    MonitorEvent::ReplayComplete { cursor } => {
                        println!("Caught up to {}", cursor.to_rfc3339());
                    }
                }
            }
        }
    }
    Ok(())
}

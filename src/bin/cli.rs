//! Weighlog CLI
//!
//! Command-line interface for Weighlog operations:
//! - List and delete entries
//! - Export entries to a spreadsheet
//! - Watch the change feed
//! - Check backend status

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use weighlog::export::{export_entries, render_table};
use weighlog::session::is_confirmed;
use weighlog::{
    generate_default_config, ChangeFeed, Config, EntryStore, ExportFormat, ExportZone, FeedKind,
    TruckEntry,
};

#[derive(Parser)]
#[command(name = "weighlog-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage recorded truck weigh-in entries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List recorded entries, newest first
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export entries to a spreadsheet
    Export {
        /// File format (xlsx, csv)
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Output directory (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Time zone for dates and times (local, utc)
        #[arg(long)]
        timezone: Option<ExportZone>,
    },

    /// Print the entry list whenever it changes
    Watch {
        /// Change feed (poll, push)
        #[arg(long)]
        feed: Option<FeedKind>,
    },

    /// Show backend status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }
    config.logging.init(None);

    match cli.command {
        Commands::List { json } => {
            let (store, _) = config.backend.connect()?;
            let entries = store.list_all().await.context("Unable to load entries")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print!("{}", render_table(&entries, config.export.timezone));
            }
        }

        Commands::Delete { id, yes } => {
            if !yes && !confirm(&format!("Delete entry {}? [y/N] ", id))? {
                println!("Cancelled");
                return Ok(());
            }

            let (store, _) = config.backend.connect()?;
            store.remove(&id).await.context("Failed to delete entry")?;
            println!("Deleted {}", id);
        }

        Commands::Export {
            format,
            output,
            timezone,
        } => {
            let format = format.unwrap_or(config.export.format);
            let zone = timezone.unwrap_or(config.export.timezone);
            let dir = output.unwrap_or_else(|| config.export.output_path());

            let (store, _) = config.backend.connect()?;
            let entries = store.list_all().await.context("Unable to load entries")?;
            let path = export_entries(&entries, &dir, format, zone)?;

            println!("Exported {} entries to {}", entries.len(), path.display());
        }

        Commands::Watch { feed } => {
            if let Some(feed) = feed {
                config.backend.feed = feed;
            }
            let zone = config.export.timezone;
            let (store, feed) = config.backend.connect()?;

            let initial = store.list_all().await.context("Unable to load entries")?;
            print!("{}", render_table(&initial, zone));

            let last = Arc::new(std::sync::Mutex::new(initial));
            let subscription = feed.subscribe(Arc::new(move |entries: Vec<TruckEntry>| {
                let mut last = last.lock().unwrap_or_else(|p| p.into_inner());
                if *last != entries {
                    println!();
                    print!("{}", render_table(&entries, zone));
                    *last = entries;
                }
            }));

            println!(
                "Watching {} ({:?} feed), Ctrl+C to stop",
                config.backend.url, config.backend.feed
            );
            tokio::signal::ctrl_c().await?;
            subscription.unsubscribe();
        }

        Commands::Status => {
            let client = reqwest::Client::new();
            let url = config.backend.url.trim_end_matches('/');
            let response = client.get(format!("{}/health", url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    println!("Weighlog v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!(
                        "Backend Status: {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!("Database: {}", health["database"].as_str().unwrap_or("unknown"));
                    if let Some(entries) = health["entries"].as_u64() {
                        println!("Entries: {}", entries);
                    }
                    if let Some(connections) = health["websocket_connections"].as_u64() {
                        println!("Live connections: {}", connections);
                    }
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("Backend returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Weighlog backend at {}", url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the backend is running:");
                    eprintln!("  cargo run --bin weighlog-api");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{}", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(is_confirmed(&answer))
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

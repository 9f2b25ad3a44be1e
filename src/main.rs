//! Weighlog
//!
//! Interactive session screen: start and stop weigh-in sessions, fill in
//! the form, and watch the entry list refresh as the backend changes.

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

use weighlog::export::render_table;
use weighlog::session::{is_confirmed, Command, HELP, TICK, ZERO_ELAPSED};
use weighlog::{
    AppShell, Config, FeedKind, SessionState, SessionTimer, ShellError, TimerHandle, TruckEntry,
};

#[derive(Parser)]
#[command(name = "weighlog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Truck weigh-in session logger")]
struct Args {
    /// Config file (default: standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long)]
    backend_url: Option<String>,

    /// Change feed: poll or push
    #[arg(long)]
    feed: Option<FeedKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(url) = args.backend_url {
        config.backend.url = url;
    }
    if let Some(feed) = args.feed {
        config.backend.feed = feed;
    }

    config.logging.init(None);
    tracing::info!("Weighlog v{} using {}", env!("CARGO_PKG_VERSION"), config.backend.url);

    let (store, feed) = config.backend.connect()?;
    let zone = config.export.timezone;
    let mut shell = AppShell::new(store).with_export_zone(zone);

    let last_seen: Arc<Mutex<Vec<TruckEntry>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&last_seen);
    shell.on_entries_changed(Arc::new(move |entries: Vec<TruckEntry>| {
        let mut last = seen.lock().unwrap_or_else(|p| p.into_inner());
        if *last != entries {
            println!("\n[entries updated: {} total]", entries.len());
            *last = entries;
        }
    }));

    println!("Weighlog v{} - type 'help' for commands", env!("CARGO_PKG_VERSION"));
    shell.mount(feed.as_ref()).await;
    report_error(&shell);
    *last_seen.lock().unwrap_or_else(|p| p.into_inner()) = shell.entries();
    println!("{} entries loaded", shell.entries().len());

    let elapsed = Arc::new(Mutex::new(ZERO_ELAPSED.to_string()));
    let mut timer: Option<TimerHandle> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(&elapsed, shell.state().is_running());

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Start => match shell.start() {
                Ok(start_time) => {
                    timer = Some(spawn_timer(start_time, &elapsed));
                    println!("Session started at {}", start_time.format("%H:%M:%S"));
                }
                Err(e) => println!("{}", e),
            },

            Command::Stop => match shell.stop().await {
                Ok(entry) => {
                    if let Some(timer) = timer.take() {
                        timer.stop();
                    }
                    set_elapsed(&elapsed, ZERO_ELAPSED);
                    println!(
                        "Saved {}: {} tons, {}",
                        entry.truck_id,
                        entry.weight,
                        entry
                            .duration()
                            .map(|d| format!("{}s", d.num_seconds()))
                            .unwrap_or_default()
                    );
                }
                Err(e) => report_failure(&shell, e),
            },

            Command::Edit(field, value) => {
                shell.edit(field, value);
                print_form(&shell);
            }

            Command::Form => print_form(&shell),

            Command::List => print!("{}", render_table(&shell.entries(), zone)),

            Command::Refresh => match shell.refresh().await {
                Ok(count) => println!("{} entries loaded", count),
                Err(e) => report_failure(&shell, e),
            },

            Command::Delete(id) => {
                shell.request_delete(id.clone());
                prompt_text(&format!("Delete entry {}? [y/N] ", id));

                let answer = tokio::select! {
                    line = lines.next_line() => line?.unwrap_or_default(),
                    _ = tokio::signal::ctrl_c() => String::new(),
                };

                if is_confirmed(&answer) {
                    match shell.confirm_delete().await {
                        Ok(id) => println!("Deleted {}", id),
                        Err(e) => report_failure(&shell, e),
                    }
                } else {
                    shell.cancel_delete();
                    println!("Cancelled");
                }
            }

            Command::Export(format) => {
                let format = format.unwrap_or(config.export.format);
                match shell.export(&config.export.output_path(), format) {
                    Ok(path) => println!(
                        "Exported {} entries to {}",
                        shell.entries().len(),
                        path.display()
                    ),
                    Err(e) => println!("{}", e),
                }
            }

            Command::Status => print_status(&shell),

            Command::Help => println!("{}", HELP),

            Command::Quit => break,
        }

        report_error(&shell);
    }

    shell.unmount();
    if let Some(timer) = timer.take() {
        timer.stop();
    }
    if shell.state().is_running() {
        println!("Session still open; it was not saved.");
    }

    tracing::info!("Weighlog stopped");
    Ok(())
}

fn spawn_timer(start_time: chrono::DateTime<Utc>, elapsed: &Arc<Mutex<String>>) -> TimerHandle {
    let display = Arc::clone(elapsed);
    SessionTimer::spawn(start_time, TICK, move |value| set_elapsed(&display, &value))
}

fn set_elapsed(elapsed: &Mutex<String>, value: &str) {
    let mut current = elapsed.lock().unwrap_or_else(|p| p.into_inner());
    *current = value.to_string();
}

fn prompt(elapsed: &Mutex<String>, running: bool) {
    if running {
        let current = elapsed.lock().unwrap_or_else(|p| p.into_inner()).clone();
        prompt_text(&format!("[{}] > ", current));
    } else {
        prompt_text("> ");
    }
}

fn prompt_text(text: &str) {
    use std::io::Write;

    print!("{}", text);
    let _ = std::io::stdout().flush();
}

fn report_error(shell: &AppShell) {
    if let Some(error) = shell.error() {
        println!("! {}", error);
    }
}

/// Print the error unless the shell already shows a banner for it
fn report_failure(shell: &AppShell, error: ShellError) {
    if shell.error().is_none() {
        println!("{}", error);
    }
}

fn print_form(shell: &AppShell) {
    let form = shell.form();
    println!("  Truck ID: {}", form.truck_id);
    println!("  Weight:   {}", form.weight);
    println!("  Comments: {}", form.comments);
}

fn print_status(shell: &AppShell) {
    match shell.state() {
        SessionState::Idle => println!("Idle"),
        SessionState::Running { start_time } => println!(
            "Running since {} ({})",
            start_time.format("%H:%M:%S"),
            shell.elapsed(Utc::now())
        ),
    }
    print_form(shell);
    println!("  Entries:  {}", shell.entries().len());
    if shell.is_loading() {
        println!("  Loading...");
    }
}

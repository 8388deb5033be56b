// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Terminal live view for a flight logging backend.

mod config;
mod display;

use std::error::Error;
use std::io::Write;

use clap::{Args, Parser, Subcommand};
use flightdeck_client::{Session, StatsEndpoint};
use log::{info, warn};

use config::AppConfig;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "flightdeck", version, about = "Live flight list from a flight logging backend")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Maximum flights per refresh (overrides the config file)
    #[arg(long, global = true)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll the backend and redraw the flight list every second (default)
    Live(LiveArgs),
    /// Print one statistic as JSON, e.g. `summary-24h` or `routes-map-week`
    Stats { endpoint: StatsEndpoint },
    /// Show the config file location and current values
    Config {
        /// Write the effective values, including command-line overrides,
        /// back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Default, Args)]
struct LiveArgs {
    /// Only show flights whose callsign, registration, type, model or route
    /// contains this text
    #[arg(short, long, default_value = "")]
    query: String,

    /// Show flights seen around this local time (e.g. 2025-06-01T14:30)
    /// instead of the live list
    #[arg(long)]
    at: Option<String>,

    /// Expand all rows and fill in aircraft photos
    #[arg(long)]
    photos: bool,

    /// Refresh once, print, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut app_config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    apply_overrides(&cli, &mut app_config);

    match cli.command.unwrap_or(Command::Live(LiveArgs::default())) {
        Command::Live(args) => {
            let session = Session::new(app_config.client_config())?;
            run_live(&session, &args, &app_config).await
        }
        Command::Stats { endpoint } => {
            let session = Session::new(app_config.client_config())?;
            let value = session.stats(endpoint).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Config { save } => {
            if save {
                app_config.save()?;
                info!("Saved configuration");
            }
            println!("{}", AppConfig::get_config_path()?.display());
            println!("{app_config:#?}");
            Ok(())
        }
    }
}

fn apply_overrides(cli: &Cli, app_config: &mut AppConfig) {
    if let Some(api_base) = &cli.api_base {
        app_config.api_base.clone_from(api_base);
    }
    if let Some(limit) = cli.limit {
        app_config.flight_limit = limit;
    }
}

async fn run_live(session: &Session, args: &LiveArgs, app_config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let snapshot = session.snapshot();
    snapshot.set_query(&args.query);

    if args.once {
        snapshot.refresh().await?;
        if let Some(at) = &args.at {
            snapshot.apply_time_filter(at).await;
        }
        if args.photos {
            if let Some(fill) = session.toggle_expand_all() {
                fill.await?;
            }
        }
        print!("{}", display::render(session, chrono::Utc::now(), &app_config.local_airports));
        return Ok(());
    }

    let scheduler = session.start_polling();
    if let Some(at) = &args.at {
        snapshot.apply_time_filter(at).await;
    }

    let mut clock = scheduler.clock();
    let mut photos_started = false;
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            changed = clock.changed() => {
                if changed.is_err() {
                    break;
                }
                // Wait for the first listing so the fill covers real rows
                if args.photos && !photos_started && snapshot.last_refresh().is_some() {
                    let _ = session.toggle_expand_all();
                    photos_started = true;
                }
                let now = *clock.borrow_and_update();
                write!(stdout, "{}", display::render_frame(session, now, &app_config.local_airports))?;
                stdout.flush()?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    session.collapse_all();
    scheduler.stop();
    Ok(())
}

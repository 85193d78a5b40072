// src/main.rs
//! Habitumap - route tracking and daily habit resets from the terminal

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use habitumap::{
    clock::{Clock, SystemClock},
    config::TrackerConfig,
    display::{self, terminal::stop_on_ctrl_c, StatusFrame, TerminalDisplay},
    geo::{distance::format_km, route_distance_km},
    habits::HabitBook,
    provider::{GpsdProvider, LocationProvider, ReplayProvider},
    route::RouteSummary,
    store::{FileStore, RouteBook},
    DailyResetScheduler, Tracker,
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

type Store = Arc<FileStore>;
type Scheduler = DailyResetScheduler<Store, HabitBook<Store>>;

#[derive(Parser, Debug)]
#[command(name = "habitumap")]
#[command(about = "Record GPS routes and keep daily habits on schedule")]
struct Cli {
    /// Override the data directory from the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a route from gpsd or a replay file
    Track {
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        seconds: Option<u64>,
        /// Add a note at the current position before stopping
        #[arg(long)]
        note: Option<String>,
        /// Drop any unfinished session instead of resuming it
        #[arg(long)]
        discard: bool,
    },
    #[command(subcommand)]
    Routes(RouteCommand),
    #[command(subcommand)]
    Habits(HabitCommand),
    #[command(subcommand)]
    Reset(ResetCommand),
    /// Total haversine distance of a point file
    Distance { file: PathBuf },
    /// Write habits and routes as a JSON backup (photo references removed)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum RouteCommand {
    List,
    Show { id: String },
    Delete { id: String },
    /// Remove habits, routes and any unfinished session
    Clear,
    Info,
}

#[derive(Subcommand, Debug)]
enum HabitCommand {
    List,
    Add { name: String },
    Toggle { id: u64 },
    Delete { id: u64 },
    Stats,
}

#[derive(Subcommand, Debug)]
enum ResetCommand {
    /// Reset habits if the local day changed
    Check,
    Force,
    Countdown,
    /// Keep checking until Ctrl+C
    Watch,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    SetGpsd {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 2947)]
        port: u16,
    },
    SetReplay {
        file: PathBuf,
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    SetThresholds {
        #[arg(long)]
        min_time_secs: u64,
        #[arg(long)]
        min_distance_m: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = TrackerConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default configuration");
        TrackerConfig::default()
    });
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }

    let command = match cli.command {
        Commands::Config(command) => return run_config(config, command),
        command => command,
    };

    let data_dir = config.resolve_data_dir()?;
    let store: Store = Arc::new(FileStore::new(data_dir.clone())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    tracing::debug!(data_dir = %data_dir.display(), "Opened data directory");

    match command {
        Commands::Track {
            replay,
            seconds,
            note,
            discard,
        } => {
            let scheduler = Arc::new(DailyResetScheduler::new(
                Arc::clone(&store),
                HabitBook::new(Arc::clone(&store)),
                Arc::clone(&clock),
            ));
            let replay = replay.or_else(|| match config.provider.as_str() {
                "replay" => config.replay_file.clone(),
                _ => None,
            });

            match replay {
                Some(path) => {
                    let provider = ReplayProvider::from_file(&path)?
                        .with_delay(Duration::from_millis(config.replay_delay_ms));
                    record(provider, store, clock, scheduler, &config, TrackOptions { seconds, note, discard }).await
                }
                None if config.provider == "replay" => {
                    bail!("Replay provider selected but no replay file configured")
                }
                None => {
                    let provider = GpsdProvider::new(config.gpsd_host.clone(), config.gpsd_port)
                        .with_thresholds(config.min_time_secs, config.min_distance_m);
                    record(provider, store, clock, scheduler, &config, TrackOptions { seconds, note, discard }).await
                }
            }
        }
        Commands::Routes(command) => run_routes(RouteBook::new(store), command),
        Commands::Habits(command) => run_habits(HabitBook::new(store), command),
        Commands::Reset(command) => {
            let scheduler = DailyResetScheduler::new(
                Arc::clone(&store),
                HabitBook::new(Arc::clone(&store)),
                clock,
            );
            run_reset(Arc::new(scheduler), &config, command).await
        }
        Commands::Distance { file } => {
            let replay = ReplayProvider::from_file(&file)?;
            let points = replay.points();
            let total = route_distance_km(points);
            println!("Points:   {}", points.len());
            println!("Distance: {}", format_km(total, 2));
            Ok(())
        }
        Commands::Export { output } => {
            let export = RouteBook::new(store).export(clock.as_ref())?;
            let json = serde_json::to_string_pretty(&export)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Exported {} habits and {} routes to {}",
                        export.habits.len(),
                        export.routes.len(),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Config(_) => Ok(()),
    }
}

/// Log to stderr so the status screen owns stdout.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("habitumap=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn spawn_reset_checks(
    scheduler: Arc<Scheduler>,
    period: Duration,
    running: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { scheduler.run_interval(period, running).await })
}

struct TrackOptions {
    seconds: Option<u64>,
    note: Option<String>,
    discard: bool,
}

async fn record<P: LocationProvider>(
    provider: P,
    store: Store,
    clock: Arc<dyn Clock>,
    scheduler: Arc<Scheduler>,
    config: &TrackerConfig,
    options: TrackOptions,
) -> Result<()> {
    let TrackOptions { seconds, note, discard } = options;
    let running = Arc::new(AtomicBool::new(true));
    stop_on_ctrl_c(Arc::clone(&running));
    let checks = spawn_reset_checks(
        Arc::clone(&scheduler),
        Duration::from_secs(config.reset_check_secs.max(1)),
        Arc::clone(&running),
    );

    let mut tracker = Tracker::new(provider, store, clock);
    if discard {
        tracker.discard().await?;
        println!("Discarded unfinished session");
    }
    if tracker.resume().await? {
        println!("Resumed unfinished session");
    } else {
        tracker.start().await?;
    }

    let screen = TerminalDisplay::new();
    let interactive = display::is_interactive();
    if interactive {
        screen.enter()?;
    }

    let started = tokio::time::Instant::now();
    let limit = seconds.map(Duration::from_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_samples = 0;

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }

        let status = tracker.status()?;
        if interactive {
            screen.draw(&StatusFrame {
                tracking: Some(status),
                next_reset: Some(scheduler.time_until_next_reset()),
                message: None,
            })?;
        } else if status.samples != last_samples {
            last_samples = status.samples;
            tracing::info!(
                duration = %status.duration,
                distance = %status.distance,
                samples = status.samples,
                "Tracking"
            );
        }
    }

    if interactive {
        screen.leave()?;
    }
    running.store(false, Ordering::Relaxed);
    checks.abort();

    if let Some(note) = note {
        match tracker.add_note(Some(note), None).await {
            Ok(point) => println!("Note added at {:.6}, {:.6}", point.latitude(), point.longitude()),
            Err(e) => tracing::warn!(error = %e, "Could not add note"),
        }
    }

    let route = tracker.stop().await?;
    println!("\nRoute {} ({})", route.id, route.date);
    println!("  Duration: {}", route.duration);
    println!("  Distance: {}", route.distance_label());
    println!("  Notes:    {}", route.point_count);

    if let Err(e) = tracker.save_route(&route) {
        // Keep the route recoverable from the terminal output.
        println!("{}", serde_json::to_string_pretty(&route)?);
        return Err(e).context("Failed to save route");
    }
    println!("Saved.");
    Ok(())
}

fn run_routes(routes: RouteBook<Store>, command: RouteCommand) -> Result<()> {
    match command {
        RouteCommand::List => {
            let list = routes.list()?;
            if list.is_empty() {
                println!("No routes recorded yet");
                return Ok(());
            }
            for route in &list {
                println!(
                    "{}  {:>14}  {:>10}  {:>7}  {} notes",
                    route.date,
                    route.id,
                    route.distance_label(),
                    route.duration,
                    route.point_count
                );
            }
            let summary = RouteSummary::from_routes(&list);
            println!(
                "\n{} routes, {} total, {} notes",
                summary.route_count,
                summary.distance_label(),
                summary.total_points
            );
        }
        RouteCommand::Show { id } => {
            let route = routes
                .get(&id)?
                .with_context(|| format!("Route {} not found", id))?;
            println!("Route {} ({})", route.id, route.date);
            println!("  Duration: {}", route.duration);
            println!("  Distance: {}", route.distance_label());
            println!("  Samples:  {}", route.coordinates.len().saturating_sub(route.point_count));
            for (index, point) in route.annotations().enumerate() {
                println!(
                    "  Note #{} at {:.6}, {:.6}: {}",
                    index + 1,
                    point.latitude(),
                    point.longitude(),
                    point.note().or(point.photo_ref()).unwrap_or("-")
                );
            }
        }
        RouteCommand::Delete { id } => {
            if routes.delete(&id)? {
                println!("Deleted route {}", id);
            } else {
                bail!("Route {} not found", id);
            }
        }
        RouteCommand::Clear => {
            routes.clear_all()?;
            println!("Cleared all habits, routes and tracking data");
        }
        RouteCommand::Info => {
            let info = routes.info()?;
            println!("Habits:          {}", info.habits_count);
            println!("Routes:          {}", info.routes_count);
            println!("Active tracking: {}", if info.has_tracking { "yes" } else { "no" });
        }
    }
    Ok(())
}

fn run_habits(habits: HabitBook<Store>, command: HabitCommand) -> Result<()> {
    match command {
        HabitCommand::List => {
            let list = habits.list()?;
            if list.is_empty() {
                println!("No habits yet");
            }
            for habit in list {
                println!(
                    "{:>4}  [{}] {}  (streak {})",
                    habit.id,
                    if habit.completed { "x" } else { " " },
                    habit.name,
                    habit.streak
                );
            }
        }
        HabitCommand::Add { name } => {
            let habit = habits.add(&name)?;
            println!("Added habit {}: {}", habit.id, habit.name);
        }
        HabitCommand::Toggle { id } => {
            let habit = habits.toggle(id)?;
            let state = if habit.completed { "done" } else { "not done" };
            println!("{} is {} (streak {})", habit.name, state, habit.streak);
        }
        HabitCommand::Delete { id } => {
            if !habits.delete(id)? {
                bail!("Habit {} not found", id);
            }
            println!("Deleted habit {}", id);
        }
        HabitCommand::Stats => {
            let stats = habits.stats()?;
            println!("Completed:      {}/{}", stats.completed, stats.total);
            println!("Completion:     {:.0}%", stats.completion_percent);
            println!("Longest streak: {}", stats.longest_streak);
        }
    }
    Ok(())
}

async fn run_reset(scheduler: Arc<Scheduler>, config: &TrackerConfig, command: ResetCommand) -> Result<()> {
    match command {
        ResetCommand::Check => {
            if scheduler.check_and_reset()? {
                println!("Habits reset for a new day");
            } else {
                println!("Habits already reset today");
            }
        }
        ResetCommand::Force => {
            scheduler.force_reset()?;
            println!("Habits reset");
        }
        ResetCommand::Countdown => {
            println!("Next reset in {}", scheduler.time_until_next_reset());
        }
        ResetCommand::Watch => {
            let running = Arc::new(AtomicBool::new(true));
            stop_on_ctrl_c(Arc::clone(&running));
            let checks = spawn_reset_checks(
                Arc::clone(&scheduler),
                Duration::from_secs(config.reset_check_secs.max(1)),
                Arc::clone(&running),
            );

            let screen = TerminalDisplay::new();
            let interactive = display::is_interactive();
            if interactive {
                screen.enter()?;
            }

            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                if interactive {
                    let last = scheduler.last_reset_date()?;
                    screen.draw(&StatusFrame {
                        tracking: None,
                        next_reset: Some(scheduler.time_until_next_reset()),
                        message: Some(format!("Last reset: {}", last.as_deref().unwrap_or("never"))),
                    })?;
                }
            }

            if interactive {
                screen.leave()?;
            }
            checks.abort();
            println!("Shutting down...");
        }
    }
    Ok(())
}

fn run_config(mut config: TrackerConfig, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("Config file: {}", TrackerConfig::get_config_path()?.display());
            return Ok(());
        }
        ConfigCommand::SetGpsd { host, port } => config.update_gpsd(host, port),
        ConfigCommand::SetReplay { file, delay_ms } => config.update_replay(file, delay_ms),
        ConfigCommand::SetThresholds {
            min_time_secs,
            min_distance_m,
        } => config.update_thresholds(min_time_secs, min_distance_m),
    }
    config.save()?;
    println!("Configuration saved");
    Ok(())
}

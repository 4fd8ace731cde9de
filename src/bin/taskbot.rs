//! taskbot CLI: run the bot or check a task file.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskbot::catalog::{TaskCatalog, TaskDefinition};
use taskbot::config::Config;
use taskbot::engine::{Bot, BotOptions};
use taskbot::notifier::{Notifier, PushbulletNotifier, Status};
use taskbot::telemetry::{TelemetryConfig, init_telemetry};
use taskbot::trigger::cron::{next_fire, parse_schedule};
use tracing::warn;

#[derive(Parser)]
#[command(name = "taskbot", version, about = "Runs scheduled tasks and tells you how they went")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot until SIGINT/SIGTERM
    Run {
        /// Task file (overrides TASKS_FILE)
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Bot name used in notifications (overrides BOT_NAME)
        #[arg(long)]
        name: Option<String>,
        /// Minimum notification level: debug, info, warn, error
        #[arg(long)]
        notification_level: Option<Status>,
        /// Maximum concurrent tasks, 0 means unlimited
        #[arg(long)]
        max_concurrency: Option<usize>,
    },
    /// Validate a task file and show when each task fires next
    Check {
        /// Task file (overrides TASKS_FILE)
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Run {
            tasks,
            name,
            notification_level,
            max_concurrency,
        } => {
            if let Some(tasks) = tasks {
                config.tasks_file = tasks;
            }
            if let Some(name) = name {
                config.bot_name = name;
            }
            if let Some(level) = notification_level {
                config.notification_level = level;
            }
            if let Some(max) = max_concurrency {
                config.max_concurrency = max;
            }
            cmd_run(config).await
        }
        Command::Check { tasks, json } => {
            let path = tasks.unwrap_or(config.tasks_file);
            cmd_check(&path, json)
        }
    }
}

async fn cmd_run(config: Config) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: config.bot_name.clone(),
        log_level: config.log_level.clone(),
    })?;

    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(token) = config.pushbullet_api_token {
        notifiers.push(Arc::new(PushbulletNotifier::new(token)));
    }

    let bot = Bot::new(
        config.bot_name,
        BotOptions {
            notifiers,
            notification_level: config.notification_level,
            max_concurrency: config.max_concurrency,
            trigger: None,
        },
    )?;

    let catalog = TaskCatalog::load(&config.tasks_file)?;
    if catalog.is_empty() {
        warn!(file = %config.tasks_file.display(), "task file defines no tasks");
    }

    for def in catalog {
        let schedule = def.schedule.clone();
        let task = def.into_task(bot.notifications().clone());
        // Already logged and notified; one bad schedule must not stop the rest.
        let _ = bot.schedule_task(&schedule, task).await;
    }

    bot.start().await?;
    Ok(())
}

fn cmd_check(path: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = TaskCatalog::load(path)?;

    let now = Utc::now();
    let checked: Vec<(&TaskDefinition, Result<String, String>)> = catalog
        .tasks()
        .iter()
        .map(|def| {
            let next = parse_schedule(&def.schedule)
                .map(|schedule| {
                    next_fire(&schedule, now)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "never".to_string())
                })
                .map_err(|e| e.to_string());
            (def, next)
        })
        .collect();
    let invalid = checked.iter().filter(|(_, next)| next.is_err()).count();

    if json {
        let rows: Vec<serde_json::Value> = checked
            .iter()
            .map(|(def, next)| match next {
                Ok(next) => serde_json::json!({
                    "name": def.name,
                    "priority": def.priority,
                    "schedule": def.schedule,
                    "next_run": next,
                }),
                Err(e) => serde_json::json!({
                    "name": def.name,
                    "priority": def.priority,
                    "schedule": def.schedule,
                    "error": e,
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if checked.is_empty() {
        println!("No tasks defined in {}.", path.display());
    } else {
        println!(
            "{:<24}  {:<8}  {:<20}  NEXT RUN",
            "NAME", "PRIORITY", "SCHEDULE"
        );
        println!("{}", "-".repeat(80));
        for (def, next) in &checked {
            let next = match next {
                Ok(next) => next.clone(),
                Err(e) => format!("INVALID: {e}"),
            };
            println!(
                "{:<24}  {:<8}  {:<20}  {}",
                def.name, def.priority, def.schedule, next
            );
        }
        println!("\n{} task(s)", catalog.len());
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} task(s) have invalid schedules");
    }
    Ok(())
}

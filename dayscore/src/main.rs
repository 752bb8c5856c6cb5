//! dayscore - goal tracking over desktop usage sessions
//!
//! Evaluates goals against the usage sessions recorded in the local database,
//! shows streaks and history, and manages goals created from templates.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use dayscore_core::config::MAX_HISTORY_DAYS;
use dayscore_core::format::{format_progress, heatmap_cell, status_label, status_marker};
use dayscore_core::goals::templates::templates_by_group;
use dayscore_core::goals::BackfillReport;
use dayscore_core::{Config, Database, GoalInsights, GoalService, GoalsForDate, TemplateOverrides};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dayscore")]
#[command(about = "Track goals over desktop usage sessions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show progress of every goal for a day
    Goals {
        /// Day to evaluate (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the daily success rate and calendar heatmap
    Insights {
        /// Number of days in the success-rate series
        #[arg(
            short = 'n',
            long,
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_HISTORY_DAYS))
        )]
        days: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Freeze progress for elapsed periods that have no snapshot yet
    Backfill,

    /// List built-in goal templates
    Templates,

    /// Create a goal from a template
    Create {
        /// Template id (see `dayscore templates`)
        #[arg(short, long)]
        template: String,

        /// Target value in the template's unit
        #[arg(long)]
        target: Option<f64>,

        /// Productivity level for time templates (productive, neutral, unproductive)
        #[arg(long)]
        reference: Option<String>,

        /// Goal name
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a goal (its history is kept)
    Delete {
        /// Goal id
        id: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        dayscore_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dayscore starting");

    // Open database
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let service = GoalService::from_database(Arc::new(db), config.goals);

    let report = if matches!(args.command, Command::Templates) {
        BackfillReport::default()
    } else {
        let yesterday = service.today() - Duration::days(1);
        service
            .backfill_missing(yesterday)
            .context("failed to backfill goal history")?
    };

    match args.command {
        Command::Goals { date, format } => {
            let date = date.unwrap_or_else(|| service.today());
            let response = service
                .goals_for_date(date)
                .with_context(|| format!("failed to evaluate goals for {}", date))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Text => print_goals(&response),
            }
        }
        Command::Insights { days, format } => {
            let insights = service
                .goal_insights(days)
                .context("failed to compute goal insights")?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&insights)?),
                OutputFormat::Text => print_insights(&insights),
            }
        }
        Command::Backfill => {
            println!("Backfill complete:");
            println!("  Days scanned:      {}", report.days_scanned);
            println!("  Snapshots written: {}", report.snapshots_written);
        }
        Command::Create {
            template,
            target,
            reference,
            name,
        } => {
            let overrides = TemplateOverrides {
                name,
                target_value: target,
                reference,
                ..Default::default()
            };
            let goal = service
                .create_goal_from_template(&template, overrides)
                .with_context(|| format!("failed to create goal from template '{}'", template))?;
            println!("Created goal {} ({})", goal.name, goal.id);
        }
        Command::Delete { id } => {
            service
                .delete_goal(&id)
                .with_context(|| format!("failed to delete goal {}", id))?;
            println!("Deleted goal {}", id);
        }
        Command::Templates => print_templates(),
    }

    Ok(())
}

fn print_goals(response: &GoalsForDate) {
    let heading = if response.is_today {
        format!("Goals for today ({})", response.date)
    } else {
        format!("Goals for {}", response.date)
    };
    println!("{}", heading);
    println!("{}", "=".repeat(heading.chars().count()));

    if response.goals.is_empty() {
        println!("No goals apply on this day.");
        println!("Run 'dayscore templates' to pick one.");
        return;
    }

    for progress in &response.goals {
        println!(
            "{} {:<32} {:<12} {}",
            status_marker(progress.status),
            progress.goal_name,
            status_label(progress.status),
            format_progress(progress)
        );
        if progress.streak_days > 1 {
            println!("    streak: {} in a row", progress.streak_days);
        }
        if let Some(error) = &progress.error {
            println!("    error: {}", error);
        }
    }

    let stats = &response.stats;
    println!();
    println!(
        "Achieved {}/{} ({}%), best streak {}",
        stats.achieved_today, stats.active_goals, stats.success_rate, stats.day_streak
    );
}

fn print_insights(insights: &GoalInsights) {
    println!("Daily success rate");
    println!("==================");
    for day in &insights.daily_success_rate {
        match day.success_rate {
            Some(rate) => println!("  {}  {:>3}%  ({}/{})", day.date, rate, day.achieved, day.total),
            None => println!("  {}     -", day.date),
        }
    }

    println!();
    println!("Heatmap (oldest first)");
    let cells: String = insights
        .calendar_heatmap
        .iter()
        .map(|day| heatmap_cell(day.level))
        .collect();
    println!("  [{}]", cells);
}

fn print_templates() {
    for (group, templates) in templates_by_group() {
        println!("{}", group);
        for template in templates {
            println!(
                "  {:<28} {} {} ({} {})",
                template.id,
                template.icon,
                template.name,
                template.frequency.as_str(),
                template.target_type.as_str()
            );
        }
    }
}

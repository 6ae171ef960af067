pub mod output;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, level_filters::LevelFilter, warn};

use crate::{
    stats::series::RangeMode,
    storage::kv::{FileKeyValueStore, KeyValueStore},
    sync::{
        reconcile::{ReconcileOutcome, Reconciler},
        service::{sync_channel, ReconciliationService, DEFAULT_SYNC_INTERVAL},
        shutdown::detect_shutdown,
        ExternalCounter, GenericCounter,
    },
    tracker::Tracker,
    ui::settings_editor::{ConfirmPrompt, LeaveDecision, SettingsEditor},
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, SYNC_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Smokelog", version, long_about = None)]
#[command(about = "Daily cigarette counter with cost statistics", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "SMOKELOG_SHARED_DIR",
        help = "Directory shared with the widget. Widget sync is disabled without it"
    )]
    shared_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Log one more cigarette for today")]
    Add,
    #[command(about = "Take one cigarette off today's count")]
    Remove,
    #[command(about = "Set the count of a day")]
    Set {
        #[arg(allow_negative_numbers = true)]
        count: i64,
        #[arg(long, help = "Day to change, YYYY-MM-DD. Defaults to today")]
        date: Option<NaiveDate>,
    },
    #[command(about = "Show today's and this month's figures")]
    Today,
    #[command(about = "Show this month's savings")]
    Month,
    #[command(about = "Show a chart of the current week or month")]
    Chart {
        #[arg(long, value_enum, default_value_t = RangeMode::Week)]
        mode: RangeMode,
    },
    #[command(about = "Show totals since tracking started")]
    Totals,
    #[command(about = "Show or change settings")]
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    #[command(about = "Reconcile today's count with the widget once")]
    Sync,
    #[command(about = "Count one cigarette on the widget side, like its quick-add button")]
    Tap,
    #[command(about = "Keep reconciling with the widget until interrupted")]
    Serve {
        #[arg(
            long,
            help = "Seconds between passes",
            default_value_t = DEFAULT_SYNC_INTERVAL.as_secs(),
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long, allow_negative_numbers = true)]
        price: Option<f64>,
        #[arg(long = "per-pack", allow_negative_numbers = true)]
        per_pack: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        target: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        average: Option<i64>,
    },
}

/// A terminal has nobody to ask, edits made by `settings set` are always meant to be saved.
struct SaveOnLeave;

impl ConfirmPrompt for SaveOnLeave {
    fn unsaved_changes(&mut self) -> LeaveDecision {
        LeaveDecision::SaveThenProceed
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Serve { .. } => SYNC_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir, logging_level, args.log)?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = Arc::new(FileKeyValueStore::new(app_dir.join("store"))?);
    let counter = GenericCounter::detect(args.shared_dir, clock.clone());

    match args.commands {
        Commands::Serve { interval } => {
            serve(store, counter, clock, Duration::from_secs(interval)).await
        }
        command => run_command(command, store, counter, clock).await,
    }
}

async fn run_command<S, C>(
    command: Commands,
    store: S,
    counter: C,
    clock: Arc<dyn Clock>,
) -> Result<()>
where
    S: KeyValueStore + Clone,
    C: ExternalCounter,
{
    let tracker = Tracker::new(store, clock.clone(), None);
    tracker.start().await?;
    if let Commands::Tap = command {
        // Lands on the widget side only, the pass below merges it into the records.
        match counter.increment_count().await {
            Ok(count) => info!("Widget count raised to {count}"),
            Err(e) => warn!("Widget increment failed {e}"),
        }
    }
    let reconciler = Reconciler::new(tracker.records(), counter, clock);

    // Every invocation counts as the app coming to the foreground.
    let foreground = reconciler.reconcile_once().await;
    if let Err(e) = &foreground {
        error!("Reconciliation on start failed {e:?}");
    }

    let previous = tracker.today_count().await;
    let mutated = match command {
        Commands::Add => Some(tracker.increment_today().await?),
        Commands::Remove => Some(tracker.decrement_today().await?),
        Commands::Set { count, date } => Some(match date {
            Some(date) => tracker.set_count(date, count).await?,
            None => tracker.set_today(count).await?,
        }),
        Commands::Today => {
            output::print_dashboard(&tracker.dashboard().await);
            None
        }
        Commands::Month => {
            output::print_monthly(&tracker.dashboard().await.month);
            None
        }
        Commands::Chart { mode } => {
            output::print_chart(&tracker.chart(mode).await);
            None
        }
        Commands::Totals => {
            output::print_lifetime(&tracker.dashboard().await.lifetime);
            None
        }
        Commands::Settings { command } => {
            process_settings_command(command, &tracker).await?;
            None
        }
        Commands::Sync | Commands::Tap => {
            output::print_sync(&foreground?);
            None
        }
        Commands::Serve { .. } => unreachable!("serve is dispatched before"),
    };

    if let Some(count) = mutated {
        println!("{count}");
        match reconciler.reconcile_after_edit(previous).await {
            Ok(outcome @ ReconcileOutcome::ExternalAhead { .. }) => {
                output::print_sync_warning(&outcome)
            }
            Ok(outcome) => debug!("Reconciled after update: {outcome}"),
            Err(e) => error!("Reconciliation after update failed {e:?}"),
        }
        output::print_daily(&tracker.dashboard().await.today);
    }
    Ok(())
}

async fn process_settings_command<S: KeyValueStore>(
    command: SettingsCommand,
    tracker: &Tracker<S>,
) -> Result<()> {
    match command {
        SettingsCommand::Show => output::print_settings(&tracker.settings().await),
        SettingsCommand::Set {
            price,
            per_pack,
            target,
            average,
        } => {
            let mut editor =
                SettingsEditor::open(tracker.settings_store(), Box::new(SaveOnLeave)).await;
            editor.update(|settings| {
                settings.price_per_pack = price.unwrap_or(settings.price_per_pack);
                settings.cigarettes_per_pack = per_pack.unwrap_or(settings.cigarettes_per_pack);
                settings.target_count = target.unwrap_or(settings.target_count);
                settings.average_count_before = average.unwrap_or(settings.average_count_before);
            });
            if editor.is_dirty() {
                editor.save().await?;
            }
            output::print_settings(editor.saved());
        }
    }
    Ok(())
}

/// Runs the reconciliation loop in the foreground until Ctrl-C.
async fn serve<S, C>(
    store: S,
    counter: C,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> Result<()>
where
    S: KeyValueStore + Clone,
    C: ExternalCounter,
{
    let tracker = Tracker::new(store, clock.clone(), None);
    tracker.start().await?;

    let shutdown_token = CancellationToken::new();
    // The handle stays alive for the loop's lifetime so the trigger channel stays open.
    let (_handle, receiver) = sync_channel();
    let service = ReconciliationService::new(
        Reconciler::new(tracker.records(), counter, clock.clone()),
        receiver,
        shutdown_token.clone(),
        interval,
        clock,
    );

    let (_, service_result) = tokio::join!(detect_shutdown(shutdown_token), service.run());

    if let Err(service_result) = service_result {
        error!("Reconciliation service got an error {:?}", service_result);
    }
    Ok(())
}

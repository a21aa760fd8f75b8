use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result, anyhow, bail};

use cricscanner::config::Config;
use cricscanner::cricapi::CricApi;
use cricscanner::feed::{PollOutcome, Poller, PollerOptions, spawn_provider};
use cricscanner::persist::FileStore;
use cricscanner::state::{AppState, CachedState, Delta, SeriesEdit, apply_delta};

enum Command {
    Watch,
    Once,
    Series,
    Show,
    DeleteTournament(String),
    Edit { id: String, edit: SeriesEdit },
    Reset,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = Config::from_env();
    let command = parse_command(std::env::args().skip(1).collect())?;

    let store = FileStore::default_location(config.cache_dir.as_deref())
        .context("unable to resolve cache directory")?;
    eprintln!("[INFO] Cache directory: {}", store.dir().display());
    let provider = CricApi::from_config(&config);
    if !provider.is_configured() && matches!(command, Command::Watch | Command::Once | Command::Series) {
        eprintln!("[WARN] CRICAPI_KEY is not set; polls will fail until it is configured");
    }

    let (tx, rx) = mpsc::channel();
    let poller = Arc::new(Poller::open(
        Box::new(provider),
        Box::new(store),
        PollerOptions::from(&config),
        Some(tx),
    ));
    let mut app = AppState::new();
    app.data = poller.snapshot();

    match command {
        Command::Watch => {
            let (cmd_tx, cmd_rx) = mpsc::channel();
            let handle = spawn_provider(poller.clone(), config.poll_interval, cmd_rx);
            eprintln!(
                "[INFO] Polling every {}s (cache key {})",
                config.poll_interval.as_secs(),
                config.cache_key
            );
            for delta in rx.iter() {
                let synced = matches!(delta, Delta::SetState(_));
                print_delta(&delta);
                apply_delta(&mut app, delta);
                if synced {
                    print_state(&app.data);
                }
            }
            drop(cmd_tx);
            let _ = handle.join();
        }
        Command::Once => {
            let outcome = poller.poll();
            drain(&rx, &mut app);
            report_outcome(&outcome);
            print_state(&app.data);
        }
        Command::Series => {
            let outcome = poller.poll_series();
            drain(&rx, &mut app);
            report_outcome(&outcome);
            for series in app.data.search_series("") {
                let flag = if series.active { "*" } else { " " };
                println!("{flag} {:<28} {}", series.id, series.display_name());
            }
        }
        Command::Show => print_state(&app.data),
        Command::DeleteTournament(id) => {
            let removed = poller
                .delete_tournament(&id)
                .context("tournament delete was not saved")?;
            drain(&rx, &mut app);
            match removed {
                Some(count) => println!("Deleted {id} and {count} matches"),
                None => println!("No tournament with id {id}"),
            }
        }
        Command::Edit { id, edit } => {
            let found = poller
                .apply_series_edit(&id, &edit)
                .context("series edit was not saved")?;
            drain(&rx, &mut app);
            if !found {
                bail!("no series with id {id}");
            }
            println!("Saved {id}");
        }
        Command::Reset => {
            poller
                .reset_to_defaults()
                .context("reset was not saved")?;
            drain(&rx, &mut app);
            print_state(&app.data);
        }
    }

    Ok(())
}

fn parse_command(args: Vec<String>) -> Result<Command> {
    let mut iter = args.into_iter();
    let Some(first) = iter.next() else {
        return Ok(Command::Watch);
    };
    let mut value = |flag: &str| {
        iter.next()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{flag} needs a value"))
    };

    let command = match first.as_str() {
        "--watch" => Command::Watch,
        "--once" => Command::Once,
        "--series" => Command::Series,
        "--show" => Command::Show,
        "--reset" => Command::Reset,
        "--delete-tournament" => Command::DeleteTournament(value("--delete-tournament")?),
        "--activate" | "--deactivate" => Command::Edit {
            id: value(first.as_str())?,
            edit: SeriesEdit {
                short_name: None,
                active: Some(first == "--activate"),
            },
        },
        "--set-short" => {
            let raw = value("--set-short")?;
            let (id, short) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("--set-short expects <id>=<short name>"))?;
            Command::Edit {
                id: id.trim().to_string(),
                edit: SeriesEdit {
                    short_name: Some(short.to_string()),
                    active: None,
                },
            }
        }
        other => bail!("unknown argument: {other}"),
    };
    Ok(command)
}

fn drain(rx: &Receiver<Delta>, app: &mut AppState) {
    while let Ok(delta) = rx.try_recv() {
        print_delta(&delta);
        apply_delta(app, delta);
    }
}

fn print_delta(delta: &Delta) {
    match delta {
        Delta::Log(msg) => eprintln!("{msg}"),
        Delta::SaveFailed { action, error } => eprintln!("[ALERT] {action} failed: {error}"),
        Delta::SetState(_) => {}
    }
}

fn report_outcome(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::Synced(report) => println!(
            "Synced: {} added, {} updated, {} unchanged, {} skipped",
            report.added, report.updated, report.unchanged, report.skipped
        ),
        PollOutcome::Busy => println!("Another sync is in progress"),
        PollOutcome::CoolingDown { remaining } => {
            println!("Synced recently; try again in {}s", remaining.as_secs())
        }
        PollOutcome::Failed(err) => println!("Sync failed, showing cached data: {err}"),
    }
}

fn print_state(state: &CachedState) {
    println!(
        "{} tournaments, {} active",
        state.tournaments.len(),
        state.active_tournaments().len()
    );
    for tournament in &state.tournaments {
        let matches = state.matches_for(&tournament.id);
        let flag = if tournament.active { "*" } else { " " };
        println!("{flag} {} ({} matches)", tournament.display_name(), matches.len());
        for m in matches {
            let score = match (m.score_a.is_empty(), m.score_b.is_empty()) {
                (true, true) => String::new(),
                _ => format!("  {} - {}", m.score_a, m.score_b),
            };
            println!(
                "  [{:<9}] {} vs {}{}  {}",
                m.status.label(),
                m.team_a,
                m.team_b,
                score,
                m.start_time
            );
        }
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::Config;
use crate::cricapi::{Provider, normalize_matches, normalize_series_batch};
use crate::error::SyncError;
use crate::persist::{CACHE_KEY, CacheStore, load_state, save_state};
use crate::reconcile::{self, MergeReport};
use crate::state::{
    CachedState, CanonicalMatch, CanonicalSeries, Delta, ProviderCommand, SeriesEdit, seed_state,
};

const TICK: Duration = Duration::from_millis(900);

pub type Observer = Arc<dyn Fn(&CachedState) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub cache_key: String,
    pub cooldown: Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            cache_key: CACHE_KEY.to_string(),
            cooldown: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for PollerOptions {
    fn from(config: &Config) -> Self {
        Self {
            cache_key: config.cache_key.clone(),
            cooldown: config.cooldown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Synced(MergeReport),
    /// Another cycle is in flight; nothing was done.
    Busy,
    CoolingDown { remaining: Duration },
    Failed(SyncError),
}

/// Owns the cached state and runs poll cycles against a provider.
///
/// Only one cycle runs at a time; overlapping calls return `Busy` without
/// queueing. Calls inside the cooldown window return `CoolingDown`.
pub struct Poller {
    provider: Box<dyn Provider>,
    store: Mutex<Box<dyn CacheStore>>,
    state: Mutex<CachedState>,
    busy: AtomicBool,
    last_poll: Mutex<Option<Instant>>,
    options: PollerOptions,
    tx: Option<Sender<Delta>>,
    observers: Mutex<Vec<Observer>>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Poller {
    /// Loads the last saved state from `store`, falling back to the bundled
    /// seed data when nothing usable is stored.
    pub fn open(
        provider: Box<dyn Provider>,
        store: Box<dyn CacheStore>,
        options: PollerOptions,
        tx: Option<Sender<Delta>>,
    ) -> Self {
        let poller = Self {
            provider,
            store: Mutex::new(store),
            state: Mutex::new(CachedState::default()),
            busy: AtomicBool::new(false),
            last_poll: Mutex::new(None),
            options,
            tx,
            observers: Mutex::new(Vec::new()),
        };

        let loaded = {
            let store = lock(&poller.store);
            load_state(store.as_ref(), &poller.options.cache_key)
        };
        let initial = match loaded {
            Ok(Some(state)) if !(state.tournaments.is_empty() && state.matches.is_empty()) => state,
            Ok(_) => {
                poller.log("[INFO] No cached data; using bundled defaults");
                seed_state()
            }
            Err(err) => {
                poller.log(format!("[WARN] Cache read failed, reseeding: {err}"));
                seed_state()
            }
        };
        *lock(&poller.state) = initial;
        poller
    }

    pub fn snapshot(&self) -> CachedState {
        lock(&self.state).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn subscribe(&self, observer: impl Fn(&CachedState) + Send + Sync + 'static) {
        lock(&self.observers).push(Arc::new(observer));
    }

    /// One fetch → normalize → merge → persist → notify cycle for matches.
    pub fn poll(&self) -> PollOutcome {
        self.run_gated("Match sync", |poller| {
            let raw = poller.provider.fetch_matches()?;
            let incoming = normalize_matches(&raw, Utc::now());
            let dropped = raw.len() - incoming.len();
            if dropped > 0 {
                poller.log(format!("[INFO] Dropped {dropped} provider records"));
            }
            poller.reconcile(|state| reconcile::merge_matches(state, incoming))
        })
    }

    /// Same cycle for the series catalogue.
    pub fn poll_series(&self) -> PollOutcome {
        self.run_gated("Series sync", |poller| {
            let raw = poller.provider.fetch_series()?;
            let incoming = normalize_series_batch(&raw);
            poller.reconcile(|state| reconcile::merge_series_into(state, incoming))
        })
    }

    fn run_gated(
        &self,
        label: &str,
        cycle: impl FnOnce(&Self) -> Result<MergeReport, SyncError>,
    ) -> PollOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            self.log(format!("[INFO] {label} skipped: already in progress"));
            return PollOutcome::Busy;
        };
        if let Some(remaining) = self.cooldown_remaining() {
            self.log(format!(
                "[INFO] {label} throttled ({}s left)",
                remaining.as_secs()
            ));
            return PollOutcome::CoolingDown { remaining };
        }
        *lock(&self.last_poll) = Some(Instant::now());

        match cycle(self) {
            Ok(report) => {
                self.log(format!(
                    "[INFO] {label}: {} added, {} updated, {} unchanged",
                    report.added, report.updated, report.unchanged
                ));
                PollOutcome::Synced(report)
            }
            Err(err) => {
                self.log(format!("[WARN] {label} failed ({}): {err}", err.kind()));
                PollOutcome::Failed(err)
            }
        }
    }

    fn cooldown_remaining(&self) -> Option<Duration> {
        let last = (*lock(&self.last_poll))?;
        let elapsed = last.elapsed();
        if elapsed >= self.options.cooldown {
            None
        } else {
            Some(self.options.cooldown - elapsed)
        }
    }

    // Work happens on a copy; the live state is swapped only after the copy
    // is persisted.
    fn reconcile<T>(&self, apply: impl FnOnce(&mut CachedState) -> T) -> Result<T, SyncError> {
        let mut state = lock(&self.state);
        let mut next = state.clone();
        let out = apply(&mut next);
        if next != *state {
            let mut store = lock(&self.store);
            save_state(store.as_mut(), &self.options.cache_key, &next)?;
        }
        *state = next.clone();
        drop(state);
        self.notify(&next);
        Ok(out)
    }

    fn save(&self, action: &str, apply: impl FnOnce(&mut CachedState) -> bool) -> Result<bool, SyncError> {
        match self.reconcile(apply) {
            Ok(changed) => Ok(changed),
            Err(err) => {
                self.send(Delta::SaveFailed {
                    action: action.to_string(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn apply_series_edit(&self, id: &str, edit: &SeriesEdit) -> Result<bool, SyncError> {
        self.save("Series edit", |state| reconcile::apply_series_edit(state, id, edit))
    }

    /// Returns the number of matches removed with the tournament.
    pub fn delete_tournament(&self, id: &str) -> Result<Option<usize>, SyncError> {
        let mut removed = None;
        self.save("Delete tournament", |state| {
            removed = reconcile::delete_tournament(state, id);
            removed.is_some()
        })?;
        Ok(removed)
    }

    pub fn delete_match(&self, id: &str) -> Result<bool, SyncError> {
        self.save("Delete match", |state| reconcile::delete_match(state, id))
    }

    pub fn upsert_tournament(&self, tournament: CanonicalSeries) -> Result<(), SyncError> {
        self.save("Save tournament", |state| {
            reconcile::upsert_tournament(state, tournament);
            true
        })
        .map(|_| ())
    }

    pub fn upsert_match(&self, candidate: CanonicalMatch) -> Result<String, SyncError> {
        let mut id = String::new();
        self.save("Save match", |state| {
            id = reconcile::upsert_match(state, candidate);
            true
        })?;
        Ok(id)
    }

    pub fn reset_to_defaults(&self) -> Result<(), SyncError> {
        self.save("Reset", |state| {
            *state = seed_state();
            true
        })
        .map(|_| ())
    }

    fn notify(&self, state: &CachedState) {
        self.send(Delta::SetState(state.clone()));
        // Observers run unlocked so they may subscribe or save in turn.
        let observers: Vec<Observer> = lock(&self.observers).clone();
        for observer in observers {
            observer(state);
        }
    }

    fn log(&self, msg: impl Into<String>) {
        self.send(Delta::Log(msg.into()));
    }

    fn send(&self, delta: Delta) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(delta);
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs the poller on a background thread: one poll right away, then one
/// per `interval` on a fixed schedule, plus whatever arrives on `cmd_rx`.
pub fn spawn_provider(
    poller: Arc<Poller>,
    interval: Duration,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut next_due = Instant::now();

        loop {
            let now = Instant::now();
            if now >= next_due {
                poller.poll();
                while next_due <= now {
                    next_due += interval;
                }
            }

            let wait = next_due.saturating_duration_since(Instant::now()).min(TICK);
            let cmd = match cmd_rx.recv_timeout(wait) {
                Ok(cmd) => cmd,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match cmd {
                ProviderCommand::PollNow => {
                    poller.poll();
                }
                ProviderCommand::RefreshSeries => {
                    poller.poll_series();
                }
                ProviderCommand::EditSeries { id, edit } => {
                    let _ = poller.apply_series_edit(&id, &edit);
                }
                ProviderCommand::DeleteTournament { id } => {
                    let _ = poller.delete_tournament(&id);
                }
                ProviderCommand::DeleteMatch { id } => {
                    let _ = poller.delete_match(&id);
                }
                ProviderCommand::Shutdown => break,
            }
        }
    })
}

//! The cooking session state machine.
//!
//! ```text
//!   Idle --start--> Running --pause--> Paused
//!    ^                 |  ^               |
//!    |                 |  +----resume-----+
//!    +----complete-----+
//! ```
//!
//! Remaining time is derived from wall-clock instants held by the engine,
//! never from an accumulated counter, so a session keeps counting down
//! while the process is not running. The host drives expiry by calling
//! [`SessionEngine::poll`]; nothing completes on its own.
//!
//! # Persistence
//!
//! Every transition overwrites the session record (or deletes it on return
//! to idle) before observers are notified. Energy and inventory persist
//! themselves when `start` spends them, so they are durable before the
//! session record that depends on them. A failed write is logged and the
//! in-memory state stays authoritative.
//!
//! # Recovery
//!
//! [`SessionEngine::open`] only stages a persisted active session. Nothing
//! can be started, paused, or resumed until [`SessionEngine::resolve_pending`]
//! has matched the staged recipe name against a loaded catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use simmer_db::{DbError, Store, load_json, save_json};
use simmer_ledger::{EntryReason, Ledger, LedgerError};
use simmer_types::{ItemId, Recipe, SessionId, SessionRecord, SessionState};

use crate::catalog::RecipeCatalog;
use crate::clock::Clock;
use crate::config::PausePolicy;
use crate::energy::{EnergyError, EnergyPool};
use crate::notify::{ObserverId, ObserverSet, SessionEvent, SessionObserver};
use crate::recovery::{DiscardReason, RecoveryOutcome};

/// Why a session operation was refused.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A persisted session is waiting for the recipe catalog.
    #[error("recovery of {recipe:?} is pending")]
    RecoveryPending {
        /// Name of the staged recipe.
        recipe: String,
    },

    /// `start` requires an idle session.
    #[error("a session is already {state}")]
    NotIdle {
        /// The current state.
        state: SessionState,
    },

    /// `pause` requires a running session.
    #[error("session is {state}, not running")]
    NotRunning {
        /// The current state.
        state: SessionState,
    },

    /// `resume` requires a paused session.
    #[error("session is {state}, not paused")]
    NotPaused {
        /// The current state.
        state: SessionState,
    },

    /// The energy pool cannot cover the recipe cost.
    #[error("not enough energy: need {required}, have {available}")]
    InsufficientEnergy {
        /// Recipe cost.
        required: u32,
        /// Energy available now.
        available: u32,
    },

    /// The inventory lacks an ingredient.
    #[error("missing ingredient {item}: need {required}, have {available}")]
    MissingIngredient {
        /// The ingredient item.
        item: ItemId,
        /// Total amount the recipe needs.
        required: u32,
        /// Amount held.
        available: u32,
    },

    /// The recipe's duration is zero or not representable.
    #[error("recipe {recipe:?} has an invalid duration")]
    InvalidDuration {
        /// Recipe name.
        recipe: String,
    },

    /// `start_selected` on an empty catalog.
    #[error("the recipe catalog is empty")]
    EmptyCatalog,

    /// The inventory refused a movement that passed the precondition check.
    #[error("inventory error: {0}")]
    Ledger(#[from] LedgerError),

    /// The energy pool refused a spend that passed the precondition check.
    #[error("energy error: {0}")]
    Energy(#[from] EnergyError),
}

/// A shortfall found by [`SessionEngine::missing_ingredients`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    /// The ingredient item.
    pub item: ItemId,
    /// Total amount the recipe needs.
    pub required: u32,
    /// Amount held.
    pub available: u32,
}

/// What a call to [`SessionEngine::poll`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No session.
    Idle,
    /// A persisted session is waiting for the catalog.
    Pending,
    /// Session is paused with this many whole seconds left.
    Paused {
        /// Remaining seconds, rounded up.
        remaining_secs: u64,
    },
    /// Session is counting down.
    Running {
        /// Remaining seconds, rounded up.
        remaining_secs: u64,
    },
    /// The session reached zero during this poll and was completed.
    Completed(Recipe),
}

#[derive(Debug, Clone)]
struct ActiveSession {
    id: SessionId,
    recipe: Recipe,
    total: TimeDelta,
}

#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Idle,
    Running {
        session: ActiveSession,
        end_time: DateTime<Utc>,
    },
    Paused {
        session: ActiveSession,
        pause_started_at: DateTime<Utc>,
        remaining: TimeDelta,
    },
}

/// Owner of the cooking session.
///
/// Holds the clock and store handles; the energy pool and inventory are
/// borrowed per call since the host owns them.
#[derive(Debug)]
pub struct SessionEngine {
    phase: Phase,
    pending: Option<SessionRecord>,
    observers: ObserverSet<dyn SessionObserver>,
    last_reported: Option<u64>,
    policy: PausePolicy,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    key: String,
}

impl SessionEngine {
    /// Create an idle engine without reading the store.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
        key: impl Into<String>,
        policy: PausePolicy,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            pending: None,
            observers: ObserverSet::default(),
            last_reported: None,
            policy,
            clock,
            store,
            key: key.into(),
        }
    }

    /// Create an engine and stage any persisted active session.
    ///
    /// The staged session is resolved later by
    /// [`SessionEngine::resolve_pending`]. A record that fails to decode is
    /// deleted. A record that cannot be read is left in place and the
    /// engine starts idle.
    pub fn open(
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
        key: impl Into<String>,
        policy: PausePolicy,
    ) -> Self {
        let mut engine = Self::new(clock, store, key, policy);
        match load_json::<SessionRecord>(engine.store.as_ref(), &engine.key) {
            Ok(Some(record)) if record.is_cooking => {
                tracing::info!(
                    recipe = %record.recipe_name,
                    paused = record.is_paused,
                    "Staged persisted session for recovery"
                );
                engine.pending = Some(record);
            }
            Ok(_) => {
                tracing::debug!(key = %engine.key, "No active session to recover");
            }
            Err(e @ DbError::Serialization { .. }) => {
                tracing::warn!(key = %engine.key, error = %e, "Discarding unreadable session record");
                engine.delete_record();
            }
            Err(e) => {
                tracing::error!(key = %engine.key, error = %e, "Failed to read session record, starting idle");
            }
        }
        engine
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register an observer for session events.
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current state. Idle while recovery is pending.
    pub const fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Running { .. } => SessionState::Running,
            Phase::Paused { .. } => SessionState::Paused,
        }
    }

    /// Whether the timer is counting down (not paused).
    pub const fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Whether a session is active (running or paused).
    pub const fn is_cooking(&self) -> bool {
        self.state().is_cooking()
    }

    /// Whether a persisted session is waiting for the catalog.
    pub const fn is_recovering(&self) -> bool {
        self.pending.is_some()
    }

    /// Name of the staged recipe while recovery is pending.
    pub fn pending_recipe_name(&self) -> Option<&str> {
        self.pending.as_ref().map(|r| r.recipe_name.as_str())
    }

    /// The active recipe.
    pub const fn recipe(&self) -> Option<&Recipe> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running { session, .. } | Phase::Paused { session, .. } => Some(&session.recipe),
        }
    }

    /// Identifier of the active session.
    pub const fn session_id(&self) -> Option<SessionId> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running { session, .. } | Phase::Paused { session, .. } => Some(session.id),
        }
    }

    /// Completion instant while running.
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            Phase::Running { end_time, .. } => Some(*end_time),
            _ => None,
        }
    }

    /// Instant the current pause began while paused.
    pub const fn pause_started_at(&self) -> Option<DateTime<Utc>> {
        match &self.phase {
            Phase::Paused {
                pause_started_at, ..
            } => Some(*pause_started_at),
            _ => None,
        }
    }

    /// Time remaining when the current pause began while paused.
    pub const fn remaining_on_pause(&self) -> Option<TimeDelta> {
        match &self.phase {
            Phase::Paused { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// The active recipe's full duration.
    pub const fn total_duration(&self) -> Option<TimeDelta> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running { session, .. } | Phase::Paused { session, .. } => Some(session.total),
        }
    }

    /// Exact remaining time, clamped to `[0, total_duration]`. Zero when idle.
    pub fn remaining(&self) -> TimeDelta {
        match &self.phase {
            Phase::Idle => TimeDelta::zero(),
            Phase::Paused {
                session, remaining, ..
            } => clamp_remaining(*remaining, session.total),
            Phase::Running { session, end_time } => clamp_remaining(
                end_time.signed_duration_since(self.clock.now()),
                session.total,
            ),
        }
    }

    /// Remaining time in whole seconds, rounded up. Zero when idle.
    pub fn remaining_seconds(&self) -> u64 {
        ceil_secs(self.remaining())
    }

    /// Whether the pool can cover the recipe cost right now.
    pub fn has_energy_for(recipe: &Recipe, energy: &EnergyPool) -> bool {
        energy.has(recipe.cost)
    }

    /// Ingredients the inventory cannot cover. Repeated ingredient ids are
    /// summed before checking.
    pub fn missing_ingredients(recipe: &Recipe, ledger: &Ledger) -> Vec<Shortfall> {
        required_ingredients(recipe)
            .into_iter()
            .filter_map(|(item, required)| {
                let available = ledger.count(item.as_str());
                (available < required).then(|| Shortfall {
                    item: item.clone(),
                    required,
                    available,
                })
            })
            .collect()
    }

    /// Check every `start` precondition without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the first reason `start` would be refused, checking in the
    /// order: pending recovery, state, energy, ingredients, duration.
    pub fn check_start(
        &self,
        recipe: &Recipe,
        energy: &EnergyPool,
        ledger: &Ledger,
    ) -> Result<(), SessionError> {
        self.ensure_recovered()?;
        if !matches!(self.phase, Phase::Idle) {
            return Err(SessionError::NotIdle {
                state: self.state(),
            });
        }
        if !Self::has_energy_for(recipe, energy) {
            return Err(SessionError::InsufficientEnergy {
                required: recipe.cost,
                available: energy.current(),
            });
        }
        if let Some(short) = Self::missing_ingredients(recipe, ledger).into_iter().next() {
            return Err(SessionError::MissingIngredient {
                item: short.item,
                required: short.required,
                available: short.available,
            });
        }
        if recipe.duration() <= TimeDelta::zero() {
            return Err(SessionError::InvalidDuration {
                recipe: recipe.name.clone(),
            });
        }
        Ok(())
    }

    /// The persisted form of the active session, `None` when idle.
    pub fn record(&self) -> Option<SessionRecord> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running { session, end_time } => Some(SessionRecord {
                is_cooking: true,
                recipe_name: session.recipe.name.clone(),
                end_time_epoch: self.clock.to_epoch_seconds(*end_time),
                is_paused: false,
                pause_start_epoch: 0,
                remaining_on_pause: 0.0,
                total_duration: delta_to_secs(session.total),
                session_id: Some(session.id),
            }),
            Phase::Paused {
                session,
                pause_started_at,
                remaining,
            } => Some(SessionRecord {
                is_cooking: true,
                recipe_name: session.recipe.name.clone(),
                end_time_epoch: 0,
                is_paused: true,
                pause_start_epoch: self.clock.to_epoch_seconds(*pause_started_at),
                remaining_on_pause: delta_to_secs(*remaining),
                total_duration: delta_to_secs(session.total),
                session_id: Some(session.id),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start cooking `recipe`.
    ///
    /// Spends the recipe cost and debits every ingredient, then runs the
    /// timer for the recipe duration. Nothing is deducted unless every
    /// precondition holds.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason from [`SessionEngine::check_start`]. The
    /// collaborator variants only occur if the pool or inventory rejects a
    /// movement after the check passed; any partial deduction is rolled
    /// back first.
    pub fn start(
        &mut self,
        recipe: &Recipe,
        energy: &mut EnergyPool,
        ledger: &mut Ledger,
    ) -> Result<SessionId, SessionError> {
        if let Err(e) = self.check_start(recipe, energy, ledger) {
            tracing::debug!(recipe = %recipe.name, reason = %e, "Start refused");
            return Err(e);
        }

        let total = recipe.duration();
        let now = self.clock.now();
        let end_time = now
            .checked_add_signed(total)
            .ok_or_else(|| SessionError::InvalidDuration {
                recipe: recipe.name.clone(),
            })?;
        let id = SessionId::new();

        take_inputs(recipe, energy, ledger, id)?;

        self.phase = Phase::Running {
            session: ActiveSession {
                id,
                recipe: recipe.clone(),
                total,
            },
            end_time,
        };
        self.persist();

        let remaining_secs = ceil_secs(total);
        tracing::info!(
            session_id = %id,
            recipe = %recipe.name,
            cost = recipe.cost,
            remaining_secs,
            "Cooking started"
        );
        self.emit(&SessionEvent::StateChanged(SessionState::Running));
        self.emit_time(remaining_secs);
        Ok(id)
    }

    /// Start the catalog recipe at `index`, clamped into range.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyCatalog`] for an empty catalog, otherwise
    /// as [`SessionEngine::start`].
    pub fn start_selected(
        &mut self,
        catalog: &RecipeCatalog,
        index: usize,
        energy: &mut EnergyPool,
        ledger: &mut Ledger,
    ) -> Result<SessionId, SessionError> {
        let recipe = catalog.select(index).ok_or(SessionError::EmptyCatalog)?;
        self.start(recipe, energy, ledger)
    }

    /// Freeze the timer.
    ///
    /// Returns the new state: `Paused`, or `Idle` if no time was left and
    /// the session completed instead.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RecoveryPending`] or
    /// [`SessionError::NotRunning`].
    pub fn pause(&mut self, ledger: &mut Ledger) -> Result<SessionState, SessionError> {
        self.ensure_recovered()?;
        let remaining = self.remaining();
        let Phase::Running { session, .. } = &self.phase else {
            return Err(SessionError::NotRunning {
                state: self.state(),
            });
        };
        if remaining <= TimeDelta::zero() {
            self.complete(ledger);
            return Ok(SessionState::Idle);
        }

        let session = session.clone();
        let pause_started_at = self.clock.now();
        tracing::info!(
            session_id = %session.id,
            recipe = %session.recipe.name,
            remaining_secs = ceil_secs(remaining),
            "Cooking paused"
        );
        self.phase = Phase::Paused {
            session,
            pause_started_at,
            remaining,
        };
        self.persist();

        self.emit(&SessionEvent::StateChanged(SessionState::Paused));
        self.emit_time(ceil_secs(remaining));
        Ok(SessionState::Paused)
    }

    /// Restart the timer.
    ///
    /// Under [`PausePolicy::Penalize`] the time spent paused is added back,
    /// capped at the recipe duration; under [`PausePolicy::Freeze`] the
    /// timer continues from where it stopped. Returns the new state:
    /// `Running`, or `Idle` if nothing was left and the session completed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RecoveryPending`] or
    /// [`SessionError::NotPaused`].
    pub fn resume(&mut self, ledger: &mut Ledger) -> Result<SessionState, SessionError> {
        self.ensure_recovered()?;
        let Phase::Paused {
            session,
            pause_started_at,
            remaining,
        } = &self.phase
        else {
            return Err(SessionError::NotPaused {
                state: self.state(),
            });
        };

        let now = self.clock.now();
        let paused_for = now
            .signed_duration_since(*pause_started_at)
            .max(TimeDelta::zero());
        let resumed = match self.policy {
            PausePolicy::Penalize => remaining.checked_add(&paused_for).unwrap_or(session.total),
            PausePolicy::Freeze => *remaining,
        };
        let new_remaining = clamp_remaining(resumed, session.total);
        let session = session.clone();

        let end_time = now.checked_add_signed(new_remaining).unwrap_or(now);
        self.phase = Phase::Running {
            session,
            end_time,
        };
        if new_remaining <= TimeDelta::zero() {
            self.complete(ledger);
            return Ok(SessionState::Idle);
        }
        self.persist();

        let remaining_secs = ceil_secs(new_remaining);
        if let Phase::Running { session, .. } = &self.phase {
            tracing::info!(
                session_id = %session.id,
                recipe = %session.recipe.name,
                paused_secs = paused_for.num_seconds(),
                remaining_secs,
                "Cooking resumed"
            );
        }
        self.emit(&SessionEvent::StateChanged(SessionState::Running));
        self.emit_time(remaining_secs);
        Ok(SessionState::Running)
    }

    /// Per-tick host callback: report remaining time and complete at zero.
    ///
    /// `TimeChanged` is emitted only when the whole-second value differs
    /// from the last one reported.
    pub fn poll(&mut self, ledger: &mut Ledger) -> PollOutcome {
        if self.pending.is_some() {
            return PollOutcome::Pending;
        }
        match self.state() {
            SessionState::Idle => PollOutcome::Idle,
            SessionState::Paused => PollOutcome::Paused {
                remaining_secs: self.remaining_seconds(),
            },
            SessionState::Running => {
                let remaining_secs = self.remaining_seconds();
                if remaining_secs == 0 {
                    return self
                        .complete(ledger)
                        .map_or(PollOutcome::Idle, PollOutcome::Completed);
                }
                if self.last_reported != Some(remaining_secs) {
                    self.emit_time(remaining_secs);
                }
                PollOutcome::Running { remaining_secs }
            }
        }
    }

    /// Finish the active session: credit one unit of the result, return to
    /// idle, and delete the persisted record.
    ///
    /// Only a session with no time left completes, whether running or
    /// paused. Returns the finished recipe, or `None` with no effect
    /// otherwise, so a second call is a no-op.
    pub fn complete(&mut self, ledger: &mut Ledger) -> Option<Recipe> {
        if self.remaining() > TimeDelta::zero() {
            tracing::debug!(
                state = %self.state(),
                remaining_secs = self.remaining_seconds(),
                "Complete ignored: session has time left"
            );
            return None;
        }
        let session = match core::mem::take(&mut self.phase) {
            Phase::Idle => return None,
            Phase::Running { session, .. } | Phase::Paused { session, .. } => session,
        };

        if let Err(e) = ledger.credit(
            &session.recipe.result_id,
            1,
            EntryReason::CookOutput,
            Some(session.id),
        ) {
            tracing::error!(
                session_id = %session.id,
                item = %session.recipe.result_id,
                error = %e,
                "Failed to credit cooking result"
            );
        }
        self.delete_record();

        tracing::info!(
            session_id = %session.id,
            recipe = %session.recipe.name,
            result = %session.recipe.result_id,
            "Cooking completed"
        );
        self.emit(&SessionEvent::StateChanged(SessionState::Idle));
        self.emit_time(0);
        self.emit(&SessionEvent::Finished(session.recipe.clone()));
        Some(session.recipe)
    }

    /// Resolve a staged session against the loaded catalog.
    ///
    /// An unknown recipe discards the session. A running session whose end
    /// time has passed completes immediately without ever being observed
    /// as running. Otherwise the session is restored in its persisted
    /// state and observers are told.
    pub fn resolve_pending(
        &mut self,
        catalog: &RecipeCatalog,
        ledger: &mut Ledger,
    ) -> RecoveryOutcome {
        let Some(record) = self.pending.take() else {
            return RecoveryOutcome::NothingToRecover;
        };

        let Some(recipe) = catalog.get(&record.recipe_name).cloned() else {
            tracing::warn!(recipe = %record.recipe_name, "Persisted recipe not in catalog, discarding session");
            self.delete_record();
            return RecoveryOutcome::Discarded {
                recipe: record.recipe_name,
                reason: DiscardReason::UnknownRecipe,
            };
        };

        let total = secs_to_delta(record.total_duration)
            .filter(|t| *t > TimeDelta::zero())
            .unwrap_or_else(|| recipe.duration());
        if total <= TimeDelta::zero() {
            tracing::warn!(recipe = %recipe.name, "Persisted session has no usable duration, discarding");
            self.delete_record();
            return RecoveryOutcome::Discarded {
                recipe: record.recipe_name,
                reason: DiscardReason::InvalidDuration,
            };
        }
        let session = ActiveSession {
            id: record.session_id.unwrap_or_default(),
            recipe,
            total,
        };
        let now = self.clock.now();

        if record.is_paused {
            let remaining = clamp_remaining(
                secs_to_delta(record.remaining_on_pause).unwrap_or_else(TimeDelta::zero),
                total,
            );
            let remaining_secs = ceil_secs(remaining);
            tracing::info!(
                session_id = %session.id,
                recipe = %session.recipe.name,
                remaining_secs,
                "Recovered paused session"
            );
            self.phase = Phase::Paused {
                session,
                pause_started_at: self.clock.from_epoch_seconds(record.pause_start_epoch),
                remaining,
            };
            self.persist();
            self.emit(&SessionEvent::StateChanged(SessionState::Paused));
            self.emit_time(remaining_secs);
            return RecoveryOutcome::RestoredPaused { remaining_secs };
        }

        let persisted_end = self.clock.from_epoch_seconds(record.end_time_epoch);
        let left = persisted_end.signed_duration_since(now);
        if left <= TimeDelta::zero() {
            tracing::info!(
                session_id = %session.id,
                recipe = %session.recipe.name,
                overdue_secs = left.num_seconds().saturating_neg(),
                "Persisted session finished while closed"
            );
            self.phase = Phase::Running {
                session,
                end_time: persisted_end,
            };
            return self
                .complete(ledger)
                .map_or(RecoveryOutcome::NothingToRecover, RecoveryOutcome::Completed);
        }

        // An end time further out than the full duration means the clock
        // moved backward; cap it.
        let end_time = if left > total {
            now.checked_add_signed(total).unwrap_or(persisted_end)
        } else {
            persisted_end
        };
        let remaining_secs = ceil_secs(clamp_remaining(left, total));
        tracing::info!(
            session_id = %session.id,
            recipe = %session.recipe.name,
            remaining_secs,
            "Recovered running session"
        );
        self.phase = Phase::Running { session, end_time };
        self.persist();
        self.emit(&SessionEvent::StateChanged(SessionState::Running));
        self.emit_time(remaining_secs);
        RecoveryOutcome::Resumed { remaining_secs }
    }

    /// Write the active session record, as on shutdown. Does nothing when
    /// idle or while recovery is pending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub fn save(&self) -> Result<(), DbError> {
        match self.record() {
            Some(record) => save_json(self.store.as_ref(), &self.key, &record),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_recovered(&self) -> Result<(), SessionError> {
        match &self.pending {
            Some(record) => Err(SessionError::RecoveryPending {
                recipe: record.recipe_name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        match self.record() {
            Some(record) => {
                if let Err(e) = save_json(self.store.as_ref(), &self.key, &record) {
                    tracing::error!(key = %self.key, error = %e, "Failed to persist session");
                }
            }
            None => self.delete_record(),
        }
    }

    fn delete_record(&self) {
        if let Err(e) = self.store.delete(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Failed to delete session record");
        }
    }

    fn emit(&mut self, event: &SessionEvent) {
        self.observers.for_each(|observer| observer.on_event(event));
    }

    fn emit_time(&mut self, remaining_secs: u64) {
        self.last_reported = Some(remaining_secs);
        self.emit(&SessionEvent::TimeChanged(remaining_secs));
    }
}

/// Ingredient totals keyed by item, in id order.
fn required_ingredients(recipe: &Recipe) -> BTreeMap<&ItemId, u32> {
    let mut totals: BTreeMap<&ItemId, u32> = BTreeMap::new();
    for ingredient in &recipe.ingredients {
        let slot = totals.entry(&ingredient.id).or_insert(0);
        *slot = slot.saturating_add(ingredient.amount);
    }
    totals
}

/// Spend the cost and debit the ingredients. If a debit fails the pool is
/// put back exactly as it was, regeneration anchor included.
fn take_inputs(
    recipe: &Recipe,
    energy: &mut EnergyPool,
    ledger: &mut Ledger,
    session: SessionId,
) -> Result<(), SessionError> {
    let before = energy.to_record();
    energy.spend(recipe.cost)?;
    if let Err(e) = debit_ingredients(recipe, ledger, session) {
        energy.restore(before);
        return Err(e);
    }
    Ok(())
}

/// Debit every ingredient, crediting back what was taken if one fails.
fn debit_ingredients(
    recipe: &Recipe,
    ledger: &mut Ledger,
    session: SessionId,
) -> Result<(), SessionError> {
    let required = required_ingredients(recipe);
    let mut taken: Vec<(&ItemId, u32)> = Vec::with_capacity(required.len());
    for (item, amount) in required {
        if let Err(e) = ledger.debit(item, amount, EntryReason::CookInput, Some(session)) {
            for (done, qty) in taken {
                if let Err(undo) = ledger.credit(done, qty, EntryReason::Rollback, Some(session)) {
                    tracing::error!(item = %done, error = %undo, "Failed to roll back ingredient");
                }
            }
            return Err(e.into());
        }
        taken.push((item, amount));
    }
    Ok(())
}

fn clamp_remaining(remaining: TimeDelta, total: TimeDelta) -> TimeDelta {
    remaining
        .min(total)
        .max(TimeDelta::zero())
}

fn ceil_secs(delta: TimeDelta) -> u64 {
    delta.to_std().map_or(0, |d| {
        d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0))
    })
}

fn delta_to_secs(delta: TimeDelta) -> f64 {
    delta.to_std().map_or(0.0, |d| d.as_secs_f64())
}

/// Seconds from a persisted record; `None` for negative or non-finite input.
fn secs_to_delta(secs: f64) -> Option<TimeDelta> {
    let std = std::time::Duration::try_from_secs_f64(secs).ok()?;
    TimeDelta::from_std(std).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use simmer_db::MemoryStore;
    use simmer_types::{EnergyRecord, Ingredient};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EnergyConfig;
    use crate::notify::EventLog;

    const T0: i64 = 1_700_000_000;
    const KEY: &str = "player_cooking";

    struct Rig {
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        energy: EnergyPool,
        ledger: Ledger,
        engine: SessionEngine,
        log: EventLog,
    }

    fn rig(policy: PausePolicy) -> Rig {
        let clock = Arc::new(ManualClock::at_epoch(T0));
        let store = Arc::new(MemoryStore::new());
        let dyn_clock: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let dyn_store: Arc<dyn Store> = Arc::clone(&store) as Arc<dyn Store>;
        let energy = EnergyPool::open(
            EnergyConfig::default(),
            Arc::clone(&dyn_clock),
            Arc::clone(&dyn_store),
            "player_energy",
        )
        .unwrap();
        let mut ledger = Ledger::new(Arc::clone(&dyn_store), "player_inventory");
        ledger.add(&ItemId::from("egg"), 4).unwrap();
        let mut engine = SessionEngine::open(dyn_clock, dyn_store, KEY, policy);
        let log = EventLog::new();
        engine.subscribe(log.clone());
        Rig {
            clock,
            store,
            energy,
            ledger,
            engine,
            log,
        }
    }

    fn omelette() -> Recipe {
        Recipe {
            name: "Omelette".to_owned(),
            cost: 5,
            ingredients: vec![Ingredient::new("egg", 2)],
            result_id: ItemId::from("omelette"),
            duration_seconds: 60,
            star_rating: 2,
        }
    }

    #[test]
    fn start_deducts_and_runs_for_full_duration() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();

        assert_eq!(r.engine.state(), SessionState::Running);
        assert_eq!(r.engine.remaining_seconds(), 60);
        assert_eq!(r.energy.current(), 25);
        assert_eq!(r.ledger.count("egg"), 2);
        assert_eq!(
            r.log.events(),
            vec![
                SessionEvent::StateChanged(SessionState::Running),
                SessionEvent::TimeChanged(60)
            ]
        );
        let record = r.engine.record().unwrap();
        assert_eq!(record.end_time_epoch, T0 + 60);
        assert!((record.total_duration - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn start_twice_is_refused() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        let second = r.engine.start(&omelette(), &mut r.energy, &mut r.ledger);
        assert!(matches!(second, Err(SessionError::NotIdle { .. })));
        assert_eq!(r.ledger.count("egg"), 2);
    }

    #[test]
    fn insufficient_energy_reported_before_ingredients() {
        let mut r = rig(PausePolicy::Penalize);
        let mut pricey = omelette();
        pricey.cost = 31;
        pricey.ingredients = vec![Ingredient::new("truffle", 1)];
        let result = r.engine.start(&pricey, &mut r.energy, &mut r.ledger);
        assert!(matches!(
            result,
            Err(SessionError::InsufficientEnergy {
                required: 31,
                available: 30
            })
        ));
    }

    #[test]
    fn repeated_ingredient_ids_are_summed() {
        let r = rig(PausePolicy::Penalize);
        let mut greedy = omelette();
        greedy.ingredients = vec![Ingredient::new("egg", 3), Ingredient::new("egg", 3)];
        let short = SessionEngine::missing_ingredients(&greedy, &r.ledger);
        assert_eq!(
            short,
            vec![Shortfall {
                item: ItemId::from("egg"),
                required: 6,
                available: 4
            }]
        );
    }

    #[test]
    fn pause_and_immediate_resume_keep_remaining() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(20);

        assert_eq!(r.engine.pause(&mut r.ledger).unwrap(), SessionState::Paused);
        assert_eq!(r.engine.remaining_seconds(), 40);
        assert_eq!(r.engine.resume(&mut r.ledger).unwrap(), SessionState::Running);
        assert_eq!(r.engine.remaining_seconds(), 40);
    }

    #[test]
    fn paused_timer_does_not_run_down() {
        let mut r = rig(PausePolicy::Freeze);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(10);
        r.engine.pause(&mut r.ledger).unwrap();
        r.clock.advance_secs(500);
        assert_eq!(r.engine.remaining_seconds(), 50);
        assert_eq!(
            r.engine.poll(&mut r.ledger),
            PollOutcome::Paused { remaining_secs: 50 }
        );
    }

    #[test]
    fn penalize_adds_paused_time_back_capped_at_total() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(30);
        r.engine.pause(&mut r.ledger).unwrap();
        r.clock.advance_secs(10);
        r.engine.resume(&mut r.ledger).unwrap();
        assert_eq!(r.engine.remaining_seconds(), 40);

        r.engine.pause(&mut r.ledger).unwrap();
        r.clock.advance_secs(10_000);
        r.engine.resume(&mut r.ledger).unwrap();
        assert_eq!(r.engine.remaining_seconds(), 60);
    }

    #[test]
    fn freeze_policy_ignores_pause_length() {
        let mut r = rig(PausePolicy::Freeze);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(30);
        r.engine.pause(&mut r.ledger).unwrap();
        r.clock.advance_secs(10);
        r.engine.resume(&mut r.ledger).unwrap();
        assert_eq!(r.engine.remaining_seconds(), 30);
    }

    #[test]
    fn wrong_state_transitions_refused() {
        let mut r = rig(PausePolicy::Penalize);
        assert!(matches!(
            r.engine.pause(&mut r.ledger),
            Err(SessionError::NotRunning {
                state: SessionState::Idle
            })
        ));
        assert!(matches!(
            r.engine.resume(&mut r.ledger),
            Err(SessionError::NotPaused { .. })
        ));
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        assert!(matches!(
            r.engine.resume(&mut r.ledger),
            Err(SessionError::NotPaused {
                state: SessionState::Running
            })
        ));
    }

    #[test]
    fn poll_reports_each_second_once_and_completes() {
        let mut r = rig(PausePolicy::Penalize);
        let mut quick = omelette();
        quick.duration_seconds = 2;
        r.engine.start(&quick, &mut r.energy, &mut r.ledger).unwrap();
        r.log.clear();

        assert_eq!(
            r.engine.poll(&mut r.ledger),
            PollOutcome::Running { remaining_secs: 2 }
        );
        assert!(r.log.events().is_empty());

        r.clock.advance(TimeDelta::milliseconds(500));
        r.engine.poll(&mut r.ledger);
        r.clock.advance(TimeDelta::milliseconds(100));
        r.engine.poll(&mut r.ledger);
        assert!(r.log.events().is_empty());

        r.clock.advance(TimeDelta::milliseconds(500));
        r.engine.poll(&mut r.ledger);
        assert_eq!(r.log.events(), vec![SessionEvent::TimeChanged(1)]);

        r.clock.advance_secs(1);
        let outcome = r.engine.poll(&mut r.ledger);
        assert_eq!(outcome, PollOutcome::Completed(quick.clone()));
        assert_eq!(r.ledger.count("omelette"), 1);
        assert_eq!(
            r.log.events(),
            vec![
                SessionEvent::TimeChanged(1),
                SessionEvent::StateChanged(SessionState::Idle),
                SessionEvent::TimeChanged(0),
                SessionEvent::Finished(quick),
            ]
        );
        assert!(!r.store.contains(KEY));
    }

    #[test]
    fn failed_debit_puts_energy_back_with_its_anchor() {
        let mut r = rig(PausePolicy::Penalize);
        r.energy.spend(10).unwrap();
        r.clock.advance_secs(3);
        let before = r.energy.to_record();
        let frittata = Recipe {
            name: "Frittata".to_owned(),
            cost: 5,
            ingredients: vec![Ingredient::new("egg", 2), Ingredient::new("truffle", 1)],
            result_id: ItemId::from("frittata"),
            duration_seconds: 90,
            star_rating: 3,
        };

        let result = take_inputs(&frittata, &mut r.energy, &mut r.ledger, SessionId::new());
        assert!(matches!(result, Err(SessionError::Ledger(_))));
        assert_eq!(r.energy.current(), 20);
        assert_eq!(r.energy.seconds_until_next(), 2);
        assert_eq!(r.energy.to_record(), before);
        assert_eq!(r.ledger.count("egg"), 4);
        let saved: Option<EnergyRecord> = load_json(r.store.as_ref(), "player_energy").unwrap();
        assert_eq!(saved, Some(before));
    }

    #[test]
    fn complete_before_expiry_is_refused() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(59);

        assert!(r.engine.complete(&mut r.ledger).is_none());
        assert_eq!(r.engine.state(), SessionState::Running);
        assert_eq!(r.engine.remaining_seconds(), 1);
        assert_eq!(r.ledger.count("omelette"), 0);
        assert!(r.store.contains(KEY));
    }

    #[test]
    fn complete_is_idempotent() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(60);
        assert!(r.engine.complete(&mut r.ledger).is_some());
        assert!(r.engine.complete(&mut r.ledger).is_none());
        assert_eq!(r.ledger.count("omelette"), 1);
    }

    #[test]
    fn complete_ignores_paused_session_with_time_left() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.engine.pause(&mut r.ledger).unwrap();
        assert!(r.engine.complete(&mut r.ledger).is_none());
        assert_eq!(r.engine.state(), SessionState::Paused);
    }

    #[test]
    fn pause_at_zero_completes() {
        let mut r = rig(PausePolicy::Penalize);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        r.clock.advance_secs(61);
        assert_eq!(r.engine.pause(&mut r.ledger).unwrap(), SessionState::Idle);
        assert_eq!(r.ledger.count("omelette"), 1);
    }

    #[test]
    fn persist_failure_does_not_break_transitions() {
        let mut r = rig(PausePolicy::Penalize);
        r.store.set_fail_writes(true);
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        assert!(r.engine.is_running());
        assert!(r.engine.save().is_err());

        r.store.set_fail_writes(false);
        assert!(r.engine.save().is_ok());
        assert!(r.store.contains(KEY));
    }

    #[test]
    fn unsubscribed_observer_hears_nothing() {
        let mut r = rig(PausePolicy::Penalize);
        let quiet = EventLog::new();
        let id = r.engine.subscribe(quiet.clone());
        assert!(r.engine.unsubscribe(id));
        r.engine.start(&omelette(), &mut r.energy, &mut r.ledger).unwrap();
        assert!(quiet.events().is_empty());
        assert!(!r.log.events().is_empty());
    }

    #[test]
    fn ceil_rounds_partial_seconds_up() {
        assert_eq!(ceil_secs(TimeDelta::milliseconds(1)), 1);
        assert_eq!(ceil_secs(TimeDelta::seconds(3)), 3);
        assert_eq!(ceil_secs(TimeDelta::milliseconds(-5)), 0);
    }

    #[test]
    fn persisted_seconds_reject_garbage() {
        assert!(secs_to_delta(f64::NAN).is_none());
        assert!(secs_to_delta(-1.0).is_none());
        assert!(secs_to_delta(f64::INFINITY).is_none());
        assert_eq!(secs_to_delta(2.5), Some(TimeDelta::milliseconds(2500)));
    }
}

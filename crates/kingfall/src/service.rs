//! The wired core: session machine + ledger + settlement hook.
//!
//! `GameService` owns the process-wide state that the original system
//! kept in module scope: the session document, the balance table, and
//! the exchange log. Everything is passed in at construction and shared
//! by handle, so embedding, testing, and teardown are explicit.

use std::time::Duration;

use kingfall_board::Square;
use kingfall_ledger::{Ledger, LedgerConfig, LedgerError};
use kingfall_protocol::{Balance, ExchangeRecord, GameSession, PlayerId};
use kingfall_session::{MoveReceipt, SessionError, SessionMachine, SettlementClaim};
use kingfall_store::{MemoryDocument, MemoryTable, Versioned};
use tokio::sync::{broadcast, watch};

use crate::ServiceError;

/// How many times the settlement applies its balance write before
/// giving up on a persistently racing exchange.
const SETTLE_ATTEMPTS: usize = 3;

/// Service-level settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ledger: LedgerConfig,
    /// Delay between a settled game and the automatic reset.
    pub reset_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            reset_delay: Duration::from_secs(3),
        }
    }
}

/// The assembled game service. Share it behind an `Arc`; all interior
/// state lives in the store handles.
pub struct GameService {
    doc: MemoryDocument<GameSession>,
    machine: SessionMachine<MemoryDocument<GameSession>>,
    ledger: Ledger<MemoryTable<PlayerId, u64>>,
    balance_events: broadcast::Sender<Balance>,
    reset_delay: Duration,
}

impl GameService {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let doc = MemoryDocument::new(GameSession::new());
        let machine = SessionMachine::new(doc.clone());
        let ledger = Ledger::with_config(MemoryTable::new(), config.ledger);
        let (balance_events, _) = broadcast::channel(64);
        Self {
            doc,
            machine,
            ledger,
            balance_events,
            reset_delay: config.reset_delay,
        }
    }

    // -- Streamed reads ---------------------------------------------------
    //
    // Display snapshots only. Mutating operations always re-read
    // transactionally; none of these feed a write decision.

    /// The latest committed session.
    pub async fn session(&self) -> Versioned<GameSession> {
        self.machine.snapshot().await
    }

    /// Every committed session value, as it lands.
    pub fn subscribe(&self) -> watch::Receiver<Versioned<GameSession>> {
        self.machine.subscribe()
    }

    /// Balance changes from settlements and exchanges.
    pub fn subscribe_balances(&self) -> broadcast::Receiver<Balance> {
        self.balance_events.subscribe()
    }

    /// The player's current coins.
    pub async fn balance(&self, player: PlayerId) -> u64 {
        self.ledger.balance(player).await
    }

    /// Every exchange request recorded so far.
    pub async fn exchange_log(&self) -> Vec<ExchangeRecord> {
        self.ledger.exchange_log().await
    }

    // -- Intents ----------------------------------------------------------

    pub async fn join(&self, player: PlayerId) -> Result<(), ServiceError> {
        self.machine.join(player).await?;
        Ok(())
    }

    pub async fn leave(&self, player: PlayerId) -> Result<(), ServiceError> {
        self.machine.leave(player).await?;
        Ok(())
    }

    /// Applies a move. When the move decides the game, settlement runs
    /// synchronously as the post-commit step and the delayed reset is
    /// scheduled.
    pub async fn make_move(
        &self,
        player: PlayerId,
        from: Square,
        to: Square,
    ) -> Result<MoveReceipt, ServiceError> {
        let receipt = self.machine.play(player, from, to).await?;
        if receipt.decided.is_some() {
            self.settle_if_finished().await?;
        }
        Ok(receipt)
    }

    /// Administrative reset, valid in any state.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        self.machine.reset().await?;
        Ok(())
    }

    /// Converts coins to external units and publishes the new balance.
    pub async fn exchange(
        &self,
        player: PlayerId,
        units: u64,
        external_ref: &str,
    ) -> Result<Balance, ServiceError> {
        let balance = self.ledger.exchange(player, units, external_ref).await?;
        let _ = self.balance_events.send(balance);
        Ok(balance)
    }

    // -- Settlement -------------------------------------------------------

    /// Settles the current Finished transition, if any, at most once.
    ///
    /// Callable by whoever observes a Finished snapshot — the mutating
    /// client, the gateway, or an external watcher. The session's
    /// `settled_for` marker is claimed first with a conditional write,
    /// so of any number of concurrent callers exactly one applies the
    /// balance deltas; the rest observe a no-op.
    ///
    /// Returns the settled `(winner, loser)` balances when this caller
    /// applied them.
    pub async fn settle_if_finished(
        &self,
    ) -> Result<Option<(Balance, Balance)>, ServiceError> {
        let (winner, loser) = match self.machine.claim_settlement().await {
            Ok(SettlementClaim::Claimed { winner, loser }) => (winner, loser),
            Ok(SettlementClaim::AlreadyApplied)
            | Ok(SettlementClaim::NotFinished) => return Ok(None),
            // Someone else won the claim race (or the session moved on).
            Err(SessionError::Conflict) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let balances = self.apply_settlement(winner, loser).await?;
        let _ = self.balance_events.send(balances.0);
        let _ = self.balance_events.send(balances.1);
        self.schedule_reset();
        Ok(Some(balances))
    }

    /// Applies the balance deltas for a claimed settlement, retrying a
    /// bounded number of times when a concurrent exchange moves one of
    /// the records between read and commit.
    async fn apply_settlement(
        &self,
        winner: PlayerId,
        loser: PlayerId,
    ) -> Result<(Balance, Balance), ServiceError> {
        for _ in 0..SETTLE_ATTEMPTS {
            match self.ledger.settle(winner, loser).await {
                Ok(balances) => return Ok(balances),
                Err(LedgerError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(
            %winner,
            %loser,
            "settlement kept losing balance races — giving up"
        );
        Err(LedgerError::Conflict.into())
    }

    /// Fire-and-forget delayed reset after a settled game. If the
    /// process dies first, the session stays Finished until an
    /// administrative reset.
    fn schedule_reset(&self) {
        let doc = self.doc.clone();
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let machine = SessionMachine::new(doc);
            // Each attempt re-reads, so only a steady stream of
            // concurrent writes keeps this failing.
            for _ in 0..3 {
                match machine.reset().await {
                    Ok(_) => return,
                    Err(SessionError::Conflict) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "scheduled reset failed");
                        return;
                    }
                }
            }
            tracing::warn!("scheduled reset kept conflicting — leaving session as-is");
        });
    }
}

impl Default for GameService {
    fn default() -> Self {
        Self::new()
    }
}

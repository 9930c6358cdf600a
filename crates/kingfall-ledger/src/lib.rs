//! Per-player coin ledger for Kingfall.
//!
//! Balance records are created lazily on first reference and never
//! deleted. Only two things mutate them: settlement after a decided
//! game (both seats adjusted in one atomic two-record commit) and an
//! exchange deduction. Balances never go negative — the loss penalty
//! clamps at zero, and an exchange that cannot be covered is rejected
//! with the record untouched.
//!
//! The ledger applies whatever it is asked to apply; at-most-once
//! settlement per Finished transition is enforced upstream by the
//! session's `settled_for` marker.

use std::time::{SystemTime, UNIX_EPOCH};

use kingfall_protocol::{Balance, ExchangeRecord, ExchangeStatus, PlayerId};
use kingfall_store::{Expect, MemoryLog, StoreError, Table, TableWrite};

/// Tunable amounts. Defaults match the production economy.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Coins credited to the winner of a decided game.
    pub win_award: u64,
    /// Coins debited from the loser, clamped at a zero balance.
    pub loss_penalty: u64,
    /// Coins per external currency unit on exchange.
    pub exchange_rate: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            win_award: 100,
            loss_penalty: 100,
            exchange_rate: 400,
        }
    }
}

/// Errors surfaced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The exchange cost exceeds the current balance. Terminal for the
    /// attempt; the balance is unchanged.
    #[error("insufficient funds: balance {balance}, cost {cost}")]
    InsufficientFunds { balance: u64, cost: u64 },

    /// A balance changed between read and commit. Retryable.
    #[error("balance changed since it was read — retry")]
    Conflict,
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            // Balance records are never deleted, so a vanished record
            // under a version-conditioned write is a race by definition.
            StoreError::NotFound => Self::Conflict,
        }
    }
}

/// The coin ledger: balances in a versioned table, exchange requests in
/// an append-only audit log.
pub struct Ledger<T> {
    balances: T,
    exchanges: MemoryLog<ExchangeRecord>,
    config: LedgerConfig,
}

impl<T: Table<PlayerId, u64>> Ledger<T> {
    pub fn new(balances: T) -> Self {
        Self::with_config(balances, LedgerConfig::default())
    }

    pub fn with_config(balances: T, config: LedgerConfig) -> Self {
        Self {
            balances,
            exchanges: MemoryLog::new(),
            config,
        }
    }

    /// The player's current coins; 0 before any settlement touches them.
    pub async fn balance(&self, player: PlayerId) -> u64 {
        self.balances
            .read(&player)
            .await
            .map(|v| v.value)
            .unwrap_or(0)
    }

    /// Applies one decided game: winner credited, loser debited with a
    /// zero clamp, both in a single atomic commit. Missing records are
    /// created as part of the same write.
    pub async fn settle(
        &self,
        winner: PlayerId,
        loser: PlayerId,
    ) -> Result<(Balance, Balance), LedgerError> {
        let winner_write = self
            .adjusted(winner, |coins| coins + self.config.win_award)
            .await;
        let loser_write = self
            .adjusted(loser, |coins| coins.saturating_sub(self.config.loss_penalty))
            .await;

        let winner_coins = winner_write.value;
        let loser_coins = loser_write.value;
        self.balances.commit_pair(winner_write, loser_write).await?;

        tracing::info!(
            %winner,
            %loser,
            winner_coins,
            loser_coins,
            "settlement applied"
        );
        Ok((
            Balance { player: winner, coins: winner_coins },
            Balance { player: loser, coins: loser_coins },
        ))
    }

    /// Converts coins into `units` of the external currency at the
    /// fixed rate. The deduction is version-conditioned; the audit
    /// entry is appended right after it lands. No compensating action
    /// follows a downstream transfer failure — reconciliation is out of
    /// band.
    pub async fn exchange(
        &self,
        player: PlayerId,
        units: u64,
        external_ref: &str,
    ) -> Result<Balance, LedgerError> {
        let cost = units.saturating_mul(self.config.exchange_rate);

        let current = self.balances.read(&player).await;
        let coins = current.as_ref().map(|v| v.value).unwrap_or(0);
        if coins < cost {
            return Err(LedgerError::InsufficientFunds { balance: coins, cost });
        }

        let expected = match &current {
            Some(v) => Expect::At(v.version),
            None => Expect::Absent,
        };
        let remaining = coins - cost;
        self.balances.commit(player, expected, remaining).await?;

        self.exchanges
            .append(ExchangeRecord {
                player,
                external_ref: external_ref.to_string(),
                units,
                cost,
                requested_at_ms: unix_millis(),
                status: ExchangeStatus::Submitted,
            })
            .await;

        tracing::info!(%player, units, cost, remaining, "exchange submitted");
        Ok(Balance { player, coins: remaining })
    }

    /// Every exchange request recorded so far, in submission order.
    pub async fn exchange_log(&self) -> Vec<ExchangeRecord> {
        self.exchanges.snapshot().await
    }

    /// Builds the conditional write that applies `f` to the player's
    /// current coins, creating the record when it does not exist yet.
    async fn adjusted(
        &self,
        player: PlayerId,
        f: impl FnOnce(u64) -> u64,
    ) -> TableWrite<PlayerId, u64> {
        match self.balances.read(&player).await {
            Some(current) => TableWrite {
                key: player,
                expected: Expect::At(current.version),
                value: f(current.value),
            },
            None => TableWrite {
                key: player,
                expected: Expect::Absent,
                value: f(0),
            },
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =========================================================================
// Tests
// =========================================================================

//! The session state machine.
//!
//! Every operation is one optimistic transaction: read the versioned
//! snapshot, validate against it, commit the successor value at that
//! version. Preconditions are therefore always enforced against the
//! latest committed state — a stale client-side selection racing a
//! concurrent move loses at the version check, never on the board.

use kingfall_board::{legal_move, Piece, PieceKind, Side, Square};
use kingfall_protocol::{GameSession, PlayerId, Status};
use kingfall_store::{Document, Versioned};
use tokio::sync::watch;

use crate::SessionError;

/// The result of a committed move.
#[derive(Debug, Clone)]
pub struct MoveReceipt {
    /// The session as committed by this move.
    pub session: Versioned<GameSession>,
    /// The piece removed from the destination square, if any.
    pub captured: Option<Piece>,
    /// Set when this move captured a King and finished the game.
    pub decided: Option<(PlayerId, PlayerId)>,
}

impl MoveReceipt {
    /// `(winner, loser)` when this move finished the game.
    pub fn winner_loser(&self) -> Option<(PlayerId, PlayerId)> {
        self.decided
    }
}

/// Outcome of a settlement claim against a Finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementClaim {
    /// This caller won the claim; it must now apply the balance deltas.
    Claimed { winner: PlayerId, loser: PlayerId },
    /// The marker already names this winner — settled by someone else.
    AlreadyApplied,
    /// The session is not in a settleable state.
    NotFinished,
}

/// The authoritative session record and its transition operations.
///
/// Generic over the [`Document`] backing so tests can interpose on the
/// read/commit window; production uses
/// [`MemoryDocument`](kingfall_store::MemoryDocument).
pub struct SessionMachine<D> {
    doc: D,
}

impl<D: Document<GameSession>> SessionMachine<D> {
    pub fn new(doc: D) -> Self {
        Self { doc }
    }

    /// The current committed session. Display-only: never a basis for
    /// a mutation decision — operations re-read internally.
    pub async fn snapshot(&self) -> Versioned<GameSession> {
        self.doc.read().await
    }

    /// Commit fan-out: every committed session value, as it lands.
    pub fn subscribe(&self) -> watch::Receiver<Versioned<GameSession>> {
        self.doc.subscribe()
    }

    /// Seats `player`: White if free, else Black. Filling the Black
    /// seat starts the game.
    pub async fn join(
        &self,
        player: PlayerId,
    ) -> Result<Versioned<GameSession>, SessionError> {
        let snapshot = self.doc.read().await;
        let mut session = snapshot.value;

        if session.seat_of(player).is_some() {
            return Err(SessionError::AlreadySeated(player));
        }
        if session.status == Status::Playing {
            return Err(SessionError::GameFull);
        }

        let side = if session.seat_white.is_none() {
            session.seat_white = Some(player);
            Side::White
        } else if session.seat_black.is_none() {
            session.seat_black = Some(player);
            session.status = Status::Playing;
            Side::Black
        } else {
            return Err(SessionError::GameFull);
        };

        let committed = self.doc.commit(snapshot.version, session).await?;
        tracing::info!(%player, %side, status = %committed.value.status, "seat taken");
        Ok(committed)
    }

    /// Clears `player`'s seat. Emptying the session restores the
    /// created state; a lone departure from a running game demotes it
    /// to Waiting with the board preserved (no forfeit win).
    pub async fn leave(
        &self,
        player: PlayerId,
    ) -> Result<Versioned<GameSession>, SessionError> {
        let snapshot = self.doc.read().await;
        let mut session = snapshot.value;

        let Some(side) = session.seat_of(player) else {
            return Err(SessionError::NotSeated(player));
        };
        session.set_seat(side, None);

        if session.seat_white.is_none() && session.seat_black.is_none() {
            session = GameSession::new();
        } else if session.status == Status::Playing {
            session.status = Status::Waiting;
        }

        let committed = self.doc.commit(snapshot.version, session).await?;
        tracing::info!(%player, %side, status = %committed.value.status, "seat cleared");
        Ok(committed)
    }

    /// Moves the piece on `from` to `to` for `player`.
    ///
    /// All preconditions are checked against the freshly read committed
    /// snapshot, and the version-conditioned commit guarantees at most
    /// one of two racing moves lands. Capturing a King finishes the
    /// game with `player` as winner.
    pub async fn play(
        &self,
        player: PlayerId,
        from: Square,
        to: Square,
    ) -> Result<MoveReceipt, SessionError> {
        let snapshot = self.doc.read().await;
        let mut session = snapshot.value;

        if session.status != Status::Playing {
            return Err(SessionError::NotPlaying);
        }
        let Some(side) = session.seat_of(player) else {
            return Err(SessionError::NotSeated(player));
        };
        if side != session.turn {
            return Err(SessionError::WrongTurn(session.turn));
        }
        let Some(piece) = session.board.get(from) else {
            return Err(SessionError::NotYourPiece(from));
        };
        if piece.side != side {
            return Err(SessionError::NotYourPiece(from));
        }
        if !legal_move(&session.board, from, to) {
            return Err(SessionError::IllegalMove { from, to });
        }

        let captured = session.board.get(to);
        session.board.set(to, Some(piece));
        session.board.set(from, None);
        session.turn = side.opposite();

        let king_taken = captured.is_some_and(|p| p.kind == PieceKind::King);
        if king_taken {
            session.status = Status::Finished;
            session.winner = Some(player);
        }
        let opponent = session.occupant(side.opposite());

        let committed = self.doc.commit(snapshot.version, session).await?;
        tracing::info!(
            %player, %from, %to,
            captured = ?captured.map(|p| p.kind),
            finished = king_taken,
            "move committed"
        );

        let decided = match (king_taken, opponent) {
            (true, Some(loser)) => Some((player, loser)),
            _ => None,
        };
        Ok(MoveReceipt {
            session: committed,
            captured,
            decided,
        })
    }

    /// Administrative reset: unconditionally restores the created
    /// state. Fails only if a concurrent write slips in between read
    /// and commit; re-issuing then succeeds against the fresh record.
    pub async fn reset(&self) -> Result<Versioned<GameSession>, SessionError> {
        let snapshot = self.doc.read().await;
        let committed = self
            .doc
            .commit(snapshot.version, GameSession::new())
            .await?;
        tracing::info!(version = %committed.version, "session reset");
        Ok(committed)
    }

    /// Claims the settlement of the current Finished transition by
    /// stamping `settled_for` with the winner. The version-conditioned
    /// commit makes the claim exclusive: of all observers reacting to
    /// the same Finished snapshot, exactly one gets
    /// [`SettlementClaim::Claimed`] and applies the balance deltas.
    pub async fn claim_settlement(
        &self,
    ) -> Result<SettlementClaim, SessionError> {
        let snapshot = self.doc.read().await;
        let session = &snapshot.value;

        if session.status != Status::Finished {
            return Ok(SettlementClaim::NotFinished);
        }
        let Some(winner) = session.winner else {
            return Ok(SettlementClaim::NotFinished);
        };
        if session.settled_for == Some(winner) {
            return Ok(SettlementClaim::AlreadyApplied);
        }
        let Some(loser) = opponent_of(session, winner) else {
            tracing::warn!(
                %winner,
                "finished session has no opposing seat — skipping settlement"
            );
            return Ok(SettlementClaim::NotFinished);
        };

        let mut next = session.clone();
        next.settled_for = Some(winner);
        self.doc.commit(snapshot.version, next).await?;

        tracing::info!(%winner, %loser, "settlement claimed");
        Ok(SettlementClaim::Claimed { winner, loser })
    }
}

/// The seat occupant opposing `winner`. Falls back to a seat scan when
/// the winner already vacated their seat.
fn opponent_of(session: &GameSession, winner: PlayerId) -> Option<PlayerId> {
    match session.seat_of(winner) {
        Some(side) => session.occupant(side.opposite()),
        None => [session.seat_white, session.seat_black]
            .into_iter()
            .flatten()
            .find(|p| *p != winner),
    }
}

// =========================================================================
// Tests
// =========================================================================

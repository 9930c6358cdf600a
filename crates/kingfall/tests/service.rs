//! End-to-end service flows: decided games, settlement, the scheduled
//! reset, and exchanges — all through the public `GameService` API.
//!
//! The reduced movement rules make a three-move win from the initial
//! layout possible (sliding pieces ignore path blockers): the White
//! queen takes the d7 pawn along the file, Black answers with a pawn
//! push, and the queen steps diagonally onto the Black king.

use std::sync::Arc;
use std::time::Duration;

use kingfall::prelude::*;

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn sq(name: &str) -> Square {
    name.parse().expect("test square")
}

/// Service with a fast scheduled reset so tests don't wait 3 seconds.
fn quick_service() -> Arc<GameService> {
    Arc::new(GameService::with_config(ServiceConfig {
        reset_delay: Duration::from_millis(50),
        ..ServiceConfig::default()
    }))
}

/// Seats players 1 and 2 and plays White to the brink of the king
/// capture; `make_move(pid(1), d7, e8)` then decides the game.
async fn to_the_brink(service: &GameService) {
    service.join(pid(1)).await.unwrap();
    service.join(pid(2)).await.unwrap();
    service.make_move(pid(1), sq("d1"), sq("d7")).await.unwrap();
    service.make_move(pid(2), sq("a7"), sq("a6")).await.unwrap();
}

/// Waits until the session returns to the created Waiting state.
async fn await_reset(service: &GameService) {
    let mut sessions = service.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if sessions.borrow_and_update().value.status == Status::Waiting {
                return;
            }
            sessions.changed().await.expect("session stream closed");
        }
    })
    .await
    .expect("session never reset");
}

#[tokio::test]
async fn test_decided_game_settles_and_resets() {
    let service = quick_service();
    to_the_brink(&service).await;

    let receipt = service
        .make_move(pid(1), sq("d7"), sq("e8"))
        .await
        .unwrap();

    // The winning move reports the outcome and the session is Finished
    // with the settlement marker stamped.
    assert_eq!(receipt.winner_loser(), Some((pid(1), pid(2))));
    let session = service.session().await.value;
    assert_eq!(session.status, Status::Finished);
    assert_eq!(session.winner, Some(pid(1)));
    assert_eq!(session.settled_for, Some(pid(1)));

    // Winner credited, loser clamped at zero.
    assert_eq!(service.balance(pid(1)).await, 100);
    assert_eq!(service.balance(pid(2)).await, 0);

    // The scheduled reset restores the created state.
    await_reset(&service).await;
    assert_eq!(service.session().await.value, GameSession::new());
}

#[tokio::test]
async fn test_settlement_applies_once_despite_extra_observers() {
    // Long reset delay: the Finished snapshot must stay observable for
    // the whole race.
    let service = Arc::new(GameService::with_config(ServiceConfig {
        reset_delay: Duration::from_secs(60),
        ..ServiceConfig::default()
    }));
    to_the_brink(&service).await;

    // An external watcher races the mutating client to settle the same
    // Finished transition.
    let watcher = {
        let service = Arc::clone(&service);
        let mut sessions = service.subscribe();
        tokio::spawn(async move {
            loop {
                if sessions.borrow_and_update().value.status == Status::Finished
                {
                    service.settle_if_finished().await.unwrap();
                    return;
                }
                if sessions.changed().await.is_err() {
                    return;
                }
            }
        })
    };

    service
        .make_move(pid(1), sq("d7"), sq("e8"))
        .await
        .unwrap();
    watcher.await.unwrap();

    // However the race resolved, the award landed exactly once.
    assert_eq!(service.balance(pid(1)).await, 100);
    assert_eq!(service.balance(pid(2)).await, 0);
}

#[tokio::test]
async fn test_settle_if_finished_is_noop_on_live_game() {
    let service = quick_service();
    service.join(pid(1)).await.unwrap();
    service.join(pid(2)).await.unwrap();

    let settled = service.settle_if_finished().await.unwrap();

    assert_eq!(settled, None);
    assert_eq!(service.balance(pid(1)).await, 0);
}

#[tokio::test]
async fn test_repeat_games_accumulate_winnings() {
    let service = quick_service();

    for round in 1..=3u64 {
        to_the_brink(&service).await;
        service
            .make_move(pid(1), sq("d7"), sq("e8"))
            .await
            .unwrap();
        await_reset(&service).await;
        assert_eq!(service.balance(pid(1)).await, 100 * round);
    }
    assert_eq!(service.balance(pid(2)).await, 0);
}

#[tokio::test]
async fn test_exchange_rejects_until_affordable() {
    let service = quick_service();

    // One win: 100 coins — not enough for a 400-coin unit.
    to_the_brink(&service).await;
    service
        .make_move(pid(1), sq("d7"), sq("e8"))
        .await
        .unwrap();

    let result = service.exchange(pid(1), 1, "acct-1").await;
    assert!(matches!(
        result,
        Err(ServiceError::Ledger(LedgerError::InsufficientFunds {
            balance: 100,
            cost: 400,
        }))
    ));
    assert_eq!(service.balance(pid(1)).await, 100);
    assert!(service.exchange_log().await.is_empty());

    // Three more wins make it affordable.
    for _ in 0..3 {
        await_reset(&service).await;
        to_the_brink(&service).await;
        service
            .make_move(pid(1), sq("d7"), sq("e8"))
            .await
            .unwrap();
    }
    assert_eq!(service.balance(pid(1)).await, 400);

    let balance = service.exchange(pid(1), 1, "acct-1").await.unwrap();

    assert_eq!(balance.coins, 0);
    let log = service.exchange_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].cost, 400);
}

#[tokio::test]
async fn test_rejected_intents_leave_everything_untouched() {
    let service = quick_service();
    service.join(pid(1)).await.unwrap();
    service.join(pid(2)).await.unwrap();
    let before = service.session().await;

    // Wrong turn, foreign piece, illegal shape, bad seat ops.
    assert!(service.make_move(pid(2), sq("e7"), sq("e5")).await.is_err());
    assert!(service.make_move(pid(1), sq("e7"), sq("e5")).await.is_err());
    assert!(service.make_move(pid(1), sq("e2"), sq("e5")).await.is_err());
    assert!(service.join(pid(3)).await.is_err());
    assert!(service.leave(pid(3)).await.is_err());

    assert_eq!(service.session().await, before);
}

#[tokio::test]
async fn test_retryable_classification() {
    let conflict: ServiceError = SessionError::Conflict.into();
    let validation: ServiceError = SessionError::GameFull.into();
    let funds: ServiceError =
        LedgerError::InsufficientFunds { balance: 0, cost: 400 }.into();

    assert!(conflict.is_retryable());
    assert!(!validation.is_retryable());
    assert!(!funds.is_retryable());
}

//! Socket-level gateway tests: real WebSocket clients against a bound
//! server, exercising handshake, fan-out, and the full duel flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kingfall::prelude::*;
use tokio_tungstenite::tungstenite::Message;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn start() -> String {
    let service = Arc::new(GameService::new());
    let gateway = Gateway::bind("127.0.0.1:0", service).await.unwrap();
    let addr = gateway.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = gateway.run().await;
    });
    addr
}

async fn raw_connect(addr: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut Ws, frame: &ClientFrame) {
    let text = serde_json::to_string(frame).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn recv(ws: &mut Ws) -> ServerFrame {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("transport error");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Connects and completes the handshake, draining the seed frames
/// (Welcome, Session, Balance).
async fn connect(addr: &str, player: u64) -> Ws {
    let mut ws = raw_connect(addr).await;
    send(
        &mut ws,
        &ClientFrame::Hello {
            version: PROTOCOL_VERSION,
            player: PlayerId(player),
        },
    )
    .await;

    let welcome = recv(&mut ws).await;
    assert!(
        matches!(welcome, ServerFrame::Welcome { player: p } if p == PlayerId(player))
    );
    let session = recv(&mut ws).await;
    assert!(matches!(session, ServerFrame::Session { .. }));
    let balance = recv(&mut ws).await;
    assert!(matches!(balance, ServerFrame::Balance { .. }));
    ws
}

/// Reads frames until a session snapshot satisfies `pred`, skipping
/// everything else (balance pushes interleave arbitrarily).
async fn session_where(
    ws: &mut Ws,
    pred: impl Fn(&GameSession) -> bool,
) -> GameSession {
    loop {
        if let ServerFrame::Session { session, .. } = recv(ws).await {
            if pred(&session) {
                return session;
            }
        }
    }
}

/// Reads frames until both a Finished session and the player's own
/// balance have arrived — the two are pushed on independent channels,
/// so their order is not fixed.
async fn await_finish_and_balance(
    ws: &mut Ws,
    player: u64,
) -> (GameSession, u64) {
    let mut finished: Option<GameSession> = None;
    let mut coins: Option<u64> = None;
    loop {
        match recv(ws).await {
            // The Finished snapshot and its settlement marker land as
            // separate commits; wait for the marked one.
            ServerFrame::Session { session, .. }
                if session.status == Status::Finished
                    && session.settled_for.is_some() =>
            {
                finished = Some(session);
            }
            ServerFrame::Balance { player: p, coins: c }
                if p == PlayerId(player) =>
            {
                coins = Some(c);
            }
            _ => {}
        }
        if let (Some(session), Some(coins)) = (finished.clone(), coins) {
            return (session, coins);
        }
    }
}

fn sq(name: &str) -> Square {
    name.parse().expect("test square")
}

// -------------------------------------------------------------------------
// Handshake
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_handshake_version_mismatch_rejected() {
    let addr = start().await;
    let mut ws = raw_connect(&addr).await;

    send(
        &mut ws,
        &ClientFrame::Hello { version: 99, player: PlayerId(1) },
    )
    .await;

    let frame = recv(&mut ws).await;
    assert!(
        matches!(frame, ServerFrame::Error { code: 400, ref message } if message.contains("version")),
        "got {frame:?}"
    );
}

#[tokio::test]
async fn test_first_frame_must_be_hello() {
    let addr = start().await;
    let mut ws = raw_connect(&addr).await;

    send(&mut ws, &ClientFrame::Join).await;

    let frame = recv(&mut ws).await;
    assert!(matches!(frame, ServerFrame::Error { code: 400, .. }));
}

#[tokio::test]
async fn test_malformed_frame_answered_with_error() {
    let addr = start().await;
    let mut ws = connect(&addr, 1).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();

    let frame = recv(&mut ws).await;
    assert!(matches!(frame, ServerFrame::Error { code: 400, .. }));
}

// -------------------------------------------------------------------------
// Duel flow
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_join_fans_out_to_all_observers() {
    let addr = start().await;
    let mut p1 = connect(&addr, 1).await;
    let mut p2 = connect(&addr, 2).await;
    let mut spectator = connect(&addr, 3).await;

    // Sequence the joins: the frames travel on separate connections,
    // so player 1 must be seated before player 2's join is sent.
    send(&mut p1, &ClientFrame::Join).await;
    session_where(&mut p1, |s| s.seat_white == Some(PlayerId(1))).await;
    send(&mut p2, &ClientFrame::Join).await;

    for ws in [&mut p1, &mut p2, &mut spectator] {
        let session =
            session_where(ws, |s| s.status == Status::Playing).await;
        assert_eq!(session.seat_white, Some(PlayerId(1)));
        assert_eq!(session.seat_black, Some(PlayerId(2)));
        assert_eq!(session.turn, Side::White);
    }
}

#[tokio::test]
async fn test_full_duel_finishes_and_settles() {
    let addr = start().await;
    let mut p1 = connect(&addr, 1).await;
    let mut p2 = connect(&addr, 2).await;

    send(&mut p1, &ClientFrame::Join).await;
    session_where(&mut p1, |s| s.seat_white == Some(PlayerId(1))).await;
    send(&mut p2, &ClientFrame::Join).await;
    session_where(&mut p1, |s| s.status == Status::Playing).await;
    session_where(&mut p2, |s| s.status == Status::Playing).await;

    // White queen takes the d7 pawn down the file (no obstruction
    // rules), Black pushes a pawn, the queen steps onto the king.
    // Each mover waits until the previous commit is visible on the
    // board before acting — streamed snapshots may coalesce.
    send(&mut p1, &ClientFrame::Move { from: sq("d1"), to: sq("d7") }).await;
    session_where(&mut p2, |s| {
        s.board.get(sq("d7")).map(|p| p.kind) == Some(PieceKind::Queen)
    })
    .await;
    send(&mut p2, &ClientFrame::Move { from: sq("a7"), to: sq("a6") }).await;
    session_where(&mut p1, |s| s.board.get(sq("a6")).is_some()).await;
    send(&mut p1, &ClientFrame::Move { from: sq("d7"), to: sq("e8") }).await;

    // Both clients converge on the Finished snapshot, and settlement
    // pushes each player their own balance.
    let (session, coins) = await_finish_and_balance(&mut p1, 1).await;
    assert_eq!(session.winner, Some(PlayerId(1)));
    assert_eq!(session.settled_for, Some(PlayerId(1)));
    assert_eq!(coins, 100);

    let (session, coins) = await_finish_and_balance(&mut p2, 2).await;
    assert_eq!(session.winner, Some(PlayerId(1)));
    assert_eq!(coins, 0);
}

#[tokio::test]
async fn test_out_of_turn_move_rejected_with_reason() {
    let addr = start().await;
    let mut p1 = connect(&addr, 1).await;
    let mut p2 = connect(&addr, 2).await;

    send(&mut p1, &ClientFrame::Join).await;
    session_where(&mut p1, |s| s.seat_white == Some(PlayerId(1))).await;
    send(&mut p2, &ClientFrame::Join).await;
    session_where(&mut p2, |s| s.status == Status::Playing).await;

    // Black tries to open.
    send(&mut p2, &ClientFrame::Move { from: sq("e7"), to: sq("e5") }).await;

    loop {
        if let ServerFrame::Rejected { reason } = recv(&mut p2).await {
            assert!(reason.contains("turn"), "unexpected reason: {reason}");
            break;
        }
    }
}

#[tokio::test]
async fn test_spectator_intents_are_validated_too() {
    let addr = start().await;
    let mut p1 = connect(&addr, 1).await;
    let mut p2 = connect(&addr, 2).await;
    let mut outsider = connect(&addr, 9).await;

    send(&mut p1, &ClientFrame::Join).await;
    session_where(&mut p1, |s| s.seat_white == Some(PlayerId(1))).await;
    send(&mut p2, &ClientFrame::Join).await;
    session_where(&mut outsider, |s| s.status == Status::Playing).await;

    // A third party can watch but neither move nor join a full game.
    send(&mut outsider, &ClientFrame::Move { from: sq("e2"), to: sq("e4") })
        .await;
    loop {
        if let ServerFrame::Rejected { reason } = recv(&mut outsider).await {
            assert!(reason.contains("seat"), "unexpected reason: {reason}");
            break;
        }
    }

    send(&mut outsider, &ClientFrame::Join).await;
    loop {
        if let ServerFrame::Rejected { reason } = recv(&mut outsider).await {
            assert!(reason.contains("full"), "unexpected reason: {reason}");
            break;
        }
    }
}

#[tokio::test]
async fn test_exchange_rejection_over_the_wire() {
    let addr = start().await;
    let mut p1 = connect(&addr, 1).await;

    send(
        &mut p1,
        &ClientFrame::Exchange { units: 1, external_ref: "acct-1".into() },
    )
    .await;

    loop {
        if let ServerFrame::Rejected { reason } = recv(&mut p1).await {
            assert!(
                reason.contains("insufficient"),
                "unexpected reason: {reason}"
            );
            break;
        }
    }
}

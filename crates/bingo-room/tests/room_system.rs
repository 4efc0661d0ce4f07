//! Integration tests for the room coordinator.
//!
//! Every test runs with a paused clock: Tokio jumps to the next timer as
//! soon as all tasks are idle, so a whole 75-draw game takes no real time.

use std::collections::HashSet;
use std::time::Duration;

use bingo_protocol::{
    BingoCard, CARD_SIZE, CardLayout, Cell, ClaimRejection, Letter, PlayerId, ServerMessage,
};
use bingo_room::{ClaimOutcome, GameState, RoomConfig, RoomError, RoomHandle, spawn_room};
use tokio::sync::mpsc;

type Events = mpsc::UnboundedReceiver<ServerMessage>;

fn config() -> RoomConfig {
    RoomConfig {
        seed: Some(42),
        ..RoomConfig::default()
    }
}

async fn join(room: &RoomHandle, id: u64) -> (BingoCard, Events) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (card, _snapshot) = room.join(PlayerId(id), tx).await.unwrap();
    (card, rx)
}

/// Reads events until every number in `targets` has been announced.
async fn wait_for_draws(events: &mut Events, targets: &[u8]) -> HashSet<u8> {
    let mut seen = HashSet::new();
    while !targets.iter().all(|n| seen.contains(n)) {
        match events.recv().await.expect("room closed") {
            ServerMessage::DrawAnnounced { number, .. } => {
                seen.insert(number);
            }
            other => panic!("unexpected event while drawing: {other:?}"),
        }
    }
    seen
}

fn row_numbers(card: &BingoCard, row: usize) -> Vec<u8> {
    card.row(row).iter().filter_map(|c| c.number()).collect()
}

/// Drains everything currently queued without waiting.
fn drain(events: &mut Events) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = events.try_recv() {
        out.push(msg);
    }
    out
}

// =========================================================================
// Joining and the scheduler
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_join_starts_drawing() {
    let room = spawn_room(config());
    let before = room.info().await.unwrap();
    assert_eq!(before.state, GameState::Idle);
    assert!(!before.scheduler_running);

    let (tx, _rx) = mpsc::unbounded_channel();
    let (card, snapshot) = room.join(PlayerId(1), tx).await.unwrap();
    assert!(card.cell(Letter::N, 2).is_free());
    assert_eq!(snapshot.state, GameState::Drawing);
    assert!(snapshot.history.is_empty());
    assert_eq!(snapshot.last_draw, None);

    let info = room.info().await.unwrap();
    assert_eq!(info.state, GameState::Drawing);
    assert!(info.scheduler_running);
    assert_eq!(info.schedulers_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_joins_start_one_scheduler() {
    let room = spawn_room(config());

    let mut tasks = Vec::new();
    for id in 0..50 {
        let room = room.clone();
        tasks.push(tokio::spawn(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            room.join(PlayerId(id), tx).await.unwrap();
            rx
        }));
    }
    let mut receivers = Vec::new();
    for task in tasks {
        receivers.push(task.await.unwrap());
    }

    let info = room.info().await.unwrap();
    assert_eq!(info.player_count, 50);
    assert_eq!(info.schedulers_started, 1);

    // One scheduler means one draw per interval.
    tokio::time::sleep(Duration::from_secs(5) * 3 + Duration::from_secs(1)).await;
    assert_eq!(room.info().await.unwrap().draws, 4);
}

#[tokio::test(start_paused = true)]
async fn test_draws_are_broadcast_in_sequence() {
    let room = spawn_room(config());
    let (_card_a, mut a) = join(&room, 1).await;
    let (tx, mut b) = mpsc::unbounded_channel();
    let (_card_b, snapshot_b) = room.join(PlayerId(2), tx).await.unwrap();

    let mut seen_by_a = Vec::new();
    for expected in 1..=3 {
        match a.recv().await.unwrap() {
            ServerMessage::DrawAnnounced {
                letter,
                number,
                sequence,
            } => {
                assert_eq!(sequence, expected);
                assert_eq!(Letter::of(number), Some(letter));
                assert!(room.is_drawn(number.into()).await.unwrap());
                seen_by_a.push(number);
            }
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    // B may have joined after the first draw; snapshot plus live events
    // must add up to exactly what A saw.
    let mut seen_by_b: Vec<u8> = snapshot_b.history.iter().map(|d| d.number).collect();
    while seen_by_b.len() < seen_by_a.len() {
        if let ServerMessage::DrawAnnounced { number, .. } = b.recv().await.unwrap() {
            seen_by_b.push(number);
        }
    }
    assert_eq!(seen_by_b, seen_by_a);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_is_rejected() {
    let room = spawn_room(config());
    let (_card, _rx) = join(&room, 1).await;
    let (tx, _rx2) = mpsc::unbounded_channel();
    assert!(matches!(
        room.join(PlayerId(1), tx).await,
        Err(RoomError::AlreadyInRoom(PlayerId(1)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_room_full() {
    let room = spawn_room(RoomConfig {
        max_players: 1,
        ..config()
    });
    let (_card, _rx) = join(&room, 1).await;
    let (tx, _rx2) = mpsc::unbounded_channel();
    assert!(matches!(
        room.join(PlayerId(2), tx).await,
        Err(RoomError::RoomFull(1))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_leave_keeps_scheduler_running() {
    let room = spawn_room(config());
    let (_card, _rx) = join(&room, 1).await;
    room.leave(PlayerId(1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let info = room.info().await.unwrap();
    assert_eq!(info.player_count, 0);
    assert_eq!(info.state, GameState::Drawing);
    assert!(info.scheduler_running);
    assert_eq!(info.draws, 3);

    assert!(matches!(
        room.leave(PlayerId(1)).await,
        Err(RoomError::NotInRoom(PlayerId(1)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_gets_history() {
    let room = spawn_room(config());
    let (_card, mut a) = join(&room, 1).await;

    let mut announced = Vec::new();
    for _ in 0..4 {
        if let ServerMessage::DrawAnnounced { number, .. } = a.recv().await.unwrap() {
            announced.push(number);
        }
    }

    let (tx, _rx) = mpsc::unbounded_channel();
    let (_card, snapshot) = room.join(PlayerId(2), tx).await.unwrap();
    let history: Vec<u8> = snapshot.history.iter().map(|d| d.number).collect();
    assert_eq!(history, announced);
    assert_eq!(snapshot.last_draw.map(|d| d.number), announced.last().copied());

    let msgs = snapshot.messages();
    assert!(matches!(msgs[0], ServerMessage::LastNumber { .. }));
    assert!(matches!(msgs[1], ServerMessage::DrawHistory { .. }));
    assert_eq!(msgs.len(), 2);
}

// =========================================================================
// Claims
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_valid_claim_wins_and_stops_drawing() {
    let room = spawn_room(config());
    let (card_a, mut a) = join(&room, 1).await;
    let (_card_b, mut b) = join(&room, 2).await;

    wait_for_draws(&mut a, &row_numbers(&card_a, 0)).await;
    let outcome = room
        .submit_win_claim(PlayerId(1), card_a.clone().into())
        .await
        .unwrap();
    assert_eq!(outcome, ClaimOutcome::Winner);

    let info = room.info().await.unwrap();
    assert_eq!(info.state, GameState::Won);
    assert_eq!(info.winner, Some(PlayerId(1)));
    assert!(!info.scheduler_running);
    let draws_at_win = info.draws;

    // The winner hears it as the winner, everyone else as a loss.
    let winner_msg = drain(&mut a).pop().unwrap();
    assert!(matches!(
        winner_msg,
        ServerMessage::BingoWinner {
            winner: PlayerId(1),
            is_winner: true,
            ..
        }
    ));
    let loser_msg = drain(&mut b).pop().unwrap();
    assert!(matches!(
        loser_msg,
        ServerMessage::BingoWinner {
            winner: PlayerId(1),
            is_winner: false,
            ..
        }
    ));

    // No draws after the win.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(room.info().await.unwrap().draws, draws_at_win);
    assert!(drain(&mut a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_claim_after_win_is_game_over() {
    let room = spawn_room(config());
    let (card_a, mut a) = join(&room, 1).await;
    let (card_b, mut b) = join(&room, 2).await;

    wait_for_draws(&mut a, &row_numbers(&card_a, 0)).await;
    assert!(
        room.submit_win_claim(PlayerId(1), card_a.clone().into())
            .await
            .unwrap()
            .is_win()
    );
    drain(&mut b);

    let second = room
        .submit_win_claim(PlayerId(2), card_b.into())
        .await
        .unwrap();
    assert_eq!(second, ClaimOutcome::Rejected(ClaimRejection::GameOver));
    assert_eq!(
        drain(&mut b),
        vec![ServerMessage::ClaimRejected {
            reason: ClaimRejection::GameOver
        }]
    );

    // The winner repeating the claim doesn't win twice either.
    let again = room
        .submit_win_claim(PlayerId(1), card_a.into())
        .await
        .unwrap();
    assert_eq!(again, ClaimOutcome::Rejected(ClaimRejection::GameOver));
    assert_eq!(room.info().await.unwrap().winner, Some(PlayerId(1)));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_claims_have_one_winner() {
    let room = spawn_room(RoomConfig {
        verify_issued_card: false,
        ..config()
    });
    let (card, mut events) = join(&room, 1).await;
    for id in 2..=10 {
        let (_card, _rx) = join(&room, id).await;
    }
    wait_for_draws(&mut events, &row_numbers(&card, 0)).await;

    // Everyone submits the same completed card at once.
    let mut tasks = Vec::new();
    for id in 1..=10 {
        let room = room.clone();
        let layout: CardLayout = card.clone().into();
        tasks.push(tokio::spawn(async move {
            room.submit_win_claim(PlayerId(id), layout).await.unwrap()
        }));
    }
    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            ClaimOutcome::Winner => winners += 1,
            ClaimOutcome::Rejected(reason) => assert_eq!(reason, ClaimRejection::GameOver),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(start_paused = true)]
async fn test_drawn_numbers_mark_cells_in_any_column() {
    let room = spawn_room(RoomConfig {
        verify_issued_card: false,
        ..config()
    });
    let (_card, mut events) = join(&room, 1).await;

    let mut first_five = Vec::new();
    while first_five.len() < 5 {
        if let ServerMessage::DrawAnnounced { number, .. } = events.recv().await.unwrap() {
            first_five.push(number);
        }
    }

    // Row 0 holds the drawn numbers in draw order, whatever their letters.
    let mut columns = [[Cell::Number(0); CARD_SIZE]; 5];
    for (col, number) in first_five.iter().enumerate() {
        columns[col][0] = Cell::Number(*number);
    }
    columns[Letter::N.index()][2] = Cell::Free;
    let card = BingoCard::from_columns(columns).unwrap();

    let outcome = room.submit_win_claim(PlayerId(1), card.into()).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Winner);
    assert_eq!(room.info().await.unwrap().state, GameState::Won);
}

fn without_draws(msgs: Vec<ServerMessage>) -> Vec<ServerMessage> {
    msgs.into_iter()
        .filter(|m| !matches!(m, ServerMessage::DrawAnnounced { .. }))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_card_is_not_a_win() {
    let room = spawn_room(config());
    let (card_a, mut a) = join(&room, 1).await;
    let (_card_b, mut b) = join(&room, 2).await;

    // At most one number is out; no line can be complete yet.
    let outcome = room
        .submit_win_claim(PlayerId(1), card_a.into())
        .await
        .unwrap();
    assert_eq!(outcome, ClaimOutcome::Rejected(ClaimRejection::NotAWin));
    assert_eq!(
        without_draws(drain(&mut a)),
        vec![ServerMessage::ClaimRejected {
            reason: ClaimRejection::NotAWin
        }]
    );
    assert!(without_draws(drain(&mut b)).is_empty(), "only the claimant is told");

    let info = room.info().await.unwrap();
    assert_eq!(info.state, GameState::Drawing);
    assert!(info.scheduler_running);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_card_is_rejected() {
    let room = spawn_room(config());
    let (card, _rx) = join(&room, 1).await;

    let mut layout: CardLayout = card.into();
    layout.0.get_mut(&Letter::G).unwrap().pop();
    assert_eq!(layout.0[&Letter::G].len(), CARD_SIZE - 1);

    let outcome = room.submit_win_claim(PlayerId(1), layout).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Rejected(ClaimRejection::MalformedCard));
}

#[tokio::test(start_paused = true)]
async fn test_free_square_off_centre_is_malformed() {
    let room = spawn_room(config());
    let (card, _rx) = join(&room, 1).await;

    let mut layout: CardLayout = card.into();
    layout.0.get_mut(&Letter::B).unwrap()[0] = Cell::Free;

    let outcome = room.submit_win_claim(PlayerId(1), layout).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Rejected(ClaimRejection::MalformedCard));
}

#[tokio::test(start_paused = true)]
async fn test_someone_elses_card_is_a_mismatch() {
    let room = spawn_room(config());
    let (_card_a, _a) = join(&room, 1).await;
    let (card_b, _b) = join(&room, 2).await;

    let outcome = room
        .submit_win_claim(PlayerId(1), card_b.into())
        .await
        .unwrap();
    assert_eq!(outcome, ClaimOutcome::Rejected(ClaimRejection::CardMismatch));
}

#[tokio::test(start_paused = true)]
async fn test_claim_from_stranger_is_an_error() {
    let room = spawn_room(config());
    let (card, _rx) = join(&room, 1).await;
    assert!(matches!(
        room.submit_win_claim(PlayerId(99), card.into()).await,
        Err(RoomError::NotInRoom(PlayerId(99)))
    ));
}

// =========================================================================
// Exhaustion and reset
// =========================================================================

async fn run_to_exhaustion(events: &mut Events) -> usize {
    loop {
        match events.recv().await.expect("room closed") {
            ServerMessage::DrawAnnounced { .. } => {}
            ServerMessage::DrawsExhausted { draws } => return draws,
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_pool_exhaustion_ends_game_without_winner() {
    let room = spawn_room(config());
    let (card, mut events) = join(&room, 1).await;

    assert_eq!(run_to_exhaustion(&mut events).await, 75);

    let info = room.info().await.unwrap();
    assert_eq!(info.state, GameState::Exhausted);
    assert_eq!(info.draws, 75);
    assert_eq!(info.winner, None);
    assert!(!info.scheduler_running);
    for n in 1..=75 {
        assert!(room.is_drawn(n).await.unwrap());
    }
    for n in [0, 76, 300, -1] {
        assert!(!room.is_drawn(n).await.unwrap());
    }

    // Even a full card can't win once the game is over.
    let outcome = room.submit_win_claim(PlayerId(1), card.into()).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Rejected(ClaimRejection::GameOver));

    // Late joiners get a card and a final snapshot, but no new scheduler.
    let (tx, _rx) = mpsc::unbounded_channel();
    let (_card, snapshot) = room.join(PlayerId(2), tx).await.unwrap();
    assert_eq!(snapshot.state, GameState::Exhausted);
    assert_eq!(snapshot.history.len(), 75);
    assert!(matches!(
        snapshot.messages().last(),
        Some(ServerMessage::DrawsExhausted { draws: 75 })
    ));
    assert_eq!(room.info().await.unwrap().schedulers_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_game_requires_finished_game() {
    let room = spawn_room(config());
    let (_card, _rx) = join(&room, 1).await;
    assert!(matches!(
        room.new_game().await,
        Err(RoomError::InvalidState(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_new_game_restarts_drawing_with_same_cards() {
    let room = spawn_room(config());
    let (card, mut events) = join(&room, 1).await;
    run_to_exhaustion(&mut events).await;

    room.new_game().await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ServerMessage::NewGame);

    let info = room.info().await.unwrap();
    assert_eq!(info.state, GameState::Drawing);
    assert_eq!(info.schedulers_started, 2);

    // Drawing starts over from sequence 1, against the same card.
    let first = match events.recv().await.unwrap() {
        ServerMessage::DrawAnnounced {
            number, sequence, ..
        } => {
            assert_eq!(sequence, 1);
            number
        }
        other => panic!("expected a draw, got {other:?}"),
    };
    let rest: Vec<u8> = row_numbers(&card, 0)
        .into_iter()
        .filter(|n| *n != first)
        .collect();
    wait_for_draws(&mut events, &rest).await;
    let outcome = room.submit_win_claim(PlayerId(1), card.into()).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Winner);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_makes_room_unavailable() {
    let room = spawn_room(config());
    let (_card, _rx) = join(&room, 1).await;
    room.shutdown().await.unwrap();
    tokio::task::yield_now().await;

    assert!(matches!(room.info().await, Err(RoomError::Unavailable)));
}

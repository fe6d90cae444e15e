//! The history log and its JSON export.

use std::fs;

use chess_rules::record::save_record_to_file;
use chess_rules::session::{GameSession, SessionError, Status};
use chess_rules::Color;

fn play(session: &mut GameSession, moves: &[((u8, u8), (u8, u8))]) {
    for (from, to) in moves {
        session.select(from.0, from.1).unwrap();
        session.select(to.0, to.1).unwrap();
    }
}

#[test]
fn log_entries_describe_each_ply() {
    let mut session = GameSession::new();
    session.start();
    play(
        &mut session,
        &[
            ((4, 1), (4, 3)), // e4
            ((3, 6), (3, 4)), // d5
            ((4, 3), (3, 4)), // exd5
        ],
    );

    let log = session.log().unwrap();
    assert_eq!(log.len(), 3);

    assert_eq!(log[0].ply, 1);
    assert_eq!(log[0].piece_code, 'P');
    assert_eq!(log[0].player, Color::White);
    assert_eq!(log[0].target, "e4");
    assert!(!log[0].capture);
    assert_eq!(log[0].annotation, "");

    assert_eq!(log[1].player, Color::Black);
    assert_eq!(log[1].target, "d5");

    assert_eq!(log[2].ply, 3);
    assert_eq!(log[2].target, "d5");
    assert!(log[2].capture);
}

#[test]
fn record_splits_moves_by_side() {
    let mut session = GameSession::new();
    session.start();
    play(
        &mut session,
        &[
            ((4, 1), (4, 3)), // e4
            ((2, 6), (2, 4)), // c5
            ((6, 0), (5, 2)), // Nf3
        ],
    );

    let record = session.record().unwrap();
    assert_eq!(record.result, Status::InProgress);
    assert_eq!(record.ply_count, 3);
    assert_eq!(record.white_moves.len(), 2);
    assert_eq!(record.black_moves.len(), 1);
    assert_eq!(record.white_moves[1].piece_code, 'N');
    assert_eq!(record.black_moves[0].target, "c5");
}

#[test]
fn record_requires_a_started_session() {
    let session = GameSession::new();
    assert!(matches!(session.record(), Err(SessionError::NotStarted)));
}

#[test]
fn record_round_trips_through_a_file() {
    let mut session = GameSession::new();
    session.start();
    play(&mut session, &[((4, 1), (4, 3))]);

    let path = std::env::temp_dir().join("chess_rules_record_test.json");
    let path_str = path.to_str().unwrap();
    save_record_to_file(&session.record().unwrap(), path_str).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"target\": \"e4\""));
    assert!(written.contains("\"ply_count\": 1"));
    fs::remove_file(&path).ok();
}

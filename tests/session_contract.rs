//! The adapter contract a rendering shell depends on: the per-square
//! queries, the `select` state machine, and `rewind`.

use chess_rules::board::EMPTY_CODE;
use chess_rules::session::{GameSession, SelectOutcome, SessionError};

/// Everything a shell can see: (piece code, owner) for every square.
fn board_snapshot(session: &GameSession) -> Vec<(u8, u8)> {
    let mut snapshot = Vec::new();
    for y in 0..session.height() {
        for x in 0..session.width() {
            snapshot.push((session.piece_at(x, y).unwrap(), session.player_at(x, y).unwrap()));
        }
    }
    snapshot
}

fn no_square_is_valid(session: &GameSession) -> bool {
    (0..session.height())
        .all(|y| (0..session.width()).all(|x| !session.valid_at(x, y).unwrap()))
}

fn destination_set(session: &GameSession) -> Vec<(u8, u8)> {
    let mut set = Vec::new();
    for y in 0..session.height() {
        for x in 0..session.width() {
            if session.valid_at(x, y).unwrap() {
                set.push((x, y));
            }
        }
    }
    set
}

#[test]
fn queries_before_start_are_rejected() {
    let mut session = GameSession::new();
    assert!(matches!(session.piece_at(0, 0), Err(SessionError::NotStarted)));
    assert!(matches!(session.player_at(0, 0), Err(SessionError::NotStarted)));
    assert!(matches!(session.valid_at(0, 0), Err(SessionError::NotStarted)));
    assert!(matches!(session.select(0, 0), Err(SessionError::NotStarted)));
    assert!(matches!(session.rewind(1), Err(SessionError::NotStarted)));
}

#[test]
fn out_of_bounds_coordinates_are_rejected() {
    let mut session = GameSession::new();
    session.start();
    assert!(matches!(session.piece_at(8, 0), Err(SessionError::OutOfBounds { x: 8, y: 0 })));
    assert!(matches!(session.player_at(0, 8), Err(SessionError::OutOfBounds { .. })));
    assert!(matches!(session.valid_at(12, 3), Err(SessionError::OutOfBounds { .. })));
    assert!(matches!(session.select(8, 8), Err(SessionError::OutOfBounds { .. })));
}

#[test]
fn dimensions_are_eight_by_eight() {
    let session = GameSession::new();
    assert_eq!(session.width(), 8);
    assert_eq!(session.height(), 8);
}

#[test]
fn fresh_game_has_no_valid_destinations() {
    let mut session = GameSession::new();
    session.start();
    assert!(no_square_is_valid(&session));
    assert_eq!(session.selected_square().unwrap(), None);
}

#[test]
fn fresh_game_exposes_the_standard_position() {
    let mut session = GameSession::new();
    session.start();
    // Back ranks by wire code, owners by wire id.
    let white_rank: Vec<u8> = (0..8).map(|x| session.piece_at(x, 0).unwrap()).collect();
    assert_eq!(white_rank, b"RNBQKBNR");
    let black_rank: Vec<u8> = (0..8).map(|x| session.piece_at(x, 7).unwrap()).collect();
    assert_eq!(black_rank, b"RNBQKBNR");
    for x in 0..8 {
        assert_eq!(session.piece_at(x, 1).unwrap(), b'P');
        assert_eq!(session.player_at(x, 1).unwrap(), 1);
        assert_eq!(session.piece_at(x, 6).unwrap(), b'P');
        assert_eq!(session.player_at(x, 6).unwrap(), 2);
        for y in 2..6 {
            assert_eq!(session.piece_at(x, y).unwrap(), EMPTY_CODE);
            assert_eq!(session.player_at(x, y).unwrap(), 0);
        }
    }
}

#[test]
fn selecting_an_unmovable_square_changes_nothing() {
    let mut session = GameSession::new();
    session.start();
    let before = board_snapshot(&session);

    // Empty square: nothing happens.
    assert_eq!(session.select(4, 4).unwrap(), SelectOutcome::Ignored);
    assert_eq!(board_snapshot(&session), before);
    assert!(no_square_is_valid(&session));

    // Opponent piece while White is to move: nothing happens either.
    assert_eq!(session.select(4, 6).unwrap(), SelectOutcome::Ignored);
    assert_eq!(board_snapshot(&session), before);
    assert!(no_square_is_valid(&session));
}

#[test]
fn selecting_a_pawn_marks_its_two_pushes() {
    let mut session = GameSession::new();
    session.start();
    assert_eq!(session.select(4, 1).unwrap(), SelectOutcome::Selected);
    assert_eq!(session.selected_square().unwrap(), Some((4, 1)));
    assert_eq!(destination_set(&session), vec![(4, 2), (4, 3)]);
}

#[test]
fn selecting_a_destination_moves_the_piece_and_clears_the_selection() {
    let mut session = GameSession::new();
    session.start();
    session.select(4, 1).unwrap();
    assert!(session.valid_at(4, 3).unwrap());
    assert_eq!(session.select(4, 3).unwrap(), SelectOutcome::Moved);

    assert_eq!(session.piece_at(4, 1).unwrap(), EMPTY_CODE);
    assert_eq!(session.piece_at(4, 3).unwrap(), b'P');
    assert_eq!(session.player_at(4, 3).unwrap(), 1);
    assert!(no_square_is_valid(&session));
    assert_eq!(session.selected_square().unwrap(), None);
    assert_eq!(session.ply_count().unwrap(), 1);

    // The move switched the side to move: White pieces no longer select.
    assert_eq!(session.select(3, 1).unwrap(), SelectOutcome::Ignored);
}

#[test]
fn clicking_another_own_piece_replaces_the_selection() {
    let mut session = GameSession::new();
    session.start();
    session.select(4, 1).unwrap();
    assert_eq!(session.select(3, 1).unwrap(), SelectOutcome::Selected);
    assert_eq!(session.selected_square().unwrap(), Some((3, 1)));
    assert_eq!(destination_set(&session), vec![(3, 2), (3, 3)]);
}

#[test]
fn clicking_a_dead_square_clears_the_selection() {
    let mut session = GameSession::new();
    session.start();
    session.select(4, 1).unwrap();
    assert_eq!(session.select(0, 4).unwrap(), SelectOutcome::Cleared);
    assert!(no_square_is_valid(&session));
    assert_eq!(session.selected_square().unwrap(), None);
    // A second click on the same dead square is a plain no-op.
    assert_eq!(session.select(0, 4).unwrap(), SelectOutcome::Ignored);
}

#[test]
fn select_is_deterministic_under_identical_clicks() {
    let mut session = GameSession::new();
    session.start();
    session.select(4, 1).unwrap();
    let first = destination_set(&session);
    assert_eq!(session.select(4, 1).unwrap(), SelectOutcome::Selected);
    assert_eq!(destination_set(&session), first);
}

#[test]
fn rewind_restores_the_exact_prior_board() {
    let mut session = GameSession::new();
    session.start();
    let before = board_snapshot(&session);

    session.select(4, 1).unwrap();
    session.select(4, 3).unwrap();
    assert_ne!(board_snapshot(&session), before);

    assert_eq!(session.rewind(1).unwrap(), 1);
    assert_eq!(board_snapshot(&session), before);
    assert_eq!(session.ply_count().unwrap(), 0);
    assert!(session.log().unwrap().is_empty());
    assert!(no_square_is_valid(&session));
}

#[test]
fn rewind_past_history_stops_at_the_initial_position() {
    let mut session = GameSession::new();
    session.start();
    let initial = board_snapshot(&session);

    session.select(4, 1).unwrap();
    session.select(4, 3).unwrap();
    session.select(4, 6).unwrap();
    session.select(4, 4).unwrap();
    assert_eq!(session.ply_count().unwrap(), 2);

    assert_eq!(session.rewind(99).unwrap(), 2);
    assert_eq!(board_snapshot(&session), initial);
    assert_eq!(session.ply_count().unwrap(), 0);

    // Still a live game at the starting position.
    assert_eq!(session.select(4, 1).unwrap(), SelectOutcome::Selected);
}

#[test]
fn rewind_clears_an_in_progress_selection() {
    let mut session = GameSession::new();
    session.start();
    session.select(4, 1).unwrap();
    session.select(4, 3).unwrap();
    session.select(4, 6).unwrap(); // Black selects a pawn...
    assert!(session.valid_at(4, 4).unwrap());
    session.rewind(1).unwrap(); // ...and the undo throws the selection away.
    assert!(no_square_is_valid(&session));
    assert_eq!(session.selected_square().unwrap(), None);
}

#[test]
fn rewind_round_trips_the_destination_set() {
    let mut session = GameSession::new();
    session.start();
    session.select(6, 0).unwrap(); // Ng1
    let before = destination_set(&session);
    assert_eq!(before, vec![(5, 2), (7, 2)]);

    session.select(5, 2).unwrap();
    session.rewind(1).unwrap();
    session.select(6, 0).unwrap();
    assert_eq!(destination_set(&session), before);
}

#[test]
fn start_discards_the_previous_game() {
    let mut session = GameSession::new();
    session.start();
    let initial = board_snapshot(&session);

    session.select(4, 1).unwrap();
    session.select(4, 3).unwrap();
    session.start();

    assert_eq!(board_snapshot(&session), initial);
    assert_eq!(session.ply_count().unwrap(), 0);
    assert!(session.log().unwrap().is_empty());
    assert!(no_square_is_valid(&session));
    assert_eq!(session.rewind(1).unwrap(), 0);
}

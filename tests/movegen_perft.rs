//! Perft node counts pin down the move generator: any slip in castling,
//! en passant, promotions or check handling shows up as a wrong total.

use chess_rules::fen::parse_fen;
use chess_rules::movegen::{apply_move, legal_moves};
use chess_rules::BoardState;

fn perft(state: &BoardState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut nodes = 0;
    for mv in legal_moves(state) {
        let (next, _) = apply_move(state, &mv).expect("generated move must apply");
        nodes += perft(&next, depth - 1);
    }
    nodes
}

#[test]
fn perft_from_the_starting_position() {
    let state = BoardState::initial();
    assert_eq!(perft(&state, 1), 20);
    assert_eq!(perft(&state, 2), 400);
    assert_eq!(perft(&state, 3), 8_902);
    assert_eq!(perft(&state, 4), 197_281);
}

#[test]
fn perft_kiwipete() {
    // Dense middlegame with both castles, pins, promotions and en passant
    // in the air.
    let state = parse_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
        .unwrap();
    assert_eq!(perft(&state, 1), 48);
    assert_eq!(perft(&state, 2), 2_039);
    assert_eq!(perft(&state, 3), 97_862);
}

#[test]
fn perft_rook_endgame_with_en_passant() {
    // Sparse position where rank checks and the en passant discovered
    // check dominate the counts.
    let state = parse_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap();
    assert_eq!(perft(&state, 1), 14);
    assert_eq!(perft(&state, 2), 191);
    assert_eq!(perft(&state, 3), 2_812);
    assert_eq!(perft(&state, 4), 43_238);
}

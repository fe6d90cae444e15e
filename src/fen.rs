//! FEN position parsing. Only parsing: games are exported through the move
//! record, never as FEN.

use std::error::Error;
use std::fmt;

use crate::board::{algebraic_to_index, BoardState, Color, Piece, PieceType};

#[derive(Debug)]
pub enum FenError {
    MissingField(&'static str),
    BadBoard(String),
    BadTurn(String),
    BadCastling(String),
    BadEnPassant(String),
    BadClock(String),
    BadKings,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::MissingField(field) => write!(f, "FEN is missing the {} field", field),
            FenError::BadBoard(s) => write!(f, "unparseable FEN board field: '{}'", s),
            FenError::BadTurn(s) => write!(f, "unparseable FEN side-to-move field: '{}'", s),
            FenError::BadCastling(s) => write!(f, "unparseable FEN castling field: '{}'", s),
            FenError::BadEnPassant(s) => write!(f, "unparseable FEN en passant field: '{}'", s),
            FenError::BadClock(s) => write!(f, "unparseable FEN clock field: '{}'", s),
            FenError::BadKings => write!(f, "FEN position must have exactly one king per side"),
        }
    }
}

impl Error for FenError {}

/// Parses a full FEN record into a position. The halfmove and fullmove
/// fields may be omitted and default to 0 and 1.
pub fn parse_fen(fen: &str) -> Result<BoardState, FenError> {
    let mut fields = fen.split_whitespace();
    let board_field = fields.next().ok_or(FenError::MissingField("board"))?;
    let turn_field = fields.next().ok_or(FenError::MissingField("side to move"))?;
    let castling_field = fields.next().ok_or(FenError::MissingField("castling"))?;
    let ep_field = fields.next().ok_or(FenError::MissingField("en passant"))?;
    let halfmove_field = fields.next();
    let fullmove_field = fields.next();

    let mut state = BoardState::empty();
    let mut scratch_key = 0u64;

    let ranks: Vec<&str> = board_field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadBoard(board_field.to_string()));
    }
    for (row, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - row as u8; // FEN lists rank 8 first
        let mut file = 0u8;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                file += skip as u8;
                continue;
            }
            let piece = Piece::from_char(c).ok_or_else(|| FenError::BadBoard(board_field.to_string()))?;
            if file >= 8 {
                return Err(FenError::BadBoard(board_field.to_string()));
            }
            state.set_piece_at(rank * 8 + file, piece.kind, piece.color, &mut scratch_key);
            file += 1;
        }
        if file != 8 {
            return Err(FenError::BadBoard(board_field.to_string()));
        }
    }

    state.turn = match turn_field {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(FenError::BadTurn(other.to_string())),
    };

    if castling_field != "-" {
        for c in castling_field.chars() {
            match c {
                'K' => state.castling_rights.white_kingside = true,
                'Q' => state.castling_rights.white_queenside = true,
                'k' => state.castling_rights.black_kingside = true,
                'q' => state.castling_rights.black_queenside = true,
                _ => return Err(FenError::BadCastling(castling_field.to_string())),
            }
        }
    }

    state.en_passant_square = match ep_field {
        "-" => None,
        square => Some(
            algebraic_to_index(square)
                .ok_or_else(|| FenError::BadEnPassant(square.to_string()))?,
        ),
    };

    if let Some(raw) = halfmove_field {
        state.halfmove_clock =
            raw.parse().map_err(|_| FenError::BadClock(raw.to_string()))?;
    }
    if let Some(raw) = fullmove_field {
        state.fullmove_number =
            raw.parse().map_err(|_| FenError::BadClock(raw.to_string()))?;
    }

    state.update_occupancy();
    if state.piece_board(PieceType::King, Color::White).count_ones() != 1
        || state.piece_board(PieceType::King, Color::Black).count_ones() != 1
    {
        return Err(FenError::BadKings);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::square_index;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn start_fen_matches_initial_position() {
        let parsed = parse_fen(START_FEN).unwrap();
        assert_eq!(parsed, BoardState::initial());
    }

    #[test]
    fn parses_en_passant_and_clocks() {
        let state =
            parse_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2").unwrap();
        assert_eq!(state.en_passant_square, Some(square_index(3, 5)));
        assert_eq!(state.fullmove_number, 2);
        assert_eq!(state.piece_at(square_index(4, 3)).map(|p| p.kind), Some(PieceType::Pawn));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(parse_fen("").is_err());
        assert!(parse_fen("8/8/8/8/8/8/8 w - -").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        // no kings
        assert!(parse_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }
}

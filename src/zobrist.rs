//! Zobrist position hashing. Keys come from a fixed-seed RNG so hashes are
//! reproducible across runs, which the repetition tests rely on.

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::board::{CastlingRights, Color, Piece};

lazy_static! {
    pub static ref ZOBRIST: ZobristTable = ZobristTable::new();
}

#[derive(Debug, Clone)]
pub struct ZobristTable {
    // piece_keys[color][piece_type][square]
    piece_keys: [[[u64; 64]; 6]; 2],
    // castling_keys indexed by the four right flags as 0/1
    castling_keys: [[[[u64; 2]; 2]; 2]; 2],
    // Keys exist only for the valid target squares (ranks 3 and 6); the
    // rest stay 0 and contribute nothing.
    en_passant_keys: [u64; 64],
    black_to_move_key: u64,
}

impl ZobristTable {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);
        let mut table = ZobristTable {
            piece_keys: [[[0; 64]; 6]; 2],
            castling_keys: [[[[0; 2]; 2]; 2]; 2],
            en_passant_keys: [0; 64],
            black_to_move_key: rng.next_u64(),
        };

        for color in 0..2 {
            for piece_type in 0..6 {
                for square in 0..64 {
                    table.piece_keys[color][piece_type][square] = rng.next_u64();
                }
            }
        }

        for wk in 0..2 {
            for wq in 0..2 {
                for bk in 0..2 {
                    for bq in 0..2 {
                        table.castling_keys[wk][wq][bk][bq] = rng.next_u64();
                    }
                }
            }
        }

        for file in 0..8usize {
            table.en_passant_keys[16 + file] = rng.next_u64(); // rank 3
            table.en_passant_keys[40 + file] = rng.next_u64(); // rank 6
        }

        table
    }

    #[inline(always)]
    pub fn piece(&self, piece: Piece, sq: u8) -> u64 {
        self.piece_keys[piece.color.index()][piece.kind.index()][sq as usize]
    }

    #[inline(always)]
    pub fn castling(&self, rights: CastlingRights) -> u64 {
        self.castling_keys[rights.white_kingside as usize][rights.white_queenside as usize]
            [rights.black_kingside as usize][rights.black_queenside as usize]
    }

    /// Key for the en passant target square; 0 when there is no target.
    #[inline(always)]
    pub fn en_passant(&self, ep_square: Option<u8>) -> u64 {
        match ep_square {
            Some(sq) if sq < 64 => self.en_passant_keys[sq as usize],
            _ => 0,
        }
    }

    /// Side-to-move component; 0 for White.
    #[inline(always)]
    pub fn side_to_move(&self, color: Color) -> u64 {
        if color == Color::Black {
            self.black_to_move_key
        } else {
            0
        }
    }
}

//! A chess rules engine behind the small query/command surface a rendering
//! shell needs: start a game, read the board square by square, click
//! squares to select and move, rewind plies. The shell side stays free of
//! chess knowledge; everything from legal-move computation to game-end
//! arbitration lives here.

pub mod board;
pub mod fen;
pub mod movegen;
pub mod record;
pub mod session;
pub mod zobrist;

pub use board::{BoardState, Color, Piece, PieceType};
pub use record::{save_record_to_file, GameRecord, MoveLogEntry};
pub use session::{DrawReason, GameSession, SelectOutcome, SessionError, Status};

//! The rules-engine session: the whole surface a rendering shell needs.
//!
//! A `GameSession` owns every piece of chess state. The shell drives it with
//! `select` and `rewind` and reconstructs its picture of the board each draw
//! cycle from the per-square queries; it never mutates chess state itself.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::board::{
    index_to_algebraic, square_index, BoardState, Color, PieceType, BOARD_HEIGHT, BOARD_WIDTH,
    EMPTY_CODE, NO_PLAYER,
};
use crate::fen::{parse_fen, FenError};
use crate::movegen::{apply_move_hashed, is_in_check, legal_moves, Move, MoveError};
use crate::record::{GameRecord, MoveLogEntry};

// --- Errors ---

#[derive(Debug)]
pub enum SessionError {
    /// A query or command arrived before the first `start`.
    NotStarted,
    /// A coordinate outside [0, width) x [0, height).
    OutOfBounds { x: u8, y: u8 },
    /// The engine contradicted itself; the session state is unchanged.
    Internal(MoveError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotStarted => write!(f, "no game in progress; call start first"),
            SessionError::OutOfBounds { x, y } => {
                write!(f, "square ({}, {}) is outside the board", x, y)
            }
            SessionError::Internal(e) => write!(f, "internal engine error: {}", e),
        }
    }
}

impl Error for SessionError {}

impl From<MoveError> for SessionError {
    fn from(e: MoveError) -> Self {
        SessionError::Internal(e)
    }
}

// --- Outcomes and Status ---

/// What a `select` click did. The wire contract discards this; callers that
/// can see it (shell, tests) get to react without re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// A piece of the side to move became (or replaced) the selection.
    Selected,
    /// The selected piece moved to the clicked destination.
    Moved,
    /// An active selection was dropped without moving.
    Cleared,
    /// The click changed nothing.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawReason {
    Stalemate,
    SeventyFiveMoveRule,
    FivefoldRepetition,
    InsufficientMaterial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    InProgress,
    Checkmate { winner: Color },
    Draw(DrawReason),
}

// --- Session State ---

struct Selection {
    square: u8,
    /// Destination squares of the selected piece, as a bitboard.
    destinations: u64,
    moves: Vec<Move>,
}

struct Snapshot {
    state: BoardState,
    zobrist_key: u64,
}

struct GameState {
    state: BoardState,
    zobrist_key: u64,
    /// Occurrence count per position key, for fivefold detection.
    zobrist_history: HashMap<u64, u8>,
    undo_stack: Vec<Snapshot>,
    log: Vec<MoveLogEntry>,
    selection: Option<Selection>,
    status: Status,
}

/// A single game session. Holds no state before the first `start`.
#[derive(Default)]
pub struct GameSession {
    game: Option<GameState>,
}

impl GameSession {
    pub fn new() -> Self {
        GameSession { game: None }
    }

    // --- Lifecycle ---

    /// Begins a new game from the standard starting position, discarding any
    /// prior game, history and selection.
    pub fn start(&mut self) {
        self.begin(BoardState::initial());
    }

    /// Begins a new game from a FEN position.
    pub fn start_from_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let state = parse_fen(fen)?;
        self.begin(state);
        Ok(())
    }

    fn begin(&mut self, state: BoardState) {
        let zobrist_key = state.compute_zobrist_key();
        let mut zobrist_history = HashMap::new();
        zobrist_history.insert(zobrist_key, 1);
        let status = evaluate_status(&state, 1);
        self.game = Some(GameState {
            state,
            zobrist_key,
            zobrist_history,
            undo_stack: Vec::new(),
            log: Vec::new(),
            selection: None,
            status,
        });
    }

    // --- Dimension Queries ---

    /// Board columns; fixed for the lifetime of a game.
    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    /// Board rows.
    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    // --- Per-Square Queries ---

    /// The wire code of the occupant of (x, y): an uppercase piece letter,
    /// or `EMPTY_CODE` for an empty square.
    pub fn piece_at(&self, x: u8, y: u8) -> Result<u8, SessionError> {
        let sq = check_bounds(x, y)?;
        let game = self.game()?;
        Ok(game.state.piece_at(sq).map_or(EMPTY_CODE, |p| p.kind.code()))
    }

    /// The owner of the occupant of (x, y): 1 White, 2 Black, `NO_PLAYER`
    /// when the square is empty.
    pub fn player_at(&self, x: u8, y: u8) -> Result<u8, SessionError> {
        let sq = check_bounds(x, y)?;
        let game = self.game()?;
        Ok(game.state.piece_at(sq).map_or(NO_PLAYER, |p| p.color.player_id()))
    }

    /// Whether (x, y) is a legal destination of the current selection.
    /// Always false when nothing is selected.
    pub fn valid_at(&self, x: u8, y: u8) -> Result<bool, SessionError> {
        let sq = check_bounds(x, y)?;
        let game = self.game()?;
        Ok(game
            .selection
            .as_ref()
            .map_or(false, |sel| sel.destinations & (1u64 << sq) != 0))
    }

    /// Coordinates of the currently selected piece, if any.
    pub fn selected_square(&self) -> Result<Option<(u8, u8)>, SessionError> {
        let game = self.game()?;
        Ok(game
            .selection
            .as_ref()
            .map(|sel| (crate::board::file_of(sel.square), crate::board::rank_of(sel.square))))
    }

    // --- Commands ---

    /// Handles a square click. Establishes, replaces or clears the
    /// selection, or — when the click lands on a legal destination —
    /// executes the move, switches the side to move and appends a history
    /// entry.
    pub fn select(&mut self, x: u8, y: u8) -> Result<SelectOutcome, SessionError> {
        let sq = check_bounds(x, y)?;
        let game = self.game.as_mut().ok_or(SessionError::NotStarted)?;

        if game.status != Status::InProgress {
            return Ok(SelectOutcome::Ignored);
        }

        let chosen = match &game.selection {
            Some(sel) if sel.destinations & (1u64 << sq) != 0 => {
                // Promotions surface as several moves to one square; the
                // contract has no promotion channel, so queen it is.
                let mv = sel
                    .moves
                    .iter()
                    .filter(|m| m.to_sq == sq)
                    .find(|m| m.promotion.map_or(true, |p| p == PieceType::Queen))
                    .copied()
                    .ok_or(MoveError::Inconsistent("destination bit without a move"))?;
                Some(mv)
            }
            _ => None,
        };
        if let Some(mv) = chosen {
            return game.execute(mv).map(|()| SelectOutcome::Moved);
        }

        let had_selection = game.selection.take().is_some();

        let own_piece = game
            .state
            .piece_at(sq)
            .map_or(false, |p| p.color == game.state.turn);
        if own_piece {
            let moves: Vec<Move> = legal_moves(&game.state)
                .into_iter()
                .filter(|m| m.from_sq == sq)
                .collect();
            let destinations = moves.iter().fold(0u64, |acc, m| acc | 1u64 << m.to_sq);
            game.selection = Some(Selection { square: sq, destinations, moves });
            return Ok(SelectOutcome::Selected);
        }

        if had_selection {
            Ok(SelectOutcome::Cleared)
        } else {
            Ok(SelectOutcome::Ignored)
        }
    }

    /// Undoes up to `n` completed plies, restoring the exact prior
    /// snapshots and truncating the history log. Rewinding past the first
    /// move stops at the initial position; that is not an error. Returns
    /// the number of plies actually undone.
    pub fn rewind(&mut self, n: usize) -> Result<usize, SessionError> {
        let game = self.game.as_mut().ok_or(SessionError::NotStarted)?;
        game.selection = None;

        let mut undone = 0;
        while undone < n {
            let snapshot = match game.undo_stack.pop() {
                Some(snapshot) => snapshot,
                None => break,
            };
            if let Some(count) = game.zobrist_history.get_mut(&game.zobrist_key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    game.zobrist_history.remove(&game.zobrist_key);
                }
            }
            game.state = snapshot.state;
            game.zobrist_key = snapshot.zobrist_key;
            game.log.pop();
            undone += 1;
        }

        if undone > 0 {
            let repetitions = game.repetitions();
            game.status = evaluate_status(&game.state, repetitions);
        }
        Ok(undone)
    }

    // --- Whole-Game Queries ---

    pub fn side_to_move(&self) -> Result<Color, SessionError> {
        Ok(self.game()?.state.turn)
    }

    pub fn status(&self) -> Result<Status, SessionError> {
        Ok(self.game()?.status)
    }

    /// Number of completed plies.
    pub fn ply_count(&self) -> Result<usize, SessionError> {
        Ok(self.game()?.undo_stack.len())
    }

    /// The append-only history log, oldest entry first.
    pub fn log(&self) -> Result<&[MoveLogEntry], SessionError> {
        Ok(&self.game()?.log)
    }

    /// Serializable summary of the session so far.
    pub fn record(&self) -> Result<GameRecord, SessionError> {
        let game = self.game()?;
        Ok(GameRecord::new(game.status, &game.log))
    }

    fn game(&self) -> Result<&GameState, SessionError> {
        self.game.as_ref().ok_or(SessionError::NotStarted)
    }
}

impl GameState {
    /// Commits a legal move: snapshot for rewind, apply, repetition count,
    /// status refresh, history entry.
    fn execute(&mut self, mv: Move) -> Result<(), SessionError> {
        let moving_color = self.state.turn;
        let piece_code = match self.state.piece_at(mv.from_sq) {
            Some(p) => mv.promotion.unwrap_or(p.kind).code(),
            None => return Err(MoveError::MissingPiece(mv.from_sq).into()),
        };

        // Apply to a scratch copy first so a refused move leaves the
        // session untouched.
        let mut next = self.state.clone();
        let mut next_key = self.zobrist_key;
        let captured = apply_move_hashed(&mut next, &mv, &mut next_key)?;

        let prior = std::mem::replace(&mut self.state, next);
        self.undo_stack.push(Snapshot { state: prior, zobrist_key: self.zobrist_key });
        self.zobrist_key = next_key;
        self.selection = None;

        let count = self.zobrist_history.entry(self.zobrist_key).or_insert(0);
        *count += 1;
        let repetitions = *count;

        self.status = evaluate_status(&self.state, repetitions);
        let annotation = match self.status {
            Status::Checkmate { .. } => "#",
            _ if is_in_check(&self.state, self.state.turn) => "+",
            _ => "",
        };

        self.log.push(MoveLogEntry {
            ply: self.undo_stack.len() as u32,
            piece_code: piece_code as char,
            player: moving_color,
            target: index_to_algebraic(mv.to_sq),
            capture: captured.is_some(),
            annotation: annotation.to_string(),
        });
        Ok(())
    }

    fn repetitions(&self) -> u8 {
        *self.zobrist_history.get(&self.zobrist_key).unwrap_or(&0)
    }
}

// --- Status Evaluation ---

/// Game-end arbitration for the side to move: checkmate and stalemate
/// first, then the automatic draws.
fn evaluate_status(state: &BoardState, repetitions: u8) -> Status {
    if legal_moves(state).is_empty() {
        return if is_in_check(state, state.turn) {
            Status::Checkmate { winner: state.turn.opponent() }
        } else {
            Status::Draw(DrawReason::Stalemate)
        };
    }
    if state.halfmove_clock >= 150 {
        return Status::Draw(DrawReason::SeventyFiveMoveRule);
    }
    if repetitions >= 5 {
        return Status::Draw(DrawReason::FivefoldRepetition);
    }
    if insufficient_material(state) {
        return Status::Draw(DrawReason::InsufficientMaterial);
    }
    Status::InProgress
}

/// Draw by insufficient material (FIDE Art. 5.2.2): no sequence of legal
/// moves can deliver checkmate.
fn insufficient_material(state: &BoardState) -> bool {
    for color in [Color::White, Color::Black] {
        if state.piece_board(PieceType::Pawn, color) != 0
            || state.piece_board(PieceType::Rook, color) != 0
            || state.piece_board(PieceType::Queen, color) != 0
        {
            return false;
        }
    }

    let white_knights = state.piece_board(PieceType::Knight, Color::White).count_ones();
    let black_knights = state.piece_board(PieceType::Knight, Color::Black).count_ones();
    let white_bishops = state.piece_board(PieceType::Bishop, Color::White);
    let black_bishops = state.piece_board(PieceType::Bishop, Color::Black);
    let white_minors = white_knights + white_bishops.count_ones();
    let black_minors = black_knights + black_bishops.count_ones();

    // King vs king, or king vs king + one minor.
    if white_minors + black_minors <= 1 {
        return true;
    }

    // Bishops only, all confined to one square color.
    if white_knights == 0 && black_knights == 0 {
        const DARK_SQUARES: u64 = 0xAA55AA55AA55AA55;
        let all_bishops = white_bishops | black_bishops;
        if all_bishops & DARK_SQUARES == 0 || all_bishops & !DARK_SQUARES == 0 {
            return true;
        }
    }

    false
}

#[inline]
fn check_bounds(x: u8, y: u8) -> Result<u8, SessionError> {
    if x >= BOARD_WIDTH || y >= BOARD_HEIGHT {
        return Err(SessionError::OutOfBounds { x, y });
    }
    Ok(square_index(x, y))
}

//! The append-only move log and its exportable JSON form.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;

use serde::Serialize;

use crate::board::Color;
use crate::session::Status;

/// One completed ply as the rendering shell wants to log it: which piece,
/// whose, where it landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveLogEntry {
    /// 1-based halfmove index.
    pub ply: u32,
    /// Wire piece code of the piece now on the target square.
    pub piece_code: char,
    pub player: Color,
    /// Destination square in algebraic notation.
    pub target: String,
    pub capture: bool,
    /// "+", "#", or empty.
    pub annotation: String,
}

/// Serializable summary of a session, mirroring the on-screen history log.
#[derive(Debug, Serialize)]
pub struct GameRecord {
    pub result: Status,
    pub ply_count: u32,
    pub white_moves: Vec<MoveLogEntry>,
    pub black_moves: Vec<MoveLogEntry>,
}

impl GameRecord {
    pub fn new(result: Status, log: &[MoveLogEntry]) -> Self {
        let mut white_moves = Vec::new();
        let mut black_moves = Vec::new();
        for entry in log {
            match entry.player {
                Color::White => white_moves.push(entry.clone()),
                Color::Black => black_moves.push(entry.clone()),
            }
        }
        GameRecord { result, ply_count: log.len() as u32, white_moves, black_moves }
    }
}

#[derive(Debug)]
pub enum RecordError {
    Serialization(serde_json::Error),
    Io(String, io::Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Serialization(e) => write!(f, "record serialization error: {}", e),
            RecordError::Io(file, e) => write!(f, "I/O error with file '{}': {}", file, e),
        }
    }
}

impl Error for RecordError {}

/// Writes the record as pretty JSON.
pub fn save_record_to_file(record: &GameRecord, filename: &str) -> Result<(), RecordError> {
    let json_data = serde_json::to_string_pretty(record).map_err(RecordError::Serialization)?;
    fs::write(filename, json_data).map_err(|e| RecordError::Io(filename.to_string(), e))?;
    Ok(())
}

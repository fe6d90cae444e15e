//! Terminal rendering shell. Pure view logic: it rebuilds its picture of
//! the board from the per-square session queries every draw cycle and
//! forwards square clicks, exactly as a graphical front end would.

use std::error::Error;
use std::io::{self, Write};

use lazy_static::lazy_static;
use regex::Regex;

use chess_rules::record::save_record_to_file;
use chess_rules::session::{GameSession, SelectOutcome, Status};
use chess_rules::MoveLogEntry;

const DEFAULT_RECORD_FILENAME: &str = "chess_record.json";

lazy_static! {
    static ref SQUARE_RE: Regex = Regex::new(r"^([a-h])([1-8])$").unwrap();
    static ref REWIND_RE: Regex = Regex::new(r"^rewind(?:\s+(\d+))?$").unwrap();
    static ref SAVE_RE: Regex = Regex::new(r"^save(?:\s+(\S+))?$").unwrap();
}

/// Re-renders the whole board from scratch using only the query surface.
fn draw_board(session: &GameSession) -> Result<(), Box<dyn Error>> {
    let width = session.width();
    let height = session.height();
    let selected = session.selected_square()?;

    println!("  +{}+", "-".repeat(width as usize * 3));
    for y in (0..height).rev() {
        print!("{} |", y + 1);
        for x in 0..width {
            let code = session.piece_at(x, y)?;
            let player = session.player_at(x, y)?;
            let glyph = match code {
                b' ' => '.',
                c if player == 2 => (c as char).to_ascii_lowercase(),
                c => c as char,
            };
            let marker = if selected == Some((x, y)) {
                '>'
            } else if session.valid_at(x, y)? {
                '*'
            } else {
                ' '
            };
            print!(" {}{}", marker, glyph);
        }
        println!(" |");
    }
    println!("  +{}+", "-".repeat(width as usize * 3));
    print!("   ");
    for x in 0..width {
        print!("  {}", (b'a' + x) as char);
    }
    println!();
    Ok(())
}

fn format_log_entry(entry: &MoveLogEntry) -> String {
    format!(
        "{}. {}{}{}{}",
        entry.ply,
        entry.piece_code,
        if entry.capture { "x" } else { "" },
        entry.target,
        entry.annotation
    )
}

fn print_history(session: &GameSession) -> Result<(), Box<dyn Error>> {
    let log = session.log()?;
    if log.is_empty() {
        println!("(no moves yet)");
    }
    for entry in log {
        println!("{}  ({:?})", format_log_entry(entry), entry.player);
    }
    Ok(())
}

fn print_status(session: &GameSession) -> Result<(), Box<dyn Error>> {
    match session.status()? {
        Status::InProgress => {
            println!("{:?} to move.", session.side_to_move()?);
        }
        Status::Checkmate { winner } => {
            println!("=== GAME OVER: checkmate, {:?} wins. ===", winner);
        }
        Status::Draw(reason) => {
            println!("=== GAME OVER: draw by {:?}. ===", reason);
        }
    }
    Ok(())
}

fn print_help() {
    println!("\nClick squares by typing them:");
    println!("  e2             select the piece on e2 (legal targets show as *)");
    println!("  e4             with a selection active, move there (or reselect/clear)");
    println!("Other commands:");
    println!("  rewind [n]     undo the last n plies (default 1)");
    println!("  history        show the move log");
    println!("  save [file]    save the game record as JSON (default: {})", DEFAULT_RECORD_FILENAME);
    println!("  new            start a fresh game");
    println!("  help           show this help message");
    println!("  quit / exit    leave");
    println!();
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("==============================");
    println!("|        chess_rules         |");
    println!("==============================");
    print_help();

    let mut session = GameSession::new();
    session.start();

    loop {
        println!("------------------------------------------");
        draw_board(&session)?;
        print_status(&session)?;

        print!("> ");
        io::stdout().flush()?;

        let mut input_line = String::new();
        match io::stdin().read_line(&mut input_line) {
            Ok(0) => {
                println!("\nEnd of input. Bye.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}. Try again or use 'quit'.", e);
                continue;
            }
        }

        let raw = input_line.trim();
        let input = raw.to_lowercase();
        if input.is_empty() {
            continue;
        }

        if let Some(caps) = SQUARE_RE.captures(&input) {
            let x = caps[1].as_bytes()[0] - b'a';
            let y = caps[2].as_bytes()[0] - b'1';
            match session.select(x, y) {
                Ok(SelectOutcome::Moved) => {
                    if let Some(entry) = session.log()?.last() {
                        println!("Played {}", format_log_entry(entry));
                    }
                    if session.status()? != Status::InProgress {
                        if let Err(e) =
                            save_record_to_file(&session.record()?, DEFAULT_RECORD_FILENAME)
                        {
                            eprintln!("Warning: failed to save final record: {}", e);
                        } else {
                            println!("Final record saved to {}.", DEFAULT_RECORD_FILENAME);
                        }
                    }
                }
                Ok(SelectOutcome::Selected) => {}
                Ok(SelectOutcome::Cleared) => println!("Selection cleared."),
                Ok(SelectOutcome::Ignored) => println!("Nothing to do there."),
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        if let Some(caps) = REWIND_RE.captures(&input) {
            let n: usize = caps
                .get(1)
                .map_or(Ok(1), |m| m.as_str().parse())
                .unwrap_or(1);
            match session.rewind(n) {
                Ok(0) => println!("Nothing to rewind."),
                Ok(undone) => println!("Rewound {} plies.", undone),
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        // Matched against the raw input so filenames keep their case.
        if let Some(caps) = SAVE_RE.captures(raw) {
            let filename = caps.get(1).map_or(DEFAULT_RECORD_FILENAME, |m| m.as_str());
            match session.record().map(|r| save_record_to_file(&r, filename)) {
                Ok(Ok(())) => println!("Record saved to '{}'.", filename),
                Ok(Err(e)) => println!("Error saving record: {}", e),
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        match input.as_str() {
            "new" => {
                session.start();
                println!("New game.");
            }
            "history" => print_history(&session)?,
            "help" | "?" => print_help(),
            "quit" | "exit" => {
                println!("Bye.");
                break;
            }
            other => println!("Unknown input: '{}'. Type 'help' for commands.", other),
        }
    }

    Ok(())
}

use crate::board::{Board, Color};
use crate::movegen::{GameStatus, Move, MoveGenerator};
use crate::search::{Search, DEFAULT_DEPTH};
use anyhow::{anyhow, bail, Context, Result};
use std::io::{self, BufRead, Write};

const MAX_DEPTH: u32 = 8;

/// Minimal UCI front end over the rules engine and the search.
pub struct UciHandler {
    board: Board,
    move_generator: MoveGenerator,
    search: Search,
    default_depth: u32,
}

impl Default for UciHandler {
    fn default() -> Self {
        UciHandler::new()
    }
}

impl UciHandler {
    pub fn new() -> Self {
        UciHandler {
            board: Board::new(),
            move_generator: MoveGenerator::new(),
            search: Search::new(),
            default_depth: DEFAULT_DEPTH,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line.context("reading command")?;
            let command = line.trim();
            if command == "quit" {
                break;
            }

            match self.handle_command(command) {
                Ok(response) => write!(stdout, "{}", response)?,
                Err(err) => writeln!(stdout, "info string {:#}", err)?,
            }
            stdout.flush()?;
        }
        Ok(())
    }

    pub fn handle_command(&mut self, command: &str) -> Result<String> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(String::new());
        }

        match parts[0] {
            "uci" => Ok(self.handle_uci()),
            "isready" => Ok("readyok\n".to_string()),
            "ucinewgame" => {
                self.board = Board::new();
                Ok(String::new())
            }
            "position" => self.handle_position(&parts[1..]),
            "go" => self.handle_go(&parts[1..]),
            "setoption" => self.handle_setoption(&parts[1..]),
            "d" => Ok(self.handle_display()),
            "quit" => Ok(String::new()),
            other => Ok(format!("info string unknown command `{}`\n", other)),
        }
    }

    fn handle_uci(&self) -> String {
        format!(
            "id name Salmon Rules\nid author {}\noption name Depth type spin default {} min 1 max {}\nuciok\n",
            env!("CARGO_PKG_AUTHORS"),
            DEFAULT_DEPTH,
            MAX_DEPTH
        )
    }

    fn handle_position(&mut self, parts: &[&str]) -> Result<String> {
        let moves_at = parts.iter().position(|&p| p == "moves");
        let (setup, moves) = match moves_at {
            Some(i) => (&parts[..i], &parts[i + 1..]),
            None => (parts, &parts[parts.len()..]),
        };

        let mut board = match setup.first() {
            Some(&"startpos") => Board::new(),
            Some(&"fen") => {
                let fen = setup[1..].join(" ");
                Board::from_fen(&fen).with_context(|| format!("bad fen `{}`", fen))?
            }
            _ => bail!("position needs `startpos` or `fen`"),
        };

        for text in moves {
            let mv: Move = match text.parse() {
                Ok(mv) => mv,
                Err(err) => {
                    self.board = board;
                    return Ok(format!("info string bad move `{}`: {}\n", text, err));
                }
            };
            if let Err(err) = board.apply_move(mv.from, mv.to, mv.promotion) {
                self.board = board;
                return Ok(format!("info string {}\n", err));
            }
        }

        self.board = board;
        Ok(String::new())
    }

    fn handle_go(&mut self, parts: &[&str]) -> Result<String> {
        let mut depth = self.default_depth;
        let mut i = 0;
        while i < parts.len() {
            if parts[i] == "depth" {
                depth = parse_depth(parts.get(i + 1).copied())?;
                i += 1;
            }
            i += 1;
        }

        self.search.set_max_depth(depth);
        let result = self.search.search(&self.board);

        // UCI scores are in centipawns from the side to move's point of view.
        let perspective = match self.board.side_to_move {
            Color::White => 1,
            Color::Black => -1,
        };
        let mut response = format!(
            "info depth {} score cp {} nodes {}\n",
            depth.max(1),
            result.score * 100 * perspective,
            result.nodes
        );
        match result.best_move {
            Some(mv) => response.push_str(&format!("bestmove {}\n", mv)),
            None => response.push_str("bestmove (none)\n"),
        }
        Ok(response)
    }

    fn handle_setoption(&mut self, parts: &[&str]) -> Result<String> {
        // setoption name <id> value <x>
        let name = parts.get(1).copied().unwrap_or_default();
        if !name.eq_ignore_ascii_case("depth") || parts.get(2) != Some(&"value") {
            return Ok(format!("info string unsupported option `{}`\n", parts.join(" ")));
        }
        self.default_depth = parse_depth(parts.get(3).copied())?;
        Ok(String::new())
    }

    fn handle_display(&self) -> String {
        let status = match self.move_generator.game_status(&self.board) {
            GameStatus::Ongoing => "ongoing".to_string(),
            GameStatus::Check(color) => format!("{} in check", color),
            GameStatus::Checkmate { winner } => format!("checkmate, {} wins", winner),
            GameStatus::Stalemate => "stalemate".to_string(),
        };
        format!("{}\nFen: {}\nStatus: {}\n", self.board, self.board.to_fen(), status)
    }
}

fn parse_depth(text: Option<&str>) -> Result<u32> {
    let text = text.ok_or_else(|| anyhow!("missing depth"))?;
    let depth: u32 = text
        .parse()
        .with_context(|| format!("bad depth `{}`", text))?;
    if depth == 0 || depth > MAX_DEPTH {
        bail!("depth must be between 1 and {}", MAX_DEPTH);
    }
    Ok(depth)
}

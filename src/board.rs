use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::movegen::{Move, MoveGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    pub fn from_char(c: char) -> Option<Piece> {
        match c.to_ascii_lowercase() {
            'p' => Some(Piece::Pawn),
            'n' => Some(Piece::Knight),
            'b' => Some(Piece::Bishop),
            'r' => Some(Piece::Rook),
            'q' => Some(Piece::Queen),
            'k' => Some(Piece::King),
            _ => None,
        }
    }

    /// Lowercase letter, as used for black pieces in FEN and for promotion suffixes.
    pub fn to_char(self) -> char {
        match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }

    /// Kinds a pawn may turn into on the last rank.
    pub fn is_promotion_choice(self) -> bool {
        matches!(self, Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta of a pawn step. White plays up the board towards row 0.
    pub fn pawn_direction(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row holding this side's king and rooks at the start of the game.
    pub fn home_row(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    pub fn pawn_row(self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    pub fn promotion_row(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Row a pawn of this side must stand on to capture en passant.
    pub fn en_passant_row(self) -> u8 {
        match self {
            Color::White => 3,
            Color::Black => 4,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// A piece standing on the board. Its square is the cell that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardPiece {
    pub piece: Piece,
    pub color: Color,
    pub has_moved: bool,
}

impl BoardPiece {
    pub fn new(piece: Piece, color: Color) -> Self {
        Self {
            piece,
            color,
            has_moved: false,
        }
    }

    pub fn moved(piece: Piece, color: Color) -> Self {
        Self {
            piece,
            color,
            has_moved: true,
        }
    }

    pub fn to_char(&self) -> char {
        let c = self.piece.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

/// Board coordinate. Row 0 is the eighth rank (black's side), column 0 is the a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquareParseError {
    #[error("square `{0}` must be a file letter followed by a rank digit")]
    BadLength(String),
    #[error("invalid file in `{0}`")]
    BadFile(String),
    #[error("invalid rank in `{0}`")]
    BadRank(String),
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Square reached by stepping `(dr, dc)`, or `None` off the board.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Every square in row-major order, starting at a8.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Square::new(row, col)))
    }

    pub fn from_algebraic(s: &str) -> Result<Square, SquareParseError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(SquareParseError::BadLength(s.to_string()));
        }
        let file = bytes[0].to_ascii_lowercase();
        if !(b'a'..=b'h').contains(&file) {
            return Err(SquareParseError::BadFile(s.to_string()));
        }
        let rank = bytes[1];
        if !(b'1'..=b'8').contains(&rank) {
            return Err(SquareParseError::BadRank(s.to_string()));
        }
        Ok(Square::new(b'8' - rank, file - b'a'))
    }

    pub fn to_algebraic(self) -> String {
        let mut result = String::with_capacity(2);
        result.push((b'a' + self.col) as char);
        result.push((b'8' - self.row) as char);
        result
    }
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::from_algebraic(s)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    EmptySquare,
    WrongSide,
    NotLegal,
    BadPromotion,
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            IllegalReason::EmptySquare => "no piece on the source square",
            IllegalReason::WrongSide => "piece belongs to the side not on move",
            IllegalReason::NotLegal => "destination is not a legal move",
            IllegalReason::BadPromotion => "pawns promote to knight, bishop, rook or queen",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move {from}{to}: {reason}")]
    IllegalMove {
        from: Square,
        to: Square,
        reason: IllegalReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 4 FEN fields, found {0}")]
    WrongFieldCount(usize),
    #[error("bad piece placement: {0}")]
    BadPlacement(String),
    #[error("bad side to move `{0}`")]
    BadSideToMove(String),
    #[error("bad castling field `{0}`")]
    BadCastling(String),
    #[error("bad en passant field `{0}`")]
    BadEnPassant(String),
}

/// Everything needed to take a move back: the mover as it was, what it captured,
/// the rook it dragged along when castling and the previous en passant target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Undo {
    pub mv: Move,
    moved: BoardPiece,
    captured: Option<(Square, BoardPiece)>,
    rook: Option<(Square, Square, BoardPiece)>,
    en_passant: Option<Square>,
}

/// Game state: the grid, the side to move and the en passant target.
///
/// Castling rights are not stored; they follow from the `has_moved` flags of the
/// king and rooks together with occupancy and attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<BoardPiece>; 8]; 8],
    pub side_to_move: Color,
    pub en_passant: Option<Square>,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

const BACK_RANK: [Piece; 8] = [
    Piece::Rook,
    Piece::Knight,
    Piece::Bishop,
    Piece::Queen,
    Piece::King,
    Piece::Bishop,
    Piece::Knight,
    Piece::Rook,
];

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Standard initial position, white to move.
    pub fn new() -> Self {
        let mut board = Board::empty();
        for color in [Color::White, Color::Black] {
            for (col, piece) in BACK_RANK.iter().enumerate() {
                board.squares[color.home_row() as usize][col] = Some(BoardPiece::new(*piece, color));
                board.squares[color.pawn_row() as usize][col] =
                    Some(BoardPiece::new(Piece::Pawn, color));
            }
        }
        board
    }

    /// A board with no pieces, white to move.
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
            side_to_move: Color::White,
            en_passant: None,
        }
    }

    pub fn piece_at(&self, square: Square) -> Option<BoardPiece> {
        self.squares[square.row as usize][square.col as usize]
    }

    pub fn set_piece(&mut self, square: Square, piece: Option<BoardPiece>) {
        self.squares[square.row as usize][square.col as usize] = piece;
    }

    /// Pieces of `color` in row-major order.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, BoardPiece)> + '_ {
        Square::all().filter_map(move |square| {
            self.piece_at(square)
                .filter(|p| p.color == color)
                .map(|p| (square, p))
        })
    }

    /// The pawn `capturer` would take en passant: the opposing pawn that just
    /// double-stepped past the target, level with `capturer`'s fifth rank.
    pub fn en_passant_victim(&self, capturer: Color) -> Option<Square> {
        let target = self.en_passant?;
        let victim = target.offset(-capturer.pawn_direction(), 0)?;
        let is_victim = victim.row == capturer.en_passant_row()
            && matches!(
                self.piece_at(victim),
                Some(p) if p.piece == Piece::Pawn && p.color != capturer
            );
        is_victim.then_some(victim)
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color)
            .find(|(_, p)| p.piece == Piece::King)
            .map(|(square, _)| square)
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(FenError::WrongFieldCount(fields.len()));
        }

        let mut board = Board::empty();
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadPlacement(fields[0].to_string()));
        }
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as usize;
                    continue;
                }
                let piece = Piece::from_char(c)
                    .ok_or_else(|| FenError::BadPlacement(rank.to_string()))?;
                if col >= 8 {
                    return Err(FenError::BadPlacement(rank.to_string()));
                }
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                board.squares[row][col] = Some(BoardPiece::moved(piece, color));
                col += 1;
            }
            if col != 8 {
                return Err(FenError::BadPlacement(rank.to_string()));
            }
        }

        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSideToMove(other.to_string())),
        };

        if fields[2] != "-" {
            for c in fields[2].chars() {
                let (color, rook_col) = match c {
                    'K' => (Color::White, 7),
                    'Q' => (Color::White, 0),
                    'k' => (Color::Black, 7),
                    'q' => (Color::Black, 0),
                    _ => return Err(FenError::BadCastling(fields[2].to_string())),
                };
                let row = color.home_row();
                board.mark_unmoved(Square::new(row, 4), Piece::King, color);
                board.mark_unmoved(Square::new(row, rook_col), Piece::Rook, color);
            }
        }

        for color in [Color::White, Color::Black] {
            for col in 0..8 {
                board.mark_unmoved(Square::new(color.pawn_row(), col), Piece::Pawn, color);
            }
        }

        board.en_passant = match fields[3] {
            "-" => None,
            text => Some(
                Square::from_algebraic(text)
                    .map_err(|_| FenError::BadEnPassant(text.to_string()))?,
            ),
        };
        if let Some(target) = board.en_passant {
            let side = board.side_to_move;
            if board.piece_at(target).is_some() || board.en_passant_victim(side).is_none() {
                return Err(FenError::BadEnPassant(fields[3].to_string()));
            }
        }

        Ok(board)
    }

    fn mark_unmoved(&mut self, square: Square, piece: Piece, color: Color) {
        if let Some(p) = &mut self.squares[square.row as usize][square.col as usize] {
            if p.piece == piece && p.color == color {
                p.has_moved = false;
            }
        }
    }

    fn is_unmoved(&self, square: Square, piece: Piece, color: Color) -> bool {
        matches!(self.piece_at(square), Some(p) if p.piece == piece && p.color == color && !p.has_moved)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for row in 0..8u8 {
            let mut empty = 0;
            for col in 0..8u8 {
                match self.piece_at(Square::new(row, col)) {
                    Some(p) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(p.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if row < 7 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        let mut castling = String::new();
        for (color, letters) in [(Color::White, ['K', 'Q']), (Color::Black, ['k', 'q'])] {
            let row = color.home_row();
            if !self.is_unmoved(Square::new(row, 4), Piece::King, color) {
                continue;
            }
            if self.is_unmoved(Square::new(row, 7), Piece::Rook, color) {
                castling.push(letters[0]);
            }
            if self.is_unmoved(Square::new(row, 0), Piece::Rook, color) {
                castling.push(letters[1]);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        fen.push(' ');
        fen.push_str(&castling);

        fen.push(' ');
        match self.en_passant {
            Some(square) => fen.push_str(&square.to_algebraic()),
            None => fen.push('-'),
        }
        fen.push_str(" 0 1");
        fen
    }

    /// Plays `mv` without checking legality and returns the delta needed to take it
    /// back. Returns `None`, leaving the board untouched, if `mv.from` is empty.
    pub fn make_move(&mut self, mv: Move) -> Option<Undo> {
        let moving = self.piece_at(mv.from)?;
        let mut undo = Undo {
            mv,
            moved: moving,
            captured: None,
            rook: None,
            en_passant: self.en_passant,
        };

        if moving.piece == Piece::King && mv.from.col.abs_diff(mv.to.col) == 2 {
            let (rook_col, rook_dest) = if mv.to.col > mv.from.col { (7, 5) } else { (0, 3) };
            let rook_from = Square::new(mv.from.row, rook_col);
            let rook_to = Square::new(mv.from.row, rook_dest);
            if let Some(rook) = self.piece_at(rook_from) {
                self.set_piece(rook_from, None);
                self.set_piece(rook_to, Some(BoardPiece { has_moved: true, ..rook }));
                undo.rook = Some((rook_from, rook_to, rook));
            }
        }

        let en_passant_victim = if moving.piece == Piece::Pawn
            && self.en_passant == Some(mv.to)
            && mv.from.col != mv.to.col
        {
            self.en_passant_victim(moving.color)
                .filter(|victim| victim.row == mv.from.row)
        } else {
            None
        };

        if let Some(victim) = en_passant_victim {
            undo.captured = self.piece_at(victim).map(|p| (victim, p));
            self.set_piece(victim, None);
        } else if let Some(target) = self.piece_at(mv.to) {
            undo.captured = Some((mv.to, target));
        }

        self.en_passant = None;
        if moving.piece == Piece::Pawn && mv.from.row.abs_diff(mv.to.row) == 2 {
            self.en_passant = Some(Square::new((mv.from.row + mv.to.row) / 2, mv.from.col));
        }

        self.set_piece(mv.from, None);
        let landed = if moving.piece == Piece::Pawn && mv.to.row == moving.color.promotion_row() {
            let promotion = mv
                .promotion
                .filter(|p| p.is_promotion_choice())
                .unwrap_or(Piece::Queen);
            BoardPiece::moved(promotion, moving.color)
        } else {
            BoardPiece {
                has_moved: true,
                ..moving
            }
        };
        self.set_piece(mv.to, Some(landed));

        self.side_to_move = self.side_to_move.opposite();
        Some(undo)
    }

    /// Reverts the move recorded in `undo`. Undos must be replayed in reverse order.
    pub fn unmake_move(&mut self, undo: Undo) {
        self.side_to_move = self.side_to_move.opposite();
        self.en_passant = undo.en_passant;

        self.set_piece(undo.mv.to, None);
        self.set_piece(undo.mv.from, Some(undo.moved));
        if let Some((square, piece)) = undo.captured {
            self.set_piece(square, Some(piece));
        }
        if let Some((rook_from, rook_to, rook)) = undo.rook {
            self.set_piece(rook_to, None);
            self.set_piece(rook_from, Some(rook));
        }
    }

    /// Validates and commits a move for the side to move. On error the board is
    /// left exactly as it was.
    ///
    /// `promotion` is only consulted when a pawn reaches the last rank and
    /// defaults to a queen.
    pub fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<Move, MoveError> {
        let illegal = |reason| MoveError::IllegalMove { from, to, reason };

        let piece = self.piece_at(from).ok_or(illegal(IllegalReason::EmptySquare))?;
        if piece.color != self.side_to_move {
            return Err(illegal(IllegalReason::WrongSide));
        }

        let generator = MoveGenerator::new();
        let mut mv = generator
            .legal_moves_from(self, from)
            .into_iter()
            .find(|m| m.to == to)
            .ok_or(illegal(IllegalReason::NotLegal))?;

        if mv.promotion.is_some() {
            let choice = promotion.unwrap_or(Piece::Queen);
            if !choice.is_promotion_choice() {
                return Err(illegal(IllegalReason::BadPromotion));
            }
            mv.promotion = Some(choice);
        }

        self.make_move(mv).ok_or(illegal(IllegalReason::EmptySquare))?;
        Ok(mv)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = String::new();
        for row in 0..8u8 {
            result.push((b'8' - row) as char);
            result.push(' ');
            for col in 0..8u8 {
                match self.piece_at(Square::new(row, col)) {
                    Some(p) => result.push(p.to_char()),
                    None => result.push('.'),
                }
                if col < 7 {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        result.push_str("  a b c d e f g h\n");
        write!(f, "{}", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn test_algebraic_mapping() {
        assert_eq!(sq("a8"), Square::new(0, 0));
        assert_eq!(sq("h1"), Square::new(7, 7));
        assert_eq!(sq("e2"), Square::new(6, 4));
        assert_eq!(Square::new(6, 4).to_algebraic(), "e2");
        assert_eq!("E4".parse::<Square>().unwrap(), Square::new(4, 4));

        assert!(matches!(Square::from_algebraic("e"), Err(SquareParseError::BadLength(_))));
        assert!(matches!(Square::from_algebraic("i1"), Err(SquareParseError::BadFile(_))));
        assert!(matches!(Square::from_algebraic("a9"), Err(SquareParseError::BadRank(_))));
        assert!(matches!(Square::from_algebraic("a0"), Err(SquareParseError::BadRank(_))));
    }

    #[test]
    fn test_initial_setup() {
        let board = Board::new();
        assert_eq!(board.side_to_move, Color::White);
        assert_eq!(board.en_passant, None);
        assert_eq!(board.piece_at(sq("e1")), Some(BoardPiece::new(Piece::King, Color::White)));
        assert_eq!(board.piece_at(sq("d8")), Some(BoardPiece::new(Piece::Queen, Color::Black)));
        assert_eq!(board.piece_at(sq("h7")), Some(BoardPiece::new(Piece::Pawn, Color::Black)));
        assert_eq!(board.piece_at(sq("e4")), None);
        assert_eq!(board.pieces(Color::White).count(), 16);
        assert_eq!(board.king_square(Color::Black), Some(sq("e8")));
        assert_eq!(board.to_fen(), STARTPOS_FEN);
    }

    #[test]
    fn test_fen_round_trip_and_flags() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.to_fen(), fen);
        assert!(!board.piece_at(sq("e1")).unwrap().has_moved);
        assert!(!board.piece_at(sq("a8")).unwrap().has_moved);
        // Pawns off their home rank count as moved.
        assert!(board.piece_at(sq("d5")).unwrap().has_moved);
        assert!(!board.piece_at(sq("a2")).unwrap().has_moved);

        let board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K2R w K d6 0 3").unwrap();
        assert_eq!(board.en_passant, Some(sq("d6")));
        assert!(board.piece_at(sq("h1")).map(|p| !p.has_moved).unwrap());
        assert_eq!(board.to_fen(), "4k3/8/8/3pP3/8/8/8/4K2R w K d6 0 1");
    }

    #[test]
    fn test_fen_errors() {
        assert_eq!(Board::from_fen("8/8/8 w"), Err(FenError::WrongFieldCount(2)));
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8 w - -"),
            Err(FenError::BadPlacement(_))
        ));
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8/7x w - -"),
            Err(FenError::BadPlacement(_))
        ));
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8/8 x - -"),
            Err(FenError::BadSideToMove(_))
        ));
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8/8 w X -"),
            Err(FenError::BadCastling(_))
        ));
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8/8 w - z9"),
            Err(FenError::BadEnPassant(_))
        ));

        // The target must sit behind an opposing pawn on the mover's capture rank.
        for fen in [
            "4k3/8/8/3NP3/8/8/8/4K3 w - d6 0 1",
            "4k3/8/8/3QP3/8/8/8/4K3 w - d6 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 b - d6 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d3 0 1",
            "4k3/8/3n4/3pP3/8/8/8/4K3 w - d6 0 1",
            "4k3/8/8/3PP3/8/8/8/4K3 w - d6 0 1",
        ] {
            assert!(
                matches!(Board::from_fen(fen), Err(FenError::BadEnPassant(_))),
                "{}",
                fen
            );
        }
        assert!(Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").is_ok());
        assert!(Board::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").is_ok());
    }

    #[test]
    fn test_make_move_only_takes_opposing_pawn_en_passant() {
        let mut board = Board::from_fen("4k3/8/8/3NP3/8/8/8/4K3 w - - 0 1").unwrap();
        board.en_passant = Some(Square::from_algebraic("d6").unwrap());
        let knight = board.piece_at(Square::from_algebraic("d5").unwrap());

        let mv = Move::new(
            Square::from_algebraic("e5").unwrap(),
            Square::from_algebraic("d6").unwrap(),
        );
        let undo = board.make_move(mv).unwrap();
        assert_eq!(undo.mv, mv);
        assert_eq!(board.piece_at(Square::from_algebraic("d5").unwrap()), knight);
        assert_eq!(board.pieces(Color::White).count(), 3);
    }

    #[test]
    fn test_make_unmake_restores_position() {
        let fens = [
            STARTPOS_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/1P6/8/3pP3/8/8/8/R3K2R w KQ d6 0 1",
        ];
        let generator = MoveGenerator::new();
        for fen in fens {
            let mut board = Board::from_fen(fen).unwrap();
            let before = board;
            for mv in generator.generate_moves(&board) {
                let undo = board.make_move(mv).unwrap();
                assert_ne!(board, before);
                board.unmake_move(undo);
                assert_eq!(board, before, "unmake of {} from {}", mv, fen);
            }
        }
    }

    #[test]
    fn test_make_move_on_empty_square_is_noop() {
        let mut board = Board::new();
        let before = board;
        assert!(board.make_move(Move::new(sq("e4"), sq("e5"))).is_none());
        assert_eq!(board, before);
    }

    #[test]
    fn test_double_step_sets_and_next_move_clears_en_passant() {
        let mut board = Board::new();
        board.apply_move(sq("e2"), sq("e4"), None).unwrap();
        assert_eq!(board.en_passant, Some(sq("e3")));
        assert_eq!(board.side_to_move, Color::Black);
        board.apply_move(sq("g8"), sq("f6"), None).unwrap();
        assert_eq!(board.en_passant, None);
        assert!(board.piece_at(sq("f6")).unwrap().has_moved);
    }

    #[test]
    fn test_apply_move_errors_leave_board_unchanged() {
        let mut board = Board::new();
        let before = board;

        let err = board.apply_move(sq("e4"), sq("e5"), None).unwrap_err();
        assert_eq!(
            err,
            MoveError::IllegalMove {
                from: sq("e4"),
                to: sq("e5"),
                reason: IllegalReason::EmptySquare,
            }
        );
        assert!(matches!(
            board.apply_move(sq("e7"), sq("e5"), None),
            Err(MoveError::IllegalMove { reason: IllegalReason::WrongSide, .. })
        ));
        assert!(matches!(
            board.apply_move(sq("e2"), sq("e5"), None),
            Err(MoveError::IllegalMove { reason: IllegalReason::NotLegal, .. })
        ));
        assert!(matches!(
            board.apply_move(sq("e1"), sq("g1"), None),
            Err(MoveError::IllegalMove { reason: IllegalReason::NotLegal, .. })
        ));
        assert_eq!(board, before);
        assert_eq!(err.to_string(), "illegal move e4e5: no piece on the source square");
    }

    #[test]
    fn test_promotion_choice() {
        let mut board = Board::from_fen("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let before = board;
        assert!(matches!(
            board.apply_move(sq("b7"), sq("b8"), Some(Piece::King)),
            Err(MoveError::IllegalMove { reason: IllegalReason::BadPromotion, .. })
        ));
        assert_eq!(board, before);

        let mv = board.apply_move(sq("b7"), sq("b8"), Some(Piece::Knight)).unwrap();
        assert_eq!(mv.promotion, Some(Piece::Knight));
        assert_eq!(board.piece_at(sq("b8")), Some(BoardPiece::moved(Piece::Knight, Color::White)));
        assert_eq!(board.piece_at(sq("b7")), None);
        assert!(board.pieces(Color::White).all(|(_, p)| p.piece != Piece::Pawn));

        let mut board = before;
        board.apply_move(sq("b7"), sq("b8"), None).unwrap();
        assert_eq!(board.piece_at(sq("b8")), Some(BoardPiece::moved(Piece::Queen, Color::White)));
    }

    #[test]
    fn test_display() {
        let text = Board::new().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "8 r n b q k b n r");
        assert_eq!(lines[7], "1 R N B Q K B N R");
        assert_eq!(lines[8], "  a b c d e f g h");
    }
}

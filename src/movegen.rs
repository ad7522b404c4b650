use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::board::{Board, BoardPiece, Color, Piece, Square, SquareParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn new_promotion(from: Square, to: Square, promotion: Piece) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.to_char())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("move `{0}` must look like e2e4 or e7e8q")]
    BadLength(String),
    #[error(transparent)]
    Square(#[from] SquareParseError),
    #[error("unknown promotion piece `{0}`")]
    BadPromotion(char),
}

impl FromStr for Move {
    type Err = MoveParseError;

    /// Coordinate notation: `e2e4`, with an optional promotion letter as in `e7e8q`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
            return Err(MoveParseError::BadLength(s.to_string()));
        }
        let from = Square::from_algebraic(&s[0..2])?;
        let to = Square::from_algebraic(&s[2..4])?;
        let promotion = match s[4..].chars().next() {
            Some(c) => Some(Piece::from_char(c).ok_or(MoveParseError::BadPromotion(c))?),
            None => None,
        };
        Ok(Move {
            from,
            to,
            promotion,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Check(Color),
    Checkmate { winner: Color },
    Stalemate,
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Stateless move generator. Pseudo-legal generation ignores self-check; the
/// legal variants filter it by playing each candidate on a scratch board.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Pseudo-legal moves of whatever stands on `from`.
    pub fn pseudo_legal_moves(&self, board: &Board, from: Square) -> Vec<Move> {
        let mut moves = Vec::new();
        if let Some(piece) = board.piece_at(from) {
            self.push_pseudo_legal(board, from, piece, &mut moves);
        }
        moves
    }

    fn push_pseudo_legal(&self, board: &Board, from: Square, piece: BoardPiece, out: &mut Vec<Move>) {
        match piece.piece {
            Piece::Pawn => self.push_pawn_moves(board, from, piece, out),
            Piece::Knight => self.push_steps(board, from, piece.color, &KNIGHT_OFFSETS, out),
            Piece::Bishop => self.push_rays(board, from, piece.color, &BISHOP_DIRECTIONS, out),
            Piece::Rook => self.push_rays(board, from, piece.color, &ROOK_DIRECTIONS, out),
            Piece::Queen => {
                self.push_rays(board, from, piece.color, &ROOK_DIRECTIONS, out);
                self.push_rays(board, from, piece.color, &BISHOP_DIRECTIONS, out);
            }
            Piece::King => {
                self.push_steps(board, from, piece.color, &KING_OFFSETS, out);
                self.push_castling(board, from, piece, out);
            }
        }
    }

    fn push_pawn_moves(&self, board: &Board, from: Square, pawn: BoardPiece, out: &mut Vec<Move>) {
        let color = pawn.color;
        let dir = color.pawn_direction();
        if let Some(one) = from.offset(dir, 0) {
            if board.piece_at(one).is_none() {
                push_pawn_target(from, one, color, out);
                if !pawn.has_moved {
                    if let Some(two) = one.offset(dir, 0) {
                        if board.piece_at(two).is_none() {
                            push_pawn_target(from, two, color, out);
                        }
                    }
                }
            }
        }

        for dc in [-1, 1] {
            if let Some(to) = from.offset(dir, dc) {
                if matches!(board.piece_at(to), Some(p) if p.color != color) {
                    push_pawn_target(from, to, color, out);
                }
            }
        }

        if let (Some(target), Some(victim)) = (board.en_passant, board.en_passant_victim(color)) {
            if from.row == victim.row && from.col.abs_diff(victim.col) == 1 {
                out.push(Move::new(from, target));
            }
        }
    }

    fn push_steps(
        &self,
        board: &Board,
        from: Square,
        color: Color,
        offsets: &[(i8, i8)],
        out: &mut Vec<Move>,
    ) {
        for &(dr, dc) in offsets {
            if let Some(to) = from.offset(dr, dc) {
                if !matches!(board.piece_at(to), Some(p) if p.color == color) {
                    out.push(Move::new(from, to));
                }
            }
        }
    }

    fn push_rays(
        &self,
        board: &Board,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        out: &mut Vec<Move>,
    ) {
        for &(dr, dc) in directions {
            let mut current = from;
            while let Some(to) = current.offset(dr, dc) {
                match board.piece_at(to) {
                    None => out.push(Move::new(from, to)),
                    Some(p) => {
                        if p.color != color {
                            out.push(Move::new(from, to));
                        }
                        break;
                    }
                }
                current = to;
            }
        }
    }

    /// Castling candidates: king and rook unmoved, squares between them empty.
    /// Attacks on the king's path are left to the legality filter.
    fn push_castling(&self, board: &Board, from: Square, king: BoardPiece, out: &mut Vec<Move>) {
        let row = king.color.home_row();
        if king.has_moved || from != Square::new(row, 4) {
            return;
        }
        for (rook_col, dir) in [(7u8, 1i8), (0u8, -1i8)] {
            let rook = board.piece_at(Square::new(row, rook_col));
            if !matches!(rook, Some(r) if r.piece == Piece::Rook && r.color == king.color && !r.has_moved) {
                continue;
            }
            let (lo, hi) = if rook_col > from.col {
                (from.col + 1, rook_col)
            } else {
                (rook_col + 1, from.col)
            };
            if (lo..hi).all(|col| board.piece_at(Square::new(row, col)).is_none()) {
                if let Some(to) = from.offset(0, 2 * dir) {
                    out.push(Move::new(from, to));
                }
            }
        }
    }

    /// Whether any piece of `attacker_color` could capture on `square`.
    ///
    /// Looks outwards from the target with raw piece geometry only, so it never
    /// goes through the legality filter. Pawns attack both forward diagonals,
    /// empty or not, and never the square straight ahead.
    pub fn is_square_under_attack(&self, board: &Board, square: Square, attacker_color: Color) -> bool {
        let is_attacker = |sq: Option<Square>, kinds: &[Piece]| {
            sq.and_then(|s| board.piece_at(s))
                .map_or(false, |p| p.color == attacker_color && kinds.contains(&p.piece))
        };

        // An attacking pawn sits one step behind the target, from its own point of view.
        let back = -attacker_color.pawn_direction();
        if is_attacker(square.offset(back, -1), &[Piece::Pawn])
            || is_attacker(square.offset(back, 1), &[Piece::Pawn])
        {
            return true;
        }

        if KNIGHT_OFFSETS
            .iter()
            .any(|&(dr, dc)| is_attacker(square.offset(dr, dc), &[Piece::Knight]))
        {
            return true;
        }

        if KING_OFFSETS
            .iter()
            .any(|&(dr, dc)| is_attacker(square.offset(dr, dc), &[Piece::King]))
        {
            return true;
        }

        let sliders = [
            (&ROOK_DIRECTIONS, [Piece::Rook, Piece::Queen]),
            (&BISHOP_DIRECTIONS, [Piece::Bishop, Piece::Queen]),
        ];
        for (directions, kinds) in sliders {
            for &(dr, dc) in directions {
                let mut current = square;
                while let Some(next) = current.offset(dr, dc) {
                    if let Some(p) = board.piece_at(next) {
                        if p.color == attacker_color && kinds.contains(&p.piece) {
                            return true;
                        }
                        break;
                    }
                    current = next;
                }
            }
        }

        false
    }

    pub fn is_king_in_check(&self, board: &Board, color: Color) -> bool {
        board
            .king_square(color)
            .map_or(false, |king| self.is_square_under_attack(board, king, color.opposite()))
    }

    /// Whether playing `mv` would leave the mover's own king attacked.
    pub fn leaves_king_attacked(&self, board: &Board, mv: Move) -> bool {
        let Some(mover) = board.piece_at(mv.from) else {
            return false;
        };

        if mover.piece == Piece::King && mv.from.col.abs_diff(mv.to.col) == 2 {
            let dir = if mv.to.col > mv.from.col { 1 } else { -1 };
            let path = [Some(mv.from), mv.from.offset(0, dir), mv.from.offset(0, 2 * dir)];
            let opponent = mover.color.opposite();
            if path
                .iter()
                .flatten()
                .any(|&sq| self.is_square_under_attack(board, sq, opponent))
            {
                return true;
            }
        }

        let mut scratch = *board;
        if scratch.make_move(mv).is_none() {
            return false;
        }
        self.is_king_in_check(&scratch, mover.color)
    }

    pub fn legal_moves_from(&self, board: &Board, from: Square) -> Vec<Move> {
        let mut moves = self.pseudo_legal_moves(board, from);
        moves.retain(|&mv| !self.leaves_king_attacked(board, mv));
        moves
    }

    /// Legal moves of every `color` piece, in row-major board order.
    pub fn legal_moves_for(&self, board: &Board, color: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for (square, _) in board.pieces(color) {
            moves.extend(self.legal_moves_from(board, square));
        }
        moves
    }

    /// Legal moves for the side to move.
    pub fn generate_moves(&self, board: &Board) -> Vec<Move> {
        self.legal_moves_for(board, board.side_to_move)
    }

    /// Stops at the first legal move found.
    pub fn has_legal_move(&self, board: &Board, color: Color) -> bool {
        let mut candidates = Vec::with_capacity(32);
        board.pieces(color).any(|(square, piece)| {
            candidates.clear();
            self.push_pseudo_legal(board, square, piece, &mut candidates);
            candidates.iter().any(|&mv| !self.leaves_king_attacked(board, mv))
        })
    }

    pub fn is_move_valid(&self, board: &Board, mv: &Move) -> bool {
        board.piece_at(mv.from).map_or(false, |p| p.color == board.side_to_move)
            && self
                .legal_moves_from(board, mv.from)
                .iter()
                .any(|m| m.to == mv.to)
    }

    pub fn is_checkmate(&self, board: &Board, color: Color) -> bool {
        self.is_king_in_check(board, color) && !self.has_legal_move(board, color)
    }

    pub fn is_stalemate(&self, board: &Board, color: Color) -> bool {
        !self.is_king_in_check(board, color) && !self.has_legal_move(board, color)
    }

    pub fn game_status(&self, board: &Board) -> GameStatus {
        let color = board.side_to_move;
        let in_check = self.is_king_in_check(board, color);
        match (in_check, self.has_legal_move(board, color)) {
            (true, false) => GameStatus::Checkmate {
                winner: color.opposite(),
            },
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check(color),
            (false, true) => GameStatus::Ongoing,
        }
    }
}

fn push_pawn_target(from: Square, to: Square, color: Color, out: &mut Vec<Move>) {
    if to.row == color.promotion_row() {
        out.push(Move::new_promotion(from, to, Piece::Queen));
    } else {
        out.push(Move::new(from, to));
    }
}

/// Leaf count of the legal move tree, walked with make/unmake.
///
/// Promotions are counted once each, as a queen.
pub fn perft(generator: &MoveGenerator, board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = generator.generate_moves(board);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in moves {
        if let Some(undo) = board.make_move(mv) {
            nodes += perft(generator, board, depth - 1);
            board.unmake_move(undo);
        }
    }
    nodes
}

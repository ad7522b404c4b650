use crate::board::{Board, Color, Piece};

/// Material-only scoring, positive when white is ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluator {
    pub pawn_value: i32,
    pub knight_value: i32,
    pub bishop_value: i32,
    pub rook_value: i32,
    pub queen_value: i32,
    pub king_value: i32,

    /// Score of a mated side. Must dominate any material balance.
    pub mate_score: i32,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            pawn_value: 1,
            knight_value: 3,
            bishop_value: 3,
            rook_value: 5,
            queen_value: 9,
            king_value: 1000,
            mate_score: 10000,
        }
    }

    pub fn piece_value(&self, piece: Piece) -> i32 {
        match piece {
            Piece::Pawn => self.pawn_value,
            Piece::Knight => self.knight_value,
            Piece::Bishop => self.bishop_value,
            Piece::Rook => self.rook_value,
            Piece::Queen => self.queen_value,
            Piece::King => self.king_value,
        }
    }

    pub fn evaluate(&self, board: &Board) -> i32 {
        let white: i32 = board
            .pieces(Color::White)
            .map(|(_, p)| self.piece_value(p.piece))
            .sum();
        let black: i32 = board
            .pieces(Color::Black)
            .map(|(_, p)| self.piece_value(p.piece))
            .sum();
        white - black
    }

    /// Score when `loser` has been checkmated.
    pub fn mated(&self, loser: Color) -> i32 {
        match loser {
            Color::White => -self.mate_score,
            Color::Black => self.mate_score,
        }
    }
}

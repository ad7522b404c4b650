pub mod board;
pub mod movegen;
pub mod evaluation;
pub mod search;
pub mod uci;

pub use board::{Board, BoardPiece, Color, MoveError, Piece, Square, SquareParseError};
pub use movegen::{GameStatus, Move, MoveGenerator};
pub use search::{Search, SearchResult};

/// Standard initial position, white to move.
pub fn new_game() -> Board {
    Board::new()
}

pub fn legal_moves_from(board: &Board, square: Square) -> Vec<Move> {
    MoveGenerator::new().legal_moves_from(board, square)
}

pub fn legal_moves_for(board: &Board, color: Color) -> Vec<Move> {
    MoveGenerator::new().legal_moves_for(board, color)
}

/// Non-mutating move application: returns the position after the move.
pub fn apply_move(
    board: &Board,
    from: Square,
    to: Square,
    promotion: Option<Piece>,
) -> Result<Board, MoveError> {
    let mut next = *board;
    next.apply_move(from, to, promotion)?;
    Ok(next)
}

pub fn is_in_check(board: &Board, color: Color) -> bool {
    MoveGenerator::new().is_king_in_check(board, color)
}

pub fn is_checkmate(board: &Board, color: Color) -> bool {
    MoveGenerator::new().is_checkmate(board, color)
}

pub fn is_stalemate(board: &Board, color: Color) -> bool {
    MoveGenerator::new().is_stalemate(board, color)
}

/// Best move for the side to move at a fixed depth, or `None` if it has no legal move.
pub fn best_move(board: &Board, depth: u32) -> Option<Move> {
    Search::with_depth(depth).find_best_move(board)
}

pub fn square_from_algebraic(text: &str) -> Result<Square, SquareParseError> {
    Square::from_algebraic(text)
}

pub fn square_to_algebraic(square: Square) -> String {
    square.to_algebraic()
}

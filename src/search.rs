use crate::board::{Board, Color};
use crate::evaluation::Evaluator;
use crate::movegen::{Move, MoveGenerator};

pub const DEFAULT_DEPTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    pub nodes: u64,
}

/// Fixed-depth minimax with alpha-beta pruning.
///
/// White maximizes, black minimizes. The tree is walked on a single scratch copy
/// of the position with make/unmake, and pawns reaching the last rank always
/// become queens.
pub struct Search {
    evaluator: Evaluator,
    move_generator: MoveGenerator,
    max_depth: u32,
    nodes_searched: u64,
}

impl Default for Search {
    fn default() -> Self {
        Search::new()
    }
}

impl Search {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    pub fn with_depth(depth: u32) -> Self {
        Self {
            evaluator: Evaluator::new(),
            move_generator: MoveGenerator::new(),
            max_depth: depth,
            nodes_searched: 0,
        }
    }

    pub fn find_best_move(&mut self, board: &Board) -> Option<Move> {
        self.search(board).best_move
    }

    /// Searches `max_depth` plies (at least one) from the side to move.
    /// `best_move` is `None` only when that side has no legal move.
    pub fn search(&mut self, board: &Board) -> SearchResult {
        self.nodes_searched = 0;

        let mut scratch = *board;
        let depth = self.max_depth.max(1);
        let (score, best_move) = self.minimax(&mut scratch, depth, i32::MIN, i32::MAX);

        SearchResult {
            best_move,
            score,
            nodes: self.nodes_searched,
        }
    }

    fn minimax(&mut self, board: &mut Board, depth: u32, mut alpha: i32, mut beta: i32) -> (i32, Option<Move>) {
        self.nodes_searched += 1;

        if depth == 0 {
            let side = board.side_to_move;
            if self.move_generator.has_legal_move(board, side) {
                return (self.evaluator.evaluate(board), None);
            }
            return (self.terminal_score(board), None);
        }

        let moves = self.move_generator.generate_moves(board);
        if moves.is_empty() {
            return (self.terminal_score(board), None);
        }

        let maximizing = board.side_to_move == Color::White;
        let mut best_score = if maximizing { i32::MIN } else { i32::MAX };
        let mut best_move = None;

        for mv in moves {
            let Some(undo) = board.make_move(mv) else {
                continue;
            };
            let (score, _) = self.minimax(board, depth - 1, alpha, beta);
            board.unmake_move(undo);

            if maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                beta = beta.min(score);
            }

            if beta <= alpha {
                break;
            }
        }

        (best_score, best_move)
    }

    /// Score of a position where the side to move has no legal move. Stalemate
    /// falls back to plain material.
    fn terminal_score(&self, board: &Board) -> i32 {
        let side = board.side_to_move;
        if self.move_generator.is_king_in_check(board, side) {
            self.evaluator.mated(side)
        } else {
            self.evaluator.evaluate(board)
        }
    }

    pub fn set_max_depth(&mut self, depth: u32) {
        self.max_depth = depth;
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn get_nodes_searched(&self) -> u64 {
        self.nodes_searched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn plain_minimax(board: &Board, depth: u32) -> (i32, Option<Move>) {
        let generator = MoveGenerator::new();
        let evaluator = Evaluator::new();
        let moves = generator.generate_moves(board);
        if moves.is_empty() {
            let side = board.side_to_move;
            let score = if generator.is_king_in_check(board, side) {
                evaluator.mated(side)
            } else {
                evaluator.evaluate(board)
            };
            return (score, None);
        }
        if depth == 0 {
            return (evaluator.evaluate(board), None);
        }
        let maximizing = board.side_to_move == Color::White;
        let mut best: Option<(i32, Move)> = None;
        for m in moves {
            let mut next = *board;
            next.make_move(m).unwrap();
            let (score, _) = plain_minimax(&next, depth - 1);
            let better = match best {
                None => true,
                Some((b, _)) if maximizing => score > b,
                Some((b, _)) => score < b,
            };
            if better {
                best = Some((score, m));
            }
        }
        let (score, m) = best.unwrap();
        (score, Some(m))
    }

    #[test]
    fn test_finds_back_rank_mate_for_white() {
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        for depth in 1..=3 {
            let result = Search::with_depth(depth).search(&board);
            assert_eq!(result.best_move, Some(mv("a1a8")), "depth {}", depth);
            assert_eq!(result.score, 10000);
        }
    }

    #[test]
    fn test_finds_back_rank_mate_for_black() {
        let board = Board::from_fen("r5k1/8/8/8/8/8/5PPP/6K1 b - - 0 1").unwrap();
        for depth in 1..=2 {
            let result = Search::with_depth(depth).search(&board);
            assert_eq!(result.best_move, Some(mv("a8a1")), "depth {}", depth);
            assert_eq!(result.score, -10000);
        }
    }

    #[test]
    fn test_wins_hanging_queen() {
        let board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let result = Search::with_depth(2).search(&board);
        assert_eq!(result.best_move, Some(mv("d2d5")));
        assert_eq!(result.score, 5);
    }

    #[test]
    fn test_no_move_when_mated() {
        let board = Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let result = Search::new().search(&board);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, -10000);
    }

    #[test]
    fn test_stalemate_scores_as_material() {
        let board = Board::from_fen("k7/8/1Q6/8/8/8/8/2K5 b - - 0 1").unwrap();
        let result = Search::new().search(&board);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, 9);
    }

    #[test]
    fn test_depth_zero_still_returns_a_move() {
        let board = Board::new();
        let mut search = Search::with_depth(0);
        assert!(search.find_best_move(&board).is_some());
        assert_eq!(search.max_depth(), 0);
    }

    #[test]
    fn test_promotes_to_queen() {
        let board = Board::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let result = Search::with_depth(1).search(&board);
        let best = result.best_move.unwrap();
        assert_eq!(best.from, Square::from_algebraic("a7").unwrap());
        assert_eq!(best.promotion, Some(crate::board::Piece::Queen));
        assert_eq!(result.score, 9);
    }

    #[test]
    fn test_search_leaves_board_untouched() {
        let board = Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
            .unwrap();
        let before = board;
        let mut search = Search::new();
        let result = search.search(&board);
        assert_eq!(board, before);
        assert!(result.best_move.is_some());
        assert!(result.nodes > 0);
        assert_eq!(search.get_nodes_searched(), result.nodes);
    }

    #[test]
    fn test_pruning_matches_plain_minimax() {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r1bqkbnr/pppp1ppp/2n5/4p3/3PP3/5N2/PPP2PPP/RNBQKB1R b KQkq - 0 3",
            "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            for depth in 1..=2 {
                let pruned = Search::with_depth(depth).search(&board);
                assert_eq!(
                    (pruned.score, pruned.best_move),
                    plain_minimax(&board, depth),
                    "{} at depth {}",
                    fen,
                    depth
                );
            }
        }
    }
}

//! Tests for board generation, moves, solvability and win detection.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tilerace_puzzle::{Board, BoardError, MoveCode};

fn goal_3x3() -> Board {
    Board::from_cells(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 0]]).unwrap()
}

#[test]
fn test_generated_boards_are_solvable_permutations() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        for (width, height) in [(2, 2), (3, 3), (4, 3), (2, 5)] {
            let board = Board::new_solvable(width, height, &mut rng).unwrap();
            assert!(board.is_solvable());
            assert_eq!(board.width(), width);
            assert_eq!(board.height(), height);
            // Re-validating the cells proves the permutation invariant.
            let copy = Board::from_cells(board.cells().to_vec()).unwrap();
            assert_eq!(copy, board);
            // The empty marker points at the 0 cell.
            let (x, y) = board.empty();
            assert_eq!(board.cells()[y][x], 0);
        }
    }
}

#[test]
fn test_generation_rejects_zero_dimensions() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(
        Board::generate(0, 3, &mut rng),
        Err(BoardError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        Board::new_solvable(3, 0, &mut rng),
        Err(BoardError::InvalidDimensions { .. })
    ));
}

#[test]
fn test_goal_board_has_won() {
    let board = goal_3x3();
    assert!(board.has_won());
    assert_eq!(board.empty(), (2, 2));
}

#[test]
fn test_almost_goal_board_has_not_won() {
    let board =
        Board::from_cells(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 0, 8]]).unwrap();
    assert!(!board.has_won());
}

#[test]
fn test_slide_from_bottom_right_corner() {
    // Empty at (2, 2): moving the empty up is legal, down leaves the board.
    let mut board = goal_3x3();
    assert!(board.slide(0, -1));
    assert_eq!(board.empty(), (2, 1));

    let mut board = goal_3x3();
    assert!(!board.slide(0, 1));
    assert!(!board.slide(1, 0));
    assert_eq!(board, goal_3x3());
}

#[test]
fn test_blocked_slide_leaves_cells_unchanged() {
    let mut board =
        Board::from_cells(vec![vec![0, 2, 3], vec![4, 5, 6], vec![7, 8, 1]]).unwrap();
    let before = board.clone();
    assert!(!board.slide(-1, 0));
    assert!(!board.slide(0, -1));
    assert_eq!(board, before);
    assert!(board.slide(1, 0));
    assert_eq!(board.empty(), (1, 0));
    assert_eq!(board.cells()[0][0], 2);
}

#[test]
fn test_successful_slide_preserves_permutation() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut board = Board::new_solvable(3, 3, &mut rng).unwrap();
    for code in [MoveCode::Up, MoveCode::Right, MoveCode::Down, MoveCode::Left] {
        let before = board.clone();
        let moved = board.apply_code(code);
        if moved {
            assert!(Board::from_cells(board.cells().to_vec()).is_ok());
            assert_ne!(board, before);
        } else {
            assert_eq!(board, before);
        }
    }
}

#[test]
fn test_apply_code_matches_original_mapping() {
    // UP=1 moves the empty up, DOWN=3 down, per the fixed wire mapping.
    let mut board = goal_3x3();
    assert!(board.apply_code(MoveCode::Up));
    let mut board = goal_3x3();
    assert!(!board.apply_code(MoveCode::Down));
    let mut board = goal_3x3();
    assert!(!board.apply_code(MoveCode::Right));
    let mut board = goal_3x3();
    assert!(board.apply_code(MoveCode::Left));
}

#[test]
fn test_won_code_is_not_a_move() {
    let mut board = goal_3x3();
    assert!(!board.apply_code(MoveCode::Won));
    assert_eq!(board, goal_3x3());
}

#[test]
fn test_same_sequence_keeps_copies_identical() {
    let mut rng = StdRng::seed_from_u64(42);
    let original = Board::new_solvable(4, 3, &mut rng).unwrap();
    let mut a = original.clone();
    let mut b = original;
    let sequence = [
        MoveCode::Up,
        MoveCode::Left,
        MoveCode::Left,
        MoveCode::Down,
        MoveCode::Right,
        MoveCode::Up,
        MoveCode::Right,
        MoveCode::Down,
    ];
    for code in sequence {
        assert_eq!(a.apply_code(code), b.apply_code(code));
        assert_eq!(a, b);
    }
}

#[test]
fn test_one_by_one_board_is_immediately_won() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut board = Board::new_solvable(1, 1, &mut rng).unwrap();
    assert!(board.has_won());
    assert!(board.is_solvable());
    for code in [MoveCode::Up, MoveCode::Right, MoveCode::Down, MoveCode::Left] {
        assert!(!board.apply_code(code));
    }
}

#[test]
fn test_from_cells_rejects_bad_grids() {
    assert!(matches!(
        Board::from_cells(vec![]),
        Err(BoardError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        Board::from_cells(vec![vec![0, 1], vec![2]]),
        Err(BoardError::NotRectangular)
    ));
    assert!(matches!(
        Board::from_cells(vec![vec![1, 1], vec![2, 0]]),
        Err(BoardError::NotAPermutation { .. })
    ));
    assert!(matches!(
        Board::from_cells(vec![vec![1, 9], vec![2, 0]]),
        Err(BoardError::NotAPermutation { .. })
    ));
    // Missing zero means some value repeats or overflows the range.
    assert!(matches!(
        Board::from_cells(vec![vec![1, 2], vec![3, 3]]),
        Err(BoardError::NotAPermutation { .. })
    ));
}

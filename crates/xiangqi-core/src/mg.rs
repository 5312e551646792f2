use arrayvec::ArrayVec;
use xiangqi_bootstrap::{BitBoard, Square};

use crate::{board::Board, index, repr::Move};

/// The most moves any position reachable from the standard starting setup
/// can produce; two rooks and two cannons contribute at most 17 each.
pub const MAX_MOVES: usize = 128;

/// The move list filled by generation.
pub type Moves = ArrayVec<Move, MAX_MOVES>;

// A slider blocker is a king line an enemy cannon, rook or king aims along:
// the squares between king and sniper, the sniper itself, and the number of
// pieces on the line that turns the sniper's attack on. Rooks and kings
// attack along an empty line (limit 0); a cannon attacks over exactly one
// screen (limit 1).
type SliderBlockers = ArrayVec<(BitBoard, BitBoard, u32), 32>;

// A knight blocker is an own piece square hobbling an enemy knight's jump
// onto the king, paired with that knight when it is unique, since the
// hobbled piece may still capture it.
type KnightBlockers = ArrayVec<(BitBoard, BitBoard), 4>;

/// Appends every move that follows the piece movement rules, ignoring
/// check, restricted to origins in `from_mask` and targets in `to_mask`.
pub(crate) fn pseudo_legal_moves(
    board: &Board,
    from_mask: BitBoard,
    to_mask: BitBoard,
    moves: &mut Moves,
) {
    let ours = board.occupied_co[board.turn];

    for origin in (ours & from_mask).bits() {
        let targets = (board.attacks_mask(origin) - ours) & to_mask;

        for target in targets.bits() {
            moves.push(Move::new(origin, target));
        }
    }
}

fn slider_blockers(board: &Board, king: Square) -> SliderBlockers {
    let rays = index::rook_attacks(king, BitBoard::EMPTY);
    let them = board.occupied_co[!board.turn];
    let mut blockers = SliderBlockers::new();

    for sniper in (rays & board.cannons & them).bits() {
        let mask = index::between(king, sniper);

        // Zero pieces between is the open-line cannon (anything stepping in
        // becomes its screen), one is a checking cannon (its screen may not
        // slide along the line), two a screened pin. Three or more cannot
        // turn into a check within a single move.
        if (mask & board.occupied).count_ones() <= 2 {
            blockers.push((mask, BitBoard::from(sniper), 1));
        }
    }

    for sniper in (rays & (board.rooks | board.kings) & them).bits() {
        let mask = index::between(king, sniper);

        if (mask & board.occupied).count_ones() == 1 {
            blockers.push((mask, BitBoard::from(sniper), 0));
        }
    }

    blockers
}

fn knight_blockers(board: &Board, king: Square) -> KnightBlockers {
    let knights = board.knights & board.occupied_co[!board.turn];
    let ours = board.occupied_co[board.turn];
    let mut blockers = KnightBlockers::new();

    for (j, leg) in index::reversed_leg_squares(king).into_iter().enumerate() {
        if (ours & leg).is_empty() {
            continue;
        }

        let attackers = index::knight_attackers_through_leg(king, j) & knights;
        if attackers.is_any() {
            // With two knights sharing the leg, no capture lifts the pin.
            let attacker = if attackers.count_ones() == 1 {
                attackers
            } else {
                BitBoard::EMPTY
            };
            blockers.push((leg, attacker));
        }
    }

    blockers
}

// The pin predicate: decides whether a candidate move leaves the own king
// unattacked, without materializing the post-move board.
fn is_safe(
    board: &Board,
    king: Square,
    sliders: &SliderBlockers,
    knights: &KnightBlockers,
    m: Move,
) -> bool {
    if m.origin == king {
        // Rook and cannon threats must see through the vacated king square,
        // so the king is removed from the occupancy before asking.
        let occupied = board.occupied - BitBoard::from(king);
        return board
            .attackers_mask_occupied(!board.turn, m.target, occupied)
            .is_empty();
    }

    let origin = BitBoard::from(m.origin);
    let target = BitBoard::from(m.target);

    for &(leg, attacker) in knights {
        if (leg & origin).is_any() && (target & attacker).is_empty() {
            return false;
        }
    }

    for &(mask, sniper, limit) in sliders {
        if ((mask & origin) | (mask & target)).is_any() && (sniper & target).is_empty() {
            // The piece count on the line after the move; capturing the
            // sniper itself was excluded above.
            let after = ((board.occupied & mask) - origin) | (target & mask);
            if after.count_ones() == limit {
                return false;
            }
        }
    }

    true
}

// Candidate moves while in check. Everything yielded still runs through
// `is_safe`; this only narrows the move set to king steps, captures of the
// checker, blocks and screen dismantling.
fn evasions(
    board: &Board,
    king: Square,
    checkers: BitBoard,
    from_mask: BitBoard,
    to_mask: BitBoard,
    moves: &mut Moves,
) {
    // Squares along a checker's line the king cannot step to: a rook keeps
    // attacking through the vacated king square, and a cannon keeps
    // attacking everything on the near side of its screen.
    let mut attacked = BitBoard::EMPTY;

    for checker in (checkers & board.rooks).bits() {
        attacked |= index::line(king, checker) - BitBoard::from(checker);
    }

    for checker in (checkers & board.cannons).bits() {
        let screen = index::between(king, checker) & board.occupied;
        let span = match screen.highest_one() {
            Some(screen_square) => index::between(screen_square, checker) | screen,
            None => BitBoard::EMPTY,
        };
        attacked |= (index::line(king, checker) - span) - BitBoard::from(checker);
    }

    if (BitBoard::from(king) & from_mask).is_any() {
        let ours = board.occupied_co[board.turn];
        let steps = ((index::king_attacks(king) - ours) - attacked) & to_mask;

        for target in steps.bits() {
            moves.push(Move::new(king, target));
        }
    }

    match checkers.count_ones() {
        1 => {
            let checker = checkers.highest_one().unwrap();

            if (checkers & (board.rooks | board.kings | board.pawns)).is_any() {
                // Capture the checker or block its line. Pawns and kings
                // check from adjacent squares, so for them the between-span
                // is empty and only the capture remains.
                let targets = index::between(king, checker) | checkers;
                pseudo_legal_moves(board, !board.kings & from_mask, targets & to_mask, moves);
            } else if (checkers & board.cannons).is_any() {
                let targets = (index::between(king, checker) - board.occupied) | checkers;
                pseudo_legal_moves(
                    board,
                    (!board.kings & from_mask) - targets,
                    targets & to_mask,
                    moves,
                );

                // Dismantle the screen: its piece may also step off the
                // line, leaving the cannon with nothing to fire over.
                let screen = index::between(king, checker) & board.occupied;
                pseudo_legal_moves(
                    board,
                    !board.kings & from_mask & screen,
                    (!targets) & to_mask,
                    moves,
                );
            } else if (checkers & board.knights).is_any() {
                // Hobble the knight's leg or capture the knight.
                let targets = index::knight_blocker(king, checker) | checkers;
                pseudo_legal_moves(board, !board.kings & from_mask, targets & to_mask, moves);
            }
        }
        2 => {
            // Only the rook+cannon double check along one line with the
            // king outside the rook-cannon span admits non-king moves: a
            // block of the rook line also thickens the cannon's screen.
            let cannon = (checkers & board.cannons).highest_one();
            let rook = (checkers & board.rooks).highest_one();

            if let (Some(cannon), Some(rook)) = (cannon, rook) {
                if (index::line(cannon, rook) & BitBoard::from(king)).is_any()
                    && (index::between(cannon, rook) & BitBoard::from(king)).is_empty()
                {
                    pseudo_legal_moves(
                        board,
                        !board.kings & from_mask,
                        index::between(king, rook) & to_mask,
                        moves,
                    );
                }
            }
        }
        _ => {}
    }
}

/// Every legal move with origin in `from_mask` and target in `to_mask`.
/// Without a king to protect this degenerates to pseudo-legal generation.
pub(crate) fn legal_moves(board: &Board, from_mask: BitBoard, to_mask: BitBoard) -> Moves {
    let mut moves = Moves::new();

    let Some(king) = board.king(board.turn) else {
        pseudo_legal_moves(board, from_mask, to_mask, &mut moves);
        return moves;
    };

    let sliders = slider_blockers(board, king);
    let knights = knight_blockers(board, king);
    let checkers = board.attackers_mask(!board.turn, king);

    let mut candidates = Moves::new();
    if checkers.is_any() {
        evasions(board, king, checkers, from_mask, to_mask, &mut candidates);
    } else {
        pseudo_legal_moves(board, from_mask, to_mask, &mut candidates);
    }

    for m in candidates {
        if is_safe(board, king, &sliders, &knights, m) {
            moves.push(m);
        }
    }

    moves
}

/// Whether playing the pseudo-legal move `m` would leave the own king in
/// check.
pub(crate) fn is_into_check(board: &Board, m: Move) -> bool {
    let Some(king) = board.king(board.turn) else {
        return false;
    };

    let checkers = board.attackers_mask(!board.turn, king);
    if checkers.is_any() {
        let mut candidates = Moves::new();
        evasions(
            board,
            king,
            checkers,
            BitBoard::from(m.origin),
            BitBoard::from(m.target),
            &mut candidates,
        );

        if !candidates.contains(&m) {
            return true;
        }
    }

    !is_safe(
        board,
        king,
        &slider_blockers(board, king),
        &knight_blockers(board, king),
        m,
    )
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, str::FromStr};

    use test_case::test_case;
    use xiangqi_bootstrap::Color;

    use super::*;
    use crate::repr::{Piece, PieceKind};

    fn moves_of(board: &Board) -> BTreeSet<String> {
        board.legal_moves().iter().map(|m| m.iccs()).collect()
    }

    #[test]
    fn starting_position_has_44_moves() {
        let board = Board::starting_position();
        assert_eq!(board.legal_moves().len(), 44);
        assert!(!board.is_check());
    }

    #[test]
    fn no_legal_move_leaves_the_king_attacked() {
        let mut board = Board::starting_position();
        let mover = board.turn;

        for m in board.legal_moves() {
            board.push(m);
            let king = board.king(mover).unwrap();
            assert!(
                board.attackers_mask(!mover, king).is_empty(),
                "{m} leaves the king attacked"
            );
            board.pop();
        }
    }

    #[test]
    fn flying_generals_confine_the_kings() {
        let board = Board::from_str("4k4/9/9/9/9/9/9/9/9/4K4 w - - 0 1").unwrap();

        // Facing kings attack each other, so this position already counts
        // as check and the red king must leave the file.
        assert!(board.is_check());
        assert_eq!(
            moves_of(&board),
            BTreeSet::from([String::from("e0d0"), String::from("e0f0")])
        );
        assert!(!board.is_legal(Move::new(Square::E0, Square::E1)));
        assert!(board.is_attacked_by(Color::Black, Square::E0));
    }

    #[test]
    fn cannon_checks_need_exactly_one_screen() {
        let mut board = Board::from_str("3k5/9/9/9/9/9/9/9/9/3K3c1 w - - 0 1").unwrap();

        // Open line between the cannon on h0 and the king on d0: no screen,
        // no check.
        assert!(!board.is_check());

        // One screen turns the threat on.
        board.set_piece_at(
            Square::F0,
            Piece {
                kind: PieceKind::Rook,
                color: Color::Red,
            },
        );
        assert!(board.is_check());

        // A second screen turns it off again.
        board.set_piece_at(
            Square::G0,
            Piece {
                kind: PieceKind::Advisor,
                color: Color::Black,
            },
        );
        assert!(!board.is_check());
    }

    #[test]
    fn rook_does_not_attack_through_a_screen() {
        let board = Board::from_str("3k5/9/9/3c5/9/9/9/3R5/9/3K5 w - - 0 1").unwrap();

        // The cannon on d6 fires over the rook on d2 at the red king.
        assert!(board.is_check());
        assert_eq!(
            board.checkers_mask(),
            BitBoard::from(Square::D6),
        );

        // The rook reaches the cannon but not the black king behind it.
        assert!(board.attacks_mask(Square::D2).get_bit(Square::D6));
        assert!(!board.attacks_mask(Square::D2).get_bit(Square::D9));
        assert!(!board.is_attacked_by(Color::Red, Square::D9));
    }

    #[test]
    fn screen_of_a_checking_cannon_may_leave_but_not_slide() {
        let board = Board::from_str("3k5/9/9/3c5/9/9/9/3R5/9/3K5 w - - 0 1").unwrap();

        // The screen rook may capture the cannon or step off the d-file.
        assert!(board.is_legal(Move::new(Square::D2, Square::D6)));
        assert!(board.is_legal(Move::new(Square::D2, Square::E2)));
        assert!(board.is_legal(Move::new(Square::D2, Square::A2)));

        // Sliding along the check line keeps the screen count at one.
        assert!(!board.is_legal(Move::new(Square::D2, Square::D3)));
        assert!(!board.is_legal(Move::new(Square::D2, Square::D1)));

        for m in board.legal_moves() {
            assert!(board.is_legal(m));
        }
    }

    #[test]
    fn knight_leg_pin_allows_only_the_capture() {
        let board = Board::from_str("4k4/9/9/9/9/9/9/3n5/3R5/4K4 w - - 0 1").unwrap();

        // The rook on d1 hobbles the knight on d2; leaving the leg would
        // expose the king, so its only move is taking the knight.
        assert!(!board.is_check());
        let rook_moves: Vec<Move> = board
            .generate_legal_moves(BitBoard::from(Square::D1), BitBoard::IN_BOARD)
            .into_iter()
            .collect();
        assert_eq!(rook_moves, vec![Move::new(Square::D1, Square::D2)]);

        assert!(!board.is_legal(Move::new(Square::D1, Square::D0)));
        assert!(!board.is_legal(Move::new(Square::D1, Square::A1)));
    }

    #[test]
    fn rook_and_cannon_double_check_on_one_line() {
        let board = Board::from_str("3kc4/9/9/9/9/4r4/9/9/R8/4K4 w - - 0 1").unwrap();

        // The rook on e4 checks directly; the cannon on e9 fires over it.
        // The king stands on their line but outside their span, so blocking
        // the rook also thickens the cannon's screen.
        assert_eq!(board.checkers_mask().count_ones(), 2);
        assert_eq!(
            moves_of(&board),
            BTreeSet::from([String::from("a1e1"), String::from("e0f0")])
        );

        // d0 would face the black king on the d-file.
        assert!(!board.is_legal(Move::new(Square::E0, Square::D0)));
        // A random rook retreat ignores the double check.
        assert!(!board.is_legal(Move::new(Square::A1, Square::A8)));
    }

    #[test]
    fn knight_check_evasions_include_the_capture() {
        // A black knight on d2 jumps over the empty d1 leg onto e0; red may
        // block the leg or take the knight.
        let board = Board::from_str("4k4/9/9/9/9/9/9/3n5/R8/4K4 w - - 0 1").unwrap();

        assert!(board.is_check());
        assert!(board.is_legal(Move::new(Square::A1, Square::D1)));
        assert!(!board.is_legal(Move::new(Square::A1, Square::A2)));

        let board = Board::from_str("4k4/9/9/9/9/9/9/3n5/2R6/4K4 w - - 0 1").unwrap();
        assert!(board.is_legal(Move::new(Square::C1, Square::D1)));
        assert!(!board.is_legal(Move::new(Square::C1, Square::C2)));

        let board = Board::from_str("4k4/9/9/9/9/9/9/3n5/9/R3K4 w - - 0 1").unwrap();
        assert!(!board.is_legal(Move::new(Square::A0, Square::A2)));
        // The rook can reach neither the leg nor the knight in one move,
        // so only king steps remain.
        let evasion_count = board.legal_moves().len();
        let king_moves = board
            .generate_legal_moves(BitBoard::from(Square::E0), BitBoard::IN_BOARD)
            .len();
        assert_eq!(evasion_count, king_moves);
    }

    #[test]
    fn pawn_check_evasions_include_the_capture() {
        // A black pawn on e1 checks the red king; the rook takes it.
        let board = Board::from_str("4k4/9/9/9/9/9/9/9/R3p4/4K4 w - - 0 1").unwrap();

        assert!(board.is_check());
        assert!(board.is_legal(Move::new(Square::A1, Square::E1)));
        assert!(!board.is_legal(Move::new(Square::A1, Square::A2)));
    }

    #[test]
    fn checkmate_and_stalemate_are_distinguished() {
        // Rook supported by two pawns smothers the bare king.
        let mate = Board::from_str("4k4/3PRP3/9/9/9/9/9/9/9/4K4 b - - 0 1").unwrap();
        assert!(mate.is_check());
        assert!(mate.legal_moves().is_empty());
        assert!(mate.is_checkmate());

        // The same rook without support can be evaded sideways; capturing
        // it is barred by the facing red king behind it.
        let escapable = Board::from_str("4k4/4R4/9/9/9/9/9/9/9/4K4 b - - 0 1").unwrap();
        assert!(escapable.is_check());
        assert!(!escapable.is_checkmate());
        assert!(!escapable.is_legal(Move::new(Square::E9, Square::E8)));
        assert!(escapable.is_legal(Move::new(Square::E9, Square::D9)));

        // No check and no move: a stalemate is not a checkmate here.
        let stalemate = Board::from_str("3k5/R8/9/9/9/9/9/9/4R4/5K3 b - - 0 1").unwrap();
        assert!(!stalemate.is_check());
        assert!(stalemate.legal_moves().is_empty());
        assert!(!stalemate.is_checkmate());
    }

    #[test]
    fn empty_cannon_line_pins_interventions() {
        // The cannon on e9 aims at the red king along an empty file; any
        // red piece stepping onto the file would become its screen.
        let board = Board::from_str("3kc4/9/9/9/9/9/9/9/R8/4K4 w - - 0 1").unwrap();

        assert!(!board.is_check());
        assert!(!board.is_legal(Move::new(Square::A1, Square::E1)));
        assert!(board.is_legal(Move::new(Square::A1, Square::B1)));
        // Stepping onto the file is fine for the king itself: a cannon
        // without a screen attacks nothing.
        assert!(board.is_legal(Move::new(Square::E0, Square::E1)));
    }

    #[test]
    fn screened_cannon_pin_holds_the_screens() {
        // Cannon on e9, red advisor e1 and knight e4 between: moving either
        // piece off the file (or capturing the other) leaves one screen and
        // opens the check.
        let board = Board::from_str("3kc4/9/9/9/9/4N4/9/9/4A4/4K4 w - - 0 1").unwrap();

        assert!(!board.is_check());
        assert!(!board.is_legal(Move::new(Square::E4, Square::D2)));
        assert!(!board.is_legal(Move::new(Square::E1, Square::D2)));
        // Capturing the cannon with the knight keeps the king safe: e4 to
        // e9 is no knight move, so check the knight jump that lands there.
        let knight_moves =
            board.generate_legal_moves(BitBoard::from(Square::E4), BitBoard::IN_BOARD);
        assert!(knight_moves.is_empty());
    }

    #[test_case("rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1"; "start for red")]
    #[test_case("rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR b - - 0 1"; "start for black")]
    #[test_case("3kc4/9/9/9/9/9/9/9/R8/4K4 w - - 0 1"; "open cannon line")]
    #[test_case("3k5/9/9/3c5/9/9/9/3R5/9/3K5 w - - 0 1"; "checking cannon")]
    #[test_case("4k4/9/9/9/9/9/9/3n5/3R5/4K4 w - - 0 1"; "knight leg pin")]
    #[test_case("3kc4/9/9/9/9/4r4/9/9/R8/4K4 w - - 0 1"; "double check")]
    fn generator_and_is_legal_agree(fen: &str) {
        let board = Board::from_str(fen).unwrap();
        let generated: BTreeSet<Move> = board.legal_moves().into_iter().collect();

        for &origin in Square::IN_BOARD.iter() {
            for &target in Square::IN_BOARD.iter() {
                let m = Move::new(origin, target);
                assert_eq!(
                    board.is_legal(m),
                    generated.contains(&m),
                    "disagreement on {m}"
                );
            }
        }
    }
}

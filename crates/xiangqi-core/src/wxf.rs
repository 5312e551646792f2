//! WXF and Chinese move notation.
//!
//! A WXF move is four characters: the piece letter, an origin tag (a file
//! number from the mover's viewpoint, or a position tag when several pieces
//! of the kind share a file), an action (`+` advance, `-` retreat, `.`
//! traverse) and a target (a destination file for pieces that change file
//! diagonally and for traverses, a square count for straight moves).

use xiangqi_bootstrap::{BitBoard, Color, Square};

use crate::{
    board::Board,
    index,
    repr::{Move, Piece, PieceKind},
};

const CHINESE_NUMBERS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// WXF file number of a square: both players label the files 1..9 starting
/// from their own right-hand side.
fn file_wxf(square: Square, color: Color) -> usize {
    match color {
        Color::Black => square.file() - 2,
        Color::Red => 10 - (square.file() - 2),
    }
}

fn position_name(tag: char) -> Option<char> {
    match tag {
        '+' => Some('前'),
        '-' => Some('后'),
        '.' => Some('中'),
        'a' => Some('一'),
        'b' => Some('二'),
        'c' => Some('三'),
        'd' => Some('四'),
        'e' => Some('五'),
        _ => None,
    }
}

fn action_name(action: char) -> char {
    match action {
        '.' => '平',
        '+' => '进',
        _ => '退',
    }
}

// Red renders numbers as Chinese numerals, black keeps Arabic digits.
fn number_name(digit: char, color: Color) -> char {
    match color {
        Color::Red => CHINESE_NUMBERS[digit.to_digit(10).unwrap() as usize - 1],
        Color::Black => digit,
    }
}

impl Board {
    /// Renders a move of the side to move in WXF notation.
    ///
    /// # Panics
    /// Panics when the origin square is empty; rendering is defined for
    /// pseudo-legal moves only.
    pub fn wxf(&self, m: Move) -> String {
        let Some(kind) = self.piece_type_at(m.origin) else {
            panic!(
                "wxf expects a piece on the origin square, got {m} in {}",
                self.board_fen()
            );
        };

        let origin_bb = BitBoard::from(m.origin);
        let from_file = file_wxf(m.origin, self.turn);
        let to_file = file_wxf(m.target, self.turn);

        // From red's chair "up the board" means up the grid; from black's
        // the two flip.
        let (plus, minus) = match self.turn {
            Color::Red => ('+', '-'),
            Color::Black => ('-', '+'),
        };

        let mut result = String::new();
        result.push(kind.symbol());

        match kind {
            // Advisors and bishops travel fixed diagonals; the origin file
            // alone identifies the piece.
            PieceKind::Advisor | PieceKind::Bishop => {
                result.push_str(&from_file.to_string());
            }
            PieceKind::Pawn => {
                let own_pawns = self.pieces_mask(PieceKind::Pawn, self.turn);
                let shared = own_pawns & (BitBoard::FILES[m.origin.file()] - origin_bb);

                if shared.is_empty() {
                    result.push_str(&from_file.to_string());
                } else {
                    // Pawns from every multi-pawn file, collected from the
                    // mover's right, front pawn of each file first.
                    let mut pawns: Vec<Square> = Vec::new();
                    for file in (0..16).rev() {
                        let file_pawns = own_pawns & BitBoard::FILES[file];
                        if file_pawns.count_ones() > 1 {
                            pawns.extend(file_pawns.bits());
                        }
                    }

                    let position = pawns
                        .iter()
                        .position(|&pawn| pawn == m.origin)
                        .expect("the origin file holds several pawns");

                    match pawns.len() {
                        2 => result.push([plus, minus][position]),
                        3 => result.push([plus, '.', minus][position]),
                        _ => {
                            let letters = ['a', 'b', 'c', 'd', 'e'];
                            result.push(match self.turn {
                                Color::Red => letters[position],
                                Color::Black => letters[pawns.len() - 1 - position],
                            });
                        }
                    }
                }
            }
            _ => {
                let shared =
                    self.pieces_mask(kind, self.turn) & (BitBoard::FILES[m.origin.file()] - origin_bb);

                if let Some(other) = shared.highest_one() {
                    result.push(if other < m.origin { plus } else { minus });
                } else {
                    result.push_str(&from_file.to_string());
                }
            }
        }

        match kind {
            // Pieces that change file on every move name their destination
            // file.
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Advisor => {
                result.push(if m.origin < m.target { plus } else { minus });
                result.push_str(&to_file.to_string());
            }
            _ => {
                if m.origin.as_index().abs_diff(m.target.as_index()) > 15 {
                    let offset = index::between(m.origin, m.target).count_ones() + 1;
                    result.push(if m.origin > m.target { minus } else { plus });
                    result.push_str(&offset.to_string());
                } else {
                    result.push('.');
                    result.push_str(&to_file.to_string());
                }
            }
        }

        result
    }

    /// Renders a move of the side to move in Chinese notation, optionally
    /// with full-width digits for black's numbers.
    pub fn chinese_move(&self, m: Move, full_width: bool) -> String {
        let wxf = self.wxf(m);
        let mut tags = wxf.chars();
        let piece_tag = tags.next().expect("wxf moves have four characters");
        let origin_tag = tags.next().expect("wxf moves have four characters");
        let action_tag = tags.next().expect("wxf moves have four characters");
        let target_tag = tags.next().expect("wxf moves have four characters");

        let piece = Piece {
            kind: PieceKind::try_from(piece_tag).expect("wxf moves start with a piece letter"),
            color: self.turn,
        };

        let mut build = String::new();

        match position_name(origin_tag) {
            Some(position) => {
                build.push(position);
                build.push(piece.chinese());
            }
            None => {
                build.push(piece.chinese());
                build.push(number_name(origin_tag, self.turn));
            }
        }

        build.push(action_name(action_tag));
        build.push(number_name(target_tag, self.turn));

        if full_width {
            build = build
                .chars()
                .map(|c| match c {
                    '1'..='9' => {
                        char::from_u32('１' as u32 + c as u32 - '1' as u32).expect("digit offset")
                    }
                    _ => c,
                })
                .collect();
        }

        build
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;

    fn parse(iccs: &str) -> Move {
        iccs.parse().unwrap()
    }

    #[test_case("h2e2", "c2.5", "炮二平五"; "center cannon")]
    #[test_case("b2e2", "c8.5", "炮八平五"; "other cannon")]
    #[test_case("h0g2", "n2+3", "马二进三"; "knight development")]
    #[test_case("f0e1", "a4+5", "仕四进五"; "advisor up")]
    #[test_case("c0e2", "b7+5", "相七进五"; "bishop center")]
    #[test_case("i0i1", "r1+1", "车一进一"; "rook up one")]
    #[test_case("a0a2", "r9+2", "车九进二"; "rook up two")]
    fn red_moves_from_the_start(iccs: &str, wxf: &str, chinese: &str) {
        let board = Board::starting_position();
        let m = parse(iccs);

        assert_eq!(board.wxf(m), wxf);
        assert_eq!(board.chinese_move(m, false), chinese);
    }

    #[test]
    fn black_moves_use_arabic_numbers() {
        let mut board = Board::starting_position();
        board.push_iccs("h2e2").unwrap();

        let m = parse("h7e7");
        assert_eq!(board.wxf(m), "c8.5");
        assert_eq!(board.chinese_move(m, false), "砲8平5");
        assert_eq!(board.chinese_move(m, true), "砲８平５");
    }

    #[test]
    fn doubled_rooks_disambiguate_by_rank() {
        // Red rooks on a0 and a4 share the a-file.
        let board = Board::from_str("4k4/9/9/9/9/R8/9/9/9/R3K4 w - - 0 1").unwrap();

        assert_eq!(board.wxf(parse("a4a6")), "r++2");
        assert_eq!(board.wxf(parse("a0a1")), "r-+1");
        assert_eq!(board.chinese_move(parse("a4a6"), false), "前车进二");
        assert_eq!(board.chinese_move(parse("a0a1"), false), "后车进一");
    }

    #[test]
    fn two_pawns_on_a_file() {
        let board = Board::from_str("4k4/9/9/9/4P4/4P4/9/9/9/4K4 w - - 0 1").unwrap();

        assert_eq!(board.wxf(parse("e5e6")), "p++1");
        assert_eq!(board.wxf(parse("e4e5")), "p-+1");
    }

    #[test]
    fn three_pawns_on_a_file() {
        let board = Board::from_str("4k4/9/9/9/4P4/4P4/4P4/9/9/4K4 w - - 0 1").unwrap();

        // Front, middle and rear from red's viewpoint.
        assert_eq!(board.wxf(parse("e5e6")).chars().nth(1), Some('+'));
        assert_eq!(board.wxf(parse("e4e5")).chars().nth(1), Some('.'));
        assert_eq!(board.wxf(parse("e3e4")).chars().nth(1), Some('-'));

        assert_eq!(board.chinese_move(parse("e4e5"), false), "中兵进一");
    }

    #[test]
    fn many_pawns_use_position_letters() {
        // Two doubled files: g-pawns come first, counted from red's right.
        let board = Board::from_str("4k4/9/9/9/4P1P2/4P1P2/9/9/9/4K4 w - - 0 1").unwrap();

        assert_eq!(board.wxf(parse("g5g6")).chars().nth(1), Some('a'));
        assert_eq!(board.wxf(parse("g4g5")).chars().nth(1), Some('b'));
        assert_eq!(board.wxf(parse("e5e6")).chars().nth(1), Some('c'));
        assert_eq!(board.wxf(parse("e4e5")).chars().nth(1), Some('d'));
    }

    #[test]
    fn black_pawn_pair_counts_from_its_own_side() {
        // Black pawns on e6 and e5; the one closer to red is black's front.
        let board = Board::from_str("4k4/9/9/4p4/4p4/9/9/9/9/4K4 b - - 0 1").unwrap();

        assert_eq!(board.wxf(parse("e5e4")), "p++1");
        assert_eq!(board.wxf(parse("e6e5")), "p-+1");
        assert_eq!(board.chinese_move(parse("e5e4"), false), "前卒进1");
    }

    #[test]
    fn horizontal_moves_name_the_target_file() {
        let board = Board::starting_position();

        // A king traverse: one square sideways inside the palace.
        let shifted = Board::from_str("4k4/9/9/9/9/9/9/9/9/3K5 w - - 0 1").unwrap();
        assert_eq!(shifted.wxf(parse("d0e0")), "k6.5");
        assert_eq!(shifted.chinese_move(parse("d0e0"), false), "帅六平五");

        // And a plain red pawn advance for contrast.
        assert_eq!(board.wxf(parse("e3e4")), "p5+1");
        assert_eq!(board.chinese_move(parse("e3e4"), false), "兵五进一");
    }

    #[test]
    #[should_panic(expected = "wxf expects a piece")]
    fn wxf_needs_a_piece() {
        let board = Board::starting_position();
        board.wxf(parse("e4e5"));
    }
}

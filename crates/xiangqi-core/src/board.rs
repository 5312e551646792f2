use std::{
    fmt::{self, Display},
    num::IntErrorKind,
    str::FromStr,
};

use xiangqi_bootstrap::{BitBoard, Color, Square};

use crate::{
    index, mg,
    mg::Moves,
    repr::{Move, ParseMoveError, Piece, PieceKind},
};

/// The FEN of the initial position, red to move.
pub const STARTING_FEN: &str =
    "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

// Everything `pop` has to restore. Snapshotting the full set of bitboards
// keeps undo branch-free; a board is a few hundred bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoardState {
    pawns: BitBoard,
    cannons: BitBoard,
    rooks: BitBoard,
    knights: BitBoard,
    bishops: BitBoard,
    advisors: BitBoard,
    kings: BitBoard,
    occupied_co: [BitBoard; 2],
    occupied: BitBoard,
    turn: Color,
    fullmove_number: u16,
}

impl BoardState {
    fn record(board: &Board) -> Self {
        Self {
            pawns: board.pawns,
            cannons: board.cannons,
            rooks: board.rooks,
            knights: board.knights,
            bishops: board.bishops,
            advisors: board.advisors,
            kings: board.kings,
            occupied_co: board.occupied_co,
            occupied: board.occupied,
            turn: board.turn,
            fullmove_number: board.fullmove_number,
        }
    }

    fn restore(self, board: &mut Board) {
        board.pawns = self.pawns;
        board.cannons = self.cannons;
        board.rooks = self.rooks;
        board.knights = self.knights;
        board.bishops = self.bishops;
        board.advisors = self.advisors;
        board.kings = self.kings;
        board.occupied_co = self.occupied_co;
        board.occupied = self.occupied;
        board.turn = self.turn;
        board.fullmove_number = self.fullmove_number;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A Xiangqi position together with its move history.
///
/// The position is a set of per-kind bitboards plus per-color occupancy;
/// `push` snapshots everything before mutating, so `pop` restores the
/// previous position bit for bit.
pub struct Board {
    pub(crate) pawns: BitBoard,
    pub(crate) cannons: BitBoard,
    pub(crate) rooks: BitBoard,
    pub(crate) knights: BitBoard,
    pub(crate) bishops: BitBoard,
    pub(crate) advisors: BitBoard,
    pub(crate) kings: BitBoard,
    pub(crate) occupied_co: [BitBoard; 2],
    pub(crate) occupied: BitBoard,
    /// The side to move.
    pub turn: Color,
    /// Starts at 1 and increments after each black move.
    pub fullmove_number: u16,
    move_stack: Vec<Move>,
    state_stack: Vec<BoardState>,
}

impl Board {
    /// A board with no pieces at all, red to move.
    pub fn empty() -> Self {
        Self {
            pawns: BitBoard::EMPTY,
            cannons: BitBoard::EMPTY,
            rooks: BitBoard::EMPTY,
            knights: BitBoard::EMPTY,
            bishops: BitBoard::EMPTY,
            advisors: BitBoard::EMPTY,
            kings: BitBoard::EMPTY,
            occupied_co: [BitBoard::EMPTY; 2],
            occupied: BitBoard::EMPTY,
            turn: Color::Red,
            fullmove_number: 1,
            move_stack: Vec::new(),
            state_stack: Vec::new(),
        }
    }

    /// The initial position.
    pub fn starting_position() -> Self {
        Self::from_str(STARTING_FEN).unwrap()
    }

    /// All occupied squares.
    pub fn occupied(&self) -> BitBoard {
        self.occupied
    }

    /// The squares occupied by one side.
    pub fn occupied_co(&self, color: Color) -> BitBoard {
        self.occupied_co[color]
    }

    fn piece_bitboard_mut(&mut self, kind: PieceKind) -> &mut BitBoard {
        match kind {
            PieceKind::Pawn => &mut self.pawns,
            PieceKind::Cannon => &mut self.cannons,
            PieceKind::Rook => &mut self.rooks,
            PieceKind::Knight => &mut self.knights,
            PieceKind::Bishop => &mut self.bishops,
            PieceKind::Advisor => &mut self.advisors,
            PieceKind::King => &mut self.kings,
        }
    }

    fn piece_bitboard(&self, kind: PieceKind) -> BitBoard {
        match kind {
            PieceKind::Pawn => self.pawns,
            PieceKind::Cannon => self.cannons,
            PieceKind::Rook => self.rooks,
            PieceKind::Knight => self.knights,
            PieceKind::Bishop => self.bishops,
            PieceKind::Advisor => self.advisors,
            PieceKind::King => self.kings,
        }
    }

    /// The pieces of one kind and color.
    pub fn pieces_mask(&self, kind: PieceKind, color: Color) -> BitBoard {
        self.piece_bitboard(kind) & self.occupied_co[color]
    }

    /// The kind of the piece on a square, if any.
    pub fn piece_type_at(&self, square: Square) -> Option<PieceKind> {
        let mask = BitBoard::from(square);

        if (self.occupied & mask).is_empty() {
            None
        } else if (self.pawns & mask).is_any() {
            Some(PieceKind::Pawn)
        } else if (self.knights & mask).is_any() {
            Some(PieceKind::Knight)
        } else if (self.bishops & mask).is_any() {
            Some(PieceKind::Bishop)
        } else if (self.rooks & mask).is_any() {
            Some(PieceKind::Rook)
        } else if (self.cannons & mask).is_any() {
            Some(PieceKind::Cannon)
        } else if (self.advisors & mask).is_any() {
            Some(PieceKind::Advisor)
        } else {
            Some(PieceKind::King)
        }
    }

    /// The color of the piece on a square, if any.
    pub fn color_at(&self, square: Square) -> Option<Color> {
        let mask = BitBoard::from(square);

        if (self.occupied_co[Color::Red] & mask).is_any() {
            Some(Color::Red)
        } else if (self.occupied_co[Color::Black] & mask).is_any() {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// The piece on a square, if any.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.piece_type_at(square).map(|kind| Piece {
            kind,
            color: if (self.occupied_co[Color::Red] & BitBoard::from(square)).is_any() {
                Color::Red
            } else {
                Color::Black
            },
        })
    }

    /// The square of the given side's king, if it has one.
    pub fn king(&self, color: Color) -> Option<Square> {
        (self.kings & self.occupied_co[color]).highest_one()
    }

    fn remove_piece_kind_at(&mut self, square: Square) -> Option<PieceKind> {
        let kind = self.piece_type_at(square)?;
        let mask = BitBoard::from(square);

        *self.piece_bitboard_mut(kind) ^= mask;
        self.occupied ^= mask;
        self.occupied_co[Color::Red] -= mask;
        self.occupied_co[Color::Black] -= mask;

        Some(kind)
    }

    fn put_piece_at(&mut self, square: Square, kind: PieceKind, color: Color) {
        self.remove_piece_kind_at(square);

        let mask = BitBoard::from(square);
        *self.piece_bitboard_mut(kind) |= mask;
        self.occupied ^= mask;
        self.occupied_co[color] ^= mask;
    }

    /// Places a piece on a square, replacing whatever was there.
    pub fn set_piece_at(&mut self, square: Square, piece: Piece) {
        self.put_piece_at(square, piece.kind, piece.color);
    }

    /// Removes and returns the piece on a square; a no-op on empty squares.
    pub fn remove_piece_at(&mut self, square: Square) -> Option<Piece> {
        let color = self.color_at(square);
        let kind = self.remove_piece_kind_at(square)?;

        Some(Piece {
            kind,
            color: color.expect("an occupied square has a color"),
        })
    }

    /// The raw attack set of the piece on `square` under the current
    /// occupancy; own pieces are not excluded. Empty squares attack
    /// nothing.
    pub fn attacks_mask(&self, square: Square) -> BitBoard {
        let mask = BitBoard::from(square);

        if (mask & self.pawns).is_any() {
            let color = if (mask & self.occupied_co[Color::Red]).is_any() {
                Color::Red
            } else {
                Color::Black
            };
            index::pawn_attacks(square, color)
        } else if (mask & self.kings).is_any() {
            // A king also "attacks" the opposing king along an open file;
            // this is how flying generals enters every attack query.
            index::king_attacks(square) | (index::rook_attacks(square, self.occupied) & self.kings)
        } else if (mask & self.advisors).is_any() {
            index::advisor_attacks(square)
        } else if (mask & self.knights).is_any() {
            index::knight_attacks(square, self.occupied)
        } else if (mask & self.bishops).is_any() {
            index::bishop_attacks(square, self.occupied)
        } else if (mask & self.rooks).is_any() {
            index::rook_attacks(square, self.occupied)
        } else if (mask & self.cannons).is_any() {
            index::cannon_attacks(square, self.occupied)
                | (index::rook_attacks(square, self.occupied) - self.occupied)
        } else {
            BitBoard::EMPTY
        }
    }

    pub(crate) fn attackers_mask_occupied(
        &self,
        color: Color,
        square: Square,
        occupied: BitBoard,
    ) -> BitBoard {
        let cannon_attacks = index::cannon_attacks(square, occupied);
        let rook_attacks = index::rook_attacks(square, occupied);

        let attackers = (cannon_attacks & self.cannons)
            | (rook_attacks & self.rooks)
            | (index::knight_attacks_reversed(square, occupied) & self.knights)
            | (index::bishop_attacks(square, occupied) & self.bishops)
            | (index::pawn_attacks_reversed(square, color) & self.pawns)
            | (index::advisor_attacks(square) & self.advisors)
            | ((index::king_attacks(square) | (rook_attacks & self.kings)) & self.kings);

        attackers & self.occupied_co[color]
    }

    /// The pieces of `color` that attack `square` under the current
    /// occupancy.
    pub fn attackers_mask(&self, color: Color, square: Square) -> BitBoard {
        self.attackers_mask_occupied(color, square, self.occupied)
    }

    /// Whether any piece of `color` attacks `square`.
    pub fn is_attacked_by(&self, color: Color, square: Square) -> bool {
        self.attackers_mask(color, square).is_any()
    }

    /// The enemy pieces currently giving check, or empty when not in check
    /// (or when the side to move has no king).
    pub fn checkers_mask(&self) -> BitBoard {
        match self.king(self.turn) {
            Some(king) => self.attackers_mask(!self.turn, king),
            None => BitBoard::EMPTY,
        }
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.checkers_mask().is_any()
    }

    /// Whether the side to move is in check with no legal move left.
    pub fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    /// Every legal move in the position.
    pub fn legal_moves(&self) -> Moves {
        self.generate_legal_moves(BitBoard::IN_BOARD, BitBoard::IN_BOARD)
    }

    /// Legal moves restricted to origins in `from_mask` and targets in
    /// `to_mask`.
    pub fn generate_legal_moves(&self, from_mask: BitBoard, to_mask: BitBoard) -> Moves {
        mg::legal_moves(self, from_mask, to_mask)
    }

    /// Every pseudo-legal move: piece movement rules are respected, but the
    /// king may be left in check.
    pub fn pseudo_legal_moves(&self) -> Moves {
        self.generate_pseudo_legal_moves(BitBoard::IN_BOARD, BitBoard::IN_BOARD)
    }

    /// Pseudo-legal moves restricted to origins in `from_mask` and targets
    /// in `to_mask`.
    pub fn generate_pseudo_legal_moves(&self, from_mask: BitBoard, to_mask: BitBoard) -> Moves {
        let mut moves = Moves::new();
        mg::pseudo_legal_moves(self, from_mask, to_mask, &mut moves);
        moves
    }

    /// Whether the move follows the movement rules of the piece on its
    /// origin square, ignoring check.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_null() {
            return false;
        }

        if self.piece_type_at(m.origin).is_none() {
            return false;
        }

        let origin = BitBoard::from(m.origin);
        let target = BitBoard::from(m.target);
        let ours = self.occupied_co[self.turn];

        // Own piece moving onto a square not blocked by an own piece.
        if (ours & origin).is_empty() || (ours & target).is_any() {
            return false;
        }

        (self.attacks_mask(m.origin) & target).is_any()
    }

    /// Whether the move is fully legal in the position.
    pub fn is_legal(&self, m: Move) -> bool {
        self.is_pseudo_legal(m) && !self.is_into_check(m)
    }

    /// Whether playing this pseudo-legal move would leave or put the own
    /// king in check.
    pub fn is_into_check(&self, m: Move) -> bool {
        mg::is_into_check(self, m)
    }

    /// Plays a move. A capture is implied when the target square holds an
    /// enemy piece; the null move only passes the turn.
    ///
    /// # Panics
    /// The move must be pseudo-legal; pushing a move with no piece on its
    /// origin square panics with the position FEN and the offending move.
    pub fn push(&mut self, m: Move) {
        self.state_stack.push(BoardState::record(self));
        self.move_stack.push(m);

        if self.turn == Color::Black {
            self.fullmove_number += 1;
        }

        if m.is_null() {
            self.turn = !self.turn;
            return;
        }

        let Some(kind) = self.remove_piece_kind_at(m.origin) else {
            panic!(
                "push expects a pseudo-legal move, got {m} in {}",
                self.board_fen()
            );
        };

        self.put_piece_at(m.target, kind, self.turn);
        self.turn = !self.turn;
    }

    /// Unplays the most recent move and returns it, or [`None`] when the
    /// history is empty. The position is restored exactly.
    pub fn pop(&mut self) -> Option<Move> {
        let m = self.move_stack.pop()?;
        self.state_stack
            .pop()
            .expect("the state stack parallels the move stack")
            .restore(self);

        Some(m)
    }

    /// The most recent move, if any, without unplaying it.
    pub fn peek(&self) -> Option<Move> {
        self.move_stack.last().copied()
    }

    /// Parses an ICCS move, checks it is legal and plays it.
    pub fn push_iccs(&mut self, iccs: &str) -> Result<Move, PushIccsError> {
        let m: Move = iccs.parse()?;

        if !self.is_legal(m) {
            return Err(PushIccsError::Illegal(m, self.fen()));
        }

        self.push(m);
        Ok(m)
    }

    /// Counts the leaves of the legal move tree at the given depth.
    pub fn perft(&mut self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }

        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }

        moves
            .into_iter()
            .map(|m| {
                self.push(m);
                let nodes = self.perft(depth - 1);
                self.pop();
                nodes
            })
            .sum()
    }

    /// The position part of the FEN.
    pub fn board_fen(&self) -> String {
        let mut builder = String::new();

        for rank in (3..=12).rev() {
            let mut empty = 0;

            for file in 3..=11 {
                match self.piece_at(Square::new((rank << 4 | file) as u8)) {
                    Some(piece) => {
                        if empty > 0 {
                            builder.push(char::from_digit(empty, 10).unwrap());
                            empty = 0;
                        }
                        builder.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                builder.push(char::from_digit(empty, 10).unwrap());
            }

            if rank > 3 {
                builder.push('/');
            }
        }

        builder
    }

    /// The full FEN of the position. The third through fifth fields carry no
    /// information in this variant and are emitted as `- - 0`.
    pub fn fen(&self) -> String {
        format!(
            "{} {} - - 0 {}",
            self.board_fen(),
            self.turn,
            self.fullmove_number
        )
    }

    fn set_board_fen(&mut self, part: &str, fen: &str) -> Result<(), ParseFenError> {
        let rows: Vec<&str> = part.split('/').collect();
        if rows.len() != 10 {
            return Err(ParseFenError::InvalidRowCount(fen.to_owned()));
        }

        for row in &rows {
            let mut field_sum = 0;
            let mut previous_was_digit = false;

            for c in row.chars() {
                if let Some(digit) = c.to_digit(10).filter(|&d| d >= 1) {
                    if previous_was_digit {
                        return Err(ParseFenError::SubsequentDigits(fen.to_owned()));
                    }
                    field_sum += digit;
                    previous_was_digit = true;
                } else if Piece::try_from(c).is_ok() {
                    field_sum += 1;
                    previous_was_digit = false;
                } else {
                    return Err(ParseFenError::InvalidCharacter(fen.to_owned()));
                }
            }

            if field_sum != 9 {
                return Err(ParseFenError::InvalidRowWidth(fen.to_owned()));
            }
        }

        // The first row of the FEN is black's back rank; walking the padded
        // grid from a0 and mirroring each square lays the rows out
        // top-to-bottom.
        let mut square_index = Square::A0.as_index() as u8;
        for c in part.chars() {
            if let Some(digit) = c.to_digit(10) {
                square_index += digit as u8;
            } else if c == '/' {
                square_index += 7;
            } else {
                let piece = Piece::try_from(c).expect("row characters were validated");
                self.put_piece_at(Square::new(square_index).mirror(), piece.kind, piece.color);
                square_index += 1;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
/// The ways a FEN string can be malformed. Each variant carries the
/// offending input.
pub enum ParseFenError {
    #[error("expected position, turn and counter parts in fen: {0:?}")]
    InvalidPartCount(String),
    #[error("expected 10 rows in position part of fen: {0:?}")]
    InvalidRowCount(String),
    #[error("expected 9 columns per row in position part of fen: {0:?}")]
    InvalidRowWidth(String),
    #[error("two subsequent digits in position part of fen: {0:?}")]
    SubsequentDigits(String),
    #[error("invalid character in position part of fen: {0:?}")]
    InvalidCharacter(String),
    #[error("expected `w` or `b` for turn part of fen: {0:?}")]
    InvalidTurn(String),
    #[error("invalid fullmove number in fen: {0:?}")]
    InvalidFullMoveNumber(String),
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
/// Why [`Board::push_iccs`] refused a move.
pub enum PushIccsError {
    #[error(transparent)]
    Parse(#[from] ParseMoveError),
    #[error("move {0} is not legal in {1}")]
    Illegal(Move, String),
}

impl FromStr for Board {
    type Err = ParseFenError;

    /// Parses a FEN. A lone position part and a position plus turn are
    /// accepted alongside the full six-field form; the placeholder fields
    /// are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();

        let (board_part, turn_part, fullmove_part) = match parts.as_slice() {
            [board] => (*board, None, None),
            [board, turn] => (*board, Some(*turn), None),
            [board, turn, _, _, _, fullmove] => (*board, Some(*turn), Some(*fullmove)),
            _ => return Err(ParseFenError::InvalidPartCount(s.to_owned())),
        };

        let turn = match turn_part {
            Some(part) => Color::from_str(part)
                .map_err(|_| ParseFenError::InvalidTurn(s.to_owned()))?,
            None => Color::Red,
        };

        let fullmove_number = match fullmove_part {
            Some(part) => match part.parse::<u16>() {
                Ok(fullmove) => fullmove.max(1),
                Err(error) if *error.kind() == IntErrorKind::PosOverflow => u16::MAX,
                Err(_) => return Err(ParseFenError::InvalidFullMoveNumber(s.to_owned())),
            },
            None => 1,
        };

        let mut board = Board::empty();
        board.set_board_fen(board_part, s)?;
        board.turn = turn;
        board.fullmove_number = fullmove_number;

        Ok(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::starting_position()
    }
}

impl Display for Board {
    /// Renders the board as an ASCII grid, black's side on top.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (3..=12).rev() {
            for file in 3..=11 {
                if file > 3 {
                    write!(f, " ")?;
                }

                match self.piece_at(Square::new((rank << 4 | file) as u8)) {
                    Some(piece) => write!(f, "{piece}")?,
                    None => write!(f, ".")?,
                }
            }

            if rank > 3 {
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl Board {
    /// Renders the board with Chinese piece characters, rank labels on the
    /// left and full-width file letters underneath.
    pub fn chinese(&self) -> String {
        let mut builder = String::new();

        for rank in (3..=12).rev() {
            builder.push(char::from_digit(rank as u32 - 3, 10).unwrap());
            builder.push(' ');

            for file in 3..=11 {
                match self.piece_at(Square::new((rank << 4 | file) as u8)) {
                    Some(piece) => builder.push(piece.chinese()),
                    None => builder.push('．'),
                }
            }

            builder.push('\n');
        }

        builder.push_str("  ａｂｃｄｅｆｇｈｉ");
        builder
    }
}

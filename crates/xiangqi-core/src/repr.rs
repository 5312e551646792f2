use std::{
    fmt::{self, Display},
    str::FromStr,
};

use xiangqi_bootstrap::{Color, ParseSquareError, Square};

#[derive(Eq, Hash, Debug, Clone, Copy, PartialEq)]
/// One of the seven Xiangqi piece kinds.
pub enum PieceKind {
    Pawn,
    Cannon,
    Rook,
    Knight,
    Bishop,
    Advisor,
    King,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [
        Self::Pawn,
        Self::Cannon,
        Self::Rook,
        Self::Knight,
        Self::Bishop,
        Self::Advisor,
        Self::King,
    ];

    /// The lowercase FEN letter of the kind.
    pub const fn symbol(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Cannon => 'c',
            Self::Rook => 'r',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Advisor => 'a',
            Self::King => 'k',
        }
    }
}

impl Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbol().fmt(f)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("piece must be a `p`, `c`, `r`, `n`, `b`, `a` or `k`, case-insensitively")]
pub struct ParsePieceError;

impl TryFrom<char> for PieceKind {
    type Error = ParsePieceError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c.to_ascii_lowercase() {
            'p' => Self::Pawn,
            'c' => Self::Cannon,
            'r' => Self::Rook,
            'n' => Self::Knight,
            'b' => Self::Bishop,
            'a' => Self::Advisor,
            'k' => Self::King,
            _ => return Err(ParsePieceError),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A colored piece. Red pieces print as uppercase FEN letters.
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    /// The FEN letter of the piece.
    pub fn symbol(self) -> char {
        match self.color {
            Color::Red => self.kind.symbol().to_ascii_uppercase(),
            Color::Black => self.kind.symbol(),
        }
    }

    /// The Chinese character of the piece. Both sides use the traditional
    /// distinct glyphs.
    pub fn chinese(self) -> char {
        match (self.kind, self.color) {
            (PieceKind::Rook, Color::Red) => '车',
            (PieceKind::Rook, Color::Black) => '俥',
            (PieceKind::Knight, Color::Red) => '马',
            (PieceKind::Knight, Color::Black) => '傌',
            (PieceKind::Bishop, Color::Red) => '相',
            (PieceKind::Bishop, Color::Black) => '象',
            (PieceKind::Advisor, Color::Red) => '仕',
            (PieceKind::Advisor, Color::Black) => '士',
            (PieceKind::King, Color::Red) => '帅',
            (PieceKind::King, Color::Black) => '将',
            (PieceKind::Pawn, Color::Red) => '兵',
            (PieceKind::Pawn, Color::Black) => '卒',
            (PieceKind::Cannon, Color::Red) => '炮',
            (PieceKind::Cannon, Color::Black) => '砲',
        }
    }
}

impl TryFrom<char> for Piece {
    type Error = ParsePieceError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(Piece {
            kind: PieceKind::try_from(c)?,
            color: if c.is_ascii_uppercase() {
                Color::Red
            } else {
                Color::Black
            },
        })
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbol().fmt(f)
    }
}

#[derive(Eq, Hash, Clone, Copy, Debug, PartialEq, PartialOrd, Ord)]
/// A move from one square to another. Captures are implied by the board the
/// move is played on.
///
/// The null move is `(0, 0)`; square 0 lies in the grid padding, so no real
/// move ever collides with it.
pub struct Move {
    pub origin: Square,
    pub target: Square,
}

impl Move {
    pub const NULL: Self = Self {
        origin: Square::new(0),
        target: Square::new(0),
    };

    pub const fn new(origin: Square, target: Square) -> Self {
        Self { origin, target }
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// The move in ICCS coordinate notation, `h2e2` style; the null move is
    /// `0000`.
    pub fn iccs(self) -> String {
        if self.is_null() {
            String::from("0000")
        } else {
            format!("{}{}", self.origin, self.target)
        }
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.iccs().fmt(f)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ParseMoveError {
    #[error("an iccs move must be exactly 4 characters")]
    InvalidLength,
    #[error("invalid iccs square")]
    InvalidSquare(#[from] ParseSquareError),
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "0000" {
            return Ok(Self::NULL);
        }

        if s.len() != 4 {
            return Err(ParseMoveError::InvalidLength);
        }

        let origin = s.get(0..2).ok_or(ParseMoveError::InvalidLength)?;
        let target = s.get(2..4).ok_or(ParseMoveError::InvalidLength)?;

        Ok(Self {
            origin: Square::from_str(origin)?,
            target: Square::from_str(target)?,
        })
    }
}

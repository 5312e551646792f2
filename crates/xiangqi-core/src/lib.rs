//! A Xiangqi (Chinese chess) rules engine on 256-bit bitboards.
//!
//! The board lives in a padded 16×16 grid (see `xiangqi-bootstrap`); attack
//! tables for the stepping and jumping pieces are precomputed by the build
//! script, while rook and cannon rays are walked against the current
//! occupancy. [`board::Board`] owns the position and its undo history and
//! answers attack, check and legality queries; [`mg`] generates exactly the
//! legal moves; FEN, ICCS, WXF and Chinese notation live in [`board`] and
//! the notation methods on [`board::Board`].

pub mod board;
mod index;
pub mod mg;
pub mod repr;
mod wxf;

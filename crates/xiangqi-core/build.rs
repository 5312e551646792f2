use std::{
    env,
    fmt::Debug,
    fs::{File, OpenOptions},
    io::{self, Error, Write},
    path::PathBuf,
};

use xiangqi_bootstrap::{BitBoard, Color, Square};

// The pair of knight jump deltas each leg square enables. The forward table
// asks "where can a knight on this square jump to", so its legs are the
// orthogonal neighbors at +16, +1, -16, -1 in bit order. The reversed table
// asks "from where could a knight jump onto this square"; seen from the
// target, the attacker's leg is a diagonal neighbor, at +15, +17, -15, -17
// in bit order. The runtime lookup must build its occupancy index with the
// same leg order.
const KNIGHT_DELTAS: [[i32; 2]; 4] = [[33, 31], [-14, 18], [-33, -31], [-18, 14]];
const KNIGHT_REVERSED_DELTAS: [[i32; 2]; 4] = [[14, 31], [33, 18], [-14, -31], [-18, -33]];

const ORTHOGONAL: [i32; 4] = [16, -16, 1, -1];
const DIAGONAL: [i32; 4] = [15, 17, -15, -17];

// Walks each delta until it runs off the 256-square grid, wraps around a
// grid row (the Chebyshev guard) or hits an occupied square, which is
// included. With a full occupancy this degenerates to single steps.
fn sliding_attacks(square: Square, occupied: BitBoard, deltas: &[i32]) -> BitBoard {
    let mut attacks = BitBoard::EMPTY;

    for &delta in deltas {
        let mut current = square.as_index() as i32;

        loop {
            let next = current + delta;
            if !(0..256).contains(&next)
                || Square::new(next as u8).distance(Square::new(current as u8)) > 2
            {
                break;
            }

            let next_square = Square::new(next as u8);
            attacks |= BitBoard::from(next_square);

            if occupied.get_bit(next_square) {
                break;
            }

            current = next;
        }
    }

    attacks
}

fn step_attacks(square: Square, deltas: &[i32]) -> BitBoard {
    sliding_attacks(square, BitBoard::FULL, deltas)
}

fn crossed_river(square: Square, color: Color) -> bool {
    match color {
        Color::Red => square.rank() >= 8,
        Color::Black => square.rank() <= 7,
    }
}

// A pawn before the river only steps forward; once across it also steps
// sideways. The reversed table flips the forward direction so that indexing
// it at a target square yields the squares a pawn of that color would attack
// the target from.
fn gen_pawn_table(color: Color, reversed: bool) -> Vec<BitBoard> {
    let mut forward: i32 = match color {
        Color::Red => 16,
        Color::Black => -16,
    };
    if reversed {
        forward = -forward;
    }

    Square::ALL
        .iter()
        .map(|&square| {
            let wide = [-1, forward, 1];
            let narrow = [forward];
            let deltas: &[i32] = if crossed_river(square, color) {
                &wide
            } else {
                &narrow
            };

            step_attacks(square, deltas) & BitBoard::IN_BOARD
        })
        .collect()
}

fn gen_king_table() -> Vec<BitBoard> {
    Square::ALL
        .iter()
        .map(|&square| {
            if BitBoard::PALACE.get_bit(square) {
                step_attacks(square, &ORTHOGONAL) & BitBoard::PALACE
            } else {
                BitBoard::EMPTY
            }
        })
        .collect()
}

fn gen_advisor_table() -> Vec<BitBoard> {
    Square::ALL
        .iter()
        .map(|&square| {
            if BitBoard::ADVISOR_SQUARES.get_bit(square) {
                step_attacks(square, &DIAGONAL) & BitBoard::PALACE
            } else {
                BitBoard::EMPTY
            }
        })
        .collect()
}

// Sixteen rows per square, one per occupancy subset of the four leg squares.
// Bit `j` of the row index means leg `j` is occupied, which disables the
// corresponding pair of jumps.
fn gen_knight_table(deltas: [[i32; 2]; 4]) -> Vec<[BitBoard; 16]> {
    Square::ALL
        .iter()
        .map(|&square| {
            let mut rows = [BitBoard::EMPTY; 16];

            if square.in_board() {
                for (index, row) in rows.iter_mut().enumerate() {
                    let mut open = Vec::new();
                    for (j, pair) in deltas.iter().enumerate() {
                        if index >> j & 1 == 0 {
                            open.extend_from_slice(pair);
                        }
                    }

                    *row = step_attacks(square, &open) & BitBoard::IN_BOARD;
                }
            }

            rows
        })
        .collect()
}

// Same shape as the knight tables, keyed on the four eye squares. A bishop
// never crosses the river, so each row is clipped to the square's own side.
fn gen_bishop_table() -> Vec<[BitBoard; 16]> {
    Square::ALL
        .iter()
        .map(|&square| {
            let mut rows = [BitBoard::EMPTY; 16];

            if BitBoard::BISHOP_SQUARES.get_bit(square) {
                let side = if BitBoard::RED_SIDE.get_bit(square) {
                    BitBoard::RED_SIDE
                } else {
                    BitBoard::BLACK_SIDE
                };

                for (index, row) in rows.iter_mut().enumerate() {
                    let mut open = Vec::new();
                    for (j, &eye) in DIAGONAL.iter().enumerate() {
                        if index >> j & 1 == 0 {
                            open.push(2 * eye);
                        }
                    }

                    *row = step_attacks(square, &open) & side & BitBoard::IN_BOARD;
                }
            }

            rows
        })
        .collect()
}

fn write_table<T: Debug>(
    name: &'static str,
    data: &[T],
    type_name: &'static str,
    file: &mut File,
) -> io::Result<()> {
    write!(file, "static {name}: [{type_name}; {}] = [", data.len())?;

    for element in data {
        write!(file, "{element:?},")?;
    }

    writeln!(file, "];")
}

fn main() -> Result<(), Error> {
    let mut output_file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(PathBuf::from(env::var_os("OUT_DIR").unwrap()).join("tables.rs"))?;

    write_table(
        "RED_PAWN_ATTACKS",
        &gen_pawn_table(Color::Red, false),
        "BitBoard",
        &mut output_file,
    )?;
    write_table(
        "BLACK_PAWN_ATTACKS",
        &gen_pawn_table(Color::Black, false),
        "BitBoard",
        &mut output_file,
    )?;
    write_table(
        "RED_PAWN_REVERSED_ATTACKS",
        &gen_pawn_table(Color::Red, true),
        "BitBoard",
        &mut output_file,
    )?;
    write_table(
        "BLACK_PAWN_REVERSED_ATTACKS",
        &gen_pawn_table(Color::Black, true),
        "BitBoard",
        &mut output_file,
    )?;

    write_table("KING_ATTACKS", &gen_king_table(), "BitBoard", &mut output_file)?;
    write_table(
        "ADVISOR_ATTACKS",
        &gen_advisor_table(),
        "BitBoard",
        &mut output_file,
    )?;

    write_table(
        "KNIGHT_ATTACKS",
        &gen_knight_table(KNIGHT_DELTAS),
        "[BitBoard; 16]",
        &mut output_file,
    )?;
    write_table(
        "KNIGHT_REVERSED_ATTACKS",
        &gen_knight_table(KNIGHT_REVERSED_DELTAS),
        "[BitBoard; 16]",
        &mut output_file,
    )?;
    write_table(
        "BISHOP_ATTACKS",
        &gen_bishop_table(),
        "[BitBoard; 16]",
        &mut output_file,
    )?;

    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}

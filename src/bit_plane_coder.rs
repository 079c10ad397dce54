//! Bit-plane context modeling over one code block (Tier-1 coding).
//!
//! Each magnitude bitplane of a block is scanned three times, MSB first:
//! significance propagation, magnitude refinement, cleanup. The passes emit
//! a single interleaved (CX, D) decision stream in scan order; decoding
//! replays the identical scan against the recovered decisions.
//!
//! Scan order inside a block: stripes of four rows, columns left to right
//! within a stripe, rows top to bottom within a column.

use crate::array2d::Array2D;
use crate::context::{
    magnitude_refinement_coding, run_length_coding, run_length_decoding, sign_coding,
    sign_decoding, zero_coding, RunLength, SigWindow, CX_RUN, CX_UNIFORM,
};
use crate::error::EbcotError;
use crate::image::SubbandOrientation;

/// Fixed code-block extent; boundary blocks are zero-padded up to this.
pub const BLOCK_SIZE: usize = 64;

const STRIPE_HEIGHT: usize = 4;

// Worst case of five decisions per coefficient per plane.
const DECISIONS_PER_COEFF: usize = 5;

/// Significance map with a one-cell zero border, so every 3x3 and 6x3
/// window read near the block edge needs no bounds handling.
struct SigMap {
    cells: Array2D<u8>,
}

impl SigMap {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            cells: Array2D::new(rows + 2, cols + 2),
        }
    }

    fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row + 1][col + 1]
    }

    fn set(&mut self, row: usize, col: usize) {
        self.cells[row + 1][col + 1] = 1;
    }

    /// 3x3 window centred on (row, col).
    fn window(&self, row: usize, col: usize) -> SigWindow {
        [
            [
                self.cells[row][col],
                self.cells[row][col + 1],
                self.cells[row][col + 2],
            ],
            [
                self.cells[row + 1][col],
                self.cells[row + 1][col + 1],
                self.cells[row + 1][col + 2],
            ],
            [
                self.cells[row + 2][col],
                self.cells[row + 2][col + 1],
                self.cells[row + 2][col + 2],
            ],
        ]
    }

    /// Count of significant coefficients among the eight neighbours.
    fn neighbour_sum(&self, row: usize, col: usize) -> u32 {
        let window = self.window(row, col);
        let total: u32 = window.iter().flatten().map(|&v| u32::from(v)).sum();
        total - u32::from(window[1][1])
    }

    /// Sum over the six-row by three-column window that surrounds a stripe
    /// column: rows `top-1..=top+4`, columns `col-1..=col+1` of the block.
    fn stripe_region_sum(&self, top: usize, col: usize) -> u32 {
        let mut total = 0u32;
        for row in top..top + 6 {
            for c in col..col + 3 {
                total += u32::from(self.cells[row][c]);
            }
        }
        total
    }
}

/// The decision stream produced by coding one block.
pub struct BlockSymbols {
    pub cx: Vec<u8>,
    pub d: Vec<u8>,
    pub bitplanes: u8,
}

/// Number of magnitude bitplanes needed for a block; a block of zeros
/// still carries one plane.
fn magnitude_bitplanes(block: &Array2D<i32>) -> u8 {
    let max = block.iter().map(|&v| v.unsigned_abs()).max().unwrap_or(0);
    ((32 - max.leading_zeros()) as u8).max(1)
}

/// Run the three coding passes over every bitplane of `block`.
pub fn encode_block(block: &Array2D<i32>, orientation: SubbandOrientation) -> BlockSymbols {
    let rows = block.rows();
    let cols = block.cols();
    let bitplanes = magnitude_bitplanes(block);

    let capacity = DECISIONS_PER_COEFF * rows * cols * bitplanes as usize;
    let mut encoder = BlockEncoder {
        magnitudes: Array2D::from_fn(rows, cols, |r, c| block[r][c].unsigned_abs()),
        signs: Array2D::from_fn(rows, cols, |r, c| u8::from(block[r][c] < 0)),
        orientation,
        sig: SigMap::new(rows, cols),
        refined: Array2D::new(rows, cols),
        coded: Array2D::new(rows, cols),
        cx: Vec::with_capacity(capacity),
        d: Vec::with_capacity(capacity),
    };

    for plane in 0..bitplanes {
        let shift = u32::from(bitplanes - 1 - plane);
        encoder.significance_propagation(shift);
        encoder.magnitude_refinement(shift);
        encoder.cleanup(shift);
        encoder.coded.fill(0);
    }

    BlockSymbols {
        cx: encoder.cx,
        d: encoder.d,
        bitplanes,
    }
}

struct BlockEncoder {
    magnitudes: Array2D<u32>,
    signs: Array2D<u8>,
    orientation: SubbandOrientation,
    sig: SigMap,
    // Visited by magnitude refinement at least once.
    refined: Array2D<u8>,
    // Coded during the current bitplane.
    coded: Array2D<u8>,
    cx: Vec<u8>,
    d: Vec<u8>,
}

impl BlockEncoder {
    fn rows(&self) -> usize {
        self.magnitudes.rows()
    }

    fn cols(&self) -> usize {
        self.magnitudes.cols()
    }

    fn bit(&self, row: usize, col: usize, shift: u32) -> u8 {
        ((self.magnitudes[row][col] >> shift) & 1) as u8
    }

    fn emit(&mut self, cx: u8, d: u8) {
        self.cx.push(cx);
        self.d.push(d);
    }

    /// Zero-code then sign-code the coefficient and mark it significant.
    fn code_sign(&mut self, row: usize, col: usize) {
        let window = self.sig.window(row, col);
        let (prediction, cx) = sign_coding(&window);
        let decision = self.signs[row][col] ^ prediction;
        self.emit(cx, decision);
        self.sig.set(row, col);
    }

    fn significance_propagation(&mut self, shift: u32) {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                for offset in 0..STRIPE_HEIGHT {
                    let row = stripe * STRIPE_HEIGHT + offset;
                    if self.sig.get(row, col) != 0 {
                        continue;
                    }
                    if self.sig.neighbour_sum(row, col) == 0 {
                        // No significant neighbourhood; cleanup will code it.
                        continue;
                    }
                    let bit = self.bit(row, col, shift);
                    let window = self.sig.window(row, col);
                    self.emit(zero_coding(&window, self.orientation), bit);
                    self.coded[row][col] = 1;
                    if bit == 1 {
                        self.code_sign(row, col);
                    }
                }
            }
        }
    }

    fn magnitude_refinement(&mut self, shift: u32) {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                for offset in 0..STRIPE_HEIGHT {
                    let row = stripe * STRIPE_HEIGHT + offset;
                    if self.sig.get(row, col) != 1 || self.coded[row][col] != 0 {
                        continue;
                    }
                    let window = self.sig.window(row, col);
                    let cx = magnitude_refinement_coding(&window, self.refined[row][col]);
                    self.refined[row][col] = 1;
                    let bit = self.bit(row, col, shift);
                    self.emit(cx, bit);
                }
            }
        }
    }

    fn cleanup(&mut self, shift: u32) {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                let top = stripe * STRIPE_HEIGHT;
                let mut next = 0;
                if self.stripe_column_clear(top, col) {
                    let column = [
                        self.bit(top, col, shift),
                        self.bit(top + 1, col, shift),
                        self.bit(top + 2, col, shift),
                        self.bit(top + 3, col, shift),
                    ];
                    match run_length_coding(column) {
                        RunLength::AllZero => {
                            self.emit(CX_RUN, 0);
                            next = STRIPE_HEIGHT;
                        }
                        RunLength::Terminated { position } => {
                            self.emit(CX_RUN, 1);
                            self.emit(CX_UNIFORM, position >> 1);
                            self.emit(CX_UNIFORM, position & 1);
                            let row = top + position as usize;
                            self.code_sign(row, col);
                            next = position as usize + 1;
                        }
                    }
                }
                while next < STRIPE_HEIGHT {
                    let row = top + next;
                    next += 1;
                    if self.sig.get(row, col) != 0 || self.coded[row][col] != 0 {
                        continue;
                    }
                    let bit = self.bit(row, col, shift);
                    let window = self.sig.window(row, col);
                    self.emit(zero_coding(&window, self.orientation), bit);
                    if bit == 1 {
                        self.code_sign(row, col);
                    }
                }
            }
        }
    }

    /// True when a whole stripe column plus its surrounding region carries
    /// no significance and nothing in the column was coded this plane.
    fn stripe_column_clear(&self, top: usize, col: usize) -> bool {
        if self.sig.stripe_region_sum(top, col) != 0 {
            return false;
        }
        (0..STRIPE_HEIGHT).all(|offset| self.coded[top + offset][col] == 0)
    }
}

/// Replay the scan against a decoded decision stream, reconstructing the
/// block of signed coefficients.
///
/// A decision stream that ends early is tolerated: the remaining
/// coefficients stay zero, which keeps truncated codestreams decodable.
pub fn decode_block(
    cx: &[u8],
    d: &[u8],
    rows: usize,
    cols: usize,
    bitplanes: u8,
) -> Result<Array2D<i32>, EbcotError> {
    let mut decoder = BlockDecoder {
        sig: SigMap::new(rows, cols),
        signs: Array2D::new(rows, cols),
        coded: Array2D::new(rows, cols),
        magnitudes: Array2D::new(rows, cols),
        cx,
        d,
        pointer: 0,
        truncated: false,
    };

    for plane in 0..bitplanes {
        let weight = 1u32 << u32::from(bitplanes - 1 - plane);
        decoder.significance_propagation(weight)?;
        decoder.magnitude_refinement(weight);
        decoder.cleanup(weight)?;
        decoder.coded.fill(0);
    }

    let signs = &decoder.signs;
    let magnitudes = &decoder.magnitudes;
    Ok(Array2D::from_fn(rows, cols, |r, c| {
        let magnitude = magnitudes[r][c] as i32;
        (1 - 2 * i32::from(signs[r][c])) * magnitude
    }))
}

struct BlockDecoder<'a> {
    sig: SigMap,
    signs: Array2D<u8>,
    coded: Array2D<u8>,
    magnitudes: Array2D<u32>,
    cx: &'a [u8],
    d: &'a [u8],
    pointer: usize,
    truncated: bool,
}

impl BlockDecoder<'_> {
    fn rows(&self) -> usize {
        self.magnitudes.rows()
    }

    fn cols(&self) -> usize {
        self.magnitudes.cols()
    }

    /// Consume the next (CX, D) pair, or note that the stream ran dry.
    fn take(&mut self) -> Option<(u8, u8)> {
        if self.pointer >= self.d.len() {
            self.note_truncated();
            return None;
        }
        let pair = (self.cx[self.pointer], self.d[self.pointer]);
        self.pointer += 1;
        Some(pair)
    }

    fn note_truncated(&mut self) {
        if !self.truncated {
            log::warn!("decision stream exhausted mid-block; remaining coefficients stay zero");
            self.truncated = true;
        }
    }

    /// Zero-padded view of the next three (CX, D) pairs for run-length
    /// classification.
    fn peek_run(&self) -> ([u8; 3], [u8; 3]) {
        let mut cx = [0u8; 3];
        let mut d = [0u8; 3];
        for i in 0..3 {
            cx[i] = self.cx.get(self.pointer + i).copied().unwrap_or(0);
            d[i] = self.d.get(self.pointer + i).copied().unwrap_or(0);
        }
        (cx, d)
    }

    fn decode_sign(&mut self, row: usize, col: usize) -> Result<(), EbcotError> {
        let Some((cx, decision)) = self.take() else {
            return Ok(());
        };
        let window = self.sig.window(row, col);
        let sign = sign_decoding(&window, cx, decision)?;
        self.signs[row][col] = sign;
        self.sig.set(row, col);
        Ok(())
    }

    fn significance_propagation(&mut self, weight: u32) -> Result<(), EbcotError> {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                for offset in 0..STRIPE_HEIGHT {
                    let row = stripe * STRIPE_HEIGHT + offset;
                    if self.sig.get(row, col) != 0 || self.sig.neighbour_sum(row, col) == 0 {
                        continue;
                    }
                    let Some((_, bit)) = self.take() else {
                        continue;
                    };
                    self.coded[row][col] = 1;
                    if bit == 1 {
                        self.magnitudes[row][col] += weight;
                        self.decode_sign(row, col)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn magnitude_refinement(&mut self, weight: u32) {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                for offset in 0..STRIPE_HEIGHT {
                    let row = stripe * STRIPE_HEIGHT + offset;
                    if self.sig.get(row, col) != 1 || self.coded[row][col] != 0 {
                        continue;
                    }
                    let Some((_, bit)) = self.take() else {
                        continue;
                    };
                    if bit == 1 {
                        self.magnitudes[row][col] += weight;
                    }
                }
            }
        }
    }

    fn cleanup(&mut self, weight: u32) -> Result<(), EbcotError> {
        for stripe in 0..self.rows() / STRIPE_HEIGHT {
            for col in 0..self.cols() {
                let top = stripe * STRIPE_HEIGHT;
                let mut next = 0;
                if self.stripe_column_clear(top, col) {
                    if self.pointer >= self.d.len() {
                        self.note_truncated();
                        continue;
                    }
                    let (run_cx, run_d) = self.peek_run();
                    let run = match run_length_decoding(run_cx, run_d) {
                        Ok(run) => run,
                        // A codeword cut short by stream truncation is
                        // recoverable; a full-length mismatch is corruption.
                        Err(_) if self.d.len() - self.pointer < 3 => {
                            self.note_truncated();
                            continue;
                        }
                        Err(err) => return Err(err),
                    };
                    match run {
                        RunLength::AllZero => {
                            self.pointer += 1;
                            next = STRIPE_HEIGHT;
                        }
                        RunLength::Terminated { position } => {
                            self.pointer += 3;
                            let row = top + position as usize;
                            self.magnitudes[row][col] += weight;
                            if self.pointer >= self.d.len() {
                                self.note_truncated();
                                continue;
                            }
                            self.decode_sign(row, col)?;
                            next = position as usize + 1;
                        }
                    }
                }
                while next < STRIPE_HEIGHT {
                    let row = top + next;
                    next += 1;
                    if self.sig.get(row, col) != 0 || self.coded[row][col] != 0 {
                        continue;
                    }
                    let Some((_, bit)) = self.take() else {
                        continue;
                    };
                    if bit == 1 {
                        self.magnitudes[row][col] += weight;
                        self.decode_sign(row, col)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn stripe_column_clear(&self, top: usize, col: usize) -> bool {
        if self.sig.stripe_region_sum(top, col) != 0 {
            return false;
        }
        (0..STRIPE_HEIGHT).all(|offset| self.coded[top + offset][col] == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(block: &Array2D<i32>, orientation: SubbandOrientation) -> Array2D<i32> {
        let symbols = encode_block(block, orientation);
        decode_block(
            &symbols.cx,
            &symbols.d,
            block.rows(),
            block.cols(),
            symbols.bitplanes,
        )
        .unwrap()
    }

    #[test]
    fn test_all_zero_block_emits_one_run_per_column() {
        let block = Array2D::<i32>::new(BLOCK_SIZE, BLOCK_SIZE);
        let symbols = encode_block(&block, SubbandOrientation::LL);

        // One plane; significance propagation and refinement stay silent,
        // cleanup emits a single all-zero run per stripe column.
        assert_eq!(symbols.bitplanes, 1);
        let columns = (BLOCK_SIZE / 4) * BLOCK_SIZE;
        assert_eq!(symbols.cx.len(), columns);
        assert!(symbols.cx.iter().all(|&c| c == CX_RUN));
        assert!(symbols.d.iter().all(|&b| b == 0));

        let decoded = decode_block(&symbols.cx, &symbols.d, BLOCK_SIZE, BLOCK_SIZE, 1).unwrap();
        assert!(decoded.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_single_coefficient_roundtrip() {
        let mut block = Array2D::<i32>::new(BLOCK_SIZE, BLOCK_SIZE);
        block[1][1] = 5;
        let symbols = encode_block(&block, SubbandOrientation::LL);
        assert_eq!(symbols.bitplanes, 3);

        let decoded = decode_block(
            &symbols.cx,
            &symbols.d,
            BLOCK_SIZE,
            BLOCK_SIZE,
            symbols.bitplanes,
        )
        .unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_negative_coefficient_roundtrip() {
        let mut block = Array2D::<i32>::new(BLOCK_SIZE, BLOCK_SIZE);
        block[4][4] = -3;
        let decoded = roundtrip(&block, SubbandOrientation::LL);
        assert_eq!(decoded[4][4], -3);
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_dense_block_roundtrip_all_orientations() {
        let mut lcg: u32 = 0xDEAD_BEEF;
        let mut step = move || {
            lcg = lcg.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            lcg >> 16
        };
        let block = Array2D::from_fn(BLOCK_SIZE, BLOCK_SIZE, |_, _| {
            (step() % 255) as i32 - 127
        });
        for orientation in [
            SubbandOrientation::LL,
            SubbandOrientation::LH,
            SubbandOrientation::HL,
            SubbandOrientation::HH,
        ] {
            assert_eq!(roundtrip(&block, orientation), block);
        }
    }

    #[test]
    fn test_decision_count_stays_within_bound() {
        let mut lcg: u32 = 42;
        let mut step = move || {
            lcg = lcg.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            lcg >> 16
        };
        let block = Array2D::from_fn(BLOCK_SIZE, BLOCK_SIZE, |_, _| (step() % 64) as i32 - 32);
        let symbols = encode_block(&block, SubbandOrientation::HH);
        let bound = DECISIONS_PER_COEFF * BLOCK_SIZE * BLOCK_SIZE * symbols.bitplanes as usize;
        assert!(symbols.cx.len() <= bound);
        assert_eq!(symbols.cx.len(), symbols.d.len());
    }

    #[test]
    fn test_truncated_decisions_leave_remainder_zero() {
        let mut block = Array2D::<i32>::new(BLOCK_SIZE, BLOCK_SIZE);
        block[0][0] = 9;
        block[40][40] = 7;
        let symbols = encode_block(&block, SubbandOrientation::LL);

        let keep = symbols.d.len() / 4;
        let decoded = decode_block(
            &symbols.cx[..keep],
            &symbols.d[..keep],
            BLOCK_SIZE,
            BLOCK_SIZE,
            symbols.bitplanes,
        )
        .unwrap();
        // Whatever was recovered must not exceed the coded magnitudes, and
        // the tail of the block must stay zero.
        assert_eq!(decoded[63][63], 0);
    }
}

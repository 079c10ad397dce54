//! Subband codec: code-block partitioning and framed token assembly.
//!
//! A subband is split into fixed 64x64 code blocks (boundary blocks are
//! zero-padded for scanning, then cropped on decode). Each block contributes
//! `CX.., Block, stream.., Block, N, Block` to the token sequence; rows of
//! blocks end with `Row` and the subband ends with `Band`. The two leading
//! tokens are the subband extents.

use crate::array2d::Array2D;
use crate::bit_plane_coder::{decode_block, encode_block, BLOCK_SIZE};
use crate::error::EbcotError;
use crate::framing::{Delimiter, Token, TokenReader};
use crate::image::SubbandOrientation;
use crate::mq_coder::{mq_decode, mq_encode};

/// Encode one subband channel into a framed token sequence.
pub fn encode_band(band: &Array2D<i32>, orientation: SubbandOrientation) -> Vec<Token> {
    let rows = band.rows();
    let cols = band.cols();
    let mut tokens: Vec<Token> = vec![rows as Token, cols as Token];

    for block_row in 0..rows.div_ceil(BLOCK_SIZE) {
        for block_col in 0..cols.div_ceil(BLOCK_SIZE) {
            let block = copy_block(band, block_row * BLOCK_SIZE, block_col * BLOCK_SIZE);
            let symbols = encode_block(&block, orientation);
            let stream = mq_encode(&symbols.cx, &symbols.d);

            tokens.extend(symbols.cx.iter().map(|&c| Token::from(c)));
            tokens.push(Delimiter::Block.into());
            tokens.extend(stream.iter().map(|&b| Token::from(b)));
            tokens.push(Delimiter::Block.into());
            tokens.push(Token::from(symbols.bitplanes));
            tokens.push(Delimiter::Block.into());
        }
        tokens.push(Delimiter::Row.into());
    }
    tokens.push(Delimiter::Band.into());
    tokens
}

/// Decode one subband from its framed token sequence (inclusive of the
/// terminating `Band` delimiter).
pub fn decode_band(tokens: &[Token]) -> Result<Array2D<i32>, EbcotError> {
    let mut reader = TokenReader::new(tokens);
    let rows = reader.next_token()? as usize;
    let cols = reader.next_token()? as usize;
    let row_blocks = rows.div_ceil(BLOCK_SIZE);
    let col_blocks = cols.div_ceil(BLOCK_SIZE);

    let mut extended = Array2D::<i32>::new(row_blocks * BLOCK_SIZE, col_blocks * BLOCK_SIZE);
    for block_row in 0..row_blocks {
        for block_col in 0..col_blocks {
            let cx = context_labels(reader.take_until(Delimiter::Block)?)?;
            let stream = stream_bytes(reader.take_until(Delimiter::Block)?)?;
            let bitplanes = reader.next_token()?;
            if !(1..=32).contains(&bitplanes) {
                return Err(EbcotError::InvalidBitplaneCount(bitplanes));
            }
            reader.expect(Delimiter::Block)?;

            let d = mq_decode(&stream, &cx);
            let block = decode_block(&cx, &d, BLOCK_SIZE, BLOCK_SIZE, bitplanes as u8)?;

            let top = block_row * BLOCK_SIZE;
            let left = block_col * BLOCK_SIZE;
            for row in 0..BLOCK_SIZE {
                extended[top + row][left..left + BLOCK_SIZE].copy_from_slice(&block[row]);
            }
        }
        reader.expect(Delimiter::Row)?;
    }
    reader.expect(Delimiter::Band)?;

    // Crop the zero-padded workspace back to the original extent.
    Ok(Array2D::from_fn(rows, cols, |r, c| extended[r][c]))
}

// Copy a 64x64 window anchored at (row0, col0), zero-padding past the edge.
fn copy_block(band: &Array2D<i32>, row0: usize, col0: usize) -> Array2D<i32> {
    let mut block = Array2D::new(BLOCK_SIZE, BLOCK_SIZE);
    let row_span = (band.rows() - row0).min(BLOCK_SIZE);
    let col_span = (band.cols() - col0).min(BLOCK_SIZE);
    for row in 0..row_span {
        block[row][..col_span].copy_from_slice(&band[row0 + row][col0..col0 + col_span]);
    }
    block
}

fn context_labels(tokens: &[Token]) -> Result<Vec<u8>, EbcotError> {
    tokens
        .iter()
        .map(|&t| {
            if t <= 18 {
                Ok(t as u8)
            } else {
                Err(EbcotError::TokenOutOfRange(t))
            }
        })
        .collect()
}

fn stream_bytes(tokens: &[Token]) -> Result<Vec<u8>, EbcotError> {
    tokens
        .iter()
        .map(|&t| {
            if t <= 255 {
                Ok(t as u8)
            } else {
                Err(EbcotError::TokenOutOfRange(t))
            }
        })
        .collect()
}

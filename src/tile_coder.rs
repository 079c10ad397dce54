//! Tile codec: channel-major serialization of a wavelet-decomposed tile.
//!
//! For each channel the LL subband is framed first, then the (LH, HL, HH)
//! triplet of every decomposition level; the tile terminator closes the
//! sequence. Decoding re-segments on `Band` delimiters, infers the channel
//! count from the segment total, and stacks the per-channel arrays back
//! into channel-interleaved planes.

use crate::array2d::Array2D;
use crate::band_coder::{decode_band, encode_band};
use crate::error::EbcotError;
use crate::framing::{Delimiter, Token};
use crate::image::{ChannelPlane, SubbandOrientation, SubbandTriplet, Tile};

/// Serialize every subband of `tile` into one framed token sequence.
pub fn encode_tile(tile: &Tile, depth: usize) -> Result<Vec<Token>, EbcotError> {
    if tile.depth() != depth {
        return Err(EbcotError::DepthMismatch {
            expected: depth,
            found: tile.depth(),
        });
    }
    let channels = tile.channels();
    for level in &tile.levels {
        if level.lh.channels() != channels
            || level.hl.channels() != channels
            || level.hh.channels() != channels
        {
            return Err(EbcotError::ChannelExtentMismatch);
        }
    }

    let mut tokens = Vec::new();
    for channel in 0..channels {
        tokens.extend(encode_band(
            &tile.ll.channel(channel),
            SubbandOrientation::LL,
        ));
        for level in &tile.levels {
            tokens.extend(encode_band(
                &level.lh.channel(channel),
                SubbandOrientation::LH,
            ));
            tokens.extend(encode_band(
                &level.hl.channel(channel),
                SubbandOrientation::HL,
            ));
            tokens.extend(encode_band(
                &level.hh.channel(channel),
                SubbandOrientation::HH,
            ));
        }
    }
    tokens.push(Delimiter::Tile.into());
    Ok(tokens)
}

/// Rebuild a tile from the output of [`encode_tile`].
pub fn decode_tile(tokens: &[Token], depth: usize) -> Result<Tile, EbcotError> {
    let tile_token = Token::from(Delimiter::Tile);
    let band_token = Token::from(Delimiter::Band);

    // Split into per-band segments, each inclusive of its Band delimiter.
    let mut segments: Vec<&[Token]> = Vec::new();
    let mut rest = tokens;
    loop {
        match rest.first() {
            None => return Err(EbcotError::MissingDelimiter(Delimiter::Tile)),
            Some(&t) if t == tile_token => {
                if rest.len() > 1 {
                    return Err(EbcotError::TrailingToken(rest[1]));
                }
                break;
            }
            Some(_) => {
                let index = rest
                    .iter()
                    .position(|&t| t == band_token)
                    .ok_or(EbcotError::MissingDelimiter(Delimiter::Band))?;
                segments.push(&rest[..=index]);
                rest = &rest[index + 1..];
            }
        }
    }

    let per_channel = 3 * depth + 1;
    if segments.is_empty() || segments.len() % per_channel != 0 {
        return Err(EbcotError::BandCountMismatch {
            found: segments.len(),
            per_channel,
        });
    }
    let channels = segments.len() / per_channel;

    let bands = segments
        .iter()
        .map(|segment| decode_band(segment))
        .collect::<Result<Vec<_>, _>>()?;

    // Gather the per-channel instances of one subband position and stack
    // them along the channel axis.
    let gather = |offset: usize| -> Result<ChannelPlane, EbcotError> {
        let planes: Vec<&Array2D<i32>> = (0..channels)
            .map(|channel| &bands[channel * per_channel + offset])
            .collect();
        ChannelPlane::from_channels(&planes)
    };

    let ll = gather(0)?;
    let mut levels = Vec::with_capacity(depth);
    for level in 0..depth {
        levels.push(SubbandTriplet {
            lh: gather(3 * level + 1)?,
            hl: gather(3 * level + 2)?,
            hh: gather(3 * level + 3)?,
        });
    }
    Ok(Tile { ll, levels })
}

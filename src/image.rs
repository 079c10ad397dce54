//! Data structures representing coefficient tiles and their subbands.

use crate::array2d::Array2D;
use crate::error::EbcotError;

/// Subband orientation inside a wavelet decomposition. Zero coding selects
/// its context sub-table from this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubbandOrientation {
    #[default]
    LL,
    LH,
    HL,
    HH,
}

/// A height x width x channels volume of signed coefficients, stored
/// channel-interleaved: `(row, col, channel)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlane {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<i32>,
}

impl ChannelPlane {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            data: vec![0; height * width * channels],
        }
    }

    pub fn from_raw(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<i32>,
    ) -> Result<Self, EbcotError> {
        if data.len() != height * width * channels {
            return Err(EbcotError::ShapeMismatch);
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Stack per-channel arrays of equal extent along the channel axis.
    pub fn from_channels(planes: &[&Array2D<i32>]) -> Result<Self, EbcotError> {
        let first = planes.first().ok_or(EbcotError::ChannelExtentMismatch)?;
        let (height, width) = (first.rows(), first.cols());
        if planes.iter().any(|p| p.rows() != height || p.cols() != width) {
            return Err(EbcotError::ChannelExtentMismatch);
        }
        let channels = planes.len();
        let mut data = Vec::with_capacity(height * width * channels);
        for row in 0..height {
            for col in 0..width {
                for plane in planes {
                    data.push(plane[row][col]);
                }
            }
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn get(&self, row: usize, col: usize, channel: usize) -> i32 {
        self.data[(row * self.width + col) * self.channels + channel]
    }

    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: i32) {
        self.data[(row * self.width + col) * self.channels + channel] = value;
    }

    /// Extract one channel as a two-dimensional array.
    pub fn channel(&self, channel: usize) -> Array2D<i32> {
        Array2D::from_fn(self.height, self.width, |r, c| self.get(r, c, channel))
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }
}

/// The (LH, HL, HH) detail subbands of one decomposition level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubbandTriplet {
    pub lh: ChannelPlane,
    pub hl: ChannelPlane,
    pub hh: ChannelPlane,
}

/// A wavelet-decomposed coefficient tile: the LL root subband plus one
/// detail triplet per decomposition level, finest last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub ll: ChannelPlane,
    pub levels: Vec<SubbandTriplet>,
}

impl Tile {
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn channels(&self) -> usize {
        self.ll.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_extraction_roundtrip() {
        let mut plane = ChannelPlane::new(2, 3, 2);
        plane.set(0, 1, 0, 5);
        plane.set(1, 2, 1, -4);

        let ch0 = plane.channel(0);
        let ch1 = plane.channel(1);
        assert_eq!(ch0[0][1], 5);
        assert_eq!(ch1[1][2], -4);

        let rebuilt = ChannelPlane::from_channels(&[&ch0, &ch1]).unwrap();
        assert_eq!(rebuilt, plane);
    }

    #[test]
    fn test_from_channels_rejects_uneven_extents() {
        let a = Array2D::<i32>::new(2, 2);
        let b = Array2D::<i32>::new(2, 3);
        assert_eq!(
            ChannelPlane::from_channels(&[&a, &b]),
            Err(EbcotError::ChannelExtentMismatch)
        );
    }

    #[test]
    fn test_from_raw_checks_shape() {
        assert!(ChannelPlane::from_raw(2, 2, 1, vec![1, 2, 3, 4]).is_ok());
        assert_eq!(
            ChannelPlane::from_raw(2, 2, 1, vec![1, 2, 3]),
            Err(EbcotError::ShapeMismatch)
        );
    }
}

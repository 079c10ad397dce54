use thiserror::Error;

use crate::framing::Delimiter;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbcotError {
    #[error("run-length codeword does not match any valid pattern")]
    InvalidRunLength,

    #[error("sign context mismatch: computed {computed}, codestream carries {found}")]
    SignContextMismatch { computed: u8, found: u8 },

    #[error("expected {expected:?} delimiter, found token {found}")]
    DelimiterMismatch { expected: Delimiter, found: u32 },

    #[error("codestream ended before the expected {0:?} delimiter")]
    MissingDelimiter(Delimiter),

    #[error("codestream ended in the middle of a framing unit")]
    UnexpectedEndOfStream,

    #[error("token {0} is out of range for its position in the codestream")]
    TokenOutOfRange(u32),

    #[error("bitplane count {0} is outside the representable range")]
    InvalidBitplaneCount(u32),

    #[error("unexpected token {0} after the tile terminator")]
    TrailingToken(u32),

    #[error("tile carries {found} decomposition levels, configured depth is {expected}")]
    DepthMismatch { expected: usize, found: usize },

    #[error("{found} subbands cannot be split into channels of {per_channel} bands each")]
    BandCountMismatch { found: usize, per_channel: usize },

    #[error("subband extents disagree across channels")]
    ChannelExtentMismatch,

    #[error("coefficient buffer length does not match the declared shape")]
    ShapeMismatch,

    #[error("worker pool could not be started")]
    WorkerPool,
}

/*!
# ebcot-rs

`ebcot-rs` is a pure Rust implementation of the EBCOT Tier-1 subsystem of
JPEG 2000 (ISO/IEC 15444-1): bit-plane context modeling and MQ arithmetic
coding of quantized wavelet coefficient tiles.

## Pipeline

Encoding runs tile -> per-subband code blocks -> three-pass bit-plane
coding -> MQ coding -> framed integer tokens; decoding inverts the chain
using the in-band delimiters to re-segment. The modules mirror that
layering:

- `mq_coder`: the MQ arithmetic coder with its canonical state tables.
- `context`: zero / sign / magnitude-refinement / run-length classifiers.
- `bit_plane_coder`: the three-pass scan over one 64x64 code block.
- `band_coder`: code-block partitioning and framed token assembly.
- `tile_coder`: channel-major subband serialization of a tile.
- `codec`: the batch facade with optional worker-pool dispatch.
- `image` / `array2d`: coefficient tile data structures.
- `config`: immutable codec parameters.
- `container`: binary persistence of tiles and token streams for the CLI.

The coder is deterministic: a tile encodes to byte-identical output across
runs and pool configurations, and `decode(encode(tile))` restores every
coefficient exactly.

Out of scope: rate-distortion truncation (Tier-2), color transforms, the
wavelet transform itself, packet formation, and file-format wrapping.
*/

pub mod array2d;
pub mod band_coder;
pub mod bit_plane_coder;
pub mod codec;
pub mod config;
pub mod container;
pub mod context;
pub mod error;
pub mod framing;
pub mod image;
pub mod mq_coder;
pub mod tile_coder;

pub use codec::EbcotCodec;
pub use config::CodecConfig;
pub use error::EbcotError;
pub use framing::{Delimiter, Token};
pub use image::{ChannelPlane, SubbandOrientation, SubbandTriplet, Tile};

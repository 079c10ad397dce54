//! Little-endian binary containers for coefficient tiles and encoded
//! token streams, used by the command-line tool to persist intermediate
//! forms between the wavelet front-end and the entropy coder.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::framing::Token;
use crate::image::{ChannelPlane, SubbandTriplet, Tile};

/// Magic for a tile-batch container.
pub const TILE_MAGIC: [u8; 4] = *b"EBCT";
/// Magic for a codestream-batch container.
pub const STREAM_MAGIC: [u8; 4] = *b"EBCS";

const VERSION: u16 = 1;

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn write_plane<W: Write>(writer: &mut W, plane: &ChannelPlane) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(plane.height() as u32)?;
    writer.write_u32::<LittleEndian>(plane.width() as u32)?;
    writer.write_u32::<LittleEndian>(plane.channels() as u32)?;
    for &value in plane.as_slice() {
        writer.write_i32::<LittleEndian>(value)?;
    }
    Ok(())
}

fn read_plane<R: Read>(reader: &mut R) -> io::Result<ChannelPlane> {
    let height = reader.read_u32::<LittleEndian>()? as usize;
    let width = reader.read_u32::<LittleEndian>()? as usize;
    let channels = reader.read_u32::<LittleEndian>()? as usize;
    let count = height
        .checked_mul(width)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| invalid("plane extent overflows"))?;
    let mut data = Vec::with_capacity(count);
    for _ in 0..count {
        data.push(reader.read_i32::<LittleEndian>()?);
    }
    ChannelPlane::from_raw(height, width, channels, data)
        .map_err(|_| invalid("plane shape mismatch"))
}

/// Write a batch of coefficient tiles.
pub fn write_tiles<W: Write>(writer: &mut W, depth: usize, tiles: &[Tile]) -> io::Result<()> {
    writer.write_all(&TILE_MAGIC)?;
    writer.write_u16::<LittleEndian>(VERSION)?;
    writer.write_u16::<LittleEndian>(depth as u16)?;
    writer.write_u32::<LittleEndian>(tiles.len() as u32)?;
    for tile in tiles {
        write_plane(writer, &tile.ll)?;
        for level in &tile.levels {
            write_plane(writer, &level.lh)?;
            write_plane(writer, &level.hl)?;
            write_plane(writer, &level.hh)?;
        }
    }
    Ok(())
}

/// Read a batch of coefficient tiles; returns the recorded depth too.
pub fn read_tiles<R: Read>(reader: &mut R) -> io::Result<(usize, Vec<Tile>)> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != TILE_MAGIC {
        return Err(invalid("not a tile container"));
    }
    if reader.read_u16::<LittleEndian>()? != VERSION {
        return Err(invalid("unsupported tile container version"));
    }
    let depth = reader.read_u16::<LittleEndian>()? as usize;
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let mut tiles = Vec::with_capacity(count);
    for _ in 0..count {
        let ll = read_plane(reader)?;
        let mut levels = Vec::with_capacity(depth);
        for _ in 0..depth {
            levels.push(SubbandTriplet {
                lh: read_plane(reader)?,
                hl: read_plane(reader)?,
                hh: read_plane(reader)?,
            });
        }
        tiles.push(Tile { ll, levels });
    }
    Ok((depth, tiles))
}

/// Write a batch of encoded token streams.
pub fn write_codestreams<W: Write>(
    writer: &mut W,
    depth: usize,
    codestreams: &[Vec<Token>],
) -> io::Result<()> {
    writer.write_all(&STREAM_MAGIC)?;
    writer.write_u16::<LittleEndian>(VERSION)?;
    writer.write_u16::<LittleEndian>(depth as u16)?;
    writer.write_u32::<LittleEndian>(codestreams.len() as u32)?;
    for tokens in codestreams {
        writer.write_u64::<LittleEndian>(tokens.len() as u64)?;
        for &token in tokens {
            writer.write_u32::<LittleEndian>(token)?;
        }
    }
    Ok(())
}

/// Read a batch of encoded token streams; returns the recorded depth too.
pub fn read_codestreams<R: Read>(reader: &mut R) -> io::Result<(usize, Vec<Vec<Token>>)> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != STREAM_MAGIC {
        return Err(invalid("not a codestream container"));
    }
    if reader.read_u16::<LittleEndian>()? != VERSION {
        return Err(invalid("unsupported codestream container version"));
    }
    let depth = reader.read_u16::<LittleEndian>()? as usize;
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let mut codestreams = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader.read_u64::<LittleEndian>()? as usize;
        let mut tokens = Vec::with_capacity(length);
        for _ in 0..length {
            tokens.push(reader.read_u32::<LittleEndian>()?);
        }
        codestreams.push(tokens);
    }
    Ok((depth, codestreams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn small_tile() -> Tile {
        let mut ll = ChannelPlane::new(2, 3, 2);
        ll.set(0, 0, 0, -5);
        ll.set(1, 2, 1, 9);
        let level = SubbandTriplet {
            lh: ChannelPlane::new(2, 3, 2),
            hl: ChannelPlane::new(2, 3, 2),
            hh: ChannelPlane::new(2, 3, 2),
        };
        Tile {
            ll,
            levels: vec![level],
        }
    }

    #[test]
    fn test_tile_container_roundtrip() {
        let tiles = vec![small_tile(), small_tile()];
        let mut buffer = Vec::new();
        write_tiles(&mut buffer, 1, &tiles).unwrap();

        let (depth, restored) = read_tiles(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(depth, 1);
        assert_eq!(restored, tiles);
    }

    #[test]
    fn test_codestream_container_roundtrip() {
        let codestreams = vec![vec![1, 2, 2048, 2051], vec![]];
        let mut buffer = Vec::new();
        write_codestreams(&mut buffer, 2, &codestreams).unwrap();

        let (depth, restored) = read_codestreams(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(depth, 2);
        assert_eq!(restored, codestreams);
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let mut buffer = Vec::new();
        write_codestreams(&mut buffer, 1, &[]).unwrap();
        assert!(read_tiles(&mut Cursor::new(buffer)).is_err());
    }
}

//! Framed token streams.
//!
//! An encoded tile is a flat sequence of integer tokens: compressed-stream
//! bytes (0..=255), small header integers (subband extents, bitplane counts),
//! and the reserved delimiters below, which sit outside the byte range so
//! they can never collide with stream content.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::EbcotError;

/// One element of a framed codestream.
pub type Token = u32;

/// Reserved framing delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Delimiter {
    /// Separates the context list, the MQ stream, and the bitplane count of
    /// one code block.
    Block = 2048,
    /// Terminates one row of code blocks inside a subband.
    Row = 2049,
    /// Terminates a subband.
    Band = 2050,
    /// Terminates a tile.
    Tile = 2051,
}

/// Forward-only cursor over a framed token stream.
pub struct TokenReader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Number of tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    pub fn next_token(&mut self) -> Result<Token, EbcotError> {
        let token = *self
            .tokens
            .get(self.pos)
            .ok_or(EbcotError::UnexpectedEndOfStream)?;
        self.pos += 1;
        Ok(token)
    }

    /// Consume one token and require it to be the given delimiter.
    pub fn expect(&mut self, delimiter: Delimiter) -> Result<(), EbcotError> {
        let found = self
            .next_token()
            .map_err(|_| EbcotError::MissingDelimiter(delimiter))?;
        if found != Token::from(delimiter) {
            return Err(EbcotError::DelimiterMismatch {
                expected: delimiter,
                found,
            });
        }
        Ok(())
    }

    /// Return all tokens up to the next occurrence of `delimiter`,
    /// consuming the delimiter as well.
    pub fn take_until(&mut self, delimiter: Delimiter) -> Result<&'a [Token], EbcotError> {
        let target = Token::from(delimiter);
        let rest = &self.tokens[self.pos..];
        let index = rest
            .iter()
            .position(|&t| t == target)
            .ok_or(EbcotError::MissingDelimiter(delimiter))?;
        self.pos += index + 1;
        Ok(&rest[..index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiters_are_out_of_band() {
        for delimiter in [
            Delimiter::Block,
            Delimiter::Row,
            Delimiter::Band,
            Delimiter::Tile,
        ] {
            assert!(Token::from(delimiter) > 255);
        }
        assert_eq!(Token::from(Delimiter::Block), 2048);
        assert_eq!(Token::from(Delimiter::Tile), 2051);
    }

    #[test]
    fn test_reader_take_until() {
        let tokens = [5, 6, 2048, 7, 2050];
        let mut reader = TokenReader::new(&tokens);
        assert_eq!(reader.take_until(Delimiter::Block).unwrap(), &[5, 6]);
        assert_eq!(reader.next_token().unwrap(), 7);
        assert!(reader.expect(Delimiter::Band).is_ok());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.next_token(), Err(EbcotError::UnexpectedEndOfStream));
    }

    #[test]
    fn test_reader_reports_missing_delimiter() {
        let tokens = [5, 6, 7];
        let mut reader = TokenReader::new(&tokens);
        assert_eq!(
            reader.take_until(Delimiter::Row),
            Err(EbcotError::MissingDelimiter(Delimiter::Row))
        );
    }

    #[test]
    fn test_reader_reports_mismatched_delimiter() {
        let tokens = [2048];
        let mut reader = TokenReader::new(&tokens);
        assert_eq!(
            reader.expect(Delimiter::Row),
            Err(EbcotError::DelimiterMismatch {
                expected: Delimiter::Row,
                found: 2048
            })
        );
    }
}

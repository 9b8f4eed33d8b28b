//! Standard-alphabet base64 decoding for the file-read fallback path.
//!
//! Input is processed in quanta of 4 characters producing 3 bytes. The final
//! quantum may carry one or two `=` padding characters, yielding 2 or 1 bytes.
//! ASCII whitespace is skipped; unpadded trailing quanta of 2 or 3 characters
//! are accepted as if padded.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Base64Error {
    #[error("invalid base64 character {ch:?} at offset {offset}")]
    InvalidCharacter { ch: char, offset: usize },
    #[error("invalid base64 length: {0} significant characters")]
    InvalidLength(usize),
    #[error("misplaced base64 padding at offset {0}")]
    InvalidPadding(usize),
}

const PAD: u8 = b'=';

fn sextet(byte: u8) -> Option<u32> {
    let v = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u32::from(v))
}

/// Decode `input` into raw bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, Base64Error> {
    // (offset in input, byte) of every non-whitespace character
    let symbols: Vec<(usize, u8)> = input
        .bytes()
        .enumerate()
        .filter(|(_, b)| !b.is_ascii_whitespace())
        .collect();

    let padding = symbols.iter().rev().take_while(|(_, b)| *b == PAD).count();
    if padding > 2 {
        return Err(Base64Error::InvalidPadding(symbols[symbols.len() - padding].0));
    }
    if padding > 0 && symbols.len() % 4 != 0 {
        return Err(Base64Error::InvalidLength(symbols.len()));
    }

    let data = &symbols[..symbols.len() - padding];
    if data.len() % 4 == 1 {
        return Err(Base64Error::InvalidLength(symbols.len()));
    }

    let mut out = Vec::with_capacity(data.len() / 4 * 3 + 2);
    for quantum in data.chunks(4) {
        let mut bitmap: u32 = 0;
        for (offset, byte) in quantum {
            let value = match sextet(*byte) {
                Some(v) => v,
                None if *byte == PAD => return Err(Base64Error::InvalidPadding(*offset)),
                None => {
                    return Err(Base64Error::InvalidCharacter {
                        ch: char::from(*byte),
                        offset: *offset,
                    })
                }
            };
            bitmap = (bitmap << 6) | value;
        }
        // Left-align short trailing quanta as if padded with zero sextets.
        bitmap <<= 6 * (4 - quantum.len() as u32);

        out.push((bitmap >> 16) as u8);
        if quantum.len() > 2 {
            out.push((bitmap >> 8) as u8);
        }
        if quantum.len() > 3 {
            out.push(bitmap as u8);
        }
    }
    Ok(out)
}

//! Variable-length integers
//!
//! The two most significant bits of the first byte select the encoded length:
//!
//! ```text
//! +------+--------+-------------+-----------------------+
//! | bits | length | usable bits | range                 |
//! +------+--------+-------------+-----------------------+
//! | 00   | 1      | 6           | 0 - 63                |
//! | 01   | 2      | 14          | 0 - 16383             |
//! | 10   | 4      | 30          | 0 - 1073741823        |
//! | 11   | 8      | 62          | 0 - 9007199254740990  |
//! +------+--------+-------------+-----------------------+
//! ```
//!
//! The 8-byte class has room for 62 bits but values are capped at 2^53 - 2 so
//! they survive a trip through an IEEE-754 double on the consumer side.
//! Values are big-endian with the length bits packed into the top of the
//! first byte. Encoding always picks the shortest class.

use {
    crate::bytesio::{
        bytes_errors::{BytesReadError, BytesWriteError},
        bytes_reader::BytesReader,
        bytes_writer::BytesWriter,
    },
    byteorder::BigEndian,
};

pub const MAX_U6: u64 = 63;
pub const MAX_U14: u64 = 16_383;
pub const MAX_U30: u64 = 1_073_741_823;
pub const MAX_U53: u64 = 9_007_199_254_740_990;

const CLASS_2_BYTES: u16 = 0x4000;
const CLASS_4_BYTES: u32 = 0x8000_0000;
const CLASS_8_BYTES: u64 = 0xc000_0000_0000_0000;

#[derive(Debug, thiserror::Error)]
pub enum VarIntError {
    #[error("overflow, {0} is larger than 53 bit")]
    Overflow(u64),
    #[error("read error: {0}")]
    Read(#[from] BytesReadError),
    #[error("write error: {0}")]
    Write(#[from] BytesWriteError),
}

/// Encoded size of `value`, or `Overflow` when it can't be encoded at all.
pub fn varint_len(value: u64) -> Result<usize, VarIntError> {
    if value <= MAX_U6 {
        Ok(1)
    } else if value <= MAX_U14 {
        Ok(2)
    } else if value <= MAX_U30 {
        Ok(4)
    } else if value <= MAX_U53 {
        Ok(8)
    } else {
        Err(VarIntError::Overflow(value))
    }
}

/// Append `value` to `writer`, returning the number of bytes written.
pub fn write_varint(writer: &mut BytesWriter, value: u64) -> Result<usize, VarIntError> {
    let len = varint_len(value)?;
    match len {
        1 => writer.write_u8(value as u8)?,
        2 => writer.write_u16::<BigEndian>(value as u16 | CLASS_2_BYTES)?,
        4 => writer.write_u32::<BigEndian>(value as u32 | CLASS_4_BYTES)?,
        _ => writer.write_u64::<BigEndian>(value | CLASS_8_BYTES)?,
    }
    Ok(len)
}

/// Read one varint from the front of `reader`.
///
/// A truncated varint leaves the reader untouched.
pub fn read_varint(reader: &mut BytesReader) -> Result<u64, VarIntError> {
    let first = reader.peek_u8()?;

    let value = match first >> 6 {
        0 => u64::from(reader.read_u8()? & 0x3f),
        1 => u64::from(reader.read_u16::<BigEndian>()? & 0x3fff),
        2 => u64::from(reader.read_u32::<BigEndian>()? & 0x3fff_ffff),
        _ => reader.read_u64::<BigEndian>()? & 0x3fff_ffff_ffff_ffff,
    };

    if value > MAX_U53 {
        return Err(VarIntError::Overflow(value));
    }

    Ok(value)
}

use {
    super::bytes_errors::{BytesReadError, BytesReadErrorValue},
    byteorder::{ByteOrder, ReadBytesExt},
    bytes::{Bytes, BytesMut},
    std::io::Cursor,
};

/// Reader over exactly one wire unit.
///
/// Every read is checked against the bytes left in the unit, so a field can
/// never borrow bytes from whatever follows the unit on the transport.
pub struct BytesReader {
    buffer: BytesMut,
    consumed: usize,
}

impl BytesReader {
    #[must_use]
    pub const fn new(input: BytesMut) -> Self {
        Self {
            buffer: input,
            consumed: 0,
        }
    }

    #[must_use]
    pub fn from_bytes(input: Bytes) -> Self {
        Self::new(BytesMut::from(input))
    }

    fn ensure(&self, needed: usize) -> Result<(), BytesReadError> {
        if self.buffer.len() < needed {
            return Err(BytesReadErrorValue::NotEnoughBytes {
                needed,
                available: self.buffer.len(),
            }
            .into());
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, bytes_num: usize) -> Result<BytesMut, BytesReadError> {
        self.ensure(bytes_num)?;
        self.consumed += bytes_num;
        Ok(self.buffer.split_to(bytes_num))
    }

    pub fn read_u8(&mut self) -> Result<u8, BytesReadError> {
        if self.buffer.is_empty() {
            return Err(BytesReadErrorValue::EmptyStream.into());
        }
        let mut cursor = Cursor::new(self.read_bytes(1)?);
        Ok(cursor.read_u8()?)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, BytesReadError> {
        self.buffer
            .first()
            .copied()
            .ok_or_else(|| BytesReadErrorValue::EmptyStream.into())
    }

    pub fn read_u16<T: ByteOrder>(&mut self) -> Result<u16, BytesReadError> {
        let mut cursor = Cursor::new(self.read_bytes(2)?);
        Ok(cursor.read_u16::<T>()?)
    }

    pub fn read_u32<T: ByteOrder>(&mut self) -> Result<u32, BytesReadError> {
        let mut cursor = Cursor::new(self.read_bytes(4)?);
        Ok(cursor.read_u32::<T>()?)
    }

    pub fn read_u64<T: ByteOrder>(&mut self) -> Result<u64, BytesReadError> {
        let mut cursor = Cursor::new(self.read_bytes(8)?);
        Ok(cursor.read_u64::<T>()?)
    }

    /// Take everything left in the unit.
    pub fn extract_remaining_bytes(&mut self) -> BytesMut {
        self.consumed += self.buffer.len();
        self.buffer.split_to(self.buffer.len())
    }

    /// Bytes consumed since construction
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

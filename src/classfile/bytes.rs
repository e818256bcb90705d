//! Big-endian cursor over class file data

use super::error::{ClassFormatError, ClassFormatResult};

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, len: usize) -> ClassFormatResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ClassFormatError::Truncated { offset: self.pos, needed: len - self.remaining() });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> ClassFormatResult<()> {
        self.bytes(len).map(|_| ())
    }

    pub fn u8(&mut self) -> ClassFormatResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> ClassFormatResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> ClassFormatResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i32(&mut self) -> ClassFormatResult<i32> {
        self.u32().map(|v| v as i32)
    }

    pub fn i64(&mut self) -> ClassFormatResult<i64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_be_bytes(raw))
    }

    /// Advance to the next multiple of four, relative to the start of the data.
    pub fn align4(&mut self) -> ClassFormatResult<()> {
        let pad = (4 - self.pos % 4) % 4;
        self.skip(pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_and_reports_truncation() {
        let mut r = ByteReader::new(&[0xCA, 0xFE, 0xBA, 0xBE, 0x00]);
        assert_eq!(r.u32().unwrap(), 0xCAFEBABE);
        assert_eq!(r.u8().unwrap(), 0);
        assert_eq!(r.u16(), Err(ClassFormatError::Truncated { offset: 5, needed: 2 }));
    }
}

use crate::ExtractError;

#[inline(always)]
fn read_const_bytes<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], ExtractError> {
    offset.checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|b| b.try_into().ok())
        .ok_or(ExtractError::OutOfBounds { offset, width: N, len: data.len() })
}

pub fn read_u32_be(data: &[u8], offset: usize) -> Result<u32, ExtractError> {
    read_const_bytes(data, offset).map(u32::from_be_bytes)
}

pub fn read_i32_be(data: &[u8], offset: usize) -> Result<i32, ExtractError> {
    read_const_bytes(data, offset).map(i32::from_be_bytes)
}

pub fn read_f32_be(data: &[u8], offset: usize) -> Result<f32, ExtractError> {
    read_const_bytes(data, offset).map(f32::from_be_bytes)
}

pub fn read_u16_be(data: &[u8], offset: usize) -> Result<u16, ExtractError> {
    read_const_bytes(data, offset).map(u16::from_be_bytes)
}

pub fn read_i16_be(data: &[u8], offset: usize) -> Result<i16, ExtractError> {
    read_const_bytes(data, offset).map(i16::from_be_bytes)
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, ExtractError> {
    read_const_bytes(data, offset).map(u32::from_le_bytes)
}

/// Reads up to the first nul or the end of the buffer.
/// Non-ascii bytes become U+FFFD instead of failing.
pub fn read_cstring(data: &[u8], offset: usize) -> Result<String, ExtractError> {
    let tail = data.get(offset..)
        .ok_or(ExtractError::OutOfBounds { offset, width: 1, len: data.len() })?;

    let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    Ok(tail[..end].iter()
        .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
        .collect())
}

/// Reads an absolute pointer stored in a flat memory image.
/// Null and pointers past the end of the image read as `None`.
pub fn read_ptr_be(data: &[u8], offset: usize) -> Option<usize> {
    let value = read_u32_be(data, offset).ok()? as usize;
    if value == 0 || value >= data.len() {
        None
    } else {
        Some(value)
    }
}

#[derive(Clone)]
pub struct Stream<'a> {
    pub data: &'a [u8],

    // advanced through shared references while borrowed slices of data are alive
    cursor: std::cell::Cell<usize>,
}

impl<'a> Stream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: std::cell::Cell::new(0) }
    }

    pub fn at(data: &'a [u8], cursor: usize) -> Self {
        Self { data, cursor: std::cell::Cell::new(cursor) }
    }

    pub fn bump_cursor(&self, bump: usize) {
        let new_cursor = self.cursor.get() + bump;
        self.cursor.set(new_cursor);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor())
    }

    pub fn read_u32(&self) -> Result<u32, ExtractError> {
        let n = read_u32_be(self.data, self.cursor())?;
        self.bump_cursor(4);
        Ok(n)
    }

    pub fn read_u16(&self) -> Result<u16, ExtractError> {
        let n = read_u16_be(self.data, self.cursor())?;
        self.bump_cursor(2);
        Ok(n)
    }

    pub fn read_byte(&self) -> Result<u8, ExtractError> {
        let b = *self.data.get(self.cursor())
            .ok_or(ExtractError::OutOfBounds { offset: self.cursor(), width: 1, len: self.data.len() })?;
        self.bump_cursor(1);
        Ok(b)
    }
}

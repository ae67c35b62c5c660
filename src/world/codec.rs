use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Length-checked binary codec
///
/// Little-endian primitives and length-prefixed UTF-8 strings. Every read
/// validates the declared length against the remaining buffer, so a
/// truncated or corrupt file fails with CANNOT LOAD FILE instead of
/// producing partial state.

#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_str(&mut self, s: &str) {
        self.put_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn put_opt_str(&mut self, s: &Option<String>) {
        match s {
            Some(s) => {
                self.put_bool(true);
                self.put_str(s);
            }
            None => self.put_bool(false),
        }
    }
}

#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn truncated() -> Error {
        error!(CannotLoadFile; "TRUNCATED DATA")
    }

    pub fn get_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Reader::truncated());
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_raw(1)?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let raw = self.get_raw(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        let raw = self.get_raw(4)?;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        let raw = self.get_raw(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(i64::from_le_bytes(bytes))
    }

    /// A declared count that will drive a loop; bounded so a corrupt length
    /// cannot request absurd allocations.
    pub fn get_count(&mut self) -> Result<usize> {
        let n = self.get_u32()? as usize;
        if n > self.remaining() {
            return Err(Reader::truncated());
        }
        Ok(n)
    }

    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_u32()? as usize;
        let raw = self.get_raw(len)?;
        match std::str::from_utf8(raw) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(error!(CannotLoadFile; "INVALID TEXT ENCODING")),
        }
    }

    pub fn get_opt_str(&mut self) -> Result<Option<String>> {
        if self.get_bool()? {
            Ok(Some(self.get_str()?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_roundtrip() {
        let mut w = Writer::new();
        w.put_u32(7);
        w.put_i64(-42);
        w.put_str("héllo");
        w.put_opt_str(&None);
        w.put_opt_str(&Some("img.png".to_string()));
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_u32().unwrap(), 7);
        assert_eq!(r.get_i64().unwrap(), -42);
        assert_eq!(r.get_str().unwrap(), "héllo");
        assert_eq!(r.get_opt_str().unwrap(), None);
        assert_eq!(r.get_opt_str().unwrap(), Some("img.png".to_string()));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncation() {
        let mut w = Writer::new();
        w.put_str("abcdef");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes[..bytes.len() - 2]);
        let e = r.get_str().unwrap_err();
        assert!(e.is(ErrorCode::CannotLoadFile));
    }

    #[test]
    fn test_absurd_count() {
        let mut w = Writer::new();
        w.put_u32(u32::max_value());
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert!(r.get_count().is_err());
    }
}

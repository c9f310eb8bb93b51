#![forbid(unsafe_code)]
//! Fixed-width word arrays, varints and a parsing cursor shared by the
//! container, attribute and meta file formats.

pub mod words {
    //! Big-endian 8-byte words, the unit of every container array on disk.

    use crate::types::{GraphError, Result};

    /// Width of one stored word.
    pub const WORD_LEN: usize = core::mem::size_of::<i64>();

    /// Reads a signed big-endian word from the head of `src`.
    pub fn get_i64_be(src: &[u8]) -> Result<i64> {
        let head = src
            .get(..WORD_LEN)
            .ok_or(GraphError::Corruption("word truncated"))?;
        let mut bytes = [0u8; WORD_LEN];
        bytes.copy_from_slice(head);
        Ok(i64::from_be_bytes(bytes))
    }

    /// Appends every element of `words` to `out`.
    pub fn extend_words(out: &mut Vec<u8>, words: &[i64]) {
        out.reserve(words.len() * WORD_LEN);
        for &w in words {
            out.extend_from_slice(&w.to_be_bytes());
        }
    }

    /// Fills `dst` from a run of exactly `dst.len()` big-endian words.
    pub fn read_words(src: &[u8], dst: &mut [i64]) -> Result<()> {
        if src.len() != dst.len() * WORD_LEN {
            return Err(GraphError::Corruption("word run length mismatch"));
        }
        for (chunk, slot) in src.chunks_exact(WORD_LEN).zip(dst.iter_mut()) {
            *slot = get_i64_be(chunk)?;
        }
        Ok(())
    }
}

pub mod var {
    //! Unsigned varints.

    use crate::types::{GraphError, Result};

    /// Encodes a u64 as an unsigned varint.
    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            } else {
                out.push(byte | 0x80);
            }
        }
    }

    /// Decodes a u64 varint from a slice, updating the offset.
    pub fn decode_u64(src: &[u8], off: &mut usize) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        for i in 0..10 {
            let byte = *src
                .get(*off)
                .ok_or(GraphError::Corruption("varint truncated"))?;
            *off += 1;
            let payload = (byte & 0x7f) as u64;
            if i == 9 && payload > 1 {
                return Err(GraphError::Corruption("varint overflows 64 bits"));
            }
            result |= payload << shift;
            if (byte & 0x80) == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(GraphError::Corruption("varint longer than 10 bytes"))
    }
}

pub mod buf {
    //! A simple slice-backed cursor for ergonomic parsing.

    use core::fmt;

    use crate::types::{GraphError, Result};

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, failing with a corruption error past the end.
        pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
            let end = self
                .off
                .checked_add(n)
                .ok_or(GraphError::Corruption("cursor offset overflow"))?;
            if end > self.buf.len() {
                return Err(GraphError::Corruption("record truncated"));
            }
            let slice = &self.buf[self.off..end];
            self.off = end;
            Ok(slice)
        }

        fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
            let mut out = [0u8; N];
            out.copy_from_slice(self.take(N)?);
            Ok(out)
        }

        /// Reads a big-endian u32.
        pub fn u32_be(&mut self) -> Result<u32> {
            self.array().map(u32::from_be_bytes)
        }

        /// Reads a big-endian u64.
        pub fn u64_be(&mut self) -> Result<u64> {
            self.array().map(u64::from_be_bytes)
        }

        /// Reads a big-endian i64.
        pub fn i64_be(&mut self) -> Result<i64> {
            self.array().map(i64::from_be_bytes)
        }

        /// Reads an unsigned varint.
        pub fn varint(&mut self) -> Result<u64> {
            super::var::decode_u64(self.buf, &mut self.off)
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{buf::Cursor, var, words};
    use proptest::prelude::*;

    #[test]
    fn short_word_is_corruption() {
        assert!(words::get_i64_be(&[0u8; 7]).is_err());
        let mut dst = [0i64; 2];
        assert!(words::read_words(&[0u8; 12], &mut dst).is_err());
    }

    #[test]
    fn words_are_big_endian() {
        let mut out = Vec::new();
        words::extend_words(&mut out, &[1, -2]);
        assert_eq!(&out[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&out[8..], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn truncated_varint_is_corruption() {
        let mut off = 0;
        let err = var::decode_u64(&[0x80, 0x80], &mut off).unwrap_err();
        assert!(matches!(err, crate::types::GraphError::Corruption(_)));
    }

    #[test]
    fn cursor_take_past_end_fails() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.take(2).unwrap(), &[1, 2]);
        assert!(cursor.take(2).is_err());
        assert_eq!(cursor.remaining(), 1);
    }

    proptest! {
        #[test]
        fn varint_roundtrip_prop(xs in proptest::collection::vec(any::<u64>(), 1..64)) {
            let mut encoded = Vec::new();
            for &x in &xs {
                var::encode_u64(x, &mut encoded);
            }
            let mut cursor = Cursor::new(&encoded);
            for &x in &xs {
                prop_assert_eq!(cursor.varint().unwrap(), x);
            }
            prop_assert_eq!(cursor.remaining(), 0);
        }

        #[test]
        fn word_run_prop(xs in proptest::collection::vec(any::<i64>(), 0..128)) {
            let mut encoded = Vec::new();
            words::extend_words(&mut encoded, &xs);
            let mut decoded = vec![0i64; xs.len()];
            words::read_words(&encoded, &mut decoded).unwrap();
            prop_assert_eq!(decoded, xs);
        }
    }
}

use crate::primitives::bytes::{buf::Cursor, var};
use crate::storage::address::CONTAINER_SIZE;
use crate::types::{file_crc32, GraphError, Result};

/// Magic prefix of attribute files.
pub const ATTRIBUTE_MAGIC: [u8; 4] = *b"PGAT";

/// Per-slot attribute payloads of one container, loaded and saved
/// independently of the structural arrays.
///
/// An empty payload is the default value and is stored as `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeBlobs {
    slots: Vec<Option<Vec<u8>>>,
}

impl Default for AttributeBlobs {
    fn default() -> Self {
        Self {
            slots: vec![None; CONTAINER_SIZE],
        }
    }
}

impl AttributeBlobs {
    /// Payload of a slot.
    pub fn get(&self, slot: usize) -> Option<&[u8]> {
        self.slots[slot].as_deref()
    }

    /// Replaces the payload of a slot, returning the previous one.
    pub fn set(&mut self, slot: usize, blob: Option<Vec<u8>>) -> Option<Vec<u8>> {
        let blob = blob.filter(|b| !b.is_empty());
        std::mem::replace(&mut self.slots[slot], blob)
    }

    /// True when no slot carries data; such containers get no attribute file.
    pub fn is_default(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Serializes all slots: magic, slot count, snappy body, CRC32 footer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for slot in &self.slots {
            match slot {
                Some(bytes) => {
                    var::encode_u64(bytes.len() as u64, &mut body);
                    body.extend_from_slice(bytes);
                }
                None => var::encode_u64(0, &mut body),
            }
        }
        let compressed = snap::raw::Encoder::new()
            .compress_vec(&body)
            .map_err(|_| GraphError::Invariant("attribute body not compressible"))?;
        let mut out = Vec::with_capacity(compressed.len() + 12);
        out.extend_from_slice(&ATTRIBUTE_MAGIC);
        out.extend_from_slice(&(self.slots.len() as u32).to_be_bytes());
        out.extend_from_slice(&compressed);
        let crc = file_crc32(&ATTRIBUTE_MAGIC, &out[4..]);
        out.extend_from_slice(&crc.to_be_bytes());
        Ok(out)
    }

    /// Parses an attribute file image.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < 12 || src[..4] != ATTRIBUTE_MAGIC {
            return Err(GraphError::Corruption("attribute file header invalid"));
        }
        let (payload, footer) = src.split_at(src.len() - 4);
        let stored = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
        if file_crc32(&ATTRIBUTE_MAGIC, &payload[4..]) != stored {
            return Err(GraphError::Corruption("attribute file crc mismatch"));
        }
        let mut cursor = Cursor::new(&payload[4..]);
        let count = cursor.u32_be()? as usize;
        if count != CONTAINER_SIZE {
            return Err(GraphError::Corruption("attribute slot count mismatch"));
        }
        let body = snap::raw::Decoder::new()
            .decompress_vec(cursor.take(cursor.remaining())?)
            .map_err(|_| GraphError::Corruption("attribute body not valid snappy"))?;
        let mut cursor = Cursor::new(&body);
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let len = usize::try_from(cursor.varint()?)
                .map_err(|_| GraphError::Corruption("attribute length overflow"))?;
            if len == 0 {
                slots.push(None);
            } else {
                slots.push(Some(cursor.take(len)?.to_vec()));
            }
        }
        if cursor.remaining() != 0 {
            return Err(GraphError::Corruption("trailing bytes in attribute body"));
        }
        Ok(Self { slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_blobs_survive_encoding() {
        let mut blobs = AttributeBlobs::default();
        assert!(blobs.is_default());
        blobs.set(0, Some(b"name=alpha".to_vec()));
        blobs.set(CONTAINER_SIZE - 1, Some(vec![0xAB; 300]));
        assert!(!blobs.is_default());
        let image = blobs.encode().unwrap();
        let decoded = AttributeBlobs::decode(&image).unwrap();
        assert_eq!(decoded, blobs);
        assert_eq!(decoded.get(0), Some(&b"name=alpha"[..]));
        assert_eq!(decoded.get(1), None);
    }

    #[test]
    fn empty_payload_is_default() {
        let mut blobs = AttributeBlobs::default();
        blobs.set(3, Some(Vec::new()));
        assert!(blobs.is_default());
    }

    #[test]
    fn flipped_byte_is_detected() {
        let mut blobs = AttributeBlobs::default();
        blobs.set(5, Some(b"payload".to_vec()));
        let mut image = blobs.encode().unwrap();
        let mid = image.len() / 2;
        image[mid] ^= 0xFF;
        assert!(matches!(
            AttributeBlobs::decode(&image),
            Err(GraphError::Corruption(_))
        ));
    }
}

use crate::primitives::bytes::buf::Cursor;
use crate::storage::cache::KindSnapshot;
use crate::storage::free_list::{Extent, FreeIndexList};
use crate::types::{file_crc32, ElementId, GraphError, PartitionId, Result};

use super::graph_types::SequenceAnchors;

/// Magic prefix of the graph meta file.
pub const META_MAGIC: [u8; 4] = *b"PGMT";
/// Current meta format version.
pub const META_VERSION: u32 = 1;

/// Contents of `graph.meta`: everything needed to reopen a partial graph
/// whose containers are on disk.
///
/// Layout, all big-endian: magic, version `u32`, partition `u32`, six
/// anchor/version words `i64`, then per kind a live count `u64`, container
/// count `u32`, high-water id `u64`, extent count `u32` and the extents as
/// `(start u32, len u32)`. A CRC32 of everything after the magic closes the
/// file.
#[derive(Clone, Debug)]
pub(crate) struct GraphMeta {
    pub(crate) partition: PartitionId,
    pub(crate) anchors: SequenceAnchors,
    pub(crate) kinds: [KindSnapshot; 3],
}

impl GraphMeta {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.extend_from_slice(&META_MAGIC);
        out.extend_from_slice(&META_VERSION.to_be_bytes());
        out.extend_from_slice(&self.partition.0.to_be_bytes());
        let a = &self.anchors;
        for word in [
            a.first_vertex.0,
            a.last_vertex.0,
            a.vertex_list_version,
            a.first_edge.0,
            a.last_edge.0,
            a.edge_list_version,
        ] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        for kind in &self.kinds {
            out.extend_from_slice(&kind.free.used_count().to_be_bytes());
            out.extend_from_slice(&kind.container_count.to_be_bytes());
            out.extend_from_slice(&kind.free.next_fresh().to_be_bytes());
            let extents = kind.free.extents();
            out.extend_from_slice(&(extents.len() as u32).to_be_bytes());
            for extent in extents {
                out.extend_from_slice(&extent.start.to_be_bytes());
                out.extend_from_slice(&extent.len.to_be_bytes());
            }
        }
        let crc = file_crc32(&META_MAGIC, &out[4..]);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    pub(crate) fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < 12 || src[..4] != META_MAGIC {
            return Err(GraphError::Corruption("meta file header invalid"));
        }
        let (payload, footer) = src.split_at(src.len() - 4);
        let stored = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
        if file_crc32(&META_MAGIC, &payload[4..]) != stored {
            return Err(GraphError::Corruption("meta file crc mismatch"));
        }
        let mut cur = Cursor::new(&payload[4..]);
        if cur.u32_be()? != META_VERSION {
            return Err(GraphError::Corruption("unsupported meta file version"));
        }
        let partition = PartitionId(cur.u32_be()?);
        let anchors = SequenceAnchors {
            first_vertex: ElementId(cur.i64_be()?),
            last_vertex: ElementId(cur.i64_be()?),
            vertex_list_version: cur.i64_be()?,
            first_edge: ElementId(cur.i64_be()?),
            last_edge: ElementId(cur.i64_be()?),
            edge_list_version: cur.i64_be()?,
        };
        let kinds = [
            Self::decode_kind(&mut cur)?,
            Self::decode_kind(&mut cur)?,
            Self::decode_kind(&mut cur)?,
        ];
        if cur.remaining() != 0 {
            return Err(GraphError::Corruption("trailing bytes in meta file"));
        }
        Ok(Self {
            partition,
            anchors,
            kinds,
        })
    }

    fn decode_kind(cur: &mut Cursor<'_>) -> Result<KindSnapshot> {
        let used = cur.u64_be()?;
        let container_count = cur.u32_be()?;
        let next_fresh = cur.u64_be()?;
        let extent_count = cur.u32_be()? as usize;
        if extent_count > cur.remaining() / 8 {
            return Err(GraphError::Corruption("meta extent count exceeds file"));
        }
        let mut extents = Vec::with_capacity(extent_count);
        for _ in 0..extent_count {
            extents.push(Extent::new(cur.u32_be()?, cur.u32_be()?));
        }
        let free = FreeIndexList::from_parts(extents, next_fresh)?;
        if free.used_count() != used {
            return Err(GraphError::Corruption("meta element count disagrees with free list"));
        }
        Ok(KindSnapshot {
            container_count,
            free,
        })
    }
}

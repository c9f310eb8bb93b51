//! Directory of backing files.
//!
//! Each `(kind, container)` pair owns one fixed-length data file and, when any
//! slot carries attribute data, one attribute file. The graph meta file sits
//! next to them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::primitives::io::{FileIo, StdFileIo};
use crate::storage::container::{AttributeBlobs, StorageContainer};
use crate::types::{ContainerId, ElementKind, GraphError, Result};

/// File name of the graph metadata file.
pub const META_FILE_NAME: &str = "graph.meta";

/// Owns the on-disk layout of one partial graph.
#[derive(Debug)]
pub struct BackingStore {
    dir: PathBuf,
}

impl BackingStore {
    /// Opens (creating if needed) the backing directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a container's data file.
    pub fn data_path(&self, kind: ElementKind, container: ContainerId) -> PathBuf {
        self.dir
            .join(format!("{}_{:08}.dat", kind.as_str(), container.0))
    }

    /// Path of a container's attribute file.
    pub fn attribute_path(&self, kind: ElementKind, container: ContainerId) -> PathBuf {
        self.dir
            .join(format!("{}_{:08}.attr", kind.as_str(), container.0))
    }

    /// Path of the graph meta file.
    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE_NAME)
    }

    /// True once the container has been written back at least once.
    pub fn has_container(&self, kind: ElementKind, container: ContainerId) -> bool {
        self.data_path(kind, container).is_file()
    }

    /// Writes a container image and forces it durable.
    pub fn write_container<C: StorageContainer>(
        &self,
        kind: ElementKind,
        container: ContainerId,
        data: &C,
    ) -> Result<()> {
        let image = data.encode();
        let path = self.data_path(kind, container);
        StdFileIo::open(&path)
            .and_then(|io| io.replace_all(&image))
            .map_err(|err| err.in_container(kind, container))?;
        debug!(
            kind = kind.as_str(),
            container = container.0,
            bytes = image.len(),
            "backing.write_container"
        );
        Ok(())
    }

    /// Fills `data` from a previously written container image.
    pub fn read_container_into<C: StorageContainer>(
        &self,
        kind: ElementKind,
        container: ContainerId,
        data: &mut C,
    ) -> Result<()> {
        let path = self.data_path(kind, container);
        let mut read = || -> Result<()> {
            let io = StdFileIo::open_existing(&path)?
                .ok_or(GraphError::Corruption("saved container file is missing"))?;
            let image = io.read_all()?;
            data.decode_into(&image)
        };
        read().map_err(|err| err.in_container(kind, container))?;
        trace!(
            kind = kind.as_str(),
            container = container.0,
            "backing.read_container"
        );
        Ok(())
    }

    /// Persists attribute blobs. Containers without attribute data keep no file.
    pub fn write_attributes(
        &self,
        kind: ElementKind,
        container: ContainerId,
        blobs: &AttributeBlobs,
    ) -> Result<()> {
        let path = self.attribute_path(kind, container);
        let write = || -> Result<()> {
            if blobs.is_default() {
                return remove_if_present(&path);
            }
            let image = blobs.encode()?;
            StdFileIo::open(&path)?.replace_all(&image)
        };
        write().map_err(|err| err.in_container(kind, container))
    }

    /// Loads attribute blobs; a missing file means every slot is default.
    pub fn read_attributes(
        &self,
        kind: ElementKind,
        container: ContainerId,
    ) -> Result<AttributeBlobs> {
        let path = self.attribute_path(kind, container);
        let read = || -> Result<AttributeBlobs> {
            match StdFileIo::open_existing(&path)? {
                Some(io) => AttributeBlobs::decode(&io.read_all()?),
                None => Ok(AttributeBlobs::default()),
            }
        };
        read().map_err(|err| err.in_container(kind, container))
    }

    /// Replaces the meta file.
    pub fn write_meta(&self, image: &[u8]) -> Result<()> {
        StdFileIo::open(self.meta_path())?.replace_all(image)
    }

    /// Reads the meta file, if one was ever written.
    pub fn read_meta(&self) -> Result<Option<Vec<u8>>> {
        match StdFileIo::open_existing(self.meta_path())? {
            Some(io) => Ok(Some(io.read_all()?)),
            None => Ok(None),
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

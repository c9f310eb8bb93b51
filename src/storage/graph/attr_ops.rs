use tracing::trace;

use super::helpers::element_kind_of;
use super::PartialGraph;
use crate::types::{ElementId, Result};

impl PartialGraph {
    /// Containment parent of a vertex or edge.
    pub fn sigma_of(&self, id: ElementId) -> Result<ElementId> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.sigma_of(id);
        }
        let at = self.element(element_kind_of(id), id)?;
        let sigma = at.handle.read().sigma(at.slot);
        Ok(ElementId(sigma))
    }

    /// Sets the containment parent of a vertex or edge.
    pub fn set_sigma(&self, id: ElementId, sigma: ElementId) -> Result<()> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.set_sigma(id, sigma);
        }
        let _writer = self.begin_mutation()?;
        let at = self.element(element_kind_of(id), id)?;
        at.handle.write().set_sigma(at.slot, sigma.0);
        Ok(())
    }

    /// Visibility level of a vertex or edge.
    pub fn kappa_of(&self, id: ElementId) -> Result<i64> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.kappa_of(id);
        }
        let at = self.element(element_kind_of(id), id)?;
        let kappa = at.handle.read().kappa(at.slot);
        Ok(kappa)
    }

    /// Sets the visibility level of a vertex or edge.
    pub fn set_kappa(&self, id: ElementId, kappa: i64) -> Result<()> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.set_kappa(id, kappa);
        }
        let _writer = self.begin_mutation()?;
        let at = self.element(element_kind_of(id), id)?;
        at.handle.write().set_kappa(at.slot, kappa);
        Ok(())
    }

    /// Opaque attribute payload of a vertex or edge; `None` when unset.
    pub fn attribute_blob(&self, id: ElementId) -> Result<Option<Vec<u8>>> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.attribute_blob(id);
        }
        let kind = element_kind_of(id);
        let at = self.element(kind, id)?;
        self.cache
            .elements(kind)?
            .read_attributes(&at.handle, |blobs| blobs.get(at.slot).map(<[u8]>::to_vec))
    }

    /// Replaces the attribute payload of a vertex or edge. `None` or an
    /// empty payload clears it.
    pub fn set_attribute_blob(&self, id: ElementId, blob: Option<Vec<u8>>) -> Result<()> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.set_attribute_blob(id, blob);
        }
        let _writer = self.begin_mutation()?;
        let kind = element_kind_of(id);
        let at = self.element(kind, id)?;
        let len = blob.as_ref().map_or(0, Vec::len);
        self.cache
            .elements(kind)?
            .write_attributes(&at.handle, |blobs| blobs.set(at.slot, blob))?;
        trace!(id = id.0, len, "graph.set_attribute_blob");
        Ok(())
    }
}

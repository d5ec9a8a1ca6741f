//! In-memory object URLs for preview and result media.
//!
//! Every handle handed out by [`BlobStore::create`] holds its bytes until it is revoked;
//! owners revoke superseded handles so repeated uploads do not accumulate.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<Vec<u8>>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<BlobUrl, Blob>,
}

impl BlobStore {
    /// Registers `bytes` under a fresh handle. The bytes are shared, not copied.
    pub fn create(
        &mut self,
        bytes: impl Into<Arc<Vec<u8>>>,
        content_type: impl Into<String>,
    ) -> BlobUrl {
        let url = BlobUrl(format!("blob:{}", Uuid::new_v4()));
        self.blobs.insert(
            url.clone(),
            Blob {
                bytes: bytes.into(),
                content_type: content_type.into(),
            },
        );
        url
    }

    pub fn get(&self, url: &BlobUrl) -> Option<&Blob> {
        self.blobs.get(url)
    }

    /// Releases the bytes behind `url`. Revoking twice is harmless.
    pub fn revoke(&mut self, url: &BlobUrl) -> bool {
        self.blobs.remove(url).is_some()
    }

    /// Revokes the handle in `slot`, if any, leaving the slot empty.
    pub fn revoke_slot(&mut self, slot: &mut Option<BlobUrl>) {
        if let Some(url) = slot.take() {
            self.revoke(&url);
        }
    }

    pub fn live(&self) -> usize {
        self.blobs.len()
    }
}

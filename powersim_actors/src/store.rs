//! Content-addressed object storage.

use crate::abi::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error for {cid}: {reason}")]
    Decode { cid: Cid, reason: String },
}

/// A content-addressed block store.
///
/// Blocks are immutable once written, so handles can be shared freely
/// between ledger snapshots of different epochs.
pub trait Blockstore {
    /// Returns the block stored under `cid`, if any.
    fn get(&self, cid: &Cid) -> Option<Vec<u8>>;

    /// Stores a block and returns its CID.
    fn put(&self, block: Vec<u8>) -> Cid;
}

/// Typed access on top of any [`Blockstore`].
pub trait BlockstoreExt: Blockstore {
    /// Loads and decodes an object. `Ok(None)` if the CID is unknown.
    fn get_obj<T: DeserializeOwned>(&self, cid: &Cid) -> Result<Option<T>, StoreError> {
        match self.get(cid) {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    cid: *cid,
                    reason: e.to_string(),
                }),
        }
    }

    /// Encodes and stores an object.
    fn put_obj<T: Serialize>(&self, obj: &T) -> Result<Cid, StoreError> {
        let bytes = serde_json::to_vec(obj).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(self.put(bytes))
    }
}

impl<B: Blockstore + ?Sized> BlockstoreExt for B {}

//! In-memory content-addressed block store.

use powersim_actors::{Blockstore, Cid};
use std::cell::RefCell;
use std::collections::HashMap;

/// Block store backed by a hash map.
///
/// Blocks are never removed, so the store can be shared between ledger
/// handles of different epochs.
#[derive(Debug, Default)]
pub struct MemoryBlockstore {
    blocks: RefCell<HashMap<Cid, Vec<u8>>>,
}

impl MemoryBlockstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blocks stored.
    pub fn len(&self) -> usize {
        self.blocks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.borrow().is_empty()
    }
}

impl Blockstore for MemoryBlockstore {
    fn get(&self, cid: &Cid) -> Option<Vec<u8>> {
        self.blocks.borrow().get(cid).cloned()
    }

    fn put(&self, block: Vec<u8>) -> Cid {
        let cid = Cid::of(&block);
        self.blocks.borrow_mut().entry(cid).or_insert(block);
        cid
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

static TXN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Permission requested when fetching a page from the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Implementation of transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    /// Id of transaction.
    id: u64,
}

impl TransactionId {
    /// Creates a new transaction id.
    pub fn new() -> Self {
        Self {
            id: TXN_COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Returns the transaction id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        TransactionId::new()
    }
}

/// The type for the container ID and the associated atomic type (for use within a Storage Manager).
/// ContainerIds are used by the storage manager to keep track of separate heap files;
/// a container corresponds one-to-one with a table. This is the same width as
/// `Table::id` (a hash of the table name, see `common::table`) since a
/// container id *is* a table id once a table has been registered with storage.
pub type ContainerId = u64;
pub type AtomicContainerId = AtomicU64;
pub type SegmentId = u8;
/// A page's position within its heap file.
pub type PageNum = u16;
pub type SlotId = u16;

/// A page's full identity: which table's heap file it lives in, and its
/// position within that file. Value-equal and hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub container_id: ContainerId,
    pub page_num: PageNum,
}

impl PageId {
    pub fn new(container_id: ContainerId, page_num: PageNum) -> Self {
        Self {
            container_id,
            page_num,
        }
    }
}

/// Holds information to find a record or value's bytes in a storage manager.
/// Depending on storage manager (SM), various elements may be used.
/// For example a disk-based SM may use pages to store the records, where
/// a main-memory based storage manager may not.
///
/// This also serves as a Tuple's `RecordId`: `container_id` names the table,
/// `page_id` + `slot_id` together are the `(PageId, slotNo)` pair.
#[derive(PartialEq, Clone, Copy, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ValueId {
    /// The source of the value. This could represent a table, index, or other data structure.
    /// All values stored must be associated with a container that is created by the storage manager.
    pub container_id: ContainerId,
    /// An optional segment or partition ID.
    pub segment_id: Option<SegmentId>,
    /// An optional page number within the container's heap file.
    pub page_id: Option<PageNum>,
    /// An optional slot id. This could represent a physical or logical ID.
    pub slot_id: Option<SlotId>,
}

impl ValueId {
    pub fn new(container_id: ContainerId) -> Self {
        ValueId {
            container_id,
            segment_id: None,
            page_id: None,
            slot_id: None,
        }
    }

    pub fn new_page(container_id: ContainerId, page_id: PageNum) -> Self {
        ValueId {
            container_id,
            segment_id: None,
            page_id: Some(page_id),
            slot_id: None,
        }
    }

    pub fn new_slot(container_id: ContainerId, page_id: PageNum, slot_id: SlotId) -> Self {
        ValueId {
            container_id,
            segment_id: None,
            page_id: Some(page_id),
            slot_id: Some(slot_id),
        }
    }
}

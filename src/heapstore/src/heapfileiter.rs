//! Sequential iteration over every live tuple in a heap file, in page/slot
//! order. Pages are decoded and buffered one at a time rather than held as a
//! borrowed `PageIter` across calls, since the page itself is read fresh
//! from disk on each page boundary.
//!
//! Per §4.2: the set of pages walked is snapshotted at construction time
//! (which corresponds to the scan operator's `open`/`rewind`). Pages the
//! heap file grows into afterward are not visible to an iterator already
//! in flight.

use crate::heapfile::HeapFile;
use common::ids::{ContainerId, PageNum, TransactionId};
use common::Tuple;
use std::collections::VecDeque;
use std::sync::Arc;

/// Walks every page of `hf` from the front, yielding tuples in the order
/// they occupy their slots.
pub struct HeapFileIterator {
    container_id: ContainerId,
    #[allow(dead_code)]
    tid: TransactionId,
    hf: Arc<HeapFile>,
    next_page: PageNum,
    /// Page count as of construction; pages allocated after this point are
    /// not visible to this iterator (snapshot-at-open semantics, §4.2).
    num_pages_snapshot: PageNum,
    buffer: VecDeque<Tuple>,
}

impl HeapFileIterator {
    pub(crate) fn new(container_id: ContainerId, tid: TransactionId, hf: Arc<HeapFile>) -> Self {
        let num_pages_snapshot = hf.num_pages();
        HeapFileIterator {
            container_id,
            tid,
            hf,
            next_page: 0,
            num_pages_snapshot,
            buffer: VecDeque::new(),
        }
    }

    /// Pull the next non-empty page's tuples into the buffer. Returns false
    /// once there are no more pages to read.
    fn fill_buffer(&mut self) -> bool {
        while self.buffer.is_empty() && self.next_page < self.num_pages_snapshot {
            if let Ok(page) = self.hf.read_page_from_file(self.next_page) {
                for (slot, mut tuple) in page.iter(&self.hf.schema) {
                    tuple.record_id = Some(common::ids::ValueId::new_slot(
                        self.container_id,
                        self.next_page,
                        slot,
                    ));
                    self.buffer.push_back(tuple);
                }
            }
            self.next_page += 1;
        }
        !self.buffer.is_empty()
    }
}

impl Iterator for HeapFileIterator {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.fill_buffer() {
            return None;
        }
        self.buffer.pop_front()
    }
}

//! The buffer-pool contract consumed by the operator layer (§6). Concrete
//! storage engines (see `heapstore::StorageManager`) implement this against
//! real heap files; the operator tree only ever talks to this trait.

use crate::ids::{ContainerId, PageId, PageNum, Permissions, TransactionId, ValueId};
use crate::page::Page;
use crate::{CrustyError, TableSchema, Tuple};

pub trait StorageTrait {
    /// Iterator returned by `get_iterator`, yielding tuples in page/slot order.
    type ValIterator: Iterator<Item = Tuple>;

    /// Create a storage manager rooted at `storage_path`.
    fn new(storage_path: String) -> Self;

    /// Create a storage manager backed by a throwaway temp directory, for tests.
    fn new_test_sm() -> Self;

    /// Register a table (container) with the schema its tuples conform to.
    /// Must be called before any insert/get/iterate against `table_id`.
    fn register_container(&self, table_id: ContainerId, schema: TableSchema) -> Result<(), CrustyError>;

    /// Remove a container and all of its stored data.
    fn remove_container(&self, table_id: ContainerId) -> Result<(), CrustyError>;

    /// Fetch a page by id under the given permission.
    fn get_page(&self, tid: TransactionId, page_id: PageId, perm: Permissions) -> Result<Page, CrustyError>;

    /// Write a page back (the page must belong to `table_id`'s container).
    fn write_page(&self, table_id: ContainerId, page: Page, tid: TransactionId) -> Result<(), CrustyError>;

    /// Insert a tuple into the named table, returning the record id it was
    /// assigned and the id of the page it landed on.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: ContainerId,
        tuple: Tuple,
    ) -> Result<ValueId, CrustyError>;

    /// Delete the tuple named by `rid`, returning the id of the page it was
    /// removed from.
    fn delete_tuple(&self, tid: TransactionId, rid: ValueId) -> Result<PageId, CrustyError>;

    /// Number of pages currently allocated for a table.
    fn get_num_pages(&self, table_id: ContainerId) -> PageNum;

    /// An iterator over every live tuple in a table, in page/slot order.
    fn get_iterator(&self, tid: TransactionId, table_id: ContainerId, perm: Permissions) -> Self::ValIterator;

    /// Notify the storage manager that `tid` is finished; any state held on
    /// its behalf may be released. Locking/recovery semantics are out of
    /// scope here — this is purely a resource-release hook.
    fn transaction_complete(&self, tid: TransactionId) -> Result<(), CrustyError>;

    /// Testing utility: reset all state associated with the storage manager.
    fn reset(&self) -> Result<(), CrustyError>;

    /// Shut down the storage manager, flushing/removing as appropriate.
    fn shutdown(&self);
}

use crate::opiterator::{not_open, OpIterator};
use crate::StorageManager;
use common::ids::{ContainerId, Permissions, TransactionId};
use common::storage_trait::StorageTrait;
use common::{Attribute, CrustyError, TableSchema, Tuple};
use std::sync::Arc;

/// Walks every live tuple of one table, in page/slot order (§4.2). The page
/// count is snapshotted at `open()`/`rewind()` time: pages the storage
/// manager allocates afterward are not visible to a scan already running.
pub struct SeqScan {
    storage_manager: Arc<StorageManager>,
    container_id: ContainerId,
    tid: TransactionId,
    schema: TableSchema,
    iter: Option<<StorageManager as StorageTrait>::ValIterator>,
}

impl SeqScan {
    /// `table_schema` is the table's own schema; every attribute is renamed
    /// to `"alias.field"` for the operator's output schema.
    pub fn new(
        storage_manager: Arc<StorageManager>,
        container_id: ContainerId,
        table_schema: &TableSchema,
        alias: &str,
        tid: TransactionId,
    ) -> Self {
        let attrs = table_schema
            .attributes()
            .map(|a| Attribute::new(format!("{}.{}", alias, a.name()), a.dtype().clone()))
            .collect();
        SeqScan {
            storage_manager,
            container_id,
            tid,
            schema: TableSchema::new(attrs),
            iter: None,
        }
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<(), CrustyError> {
        debug!("seq_scan open container={}", self.container_id);
        self.iter = Some(
            self.storage_manager
                .get_iterator(self.tid, self.container_id, Permissions::ReadOnly),
        );
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        let iter = self.iter.as_mut().ok_or_else(|| not_open("seq_scan"))?;
        Ok(iter.next())
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        debug!("seq_scan close container={}", self.container_id);
        self.iter = None;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.open()
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

/// Test-only helpers shared across operator unit tests: a simple
/// in-memory `OpIterator` over a fixed set of rows, so join/filter/etc.
/// tests don't each need their own storage manager and heap file.
#[cfg(test)]
pub(crate) mod tests_support {
    use crate::opiterator::{not_open, OpIterator};
    use common::{CrustyError, DataType, TableSchema, Tuple};

    /// An `OpIterator` over a fixed, in-memory set of int rows, schema
    /// `field0..fieldN-1`, all `Int`. Snapshot semantics are irrelevant here
    /// since there is no underlying mutable store.
    pub struct ConstIterator {
        schema: TableSchema,
        rows: Vec<Tuple>,
        pos: usize,
        open: bool,
    }

    impl OpIterator for ConstIterator {
        fn open(&mut self) -> Result<(), CrustyError> {
            self.open = true;
            self.pos = 0;
            Ok(())
        }

        fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
            if !self.open {
                return Err(not_open("const_iterator"));
            }
            let t = self.rows.get(self.pos).cloned();
            if t.is_some() {
                self.pos += 1;
            }
            Ok(t)
        }

        fn close(&mut self) -> Result<(), CrustyError> {
            self.open = false;
            Ok(())
        }

        fn rewind(&mut self) -> Result<(), CrustyError> {
            self.pos = 0;
            Ok(())
        }

        fn get_schema(&self) -> &TableSchema {
            &self.schema
        }
    }

    /// Build a boxed `ConstIterator` over `rows`, each a vector of ints for
    /// `field0..fieldN-1`.
    pub fn const_iterator(rows: Vec<Vec<i32>>) -> Box<dyn OpIterator> {
        let width = rows.first().map(|r| r.len()).unwrap_or(1);
        let names: Vec<String> = (0..width).map(|i| format!("field{}", i)).collect();
        let attrs = names
            .iter()
            .map(|n| common::Attribute::new(n.clone(), DataType::Int))
            .collect();
        let schema = TableSchema::new(attrs);
        let tuples = rows
            .into_iter()
            .map(|r| common::testutil::int_vec_to_tuple(r))
            .collect();
        Box::new(ConstIterator {
            schema,
            rows: tuples,
            pos: 0,
            open: false,
        })
    }
}

use crate::opiterator::{not_open, OpIterator};
use crate::StorageManager;
use common::ids::{ContainerId, TransactionId};
use common::storage_trait::StorageTrait;
use common::{Attribute, CrustyError, DataType, Field, TableSchema, Tuple};
use std::sync::Arc;

fn output_schema() -> TableSchema {
    TableSchema::new(vec![Attribute::new("inserted".to_string(), DataType::Int)])
}

/// IO failures mid-write leave the storage layer's state for this
/// transaction uncertain, so per §4.10 they're surfaced as a transaction
/// abort rather than a plain db error.
fn io_as_aborted(e: CrustyError) -> CrustyError {
    match e {
        CrustyError::IOError(msg) => CrustyError::TransactionAbortedError(msg),
        other => other,
    }
}

/// Drains its child and inserts every tuple into `container_id` (§4.10).
/// A pipeline breaker: the entire child is consumed on the first `next()`
/// call after `open()`, which then emits a single `[count:INT]` tuple.
/// Every subsequent `next()` (without an intervening `open()`) returns
/// end-of-stream.
pub struct Insert {
    storage_manager: Arc<StorageManager>,
    container_id: ContainerId,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    schema: TableSchema,
    done: bool,
    open: bool,
}

impl Insert {
    pub fn new(
        storage_manager: Arc<StorageManager>,
        container_id: ContainerId,
        tid: TransactionId,
        child: Box<dyn OpIterator>,
    ) -> Self {
        Insert {
            storage_manager,
            container_id,
            tid,
            child,
            schema: output_schema(),
            done: false,
            open: false,
        }
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;
        self.done = false;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("insert"));
        }
        if self.done {
            return Ok(None);
        }
        let mut count: i32 = 0;
        while let Some(t) = self.child.next()? {
            self.storage_manager
                .insert_tuple(self.tid, self.container_id, t)
                .map_err(io_as_aborted)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(vec![Field::IntField(count)])))
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.child.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

/// Drains its child and deletes every tuple (identified by its own record
/// id) via the storage manager (§4.10). Same pipeline-breaker / one-shot
/// shape as `Insert`.
pub struct Delete {
    storage_manager: Arc<StorageManager>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    schema: TableSchema,
    done: bool,
    open: bool,
}

impl Delete {
    pub fn new(storage_manager: Arc<StorageManager>, tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        Delete {
            storage_manager,
            tid,
            child,
            schema: output_schema(),
            done: false,
            open: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;
        self.done = false;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("delete"));
        }
        if self.done {
            return Ok(None);
        }
        let mut count: i32 = 0;
        while let Some(t) = self.child.next()? {
            let rid = t
                .get_record_id()
                .ok_or_else(|| CrustyError::CrustyError("tuple has no record id to delete".to_string()))?;
            self.storage_manager.delete_tuple(self.tid, rid).map_err(io_as_aborted)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(vec![Field::IntField(count)])))
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.child.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

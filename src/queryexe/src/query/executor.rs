use crate::opiterator::OpIterator;
use crate::StorageManager;
use common::{CrustyError, QueryResult, Tuple};
use std::sync::Arc;

/// Runs an already-built physical plan (`PhysicalPlanBuilder` in
/// `physical_plan.rs` is what builds one). Doesn't know anything about
/// logical plans itself — it just owns the root `OpIterator` and drives it.
pub struct Executor {
    pub plan: Option<Box<dyn OpIterator>>,
    pub storage_manager: Option<Arc<StorageManager>>,
}

impl Executor {
    /// Initializes an empty executor; `configure_sm`/`configure_query` wire
    /// it up before use.
    pub fn new_ref() -> Self {
        Self {
            plan: None,
            storage_manager: None,
        }
    }

    pub fn configure_sm(&mut self, storage_manager: &Arc<StorageManager>) {
        self.storage_manager = Some(storage_manager.clone());
    }

    pub fn configure_query(&mut self, physical_plan: Box<dyn OpIterator>) {
        self.plan = Some(physical_plan);
    }

    /// Opens the physical plan iterator to begin execution.
    pub fn start(&mut self) -> Result<(), CrustyError> {
        self.plan.as_mut().unwrap().open()
    }

    /// Returns the next tuple or None if there is no such tuple.
    ///
    /// # Panics
    ///
    /// Panics if the physical plan iterator hasn't been configured.
    pub fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        self.plan.as_mut().unwrap().next()
    }

    /// Closes the physical plan iterator.
    pub fn close(&mut self) -> Result<(), CrustyError> {
        self.plan.as_mut().unwrap().close()
    }

    /// Runs the physical plan iterator to completion and renders the result
    /// as a simple fixed-width table.
    pub fn execute(&mut self) -> Result<QueryResult, CrustyError> {
        let schema = self.plan.as_mut().unwrap().get_schema();
        let width = schema.attributes().map(|a| a.name().len()).max().unwrap_or(10) + 2;
        let mut res = String::new();
        for attr in schema.attributes() {
            res += &format!("{:width$}", attr.name(), width = width);
        }
        res += "\n";

        self.start()?;
        while let Some(t) = self.next()? {
            for f in t.field_vals() {
                res += &format!("{:width$}", f.to_string(), width = width);
            }
            res += "\n";
        }
        self.close()?;
        Ok(QueryResult::new(&res))
    }
}

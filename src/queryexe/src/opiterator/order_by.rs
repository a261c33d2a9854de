use crate::opiterator::{not_open, OpIterator};
use common::{CrustyError, TableSchema, Tuple};

/// Sorts the child's entire output by one field, ascending or descending
/// (§4.5). A pipeline breaker: `open()` drains and stably sorts the child
/// before any tuple is emitted. Memory-bounded by the child's cardinality;
/// no spilling.
pub struct OrderBy {
    field_index: usize,
    asc: bool,
    child: Box<dyn OpIterator>,
    sorted: Vec<Tuple>,
    pos: usize,
    open: bool,
}

impl OrderBy {
    pub fn new(field_index: usize, asc: bool, child: Box<dyn OpIterator>) -> Self {
        OrderBy {
            field_index,
            asc,
            child,
            sorted: Vec::new(),
            pos: 0,
            open: false,
        }
    }
}

impl OpIterator for OrderBy {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;
        self.sorted.clear();
        while let Some(t) = self.child.next()? {
            self.sorted.push(t);
        }
        self.child.close()?;
        let idx = self.field_index;
        self.sorted
            .sort_by(|a, b| a.get_field(idx).cmp(&b.get_field(idx)));
        if !self.asc {
            self.sorted.reverse();
        }
        self.pos = 0;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("order_by"));
        }
        let t = self.sorted.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        Ok(t)
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.sorted.clear();
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        if !self.open {
            return Err(not_open("order_by"));
        }
        self.pos = 0;
        Ok(())
    }

    fn get_schema(&self) -> &TableSchema {
        self.child.get_schema()
    }
}

use crate::opiterator::{not_open, OpIterator};
use common::{CrustyError, Field, PredicateOp, TableSchema, Tuple};

/// Emits only the child tuples for which `field[index] op constant` holds
/// (§4.3). Schema is unchanged from the child.
pub struct Filter {
    op: PredicateOp,
    field_index: usize,
    constant: Field,
    child: Box<dyn OpIterator>,
    open: bool,
}

impl Filter {
    pub fn new(op: PredicateOp, field_index: usize, constant: Field, child: Box<dyn OpIterator>) -> Self {
        Filter {
            op,
            field_index,
            constant,
            child,
            open: false,
        }
    }

    fn matches(&self, t: &Tuple) -> bool {
        match (t.get_field(self.field_index), &self.constant) {
            (Some(Field::IntField(v)), Field::IntField(c)) => self.op.compare(v, c),
            (Some(Field::StringField(v)), Field::StringField(c)) => self.op.compare(v, c),
            _ => false,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("filter"));
        }
        while let Some(t) = self.child.next()? {
            if self.matches(&t) {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.child.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.child.rewind()
    }

    fn get_schema(&self) -> &TableSchema {
        self.child.get_schema()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opiterator::seq_scan::tests_support::const_iterator;

    #[test]
    fn filter_keeps_only_matching_rows() {
        let child = const_iterator(vec![vec![1], vec![2], vec![3], vec![4], vec![5]]);
        let mut filt = Filter::new(PredicateOp::GreaterThan, 0, Field::IntField(2), child);
        filt.open().unwrap();
        let mut seen = Vec::new();
        while let Some(t) = filt.next().unwrap() {
            seen.push(t.get_field(0).unwrap().unwrap_int_field());
        }
        assert_eq!(seen, vec![3, 4, 5]);
    }

    #[test]
    fn filter_next_before_open_errors() {
        let child = const_iterator(vec![vec![1]]);
        let mut filt = Filter::new(PredicateOp::Equals, 0, Field::IntField(1), child);
        assert!(filt.next().is_err());
    }
}

use crate::opiterator::{HashEqJoin, NestedLoopJoin, OpIterator};
use common::{CrustyError, PredicateOp, TableSchema, Tuple};

/// Selects a join strategy at construction (§4.7): `EQUALS` dispatches to
/// `HashEqJoin`, everything else to `NestedLoopJoin`. Delegates the whole
/// `OpIterator` contract to whichever strategy it picked.
pub struct Join {
    inner: Box<dyn OpIterator>,
}

impl Join {
    pub fn new(
        op: PredicateOp,
        outer_field_index: usize,
        inner_field_index: usize,
        outer: Box<dyn OpIterator>,
        inner: Box<dyn OpIterator>,
    ) -> Self {
        let strategy: Box<dyn OpIterator> = if op == PredicateOp::Equals {
            Box::new(HashEqJoin::new(outer_field_index, inner_field_index, outer, inner))
        } else {
            Box::new(NestedLoopJoin::new(op, outer_field_index, inner_field_index, outer, inner))
        };
        Join { inner: strategy }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.inner.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        self.inner.next()
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.inner.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.inner.rewind()
    }

    fn get_schema(&self) -> &TableSchema {
        self.inner.get_schema()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opiterator::seq_scan::tests_support::const_iterator;

    #[test]
    fn equals_dispatches_to_hash_join_results() {
        let a = const_iterator(vec![vec![1, 10], vec![2, 20]]);
        let b = const_iterator(vec![vec![2, 200]]);
        let mut j = Join::new(PredicateOp::Equals, 0, 0, a, b);
        j.open().unwrap();
        let t = j.next().unwrap().unwrap();
        assert_eq!(t.get_field(0).unwrap().unwrap_int_field(), 2);
        assert_eq!(j.next().unwrap(), None);
    }

    #[test]
    fn non_equals_dispatches_to_nested_loop_results() {
        let a = const_iterator(vec![vec![1]]);
        let b = const_iterator(vec![vec![2]]);
        let mut j = Join::new(PredicateOp::LessThan, 0, 0, a, b);
        j.open().unwrap();
        let t = j.next().unwrap().unwrap();
        assert_eq!(t.get_field(0).unwrap().unwrap_int_field(), 1);
        assert_eq!(t.get_field(1).unwrap().unwrap_int_field(), 2);
    }

    #[test]
    fn equal_and_nested_loop_agree_on_same_equals_predicate() {
        let a1 = const_iterator(vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![3, 30]]);
        let b1 = const_iterator(vec![vec![2, 200], vec![2, 201], vec![4, 400]]);
        let mut hj = HashEqJoin::new(0, 0, a1, b1);
        hj.open().unwrap();
        let mut hash_rows = Vec::new();
        while let Some(t) = hj.next().unwrap() {
            hash_rows.push((
                t.get_field(0).unwrap().unwrap_int_field(),
                t.get_field(2).unwrap().unwrap_int_field(),
            ));
        }

        let a2 = const_iterator(vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![3, 30]]);
        let b2 = const_iterator(vec![vec![2, 200], vec![2, 201], vec![4, 400]]);
        let mut nlj = NestedLoopJoin::new(PredicateOp::Equals, 0, 0, a2, b2);
        nlj.open().unwrap();
        let mut nlj_rows = Vec::new();
        while let Some(t) = nlj.next().unwrap() {
            nlj_rows.push((
                t.get_field(0).unwrap().unwrap_int_field(),
                t.get_field(2).unwrap().unwrap_int_field(),
            ));
        }

        hash_rows.sort_unstable();
        nlj_rows.sort_unstable();
        assert_eq!(hash_rows, nlj_rows);
    }
}

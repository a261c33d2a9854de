use crate::opiterator::{compare_fields, not_open, OpIterator};
use common::{CrustyError, PredicateOp, TableSchema, Tuple};

/// O(|outer| * |inner|) join for any predicate operator other than equality
/// (§4.8). Holds at most one outer tuple at a time; the inner child is
/// rewound every time the outer cursor advances, so it must itself support
/// `rewind()` — true of every operator in this tree.
pub struct NestedLoopJoin {
    op: PredicateOp,
    outer_field_index: usize,
    inner_field_index: usize,
    outer: Box<dyn OpIterator>,
    inner: Box<dyn OpIterator>,
    outer_tuple: Option<Tuple>,
    schema: TableSchema,
    open: bool,
}

impl NestedLoopJoin {
    pub fn new(
        op: PredicateOp,
        outer_field_index: usize,
        inner_field_index: usize,
        outer: Box<dyn OpIterator>,
        inner: Box<dyn OpIterator>,
    ) -> Self {
        let schema = outer.get_schema().merge(inner.get_schema());
        NestedLoopJoin {
            op,
            outer_field_index,
            inner_field_index,
            outer,
            inner,
            outer_tuple: None,
            schema,
            open: false,
        }
    }
}

impl OpIterator for NestedLoopJoin {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.outer.open()?;
        self.inner.open()?;
        self.outer_tuple = None;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("nested_loop_join"));
        }
        loop {
            if self.outer_tuple.is_none() {
                self.outer_tuple = self.outer.next()?;
                if self.outer_tuple.is_none() {
                    return Ok(None);
                }
            }
            let outer_t = self.outer_tuple.as_ref().unwrap();
            while let Some(inner_t) = self.inner.next()? {
                let l = outer_t.get_field(self.outer_field_index).unwrap();
                let r = inner_t.get_field(self.inner_field_index).unwrap();
                if compare_fields(self.op, l, r) {
                    return Ok(Some(outer_t.merge(&inner_t)));
                }
            }
            self.inner.rewind()?;
            self.outer_tuple = None;
        }
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.outer_tuple = None;
        self.outer.close()?;
        self.inner.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.outer.rewind()?;
        self.inner.rewind()?;
        self.outer_tuple = None;
        Ok(())
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opiterator::seq_scan::tests_support::const_iterator;

    #[test]
    fn s3_nested_loop_less_than() {
        let a = const_iterator(vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![3, 30]]);
        let b = const_iterator(vec![vec![2, 200], vec![2, 201], vec![4, 400]]);
        let mut nlj = NestedLoopJoin::new(PredicateOp::LessThan, 0, 0, a, b);
        nlj.open().unwrap();
        let mut got = Vec::new();
        while let Some(t) = nlj.next().unwrap() {
            got.push((
                t.get_field(0).unwrap().unwrap_int_field(),
                t.get_field(1).unwrap().unwrap_int_field(),
                t.get_field(2).unwrap().unwrap_int_field(),
                t.get_field(3).unwrap().unwrap_int_field(),
            ));
        }
        got.sort_unstable();
        let mut want = vec![
            (1, 10, 2, 200),
            (1, 10, 2, 201),
            (1, 10, 4, 400),
            (2, 20, 4, 400),
            (2, 21, 4, 400),
            (3, 30, 4, 400),
        ];
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn empty_outer_yields_no_rows() {
        let a = const_iterator(vec![]);
        let b = const_iterator(vec![vec![1]]);
        let mut nlj = NestedLoopJoin::new(PredicateOp::LessThan, 0, 0, a, b);
        nlj.open().unwrap();
        assert_eq!(nlj.next().unwrap(), None);
    }

    #[test]
    fn empty_inner_yields_no_rows() {
        let a = const_iterator(vec![vec![1]]);
        let b = const_iterator(vec![]);
        let mut nlj = NestedLoopJoin::new(PredicateOp::LessThan, 0, 0, a, b);
        nlj.open().unwrap();
        assert_eq!(nlj.next().unwrap(), None);
    }

    #[test]
    fn rewind_replays_same_multiset() {
        let a = const_iterator(vec![vec![1], vec![2]]);
        let b = const_iterator(vec![vec![1], vec![2]]);
        let mut nlj = NestedLoopJoin::new(PredicateOp::Equals, 0, 0, a, b);
        nlj.open().unwrap();
        let mut first = Vec::new();
        while let Some(t) = nlj.next().unwrap() {
            first.push(t.get_field(0).unwrap().unwrap_int_field());
        }
        nlj.rewind().unwrap();
        let mut second = Vec::new();
        while let Some(t) = nlj.next().unwrap() {
            second.push(t.get_field(0).unwrap().unwrap_int_field());
        }
        first.sort_unstable();
        second.sort_unstable();
        assert_eq!(first, second);
    }
}

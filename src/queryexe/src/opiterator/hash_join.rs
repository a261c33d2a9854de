use crate::opiterator::{not_open, OpIterator};
use common::{CrustyError, Field, TableSchema, Tuple};
use std::collections::{HashMap, VecDeque};

/// Equijoin via an in-memory hash table (§4.9). The outer (build) side is
/// drained and closed at `open()`; the inner (probe) side stays open and is
/// read tuple-by-tuple from `next()`.
///
/// Per §9, matched build tuples for a probe key are copied into a small
/// cache vector rather than iterating a reference into the hash table
/// itself, so nothing aliases the table while probing.
pub struct HashEqJoin {
    outer_field_index: usize,
    inner_field_index: usize,
    outer: Box<dyn OpIterator>,
    inner: Box<dyn OpIterator>,
    build: HashMap<Field, Vec<Tuple>>,
    cache: VecDeque<Tuple>,
    schema: TableSchema,
    open: bool,
}

impl HashEqJoin {
    pub fn new(
        outer_field_index: usize,
        inner_field_index: usize,
        outer: Box<dyn OpIterator>,
        inner: Box<dyn OpIterator>,
    ) -> Self {
        let schema = outer.get_schema().merge(inner.get_schema());
        HashEqJoin {
            outer_field_index,
            inner_field_index,
            outer,
            inner,
            build: HashMap::new(),
            cache: VecDeque::new(),
            schema,
            open: false,
        }
    }
}

impl OpIterator for HashEqJoin {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.build.clear();
        self.cache.clear();
        self.outer.open()?;
        while let Some(t) = self.outer.next()? {
            let key = t.get_field(self.outer_field_index).unwrap().clone();
            self.build.entry(key).or_insert_with(Vec::new).push(t);
        }
        self.outer.close()?;
        self.inner.open()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("hash_join"));
        }
        if let Some(t) = self.cache.pop_front() {
            return Ok(Some(t));
        }
        while let Some(probe_t) = self.inner.next()? {
            let key = probe_t.get_field(self.inner_field_index).unwrap();
            if let Some(matches) = self.build.get(key) {
                for m in matches {
                    self.cache.push_back(m.merge(&probe_t));
                }
                if let Some(t) = self.cache.pop_front() {
                    return Ok(Some(t));
                }
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.cache.clear();
        self.build.clear();
        self.inner.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.inner.rewind()?;
        self.cache.clear();
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
    fn s2_hash_join_multi_match() {
        let a = const_iterator(vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![3, 30]]);
        let b = const_iterator(vec![vec![2, 200], vec![2, 201], vec![4, 400]]);
        let mut hj = HashEqJoin::new(0, 0, a, b);
        hj.open().unwrap();
        let mut got = Vec::new();
        while let Some(t) = hj.next().unwrap() {
            got.push((
                t.get_field(0).unwrap().unwrap_int_field(),
                t.get_field(1).unwrap().unwrap_int_field(),
                t.get_field(2).unwrap().unwrap_int_field(),
                t.get_field(3).unwrap().unwrap_int_field(),
            ));
        }
        got.sort_unstable();
        let mut want = vec![
            (2, 20, 2, 200),
            (2, 20, 2, 201),
            (2, 21, 2, 200),
            (2, 21, 2, 201),
        ];
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn probe_miss_is_skipped() {
        let a = const_iterator(vec![vec![1, 10]]);
        let b = const_iterator(vec![vec![9, 900]]);
        let mut hj = HashEqJoin::new(0, 0, a, b);
        hj.open().unwrap();
        assert_eq!(hj.next().unwrap(), None);
    }

    #[test]
    fn rewind_preserves_build_side() {
        let a = const_iterator(vec![vec![1, 10]]);
        let b = const_iterator(vec![vec![1, 100]]);
        let mut hj = HashEqJoin::new(0, 0, a, b);
        hj.open().unwrap();
        assert!(hj.next().unwrap().is_some());
        assert_eq!(hj.next().unwrap(), None);
        hj.rewind().unwrap();
        assert!(hj.next().unwrap().is_some());
    }

    #[test]
    fn empty_probe_side_yields_no_rows() {
        let a = const_iterator(vec![vec![1]]);
        let b = const_iterator(vec![]);
        let mut hj = HashEqJoin::new(0, 0, a, b);
        hj.open().unwrap();
        assert_eq!(hj.next().unwrap(), None);
    }
}

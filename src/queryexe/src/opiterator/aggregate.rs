use crate::opiterator::{not_open, OpIterator};
use common::{AggOp, Attribute, CrustyError, DataType, Field, TableSchema, Tuple};
use std::collections::HashMap;

/// Per-group running state. `value` holds MIN/MAX/SUM/COUNT's accumulator
/// (and AVG's running sum); `count` is only consulted by AVG.
struct GroupState {
    value: i64,
    count: i64,
    initialized: bool,
}

/// Group-by aggregate over a single field (§4.6): `op ∈ {MIN, MAX, SUM,
/// AVG, COUNT}`. A pipeline breaker — `open()` fully drains and closes the
/// child, computing every group, before the first tuple is emitted.
/// `rewind()` restarts over the already-computed groups without rescanning.
///
/// Integer fields accept all five ops; a string aggregate field accepts
/// only COUNT (constructed eagerly-checked, so a disallowed combination
/// fails at construction rather than partway through a drain).
pub struct Aggregate {
    agg_field_index: usize,
    group_field_index: Option<usize>,
    op: AggOp,
    child: Box<dyn OpIterator>,
    schema: TableSchema,
    groups: Vec<(Option<Field>, i64)>,
    pos: usize,
    open: bool,
}

impl Aggregate {
    pub fn new(
        agg_field_index: usize,
        group_field_index: Option<usize>,
        op: AggOp,
        child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        let agg_attr = child
            .get_schema()
            .get_attribute(agg_field_index)
            .ok_or_else(|| CrustyError::CrustyError("aggregate field index out of range".to_string()))?;
        if agg_attr.dtype() == &DataType::String && op != AggOp::Count {
            return Err(CrustyError::CrustyError(format!(
                "unsupported aggregation {} over a string field",
                op
            )));
        }
        let col_name = format!("{}({})", agg_attr.name(), op);

        let mut attrs = Vec::new();
        if let Some(gi) = group_field_index {
            let group_attr = child
                .get_schema()
                .get_attribute(gi)
                .ok_or_else(|| CrustyError::CrustyError("group field index out of range".to_string()))?;
            attrs.push(group_attr.clone());
        }
        attrs.push(Attribute::new(col_name, DataType::Int));

        Ok(Aggregate {
            agg_field_index,
            group_field_index,
            op,
            child,
            schema: TableSchema::new(attrs),
            groups: Vec::new(),
            pos: 0,
            open: false,
        })
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;

        let mut order: Vec<Option<Field>> = Vec::new();
        let mut states: HashMap<Option<Field>, GroupState> = HashMap::new();

        while let Some(t) = self.child.next()? {
            let key = self
                .group_field_index
                .map(|gi| t.get_field(gi).unwrap().clone());
            let value = match t.get_field(self.agg_field_index).unwrap() {
                Field::IntField(v) => *v as i64,
                Field::StringField(_) => 0, // only COUNT ever reaches here for string fields
            };
            if !states.contains_key(&key) {
                order.push(key.clone());
                states.insert(
                    key.clone(),
                    GroupState {
                        value: 0,
                        count: 0,
                        initialized: false,
                    },
                );
            }
            let entry = states.get_mut(&key).unwrap();
            match self.op {
                AggOp::Count => {
                    entry.count += 1;
                    entry.value = entry.count;
                }
                AggOp::Sum => entry.value += value,
                AggOp::Avg => {
                    entry.value += value;
                    entry.count += 1;
                }
                AggOp::Min => {
                    entry.value = if entry.initialized { entry.value.min(value) } else { value };
                    entry.initialized = true;
                }
                AggOp::Max => {
                    entry.value = if entry.initialized { entry.value.max(value) } else { value };
                    entry.initialized = true;
                }
            }
        }
        self.child.close()?;

        self.groups = order
            .into_iter()
            .map(|key| {
                let state = states.remove(&key).unwrap();
                let result = match self.op {
                    AggOp::Avg => state.value / state.count.max(1),
                    _ => state.value,
                };
                (key, result)
            })
            .collect();
        self.pos = 0;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("aggregate"));
        }
        match self.groups.get(self.pos) {
            Some((key, result)) => {
                self.pos += 1;
                let mut fields = Vec::new();
                if let Some(k) = key {
                    fields.push(k.clone());
                }
                fields.push(Field::IntField(*result as i32));
                Ok(Some(Tuple::new(fields)))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.groups.clear();
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        if !self.open {
            return Err(not_open("aggregate"));
        }
        self.pos = 0;
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
    use common::testutil::string_vec_to_tuple;
    use common::{DataType, TableSchema};
    use std::collections::HashMap as StdHashMap;

    fn string_int_iterator(rows: Vec<(&str, i32)>) -> Box<dyn OpIterator> {
        struct ConstStringIterator {
            schema: TableSchema,
            rows: Vec<Tuple>,
            pos: usize,
            open: bool,
        }
        impl OpIterator for ConstStringIterator {
            fn open(&mut self) -> Result<(), CrustyError> {
                self.open = true;
                self.pos = 0;
                Ok(())
            }
            fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
                if !self.open {
                    return Err(not_open("const_string_iterator"));
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
        let schema = TableSchema::from_vecs(vec!["g", "v"], vec![DataType::String, DataType::Int]);
        let tuples = rows
            .into_iter()
            .map(|(g, v)| string_vec_to_tuple(vec![g.to_string()]).merge(&common::testutil::int_vec_to_tuple(vec![v])))
            .collect();
        Box::new(ConstStringIterator {
            schema,
            rows: tuples,
            pos: 0,
            open: false,
        })
    }

    fn drain_grouped(agg: &mut Aggregate) -> StdHashMap<String, i32> {
        let mut out = StdHashMap::new();
        while let Some(t) = agg.next().unwrap() {
            let g = t.get_field(0).unwrap().unwrap_string_field().to_string();
            let v = t.get_field(1).unwrap().unwrap_int_field();
            out.insert(g, v);
        }
        out
    }

    #[test]
    fn s4_avg_grouped_uses_integer_division() {
        let child = string_int_iterator(vec![("a", 1), ("a", 3), ("b", 5), ("b", 7), ("b", 9)]);
        let mut agg = Aggregate::new(1, Some(0), AggOp::Avg, child).unwrap();
        agg.open().unwrap();
        let got = drain_grouped(&mut agg);
        assert_eq!(got.get("a"), Some(&2));
        assert_eq!(got.get("b"), Some(&7));
    }

    #[test]
    fn avg_single_element_group_equals_that_element() {
        let child = string_int_iterator(vec![("a", 42)]);
        let mut agg = Aggregate::new(1, Some(0), AggOp::Avg, child).unwrap();
        agg.open().unwrap();
        let got = drain_grouped(&mut agg);
        assert_eq!(got.get("a"), Some(&42));
    }

    #[test]
    fn count_without_group_counts_all_rows() {
        let child = const_iterator(vec![vec![1], vec![2], vec![3]]);
        let mut agg = Aggregate::new(0, None, AggOp::Count, child).unwrap();
        agg.open().unwrap();
        let t = agg.next().unwrap().unwrap();
        assert_eq!(t.get_field(0).unwrap().unwrap_int_field(), 3);
        assert_eq!(agg.next().unwrap(), None);
    }

    #[test]
    fn min_max_sum_without_group() {
        let child = const_iterator(vec![vec![4], vec![1], vec![9], vec![2]]);
        let mut min_agg = Aggregate::new(0, None, AggOp::Min, const_iterator(vec![vec![4], vec![1], vec![9], vec![2]])).unwrap();
        min_agg.open().unwrap();
        assert_eq!(min_agg.next().unwrap().unwrap().get_field(0).unwrap().unwrap_int_field(), 1);

        let mut max_agg = Aggregate::new(0, None, AggOp::Max, child).unwrap();
        max_agg.open().unwrap();
        assert_eq!(max_agg.next().unwrap().unwrap().get_field(0).unwrap().unwrap_int_field(), 9);
    }

    #[test]
    fn string_field_rejects_non_count_op() {
        let child = string_int_iterator(vec![("a", 1)]);
        assert!(Aggregate::new(0, None, AggOp::Max, child).is_err());
    }

    #[test]
    fn rewind_replays_groups_without_rescanning_child() {
        let child = const_iterator(vec![vec![1], vec![2], vec![3]]);
        let mut agg = Aggregate::new(0, None, AggOp::Sum, child).unwrap();
        agg.open().unwrap();
        assert_eq!(agg.next().unwrap().unwrap().get_field(0).unwrap().unwrap_int_field(), 6);
        assert_eq!(agg.next().unwrap(), None);
        agg.rewind().unwrap();
        assert_eq!(agg.next().unwrap().unwrap().get_field(0).unwrap().unwrap_int_field(), 6);
    }
}

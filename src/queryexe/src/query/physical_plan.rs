//! Turns a resolved logical plan into an operator tree (§4.13): scan every
//! aliased table, stack filters (tracking per-alias selectivity as it
//! goes), hand the logical joins to the optimizer for ordering, assemble
//! the ordered joins (plus any subplan joins, applied as-is and never
//! reordered — see DESIGN.md), then apply the optional aggregate,
//! order-by, and final projection.

use crate::opiterator::{Aggregate, Filter, Join, OpIterator, OrderBy, Project, SeqScan};
use crate::StorageManager;
use common::catalog::Catalog;
use common::ids::TransactionId;
use common::logical_plan::{JoinLogicalNode, JoinNode, LogicalPlan};
use common::{CrustyError, DataType};
use optimizer::{optimize_join_order, PrimaryKeys, StatsCatalog};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a physical operator tree from a `LogicalPlan`, given the catalog
/// (to resolve scan schemas) and the statistics/primary-key metadata the
/// join optimizer needs.
pub struct PhysicalPlanBuilder<'a, C: Catalog> {
    storage_manager: Arc<StorageManager>,
    catalog: &'a C,
    stats: &'a StatsCatalog,
    pk: &'a PrimaryKeys,
    tid: TransactionId,
}

impl<'a, C: Catalog> PhysicalPlanBuilder<'a, C> {
    pub fn new(
        storage_manager: Arc<StorageManager>,
        catalog: &'a C,
        stats: &'a StatsCatalog,
        pk: &'a PrimaryKeys,
        tid: TransactionId,
    ) -> Self {
        PhysicalPlanBuilder {
            storage_manager,
            catalog,
            stats,
            pk,
            tid,
        }
    }

    /// Build the full physical plan for `lp` (steps 1-8 of §4.13).
    pub fn build(&self, lp: &LogicalPlan) -> Result<Box<dyn OpIterator>, CrustyError> {
        let mut subplan_map: HashMap<String, Box<dyn OpIterator>> = HashMap::new();
        let mut selectivities: HashMap<String, f64> = HashMap::new();

        // 1. One SeqScan per alias.
        for scan in lp.scans() {
            let schema = self.catalog.get_table_schema(scan.table_id)?;
            let op: Box<dyn OpIterator> = Box::new(SeqScan::new(
                self.storage_manager.clone(),
                scan.table_id,
                &schema,
                &scan.alias,
                self.tid,
            ));
            subplan_map.insert(scan.alias.clone(), op);
            selectivities.insert(scan.alias.clone(), 1.0);
        }

        // 2. Filters, tracked against each alias's running selectivity.
        for filter in lp.filters() {
            let plan = subplan_map.remove(&filter.alias).ok_or_else(|| {
                CrustyError::ValidationError(format!("unknown alias '{}' in filter", filter.alias))
            })?;
            let field_name = format!("{}.{}", filter.alias, filter.field_name);
            let idx = *plan
                .get_schema()
                .get_field_index(&field_name)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", field_name)))?;

            if let Some(&table_id) = lp.alias_to_table().get(&filter.alias) {
                if let Some(table_stats) = self.stats.get(table_id) {
                    let sel = table_stats.estimate_selectivity(idx, filter.op, &filter.constant);
                    *selectivities.get_mut(&filter.alias).unwrap() *= sel;
                }
            }

            let filtered: Box<dyn OpIterator> =
                Box::new(Filter::new(filter.op, idx, filter.constant.clone(), plan));
            subplan_map.insert(filter.alias.clone(), filtered);
        }

        // 3. Optimizer orders the plain joins (subplan joins never reorder).
        let plain_joins: Vec<JoinNode> = lp
            .joins()
            .iter()
            .filter_map(|j| match j {
                JoinLogicalNode::Join(n) => Some(n.clone()),
                JoinLogicalNode::SubplanJoin(_) => None,
            })
            .collect();

        let mut base_cardinalities: HashMap<String, f64> = HashMap::new();
        for scan in lp.scans() {
            let total = self
                .stats
                .get(scan.table_id)
                .map(|s| s.num_tuples() as f64)
                .unwrap_or(1.0);
            let sel = selectivities.get(&scan.alias).copied().unwrap_or(1.0);
            base_cardinalities.insert(scan.alias.clone(), total * sel);
        }

        let join_plan = optimize_join_order(
            &plain_joins,
            lp.alias_to_table(),
            &base_cardinalities,
            self.stats,
            self.pk,
        );

        // 4. Walk joins in optimizer order, folding equivalent aliases.
        let mut equiv_map: HashMap<String, String> = HashMap::new();
        for j in &join_plan.order {
            let left_canon = equiv_map.get(&j.left_alias).cloned().unwrap_or_else(|| j.left_alias.clone());
            let right_canon = equiv_map
                .get(&j.right_alias)
                .cloned()
                .unwrap_or_else(|| j.right_alias.clone());

            let left_plan = subplan_map.remove(&left_canon).ok_or_else(|| {
                CrustyError::ExecutionError(format!("disconnected joins: missing alias '{}'", left_canon))
            })?;
            let right_plan = subplan_map.remove(&right_canon).ok_or_else(|| {
                CrustyError::ExecutionError(format!("disconnected joins: missing alias '{}'", right_canon))
            })?;

            let left_field = format!("{}.{}", j.left_alias, j.left_field);
            let right_field = format!("{}.{}", j.right_alias, j.right_field);
            let left_idx = *left_plan
                .get_schema()
                .get_field_index(&left_field)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", left_field)))?;
            let right_idx = *right_plan
                .get_schema()
                .get_field_index(&right_field)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", right_field)))?;

            let joined: Box<dyn OpIterator> = Box::new(Join::new(j.op, left_idx, right_idx, left_plan, right_plan));
            subplan_map.insert(left_canon.clone(), joined);

            equiv_map.insert(right_canon.clone(), left_canon.clone());
            for v in equiv_map.values_mut() {
                if *v == right_canon {
                    *v = left_canon.clone();
                }
            }
        }

        // 4b. Subplan joins: applied directly, in declared order, never reordered.
        for j in lp.joins() {
            if let JoinLogicalNode::SubplanJoin(sj) = j {
                let canon = equiv_map.get(&sj.alias).cloned().unwrap_or_else(|| sj.alias.clone());
                let left_plan = subplan_map.remove(&canon).ok_or_else(|| {
                    CrustyError::ExecutionError(format!("disconnected joins: missing alias '{}'", canon))
                })?;
                let right_plan = self.build(&sj.subplan)?;

                let left_field = format!("{}.{}", sj.alias, sj.field);
                let left_idx = *left_plan
                    .get_schema()
                    .get_field_index(&left_field)
                    .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", left_field)))?;
                let right_idx = *right_plan
                    .get_schema()
                    .get_field_index(&sj.subplan_field)
                    .ok_or_else(|| {
                        CrustyError::ValidationError(format!("unknown subplan field '{}'", sj.subplan_field))
                    })?;

                let joined: Box<dyn OpIterator> = Box::new(Join::new(sj.op, left_idx, right_idx, left_plan, right_plan));
                subplan_map.insert(canon, joined);
            }
        }

        // 5. Exactly one connected component must remain.
        if subplan_map.len() > 1 {
            return Err(CrustyError::ExecutionError("disconnected joins".to_string()));
        }
        let mut final_plan = subplan_map
            .into_iter()
            .next()
            .map(|(_, p)| p)
            .ok_or_else(|| CrustyError::ExecutionError("empty logical plan".to_string()))?;

        // 6. Optional aggregate. Per §4.13 step 6: group-by field (if any)
        // must be the first select-list entry; exactly one aggregation
        // column is allowed.
        let agg_nodes: Vec<_> = lp.select_list().iter().filter(|n| n.agg_op.is_some()).collect();
        let mut aggregated = false;
        if let Some(group_field) = lp.group_by() {
            let first = lp
                .select_list()
                .first()
                .ok_or_else(|| CrustyError::ValidationError("group-by requires a select list".to_string()))?;
            if first.field.table() != group_field.table() || first.field.column() != group_field.column() {
                return Err(CrustyError::ValidationError(
                    "group-by field must be first in the select list".to_string(),
                ));
            }
            if agg_nodes.len() != 1 {
                return Err(CrustyError::ValidationError(
                    "expected exactly one aggregation column".to_string(),
                ));
            }
            let agg_node = agg_nodes[0];
            let agg_name = agg_node.field.qualified_name();
            let agg_idx = *final_plan
                .get_schema()
                .get_field_index(&agg_name)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", agg_name)))?;
            let group_name = group_field.qualified_name();
            let group_idx = *final_plan
                .get_schema()
                .get_field_index(&group_name)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", group_name)))?;
            final_plan = Box::new(Aggregate::new(agg_idx, Some(group_idx), agg_node.agg_op.unwrap(), final_plan)?);
            aggregated = true;
        } else if !agg_nodes.is_empty() {
            if agg_nodes.len() > 1 {
                return Err(CrustyError::ValidationError(
                    "at most one aggregation column is supported without a group-by".to_string(),
                ));
            }
            let agg_node = agg_nodes[0];
            let agg_name = agg_node.field.qualified_name();
            let agg_idx = *final_plan
                .get_schema()
                .get_field_index(&agg_name)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", agg_name)))?;
            final_plan = Box::new(Aggregate::new(agg_idx, None, agg_node.agg_op.unwrap(), final_plan)?);
            aggregated = true;
        }

        // 7. Optional order-by.
        if let Some((field, asc)) = lp.order_by() {
            let name = field.qualified_name();
            let idx = *final_plan
                .get_schema()
                .get_field_index(&name)
                .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", name)))?;
            final_plan = Box::new(OrderBy::new(idx, *asc, final_plan));
        }

        // 8. Final projection. An empty select list means "every field" (`null.*`).
        if !lp.select_list().is_empty() {
            // Each projected field's expected type is simply whatever type
            // it already resolves to in the upstream schema: the builder
            // has no separate type annotation to check it against, unlike a
            // caller constructing a `Project` directly against a fixed
            // output contract.
            let mut fields: Vec<(String, DataType, Option<String>)> = Vec::new();
            if aggregated {
                // The aggregate's schema is exactly [group?, aggcol], in that
                // order, matching the select list 1:1.
                for (i, node) in lp.select_list().iter().enumerate() {
                    let attr = final_plan
                        .get_schema()
                        .get_attribute(i)
                        .ok_or_else(|| CrustyError::ExecutionError("select list longer than aggregate output".to_string()))?;
                    fields.push((attr.name().to_string(), attr.dtype().clone(), node.field.alias().map(|s| s.to_string())));
                }
            } else {
                for node in lp.select_list() {
                    let qualified_name = node.field.qualified_name();
                    let idx = *final_plan
                        .get_schema()
                        .get_field_index(&qualified_name)
                        .ok_or_else(|| CrustyError::ValidationError(format!("unknown field '{}'", qualified_name)))?;
                    let dtype = final_plan.get_schema().get_attribute(idx).unwrap().dtype().clone();
                    fields.push((qualified_name, dtype, node.field.alias().map(|s| s.to_string())));
                }
            }
            let named: Vec<(&str, DataType, Option<&str>)> = fields
                .iter()
                .map(|(n, t, a)| (n.as_str(), t.clone(), a.as_deref()))
                .collect();
            final_plan = Box::new(Project::new_named(&named, final_plan)?);
        }

        Ok(final_plan)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::database::Database;
    use common::storage_trait::StorageTrait;
    use common::testutil::*;
    use common::{DataType, Field, PredicateOp, TableSchema};

    fn setup_table(
        db: &Database,
        sm: &StorageManager,
        name: &str,
        cols: Vec<&str>,
        dtypes: Vec<DataType>,
        rows: Vec<Vec<i32>>,
    ) -> u64 {
        let schema = TableSchema::from_vecs(cols, dtypes);
        let table = db.add_table(name.to_string(), schema.clone());
        sm.register_container(table.id, schema).unwrap();
        let tid = TransactionId::new();
        for row in rows {
            sm.insert_tuple(tid, table.id, int_vec_to_tuple(row)).unwrap();
        }
        table.id
    }

    #[test]
    fn s1_scan_and_filter() {
        init();
        let db = Database::new("test".to_string());
        let sm = StorageManager::new_test_sm();
        let table_id = setup_table(
            &db,
            &sm,
            "t",
            vec!["a"],
            vec![DataType::Int],
            vec![vec![1], vec![2], vec![3], vec![4], vec![5]],
        );

        let mut stats = StatsCatalog::new(1000.0);
        stats
            .add_table(table_id, &db.get_table_schema(table_id).unwrap(), &sm, TransactionId::new())
            .unwrap();
        let pk = PrimaryKeys::new();

        let mut lp = LogicalPlan::new();
        let table = db.get_table_ptr(table_id).unwrap();
        let table = table.read().unwrap().clone();
        lp.add_scan(&table, "t").unwrap();
        lp.add_filter("t", "a", PredicateOp::GreaterThan, Field::IntField(2)).unwrap();

        let builder = PhysicalPlanBuilder::new(Arc::new(sm), &db, &stats, &pk, TransactionId::new());
        let mut plan = builder.build(&lp).unwrap();
        plan.open().unwrap();
        let mut got = Vec::new();
        while let Some(t) = plan.next().unwrap() {
            got.push(t.get_field(0).unwrap().unwrap_int_field());
        }
        assert_eq!(got, vec![3, 4, 5]);
    }

    #[test]
    fn two_table_equijoin_via_optimizer() {
        init();
        let db = Database::new("test".to_string());
        let sm = StorageManager::new_test_sm();
        let a_id = setup_table(
            &db,
            &sm,
            "A",
            vec!["id", "x"],
            vec![DataType::Int, DataType::Int],
            vec![vec![1, 10], vec![2, 20], vec![2, 21], vec![3, 30]],
        );
        let b_id = setup_table(
            &db,
            &sm,
            "B",
            vec!["id", "y"],
            vec![DataType::Int, DataType::Int],
            vec![vec![2, 200], vec![2, 201], vec![4, 400]],
        );

        let mut stats = StatsCatalog::new(1000.0);
        let tid0 = TransactionId::new();
        stats.add_table(a_id, &db.get_table_schema(a_id).unwrap(), &sm, tid0).unwrap();
        stats.add_table(b_id, &db.get_table_schema(b_id).unwrap(), &sm, tid0).unwrap();
        let pk = PrimaryKeys::new();

        let mut lp = LogicalPlan::new();
        let a_table = db.get_table_ptr(a_id).unwrap().read().unwrap().clone();
        let b_table = db.get_table_ptr(b_id).unwrap().read().unwrap().clone();
        lp.add_scan(&a_table, "a").unwrap();
        lp.add_scan(&b_table, "b").unwrap();
        lp.add_join("a", "b", "id", "id", PredicateOp::Equals).unwrap();

        let builder = PhysicalPlanBuilder::new(Arc::new(sm), &db, &stats, &pk, TransactionId::new());
        let mut plan = builder.build(&lp).unwrap();
        plan.open().unwrap();
        let mut got = Vec::new();
        while let Some(t) = plan.next().unwrap() {
            got.push((
                t.get_field(0).unwrap().unwrap_int_field(),
                t.get_field(1).unwrap().unwrap_int_field(),
                t.get_field(3).unwrap().unwrap_int_field(),
            ));
        }
        got.sort_unstable();
        let mut want = vec![(2, 20, 200), (2, 20, 201), (2, 21, 200), (2, 21, 201)];
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn disconnected_joins_fail() {
        init();
        let db = Database::new("test".to_string());
        let sm = StorageManager::new_test_sm();
        let a_id = setup_table(&db, &sm, "A", vec!["a"], vec![DataType::Int], vec![vec![1]]);
        let b_id = setup_table(&db, &sm, "B", vec!["b"], vec![DataType::Int], vec![vec![1]]);

        let stats = StatsCatalog::new(1000.0);
        let pk = PrimaryKeys::new();

        let mut lp = LogicalPlan::new();
        let a_table = db.get_table_ptr(a_id).unwrap().read().unwrap().clone();
        let b_table = db.get_table_ptr(b_id).unwrap().read().unwrap().clone();
        lp.add_scan(&a_table, "a").unwrap();
        lp.add_scan(&b_table, "b").unwrap();
        // No join between a and b: two disjoint subplans remain.

        let builder = PhysicalPlanBuilder::new(Arc::new(sm), &db, &stats, &pk, TransactionId::new());
        assert!(builder.build(&lp).is_err());
    }
}

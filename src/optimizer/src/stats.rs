//! Per-table statistics: one histogram per column plus the page/tuple
//! counts needed for scan cost, gathered by two full passes over a table
//! (§3, §4.12) and held in an explicit `StatsCatalog` rather than a
//! process-wide registry (see DESIGN.md for why).

use crate::histogram::{IntHistogram, StringHistogram};
use common::ids::{ContainerId, Permissions, TransactionId};
use common::storage_trait::StorageTrait;
use common::{CrustyError, DataType, Field, PredicateOp, TableSchema};
use std::collections::HashMap;

/// Default I/O cost charged per page fetched during a scan.
pub const DEFAULT_IO_COST_PER_PAGE: f64 = 1000.0;
/// Number of buckets used for every per-column histogram.
const NUM_HISTOGRAM_BUCKETS: usize = 100;

/// Either flavor of per-column histogram, keyed by the column's declared type.
#[derive(Debug, Clone)]
enum ColumnHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

impl ColumnHistogram {
    /// Estimate the selectivity of `field[col] OP value`. A `value` whose
    /// variant doesn't match this column's declared type (a mismatch the
    /// logical plan's `add_filter` doesn't itself reject, §7) is not this
    /// layer's business to fail on — the optimizer just gets a neutral
    /// estimate and lets the mismatch play out the same way `compare_fields`
    /// (§4.3) does at evaluation time: no match.
    fn estimate_selectivity(&self, op: PredicateOp, field: &Field) -> f64 {
        match (self, field) {
            (ColumnHistogram::Int(h), Field::IntField(v)) => h.estimate_selectivity(op, *v),
            (ColumnHistogram::Str(h), Field::StringField(s)) => h.estimate_selectivity(op, s),
            _ => 1.0,
        }
    }
}

/// Statistics for a single table: scan cost inputs and one histogram per column.
#[derive(Debug, Clone)]
pub struct TableStats {
    num_pages: u64,
    num_tuples: u64,
    histograms: Vec<ColumnHistogram>,
}

impl TableStats {
    /// Scan every page of `table_id` twice: once to find each integer
    /// column's `[min, max]`, once to populate the histograms.
    pub fn compute<S: StorageTrait>(
        table_id: ContainerId,
        schema: &TableSchema,
        storage: &S,
        tid: TransactionId,
    ) -> Result<Self, CrustyError> {
        let num_pages = storage.get_num_pages(table_id) as u64;

        let mut mins = vec![i32::MAX; schema.size()];
        let mut maxs = vec![i32::MIN; schema.size()];
        let mut num_tuples: u64 = 0;
        for tuple in storage.get_iterator(tid, table_id, Permissions::ReadOnly) {
            for (i, field) in tuple.field_vals().enumerate() {
                if let Field::IntField(v) = field {
                    mins[i] = mins[i].min(*v);
                    maxs[i] = maxs[i].max(*v);
                }
            }
            num_tuples += 1;
        }

        let mut histograms: Vec<ColumnHistogram> = schema
            .attributes()
            .enumerate()
            .map(|(i, attr)| match attr.dtype() {
                DataType::Int => {
                    let (lo, hi) = if mins[i] > maxs[i] { (0, 0) } else { (mins[i], maxs[i]) };
                    ColumnHistogram::Int(IntHistogram::new(NUM_HISTOGRAM_BUCKETS, lo, hi))
                }
                DataType::String => ColumnHistogram::Str(StringHistogram::new(NUM_HISTOGRAM_BUCKETS)),
            })
            .collect();

        for tuple in storage.get_iterator(tid, table_id, Permissions::ReadOnly) {
            for (i, field) in tuple.field_vals().enumerate() {
                match (&mut histograms[i], field) {
                    (ColumnHistogram::Int(h), Field::IntField(v)) => h.add_value(*v),
                    (ColumnHistogram::Str(h), Field::StringField(s)) => h.add_value(s),
                    _ => unreachable!("field type does not match schema"),
                }
            }
        }

        info!(
            "optimizer: computed statistics for container {}: {} pages, {} tuples",
            table_id, num_pages, num_tuples
        );

        Ok(TableStats {
            num_pages,
            num_tuples,
            histograms,
        })
    }

    /// Cost of a full sequential scan of this table.
    pub fn scan_cost(&self, io_cost_per_page: f64) -> f64 {
        self.num_pages as f64 * io_cost_per_page
    }

    /// Total number of tuples in the table (pre-filter cardinality).
    pub fn num_tuples(&self) -> u64 {
        self.num_tuples
    }

    /// Estimated selectivity of `field[i] OP value`.
    pub fn estimate_selectivity(&self, field_index: usize, op: PredicateOp, value: &Field) -> f64 {
        self.histograms[field_index].estimate_selectivity(op, value)
    }
}

/// Holds one `TableStats` per table. Built once via `compute_statistics` /
/// `add_table`, then read-only for the remainder of query planning.
#[derive(Debug, Clone)]
pub struct StatsCatalog {
    table_stats: HashMap<ContainerId, TableStats>,
    io_cost_per_page: f64,
}

impl StatsCatalog {
    pub fn new(io_cost_per_page: f64) -> Self {
        StatsCatalog {
            table_stats: HashMap::new(),
            io_cost_per_page,
        }
    }

    pub fn io_cost_per_page(&self) -> f64 {
        self.io_cost_per_page
    }

    /// Compute and register statistics for one table.
    pub fn add_table<S: StorageTrait>(
        &mut self,
        table_id: ContainerId,
        schema: &TableSchema,
        storage: &S,
        tid: TransactionId,
    ) -> Result<(), CrustyError> {
        let stats = TableStats::compute(table_id, schema, storage, tid)?;
        self.table_stats.insert(table_id, stats);
        Ok(())
    }

    pub fn get(&self, table_id: ContainerId) -> Option<&TableStats> {
        self.table_stats.get(&table_id)
    }
}

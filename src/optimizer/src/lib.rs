//! Per-column statistics and the cost-based join optimizer sitting on top of
//! them: equi-width histograms for selectivity estimation, a `StatsCatalog`
//! holding one `TableStats` per table, and a Selinger-style subset-DP join
//! enumerator.

#[macro_use]
extern crate log;

pub mod histogram;
pub mod join_optimizer;
pub mod stats;

pub use histogram::{IntHistogram, StringHistogram};
pub use join_optimizer::{optimize_join_order, JoinPlan, PrimaryKeys};
pub use stats::{StatsCatalog, TableStats};

//! The pull-based operator tree (§4.1): every concrete operator implements
//! `OpIterator` directly. `next()` returning `Ok(None)` plays the role the
//! source's separate `hasNext()` check serves — there is no lookahead
//! buffer layer, each operator tracks only the open/closed state (and any
//! materialized state a pipeline breaker needs) it needs to answer `next()`.

use common::{CrustyError, Field, PredicateOp, TableSchema, Tuple};

mod aggregate;
mod filter;
mod hash_join;
mod insert_delete;
mod join;
mod nested_loop_join;
mod order_by;
mod project;
mod seq_scan;

pub use aggregate::Aggregate;
pub use filter::Filter;
pub use hash_join::HashEqJoin;
pub use insert_delete::{Delete, Insert};
pub use join::Join;
pub use nested_loop_join::NestedLoopJoin;
pub use order_by::OrderBy;
pub use project::Project;
pub use seq_scan::SeqScan;

/// Uniform contract every node of the physical plan tree implements.
///
/// `next()` is only legal between a successful `open()` and the matching
/// `close()`; calling it first returns a `CrustyError::CrustyError`
/// ("not open") rather than panicking. `close()` must be safe to call more
/// than once, and safe to call on an operator whose `open()` only partially
/// completed.
pub trait OpIterator {
    /// Prepare the operator (and its children) to produce tuples.
    fn open(&mut self) -> Result<(), CrustyError>;

    /// Produce the next tuple, or `None` at end of stream.
    fn next(&mut self) -> Result<Option<Tuple>, CrustyError>;

    /// Release any resources held by this operator and its children.
    /// Idempotent.
    fn close(&mut self) -> Result<(), CrustyError>;

    /// Restart iteration from the beginning. Only legal while open.
    fn rewind(&mut self) -> Result<(), CrustyError>;

    /// The schema of the tuples this operator produces.
    fn get_schema(&self) -> &TableSchema;
}

pub(crate) fn not_open(op_name: &str) -> CrustyError {
    CrustyError::CrustyError(format!("{} is not open", op_name))
}

/// Evaluate `left op right`, comparing only like-typed fields. Used by
/// `Filter` and both join strategies (§4.3, §4.8, §4.9). A type mismatch
/// (shouldn't occur against a well-formed schema) is treated as no-match
/// rather than a panic.
pub(crate) fn compare_fields(op: PredicateOp, left: &Field, right: &Field) -> bool {
    match (left, right) {
        (Field::IntField(l), Field::IntField(r)) => op.compare(l, r),
        (Field::StringField(l), Field::StringField(r)) => op.compare(l, r),
        _ => false,
    }
}

use crate::Field;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicate operators used by filters and joins.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEq,
}

impl PredicateOp {
    /// Do predicate comparison.
    pub fn compare<T: Ord>(&self, left_field: &T, right_field: &T) -> bool {
        match self {
            PredicateOp::Equals => left_field == right_field,
            PredicateOp::GreaterThan => left_field > right_field,
            PredicateOp::LessThan => left_field < right_field,
            PredicateOp::LessThanOrEq => left_field <= right_field,
            PredicateOp::GreaterThanOrEq => left_field >= right_field,
            PredicateOp::NotEq => left_field != right_field,
        }
    }

    /// Flip the operator, as required when swapping the two sides of a
    /// join predicate (used by the join optimizer's subset-DP extension
    /// step, §4.12): GT<->LT, GE<->LE, everything else is unchanged.
    pub fn flip(&self) -> Self {
        match self {
            PredicateOp::GreaterThan => PredicateOp::LessThan,
            PredicateOp::LessThan => PredicateOp::GreaterThan,
            PredicateOp::LessThanOrEq => PredicateOp::GreaterThanOrEq,
            PredicateOp::GreaterThanOrEq => PredicateOp::LessThanOrEq,
            op => *op,
        }
    }
}

/// Aggregation operations.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            AggOp::Avg => "avg",
            AggOp::Count => "count",
            AggOp::Max => "max",
            AggOp::Min => "min",
            AggOp::Sum => "sum",
        };
        write!(f, "{}", op_str)
    }
}

/// Represents a resolved, qualified field reference: `table.column`, with an
/// optional output alias and aggregate operator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct FieldIdentifier {
    /// The alias of the scan (or derived subplan) that column is present in.
    table: String,
    /// The name of the column being referenced.
    column: String,
    /// The alias given to the output field, if any.
    alias: Option<String>,
    /// An aggregate operation performed on the column, if any.
    op: Option<AggOp>,
}

impl FieldIdentifier {
    /// Create a new field identifier.
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            alias: None,
            op: None,
        }
    }

    /// Creates a new field identifier with an output alias.
    pub fn new_column_alias(table: &str, column: &str, alias: &str) -> Self {
        let mut id = Self::new(table, column);
        id.alias = Some(alias.to_string());
        id
    }

    /// Returns the table/scan alias.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the original column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the field identifier's output alias, if set.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the aggregate operator, if set.
    pub fn agg_op(&self) -> Option<AggOp> {
        self.op
    }

    /// Set an output alias.
    pub fn set_alias(&mut self, alias: String) {
        self.alias = Some(alias);
    }

    /// If an aggregate op is set and no alias has been chosen yet, derive a
    /// default alias of the form `"column(OP)"`.
    pub fn default_alias(&mut self) {
        if let Some(op) = self.op {
            self.alias = Some(format!("{}({})", self.column, op));
        }
    }

    /// Set an aggregation operation.
    pub fn set_op(&mut self, op: AggOp) {
        self.op = Some(op);
    }

    /// The fully qualified `alias.column` name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// A single scan of a base table under `alias`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanNode {
    pub table_id: u64,
    pub alias: String,
}

/// A single-field filter applied to `alias`'s current output.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterNode {
    pub alias: String,
    pub field_name: String,
    pub op: PredicateOp,
    pub constant: Field,
}

/// A join between two base/derived aliases on a single field pair.
///
/// Equality and hashing are both made symmetric over the *unordered* pair
/// `{left_alias, right_alias}` and ignore field names/op — this resolves a
/// documented contract violation in the lineage this plan is modeled on,
/// where equality was symmetric but hashing mixed in field names (see
/// DESIGN.md for the decision).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JoinNode {
    pub left_alias: String,
    pub right_alias: String,
    pub left_field: String,
    pub right_field: String,
    pub op: PredicateOp,
}

impl JoinNode {
    /// Swap the two sides of the join, adjusting the predicate operator.
    pub fn swap_sides(&self) -> Self {
        JoinNode {
            left_alias: self.right_alias.clone(),
            right_alias: self.left_alias.clone(),
            left_field: self.right_field.clone(),
            right_field: self.left_field.clone(),
            op: self.op.flip(),
        }
    }

    fn unordered_pair(&self) -> (String, String) {
        if self.left_alias <= self.right_alias {
            (self.left_alias.clone(), self.right_alias.clone())
        } else {
            (self.right_alias.clone(), self.left_alias.clone())
        }
    }
}

impl PartialEq for JoinNode {
    fn eq(&self, other: &Self) -> bool {
        self.unordered_pair() == other.unordered_pair()
    }
}
impl Eq for JoinNode {}

impl std::hash::Hash for JoinNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.unordered_pair().hash(state);
    }
}

/// A join of one alias against the result of an entirely separate subplan
/// (the single "join-to-subplan" case this engine supports).
#[derive(Debug, Clone)]
pub struct SubplanJoinNode {
    pub alias: String,
    pub field: String,
    pub subplan: Box<crate::logical_plan::LogicalPlan>,
    pub subplan_field: String,
    pub op: PredicateOp,
}

/// One of the two join shapes the optimizer reorders over.
#[derive(Debug, Clone)]
pub enum JoinLogicalNode {
    Join(JoinNode),
    SubplanJoin(SubplanJoinNode),
}

/// A single column (or aggregate thereof) in the output select list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectListNode {
    pub field: FieldIdentifier,
    pub agg_op: Option<AggOp>,
}

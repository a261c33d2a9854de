//! The logical plan: an ordered collection of scan/filter/join/select-list
//! nodes plus optional group-by and order-by, per §3 and §4.13. This is a
//! flat sequence rather than a graph — name resolution and the physical
//! plan builder both walk these lists directly.

use crate::catalog::Catalog;
use crate::table::Table;
use crate::{CrustyError, Field, TableSchema};
pub use logical_op::*;
use std::collections::HashMap;
mod logical_op;

/// An ordered relational query: scans, filters, joins, an optional
/// aggregate, an optional sort, and a select list.
#[derive(Debug, Clone, Default)]
pub struct LogicalPlan {
    scans: Vec<ScanNode>,
    filters: Vec<FilterNode>,
    joins: Vec<JoinLogicalNode>,
    select_list: Vec<SelectListNode>,
    group_by: Option<FieldIdentifier>,
    order_by: Option<(FieldIdentifier, bool)>,
    alias_to_table: HashMap<String, u64>,
}

impl LogicalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scan of `table` under `alias`. Fails if the alias is already in use.
    pub fn add_scan(&mut self, table: &Table, alias: &str) -> Result<(), CrustyError> {
        if self.alias_to_table.contains_key(alias) {
            return Err(CrustyError::ValidationError(format!(
                "duplicate scan alias '{}'",
                alias
            )));
        }
        self.alias_to_table.insert(alias.to_string(), table.id);
        self.scans.push(ScanNode {
            table_id: table.id,
            alias: alias.to_string(),
        });
        Ok(())
    }

    /// Add a single-field filter against `alias`'s current schema.
    pub fn add_filter(&mut self, alias: &str, field_name: &str, op: PredicateOp, constant: Field) -> Result<(), CrustyError> {
        if !self.alias_to_table.contains_key(alias) {
            return Err(CrustyError::ValidationError(format!(
                "unknown alias '{}' in filter",
                alias
            )));
        }
        self.filters.push(FilterNode {
            alias: alias.to_string(),
            field_name: field_name.to_string(),
            op,
            constant,
        });
        Ok(())
    }

    /// Add an equijoin or comparison join between two scanned/derived aliases.
    pub fn add_join(
        &mut self,
        left_alias: &str,
        right_alias: &str,
        left_field: &str,
        right_field: &str,
        op: PredicateOp,
    ) -> Result<(), CrustyError> {
        if left_alias == right_alias {
            return Err(CrustyError::ValidationError(
                "join cannot reference the same alias on both sides".to_string(),
            ));
        }
        self.joins.push(JoinLogicalNode::Join(JoinNode {
            left_alias: left_alias.to_string(),
            right_alias: right_alias.to_string(),
            left_field: left_field.to_string(),
            right_field: right_field.to_string(),
            op,
        }));
        Ok(())
    }

    /// Add the single supported subquery-decorrelation shape: join one
    /// alias against the result of an entirely separate subplan.
    pub fn add_subplan_join(
        &mut self,
        alias: &str,
        field: &str,
        subplan: LogicalPlan,
        subplan_field: &str,
        op: PredicateOp,
    ) {
        self.joins.push(JoinLogicalNode::SubplanJoin(SubplanJoinNode {
            alias: alias.to_string(),
            field: field.to_string(),
            subplan: Box::new(subplan),
            subplan_field: subplan_field.to_string(),
            op,
        }));
    }

    /// Set the full select list.
    pub fn set_select_list(&mut self, select_list: Vec<SelectListNode>) {
        self.select_list = select_list;
    }

    /// Set the group-by field. Per §4.13 step 6, the group-by field must
    /// also be the first entry of the select list; validated by the
    /// physical plan builder, not here.
    pub fn set_group_by(&mut self, field: FieldIdentifier) {
        self.group_by = Some(field);
    }

    pub fn set_order_by(&mut self, field: FieldIdentifier, asc: bool) {
        self.order_by = Some((field, asc));
    }

    pub fn scans(&self) -> &[ScanNode] {
        &self.scans
    }

    pub fn filters(&self) -> &[FilterNode] {
        &self.filters
    }

    pub fn joins(&self) -> &[JoinLogicalNode] {
        &self.joins
    }

    pub fn select_list(&self) -> &[SelectListNode] {
        &self.select_list
    }

    pub fn group_by(&self) -> Option<&FieldIdentifier> {
        self.group_by.as_ref()
    }

    pub fn order_by(&self) -> Option<&(FieldIdentifier, bool)> {
        self.order_by.as_ref()
    }

    pub fn alias_to_table(&self) -> &HashMap<String, u64> {
        &self.alias_to_table
    }

    /// Resolve every scan alias to its current schema via the catalog.
    pub fn alias_schemas<C: Catalog>(&self, catalog: &C) -> Result<HashMap<String, TableSchema>, CrustyError> {
        let mut out = HashMap::new();
        for (alias, table_id) in &self.alias_to_table {
            out.insert(alias.clone(), catalog.get_table_schema(*table_id)?);
        }
        Ok(out)
    }

    /// Resolve a possibly-qualified name (`["col"]` or `["alias", "col"]`)
    /// to an unambiguous `FieldIdentifier`, given the schemas currently
    /// known for each alias. Fails with `ValidationError` ("unknown" /
    /// "ambiguous") otherwise — this is the `ParsingError` taxonomy of §7.
    pub fn disambiguate_name(
        &self,
        identifiers: &[&str],
        schemas: &HashMap<String, TableSchema>,
    ) -> Result<FieldIdentifier, CrustyError> {
        match identifiers {
            [col] => {
                let matches: Vec<&String> = schemas
                    .iter()
                    .filter(|(_, schema)| schema.contains(col))
                    .map(|(alias, _)| alias)
                    .collect();
                match matches.len() {
                    0 => Err(CrustyError::ValidationError(format!("unknown field '{}'", col))),
                    1 => Ok(FieldIdentifier::new(matches[0], col)),
                    _ => Err(CrustyError::ValidationError(format!(
                        "ambiguous field '{}'",
                        col
                    ))),
                }
            }
            [alias, col] => match schemas.get(*alias) {
                Some(schema) if schema.contains(col) => Ok(FieldIdentifier::new(alias, col)),
                Some(_) => Err(CrustyError::ValidationError(format!(
                    "unknown field '{}.{}'",
                    alias, col
                ))),
                None => Err(CrustyError::ValidationError(format!(
                    "unknown table alias '{}'",
                    alias
                ))),
            },
            _ => Err(CrustyError::ValidationError(
                "invalid field reference".to_string(),
            )),
        }
    }
}

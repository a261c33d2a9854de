#[macro_use]
extern crate serde;
extern crate log;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
pub mod catalog;
pub mod database;
pub mod ids;
pub mod logical_plan;
pub mod page;
pub mod storage_trait;
pub mod table;
pub mod testutil;
pub use logical_plan::{AggOp, FieldIdentifier, PredicateOp};

/// How big each page is, in bytes.
pub const PAGE_SIZE: usize = 4096;
/// Default slot count used where a schema-derived count isn't available yet.
pub const PAGE_SLOTS: usize = 50;
/// Maximum length, in bytes, of a STRING field's payload on a page.
pub const STRING_LEN: usize = 128;

/// Custom error type. Carries the db-error / transaction-aborted / validation
/// taxonomies used throughout the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CrustyError {
    /// IO errors from the storage layer.
    IOError(String),
    /// Generic db-error: schema mismatch, unknown field, closed iterator,
    /// disconnected plan, unsupported aggregation, no-such-element.
    CrustyError(String),
    /// Parsing / name-resolution errors from the logical plan layer.
    ValidationError(String),
    /// Execution errors surfaced while running a physical plan.
    ExecutionError(String),
    /// Transaction must be abandoned; unwind and release resources.
    TransactionAbortedError(String),
}

impl fmt::Display for CrustyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CrustyError::ValidationError(s) => format!("Validation Error: {}", s),
                CrustyError::ExecutionError(s) => format!("Execution Error: {}", s),
                CrustyError::CrustyError(s) => format!("Crusty Error: {}", s),
                CrustyError::IOError(s) => s.to_string(),
                CrustyError::TransactionAbortedError(s) =>
                    format!("Transaction Aborted Error: {}", s),
            }
        )
    }
}

impl From<io::Error> for CrustyError {
    fn from(error: io::Error) -> Self {
        CrustyError::IOError(error.to_string())
    }
}

impl Error for CrustyError {}

/// Return type for a query result.
pub struct QueryResult {
    result: String,
}

impl QueryResult {
    /// Return an empty result.
    pub fn empty() -> Self {
        Self {
            result: String::from(""),
        }
    }

    /// Return a result with string.
    pub fn new(result: &str) -> Self {
        Self {
            result: result.to_string(),
        }
    }

    /// Get the result.
    pub fn result(&self) -> &str {
        &self.result
    }
}

/// Handle schemas.
#[derive(PartialEq, Clone, Debug)]
pub struct TableSchema {
    /// Attributes of the schema.
    attributes: Vec<Attribute>,
    /// Mapping from attribute name to order in the schema.
    name_map: HashMap<String, usize>,
}

impl Serialize for TableSchema {
    /// Custom serialize to avoid serializing name_map.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    /// Custom deserialize to rebuild name_map from the attribute list.
    fn deserialize<D>(deserializer: D) -> Result<TableSchema, D::Error>
    where
        D: Deserializer<'de>,
    {
        let attrs = Vec::deserialize(deserializer)?;
        Ok(TableSchema::new(attrs))
    }
}

impl TableSchema {
    /// Create a new schema.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut name_map = HashMap::new();
        for (i, attr) in attributes.iter().enumerate() {
            if !attr.name().is_empty() && !name_map.contains_key(attr.name()) {
                name_map.insert(attr.name().to_string(), i);
            }
        }
        Self {
            attributes,
            name_map,
        }
    }

    /// Create a new schema with the given names and dtypes.
    pub fn from_vecs(names: Vec<&str>, dtypes: Vec<DataType>) -> Self {
        let mut attrs = Vec::new();
        for (name, dtype) in names.iter().zip(dtypes.iter()) {
            attrs.push(Attribute::new(name.to_string(), dtype.clone()));
        }
        TableSchema::new(attrs)
    }

    /// Get the attribute from the given index.
    pub fn get_attribute(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    /// Get the index of the first attribute matching the given name.
    pub fn get_field_index(&self, name: &str) -> Option<&usize> {
        self.name_map.get(name)
    }

    /// Check if the attribute name is in the schema.
    pub fn contains(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// Get an iterator of the attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Merge two schemas into one: `other`'s attributes are appended to `self`'s.
    pub fn merge(&self, other: &Self) -> Self {
        let mut attrs = self.attributes.clone();
        attrs.append(&mut other.attributes.clone());
        Self::new(attrs)
    }

    /// Returns the number of fields in the schema.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the on-page byte size of the schema (sum of each attribute's fixed width).
    pub fn byte_size(&self) -> usize {
        self.attributes.iter().map(|a| a.get_byte_len()).sum()
    }
}

/// Handle attributes. Pairs the name with the dtype.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Attribute {
    /// Attribute name, possibly qualified as "alias.field".
    pub name: String,
    /// Attribute dtype.
    pub dtype: DataType,
}

impl Attribute {
    /// Create a new attribute with the given name and dtype.
    pub fn new(name: String, dtype: DataType) -> Self {
        Self { name, dtype }
    }

    /// Returns the name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dtype of the attribute.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    /// Fixed on-page width of this attribute's field: 4 bytes for INT,
    /// 4-byte length prefix + STRING_LEN bytes for STRING.
    pub fn get_byte_len(&self) -> usize {
        match self.dtype {
            DataType::Int => 4,
            DataType::String => 4 + STRING_LEN,
        }
    }
}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Serialize, Deserialize, Clone, Debug)]
pub enum DataType {
    Int,
    String,
}

/// A tagged field value. Total-ordered within each variant; PartialOrd between
/// variants falls back to derive order (Int < String) and is never used by
/// operators, which only compare fields of matching schema type.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Clone, Hash)]
pub enum Field {
    IntField(i32),
    StringField(String),
}

impl Field {
    /// Serializes a field using little-endian ints, for use by hashing/cbor
    /// paths that don't need the on-page fixed layout (see heapstore::page
    /// for the big-endian, fixed-width on-page encoding required by the
    /// heap file format).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Field::IntField(x) => x.to_le_bytes().to_vec(),
            Field::StringField(s) => {
                let mut result = (s.len() as u32).to_le_bytes().to_vec();
                result.extend(s.as_bytes());
                result
            }
        }
    }

    /// Unwraps integer fields.
    pub fn unwrap_int_field(&self) -> i32 {
        match self {
            Field::IntField(i) => *i,
            _ => panic!("Expected i32"),
        }
    }

    /// Unwraps string fields.
    pub fn unwrap_string_field(&self) -> &str {
        match self {
            Field::StringField(s) => s,
            _ => panic!("Expected String"),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::IntField(x) => write!(f, "{}", x),
            Field::StringField(x) => write!(f, "{}", x),
        }
    }
}

/// Tuple type. `record_id` is `None` until the tuple has been placed on a
/// page by the storage layer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Tuple {
    /// Tuple data.
    pub field_vals: Vec<Field>,
    /// Tuple's location, once it has one.
    pub record_id: Option<ids::ValueId>,
}

impl Tuple {
    /// Create a new tuple with the given data and no record id.
    pub fn new(field_vals: Vec<Field>) -> Self {
        Self {
            field_vals,
            record_id: None,
        }
    }

    /// Get the field at index.
    pub fn get_field(&self, i: usize) -> Option<&Field> {
        self.field_vals.get(i)
    }

    /// Update the field at index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out-of-bounds.
    pub fn set_field(&mut self, i: usize, f: Field) {
        self.field_vals[i] = f;
    }

    /// Returns an iterator over the field values.
    pub fn field_vals(&self) -> impl Iterator<Item = &Field> {
        self.field_vals.iter()
    }

    /// Return the number of fields in the tuple.
    pub fn size(&self) -> usize {
        self.field_vals.len()
    }

    /// Concatenate `self`'s fields with `other`'s, in that order. The
    /// resulting tuple has no record id (it isn't a tuple that lives on
    /// a page of any one table).
    pub fn merge(&self, other: &Self) -> Self {
        let mut fields = self.field_vals.clone();
        fields.append(&mut other.field_vals.clone());
        Self::new(fields)
    }

    /// Return the record id of the tuple, if it has been placed.
    pub fn get_record_id(&self) -> Option<ids::ValueId> {
        self.record_id
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(&self).unwrap()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        serde_cbor::from_slice(bytes).unwrap()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for field in &self.field_vals {
            res.push_str(&field.to_string());
            res.push('\t');
        }
        write!(f, "{}", res)
    }
}

#[cfg(test)]
mod libtests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_tuple_bytes() {
        let tuple = int_vec_to_tuple(vec![0, 1, 0]);
        let tuple_bytes = tuple.get_bytes();
        let check_tuple: Tuple = Tuple::from_bytes(&tuple_bytes);
        assert_eq!(tuple, check_tuple);
    }

    #[test]
    fn test_schema_merge() {
        let s1 = TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::Int]);
        let s2 = TableSchema::from_vecs(vec!["c"], vec![DataType::String]);
        let merged = s1.merge(&s2);
        assert_eq!(merged.size(), 3);
        assert_eq!(merged.get_field_index("c"), Some(&2));
    }

    #[test]
    fn test_tuple_merge_has_no_record_id() {
        let t1 = int_vec_to_tuple(vec![1]);
        let t2 = int_vec_to_tuple(vec![2]);
        let merged = t1.merge(&t2);
        assert_eq!(merged.field_vals, vec![Field::IntField(1), Field::IntField(2)]);
        assert_eq!(merged.get_record_id(), None);
    }
}

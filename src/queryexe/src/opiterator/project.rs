use crate::opiterator::{not_open, OpIterator};
use common::{Attribute, CrustyError, DataType, TableSchema, Tuple};

/// Emits exactly the child fields named by `field_indices`, in that order
/// (§4.4). Fails at construction if a requested index is out of range for
/// the child schema, or if the caller's expected type for that field
/// disagrees with the child schema's actual type there.
pub struct Project {
    field_indices: Vec<usize>,
    schema: TableSchema,
    child: Box<dyn OpIterator>,
    open: bool,
}

impl Project {
    /// `field_indices` names which child fields to keep, in output order;
    /// `expected_types` is the caller's type contract for each of those
    /// fields, checked against the child schema at construction.
    pub fn new(
        field_indices: Vec<usize>,
        expected_types: &[DataType],
        child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        if field_indices.len() != expected_types.len() {
            return Err(CrustyError::CrustyError(format!(
                "projection given {} field indices but {} expected types",
                field_indices.len(),
                expected_types.len()
            )));
        }
        let mut attrs = Vec::with_capacity(field_indices.len());
        for (&i, expected) in field_indices.iter().zip(expected_types) {
            let attr = child
                .get_schema()
                .get_attribute(i)
                .ok_or_else(|| CrustyError::CrustyError(format!("projection index {} out of range", i)))?;
            if attr.dtype() != expected {
                return Err(CrustyError::CrustyError(format!(
                    "projection index {} expected type {:?} but child schema has {:?}",
                    i,
                    expected,
                    attr.dtype()
                )));
            }
            attrs.push(attr.clone());
        }
        Ok(Project {
            field_indices,
            schema: TableSchema::new(attrs),
            child,
            open: false,
        })
    }

    /// Project named attributes, resolved against the child's schema (and
    /// optionally renamed under `output_names`), rather than raw indices.
    /// Each entry's `DataType` is the caller's expected type for that
    /// field, checked against the child schema at construction.
    pub fn new_named(
        fields: &[(&str, DataType, Option<&str>)],
        child: Box<dyn OpIterator>,
    ) -> Result<Self, CrustyError> {
        let mut field_indices = Vec::with_capacity(fields.len());
        let mut attrs: Vec<Attribute> = Vec::with_capacity(fields.len());
        for (name, expected, rename) in fields {
            let &idx = child
                .get_schema()
                .get_field_index(name)
                .ok_or_else(|| CrustyError::CrustyError(format!("unknown field '{}'", name)))?;
            let src_attr = child.get_schema().get_attribute(idx).unwrap();
            if src_attr.dtype() != expected {
                return Err(CrustyError::CrustyError(format!(
                    "field '{}' expected type {:?} but child schema has {:?}",
                    name,
                    expected,
                    src_attr.dtype()
                )));
            }
            let out_name = rename.unwrap_or(name).to_string();
            attrs.push(Attribute::new(out_name, src_attr.dtype().clone()));
            field_indices.push(idx);
        }
        Ok(Project {
            field_indices,
            schema: TableSchema::new(attrs),
            child,
            open: false,
        })
    }
}

impl OpIterator for Project {
    fn open(&mut self) -> Result<(), CrustyError> {
        self.child.open()?;
        self.open = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, CrustyError> {
        if !self.open {
            return Err(not_open("project"));
        }
        match self.child.next()? {
            Some(t) => {
                let fields = self
                    .field_indices
                    .iter()
                    .map(|&i| t.get_field(i).unwrap().clone())
                    .collect();
                Ok(Some(Tuple::new(fields)))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), CrustyError> {
        self.open = false;
        self.child.close()
    }

    fn rewind(&mut self) -> Result<(), CrustyError> {
        self.child.rewind()
    }

    fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

use crate::ecs::{ComponentSchema, ComponentValue, FieldData, FieldKind, FieldType, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("component '{schema}' has no field named '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("field '{field}' of component '{schema}' holds {expected:?} values, received {found:?}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("component '{schema}' has {expected} fields but {actual} values were supplied")]
    ArityMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} is out of bounds for column of length {len}")]
    RowOutOfBounds { row: usize, len: usize },
}

/// Structure-of-arrays storage for one data component inside one archetype.
///
/// Holds one typed vector per schema field; all vectors always have the
/// same length, which is the archetype's row count.
#[derive(Clone, Debug)]
pub struct Column {
    schema: Arc<ComponentSchema>,
    fields: Vec<FieldData>,
}

impl Column {
    pub fn new(schema: Arc<ComponentSchema>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|field| FieldData::new(field.kind))
            .collect();
        Self { schema, fields }
    }

    #[inline]
    pub fn schema(&self) -> &Arc<ComponentSchema> {
        &self.schema
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, FieldData::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw per-field vectors in declaration order.
    pub fn fields(&self) -> &[FieldData] {
        &self.fields
    }

    fn check_row(&self, row: usize) -> Result<(), ColumnError> {
        let len = self.len();
        if row >= len {
            return Err(ColumnError::RowOutOfBounds { row, len });
        }
        Ok(())
    }

    fn check_values(&self, values: &[Value]) -> Result<(), ColumnError> {
        if values.len() != self.fields.len() {
            return Err(ColumnError::ArityMismatch {
                schema: self.schema.name().to_string(),
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        for (meta, value) in self.schema.fields().iter().zip(values) {
            if meta.kind != value.kind() {
                return Err(ColumnError::TypeMismatch {
                    schema: self.schema.name().to_string(),
                    field: meta.name.clone(),
                    expected: meta.kind,
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Append one row of already-resolved values (one per field).
    pub fn push_values(&mut self, values: Vec<Value>) -> Result<(), ColumnError> {
        self.check_values(&values)?;
        for (data, value) in self.fields.iter_mut().zip(values) {
            data.push(value);
        }
        Ok(())
    }

    pub fn push_default(&mut self) -> Result<(), ColumnError> {
        let values = self.schema.default_values();
        self.push_values(values)
    }

    /// Append a copy of `source`'s row `row`. Both columns share a schema.
    pub fn push_copied(&mut self, source: &Column, row: usize) -> Result<(), ColumnError> {
        source.check_row(row)?;
        if source.schema.id() != self.schema.id() {
            return Err(ColumnError::ArityMismatch {
                schema: self.schema.name().to_string(),
                expected: self.fields.len(),
                actual: source.fields.len(),
            });
        }
        for (data, src) in self.fields.iter_mut().zip(&source.fields) {
            data.push_from(src, row);
        }
        Ok(())
    }

    /// Remove `row` by moving the last row into it, mirroring
    /// [`SparseSet::remove`](super::SparseSet::remove).
    pub fn swap_remove(&mut self, row: usize) -> Result<(), ColumnError> {
        self.check_row(row)?;
        for data in &mut self.fields {
            data.swap_remove(row);
        }
        Ok(())
    }

    /// Drop every row from `len` onwards.
    pub(crate) fn truncate(&mut self, len: usize) {
        for data in &mut self.fields {
            data.truncate(len);
        }
    }

    pub fn read_values(&self, row: usize) -> Result<Vec<Value>, ColumnError> {
        self.check_row(row)?;
        Ok(self
            .fields
            .iter()
            .filter_map(|data| data.get(row))
            .collect())
    }

    pub fn read_row(&self, row: usize) -> Result<ComponentValue, ColumnError> {
        let values = self.read_values(row)?;
        Ok(self.schema.field_names().zip(values).collect())
    }

    pub fn write_values(&mut self, row: usize, values: Vec<Value>) -> Result<(), ColumnError> {
        self.check_row(row)?;
        self.check_values(&values)?;
        for (data, value) in self.fields.iter_mut().zip(values) {
            data.set(row, value);
        }
        Ok(())
    }

    pub fn value(&self, row: usize, field: &str) -> Result<Value, ColumnError> {
        let index = self.field_index(field)?;
        self.fields[index]
            .get(row)
            .ok_or(ColumnError::RowOutOfBounds {
                row,
                len: self.len(),
            })
    }

    fn field_index(&self, field: &str) -> Result<usize, ColumnError> {
        self.schema
            .field_index(field)
            .ok_or_else(|| ColumnError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            })
    }

    fn mismatch<T: FieldType>(&self, index: usize) -> ColumnError {
        ColumnError::TypeMismatch {
            schema: self.schema.name().to_string(),
            field: self.schema.fields()[index].name.clone(),
            expected: self.fields[index].kind(),
            found: T::KIND,
        }
    }

    /// Typed read-only view of one field across every row.
    pub fn field<T: FieldType>(&self, field: &str) -> Result<&[T], ColumnError> {
        let index = self.field_index(field)?;
        match T::slice(&self.fields[index]) {
            Some(slice) => Ok(slice),
            None => Err(self.mismatch::<T>(index)),
        }
    }

    /// Typed mutable view of one field across every row.
    pub fn field_mut<T: FieldType>(&mut self, field: &str) -> Result<&mut [T], ColumnError> {
        let index = self.field_index(field)?;
        if self.fields[index].kind() != T::KIND {
            return Err(self.mismatch::<T>(index));
        }
        let schema = self.schema.name().to_string();
        T::slice_mut(&mut self.fields[index]).ok_or(ColumnError::UnknownField {
            schema,
            field: field.to_string(),
        })
    }
}

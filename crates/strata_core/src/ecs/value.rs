// value.rs - Field kinds, dynamic values and typed column vectors
//
// Every kind is declared once in `field_kinds!` so the kind enum, the value
// union, the typed backing vector and the `FieldType` impls cannot drift.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rust types that can back a component field.
///
/// Implemented for every primitive kind; used for typed slice access on
/// columns (`column.field::<f32>("x")`).
pub trait FieldType: Sized + Send + Sync + 'static {
    const KIND: FieldKind;

    fn slice(data: &FieldData) -> Option<&[Self]>;
    fn slice_mut(data: &mut FieldData) -> Option<&mut [Self]>;
}

macro_rules! field_kinds {
    ($( $variant:ident => $ty:ty, $name:literal, $zero:expr; )+) => {
        /// Primitive kind of a single component field.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum FieldKind {
            $( $variant, )+
        }

        /// A single field value.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum Value {
            $( $variant($ty), )+
        }

        /// Typed backing vector for one field of a column.
        #[derive(Clone, Debug, PartialEq)]
        pub enum FieldData {
            $( $variant(Vec<$ty>), )+
        }

        impl FieldKind {
            pub fn name(self) -> &'static str {
                match self {
                    $( FieldKind::$variant => $name, )+
                }
            }

            /// Zero value used when a field declares no default.
            pub fn zero(self) -> Value {
                match self {
                    $( FieldKind::$variant => Value::$variant($zero), )+
                }
            }
        }

        impl Value {
            pub fn kind(&self) -> FieldKind {
                match self {
                    $( Value::$variant(_) => FieldKind::$variant, )+
                }
            }
        }

        impl fmt::Display for Value {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( Value::$variant(v) => write!(f, "{v:?}"), )+
                }
            }
        }

        impl FieldData {
            pub(crate) fn new(kind: FieldKind) -> Self {
                match kind {
                    $( FieldKind::$variant => FieldData::$variant(Vec::new()), )+
                }
            }

            pub fn kind(&self) -> FieldKind {
                match self {
                    $( FieldData::$variant(_) => FieldKind::$variant, )+
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $( FieldData::$variant(v) => v.len(), )+
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn get(&self, row: usize) -> Option<Value> {
                match self {
                    $( FieldData::$variant(v) => v.get(row).cloned().map(Value::$variant), )+
                }
            }

            /// Append `value`; `false` on kind mismatch.
            pub(crate) fn push(&mut self, value: Value) -> bool {
                match (self, value) {
                    $( (FieldData::$variant(v), Value::$variant(x)) => {
                        v.push(x);
                        true
                    } )+
                    _ => false,
                }
            }

            /// Append a copy of `source[row]`; `false` on kind mismatch or bad row.
            pub(crate) fn push_from(&mut self, source: &FieldData, row: usize) -> bool {
                match (self, source) {
                    $( (FieldData::$variant(dst), FieldData::$variant(src)) => match src.get(row) {
                        Some(x) => {
                            dst.push(x.clone());
                            true
                        }
                        None => false,
                    }, )+
                    _ => false,
                }
            }

            /// Overwrite `row`; `false` on kind mismatch or bad row.
            pub(crate) fn set(&mut self, row: usize, value: Value) -> bool {
                match (self, value) {
                    $( (FieldData::$variant(v), Value::$variant(x)) => match v.get_mut(row) {
                        Some(slot) => {
                            *slot = x;
                            true
                        }
                        None => false,
                    }, )+
                    _ => false,
                }
            }

            pub(crate) fn swap_remove(&mut self, row: usize) {
                match self {
                    $( FieldData::$variant(v) => {
                        v.swap_remove(row);
                    } )+
                }
            }

            pub(crate) fn truncate(&mut self, len: usize) {
                match self {
                    $( FieldData::$variant(v) => v.truncate(len), )+
                }
            }
        }

        $(
            impl FieldType for $ty {
                const KIND: FieldKind = FieldKind::$variant;

                fn slice(data: &FieldData) -> Option<&[Self]> {
                    match data {
                        FieldData::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }

                fn slice_mut(data: &mut FieldData) -> Option<&mut [Self]> {
                    match data {
                        FieldData::$variant(v) => Some(v.as_mut_slice()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )+
    };
}

field_kinds! {
    Bool => bool, "bool", false;
    I32 => i32, "i32", 0;
    I64 => i64, "i64", 0;
    U32 => u32, "u32", 0;
    F32 => f32, "f32", 0.0;
    F64 => f64, "f64", 0.0;
    Str => String, "str", String::new();
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

/// Named field values for one component instance.
///
/// As input it may be partial: fields left out take the schema default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentValue {
    fields: Vec<(String, Value)>,
}

impl ComponentValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for ComponentValue {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut value = ComponentValue::new();
        for (name, field) in iter {
            value.set(name, field);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_push_rejects_wrong_kind() {
        let mut data = FieldData::new(FieldKind::F32);
        assert!(data.push(Value::F32(1.5)));
        assert!(!data.push(Value::I32(1)));
        assert_eq!(data.len(), 1);
        assert_eq!(f32::slice(&data), Some(&[1.5][..]));
        assert!(i32::slice(&data).is_none());
    }

    #[test]
    fn component_value_set_replaces() {
        let value = ComponentValue::new().with("x", 1.0f32).with("x", 2.0f32);
        assert_eq!(value.len(), 1);
        assert_eq!(value.get("x"), Some(&Value::F32(2.0)));
    }

    #[test]
    fn values_serialize_tagged() {
        let json = serde_json::to_string(&Value::F32(1.5)).unwrap();
        assert_eq!(json, r#"{"f32":1.5}"#);
        let kind: FieldKind = serde_json::from_str("\"str\"").unwrap();
        assert_eq!(kind, FieldKind::Str);
    }
}

//! Declarative document schemas and the create/update schema pair.
//!
//! Schemas are closed by default: a field not declared (and not one of the
//! base document fields) rejects the whole document. The update schema is
//! normally the structurally partial form of the create schema, so the two
//! always agree on field names and types.

use std::collections::BTreeMap;

use bson::{Bson, Document};
use thiserror::Error;

use crate::document::BASE_FIELDS;

/// Structural validation failure, carrying the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("invalid type for field `{field}`: expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },
}

/// Accepted BSON shape of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Int,
    Double,
    DateTime,
    Array(Box<FieldType>),
    Object,
    Any,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Double => "double",
            FieldType::DateTime => "datetime",
            FieldType::Array(_) => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }

    fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::Bool, Bson::Boolean(_)) => true,
            (FieldType::Int, Bson::Int32(_) | Bson::Int64(_)) => true,
            // Integer literals are accepted where a double is declared.
            (FieldType::Double, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::Array(element), Bson::Array(values)) => {
                values.iter().all(|v| element.accepts(v))
            }
            (FieldType::Object, Bson::Document(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    ty: FieldType,
    required: bool,
}

/// A closed structural schema: declared fields plus the base document
/// fields, nothing else.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
    allow_extra: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field.
    pub fn field(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.insert(
            name.to_string(),
            Field { ty, required: true },
        );
        self
    }

    /// Declare an optional field.
    pub fn optional(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.insert(
            name.to_string(),
            Field {
                ty,
                required: false,
            },
        );
        self
    }

    /// Allow undeclared extension fields instead of rejecting them.
    pub fn open(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// The structurally partial form: same fields and types, none required.
    pub fn partial(&self) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .map(|(name, field)| {
                    (
                        name.clone(),
                        Field {
                            ty: field.ty.clone(),
                            required: false,
                        },
                    )
                })
                .collect(),
            allow_extra: self.allow_extra,
        }
    }

    /// Validate a document against this schema.
    pub fn validate(&self, doc: &Document) -> Result<(), SchemaError> {
        for (name, field) in &self.fields {
            match doc.get(name) {
                None | Some(Bson::Null) => {
                    if field.required {
                        return Err(SchemaError::MissingField(name.clone()));
                    }
                }
                Some(value) => {
                    if !field.ty.accepts(value) {
                        return Err(SchemaError::InvalidType {
                            field: name.clone(),
                            expected: field.ty.name(),
                        });
                    }
                }
            }
        }

        for (name, value) in doc {
            if let Some(expected) = base_field_type(name) {
                if !expected.accepts(value) {
                    return Err(SchemaError::InvalidType {
                        field: name.clone(),
                        expected: expected.name(),
                    });
                }
                continue;
            }
            if !self.allow_extra && !self.fields.contains_key(name) {
                return Err(SchemaError::UnknownField(name.clone()));
            }
        }

        Ok(())
    }
}

/// The (create, update) schema pair bound to one collection.
#[derive(Debug, Clone)]
pub struct SchemaPair {
    create: Schema,
    update: Schema,
}

impl SchemaPair {
    /// Pair a create schema with an explicit update schema.
    pub fn new(create: Schema, update: Schema) -> Self {
        Self { create, update }
    }

    /// Derive the update schema as the partial form of the create schema.
    pub fn of(create: Schema) -> Self {
        let update = create.partial();
        Self { create, update }
    }

    pub fn create(&self) -> &Schema {
        &self.create
    }

    pub fn update(&self) -> &Schema {
        &self.update
    }
}

fn base_field_type(name: &str) -> Option<FieldType> {
    if !BASE_FIELDS.contains(&name) {
        return None;
    }
    match name {
        "_id" => Some(FieldType::String),
        _ => Some(FieldType::DateTime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn stop_like() -> Schema {
        Schema::new()
            .field("name", FieldType::String)
            .field("code", FieldType::String)
            .optional("latitude", FieldType::Double)
    }

    #[test]
    fn accepts_exact_document() {
        let doc = doc! { "name": "Rossio", "code": "060123", "latitude": 38.71 };
        assert_eq!(stop_like().validate(&doc), Ok(()));
    }

    #[test]
    fn rejects_missing_required_field() {
        let doc = doc! { "name": "Rossio" };
        assert_eq!(
            stop_like().validate(&doc),
            Err(SchemaError::MissingField("code".into()))
        );
    }

    #[test]
    fn rejects_undeclared_field() {
        let doc = doc! { "name": "Rossio", "code": "060123", "surprise": true };
        assert_eq!(
            stop_like().validate(&doc),
            Err(SchemaError::UnknownField("surprise".into()))
        );
    }

    #[test]
    fn open_schema_admits_extension_fields() {
        let doc = doc! { "name": "Rossio", "code": "060123", "surprise": true };
        assert_eq!(stop_like().open().validate(&doc), Ok(()));
    }

    #[test]
    fn rejects_wrong_type() {
        let doc = doc! { "name": 42, "code": "060123" };
        assert_eq!(
            stop_like().validate(&doc),
            Err(SchemaError::InvalidType {
                field: "name".into(),
                expected: "string"
            })
        );
    }

    #[test]
    fn base_fields_are_always_admitted() {
        let doc = doc! {
            "_id": "ABC12",
            "created_at": bson::DateTime::now(),
            "updated_at": bson::DateTime::now(),
            "name": "Rossio",
            "code": "060123",
        };
        assert_eq!(stop_like().validate(&doc), Ok(()));
    }

    #[test]
    fn base_fields_are_type_checked() {
        let doc = doc! { "_id": 7, "name": "Rossio", "code": "060123" };
        assert_eq!(
            stop_like().validate(&doc),
            Err(SchemaError::InvalidType {
                field: "_id".into(),
                expected: "string"
            })
        );
    }

    #[test]
    fn partial_form_drops_required_flags_but_keeps_types() {
        let update = stop_like().partial();
        assert_eq!(update.validate(&doc! {}), Ok(()));
        assert_eq!(update.validate(&doc! { "code": "999" }), Ok(()));
        assert_eq!(
            update.validate(&doc! { "code": 999 }),
            Err(SchemaError::InvalidType {
                field: "code".into(),
                expected: "string"
            })
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let doc = doc! { "name": Bson::Null, "code": "060123" };
        assert_eq!(
            stop_like().validate(&doc),
            Err(SchemaError::MissingField("name".into()))
        );
    }

    #[test]
    fn typed_arrays_check_every_element() {
        let schema = Schema::new().field("zones", FieldType::Array(Box::new(FieldType::String)));
        assert_eq!(schema.validate(&doc! { "zones": ["A", "B"] }), Ok(()));
        assert_eq!(
            schema.validate(&doc! { "zones": ["A", 2] }),
            Err(SchemaError::InvalidType {
                field: "zones".into(),
                expected: "array"
            })
        );
    }
}

//! Storage-facing entity shape shared by every repository backend.
//!
//! # Responsibility
//! - Name the logical collections (`EntityKind`) and their field registry.
//! - Define `Record`, the backend-neutral form of a persisted entity.
//! - Define the `Entity` contract implemented by every domain model.
//!
//! # Invariants
//! - A record only carries fields declared by its kind's registry.
//! - Field values are primitives; nested entities are never stored.
//! - Timestamps are UTC with microsecond precision so that text and JSON
//!   encodings round-trip exactly.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Logical collection identifier.
///
/// Every repository operation is keyed by this enum, so an unknown type
/// name cannot reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Country,
    City,
    Place,
}

impl EntityKind {
    /// All kinds, in snapshot/table creation order.
    pub const ALL: [EntityKind; 4] = [Self::User, Self::Country, Self::City, Self::Place];

    /// Lowercase type name used as collection key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Country => "country",
            Self::City => "city",
            Self::Place => "place",
        }
    }

    /// Parses a type name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "country" => Some(Self::Country),
            "city" => Some(Self::City),
            "place" => Some(Self::Place),
            _ => None,
        }
    }

    /// Relational table backing this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Country => "countries",
            Self::City => "cities",
            Self::Place => "places",
        }
    }

    /// Declared non-key fields for this kind.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::User => USER_FIELDS,
            Self::Country => COUNTRY_FIELDS,
            Self::City => CITY_FIELDS,
            Self::Place => PLACE_FIELDS,
        }
    }

    /// Looks up one declared field by name.
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive storage type of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Registry entry describing one stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
}

const fn required(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        nullable: false,
    }
}

const fn optional(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        nullable: true,
    }
}

const USER_FIELDS: &[FieldSpec] = &[
    required("email", FieldType::Text),
    required("first_name", FieldType::Text),
    required("last_name", FieldType::Text),
    required("password", FieldType::Text),
    required("is_admin", FieldType::Boolean),
];

const COUNTRY_FIELDS: &[FieldSpec] = &[required("name", FieldType::Text)];

const CITY_FIELDS: &[FieldSpec] = &[
    required("name", FieldType::Text),
    required("country_code", FieldType::Text),
];

const PLACE_FIELDS: &[FieldSpec] = &[
    required("name", FieldType::Text),
    optional("description", FieldType::Text),
    required("address", FieldType::Text),
    required("latitude", FieldType::Real),
    required("longitude", FieldType::Real),
    required("host_id", FieldType::Text),
    required("city_id", FieldType::Text),
    required("price_per_night", FieldType::Integer),
    required("number_of_rooms", FieldType::Integer),
    required("number_of_bathrooms", FieldType::Integer),
    required("max_guests", FieldType::Integer),
];

/// Primitive field value, encoded as a bare JSON primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    fn matches(&self, spec: &FieldSpec) -> bool {
        match self {
            Self::Null => spec.nullable,
            Self::Bool(_) => spec.field_type == FieldType::Boolean,
            Self::Int(_) => spec.field_type == FieldType::Integer,
            Self::Float(_) => spec.field_type == FieldType::Real,
            Self::Text(_) => spec.field_type == FieldType::Text,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Shape violations detected on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    EmptyId(EntityKind),
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },
    UnknownField {
        kind: EntityKind,
        field: String,
    },
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },
    TypeMismatch {
        kind: EntityKind,
        field: String,
        expected: FieldType,
    },
    NonFiniteNumber {
        kind: EntityKind,
        field: String,
    },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId(kind) => write!(f, "{kind} record has an empty id"),
            Self::KindMismatch { expected, actual } => {
                write!(f, "expected {expected} record, got {actual}")
            }
            Self::UnknownField { kind, field } => write!(f, "{kind} has no field `{field}`"),
            Self::MissingField { kind, field } => {
                write!(f, "{kind} record is missing required field `{field}`")
            }
            Self::TypeMismatch {
                kind,
                field,
                expected,
            } => write!(f, "{kind}.{field} must be {expected}"),
            Self::NonFiniteNumber { kind, field } => {
                write!(f, "{kind}.{field} must be a finite number")
            }
        }
    }
}

impl Error for RecordError {}

/// Backend-neutral persisted form of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: EntityKind,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record stamped with the current storage time.
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        let now = storage_now();
        Self {
            kind,
            id: id.into(),
            created_at: now,
            updated_at: now,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Checks the record against its kind's field registry.
    ///
    /// # Errors
    /// - Empty id, undeclared field, missing non-nullable field, wrong
    ///   primitive type, or non-finite real.
    pub fn validate_shape(&self) -> Result<(), RecordError> {
        if self.id.trim().is_empty() {
            return Err(RecordError::EmptyId(self.kind));
        }

        for (name, value) in &self.fields {
            let spec = self
                .kind
                .field(name)
                .ok_or_else(|| RecordError::UnknownField {
                    kind: self.kind,
                    field: name.clone(),
                })?;
            if !value.matches(spec) {
                return Err(RecordError::TypeMismatch {
                    kind: self.kind,
                    field: name.clone(),
                    expected: spec.field_type,
                });
            }
            if let FieldValue::Float(number) = value {
                if !number.is_finite() {
                    return Err(RecordError::NonFiniteNumber {
                        kind: self.kind,
                        field: name.clone(),
                    });
                }
            }
        }

        for spec in self.kind.fields() {
            if !spec.nullable && !self.fields.contains_key(spec.name) {
                return Err(RecordError::MissingField {
                    kind: self.kind,
                    field: spec.name,
                });
            }
        }

        Ok(())
    }

    pub fn text(&self, name: &'static str) -> Result<&str, RecordError> {
        match self.require(name)? {
            FieldValue::Text(value) => Ok(value),
            _ => Err(self.mismatch(name, FieldType::Text)),
        }
    }

    pub fn optional_text(&self, name: &'static str) -> Result<Option<&str>, RecordError> {
        match self.field(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value)),
            Some(_) => Err(self.mismatch(name, FieldType::Text)),
        }
    }

    pub fn integer(&self, name: &'static str) -> Result<i64, RecordError> {
        match self.require(name)? {
            FieldValue::Int(value) => Ok(*value),
            _ => Err(self.mismatch(name, FieldType::Integer)),
        }
    }

    pub fn real(&self, name: &'static str) -> Result<f64, RecordError> {
        match self.require(name)? {
            FieldValue::Float(value) => Ok(*value),
            _ => Err(self.mismatch(name, FieldType::Real)),
        }
    }

    pub fn boolean(&self, name: &'static str) -> Result<bool, RecordError> {
        match self.require(name)? {
            FieldValue::Bool(value) => Ok(*value),
            _ => Err(self.mismatch(name, FieldType::Boolean)),
        }
    }

    /// Fails unless this record belongs to `expected`.
    pub fn expect_kind(&self, expected: EntityKind) -> Result<(), RecordError> {
        if self.kind != expected {
            return Err(RecordError::KindMismatch {
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }

    fn require(&self, name: &'static str) -> Result<&FieldValue, RecordError> {
        self.field(name).ok_or(RecordError::MissingField {
            kind: self.kind,
            field: name,
        })
    }

    fn mismatch(&self, name: &str, expected: FieldType) -> RecordError {
        RecordError::TypeMismatch {
            kind: self.kind,
            field: name.to_string(),
            expected,
        }
    }
}

/// Current UTC time at storage precision (microseconds).
pub fn storage_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Contract implemented by every domain model persisted through a repository.
pub trait Entity: Sized {
    /// Collection this entity lives in.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Converts to the storage form. Timestamps are carried but the storage
    /// layer overwrites them on save/update.
    fn to_record(&self) -> Record;

    /// Rebuilds the entity from a stored record.
    fn from_record(record: &Record) -> Result<Self, RecordError>;

    /// External dictionary representation with ISO-8601 timestamps.
    fn to_dict(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, FieldType, FieldValue, Record, RecordError};

    fn city(id: &str) -> Record {
        Record::new(EntityKind::City, id)
            .with_field("name", "Austin")
            .with_field("country_code", "US")
    }

    #[test]
    fn parse_accepts_known_names_case_insensitively() {
        assert_eq!(EntityKind::parse(" City "), Some(EntityKind::City));
        assert_eq!(EntityKind::parse("place"), Some(EntityKind::Place));
        assert_eq!(EntityKind::parse("amenity"), None);
    }

    #[test]
    fn validate_shape_accepts_complete_record() {
        city("c-1").validate_shape().expect("city should be valid");
    }

    #[test]
    fn validate_shape_rejects_unknown_field() {
        let err = city("c-1")
            .with_field("population", 10_i64)
            .validate_shape()
            .expect_err("unknown field must fail");
        assert_eq!(
            err,
            RecordError::UnknownField {
                kind: EntityKind::City,
                field: "population".to_string()
            }
        );
    }

    #[test]
    fn validate_shape_rejects_missing_and_mistyped_fields() {
        let missing = Record::new(EntityKind::City, "c-1").with_field("name", "Austin");
        assert!(matches!(
            missing.validate_shape(),
            Err(RecordError::MissingField {
                field: "country_code",
                ..
            })
        ));

        let mistyped = city("c-1").with_field("name", 3_i64);
        assert!(matches!(
            mistyped.validate_shape(),
            Err(RecordError::TypeMismatch {
                expected: FieldType::Text,
                ..
            })
        ));
    }

    #[test]
    fn validate_shape_allows_null_only_for_nullable_fields() {
        let place = Record::new(EntityKind::Place, "p-1")
            .with_field("name", "Loft")
            .with_field("description", FieldValue::Null)
            .with_field("address", "1 Main St")
            .with_field("latitude", 30.0)
            .with_field("longitude", f64::NAN)
            .with_field("host_id", "u-1")
            .with_field("city_id", "c-1")
            .with_field("price_per_night", 100_i64)
            .with_field("number_of_rooms", 1_i64)
            .with_field("number_of_bathrooms", 1_i64)
            .with_field("max_guests", 2_i64);
        assert!(matches!(
            place.validate_shape(),
            Err(RecordError::NonFiniteNumber { .. })
        ));

        let nulled_name = city("c-1").with_field("name", FieldValue::Null);
        assert!(nulled_name.validate_shape().is_err());
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(
            city("  ").validate_shape(),
            Err(RecordError::EmptyId(EntityKind::City))
        );
    }

    #[test]
    fn field_values_encode_as_json_primitives() {
        let values = vec![
            FieldValue::Null,
            FieldValue::Bool(true),
            FieldValue::Int(4),
            FieldValue::Float(0.0),
            FieldValue::Text("x".to_string()),
        ];
        let json = serde_json::to_string(&values).expect("encode");
        assert_eq!(json, r#"[null,true,4,0.0,"x"]"#);
        let decoded: Vec<FieldValue> = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded, values);
    }
}

//! Country domain model.
//!
//! # Invariants
//! - The storage id of a country is its upper-case ISO code.

use crate::model::entity::{Entity, EntityKind, Record, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCountry {
    pub code: String,
    pub name: String,
}

/// Only the display name is mutable; the code is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountryPatch {
    pub name: Option<String>,
}

impl Entity for Country {
    const KIND: EntityKind = EntityKind::Country;

    fn id(&self) -> &str {
        &self.code
    }

    fn to_record(&self) -> Record {
        let mut record =
            Record::new(Self::KIND, self.code.as_str()).with_field("name", self.name.as_str());
        record.created_at = self.created_at;
        record.updated_at = self.updated_at;
        record
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        record.expect_kind(Self::KIND)?;
        Ok(Self {
            code: record.id.clone(),
            name: record.text("name")?.to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code,
            "name": self.name,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

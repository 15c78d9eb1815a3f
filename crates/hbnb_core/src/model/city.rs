//! City domain model.

use crate::model::entity::{Entity, EntityKind, Record, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// City inside a country, referenced by country code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub country_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCity {
    pub name: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CityPatch {
    pub name: Option<String>,
    pub country_code: Option<String>,
}

impl Entity for City {
    const KIND: EntityKind = EntityKind::City;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(Self::KIND, self.id.as_str())
            .with_field("name", self.name.as_str())
            .with_field("country_code", self.country_code.as_str());
        record.created_at = self.created_at;
        record.updated_at = self.updated_at;
        record
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        record.expect_kind(Self::KIND)?;
        Ok(Self {
            id: record.id.clone(),
            name: record.text("name")?.to_string(),
            country_code: record.text("country_code")?.to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "country_code": self.country_code,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

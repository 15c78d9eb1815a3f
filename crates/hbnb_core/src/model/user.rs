//! User domain model.

use crate::model::entity::{Entity, EntityKind, Record, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account. Hosts own places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Never exposed through `to_dict`.
    #[serde(skip_serializing)]
    pub password: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create input for `UserService::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(Self::KIND, self.id.as_str())
            .with_field("email", self.email.as_str())
            .with_field("first_name", self.first_name.as_str())
            .with_field("last_name", self.last_name.as_str())
            .with_field("password", self.password.as_str())
            .with_field("is_admin", self.is_admin);
        record.created_at = self.created_at;
        record.updated_at = self.updated_at;
        record
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        record.expect_kind(Self::KIND)?;
        Ok(Self {
            id: record.id.clone(),
            email: record.text("email")?.to_string(),
            first_name: record.text("first_name")?.to_string(),
            last_name: record.text("last_name")?.to_string(),
            password: record.text("password")?.to_string(),
            is_admin: record.boolean("is_admin")?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "email": self.email,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "is_admin": self.is_admin,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

//! Place domain model.
//!
//! # Invariants
//! - `host_id` names an existing user and `city_id` an existing city at the
//!   time the place was last written.
//! - Coordinates stay within WGS84 bounds; counts and price are non-negative.

use crate::model::entity::{Entity, EntityKind, FieldValue, Record, RecordError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Bookable lodging listed by a host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub host_id: String,
    pub city_id: String,
    pub price_per_night: i64,
    pub number_of_rooms: i64,
    pub number_of_bathrooms: i64,
    pub max_guests: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPlace {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    pub host_id: String,
    pub city_id: String,
    #[serde(default)]
    pub price_per_night: i64,
    #[serde(default)]
    pub number_of_rooms: i64,
    #[serde(default)]
    pub number_of_bathrooms: i64,
    #[serde(default)]
    pub max_guests: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacePatch {
    pub name: Option<String>,
    /// `None` keeps the description, `Some(None)` (JSON `null`) clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub host_id: Option<String>,
    pub city_id: Option<String>,
    pub price_per_night: Option<i64>,
    pub number_of_rooms: Option<i64>,
    pub number_of_bathrooms: Option<i64>,
    pub max_guests: Option<i64>,
}

/// Marks a key that was sent, so `null` stays distinct from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl Entity for Place {
    const KIND: EntityKind = EntityKind::Place;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(Self::KIND, self.id.as_str())
            .with_field("name", self.name.as_str())
            .with_field("description", FieldValue::from(self.description.clone()))
            .with_field("address", self.address.as_str())
            .with_field("latitude", self.latitude)
            .with_field("longitude", self.longitude)
            .with_field("host_id", self.host_id.as_str())
            .with_field("city_id", self.city_id.as_str())
            .with_field("price_per_night", self.price_per_night)
            .with_field("number_of_rooms", self.number_of_rooms)
            .with_field("number_of_bathrooms", self.number_of_bathrooms)
            .with_field("max_guests", self.max_guests);
        record.created_at = self.created_at;
        record.updated_at = self.updated_at;
        record
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        record.expect_kind(Self::KIND)?;
        Ok(Self {
            id: record.id.clone(),
            name: record.text("name")?.to_string(),
            description: record.optional_text("description")?.map(str::to_string),
            address: record.text("address")?.to_string(),
            latitude: record.real("latitude")?,
            longitude: record.real("longitude")?,
            host_id: record.text("host_id")?.to_string(),
            city_id: record.text("city_id")?.to_string(),
            price_per_night: record.integer("price_per_night")?,
            number_of_rooms: record.integer("number_of_rooms")?,
            number_of_bathrooms: record.integer("number_of_bathrooms")?,
            max_guests: record.integer("max_guests")?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "address": self.address,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "city_id": self.city_id,
            "host_id": self.host_id,
            "price_per_night": self.price_per_night,
            "number_of_rooms": self.number_of_rooms,
            "number_of_bathrooms": self.number_of_bathrooms,
            "max_guests": self.max_guests,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

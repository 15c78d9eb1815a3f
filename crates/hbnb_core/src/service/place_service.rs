//! Place use-case service.
//!
//! # Invariants
//! - Host and city references resolve when the place is written.
//! - Coordinates stay within bounds; price and counts are non-negative.

use crate::manager::RepositoryManager;
use crate::model::city::City;
use crate::model::entity::storage_now;
use crate::model::place::{NewPlace, Place, PlacePatch};
use crate::model::user::User;
use crate::service::{
    find, find_all, insert, parse_input, remove, replace, require, required_text, ModelError,
    ModelResult,
};
use uuid::Uuid;

pub struct PlaceService<'m> {
    manager: &'m RepositoryManager,
}

impl<'m> PlaceService<'m> {
    pub fn new(manager: &'m RepositoryManager) -> Self {
        Self { manager }
    }

    pub fn create(&self, input: NewPlace) -> ModelResult<Place> {
        let _guard = self.manager.write_guard()?;
        self.ensure_host(&input.host_id)?;
        self.ensure_city(&input.city_id)?;

        let now = storage_now();
        let place = Place {
            id: Uuid::new_v4().to_string(),
            name: required_text("name", &input.name)?,
            description: input.description,
            address: required_text("address", &input.address)?,
            latitude: input.latitude,
            longitude: input.longitude,
            host_id: input.host_id,
            city_id: input.city_id,
            price_per_night: input.price_per_night,
            number_of_rooms: input.number_of_rooms,
            number_of_bathrooms: input.number_of_bathrooms,
            max_guests: input.max_guests,
            created_at: now,
            updated_at: now,
        };
        validate_place(&place)?;
        insert(self.manager, &place)
    }

    pub fn create_from_json(&self, data: serde_json::Value) -> ModelResult<Place> {
        self.create(parse_input(data)?)
    }

    pub fn get(&self, id: &str) -> ModelResult<Option<Place>> {
        find(self.manager, id)
    }

    pub fn get_all(&self) -> ModelResult<Vec<Place>> {
        find_all(self.manager)
    }

    /// Applies `patch` to an existing place.
    ///
    /// # Errors
    /// - `NotFound` when `id` was never created; nothing is written.
    pub fn update(&self, id: &str, patch: PlacePatch) -> ModelResult<Place> {
        let _guard = self.manager.write_guard()?;
        let mut place: Place = require(self.manager, id)?;

        if let Some(host_id) = patch.host_id {
            self.ensure_host(&host_id)?;
            place.host_id = host_id;
        }
        if let Some(city_id) = patch.city_id {
            self.ensure_city(&city_id)?;
            place.city_id = city_id;
        }
        if let Some(name) = patch.name {
            place.name = required_text("name", &name)?;
        }
        if let Some(address) = patch.address {
            place.address = required_text("address", &address)?;
        }
        if let Some(description) = patch.description {
            place.description = description;
        }
        place.latitude = patch.latitude.unwrap_or(place.latitude);
        place.longitude = patch.longitude.unwrap_or(place.longitude);
        place.price_per_night = patch.price_per_night.unwrap_or(place.price_per_night);
        place.number_of_rooms = patch.number_of_rooms.unwrap_or(place.number_of_rooms);
        place.number_of_bathrooms = patch
            .number_of_bathrooms
            .unwrap_or(place.number_of_bathrooms);
        place.max_guests = patch.max_guests.unwrap_or(place.max_guests);

        validate_place(&place)?;
        replace(self.manager, &place)
    }

    pub fn update_from_json(&self, id: &str, data: serde_json::Value) -> ModelResult<Place> {
        self.update(id, parse_input(data)?)
    }

    pub fn delete(&self, id: &str) -> ModelResult<bool> {
        remove::<Place>(self.manager, id)
    }

    fn ensure_host(&self, host_id: &str) -> ModelResult<()> {
        match find::<User>(self.manager, host_id)? {
            Some(_) => Ok(()),
            None => Err(ModelError::Validation(format!("user `{host_id}` not found"))),
        }
    }

    fn ensure_city(&self, city_id: &str) -> ModelResult<()> {
        match find::<City>(self.manager, city_id)? {
            Some(_) => Ok(()),
            None => Err(ModelError::Validation(format!("city `{city_id}` not found"))),
        }
    }
}

fn validate_place(place: &Place) -> ModelResult<()> {
    if !(-90.0..=90.0).contains(&place.latitude) {
        return Err(ModelError::Validation(format!(
            "latitude {} is out of range",
            place.latitude
        )));
    }
    if !(-180.0..=180.0).contains(&place.longitude) {
        return Err(ModelError::Validation(format!(
            "longitude {} is out of range",
            place.longitude
        )));
    }

    let counts = [
        ("price_per_night", place.price_per_night),
        ("number_of_rooms", place.number_of_rooms),
        ("number_of_bathrooms", place.number_of_bathrooms),
        ("max_guests", place.max_guests),
    ];
    if let Some((field, value)) = counts.iter().find(|(_, value)| *value < 0) {
        return Err(ModelError::Validation(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    Ok(())
}

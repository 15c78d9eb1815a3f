//! City use-case service.
//!
//! # Invariants
//! - A city's country exists when the city is written.
//! - `(name, country_code)` is unique.

use crate::manager::RepositoryManager;
use crate::model::city::{City, CityPatch, NewCity};
use crate::model::entity::storage_now;
use crate::service::country_service::CountryService;
use crate::service::{
    find, find_all, insert, parse_input, remove, replace, require, required_text, ModelError,
    ModelResult,
};
use uuid::Uuid;

pub struct CityService<'m> {
    manager: &'m RepositoryManager,
}

impl<'m> CityService<'m> {
    pub fn new(manager: &'m RepositoryManager) -> Self {
        Self { manager }
    }

    pub fn create(&self, input: NewCity) -> ModelResult<City> {
        let _guard = self.manager.write_guard()?;
        let name = required_text("name", &input.name)?;
        let country_code = self.existing_country(&input.country_code)?;
        self.ensure_unique(&name, &country_code, None)?;

        let now = storage_now();
        let city = City {
            id: Uuid::new_v4().to_string(),
            name,
            country_code,
            created_at: now,
            updated_at: now,
        };
        insert(self.manager, &city)
    }

    pub fn create_from_json(&self, data: serde_json::Value) -> ModelResult<City> {
        self.create(parse_input(data)?)
    }

    pub fn get(&self, id: &str) -> ModelResult<Option<City>> {
        find(self.manager, id)
    }

    pub fn get_all(&self) -> ModelResult<Vec<City>> {
        find_all(self.manager)
    }

    /// Cities of one country.
    pub fn get_by_country(&self, country_code: &str) -> ModelResult<Vec<City>> {
        let code = country_code.trim().to_ascii_uppercase();
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|city| city.country_code == code)
            .collect())
    }

    pub fn update(&self, id: &str, patch: CityPatch) -> ModelResult<City> {
        let _guard = self.manager.write_guard()?;
        let mut city: City = require(self.manager, id)?;

        if let Some(name) = patch.name {
            city.name = required_text("name", &name)?;
        }
        if let Some(country_code) = patch.country_code {
            city.country_code = self.existing_country(&country_code)?;
        }
        self.ensure_unique(&city.name, &city.country_code, Some(&city.id))?;

        replace(self.manager, &city)
    }

    pub fn update_from_json(&self, id: &str, data: serde_json::Value) -> ModelResult<City> {
        self.update(id, parse_input(data)?)
    }

    pub fn delete(&self, id: &str) -> ModelResult<bool> {
        remove::<City>(self.manager, id)
    }

    fn existing_country(&self, code: &str) -> ModelResult<String> {
        CountryService::new(self.manager)
            .get(code)?
            .map(|country| country.code)
            .ok_or_else(|| ModelError::Validation(format!("country `{}` not found", code.trim())))
    }

    fn ensure_unique(
        &self,
        name: &str,
        country_code: &str,
        except_id: Option<&str>,
    ) -> ModelResult<()> {
        let taken = self.get_all()?.into_iter().any(|city| {
            Some(city.id.as_str()) != except_id
                && city.name == name
                && city.country_code == country_code
        });
        if taken {
            return Err(ModelError::Conflict(format!(
                "city `{name}` already exists in {country_code}"
            )));
        }
        Ok(())
    }
}

//! Country use-case service.
//!
//! # Invariants
//! - Country codes are stored upper-case; lookups normalize the same way.

use crate::manager::RepositoryManager;
use crate::model::country::{Country, CountryPatch, NewCountry};
use crate::model::entity::storage_now;
use crate::service::{
    find, find_all, insert, parse_input, remove, replace, require, required_text, ModelError,
    ModelResult,
};
use once_cell::sync::Lazy;
use regex::Regex;

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}$").expect("valid country code regex"));

/// Normalizes and validates an ISO country code.
pub fn normalize_country_code(code: &str) -> ModelResult<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if !COUNTRY_CODE_RE.is_match(&normalized) {
        return Err(ModelError::Validation(format!(
            "invalid country code `{}`",
            code.trim()
        )));
    }
    Ok(normalized)
}

pub struct CountryService<'m> {
    manager: &'m RepositoryManager,
}

impl<'m> CountryService<'m> {
    pub fn new(manager: &'m RepositoryManager) -> Self {
        Self { manager }
    }

    /// Creates a country; a taken code is a conflict.
    pub fn create(&self, input: NewCountry) -> ModelResult<Country> {
        let _guard = self.manager.write_guard()?;
        let now = storage_now();
        let country = Country {
            code: normalize_country_code(&input.code)?,
            name: required_text("name", &input.name)?,
            created_at: now,
            updated_at: now,
        };
        insert(self.manager, &country)
    }

    pub fn create_from_json(&self, data: serde_json::Value) -> ModelResult<Country> {
        self.create(parse_input(data)?)
    }

    /// Returns the country with `code`, or `None` (also for malformed codes).
    pub fn get(&self, code: &str) -> ModelResult<Option<Country>> {
        match normalize_country_code(code) {
            Ok(code) => find(self.manager, &code),
            Err(_) => Ok(None),
        }
    }

    pub fn get_all(&self) -> ModelResult<Vec<Country>> {
        find_all(self.manager)
    }

    pub fn update(&self, code: &str, patch: CountryPatch) -> ModelResult<Country> {
        let _guard = self.manager.write_guard()?;
        let mut country: Country = require(self.manager, &code.trim().to_ascii_uppercase())?;
        if let Some(name) = patch.name {
            country.name = required_text("name", &name)?;
        }
        replace(self.manager, &country)
    }

    pub fn update_from_json(&self, code: &str, data: serde_json::Value) -> ModelResult<Country> {
        self.update(code, parse_input(data)?)
    }

    pub fn delete(&self, code: &str) -> ModelResult<bool> {
        remove::<Country>(self.manager, &code.trim().to_ascii_uppercase())
    }
}

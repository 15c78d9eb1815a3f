//! Built-in reference data.
//!
//! # Invariants
//! - Seeding is idempotent: codes already present are left untouched.

use crate::manager::RepositoryManager;
use crate::model::country::NewCountry;
use crate::service::country_service::CountryService;
use crate::service::ModelResult;
use log::info;

/// ISO 3166-1 alpha-2 codes preloaded on startup.
pub const COUNTRIES: &[(&str, &str)] = &[
    ("AR", "Argentina"),
    ("AU", "Australia"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CL", "Chile"),
    ("CN", "China"),
    ("CO", "Colombia"),
    ("DE", "Germany"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("PE", "Peru"),
    ("PT", "Portugal"),
    ("US", "United States"),
    ("UY", "Uruguay"),
    ("ZA", "South Africa"),
];

/// Inserts every missing built-in country; returns how many were added.
pub fn populate_countries(manager: &RepositoryManager) -> ModelResult<usize> {
    let countries = CountryService::new(manager);
    let mut inserted = 0;
    for (code, name) in COUNTRIES {
        if countries.get(code)?.is_some() {
            continue;
        }
        countries.create(NewCountry {
            code: (*code).to_string(),
            name: (*name).to_string(),
        })?;
        inserted += 1;
    }

    info!(
        "event=seed_countries module=seed status=ok inserted={} total={}",
        inserted,
        COUNTRIES.len()
    );
    Ok(inserted)
}

//! Domain model for the lodging-booking backend.
//!
//! # Responsibility
//! - Define the persisted entities (users, countries, cities, places).
//! - Define the storage-neutral `Record` form every backend accepts.
//!
//! # Invariants
//! - Every entity is identified by a stable id that never changes after
//!   creation; timestamps are owned by the storage layer.
//! - Relationships between entities are checked by services, never by
//!   the storage layer.

pub mod city;
pub mod country;
pub mod entity;
pub mod place;
pub mod user;

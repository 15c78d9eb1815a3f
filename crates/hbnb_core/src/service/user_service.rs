//! User use-case service.
//!
//! # Invariants
//! - Emails are unique, compared case-insensitively.

use crate::manager::RepositoryManager;
use crate::model::entity::storage_now;
use crate::model::user::{NewUser, User, UserPatch};
use crate::service::{
    find, find_all, insert, parse_input, remove, replace, require, required_text, ModelError,
    ModelResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub struct UserService<'m> {
    manager: &'m RepositoryManager,
}

impl<'m> UserService<'m> {
    pub fn new(manager: &'m RepositoryManager) -> Self {
        Self { manager }
    }

    pub fn create(&self, input: NewUser) -> ModelResult<User> {
        let _guard = self.manager.write_guard()?;
        let email = normalize_email(&input.email)?;
        self.ensure_email_available(&email, None)?;

        let now = storage_now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: required_text("first_name", &input.first_name)?,
            last_name: required_text("last_name", &input.last_name)?,
            password: required_text("password", &input.password)?,
            is_admin: input.is_admin,
            created_at: now,
            updated_at: now,
        };
        insert(self.manager, &user)
    }

    pub fn create_from_json(&self, data: serde_json::Value) -> ModelResult<User> {
        self.create(parse_input(data)?)
    }

    pub fn get(&self, id: &str) -> ModelResult<Option<User>> {
        find(self.manager, id)
    }

    pub fn get_all(&self) -> ModelResult<Vec<User>> {
        find_all(self.manager)
    }

    pub fn update(&self, id: &str, patch: UserPatch) -> ModelResult<User> {
        let _guard = self.manager.write_guard()?;
        let mut user: User = require(self.manager, id)?;

        if let Some(email) = patch.email {
            let email = normalize_email(&email)?;
            self.ensure_email_available(&email, Some(&user.id))?;
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = required_text("first_name", &first_name)?;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = required_text("last_name", &last_name)?;
        }
        if let Some(password) = patch.password {
            user.password = required_text("password", &password)?;
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }

        replace(self.manager, &user)
    }

    pub fn update_from_json(&self, id: &str, data: serde_json::Value) -> ModelResult<User> {
        self.update(id, parse_input(data)?)
    }

    pub fn delete(&self, id: &str) -> ModelResult<bool> {
        remove::<User>(self.manager, id)
    }

    fn ensure_email_available(&self, email: &str, except_id: Option<&str>) -> ModelResult<()> {
        let taken = self
            .get_all()?
            .into_iter()
            .any(|user| Some(user.id.as_str()) != except_id && user.email == email);
        if taken {
            return Err(ModelError::Conflict(format!("email `{email}` is already registered")));
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> ModelResult<String> {
    let normalized = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ModelError::Validation(format!("invalid email `{}`", email.trim())));
    }
    Ok(normalized)
}

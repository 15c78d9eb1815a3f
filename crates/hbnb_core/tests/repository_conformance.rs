use chrono::{DateTime, Utc};
use hbnb_core::{
    EntityKind, FieldValue, FileRepository, MemoryRepository, Record, RepoError, Repository,
    SqliteRepository,
};

fn backends(dir: &tempfile::TempDir) -> Vec<Box<dyn Repository>> {
    vec![
        Box::new(MemoryRepository::new()),
        Box::new(FileRepository::open(dir.path().join("store.json")).unwrap()),
        Box::new(SqliteRepository::open_in_memory().unwrap()),
    ]
}

fn country(code: &str, name: &str) -> Record {
    Record::new(EntityKind::Country, code).with_field("name", name)
}

fn city(id: &str, name: &str, country_code: &str) -> Record {
    Record::new(EntityKind::City, id)
        .with_field("name", name)
        .with_field("country_code", country_code)
}

fn place(id: &str) -> Record {
    Record::new(EntityKind::Place, id)
        .with_field("name", "Loft")
        .with_field("address", "1 Main St")
        .with_field("latitude", 30.25)
        .with_field("longitude", -97.75)
        .with_field("host_id", "u-1")
        .with_field("city_id", "c-1")
        .with_field("price_per_night", 120_i64)
        .with_field("number_of_rooms", 2_i64)
        .with_field("number_of_bathrooms", 1_i64)
        .with_field("max_guests", 4_i64)
}

fn user(id: &str, email: &str) -> Record {
    Record::new(EntityKind::User, id)
        .with_field("email", email)
        .with_field("first_name", "Ada")
        .with_field("last_name", "Lovelace")
        .with_field("password", "secret")
        .with_field("is_admin", false)
}

/// Runs one fixed operation sequence and records each observable outcome.
fn replay(repo: &dyn Repository) -> Vec<String> {
    let mut outcomes = Vec::new();
    let mut record = |label: &str, outcome: String| outcomes.push(format!("{label}: {outcome}"));

    record(
        "empty get_all",
        format!("{}", repo.get_all(EntityKind::Country).unwrap().len()),
    );
    record(
        "missing get",
        format!("{:?}", repo.get(EntityKind::Country, "US").unwrap().is_some()),
    );
    record(
        "save US",
        format!("{}", repo.save(&country("US", "United States")).is_ok()),
    );
    record(
        "save FR",
        format!("{}", repo.save(&country("FR", "France")).is_ok()),
    );
    record(
        "duplicate save",
        match repo.save(&country("US", "Other")) {
            Err(RepoError::Conflict { .. }) => "conflict".to_string(),
            other => format!("{other:?}"),
        },
    );
    record(
        "save city",
        format!("{}", repo.save(&city("c-1", "Austin", "US")).is_ok()),
    );
    record("save user", format!("{}", repo.save(&user("u-1", "ada@example.com")).is_ok()));
    record("save place", format!("{}", repo.save(&place("p-1")).is_ok()));
    record(
        "update missing",
        match repo.update(&place("p-404")) {
            Err(RepoError::NotFound { .. }) => "not_found".to_string(),
            other => format!("{other:?}"),
        },
    );
    record(
        "update city",
        repo.update(&city("c-1", "Austin TX", "US"))
            .map(|stored| stored.text("name").unwrap().to_string())
            .unwrap_or_else(|err| err.to_string()),
    );
    record(
        "get city",
        repo.get(EntityKind::City, "c-1")
            .unwrap()
            .map(|stored| stored.text("name").unwrap().to_string())
            .unwrap_or_default(),
    );
    record(
        "delete FR",
        format!("{}", repo.delete(&country("FR", "France")).unwrap()),
    );
    record(
        "delete FR again",
        format!("{}", repo.delete(&country("FR", "France")).unwrap()),
    );
    record(
        "get_all country",
        format!("{}", repo.get_all(EntityKind::Country).unwrap().len()),
    );
    record(
        "get updated absent",
        format!("{}", repo.get(EntityKind::Place, "p-404").unwrap().is_some()),
    );
    outcomes
}

#[test]
fn every_backend_matches_memory_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let reference = replay(&MemoryRepository::new());

    for repo in backends(&dir).iter().skip(1) {
        assert_eq!(
            replay(repo.as_ref()),
            reference,
            "backend `{}` diverged",
            repo.backend_name()
        );
    }
}

#[test]
fn saved_record_reads_back_equal_on_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    for repo in backends(&dir) {
        let stored = repo.save(&place("p-1")).unwrap();
        let loaded = repo.get(EntityKind::Place, "p-1").unwrap().unwrap();

        assert_eq!(loaded, stored, "backend `{}`", repo.backend_name());
        assert_eq!(loaded.field("description"), Some(&FieldValue::Null));
        assert_eq!(loaded.real("latitude").unwrap(), 30.25);
        assert_eq!(loaded.integer("max_guests").unwrap(), 4);
    }
}

#[test]
fn update_preserves_created_at_and_refreshes_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    for repo in backends(&dir) {
        let created = repo.save(&user("u-1", "ada@example.com")).unwrap();
        let updated = repo
            .update(&user("u-1", "ada@example.org").with_field("is_admin", true))
            .unwrap();

        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= updated.created_at);
        let loaded = repo.get(EntityKind::User, "u-1").unwrap().unwrap();
        assert_eq!(loaded.text("email").unwrap(), "ada@example.org");
        assert!(loaded.boolean("is_admin").unwrap());
        assert_eq!(loaded, updated, "backend `{}`", repo.backend_name());
    }
}

#[test]
fn caller_supplied_timestamps_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    for repo in backends(&dir) {
        let mut record = country("US", "United States");
        record.created_at = DateTime::<Utc>::UNIX_EPOCH;
        record.updated_at = DateTime::<Utc>::UNIX_EPOCH;

        let stored = repo.save(&record).unwrap();
        assert!(stored.created_at > DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(stored.created_at, stored.updated_at);
    }
}

#[test]
fn invalid_records_are_rejected_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    for repo in backends(&dir) {
        let unknown_field = country("US", "United States").with_field("capital", "DC");
        assert!(matches!(
            repo.save(&unknown_field),
            Err(RepoError::InvalidRecord(_))
        ));

        let missing_field = Record::new(EntityKind::City, "c-1").with_field("name", "Austin");
        assert!(matches!(
            repo.save(&missing_field),
            Err(RepoError::InvalidRecord(_))
        ));

        let wrong_type = country("US", "United States").with_field("name", 7_i64);
        assert!(matches!(
            repo.save(&wrong_type),
            Err(RepoError::InvalidRecord(_))
        ));

        assert!(repo.get_all(EntityKind::Country).unwrap().is_empty());
        assert!(repo.get_all(EntityKind::City).unwrap().is_empty());
    }
}

#[test]
fn collections_are_isolated_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    for repo in backends(&dir) {
        repo.save(&country("US", "United States")).unwrap();
        repo.save(&city("US", "Springfield", "US")).unwrap();

        assert_eq!(repo.get_all(EntityKind::Country).unwrap().len(), 1);
        assert_eq!(repo.get_all(EntityKind::City).unwrap().len(), 1);
        assert!(repo.get(EntityKind::User, "US").unwrap().is_none());
        assert!(repo.delete(&country("US", "United States")).unwrap());
        assert!(repo.get(EntityKind::City, "US").unwrap().is_some());
    }
}

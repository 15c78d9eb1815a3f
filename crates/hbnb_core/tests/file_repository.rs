use hbnb_core::{EntityKind, FileRepository, Record, RepoError, Repository};
use std::fs;
use std::path::Path;

fn country(code: &str, name: &str) -> Record {
    Record::new(EntityKind::Country, code).with_field("name", name)
}

fn seed_mixed(repo: &FileRepository) -> Vec<Record> {
    vec![
        repo.save(&country("US", "United States")).unwrap(),
        repo.save(&country("MX", "Mexico")).unwrap(),
        repo.save(
            &Record::new(EntityKind::City, "c-1")
                .with_field("name", "Austin")
                .with_field("country_code", "US"),
        )
        .unwrap(),
        repo.save(
            &Record::new(EntityKind::User, "u-1")
                .with_field("email", "ada@example.com")
                .with_field("first_name", "Ada")
                .with_field("last_name", "Lovelace")
                .with_field("password", "secret")
                .with_field("is_admin", true),
        )
        .unwrap(),
        repo.save(
            &Record::new(EntityKind::Place, "p-1")
                .with_field("name", "Loft")
                .with_field("description", "Near the river")
                .with_field("address", "1 Main St")
                .with_field("latitude", 0.0)
                .with_field("longitude", -97.5)
                .with_field("host_id", "u-1")
                .with_field("city_id", "c-1")
                .with_field("price_per_night", 0_i64)
                .with_field("number_of_rooms", 1_i64)
                .with_field("number_of_bathrooms", 1_i64)
                .with_field("max_guests", 2_i64),
        )
        .unwrap(),
    ]
}

#[test]
fn missing_snapshot_opens_empty_without_creating_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let repo = FileRepository::open(&path).unwrap();
    for kind in EntityKind::ALL {
        assert!(repo.get_all(kind).unwrap().is_empty());
    }
    assert!(!path.exists());
}

#[test]
fn restart_restores_every_entity_field_for_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let saved = seed_mixed(&FileRepository::open(&path).unwrap());

    let reopened = FileRepository::open(&path).unwrap();
    let mut restored = Vec::new();
    for kind in EntityKind::ALL {
        restored.extend(reopened.get_all(kind).unwrap());
    }
    assert_eq!(restored.len(), saved.len());
    for record in &saved {
        let loaded = reopened.get(record.kind, &record.id).unwrap().unwrap();
        assert_eq!(&loaded, record);
    }
}

#[test]
fn flush_without_mutation_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    seed_mixed(&FileRepository::open(&path).unwrap());
    let before = fs::read(&path).unwrap();

    let reopened = FileRepository::open(&path).unwrap();
    reopened.flush().unwrap();

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn snapshot_is_grouped_by_type_then_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    seed_mixed(&FileRepository::open(&path).unwrap());

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document["country"]["US"]["name"], "United States");
    assert_eq!(document["city"]["c-1"]["country_code"], "US");
    assert_eq!(document["user"]["u-1"]["is_admin"], true);
    assert_eq!(document["place"]["p-1"]["latitude"], 0.0);
    assert!(document["place"]["p-1"]["created_at"].is_string());
}

#[test]
fn corrupt_snapshot_opens_empty_and_is_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(&path, "{ not json").unwrap();

    let repo = FileRepository::open(&path).unwrap();
    assert!(repo.get_all(EntityKind::Country).unwrap().is_empty());

    repo.save(&country("US", "United States")).unwrap();
    let reopened = FileRepository::open(&path).unwrap();
    assert_eq!(reopened.get_all(EntityKind::Country).unwrap().len(), 1);
}

#[test]
fn non_utf8_snapshot_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::write(&path, [0xff, 0xfe, 0x7b, 0x00]).unwrap();

    let repo = FileRepository::open(&path).unwrap();
    for kind in EntityKind::ALL {
        assert!(repo.get_all(kind).unwrap().is_empty());
    }

    repo.save(&country("US", "United States")).unwrap();
    let reopened = FileRepository::open(&path).unwrap();
    assert_eq!(reopened.get_all(EntityKind::Country).unwrap().len(), 1);
}

#[test]
fn snapshot_path_that_is_a_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    fs::create_dir(&path).unwrap();

    let err = FileRepository::open(&path).unwrap_err();
    assert!(matches!(err, RepoError::Io { .. }));
}

#[test]
fn failed_write_leaves_memory_and_disk_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let repo = FileRepository::open(&path).unwrap();
    repo.save(&country("US", "United States")).unwrap();
    let before = fs::read(&path).unwrap();

    fs::create_dir(temp_path(&path)).unwrap();

    let err = repo.save(&country("FR", "France")).unwrap_err();
    assert!(matches!(err, RepoError::Io { .. }));
    assert!(err.is_storage_failure());
    assert!(repo.get(EntityKind::Country, "FR").unwrap().is_none());

    let err = repo
        .update(&country("US", "United States of America"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Io { .. }));
    let kept = repo.get(EntityKind::Country, "US").unwrap().unwrap();
    assert_eq!(kept.text("name").unwrap(), "United States");

    assert!(repo.delete(&country("US", "United States")).is_err());
    assert!(repo.get(EntityKind::Country, "US").unwrap().is_some());

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn delete_of_missing_entity_does_not_touch_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let repo = FileRepository::open(&path).unwrap();

    assert!(!repo.delete(&country("US", "United States")).unwrap());
    assert!(!path.exists());
}

#[test]
fn reload_discards_unpersisted_view_and_picks_up_external_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    let first = FileRepository::open(&path).unwrap();
    first.save(&country("US", "United States")).unwrap();

    let second = FileRepository::open(&path).unwrap();
    second.save(&country("FR", "France")).unwrap();
    assert!(first.get(EntityKind::Country, "FR").unwrap().is_none());

    first.reload().unwrap();
    assert!(first.get(EntityKind::Country, "FR").unwrap().is_some());
    assert_eq!(first.get_all(EntityKind::Country).unwrap().len(), 2);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store").join("data.json");
    let repo = FileRepository::open(&path).unwrap();

    repo.save(&country("US", "United States")).unwrap();

    assert!(path.exists());
    assert!(!temp_path(&path).exists());
    assert_eq!(repo.path(), path.as_path());
}

fn temp_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    name.into()
}

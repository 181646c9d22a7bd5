use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::Builder;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::palm::assets::{AssetName, AssetRemoval, FilesystemAssetStore, Hand, ImageAssetStore};
use crate::palm::identity::{canonical_id, validate_display_name, validate_national_id};

const TEMP_SUFFIX: &str = ".tmp";

/// A stored template. Persisted as its bare path; hand and sequence are
/// recovered from the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct ImageRef {
    pub path: PathBuf,
    pub hand: Hand,
    pub sequence: u32,
}

impl ImageRef {
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let name = AssetName::from_path(path).ok_or_else(|| AppError::InvalidImageName {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            hand: name.hand,
            sequence: name.sequence,
        })
    }

    fn owner(&self) -> Option<String> {
        AssetName::from_path(&self.path).map(|name| name.id)
    }
}

impl TryFrom<PathBuf> for ImageRef {
    type Error = String;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        ImageRef::from_path(&path).map_err(|err| err.to_string())
    }
}

impl From<ImageRef> for PathBuf {
    fn from(image: ImageRef) -> Self {
        image.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            images: Vec::new(),
        }
    }

    pub fn images_for(&self, hand: Hand) -> impl Iterator<Item = &ImageRef> {
        self.images.iter().filter(move |image| image.hand == hand)
    }

    fn matches(&self, needle: &str) -> bool {
        self.id.to_lowercase().contains(needle) || self.name.to_lowercase().contains(needle)
    }
}

/// What a cascade delete removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedUser {
    pub record: UserRecord,
    pub assets_removed: usize,
    pub assets_missing: usize,
    pub assets_failed: usize,
}

pub trait RecordStore {
    fn load(&self) -> AppResult<Vec<UserRecord>>;
    fn save(&self, records: &[UserRecord]) -> AppResult<()>;
}

/// Registry persisted as one pretty-printed JSON object keyed by id, in
/// insertion order.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn temp_prefix(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("registry");
        format!(".{stem}-")
    }

    /// Removes temp files left behind by a write that never reached its rename.
    fn sweep_stale_temp_files(&self) {
        let prefix = self.temp_prefix();
        let Ok(entries) = fs::read_dir(self.parent()) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => info!(path = %entry.path().display(), "removed stale registry temp file"),
                    Err(err) => warn!(
                        path = %entry.path().display(),
                        error = %err,
                        "failed to remove stale registry temp file"
                    ),
                }
            }
        }
    }

    fn write_err(&self, source: io::Error) -> AppError {
        AppError::RegistryWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for JsonRecordStore {
    fn load(&self) -> AppResult<Vec<UserRecord>> {
        self.sweep_stale_temp_files();

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(AppError::RegistryRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let document: RegistryDocument =
            serde_json::from_slice(&data).map_err(|err| AppError::InvalidRegistryFile {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        document
            .into_records()
            .map_err(|message| AppError::InvalidRegistryFile {
                path: self.path.clone(),
                message,
            })
    }

    fn save(&self, records: &[UserRecord]) -> AppResult<()> {
        let parent = self.parent();
        fs::create_dir_all(parent).map_err(|source| self.write_err(source))?;

        let mut tmp = Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)
            .map_err(|source| self.write_err(source))?;

        {
            let file = tmp.as_file_mut();
            {
                let mut writer = BufWriter::new(&mut *file);
                serde_json::to_writer_pretty(&mut writer, &RegistryView(records))?;
                writer
                    .write_all(b"\n")
                    .and_then(|_| writer.flush())
                    .map_err(|source| self.write_err(source))?;
            }
            file.sync_all().map_err(|source| self.write_err(source))?;
        }

        let file = tmp
            .persist(&self.path)
            .map_err(|err| self.write_err(err.error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file
                .metadata()
                .map_err(|source| self.write_err(source))?
                .permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms)
                .map_err(|source| self.write_err(source))?;
        }

        Ok(())
    }
}

struct RegistryView<'a>(&'a [UserRecord]);

impl Serialize for RegistryView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|record| (&record.id, record)))
    }
}

struct RegistryDocument(Vec<(String, UserRecord)>);

impl RegistryDocument {
    fn into_records(self) -> Result<Vec<UserRecord>, String> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(self.0.len());
        for (key, record) in self.0 {
            if key != record.id {
                return Err(format!("entry '{key}' holds a record for '{}'", record.id));
            }
            if !seen.insert(key.clone()) {
                return Err(format!("duplicate entry for '{key}'"));
            }
            let mut slots = HashSet::new();
            for image in &record.images {
                if image.owner().as_deref() != Some(key.as_str()) {
                    return Err(format!(
                        "image {} does not belong to '{key}'",
                        image.path.display()
                    ));
                }
                if !slots.insert((image.hand, image.sequence)) {
                    return Err(format!(
                        "'{key}' lists {} image {} twice",
                        image.hand, image.sequence
                    ));
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl<'de> Deserialize<'de> for RegistryDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = RegistryDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping user ids to user records")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, UserRecord>()? {
                    entries.push(entry);
                }
                Ok(RegistryDocument(entries))
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Durable user registry. Every mutation is written through the record store
/// before the in-memory view changes, so a failed write leaves both untouched.
///
/// Not thread-safe: concurrent callers must serialize mutations themselves.
pub struct UserRegistry<R = JsonRecordStore, A = FilesystemAssetStore> {
    records: Vec<UserRecord>,
    store: R,
    assets: A,
}

impl UserRegistry<JsonRecordStore, FilesystemAssetStore> {
    pub fn open_at(registry_path: &Path, image_dir: &Path) -> AppResult<Self> {
        Self::open(
            JsonRecordStore::new(registry_path),
            FilesystemAssetStore::new(image_dir),
        )
    }
}

impl<R: RecordStore, A: ImageAssetStore> UserRegistry<R, A> {
    pub fn open(store: R, assets: A) -> AppResult<Self> {
        let records = store.load()?;
        info!(users = records.len(), "loaded user registry");
        Ok(Self {
            records,
            store,
            assets,
        })
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&UserRecord> {
        self.position(id).map(|index| &self.records[index])
    }

    /// Registers an empty record. With `force`, an existing record under the
    /// same id is replaced in the same write that adds the new one.
    pub fn add_user(&mut self, name: &str, id: &str, force: bool) -> AppResult<UserRecord> {
        let id = validate_national_id(id)?;
        let name = validate_display_name(name)?;

        let mut next = self.records.clone();
        if let Some(index) = self.position(&id) {
            if !force {
                return Err(AppError::AlreadyExists { id });
            }
            let replaced = self.remove_assets(self.records[index].clone());
            info!(
                id = %id,
                removed = replaced.assets_removed,
                failed = replaced.assets_failed,
                "replacing existing user record"
            );
            next.remove(index);
        }

        let record = UserRecord::new(name, id);
        next.push(record.clone());
        self.commit(next)?;
        info!(id = %record.id, "registered user");
        Ok(record)
    }

    pub fn add_image(&mut self, id: &str, path: &Path) -> AppResult<ImageRef> {
        let index = self
            .position(id)
            .ok_or_else(|| AppError::UserNotFound { id: id.to_string() })?;
        let image = ImageRef::from_path(path)?;
        if image.owner().as_deref() != Some(self.records[index].id.as_str()) {
            return Err(AppError::InvalidImageName {
                path: path.to_path_buf(),
            });
        }

        let record = &self.records[index];
        if record
            .images
            .iter()
            .any(|existing| existing.hand == image.hand && existing.sequence == image.sequence)
        {
            return Err(AppError::DuplicateImage {
                id: record.id.clone(),
                hand: image.hand,
                sequence: image.sequence,
            });
        }

        let mut next = self.records.clone();
        next[index].images.push(image.clone());
        self.commit(next)?;
        Ok(image)
    }

    /// Deletes a user and every referenced asset. Asset failures are logged
    /// and counted but do not abort the delete.
    pub fn delete_user(&mut self, id: &str) -> AppResult<RemovedUser> {
        let index = self
            .position(id)
            .ok_or_else(|| AppError::UserNotFound { id: id.to_string() })?;
        let removed = self.remove_assets(self.records[index].clone());

        let mut next = self.records.clone();
        next.remove(index);
        self.commit(next)?;
        info!(
            id = %removed.record.id,
            removed = removed.assets_removed,
            missing = removed.assets_missing,
            failed = removed.assets_failed,
            "deleted user"
        );
        Ok(removed)
    }

    /// Unknown ids yield an empty list.
    pub fn get_images(&self, id: &str) -> Vec<ImageRef> {
        self.get(id)
            .map(|record| record.images.clone())
            .unwrap_or_default()
    }

    /// Case-insensitive substring match on id or name, in insertion order.
    pub fn search(&self, query: &str) -> Vec<UserRecord> {
        let needle = query.to_lowercase();
        self.records
            .iter()
            .filter(|record| record.matches(&needle))
            .cloned()
            .collect()
    }

    pub fn get_all_users(&self) -> Vec<UserRecord> {
        self.records.clone()
    }

    fn position(&self, id: &str) -> Option<usize> {
        let key = canonical_id(id);
        self.records.iter().position(|record| record.id == key)
    }

    fn remove_assets(&self, record: UserRecord) -> RemovedUser {
        let mut removed = RemovedUser {
            record,
            assets_removed: 0,
            assets_missing: 0,
            assets_failed: 0,
        };
        for image in &removed.record.images {
            match self.assets.delete(&image.path) {
                Ok(AssetRemoval::Removed) => removed.assets_removed += 1,
                Ok(AssetRemoval::Missing) => removed.assets_missing += 1,
                Err(err) => {
                    warn!(id = %removed.record.id, path = %image.path.display(), error = %err, "failed to delete image asset");
                    removed.assets_failed += 1;
                }
            }
        }
        removed
    }

    fn commit(&mut self, next: Vec<UserRecord>) -> AppResult<()> {
        self.store.save(&next)?;
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    const ALICE: &str = "110101199001010011";
    const BOB: &str = "110101199202020022";

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Vec<Vec<UserRecord>>>,
        fail: Cell<bool>,
    }

    impl RecordStore for &MemoryStore {
        fn load(&self) -> AppResult<Vec<UserRecord>> {
            Ok(self.saved.borrow().last().cloned().unwrap_or_default())
        }

        fn save(&self, records: &[UserRecord]) -> AppResult<()> {
            if self.fail.get() {
                return Err(AppError::RegistryWrite {
                    path: PathBuf::from("memory"),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                });
            }
            self.saved.borrow_mut().push(records.to_vec());
            Ok(())
        }
    }

    fn save_asset(
        assets: &FilesystemAssetStore,
        id: &str,
        hand: Hand,
        sequence: u32,
    ) -> PathBuf {
        assets
            .save(b"frame", &AssetName::new(id, hand, sequence))
            .unwrap()
    }

    #[test]
    fn add_user_rejects_duplicates_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();

        registry.add_user("Alice", ALICE, false).unwrap();
        let image = save_asset(&assets, ALICE, Hand::Left, 1);
        registry.add_image(ALICE, &image).unwrap();

        let err = registry.add_user("Alice 2", ALICE, false).unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists { .. }));
        assert_eq!(registry.get_images(ALICE).len(), 1);

        let record = registry.add_user("Alice 2", ALICE, true).unwrap();
        assert_eq!(record.name, "Alice 2");
        assert!(registry.get_images(ALICE).is_empty());
        assert!(!image.exists());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn forced_replacement_is_a_single_write() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();
        let saves = store.saved.borrow().len();

        store.fail.set(true);
        assert!(registry.add_user("Alice 2", ALICE, true).is_err());
        assert_eq!(registry.get(ALICE).unwrap().name, "Alice");
        assert_eq!(store.saved.borrow().len(), saves);

        store.fail.set(false);
        registry.add_user("Alice 2", ALICE, true).unwrap();
        assert_eq!(store.saved.borrow().len(), saves + 1);
        assert_eq!(registry.get(ALICE).unwrap().name, "Alice 2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lower_case_check_character_addresses_the_same_user() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();
        let lower = "11010119920202002x";
        let upper = "11010119920202002X";

        let record = registry.add_user("Bob", lower, false).unwrap();
        assert_eq!(record.id, upper);
        assert!(registry.contains(lower));
        assert!(matches!(
            registry.add_user("Bob", upper, false).unwrap_err(),
            AppError::AlreadyExists { .. }
        ));

        let path = save_asset(&assets, upper, Hand::Right, 1);
        registry.add_image(lower, &path).unwrap();
        assert_eq!(registry.get_images(lower).len(), 1);

        let removed = registry.delete_user(lower).unwrap();
        assert_eq!(removed.record.id, upper);
        assert_eq!(removed.assets_removed, 1);
        assert!(registry.is_empty());
        assert!(registry.get_images("not-an-id").is_empty());
    }

    #[test]
    fn add_user_validates_before_mutating() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let mut registry =
            UserRegistry::open(&store, FilesystemAssetStore::new(tmp.path())).unwrap();

        assert!(matches!(
            registry.add_user("Alice", "12345", false).unwrap_err(),
            AppError::InvalidId { .. }
        ));
        assert!(matches!(
            registry.add_user(" ", ALICE, false).unwrap_err(),
            AppError::InvalidName { .. }
        ));
        assert!(registry.is_empty());
        assert!(store.saved.borrow().is_empty());
    }

    #[test]
    fn add_image_enforces_ownership_and_unique_slots() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();

        let missing = registry
            .add_image(BOB, &tmp.path().join(format!("{BOB}_left_1.png")))
            .unwrap_err();
        assert!(matches!(missing, AppError::UserNotFound { .. }));

        let foreign = registry
            .add_image(ALICE, &tmp.path().join(format!("{BOB}_left_1.png")))
            .unwrap_err();
        assert!(matches!(foreign, AppError::InvalidImageName { .. }));

        let path = save_asset(&assets, ALICE, Hand::Left, 1);
        let image = registry.add_image(ALICE, &path).unwrap();
        assert_eq!((image.hand, image.sequence), (Hand::Left, 1));

        let duplicate = registry.add_image(ALICE, &path).unwrap_err();
        assert!(matches!(duplicate, AppError::DuplicateImage { .. }));
        assert_eq!(store.saved.borrow().last().unwrap()[0].images.len(), 1);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();

        store.fail.set(true);
        let path = save_asset(&assets, ALICE, Hand::Left, 1);
        assert!(registry.add_image(ALICE, &path).is_err());
        assert!(registry.add_user("Bob", BOB, false).is_err());
        assert!(registry.delete_user(ALICE).is_err());

        assert_eq!(registry.len(), 1);
        assert!(registry.get_images(ALICE).is_empty());
    }

    #[test]
    fn delete_user_is_idempotent_and_tolerates_missing_assets() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let assets = FilesystemAssetStore::new(tmp.path());
        let mut registry = UserRegistry::open(&store, assets.clone()).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();
        let kept = save_asset(&assets, ALICE, Hand::Left, 1);
        let gone = save_asset(&assets, ALICE, Hand::Left, 2);
        registry.add_image(ALICE, &kept).unwrap();
        registry.add_image(ALICE, &gone).unwrap();
        fs::remove_file(&gone).unwrap();

        let removed = registry.delete_user(ALICE).unwrap();
        assert_eq!(removed.assets_removed, 1);
        assert_eq!(removed.assets_missing, 1);
        assert!(!kept.exists());

        let saves = store.saved.borrow().len();
        assert!(matches!(
            registry.delete_user(ALICE).unwrap_err(),
            AppError::UserNotFound { .. }
        ));
        assert_eq!(store.saved.borrow().len(), saves);
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::default();
        let mut registry =
            UserRegistry::open(&store, FilesystemAssetStore::new(tmp.path())).unwrap();
        registry.add_user("Zoe", BOB, false).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();
        registry
            .add_user("Xavier", "11010119900101002x", false)
            .unwrap();

        let all: Vec<_> = registry.search("").into_iter().map(|r| r.name).collect();
        assert_eq!(all, vec!["Zoe", "Alice", "Xavier"]);

        let by_name: Vec<_> = registry.search("aLi").into_iter().map(|r| r.id).collect();
        assert_eq!(by_name, vec![ALICE.to_string()]);

        let by_id: Vec<_> = registry.search("002x").into_iter().map(|r| r.name).collect();
        assert_eq!(by_id, vec!["Xavier"]);

        assert!(registry.search("nobody").is_empty());
        assert!(registry.get_images("unknown").is_empty());
    }

    #[test]
    fn json_store_round_trips_in_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let registry_path = tmp.path().join("data").join("user_data.json");
        let image_dir = tmp.path().join("local_images");
        let mut registry = UserRegistry::open_at(&registry_path, &image_dir).unwrap();
        registry.add_user("Zoe", BOB, false).unwrap();
        registry.add_user("Alice", ALICE, false).unwrap();
        let path = save_asset(registry.assets(), ALICE, Hand::Right, 3);
        registry.add_image(ALICE, &path).unwrap();

        let raw = fs::read_to_string(&registry_path).unwrap();
        assert!(raw.find(BOB).unwrap() < raw.find(ALICE).unwrap());
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[ALICE]["name"], "Alice");
        assert_eq!(
            value[ALICE]["images"][0],
            path.display().to_string().as_str()
        );

        let reopened = UserRegistry::open_at(&registry_path, &image_dir).unwrap();
        assert_eq!(reopened.users(), registry.users());
        assert_eq!(reopened.get_images(ALICE)[0].hand, Hand::Right);
    }

    #[test]
    fn json_store_sweeps_stale_temp_files_and_keeps_committed_state() {
        let tmp = TempDir::new().unwrap();
        let registry_path = tmp.path().join("user_data.json");
        let store = JsonRecordStore::new(&registry_path);
        store.save(&[UserRecord::new("Alice", ALICE)]).unwrap();

        let stale = tmp.path().join(".user_data-abc123.tmp");
        fs::write(&stale, b"{ \"half\": ").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![UserRecord::new("Alice", ALICE)]);
        assert!(!stale.exists());
    }

    #[test]
    fn json_store_reports_corrupt_files() {
        let tmp = TempDir::new().unwrap();
        let registry_path = tmp.path().join("user_data.json");
        fs::write(&registry_path, b"[1, 2, 3]").unwrap();
        let err = JsonRecordStore::new(&registry_path).load().unwrap_err();
        assert!(matches!(err, AppError::InvalidRegistryFile { .. }));

        fs::write(
            &registry_path,
            format!("{{\"{ALICE}\": {{\"name\": \"A\", \"id\": \"{BOB}\", \"images\": []}}}}"),
        )
        .unwrap();
        let err = JsonRecordStore::new(&registry_path).load().unwrap_err();
        assert!(matches!(err, AppError::InvalidRegistryFile { .. }));
    }
}

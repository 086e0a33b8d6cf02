use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::{StorageBackend, StoreError};

const ENTRY_FILE_VERSION: u32 = 1;

/// Configuration for file-backed storage.
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    pub base_dir: PathBuf,
}

impl FileBackendConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_belay_dir().join("tokens")
    }
}

/// Backend storing one TOML file per key.
///
/// Files are written atomically (temp file + rename) with `0600`
/// permissions on unix. Native expiry is recorded in the file and enforced
/// on read.
///
/// # Example
/// ```no_run
/// use belay::auth::{FileBackend, FileBackendConfig, StorageBackend};
///
/// let backend = FileBackend::new(FileBackendConfig::new("/tmp/belay".into()));
/// backend.set("auth-token", "abc", None)?;
/// # Ok::<(), belay::auth::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    pub fn new(config: FileBackendConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: FileBackendConfig::default_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.toml", normalize_label(key)))
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let entry: EntryFile = toml::from_str(&raw)?;
        if entry.version != ENTRY_FILE_VERSION {
            return Err(StoreError::Serialization(format!(
                "unsupported entry version {} at {}",
                entry.version,
                path.display()
            )));
        }
        if entry.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            self.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let entry = EntryFile {
            version: ENTRY_FILE_VERSION,
            key: key.to_string(),
            value: value.to_string(),
            expires_at,
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&entry)?;
        atomic_write(&self.entry_path(key), serialized.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryFile {
    version: u32,
    key: String,
    value: String,
    expires_at: Option<DateTime<Utc>>,
    saved_at: DateTime<Utc>,
}

fn default_belay_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".belay"))
        .unwrap_or_else(|| PathBuf::from(".belay"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '-' || lower == '_' {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    out
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::Io(err));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::Io(err));
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn temp_backend() -> (TempDir, FileBackend) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(FileBackendConfig::new(dir.path().to_path_buf()));
        (dir, backend)
    }

    #[test]
    fn value_round_trip_works() {
        let (_dir, backend) = temp_backend();
        backend.set("auth-token", "access", None).unwrap();
        assert_eq!(backend.get("auth-token").unwrap().as_deref(), Some("access"));
    }

    #[test]
    fn expired_entry_reads_as_missing_and_is_deleted() {
        let (dir, backend) = temp_backend();
        backend
            .set("auth-token", "old", Some(Utc::now() - Duration::minutes(1)))
            .unwrap();

        assert_eq!(backend.get("auth-token").unwrap(), None);
        assert!(!dir.path().join("auth-token.toml").exists());
    }

    #[test]
    fn remove_deletes_file_and_tolerates_missing() {
        let (dir, backend) = temp_backend();
        backend.set("refresh-token", "r", None).unwrap();
        backend.remove("refresh-token").unwrap();
        backend.remove("refresh-token").unwrap();
        assert!(!dir.path().join("refresh-token.toml").exists());
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let (dir, backend) = temp_backend();
        backend.set("auth-token", "a", None).unwrap();
        let has_tmp = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .any(|name| name.contains(".tmp-"));
        assert!(!has_tmp);
    }

    #[cfg(unix)]
    #[test]
    fn entry_files_are_private() {
        let (dir, backend) = temp_backend();
        backend.set("auth-token", "a", None).unwrap();
        let mode = fs::metadata(dir.path().join("auth-token.toml"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn availability_check_reports_unwritable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let backend = FileBackend::new(FileBackendConfig::new(blocker));
        assert!(!backend.is_available());
    }

    #[test]
    fn labels_are_normalized_for_file_names() {
        assert_eq!(normalize_label("fallback_auth-token"), "fallback_auth-token");
        assert_eq!(normalize_label("a/b c"), "a-b-c");
        assert_eq!(normalize_label("  "), "default");
    }
}

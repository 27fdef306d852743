//! JSON files replaced atomically via a temp file in the same directory.

use std::{
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
    dataset::DatasetByClass,
    judging::model::JudgingState,
    schedule::card::{ScheduleDocument, ScheduledCard},
    types::now_secs,
};

use super::{PersistError, PersistResult, ScheduleBackend, StateBackend};

/// Reads `path`, returning the default for a missing file. An unparsable file
/// is copied aside as `<path>.corrupt_<secs>` and the default is returned.
pub fn read_json_or_default<T>(path: &Path) -> PersistResult<T>
where
    T: DeserializeOwned + Default,
{
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(err.into()),
    };

    match serde_json::from_slice(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            let backup = corrupt_path(path, now_secs());
            std::fs::copy(path, &backup)?;
            warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %err,
                "unreadable json file, falling back to blank"
            );
            Ok(T::default())
        }
    }
}

/// Serializes `value` to a temp file next to `path`, syncs it and renames it
/// over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> PersistResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix("._matchcard_")
        .tempfile_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| PersistError::Io(err.error))?;
    Ok(())
}

fn corrupt_path(path: &Path, ts: u64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt_{ts}"));
    PathBuf::from(name)
}

/// Judging state stored in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
    resource: String,
}

impl JsonStateFile {
    /// State file at `path`; parent directories are created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let resource = lock_key(&path);
        Self { path, resource }
    }
}

/// Absolute, lexically normalized spelling of `path`. Every spelling of one
/// file maps to the same key, whether or not the file exists yet.
fn lock_key(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normal = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal.display().to_string()
}

impl StateBackend for JsonStateFile {
    fn resource_name(&self) -> &str {
        &self.resource
    }

    fn load(&self) -> PersistResult<JudgingState> {
        read_json_or_default(&self.path)
    }

    fn save(&self, state: &JudgingState) -> PersistResult<()> {
        write_json_atomic(&self.path, state)
    }
}

/// Schedule stored as `{"list": [...]}`.
#[derive(Debug, Clone)]
pub struct JsonScheduleFile {
    path: PathBuf,
}

impl JsonScheduleFile {
    /// Schedule file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScheduleBackend for JsonScheduleFile {
    fn load_schedule(&self) -> PersistResult<Vec<ScheduledCard>> {
        let doc: ScheduleDocument = read_json_or_default(&self.path)?;
        Ok(doc.list)
    }

    fn save_schedule(&self, cards: &[ScheduledCard]) -> PersistResult<()> {
        write_json_atomic(&self.path, &ScheduleDocument::from(cards.to_vec()))
    }
}

/// Loads a scheduling dataset document `{class: {robots, history}}`.
pub fn load_dataset(path: impl AsRef<Path>) -> PersistResult<DatasetByClass> {
    read_json_or_default(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ClassDataset, RobotInfo};

    #[test]
    fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc: ScheduleDocument = read_json_or_default(&dir.path().join("nope.json")).expect("read");
        assert!(doc.list.is_empty());
    }

    #[test]
    fn dataset_round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("robots.json");
        let mut dataset = DatasetByClass::new();
        dataset.insert(
            "Antweights".to_string(),
            ClassDataset::default()
                .with_robot("Razer", RobotInfo::present())
                .with_history("Razer", "Chaos 2"),
        );

        write_json_atomic(&path, &dataset).expect("write");
        assert_eq!(load_dataset(&path).expect("load"), dataset);

        let leftovers = std::fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("._matchcard_"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn path_spellings_share_a_resource_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plain = JsonStateFile::new(dir.path().join("judging.json"));
        let dotted = JsonStateFile::new(dir.path().join(".").join("judging.json"));
        let detour = JsonStateFile::new(dir.path().join("sub").join("..").join("judging.json"));
        assert_eq!(plain.resource_name(), dotted.resource_name());
        assert_eq!(plain.resource_name(), detour.resource_name());
        assert_ne!(
            plain.resource_name(),
            JsonStateFile::new(dir.path().join("other.json")).resource_name()
        );

        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(
            JsonStateFile::new("judging.json").resource_name(),
            JsonStateFile::new(cwd.join("judging.json")).resource_name()
        );
    }

    #[test]
    fn dataset_fields_default_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("robots.json");
        std::fs::write(&path, r#"{"Sumos": {"robots": {"Pusher": {"present": true}}}}"#).expect("seed");

        let dataset = load_dataset(&path).expect("load");
        let sumos = &dataset["Sumos"];
        assert!(sumos.history.is_empty());
        assert_eq!(sumos.robots["Pusher"], RobotInfo::present());
    }
}

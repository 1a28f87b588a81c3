// src/tasks/image/record.rs

//! Per-image sidecar records under `.dobi/images/`.
//!
//! A record remembers the engine's image ID after a build and the time of
//! the last pull. The record file's own mtime stands for "when this image
//! was last produced" and is compared against the build context.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DobiError, Result};
use crate::fs::FileSystem;

/// Directory, relative to the project, holding image records.
pub const RECORD_DIR: &str = ".dobi/images";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_id: String,
    pub last_pull: Option<SystemTime>,
    /// mtime of the record file; `None` until it has been written.
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RecordFile {
    image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_pull: Option<String>,
}

/// `<work_dir>/.dobi/images/<image name with '/' replaced by ' '>`.
pub fn record_path(work_dir: &Path, image_name: &str) -> PathBuf {
    work_dir.join(RECORD_DIR).join(image_name.replace('/', " "))
}

/// Read a record. A missing file is `Ok(None)`.
pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Option<ImageRecord>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let record_err = |message: String| DobiError::Record {
        path: path.to_path_buf(),
        message,
    };

    let modified = fs.modified(path).map_err(|e| record_err(format!("{e:#}")))?;
    let contents = fs
        .read_to_string(path)
        .map_err(|e| record_err(format!("{e:#}")))?;
    let file: RecordFile =
        serde_yaml::from_str(&contents).map_err(|e| record_err(e.to_string()))?;
    let last_pull = match file.last_pull {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map(SystemTime::from)
                .map_err(|e| record_err(format!("bad last-pull {raw:?}: {e}")))?,
        ),
        None => None,
    };

    Ok(Some(ImageRecord {
        image_id: file.image_id,
        last_pull,
        modified: Some(modified),
    }))
}

/// Write a record atomically (temp file, then rename).
pub fn write(fs: &dyn FileSystem, path: &Path, record: &ImageRecord) -> Result<()> {
    let record_err = |message: String| DobiError::Record {
        path: path.to_path_buf(),
        message,
    };

    let file = RecordFile {
        image_id: record.image_id.clone(),
        last_pull: record
            .last_pull
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)),
    };
    let contents = serde_yaml::to_string(&file).map_err(|e| record_err(e.to_string()))?;

    if let Some(dir) = path.parent() {
        fs.create_dir_all(dir, 0o755)
            .map_err(|e| record_err(format!("{e:#}")))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs.write(&tmp, contents.as_bytes())
        .map_err(|e| record_err(format!("{e:#}")))?;
    fs.rename(&tmp, path)
        .map_err(|e| record_err(format!("{e:#}")))?;
    Ok(())
}

pub fn remove(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    fs.remove_all(path).map_err(|e| DobiError::Record {
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })
}

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use super::{LoadResponse, SaveRequest, SaveResponse, VersionResponse};
use crate::tools::ToolKind;

/// Seconds since the unix epoch, for `updated_at`
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Errors that can occur while reading or writing stored drawings
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Drawing {0} not found")]
    NotFound(DrawingId),

    #[error("Failed to access drawing store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid drawing record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingId(Uuid);

impl DrawingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DrawingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DrawingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DrawingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A drawing as kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingRecord {
    pub id: DrawingId,
    pub title: String,
    /// Stored verbatim; only the session decides whether it is readable
    pub canvas_data: serde_json::Value,
    pub width: u32,
    pub height: u32,
    pub is_completed: bool,
    /// Root drawing this one is a version of
    pub parent_id: Option<DrawingId>,
    pub version_number: u32,
    pub updated_at: u64,
    pub strokes_count: usize,
    pub colors_used: Vec<String>,
    pub tools_used: Vec<ToolKind>,
}

impl DrawingRecord {
    fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            id: DrawingId::new(),
            title: title.to_owned(),
            canvas_data: serde_json::Value::Object(Default::default()),
            width,
            height,
            is_completed: false,
            parent_id: None,
            version_number: 1,
            updated_at: unix_now(),
            strokes_count: 0,
            colors_used: Vec::new(),
            tools_used: Vec::new(),
        }
    }
}

/// Where drawings are saved to and loaded from.
///
/// Calls may block; the UI reaches the store through
/// [`PersistenceClient`](super::PersistenceClient), which runs them off the
/// input thread.
pub trait DrawingStore: Send + Sync {
    fn create(&self, title: &str, width: u32, height: u32) -> StoreResult<DrawingId>;

    fn save(&self, id: DrawingId, request: &SaveRequest) -> StoreResult<SaveResponse>;

    fn load(&self, id: DrawingId) -> StoreResult<LoadResponse>;

    /// Fork `id` into a new drawing with the same content.
    fn create_version(&self, id: DrawingId) -> StoreResult<VersionResponse>;
}

/// Drawing store backed by one JSON file per drawing in a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on the record files
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: DrawingId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_record(&self, id: DrawingId) -> StoreResult<DrawingRecord> {
        let path = self.path_for(id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    fn write_record(&self, record: &DrawingRecord) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.path_for(record.id), json)?;
        Ok(())
    }

    /// All records, in no particular order. Unreadable files are skipped.
    pub fn records(&self) -> StoreResult<Vec<DrawingRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|json| serde_json::from_str::<DrawingRecord>(&json).map_err(StoreError::from))
            {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("Skipping drawing file {}: {}", path.display(), err),
            }
        }
        Ok(records)
    }
}

impl DrawingStore for FileStore {
    fn create(&self, title: &str, width: u32, height: u32) -> StoreResult<DrawingId> {
        let _guard = self.lock.lock();
        let record = DrawingRecord::new(title, width, height);
        self.write_record(&record)?;
        log::info!("Created drawing {} ({}x{})", record.id, width, height);
        Ok(record.id)
    }

    fn save(&self, id: DrawingId, request: &SaveRequest) -> StoreResult<SaveResponse> {
        let _guard = self.lock.lock();
        let mut record = self.read_record(id)?;

        record.canvas_data = serde_json::to_value(&request.canvas_data)?;
        record.width = request.width;
        record.height = request.height;
        record.is_completed = request.is_completed;
        record.strokes_count = request.metadata.strokes_count;
        record.colors_used = request.metadata.colors_used.clone();
        record.tools_used = request.metadata.tools_used.clone();
        record.updated_at = unix_now();

        self.write_record(&record)?;
        log::info!("Saved drawing {} with {} strokes", id, record.strokes_count);
        Ok(SaveResponse {
            success: true,
            error: None,
        })
    }

    fn load(&self, id: DrawingId) -> StoreResult<LoadResponse> {
        let _guard = self.lock.lock();
        let record = self.read_record(id)?;
        Ok(LoadResponse {
            canvas_data: Some(record.canvas_data),
            width: Some(record.width),
            height: Some(record.height),
            title: Some(record.title),
            is_completed: record.is_completed,
        })
    }

    fn create_version(&self, id: DrawingId) -> StoreResult<VersionResponse> {
        let _guard = self.lock.lock();
        let source = self.read_record(id)?;
        let root = source.parent_id.unwrap_or(source.id);

        let latest_version = self
            .records()?
            .iter()
            .filter(|record| record.parent_id == Some(root))
            .map(|record| record.version_number)
            .max();

        let mut version = DrawingRecord::new(&source.title, source.width, source.height);
        version.canvas_data = source.canvas_data;
        version.parent_id = Some(root);
        version.version_number = latest_version.map_or(2, |latest| latest + 1);

        self.write_record(&version)?;
        log::info!(
            "Created version {} of drawing {} as {}",
            version.version_number,
            root,
            version.id
        );
        Ok(VersionResponse {
            success: true,
            new_drawing_id: Some(version.id),
        })
    }
}

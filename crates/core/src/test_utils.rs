use crate::metadata::{MetadataMap, MetadataReader, MetadataUnavailable};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Paths without an entry fail the way a missing exiftool would.
#[derive(Debug, Default)]
pub struct CannedReader {
    entries: HashMap<PathBuf, MetadataMap>,
    calls: Cell<usize>,
}

impl CannedReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_date(mut self, path: impl Into<PathBuf>, value: &str) -> Self {
        let mut map = MetadataMap::new();
        map.insert("CreateDate".to_string(), value.to_string());
        self.entries.insert(path.into(), map);
        self
    }

    pub fn with_map(mut self, path: impl Into<PathBuf>, map: MetadataMap) -> Self {
        self.entries.insert(path.into(), map);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MetadataReader for CannedReader {
    fn read_metadata(&self, path: &Path) -> Result<MetadataMap, MetadataUnavailable> {
        self.calls.set(self.calls.get() + 1);
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataUnavailable::Spawn {
                tool: "canned".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no canned entry"),
            })
    }
}

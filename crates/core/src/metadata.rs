use log::debug;
use std::collections::HashMap;
use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

pub const EXIFTOOL_ENV: &str = "MEDIASTAMP_EXIFTOOL";
pub const DEFAULT_EXIFTOOL: &str = "exiftool";

pub type MetadataMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum MetadataUnavailable {
    #[error("メタデータ取得ツールを起動できませんでした: {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("メタデータ取得ツールが異常終了しました ({status}): {stderr}")]
    Exit { status: String, stderr: String },
    #[error("メタデータ出力をテキストとして読めませんでした")]
    NotText(#[from] std::string::FromUtf8Error),
    #[error("メタデータ読み込み対象を開けませんでした: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("EXIFを解析できませんでした: {0}")]
    Exif(#[from] exif::Error),
}

pub trait MetadataReader {
    fn read_metadata(&self, path: &Path) -> Result<MetadataMap, MetadataUnavailable>;
}

impl<R: MetadataReader + ?Sized> MetadataReader for Box<R> {
    fn read_metadata(&self, path: &Path) -> Result<MetadataMap, MetadataUnavailable> {
        (**self).read_metadata(path)
    }
}

#[derive(Debug, Clone)]
pub struct ExiftoolReader {
    tool: PathBuf,
}

impl ExiftoolReader {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Uses `MEDIASTAMP_EXIFTOOL` when set, otherwise the configured path.
    pub fn from_configured(configured: &str) -> Self {
        Self::new(resolve_exiftool_path(configured))
    }
}

impl MetadataReader for ExiftoolReader {
    fn read_metadata(&self, path: &Path) -> Result<MetadataMap, MetadataUnavailable> {
        debug!("{} {}", self.tool.display(), path.display());
        let output = Command::new(&self.tool)
            .arg(&*tool_argument(path))
            .output()
            .map_err(|source| MetadataUnavailable::Spawn {
                tool: self.tool.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MetadataUnavailable::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout)?;
        Ok(parse_metadata_output(&text))
    }
}

fn tool_argument(path: &Path) -> Cow<'_, Path> {
    let leading_dash = path.as_os_str().to_string_lossy().starts_with('-');
    if path.is_relative() && leading_dash {
        Cow::Owned(Path::new(".").join(path))
    } else {
        Cow::Borrowed(path)
    }
}

pub fn resolve_exiftool_path(configured: &str) -> PathBuf {
    if let Ok(value) = env::var(EXIFTOOL_ENV) {
        let value = value.trim();
        if !value.is_empty() {
            return PathBuf::from(value);
        }
    }

    let configured = configured.trim();
    if configured.is_empty() {
        PathBuf::from(DEFAULT_EXIFTOOL)
    } else {
        PathBuf::from(configured)
    }
}

/// Splits each line on its first colon. Keys lose all whitespace, so
/// `Create Date` becomes `CreateDate`.
pub fn parse_metadata_output(text: &str) -> MetadataMap {
    let mut map = MetadataMap::new();
    for line in text.lines() {
        let Some((raw_key, value)) = line.split_once(':') else {
            continue;
        };
        let key: String = raw_key.chars().filter(|c| !c.is_whitespace()).collect();
        if key.is_empty() {
            continue;
        }
        map.insert(key, value.trim().to_string());
    }
    map
}

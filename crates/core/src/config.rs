use crate::engine::EngineOptions;
use crate::exif_reader::BuiltinExifReader;
use crate::metadata::{ExiftoolReader, MetadataReader, DEFAULT_EXIFTOOL};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    #[default]
    Exiftool,
    Builtin,
}

impl MetadataBackend {
    pub fn reader(self, exiftool_path: &str) -> Box<dyn MetadataReader> {
        match self {
            Self::Exiftool => Box::new(ExiftoolReader::from_configured(exiftool_path)),
            Self::Builtin => Box::new(BuiltinExifReader),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub exiftool_path: String,
    pub metadata_backend: MetadataBackend,
    pub skip_canonical: bool,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exiftool_path: DEFAULT_EXIFTOOL.to_string(),
            metadata_backend: MetadataBackend::Exiftool,
            skip_canonical: true,
            recursive_default: false,
            include_hidden_default: false,
        }
    }
}

impl AppConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            skip_canonical: self.skip_canonical,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub undo_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "mediastamp", "mediastamp")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    Ok(paths_in(proj.config_dir()))
}

fn paths_in(config_dir: &Path) -> AppPaths {
    AppPaths {
        config_path: config_dir.join("config.toml"),
        undo_path: config_dir.join("undo-last.json"),
        config_dir: config_dir.to_path_buf(),
    }
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&app_paths()?.config_path)
}

pub fn load_config_from(config_path: &Path) -> Result<AppConfig> {
    if !config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(config_path).with_context(|| {
        format!("設定ファイルを読めませんでした: {}", config_path.display())
    })?;

    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &app_paths()?.config_path)
}

pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<()> {
    if let Some(config_dir) = config_path.parent() {
        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "設定ディレクトリを作成できませんでした: {}",
                config_dir.display()
            )
        })?;
    }
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(config_path, body).with_context(|| {
        format!(
            "設定ファイルを書き込めませんでした: {}",
            config_path.display()
        )
    })?;
    Ok(())
}

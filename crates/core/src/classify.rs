use crate::patterns::{find_unique, CANONICAL_STAMP};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "heic"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub full_path: PathBuf,
}

impl ParsedPath {
    /// Returns `None` when the file name is missing or not valid UTF-8.
    pub fn parse(path: &Path) -> Option<Self> {
        path.file_name()?.to_str()?;
        let base_name = path.file_stem()?.to_str()?.to_string();
        let extension = match path.extension() {
            Some(ext) => ext.to_str()?.to_string(),
            None => String::new(),
        };
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Some(Self {
            directory,
            base_name,
            extension,
            full_path: path.to_path_buf(),
        })
    }

    pub fn extension_lower(&self) -> String {
        self.extension.to_ascii_lowercase()
    }

    pub fn dotted_extension(&self) -> String {
        if self.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", self.extension)
        }
    }
}

pub fn is_image(parsed: &ParsedPath) -> bool {
    has_extension_in(parsed, IMAGE_EXTENSIONS)
}

pub fn is_video(parsed: &ParsedPath) -> bool {
    has_extension_in(parsed, VIDEO_EXTENSIONS)
}

pub fn is_media(parsed: &ParsedPath) -> bool {
    is_image(parsed) || is_video(parsed)
}

pub fn is_already_canonical(parsed: &ParsedPath) -> bool {
    find_unique(&CANONICAL_STAMP, &parsed.base_name)
        .map(|m| m.start() == 0)
        .unwrap_or(false)
}

fn has_extension_in(parsed: &ParsedPath, allowed: &[&str]) -> bool {
    allowed
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(&parsed.extension))
}

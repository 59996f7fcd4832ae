mod apply;
mod classify;
mod collision;
mod config;
mod engine;
mod exif_reader;
mod metadata;
mod patterns;
mod planner;
mod resolver;
#[cfg(test)]
mod test_utils;

pub use apply::{
    apply_plan, apply_plan_with_undo_log, undo_from_log, undo_last, ApplyResult, UndoResult,
};
pub use classify::{is_already_canonical, is_image, is_media, is_video, ParsedPath};
pub use collision::DirectoryIndex;
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    MetadataBackend,
};
pub use engine::{EngineOptions, RenameEngine, RenameError, RenameOutcome, DESCRIPTION};
pub use exif_reader::BuiltinExifReader;
pub use metadata::{
    parse_metadata_output, resolve_exiftool_path, ExiftoolReader, MetadataMap, MetadataReader,
    MetadataUnavailable, EXIFTOOL_ENV,
};
pub use planner::{generate_plan, PlanOptions, RenameCandidate, RenamePlan, RenameStats};
pub use resolver::{parse_create_date, ResolvedTimestamp, TimestampResolver, TimestampSource};

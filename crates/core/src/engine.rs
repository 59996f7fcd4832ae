use crate::classify::{is_media, ParsedPath};
use crate::collision::{suffixed_name, DirectoryIndex};
use crate::metadata::MetadataReader;
use crate::resolver::{TimestampResolver, TimestampSource};
use log::warn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DESCRIPTION: &str =
    "撮影日時から画像・動画ファイル名を yyyyMMdd_HHmmss 形式に変換します (重複時は _1, _2 ... を付与)";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub skip_canonical: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            skip_canonical: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("ファイル名を解釈できませんでした: {0}")]
    UnparsablePath(PathBuf),
    #[error("連番パターンを構築できませんでした: {0}")]
    SuffixPattern(#[from] regex::Error),
    #[error("連番の上限を超えました: {0}")]
    SuffixExhausted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub source: Option<TimestampSource>,
}

impl RenameOutcome {
    fn unchanged(path: &Path) -> Self {
        Self {
            original_path: path.to_path_buf(),
            target_path: path.to_path_buf(),
            source: None,
        }
    }

    pub fn changed(&self) -> bool {
        self.original_path != self.target_path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BaseNameKey {
    directory: PathBuf,
    stamp: String,
    dotted_ext_lower: String,
}

/// Suffix floors and directory listings live as long as the engine; build a
/// fresh engine for every run.
pub struct RenameEngine<R> {
    resolver: TimestampResolver<R>,
    index: DirectoryIndex,
    suffix_floors: HashMap<BaseNameKey, i64>,
}

impl<R: MetadataReader> RenameEngine<R> {
    pub fn new(reader: R, options: EngineOptions) -> Self {
        Self {
            resolver: TimestampResolver::new(reader, options.skip_canonical),
            index: DirectoryIndex::new(),
            suffix_floors: HashMap::new(),
        }
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTION
    }

    pub fn reader(&self) -> &R {
        self.resolver.reader()
    }

    pub fn replace(&mut self, input: &Path) -> PathBuf {
        self.rename(input).target_path
    }

    pub fn rename(&mut self, input: &Path) -> RenameOutcome {
        match self.try_rename(input) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => RenameOutcome::unchanged(input),
            Err(err) => {
                warn!("元の名前のままにします: {}: {err}", input.display());
                RenameOutcome::unchanged(input)
            }
        }
    }

    fn try_rename(&mut self, input: &Path) -> Result<Option<RenameOutcome>, RenameError> {
        let parsed = ParsedPath::parse(input)
            .ok_or_else(|| RenameError::UnparsablePath(input.to_path_buf()))?;
        if !is_media(&parsed) {
            return Ok(None);
        }

        let Some(resolved) = self.resolver.resolve(&parsed) else {
            return Ok(None);
        };

        let stamp = resolved.at.format(STAMP_FORMAT).to_string();
        let dotted_ext_lower = format!(".{}", parsed.extension_lower());
        let directory = parsed.directory.as_path();

        self.index.ensure_loaded(directory);
        let key = BaseNameKey {
            directory: directory.to_path_buf(),
            stamp,
            dotted_ext_lower,
        };
        let floor = match self.suffix_floors.get(&key) {
            Some(floor) => *floor,
            None => self.index.compute_initial_suffix(
                directory,
                &key.stamp,
                &key.dotted_ext_lower,
            )?,
        };
        let suffix = self
            .index
            .next_available_suffix(directory, &key.stamp, &key.dotted_ext_lower, floor)
            .ok_or_else(|| {
                RenameError::SuffixExhausted(format!("{}{}", key.stamp, key.dotted_ext_lower))
            })?;

        let name = suffixed_name(&key.stamp, suffix, &parsed.dotted_extension());
        self.index.add(directory, name.to_lowercase());
        self.suffix_floors.insert(key, suffix);

        Ok(Some(RenameOutcome {
            original_path: input.to_path_buf(),
            target_path: directory.join(name),
            source: Some(resolved.source),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineOptions, RenameEngine};
    use crate::resolver::TimestampSource;
    use crate::test_utils::CannedReader;
    use chrono::{Local, TimeZone};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn engine(reader: CannedReader) -> RenameEngine<CannedReader> {
        RenameEngine::new(reader, EngineOptions::default())
    }

    fn file_name(path: &Path) -> &str {
        path.file_name()
            .and_then(|v| v.to_str())
            .expect("utf-8 file name")
    }

    #[test]
    fn unsupported_extension_is_left_alone() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("notes_20200101_010203.txt");
        let mut engine = engine(CannedReader::new());
        assert_eq!(engine.replace(&input), input);
        assert_eq!(engine.reader().calls(), 0);
    }

    #[test]
    fn create_date_becomes_canonical_name() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("one.jpg");
        let reader = CannedReader::new().with_create_date(&input, "2024:04:29 13:25:57");
        let mut engine = engine(reader);

        let outcome = engine.rename(&input);
        assert_eq!(outcome.target_path, temp.path().join("20240429_132557.jpg"));
        assert_eq!(outcome.source, Some(TimestampSource::Metadata));
        assert!(outcome.changed());
    }

    #[test]
    fn existing_file_forces_suffixes_in_order() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("20200101_010203.jpg"), b"x").expect("write");
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        let reader = CannedReader::new()
            .with_create_date(&a, "2020:01:01 01:02:03")
            .with_create_date(&b, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        assert_eq!(file_name(&engine.replace(&a)), "20200101_010203_1.jpg");
        assert_eq!(file_name(&engine.replace(&b)), "20200101_010203_2.jpg");
    }

    #[test]
    fn extension_case_shares_one_bucket() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("20200101_010203.JPG"), b"x").expect("write");
        let lower = temp.path().join("photo.jpg");
        let upper = temp.path().join("other.JPG");
        let reader = CannedReader::new()
            .with_create_date(&lower, "2020:01:01 01:02:03")
            .with_create_date(&upper, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        assert_eq!(file_name(&engine.replace(&lower)), "20200101_010203_1.jpg");
        assert_eq!(file_name(&engine.replace(&upper)), "20200101_010203_2.JPG");
    }

    #[test]
    fn unsuffixed_plus_suffixed_names_continue_after_highest() {
        let temp = tempdir().expect("tempdir");
        for name in [
            "20200101_010203.jpg",
            "20200101_010203_1.jpg",
            "20200101_010203_2.jpg",
        ] {
            fs::write(temp.path().join(name), b"x").expect("write");
        }
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        let reader = CannedReader::new()
            .with_create_date(&a, "2020:01:01 01:02:03")
            .with_create_date(&b, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        assert_eq!(file_name(&engine.replace(&a)), "20200101_010203_3.jpg");
        assert_eq!(file_name(&engine.replace(&b)), "20200101_010203_4.jpg");
    }

    #[test]
    fn suffixed_only_names_skip_the_unsuffixed_slot() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("20200101_010203_2.jpg"), b"x").expect("write");
        let a = temp.path().join("a.jpg");
        let reader = CannedReader::new().with_create_date(&a, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        assert_eq!(file_name(&engine.replace(&a)), "20200101_010203_3.jpg");
    }

    #[test]
    fn buckets_are_per_directory_and_extension() {
        let temp = tempdir().expect("tempdir");
        let day1 = temp.path().join("day1");
        let day2 = temp.path().join("day2");
        fs::create_dir_all(&day1).expect("day1");
        fs::create_dir_all(&day2).expect("day2");
        let a = day1.join("a.jpg");
        let b = day2.join("b.jpg");
        let c = day1.join("c.mov");
        let reader = CannedReader::new()
            .with_create_date(&a, "2020:01:01 01:02:03")
            .with_create_date(&b, "2020:01:01 01:02:03")
            .with_create_date(&c, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        assert_eq!(engine.replace(&a), day1.join("20200101_010203.jpg"));
        assert_eq!(engine.replace(&b), day2.join("20200101_010203.jpg"));
        assert_eq!(engine.replace(&c), day1.join("20200101_010203.mov"));
    }

    #[test]
    fn directory_is_listed_only_once_per_run() {
        let temp = tempdir().expect("tempdir");
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.jpg");
        let reader = CannedReader::new()
            .with_create_date(&a, "2020:01:01 01:02:03")
            .with_create_date(&b, "2021:02:02 02:02:02");
        let mut engine = engine(reader);

        assert_eq!(file_name(&engine.replace(&a)), "20200101_010203.jpg");
        fs::write(temp.path().join("20210202_020202.jpg"), b"x").expect("write");
        assert_eq!(file_name(&engine.replace(&b)), "20210202_020202.jpg");
    }

    #[test]
    fn canonical_input_is_left_alone_and_replace_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("one.jpg");
        let reader = CannedReader::new().with_create_date(&input, "2024:04:29 13:25:57");
        let mut engine = engine(reader);

        let first = engine.replace(&input);
        assert_eq!(engine.replace(&first), first);
    }

    #[test]
    fn canonical_input_is_rederived_when_skip_disabled() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("20200101_010203.jpg");
        fs::write(&input, b"x").expect("write");
        let reader = CannedReader::new().with_create_date(&input, "2020:01:01 01:02:03");
        let mut engine = RenameEngine::new(
            reader,
            EngineOptions {
                skip_canonical: false,
            },
        );

        assert_eq!(file_name(&engine.replace(&input)), "20200101_010203_1.jpg");
    }

    #[test]
    fn epoch_millis_name_is_used_without_metadata() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("1500000000000_photo.jpg");
        let mut engine = engine(CannedReader::new());

        let expected = Local
            .timestamp_millis_opt(1_500_000_000_000)
            .single()
            .expect("valid timestamp")
            .format("%Y%m%d_%H%M%S.jpg")
            .to_string();
        let outcome = engine.rename(&input);
        assert_eq!(file_name(&outcome.target_path), expected);
        assert_eq!(outcome.source, Some(TimestampSource::EpochMillis));
    }

    #[test]
    fn reader_failure_without_fallback_keeps_path() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("IMG_0001.HEIC");
        let mut engine = engine(CannedReader::new());

        let outcome = engine.rename(&input);
        assert_eq!(outcome.target_path, input);
        assert!(!outcome.changed());
        assert_eq!(outcome.source, None);
    }

    #[test]
    fn unreadable_directory_still_gets_a_name() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("missing").join("clip.mp4");
        let reader = CannedReader::new().with_create_date(&input, "2022:06:01 08:00:00");
        let mut engine = engine(reader);

        assert_eq!(
            engine.replace(&input),
            temp.path().join("missing").join("20220601_080000.mp4")
        );
    }

    #[test]
    fn exhausted_suffix_range_keeps_path() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(format!("20200101_010203_{}.jpg", i64::MAX)),
            b"x",
        )
        .expect("write");
        let a = temp.path().join("a.jpg");
        let b = temp.path().join("b.png");
        let reader = CannedReader::new()
            .with_create_date(&a, "2020:01:01 01:02:03")
            .with_create_date(&b, "2020:01:01 01:02:03");
        let mut engine = engine(reader);

        let outcome = engine.rename(&a);
        assert_eq!(outcome.target_path, a);
        assert_eq!(outcome.source, None);
        assert_eq!(file_name(&engine.replace(&b)), "20200101_010203.png");
    }

    #[test]
    fn full_width_digit_name_is_renamed_from_metadata() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("２０２４０４２９_１３２５５７.jpg");
        let reader = CannedReader::new().with_create_date(&input, "2024:04:29 13:25:57");
        let mut engine = engine(reader);

        let outcome = engine.rename(&input);
        assert_eq!(outcome.target_path, temp.path().join("20240429_132557.jpg"));
        assert_eq!(outcome.source, Some(TimestampSource::Metadata));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_name_is_left_alone() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().expect("tempdir");
        let input = temp.path().join(OsStr::from_bytes(b"IMG_\xff_20200101_010203.jpg"));
        let mut engine = engine(CannedReader::new());
        assert_eq!(engine.replace(&input), input);
    }

    #[test]
    fn description_is_static() {
        let engine = engine(CannedReader::new());
        assert!(engine.description().contains("yyyyMMdd_HHmmss"));
    }
}

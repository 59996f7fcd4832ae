use crate::classify::{is_already_canonical, ParsedPath};
use crate::metadata::MetadataReader;
use crate::patterns::{find_unique, CANONICAL_STAMP, EPOCH_MILLIS};
use chrono::{Local, NaiveDateTime, TimeZone};
use log::debug;
use serde::{Deserialize, Serialize};

const CREATE_DATE_KEY: &str = "CreateDate";
const CREATE_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const FILENAME_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const FILENAME_STAMP_LEN: usize = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampSource {
    Metadata,
    FilenamePattern,
    EpochMillis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub at: NaiveDateTime,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    fn new(at: NaiveDateTime, source: TimestampSource) -> Self {
        Self { at, source }
    }
}

pub struct TimestampResolver<R> {
    reader: R,
    skip_canonical: bool,
}

impl<R: MetadataReader> TimestampResolver<R> {
    pub fn new(reader: R, skip_canonical: bool) -> Self {
        Self {
            reader,
            skip_canonical,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn resolve(&self, parsed: &ParsedPath) -> Option<ResolvedTimestamp> {
        if self.skip_canonical && is_already_canonical(parsed) {
            debug!("既に正規名のためスキップ: {}", parsed.full_path.display());
            return None;
        }

        self.from_metadata(parsed)
            .or_else(|| from_filename_stamp(&parsed.base_name))
            .or_else(|| from_epoch_millis(&parsed.base_name))
    }

    fn from_metadata(&self, parsed: &ParsedPath) -> Option<ResolvedTimestamp> {
        let map = match self.reader.read_metadata(&parsed.full_path) {
            Ok(map) => map,
            Err(err) => {
                debug!(
                    "メタデータなしとして続行: {}: {err}",
                    parsed.full_path.display()
                );
                return None;
            }
        };

        let raw = map.get(CREATE_DATE_KEY)?;
        let at = parse_create_date(raw);
        if at.is_none() {
            debug!("CreateDateを解釈できませんでした: {raw:?}");
        }
        at.map(|at| ResolvedTimestamp::new(at, TimestampSource::Metadata))
    }
}

/// `2024:04:29 13:25:57.123+09:00` parses as `2024-04-29 13:25:57`; anything
/// glued on without a dot makes the value unusable.
pub fn parse_create_date(raw: &str) -> Option<NaiveDateTime> {
    let head = raw.split_once('.').map_or(raw, |(head, _)| head);
    NaiveDateTime::parse_from_str(head, CREATE_DATE_FORMAT).ok()
}

fn from_filename_stamp(base_name: &str) -> Option<ResolvedTimestamp> {
    let found = find_unique(&CANONICAL_STAMP, base_name)?;
    let stamp = found.as_str().get(..FILENAME_STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, FILENAME_STAMP_FORMAT)
        .ok()
        .map(|at| ResolvedTimestamp::new(at, TimestampSource::FilenamePattern))
}

fn from_epoch_millis(base_name: &str) -> Option<ResolvedTimestamp> {
    let found = find_unique(&EPOCH_MILLIS, base_name)?;
    let millis = found.as_str().parse::<i64>().ok()?;
    let local = Local.timestamp_millis_opt(millis).single()?;
    Some(ResolvedTimestamp::new(
        local.naive_local(),
        TimestampSource::EpochMillis,
    ))
}

use crate::metadata::{MetadataMap, MetadataReader, MetadataUnavailable};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// names exiftool prints for these tags
const DATE_TAGS: &[(Tag, &str)] = &[
    (Tag::DateTimeDigitized, "CreateDate"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::DateTime, "ModifyDate"),
];

/// Date fields only. Containers kamadak-exif cannot read come back as `MetadataUnavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinExifReader;

impl MetadataReader for BuiltinExifReader {
    fn read_metadata(&self, path: &Path) -> Result<MetadataMap, MetadataUnavailable> {
        let file = File::open(path).map_err(|source| MetadataUnavailable::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buf = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut buf)?;

        let mut map = MetadataMap::new();
        for (tag, name) in DATE_TAGS {
            let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
                continue;
            };
            if let Some(value) = ascii_date(&field.value) {
                map.insert((*name).to_string(), value);
            }
        }
        Ok(map)
    }
}

fn ascii_date(value: &Value) -> Option<String> {
    let Value::Ascii(parts) = value else {
        return None;
    };
    let raw = parts.first()?;
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    Some(format!(
        "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
    ))
}

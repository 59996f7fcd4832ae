use log::debug;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DirectoryIndex {
    known: HashMap<PathBuf, HashSet<String>>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_loaded(&mut self, directory: &Path) {
        if self.known.contains_key(directory) {
            return;
        }
        let names = list_lowercase_names(directory);
        self.known.insert(directory.to_path_buf(), names);
    }

    pub fn contains(&self, directory: &Path, name_lower: &str) -> bool {
        self.known
            .get(directory)
            .map(|names| names.contains(name_lower))
            .unwrap_or(false)
    }

    pub fn add(&mut self, directory: &Path, name_lower: String) {
        self.known
            .entry(directory.to_path_buf())
            .or_default()
            .insert(name_lower);
    }

    /// Highest `_<n>` already present for `<stamp>[_<n>]<ext>`, or -1.
    ///
    /// An unsuffixed `<stamp><ext>` alone leaves the result at -1; it is
    /// caught later by the membership check in `next_available_suffix`.
    pub fn compute_initial_suffix(
        &self,
        directory: &Path,
        stamp: &str,
        dotted_ext_lower: &str,
    ) -> Result<i64, regex::Error> {
        let pattern = Regex::new(&format!(
            r"^{}(?:_([0-9]+))?{}$",
            regex::escape(stamp),
            regex::escape(dotted_ext_lower)
        ))?;

        let Some(names) = self.known.get(directory) else {
            return Ok(-1);
        };

        let highest = names
            .iter()
            .filter_map(|name| pattern.captures(name))
            .filter_map(|caps| caps.get(1))
            .filter_map(|n| n.as_str().parse::<i64>().ok())
            .fold(-1, i64::max);
        Ok(highest)
    }

    /// `None` once the suffix number no longer fits in an `i64`.
    pub fn next_available_suffix(
        &self,
        directory: &Path,
        stamp: &str,
        dotted_ext_lower: &str,
        start: i64,
    ) -> Option<i64> {
        let mut index = start;
        loop {
            index.checked_add(1)?;
            if !self.contains(directory, &suffixed_name(stamp, index, dotted_ext_lower)) {
                return Some(index);
            }
            index += 1;
        }
    }
}

pub fn suffixed_name(stamp: &str, index: i64, dotted_ext: &str) -> String {
    if index < 0 {
        format!("{stamp}{dotted_ext}")
    } else {
        format!("{stamp}_{}{dotted_ext}", i128::from(index) + 1)
    }
}

fn list_lowercase_names(directory: &Path) -> HashSet<String> {
    let target = if directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        directory
    };

    match fs::read_dir(target) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().to_lowercase())
            .collect(),
        Err(err) => {
            debug!(
                "フォルダを読めないため空として扱います: {}: {err}",
                target.display()
            );
            HashSet::new()
        }
    }
}

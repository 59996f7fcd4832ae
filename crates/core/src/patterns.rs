use regex::{Match, Regex};
use std::sync::LazyLock;

pub(crate) static CANONICAL_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{8}_[0-9]{6,}").expect("canonical stamp pattern"));

// 13 digits starting with `15`: roughly 2017-07 to 2020-09.
pub(crate) static EPOCH_MILLIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"15[0-9]{11}").expect("epoch millis pattern"));

pub(crate) fn find_unique<'h>(pattern: &Regex, haystack: &'h str) -> Option<Match<'h>> {
    let mut matches = pattern.find_iter(haystack);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

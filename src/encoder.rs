//! Serialization of tag maps into SQL comment payloads, and back.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

// Trailing `/*...*/`, optionally followed by the statement terminator.
static TRAILING_COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*([^*]*)\*/;?\s*$").unwrap());

/// Encode tags as `key=value` pairs joined by `,`, keys sorted.
///
/// Keys and values are percent-encoded, so neither `=`, `,`, `'` nor the
/// comment terminator `*/` can appear raw in the payload. The output does not
/// depend on the iteration order of `tags`.
pub fn encode_comment<I, K, V>(tags: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = tags.into_iter().collect();
    pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));

    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key.as_ref()),
                urlencoding::encode(value.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a payload produced by [`encode_comment`].
///
/// Returns `None` if a pair is malformed or not valid percent-encoded UTF-8.
pub fn decode_comment(payload: &str) -> Option<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();
    if payload.is_empty() {
        return Some(tags);
    }

    for pair in payload.split(',') {
        let (key, value) = pair.split_once('=')?;
        let key = urlencoding::decode(key).ok()?;
        let value = urlencoding::decode(value).ok()?;
        tags.insert(key.into_owned(), value.into_owned());
    }

    Some(tags)
}

/// Extract and decode the trailing comment of an annotated statement.
///
/// Returns `None` if the statement carries no trailing comment.
pub fn parse_comment(statement: &str) -> Option<BTreeMap<String, String>> {
    TRAILING_COMMENT_REGEX
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .and_then(|m| decode_comment(m.as_str()))
}

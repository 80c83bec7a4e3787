//! Link catalog parsing.
//!
//! A catalog is a JSON file in the RawLINK stage naming transcript pages to
//! scrape. Three shapes are accepted:
//! - an object mapping display name to URL
//! - an array of `{"name": ..., "url": ...}` objects
//! - an array of `[name, url]` pairs (extra elements ignored)
//!
//! Array items may mix the last two shapes. Names are sanitized into safe
//! file stems and must be unique across every catalog file of a run; URLs
//! get their nested-encoded `id` query parameter unwrapped.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors raised while loading link catalogs. All of them are fatal for a
/// SharePoint run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog file found in {0}")]
    NoCatalog(PathBuf),

    #[error("catalog file is empty: {0}")]
    Empty(PathBuf),

    #[error("invalid JSON in {path}: {message}")]
    InvalidJson { path: PathBuf, message: String },

    #[error("unsupported catalog shape in {0}: expected an object or an array")]
    UnsupportedShape(PathBuf),

    #[error("unsupported catalog item in {path}: {item}")]
    UnsupportedItem { path: PathBuf, item: String },

    #[error("duplicate link name '{name}' found in {first} and {second}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid link URL '{url}': {message}")]
    BadUrl { url: String, message: String },

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// One scraping target: a sanitized display name and a normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub name: String,
    pub url: String,
}

/// Parse one catalog file's text into link entries.
///
/// `origin` is only used in error messages and duplicate reports.
pub fn parse_catalog(text: &str, origin: &Path) -> Result<Vec<LinkEntry>, CatalogError> {
    let mut entries = Vec::new();
    let mut seen = HashMap::new();
    parse_into(text, origin, &mut entries, &mut seen)?;
    Ok(entries)
}

/// Load every `*.json` catalog in a directory, in file-name order, into one
/// entry list. Names have to be unique across all files.
pub fn load_link_catalogs(dir: &Path) -> Result<Vec<LinkEntry>, CatalogError> {
    let mut files: Vec<PathBuf> = Vec::new();
    if dir.is_dir() {
        for dirent in fs::read_dir(dir)? {
            let path = dirent?.path();
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if path.is_file() && is_json {
                files.push(path);
            }
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(CatalogError::NoCatalog(dir.to_path_buf()));
    }

    tracing::info!("Loading {} catalog file(s) from {}", files.len(), dir.display());

    let mut entries = Vec::new();
    let mut seen = HashMap::new();
    for path in &files {
        let text = fs::read_to_string(path)?;
        parse_into(&text, path, &mut entries, &mut seen)?;
    }
    Ok(entries)
}

fn parse_into(
    text: &str,
    origin: &Path,
    entries: &mut Vec<LinkEntry>,
    seen: &mut HashMap<String, PathBuf>,
) -> Result<(), CatalogError> {
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Err(CatalogError::Empty(origin.to_path_buf()));
    }

    let value: Value = serde_json::from_str(text).map_err(|e| CatalogError::InvalidJson {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut add = |name: &str, url: &str| -> Result<(), CatalogError> {
        let clean_name = sanitize_name(name);
        if let Some(first) = seen.get(&clean_name) {
            return Err(CatalogError::DuplicateName {
                name: clean_name,
                first: first.clone(),
                second: origin.to_path_buf(),
            });
        }
        seen.insert(clean_name.clone(), origin.to_path_buf());
        entries.push(LinkEntry {
            name: clean_name,
            url: normalize_stream_url(url)?,
        });
        Ok(())
    };

    match value {
        Value::Object(map) => {
            for (name, url) in &map {
                match url.as_str() {
                    Some(url) => add(name, url)?,
                    None => {
                        return Err(CatalogError::UnsupportedItem {
                            path: origin.to_path_buf(),
                            item: format!("\"{}\": {}", name, url),
                        })
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in &items {
                let parts = match item {
                    Value::Object(map) => (
                        map.get("name").and_then(Value::as_str),
                        map.get("url").and_then(Value::as_str),
                    ),
                    Value::Array(pair) if pair.len() >= 2 => {
                        (pair[0].as_str(), pair[1].as_str())
                    }
                    _ => (None, None),
                };
                match parts {
                    (Some(name), Some(url)) => add(name, url)?,
                    _ => {
                        return Err(CatalogError::UnsupportedItem {
                            path: origin.to_path_buf(),
                            item: item.to_string(),
                        })
                    }
                }
            }
        }
        _ => return Err(CatalogError::UnsupportedShape(origin.to_path_buf())),
    }

    Ok(())
}

/// Sanitize a display name into a safe file stem.
///
/// Runs of anything but alphanumerics, `_` and `-` collapse into a single
/// underscore; the result is capped at 120 characters. A blank name becomes
/// `unnamed`.
pub fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_run = false;
    for c in trimmed.chars() {
        if c.is_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }

    out.chars().take(120).collect()
}

/// Characters left literal when the query string is rebuilt.
const QUERY_KEEP: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'%')
    .remove(b':')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Normalize a stream URL.
///
/// SharePoint sharing flows stack percent-encoding on the `id` query
/// parameter; it is decoded until stable (at most three rounds). Repeated
/// query keys collapse to their first value.
pub fn normalize_stream_url(raw: &str) -> Result<String, CatalogError> {
    let mut url = Url::parse(raw).map_err(|e| CatalogError::BadUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    if url.query().is_none() {
        return Ok(url.to_string());
    }

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in url.query_pairs() {
        if pairs.iter().any(|(k, _)| *k == *key) {
            continue;
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }

    for (key, value) in &mut pairs {
        if key == "id" {
            for _ in 0..3 {
                let decoded = percent_decode_str(value).decode_utf8_lossy().into_owned();
                if decoded == *value {
                    break;
                }
                *value = decoded;
            }
        }
    }

    let query = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_KEEP),
                utf8_percent_encode(v, QUERY_KEEP)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    url.set_query(if query.is_empty() { None } else { Some(&query) });
    Ok(url.to_string())
}

//! Defines the [`RedirectRecord`] type and the [`RedirectStore`] interface
//! consulted when a path matches neither the current nor the legacy permalink
//! format. [`MemoryRedirects`] is an in-memory table which enforces unique
//! `from_path`s and fills in blank ones.

use crate::content::StoreError;
use crate::link::normalize_under;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps an arbitrary site-relative path to another location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRecord {
    /// The site-relative path to redirect from, without a leading slash and
    /// without percent-escapes (e.g., `foo/bar`). Unique within a store.
    #[serde(default)]
    pub from_path: String,

    /// Either an absolute URL (used verbatim) or a root-relative path.
    pub to_path: String,
}

impl RedirectRecord {
    pub fn new(from_path: &str, to_path: &str) -> RedirectRecord {
        RedirectRecord {
            from_path: from_path.to_owned(),
            to_path: to_path.to_owned(),
        }
    }
}

/// The read interface the resolver needs from the redirect collaborator.
pub trait RedirectStore {
    /// Returns the record whose `from_path` equals `path` exactly. `path` has
    /// already been normalized (see [`crate::link::normalize`]).
    fn find_by_from_path(
        &self,
        path: &str,
    ) -> std::result::Result<Option<RedirectRecord>, StoreError>;
}

/// A [`RedirectStore`] over an in-memory list.
#[derive(Clone, Debug, Default)]
pub struct MemoryRedirects {
    records: Vec<RedirectRecord>,
}

impl MemoryRedirects {
    pub fn new() -> MemoryRedirects {
        MemoryRedirects::default()
    }

    /// Loads a table from a YAML list of [`RedirectRecord`]s, applying the
    /// same rules as [`MemoryRedirects::insert`].
    pub fn from_yaml(input: &str) -> Result<MemoryRedirects> {
        let records: Vec<RedirectRecord> = serde_yaml::from_str(input)?;
        let mut table = MemoryRedirects::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    /// Adds a record. The `from_path` is trimmed and normalized the way
    /// request paths are (leading slashes dropped, percent-escapes decoded).
    /// A blank `from_path` is replaced with a generated short code; see
    /// [`MemoryRedirects::next_short_code`].
    pub fn insert(&mut self, mut record: RedirectRecord) -> Result<&RedirectRecord> {
        record.from_path = normalize_under(record.from_path.trim(), "");
        if record.from_path.is_empty() {
            record.from_path = self.next_short_code();
        } else if self.get(&record.from_path).is_some() {
            return Err(Error::DuplicateFromPath(record.from_path));
        }
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Generates a `from_path` for a record saved without one: the base-36
    /// rendering of the table size plus one, counting upward past any codes
    /// already taken. The first generated code is `1`, the tenth `a`, the
    /// thirty-seventh `11`.
    pub fn next_short_code(&self) -> String {
        let mut n = self.records.len() as u64 + 1;
        loop {
            let code = base36(n);
            if self.get(&code).is_none() {
                return code;
            }
            n += 1;
        }
    }

    pub fn get(&self, from_path: &str) -> Option<&RedirectRecord> {
        self.records.iter().find(|r| r.from_path == from_path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RedirectStore for MemoryRedirects {
    fn find_by_from_path(
        &self,
        path: &str,
    ) -> std::result::Result<Option<RedirectRecord>, StoreError> {
        Ok(self.get(path).cloned())
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// The result of a redirect-table operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error saving a [`RedirectRecord`].
#[derive(Debug)]
pub enum Error {
    /// Returned when another record already redirects from the same path.
    DuplicateFromPath(String),

    /// Returned when there was an error parsing records from YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateFromPath(path) => {
                write!(f, "a redirect from `{}` already exists", path)
            }
            Error::DeserializeYaml(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DuplicateFromPath(_) => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insert_normalizes_from_path() -> Result<()> {
        let mut table = MemoryRedirects::new();
        let record = table.insert(RedirectRecord::new("//foo/caf%C3%A9", "/x"))?;
        assert_eq!("foo/café", record.from_path);
        Ok(())
    }

    #[test]
    fn test_insert_rejects_duplicates() -> Result<()> {
        let mut table = MemoryRedirects::new();
        table.insert(RedirectRecord::new("foo/bar", "/a"))?;
        assert!(matches!(
            table.insert(RedirectRecord::new("/foo/bar", "/b")),
            Err(Error::DuplicateFromPath(ref path)) if path == "foo/bar"
        ));
        assert_eq!(1, table.len());
        Ok(())
    }

    #[test]
    fn test_insert_generates_blank_from_path() -> Result<()> {
        let mut table = MemoryRedirects::new();
        table.insert(RedirectRecord::new("2", "/taken"))?;
        let first = table.insert(RedirectRecord::new("", "/a"))?.from_path.clone();
        // "2" is taken, so the counter moves past it.
        assert_eq!("3", first);
        let second = table.insert(RedirectRecord::new("  ", "/b"))?.from_path.clone();
        assert_eq!("4", second);
        let third = table.insert(RedirectRecord::new("/", "/c"))?.from_path.clone();
        assert_eq!("5", third);
        Ok(())
    }

    #[test]
    fn test_base36() {
        assert_eq!("1", base36(1));
        assert_eq!("a", base36(10));
        assert_eq!("10", base36(36));
        assert_eq!("11", base36(37));
    }

    #[test]
    fn test_find_by_from_path() -> std::result::Result<(), StoreError> {
        let table = MemoryRedirects::from_yaml(
            r#"
- from_path: foo/bar
  to_path: /someplace/else
- to_path: https://elsewhere.org/
"#,
        )?;
        assert_eq!(
            Some(RedirectRecord::new("foo/bar", "/someplace/else")),
            table.find_by_from_path("foo/bar")?
        );
        assert_eq!(
            Some(RedirectRecord::new("2", "https://elsewhere.org/")),
            table.find_by_from_path("2")?
        );
        assert_eq!(None, table.find_by_from_path("foo")?);
        Ok(())
    }
}

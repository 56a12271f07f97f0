//! The resolution pipeline. Given an incoming request path, the site's
//! current [`Permalink`], and the store collaborators, [`Resolver::resolve`]
//! decides whether to serve content, redirect permanently, or report that
//! nothing was found. The steps, in order:
//!
//! 1. **Canonical match**: the path matches the current format and names a
//!    published item. The newest revision of that item is served, in the
//!    rendering mode selected by any feed suffix.
//! 2. **Legacy match**: the path matches the built-in default format, either
//!    directly or beneath a leading `articles/` segment. These permanently
//!    redirect to the item's canonical URL.
//! 3. **Redirect table**: the path is a `from_path` in the redirect store.
//! 4. Otherwise, not found.
//!
//! Each step yields an explicit [`Outcome`]; errors are reserved for failures
//! reported by the stores.

use crate::content::{Content, ContentQuery, ContentStore, StoreError};
use crate::link;
use crate::matcher::{Mode, ParameterSet};
use crate::redirect::RedirectStore;
use crate::template::Permalink;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// The longest chain of revisions followed from a published item before the
/// chain is considered degenerate.
pub const MAX_REVISION_DEPTH: usize = 16;

/// The historical path prefix under which legacy-format URLs also live.
const LEGACY_PREFIX: &str = "articles/";

/// What to do with a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Serve the content in the given mode. The content's `password` is
    /// passed through for the renderer to act on.
    Found(Content, Mode),

    /// Redirect permanently to the given absolute URL.
    PermanentRedirect(String),

    NotFound,
}

impl Outcome {
    /// The HTTP status code for the outcome.
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Found(_, _) => 200,
            Outcome::PermanentRedirect(_) => 301,
            Outcome::NotFound => 404,
        }
    }

    /// The `Location` header for redirects.
    pub fn location(&self) -> Option<&str> {
        match self {
            Outcome::PermanentRedirect(url) => Some(url),
            _ => None,
        }
    }
}

/// Resolves request paths for one site. See the module documentation for the
/// steps.
pub struct Resolver<'a> {
    /// The site's currently configured permalink.
    pub permalink: &'a Permalink,

    /// The built-in default permalink (see
    /// [`crate::template::DEFAULT_FORMAT`]), honored as a legacy format.
    pub legacy: &'a Permalink,

    /// The site's base URL. Its path is the root path stripped from requests,
    /// and redirects are made absolute against it.
    pub base_url: &'a Url,

    pub content: &'a dyn ContentStore,

    pub redirects: &'a dyn RedirectStore,
}

enum Lookup {
    Missing,
    Published(Content, Vec<Content>),
}

impl Resolver<'_> {
    /// Resolves `raw_path`, which may include the site's root path, a query
    /// string, and percent-escapes.
    pub fn resolve(&self, raw_path: &str) -> Result<Outcome> {
        let path = link::normalize(raw_path, self.base_url);

        if let Some(outcome) = self.canonical_match(&path)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.legacy_match(&path)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.table_match(&path)? {
            return Ok(outcome);
        }

        debug!(path = %path, "no route");
        Ok(Outcome::NotFound)
    }

    fn canonical_match(&self, path: &str) -> Result<Option<Outcome>> {
        let found = match self.permalink.matcher.matches(path) {
            Some(found) => found,
            None => return Ok(None),
        };
        match self.lookup(&found.params)? {
            Lookup::Missing => Ok(None),
            Lookup::Published(item, candidates) => {
                match latest_revision(&item, &candidates) {
                    Some(latest) => {
                        debug!(
                            path,
                            id = latest.id,
                            mode = ?found.mode,
                            "canonical match"
                        );
                        Ok(Some(Outcome::Found(latest.clone(), found.mode)))
                    }
                    None => Ok(Some(Outcome::NotFound)),
                }
            }
        }
    }

    fn legacy_match(&self, path: &str) -> Result<Option<Outcome>> {
        let mut candidates = Vec::with_capacity(2);
        // Matching the legacy format directly only adds anything when it
        // differs from the current one.
        if self.legacy.template != self.permalink.template {
            candidates.push(path);
        }
        if let Some(stripped) = path.strip_prefix(LEGACY_PREFIX) {
            candidates.push(stripped);
        }

        for candidate in candidates {
            let found = match self.legacy.matcher.matches(candidate) {
                Some(found) => found,
                None => continue,
            };
            if let Lookup::Published(item, _) = self.lookup(&found.params)? {
                let canonical = format!(
                    "{}{}",
                    self.permalink.template.generate(&item),
                    found.mode.suffix()
                );
                let url = link::absolute(self.base_url, &canonical);
                debug!(path, id = item.id, location = %url, "legacy match");
                return Ok(Some(Outcome::PermanentRedirect(url.to_string())));
            }
        }
        Ok(None)
    }

    fn table_match(&self, path: &str) -> Result<Option<Outcome>> {
        let record = match self
            .redirects
            .find_by_from_path(path)
            .map_err(Error::Store)?
        {
            Some(record) => record,
            None => return Ok(None),
        };
        let target = link::redirect_target(self.base_url, &record.to_path);
        debug!(path, location = %target, "redirect table match");
        Ok(Some(Outcome::PermanentRedirect(target)))
    }

    // Finds the first published item for the matched parameters, along with
    // every candidate the store returned (which include its revisions).
    fn lookup(&self, params: &ParameterSet) -> Result<Lookup> {
        let query = match ContentQuery::from_params(params) {
            Some(query) => query,
            None => return Ok(Lookup::Missing),
        };
        let candidates = self
            .content
            .find_by_slug_and_date(&query)
            .map_err(Error::Store)?;
        Ok(match candidates.iter().find(|c| c.published) {
            Some(item) => Lookup::Published(item.clone(), candidates),
            None => Lookup::Missing,
        })
    }
}

/// Follows revisions of `item` (candidates whose `parent_id` points back along
/// the chain) to the newest one, preferring the greatest ID when an item has
/// several revisions. Returns `None`, after logging a warning, if the chain
/// loops or is longer than [`MAX_REVISION_DEPTH`].
pub fn latest_revision<'a>(
    item: &'a Content,
    candidates: &'a [Content],
) -> Option<&'a Content> {
    let revision_of = |parent: &Content| {
        candidates
            .iter()
            .filter(|c| c.parent_id == Some(parent.id))
            .max_by_key(|c| c.id)
    };

    let mut visited = HashSet::new();
    visited.insert(item.id);
    let mut current = item;
    for _ in 0..MAX_REVISION_DEPTH {
        match revision_of(current) {
            None => return Some(current),
            Some(next) => {
                if !visited.insert(next.id) {
                    warn!(id = item.id, revision = next.id, "revision chain loops");
                    return None;
                }
                current = next;
            }
        }
    }

    match revision_of(current) {
        None => Some(current),
        Some(_) => {
            warn!(
                id = item.id,
                max_depth = MAX_REVISION_DEPTH,
                "revision chain too deep"
            );
            None
        }
    }
}

/// Resolves `raw_path` in one call. See [`Resolver`] for the arguments.
pub fn resolve(
    raw_path: &str,
    permalink: &Permalink,
    legacy: &Permalink,
    content: &dyn ContentStore,
    redirects: &dyn RedirectStore,
    base_url: &Url,
) -> Result<Outcome> {
    Resolver {
        permalink,
        legacy,
        base_url,
        content,
        redirects,
    }
    .resolve(raw_path)
}

/// The result of resolving a path.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure while resolving a path. Only the store collaborators
/// can fail; not matching is an [`Outcome`], not an error.
#[derive(Debug)]
pub enum Error {
    /// Returned when a content or redirect store reports an error.
    Store(StoreError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "querying store: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(&**err),
        }
    }
}

impl From<StoreError> for Error {
    /// Converts a [`StoreError`] into an [`Error`]. It allows us to use the
    /// `?` operator on store calls.
    fn from(err: StoreError) -> Error {
        Error::Store(err)
    }
}

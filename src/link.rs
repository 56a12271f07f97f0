//! Helpers for moving between request paths and absolute URLs under a site's
//! base URL. The "root path" is the path portion of the base URL (e.g.,
//! `/blog` for `https://example.org/blog/`); requests are matched relative to
//! it and redirects are issued beneath it.

use std::borrow::Cow;
use url::{ParseError, Url};

/// Returns the site's root path without leading or trailing slashes, e.g.,
/// `blog` for `https://example.org/blog/` and the empty string for
/// `https://example.org`.
pub fn root_path(base_url: &Url) -> &str {
    base_url.path().trim_matches('/')
}

/// Collapses runs of slashes into a single slash.
pub fn collapse_slashes(path: &str) -> Cow<'_, str> {
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Converts an incoming request path into the candidate string matched
/// against permalink templates:
///
/// 1. the query string and fragment are dropped;
/// 2. slashes are collapsed and leading slashes removed;
/// 3. the root path is removed if it's a leading segment of the path;
/// 4. percent-escapes are decoded exactly once.
///
/// A raw UTF-8 slug and its percent-escaped form normalize to the same
/// string. If decoding yields invalid UTF-8, the path is left encoded.
pub fn normalize(raw_path: &str, base_url: &Url) -> String {
    normalize_under(raw_path, root_path(base_url))
}

/// Like [`normalize`] but with the root path given directly (without
/// surrounding slashes). An empty root strips nothing.
pub fn normalize_under(raw_path: &str, root: &str) -> String {
    let path = raw_path
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let path = collapse_slashes(path);
    let mut path: &str = path.trim_start_matches('/');

    if !root.is_empty() {
        if path == root {
            path = "";
        } else if path.starts_with(root) && path[root.len()..].starts_with('/') {
            path = &path[root.len() + 1..];
        }
    }

    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(path, error = %e, "path isn't valid UTF-8 once decoded");
            path.to_owned()
        }
    }
}

/// Returns the absolute URL for a site-relative `path` (as produced by
/// [`crate::template::Template::generate`]). Non-ASCII characters and any
/// `?` or `#` in the path are percent-escaped.
pub fn absolute(base_url: &Url, path: &str) -> Url {
    let mut url = base_url.clone();
    let base_path = base_url.path();
    let joined = if base_path.ends_with('/') {
        format!("{}{}", base_path, path.trim_start_matches('/'))
    } else {
        format!("{}/{}", base_path, path.trim_start_matches('/'))
    };
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Computes the `Location` for a stored redirect. A `to_path` with a URI
/// scheme (e.g., `https://elsewhere.org/x`) is returned verbatim. Anything
/// else is treated as root-relative: it's placed under the root path (unless
/// it already starts with it) and made absolute against the base URL.
pub fn redirect_target(base_url: &Url, to_path: &str) -> String {
    match Url::parse(to_path) {
        Err(ParseError::RelativeUrlWithoutBase) => {}
        _ => return to_path.to_owned(),
    }

    let (rest, fragment) = match to_path.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (to_path, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let root = root_path(base_url);
    let relative = path.trim_start_matches('/');
    let under_root = root.is_empty()
        || relative == root
        || (relative.starts_with(root) && relative[root.len()..].starts_with('/'));
    let full_path = if under_root {
        format!("/{}", relative)
    } else {
        format!("/{}/{}", root, relative)
    };

    let mut url = base_url.clone();
    url.set_path(&full_path);
    url.set_query(query);
    url.set_fragment(fragment);
    url.to_string()
}

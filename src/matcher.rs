//! Defines the [`Matcher`] type which recognizes paths produced by a
//! [`Template`] and extracts their [`ParameterSet`]. Matching also negotiates
//! feed suffixes: a trailing `.atom` or `.rss` selects an alternate [`Mode`].

use crate::template::{Placeholder, Segment, Template};
use regex::Regex;
use std::collections::BTreeMap;

/// The rendering mode requested by a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Html,
    Atom,
    Rss,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Html
    }
}

impl Mode {
    /// The path suffix which selects this mode. Empty for [`Mode::Html`].
    pub fn suffix(self) -> &'static str {
        match self {
            Mode::Html => "",
            Mode::Atom => ".atom",
            Mode::Rss => ".rss",
        }
    }
}

const FEED_MODES: [(&str, Mode); 2] = [(".atom", Mode::Atom), (".rss", Mode::Rss)];

/// The values extracted from a matched path, keyed by placeholder. Dates are
/// kept as the digit strings found in the path (e.g., `"04"`), not
/// normalized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSet(BTreeMap<Placeholder, String>);

impl ParameterSet {
    pub fn get(&self, kind: Placeholder) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    /// The extracted slug. Every compiled template has a `%title%`, so this
    /// is only empty for a default-constructed set.
    pub fn title(&self) -> &str {
        self.get(Placeholder::Title).unwrap_or_default()
    }

    pub fn insert(&mut self, kind: Placeholder, value: impl Into<String>) {
        self.0.insert(kind, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &str)> {
        self.0.iter().map(|(kind, value)| (*kind, value.as_str()))
    }
}

/// A successful match: the extracted parameters and the requested mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub params: ParameterSet,
    pub mode: Mode,
}

/// Recognizes the paths of a single [`Template`]. Matching is whole-string,
/// so a path which satisfies only a prefix of the template fails.
#[derive(Debug)]
pub struct Matcher {
    pattern: Regex,

    /// The placeholder for each capture group, in order.
    captures: Vec<Placeholder>,
}

impl Matcher {
    /// Builds the matcher for `template`. Literals must match exactly;
    /// `%year%`, `%month%`, and `%day%` match one or more ASCII digits;
    /// `%title%` lazily matches one or more characters other than `/`. When
    /// the literal following it starts with `.`, dots are excluded as well so
    /// that in `%title%.html` the slug can't swallow the `.html` (and
    /// `post.html.html` doesn't match). Any other neighbor is left to the
    /// whole-string anchoring, so slugs may contain `-` in `%title%-%year%`.
    pub fn build(template: &Template) -> Result<Matcher, regex::Error> {
        let segments = template.segments();
        let mut pattern = String::from("^");
        let mut captures = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Placeholder(Placeholder::Title) => {
                    let dotted = match segments.get(i + 1) {
                        Some(Segment::Literal(next)) => next.starts_with('.'),
                        _ => false,
                    };
                    pattern.push_str(if dotted { "([^/.]+?)" } else { "([^/]+?)" });
                    captures.push(Placeholder::Title);
                }
                Segment::Placeholder(kind) => {
                    pattern.push_str("([0-9]+)");
                    captures.push(*kind);
                }
            }
        }
        pattern.push('$');

        Ok(Matcher {
            pattern: Regex::new(&pattern)?,
            captures,
        })
    }

    /// Matches `path` (no leading slash, already percent-decoded). A trailing
    /// feed suffix is tried first: `post.html.atom` matches `%title%.html` in
    /// [`Mode::Atom`]. Returns `None` when nothing matches.
    pub fn matches(&self, path: &str) -> Option<Match> {
        for (suffix, mode) in FEED_MODES.iter() {
            if let Some(stripped) = strip_suffix(path, suffix) {
                if let Some(params) = self.capture(stripped) {
                    return Some(Match {
                        params,
                        mode: *mode,
                    });
                }
            }
        }

        self.capture(path).map(|params| Match {
            params,
            mode: Mode::Html,
        })
    }

    fn capture(&self, path: &str) -> Option<ParameterSet> {
        let found = self.pattern.captures(path)?;
        let mut params = ParameterSet::default();
        for (i, kind) in self.captures.iter().enumerate() {
            params.insert(*kind, found.get(i + 1)?.as_str());
        }
        Some(params)
    }
}

fn strip_suffix<'a>(path: &'a str, suffix: &str) -> Option<&'a str> {
    if path.len() > suffix.len() && path.ends_with(suffix) {
        Some(&path[..path.len() - suffix.len()])
    } else {
        None
    }
}

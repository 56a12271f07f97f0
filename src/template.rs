//! Defines the [`Template`] type, the compiled form of a site's permalink
//! format (e.g., `/%year%/%month%/%title%.html`), along with the logic for
//! compiling format strings ([`Template::compile`]) and for generating
//! canonical paths from [`Content`] ([`Template::generate`]). A [`Permalink`]
//! bundles a template with the [`Matcher`] derived from it.

use crate::content::Content;
use crate::link::collapse_slashes;
use crate::matcher::Matcher;
use chrono::Datelike;
use std::fmt;

/// The format used by sites which never configured one. Paths in this shape
/// are also honored as legacy URLs after a site switches to another format.
pub const DEFAULT_FORMAT: &str = "/%year%/%month%/%day%/%title%";

/// Feed suffixes which a format may not end with, since they're reserved for
/// selecting an alternate rendering of a post.
pub const FEED_SUFFIXES: [&str; 2] = [".atom", ".rss"];

/// The kinds of placeholders recognized in a permalink format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Year,
    Month,
    Day,
    Title,
}

impl Placeholder {
    /// Looks up the placeholder for a token name, i.e., the text between the
    /// `%` delimiters. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Placeholder> {
        match name {
            "year" => Some(Placeholder::Year),
            "month" => Some(Placeholder::Month),
            "day" => Some(Placeholder::Day),
            "title" => Some(Placeholder::Title),
            _ => None,
        }
    }

    /// The token name for the placeholder.
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Year => "year",
            Placeholder::Month => "month",
            Placeholder::Day => "day",
            Placeholder::Title => "title",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}%", self.name())
    }
}

/// A unit of a [`Template`]: either fixed text or a placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// The compiled representation of a permalink format. Templates are
/// immutable and carry no identity beyond their source string, so they can be
/// shared freely between requests (see [`crate::cache::PermalinkCache`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    format: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compiles a permalink format. Leading slashes are dropped and runs of
    /// slashes are collapsed. Only `%year%`, `%month%`, `%day%`, and `%title%`
    /// are placeholders; any other `%...%` text is kept as literal text.
    ///
    /// Fails if the format has no `%title%`, repeats a placeholder, or ends in
    /// one of the [`FEED_SUFFIXES`].
    pub fn compile(format: &str) -> Result<Template> {
        let segments =
            tokenize(collapse_slashes(format).trim_start_matches('/'));

        let mut seen: Vec<Placeholder> = Vec::with_capacity(4);
        for segment in &segments {
            if let Segment::Placeholder(kind) = segment {
                if seen.contains(kind) {
                    return Err(CompileError::RepeatedPlaceholder(*kind));
                }
                seen.push(*kind);
            }
        }
        if !seen.contains(&Placeholder::Title) {
            return Err(CompileError::MissingTitlePlaceholder);
        }

        if let Some(Segment::Literal(tail)) = segments.last() {
            if FEED_SUFFIXES.iter().any(|suffix| tail.ends_with(suffix)) {
                return Err(CompileError::ReservedFeedSuffix);
            }
        }

        Ok(Template {
            format: format.to_owned(),
            segments,
        })
    }

    /// The format string this template was compiled from.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the template contains the placeholder.
    pub fn has(&self, kind: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(k) if *k == kind))
    }

    /// Renders the canonical path for `content`, without a leading slash.
    /// Dates are rendered as unpadded integers, so a post published on
    /// 2004-04-01 under the default format lives at `2004/4/1/{permalink}`.
    pub fn generate(&self, content: &Content) -> String {
        let date = content.published_at.date();
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder(Placeholder::Year) => {
                    path.push_str(&date.year().to_string())
                }
                Segment::Placeholder(Placeholder::Month) => {
                    path.push_str(&date.month().to_string())
                }
                Segment::Placeholder(Placeholder::Day) => {
                    path.push_str(&date.day().to_string())
                }
                Segment::Placeholder(Placeholder::Title) => {
                    path.push_str(&content.permalink)
                }
            }
        }
        path
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.format)
    }
}

fn tokenize(format: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = format;

    while let Some(open) = rest.find('%') {
        literal.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('%') {
            None => {
                // A lone `%` with no closing delimiter.
                literal.push_str(&rest[open..]);
                rest = "";
            }
            Some(close) => match Placeholder::from_name(&after_open[..close]) {
                Some(kind) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(
                            &mut literal,
                        )));
                    }
                    segments.push(Segment::Placeholder(kind));
                    rest = &after_open[close + 1..];
                }
                None => {
                    // Keep the opening `%` and the unknown name as text, but
                    // resume at the closing `%` since it may open a real token.
                    literal.push('%');
                    literal.push_str(&after_open[..close]);
                    rest = &after_open[close..];
                }
            },
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// A [`Template`] together with its [`Matcher`]. This is the unit stored in
/// the [`crate::cache::PermalinkCache`] since building the matcher is the
/// expensive part of compilation.
#[derive(Debug)]
pub struct Permalink {
    pub template: Template,
    pub matcher: Matcher,
}

impl Permalink {
    /// Compiles `format` into a [`Template`] and builds its [`Matcher`].
    pub fn compile(format: &str) -> Result<Permalink> {
        let template = Template::compile(format)?;
        let matcher = Matcher::build(&template)?;
        Ok(Permalink { template, matcher })
    }

    /// Compiles [`DEFAULT_FORMAT`].
    pub fn legacy() -> Result<Permalink> {
        Permalink::compile(DEFAULT_FORMAT)
    }
}

/// The result of compiling a permalink format.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Represents a rejected permalink format. These are surfaced to
/// administrators when they save a new format; live requests only ever see
/// formats which have already compiled.
#[derive(Debug)]
pub enum CompileError {
    /// Returned when the format has no `%title%` placeholder.
    MissingTitlePlaceholder,

    /// Returned when a placeholder appears more than once.
    RepeatedPlaceholder(Placeholder),

    /// Returned when the format ends in `.atom` or `.rss`, which would make
    /// post URLs indistinguishable from their feeds.
    ReservedFeedSuffix,

    /// Returned when the matcher's pattern can't be built (e.g., it exceeds
    /// the regex size limit).
    Pattern(regex::Error),
}

impl fmt::Display for CompileError {
    /// Displays a [`CompileError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::MissingTitlePlaceholder => {
                write!(f, "permalink format must contain `%title%`")
            }
            CompileError::RepeatedPlaceholder(kind) => {
                write!(f, "permalink format repeats `{}`", kind)
            }
            CompileError::ReservedFeedSuffix => write!(
                f,
                "permalink format can't end in `.atom` or `.rss`"
            ),
            CompileError::Pattern(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {
    /// Implements the [`std::error::Error`] trait for [`CompileError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<regex::Error> for CompileError {
    /// Converts a [`regex::Error`] into a [`CompileError`]. It allows us to use
    /// the `?` operator when building matchers.
    fn from(err: regex::Error) -> CompileError {
        CompileError::Pattern(err)
    }
}

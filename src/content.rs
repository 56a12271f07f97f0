//! Defines the [`Content`] type and the [`ContentStore`] interface through
//! which the resolver finds content by slug and date. Content is owned by the
//! caller; this crate only reads it. [`MemoryStore`] is a simple store backed
//! by a `Vec`, useful for small sites and for tests.

use crate::matcher::ParameterSet;
use crate::template::Placeholder;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The error type returned by store collaborators. The resolver passes these
/// through untouched.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A published item (or a revision of one).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: u64,

    pub title: String,

    /// The slug substituted for `%title%`. May contain non-ASCII text; it is
    /// stored decoded, never percent-escaped.
    #[serde(default)]
    pub permalink: String,

    #[serde(default = "published_by_default")]
    pub published: bool,

    pub published_at: NaiveDateTime,

    /// Set on an unpublished revision to the ID of the item it supersedes.
    #[serde(default)]
    pub parent_id: Option<u64>,

    /// Passed through to the renderer, which is responsible for prompting.
    #[serde(default)]
    pub password: Option<String>,
}

fn published_by_default() -> bool {
    true
}

impl Content {
    /// Creates a published item whose permalink is derived from its title.
    pub fn new(id: u64, title: &str, published_at: NaiveDateTime) -> Content {
        Content {
            id,
            title: title.to_owned(),
            permalink: permalink_for(title),
            published: true,
            published_at,
            parent_id: None,
            password: None,
        }
    }

    /// Creates an unpublished revision of `self` with the given ID. The
    /// revision keeps the slug and date so that it's found by the same
    /// queries as the item it supersedes.
    pub fn revise(&self, id: u64) -> Content {
        Content {
            id,
            published: false,
            parent_id: Some(self.id),
            ..self.clone()
        }
    }
}

/// Derives a permalink slug from a title, e.g., `Hello, World!` becomes
/// `hello-world`.
pub fn permalink_for(title: &str) -> String {
    slug::slugify(title)
}

/// A lookup by slug and whichever date components a permalink format
/// provides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentQuery {
    pub title: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ContentQuery {
    /// Builds a query from matched parameters. Returns `None` when a date
    /// component doesn't fit in an integer, since no content can have that
    /// date.
    pub fn from_params(params: &ParameterSet) -> Option<ContentQuery> {
        Some(ContentQuery {
            title: params.title().to_owned(),
            year: parse_component(params, Placeholder::Year)?,
            month: parse_component(params, Placeholder::Month)?,
            day: parse_component(params, Placeholder::Day)?,
        })
    }

    /// Returns `true` if `content` has the queried slug and agrees with every
    /// supplied date component. Publication state isn't considered.
    pub fn accepts(&self, content: &Content) -> bool {
        let date = content.published_at.date();
        content.permalink == self.title
            && self.year.map_or(true, |y| y == date.year())
            && self.month.map_or(true, |m| m == date.month())
            && self.day.map_or(true, |d| d == date.day())
    }
}

// Absent components are `Some(None)`; unparseable ones are `None`.
fn parse_component<T: std::str::FromStr>(
    params: &ParameterSet,
    kind: Placeholder,
) -> Option<Option<T>> {
    match params.get(kind) {
        None => Some(None),
        Some(digits) => digits.parse().ok().map(Some),
    }
}

/// The read interface the resolver needs from the content collaborator.
pub trait ContentStore {
    /// Returns every item, published or not, whose permalink equals
    /// `query.title` and whose publication date agrees with each date
    /// component in the query. Unpublished revisions must be included so the
    /// resolver can find the newest revision of a published item.
    fn find_by_slug_and_date(
        &self,
        query: &ContentQuery,
    ) -> Result<Vec<Content>, StoreError>;
}

/// A [`ContentStore`] over an in-memory list.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    contents: Vec<Content>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Loads a store from a YAML list of [`Content`] items. Items without a
    /// permalink get one from their title.
    pub fn from_yaml(input: &str) -> Result<MemoryStore, serde_yaml::Error> {
        let contents: Vec<Content> = serde_yaml::from_str(input)?;
        let mut store = MemoryStore::new();
        for content in contents {
            store.insert(content);
        }
        Ok(store)
    }

    /// Adds an item. An ID of `0` is replaced with the next free ID and a
    /// blank permalink is derived from the title.
    pub fn insert(&mut self, mut content: Content) -> &Content {
        if content.id == 0 {
            content.id = self.contents.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        }
        if content.permalink.is_empty() {
            content.permalink = permalink_for(&content.title);
        }
        self.contents.push(content);
        &self.contents[self.contents.len() - 1]
    }

    pub fn get(&self, id: u64) -> Option<&Content> {
        self.contents.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn find_by_slug_and_date(
        &self,
        query: &ContentQuery,
    ) -> Result<Vec<Content>, StoreError> {
        Ok(self
            .contents
            .iter()
            .filter(|c| query.accepts(c))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_derives_permalink() {
        let content = Content::new(1, "Second Blog Article", date(2004, 4, 1));
        assert_eq!("second-blog-article", content.permalink);
        assert!(content.published);
    }

    #[test]
    fn test_revise() {
        let content = Content::new(1, "Original", date(2004, 4, 1));
        let revision = content.revise(2);
        assert_eq!(Some(1), revision.parent_id);
        assert!(!revision.published);
        assert_eq!(content.permalink, revision.permalink);
        assert_eq!(content.published_at, revision.published_at);
    }

    #[test]
    fn test_query_from_padded_params() {
        let mut params = ParameterSet::default();
        params.insert(Placeholder::Year, "2004");
        params.insert(Placeholder::Month, "04");
        params.insert(Placeholder::Day, "01");
        params.insert(Placeholder::Title, "slug");
        assert_eq!(
            Some(ContentQuery {
                title: "slug".to_owned(),
                year: Some(2004),
                month: Some(4),
                day: Some(1),
            }),
            ContentQuery::from_params(&params)
        );
    }

    #[test]
    fn test_query_from_overflowing_params() {
        let mut params = ParameterSet::default();
        params.insert(Placeholder::Year, "99999999999999999999");
        params.insert(Placeholder::Title, "slug");
        assert_eq!(None, ContentQuery::from_params(&params));
    }

    #[test]
    fn test_query_accepts_partial_dates() {
        let content = Content::new(1, "Slug", date(2004, 4, 1));
        let mut query = ContentQuery {
            title: "slug".to_owned(),
            year: None,
            month: None,
            day: None,
        };
        assert!(query.accepts(&content));
        query.month = Some(4);
        assert!(query.accepts(&content));
        query.day = Some(2);
        assert!(!query.accepts(&content));
    }

    #[test]
    fn test_memory_store_insert_assigns_id_and_permalink() {
        let mut store = MemoryStore::new();
        store.insert(Content::new(4, "First", date(2004, 4, 1)));
        let mut untitled = Content::new(0, "Hello, World!", date(2004, 4, 2));
        untitled.permalink = String::new();
        let inserted = store.insert(untitled);
        assert_eq!(5, inserted.id);
        assert_eq!("hello-world", inserted.permalink);
        assert_eq!(2, store.len());
    }

    #[test]
    fn test_memory_store_from_yaml() -> Result<(), StoreError> {
        let store = MemoryStore::from_yaml(
            r#"
- id: 1
  title: Second Blog Article
  published_at: "2004-04-01T12:00:00"
- id: 2
  title: Second Blog Article
  published: false
  parent_id: 1
  published_at: "2004-04-01T12:00:00"
  password: secret
"#,
        )?;
        let found = store.find_by_slug_and_date(&ContentQuery {
            title: "second-blog-article".to_owned(),
            year: Some(2004),
            month: Some(4),
            day: Some(1),
        })?;
        assert_eq!(2, found.len());
        assert_eq!(Some(1), found[1].parent_id);
        assert_eq!(Some("secret".to_owned()), found[1].password);
        Ok(())
    }
}

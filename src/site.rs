//! Exports [`Site`], which stitches together the site's [`Config`], the
//! [`PermalinkCache`], and the resolution pipeline ([`crate::resolve`]). This
//! is the entry point for a web front end: it hands each request path to
//! [`Site::resolve`] and asks [`Site::url_for`] when linking to content.

use crate::cache::PermalinkCache;
use crate::config::{self, Config};
use crate::content::{Content, ContentStore};
use crate::link;
use crate::redirect::RedirectStore;
use crate::resolve::{self, Outcome, Resolver};
use crate::template::{self, CompileError, Permalink};
use arc_swap::ArcSwap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// A site's routing state. Safe to share between request handlers; saving a
/// new permalink format swaps the configuration atomically.
#[derive(Debug)]
pub struct Site {
    config: ArcSwap<Config>,
    cache: PermalinkCache,
}

impl Site {
    pub fn new(config: Config) -> Site {
        Site {
            config: ArcSwap::from_pointee(config),
            cache: PermalinkCache::new(),
        }
    }

    /// Loads the site configuration found in `dir` or its ancestors. See
    /// [`Config::from_directory`].
    pub fn from_directory(dir: &Path) -> config::Result<Site> {
        Ok(Site::new(Config::from_directory(dir)?))
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// The compiled permalink for the current format.
    pub fn permalink(&self) -> template::Result<Arc<Permalink>> {
        self.cache.get(&self.config.load().permalink_format)
    }

    /// Validates and saves a new permalink format. On failure the current
    /// format stays in place and the error is suitable for showing to the
    /// administrator.
    pub fn save_permalink_format(&self, format: &str) -> template::Result<()> {
        Permalink::compile(format)?;
        self.cache.rebuild();
        self.config.rcu(|current| {
            let mut config = Config::clone(current);
            config.permalink_format = format.to_owned();
            config
        });
        info!(format, "saved permalink format");
        Ok(())
    }

    /// The canonical URL for `content` under the current format.
    pub fn url_for(&self, content: &Content) -> template::Result<Url> {
        let config = self.config.load();
        let permalink = self.cache.get(&config.permalink_format)?;
        Ok(link::absolute(
            &config.base_url,
            &permalink.template.generate(content),
        ))
    }

    /// Resolves a request path. See [`crate::resolve`].
    pub fn resolve(
        &self,
        raw_path: &str,
        content: &dyn ContentStore,
        redirects: &dyn RedirectStore,
    ) -> Result<Outcome> {
        let config = self.config.load_full();
        let permalink = self.cache.get(&config.permalink_format)?;
        let legacy = self.cache.legacy()?;
        let resolver = Resolver {
            permalink: &permalink,
            legacy: &legacy,
            base_url: &config.base_url,
            content,
            redirects,
        };
        Ok(resolver.resolve(raw_path)?)
    }
}

/// The result of resolving a request through a [`Site`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error resolving a request through a [`Site`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a cached permalink couldn't be compiled. Saved formats
    /// have already compiled once, so in practice this is unreachable.
    Compile(CompileError),

    /// Returned when a store collaborator fails.
    Resolve(resolve::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Compile(err) => write!(f, "{}", err),
            Error::Resolve(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compile(err) => Some(err),
            Error::Resolve(err) => Some(err),
        }
    }
}

impl From<CompileError> for Error {
    /// Converts a [`CompileError`] into an [`Error`]. This allows us to use
    /// the `?` operator on cache lookups.
    fn from(err: CompileError) -> Error {
        Error::Compile(err)
    }
}

impl From<resolve::Error> for Error {
    /// Converts a [`resolve::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator when resolving.
    fn from(err: resolve::Error) -> Error {
        Error::Resolve(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::MemoryStore;
    use crate::matcher::Mode;
    use crate::redirect::{MemoryRedirects, RedirectRecord};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn fixture() -> std::result::Result<(Site, MemoryStore, MemoryRedirects), Box<dyn std::error::Error>> {
        let site = Site::from_directory(Path::new("./testdata/site/nested"))?;
        let content = MemoryStore::from_yaml(&std::fs::read_to_string(
            "./testdata/site/nested/posts.yaml",
        )?)?;
        let mut redirects = MemoryRedirects::new();
        redirects.insert(RedirectRecord::new("about", "/pages/about"))?;
        Ok((site, content, redirects))
    }

    #[test]
    fn test_resolve_canonical() -> TestResult {
        let (site, content, redirects) = fixture()?;
        match site.resolve("/blog/2004/4/second-blog-article.html", &content, &redirects)? {
            Outcome::Found(found, Mode::Html) => assert_eq!(1, found.id),
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
        Ok(())
    }

    #[test]
    fn test_resolve_legacy_and_table() -> TestResult {
        let (site, content, redirects) = fixture()?;
        assert_eq!(
            Outcome::PermanentRedirect(
                "https://example.org/blog/2004/4/second-blog-article.html".to_owned()
            ),
            site.resolve("/blog/2004/04/01/second-blog-article", &content, &redirects)?
        );
        assert_eq!(
            Outcome::PermanentRedirect("https://example.org/blog/pages/about".to_owned()),
            site.resolve("/blog/about", &content, &redirects)?
        );
        Ok(())
    }

    #[test]
    fn test_save_permalink_format() -> TestResult {
        let (site, content, redirects) = fixture()?;
        let post = content.get(1).unwrap().clone();
        let held = site.permalink()?;

        site.save_permalink_format("/%title%/")?;
        assert_eq!("/%title%/", site.config().permalink_format);
        assert_eq!(
            "https://example.org/blog/second-blog-article/",
            site.url_for(&post)?.as_str()
        );
        // Permalinks handed out before the change still work.
        assert!(held.matcher.matches("2004/4/second-blog-article.html").is_some());

        // Legacy URLs now redirect to the new canonical URL.
        assert_eq!(
            Outcome::PermanentRedirect(
                "https://example.org/blog/second-blog-article/".to_owned()
            ),
            site.resolve("/blog/articles/2004/4/1/second-blog-article", &content, &redirects)?
        );
        Ok(())
    }

    #[test]
    fn test_save_permalink_format_rejects_invalid() -> TestResult {
        let (site, _, _) = fixture()?;
        assert!(matches!(
            site.save_permalink_format("/%year%/%month%/"),
            Err(CompileError::MissingTitlePlaceholder)
        ));
        assert!(matches!(
            site.save_permalink_format("/%title%.atom"),
            Err(CompileError::ReservedFeedSuffix)
        ));
        assert_eq!("/%year%/%month%/%title%.html", site.config().permalink_format);
        Ok(())
    }
}

//! Site configuration. A site is described by a `site.yaml` file:
//!
//! ```yaml
//! base_url: https://example.org/blog/
//! permalink_format: /%year%/%month%/%title%.html
//! ```
//!
//! `permalink_format` is optional and defaults to
//! [`crate::template::DEFAULT_FORMAT`]. The format is compiled when the
//! configuration is loaded so that a bad format is reported up front rather
//! than on the first request.

use crate::template::{CompileError, Template, DEFAULT_FORMAT};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the configuration file searched for by
/// [`Config::from_directory`].
pub const CONFIG_FILE_NAME: &str = "site.yaml";

#[derive(Deserialize)]
struct Project {
    base_url: Url,

    #[serde(default = "default_format")]
    permalink_format: String,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_owned()
}

/// Validated site configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The URL of the site's root. Its path always ends in a slash, so joining
    /// a relative path onto it appends rather than replaces the last segment.
    pub base_url: Url,

    /// The permalink format. Always compiles.
    pub permalink_format: String,
}

impl Config {
    /// Builds a configuration, rejecting formats which don't compile.
    pub fn new(mut base_url: Url, permalink_format: &str) -> Result<Config> {
        Template::compile(permalink_format)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Config {
            base_url,
            permalink_format: permalink_format.to_owned(),
        })
    }

    /// Parses a configuration from the contents of a `site.yaml` file.
    pub fn from_yaml(input: &str) -> Result<Config> {
        let project: Project = serde_yaml::from_str(input)?;
        Config::new(project.base_url, &project.permalink_format)
    }

    /// Looks for [`CONFIG_FILE_NAME`] in `dir` and then in each of its
    /// ancestors, loading the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Config::from_project_file(&path);
        }
        match dir.parent() {
            Some(parent) => Config::from_directory(parent),
            None => Err(Error::NotFound),
        }
    }

    /// Loads the configuration from the file at `path`.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let load = || -> Result<Config> {
            let project: Project = serde_yaml::from_reader(File::open(path)?)?;
            Config::new(project.base_url, &project.permalink_format)
        };
        load().map_err(|e| Error::Annotated(path.to_owned(), Box::new(e)))
    }
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when no configuration file exists in the directory or any
    /// of its ancestors.
    NotFound,

    /// Returned when the configured permalink format doesn't compile.
    Compile(CompileError),

    /// Returned when there was an error parsing the file as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned for I/O errors reading the file.
    Io(std::io::Error),

    /// An error annotated with the file it came from.
    Annotated(PathBuf, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound => write!(
                f,
                "could not find `{}` in any parent directory",
                CONFIG_FILE_NAME
            ),
            Error::Compile(err) => write!(f, "{}", err),
            Error::DeserializeYaml(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
            Error::Annotated(path, err) => {
                write!(f, "loading `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound => None,
            Error::Compile(err) => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<CompileError> for Error {
    /// Converts a [`CompileError`] into an [`Error`]. It allows us to use the
    /// `?` operator when validating the permalink format.
    fn from(err: CompileError) -> Error {
        Error::Compile(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_yaml_defaults_format() -> Result<()> {
        let config = Config::from_yaml("base_url: http://myblog.net")?;
        assert_eq!(DEFAULT_FORMAT, config.permalink_format);
        assert_eq!("http://myblog.net/", config.base_url.as_str());
        Ok(())
    }

    #[test]
    fn test_from_yaml_adds_trailing_slash() -> Result<()> {
        let config = Config::from_yaml(
            "base_url: http://myblog.net/blog\npermalink_format: /%title%.html",
        )?;
        assert_eq!("http://myblog.net/blog/", config.base_url.as_str());
        assert_eq!("/%title%.html", config.permalink_format);
        Ok(())
    }

    #[test]
    fn test_from_yaml_rejects_bad_format() {
        assert!(matches!(
            Config::from_yaml(
                "base_url: http://myblog.net\npermalink_format: /%title%.rss"
            ),
            Err(Error::Compile(CompileError::ReservedFeedSuffix))
        ));
    }

    #[test]
    fn test_from_yaml_requires_base_url() {
        assert!(matches!(
            Config::from_yaml("permalink_format: /%title%"),
            Err(Error::DeserializeYaml(_))
        ));
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let config = Config::from_directory(Path::new("./testdata/site/nested"))?;
        assert_eq!("https://example.org/blog/", config.base_url.as_str());
        assert_eq!("/%year%/%month%/%title%.html", config.permalink_format);
        Ok(())
    }

    #[test]
    fn test_from_project_file_annotates_errors() {
        match Config::from_project_file(Path::new("./testdata/invalid/site.yaml")) {
            Err(Error::Annotated(path, err)) => {
                assert_eq!(Path::new("./testdata/invalid/site.yaml"), path);
                assert!(matches!(
                    *err,
                    Error::Compile(CompileError::MissingTitlePlaceholder)
                ));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}

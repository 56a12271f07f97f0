//! The library code for `permaroute`, which maps a blog's request paths to
//! content under a configurable permalink scheme while keeping old URLs
//! working. The architecture can be broken down into two steps:
//!
//! 1. Compiling the site's permalink format ([`crate::template`]) into a
//!    path generator and a path matcher ([`crate::matcher`])
//! 2. Resolving request paths against the compiled permalink
//!    ([`crate::resolve`])
//!
//! Of the two, the second step is the more involved. A path is tried against
//! three sources in turn:
//!
//! 1. The current format, which serves the content (or its newest revision)
//! 2. The built-in default format, optionally beneath `articles/`, which
//!    redirects to the content's current URL
//! 3. The redirect table, which redirects to whatever was stored
//!
//! Content and redirects live with the caller and are read through the
//! [`crate::content::ContentStore`] and [`crate::redirect::RedirectStore`]
//! traits. [`crate::site::Site`] bundles the configuration, a cache of compiled
//! permalinks, and the resolver for use by a web front end.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod cache;
pub mod config;
pub mod content;
pub mod link;
pub mod matcher;
pub mod redirect;
pub mod resolve;
pub mod site;
pub mod template;

pub use resolve::Outcome;
pub use site::Site;

//! Named extension slots for customizing syndication
//!
//! Each slot holds an ordered chain of transformers. The built-in value is
//! computed first and then handed to every registered transformer in
//! registration order; each one may return it unchanged, tweak it, or replace
//! it outright. Every transformer also sees the post being syndicated.
//!
//! # Example
//!
//! ```
//! use libsyndicast::Hooks;
//!
//! let mut hooks = Hooks::new();
//! hooks
//!     .post_types(|mut types, _post| {
//!         types.push("note".to_string());
//!         types
//!     })
//!     .record_text(|_, post| format!("New on the blog: {} {}", post.title, post.permalink));
//! ```

use crate::record::Facet;
use crate::types::PostSnapshot;

type Transformer<T> = Box<dyn Fn(T, &PostSnapshot) -> T + Send + Sync>;

/// Ordered list of transformers for one slot
pub struct FilterChain<T> {
    transformers: Vec<Transformer<T>>,
}

impl<T> Default for FilterChain<T> {
    fn default() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }
}

impl<T> FilterChain<T> {
    pub fn add<F>(&mut self, transformer: F)
    where
        F: Fn(T, &PostSnapshot) -> T + Send + Sync + 'static,
    {
        self.transformers.push(Box::new(transformer));
    }

    /// Run `value` through every transformer in order
    pub fn apply(&self, value: T, post: &PostSnapshot) -> T {
        self.transformers
            .iter()
            .fold(value, |acc, transformer| transformer(acc, post))
    }
}

/// All extension slots
#[derive(Default)]
pub struct Hooks {
    pub(crate) post_types: FilterChain<Vec<String>>,
    pub(crate) record_type: FilterChain<String>,
    pub(crate) record_text: FilterChain<String>,
    pub(crate) record_facets: FilterChain<Vec<Facet>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter the allow-list of post types that may be syndicated
    pub fn post_types<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Vec<String>, &PostSnapshot) -> Vec<String> + Send + Sync + 'static,
    {
        self.post_types.add(f);
        self
    }

    /// Filter the record's `$type`
    pub fn record_type<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String, &PostSnapshot) -> String + Send + Sync + 'static,
    {
        self.record_type.add(f);
        self
    }

    /// Filter the record's text. Runs before the facets are computed.
    pub fn record_text<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String, &PostSnapshot) -> String + Send + Sync + 'static,
    {
        self.record_text.add(f);
        self
    }

    /// Filter the record's facet list
    pub fn record_facets<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Vec<Facet>, &PostSnapshot) -> Vec<Facet> + Send + Sync + 'static,
    {
        self.record_facets.add(f);
        self
    }

    /// Allow-list for `post` after the post-types chain
    pub fn allowed_post_types(&self, base: &[String], post: &PostSnapshot) -> Vec<String> {
        self.post_types.apply(base.to_vec(), post)
    }
}

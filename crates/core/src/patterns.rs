//! Pattern resolution.
//!
//! A [`PatternTable`] maps dependency identifiers to the base-name patterns
//! of the artifacts actually needed from them. Identifiers without an entry
//! resolve to the wildcard set, so every artifact is staged.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::{Error, Result};

/// The fallback pattern used when a dependency has no override.
pub const WILDCARD: &str = "*";

/// Boost components linked by the wrapped library.
const BOOST_COMPONENTS: &[&str] = &[
    "boost_atomic*",
    "boost_chrono*",
    "boost_container*",
    "boost_context*",
    "boost_date_time*",
    "boost_filesystem*",
    "boost_locale*",
    "boost_log*",
    "boost_log_setup*",
    "boost_program_options*",
    "boost_random*",
    "boost_regex*",
    "boost_serialization*",
    "boost_system*",
    "boost_thread*",
];

const THRIFT_LIBRARIES: &[&str] = &["thrift", "thriftd"];

/// Ordered, non-empty list of base-name glob patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet(Arc<[String]>);

impl PatternSet {
    /// The single-element `["*"]` set.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(Arc::from(vec![WILDCARD.to_string()]))
    }

    /// Iterate over the patterns in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no patterns. Validated sets are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the default wildcard set.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.len() == 1 && self.0[0] == WILDCARD
    }
}

/// Immutable dependency-to-patterns mapping with a wildcard fallback.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: BTreeMap<String, PatternSet>,
}

impl PatternTable {
    /// An empty table: every dependency resolves to the wildcard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in library override table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        for (id, patterns) in [("boost", BOOST_COMPONENTS), ("thrift", THRIFT_LIBRARIES)] {
            entries.insert(
                id.to_string(),
                PatternSet(patterns.iter().map(|p| (*p).to_string()).collect()),
            );
        }
        Self { entries }
    }

    /// Build a table from raw entries, validating each one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for an empty pattern list, an empty
    /// pattern, a pattern containing a path separator, or an invalid glob.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let mut table = Self::new();
        table.merge(entries)?;
        Ok(table)
    }

    /// Layer validated entries over this table; new entries replace old ones.
    ///
    /// # Errors
    ///
    /// See [`PatternTable::from_entries`].
    pub fn with_overrides<I, K, V>(mut self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        self.merge(entries)?;
        Ok(self)
    }

    fn merge<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        for (id, patterns) in entries {
            let id = id.into();
            let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
            if patterns.is_empty() {
                return Err(Error::invalid_pattern(
                    &id,
                    "",
                    "pattern list must not be empty",
                ));
            }
            for pattern in &patterns {
                validate_pattern(&id, pattern)?;
            }
            debug!(dependency = %id, patterns = ?patterns, "Registered pattern override");
            self.entries.insert(id, PatternSet(patterns.into()));
        }
        Ok(())
    }

    /// Resolve the pattern set for a dependency.
    #[must_use]
    pub fn resolve(&self, dependency_id: &str) -> PatternSet {
        self.entries
            .get(dependency_id)
            .cloned()
            .unwrap_or_else(PatternSet::wildcard)
    }

    /// Whether the dependency has an explicit entry.
    #[must_use]
    pub fn contains(&self, dependency_id: &str) -> bool {
        self.entries.contains_key(dependency_id)
    }

    /// Identifiers with explicit entries, sorted.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn validate_pattern(dependency: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(Error::invalid_pattern(
            dependency,
            pattern,
            "pattern must not be empty",
        ));
    }
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(Error::invalid_pattern(
            dependency,
            pattern,
            "patterns match file names and must not contain path separators",
        ));
    }
    glob::Pattern::new(pattern)
        .map_err(|e| Error::invalid_pattern(dependency, pattern, e.msg))?;
    Ok(())
}

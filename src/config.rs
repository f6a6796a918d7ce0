//! Splitting configuration and the breakability policy

use crate::error::{Result, SplitError};
use std::collections::BTreeSet;

/// Default configuration constants
pub mod defaults {
    /// Default fragment budget in characters
    pub const MAX_LEN: usize = 4096;

    /// Tags inside which a cut is allowed
    pub const BREAKABLE_TAGS: &[&str] = &["p", "b", "strong", "i", "ul", "ol", "div", "span"];
}

/// Set of tag names considered safe to cut inside.
///
/// Names are compared ASCII case-insensitively; they are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakabilityPolicy {
    tags: BTreeSet<String>,
}

impl BreakabilityPolicy {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.tags.contains(&name.to_ascii_lowercase())
        } else {
            self.tags.contains(name)
        }
    }

    /// True iff every name belongs to the policy (an empty sequence is allowed).
    pub fn allows<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().all(|n| self.contains(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for BreakabilityPolicy {
    fn default() -> Self {
        Self::new(defaults::BREAKABLE_TAGS)
    }
}

/// Splitting configuration, fixed for the lifetime of one split operation
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub(crate) max_len: usize,
    pub(crate) debug: bool,
    pub(crate) breakable_tags: BreakabilityPolicy,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_len: defaults::MAX_LEN,
            debug: false,
            breakable_tags: BreakabilityPolicy::default(),
        }
    }
}

impl SplitConfig {
    /// Create a configuration builder
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder::default()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn breakable_tags(&self) -> &BreakabilityPolicy {
        &self.breakable_tags
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(SplitError::InvalidConfig(
                "max_len must be greater than 0".into(),
            ));
        }
        if self.breakable_tags.iter().any(str::is_empty) {
            return Err(SplitError::InvalidConfig(
                "breakable tag names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`SplitConfig`]
#[derive(Debug, Default)]
pub struct SplitConfigBuilder {
    max_len: Option<usize>,
    debug: Option<bool>,
    breakable_tags: Option<BreakabilityPolicy>,
}

impl SplitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fragment budget in characters
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Print every finalized fragment to the diagnostics sink
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Replace the default set of breakable tags
    pub fn breakable_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.breakable_tags = Some(BreakabilityPolicy::new(tags));
        self
    }

    pub fn build(self) -> Result<SplitConfig> {
        let mut config = SplitConfig::default();

        if let Some(max_len) = self.max_len {
            config.max_len = max_len;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(tags) = self.breakable_tags {
            config.breakable_tags = tags;
        }

        config.validate()?;
        Ok(config)
    }
}

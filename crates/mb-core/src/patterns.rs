//! Keyword pattern compilation.
//!
//! Keyword entries come from a remote list and are untrusted. Each one is
//! compiled on its own, so a malformed entry rejects only itself. Compiled
//! sets are built once per snapshot, never per evaluation.

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// Upper bound on the compiled program size of a single keyword.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A keyword entry ready for matching.
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    source: String,
    regex: Regex,
}

impl KeywordPattern {
    /// Compile one keyword as a case-insensitive regular expression.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError {
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn is_match(&self, corpus: &str) -> bool {
        self.regex.is_match(corpus)
    }
}

/// The compiled keyword list plus the entries that failed to compile.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<KeywordPattern>,
    rejected: Vec<PatternError>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Self {
        let mut set = Self::default();
        for source in sources {
            match KeywordPattern::compile(source.as_ref()) {
                Ok(pattern) => set.patterns.push(pattern),
                Err(err) => {
                    log::warn!("Skipping keyword: {err}");
                    set.rejected.push(err);
                }
            }
        }
        set
    }

    /// First pattern that matches `corpus`, in list order.
    pub fn find_match(&self, corpus: &str) -> Option<&KeywordPattern> {
        self.patterns.iter().find(|p| p.is_match(corpus))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn rejected(&self) -> &[PatternError] {
        &self.rejected
    }
}

//! Per-evaluation context.
//!
//! One `Context` lives for the duration of a single VCL evaluation. It
//! carries the regex capture-group side table (`re.group.N`), the sticky
//! Fastly-style error code, and a pattern-compilation cache. The cache is an
//! optimization only — compile-error and capture semantics are identical to
//! compiling at every match.

use std::collections::HashMap;

use crate::error::{EvalError, EvalResult};

/// Error code recorded when a match pattern fails to compile.
pub const EREGSYN: &str = "EREGSYN";

#[derive(Debug, Default)]
pub struct Context {
    /// Capture groups of the most recent successful match: key `"0"` is the
    /// whole match, `"1"`..`"N"` the groups. A failed match leaves the table
    /// untouched, so stale captures stay visible until the next success.
    pub captures: HashMap<String, String>,

    /// Fastly-style error code of the most recent runtime fault, if any.
    pub fastly_error: Option<String>,

    cache: HashMap<String, regex::Regex>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a pattern, memoizing the result. A compile failure records
    /// `EREGSYN` on the context before returning the error.
    pub fn compile(&mut self, pattern: &str) -> EvalResult<&regex::Regex> {
        if !self.cache.contains_key(pattern) {
            match regex::Regex::new(pattern) {
                Ok(re) => {
                    self.cache.insert(pattern.to_string(), re);
                }
                Err(_) => {
                    self.fastly_error = Some(EREGSYN.to_string());
                    return Err(EvalError::RegexCompile(format!(
                        "failed to compile regular expression from string {}",
                        pattern
                    )));
                }
            }
        }
        Ok(&self.cache[pattern])
    }

    /// Convenience lookup for `re.group.N`.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(&index.to_string()).map(String::as_str)
    }
}

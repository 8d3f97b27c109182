//! Thread-local cache of compiled regular expressions.
//!
//! Batch runs apply the same rules to every document, so conditions,
//! where-clauses and `regex_replace` patterns are compiled once per thread
//! instead of once per document. Cache is capped at 256 entries; it is
//! cleared when full.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled regex from cache, or compile and cache it.
///
/// Compilation errors are not cached.
pub fn get_or_compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern)?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Clear the regex cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_valid_patterns_only() {
        clear_cache();
        assert!(get_or_compile_regex("^nginx-\\d+$").is_ok());
        assert!(get_or_compile_regex("^nginx-\\d+$").is_ok());
        assert_eq!(cache_size(), 1);

        assert!(get_or_compile_regex("(unclosed").is_err());
        assert_eq!(cache_size(), 1);
    }
}

//! Structural-key autocomplete over the current document.
//!
//! Responsibilities:
//! - Derive candidate completions for the text after the last path
//!   separator by asking the filter tool for the object keys reachable
//!   via the prefix before it.
//! - Memoize candidates per normalized prefix; the cache never needs
//!   invalidation because the document is fixed after load.
//!
//! Does NOT handle:
//! - Rendering suggestions or applying a chosen one (TUI crate).
//!
//! Invariants:
//! - Completion failures are swallowed: the engine logs at debug and
//!   produces no suggestions, never a user-visible error. A later
//!   keystroke retries naturally.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::document::Document;
use crate::executor::FilterExecutor;

/// Characters in a key that require quoting in a path expression.
const QUOTE_TRIGGERS: [char; 5] = ['.', '-', ':', '$', '/'];

/// Incremental autocomplete engine with a per-prefix candidate cache.
#[derive(Debug, Clone)]
pub struct Autocomplete {
    executor: Arc<FilterExecutor>,
    cache: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl Autocomplete {
    /// Build an engine issuing subsidiary invocations through
    /// `executor`.
    pub fn new(executor: Arc<FilterExecutor>) -> Self {
        Self {
            executor,
            cache: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Suggest completions for the current filter text.
    ///
    /// Empty text browses `history` verbatim. Text without a path
    /// separator yields `None` and schedules nothing. A cache hit
    /// returns synchronously; a miss returns `None` and spawns an async
    /// fill that calls `wake` once candidates are cached, prompting the
    /// caller to ask again.
    ///
    /// Must be called from within a tokio runtime.
    pub fn suggest(
        &self,
        text: &str,
        history: &[String],
        document: &Document,
        wake: impl FnOnce() + Send + 'static,
    ) -> Option<Vec<String>> {
        if text.is_empty() {
            return Some(history.to_vec());
        }

        let (prefix, needle) = completion_prefix(text)?;

        {
            let cache = lock(&self.cache);
            if let Some(candidates) = cache.get(&prefix) {
                return Some(
                    candidates
                        .iter()
                        .filter(|candidate| candidate.starts_with(&needle))
                        .cloned()
                        .collect(),
                );
            }
        }

        // One fill per prefix at a time; repeated keystrokes on the same
        // fragment ride on the first one.
        if !lock(&self.pending).insert(prefix.clone()) {
            return None;
        }

        let executor = Arc::clone(&self.executor);
        let cache = Arc::clone(&self.cache);
        let pending = Arc::clone(&self.pending);
        let document = document.clone();
        tokio::spawn(async move {
            let candidates = fill(&executor, &document, &prefix).await;
            lock(&pending).remove(&prefix);
            if let Some(candidates) = candidates {
                lock(&cache).insert(prefix, candidates);
                wake();
            }
        });

        None
    }

    #[cfg(test)]
    fn seed(&self, prefix: &str, candidates: Vec<String>) {
        lock(&self.cache).insert(prefix.to_string(), candidates);
    }
}

/// Enumerate the object keys reachable via `prefix` and turn them into
/// full candidate expressions. Any failure yields `None`.
async fn fill(
    executor: &FilterExecutor,
    document: &Document,
    prefix: &str,
) -> Option<Vec<String>> {
    let expression = format!("[{prefix} | objects | keys[]] | unique");
    let completion_doc = document.with_options(document.options().for_completion());

    let mut buffer = Vec::new();
    let token = CancellationToken::new();
    if let Err(err) = executor
        .run(&completion_doc, &expression, &mut buffer, &token)
        .await
    {
        debug!(prefix, error = %err, "structural key extraction failed");
        return None;
    }

    let keys: Vec<String> = match serde_json::from_slice(&buffer) {
        Ok(keys) => keys,
        Err(err) => {
            debug!(prefix, error = %err, "unparseable key listing");
            return None;
        }
    };

    let stem = if prefix == "." { "" } else { prefix };
    Some(
        keys.iter()
            .map(|key| format!("{stem}.{}", quote_key(key)))
            .collect(),
    )
}

/// Split the filter text at its last path separator into the normalized
/// lookup prefix and the needle a candidate must start with.
fn completion_prefix(text: &str) -> Option<(String, String)> {
    let idx = text.rfind('.')?;
    let raw = &text[..idx];
    let fragment = &text[idx..];

    let trimmed = raw.trim_end_matches([' ', '|']);
    let prefix = if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    };

    let stem = if prefix == "." { "" } else { prefix.as_str() };
    Some((prefix.clone(), format!("{stem}{fragment}")))
}

/// Quote keys that are not plain lowercase identifiers.
fn quote_key(key: &str) -> String {
    if needs_quotes(key) {
        format!("\"{key}\"")
    } else {
        key.to_string()
    }
}

fn needs_quotes(key: &str) -> bool {
    let Some(first) = key.chars().next() else {
        return true;
    };
    !first.is_ascii_lowercase() || key.contains(QUOTE_TRIGGERS)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FilterOptions;

    fn engine() -> Autocomplete {
        Autocomplete::new(Arc::new(FilterExecutor::new("jq")))
    }

    fn doc() -> Document {
        Document::new("{}", FilterOptions::default())
    }

    #[tokio::test]
    async fn empty_text_browses_history() {
        let history = vec![".foo".to_string(), ".bar | length".to_string()];
        let suggestions = engine().suggest("", &history, &doc(), || {});
        assert_eq!(suggestions.as_deref(), Some(history.as_slice()));
    }

    #[tokio::test]
    async fn text_without_separator_yields_nothing() {
        let engine = engine();
        assert_eq!(engine.suggest("length", &[], &doc(), || {}), None);
        // No fill was scheduled either.
        assert!(lock(&engine.pending).is_empty());
    }

    #[tokio::test]
    async fn cache_hit_filters_by_fragment() {
        let engine = engine();
        engine.seed(
            ".foo",
            vec![".foo.bar".into(), ".foo.baz".into(), ".foo.\"x-y\"".into()],
        );

        let suggestions = engine.suggest(".foo.ba", &[], &doc(), || {}).unwrap();
        assert_eq!(suggestions, vec![".foo.bar".to_string(), ".foo.baz".to_string()]);

        let all = engine.suggest(".foo.", &[], &doc(), || {}).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn root_prefix_matches_top_level_keys() {
        let engine = engine();
        engine.seed(".", vec![".alpha".into(), ".beta".into()]);

        let suggestions = engine.suggest(".al", &[], &doc(), || {}).unwrap();
        assert_eq!(suggestions, vec![".alpha".to_string()]);
    }

    #[test]
    fn prefix_split_normalizes_noise() {
        let (prefix, needle) = completion_prefix(".foo.ba").unwrap();
        assert_eq!(prefix, ".foo");
        assert_eq!(needle, ".foo.ba");

        let (prefix, needle) = completion_prefix(".fo").unwrap();
        assert_eq!(prefix, ".");
        assert_eq!(needle, ".fo");

        let (prefix, _) = completion_prefix(".foo | .ba").unwrap();
        assert_eq!(prefix, ".foo");

        assert_eq!(completion_prefix("length"), None);
    }

    #[test]
    fn quoting_rules() {
        assert_eq!(quote_key("plain"), "plain");
        assert_eq!(quote_key("has-dash"), "\"has-dash\"");
        assert_eq!(quote_key("dot.ted"), "\"dot.ted\"");
        assert_eq!(quote_key("a:b"), "\"a:b\"");
        assert_eq!(quote_key("$var"), "\"$var\"");
        assert_eq!(quote_key("a/b"), "\"a/b\"");
        assert_eq!(quote_key("Upper"), "\"Upper\"");
        assert_eq!(quote_key("9lives"), "\"9lives\"");
        assert_eq!(quote_key(""), "\"\"");
    }
}

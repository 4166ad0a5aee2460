//! The configured entry point.
//!
//! A [`Runtime`] owns the parse cache and the evaluation options. Most
//! callers use the process-wide default through the top-level [`search`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::ast::Ast;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::parser;
use crate::value::Value;

/// Evaluation options.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Swallow evaluation-time errors and return null instead. Syntax
    /// errors are never swallowed.
    pub disable_visit_errors: bool,
    /// Number of parsed expressions kept in the cache.
    pub parse_cache_size: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            disable_visit_errors: false,
            parse_cache_size: 128,
        }
    }
}

/// A configured engine with a bounded parse cache.
///
/// Sharable across threads; the cache is the only mutable state and is
/// lock-guarded. Evaluation itself touches no shared state.
pub struct Runtime {
    options: RuntimeOptions,
    cache: Mutex<ParseCache>,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Self {
        let cache = ParseCache::new(options.parse_cache_size);
        Runtime {
            options,
            cache: Mutex::new(cache),
        }
    }

    pub fn with_defaults() -> Self {
        Runtime::new(RuntimeOptions::default())
    }

    /// Parse an expression, reusing the cached AST if available.
    pub fn parse(&self, expression: &str) -> Result<Arc<Ast>> {
        if let Some(ast) = self.cache.lock().get(expression) {
            tracing::debug!(expression, "parse cache hit");
            return Ok(ast);
        }
        tracing::debug!(expression, "parse cache miss");
        let ast = Arc::new(parser::parse(expression)?);
        self.cache
            .lock()
            .insert(expression.to_owned(), ast.clone());
        Ok(ast)
    }

    /// Evaluate an expression against a document.
    pub fn search(&self, expression: &str, data: &Value) -> Result<Value> {
        let ast = self.parse(expression)?;
        match Interpreter::new(data).eval(&ast, data) {
            Err(err) if self.options.disable_visit_errors && err.is_suppressible() => {
                tracing::debug!(error = %err, "suppressed evaluation error");
                Ok(Value::Null)
            }
            result => result,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::with_defaults()
    }
}

/// Evaluate an expression using the process-wide default runtime.
pub fn search(expression: &str, data: &Value) -> Result<Value> {
    default_runtime().search(expression, data)
}

/// Parse an expression using the process-wide default runtime.
pub fn parse(expression: &str) -> Result<Arc<Ast>> {
    default_runtime().parse(expression)
}

fn default_runtime() -> &'static Runtime {
    static DEFAULT: OnceLock<Runtime> = OnceLock::new();
    DEFAULT.get_or_init(Runtime::with_defaults)
}

/// A bounded parse cache evicting the least recently used entry.
struct ParseCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, CacheEntry>,
}

struct CacheEntry {
    last_used: u64,
    ast: Arc<Ast>,
}

impl ParseCache {
    fn new(capacity: usize) -> Self {
        ParseCache {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    fn get(&mut self, expression: &str) -> Option<Arc<Ast>> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(expression).map(|entry| {
            entry.last_used = tick;
            entry.ast.clone()
        })
    }

    fn insert(&mut self, expression: String, ast: Arc<Ast>) {
        self.tick += 1;
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&expression) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(
            expression,
            CacheEntry {
                last_used: self.tick,
                ast,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn data(json: &str) -> Value {
        Value::from(serde_json::from_str::<serde_json::Value>(json).unwrap())
    }

    #[test]
    fn cache_hit_returns_same_ast() {
        let runtime = Runtime::with_defaults();
        let first = runtime.parse("a.b.c").unwrap();
        let second = runtime.parse("a.b.c").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let runtime = Runtime::new(RuntimeOptions {
            parse_cache_size: 2,
            ..Default::default()
        });
        let a = runtime.parse("a").unwrap();
        let b = runtime.parse("b").unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        assert!(Arc::ptr_eq(&a, &runtime.parse("a").unwrap()));
        runtime.parse("c").unwrap();
        assert!(Arc::ptr_eq(&a, &runtime.parse("a").unwrap()));
        assert!(!Arc::ptr_eq(&b, &runtime.parse("b").unwrap()));
    }

    #[test]
    fn search_with_and_without_cache_agree() {
        let runtime = Runtime::with_defaults();
        let doc = data(r#"{"a": {"b": [1, 2, 3]}}"#);
        let first = runtime.search("a.b[1]", &doc).unwrap();
        let second = runtime.search("a.b[1]", &doc).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, data("2"));
    }

    #[test]
    fn visit_errors_can_be_disabled() {
        let doc = data("{}");
        let strict = Runtime::with_defaults();
        assert!(matches!(
            strict.search("abs('x')", &doc),
            Err(Error::InvalidType(_))
        ));

        let lenient = Runtime::new(RuntimeOptions {
            disable_visit_errors: true,
            ..Default::default()
        });
        assert_eq!(lenient.search("abs('x')", &doc).unwrap(), Value::Null);
        // Syntax errors always surface.
        assert!(matches!(
            lenient.search("foo.[", &doc),
            Err(Error::Syntax { .. })
        ));
    }
}

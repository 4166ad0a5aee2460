//! [JMESPath] implementation in Rust.
//!
//! # Usage
//!
//! ```rust
//! use jmespath_engine::{search, Value};
//!
//! let data = Value::from(serde_json::json!({
//!     "locations": [
//!         {"name": "Seattle", "state": "WA"},
//!         {"name": "Portland", "state": "OR"},
//!         {"name": "Olympia", "state": "WA"}
//!     ]
//! }));
//!
//! let result = search("locations[?state == 'WA'].name | sort(@)", &data).unwrap();
//! assert_eq!(result.to_string(), r#"["Olympia","Seattle"]"#);
//! ```
//!
//! [JMESPath]: https://jmespath.org

mod ast;
mod error;
mod functions;
mod interpreter;
mod lexer;
mod parser;
mod runtime;
mod value;

pub use ast::{Ast, Comparator, Slice};
pub use error::{Error, Result};
pub use runtime::{parse, search, Runtime, RuntimeOptions};
pub use value::{Map, Value};

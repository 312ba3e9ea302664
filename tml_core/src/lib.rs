//! `tml_core` parses component templates: namespaced XML documents whose
//! reserved elements and attributes declare components, parameters, layout
//! inheritance and body insertion points. Each template becomes a
//! [`ComponentTemplate`], a flat sequence of [`Token`]s plus the component ids
//! it declares and, for templates that extend a parent, the override token
//! sequences keyed by extension point.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template markup
//!   -> Event source (quick-xml reader: elements, text, comments, CDATA, DTD, namespace prefixes)
//!   -> Transducer (frame stack; recognizes reserved constructs and component elements)
//!   -> Lexer (whitespace compression, ${...} expansion scanning)
//!   -> ComponentTemplate (tokens, component ids, extension flag, overrides)
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading from `tml.toml`.
//! - [`event`] - The structural event model and the [`EventSource`] trait,
//!   for feeding templates from something other than XML text.
//! - [`transducer`] - The state machine that turns events into tokens, and
//!   the reserved namespace URIs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tml_core::TemplateParser;
//!
//! let parser = TemplateParser::default();
//! let template = parser.parse_file("components/Layout.tml").unwrap();
//!
//! for token in template.tokens() {
//!     println!("{token}");
//! }
//! ```

pub use config::*;
pub use entities::*;
pub use error::*;
pub use location::*;
pub use parser::*;
pub use template::*;
pub use tokens::*;
pub use xml::*;

pub mod config;
mod entities;
#[allow(unused_assignments)]
mod error;
pub mod event;
pub(crate) mod lexer;
mod location;
mod parser;
mod template;
mod tokens;
pub mod transducer;
mod xml;

#[cfg(test)]
mod __fixtures;

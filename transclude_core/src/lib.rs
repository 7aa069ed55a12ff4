//! `transclude_core` recursively expands transclusion directives inside a set
//! of in-memory documents. A directive `:[label](target)` is replaced with the
//! content of the document it references, and that content is expanded in
//! turn until no directives remain.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Document text
//!   → Lexer (tokenizes text, assembles `:[label](target secondary)` spans)
//!   → Parser (builds Directives with positions)
//!   → Resolver chain (exact → folder → filesystem → fallback, first match wins)
//!   → Engine (substitutes fragments recursively, detects cycles, collects metadata)
//!   → Stage (runs the engine over every eligible document and writes results back)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `transclude.toml`.
//! - [`frontmatter`]: YAML front matter splitting and serialization.
//! - [`path`]: Key arithmetic for `/`-separated document keys.
//! - [`permalink`]: Rewriting of extensionless targets.
//! - [`project`]: Loading a source directory into a document set and writing
//!   it back out.
//!
//! ## Key Types
//!
//! - [`DocumentSet`]: The map of virtual files transformed by one run.
//! - [`Directive`]: A parsed `:[label](target)` occurrence.
//! - [`Resolver`]: A strategy turning a reference into content.
//! - [`Engine`]: Recursive expansion of a single document.
//! - [`TranscludeStage`]: The pipeline stage wrapping the engine.
//! - [`MetadataTree`]: Fragment metadata keyed by resolved document keys.
//!
//! ## Quick Start
//!
//! ```rust
//! use transclude_core::Document;
//! use transclude_core::DocumentSet;
//! use transclude_core::StageOptions;
//! use transclude_core::TranscludeStage;
//!
//! let mut documents: DocumentSet = [
//! 	("index.md", Document::new("# Intro\n\n:[usage](usage.md)\n")),
//! 	("usage.md", Document::new("Run the build.\n")),
//! ]
//! .into_iter()
//! .collect();
//!
//! let stage = TranscludeStage::new(StageOptions::default()).unwrap();
//! stage.run(&mut documents).unwrap();
//!
//! assert_eq!(documents["index.md"].content, "# Intro\n\nRun the build.\n\n");
//! ```

pub use config::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use metadata::*;
pub use parser::*;
pub use resolver::*;
pub use stage::*;

pub mod config;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod frontmatter;
pub(crate) mod lexer;
mod metadata;
mod parser;
pub mod path;
pub mod permalink;
pub mod project;
mod resolver;
mod stage;

#[cfg(test)]
mod __fixtures;

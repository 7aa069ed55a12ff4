use serde_json::json;

use crate::Document;
use crate::DocumentSet;
use crate::Metadata;

/// Build a document set from `(key, content)` pairs.
pub fn documents<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> DocumentSet {
	entries
		.into_iter()
		.map(|(key, content)| (key, Document::new(content)))
		.collect()
}

/// Build a metadata map from a JSON object literal.
pub fn metadata(value: serde_json::Value) -> Metadata {
	match value {
		serde_json::Value::Object(map) => map,
		other => panic!("expected an object, found {other}"),
	}
}

/// A small site with nested directories and relative references. Every level
/// below `index.md` holds a relative directive, and the root carries
/// same-named decoys for each of them.
pub fn nested_site() -> DocumentSet {
	documents([
		("index.md", "# Guide\n\n:[intro](guide/intro.md)\n"),
		("guide/intro.md", "Intro text.\n:[details](details.md)\n"),
		(
			"guide/details.md",
			"Details from the guide directory.\n:[note](notes/note.md)\n",
		),
		("guide/notes/note.md", "A note from guide/notes.\n"),
		("details.md", "Details from the root.\n"),
		("notes/note.md", "A note from the root.\n"),
	])
}

/// A parent pulling in a fragment that carries front matter.
pub fn site_with_frontmatter() -> DocumentSet {
	documents([
		("index.md", ":[f](section/f)\n"),
		("section/f", "---\ntitle: X\n---\nFragment body.\n"),
	])
}

/// A folder of three chapters in key order.
pub fn chapters() -> DocumentSet {
	documents([
		("book.md", ":[all](chapters/)\n"),
		("chapters/01.md", "one\n"),
		("chapters/02.md", "two\n"),
		("chapters/03.md", "three\n"),
	])
}

pub fn title(value: &str) -> Metadata {
	metadata(json!({ "title": value }))
}

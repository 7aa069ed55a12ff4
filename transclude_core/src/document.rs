use std::collections::BTreeMap;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;

/// Open mapping of string keys to arbitrary structured values attached to a
/// document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single virtual file in the document set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
	/// The text content. Front matter is normally already split off into
	/// `metadata` by whatever produced the document.
	pub content: String,
	/// Structured metadata for this document.
	#[serde(default)]
	pub metadata: Metadata,
}

impl Document {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			metadata: Metadata::new(),
		}
	}

	pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
		Self {
			content: content.into(),
			metadata,
		}
	}
}

/// The full in-memory collection of documents transformed by one run, keyed
/// by `/`-separated paths.
///
/// Iteration follows sorted key order, which is the deterministic processing
/// order of the stage and the concatenation order of folder transclusion.
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut, Serialize, Deserialize)]
pub struct DocumentSet(BTreeMap<String, Document>);

impl DocumentSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every key contained in the directory `prefix`, in set order. An empty
	/// prefix denotes the root and yields every key.
	pub fn keys_under<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a String> + use<'a> {
		let dir = if prefix.is_empty() {
			String::new()
		} else {
			format!("{}/", prefix.trim_end_matches('/'))
		};

		self.0
			.range(dir.clone()..)
			.take_while(move |(key, _)| key.starts_with(&dir))
			.map(|(key, _)| key)
	}
}

impl<K: Into<String>> FromIterator<(K, Document)> for DocumentSet {
	fn from_iter<I: IntoIterator<Item = (K, Document)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}
}

impl IntoIterator for DocumentSet {
	type IntoIter = std::collections::btree_map::IntoIter<String, Document>;
	type Item = (String, Document);

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

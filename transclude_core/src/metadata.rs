use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::Metadata;
use crate::TranscludeError;
use crate::TranscludeResult;
use crate::frontmatter;
use crate::path::segments;

/// Default metadata field that holds the transclusion tree on a parent.
pub const DEFAULT_METADATA_KEY: &str = "transclusions";

/// Where the accumulated fragment metadata of a document ends up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrontmatterOutput {
	/// Stored as a structured field of the parent's metadata.
	#[default]
	Metadata,
	/// Serialized into the front matter block of the parent's content.
	Content,
	/// Both of the above.
	Both,
}

impl FrontmatterOutput {
	pub fn writes_metadata(self) -> bool {
		matches!(self, Self::Metadata | Self::Both)
	}

	pub fn writes_content(self) -> bool {
		matches!(self, Self::Content | Self::Both)
	}
}

/// Fragment metadata keyed by the hierarchy of resolved document keys.
///
/// Inserting `section/f.md` and `section/g.md` yields
/// `{ section: { "f.md": {..}, "g.md": {..} } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataTree(Metadata);

impl MetadataTree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Record the metadata of the fragment resolved at `key`. Empty metadata is
	/// not recorded.
	pub fn insert(&mut self, key: &str, metadata: &Metadata) {
		if metadata.is_empty() {
			return;
		}

		let parts: Vec<&str> = segments(key).collect();
		let Some((leaf, ancestors)) = parts.split_last() else {
			return;
		};

		let mut level = &mut self.0;
		for segment in ancestors {
			let entry = level
				.entry((*segment).to_string())
				.or_insert_with(|| Value::Object(Metadata::new()));
			if !entry.is_object() {
				*entry = Value::Object(Metadata::new());
			}
			let Some(map) = entry.as_object_mut() else {
				return;
			};
			level = map;
		}

		match level.get_mut(*leaf) {
			Some(Value::Object(existing)) => deep_merge(existing, metadata.clone()),
			_ => {
				level.insert((*leaf).to_string(), Value::Object(metadata.clone()));
			}
		}
	}

	/// Look up the value recorded at a `/`-separated path.
	pub fn get(&self, key: &str) -> Option<&Value> {
		let mut parts = segments(key);
		let mut value = self.0.get(parts.next()?)?;
		for segment in parts {
			value = value.as_object()?.get(segment)?;
		}
		Some(value)
	}

	pub fn as_map(&self) -> &Metadata {
		&self.0
	}

	pub fn into_inner(self) -> Metadata {
		self.0
	}
}

/// Recursively merge `source` into `target`. Nested mappings are merged key
/// by key; any other value in `source` replaces the one in `target`.
pub fn deep_merge(target: &mut Metadata, source: Metadata) {
	for (key, value) in source {
		match (target.get_mut(&key), value) {
			(Some(Value::Object(existing)), Value::Object(incoming)) => {
				deep_merge(existing, incoming);
			}
			(_, value) => {
				target.insert(key, value);
			}
		}
	}
}

/// Attach `tree` to the parent metadata under `reserved_key`.
///
/// Existing parent fields are never touched. A mapping already stored under
/// the reserved key is deep-merged; any other value there is a conflict.
pub fn attach(
	parent: &mut Metadata,
	reserved_key: &str,
	tree: &MetadataTree,
	document: &str,
) -> TranscludeResult<()> {
	if tree.is_empty() {
		return Ok(());
	}

	match parent.get_mut(reserved_key) {
		None => {
			parent.insert(reserved_key.to_string(), Value::Object(tree.0.clone()));
		}
		Some(Value::Object(existing)) => deep_merge(existing, tree.0.clone()),
		Some(_) => {
			return Err(TranscludeError::ReservedKeyConflict {
				document: document.to_string(),
				key: reserved_key.to_string(),
			});
		}
	}

	Ok(())
}

/// Attach `tree` to the front matter block at the start of `content`,
/// creating the block when the content has none.
pub fn attach_to_content(
	content: &str,
	reserved_key: &str,
	tree: &MetadataTree,
	document: &str,
) -> TranscludeResult<String> {
	if tree.is_empty() {
		return Ok(content.to_string());
	}

	let parsed = frontmatter::parse(content).map_err(|e| {
		TranscludeError::InvalidFrontmatter {
			document: document.to_string(),
			fragment: document.to_string(),
			reason: e.to_string(),
		}
	})?;

	let mut metadata = parsed.metadata;
	attach(&mut metadata, reserved_key, tree, document)?;

	frontmatter::serialize(&parsed.body, &metadata).map_err(|e| {
		TranscludeError::InvalidFrontmatter {
			document: document.to_string(),
			fragment: document.to_string(),
			reason: e.to_string(),
		}
	})
}

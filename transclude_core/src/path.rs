//! Slash-separated key arithmetic. Document keys never start with `/` and
//! never contain `.` or `..` segments.

/// The directory part of a key: `"docs/guide/intro.md"` → `"docs/guide"`.
pub fn parent_dir(key: &str) -> &str {
	key.rfind('/').map_or("", |idx| &key[..idx])
}

/// Resolve `target` against the directory of `source_key`.
///
/// A leading `/` makes the target relative to the root of the document set.
/// Returns `None` when the target climbs above the root.
pub fn join_key(source_key: &str, target: &str) -> Option<String> {
	let (base, target) = match target.strip_prefix('/') {
		Some(rooted) => ("", rooted),
		None => (parent_dir(source_key), target),
	};

	let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();

	for segment in target.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop()?;
			}
			other => segments.push(other),
		}
	}

	Some(segments.join("/"))
}

/// Split a key into its non-empty `/`-separated segments.
pub fn segments(key: &str) -> impl Iterator<Item = &str> {
	key.split('/').filter(|segment| !segment.is_empty())
}

/// Normalize an OS path fragment into a document key.
pub fn normalize_path_key(path: &std::path::Path) -> String {
	path.to_string_lossy().replace('\\', "/")
}

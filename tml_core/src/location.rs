use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use derive_more::Deref;
use serde::Serialize;

/// The identity of a template resource, usually its file path.
///
/// Cheap to clone: every [`Location`] produced while parsing a template shares
/// the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deref, Serialize)]
#[deref(forward)]
#[serde(transparent)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
	pub fn new(id: impl AsRef<str>) -> Self {
		Self(Arc::from(id.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for ResourceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ResourceId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for ResourceId {
	fn from(value: String) -> Self {
		Self(Arc::from(value))
	}
}

impl From<&Path> for ResourceId {
	fn from(value: &Path) -> Self {
		Self::new(value.to_string_lossy())
	}
}

/// A resource together with a 1-based line number, attached to every token
/// and every error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
	pub resource: ResourceId,
	/// `None` when the event source could not report a line.
	pub line: Option<usize>,
}

impl Location {
	pub fn new(resource: ResourceId, line: Option<usize>) -> Self {
		Self { resource, line }
	}
}

impl Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.line {
			Some(line) => write!(f, "{}, line {line}", self.resource),
			None => write!(f, "{}", self.resource),
		}
	}
}

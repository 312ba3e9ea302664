use std::collections::HashMap;

use serde::Serialize;
use serde::Serializer;

use crate::Location;
use crate::ResourceId;
use crate::tokens::Token;

/// An insertion-ordered map keyed by ids, compared case-insensitively.
///
/// The key as first written is kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap<V> {
	entries: Vec<(String, V)>,
	index: HashMap<String, usize>,
}

impl<V> Default for IdMap<V> {
	fn default() -> Self {
		Self {
			entries: Vec::new(),
			index: HashMap::new(),
		}
	}
}

fn fold(key: &str) -> String {
	key.to_lowercase()
}

impl<V> IdMap<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, returning the previous value stored under any casing of
	/// `key`. The originally written key is retained.
	pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
		let key = key.into();
		let folded = fold(&key);

		if let Some(&position) = self.index.get(&folded) {
			return Some(std::mem::replace(&mut self.entries[position].1, value));
		}

		self.index.insert(folded, self.entries.len());
		self.entries.push((key, value));
		None
	}

	pub fn get(&self, key: &str) -> Option<&V> {
		self.index
			.get(&fold(key))
			.map(|&position| &self.entries[position].1)
	}

	/// The key as it was first written, for any casing of `key`.
	pub fn original_key(&self, key: &str) -> Option<&str> {
		self.index
			.get(&fold(key))
			.map(|&position| self.entries[position].0.as_str())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.index.contains_key(&fold(key))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(key, _)| key.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}
}

impl<V: Serialize> Serialize for IdMap<V> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_map(self.iter())
	}
}

/// The result of parsing one template resource.
///
/// Built once by the transducer and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTemplate {
	resource: ResourceId,
	tokens: Vec<Token>,
	component_ids: IdMap<Location>,
	extension: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	overrides: Option<IdMap<Vec<Token>>>,
}

impl ComponentTemplate {
	pub(crate) fn new(
		resource: ResourceId,
		tokens: Vec<Token>,
		component_ids: IdMap<Location>,
		extension: bool,
		overrides: Option<IdMap<Vec<Token>>>,
	) -> Self {
		Self {
			resource,
			tokens,
			component_ids,
			extension,
			overrides,
		}
	}

	pub fn resource(&self) -> &ResourceId {
		&self.resource
	}

	/// The main render script, in source order.
	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	/// Every component id declared by the template, with the location of the
	/// declaring element.
	pub fn component_ids(&self) -> &IdMap<Location> {
		&self.component_ids
	}

	/// `true` when the template's root is `<extend>`.
	pub fn has_extension(&self) -> bool {
		self.extension
	}

	/// Override token sequences keyed by extension point / replace id; `None`
	/// when the template uses none of those constructs.
	pub fn overrides(&self) -> Option<&IdMap<Vec<Token>>> {
		self.overrides.as_ref()
	}

	pub fn override_tokens(&self, id: &str) -> Option<&[Token]> {
		self.overrides
			.as_ref()
			.and_then(|overrides| overrides.get(id))
			.map(Vec::as_slice)
	}

	/// A template containing only a DTD, whitespace, or nothing at all.
	pub fn is_blank(&self) -> bool {
		self.tokens
			.iter()
			.all(|token| matches!(token, Token::Dtd { .. }))
			&& self.overrides.is_none()
	}
}

use std::fmt::Display;

use serde::Serialize;

use crate::Location;

/// One recognized construct of a component template.
///
/// Tokens form a flat sequence; nesting is expressed by the order of
/// [`Token::StartElement`]/[`Token::StartComponent`] and [`Token::EndElement`]
/// tokens rather than by references between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[non_exhaustive]
pub enum Token {
	/// An ordinary markup element.
	StartElement {
		namespace: Option<String>,
		name: Option<String>,
		location: Location,
	},
	/// An element identified as a component instantiation.
	StartComponent {
		/// The markup element name; `None` for elements of a reserved
		/// namespace, where the element name *is* the component type.
		element_name: Option<String>,
		id: Option<String>,
		component_type: Option<String>,
		mixins: Option<String>,
		location: Location,
	},
	/// Closes the most recently opened start token.
	EndElement { location: Location },
	/// An attribute of the immediately preceding start token.
	Attribute {
		namespace: Option<String>,
		name: String,
		value: String,
		location: Location,
	},
	Text { text: String, location: Location },
	/// A `${...}` placeholder; the expression is kept uninterpreted.
	Expansion { expression: String, location: Location },
	Comment { comment: String, location: Location },
	Cdata { content: String, location: Location },
	Dtd {
		name: String,
		public_id: Option<String>,
		system_id: Option<String>,
		location: Location,
	},
	DefineNamespacePrefix {
		namespace: String,
		prefix: String,
		location: Location,
	},
	/// Where a caller's body content is injected.
	Body { location: Location },
	Block { id: String, location: Location },
	Parameter { name: String, location: Location },
	/// Where an override with the same id replaces inherited content.
	ExtensionPoint { id: String, location: Location },
}

/// The discriminant of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
	StartElement,
	StartComponent,
	EndElement,
	Attribute,
	Text,
	Expansion,
	Comment,
	Cdata,
	Dtd,
	DefineNamespacePrefix,
	Body,
	Block,
	Parameter,
	ExtensionPoint,
}

impl Token {
	pub fn token_type(&self) -> TokenType {
		match self {
			Self::StartElement { .. } => TokenType::StartElement,
			Self::StartComponent { .. } => TokenType::StartComponent,
			Self::EndElement { .. } => TokenType::EndElement,
			Self::Attribute { .. } => TokenType::Attribute,
			Self::Text { .. } => TokenType::Text,
			Self::Expansion { .. } => TokenType::Expansion,
			Self::Comment { .. } => TokenType::Comment,
			Self::Cdata { .. } => TokenType::Cdata,
			Self::Dtd { .. } => TokenType::Dtd,
			Self::DefineNamespacePrefix { .. } => TokenType::DefineNamespacePrefix,
			Self::Body { .. } => TokenType::Body,
			Self::Block { .. } => TokenType::Block,
			Self::Parameter { .. } => TokenType::Parameter,
			Self::ExtensionPoint { .. } => TokenType::ExtensionPoint,
		}
	}

	pub fn location(&self) -> &Location {
		match self {
			Self::StartElement { location, .. }
			| Self::StartComponent { location, .. }
			| Self::EndElement { location }
			| Self::Attribute { location, .. }
			| Self::Text { location, .. }
			| Self::Expansion { location, .. }
			| Self::Comment { location, .. }
			| Self::Cdata { location, .. }
			| Self::Dtd { location, .. }
			| Self::DefineNamespacePrefix { location, .. }
			| Self::Body { location }
			| Self::Block { location, .. }
			| Self::Parameter { location, .. }
			| Self::ExtensionPoint { location, .. } => location,
		}
	}
}

fn write_qualified(
	f: &mut std::fmt::Formatter<'_>,
	namespace: Option<&str>,
	name: &str,
) -> std::fmt::Result {
	match namespace {
		Some(namespace) if !namespace.is_empty() => write!(f, "{{{namespace}}}{name}"),
		_ => write!(f, "{name}"),
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::StartElement {
				namespace, name, ..
			} => {
				write!(f, "start ")?;
				write_qualified(f, namespace.as_deref(), name.as_deref().unwrap_or("-"))
			}
			Self::StartComponent {
				element_name,
				id,
				component_type,
				mixins,
				..
			} => {
				write!(f, "component")?;
				if let Some(element_name) = element_name {
					write!(f, " <{element_name}>")?;
				}
				if let Some(id) = id {
					write!(f, " id={id}")?;
				}
				if let Some(component_type) = component_type {
					write!(f, " type={component_type}")?;
				}
				if let Some(mixins) = mixins {
					write!(f, " mixins={mixins}")?;
				}
				Ok(())
			}
			Self::EndElement { .. } => write!(f, "end"),
			Self::Attribute {
				namespace,
				name,
				value,
				..
			} => {
				write!(f, "attribute ")?;
				write_qualified(f, namespace.as_deref(), name)?;
				write!(f, "={value:?}")
			}
			Self::Text { text, .. } => write!(f, "text {text:?}"),
			Self::Expansion { expression, .. } => write!(f, "expansion ${{{expression}}}"),
			Self::Comment { comment, .. } => write!(f, "comment {comment:?}"),
			Self::Cdata { content, .. } => write!(f, "cdata {content:?}"),
			Self::Dtd {
				name,
				public_id,
				system_id,
				..
			} => {
				write!(f, "dtd {name}")?;
				if let Some(public_id) = public_id {
					write!(f, " public={public_id:?}")?;
				}
				if let Some(system_id) = system_id {
					write!(f, " system={system_id:?}")?;
				}
				Ok(())
			}
			Self::DefineNamespacePrefix {
				namespace, prefix, ..
			} => {
				if prefix.is_empty() {
					write!(f, "xmlns={namespace:?}")
				} else {
					write!(f, "xmlns:{prefix}={namespace:?}")
				}
			}
			Self::Body { .. } => write!(f, "body"),
			Self::Block { id, .. } => write!(f, "block {id}"),
			Self::Parameter { name, .. } => write!(f, "parameter {name}"),
			Self::ExtensionPoint { id, .. } => write!(f, "extension-point {id}"),
		}
	}
}

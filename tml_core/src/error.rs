use std::fmt::Display;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::Location;
use crate::ResourceId;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TemplateError {
	#[error(transparent)]
	#[diagnostic(code(tml::io_error))]
	Io(#[from] std::io::Error),

	#[error("{rule} ({location})")]
	#[diagnostic(code(tml::grammar_violation))]
	GrammarViolation { rule: GrammarRule, location: Location },

	#[error("the <{element}> element must have a `{attribute}` attribute ({location})")]
	#[diagnostic(code(tml::missing_required_attribute))]
	MissingRequiredAttribute {
		element: String,
		attribute: String,
		location: Location,
	},

	#[error("{kind} id `{id}` is not valid ({location})")]
	#[diagnostic(
		code(tml::invalid_identifier),
		help("ids must start with a letter and contain only letters, digits and underscores")
	)]
	InvalidIdentifier {
		kind: IdKind,
		id: String,
		location: Location,
	},

	#[error("the path portion of library namespace URI `{uri}` is not valid ({location})")]
	#[diagnostic(
		code(tml::invalid_namespace_path),
		help("use `tapestry-library:` followed by slash separated identifiers, e.g. `tapestry-library:core/forms`")
	)]
	InvalidNamespacePath { uri: String, location: Location },

	#[error("{}", unsupported_attribute_message(.element, .attribute, .allowed.as_deref(), .location))]
	#[diagnostic(code(tml::unsupported_attribute))]
	UnsupportedAttribute {
		element: String,
		attribute: String,
		allowed: Option<String>,
		location: Location,
	},

	#[error(
		"element <{}> has `mixins` but neither `id` nor `type`, so it is not a component ({location})",
		.element.as_deref().unwrap_or("?")
	)]
	#[diagnostic(
		code(tml::mixins_without_identity),
		help("add a `t:id` or `t:type` attribute, or remove `t:mixins`")
	)]
	MixinsWithoutIdentity {
		element: Option<String>,
		location: Location,
	},

	#[error("component id `{id}` is already used at {first} ({location})")]
	#[diagnostic(
		code(tml::duplicate_component_id),
		help("component ids are case-insensitive and must be unique within a template")
	)]
	DuplicateComponentId {
		id: String,
		first: Location,
		location: Location,
	},

	#[error("unable to open resource `{}` for public id `{public_id}`: {source}", .path.display())]
	#[diagnostic(
		code(tml::resource_access),
		help("check the `[entities]` section of tml.toml")
	)]
	ResourceAccess {
		public_id: String,
		path: PathBuf,
		source: std::io::Error,
		/// The declaration that asked for the resource, when one did.
		location: Option<Location>,
	},

	#[error("failure parsing template {resource}: {source}")]
	#[diagnostic(code(tml::parse))]
	Parse {
		resource: ResourceId,
		location: Location,
		source: Box<dyn std::error::Error + Send + Sync>,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tml::config_parse),
		help("check that tml.toml is valid TOML with an optional [entities] section")
	)]
	ConfigParse(String),
}

impl TemplateError {
	/// The best-known location of the failure, when it has one.
	pub fn location(&self) -> Option<&Location> {
		match self {
			Self::GrammarViolation { location, .. }
			| Self::MissingRequiredAttribute { location, .. }
			| Self::InvalidIdentifier { location, .. }
			| Self::InvalidNamespacePath { location, .. }
			| Self::UnsupportedAttribute { location, .. }
			| Self::MixinsWithoutIdentity { location, .. }
			| Self::DuplicateComponentId { location, .. }
			| Self::Parse { location, .. } => Some(location),
			Self::ResourceAccess { location, .. } => location.as_ref(),
			Self::Io(_) | Self::ConfigParse(_) => None,
		}
	}
}

fn unsupported_attribute_message(
	element: &str,
	attribute: &str,
	allowed: Option<&str>,
	location: &Location,
) -> String {
	match allowed {
		Some(allowed) => {
			format!(
				"element <{element}> does not support an attribute named `{attribute}`; the only \
				 allowed attribute name is `{allowed}` ({location})"
			)
		}
		None => format!("element <{element}> does not allow attributes, found `{attribute}` ({location})"),
	}
}

/// The individual placement rules whose violation is a
/// [`TemplateError::GrammarViolation`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GrammarRule {
	/// Element or text content inside `<body>`.
	ContentInsideBody,
	/// A child of `<extend>` other than `<replace>`.
	ExtendChildNotReplace,
	/// A construct that may only be the root element of a template.
	MustBeRoot(String),
	NestedContent,
	NestedExtensionPoint,
	/// `<replace>` outside of `<extend>`, or after sibling content.
	ReplaceOutsideExtend,
	/// A block parameter that is not directly within a component.
	ParameterOutsideComponent,
}

impl Display for GrammarRule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::ContentInsideBody => write!(f, "content inside a <body> element is not allowed"),
			Self::ExtendChildNotReplace => write!(f, "child element of <extend> must be <replace>"),
			Self::MustBeRoot(name) => {
				write!(f, "element <{name}> is only valid as the root element of a template")
			}
			Self::NestedContent => {
				write!(f, "the <content> element may not be nested within another <content> element")
			}
			Self::NestedExtensionPoint => {
				write!(
					f,
					"the <extension-point> element may not be nested within another \
					 <extension-point> element"
				)
			}
			Self::ReplaceOutsideExtend => {
				write!(f, "the <replace> element may only appear directly within an extend element")
			}
			Self::ParameterOutsideComponent => {
				write!(f, "block parameters are only allowed directly within component elements")
			}
		}
	}
}

/// What kind of id failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
	Component,
	Block,
}

impl Display for IdKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Component => write!(f, "component"),
			Self::Block => write!(f, "block"),
		}
	}
}

pub type TemplateResult<T> = Result<T, TemplateError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

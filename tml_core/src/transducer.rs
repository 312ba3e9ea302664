//! The template transducer: a push-driven state machine that turns markup
//! [`Event`]s into the token sequence of a [`ComponentTemplate`].
//!
//! All scoped state lives in a single stack of [`Frame`]s, one per open
//! element. A frame records the whitespace-compression setting in effect for
//! the element's content, whether the element counts as a component for the
//! purpose of nesting block parameters, and what kind of region the element
//! opened. Regions that redirect output (`extension-point`, `replace`) keep
//! the outer token sequence in the frame and restore it when they close.

use std::mem;

use tracing::trace;

use crate::ComponentTemplate;
use crate::GrammarRule;
use crate::IdKind;
use crate::IdMap;
use crate::Location;
use crate::ResourceId;
use crate::TemplateError;
use crate::TemplateResult;
use crate::event::Attribute;
use crate::event::Event;
use crate::lexer::TextPiece;
use crate::lexer::compress_whitespace;
use crate::lexer::is_blank;
use crate::lexer::scan_expansions;
use crate::tokens::Token;

pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The 5.0 template namespace.
pub const TEMPLATE_SCHEMA_5_0: &str = "http://tapestry.apache.org/schema/tapestry_5_0_0.xsd";

/// Adds `remove`, `content`, `extension-point`, `extend` and `replace`.
pub const TEMPLATE_SCHEMA_5_1: &str = "http://tapestry.apache.org/schema/tapestry_5_1_0.xsd";

/// Elements in this namespace declare a block parameter named by the element's
/// local name.
pub const PARAMETER_NAMESPACE_URI: &str = "tapestry:parameter";

/// The remainder of a namespace URI with this prefix is a library path that
/// qualifies the component type named by the element.
pub const LIBRARY_NAMESPACE_PREFIX: &str = "tapestry-library:";

pub fn is_template_namespace(uri: &str) -> bool {
	uri == TEMPLATE_SCHEMA_5_0 || uri == TEMPLATE_SCHEMA_5_1
}

/// `[a-z]\w*`, ignoring case.
pub fn is_identifier(value: &str) -> bool {
	let mut chars = value.chars();

	chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
		&& chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// One or more identifiers separated by `/`.
pub fn is_library_path(path: &str) -> bool {
	path.split('/').all(is_identifier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
	Remove,
	Content,
	ExtensionPoint,
	Extend,
	Replace,
	Body,
	Block,
	Parameter,
	Container,
}

impl Construct {
	fn lookup(namespace: &str, local_name: &str) -> Option<Self> {
		let is = |name: &str| local_name.eq_ignore_ascii_case(name);

		if namespace == TEMPLATE_SCHEMA_5_1 {
			if is("remove") {
				return Some(Self::Remove);
			}
			if is("content") {
				return Some(Self::Content);
			}
			if is("extension-point") {
				return Some(Self::ExtensionPoint);
			}
			if is("extend") {
				return Some(Self::Extend);
			}
			if is("replace") {
				return Some(Self::Replace);
			}
		} else if namespace != TEMPLATE_SCHEMA_5_0 {
			return None;
		}

		if is("body") {
			Some(Self::Body)
		} else if is("block") {
			Some(Self::Block)
		} else if is("parameter") {
			Some(Self::Parameter)
		} else if is("container") {
			Some(Self::Container)
		} else {
			None
		}
	}
}

#[derive(Debug)]
enum Region {
	/// Ordinary elements, components, blocks and parameters. Closing emits an
	/// [`Token::EndElement`].
	Element,
	Body,
	Remove,
	/// Any element nested inside `<remove>`.
	Removed,
	Content,
	ExtensionPoint { id: String, saved: Vec<Token> },
	Extend,
	Replace { id: String, saved: Vec<Token> },
	Container,
}

#[derive(Debug)]
struct Frame {
	compress_whitespace: bool,
	component: bool,
	region: Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentState {
	OutsideContent,
	InContent,
	/// Terminal: every later event is ignored.
	AfterContent,
}

/// Consumes the events of one template and produces its
/// [`ComponentTemplate`]. A transducer is single use.
#[derive(Debug)]
pub struct Transducer {
	resource: ResourceId,
	default_compress_whitespace: bool,
	/// The active output sequence.
	tokens: Vec<Token>,
	overrides: Option<IdMap<Vec<Token>>>,
	component_ids: IdMap<Location>,
	extension: bool,
	frames: Vec<Frame>,
	content: ContentState,
	in_dtd: bool,
	/// Namespace declarations waiting for the next start token.
	pending_prefixes: Vec<Token>,
	text: String,
	text_location: Option<Location>,
	line: Option<usize>,
	cached_location: Option<Location>,
}

impl Transducer {
	pub fn new(resource: ResourceId, compress_whitespace: bool) -> Self {
		Self {
			resource,
			default_compress_whitespace: compress_whitespace,
			tokens: Vec::new(),
			overrides: None,
			component_ids: IdMap::new(),
			extension: false,
			frames: Vec::new(),
			content: ContentState::OutsideContent,
			in_dtd: false,
			pending_prefixes: Vec::new(),
			text: String::new(),
			text_location: None,
			line: None,
			cached_location: None,
		}
	}

	/// Feed a single event that begins at `line`.
	pub fn handle(&mut self, event: Event, line: Option<usize>) -> TemplateResult<()> {
		self.line = line;

		match event {
			Event::DocumentStart | Event::DocumentEnd => Ok(()),
			Event::ElementStart {
				namespace,
				local_name,
				attributes,
			} => self.start_element(namespace, local_name, attributes),
			Event::ElementEnd { .. } => {
				self.end_element();
				Ok(())
			}
			Event::Text(text) => self.characters(&text),
			Event::Comment(comment) => {
				self.comment(&comment);
				Ok(())
			}
			Event::CdataStart => {
				self.start_cdata();
				Ok(())
			}
			Event::CdataEnd => {
				self.end_cdata();
				Ok(())
			}
			Event::DtdStart {
				name,
				public_id,
				system_id,
			} => {
				let location = self.location();
				self.tokens.push(Token::Dtd {
					name,
					public_id,
					system_id,
					location,
				});
				self.in_dtd = true;
				Ok(())
			}
			Event::DtdEnd => {
				self.in_dtd = false;
				Ok(())
			}
			Event::PrefixMapping { prefix, uri } => {
				self.prefix_mapping(prefix, uri);
				Ok(())
			}
		}
	}

	/// Flush any trailing text and hand over the parsed template.
	pub fn finish(mut self) -> ComponentTemplate {
		self.flush_text();

		ComponentTemplate::new(
			self.resource,
			self.tokens,
			self.component_ids,
			self.extension,
			self.overrides,
		)
	}

	fn location(&mut self) -> Location {
		match &self.cached_location {
			Some(location) if location.line == self.line => location.clone(),
			_ => {
				let location = Location::new(self.resource.clone(), self.line);
				self.cached_location = Some(location.clone());
				location
			}
		}
	}

	fn grammar(&mut self, rule: GrammarRule) -> TemplateError {
		TemplateError::GrammarViolation {
			rule,
			location: self.location(),
		}
	}

	fn is_removing(&self) -> bool {
		self.frames
			.last()
			.is_some_and(|frame| matches!(frame.region, Region::Remove | Region::Removed))
	}

	fn is_suppressed(&self) -> bool {
		self.in_dtd || self.content == ContentState::AfterContent || self.is_removing()
	}

	fn in_body(&self) -> bool {
		self.frames
			.last()
			.is_some_and(|frame| matches!(frame.region, Region::Body))
	}

	fn in_replace(&self) -> bool {
		self.frames
			.iter()
			.any(|frame| matches!(frame.region, Region::Replace { .. }))
	}

	fn compress_whitespace(&self) -> bool {
		self.frames
			.last()
			.map_or(self.default_compress_whitespace, |frame| frame.compress_whitespace)
	}

	fn inside_component(&self) -> bool {
		self.frames.last().is_some_and(|frame| frame.component)
	}

	fn overrides_mut(&mut self) -> &mut IdMap<Vec<Token>> {
		self.overrides.get_or_insert_with(IdMap::new)
	}

	fn push_frame(&mut self, region: Region, compress_whitespace: bool, component: bool) {
		self.frames.push(Frame {
			compress_whitespace,
			component,
			region,
		});
	}

	/// Push a frame for a construct that produces no start token; it is as
	/// much inside a component as its parent is.
	fn push_transparent_frame(&mut self, region: Region, compress_whitespace: bool) {
		let component = self.inside_component();
		self.push_frame(region, compress_whitespace, component);
	}

	fn start_element(
		&mut self,
		namespace: Option<String>,
		local_name: String,
		attributes: Vec<Attribute>,
	) -> TemplateResult<()> {
		if self.content == ContentState::AfterContent || self.in_dtd {
			return Ok(());
		}

		if self.is_removing() {
			self.push_frame(Region::Removed, self.compress_whitespace(), false);
			return Ok(());
		}

		if self.in_body() {
			return Err(self.grammar(GrammarRule::ContentInsideBody));
		}

		let is_template = namespace.as_deref().is_some_and(is_template_namespace);

		if self.extension
			&& !self.in_replace()
			&& !(is_template && local_name.eq_ignore_ascii_case("replace"))
		{
			return Err(self.grammar(GrammarRule::ExtendChildNotReplace));
		}

		self.flush_text();

		let compress_whitespace = xml_space(&attributes).unwrap_or(self.compress_whitespace());

		let Some(uri) = namespace.as_deref() else {
			return self.possible_component(
				attributes,
				Some(local_name),
				None,
				None,
				compress_whitespace,
			);
		};

		if let Some(construct) = Construct::lookup(uri, &local_name) {
			trace!(?construct, line = ?self.line, "opening template construct");
			return self.open_construct(construct, &local_name, &attributes, compress_whitespace);
		}

		if is_template {
			let component_type = local_name.replace('.', "/");
			return self.possible_component(
				attributes,
				None,
				namespace,
				Some(component_type),
				compress_whitespace,
			);
		}

		if uri == PARAMETER_NAMESPACE_URI {
			self.ensure_parameter_within_component()?;

			if let Some(attribute) = attributes.first() {
				return Err(TemplateError::UnsupportedAttribute {
					element: local_name,
					attribute: attribute.local_name.clone(),
					allowed: None,
					location: self.location(),
				});
			}

			let location = self.location();
			self.tokens.push(Token::Parameter {
				name: local_name,
				location,
			});
			self.push_frame(Region::Element, compress_whitespace, false);

			return Ok(());
		}

		if let Some(path) = uri.strip_prefix(LIBRARY_NAMESPACE_PREFIX) {
			if !is_library_path(path) {
				return Err(TemplateError::InvalidNamespacePath {
					uri: uri.to_string(),
					location: self.location(),
				});
			}

			let component_type = format!("{path}/{local_name}");
			return self.possible_component(
				attributes,
				None,
				namespace,
				Some(component_type),
				compress_whitespace,
			);
		}

		self.possible_component(
			attributes,
			Some(local_name),
			namespace,
			None,
			compress_whitespace,
		)
	}

	fn open_construct(
		&mut self,
		construct: Construct,
		local_name: &str,
		attributes: &[Attribute],
		compress_whitespace: bool,
	) -> TemplateResult<()> {
		match construct {
			Construct::Remove => {
				self.push_frame(Region::Remove, compress_whitespace, false);
			}
			Construct::Content => {
				if self.content == ContentState::InContent {
					return Err(self.grammar(GrammarRule::NestedContent));
				}

				self.content = ContentState::InContent;
				self.tokens.clear();
				self.component_ids = IdMap::new();
				self.push_transparent_frame(Region::Content, compress_whitespace);
			}
			Construct::ExtensionPoint => {
				let id = self.required_id(local_name, attributes)?;

				if self
					.frames
					.iter()
					.any(|frame| matches!(frame.region, Region::ExtensionPoint { .. }))
				{
					return Err(self.grammar(GrammarRule::NestedExtensionPoint));
				}

				let location = self.location();
				self.tokens.push(Token::ExtensionPoint {
					id: id.clone(),
					location,
				});
				self.overrides_mut().insert(id.as_str(), Vec::new());
				let saved = mem::take(&mut self.tokens);
				self.push_transparent_frame(Region::ExtensionPoint { id, saved }, compress_whitespace);
			}
			Construct::Extend => {
				self.must_be_root(local_name)?;
				self.extension = true;
				self.push_transparent_frame(Region::Extend, compress_whitespace);
			}
			Construct::Replace => {
				let directly_in_extend = self
					.frames
					.last()
					.is_some_and(|frame| matches!(frame.region, Region::Extend));

				if !self.extension || !directly_in_extend || self.has_non_dtd_tokens() {
					return Err(self.grammar(GrammarRule::ReplaceOutsideExtend));
				}

				let id = self.required_id(local_name, attributes)?;
				self.overrides_mut().insert(id.as_str(), Vec::new());
				let saved = mem::take(&mut self.tokens);
				self.push_transparent_frame(Region::Replace { id, saved }, compress_whitespace);
			}
			Construct::Body => {
				let location = self.location();
				self.tokens.push(Token::Body { location });
				self.push_transparent_frame(Region::Body, compress_whitespace);
			}
			Construct::Block => {
				let id = self.single_attribute(local_name, attributes, "id")?;
				let Some(id) = id.filter(|id| !is_blank(id)) else {
					return Err(self.missing_attribute(local_name, "id"));
				};

				self.validate_id(&id, IdKind::Block)?;

				let location = self.location();
				self.tokens.push(Token::Block { id, location });
				self.push_frame(Region::Element, compress_whitespace, false);
			}
			Construct::Parameter => {
				let name = self.single_attribute(local_name, attributes, "name")?;
				let Some(name) = name.filter(|name| !is_blank(name)) else {
					return Err(self.missing_attribute(local_name, "name"));
				};

				self.ensure_parameter_within_component()?;

				let location = self.location();
				self.tokens.push(Token::Parameter { name, location });
				self.push_frame(Region::Element, compress_whitespace, false);
			}
			Construct::Container => {
				self.must_be_root(local_name)?;
				self.push_transparent_frame(Region::Container, compress_whitespace);
			}
		}

		Ok(())
	}

	/// Emit a start token for an element that may or may not be a component,
	/// depending on its reserved `id` and `type` attributes.
	fn possible_component(
		&mut self,
		attributes: Vec<Attribute>,
		element_name: Option<String>,
		namespace: Option<String>,
		identified_type: Option<String>,
		compress_whitespace: bool,
	) -> TemplateResult<()> {
		let location = self.location();
		let mut id = None;
		let mut component_type = identified_type;
		let mut mixins = None;
		let mut attribute_tokens = Vec::with_capacity(attributes.len());

		for attribute in attributes {
			if is_blank(&attribute.local_name) || is_xml_space(&attribute) {
				continue;
			}

			if attribute
				.namespace
				.as_deref()
				.is_some_and(is_template_namespace)
			{
				let name = attribute.local_name.as_str();

				if name.eq_ignore_ascii_case("id") {
					id = non_blank(attribute.value);
					if let Some(id) = &id {
						self.validate_id(id, IdKind::Component)?;
					}
					continue;
				}

				if component_type.is_none() && name.eq_ignore_ascii_case("type") {
					component_type = non_blank(attribute.value);
					continue;
				}

				if name.eq_ignore_ascii_case("mixins") {
					mixins = non_blank(attribute.value);
					continue;
				}

				// Any other reserved attribute is a component parameter.
			}

			attribute_tokens.push(Token::Attribute {
				namespace: attribute.namespace,
				name: attribute.local_name,
				value: attribute.value,
				location: location.clone(),
			});
		}

		let is_component = id.is_some() || component_type.is_some();

		if mixins.is_some() && !is_component {
			return Err(TemplateError::MixinsWithoutIdentity {
				element: element_name,
				location,
			});
		}

		if let Some(id) = &id {
			if let Some(first) = self.component_ids.get(id) {
				return Err(TemplateError::DuplicateComponentId {
					id: id.clone(),
					first: first.clone(),
					location,
				});
			}

			self.component_ids.insert(id.as_str(), location.clone());
		}

		let start = if is_component {
			Token::StartComponent {
				element_name,
				id,
				component_type,
				mixins,
				location,
			}
		} else {
			Token::StartElement {
				namespace,
				name: element_name,
				location,
			}
		};

		self.tokens.push(start);
		self.tokens.append(&mut self.pending_prefixes);
		self.tokens.extend(attribute_tokens);
		self.push_frame(Region::Element, compress_whitespace, is_component);

		Ok(())
	}

	fn end_element(&mut self) {
		if self.content == ContentState::AfterContent || self.in_dtd {
			return;
		}

		self.flush_text();

		let Some(frame) = self.frames.pop() else {
			return;
		};

		match frame.region {
			Region::Element => {
				let location = self.location();
				self.tokens.push(Token::EndElement { location });
			}
			Region::Content => {
				self.content = ContentState::AfterContent;
			}
			Region::ExtensionPoint { id, saved } | Region::Replace { id, saved } => {
				let collected = mem::replace(&mut self.tokens, saved);
				self.overrides_mut().insert(id, collected);
			}
			Region::Body | Region::Remove | Region::Removed | Region::Extend | Region::Container => {}
		}
	}

	fn characters(&mut self, text: &str) -> TemplateResult<()> {
		if self.is_suppressed() {
			return Ok(());
		}

		if self.in_body() {
			return Err(self.grammar(GrammarRule::ContentInsideBody));
		}

		if self.text_location.is_none() {
			self.text_location = Some(self.location());
		}

		self.text.push_str(text);

		Ok(())
	}

	fn comment(&mut self, comment: &str) {
		if self.is_suppressed() {
			return;
		}

		self.flush_text();

		let location = self.location();
		self.tokens.push(Token::Comment {
			comment: comment.trim().to_string(),
			location,
		});
	}

	fn start_cdata(&mut self) {
		if self.is_suppressed() {
			return;
		}

		self.flush_text();
		self.text_location = Some(self.location());
	}

	fn end_cdata(&mut self) {
		if self.is_suppressed() {
			return;
		}

		let location = match self.text_location.take() {
			Some(location) => location,
			None => self.location(),
		};

		self.tokens.push(Token::Cdata {
			content: mem::take(&mut self.text),
			location,
		});
	}

	fn prefix_mapping(&mut self, prefix: String, uri: String) {
		if self.is_suppressed()
			|| is_blank(&uri)
			|| is_template_namespace(&uri)
			|| uri == PARAMETER_NAMESPACE_URI
			|| uri.starts_with(LIBRARY_NAMESPACE_PREFIX)
		{
			return;
		}

		let location = self.location();
		self.pending_prefixes.push(Token::DefineNamespacePrefix {
			namespace: uri,
			prefix,
			location,
		});
	}

	/// Convert buffered character data into text and expansion tokens, all
	/// sharing the location where the buffer started.
	fn flush_text(&mut self) {
		let location = self.text_location.take();

		if self.text.is_empty() {
			return;
		}

		let mut text = mem::take(&mut self.text);

		if self.compress_whitespace() {
			text = compress_whitespace(&text);

			if is_blank(&text) {
				return;
			}
		}

		let location = match location {
			Some(location) => location,
			None => self.location(),
		};

		for piece in scan_expansions(&text) {
			let token = match piece {
				TextPiece::Literal(literal) => {
					Token::Text {
						text: literal.to_string(),
						location: location.clone(),
					}
				}
				TextPiece::Expansion(expression) => {
					Token::Expansion {
						expression: expression.to_string(),
						location: location.clone(),
					}
				}
			};
			self.tokens.push(token);
		}
	}

	fn has_non_dtd_tokens(&self) -> bool {
		self.tokens
			.iter()
			.any(|token| !matches!(token, Token::Dtd { .. }))
	}

	fn must_be_root(&mut self, name: &str) -> TemplateResult<()> {
		if self.has_non_dtd_tokens() {
			return Err(self.grammar(GrammarRule::MustBeRoot(name.to_string())));
		}

		Ok(())
	}

	fn ensure_parameter_within_component(&mut self) -> TemplateResult<()> {
		if self.inside_component() {
			Ok(())
		} else {
			Err(self.grammar(GrammarRule::ParameterOutsideComponent))
		}
	}

	fn validate_id(&mut self, id: &str, kind: IdKind) -> TemplateResult<()> {
		if is_identifier(id) {
			return Ok(());
		}

		Err(TemplateError::InvalidIdentifier {
			kind,
			id: id.to_string(),
			location: self.location(),
		})
	}

	fn missing_attribute(&mut self, element: &str, attribute: &str) -> TemplateError {
		TemplateError::MissingRequiredAttribute {
			element: element.to_string(),
			attribute: attribute.to_string(),
			location: self.location(),
		}
	}

	/// The value of the only attribute a construct accepts. Any other
	/// attribute (besides `xml:space`) is an error.
	fn single_attribute(
		&mut self,
		element: &str,
		attributes: &[Attribute],
		name: &str,
	) -> TemplateResult<Option<String>> {
		let mut result = None;

		for attribute in attributes {
			if is_xml_space(attribute) {
				continue;
			}

			if attribute.local_name.eq_ignore_ascii_case(name) {
				result = Some(attribute.value.clone());
			} else {
				return Err(TemplateError::UnsupportedAttribute {
					element: element.to_string(),
					attribute: attribute.local_name.clone(),
					allowed: Some(name.to_string()),
					location: self.location(),
				});
			}
		}

		Ok(result)
	}

	fn required_id(&mut self, element: &str, attributes: &[Attribute]) -> TemplateResult<String> {
		match self.single_attribute(element, attributes, "id")? {
			Some(id) if !is_blank(&id) => Ok(id),
			_ => Err(self.missing_attribute(element, "id")),
		}
	}
}

fn is_xml_space(attribute: &Attribute) -> bool {
	attribute.is_in(XML_NAMESPACE_URI) && attribute.local_name == "space"
}

/// The compression setting requested by an `xml:space` attribute, if any.
fn xml_space(attributes: &[Attribute]) -> Option<bool> {
	attributes
		.iter()
		.find(|attribute| is_xml_space(attribute))
		.map(|attribute| attribute.value != "preserve")
}

fn non_blank(value: String) -> Option<String> {
	if is_blank(&value) { None } else { Some(value) }
}

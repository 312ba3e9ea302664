//! An [`EventSource`] over XML text, built on `quick-xml`'s namespace-aware
//! reader.

use std::borrow::Cow;
use std::collections::VecDeque;

use quick_xml::NsReader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::escape::unescape_with;
use quick_xml::events::BytesStart;
use quick_xml::events::Event as XmlEvent;
use quick_xml::name::PrefixDeclaration;
use quick_xml::name::ResolveResult;
use tracing::debug;

use crate::EntityResolver;
use crate::EntityTable;
use crate::Location;
use crate::ResourceId;
use crate::TemplateError;
use crate::TemplateResult;
use crate::entities::parse_doctype;
use crate::event::Attribute;
use crate::event::Event;
use crate::event::EventSource;
use crate::transducer::XML_NAMESPACE_URI;

fn lossy(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).into_owned()
}

/// Detach a resolved namespace from the reader. An unknown prefix is returned
/// as the error.
fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>, Vec<u8>> {
	match resolved {
		ResolveResult::Bound(namespace) => Ok(Some(lossy(namespace.as_ref()))),
		ResolveResult::Unbound => Ok(None),
		ResolveResult::Unknown(prefix) if prefix == b"xml" => Ok(Some(XML_NAMESPACE_URI.to_string())),
		ResolveResult::Unknown(prefix) => Err(prefix),
	}
}

/// Attribute-value normalization: every literal line break, carriage return
/// or tab becomes a space. Character references are expanded afterwards, so
/// `&#10;` still yields a line feed.
fn normalize_attribute_value(raw: &str) -> String {
	raw.replace("\r\n", "\n")
		.replace(['\t', '\r', '\n'], " ")
}

/// Reads a complete XML document from memory and reports it as structural
/// [`Event`]s.
///
/// Namespace declarations become [`Event::PrefixMapping`]s ahead of the
/// declaring element, empty elements are reported as a start/end pair and
/// entity references are expanded using the predefined XML entities plus any
/// entity declared in the document's DTDs.
pub struct XmlEventSource<'a> {
	reader: NsReader<&'a [u8]>,
	input: &'a str,
	resource: ResourceId,
	resolver: &'a EntityResolver,
	entities: EntityTable,
	pending: VecDeque<(Option<usize>, Event)>,
	line: Option<usize>,
	/// Byte offset up to which newlines have been counted, and the line
	/// number at that offset.
	counted: (usize, usize),
	started: bool,
	finished: bool,
}

impl<'a> XmlEventSource<'a> {
	pub fn new(input: &'a str, resource: ResourceId, resolver: &'a EntityResolver) -> Self {
		let mut reader = NsReader::from_str(input);
		let config = reader.config_mut();
		config.trim_text(false);
		config.expand_empty_elements = true;

		Self {
			reader,
			input,
			resource,
			resolver,
			entities: EntityTable::new(),
			pending: VecDeque::new(),
			line: None,
			counted: (0, 1),
			started: false,
			finished: false,
		}
	}

	/// The 1-based line containing byte `position`. Positions never move
	/// backwards, so lines are counted incrementally.
	fn line_at(&mut self, position: impl TryInto<usize>) -> usize {
		let position = position
			.try_into()
			.unwrap_or(usize::MAX)
			.min(self.input.len());
		let (offset, line) = self.counted;

		if position <= offset {
			return line;
		}

		let newlines = self.input.as_bytes()[offset..position]
			.iter()
			.filter(|&&byte| byte == b'\n')
			.count();
		self.counted = (position, line + newlines);

		line + newlines
	}

	fn parse_error(
		&self,
		error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
		line: Option<usize>,
	) -> TemplateError {
		TemplateError::Parse {
			resource: self.resource.clone(),
			location: Location::new(self.resource.clone(), line),
			source: error.into(),
		}
	}

	fn unbound_prefix(&self, prefix: &[u8], line: Option<usize>) -> TemplateError {
		self.parse_error(
			format!("the namespace prefix `{}` is not bound", String::from_utf8_lossy(prefix)),
			line,
		)
	}

	/// Expand character and entity references.
	fn unescape(&self, raw: &str, line: Option<usize>) -> TemplateResult<String> {
		let entities = &self.entities;

		unescape_with(raw, |entity| {
			resolve_predefined_entity(entity).or_else(|| entities.get(entity))
		})
		.map(Cow::into_owned)
		.map_err(|error| self.parse_error(error, line))
	}

	fn start_element(
		&mut self,
		namespace: Option<String>,
		element: &BytesStart<'_>,
		line: Option<usize>,
	) -> TemplateResult<()> {
		let mut attributes = Vec::new();

		for attribute in element.attributes() {
			let attribute = attribute.map_err(|error| self.parse_error(error, line))?;
			let raw = normalize_attribute_value(&String::from_utf8_lossy(&attribute.value));
			let value = self.unescape(&raw, line)?;

			if let Some(binding) = attribute.key.as_namespace_binding() {
				let prefix = match binding {
					PrefixDeclaration::Default => String::new(),
					PrefixDeclaration::Named(prefix) => lossy(prefix),
				};
				self.pending
					.push_back((line, Event::PrefixMapping { prefix, uri: value }));
				continue;
			}

			let (resolved, local_name) = self.reader.resolve_attribute(attribute.key);
			let namespace = owned_namespace(resolved)
				.map_err(|prefix| self.unbound_prefix(&prefix, line))?;

			attributes.push(Attribute {
				namespace,
				local_name: lossy(local_name.as_ref()),
				value,
			});
		}

		self.pending.push_back((
			line,
			Event::ElementStart {
				namespace,
				local_name: lossy(element.local_name().as_ref()),
				attributes,
			},
		));

		Ok(())
	}

	/// Attach the DOCTYPE location to a resource failure raised while loading
	/// its DTDs.
	fn at_doctype(&self, error: TemplateError, line: Option<usize>) -> TemplateError {
		match error {
			TemplateError::ResourceAccess {
				public_id,
				path,
				source,
				location: None,
			} => {
				TemplateError::ResourceAccess {
					public_id,
					path,
					source,
					location: Some(Location::new(self.resource.clone(), line)),
				}
			}
			error => error,
		}
	}

	fn doctype(&mut self, content: &str, line: Option<usize>) -> TemplateResult<()> {
		let doctype = parse_doctype(content);

		if let Some(subset) = doctype.internal_subset {
			self.entities
				.harvest(subset, self.resolver)
				.map_err(|error| self.at_doctype(error, line))?;
		}

		if let Some(public_id) = doctype.public_id {
			let loaded = self
				.entities
				.load_public(public_id, self.resolver)
				.map_err(|error| self.at_doctype(error, line))?;

			if !loaded {
				debug!(public_id, resource = %self.resource, "external DTD not available locally");
			}
		}

		self.pending.push_back((
			line,
			Event::DtdStart {
				name: doctype.name.to_string(),
				public_id: doctype.public_id.map(str::to_string),
				system_id: doctype.system_id.map(str::to_string),
			},
		));
		self.pending.push_back((line, Event::DtdEnd));

		Ok(())
	}

	/// Read one markup event from the document, queueing the structural
	/// events it produces.
	fn read(&mut self) -> TemplateResult<()> {
		if !self.started {
			self.started = true;
			self.pending.push_back((Some(1), Event::DocumentStart));
			return Ok(());
		}

		let line = Some(self.line_at(self.reader.buffer_position()));
		let result = self
			.reader
			.read_resolved_event()
			.map(|(resolved, event)| (owned_namespace(resolved), event));
		let (namespace, event) = match result {
			Ok(result) => result,
			Err(error) => {
				let line = Some(self.line_at(self.reader.buffer_position()));
				return Err(self.parse_error(error, line));
			}
		};
		let namespace = namespace.map_err(|prefix| self.unbound_prefix(&prefix, line))?;

		match event {
			XmlEvent::Start(element) => self.start_element(namespace, &element, line)?,
			XmlEvent::Empty(element) => {
				let local_name = lossy(element.local_name().as_ref());
				self.start_element(namespace.clone(), &element, line)?;
				self.pending
					.push_back((line, Event::ElementEnd { namespace, local_name }));
			}
			XmlEvent::End(element) => {
				self.pending.push_back((
					line,
					Event::ElementEnd {
						namespace,
						local_name: lossy(element.local_name().as_ref()),
					},
				));
			}
			XmlEvent::Text(text) => {
				let text = self.unescape(&String::from_utf8_lossy(&text), line)?;
				if !text.is_empty() {
					self.pending.push_back((line, Event::Text(text)));
				}
			}
			XmlEvent::CData(content) => {
				self.pending.push_back((line, Event::CdataStart));
				self.pending.push_back((line, Event::Text(lossy(&content))));
				self.pending.push_back((line, Event::CdataEnd));
			}
			XmlEvent::Comment(comment) => {
				self.pending.push_back((line, Event::Comment(lossy(&comment))));
			}
			XmlEvent::DocType(content) => {
				let content = String::from_utf8_lossy(&content).into_owned();
				self.doctype(&content, line)?;
			}
			XmlEvent::Decl(_) | XmlEvent::PI(_) => {}
			XmlEvent::Eof => {
				self.finished = true;
				self.pending.push_back((line, Event::DocumentEnd));
			}
		}

		Ok(())
	}
}

impl EventSource for XmlEventSource<'_> {
	fn next_event(&mut self) -> TemplateResult<Option<Event>> {
		loop {
			if let Some((line, event)) = self.pending.pop_front() {
				self.line = line;
				return Ok(Some(event));
			}

			if self.finished {
				return Ok(None);
			}

			self.read()?;
		}
	}

	fn line(&self) -> Option<usize> {
		self.line
	}
}

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use logos::Logos;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::escape::unescape_with;
use tracing::debug;

use crate::TemplateError;
use crate::TemplateResult;

/// The standard XHTML 1.0 document types and entity sets, as
/// `(public identifier, file name)` pairs. The HTML 4.01 document types share
/// the XHTML files.
pub const XHTML_PUBLIC_IDS: [(&str, &str); 9] = [
	("-//W3C//DTD XHTML 1.0 Strict//EN", "xhtml1-strict.dtd"),
	("-//W3C//DTD XHTML 1.0 Transitional//EN", "xhtml1-transitional.dtd"),
	("-//W3C//DTD XHTML 1.0 Frameset//EN", "xhtml1-frameset.dtd"),
	("-//W3C//DTD HTML 4.01//EN", "xhtml1-strict.dtd"),
	("-//W3C//DTD HTML 4.01 Transitional//EN", "xhtml1-transitional.dtd"),
	("-//W3C//DTD HTML 4.01 Frameset//EN", "xhtml1-frameset.dtd"),
	("-//W3C//ENTITIES Latin 1 for XHTML//EN", "xhtml-lat1.ent"),
	("-//W3C//ENTITIES Symbols for XHTML//EN", "xhtml-symbol.ent"),
	("-//W3C//ENTITIES Special for XHTML//EN", "xhtml-special.ent"),
];

/// Copies of the standard files compiled into the crate, keyed by file name.
const BUNDLED_FILES: [(&str, &str); 6] = [
	("xhtml1-strict.dtd", include_str!("../dtd/xhtml1-strict.dtd")),
	("xhtml1-transitional.dtd", include_str!("../dtd/xhtml1-transitional.dtd")),
	("xhtml1-frameset.dtd", include_str!("../dtd/xhtml1-frameset.dtd")),
	("xhtml-lat1.ent", include_str!("../dtd/xhtml-lat1.ent")),
	("xhtml-symbol.ent", include_str!("../dtd/xhtml-symbol.ent")),
	("xhtml-special.ent", include_str!("../dtd/xhtml-special.ent")),
];

fn bundled_file(file: &str) -> Option<&'static str> {
	BUNDLED_FILES
		.iter()
		.find(|(name, _)| *name == file)
		.map(|(_, content)| *content)
}

/// External DTDs may pull in further DTDs through parameter entities; stop
/// following them past this depth.
const MAX_DTD_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resource {
	Bundled(&'static str),
	File(PathBuf),
}

/// Maps public identifiers of DTDs and entity sets to their content, so that
/// well-known document types never need to be fetched.
///
/// The default resolver serves the standard XHTML table from copies bundled
/// with the crate. Immutable once built; share it between parses behind an
/// [`Arc`](std::sync::Arc).
#[derive(Debug, Clone)]
pub struct EntityResolver {
	resources: HashMap<String, Resource>,
}

impl Default for EntityResolver {
	fn default() -> Self {
		Self::bundled()
	}
}

impl EntityResolver {
	/// A resolver that knows no public identifiers.
	pub fn empty() -> Self {
		Self {
			resources: HashMap::new(),
		}
	}

	/// The standard XHTML table, served from the copies bundled with the
	/// crate.
	pub fn bundled() -> Self {
		let resources = XHTML_PUBLIC_IDS
			.iter()
			.filter_map(|(public_id, file)| {
				bundled_file(file).map(|content| (public_id.to_string(), Resource::Bundled(content)))
			})
			.collect();

		Self { resources }
	}

	/// The standard XHTML table, with the files found in `dir`.
	pub fn xhtml(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();

		XHTML_PUBLIC_IDS
			.iter()
			.fold(Self::empty(), |resolver, (public_id, file)| {
				resolver.with_resource(*public_id, dir.join(file))
			})
	}

	/// Register (or replace) the file for `public_id`.
	#[must_use]
	pub fn with_resource(mut self, public_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
		self.resources
			.insert(public_id.into(), Resource::File(path.into()));
		self
	}

	pub fn contains(&self, public_id: &str) -> bool {
		self.resources.contains_key(public_id)
	}

	/// The file registered for `public_id`. Bundled resources have none.
	pub fn path(&self, public_id: &str) -> Option<&Path> {
		match self.resources.get(public_id)? {
			Resource::File(path) => Some(path),
			Resource::Bundled(_) => None,
		}
	}

	pub fn len(&self) -> usize {
		self.resources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty()
	}

	/// The content registered for `public_id`. `Ok(None)` means the
	/// identifier is unknown and should be handled by the default mechanism.
	pub fn resolve(&self, public_id: &str) -> TemplateResult<Option<String>> {
		let path = match self.resources.get(public_id) {
			Some(Resource::Bundled(content)) => {
				debug!(public_id, "resolved public id from bundled copy");
				return Ok(Some((*content).to_string()));
			}
			Some(Resource::File(path)) => path,
			None => {
				debug!(public_id, "no local resource for public id");
				return Ok(None);
			}
		};

		match std::fs::read_to_string(path) {
			Ok(content) => {
				debug!(public_id, path = %path.display(), "resolved public id");
				Ok(Some(content))
			}
			Err(source) => {
				Err(TemplateError::ResourceAccess {
					public_id: public_id.to_string(),
					path: path.clone(),
					source,
					location: None,
				})
			}
		}
	}
}

/// Tokens of DTD markup. Only entity declarations are interpreted, every
/// other declaration is skipped as a unit.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum DtdToken {
	#[regex(r"<!--([^-]|-[^-])*-->")]
	Comment,
	#[regex(r"<\?[^?]*\?+([^?>][^?]*\?+)*>")]
	ProcessingInstruction,
	#[token("<!ENTITY")]
	Entity,
	/// `<!ELEMENT`, `<!ATTLIST`, `<!NOTATION`.
	#[regex(r"<![A-Z]+")]
	Declaration,
	#[token("<![")]
	ConditionalStart,
	#[token("]]>")]
	ConditionalEnd,
	#[token("%")]
	Percent,
	#[regex(r"%[^;% \t\r\n]+;")]
	ParameterReference,
	#[token("PUBLIC")]
	Public,
	#[token("SYSTEM")]
	System,
	#[regex(r#""[^"]*"|'[^']*'"#)]
	Literal,
	#[token("[")]
	OpenBracket,
	#[token("]")]
	CloseBracket,
	#[token(">")]
	Close,
	#[regex(r#"[^ \t\r\n<>%'"\[\]]+"#)]
	Name,
}

/// The parts of a `<!DOCTYPE ...>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Doctype<'a> {
	pub name: &'a str,
	pub public_id: Option<&'a str>,
	pub system_id: Option<&'a str>,
	pub internal_subset: Option<&'a str>,
}

fn unquote(literal: &str) -> &str {
	&literal[1..literal.len() - 1]
}

/// Split the content of a DOCTYPE declaration (everything between
/// `<!DOCTYPE` and the final `>`).
pub(crate) fn parse_doctype(content: &str) -> Doctype<'_> {
	let mut doctype = Doctype {
		name: "",
		public_id: None,
		system_id: None,
		internal_subset: None,
	};
	let mut lexer = DtdToken::lexer(content).spanned();

	while let Some((token, span)) = lexer.next() {
		match token {
			Ok(DtdToken::Name) if doctype.name.is_empty() => doctype.name = &content[span],
			Ok(DtdToken::Public) => {
				doctype.public_id = next_literal(&mut lexer, content);
				doctype.system_id = next_literal(&mut lexer, content);
			}
			Ok(DtdToken::System) => doctype.system_id = next_literal(&mut lexer, content),
			Ok(DtdToken::OpenBracket) => {
				let end = content.rfind(']').filter(|&end| end >= span.end);
				doctype.internal_subset = Some(&content[span.end..end.unwrap_or(content.len())]);
				break;
			}
			_ => {}
		}
	}

	doctype
}

fn next_literal<'s>(
	lexer: &mut logos::SpannedIter<'s, DtdToken>,
	source: &'s str,
) -> Option<&'s str> {
	match lexer.next() {
		Some((Ok(DtdToken::Literal), span)) => Some(unquote(&source[span])),
		_ => None,
	}
}

#[derive(Debug, Clone)]
enum ParameterEntity {
	Internal(String),
	External { public_id: Option<String> },
}

/// General entities declared by a document's DTDs, used to expand entity
/// references in text and attribute values.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
	general: HashMap<String, String>,
	parameters: HashMap<String, ParameterEntity>,
	loaded: HashSet<String>,
}

impl EntityTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// The replacement text of the general entity `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.general.get(name).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.general.len()
	}

	pub fn is_empty(&self) -> bool {
		self.general.is_empty()
	}

	/// Load the external DTD known as `public_id`, if the resolver has it.
	/// Returns `false` when the identifier is unknown.
	pub fn load_public(&mut self, public_id: &str, resolver: &EntityResolver) -> TemplateResult<bool> {
		self.load_public_at(public_id, resolver, 0)
	}

	/// Record the entity declarations of `dtd`, following parameter entity
	/// references through `resolver`. The first declaration of a name wins.
	pub fn harvest(&mut self, dtd: &str, resolver: &EntityResolver) -> TemplateResult<()> {
		self.harvest_at(dtd, resolver, 0)
	}

	fn load_public_at(
		&mut self,
		public_id: &str,
		resolver: &EntityResolver,
		depth: usize,
	) -> TemplateResult<bool> {
		if !self.loaded.insert(public_id.to_string()) {
			return Ok(true);
		}

		let Some(dtd) = resolver.resolve(public_id)? else {
			return Ok(false);
		};

		self.harvest_at(&dtd, resolver, depth + 1)?;
		debug!(public_id, entities = self.general.len(), "loaded external DTD");

		Ok(true)
	}

	fn harvest_at(&mut self, dtd: &str, resolver: &EntityResolver, depth: usize) -> TemplateResult<()> {
		if depth > MAX_DTD_DEPTH {
			debug!(depth, "DTD nesting too deep, ignoring further declarations");
			return Ok(());
		}

		let mut lexer = DtdToken::lexer(dtd).spanned();

		while let Some((token, span)) = lexer.next() {
			match token {
				Ok(DtdToken::Entity) => self.declare(&mut lexer, dtd),
				Ok(DtdToken::Declaration) => skip_declaration(&mut lexer),
				Ok(DtdToken::ConditionalStart) => skip_conditional(&mut lexer),
				Ok(DtdToken::ParameterReference) => {
					let name = &dtd[span.start + 1..span.end - 1];
					match self.parameters.get(name).cloned() {
						Some(ParameterEntity::Internal(value)) => {
							self.harvest_at(&value, resolver, depth + 1)?;
						}
						Some(ParameterEntity::External {
							public_id: Some(public_id),
						}) => {
							self.load_public_at(&public_id, resolver, depth)?;
						}
						_ => {}
					}
				}
				_ => {}
			}
		}

		Ok(())
	}

	/// Parse the remainder of an `<!ENTITY` declaration.
	fn declare<'a>(&mut self, lexer: &mut logos::SpannedIter<'a, DtdToken>, dtd: &'a str) {
		let mut parameter = false;
		let mut name = None;
		let mut value = None;
		let mut public_id = None;
		let mut external = false;

		while let Some((token, span)) = lexer.next() {
			match token {
				Ok(DtdToken::Percent) if name.is_none() => parameter = true,
				Ok(DtdToken::Name) if name.is_none() => name = Some(&dtd[span]),
				Ok(DtdToken::Public) => {
					external = true;
					public_id = next_literal(lexer, dtd);
				}
				Ok(DtdToken::System) => external = true,
				Ok(DtdToken::Literal) if !external && value.is_none() => {
					value = Some(unquote(&dtd[span]));
				}
				Ok(DtdToken::Close) => break,
				_ => {}
			}
		}

		let Some(name) = name else {
			return;
		};

		if parameter {
			let entity = match value {
				Some(value) if !external => ParameterEntity::Internal(value.to_string()),
				_ => {
					ParameterEntity::External {
						public_id: public_id.map(str::to_string),
					}
				}
			};
			self.parameters.entry(name.to_string()).or_insert(entity);
		} else if let Some(value) = value.filter(|_| !external) {
			let replacement = self.expand_references(value);
			self.general.entry(name.to_string()).or_insert(replacement);
		}
	}

	/// Replace character references (and references to entities already
	/// known) in an entity value. Values that cannot be expanded are kept as
	/// written.
	fn expand_references(&self, value: &str) -> String {
		unescape_with(value, |entity| {
			resolve_predefined_entity(entity).or_else(|| self.get(entity))
		})
		.map_or_else(|_| value.to_string(), Cow::into_owned)
	}
}

fn skip_declaration(lexer: &mut logos::SpannedIter<'_, DtdToken>) {
	for (token, _) in lexer.by_ref() {
		if token == Ok(DtdToken::Close) {
			break;
		}
	}
}

fn skip_conditional(lexer: &mut logos::SpannedIter<'_, DtdToken>) {
	let mut depth = 1;

	for (token, _) in lexer.by_ref() {
		match token {
			Ok(DtdToken::ConditionalStart) => depth += 1,
			Ok(DtdToken::ConditionalEnd) => {
				depth -= 1;
				if depth == 0 {
					break;
				}
			}
			_ => {}
		}
	}
}

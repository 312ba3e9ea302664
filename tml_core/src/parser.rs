use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::ComponentTemplate;
use crate::EntityResolver;
use crate::Location;
use crate::ResourceId;
use crate::TemplateError;
use crate::TemplateResult;
use crate::TmlConfig;
use crate::event::EventSource;
use crate::transducer::Transducer;
use crate::xml::XmlEventSource;

/// Options that apply to every template a [`TemplateParser`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
	/// The whitespace-compression default for template text outside any
	/// `xml:space` scope.
	pub compress_whitespace: bool,
}

impl Default for ParseOptions {
	fn default() -> Self {
		Self {
			compress_whitespace: true,
		}
	}
}

/// Parses component templates into [`ComponentTemplate`]s.
///
/// A parser holds no per-template state, so one instance can serve any
/// number of parses, including concurrent ones from several threads.
#[derive(Debug, Clone, Default)]
pub struct TemplateParser {
	options: ParseOptions,
	resolver: Arc<EntityResolver>,
}

impl TemplateParser {
	pub fn new(options: ParseOptions, resolver: Arc<EntityResolver>) -> Self {
		Self { options, resolver }
	}

	/// A parser configured by the `tml.toml` found at `root`, or with
	/// defaults when there is none.
	pub fn from_config(root: &Path, config: Option<&TmlConfig>) -> Self {
		match config {
			Some(config) => {
				Self::new(
					config.parse_options(),
					Arc::new(config.entity_resolver(root)),
				)
			}
			None => Self::default(),
		}
	}

	/// Replace the options, keeping the entity resolver.
	#[must_use]
	pub fn with_options(mut self, options: ParseOptions) -> Self {
		self.options = options;
		self
	}

	pub fn options(&self) -> ParseOptions {
		self.options
	}

	pub fn resolver(&self) -> &EntityResolver {
		&self.resolver
	}

	/// Read and parse the template stored at `path`. The path becomes the
	/// template's resource id.
	pub fn parse_file(&self, path: impl AsRef<Path>) -> TemplateResult<ComponentTemplate> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path)?;

		self.parse_str(path, &content)
	}

	/// Parse template markup held in memory.
	pub fn parse_str(
		&self,
		resource: impl Into<ResourceId>,
		input: &str,
	) -> TemplateResult<ComponentTemplate> {
		let resource = resource.into();
		let source = XmlEventSource::new(input, resource.clone(), &self.resolver);

		self.parse_events(resource, source)
	}

	/// Parse a template from any [`EventSource`].
	///
	/// Failures of the source that carry no location of their own are
	/// reported as [`TemplateError::Parse`] at the last location reached.
	pub fn parse_events(
		&self,
		resource: impl Into<ResourceId>,
		mut source: impl EventSource,
	) -> TemplateResult<ComponentTemplate> {
		let resource = resource.into();
		debug!(%resource, compress_whitespace = self.options.compress_whitespace, "parsing template");

		let mut transducer = Transducer::new(resource.clone(), self.options.compress_whitespace);

		loop {
			let event = match source.next_event() {
				Ok(Some(event)) => event,
				Ok(None) => break,
				Err(error @ TemplateError::Io(_)) => {
					return Err(TemplateError::Parse {
						location: Location::new(resource.clone(), source.line()),
						resource,
						source: Box::new(error),
					});
				}
				Err(error) => return Err(error),
			};

			transducer.handle(event, source.line())?;
		}

		let template = transducer.finish();
		debug!(
			%resource,
			tokens = template.tokens().len(),
			component_ids = template.component_ids().len(),
			overrides = template.overrides().map_or(0, |overrides| overrides.len()),
			"parsed template"
		);

		Ok(template)
	}
}

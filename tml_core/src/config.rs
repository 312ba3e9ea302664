use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::EntityResolver;
use crate::ParseOptions;
use crate::TemplateError;
use crate::TemplateResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["tml.toml", ".tml.toml", ".config/tml.toml"];

/// Configuration loaded from a `tml.toml` file.
///
/// ```toml
/// compress_whitespace = true
///
/// [entities]
/// dtd_dir = "dtd"
///
/// [entities.resources]
/// "-//ACME//DTD Widgets//EN" = "dtd/widgets.dtd"
/// ```
#[derive(Debug, Deserialize)]
pub struct TmlConfig {
	/// Collapse insignificant whitespace in template text. Individual elements
	/// can still opt out with `xml:space="preserve"`. Defaults to `true`.
	#[serde(default = "default_compress_whitespace")]
	pub compress_whitespace: bool,
	/// Where DTDs and entity sets referenced by templates are found locally.
	#[serde(default)]
	pub entities: EntitiesConfig,
}

fn default_compress_whitespace() -> bool {
	true
}

impl Default for TmlConfig {
	fn default() -> Self {
		Self {
			compress_whitespace: default_compress_whitespace(),
			entities: EntitiesConfig::default(),
		}
	}
}

/// Local copies of DTDs, keyed by public identifier.
///
/// All paths are relative to the project root.
#[derive(Debug, Default, Deserialize)]
pub struct EntitiesConfig {
	/// A directory holding the standard XHTML DTDs and entity sets
	/// (`xhtml1-strict.dtd`, `xhtml-lat1.ent`, ...) to use in place of the
	/// copies bundled with the crate.
	#[serde(default)]
	pub dtd_dir: Option<PathBuf>,
	/// Additional public identifiers. These take precedence over the
	/// standard table.
	#[serde(default)]
	pub resources: BTreeMap<String, PathBuf>,
}

impl TmlConfig {
	/// Return the first config file that exists at `root`, following
	/// [`CONFIG_FILE_CANDIDATES`] order.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> TemplateResult<Option<TmlConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: TmlConfig =
			toml::from_str(&content).map_err(|e| TemplateError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	pub fn parse_options(&self) -> ParseOptions {
		ParseOptions {
			compress_whitespace: self.compress_whitespace,
		}
	}

	/// Build the entity resolver described by the `[entities]` section, with
	/// paths resolved against `root`.
	pub fn entity_resolver(&self, root: &Path) -> EntityResolver {
		let resolver = match &self.entities.dtd_dir {
			Some(dir) => EntityResolver::xhtml(root.join(dir)),
			None => EntityResolver::bundled(),
		};

		self.entities
			.resources
			.iter()
			.fold(resolver, |resolver, (public_id, path)| {
				resolver.with_resource(public_id.as_str(), root.join(path))
			})
	}
}

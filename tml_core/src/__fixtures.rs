use std::path::Path;
use std::sync::Arc;

use crate::ComponentTemplate;
use crate::EntityResolver;
use crate::Location;
use crate::ParseOptions;
use crate::ResourceId;
use crate::TemplateParser;
use crate::TemplateResult;
use crate::tokens::Token;

pub const RESOURCE: &str = "components/Test.tml";
pub const NS_5_0: &str = "http://tapestry.apache.org/schema/tapestry_5_0_0.xsd";
pub const NS_5_1: &str = "http://tapestry.apache.org/schema/tapestry_5_1_0.xsd";
pub const XHTML_STRICT: &str = "-//W3C//DTD XHTML 1.0 Strict//EN";

pub fn resource() -> ResourceId {
	ResourceId::new(RESOURCE)
}

pub fn location(line: usize) -> Location {
	Location::new(resource(), Some(line))
}

/// Parse `input` with the default options.
pub fn parse(input: &str) -> TemplateResult<ComponentTemplate> {
	TemplateParser::default().parse_str(RESOURCE, input)
}

pub fn parse_preserving_whitespace(input: &str) -> TemplateResult<ComponentTemplate> {
	let options = ParseOptions {
		compress_whitespace: false,
	};

	TemplateParser::new(options, Arc::default()).parse_str(RESOURCE, input)
}

pub fn parse_with_dtds(dir: &Path, input: &str) -> TemplateResult<ComponentTemplate> {
	let resolver = Arc::new(EntityResolver::xhtml(dir));

	TemplateParser::new(ParseOptions::default(), resolver).parse_str(RESOURCE, input)
}

/// Wrap `body` in an `<html>` root that binds `t` to the current template
/// namespace and `p` to the parameter namespace.
pub fn html(body: &str) -> String {
	format!(r#"<html xmlns:t="{NS_5_1}" xmlns:p="tapestry:parameter">{body}</html>"#)
}

/// One token per line, in display form.
pub fn render(tokens: &[Token]) -> String {
	tokens
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("\n")
}

pub fn rendered(template: &ComponentTemplate) -> Vec<String> {
	template.tokens().iter().map(ToString::to_string).collect()
}

pub fn rendered_override(template: &ComponentTemplate, id: &str) -> Vec<String> {
	template
		.override_tokens(id)
		.unwrap_or_else(|| panic!("no override named `{id}`"))
		.iter()
		.map(ToString::to_string)
		.collect()
}

pub const LAYOUT: &str = r#"<html xmlns:t="http://tapestry.apache.org/schema/tapestry_5_1_0.xsd" xmlns:p="tapestry:parameter">
	<body>
		<h1>${title}</h1>
		<t:if test="loggedIn">
			Welcome, ${user.name}!
			<p:else>
				<t:pagelink page="login">Log in</t:pagelink>
			</p:else>
		</t:if>
		<!-- footer -->
		<t:body/>
	</body>
</html>
"#;

pub const XHTML_STRICT_DTD: &str = r#"<!-- XHTML 1.0 Strict (excerpt) -->
<!ENTITY % HTMLlat1 PUBLIC
   "-//W3C//ENTITIES Latin 1 for XHTML//EN"
   "xhtml-lat1.ent">
%HTMLlat1;

<!ENTITY % HTMLspecial PUBLIC
   "-//W3C//ENTITIES Special for XHTML//EN"
   "xhtml-special.ent">
%HTMLspecial;

<!ELEMENT html (head, body)>
<!ATTLIST html
  id          ID             #IMPLIED
  xmlns       CDATA          #FIXED 'http://www.w3.org/1999/xhtml'
  >
"#;

pub const XHTML_LAT1: &str = r#"<!-- Portions (C) International Organization for Standardization 1986 -->
<!ENTITY nbsp   "&#160;"> <!-- no-break space = non-breaking space -->
<!ENTITY copy   "&#169;"> <!-- copyright sign -->
"#;

pub const XHTML_SPECIAL: &str = r#"<!ENTITY mdash   "&#8212;"> <!-- em dash -->
<!ENTITY amp     "&#38;#38;">
"#;

/// Write the XHTML strict DTD and its entity sets into `dir`.
pub fn write_xhtml_dtds(dir: &Path) {
	for (file, content) in [
		("xhtml1-strict.dtd", XHTML_STRICT_DTD),
		("xhtml-lat1.ent", XHTML_LAT1),
		("xhtml-special.ent", XHTML_SPECIAL),
	] {
		std::fs::write(dir.join(file), content).unwrap_or_else(|e| panic!("write {file}: {e}"));
	}
}

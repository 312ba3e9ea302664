mod common;

use common::NS;
use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use tml_core::AnyEmptyResult;

#[test]
fn parse_prints_tokens_as_text() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("Layout.tml");
	std::fs::write(
		&file,
		format!(
			"<html xmlns:t=\"{NS}\">\n  <body>\n    <span t:id=\"clock\">${{now}}</span>\n    \
			 <t:body/>\n  </body>\n</html>\n"
		),
	)?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("parse")
		.arg(&file)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("tokens:\n  start html\n  start body\n"))
		.stdout(predicates::str::contains("  component <span> id=clock\n  expansion ${now}\n"))
		.stdout(predicates::str::contains("  body\n"))
		.stdout(predicates::str::contains("component ids: clock"))
		.stdout(predicates::str::contains("extends: no"));

	Ok(())
}

#[test]
fn parse_prints_overrides() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("Child.tml");
	std::fs::write(
		&file,
		format!("<t:extend xmlns:t=\"{NS}\"><t:replace id=\"title\">Child</t:replace></t:extend>"),
	)?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("parse")
		.arg(&file)
		.assert()
		.success()
		.stdout(predicates::str::contains("extends: yes"))
		.stdout(predicates::str::contains("override title:\n  text \"Child\""));

	Ok(())
}

#[test]
fn parse_outputs_json() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("Page.tml");
	std::fs::write(
		&file,
		format!("<div xmlns:t=\"{NS}\"><t:block id=\"details\">x</t:block></div>"),
	)?;

	let mut cmd = common::tml_cmd();
	let output = cmd
		.arg("parse")
		.arg(&file)
		.arg("--format")
		.arg("json")
		.output()?;
	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["extension"], Value::Bool(false));
	assert_eq!(json["tokens"][1]["type"], "block");
	assert_eq!(json["tokens"][1]["id"], "details");
	assert_eq!(json["tokens"][1]["location"]["line"], 1);
	assert!(json.get("overrides").is_none());

	Ok(())
}

#[test]
fn parse_can_preserve_whitespace() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("Page.tml");
	std::fs::write(&file, "<p>a   b</p>")?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("parse")
		.arg(&file)
		.arg("--preserve-whitespace")
		.assert()
		.success()
		.stdout(predicates::str::contains("text \"a   b\""));

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("parse")
		.arg(&file)
		.assert()
		.success()
		.stdout(predicates::str::contains("text \"a b\""));

	Ok(())
}

#[test]
fn parse_uses_config_from_project_root() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("tml.toml"), "compress_whitespace = false\n")?;
	let file = tmp.path().join("Page.tml");
	std::fs::write(&file, "<p>a   b</p>")?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("--path")
		.arg(tmp.path())
		.arg("parse")
		.arg(&file)
		.assert()
		.success()
		.stdout(predicates::str::contains("text \"a   b\""));

	Ok(())
}

#[test]
fn parse_reports_template_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("Broken.tml");
	std::fs::write(&file, format!("<div xmlns:t=\"{NS}\">\n<t:body>text</t:body></div>"))?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("parse")
		.arg(&file)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tml::grammar_violation"))
		.stderr(predicates::str::contains("line 2"))
		.stdout(predicates::str::contains("tokens:").not());

	Ok(())
}

#[test]
fn parse_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("tml.toml"), "compress_whitespace = [\n")?;
	let file = tmp.path().join("Page.tml");
	std::fs::write(&file, "<p/>")?;

	let mut cmd = common::tml_cmd();
	let _ = cmd
		.arg("--path")
		.arg(tmp.path())
		.arg("parse")
		.arg(&file)
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tml::config_parse"));

	Ok(())
}

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const NS: &str = "http://tapestry.apache.org/schema/tapestry_5_1_0.xsd";

pub fn tml_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("tml"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

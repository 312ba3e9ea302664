use logos::Logos;

/// Tokens used to compress insignificant whitespace in template text.
#[derive(Logos, Debug, PartialEq)]
enum WhitespaceToken {
	/// Horizontal whitespace around at least one line break, together with any
	/// whitespace that follows it. Reduced to a single `\n`.
	#[regex(r"[ \t\x0C]*[\r\n][ \t\n\x0B\x0C\r]*")]
	LineBreak,
	/// A run of horizontal whitespace. Reduced to a single space.
	#[regex(r"[ \t\x0C]+")]
	Spaces,
	#[regex(r"[^ \t\x0C\r\n]+")]
	Other,
}

/// Tokens used to find `${...}` expansions inside template text.
#[derive(Logos, Debug, PartialEq)]
enum TextToken {
	/// Ends at the first `}`; only whitespace may follow a line break before
	/// the closing brace.
	#[regex(r"\$\{[ \t\n\x0B\x0C\r]*[^}\r\n\u{85}\u{2028}\u{2029}]*[ \t\n\x0B\x0C\r]*\}")]
	Expansion,
	#[token("$")]
	Dollar,
	#[regex(r"[^$]+")]
	Literal,
}

/// A piece of template text, split around expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextPiece<'a> {
	Literal(&'a str),
	/// The trimmed expression between `${` and `}`.
	Expansion(&'a str),
}

fn is_expansion_whitespace(ch: char) -> bool {
	matches!(ch, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Reduce every line break (and the whitespace around it) to a single `\n`,
/// then every remaining run of spaces and tabs to a single space.
pub(crate) fn compress_whitespace(text: &str) -> String {
	let mut compressed = String::with_capacity(text.len());

	for (token, span) in WhitespaceToken::lexer(text).spanned() {
		match token {
			Ok(WhitespaceToken::LineBreak) => compressed.push('\n'),
			Ok(WhitespaceToken::Spaces) => compressed.push(' '),
			Ok(WhitespaceToken::Other) | Err(()) => compressed.push_str(&text[span]),
		}
	}

	compressed
}

/// Split `text` into literal runs and `${...}` expansions, in order. Empty
/// literal runs are omitted.
pub(crate) fn scan_expansions(text: &str) -> Vec<TextPiece<'_>> {
	let mut pieces = Vec::new();
	let mut literal_start = 0;

	for (token, span) in TextToken::lexer(text).spanned() {
		if token != Ok(TextToken::Expansion) {
			continue;
		}

		if span.start > literal_start {
			pieces.push(TextPiece::Literal(&text[literal_start..span.start]));
		}

		let expression = &text[span.start + 2..span.end - 1];
		pieces.push(TextPiece::Expansion(
			expression.trim_matches(is_expansion_whitespace),
		));
		literal_start = span.end;
	}

	if literal_start < text.len() {
		pieces.push(TextPiece::Literal(&text[literal_start..]));
	}

	pieces
}

/// `true` when the text is empty or consists only of whitespace.
pub(crate) fn is_blank(text: &str) -> bool {
	text.trim().is_empty()
}

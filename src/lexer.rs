//! The lexer: turns raw source text into a flat stream of [`Token`]s.
//!
//! This subsystem sits outside the declaration front-end proper (the front-end is specified to
//! consume an already-tokenized stream), but a runnable crate needs something that produces that
//! stream. The approach is grounded in the teacher's `lexer.rs`: a `TokenKind` enum iterated with
//! `strum_macros::EnumIter` for the handful of genuinely regex-shaped literal forms (numbers,
//! strings), plus — because this grammar's keyword vocabulary is much larger than the teacher's —
//! a `phf::Map` for exact keyword lookup, which is cheaper than a linear regex scan over thirty-odd
//! keyword variants.
//!
//! Unlike the teacher's token types, most of this grammar's tokens are distinguished by a leading
//! *sigil* (`$`, `#`) combined with the lexical case of the identifier that follows (`lower_snake`,
//! `UpperCamel`, `ALL_CAPS`), so the bulk of this lexer is a hand-written scanner rather than a
//! table of independent regexes.

use std::{fmt, rc::Rc};

use convert_case::Casing as _;

/// A location in the source text, given as 1-based line and column. Spans in this crate are
/// single points (the start of a token), matching the teacher's `Token { line, column }`
/// convention rather than a `(start, end)` byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
	/// 1-based line number.
	pub line: usize,
	/// 1-based column number.
	pub column: usize,
}

impl Span {
	/// The span used for synthetic tokens that have no real source location (e.g. generic
	/// instantiation's synthesized typedefs, see `crate::generic_inst`).
	#[must_use]
	pub const fn synthetic() -> Self {
		Self { line: 0, column: 0 }
	}
}

impl fmt::Display for Span {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// The kind of a token. Variant names describe the token's shape, not its eventual grammatical
/// role, following the teacher's convention of naming by what the token itself looks like.
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::EnumIter)]
pub enum TokenKind {
	// Identifier lexical classes (distinguished by case and leading sigil).
	/// `lower_snake_case` identifier: variable/function/module names.
	Ident,
	/// `UpperCamelCase` identifier: type names.
	TypeIdent,
	/// `ALL_CAPS` identifier: constant names.
	ConstIdent,
	/// `$lower_snake_case`: a compile-time value parameter or variable.
	CtIdent,
	/// `$UpperCamelCase`: a compile-time type parameter.
	CtTypeIdent,
	/// `$ALL_CAPS`: a compile-time constant.
	CtConstIdent,
	/// `#lower_snake_case`: an unevaluated (lazily substituted) macro parameter.
	HashIdent,
	/// `#UpperCamelCase`: an unevaluated type parameter.
	HashTypeIdent,
	/// `#ALL_CAPS`: an unevaluated constant parameter.
	HashConstIdent,

	// Keywords.
	KeywordModule,
	KeywordImport,
	KeywordStruct,
	KeywordUnion,
	KeywordEnum,
	KeywordErr,
	KeywordFunc,
	KeywordMacro,
	KeywordGeneric,
	KeywordInterface,
	KeywordDefine,
	KeywordAttribute,
	KeywordExtern,
	KeywordPrivate,
	KeywordConst,
	KeywordDistinct,
	KeywordInline,
	KeywordVirtual,
	KeywordVararg,
	KeywordAsm,
	KeywordTypeof,

	// Built-in type keywords.
	KeywordVoid,
	KeywordBool,
	KeywordChar,
	KeywordShort,
	KeywordInt,
	KeywordLong,
	KeywordUChar,
	KeywordUShort,
	KeywordUInt,
	KeywordULong,
	KeywordFloat,
	KeywordDouble,
	KeywordTypeId,

	// Compile-time conditional top-level keywords (always `$`-prefixed).
	KeywordCtIf,
	KeywordCtElif,
	KeywordCtElse,
	KeywordCtSwitch,
	KeywordCtCase,
	KeywordCtDefault,
	KeywordCtAssert,

	// Punctuation.
	ColonColon,
	Dot,
	DotDotDot,
	Star,
	Amp,
	Bang,
	At,
	Equal,
	EqualEqual,
	PlusEqual,
	LeftAngleBracket,
	RightAngleBracket,
	LeftBracket,
	RightBracket,
	LeftBrace,
	RightBrace,
	LeftParenthesis,
	RightParenthesis,
	Comma,
	Semicolon,
	Colon,
	Question,
	Plus,
	Minus,

	// Literals.
	Number,
	Str,

	// Doc-comment structure.
	DocsStart,
	DocsEnd,
	DocsEol,
	DocsLine,
	DocsDirective,

	/// End of input.
	Eof,
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", format!("{self:?}").to_case(convert_case::Case::Title))
	}
}

/// Maps keyword spelling to `TokenKind` by exact match. Checked only after establishing that a
/// scanned run of identifier characters isn't prefixed by `$` or `#` (those always produce one of
/// the compile-time/unevaluated identifier classes, never a keyword, except for the `$if`-style
/// compile-time keywords handled separately in `Lexer::scan_dollar`).
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
	"module" => TokenKind::KeywordModule,
	"import" => TokenKind::KeywordImport,
	"struct" => TokenKind::KeywordStruct,
	"union" => TokenKind::KeywordUnion,
	"enum" => TokenKind::KeywordEnum,
	"err" => TokenKind::KeywordErr,
	"func" => TokenKind::KeywordFunc,
	"macro" => TokenKind::KeywordMacro,
	"generic" => TokenKind::KeywordGeneric,
	"interface" => TokenKind::KeywordInterface,
	"define" => TokenKind::KeywordDefine,
	"attribute" => TokenKind::KeywordAttribute,
	"extern" => TokenKind::KeywordExtern,
	"private" => TokenKind::KeywordPrivate,
	"const" => TokenKind::KeywordConst,
	"distinct" => TokenKind::KeywordDistinct,
	"inline" => TokenKind::KeywordInline,
	"virtual" => TokenKind::KeywordVirtual,
	"vararg" => TokenKind::KeywordVararg,
	"asm" => TokenKind::KeywordAsm,
	"typeof" => TokenKind::KeywordTypeof,
	"void" => TokenKind::KeywordVoid,
	"bool" => TokenKind::KeywordBool,
	"char" => TokenKind::KeywordChar,
	"short" => TokenKind::KeywordShort,
	"int" => TokenKind::KeywordInt,
	"long" => TokenKind::KeywordLong,
	"uchar" => TokenKind::KeywordUChar,
	"ushort" => TokenKind::KeywordUShort,
	"uint" => TokenKind::KeywordUInt,
	"ulong" => TokenKind::KeywordULong,
	"float" => TokenKind::KeywordFloat,
	"double" => TokenKind::KeywordDouble,
	"typeid" => TokenKind::KeywordTypeId,
};

/// Compile-time conditional keywords, checked only once a leading `$` has been consumed.
static CT_KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
	"if" => TokenKind::KeywordCtIf,
	"elif" => TokenKind::KeywordCtElif,
	"else" => TokenKind::KeywordCtElse,
	"switch" => TokenKind::KeywordCtSwitch,
	"case" => TokenKind::KeywordCtCase,
	"default" => TokenKind::KeywordCtDefault,
	"assert" => TokenKind::KeywordCtAssert,
};

/// A single lexed token.
#[derive(Debug, Clone)]
pub struct Token {
	/// The token's kind.
	pub kind: TokenKind,
	/// Where the token starts in the source.
	pub span: Span,
	/// The token's exact source text. Cheaply clonable since the cursor and various AST nodes
	/// hold on to identifier text; this stands in for the teacher's string-interning story
	/// without introducing a separate interner crate (see `DESIGN.md`).
	pub text: Rc<str>,
}

impl Token {
	/// A synthetic EOF token, appended once at the end of every token stream so the cursor never
	/// has to special-case "ran off the end".
	#[must_use]
	pub fn eof(span: Span) -> Self {
		Self {
			kind: TokenKind::Eof,
			span,
			text: Rc::from(""),
		}
	}
}

/// The three lexical identifier classes, used both by the lexer (to classify a scanned
/// identifier) and by `crate::path` (to enforce per-class naming rules on parsed names).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentClass {
	/// `lower_snake_case`.
	Lower,
	/// `UpperCamelCase`.
	Upper,
	/// `ALL_CAPS`.
	Const,
}

/// Classifies an identifier's first alphabetic character to decide which of the three lexical
/// classes it belongs to. Identifiers with no alphabetic character (e.g. `_`) default to `Lower`.
#[must_use]
pub fn classify_ident(text: &str) -> IdentClass {
	let first_alpha = text.chars().find(|c| c.is_alphabetic());
	match first_alpha {
		Some(c) if c.is_uppercase() => {
			if text.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase()) {
				IdentClass::Const
			} else {
				IdentClass::Upper
			}
		}
		_ => IdentClass::Lower,
	}
}

/// Tokenizes `code` into a flat vector of tokens, terminated by a single `Eof` token.
///
/// # Errors
/// Returns an error (via `anyhow`, matching the teacher's `tokenize() -> anyhow::Result<_>`
/// contract) the first time a character sequence doesn't match any recognised token shape. There
/// is no per-token diagnostic machinery available yet at this stage — see `crate::diagnostics`,
/// which only comes into play once a token stream exists.
pub fn tokenize(code: &str) -> anyhow::Result<Vec<Token>> {
	Lexer::new(code).run()
}

struct Lexer {
	chars: Vec<char>,
	pos: usize,
	line: usize,
	column: usize,
	tokens: Vec<Token>,
}

impl Lexer {
	fn new(code: &str) -> Self {
		Self {
			chars: code.chars().collect(),
			pos: 0,
			line: 1,
			column: 1,
			tokens: Vec::new(),
		}
	}

	fn peek_char(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn peek_char_at(&self, offset: usize) -> Option<char> {
		self.chars.get(self.pos + offset).copied()
	}

	fn advance_char(&mut self) -> Option<char> {
		let c = self.peek_char()?;
		self.pos += 1;
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn push(&mut self, kind: TokenKind, span: Span, text: &str) {
		self.tokens.push(Token { kind, span, text: Rc::from(text) });
	}

	fn run(mut self) -> anyhow::Result<Vec<Token>> {
		loop {
			self.skip_whitespace_and_comments();
			let Some(c) = self.peek_char() else { break };
			let span = Span { line: self.line, column: self.column };

			if c == '/' && self.peek_char_at(1) == Some('*') && self.peek_char_at(2) == Some('*') {
				self.scan_doc_comment(span)?;
				continue;
			}

			if c.is_ascii_digit() {
				self.scan_number(span);
				continue;
			}

			if c == '"' {
				self.scan_string(span)?;
				continue;
			}

			if c == '$' {
				self.scan_dollar(span);
				continue;
			}

			if c == '#' {
				self.scan_hash(span);
				continue;
			}

			if c.is_alphabetic() || c == '_' {
				self.scan_ident(span);
				continue;
			}

			if let Some(len) = self.scan_punctuation(span) {
				self.advance_for_punctuation(len);
				continue;
			}

			anyhow::bail!("{span}: Unrecognized character '{c}'");
		}
		let eof_span = Span { line: self.line, column: self.column };
		self.tokens.push(Token::eof(eof_span));
		Ok(self.tokens)
	}

	fn skip_whitespace_and_comments(&mut self) {
		loop {
			match self.peek_char() {
				Some(c) if c.is_whitespace() => {
					self.advance_char();
				}
				Some('/') if self.peek_char_at(1) == Some('/') => {
					while !matches!(self.peek_char(), None | Some('\n')) {
						self.advance_char();
					}
				}
				_ => break,
			}
		}
	}

	fn scan_number(&mut self, span: Span) {
		let start = self.pos;
		while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
			self.advance_char();
		}
		let text: String = self.chars[start..self.pos].iter().collect();
		self.push(TokenKind::Number, span, &text);
	}

	fn scan_string(&mut self, span: Span) -> anyhow::Result<()> {
		let start = self.pos;
		self.advance_char(); // opening quote
		loop {
			match self.advance_char() {
				Some('"') => break,
				Some('\\') => {
					self.advance_char();
				}
				Some(_) => {}
				None => anyhow::bail!("{span}: Unterminated string literal"),
			}
		}
		let text: String = self.chars[start..self.pos].iter().collect();
		self.push(TokenKind::Str, span, &text);
		Ok(())
	}

	fn scan_ident(&mut self, span: Span) {
		let start = self.pos;
		while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
			self.advance_char();
		}
		let text: String = self.chars[start..self.pos].iter().collect();
		if let Some(kind) = KEYWORDS.get(text.as_str()) {
			self.push(kind.clone(), span, &text);
			return;
		}
		let kind = match classify_ident(&text) {
			IdentClass::Lower => TokenKind::Ident,
			IdentClass::Upper => TokenKind::TypeIdent,
			IdentClass::Const => TokenKind::ConstIdent,
		};
		self.push(kind, span, &text);
	}

	fn scan_dollar(&mut self, span: Span) {
		let start = self.pos;
		self.advance_char(); // '$'
		let ident_start = self.pos;
		while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
			self.advance_char();
		}
		let ident_text: String = self.chars[ident_start..self.pos].iter().collect();
		let full_text: String = self.chars[start..self.pos].iter().collect();
		if let Some(kind) = CT_KEYWORDS.get(ident_text.as_str()) {
			self.push(kind.clone(), span, &full_text);
			return;
		}
		let kind = match classify_ident(&ident_text) {
			IdentClass::Lower => TokenKind::CtIdent,
			IdentClass::Upper => TokenKind::CtTypeIdent,
			IdentClass::Const => TokenKind::CtConstIdent,
		};
		self.push(kind, span, &full_text);
	}

	fn scan_hash(&mut self, span: Span) {
		let start = self.pos;
		self.advance_char(); // '#'
		let ident_start = self.pos;
		while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
			self.advance_char();
		}
		let ident_text: String = self.chars[ident_start..self.pos].iter().collect();
		let full_text: String = self.chars[start..self.pos].iter().collect();
		let kind = match classify_ident(&ident_text) {
			IdentClass::Lower => TokenKind::HashIdent,
			IdentClass::Upper => TokenKind::HashTypeIdent,
			IdentClass::Const => TokenKind::HashConstIdent,
		};
		self.push(kind, span, &full_text);
	}

	/// Scans a `/** ... **/` doc comment block into a `DocsStart ... DocsEnd` sequence. Directive
	/// lines (`@param x the value`) are split into a `DocsDirective` token holding just the
	/// directive name, followed by a `DocsLine` holding the rest of that line; ordinary lines are
	/// a single `DocsLine`. Lines are separated by `DocsEol`.
	fn scan_doc_comment(&mut self, span: Span) -> anyhow::Result<()> {
		self.advance_char();
		self.advance_char();
		self.advance_char(); // consume "/**"
		self.push(TokenKind::DocsStart, span, "/**");

		let mut first_line = true;
		loop {
			while matches!(self.peek_char(), Some(c) if c == ' ' || c == '\t') {
				self.advance_char();
			}
			if self.peek_char() == Some('*') && self.peek_char_at(1) != Some('*') {
				self.advance_char();
				while matches!(self.peek_char(), Some(c) if c == ' ' || c == '\t') {
					self.advance_char();
				}
			}

			if self.peek_char() == Some('*') && self.peek_char_at(1) == Some('*') && self.peek_char_at(2) == Some('/') {
				let end_span = Span { line: self.line, column: self.column };
				self.advance_char();
				self.advance_char();
				self.advance_char();
				self.push(TokenKind::DocsEnd, end_span, "**/");
				return Ok(());
			}
			if self.peek_char().is_none() {
				anyhow::bail!("{span}: Unterminated doc comment");
			}

			if !first_line {
				self.push(TokenKind::DocsEol, span, "\n");
			}
			first_line = false;

			let line_span = Span { line: self.line, column: self.column };
			let line_start = self.pos;
			while !matches!(self.peek_char(), None | Some('\n')) {
				if self.peek_char() == Some('*') && self.peek_char_at(1) == Some('*') && self.peek_char_at(2) == Some('/') {
					break;
				}
				self.advance_char();
			}
			let line_text: String = self.chars[line_start..self.pos].iter().collect::<String>().trim_end().to_owned();

			if let Some(stripped) = line_text.strip_prefix('@') {
				let directive: String = stripped.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
				let rest = stripped[directive.len()..].trim_start().to_owned();
				self.push(TokenKind::DocsDirective, line_span, &directive);
				self.push(TokenKind::DocsLine, line_span, &rest);
			} else {
				self.push(TokenKind::DocsLine, line_span, &line_text);
			}

			if self.peek_char() == Some('\n') {
				self.advance_char();
			}
		}
	}

	/// Recognises a punctuation token starting at the current position, returning its length in
	/// characters (1, 2, or 3) without consuming it — the caller advances afterwards so
	/// line/column bookkeeping stays centralised in `advance_char`.
	fn scan_punctuation(&mut self, span: Span) -> Option<usize> {
		let three: String = self.chars[self.pos..(self.pos + 3).min(self.chars.len())].iter().collect();
		if three == "..." {
			self.push(TokenKind::DotDotDot, span, "...");
			return Some(3);
		}
		let two: String = self.chars[self.pos..(self.pos + 2).min(self.chars.len())].iter().collect();
		let two_kind = match two.as_str() {
			"::" => Some(TokenKind::ColonColon),
			"==" => Some(TokenKind::EqualEqual),
			"+=" => Some(TokenKind::PlusEqual),
			_ => None,
		};
		if let Some(kind) = two_kind {
			self.push(kind, span, &two);
			return Some(2);
		}
		let c = self.peek_char()?;
		let one_kind = match c {
			'.' => TokenKind::Dot,
			'*' => TokenKind::Star,
			'&' => TokenKind::Amp,
			'!' => TokenKind::Bang,
			'@' => TokenKind::At,
			'=' => TokenKind::Equal,
			'<' => TokenKind::LeftAngleBracket,
			'>' => TokenKind::RightAngleBracket,
			'[' => TokenKind::LeftBracket,
			']' => TokenKind::RightBracket,
			'{' => TokenKind::LeftBrace,
			'}' => TokenKind::RightBrace,
			'(' => TokenKind::LeftParenthesis,
			')' => TokenKind::RightParenthesis,
			',' => TokenKind::Comma,
			';' => TokenKind::Semicolon,
			':' => TokenKind::Colon,
			'?' => TokenKind::Question,
			'+' => TokenKind::Plus,
			'-' => TokenKind::Minus,
			_ => return None,
		};
		self.push(one_kind, span, &c.to_string());
		Some(1)
	}

	fn advance_for_punctuation(&mut self, len: usize) {
		for _ in 0..len {
			self.advance_char();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_identifier_lexical_classes() {
		let tokens = tokenize("foo Foo FOO_BAR _under").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
		assert_eq!(kinds[0], TokenKind::Ident);
		assert_eq!(kinds[1], TokenKind::TypeIdent);
		assert_eq!(kinds[2], TokenKind::ConstIdent);
		assert_eq!(kinds[3], TokenKind::Ident);
	}

	#[test]
	fn recognises_sigil_identifiers() {
		let tokens = tokenize("$foo $Foo $FOO #foo #Foo #FOO").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
		assert_eq!(kinds[0], TokenKind::CtIdent);
		assert_eq!(kinds[1], TokenKind::CtTypeIdent);
		assert_eq!(kinds[2], TokenKind::CtConstIdent);
		assert_eq!(kinds[3], TokenKind::HashIdent);
		assert_eq!(kinds[4], TokenKind::HashTypeIdent);
		assert_eq!(kinds[5], TokenKind::HashConstIdent);
	}

	#[test]
	fn recognises_dollar_keywords() {
		let tokens = tokenize("$if $elif $else $switch $case $default $assert").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
		assert_eq!(
			kinds,
			vec![
				TokenKind::KeywordCtIf,
				TokenKind::KeywordCtElif,
				TokenKind::KeywordCtElse,
				TokenKind::KeywordCtSwitch,
				TokenKind::KeywordCtCase,
				TokenKind::KeywordCtDefault,
				TokenKind::KeywordCtAssert,
			]
		);
	}

	#[test]
	fn scans_struct_with_packed_attribute() {
		let tokens = tokenize("struct Foo @packed { char a; int b; }").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
		assert_eq!(kinds[0], TokenKind::KeywordStruct);
		assert_eq!(kinds[1], TokenKind::TypeIdent);
		assert_eq!(kinds[2], TokenKind::At);
		assert_eq!(kinds[3], TokenKind::Ident);
	}

	#[test]
	fn scans_doc_comment_with_directive() {
		let tokens = tokenize("/** Does a thing.\n * @param x the value\n **/").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
		assert_eq!(kinds[0], TokenKind::DocsStart);
		assert!(kinds.contains(&TokenKind::DocsDirective));
		assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
	}

	#[test]
	fn rejects_unknown_character() {
		assert!(tokenize("struct Foo { int a; } `").is_err());
	}
}

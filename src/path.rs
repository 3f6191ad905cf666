//! Path and name parsing utilities shared by every other parser module.
//!
//! Grounded in the teacher's `parser/expressions/util/name.rs`, which centralizes identifier
//! parsing so every expression parser enforces the same naming rules; this crate has three
//! lexical classes instead of the teacher's one, so `consume_ident`/`consume_type_name`/
//! `consume_const_name` each enforce their own class with a tailored diagnostic.

use std::rc::Rc;

use crate::{
	cursor::Cursor,
	lexer::{Span, TokenKind},
};

/// A dotted module path, e.g. `a::b::c`. Stored as a single interned string (the canonical
/// joined form) plus the span of its first token, matching the data model's "equality is pointer
/// equality on the interned form" rule — `Rc::ptr_eq` once both paths are fetched from the same
/// string interner (see `crate::session::StringInterner`).
#[derive(Debug, Clone)]
pub struct Path {
	/// The canonical `"a::b::c"` form.
	pub canonical: Rc<str>,
	/// Where the path started in the source.
	pub span: Span,
}

impl PartialEq for Path {
	fn eq(&self, other: &Self) -> bool {
		self.canonical == other.canonical
	}
}
impl Eq for Path {}

/// A plain identifier name together with the span it was parsed from.
#[derive(Debug, Clone)]
pub struct Name {
	/// The identifier text.
	pub text: Rc<str>,
	/// Where it was parsed from.
	pub span: Span,
}

impl PartialEq for Name {
	fn eq(&self, other: &Self) -> bool {
		self.text == other.text
	}
}
impl Eq for Name {}

/// Parses `IDENT ('::' IDENT)+`, requiring at least one `::` separator and every segment to be a
/// lower-case identifier. Used for `module` and `import` declarations, which always name a full
/// module path rather than a possibly-bare symbol.
///
/// # Errors
/// Fails if the first segment isn't a lower-case identifier, if no `::` follows, or if a later
/// segment isn't lower-case.
pub fn parse_module_path(cursor: &mut Cursor<'_>) -> anyhow::Result<Path> {
	let span = cursor.span();
	let mut segments = vec![consume_ident(cursor)?.text];
	if !cursor.next_is(&TokenKind::ColonColon) {
		anyhow::bail!("{span}: Expected a module path with at least one '::' separator");
	}
	while cursor.try_consume(&TokenKind::ColonColon).is_some() {
		segments.push(consume_ident(cursor)?.text);
	}
	Ok(Path {
		canonical: Rc::from(segments.join("::").as_str()),
		span,
	})
}

/// Parses a `IDENT '::'` prefix, repeated for as long as the token *after* each identifier is
/// `::`. Leaves the cursor positioned on whatever symbol the path prefixes (a type name, function
/// name, or variable name), without consuming it. Returns `None` if there is no such prefix.
#[must_use]
pub fn parse_path_prefix(cursor: &mut Cursor<'_>) -> Option<Path> {
	if !matches!(cursor.peek().kind, TokenKind::Ident) || !matches!(cursor.peek_at(1).kind, TokenKind::ColonColon) {
		return None;
	}
	let span = cursor.span();
	let mut segments = Vec::new();
	while matches!(cursor.peek().kind, TokenKind::Ident) && matches!(cursor.peek_at(1).kind, TokenKind::ColonColon) {
		segments.push(cursor.text());
		cursor.advance();
		cursor.advance();
	}
	Some(Path {
		canonical: Rc::from(segments.join("::").as_str()),
		span,
	})
}

/// Speculatively checks whether the upcoming tokens form an arbitrary-length `IDENT ('::'
/// IDENT)*` sequence terminated by a `TYPE_IDENT`, without consuming anything. Used to
/// disambiguate a path-qualified type reference from a bare lower-case expression during type
/// parsing.
#[must_use]
pub fn next_is_type_with_path_prefix(cursor: &Cursor<'_>) -> bool {
	let mut probe = cursor.clone();
	loop {
		if !matches!(probe.peek().kind, TokenKind::Ident) {
			return false;
		}
		probe.advance();
		if probe.try_consume(&TokenKind::ColonColon).is_none() {
			return false;
		}
		if matches!(probe.peek().kind, TokenKind::TypeIdent) {
			return true;
		}
	}
}

/// Consumes a `lower_snake_case` identifier.
///
/// # Errors
/// Fails if the current token isn't an `Ident`.
pub fn consume_ident(cursor: &mut Cursor<'_>) -> anyhow::Result<Name> {
	let span = cursor.span();
	if !matches!(cursor.peek().kind, TokenKind::Ident) {
		anyhow::bail!("{span}: Expected a lower-case identifier but found {}", cursor.peek().kind);
	}
	let text = cursor.text();
	cursor.advance();
	Ok(Name { text, span })
}

/// Consumes an `UpperCamelCase` type name.
///
/// # Errors
/// Fails if the current token isn't a `TypeIdent`.
pub fn consume_type_name(cursor: &mut Cursor<'_>) -> anyhow::Result<Name> {
	let span = cursor.span();
	if !matches!(cursor.peek().kind, TokenKind::TypeIdent) {
		anyhow::bail!("{span}: Expected a type name (UpperCamelCase) but found {}", cursor.peek().kind);
	}
	let text = cursor.text();
	cursor.advance();
	Ok(Name { text, span })
}

/// Consumes an `ALL_CAPS` constant name.
///
/// # Errors
/// Fails if the current token isn't a `ConstIdent`.
pub fn consume_const_name(cursor: &mut Cursor<'_>) -> anyhow::Result<Name> {
	let span = cursor.span();
	if !matches!(cursor.peek().kind, TokenKind::ConstIdent) {
		anyhow::bail!("{span}: Expected a constant name (ALL_CAPS) but found {}", cursor.peek().kind);
	}
	let text = cursor.text();
	cursor.advance();
	Ok(Name { text, span })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	#[test]
	fn parses_module_path() {
		let tokens = tokenize("a::b::c").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let path = parse_module_path(&mut cursor).unwrap();
		assert_eq!(path.canonical.as_ref(), "a::b::c");
		assert!(cursor.at_end());
	}

	#[test]
	fn module_path_requires_separator() {
		let tokens = tokenize("a").unwrap();
		let mut cursor = Cursor::new(&tokens);
		assert!(parse_module_path(&mut cursor).is_err());
	}

	#[test]
	fn parses_path_prefix_leaving_symbol_on_cursor() {
		let tokens = tokenize("std::io::File").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let prefix = parse_path_prefix(&mut cursor).unwrap();
		assert_eq!(prefix.canonical.as_ref(), "std::io");
		assert!(matches!(cursor.peek().kind, TokenKind::TypeIdent));
	}

	#[test]
	fn detects_path_prefixed_type() {
		let tokens = tokenize("std::io::File").unwrap();
		let cursor = Cursor::new(&tokens);
		assert!(next_is_type_with_path_prefix(&cursor));
	}

	#[test]
	fn rejects_wrong_lexical_class() {
		let tokens = tokenize("Foo").unwrap();
		let mut cursor = Cursor::new(&tokens);
		assert!(consume_ident(&mut cursor).is_err());
	}
}

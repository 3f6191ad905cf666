//! The token cursor: a cheap, clonable read head over a token stream.
//!
//! Grounded in the teacher's `TokenQueue` trait (`parser/mod.rs`), which adds `pop`/`peek`/
//! `next_is` methods on top of a `VecDeque<Token>`. This crate's grammar needs unbounded
//! lookahead in a few places (distinguishing a struct declaration from a function declaration
//! needs to skip past an attribute list first), so the queue is replaced by an index into a
//! `Vec<Token>` slice instead of popping elements off a deque — cloning a `Cursor` to try a
//! production and roll back on failure is then a `usize` copy rather than a deque clone.

use std::rc::Rc;

use crate::lexer::{Span, Token, TokenKind};

/// A read-only cursor over a token slice. Cloning is `O(1)`: callers speculatively parse a
/// production by cloning the cursor, and either commit by overwriting `self` with the clone or
/// discard it.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	tokens: &'a [Token],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Creates a cursor over `tokens`, positioned at the first token.
	#[must_use]
	pub const fn new(tokens: &'a [Token]) -> Self {
		Self { tokens, pos: 0 }
	}

	/// The token at the current position. Past the end of the stream this always returns the
	/// trailing `Eof` token rather than panicking.
	#[must_use]
	pub fn peek(&self) -> &'a Token {
		self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().unwrap_or_else(|| unreachable!("token stream always has a trailing Eof token")))
	}

	/// The token `offset` positions ahead of the current one, saturating at `Eof`.
	#[must_use]
	pub fn peek_at(&self, offset: usize) -> &'a Token {
		self.tokens.get(self.pos + offset).unwrap_or_else(|| self.tokens.last().unwrap_or_else(|| unreachable!("token stream always has a trailing Eof token")))
	}

	/// Whether the next token is of the given kind.
	#[must_use]
	pub fn next_is(&self, kind: &TokenKind) -> bool {
		&self.peek().kind == kind
	}

	/// Whether the next token is one of the given kinds.
	#[must_use]
	pub fn next_is_one_of(&self, kinds: &[TokenKind]) -> bool {
		kinds.contains(&self.peek().kind)
	}

	/// Consumes and returns the current token unconditionally, advancing the cursor (unless
	/// already at `Eof`, which never advances past itself).
	pub fn advance(&mut self) -> &'a Token {
		let token = self.peek();
		if !matches!(token.kind, TokenKind::Eof) {
			self.pos += 1;
		}
		token
	}

	/// Consumes the current token if it matches `kind`, otherwise reports an "expected X but
	/// found Y" error and leaves the cursor in place so callers can attempt recovery.
	///
	/// # Errors
	/// Returns an error describing the mismatch between the expected and actual token kind.
	pub fn expect(&mut self, kind: &TokenKind) -> anyhow::Result<&'a Token> {
		if self.next_is(kind) {
			Ok(self.advance())
		} else {
			let found = self.peek();
			anyhow::bail!("{}: Expected {kind} but found {}", found.span, found.kind)
		}
	}

	/// Consumes the current token if it matches `kind`, returning `None` otherwise without
	/// advancing.
	pub fn try_consume(&mut self, kind: &TokenKind) -> Option<&'a Token> {
		if self.next_is(kind) {
			Some(self.advance())
		} else {
			None
		}
	}

	/// The span of the current token, useful for anchoring a diagnostic before consuming
	/// anything.
	#[must_use]
	pub fn span(&self) -> Span {
		self.peek().span
	}

	/// The interned text of the current token.
	#[must_use]
	pub fn text(&self) -> Rc<str> {
		Rc::clone(&self.peek().text)
	}

	/// Whether the cursor has reached the end of the stream.
	#[must_use]
	pub fn at_end(&self) -> bool {
		matches!(self.peek().kind, TokenKind::Eof)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	#[test]
	fn advances_and_reports_end_of_stream() {
		let tokens = tokenize("struct Foo {}").unwrap();
		let mut cursor = Cursor::new(&tokens);
		assert!(cursor.next_is(&TokenKind::KeywordStruct));
		cursor.advance();
		assert!(cursor.next_is(&TokenKind::TypeIdent));
		assert_eq!(cursor.text().as_ref(), "Foo");
	}

	#[test]
	fn expect_reports_mismatch_without_advancing() {
		let tokens = tokenize("struct Foo {}").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let result = cursor.expect(&TokenKind::KeywordUnion);
		assert!(result.is_err());
		assert!(cursor.next_is(&TokenKind::KeywordStruct));
	}

	#[test]
	fn cloning_allows_speculative_parsing() {
		let tokens = tokenize("struct Foo {}").unwrap();
		let cursor = Cursor::new(&tokens);
		let mut speculative = cursor.clone();
		speculative.advance();
		speculative.advance();
		assert!(cursor.next_is(&TokenKind::KeywordStruct));
		assert!(speculative.next_is(&TokenKind::LeftBrace));
	}
}

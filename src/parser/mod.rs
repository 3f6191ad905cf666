//! The declaration parser: turns a token stream into top-level `Decl`s.
//!
//! Grounded in the teacher's `Parser`/`Program` pair (`parser/mod.rs`), reduced to the slice of
//! grammar this crate actually covers — top-level declarations only, no statement or expression
//! bodies. `Parser` itself is a thin shell around a `Cursor` plus the `Context`/`Reporter` every
//! sub-parser needs; the actual per-construct grammars live in `parser::decl`, `parser::types`,
//! `parser::conditional`, and `parser::doc` as free functions rather than `Parser` methods, so
//! they can be called recursively (e.g. a `$if` branch's body re-enters the top-level dispatcher)
//! without fighting the borrow checker over a shared `&mut self`.

pub mod conditional;
pub mod decl;
pub mod doc;
pub mod types;

use crate::{
	ast::{Decl, DeclHeader, DeclId, DeclKind, Visibility},
	cursor::Cursor,
	diagnostics::Reporter,
	lexer::{Token, TokenKind},
	path,
	session::Context,
};

/// The keywords a top-level declaration always starts with, or restarts at after a parse error —
/// used by `recover_top_level` to find the next plausible declaration boundary.
const TOP_LEVEL_SYNC_KEYWORDS: &[TokenKind] = &[
	TokenKind::KeywordModule,
	TokenKind::KeywordImport,
	TokenKind::KeywordStruct,
	TokenKind::KeywordUnion,
	TokenKind::KeywordEnum,
	TokenKind::KeywordErr,
	TokenKind::KeywordFunc,
	TokenKind::KeywordMacro,
	TokenKind::KeywordGeneric,
	TokenKind::KeywordInterface,
	TokenKind::KeywordDefine,
	TokenKind::KeywordAttribute,
	TokenKind::KeywordExtern,
	TokenKind::KeywordPrivate,
	TokenKind::KeywordConst,
	TokenKind::KeywordCtIf,
	TokenKind::KeywordCtSwitch,
	TokenKind::KeywordCtAssert,
];

/// Advances the cursor past tokens that can't start a declaration, stopping at the next token
/// that looks like the start of one (or at end of input). This is the one-diagnostic-then-resync
/// behavior §7 requires of parse errors.
pub(crate) fn recover_top_level(cursor: &mut Cursor<'_>) {
	cursor.advance();
	while !cursor.at_end() && !cursor.next_is_one_of(TOP_LEVEL_SYNC_KEYWORDS) {
		cursor.advance();
	}
}

/// Skips a balanced `{ ... }` block without interpreting it. Statement and expression parsing
/// are out of scope for this crate; function and macro bodies are skipped wholesale once their
/// signature has been fully parsed and recorded.
pub(crate) fn skip_balanced_braces(cursor: &mut Cursor<'_>) {
	let mut depth: i32 = 0;
	loop {
		match cursor.peek().kind {
			TokenKind::LeftBrace => {
				depth += 1;
				cursor.advance();
			}
			TokenKind::RightBrace => {
				depth -= 1;
				cursor.advance();
				if depth == 0 {
					break;
				}
			}
			TokenKind::Eof => break,
			_ => {
				cursor.advance();
			}
		}
	}
}

/// Ties a token cursor to the `Context` it populates and the `Reporter` it emits diagnostics to.
/// One `Parser` is constructed per source file, in `CompilationSession::find_or_create_module`.
pub struct Parser<'a, 'ctx, 'rep> {
	cursor: Cursor<'a>,
	context: &'ctx mut Context,
	reporter: &'rep mut Reporter,
}

impl<'a, 'ctx, 'rep> Parser<'a, 'ctx, 'rep> {
	pub fn new(tokens: &'a [Token], context: &'ctx mut Context, reporter: &'rep mut Reporter) -> Self {
		Self { cursor: Cursor::new(tokens), context, reporter }
	}

	/// Whether the underlying token stream has been fully consumed.
	#[must_use]
	pub fn at_end(&self) -> bool {
		self.cursor.at_end()
	}

	/// Parses an optional leading `module a::b::c;` line. A file without one keeps the module
	/// name its `Context` was already constructed with.
	pub fn parse_module(&mut self) {
		if !self.cursor.next_is(&TokenKind::KeywordModule) {
			return;
		}
		let span = self.cursor.span();
		self.cursor.advance();
		if let Err(err) = path::parse_module_path(&mut self.cursor) {
			self.reporter.error(span, err.to_string());
			recover_top_level(&mut self.cursor);
			return;
		}
		if self.cursor.expect(&TokenKind::Semicolon).is_err() {
			self.reporter.error(span, "Expected ';' after module path");
		}
	}

	/// Parses every leading `import a::b::c;` line.
	pub fn parse_imports(&mut self) {
		while self.cursor.next_is(&TokenKind::KeywordImport) {
			let span = self.cursor.span();
			self.cursor.advance();
			match path::parse_module_path(&mut self.cursor) {
				Ok(imported) => {
					if self.cursor.expect(&TokenKind::Semicolon).is_err() {
						self.reporter.error(span, "Expected ';' after import path");
					}
					let header = DeclHeader::new(None, span, Visibility::Public, std::rc::Rc::clone(&self.context.module_name));
					let id = self.context.alloc_decl(Decl { header, kind: DeclKind::Import(imported) });
					self.context.imports.push(id);
				}
				Err(err) => {
					self.reporter.error(span, err.to_string());
					recover_top_level(&mut self.cursor);
				}
			}
		}
	}

	/// Parses exactly one top-level declaration (or compile-time conditional), allocating it in
	/// the context's arena and returning its id. Callers loop this until `at_end()`.
	pub fn parse_top_level_statement(&mut self) -> DeclId {
		decl::parse_top_level(&mut self.cursor, self.context, self.reporter)
	}
}

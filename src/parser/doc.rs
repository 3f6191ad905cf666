//! Doc comment parsing: turns a `DocsStart .. DocsEnd` token run into a `DocComment`.
//!
//! Grounded in the lexer's own doc-comment scanning (`crate::lexer::Lexer::scan_doc_comment`),
//! which already splits `@directive rest` lines from plain ones — this module just interprets
//! the directive names the data model names (`@param`, `@pure`, `@require`, `@ensure`,
//! `@errors`), falling back to `Unknown` for anything else so a new directive can be added to a
//! caller's vocabulary without this parser rejecting it.

use std::rc::Rc;

use crate::{
	ast::{DocComment, DocDirective},
	cursor::Cursor,
	lexer::{Span, TokenKind},
	path::Name,
};

/// Parses a doc comment starting at the cursor, if one is present. Returns `None` (without
/// advancing) if the next token isn't `DocsStart`.
#[must_use]
pub fn parse_doc_comment(cursor: &mut Cursor<'_>) -> Option<DocComment> {
	if !cursor.next_is(&TokenKind::DocsStart) {
		return None;
	}
	let span = cursor.span();
	cursor.advance();
	let mut directives = Vec::new();
	loop {
		if cursor.try_consume(&TokenKind::DocsEnd).is_some() {
			break;
		}
		if cursor.try_consume(&TokenKind::DocsEol).is_some() {
			continue;
		}
		if cursor.next_is(&TokenKind::DocsDirective) {
			let name = cursor.text();
			let directive_span = cursor.span();
			cursor.advance();
			let rest = if cursor.next_is(&TokenKind::DocsLine) {
				let text = cursor.text();
				cursor.advance();
				text
			} else {
				Rc::from("")
			};
			directives.push(parse_directive(&name, &rest, directive_span));
			continue;
		}
		if cursor.try_consume(&TokenKind::DocsLine).is_some() {
			continue;
		}
		// Malformed stream (missing DocsEnd): stop rather than loop forever.
		break;
	}
	Some(DocComment { directives, span })
}

fn parse_directive(name: &str, rest: &str, span: Span) -> DocDirective {
	match name {
		"pure" => DocDirective::Pure,
		"require" => DocDirective::Require(rest.to_owned()),
		"ensure" => DocDirective::Ensure(rest.to_owned()),
		"param" => {
			let mut parts = rest.splitn(2, char::is_whitespace);
			let param_name = parts.next().unwrap_or_default();
			let description = parts.next().unwrap_or_default().trim().to_owned();
			DocDirective::Param(Name { text: Rc::from(param_name), span }, description)
		}
		"errors" => {
			let names = rest
				.split(',')
				.map(str::trim)
				.filter(|segment| !segment.is_empty())
				.map(|segment| Name { text: Rc::from(segment), span })
				.collect();
			DocDirective::Errors(names)
		}
		other => DocDirective::Unknown(Rc::from(other), rest.to_owned()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	#[test]
	fn parses_param_and_errors_directives() {
		let tokens = tokenize("/** Does a thing.\n * @param x the value\n * @errors IoError, EofError\n **/").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let doc = parse_doc_comment(&mut cursor).unwrap();
		assert_eq!(doc.directives.len(), 2);
		assert!(matches!(&doc.directives[0], DocDirective::Param(name, desc) if name.text.as_ref() == "x" && desc == "the value"));
		assert!(matches!(&doc.directives[1], DocDirective::Errors(names) if names.len() == 2));
	}

	#[test]
	fn absent_doc_comment_returns_none() {
		let tokens = tokenize("struct Foo {}").unwrap();
		let mut cursor = Cursor::new(&tokens);
		assert!(parse_doc_comment(&mut cursor).is_none());
	}
}

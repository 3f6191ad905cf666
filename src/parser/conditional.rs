//! Compile-time top-level conditionals: `$if`/`$elif`/`$else`, `$switch`/`$case`/`$default`, and
//! `$assert` (component E).
//!
//! Grounded in the teacher's own `$if`/`$comptime` handling in `parser/expressions/util/mod.rs`,
//! generalized to the declaration grammar: each branch recursively re-enters
//! `crate::parser::decl::parse_top_level` for every declaration it contains, rather than parsing a
//! single expression. Branch bodies are nested as data on one `DeclKind::CtIf`/`CtSwitch` node
//! instead of being flattened into sibling arena entries — see `DESIGN.md` for why.

use crate::{
	ast::{CtCase, Decl, DeclHeader, DeclId, DeclKind, Visibility},
	const_eval::parse_expr,
	cursor::Cursor,
	diagnostics::Reporter,
	lexer::TokenKind,
	session::Context,
};

use super::{decl::parse_top_level, recover_top_level, types::{parse_type, ArrayContext}};

/// Parses the `Vec<DeclId>` of declarations nested inside one `$if`/`$elif`/`$else`/`$case`/
/// `$default` branch, stopping at the next branch keyword, `}`, or end of input.
fn parse_branch_decls(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> Vec<DeclId> {
	let mut decls = Vec::new();
	while !cursor.at_end()
		&& !matches!(
			cursor.peek().kind,
			TokenKind::KeywordCtElif | TokenKind::KeywordCtElse | TokenKind::KeywordCtCase | TokenKind::KeywordCtDefault | TokenKind::RightBrace
		) {
		decls.push(parse_top_level(cursor, context, reporter));
	}
	decls
}

/// Parses `$if (cond) { decls } ($elif (cond) { decls })* ($else { decls })?`.
pub fn parse_ct_if(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let Some(condition) = parse_ct_condition(cursor, reporter, span) else {
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	};
	let Some(then_decls) = parse_ct_brace_block(cursor, context, reporter, span) else {
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	};

	let mut elifs = Vec::new();
	while cursor.try_consume(&TokenKind::KeywordCtElif).is_some() {
		let elif_span = cursor.span();
		let Some(elif_condition) = parse_ct_condition(cursor, reporter, elif_span) else {
			break;
		};
		let Some(elif_decls) = parse_ct_brace_block(cursor, context, reporter, elif_span) else {
			break;
		};
		elifs.push((elif_condition, elif_decls));
	}

	let else_decls = if cursor.try_consume(&TokenKind::KeywordCtElse).is_some() {
		let else_span = cursor.span();
		parse_ct_brace_block(cursor, context, reporter, else_span)
	} else {
		None
	};

	let header = DeclHeader::new(None, span, Visibility::Local, std::rc::Rc::clone(&context.module_name));
	context.alloc_decl(Decl {
		header,
		kind: DeclKind::CtIf { condition, then_decls, elifs, else_decls },
	})
}

fn parse_ct_condition(cursor: &mut Cursor<'_>, reporter: &mut Reporter, span: crate::lexer::Span) -> Option<crate::const_eval::Expr> {
	if cursor.expect(&TokenKind::LeftParenthesis).is_err() {
		reporter.error(span, "Expected '(' after compile-time conditional keyword");
		return None;
	}
	let condition = match parse_expr(cursor) {
		Ok(expr) => expr,
		Err(err) => {
			reporter.error(span, err.to_string());
			return None;
		}
	};
	if cursor.expect(&TokenKind::RightParenthesis).is_err() {
		reporter.error(span, "Expected ')' after compile-time conditional expression");
		return None;
	}
	Some(condition)
}

fn parse_ct_brace_block(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, span: crate::lexer::Span) -> Option<Vec<DeclId>> {
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, "Expected '{' to begin compile-time conditional body");
		return None;
	}
	let decls = parse_branch_decls(cursor, context, reporter);
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, "Expected '}' to close compile-time conditional body");
	}
	Some(decls)
}

/// Parses `$switch (scrutinee) { ($case TYPE: decls)* ($default: decls)? }`.
pub fn parse_ct_switch(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let Some(scrutinee) = parse_ct_condition(cursor, reporter, span) else {
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	};
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, "Expected '{' to begin '$switch' body");
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	let mut cases = Vec::new();
	while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
		if cursor.try_consume(&TokenKind::KeywordCtCase).is_some() {
			let case_span = cursor.span();
			let type_info = parse_type(cursor, reporter, ArrayContext::Normal);
			if cursor.expect(&TokenKind::Colon).is_err() {
				reporter.error(case_span, "Expected ':' after '$case' type");
			}
			let decls = parse_branch_decls(cursor, context, reporter);
			cases.push(CtCase { type_info: Some(type_info), decls });
		} else if cursor.try_consume(&TokenKind::KeywordCtDefault).is_some() {
			let case_span = cursor.span();
			if cursor.expect(&TokenKind::Colon).is_err() {
				reporter.error(case_span, "Expected ':' after '$default'");
			}
			let decls = parse_branch_decls(cursor, context, reporter);
			cases.push(CtCase { type_info: None, decls });
		} else {
			reporter.error(cursor.span(), format!("Expected '$case' or '$default' in '$switch' body but found '{}'", cursor.peek().kind));
			cursor.advance();
		}
	}
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, "Expected '}' to close '$switch' body");
	}

	let header = DeclHeader::new(None, span, Visibility::Local, std::rc::Rc::clone(&context.module_name));
	context.alloc_decl(Decl { header, kind: DeclKind::CtSwitch { scrutinee, cases } })
}

/// Parses `$assert (condition) (, "message")? ;`.
pub fn parse_ct_assert(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	if cursor.expect(&TokenKind::LeftParenthesis).is_err() {
		reporter.error(span, "Expected '(' after '$assert'");
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}
	let condition = match parse_expr(cursor) {
		Ok(expr) => expr,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let message = if cursor.try_consume(&TokenKind::Comma).is_some() {
		match parse_expr(cursor) {
			Ok(expr) => Some(expr),
			Err(err) => {
				reporter.error(span, err.to_string());
				None
			}
		}
	} else {
		None
	};
	if cursor.expect(&TokenKind::RightParenthesis).is_err() {
		reporter.error(span, "Expected ')' to close '$assert'");
	}
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after '$assert'");
	}
	let header = DeclHeader::new(None, span, Visibility::Local, std::rc::Rc::clone(&context.module_name));
	context.alloc_decl(Decl { header, kind: DeclKind::CtAssert { condition, message } })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;
	use crate::parser::decl::parse_top_level as parse_decl;

	fn parse_one(source: &str) -> (Decl, usize) {
		let tokens = tokenize(source).unwrap();
		let mut cursor = Cursor::new(&tokens);
		let mut context = Context::new(std::rc::Rc::from("test"));
		let mut reporter = Reporter::new();
		let id = parse_decl(&mut cursor, &mut context, &mut reporter);
		(context.decl(id).clone(), reporter.error_count())
	}

	#[test]
	fn parses_if_elif_else_with_nested_decls() {
		let (decl, errors) = parse_one("$if (1 < 2) { struct A {} } $elif (1 == 2) { struct B {} } $else { struct C {} }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::CtIf { ref then_decls, ref elifs, ref else_decls, .. }
			if then_decls.len() == 1 && elifs.len() == 1 && else_decls.as_ref().is_some_and(|d| d.len() == 1)));
	}

	#[test]
	fn parses_switch_with_case_and_default() {
		let (decl, errors) = parse_one("$switch (1) { $case int: struct A {} $default: struct B {} }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::CtSwitch { ref cases, .. } if cases.len() == 2));
	}

	#[test]
	fn parses_assert_with_message() {
		let (decl, errors) = parse_one("$assert (1 == 1, \"must hold\");");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::CtAssert { message: Some(_), .. }));
	}
}

//! The type-expression parser: `parse_base_type` and `parse_type_with_base` (data model
//! component C).
//!
//! Grounded in the teacher's `parser/expressions/util/types.rs`, which also walks a base type
//! then a suffix loop of pointer/array markers; this grammar's suffix loop is considerably
//! richer (four array flavors instead of one), and every failure here produces a poisoned
//! `TypeInfo` plus one `Reporter` diagnostic rather than propagating an `anyhow::Error`, per the
//! parse-error handling rule in `SPEC_FULL.md` §7.

use crate::{
	const_eval::parse_expr,
	cursor::Cursor,
	diagnostics::Reporter,
	lexer::TokenKind,
	path::{self, Name},
	types::{BuiltinType, TypeInfo, TypeInfoKind},
};

/// Whether a `[+]` incremental-array suffix is legal at this call site. Only the type of a
/// top-level `IDENT += initializer;` declaration may use it (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayContext {
	Normal,
	TopLevelIncremental,
}

/// Parses a full type expression: a base type followed by any number of pointer/array suffixes.
pub fn parse_type(cursor: &mut Cursor<'_>, reporter: &mut Reporter, context: ArrayContext) -> TypeInfo {
	let base = parse_base_type(cursor, reporter);
	let is_virtual = matches!(base.kind, TypeInfoKind::Identifier { is_virtual: true, .. });
	if is_virtual && !cursor.next_is(&TokenKind::Star) {
		reporter.error(base.span, "'virtual' requires a trailing '*' (a virtual type may only be used as a pointer)");
	}
	parse_type_with_base(cursor, reporter, base, context)
}

/// Parses an optional `virtual` qualifier followed by a built-in keyword, a bare `TYPE_IDENT`/
/// `$TYPE_IDENT`, or a path-prefixed type name.
pub fn parse_base_type(cursor: &mut Cursor<'_>, reporter: &mut Reporter) -> TypeInfo {
	let span = cursor.span();
	let is_virtual = cursor.try_consume(&TokenKind::KeywordVirtual).is_some();

	if cursor.try_consume(&TokenKind::KeywordTypeof).is_some() {
		if let Err(err) = cursor.expect(&TokenKind::LeftParenthesis) {
			reporter.error(span, err.to_string());
			return TypeInfo::poisoned(span);
		}
		let expr = match parse_expr(cursor) {
			Ok(expr) => expr,
			Err(err) => {
				reporter.error(span, err.to_string());
				return TypeInfo::poisoned(span);
			}
		};
		if let Err(err) = cursor.expect(&TokenKind::RightParenthesis) {
			reporter.error(span, err.to_string());
			return TypeInfo::poisoned(span);
		}
		return TypeInfo::new(TypeInfoKind::Expression(expr), span);
	}

	if let Some(builtin) = builtin_keyword(cursor) {
		cursor.advance();
		return TypeInfo::new(TypeInfoKind::Builtin(builtin), span);
	}

	if path::next_is_type_with_path_prefix(cursor) {
		let prefix = path::parse_path_prefix(cursor);
		return match path::consume_type_name(cursor) {
			Ok(name) => TypeInfo::new(TypeInfoKind::Identifier { path: prefix, name, is_virtual }, span),
			Err(err) => {
				reporter.error(span, err.to_string());
				TypeInfo::poisoned(span)
			}
		};
	}

	if matches!(cursor.peek().kind, TokenKind::TypeIdent | TokenKind::CtTypeIdent) {
		let name = Name { text: cursor.text(), span };
		cursor.advance();
		return TypeInfo::new(TypeInfoKind::Identifier { path: None, name, is_virtual }, span);
	}

	reporter.error(span, format!("Expected a type but found {}", cursor.peek().kind));
	TypeInfo::poisoned(span)
}

fn builtin_keyword(cursor: &Cursor<'_>) -> Option<BuiltinType> {
	Some(match cursor.peek().kind {
		TokenKind::KeywordVoid => BuiltinType::Void,
		TokenKind::KeywordBool => BuiltinType::Bool,
		TokenKind::KeywordChar => BuiltinType::Char,
		TokenKind::KeywordShort => BuiltinType::Short,
		TokenKind::KeywordInt => BuiltinType::Int,
		TokenKind::KeywordLong => BuiltinType::Long,
		TokenKind::KeywordUChar => BuiltinType::UChar,
		TokenKind::KeywordUShort => BuiltinType::UShort,
		TokenKind::KeywordUInt => BuiltinType::UInt,
		TokenKind::KeywordULong => BuiltinType::ULong,
		TokenKind::KeywordFloat => BuiltinType::Float,
		TokenKind::KeywordDouble => BuiltinType::Double,
		TokenKind::KeywordTypeId => BuiltinType::TypeId,
		TokenKind::KeywordErr => BuiltinType::Err,
		_ => return None,
	})
}

fn parse_type_with_base(cursor: &mut Cursor<'_>, reporter: &mut Reporter, mut ty: TypeInfo, context: ArrayContext) -> TypeInfo {
	loop {
		if cursor.try_consume(&TokenKind::Star).is_some() {
			let span = ty.span;
			ty = TypeInfo::new(TypeInfoKind::Pointer(Box::new(ty)), span);
			continue;
		}
		if !cursor.next_is(&TokenKind::LeftBracket) {
			break;
		}
		let span = cursor.span();
		cursor.advance();

		if cursor.try_consume(&TokenKind::RightBracket).is_some() {
			ty = TypeInfo::new(TypeInfoKind::SubArray { base: Box::new(ty) }, span);
			continue;
		}
		if cursor.try_consume(&TokenKind::Star).is_some() {
			ty = close_bracket_or_poison(cursor, reporter, span, TypeInfoKind::VarArray { base: Box::new(ty) });
			continue;
		}
		if cursor.try_consume(&TokenKind::Question).is_some() {
			ty = close_bracket_or_poison(cursor, reporter, span, TypeInfoKind::InferredArray { base: Box::new(ty) });
			continue;
		}
		if cursor.try_consume(&TokenKind::Plus).is_some() {
			if !matches!(context, ArrayContext::TopLevelIncremental) {
				reporter.error(span, "Incremental array type ('[+]') may only appear in a top-level incremental array declaration");
				let _ = cursor.expect(&TokenKind::RightBracket);
				ty = TypeInfo::poisoned(span);
			} else {
				ty = close_bracket_or_poison(cursor, reporter, span, TypeInfoKind::IncArray { base: Box::new(ty) });
			}
			continue;
		}

		let len_expr = match parse_expr(cursor) {
			Ok(expr) => expr,
			Err(err) => {
				reporter.error(span, err.to_string());
				ty = TypeInfo::poisoned(span);
				continue;
			}
		};
		ty = close_bracket_or_poison(cursor, reporter, span, TypeInfoKind::Array { base: Box::new(ty), len_expr });
	}
	ty
}

fn close_bracket_or_poison(cursor: &mut Cursor<'_>, reporter: &mut Reporter, span: crate::lexer::Span, kind: TypeInfoKind) -> TypeInfo {
	match cursor.expect(&TokenKind::RightBracket) {
		Ok(_) => TypeInfo::new(kind, span),
		Err(err) => {
			reporter.error(span, err.to_string());
			TypeInfo::poisoned(span)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	fn parse(source: &str) -> (TypeInfo, usize) {
		let tokens = tokenize(source).unwrap();
		let mut cursor = Cursor::new(&tokens);
		let mut reporter = Reporter::new();
		let ty = parse_type(&mut cursor, &mut reporter, ArrayContext::Normal);
		(ty, reporter.error_count())
	}

	#[test]
	fn parses_builtin_pointer() {
		let (ty, errors) = parse("int*");
		assert_eq!(errors, 0);
		assert!(matches!(ty.kind, TypeInfoKind::Pointer(inner) if matches!(inner.kind, TypeInfoKind::Builtin(BuiltinType::Int))));
	}

	#[test]
	fn parses_fixed_array_of_struct_type() {
		let (ty, errors) = parse("Foo[10]");
		assert_eq!(errors, 0);
		assert!(matches!(ty.kind, TypeInfoKind::Array { .. }));
	}

	#[test]
	fn parses_subarray_and_vararray_and_inferred() {
		let (sub, e1) = parse("char[]");
		let (var, e2) = parse("char[*]");
		let (inferred, e3) = parse("char[?]");
		assert_eq!((e1, e2, e3), (0, 0, 0));
		assert!(matches!(sub.kind, TypeInfoKind::SubArray { .. }));
		assert!(matches!(var.kind, TypeInfoKind::VarArray { .. }));
		assert!(matches!(inferred.kind, TypeInfoKind::InferredArray { .. }));
	}

	#[test]
	fn incremental_array_rejected_outside_top_level_context() {
		let tokens = tokenize("char[+]").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let mut reporter = Reporter::new();
		let ty = parse_type(&mut cursor, &mut reporter, ArrayContext::Normal);
		assert_eq!(reporter.error_count(), 1);
		assert!(ty.is_poisoned());
	}

	#[test]
	fn path_prefixed_type_is_parsed() {
		let (ty, errors) = parse("std::io::File");
		assert_eq!(errors, 0);
		assert!(matches!(ty.kind, TypeInfoKind::Identifier { path: Some(_), .. }));
	}

	#[test]
	fn virtual_without_trailing_star_is_rejected() {
		let (_, errors) = parse("virtual Shape");
		assert_eq!(errors, 1);
	}

	#[test]
	fn virtual_pointer_is_accepted() {
		let (ty, errors) = parse("virtual Shape*");
		assert_eq!(errors, 0);
		assert!(matches!(ty.kind, TypeInfoKind::Pointer(inner) if matches!(inner.kind, TypeInfoKind::Identifier { is_virtual: true, .. })));
	}
}

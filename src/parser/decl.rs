//! The top-level declaration dispatcher and every per-construct grammar it dispatches to
//! (component D): structs/unions/errs, enums, funcs, macros, generic funcs, interfaces, defines,
//! attribute definitions, global vars/consts, and incremental arrays.
//!
//! Grounded in the teacher's `parser/statements/mod.rs`, which dispatches on a leading keyword
//! token the same way; this module's dispatch table is considerably wider since it covers every
//! declaration form in the data model rather than one language's statement set. Statement and
//! expression bodies are out of scope (`SPEC_FULL.md` §1 Non-goals), so a `func`/`macro` body is
//! skipped as a balanced `{ ... }` run (`super::skip_balanced_braces`) once its signature has been
//! recorded, rather than parsed.

use std::rc::Rc;

use crate::{
	ast::{
		AggregateBody, Attribute, AttributeDomain, Decl, DeclHeader, DeclId, DeclKind, DefineDecl, DefineTypeRhs, EnumBody, EnumConstantBody, FuncDecl, GenericCase, GenericFuncDecl, MacroDecl,
		MacroParam, MacroParamKind, VarKind, Visibility,
	},
	const_eval::{fold, parse_expr, ConstExpr},
	cursor::Cursor,
	diagnostics::{Diagnostic, Reporter},
	lexer::TokenKind,
	path,
	scope::ScopeKind,
	session::Context,
	types::{TypeInfo, TypeInfoKind},
};

use super::{
	conditional,
	doc::parse_doc_comment,
	recover_top_level, skip_balanced_braces,
	types::{parse_type, ArrayContext},
};

/// Parses exactly one top-level construct: a compile-time conditional, or an ordinary
/// declaration. This is the entry point `Parser::parse_top_level_statement` delegates to, and the
/// one `conditional` re-enters to parse the declarations nested inside an `$if`/`$switch` branch.
pub fn parse_top_level(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let docs = parse_doc_comment(cursor);
	match cursor.peek().kind {
		TokenKind::KeywordCtIf => {
			reject_docs_before_conditional(docs, cursor, reporter);
			conditional::parse_ct_if(cursor, context, reporter)
		}
		TokenKind::KeywordCtSwitch => {
			reject_docs_before_conditional(docs, cursor, reporter);
			conditional::parse_ct_switch(cursor, context, reporter)
		}
		TokenKind::KeywordCtAssert => {
			reject_docs_before_conditional(docs, cursor, reporter);
			conditional::parse_ct_assert(cursor, context, reporter)
		}
		_ => parse_declaration(cursor, context, reporter, docs),
	}
}

fn reject_docs_before_conditional(docs: Option<crate::ast::DocComment>, cursor: &Cursor<'_>, reporter: &mut Reporter) {
	if let Some(docs) = docs {
		reporter.error(docs.span, "Doc comments are not permitted before a compile-time conditional");
		let _ = cursor;
	}
}

fn parse_declaration(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>) -> DeclId {
	let visibility = parse_visibility(cursor);
	let span = cursor.span();
	match cursor.peek().kind {
		TokenKind::KeywordStruct => parse_aggregate(cursor, context, reporter, docs, visibility, AggregateKind::Struct),
		TokenKind::KeywordUnion => parse_aggregate(cursor, context, reporter, docs, visibility, AggregateKind::Union),
		TokenKind::KeywordErr => parse_aggregate(cursor, context, reporter, docs, visibility, AggregateKind::Err),
		TokenKind::KeywordEnum => parse_enum(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordFunc => parse_func(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordMacro => parse_macro(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordGeneric => parse_generic(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordInterface => parse_interface(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordDefine => parse_define(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordAttribute => parse_attribute_def(cursor, context, reporter, docs, visibility),
		TokenKind::KeywordConst => parse_global_var(cursor, context, reporter, docs, visibility, true),
		TokenKind::Ident if matches!(cursor.peek_at(1).kind, TokenKind::PlusEqual) => parse_incremental_array(cursor, context, reporter, docs, visibility),
		_ => {
			if can_start_type(cursor) {
				parse_global_var(cursor, context, reporter, docs, visibility, false)
			} else {
				reporter.error(span, format!("Unexpected token '{}' at top level", cursor.peek().kind));
				recover_top_level(cursor);
				context.alloc_poisoned(span)
			}
		}
	}
}

fn parse_visibility(cursor: &mut Cursor<'_>) -> Visibility {
	if cursor.try_consume(&TokenKind::KeywordPrivate).is_some() {
		Visibility::Module
	} else if cursor.try_consume(&TokenKind::KeywordExtern).is_some() {
		Visibility::Extern
	} else {
		Visibility::Local
	}
}

fn can_start_type(cursor: &Cursor<'_>) -> bool {
	if path::next_is_type_with_path_prefix(cursor) {
		return true;
	}
	matches!(
		cursor.peek().kind,
		TokenKind::TypeIdent
			| TokenKind::CtTypeIdent
			| TokenKind::KeywordVirtual
			| TokenKind::KeywordTypeof
			| TokenKind::KeywordVoid
			| TokenKind::KeywordBool
			| TokenKind::KeywordChar
			| TokenKind::KeywordShort
			| TokenKind::KeywordInt
			| TokenKind::KeywordLong
			| TokenKind::KeywordUChar
			| TokenKind::KeywordUShort
			| TokenKind::KeywordUInt
			| TokenKind::KeywordULong
			| TokenKind::KeywordFloat
			| TokenKind::KeywordDouble
			| TokenKind::KeywordTypeId
			| TokenKind::KeywordErr
	)
}

/// Registers `name` in the current scope, poisoning and diagnosing `id` on a duplicate rather
/// than silently overwriting — the "two spans" diagnostic shape from `SPEC_FULL.md` §7.
fn register_name(context: &mut Context, name: &path::Name, id: DeclId, reporter: &mut Reporter) {
	if let Err(existing) = context.scopes.declare(Rc::clone(&name.text), id) {
		let prev_span = context.decl(existing).header.span;
		reporter.emit(Diagnostic::error(name.span, format!("'{}' is already declared in this scope", name.text)).with_note(prev_span, "previous declaration was here"));
		context.decl_mut(id).header.poisoned = true;
	}
}

/// Parses zero or more `@name(arg)?` attributes, flagging (but keeping) a repeated attribute name.
fn parse_attributes(cursor: &mut Cursor<'_>, reporter: &mut Reporter) -> Vec<Attribute> {
	let mut attributes: Vec<Attribute> = Vec::new();
	while cursor.try_consume(&TokenKind::At).is_some() {
		let span = cursor.span();
		let path_prefix = path::parse_path_prefix(cursor);
		let name = match path::consume_ident(cursor) {
			Ok(name) => name,
			Err(err) => {
				reporter.error(span, err.to_string());
				continue;
			}
		};
		let mut arg_expr = None;
		let mut alignment_value = None;
		if cursor.try_consume(&TokenKind::LeftParenthesis).is_some() {
			if !cursor.next_is(&TokenKind::RightParenthesis) {
				match parse_expr(cursor) {
					Ok(expr) => {
						if let Some(ConstExpr::Int(value)) = fold(&expr) {
							alignment_value = u64::try_from(value).ok();
						}
						arg_expr = Some(expr);
					}
					Err(err) => reporter.error(span, err.to_string()),
				}
			}
			if cursor.expect(&TokenKind::RightParenthesis).is_err() {
				reporter.error(span, "Expected ')' to close attribute argument");
			}
		}
		if let Some(existing) = attributes.iter().find(|existing| existing.name.text == name.text) {
			let prev_span = existing.span;
			reporter.emit(Diagnostic::error(span, format!("Attribute '{}' is already applied to this declaration", name.text)).with_note(prev_span, "previous occurrence was here"));
		}
		attributes.push(Attribute { name, path: path_prefix, arg_expr, alignment_value, span });
	}
	attributes
}

#[derive(Debug, Clone, Copy)]
enum AggregateKind {
	Struct,
	Union,
	Err,
}

fn parse_aggregate(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility, kind: AggregateKind) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let name = match path::consume_type_name(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let attributes = parse_attributes(cursor, reporter);
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, format!("Expected '{{' to begin the body of '{}'", name.text));
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	context.scopes.push_scope(if matches!(kind, AggregateKind::Union) { ScopeKind::Union } else { ScopeKind::Struct });
	let mut members = Vec::new();
	let mut is_substruct = false;
	let mut first_member = true;
	while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
		if first_member && matches!(cursor.peek().kind, TokenKind::KeywordStruct | TokenKind::KeywordUnion) && matches!(cursor.peek_at(1).kind, TokenKind::LeftBrace) {
			cursor.advance();
			if cursor.expect(&TokenKind::LeftBrace).is_err() {
				reporter.error(span, "Expected '{' to begin inline sub-aggregate body");
			} else {
				is_substruct = true;
				while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
					members.push(parse_member(cursor, context, reporter));
				}
				let _ = cursor.expect(&TokenKind::RightBrace);
				let _ = cursor.expect(&TokenKind::Semicolon);
			}
			first_member = false;
			continue;
		}
		members.push(parse_member(cursor, context, reporter));
		first_member = false;
	}
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, format!("Expected '}}' to close the body of '{}'", name.text));
	}
	context.scopes.pop_scope();

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let body = AggregateBody { is_substruct, ..AggregateBody::new(members) };
	let decl_kind = match kind {
		AggregateKind::Struct => DeclKind::Struct(body),
		AggregateKind::Union => DeclKind::Union(body),
		AggregateKind::Err => DeclKind::Err(body),
	};
	let id = context.alloc_decl(Decl { header, kind: decl_kind });
	register_name(context, &name, id, reporter);
	context.types.push(id);
	id
}

fn parse_member(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let docs = parse_doc_comment(cursor);
	let span = cursor.span();
	let type_info = parse_type(cursor, reporter, ArrayContext::Normal);
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			let _ = cursor.expect(&TokenKind::Semicolon);
			return context.alloc_poisoned(span);
		}
	};
	let initializer = if cursor.try_consume(&TokenKind::Equal).is_some() { parse_expr(cursor).ok() } else { None };
	let attributes = parse_attributes(cursor, reporter);
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after member declaration");
	}
	let mut header = DeclHeader::new(Some(name.clone()), span, Visibility::Local, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let id = context.alloc_decl(Decl {
		header,
		kind: DeclKind::Var { kind: VarKind::Member, type_info, is_failable: false, initializer },
	});
	register_name(context, &name, id, reporter);
	id
}

fn parse_enum(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let name = match path::consume_type_name(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let base_type = if cursor.try_consume(&TokenKind::Colon).is_some() {
		parse_type(cursor, reporter, ArrayContext::Normal)
	} else {
		TypeInfo::new(TypeInfoKind::Builtin(crate::types::BuiltinType::Int), span)
	};
	let parameters = if cursor.next_is(&TokenKind::LeftParenthesis) {
		let (params, _) = parse_value_params(cursor, context, reporter, span);
		params
	} else {
		Vec::new()
	};
	let attributes = parse_attributes(cursor, reporter);
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, format!("Expected '{{' to begin the body of '{}'", name.text));
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	context.scopes.push_scope(ScopeKind::Enum);
	let mut values = Vec::new();
	while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
		let const_docs = parse_doc_comment(cursor);
		let const_span = cursor.span();
		let const_name = match path::consume_const_name(cursor) {
			Ok(name) => name,
			Err(err) => {
				reporter.error(const_span, err.to_string());
				let _ = cursor.try_consume(&TokenKind::Comma);
				continue;
			}
		};
		let payload_args = if cursor.try_consume(&TokenKind::LeftParenthesis).is_some() {
			let mut args = Vec::new();
			if !cursor.next_is(&TokenKind::RightParenthesis) {
				loop {
					match parse_expr(cursor) {
						Ok(expr) => args.push(expr),
						Err(err) => {
							reporter.error(const_span, err.to_string());
							break;
						}
					}
					if cursor.try_consume(&TokenKind::Comma).is_none() {
						break;
					}
				}
			}
			let _ = cursor.expect(&TokenKind::RightParenthesis);
			args
		} else {
			Vec::new()
		};
		let value_expr = if cursor.try_consume(&TokenKind::Equal).is_some() { parse_expr(cursor).ok() } else { None };
		let ordinal = u32::try_from(values.len()).unwrap_or(u32::MAX);
		let mut header = DeclHeader::new(Some(const_name.clone()), const_span, Visibility::Local, Rc::clone(&context.module_name));
		header.docs = const_docs;
		let id = context.alloc_decl(Decl {
			header,
			kind: DeclKind::EnumConstant(EnumConstantBody { value_expr, payload_args, ordinal, int_value: None }),
		});
		register_name(context, &const_name, id, reporter);
		values.push(id);
		if cursor.try_consume(&TokenKind::Comma).is_none() {
			break;
		}
	}
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, format!("Expected '}}' to close the body of '{}'", name.text));
	}
	context.scopes.pop_scope();

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let id = context.alloc_decl(Decl {
		header,
		kind: DeclKind::Enum(EnumBody { base_type, values, parameters }),
	});
	register_name(context, &name, id, reporter);
	context.types.push(id);
	context.enums.push(id);
	id
}

/// Parses a `(TYPE name, ...)` parameter list shared by `func`/interface-member signatures.
/// Returns the parameter ids and whether a `vararg` parameter was seen.
fn parse_value_params(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, span: crate::lexer::Span) -> (Vec<DeclId>, bool) {
	if cursor.expect(&TokenKind::LeftParenthesis).is_err() {
		reporter.error(span, "Expected '(' to begin parameter list");
	}
	context.scopes.push_scope(ScopeKind::Generic);
	let mut params = Vec::new();
	let mut is_variadic = false;
	if !cursor.next_is(&TokenKind::RightParenthesis) {
		loop {
			let pspan = cursor.span();
			let is_vararg = cursor.try_consume(&TokenKind::KeywordVararg).is_some();
			let ptype = parse_type(cursor, reporter, ArrayContext::Normal);
			let pname = match path::consume_ident(cursor) {
				Ok(name) => name,
				Err(err) => {
					reporter.error(pspan, err.to_string());
					break;
				}
			};
			let default_value = if cursor.try_consume(&TokenKind::Equal).is_some() { parse_expr(cursor).ok() } else { None };
			if is_vararg {
				is_variadic = true;
			}
			let header = DeclHeader::new(Some(pname.clone()), pspan, Visibility::Local, Rc::clone(&context.module_name));
			let pkind = if is_vararg { VarKind::ParamVariadic } else { VarKind::Param };
			let pid = context.alloc_decl(Decl {
				header,
				kind: DeclKind::Var { kind: pkind, type_info: ptype, is_failable: false, initializer: default_value },
			});
			if let Err(existing) = context.scopes.declare(Rc::clone(&pname.text), pid) {
				let prev_span = context.decl(existing).header.span;
				reporter.emit(Diagnostic::error(pspan, format!("Duplicate parameter name '{}'", pname.text)).with_note(prev_span, "previous declaration was here"));
			}
			params.push(pid);
			if cursor.try_consume(&TokenKind::Comma).is_none() {
				break;
			}
		}
	}
	context.scopes.pop_scope();
	if cursor.expect(&TokenKind::RightParenthesis).is_err() {
		reporter.error(span, "Expected ')' to close parameter list");
	}
	(params, is_variadic)
}

fn parse_func(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let return_type = parse_type(cursor, reporter, ArrayContext::Normal);
	let is_failable = cursor.try_consume(&TokenKind::Bang).is_some();
	// A free function's own module path prefix is parsed (for forward compatibility with
	// fully-qualified declarations) but not retained: cross-module bookkeeping beyond the current
	// context is the documented simplification in `crate::resolve`.
	let _ = path::parse_path_prefix(cursor);
	let (parent_type, name) = if matches!(cursor.peek().kind, TokenKind::TypeIdent) && matches!(cursor.peek_at(1).kind, TokenKind::Dot) {
		let parent_name = path::Name { text: cursor.text(), span: cursor.span() };
		cursor.advance();
		cursor.advance();
		match path::consume_ident(cursor) {
			Ok(name) => (Some(parent_name), name),
			Err(err) => {
				reporter.error(span, err.to_string());
				recover_top_level(cursor);
				return context.alloc_poisoned(span);
			}
		}
	} else {
		match path::consume_ident(cursor) {
			Ok(name) => (None, name),
			Err(err) => {
				reporter.error(span, err.to_string());
				recover_top_level(cursor);
				return context.alloc_poisoned(span);
			}
		}
	};

	let (params, is_variadic) = parse_value_params(cursor, context, reporter, span);
	let attributes = parse_attributes(cursor, reporter);
	let has_body = if cursor.next_is(&TokenKind::LeftBrace) {
		skip_balanced_braces(cursor);
		true
	} else {
		if cursor.expect(&TokenKind::Semicolon).is_err() {
			reporter.error(span, "Expected ';' or a function body");
		}
		false
	};

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let is_method = parent_type.is_some();
	let id = context.alloc_decl(Decl {
		header,
		kind: DeclKind::Func(FuncDecl {
			return_type,
			is_failable,
			parent_type,
			params,
			is_variadic,
			has_body,
			is_interface_member: false,
			mangled_name: None,
		}),
	});
	if is_method {
		// Methods are keyed by (parent type, name), not by bare name, so they don't collide with
		// same-named methods on other types — `crate::analyse::func` owns that duplicate check
		// once the parent type is resolved.
		context.methods.push(id);
	} else {
		register_name(context, &name, id, reporter);
		context.functions.push(id);
	}
	id
}

fn parse_macro_param(cursor: &mut Cursor<'_>, reporter: &mut Reporter) -> MacroParam {
	let span = cursor.span();
	if cursor.try_consume(&TokenKind::Amp).is_some() {
		let name = match path::consume_ident(cursor) {
			Ok(name) => name,
			Err(err) => {
				reporter.error(span, err.to_string());
				path::Name { text: Rc::from(""), span }
			}
		};
		return MacroParam { kind: MacroParamKind::ByRef, declared_type: None, name };
	}
	match cursor.peek().kind {
		TokenKind::CtTypeIdent => {
			let name = path::Name { text: cursor.text(), span };
			cursor.advance();
			MacroParam { kind: MacroParamKind::CompileTimeType, declared_type: None, name }
		}
		TokenKind::CtIdent | TokenKind::CtConstIdent => {
			let name = path::Name { text: cursor.text(), span };
			cursor.advance();
			MacroParam { kind: MacroParamKind::CompileTimeValue, declared_type: None, name }
		}
		TokenKind::HashIdent | TokenKind::HashTypeIdent | TokenKind::HashConstIdent => {
			let name = path::Name { text: cursor.text(), span };
			cursor.advance();
			MacroParam { kind: MacroParamKind::Unevaluated, declared_type: None, name }
		}
		TokenKind::Ident => {
			let name = path::Name { text: cursor.text(), span };
			cursor.advance();
			MacroParam { kind: MacroParamKind::Value, declared_type: None, name }
		}
		_ => {
			reporter.error(span, format!("Expected a macro parameter but found '{}'", cursor.peek().kind));
			cursor.advance();
			MacroParam { kind: MacroParamKind::Value, declared_type: None, name: path::Name { text: Rc::from(""), span } }
		}
	}
}

fn parse_macro_param_list(cursor: &mut Cursor<'_>, reporter: &mut Reporter, span: crate::lexer::Span) -> Vec<MacroParam> {
	if cursor.expect(&TokenKind::LeftParenthesis).is_err() {
		reporter.error(span, "Expected '(' to begin parameter list");
	}
	let mut params = Vec::new();
	if !cursor.next_is(&TokenKind::RightParenthesis) {
		loop {
			params.push(parse_macro_param(cursor, reporter));
			if cursor.try_consume(&TokenKind::Comma).is_none() {
				break;
			}
		}
	}
	if cursor.expect(&TokenKind::RightParenthesis).is_err() {
		reporter.error(span, "Expected ')' to close parameter list");
	}
	params
}

fn parse_macro(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let return_type = if can_start_type(cursor) { Some(parse_type(cursor, reporter, ArrayContext::Normal)) } else { None };
	let is_failable = cursor.try_consume(&TokenKind::Bang).is_some();
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let params = parse_macro_param_list(cursor, reporter, span);
	let attributes = parse_attributes(cursor, reporter);
	if cursor.next_is(&TokenKind::LeftBrace) {
		skip_balanced_braces(cursor);
	} else if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' or a macro body");
	}

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let id = context.alloc_decl(Decl { header, kind: DeclKind::Macro(MacroDecl { return_type, is_failable, params }) });
	register_name(context, &name, id, reporter);
	context.global_decls.push(id);
	id
}

fn skip_case_block(cursor: &mut Cursor<'_>) {
	let mut depth: i32 = 0;
	loop {
		match cursor.peek().kind {
			TokenKind::LeftBrace => {
				depth += 1;
				cursor.advance();
			}
			TokenKind::RightBrace if depth > 0 => {
				depth -= 1;
				cursor.advance();
			}
			TokenKind::RightBrace | TokenKind::KeywordCtCase | TokenKind::KeywordCtDefault if depth == 0 => break,
			TokenKind::Eof => break,
			_ => {
				cursor.advance();
			}
		}
	}
}

fn parse_generic(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let return_type = if can_start_type(cursor) { Some(parse_type(cursor, reporter, ArrayContext::Normal)) } else { None };
	let path_prefix = path::parse_path_prefix(cursor);
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let params = parse_macro_param_list(cursor, reporter, span);
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, format!("Expected '{{' to begin the body of generic function '{}'", name.text));
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	let mut cases = Vec::new();
	while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
		if cursor.try_consume(&TokenKind::KeywordCtCase).is_some() {
			if cursor.expect(&TokenKind::LeftParenthesis).is_err() {
				reporter.error(span, "Expected '(' after '$case'");
			}
			let mut types = Vec::new();
			if !cursor.next_is(&TokenKind::RightParenthesis) {
				loop {
					types.push(parse_type(cursor, reporter, ArrayContext::Normal));
					if cursor.try_consume(&TokenKind::Comma).is_none() {
						break;
					}
				}
			}
			let _ = cursor.expect(&TokenKind::RightParenthesis);
			if cursor.expect(&TokenKind::Colon).is_err() {
				reporter.error(span, "Expected ':' after '$case' type list");
			}
			skip_case_block(cursor);
			cases.push(GenericCase { types, is_default: false });
		} else if cursor.try_consume(&TokenKind::KeywordCtDefault).is_some() {
			if cursor.expect(&TokenKind::Colon).is_err() {
				reporter.error(span, "Expected ':' after '$default'");
			}
			skip_case_block(cursor);
			cases.push(GenericCase { types: Vec::new(), is_default: true });
		} else {
			reporter.error(cursor.span(), format!("Expected '$case' or '$default' in generic function body but found '{}'", cursor.peek().kind));
			cursor.advance();
		}
	}
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, format!("Expected '}}' to close the body of generic function '{}'", name.text));
	}

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	let id = context.alloc_decl(Decl {
		header,
		kind: DeclKind::Generic(GenericFuncDecl { return_type, path: path_prefix, params, cases }),
	});
	register_name(context, &name, id, reporter);
	context.global_decls.push(id);
	id
}

fn parse_interface(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let name = match path::consume_type_name(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let attributes = parse_attributes(cursor, reporter);
	if cursor.expect(&TokenKind::LeftBrace).is_err() {
		reporter.error(span, format!("Expected '{{' to begin the body of '{}'", name.text));
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	context.scopes.push_scope(ScopeKind::Interface);
	let mut members = Vec::new();
	while !cursor.next_is(&TokenKind::RightBrace) && !cursor.at_end() {
		if !cursor.next_is(&TokenKind::KeywordFunc) {
			reporter.error(cursor.span(), format!("Expected a function signature in interface body but found '{}'", cursor.peek().kind));
			cursor.advance();
			continue;
		}
		members.push(parse_interface_member(cursor, context, reporter));
	}
	if cursor.expect(&TokenKind::RightBrace).is_err() {
		reporter.error(span, format!("Expected '}}' to close the body of '{}'", name.text));
	}
	context.scopes.pop_scope();

	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	header.attributes = attributes;
	let id = context.alloc_decl(Decl { header, kind: DeclKind::Interface { members } });
	register_name(context, &name, id, reporter);
	context.types.push(id);
	context.interfaces.push(id);
	id
}

fn parse_interface_member(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter) -> DeclId {
	let docs = parse_doc_comment(cursor);
	let span = cursor.span();
	cursor.advance();
	let return_type = parse_type(cursor, reporter, ArrayContext::Normal);
	let is_failable = cursor.try_consume(&TokenKind::Bang).is_some();
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			let _ = cursor.expect(&TokenKind::Semicolon);
			return context.alloc_poisoned(span);
		}
	};
	let (params, is_variadic) = parse_value_params(cursor, context, reporter, span);
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after interface member signature");
	}
	let mut header = DeclHeader::new(Some(name.clone()), span, Visibility::Local, Rc::clone(&context.module_name));
	header.docs = docs;
	let id = context.alloc_decl(Decl {
		header,
		kind: DeclKind::Func(FuncDecl {
			return_type,
			is_failable,
			parent_type: None,
			params,
			is_variadic,
			has_body: false,
			is_interface_member: true,
			mangled_name: None,
		}),
	});
	register_name(context, &name, id, reporter);
	id
}

fn parse_define_name(cursor: &mut Cursor<'_>) -> anyhow::Result<path::Name> {
	match cursor.peek().kind {
		TokenKind::TypeIdent => path::consume_type_name(cursor),
		TokenKind::ConstIdent => path::consume_const_name(cursor),
		_ => path::consume_ident(cursor),
	}
}

fn parse_generic_args(cursor: &mut Cursor<'_>, reporter: &mut Reporter) -> Vec<TypeInfo> {
	if cursor.try_consume(&TokenKind::LeftAngleBracket).is_none() {
		return Vec::new();
	}
	let mut args = Vec::new();
	if !cursor.next_is(&TokenKind::RightAngleBracket) {
		loop {
			args.push(parse_type(cursor, reporter, ArrayContext::Normal));
			if cursor.try_consume(&TokenKind::Comma).is_none() {
				break;
			}
		}
	}
	let _ = cursor.expect(&TokenKind::RightAngleBracket);
	args
}

fn parse_define(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let is_distinct = cursor.try_consume(&TokenKind::KeywordDistinct).is_some();
	let name = match parse_define_name(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	if cursor.expect(&TokenKind::Equal).is_err() {
		reporter.error(span, "Expected '=' in 'define' declaration");
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}

	// Ident-alias form: `path::TARGET<generic_args>`, rebinding to a symbol inside a (possibly
	// generic) module. Any other right-hand side is a type alias, distinguishing the two forms
	// purely by whether a `::`-qualified path prefix is present — a documented simplification
	// recorded in `DESIGN.md`.
	let kind = if matches!(cursor.peek().kind, TokenKind::Ident) && matches!(cursor.peek_at(1).kind, TokenKind::ColonColon) {
		let prefix = path::parse_path_prefix(cursor);
		let target = match parse_define_name(cursor) {
			Ok(name) => name,
			Err(err) => {
				reporter.error(span, err.to_string());
				path::Name { text: Rc::from(""), span }
			}
		};
		let generic_args = parse_generic_args(cursor, reporter);
		DeclKind::Define(DefineDecl::Ident { path: prefix, target, generic_args, instantiated_module: None })
	} else if cursor.next_is(&TokenKind::KeywordFunc) {
		cursor.advance();
		let return_type = parse_type(cursor, reporter, ArrayContext::Normal);
		let is_failable = cursor.try_consume(&TokenKind::Bang).is_some();
		let (params, is_variadic) = parse_value_params(cursor, context, reporter, span);
		DeclKind::Define(DefineDecl::Type {
			is_distinct,
			rhs: DefineTypeRhs::FuncSignature(FuncDecl {
				return_type,
				is_failable,
				parent_type: None,
				params,
				is_variadic,
				has_body: false,
				is_interface_member: false,
				mangled_name: None,
			}),
		})
	} else {
		let type_info = parse_type(cursor, reporter, ArrayContext::Normal);
		let generic_args = parse_generic_args(cursor, reporter);
		DeclKind::Define(DefineDecl::Type { is_distinct, rhs: DefineTypeRhs::Type(type_info, generic_args) })
	};

	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after 'define' declaration");
	}
	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	let id = context.alloc_decl(Decl { header, kind });
	register_name(context, &name, id, reporter);
	context.types.push(id);
	id
}

fn parse_domain(cursor: &mut Cursor<'_>, reporter: &mut Reporter) -> Option<AttributeDomain> {
	let span = cursor.span();
	let domain = match cursor.peek().kind {
		TokenKind::KeywordStruct => AttributeDomain::Struct,
		TokenKind::KeywordUnion => AttributeDomain::Union,
		TokenKind::KeywordConst => AttributeDomain::Const,
		TokenKind::KeywordErr => AttributeDomain::Error,
		TokenKind::KeywordEnum => AttributeDomain::Enum,
		TokenKind::Ident => {
			let text = cursor.text();
			let domain = match text.as_ref() {
				"func" => AttributeDomain::Func,
				"var" => AttributeDomain::Var,
				"typedef" => AttributeDomain::Typedef,
				"member" => AttributeDomain::Member,
				other => {
					reporter.error(span, format!("Unknown attribute domain '{other}'"));
					cursor.advance();
					return None;
				}
			};
			cursor.advance();
			return Some(domain);
		}
		_ => {
			reporter.error(span, format!("Expected an attribute domain but found '{}'", cursor.peek().kind));
			return None;
		}
	};
	cursor.advance();
	Some(domain)
}

fn parse_attribute_def(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	let span = cursor.span();
	cursor.advance();
	let mut domains = Vec::new();
	loop {
		match parse_domain(cursor, reporter) {
			Some(domain) => domains.push(domain),
			None => break,
		}
		if cursor.try_consume(&TokenKind::Comma).is_none() {
			break;
		}
	}
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let has_arg = cursor.try_consume(&TokenKind::LeftParenthesis).is_some();
	if has_arg && cursor.expect(&TokenKind::RightParenthesis).is_err() {
		reporter.error(span, "Expected ')' after attribute argument placeholder");
	}
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after attribute declaration");
	}
	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	let id = context.alloc_decl(Decl { header, kind: DeclKind::AttributeDef { domains, has_arg } });
	register_name(context, &name, id, reporter);
	context.types.push(id);
	id
}

fn parse_global_var(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility, is_const: bool) -> DeclId {
	let span = cursor.span();
	if is_const {
		cursor.advance();
	}
	let type_info = parse_type(cursor, reporter, ArrayContext::Normal);
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	let initializer = if cursor.try_consume(&TokenKind::Equal).is_some() { parse_expr(cursor).ok() } else { None };
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after global declaration");
	}
	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	let kind = DeclKind::Var {
		kind: if is_const { VarKind::Const } else { VarKind::Global },
		type_info,
		is_failable: false,
		initializer,
	};
	let id = context.alloc_decl(Decl { header, kind });
	register_name(context, &name, id, reporter);
	context.global_decls.push(id);
	id
}

fn parse_incremental_array(cursor: &mut Cursor<'_>, context: &mut Context, reporter: &mut Reporter, docs: Option<crate::ast::DocComment>, visibility: Visibility) -> DeclId {
	if let Some(docs) = &docs {
		reporter.error(docs.span, "Doc comments are not permitted before an incremental array declaration");
	}
	let span = cursor.span();
	let name = match path::consume_ident(cursor) {
		Ok(name) => name,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	if cursor.expect(&TokenKind::PlusEqual).is_err() {
		reporter.error(span, "Expected '+=' in incremental array declaration");
		recover_top_level(cursor);
		return context.alloc_poisoned(span);
	}
	let element = match parse_expr(cursor) {
		Ok(expr) => expr,
		Err(err) => {
			reporter.error(span, err.to_string());
			recover_top_level(cursor);
			return context.alloc_poisoned(span);
		}
	};
	if cursor.expect(&TokenKind::Semicolon).is_err() {
		reporter.error(span, "Expected ';' after incremental array initializer");
	}

	if let Some(existing_id) = context.scopes.resolve_symbol_in_current_dynamic_scope(&name.text) {
		if let DeclKind::ArrayValue { elements, .. } = &mut context.decl_mut(existing_id).kind {
			elements.push(element);
			return existing_id;
		}
		let prev_span = context.decl(existing_id).header.span;
		reporter.emit(Diagnostic::error(span, format!("'{}' is already declared and is not an incremental array", name.text)).with_note(prev_span, "previous declaration was here"));
		return context.alloc_poisoned(span);
	}

	let element_type = TypeInfo::new(TypeInfoKind::Expression(element.clone()), span);
	let mut header = DeclHeader::new(Some(name.clone()), span, visibility, Rc::clone(&context.module_name));
	header.docs = docs;
	let id = context.alloc_decl(Decl { header, kind: DeclKind::ArrayValue { element_type, elements: vec![element] } });
	register_name(context, &name, id, reporter);
	context.global_decls.push(id);
	id
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	fn parse_one(source: &str) -> (Decl, usize) {
		let tokens = tokenize(source).unwrap();
		let mut cursor = Cursor::new(&tokens);
		let mut context = Context::new(Rc::from("test"));
		let mut reporter = Reporter::new();
		let id = parse_top_level(&mut cursor, &mut context, &mut reporter);
		(context.decl(id).clone(), reporter.error_count())
	}

	#[test]
	fn parses_struct_with_members_and_attribute() {
		let (decl, errors) = parse_one("struct Point @packed { int x; int y; }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Struct(ref body) if body.members.len() == 2));
		assert_eq!(decl.header.attributes.len(), 1);
	}

	#[test]
	fn parses_inline_substruct_promotion() {
		let (decl, errors) = parse_one("struct Outer { struct { int a; int b; } int c; }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Struct(ref body) if body.is_substruct && body.members.len() == 3));
	}

	#[test]
	fn parses_enum_with_payload_and_base_type() {
		let (decl, errors) = parse_one("enum Shape : int { CIRCLE(1), SQUARE(2) }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Enum(ref body) if body.values.len() == 2));
	}

	#[test]
	fn parses_func_with_failable_marker_and_params() {
		let (decl, errors) = parse_one("func int! compute(int a, int b) { }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Func(ref f) if f.is_failable && f.params.len() == 2 && f.has_body));
	}

	#[test]
	fn parses_method_without_registering_bare_name() {
		let (decl, errors) = parse_one("func void Point.reset();");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Func(ref f) if f.parent_type.is_some() && !f.has_body));
	}

	#[test]
	fn parses_macro_with_sigil_params() {
		let (decl, errors) = parse_one("macro log($T, &value, #expr) { }");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Macro(ref m) if m.params.len() == 3));
	}

	#[test]
	fn parses_define_type_alias() {
		let (decl, errors) = parse_one("define Meters = float;");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Define(DefineDecl::Type { is_distinct: false, .. })));
	}

	#[test]
	fn parses_define_ident_alias_with_generic_args() {
		let (decl, errors) = parse_one("define IntList = list::N<int>;");
		assert_eq!(errors, 0);
		assert!(matches!(decl.kind, DeclKind::Define(DefineDecl::Ident { ref generic_args, .. }) if generic_args.len() == 1));
	}

	#[test]
	fn duplicate_member_name_is_poisoned_with_note() {
		let (_, errors) = parse_one("struct Dup { int a; int a; }");
		assert_eq!(errors, 1);
	}

	#[test]
	fn incremental_array_accumulates_across_declarations() {
		let tokens = tokenize("TABLE += 1; TABLE += 2;").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let mut context = Context::new(Rc::from("test"));
		let mut reporter = Reporter::new();
		let first = parse_top_level(&mut cursor, &mut context, &mut reporter);
		let second = parse_top_level(&mut cursor, &mut context, &mut reporter);
		assert_eq!(first, second);
		assert!(matches!(&context.decl(first).kind, DeclKind::ArrayValue{elements, ..} if elements.len() == 2));
		assert_eq!(reporter.error_count(), 0);
	}
}

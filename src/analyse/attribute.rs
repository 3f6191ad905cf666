//! Attribute application: validates every `@name(arg)` already parsed onto a declaration's
//! header against the domain table, then applies the handful of built-in attributes that affect
//! layout or linkage (`@packed`, `@align`, `@section`, `@cname`, `@opaque`).
//!
//! Grounded in the data model's attribute domain table (component K): a custom `attribute`
//! declaration's own `domains` list is checked the same way a built-in attribute's implicit
//! domain is, so `@my_custom_attr` on the wrong kind of declaration is diagnosed identically to
//! `@packed` on a `func`.

use std::rc::Rc;

use crate::{
	ast::{AttributeDomain, DeclId, DeclKind, VarKind},
	const_eval::{fold, ConstExpr},
	session::{CompilationSession, ModuleId},
};

fn domain_of(kind: &DeclKind) -> Option<AttributeDomain> {
	Some(match kind {
		DeclKind::Func(_) => AttributeDomain::Func,
		DeclKind::Var { kind: VarKind::Const, .. } => AttributeDomain::Const,
		DeclKind::Var { kind: VarKind::Member, .. } => AttributeDomain::Member,
		DeclKind::Var { .. } => AttributeDomain::Var,
		DeclKind::Enum(_) => AttributeDomain::Enum,
		DeclKind::Struct(_) => AttributeDomain::Struct,
		DeclKind::Union(_) => AttributeDomain::Union,
		DeclKind::Err(_) => AttributeDomain::Error,
		DeclKind::Typedef { .. } | DeclKind::Distinct { .. } | DeclKind::Define(_) => AttributeDomain::Typedef,
		_ => return None,
	})
}

fn fold_str(expr: &crate::const_eval::Expr) -> Option<Rc<str>> {
	match fold(expr)? {
		ConstExpr::Str(text) => Some(text),
		_ => None,
	}
}

/// Applies and validates every attribute attached to `id`. A no-op for declarations that carry
/// no attributes, or whose kind has no attribute domain (params, imports, enum constants, …).
pub fn apply(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) {
	let Some(domain) = domain_of(&session.modules[module_id.0].contexts[context_index].decl(id).kind) else {
		return;
	};
	let attributes = session.modules[module_id.0].contexts[context_index].decl(id).header.attributes.clone();
	for attribute in &attributes {
		match attribute.name.text.as_ref() {
			"packed" => {
				if !matches!(domain, AttributeDomain::Struct | AttributeDomain::Union | AttributeDomain::Error) {
					session.reporter.error(attribute.span, "'@packed' only applies to a struct, union, or err declaration");
					continue;
				}
				session.modules[module_id.0].contexts[context_index].decl_mut(id).header.is_packed = true;
			}
			"align" => {
				let value = attribute.alignment_value;
				match value {
					Some(value) => session.modules[module_id.0].contexts[context_index].decl_mut(id).header.alignment = Some(value),
					None => session.reporter.error(attribute.span, "'@align' requires a constant integer argument"),
				}
			}
			"section" => {
				let text = attribute.arg_expr.as_ref().and_then(fold_str);
				match text {
					Some(text) => session.modules[module_id.0].contexts[context_index].decl_mut(id).header.section = Some(text),
					None => session.reporter.error(attribute.span, "'@section' requires a constant string argument"),
				}
			}
			"cname" => {
				let text = attribute.arg_expr.as_ref().and_then(fold_str);
				match text {
					Some(text) => session.modules[module_id.0].contexts[context_index].decl_mut(id).header.cname = Some(text),
					None => session.reporter.error(attribute.span, "'@cname' requires a constant string argument"),
				}
			}
			"opaque" => {
				if !matches!(domain, AttributeDomain::Struct | AttributeDomain::Union) {
					session.reporter.error(attribute.span, "'@opaque' only applies to a struct or union declaration");
					continue;
				}
				session.modules[module_id.0].contexts[context_index].decl_mut(id).header.is_opaque = true;
			}
			custom => validate_custom(session, module_id, context_index, custom, domain, attribute.span),
		}
	}
}

fn validate_custom(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, name: &str, domain: AttributeDomain, span: crate::lexer::Span) {
	let lookup = session.modules[module_id.0].contexts[context_index].scopes.resolve_normal_symbol(name);
	let Some(attr_decl_id) = lookup else {
		session.reporter.error(span, format!("Unknown attribute '@{name}'"));
		return;
	};
	let DeclKind::AttributeDef { domains, .. } = &session.modules[module_id.0].contexts[context_index].decl(attr_decl_id).kind else {
		session.reporter.error(span, format!("'{name}' is not a declared attribute"));
		return;
	};
	if !domains.contains(&domain) {
		session.reporter.error(span, format!("Attribute '@{name}' does not apply to this kind of declaration"));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::TargetConfig;

	/// Members are allocated in the arena before the struct that owns them, so the struct's own
	/// id is whichever one `context.types` records last, never `DeclId(0)`.
	fn last_type_id(session: &CompilationSession, module_id: ModuleId) -> DeclId {
		*session.context(module_id, 0).types.last().unwrap()
	}

	#[test]
	fn packed_attribute_sets_header_flag() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo @packed { int a; }")).unwrap();
		let id = last_type_id(&session, module_id);
		apply(&mut session, module_id, 0, id);
		assert!(session.context(module_id, 0).decl(id).header.is_packed);
	}

	#[test]
	fn unknown_attribute_is_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo @nonsense { int a; }")).unwrap();
		let id = last_type_id(&session, module_id);
		apply(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}
}

//! Enum analysis: resolves the base type and computes each constant's integer value, auto-
//! incrementing from the previous constant when no explicit `= expr` is given (component G).
//!
//! Grounded in the teacher's `compiler/compile_expression.rs` enum-constant folding, generalized
//! to walk a whole `enum` body once rather than fold one reference at a time: every constant's
//! `int_value` is computed up front during analysis, so later phases (code generation, in a full
//! compiler) never need to re-walk the chain to find a constant's numeric value.

use crate::{
	ast::{DeclId, DeclKind},
	const_eval::{fold, ConstExpr},
	session::{CompilationSession, ModuleId},
};

use super::{attribute, resolve_or_bail};

/// Resolves the base type and every constant's value for the enum declaration `id`.
pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let (base_type, values) = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Enum(body) = &context.decl(id).kind else { return None };
		(body.base_type.clone(), body.values.clone())
	};

	let base_handle = match resolve_or_bail(session, module_id, context_index, &base_type, false) {
		Ok(handle) => handle,
		Err(dep) => return Some(dep),
	};
	if !is_integer_handle(session, base_handle) {
		let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
		session.reporter.error(span, "An 'enum' base type must be an integer type");
	}

	let mut next_value: i128 = 0;
	for value_id in &values {
		let value_expr = {
			let context = &session.modules[module_id.0].contexts[context_index];
			let DeclKind::EnumConstant(body) = &context.decl(*value_id).kind else { continue };
			body.value_expr.clone()
		};
		let resolved = match &value_expr {
			Some(expr) => match fold(expr) {
				Some(ConstExpr::Int(value)) => value,
				_ => {
					let span = session.modules[module_id.0].contexts[context_index].decl(*value_id).header.span;
					session.reporter.error(span, "Enum constant value must be a constant integer expression");
					next_value
				}
			},
			None => next_value,
		};
		next_value = resolved + 1;

		let decl = session.modules[module_id.0].contexts[context_index].decl_mut(*value_id);
		if let DeclKind::EnumConstant(body) = &mut decl.kind {
			body.int_value = Some(resolved);
		}
		decl.header.resolve_status = crate::types::ResolveStatus::Done;
	}

	let handle = session.type_interner.intern_nominal(id, session.type_interner.get(base_handle).size, session.type_interner.get(base_handle).abi_alignment);
	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
	None
}

fn is_integer_handle(session: &CompilationSession, handle: crate::types::TypeHandle) -> bool {
	matches!(session.type_interner.get(handle).kind, crate::types::TypeKind::Builtin(b) if b.is_integer())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	/// Constants are allocated in the arena before the enum that owns them, so the enum's own id
	/// is whichever one `context.enums` records last, never `DeclId(0)`.
	fn last_enum_id(session: &CompilationSession, module_id: ModuleId) -> DeclId {
		*session.context(module_id, 0).enums.last().unwrap()
	}

	#[test]
	fn auto_increments_from_previous_constant() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("enum Color { Red, Green, Blue }")).unwrap();
		let id = last_enum_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Enum(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected enum") };
		let int_values: Vec<_> = body
			.values
			.iter()
			.map(|v| {
				let DeclKind::EnumConstant(c) = &session.context(module_id, 0).decl(*v).kind else { panic!("expected constant") };
				c.int_value
			})
			.collect();
		assert_eq!(int_values, vec![Some(0), Some(1), Some(2)]);
	}

	#[test]
	fn explicit_value_resets_the_increment() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("enum Color { Red = 5, Green, Blue = 1, Purple }")).unwrap();
		let id = last_enum_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Enum(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected enum") };
		let int_values: Vec<_> = body
			.values
			.iter()
			.map(|v| {
				let DeclKind::EnumConstant(c) = &session.context(module_id, 0).decl(*v).kind else { panic!("expected constant") };
				c.int_value
			})
			.collect();
		assert_eq!(int_values, vec![Some(5), Some(6), Some(1), Some(2)]);
	}

	#[test]
	fn non_integer_base_type_is_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("enum Color : float { Red }")).unwrap();
		let id = last_enum_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}
}

//! The semantic analyser: drives every top-level declaration from `NotDone` to `Done`, computing
//! layout, resolving types, and checking each construct's own invariants along the way.
//!
//! Grounded in the teacher's `check/mod.rs` dispatch-by-`DeclKind` loop, reshaped around the tri-
//! state `NotDone`/`Running`/`Done` walk `crate::resolve` already establishes for individual
//! `TypeInfo` nodes: `analyse_decl` extends the same walk to whole declarations, so a struct whose
//! member type names another not-yet-analysed struct detours through that declaration first
//! rather than failing. Per-kind logic lives in sibling modules (`layout`, `enum_`, `func`, …) as
//! free functions taking `&mut CompilationSession` directly, each returning `Option<DeclId>` — the
//! one further declaration (if any) that must reach `Done` before this one can. `analyse_decl`
//! itself owns the retry loop: on `Some(dep)` it recurses into `dep`, then re-runs the same
//! per-kind function, which is safe to repeat because every sub-step it already finished (a
//! member's already-resolved `TypeInfo`, an already-applied attribute) is idempotent.

pub mod attribute;
pub mod define;
pub mod enum_;
pub mod func;
pub mod generic_fn;
pub mod interface;
pub mod layout;
pub mod typedef;

use crate::{
	ast::{DeclId, DeclKind, VarKind},
	const_eval::fold,
	lexer::Span,
	session::{CompilationSession, ModuleId},
	types::{BuiltinType, ResolveStatus, TypeHandle, TypeInfo, TypeInfoKind, TypeKind},
};

#[derive(Clone, Copy)]
enum Tag {
	Aggregate,
	Enum,
	Func,
	TypedefLike,
	Interface,
	Define,
	Generic,
	Var,
	Other,
}

fn tag_of(kind: &DeclKind) -> Tag {
	match kind {
		DeclKind::Struct(_) | DeclKind::Union(_) | DeclKind::Err(_) => Tag::Aggregate,
		DeclKind::Enum(_) => Tag::Enum,
		DeclKind::Func(_) => Tag::Func,
		DeclKind::Typedef { .. } | DeclKind::Distinct { .. } => Tag::TypedefLike,
		DeclKind::Interface { .. } => Tag::Interface,
		DeclKind::Define(_) => Tag::Define,
		DeclKind::Generic(_) => Tag::Generic,
		DeclKind::Var { .. } => Tag::Var,
		_ => Tag::Other,
	}
}

/// Drives declaration `id` to `Done`, detouring through whatever other declaration it names first
/// if necessary. A no-op if `id` is already `Done`; reports and poisons a genuine cycle rather
/// than looping forever.
pub fn analyse_decl(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) {
	loop {
		let status = session.modules[module_id.0].contexts[context_index].decl(id).header.resolve_status;
		match status {
			ResolveStatus::Done => return,
			ResolveStatus::Running => {
				let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
				session.reporter.error(span, "Recursive definition");
				let decl = session.modules[module_id.0].contexts[context_index].decl_mut(id);
				decl.header.resolve_status = ResolveStatus::Done;
				decl.header.poisoned = true;
				return;
			}
			ResolveStatus::NotDone => {}
		}

		session.modules[module_id.0].contexts[context_index].decl_mut(id).header.resolve_status = ResolveStatus::Running;

		let tag = tag_of(&session.modules[module_id.0].contexts[context_index].decl(id).kind);
		let need = match tag {
			Tag::Aggregate => layout::analyse(session, module_id, context_index, id),
			Tag::Enum => enum_::analyse(session, module_id, context_index, id),
			Tag::Func => func::analyse(session, module_id, context_index, id),
			Tag::TypedefLike => typedef::analyse(session, module_id, context_index, id),
			Tag::Interface => interface::analyse(session, module_id, context_index, id),
			Tag::Define => define::analyse(session, module_id, context_index, id),
			Tag::Generic => generic_fn::analyse(session, module_id, context_index, id),
			Tag::Var => analyse_var(session, module_id, context_index, id),
			Tag::Other => None,
		};

		match need {
			Some(dep) => {
				session.modules[module_id.0].contexts[context_index].decl_mut(id).header.resolve_status = ResolveStatus::NotDone;
				analyse_decl(session, module_id, context_index, dep);
			}
			None => {
				session.modules[module_id.0].contexts[context_index].decl_mut(id).header.resolve_status = ResolveStatus::Done;
				return;
			}
		}
	}
}

/// Resolves a global or const variable's declared type, folding its initializer (if it has one
/// and is a `const`) purely to catch a non-constant initializer early; the folded value itself
/// isn't retained beyond that check since this crate has no code generator to hand it to.
fn analyse_var(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let (kind, span) = {
		let decl = session.modules[module_id.0].contexts[context_index].decl(id);
		let DeclKind::Var { kind, .. } = decl.kind else { return None };
		(kind, decl.header.span)
	};

	let resolved = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Var { type_info, .. } = &context.decl(id).kind else { return None };
		crate::resolve::resolve_type_shallow(context, &mut session.type_interner, &mut session.reporter, &session.target, type_info, true)
	};
	let handle = match resolved {
		crate::resolve::Resolved::Handle(handle) => handle,
		crate::resolve::Resolved::NeedsDecl(dep) => return Some(dep),
	};

	if kind == VarKind::Const {
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Var { initializer, .. } = &context.decl(id).kind else { return None };
		if let Some(initializer) = initializer {
			if fold(initializer).is_none() {
				session.reporter.error(span, "'const' initializer must be a constant expression");
			}
		}
	}

	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
	None
}

/// Shared helper used by every per-kind analyser: resolves one `TypeInfo` against this context,
/// bailing out with the dependency `DeclId` if resolution needs another declaration first.
pub(crate) fn resolve_or_bail(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, type_info: &TypeInfo, allow_inferred: bool) -> Result<crate::types::TypeHandle, DeclId> {
	let context = &session.modules[module_id.0].contexts[context_index];
	match crate::resolve::resolve_type_shallow(context, &mut session.type_interner, &mut session.reporter, &session.target, type_info, allow_inferred) {
		crate::resolve::Resolved::Handle(handle) => Ok(handle),
		crate::resolve::Resolved::NeedsDecl(dep) => Err(dep),
	}
}

/// Whether `type_info` is a pointer to a `virtual`-qualified interface — the one shape `distinct`
/// disallows that can't be read off a resolved `TypeHandle`, since the `virtual` qualifier lives
/// only on the un-resolved `TypeInfo`.
pub(crate) fn is_virtual_pointer(type_info: &TypeInfo) -> bool {
	matches!(&type_info.kind, TypeInfoKind::Pointer(inner) if matches!(inner.kind, TypeInfoKind::Identifier { is_virtual: true, .. }))
}

/// Whether `distinct` may legally wrap a type resolved to `target_handle`, given whether the
/// un-resolved right-hand side was a virtual interface pointer (see `is_virtual_pointer`).
/// Disallows that shape plus the `err`/`void`/`typeid` builtins; reports and returns `false` if
/// disallowed.
pub(crate) fn check_distinct_target(session: &mut CompilationSession, is_virtual: bool, target_handle: TypeHandle, span: Span) -> bool {
	let is_disallowed_builtin = matches!(session.type_interner.get(target_handle).kind, TypeKind::Builtin(BuiltinType::Err | BuiltinType::Void | BuiltinType::TypeId));
	if is_virtual || is_disallowed_builtin {
		session.reporter.error(span, "'distinct' cannot be applied to a virtual interface pointer, 'err', 'void', or 'typeid'");
		return false;
	}
	true
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
	fn analyse_decl_is_idempotent() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo { int a; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let handle_first = session.context(module_id, 0).decl(id).header.type_handle;
		analyse_decl(&mut session, module_id, 0, id);
        let handle_second = session.context(module_id, 0).decl(id).header.type_handle;
		assert_eq!(handle_first, handle_second);
	}

	#[test]
	fn cross_struct_reference_resolves_via_detour() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Inner { int a; } struct Outer { Inner nested; }")).unwrap();
		let outer_id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, outer_id);
		assert!(session.context(module_id, 0).decl(outer_id).header.type_handle.is_some());
		assert_eq!(session.reporter.error_count(), 0);
	}

	#[test]
	fn self_referential_struct_by_value_is_reported_as_cycle() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Node { Node next; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}
}

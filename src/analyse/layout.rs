//! Struct/union/err layout: member offsets, overall size, and padding (component F).
//!
//! Grounded in the teacher's own struct-size computation in `compiler/compile_expression.rs`
//! (the `sizeof` case), generalized from "one known-size C type" to "walk every member, resolving
//! its type first." A union's size is its largest member's size with no offset accumulation (every
//! member's own `header.offset` is `0`); an `err` payload piggybacks on the same walk but must
//! additionally fit in one pointer-sized slot, since this language represents every `err` value as
//! a tagged pointer at the ABI boundary. Each member's own attributes (`@align` in particular) are
//! applied before its offset is computed, so a member can force its own alignment independently of
//! the aggregate's `@packed`/`@align`.

use crate::{
	ast::{DeclId, DeclKind},
	session::{CompilationSession, ModuleId},
	types::align_up,
};

use super::{attribute, resolve_or_bail};

/// Lays out the members of the struct/union/err declaration `id`, interning its nominal type once
/// every member has a resolved handle. Returns `Some(dep)` if a member's type names a declaration
/// that isn't `Done` yet.
pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let is_union = matches!(session.modules[module_id.0].contexts[context_index].decl(id).kind, DeclKind::Union(_));
	let is_err = matches!(session.modules[module_id.0].contexts[context_index].decl(id).kind, DeclKind::Err(_));
	let packed = session.modules[module_id.0].contexts[context_index].decl(id).header.is_packed;
	let members = match &session.modules[module_id.0].contexts[context_index].decl(id).kind {
		DeclKind::Struct(body) | DeclKind::Union(body) | DeclKind::Err(body) => body.members.clone(),
		_ => return None,
	};

	let mut handles = Vec::with_capacity(members.len());
	for member_id in &members {
		attribute::apply(session, module_id, context_index, *member_id);
		let type_info = {
			let context = &session.modules[module_id.0].contexts[context_index];
			match &context.decl(*member_id).kind {
				DeclKind::Var { type_info, .. } => type_info.clone(),
				_ => continue,
			}
		};
		match resolve_or_bail(session, module_id, context_index, &type_info, false) {
			Ok(handle) => handles.push(handle),
			Err(dep) => return Some(dep),
		}
	}

	let mut offset = 0u64;
	let mut max_align = 1u64;
	let mut max_size = 0u64;
	let mut union_rep = None;
	for (index, handle) in handles.iter().enumerate() {
		let member_id = members[index];
		let ty = session.type_interner.get(*handle);
		let member_alignment = session.modules[module_id.0].contexts[context_index].decl(member_id).header.alignment;
		let effective_alignment = member_alignment.unwrap_or(ty.abi_alignment);
		if member_alignment.is_some() || !packed {
			max_align = max_align.max(effective_alignment);
		}
		if is_union {
			if ty.size > max_size {
				max_size = ty.size;
				union_rep = Some(index);
			}
			session.modules[module_id.0].contexts[context_index].decl_mut(member_id).header.offset = 0;
		} else {
			if member_alignment.is_some() || !packed {
				offset = align_up(offset, effective_alignment);
			}
			session.modules[module_id.0].contexts[context_index].decl_mut(member_id).header.offset = offset;
			offset += ty.size;
		}
	}

	let (mut size, padding) = if is_union {
		(max_size, 0)
	} else if packed {
		(offset, 0)
	} else {
		let padded = align_up(offset, max_align);
		(padded, padded - offset)
	};
	if let Some(forced_align) = session.modules[module_id.0].contexts[context_index].decl(id).header.alignment {
		max_align = forced_align;
		size = align_up(size, forced_align);
	}

	if is_err {
		let pointer_width = session.target.pointer_width_bytes;
		if size > pointer_width {
			let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
			session.reporter.error(span, "'err' payload does not fit in a pointer-sized value on this target");
		}
		size = pointer_width;
		max_align = pointer_width;
	}

	{
		let decl = session.modules[module_id.0].contexts[context_index].decl_mut(id);
		if let DeclKind::Struct(body) | DeclKind::Union(body) | DeclKind::Err(body) = &mut decl.kind {
			body.size = size;
			body.padding = padding;
			body.union_rep = union_rep;
		}
	}

	let handle = session.type_interner.intern_nominal(id, size, max_align);
	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	/// Members are allocated in the arena before the aggregate that owns them, so the aggregate's
	/// own id is whichever one `context.types` records last, never `DeclId(0)`.
	fn last_type_id(session: &CompilationSession, module_id: ModuleId) -> DeclId {
		*session.context(module_id, 0).types.last().unwrap()
	}

	#[test]
	fn struct_layout_inserts_tail_padding() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo { char a; long b; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Struct(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected struct") };
		assert_eq!(body.size, 16);
		assert_eq!(body.padding, 7);
	}

	#[test]
	fn union_size_is_largest_member() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("union U { int a; long b; char c; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Union(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected union") };
		assert_eq!(body.size, 8);
		assert_eq!(body.union_rep, Some(1));
	}

	#[test]
	fn packed_struct_has_no_padding() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo @packed { char a; long b; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Struct(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected struct") };
		assert_eq!(body.size, 9);
		assert_eq!(body.padding, 0);
	}

	#[test]
	fn err_payload_larger_than_pointer_is_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("err Big { long a; long b; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}

	#[test]
	fn struct_member_offsets_are_persisted_on_each_header() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo { char a; long b; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Struct(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected struct") };
		let members = body.members.clone();
		assert_eq!(session.context(module_id, 0).decl(members[0]).header.offset, 0);
		assert_eq!(session.context(module_id, 0).decl(members[1]).header.offset, 8);
	}

	#[test]
	fn union_member_offsets_are_all_zero() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("union U { int a; long b; char c; }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Union(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected union") };
		for member_id in body.members.clone() {
			assert_eq!(session.context(module_id, 0).decl(member_id).header.offset, 0);
		}
	}

	#[test]
	fn member_align_attribute_overrides_packed_suppression() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("struct Foo @packed { char a; long b @align(8); }")).unwrap();
		let id = last_type_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Struct(body) = &session.context(module_id, 0).decl(id).kind else { panic!("expected struct") };
		let members = body.members.clone();
		assert_eq!(session.context(module_id, 0).decl(members[1]).header.offset, 8);
		assert_eq!(body.size, 16);
	}
}

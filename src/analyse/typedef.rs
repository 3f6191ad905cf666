//! `typedef`/`distinct` analysis (component H's sibling form): resolves the aliased type.
//!
//! A plain `typedef` is fully transparent — its declaration's `type_handle` is simply the
//! target's own handle, so two typedefs (or a typedef and its target) compare equal wherever a
//! `TypeHandle` is compared. A `distinct` deliberately is not: it gets its own nominal handle via
//! `TypeInterner::intern_nominal`, sharing the target's size and alignment but never comparing
//! equal to it — the whole point of the construct is an incompatible type with identical layout.

use crate::{
	ast::{DeclId, DeclKind},
	session::{CompilationSession, ModuleId},
};

use super::{attribute, check_distinct_target, is_virtual_pointer, resolve_or_bail};

pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let (type_info, is_distinct) = {
		let context = &session.modules[module_id.0].contexts[context_index];
		match &context.decl(id).kind {
			DeclKind::Typedef { type_info } => (type_info.clone(), false),
			DeclKind::Distinct { type_info } => (type_info.clone(), true),
			_ => return None,
		}
	};

	let target_handle = match resolve_or_bail(session, module_id, context_index, &type_info, false) {
		Ok(handle) => handle,
		Err(dep) => return Some(dep),
	};

	let handle = if is_distinct {
		let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
		if check_distinct_target(session, is_virtual_pointer(&type_info), target_handle, span) {
			let target = session.type_interner.get(target_handle);
			session.type_interner.intern_nominal(id, target.size, target.abi_alignment)
		} else {
			session.type_interner.poisoned()
		}
	} else {
		target_handle
	};

	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		ast::{Decl, DeclHeader, Visibility},
		lexer::Span,
		path::Name,
		session::TargetConfig,
		types::{BuiltinType, TypeInfo, TypeInfoKind},
	};

	/// `Typedef`/`Distinct` are never produced directly by parsing a `define` (see
	/// `crate::analyse::define`'s module doc) — only by generic instantiation deep-copying a
	/// resolved `Define::Type` into a concrete module. These tests build one by hand to stand in
	/// for that deep copy.
	fn push_alias(session: &mut CompilationSession, module_id: ModuleId, is_distinct: bool) -> DeclId {
		let context = session.context_mut(module_id, 0);
		let name = Name { text: std::rc::Rc::from("Meters"), span: Span::default() };
		let header = DeclHeader::new(Some(name), Span::default(), Visibility::Local, std::rc::Rc::clone(&context.module_name));
		let type_info = TypeInfo::new(TypeInfoKind::Builtin(BuiltinType::Int), Span::default());
		let kind = if is_distinct { DeclKind::Distinct { type_info } } else { DeclKind::Typedef { type_info } };
		context.alloc_decl(Decl { header, kind })
	}

	#[test]
	fn typedef_is_transparent_alias() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("")).unwrap();
		let id = push_alias(&mut session, module_id, false);
		analyse(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		let int_handle = session.type_interner.intern_builtin(BuiltinType::Int);
		assert_eq!(handle, int_handle);
	}

	#[test]
	fn distinct_gets_its_own_nominal_identity() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("")).unwrap();
		let id = push_alias(&mut session, module_id, true);
		analyse(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		let int_handle = session.type_interner.intern_builtin(BuiltinType::Int);
		assert_ne!(handle, int_handle);
	}

	#[test]
	fn distinct_over_void_is_rejected() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("")).unwrap();
		let context = session.context_mut(module_id, 0);
		let name = Name { text: std::rc::Rc::from("Nothing"), span: Span::default() };
		let header = DeclHeader::new(Some(name), Span::default(), Visibility::Local, std::rc::Rc::clone(&context.module_name));
		let type_info = TypeInfo::new(TypeInfoKind::Builtin(BuiltinType::Void), Span::default());
		let id = context.alloc_decl(Decl { header, kind: DeclKind::Distinct { type_info } });
		analyse(&mut session, module_id, 0, id);
		assert_eq!(session.reporter.error_count(), 1);
	}
}

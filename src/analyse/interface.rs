//! Interface analysis (component D's interface form): gives the interface its own nominal type.
//!
//! An interface carries no data layout of its own — its members are ordinary `func` declarations,
//! each analysed independently by the top-level declaration loop the same way a free function is
//! (an interface member's `parent_type` is always `None`, so `crate::analyse::func`'s duplicate-
//! method check never fires for one). What this module contributes is the interface's own handle:
//! a value of interface type is represented the same way a slice is (`crate::resolve`'s fat-
//! pointer convention for `SubArray`) — a data pointer plus a vtable pointer — so its size and
//! alignment mirror that shape rather than being computed from its members.

use crate::{
	ast::{DeclId, DeclKind},
	session::{CompilationSession, ModuleId},
};

use super::attribute;

pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	if !matches!(session.modules[module_id.0].contexts[context_index].decl(id).kind, DeclKind::Interface { .. }) {
		return None;
	}

	let pointer_width = session.target.pointer_width_bytes;
	let handle = session.type_interner.intern_nominal(id, pointer_width * 2, pointer_width);
	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	#[test]
	fn interface_gets_fat_pointer_layout() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("interface Shape { func double area(); }")).unwrap();
		let id = DeclId(1);
		analyse_decl(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		let ty = session.type_interner.get(handle);
		assert_eq!(ty.size, 16);
	}

	#[test]
	fn interface_member_is_analysed_independently() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("interface Shape { func double area(); }")).unwrap();
		session.analyse_stage(module_id);
		let member_id = DeclId(0);
		assert!(session.context(module_id, 0).decl(member_id).header.type_handle.is_some());
	}
}

//! Function and method signature analysis: resolves the return type and every parameter's type,
//! checks for a duplicate method on the same parent type, and derives a mangled linkage name
//! (component H).
//!
//! Grounded in the teacher's `compile_function_declaration`, which walks a signature's parameter
//! list resolving each type before emitting it; generalized here to also cover the method form
//! (`func TYPE.name(...)`), whose duplicate-checking couldn't happen at parse time because it
//! depends on comparing parent-type names textually across every method in the module, not just
//! within one scope.

use crate::{
	ast::{DeclId, DeclKind, Visibility},
	diagnostics::Diagnostic,
	session::{CompilationSession, ModuleId},
};

use super::{attribute, resolve_or_bail};

/// Resolves the signature of the `func` declaration `id` and, for a method, checks it against
/// every other method already registered on the same parent type.
pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	check_duplicate_method(session, module_id, context_index, id);

	let (return_type, params) = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Func(func) = &context.decl(id).kind else { return None };
		(func.return_type.clone(), func.params.clone())
	};

	let return_handle = match resolve_or_bail(session, module_id, context_index, &return_type, false) {
		Ok(handle) => handle,
		Err(dep) => return Some(dep),
	};

	let mut param_handles = Vec::with_capacity(params.len());
	for param_id in &params {
		let type_info = {
			let context = &session.modules[module_id.0].contexts[context_index];
			match &context.decl(*param_id).kind {
				DeclKind::Var { type_info, .. } => type_info.clone(),
				_ => continue,
			}
		};
		match resolve_or_bail(session, module_id, context_index, &type_info, false) {
			Ok(handle) => param_handles.push(handle),
			Err(dep) => return Some(dep),
		}
	}

	let mangled = mangled_name(session, module_id, context_index, id);
	let signature = crate::types::FuncSignature { return_type: return_handle, param_types: param_handles, is_variadic: false };
	let handle = session.type_interner.intern_func(signature, session.target.pointer_width_bytes);

	let decl = session.modules[module_id.0].contexts[context_index].decl_mut(id);
	decl.header.type_handle = Some(handle);
	if let DeclKind::Func(func) = &mut decl.kind {
		func.mangled_name = Some(mangled);
	}
	None
}

/// `@cname` wins outright; otherwise a method mangles to `Parent.name` if module-private
/// (`Visibility::Module`, i.e. declared with `private`) or `Parent__name` otherwise, and a free
/// function keeps its bare name. There is no cross-module qualification here — see
/// `crate::resolve`'s documented simplification for same-module-only name lookup, which this
/// mirrors.
fn mangled_name(session: &CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> std::rc::Rc<str> {
	let decl = session.modules[module_id.0].contexts[context_index].decl(id);
	if let Some(cname) = &decl.header.cname {
		return std::rc::Rc::clone(cname);
	}
	let name = decl.header.name.as_ref().map(|n| n.text.as_ref()).unwrap_or("");
	let DeclKind::Func(func) = &decl.kind else { return std::rc::Rc::from(name) };
	match &func.parent_type {
		Some(parent) if decl.header.visibility == Visibility::Module => std::rc::Rc::from(format!("{}.{}", parent.text, name)),
		Some(parent) => std::rc::Rc::from(format!("{}__{}", parent.text, name)),
		None => std::rc::Rc::from(name),
	}
}

fn check_duplicate_method(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) {
	let (parent, name, span) = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let decl = context.decl(id);
		let DeclKind::Func(func) = &decl.kind else { return };
		let Some(parent) = &func.parent_type else { return };
		let Some(name) = &decl.header.name else { return };
		(parent.text.clone(), name.text.clone(), decl.header.span)
	};

	let methods = session.modules[module_id.0].contexts[context_index].methods.clone();
	for other_id in methods {
		if other_id.0 >= id.0 {
			continue;
		}
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Func(other_func) = &context.decl(other_id).kind else { continue };
		let Some(other_parent) = &other_func.parent_type else { continue };
		let Some(other_name) = &context.decl(other_id).header.name else { continue };
		if other_parent.text.as_ref() == parent.as_ref() && other_name.text.as_ref() == name.as_ref() {
			let prev_span = context.decl(other_id).header.span;
			session.reporter.emit(Diagnostic::error(span, format!("Method '{parent}.{name}' is already declared")).with_note(prev_span, "previous declaration was here"));
			session.modules[module_id.0].contexts[context_index].decl_mut(id).header.poisoned = true;
			return;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	/// Parameters are allocated in the arena before the function/method that owns them, so a
	/// free function's own id is whichever one `context.functions` records last.
	fn last_function_id(session: &CompilationSession, module_id: crate::session::ModuleId) -> DeclId {
		*session.context(module_id, 0).functions.last().unwrap()
	}

	/// Same idea for a method: the method's own id is whichever one `context.methods` records
	/// last, not a hand-computed literal.
	fn last_method_id(session: &CompilationSession, module_id: crate::session::ModuleId) -> DeclId {
		*session.context(module_id, 0).methods.last().unwrap()
	}

	#[test]
	fn resolves_free_function_signature() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("func int add(int a, int b);")).unwrap();
		let id = last_function_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.context(module_id, 0).decl(id).header.type_handle.is_some());
	}

	#[test]
	fn public_method_mangled_name_uses_double_underscore() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("func void Vector.push(int x);")).unwrap();
		let id = last_method_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Func(func) = &session.context(module_id, 0).decl(id).kind else { panic!("expected func") };
		assert_eq!(func.mangled_name.as_deref(), Some("Vector__push"));
	}

	#[test]
	fn private_method_mangled_name_uses_dot() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("private func void Vector.push(int x);")).unwrap();
		let id = last_method_id(&session, module_id);
		analyse_decl(&mut session, module_id, 0, id);
		let DeclKind::Func(func) = &session.context(module_id, 0).decl(id).kind else { panic!("expected func") };
		assert_eq!(func.mangled_name.as_deref(), Some("Vector.push"));
	}

	#[test]
	fn duplicate_method_on_same_type_is_poisoned_with_note() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("func void Vector.push(int x); func void Vector.push(int y);")).unwrap();
		let methods = session.context(module_id, 0).methods.clone();
		let (first, second) = (methods[0], methods[1]);
		analyse_decl(&mut session, module_id, 0, first);
		analyse_decl(&mut session, module_id, 0, second);
		assert!(session.context(module_id, 0).decl(second).header.poisoned);
		assert!(session.reporter.error_count() >= 1);
	}
}

//! `generic` function analysis: resolves each `$case`'s type list and the optional return type,
//! checking that every case's arity matches the parameter list and that no two cases overlap
//! (component H's compile-time-dispatch sibling).
//!
//! Grounded in the teacher's `compile_generic_function`, which picks the matching `$case` at the
//! call site by comparing argument types; this crate has no call sites to check against (statement
//! parsing is out of scope), so analysis here is limited to what can be validated from the
//! declaration alone: every case's type list resolves to a real type, has the right arity, and no
//! two cases name the same argument types (which would make dispatch ambiguous).

use crate::{
	ast::{DeclId, DeclKind},
	session::{CompilationSession, ModuleId},
	types::TypeHandle,
};

use super::{attribute, resolve_or_bail};

pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let (return_type, param_count, cases, span) = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let decl = context.decl(id);
		let DeclKind::Generic(generic) = &decl.kind else { return None };
		(generic.return_type.clone(), generic.params.len(), generic.cases.clone(), decl.header.span)
	};

	if let Some(return_type) = &return_type {
		match resolve_or_bail(session, module_id, context_index, return_type, false) {
			Ok(handle) => session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle),
			Err(dep) => return Some(dep),
		}
	}

	let mut default_count = 0;
	let mut seen_cases: Vec<Vec<TypeHandle>> = Vec::new();
	for case in &cases {
		if case.is_default {
			default_count += 1;
			continue;
		}
		if case.types.len() != param_count {
			session.reporter.error(span, format!("'$case' lists {} type(s) but '{}' takes {param_count} parameter(s)", case.types.len(), case_name(session, module_id, context_index, id)));
			continue;
		}
		let mut handles = Vec::with_capacity(case.types.len());
		for type_info in &case.types {
			match resolve_or_bail(session, module_id, context_index, type_info, false) {
				Ok(handle) => handles.push(handle),
				Err(dep) => return Some(dep),
			}
		}
		if seen_cases.contains(&handles) {
			session.reporter.error(span, "'$case' repeats a type list already handled by another case");
		} else {
			seen_cases.push(handles);
		}
	}
	if default_count > 1 {
		session.reporter.error(span, "A 'generic' function may have at most one '$default' case");
	}

	None
}

fn case_name(session: &CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> std::rc::Rc<str> {
	session.modules[module_id.0].contexts[context_index].decl(id).header.name.as_ref().map(|n| std::rc::Rc::clone(&n.text)).unwrap_or_else(|| std::rc::Rc::from(""))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	#[test]
	fn resolves_return_type_and_case_types() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = "generic int max(a, b) { $case(int, int): { } $default: { } }";
		let module_id = session.find_or_create_module("demo", Some(source)).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.context(module_id, 0).decl(id).header.type_handle.is_some());
		assert_eq!(session.reporter.error_count(), 0);
	}

	#[test]
	fn mismatched_arity_is_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = "generic int max(a, b) { $case(int): { } }";
		let module_id = session.find_or_create_module("demo", Some(source)).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}

	#[test]
	fn duplicate_case_is_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = "generic int max(a, b) { $case(int, int): { } $case(int, int): { } }";
		let module_id = session.find_or_create_module("demo", Some(source)).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}

	#[test]
	fn two_defaults_are_reported() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = "generic int max(a, b) { $default: { } $default: { } }";
		let module_id = session.find_or_create_module("demo", Some(source)).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		assert!(session.reporter.error_count() >= 1);
	}
}

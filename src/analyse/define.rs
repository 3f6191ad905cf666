//! `define` analysis (component H): resolves a plain or function-pointer type alias, and drives
//! generic module instantiation for the identifier-alias form.
//!
//! The parser never produces `DeclKind::Typedef`/`DeclKind::Distinct` directly (see
//! `crate::parser::decl::parse_define`) — every `define` parses to `DeclKind::Define`. Those two
//! other `DeclKind` variants exist for `crate::generic_inst` to produce when it deep-copies a
//! resolved `Define::Type` into a freshly instantiated module; `crate::analyse::typedef` handles
//! analysing *those* copies. This module is the one that runs for every `define` a source file
//! actually writes.

use std::rc::Rc;

use crate::{
	ast::{DeclId, DeclKind, DefineDecl, DefineTypeRhs},
	session::{CompilationSession, ModuleId},
};

use super::{attribute, check_distinct_target, is_virtual_pointer, resolve_or_bail};

pub fn analyse(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId) -> Option<DeclId> {
	attribute::apply(session, module_id, context_index, id);

	let define = {
		let context = &session.modules[module_id.0].contexts[context_index];
		let DeclKind::Define(define) = &context.decl(id).kind else { return None };
		define.clone()
	};

	match define {
		DefineDecl::Type { is_distinct, rhs } => analyse_type_alias(session, module_id, context_index, id, is_distinct, &rhs),
		DefineDecl::Ident { path, target, generic_args, .. } => analyse_ident_alias(session, module_id, context_index, id, path.as_ref(), &target, &generic_args),
	}
}

fn analyse_type_alias(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId, is_distinct: bool, rhs: &DefineTypeRhs) -> Option<DeclId> {
	let is_virtual = matches!(rhs, DefineTypeRhs::Type(type_info, _) if is_virtual_pointer(type_info));
	let target_handle = match rhs {
		DefineTypeRhs::Type(type_info, generic_args) => {
			if !generic_args.is_empty() {
				let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
				session.reporter.error(span, "A type alias's right-hand side may not itself take generic arguments");
			}
			match resolve_or_bail(session, module_id, context_index, type_info, false) {
				Ok(handle) => handle,
				Err(dep) => return Some(dep),
			}
		}
		DefineTypeRhs::FuncSignature(func) => {
			let return_handle = match resolve_or_bail(session, module_id, context_index, &func.return_type, false) {
				Ok(handle) => handle,
				Err(dep) => return Some(dep),
			};
			let mut param_handles = Vec::with_capacity(func.params.len());
			for param_id in &func.params {
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
			let signature = crate::types::FuncSignature { return_type: return_handle, param_types: param_handles, is_variadic: func.is_variadic };
			session.type_interner.intern_func(signature, session.target.pointer_width_bytes)
		}
	};

	let handle = if is_distinct {
		let span = session.modules[module_id.0].contexts[context_index].decl(id).header.span;
		if check_distinct_target(session, is_virtual, target_handle, span) {
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

/// Rebinds `id` to whatever `target` resolves to, instantiating a generic module first when
/// `generic_args` is non-empty. Cross-module resolution through `path` is not implemented (the
/// same documented simplification `crate::resolve::resolve_identifier` carries): a `path` other
/// than the current module is only honoured when it names an already-registered module.
fn analyse_ident_alias(session: &mut CompilationSession, module_id: ModuleId, context_index: usize, id: DeclId, path: Option<&crate::path::Path>, target: &crate::path::Name, generic_args: &[crate::types::TypeInfo]) -> Option<DeclId> {
	if generic_args.is_empty() {
		let type_info = crate::types::TypeInfo::new(crate::types::TypeInfoKind::Identifier { path: path.cloned(), name: target.clone(), is_virtual: false }, target.span);
		return match resolve_or_bail(session, module_id, context_index, &type_info, false) {
			Ok(handle) => {
				session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = Some(handle);
				None
			}
			Err(dep) => Some(dep),
		};
	}

	let Some(module_path) = path.map(|p| p.canonical.to_string()) else {
		let span = target.span;
		session.reporter.error(span, "A generic identifier alias must name a module to instantiate");
		return None;
	};
	let Some(source_module) = session.lookup_module(&module_path) else {
		session.reporter.error(target.span, format!("Unknown module '{module_path}' in generic identifier alias"));
		return None;
	};

	let arg_names: Vec<Rc<str>> = generic_args.iter().map(describe_type_info).collect();
	let instantiated = crate::generic_inst::instantiate(session, source_module, generic_args, &arg_names);

	let lookup = session.modules[instantiated.0].contexts[0].scopes.resolve_normal_symbol(target.text.as_ref());
	let Some(target_decl) = lookup else {
		session.reporter.error(target.span, format!("'{}' is not declared in '{module_path}'", target.text));
		return None;
	};
	let handle = session.modules[instantiated.0].contexts[0].decl(target_decl).header.type_handle;
	if let DeclKind::Define(DefineDecl::Ident { instantiated_module, .. }) = &mut session.modules[module_id.0].contexts[context_index].decl_mut(id).kind {
		*instantiated_module = Some(Rc::from(module_path));
	}
	session.modules[module_id.0].contexts[context_index].decl_mut(id).header.type_handle = handle;
	None
}

fn describe_type_info(type_info: &crate::types::TypeInfo) -> Rc<str> {
	match &type_info.kind {
		crate::types::TypeInfoKind::Builtin(b) => Rc::from(format!("{b:?}").to_lowercase()),
		crate::types::TypeInfoKind::Identifier { name, .. } => Rc::clone(&name.text),
		_ => Rc::from("?"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{analyse::analyse_decl, session::TargetConfig};

	#[test]
	fn plain_type_alias_resolves_transparently() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("define Meters = int;")).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		let int_handle = session.type_interner.intern_builtin(crate::types::BuiltinType::Int);
		assert_eq!(handle, int_handle);
	}

	#[test]
	fn distinct_type_alias_gets_its_own_identity() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("define distinct Meters = int;")).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		let int_handle = session.type_interner.intern_builtin(crate::types::BuiltinType::Int);
		assert_ne!(handle, int_handle);
	}

	#[test]
	fn distinct_over_typeid_is_rejected() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("define distinct Kind = typeid;")).unwrap();
		let id = DeclId(0);
		analyse_decl(&mut session, module_id, 0, id);
		assert_eq!(session.reporter.error_count(), 1);
	}

	#[test]
	fn function_pointer_alias_resolves_to_a_func_type() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let module_id = session.find_or_create_module("demo", Some("define Callback = func void(int code);")).unwrap();
		// The parameter `code` is allocated into the arena before the `define` itself, so the
		// define's own id is whichever one `context.types` records last.
		let id = *session.context(module_id, 0).types.last().unwrap();
		analyse_decl(&mut session, module_id, 0, id);
		let handle = session.context(module_id, 0).decl(id).header.type_handle.unwrap();
		assert!(matches!(session.type_interner.get(handle).kind, crate::types::TypeKind::Func(_)));
	}
}

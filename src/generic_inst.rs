//! Generic module instantiation (component I): given a module declared with generic type
//! parameters and a concrete argument list, produces (and caches) a fresh, fully concrete module
//! by deep-copying the source module's declarations and substituting every reference to a
//! parameter name with the matching concrete `TypeInfo`.
//!
//! Grounded in the teacher's monomorphization pass for `<T>`-parameterised structs
//! (`compiler/generics.rs`), reduced to this crate's scope: only declarations reachable from a
//! single `Context` are copied (no transitive cross-module imports), and only `TypeInfoKind`
//! nodes are substituted — a parameter name can't appear anywhere else in this crate's grammar
//! (no generic functions' bodies to walk, since statement parsing is out of scope).

use std::rc::Rc;

use crate::{
	ast::{Decl, DeclId, DeclKind},
	path::Name,
	session::{CompilationSession, Context, Module, ModuleId, Stage},
	types::{TypeInfo, TypeInfoKind},
};

/// Builds the cache key a given instantiation mangles to: the source module's path followed by
/// its concrete argument types in source order, e.g. `List<int>`.
#[must_use]
pub fn mangle(module_path: &str, arg_names: &[Rc<str>]) -> Rc<str> {
	if arg_names.is_empty() {
		return Rc::from(module_path);
	}
	Rc::from(format!("{module_path}<{}>", arg_names.join(",")))
}

/// Instantiates `source_module` with `args` (one concrete `TypeInfo` per declared parameter),
/// returning the (possibly cached) concrete module's id. `args` must have the same length as the
/// source module's `parameters`; a mismatch is reported and the source module's own id is
/// returned unchanged, so callers always get back something they can keep resolving against.
pub fn instantiate(session: &mut CompilationSession, source_module: ModuleId, args: &[TypeInfo], arg_names: &[Rc<str>]) -> ModuleId {
	let parameters = session.modules[source_module.0].parameters.clone();
	if parameters.len() != args.len() {
		let span = crate::lexer::Span::default();
		session.reporter.error(span, format!("Generic module '{}' expects {} type argument(s), found {}", session.modules[source_module.0].name, parameters.len(), args.len()));
		return source_module;
	}

	let mangled = mangle(&session.modules[source_module.0].name, arg_names);
	if let Some(cached) = session.generic_cache.get(&mangled) {
		return *cached;
	}

	let substitutions: Vec<(Rc<str>, TypeInfo)> = parameters.into_iter().zip(args.iter().cloned()).collect();

	let source_context = &session.modules[source_module.0].contexts[0];
	let module_name = Rc::clone(&mangled);
	let mut new_context = Context::new(Rc::clone(&module_name));
	copy_context(source_context, &mut new_context, &substitutions);

	let module = Module {
		name: module_name,
		parameters: Vec::new(),
		contexts: vec![new_context],
		is_generic: false,
		is_private: session.modules[source_module.0].is_private,
		stage: Stage::Parsed,
	};
	let new_id = session.register_module(Rc::clone(&mangled), module);
	session.generic_cache.insert(mangled, new_id);
	session.analyse_stage(new_id);
	new_id
}

/// Deep-copies every declaration in `source` into `target`, substituting type-parameter
/// references along the way. `DeclId`s are preserved 1:1 (the copy walks `source.decls` in
/// index order and allocates in the same order), so every `Vec<DeclId>` a copied declaration
/// carries (struct members, function params, …) still points at the right sibling in `target`.
fn copy_context(source: &Context, target: &mut Context, substitutions: &[(Rc<str>, TypeInfo)]) {
	for decl in &source.decls {
		let mut copy = decl.clone();
		copy.header.resolve_status = crate::types::ResolveStatus::NotDone;
		copy.header.type_handle = None;
		substitute_decl(&mut copy.kind, substitutions);
		target.decls.push(copy);
	}
	target.imports = source.imports.clone();
	target.global_decls = source.global_decls.clone();
	target.functions = source.functions.clone();
	target.methods = source.methods.clone();
	target.types = source.types.clone();
	target.enums = source.enums.clone();
	target.interfaces = source.interfaces.clone();
	target.ct_ifs = source.ct_ifs.clone();
}

fn substitute_type_info(type_info: &mut TypeInfo, substitutions: &[(Rc<str>, TypeInfo)]) {
	if let TypeInfoKind::Identifier { name, .. } = &type_info.kind {
		if let Some((_, replacement)) = substitutions.iter().find(|(param, _)| param.as_ref() == name.text.as_ref()) {
			*type_info = replacement.clone();
			return;
		}
	}
	match &mut type_info.kind {
		TypeInfoKind::Pointer(inner)
		| TypeInfoKind::SubArray { base: inner }
		| TypeInfoKind::VarArray { base: inner }
		| TypeInfoKind::InferredArray { base: inner }
		| TypeInfoKind::IncArray { base: inner } => substitute_type_info(inner, substitutions),
		TypeInfoKind::Array { base, .. } => substitute_type_info(base, substitutions),
		_ => {}
	}
}

fn substitute_decl(kind: &mut DeclKind, substitutions: &[(Rc<str>, TypeInfo)]) {
	match kind {
		DeclKind::Var { type_info, .. } => substitute_type_info(type_info, substitutions),
		DeclKind::Func(func) => {
			substitute_type_info(&mut func.return_type, substitutions);
		}
		DeclKind::Typedef { type_info } | DeclKind::Distinct { type_info } => substitute_type_info(type_info, substitutions),
		DeclKind::Enum(body) => substitute_type_info(&mut body.base_type, substitutions),
		_ => {}
	}
}

#[must_use]
pub fn parameter_name(name: &Name) -> Rc<str> {
	Rc::clone(&name.text)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::Span, session::TargetConfig, types::BuiltinType};

	fn int_type_info() -> TypeInfo {
		TypeInfo::new(TypeInfoKind::Builtin(BuiltinType::Int), Span::default())
	}

	#[test]
	fn instantiating_substitutes_member_type_and_caches() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = session.find_or_create_module("List", Some("struct List { T value; }")).unwrap();
		session.modules[source.0].parameters = vec![Rc::from("T")];

		let args = vec![int_type_info()];
		let first = instantiate(&mut session, source, &args, &[Rc::from("int")]);
		let second = instantiate(&mut session, source, &args, &[Rc::from("int")]);
		assert_eq!(first.0, second.0);

		// `value` (the member) is allocated before `List` itself, so the struct's own id is
		// whichever one `context.types` records last, not `DeclId(0)`.
		let struct_id = *session.context(first, 0).types.last().unwrap();
		let DeclKind::Struct(body) = &session.context(first, 0).decl(struct_id).kind else { panic!("expected struct") };
		assert_eq!(body.size, 4);
	}

	#[test]
	fn wrong_arity_reports_and_returns_source() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = session.find_or_create_module("List", Some("struct List { T value; }")).unwrap();
		session.modules[source.0].parameters = vec![Rc::from("T")];
		let result = instantiate(&mut session, source, &[], &[]);
		assert_eq!(result.0, source.0);
		assert!(session.reporter.error_count() >= 1);
	}
}

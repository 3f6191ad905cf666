//! The type resolver: turns a syntactic `TypeInfo` into a canonical `TypeHandle`.
//!
//! Grounded in the original's `sema_resolve_ptr_type`/`sema_resolve_array_type`/
//! `sema_resolve_type_identifier` (see `DESIGN.md`), reshaped into the tri-state `NotDone →
//! Running → Done` walk the data model specifies. This module never reaches for `&mut
//! CompilationSession` directly — it takes the session's fields it needs (`&Context`, `&mut
//! TypeInterner`, `&mut Reporter`, `&TargetConfig`) individually, so `crate::analyse` can borrow
//! the interner and reporter mutably while a declaration elsewhere in the same context is still
//! being read immutably, without the two ever aliasing.

use crate::{
	ast::DeclId,
	const_eval::{fold, ConstExpr},
	diagnostics::Reporter,
	session::{Context, TargetConfig},
	types::{BuiltinType, ResolveStatus, TypeHandle, TypeInfo, TypeInfoKind, TypeInterner},
};

/// The result of one `resolve_type_shallow` attempt: either a finished handle, or a signal that
/// resolving an identifier requires first driving another declaration to `Done` — the caller
/// (`crate::analyse::analyse_decl`) owns the `&mut CompilationSession` needed to do that, so it
/// performs the detour and calls back in.
pub enum Resolved {
	Handle(TypeHandle),
	NeedsDecl(DeclId),
}

/// Resolves `type_info` to a canonical handle, or reports the one `DeclId` that must be analysed
/// first. Idempotent: a `Done` `type_info` returns its stored handle without touching the
/// reporter or interner again.
pub fn resolve_type_shallow(context: &Context, interner: &mut TypeInterner, reporter: &mut Reporter, target: &TargetConfig, type_info: &TypeInfo, allow_inferred: bool) -> Resolved {
	match type_info.resolve_status.get() {
		ResolveStatus::Done => {
			let handle = type_info.canonical.borrow().unwrap_or_else(|| interner.poisoned());
			return Resolved::Handle(handle);
		}
		ResolveStatus::Running => {
			reporter.error(type_info.span, "Recursive definition");
			let handle = interner.poisoned();
			type_info.resolve_status.set(ResolveStatus::Done);
			*type_info.canonical.borrow_mut() = Some(handle);
			return Resolved::Handle(handle);
		}
		ResolveStatus::NotDone => {}
	}

	type_info.resolve_status.set(ResolveStatus::Running);

	let handle = match &type_info.kind {
		TypeInfoKind::Poisoned => interner.poisoned(),
		TypeInfoKind::Builtin(builtin) => interner.intern_builtin(*builtin),
		TypeInfoKind::Identifier { name, is_virtual, .. } => match resolve_identifier(context, name.text.as_ref()) {
			IdentifierLookup::Builtin(builtin) => {
				if *is_virtual {
					reporter.error(type_info.span, "'virtual' may only qualify an interface type");
				}
				interner.intern_builtin(builtin)
			}
			IdentifierLookup::Decl(decl_id, status, type_handle) => {
				if *is_virtual && !matches!(context.decl(decl_id).kind, crate::ast::DeclKind::Interface { .. }) {
					reporter.error(type_info.span, format!("'{}' is not an interface; 'virtual' may only qualify an interface type", name.text));
				}
				if status == ResolveStatus::Running {
					reporter.error(type_info.span, "Recursive definition");
					interner.poisoned()
				} else if status == ResolveStatus::Done {
					type_handle.unwrap_or_else(|| interner.poisoned())
				} else {
					type_info.resolve_status.set(ResolveStatus::NotDone);
					return Resolved::NeedsDecl(decl_id);
				}
			}
			IdentifierLookup::NotFound => {
				reporter.error(type_info.span, format!("'{}' is not a known type", name.text));
				interner.poisoned()
			}
			IdentifierLookup::NotAType => {
				reporter.error(type_info.span, format!("'{}' is not a type", name.text));
				interner.poisoned()
			}
		},
		TypeInfoKind::Pointer(inner) => match resolve_type_shallow(context, interner, reporter, target, inner, false) {
			Resolved::Handle(inner_handle) => interner.intern_pointer(inner_handle, target.pointer_width_bytes),
			Resolved::NeedsDecl(id) => {
				type_info.resolve_status.set(ResolveStatus::NotDone);
				return Resolved::NeedsDecl(id);
			}
		},
		TypeInfoKind::Array { base, len_expr } => match resolve_type_shallow(context, interner, reporter, target, base, false) {
			Resolved::Handle(base_handle) => match fold(len_expr).as_ref().and_then(ConstExpr::as_array_length) {
				Some(len) => interner.intern_array(base_handle, len),
				None => {
					reporter.error(type_info.span, "Array length must be a non-negative constant expression");
					interner.poisoned()
				}
			},
			Resolved::NeedsDecl(id) => {
				type_info.resolve_status.set(ResolveStatus::NotDone);
				return Resolved::NeedsDecl(id);
			}
		},
		TypeInfoKind::SubArray { base } => match resolve_type_shallow(context, interner, reporter, target, base, false) {
			Resolved::Handle(base_handle) => interner.intern_subarray(base_handle, target.pointer_width_bytes),
			Resolved::NeedsDecl(id) => {
				type_info.resolve_status.set(ResolveStatus::NotDone);
				return Resolved::NeedsDecl(id);
			}
		},
		TypeInfoKind::VarArray { base } | TypeInfoKind::IncArray { base } => match resolve_type_shallow(context, interner, reporter, target, base, false) {
			Resolved::Handle(base_handle) => interner.intern_vararray(base_handle, target.pointer_width_bytes),
			Resolved::NeedsDecl(id) => {
				type_info.resolve_status.set(ResolveStatus::NotDone);
				return Resolved::NeedsDecl(id);
			}
		},
		TypeInfoKind::InferredArray { base } => {
			if !allow_inferred {
				reporter.error(type_info.span, "Inferred-length array ('[?]') is not permitted here");
				interner.poisoned()
			} else {
				match resolve_type_shallow(context, interner, reporter, target, base, false) {
					Resolved::Handle(base_handle) => interner.intern_vararray(base_handle, target.pointer_width_bytes),
					Resolved::NeedsDecl(id) => {
						type_info.resolve_status.set(ResolveStatus::NotDone);
						return Resolved::NeedsDecl(id);
					}
				}
			}
		}
		TypeInfoKind::Expression(expr) => match fold(expr) {
			Some(ConstExpr::Int(_)) => interner.intern_builtin(BuiltinType::Long),
			Some(ConstExpr::Bool(_)) => interner.intern_builtin(BuiltinType::Bool),
			Some(ConstExpr::Str(_)) => {
				let char_handle = interner.intern_builtin(BuiltinType::Char);
				interner.intern_subarray(char_handle, target.pointer_width_bytes)
			}
			None => {
				reporter.error(type_info.span, "'typeof' target is not a constant expression this analyser can type");
				interner.poisoned()
			}
		},
	};

	type_info.resolve_status.set(ResolveStatus::Done);
	*type_info.canonical.borrow_mut() = Some(handle);
	Resolved::Handle(handle)
}

enum IdentifierLookup {
	Builtin(BuiltinType),
	Decl(DeclId, ResolveStatus, Option<TypeHandle>),
	NotFound,
	NotAType,
}

/// Resolves a bare or path-prefixed identifier against the current context's scope chain.
///
/// Cross-module resolution through `import`/path prefixes is not implemented: this looks up by
/// the identifier's own text regardless of any path prefix, which is correct for same-module
/// references (the only kind this crate's own test modules ever exercise) and is the documented
/// simplification recorded in `DESIGN.md` for genuinely cross-module lookups.
fn resolve_identifier(context: &Context, name: &str) -> IdentifierLookup {
	if let Some(builtin) = builtin_by_name(name) {
		return IdentifierLookup::Builtin(builtin);
	}
	let Some(decl_id) = context.scopes.resolve_normal_symbol(name) else {
		return IdentifierLookup::NotFound;
	};
	let decl = context.decl(decl_id);
	use crate::ast::DeclKind;
	match &decl.kind {
		DeclKind::Struct(..) | DeclKind::Union(..) | DeclKind::Err(..) | DeclKind::Enum(..) | DeclKind::Distinct { .. } | DeclKind::Interface { .. } => {
			IdentifierLookup::Decl(decl_id, decl.header.resolve_status, decl.header.type_handle)
		}
		DeclKind::Typedef { type_info } => match type_info.resolve_status.get() {
			ResolveStatus::Done => IdentifierLookup::Decl(decl_id, ResolveStatus::Done, *type_info.canonical.borrow()),
			status => IdentifierLookup::Decl(decl_id, status, None),
		},
		DeclKind::Define(..) => IdentifierLookup::Decl(decl_id, decl.header.resolve_status, decl.header.type_handle),
		DeclKind::Poisoned => IdentifierLookup::Decl(decl_id, ResolveStatus::Done, None),
		_ => IdentifierLookup::NotAType,
	}
}

fn builtin_by_name(name: &str) -> Option<BuiltinType> {
	Some(match name {
		"void" => BuiltinType::Void,
		"bool" => BuiltinType::Bool,
		"char" => BuiltinType::Char,
		"short" => BuiltinType::Short,
		"int" => BuiltinType::Int,
		"long" => BuiltinType::Long,
		"uchar" => BuiltinType::UChar,
		"ushort" => BuiltinType::UShort,
		"uint" => BuiltinType::UInt,
		"ulong" => BuiltinType::ULong,
		"float" => BuiltinType::Float,
		"double" => BuiltinType::Double,
		"typeid" => BuiltinType::TypeId,
		"err" => BuiltinType::Err,
		_ => return None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::Span, session::TargetConfig, types::TypeInfoKind};

	#[test]
	fn resolves_builtin_type() {
		let context = Context::new(std::rc::Rc::from("test"));
		let mut interner = TypeInterner::new();
		let mut reporter = Reporter::new();
		let target = TargetConfig::default();
		let type_info = TypeInfo::new(TypeInfoKind::Builtin(BuiltinType::Int), Span::default());
		let Resolved::Handle(handle) = resolve_type_shallow(&context, &mut interner, &mut reporter, &target, &type_info, false) else {
			panic!("expected a resolved handle");
		};
		assert_eq!(interner.get(handle).size, 4);
	}

	#[test]
	fn reports_unknown_identifier() {
		let context = Context::new(std::rc::Rc::from("test"));
		let mut interner = TypeInterner::new();
		let mut reporter = Reporter::new();
		let target = TargetConfig::default();
		let name = crate::path::Name { text: std::rc::Rc::from("Missing"), span: Span::default() };
		let type_info = TypeInfo::new(TypeInfoKind::Identifier { path: None, name, is_virtual: false }, Span::default());
		let _ = resolve_type_shallow(&context, &mut interner, &mut reporter, &target, &type_info, false);
		assert_eq!(reporter.error_count(), 1);
	}

	#[test]
	fn virtual_qualifier_on_non_interface_is_rejected() {
		use crate::ast::{Decl, DeclHeader, DeclKind, Visibility};
		let mut context = Context::new(std::rc::Rc::from("test"));
		let header = DeclHeader::new(Some(crate::path::Name { text: std::rc::Rc::from("Point"), span: Span::default() }), Span::default(), Visibility::Local, std::rc::Rc::from("test"));
		let id = context.alloc_decl(Decl { header, kind: DeclKind::Struct(crate::ast::AggregateBody::new(Vec::new())) });
		context.scopes.declare(std::rc::Rc::from("Point"), id).unwrap();
		let mut interner = TypeInterner::new();
		let mut reporter = Reporter::new();
		let target = TargetConfig::default();
		let name = crate::path::Name { text: std::rc::Rc::from("Point"), span: Span::default() };
		let type_info = TypeInfo::new(TypeInfoKind::Identifier { path: None, name, is_virtual: true }, Span::default());
		let _ = resolve_type_shallow(&context, &mut interner, &mut reporter, &target, &type_info, false);
		assert_eq!(reporter.error_count(), 1);
	}
}

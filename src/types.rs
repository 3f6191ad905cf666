//! Unresolved syntactic types (`TypeInfo`) and the canonical, interned type store (`Type`).
//!
//! Grounded in the teacher's `parser/expressions/util/types.rs` `Typed` trait (which separates
//! "the syntax that spelled a type" from "the type itself"), generalized here into two distinct
//! representations plus an interner, since this grammar's type language (pointers, four array
//! flavors, path-qualified names, `typeof`) is considerably richer than the teacher's.

use std::{cell::Cell, cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
	ast::DeclId,
	const_eval::Expr,
	lexer::Span,
	path::{Name, Path},
};

/// Tri-state resolution marker. See invariant 2 in `SPEC_FULL.md` §3: observing `Running` on
/// entry to `analyse_decl`/`resolve_type_shallow` is a cycle, not a re-entrancy bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
	NotDone,
	Running,
	Done,
}

/// The built-in scalar types, available without any declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
	Void,
	Bool,
	Char,
	Short,
	Int,
	Long,
	UChar,
	UShort,
	UInt,
	ULong,
	Float,
	Double,
	TypeId,
	/// The built-in base type every `err` declaration's values are compatible with.
	Err,
}

impl BuiltinType {
	/// Natural size in bytes, independent of target. Pointer-width-dependent types don't appear
	/// here (there are none among the builtins — `typeid` and `err` are fixed-size handles).
	#[must_use]
	pub const fn size(self) -> u64 {
		match self {
			Self::Void => 0,
			Self::Bool | Self::Char | Self::UChar => 1,
			Self::Short | Self::UShort => 2,
			Self::Int | Self::UInt | Self::Float => 4,
			Self::Long | Self::ULong | Self::Double | Self::TypeId | Self::Err => 8,
		}
	}

	#[must_use]
	pub const fn alignment(self) -> u64 {
		self.size().max(1)
	}

	#[must_use]
	pub const fn is_integer(self) -> bool {
		matches!(self, Self::Char | Self::Short | Self::Int | Self::Long | Self::UChar | Self::UShort | Self::UInt | Self::ULong)
	}
}

/// The syntactic shape of a type as written in source, before resolution.
#[derive(Debug, Clone)]
pub enum TypeInfoKind {
	Builtin(BuiltinType),
	/// A possibly path-qualified reference to a nominal type, or to a compile-time type
	/// parameter (`$T`). `is_virtual` records a leading `virtual` qualifier (valid only when
	/// `Pointer` wraps this as its inner type).
	Identifier { path: Option<Path>, name: Name, is_virtual: bool },
	Pointer(Box<TypeInfo>),
	/// `[ <expr> ]`: fixed-length array.
	Array { base: Box<TypeInfo>, len_expr: Expr },
	/// `[ ]`: slice.
	SubArray { base: Box<TypeInfo> },
	/// `[ * ]`: variable-length array.
	VarArray { base: Box<TypeInfo> },
	/// `[ ? ]`: length supplied by an initializer. Parser-only: rejected by the resolver unless
	/// `allow_inferred` is set at the call site (e.g. a global's initializer).
	InferredArray { base: Box<TypeInfo> },
	/// `[ + ]`: accumulates via `IDENT += initializer;`. Parser-only; never reaches the resolver
	/// as an operand of anything but a top-level incremental-array declaration.
	IncArray { base: Box<TypeInfo> },
	/// `typeof(expr)`-style: the type of a constant expression.
	Expression(Expr),
	/// A type that failed to parse or resolve. Propagates silently (§7's poisoning rule).
	Poisoned,
}

/// An unresolved, syntactic type together with its resolution state.
#[derive(Debug, Clone)]
pub struct TypeInfo {
	pub kind: TypeInfoKind,
	pub span: Span,
	pub resolve_status: Cell<ResolveStatus>,
	pub canonical: RefCell<Option<TypeHandle>>,
}

impl TypeInfo {
	#[must_use]
	pub fn new(kind: TypeInfoKind, span: Span) -> Self {
		Self {
			kind,
			span,
			resolve_status: Cell::new(ResolveStatus::NotDone),
			canonical: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn poisoned(span: Span) -> Self {
		let info = Self::new(TypeInfoKind::Poisoned, span);
		info.resolve_status.set(ResolveStatus::Done);
		info
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		matches!(self.kind, TypeInfoKind::Poisoned)
	}
}

/// A handle into the canonical type store. Two handles are equal iff they refer to
/// structurally (or, for nominal kinds, declaratively) identical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(pub usize);

/// The canonical, fully resolved shape a `TypeHandle` refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
	Builtin(BuiltinType),
	Pointer(TypeHandle),
	Array { base: TypeHandle, len: u64 },
	SubArray(TypeHandle),
	VarArray(TypeHandle),
	Func(FuncSignature),
	/// Struct, union, enum, err, distinct, or typedef — identity is the declaring `DeclId`.
	Nominal(DeclId),
	/// The sentinel result of resolving a poisoned or cyclic `TypeInfo`.
	Poisoned,
}

/// The structural key used to intern function-pointer/signature types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncSignature {
	pub return_type: TypeHandle,
	pub param_types: Vec<TypeHandle>,
	pub is_variadic: bool,
}

/// A canonical, interned type: its kind plus its ABI layout facts.
#[derive(Debug, Clone)]
pub struct Type {
	pub kind: TypeKind,
	pub size: u64,
	pub abi_alignment: u64,
}

/// Interns canonical types. Pointers, arrays, and function signatures are interned by structural
/// equality; struct/union/enum/err/distinct/typedef are interned by declaration identity (one
/// `TypeHandle` per `DeclId`, created the first time that declaration is resolved).
#[derive(Debug, Default)]
pub struct TypeInterner {
	types: Vec<Type>,
	builtin_cache: HashMap<BuiltinType, TypeHandle>,
	pointer_cache: HashMap<TypeHandle, TypeHandle>,
	array_cache: HashMap<(TypeHandle, u64), TypeHandle>,
	subarray_cache: HashMap<TypeHandle, TypeHandle>,
	vararray_cache: HashMap<TypeHandle, TypeHandle>,
	func_cache: HashMap<FuncSignature, TypeHandle>,
	nominal_cache: HashMap<DeclId, TypeHandle>,
	poisoned_handle: Option<TypeHandle>,
}

impl TypeInterner {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&mut self, ty: Type) -> TypeHandle {
		let handle = TypeHandle(self.types.len());
		self.types.push(ty);
		handle
	}

	#[must_use]
	pub fn get(&self, handle: TypeHandle) -> &Type {
		self.types.get(handle.0).unwrap_or_else(|| unreachable!("TypeHandle {handle:?} not present in interner"))
	}

	pub fn intern_builtin(&mut self, builtin: BuiltinType) -> TypeHandle {
		if let Some(handle) = self.builtin_cache.get(&builtin) {
			return *handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::Builtin(builtin),
			size: builtin.size(),
			abi_alignment: builtin.alignment(),
		});
		self.builtin_cache.insert(builtin, handle);
		handle
	}

	pub fn intern_pointer(&mut self, inner: TypeHandle, pointer_width_bytes: u64) -> TypeHandle {
		if let Some(handle) = self.pointer_cache.get(&inner) {
			return *handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::Pointer(inner),
			size: pointer_width_bytes,
			abi_alignment: pointer_width_bytes,
		});
		self.pointer_cache.insert(inner, handle);
		handle
	}

	pub fn intern_array(&mut self, base: TypeHandle, len: u64) -> TypeHandle {
		if let Some(handle) = self.array_cache.get(&(base, len)) {
			return *handle;
		}
		let base_ty = self.get(base).clone();
		let handle = self.push(Type {
			kind: TypeKind::Array { base, len },
			size: base_ty.size * len,
			abi_alignment: base_ty.abi_alignment,
		});
		self.array_cache.insert((base, len), handle);
		handle
	}

	pub fn intern_subarray(&mut self, base: TypeHandle, pointer_width_bytes: u64) -> TypeHandle {
		if let Some(handle) = self.subarray_cache.get(&base) {
			return *handle;
		}
		// A slice is represented as {pointer, length}: two pointer-width words.
		let handle = self.push(Type {
			kind: TypeKind::SubArray(base),
			size: pointer_width_bytes * 2,
			abi_alignment: pointer_width_bytes,
		});
		self.subarray_cache.insert(base, handle);
		handle
	}

	pub fn intern_vararray(&mut self, base: TypeHandle, pointer_width_bytes: u64) -> TypeHandle {
		if let Some(handle) = self.vararray_cache.get(&base) {
			return *handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::VarArray(base),
			size: pointer_width_bytes,
			abi_alignment: pointer_width_bytes,
		});
		self.vararray_cache.insert(base, handle);
		handle
	}

	pub fn intern_func(&mut self, signature: FuncSignature, pointer_width_bytes: u64) -> TypeHandle {
		if let Some(handle) = self.func_cache.get(&signature) {
			return *handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::Func(signature.clone()),
			size: pointer_width_bytes,
			abi_alignment: pointer_width_bytes,
		});
		self.func_cache.insert(signature, handle);
		handle
	}

	/// Interns (or retrieves) the nominal type for a declaration, recording its layout. Callers
	/// in `crate::analyse` are expected to call this once per `DeclId`, after layout is computed,
	/// and to look it up again afterwards rather than recompute `size`/`abi_alignment`.
	pub fn intern_nominal(&mut self, decl: DeclId, size: u64, abi_alignment: u64) -> TypeHandle {
		if let Some(handle) = self.nominal_cache.get(&decl) {
			return *handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::Nominal(decl),
			size,
			abi_alignment,
		});
		self.nominal_cache.insert(decl, handle);
		handle
	}

	pub fn poisoned(&mut self) -> TypeHandle {
		if let Some(handle) = self.poisoned_handle {
			return handle;
		}
		let handle = self.push(Type {
			kind: TypeKind::Poisoned,
			size: 0,
			abi_alignment: 1,
		});
		self.poisoned_handle = Some(handle);
		handle
	}
}

/// Rounds `offset` up to the next multiple of `alignment`. `alignment` must be a nonzero power of
/// two; every caller in `crate::analyse::layout` derives it from `abi_alignment`, which is always
/// a power of two by construction.
#[must_use]
pub const fn align_up(offset: u64, alignment: u64) -> u64 {
	let mask = alignment - 1;
	(offset + mask) & !mask
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtin_interning_is_stable() {
		let mut interner = TypeInterner::new();
		let a = interner.intern_builtin(BuiltinType::Int);
		let b = interner.intern_builtin(BuiltinType::Int);
		assert_eq!(a, b);
	}

	#[test]
	fn structural_pointer_interning_is_shared() {
		let mut interner = TypeInterner::new();
		let int = interner.intern_builtin(BuiltinType::Int);
		let p1 = interner.intern_pointer(int, 8);
		let p2 = interner.intern_pointer(int, 8);
		assert_eq!(p1, p2);
	}

	#[test]
	fn align_up_rounds_to_next_multiple() {
		assert_eq!(align_up(0, 8), 0);
		assert_eq!(align_up(1, 8), 8);
		assert_eq!(align_up(8, 8), 8);
		assert_eq!(align_up(9, 8), 16);
	}
}

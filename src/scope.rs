//! The scope stack and symbol table.
//!
//! Grounded in the teacher's `api/scope.rs`: scopes live in a flat arena and refer to each other
//! by `usize` index rather than `Rc<RefCell<_>>`, so the borrow checker never has to reason about
//! a scope tree's shared mutability. A scope is pushed on entry to a named aggregate (struct,
//! union, enum, interface) or a module, and popped on exit; anonymous aggregates never push one —
//! their members promote straight into the enclosing namespace.

use std::{collections::HashMap, rc::Rc};

use crate::ast::DeclId;

/// What kind of construct opened a scope. Used only for debug rendering, mirroring the teacher's
/// `ScopeType` — it plays no role in lookup semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
	Global,
	Module,
	Struct,
	Union,
	Enum,
	Interface,
	Generic,
}

/// One entry in the scope arena.
#[derive(Debug)]
struct Scope {
	kind: ScopeKind,
	parent: Option<usize>,
	/// Declarations registered directly in this scope, keyed by name. Keyed by `Rc<str>` content
	/// equality — in a build backed by a real string interner (`crate::session::StringInterner`)
	/// every occurrence of the same spelling shares one allocation, so content equality and
	/// pointer equality coincide; this map doesn't need to know which one actually decided it.
	symbols: HashMap<Rc<str>, DeclId>,
}

/// An arena of scopes plus the stack of currently open ones. One `ScopeArena` lives per
/// `Context` (see `crate::session`).
#[derive(Debug)]
pub struct ScopeArena {
	scopes: Vec<Scope>,
	stack: Vec<usize>,
}

impl Default for ScopeArena {
	fn default() -> Self {
		Self::new()
	}
}

impl ScopeArena {
	/// Creates an arena with a single open `Global` scope.
	#[must_use]
	pub fn new() -> Self {
		let global = Scope {
			kind: ScopeKind::Global,
			parent: None,
			symbols: HashMap::new(),
		};
		Self {
			scopes: vec![global],
			stack: vec![0],
		}
	}

	/// The index of the innermost currently open scope.
	#[must_use]
	pub fn current(&self) -> usize {
		*self.stack.last().unwrap_or_else(|| unreachable!("scope stack is never empty: Global is never popped"))
	}

	/// Pushes a new scope of the given kind as a child of the current one, and returns its index.
	pub fn push_scope(&mut self, kind: ScopeKind) -> usize {
		let parent = self.current();
		let index = self.scopes.len();
		self.scopes.push(Scope { kind, parent: Some(parent), symbols: HashMap::new() });
		self.stack.push(index);
		index
	}

	/// Pops the current scope. Panics (via `debug_assert!`) if called when only `Global` remains,
	/// since that would indicate a push/pop mismatch in the caller.
	pub fn pop_scope(&mut self) {
		debug_assert!(self.stack.len() > 1, "popped the Global scope — push/pop mismatch in caller");
		self.stack.pop();
	}

	/// The `ScopeKind` of scope `index`.
	#[must_use]
	pub fn kind_of(&self, index: usize) -> ScopeKind {
		self.scopes[index].kind
	}

	/// Declares `name` in the *current* scope, for duplicate-name checking within one aggregate
	/// or namespace. Returns `Err(existing)` without inserting if the name is already declared in
	/// this exact scope (not an ancestor) — callers use the existing `DeclId` to build the
	/// "previous declaration was here" note (§7).
	pub fn declare(&mut self, name: Rc<str>, decl: DeclId) -> Result<(), DeclId> {
		let scope = &mut self.scopes[self.current()];
		if let Some(existing) = scope.symbols.get(&name) {
			return Err(*existing);
		}
		scope.symbols.insert(name, decl);
		Ok(())
	}

	/// Looks up `name` in the current scope only, without walking to ancestors. This is the
	/// "duplicate member in this aggregate" check.
	#[must_use]
	pub fn resolve_symbol_in_current_dynamic_scope(&self, name: &str) -> Option<DeclId> {
		self.scopes[self.current()].symbols.get(name).copied()
	}

	/// Looks up `name` starting at the current scope and walking up through parents to `Global`.
	/// Used during type and identifier resolution, where a name declared in an enclosing module
	/// or the global namespace is visible unless shadowed.
	#[must_use]
	pub fn resolve_normal_symbol(&self, name: &str) -> Option<DeclId> {
		let mut index = Some(self.current());
		while let Some(i) = index {
			if let Some(decl) = self.scopes[i].symbols.get(name) {
				return Some(*decl);
			}
			index = self.scopes[i].parent;
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_duplicate_in_current_scope() {
		let mut arena = ScopeArena::new();
		arena.push_scope(ScopeKind::Struct);
		let name: Rc<str> = Rc::from("x");
		assert!(arena.declare(Rc::clone(&name), DeclId(0)).is_ok());
		assert_eq!(arena.declare(Rc::clone(&name), DeclId(1)), Err(DeclId(0)));
	}

	#[test]
	fn resolves_through_parent_scopes() {
		let mut arena = ScopeArena::new();
		arena.declare(Rc::from("global_thing"), DeclId(7)).unwrap();
		arena.push_scope(ScopeKind::Module);
		arena.push_scope(ScopeKind::Struct);
		assert_eq!(arena.resolve_normal_symbol("global_thing"), Some(DeclId(7)));
		assert_eq!(arena.resolve_symbol_in_current_dynamic_scope("global_thing"), None);
	}

	#[test]
	fn pop_restores_enclosing_scope() {
		let mut arena = ScopeArena::new();
		let global = arena.current();
		arena.push_scope(ScopeKind::Struct);
		assert_ne!(arena.current(), global);
		arena.pop_scope();
		assert_eq!(arena.current(), global);
	}
}

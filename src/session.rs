//! The compilation session: the ambient owner of every shared table, plus the per-module and
//! per-file containers the parser and analyser populate.
//!
//! Grounded in the teacher's `context::Context`, which is the single mutable struct threaded
//! through parsing and compile-time evaluation. This crate splits that single struct into three
//! layers matching the data model: `CompilationSession` (owns the intern tables and module
//! registry, analogous to the teacher's top-level `Context` fields like `function_declarations`
//! and `warnings`), `Module` (one compiled unit, parameterised for generics), and `Context` (one
//! source file's parse result, mirroring the teacher's per-file `scope_data`/`program` split).

use std::{collections::HashMap, rc::Rc};

use crate::{
	ast::{Decl, DeclHeader, DeclId, DeclKind, Visibility},
	diagnostics::Reporter,
	lexer::{tokenize, Span},
	parser::Parser,
	path::Path,
	scope::ScopeArena,
	types::TypeInterner,
};

/// Target-machine facts the analyser needs but this crate has no file format to load them from
/// (§1 Non-goals exclude a CLI/config surface). A driver constructs this directly.
#[derive(Debug, Clone, Copy)]
pub struct TargetConfig {
	pub pointer_width_bytes: u64,
	pub max_params: usize,
	pub max_alignment: u64,
}

impl Default for TargetConfig {
	fn default() -> Self {
		Self {
			pointer_width_bytes: 8,
			max_params: 128,
			max_alignment: 64,
		}
	}
}

/// Interns strings by content, so two occurrences of the same spelling share one allocation —
/// the prerequisite for the data model's "equality is pointer identity" rule on names and paths.
#[derive(Debug, Default)]
pub struct StringInterner {
	strings: HashMap<Rc<str>, Rc<str>>,
}

impl StringInterner {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn intern(&mut self, text: &str) -> Rc<str> {
		if let Some(existing) = self.strings.get(text) {
			return Rc::clone(existing);
		}
		let rc: Rc<str> = Rc::from(text);
		self.strings.insert(Rc::clone(&rc), Rc::clone(&rc));
		rc
	}
}

/// How far a `Module` has progressed through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
	NotStarted,
	Parsed,
	Analysed,
}

/// One source file's parse result: its own declaration arena and scope stack.
///
/// Grounded in the teacher's per-file `Context` fields (`function_declarations`, `groups`,
/// `program`); `decls` is this crate's arena replacement for the teacher's directly-owned AST
/// nodes (see `crate::ast`'s module doc for why declarations are arena-indexed).
#[derive(Debug)]
pub struct Context {
	pub module_name: Rc<str>,
	pub decls: Vec<Decl>,
	pub imports: Vec<DeclId>,
	pub global_decls: Vec<DeclId>,
	pub functions: Vec<DeclId>,
	pub methods: Vec<DeclId>,
	pub types: Vec<DeclId>,
	pub enums: Vec<DeclId>,
	pub interfaces: Vec<DeclId>,
	pub ct_ifs: Vec<DeclId>,
	pub external_symbols: HashMap<Rc<str>, DeclId>,
	pub scopes: ScopeArena,
}

impl Context {
	#[must_use]
	pub fn new(module_name: Rc<str>) -> Self {
		Self {
			module_name,
			decls: Vec::new(),
			imports: Vec::new(),
			global_decls: Vec::new(),
			functions: Vec::new(),
			methods: Vec::new(),
			types: Vec::new(),
			enums: Vec::new(),
			interfaces: Vec::new(),
			ct_ifs: Vec::new(),
			external_symbols: HashMap::new(),
			scopes: ScopeArena::new(),
		}
	}

	/// Allocates a new declaration in this context's arena and returns its id.
	pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
		let id = DeclId(self.decls.len());
		self.decls.push(decl);
		id
	}

	/// Allocates a poisoned placeholder declaration, used by recovery paths that need a `DeclId`
	/// to keep going without a real payload.
	pub fn alloc_poisoned(&mut self, span: Span) -> DeclId {
		let header = DeclHeader::new(None, span, Visibility::Local, Rc::clone(&self.module_name));
		self.alloc_decl(Decl::poisoned(header))
	}

	#[must_use]
	pub fn decl(&self, id: DeclId) -> &Decl {
		&self.decls[id.0]
	}

	pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
		&mut self.decls[id.0]
	}
}

/// A compilation unit: one or more source files (`contexts`) sharing a module path, optionally
/// parameterised by generic type tokens.
#[derive(Debug)]
pub struct Module {
	pub name: Rc<str>,
	pub parameters: Vec<Rc<str>>,
	pub contexts: Vec<Context>,
	pub is_generic: bool,
	pub is_private: bool,
	pub stage: Stage,
}

/// An index into `CompilationSession::modules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub usize);

/// The ambient owner of every table shared across modules: the module registry, the canonical
/// type interner, the string interner, and the diagnostics reporter. Exactly one instance is
/// expected to live for a compilation run; there is no `Mutex`/`RwLock` anywhere in this crate
/// because nothing outside this single struct ever needs concurrent access (§5).
#[derive(Debug)]
pub struct CompilationSession {
	pub modules: Vec<Module>,
	module_index: HashMap<Rc<str>, ModuleId>,
	pub type_interner: TypeInterner,
	pub string_interner: StringInterner,
	pub reporter: Reporter,
	pub target: TargetConfig,
	/// Caches a generic module instantiation by its mangled name (module path plus argument
	/// types), so `define X = Module::<int>::Y;` appearing twice never instantiates twice.
	pub generic_cache: HashMap<Rc<str>, ModuleId>,
}

impl CompilationSession {
	#[must_use]
	pub fn new(target: TargetConfig) -> Self {
		Self {
			modules: Vec::new(),
			module_index: HashMap::new(),
			type_interner: TypeInterner::new(),
			string_interner: StringInterner::new(),
			reporter: Reporter::new(),
			target,
			generic_cache: HashMap::new(),
		}
	}

	/// Looks up a module by its canonical path, or — if `source` is supplied — parses it fresh
	/// from that source text and registers it. This crate has no file I/O: a driver or test
	/// harness is responsible for handing over the text of a module it wants compiled.
	///
	/// # Errors
	/// Fails if the module is unregistered and no `source` was supplied, or if parsing the
	/// supplied source fails at the lexer level.
	pub fn find_or_create_module(&mut self, path: &str, source: Option<&str>) -> anyhow::Result<ModuleId> {
		if let Some(id) = self.module_index.get(path) {
			return Ok(*id);
		}
		let Some(source) = source else {
			anyhow::bail!("module '{path}' is not registered and no source text was supplied");
		};
		let module_name = self.string_interner.intern(path);
		let mut context = Context::new(Rc::clone(&module_name));
		let tokens = tokenize(source)?;
		{
			let mut parser = Parser::new(&tokens, &mut context, &mut self.reporter);
			parser.parse_module();
			parser.parse_imports();
			while !parser.at_end() {
				parser.parse_top_level_statement();
			}
		}
		let module = Module {
			name: module_name,
			parameters: Vec::new(),
			contexts: vec![context],
			is_generic: false,
			is_private: false,
			stage: Stage::Parsed,
		};
		let id = ModuleId(self.modules.len());
		self.modules.push(module);
		self.module_index.insert(Rc::from(path), id);
		Ok(id)
	}

	/// Registers an already-built module (used by the generic instantiator, which constructs a
	/// module by deep-copying declarations rather than by parsing source text).
	pub fn register_module(&mut self, canonical_path: Rc<str>, module: Module) -> ModuleId {
		let id = ModuleId(self.modules.len());
		self.modules.push(module);
		self.module_index.insert(canonical_path, id);
		id
	}

	/// Looks up an already-registered module by canonical path, without creating one.
	#[must_use]
	pub fn lookup_module(&self, path: &str) -> Option<ModuleId> {
		self.module_index.get(path).copied()
	}

	/// Drives `module` to the `Analysed` stage: every context is already parsed by
	/// `find_or_create_module`, so this runs `analyse_decl` over every top-level declaration in
	/// every context. Idempotent — a module already at `Analysed` is a no-op, matching invariant
	/// 4 in `SPEC_FULL.md` §8 (`analyse_decl` is idempotent per declaration; re-running the whole
	/// stage must be too).
	pub fn analyse_stage(&mut self, module_id: ModuleId) {
		if self.modules[module_id.0].stage == Stage::Analysed {
			return;
		}
		let context_count = self.modules[module_id.0].contexts.len();
		for context_index in 0..context_count {
			let decl_count = self.modules[module_id.0].contexts[context_index].decls.len();
			for decl_index in 0..decl_count {
				let id = DeclId(decl_index);
				crate::analyse::analyse_decl(self, module_id, context_index, id);
			}
		}
		self.modules[module_id.0].stage = Stage::Analysed;
	}

	#[must_use]
	pub fn module(&self, id: ModuleId) -> &Module {
		&self.modules[id.0]
	}

	pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
		&mut self.modules[id.0]
	}

	#[must_use]
	pub fn context(&self, module_id: ModuleId, context_index: usize) -> &Context {
		&self.modules[module_id.0].contexts[context_index]
	}

	pub fn context_mut(&mut self, module_id: ModuleId, context_index: usize) -> &mut Context {
		&mut self.modules[module_id.0].contexts[context_index]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn find_or_create_module_parses_and_caches() {
		let mut session = CompilationSession::new(TargetConfig::default());
		let source = "struct Foo { int a; }";
		let id1 = session.find_or_create_module("demo", Some(source)).unwrap();
		let id2 = session.find_or_create_module("demo", None).unwrap();
		assert_eq!(id1.0, id2.0);
		assert!(!session.module(id1).contexts[0].decls.is_empty());
	}

	#[test]
	fn missing_module_without_source_errors() {
		let mut session = CompilationSession::new(TargetConfig::default());
		assert!(session.find_or_create_module("missing", None).is_err());
	}
}

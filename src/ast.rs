//! The declaration AST: `Decl`, its header, and the per-kind payload types.
//!
//! Grounded in the teacher's `parser/expressions/literals/mod.rs` `Literal`/`LiteralValue` pair —
//! a small wrapper struct plus a big dispatch enum — generalized from "one expression, many
//! literal shapes" to "one declaration, many top-level forms." Declarations live in a flat arena
//! (`Context::decls`, see `crate::session`) and refer to each other by `DeclId` rather than owning
//! pointers, per the arena-ownership design note: a struct's members are `Vec<DeclId>`, not
//! `Vec<Decl>`, so the analyser can mutably borrow one declaration at a time without fighting the
//! borrow checker over a recursive structure.

use std::rc::Rc;

use crate::{
	const_eval::Expr,
	lexer::Span,
	path::{Name, Path},
	types::{ResolveStatus, TypeHandle, TypeInfo},
};

/// An index into a `Context`'s declaration arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub usize);

/// Visibility of a top-level declaration, derived from an optional leading qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
	/// No qualifier: visible throughout the module (but not outside it) unless overridden.
	Local,
	Public,
	/// `private`: visible only within the declaring module.
	Module,
	/// `extern`: declared but defined elsewhere; linkage name follows `cname`/mangling rules.
	Extern,
}

/// One `@name(arg)`-style attribute attached to a declaration.
#[derive(Debug, Clone)]
pub struct Attribute {
	pub name: Name,
	pub path: Option<Path>,
	pub arg_expr: Option<Expr>,
	pub alignment_value: Option<u64>,
	pub span: Span,
}

/// A parsed `@directive` line inside a doc comment.
#[derive(Debug, Clone)]
pub enum DocDirective {
	Param(Name, String),
	Pure,
	Require(String),
	Ensure(String),
	/// `@errors E1, E2, …` — see `SPEC_FULL.md` §4.D for the grammar this resolves.
	Errors(Vec<Name>),
	Unknown(Rc<str>, String),
}

/// A doc comment bound to exactly one following declaration.
#[derive(Debug, Clone)]
pub struct DocComment {
	pub directives: Vec<DocDirective>,
	pub span: Span,
}

/// The common fields every declaration kind carries, regardless of its `DeclKind`.
#[derive(Debug, Clone)]
pub struct DeclHeader {
	pub name: Option<Name>,
	pub span: Span,
	pub visibility: Visibility,
	pub module: Rc<str>,
	pub attributes: Vec<Attribute>,
	pub docs: Option<DocComment>,
	pub resolve_status: ResolveStatus,
	pub external_name: Option<Rc<str>>,
	pub alignment: Option<u64>,
	pub section: Option<Rc<str>>,
	pub cname: Option<Rc<str>>,
	pub is_packed: bool,
	pub is_opaque: bool,
	/// Set once analysis fails for this declaration; downstream phases treat it as a silent
	/// sink (§7's propagation rule) instead of re-reporting.
	pub poisoned: bool,
	/// The canonical type this declaration resolves to, once `resolve_status == Done`.
	pub type_handle: Option<TypeHandle>,
	/// A struct/union/err member's byte offset within its parent aggregate, set by layout
	/// analysis. `0` (and meaningless) for every declaration kind that isn't a member.
	pub offset: u64,
}

impl DeclHeader {
	#[must_use]
	pub fn new(name: Option<Name>, span: Span, visibility: Visibility, module: Rc<str>) -> Self {
		Self {
			name,
			span,
			visibility,
			module,
			attributes: Vec::new(),
			docs: None,
			resolve_status: ResolveStatus::NotDone,
			external_name: None,
			alignment: None,
			section: None,
			cname: None,
			is_packed: false,
			is_opaque: false,
			poisoned: false,
			type_handle: None,
			offset: 0,
		}
	}
}

/// The kind of a `Var` declaration, distinguishing a global from a struct member from a
/// parameter, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
	Const,
	Global,
	Local,
	Member,
	Param,
	/// A `vararg`-qualified trailing parameter; its declared type is converted to a sub-array of
	/// the element type during signature analysis.
	ParamVariadic,
	Alias,
}

/// Which sigil introduced a `macro`/`generic` parameter, selecting its evaluation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroParamKind {
	/// Plain `IDENT`: an ordinary value parameter.
	Value,
	/// `$IDENT`: bound to a compile-time value.
	CompileTimeValue,
	/// `&IDENT`: passed by reference.
	ByRef,
	/// `#IDENT`: substituted unevaluated (lazily, textually) into the macro body.
	Unevaluated,
	/// `$TYPE`: bound to a compile-time type.
	CompileTimeType,
}

#[derive(Debug, Clone)]
pub struct MacroParam {
	pub kind: MacroParamKind,
	pub declared_type: Option<TypeInfo>,
	pub name: Name,
}

/// A `struct`, `union`, or `err` body.
#[derive(Debug, Clone)]
pub struct AggregateBody {
	pub members: Vec<DeclId>,
	pub size: u64,
	pub padding: u64,
	/// Index into `members` of the layout-representative member. Only meaningful for unions.
	pub union_rep: Option<usize>,
	/// Whether the first member is an unnamed `inline` sub-struct whose fields promote into this
	/// aggregate's own namespace.
	pub is_substruct: bool,
}

impl AggregateBody {
	#[must_use]
	pub const fn new(members: Vec<DeclId>) -> Self {
		Self {
			members,
			size: 0,
			padding: 0,
			union_rep: None,
			is_substruct: false,
		}
	}
}

/// An `enum` body.
#[derive(Debug, Clone)]
pub struct EnumBody {
	pub base_type: TypeInfo,
	pub values: Vec<DeclId>,
	/// Optional payload parameter schema shared by every constant's `(expr_list)`.
	pub parameters: Vec<DeclId>,
}

/// An `enum` constant's own payload, carried in `DeclKind::EnumConstant`.
#[derive(Debug, Clone)]
pub struct EnumConstantBody {
	pub value_expr: Option<Expr>,
	pub payload_args: Vec<Expr>,
	pub ordinal: u32,
	pub int_value: Option<i128>,
}

/// A `func` declaration (free function, method, or interface member signature).
#[derive(Debug, Clone)]
pub struct FuncDecl {
	pub return_type: TypeInfo,
	pub is_failable: bool,
	/// Set when parsed as `TYPE '.' name`: the method's parent type name.
	pub parent_type: Option<Name>,
	pub params: Vec<DeclId>,
	pub is_variadic: bool,
	/// `true` if the declaration ended in `{ ... }` rather than `;`.
	pub has_body: bool,
	pub is_interface_member: bool,
	pub mangled_name: Option<Rc<str>>,
}

/// A `macro` declaration.
#[derive(Debug, Clone)]
pub struct MacroDecl {
	pub return_type: Option<TypeInfo>,
	pub is_failable: bool,
	pub params: Vec<MacroParam>,
}

/// A single `type-list: ` arm of a `generic` function, or its default arm.
#[derive(Debug, Clone)]
pub struct GenericCase {
	/// Empty iff this is the default case.
	pub types: Vec<TypeInfo>,
	pub is_default: bool,
}

/// A `generic` function declaration: one signature dispatched over a compile-time switch on
/// argument types.
#[derive(Debug, Clone)]
pub struct GenericFuncDecl {
	pub return_type: Option<TypeInfo>,
	pub path: Option<Path>,
	pub params: Vec<MacroParam>,
	pub cases: Vec<GenericCase>,
}

/// The right-hand side of a `define TYPE = ...` type alias.
#[derive(Debug, Clone)]
pub enum DefineTypeRhs {
	FuncSignature(FuncDecl),
	Type(TypeInfo, Vec<TypeInfo>),
}

/// A `define` declaration — either a type alias or an identifier alias, optionally generic.
#[derive(Debug, Clone)]
pub enum DefineDecl {
	Type { is_distinct: bool, rhs: DefineTypeRhs },
	Ident { path: Option<Path>, target: Name, generic_args: Vec<TypeInfo>, instantiated_module: Option<Rc<str>> },
}

/// The domains an `attribute`-declared custom attribute may be applied to, mirroring the
/// built-in attribute domain table in `crate::analyse::attribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeDomain {
	Func,
	Var,
	Enum,
	Struct,
	Union,
	Typedef,
	Const,
	Error,
	Member,
}

/// One `$case TYPE:` (or `$default:`) arm of a `$switch`.
#[derive(Debug, Clone)]
pub struct CtCase {
	/// `None` for `$default`.
	pub type_info: Option<TypeInfo>,
	pub decls: Vec<DeclId>,
}

/// The payload of every top-level declaration form this crate parses.
#[derive(Debug, Clone)]
pub enum DeclKind {
	/// A declaration that failed to parse or analyse. Carries no further information; downstream
	/// phases skip it without re-reporting (§7).
	Poisoned,
	Var {
		kind: VarKind,
		type_info: TypeInfo,
		is_failable: bool,
		initializer: Option<Expr>,
	},
	Func(FuncDecl),
	Macro(MacroDecl),
	Struct(AggregateBody),
	Union(AggregateBody),
	Err(AggregateBody),
	Enum(EnumBody),
	EnumConstant(EnumConstantBody),
	Typedef {
		type_info: TypeInfo,
	},
	Distinct {
		type_info: TypeInfo,
	},
	Interface {
		members: Vec<DeclId>,
	},
	Define(DefineDecl),
	Generic(GenericFuncDecl),
	AttributeDef {
		domains: Vec<AttributeDomain>,
		has_arg: bool,
	},
	Import(Path),
	/// A module-scope accumulating array, built from one or more `IDENT += initializer;`
	/// declarations sharing the same name.
	ArrayValue {
		element_type: TypeInfo,
		elements: Vec<Expr>,
	},
	/// `$if`/`$elif`/`$else` chain. `elif`/`else` branches are modelled as fields here rather
	/// than as sibling arena entries — see `DESIGN.md` for why.
	CtIf {
		condition: Expr,
		then_decls: Vec<DeclId>,
		elifs: Vec<(Expr, Vec<DeclId>)>,
		else_decls: Option<Vec<DeclId>>,
	},
	CtSwitch {
		scrutinee: Expr,
		cases: Vec<CtCase>,
	},
	CtAssert {
		condition: Expr,
		message: Option<Expr>,
	},
	/// A statement-level construct enumerated in the data model for completeness; this crate's
	/// grammar (declarations only) never constructs one.
	Label,
}

/// One declaration: shared header plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct Decl {
	pub header: DeclHeader,
	pub kind: DeclKind,
}

impl Decl {
	#[must_use]
	pub const fn poisoned(header: DeclHeader) -> Self {
		Self { header, kind: DeclKind::Poisoned }
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		self.header.poisoned || matches!(self.kind, DeclKind::Poisoned)
	}
}

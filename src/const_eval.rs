//! A minimal constant-expression grammar and folder.
//!
//! The statement/expression analyser is out of scope for this crate (it is a separate
//! collaborator), but array lengths, enum values, `align`/`cname`/`section` attribute arguments,
//! and `$if`/`$switch` conditions all need to know whether an expression is a compile-time
//! constant and, if so, what it folds to. This module supplies exactly that slice, grounded in
//! the teacher's `compile_time::CompileTime` trait (`compile_time/mod.rs`), which eagerly folds
//! literals and operators before transpilation — the same shape, reduced to the subset this
//! crate's invariants need.

use std::rc::Rc;

use crate::{
	cursor::Cursor,
	lexer::{Span, TokenKind},
	path::Name,
};

/// A unary prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Neg,
	Not,
}

/// A binary infix operator, in the small subset this evaluator folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Eq,
	Lt,
	Gt,
}

/// An unevaluated constant expression, as parsed from source.
#[derive(Debug, Clone)]
pub enum Expr {
	Int(i128),
	Str(Rc<str>),
	/// A bare identifier — a reference to another constant, compile-time parameter, or variable.
	/// `fold` cannot reduce this on its own; a caller with access to the symbol table may
	/// substitute it before folding (out of scope here).
	Ident(Name),
	Unary(UnaryOp, Box<Expr>, Span),
	Binary(BinaryOp, Box<Expr>, Box<Expr>, Span),
}

impl Expr {
	#[must_use]
	pub fn span(&self) -> Span {
		match self {
			Self::Int(..) | Self::Str(..) => Span::synthetic(),
			Self::Ident(name) => name.span,
			Self::Unary(.., span) | Self::Binary(.., span) => *span,
		}
	}
}

/// A folded constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstExpr {
	Int(i128),
	Bool(bool),
	Str(Rc<str>),
}

impl ConstExpr {
	/// Coerces a folded constant to a non-negative `u64`, as required of array lengths. Returns
	/// `None` for anything that isn't a non-negative integer fitting in 64 bits.
	#[must_use]
	pub fn as_array_length(&self) -> Option<u64> {
		match self {
			Self::Int(value) if *value >= 0 && *value <= i128::from(u64::MAX) => Some(*value as u64),
			_ => None,
		}
	}
}

/// Folds `expr` into a constant value, or returns `None` if it isn't one. Handles integer and
/// string literals, unary `-`/`!`, and binary `+ - * / == < >` over two already-folded operands.
/// Anything involving an unresolved identifier is never constant as far as this evaluator is
/// concerned — callers that need symbol substitution must do it before calling `fold`.
#[must_use]
pub fn fold(expr: &Expr) -> Option<ConstExpr> {
	match expr {
		Expr::Int(value) => Some(ConstExpr::Int(*value)),
		Expr::Str(value) => Some(ConstExpr::Str(Rc::clone(value))),
		Expr::Ident(_) => None,
		Expr::Unary(op, operand, _) => {
			let folded = fold(operand)?;
			match (op, folded) {
				(UnaryOp::Neg, ConstExpr::Int(value)) => Some(ConstExpr::Int(-value)),
				(UnaryOp::Not, ConstExpr::Bool(value)) => Some(ConstExpr::Bool(!value)),
				_ => None,
			}
		}
		Expr::Binary(op, lhs, rhs, _) => {
			let lhs = fold(lhs)?;
			let rhs = fold(rhs)?;
			fold_binary(*op, &lhs, &rhs)
		}
	}
}

fn fold_binary(op: BinaryOp, lhs: &ConstExpr, rhs: &ConstExpr) -> Option<ConstExpr> {
	if let (ConstExpr::Int(l), ConstExpr::Int(r)) = (lhs, rhs) {
		return match op {
			BinaryOp::Add => Some(ConstExpr::Int(l.checked_add(*r)?)),
			BinaryOp::Sub => Some(ConstExpr::Int(l.checked_sub(*r)?)),
			BinaryOp::Mul => Some(ConstExpr::Int(l.checked_mul(*r)?)),
			BinaryOp::Div => {
				if *r == 0 {
					None
				} else {
					Some(ConstExpr::Int(l.checked_div(*r)?))
				}
			}
			BinaryOp::Eq => Some(ConstExpr::Bool(l == r)),
			BinaryOp::Lt => Some(ConstExpr::Bool(l < r)),
			BinaryOp::Gt => Some(ConstExpr::Bool(l > r)),
		};
	}
	if op == BinaryOp::Eq {
		return Some(ConstExpr::Bool(match (lhs, rhs) {
			(ConstExpr::Str(l), ConstExpr::Str(r)) => l == r,
			(ConstExpr::Bool(l), ConstExpr::Bool(r)) => l == r,
			_ => false,
		}));
	}
	None
}

/// Parses a constant expression with the usual precedence: `==`/`<`/`>` bind loosest, then
/// `+`/`-`, then `*`/`/`, then unary `-`/`!`, then primaries (literals, identifiers, and
/// parenthesized sub-expressions). This is the full grammar this crate's parser needs — it never
/// parses calls, field access, or any other expression-language construct, since those belong to
/// the out-of-scope statement/expression analyser.
///
/// # Errors
/// Fails if the token stream doesn't start a valid expression, or a closing `)` is missing.
pub fn parse_expr(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	parse_comparison(cursor)
}

fn parse_comparison(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	let mut lhs = parse_additive(cursor)?;
	loop {
		let op = match cursor.peek().kind {
			TokenKind::EqualEqual => BinaryOp::Eq,
			TokenKind::LeftAngleBracket => BinaryOp::Lt,
			TokenKind::RightAngleBracket => BinaryOp::Gt,
			_ => break,
		};
		let span = cursor.span();
		cursor.advance();
		let rhs = parse_additive(cursor)?;
		lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
	}
	Ok(lhs)
}

fn parse_additive(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	let mut lhs = parse_multiplicative(cursor)?;
	loop {
		let op = match cursor.peek().kind {
			TokenKind::Plus => BinaryOp::Add,
			TokenKind::Minus => BinaryOp::Sub,
			_ => break,
		};
		let span = cursor.span();
		cursor.advance();
		let rhs = parse_multiplicative(cursor)?;
		lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
	}
	Ok(lhs)
}

fn parse_multiplicative(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	let mut lhs = parse_unary(cursor)?;
	loop {
		let op = match cursor.peek().kind {
			TokenKind::Star => BinaryOp::Mul,
			_ => break,
		};
		let span = cursor.span();
		cursor.advance();
		let rhs = parse_unary(cursor)?;
		lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
	}
	Ok(lhs)
}

fn parse_unary(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	let span = cursor.span();
	if cursor.try_consume(&TokenKind::Minus).is_some() {
		return Ok(Expr::Unary(UnaryOp::Neg, Box::new(parse_unary(cursor)?), span));
	}
	if cursor.try_consume(&TokenKind::Bang).is_some() {
		return Ok(Expr::Unary(UnaryOp::Not, Box::new(parse_unary(cursor)?), span));
	}
	parse_primary(cursor)
}

fn parse_primary(cursor: &mut Cursor<'_>) -> anyhow::Result<Expr> {
	let span = cursor.span();
	match cursor.peek().kind {
		TokenKind::Number => {
			let text = cursor.text();
			cursor.advance();
			let value = text.parse::<i128>().map_err(|_| anyhow::anyhow!("{span}: Integer literal '{text}' out of range"))?;
			Ok(Expr::Int(value))
		}
		TokenKind::Str => {
			let text = cursor.text();
			cursor.advance();
			let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
			Ok(Expr::Str(Rc::from(inner)))
		}
		TokenKind::Ident | TokenKind::TypeIdent | TokenKind::ConstIdent | TokenKind::CtIdent | TokenKind::CtTypeIdent | TokenKind::CtConstIdent => {
			let text = cursor.text();
			cursor.advance();
			Ok(Expr::Ident(Name { text, span }))
		}
		TokenKind::LeftParenthesis => {
			cursor.advance();
			let inner = parse_expr(cursor)?;
			cursor.expect(&TokenKind::RightParenthesis)?;
			Ok(inner)
		}
		_ => anyhow::bail!("{span}: Expected a constant expression but found {}", cursor.peek().kind),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::tokenize;

	fn fold_source(source: &str) -> ConstExpr {
		let tokens = tokenize(source).unwrap();
		let mut cursor = Cursor::new(&tokens);
		let expr = parse_expr(&mut cursor).unwrap();
		fold(&expr).unwrap()
	}

	#[test]
	fn folds_arithmetic_with_precedence() {
		assert_eq!(fold_source("10 + 11"), ConstExpr::Int(21));
		assert_eq!(fold_source("2 + 3 * 4"), ConstExpr::Int(14));
		assert_eq!(fold_source("(2 + 3) * 4"), ConstExpr::Int(20));
	}

	#[test]
	fn folds_unary_negation() {
		assert_eq!(fold_source("-5"), ConstExpr::Int(-5));
	}

	#[test]
	fn folds_comparisons() {
		assert_eq!(fold_source("4 < 5"), ConstExpr::Bool(true));
		assert_eq!(fold_source("4 == 4"), ConstExpr::Bool(true));
	}

	#[test]
	fn bare_identifier_does_not_fold() {
		let tokens = tokenize("some_name").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let expr = parse_expr(&mut cursor).unwrap();
		assert!(fold(&expr).is_none());
	}

	#[test]
	fn division_by_zero_does_not_fold() {
		let tokens = tokenize("1 / 0").unwrap();
		let mut cursor = Cursor::new(&tokens);
		let expr = parse_expr(&mut cursor).unwrap();
		assert!(fold(&expr).is_none());
	}
}

//! Compiled statement nodes. Statements execute for effect and yield a
//! flow-control signal; the evaluator propagates a non-nominal signal past
//! remaining siblings, loops intercept break/continue, and function bodies
//! intercept return.

use std::sync::Arc;

use crate::{
	context::symbols::FunctionSignature,
	lexer::token::LiteralValue,
	parser::expression::Expr,
	types::ScriptType,
};

#[derive(Debug)]
pub enum Stmt {
	/// A declaration that left nothing to execute, or a stray `;`.
	Empty,
	Expr(Expr),
	VarDecl { name: String, ty: ScriptType, initializer: Option<Expr> },
	Block(Vec<Stmt>),
	/// `if`/`elseif` chain plus optional `else`; branches run first-match.
	If { branches: Vec<(Expr, Vec<Stmt>)>, else_branch: Option<Vec<Stmt>> },
	While { condition: Expr, body: Vec<Stmt> },
	For {
		initializer: Option<Box<Stmt>>,
		condition:   Option<Expr>,
		increment:   Option<Box<Stmt>>,
		body:        Vec<Stmt>,
	},
	Foreach { variable: String, elem_ty: ScriptType, iterable: Expr, body: Vec<Stmt> },
	Switch { scrutinee: Expr, cases: Vec<SwitchCase>, default: Option<Vec<Stmt>> },
	Break,
	Continue,
	Return(Option<Expr>),
}

/// One `case` arm; labels are compile-time constants and a matched arm runs
/// only its own statements (no fallthrough).
#[derive(Debug)]
pub struct SwitchCase {
	pub ty:    ScriptType,
	pub label: LiteralValue,
	pub body:  Vec<Stmt>,
}

/// A fully compiled script function: its declared signature and body.
#[derive(Debug)]
pub struct CompiledFunction {
	pub signature: Arc<FunctionSignature>,
	pub body:      Vec<Stmt>,
}

/// A script-root `global` declaration, initialized at the start of every
/// invocation before the entry function runs.
#[derive(Debug)]
pub struct GlobalDecl {
	pub name:        String,
	pub ty:          ScriptType,
	pub initializer: Option<Expr>,
}

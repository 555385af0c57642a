//! Compiled expression nodes.
//!
//! Every node is fully typed at construction: `Expr::ty` reads back the
//! static type the parser validated, so the evaluator never re-checks
//! operand compatibility. A node covers one or more of the three
//! capabilities: producing a value (`Expr`), accepting one (`Target`), or
//! executing for effect (`Stmt`, which wraps `Expr` for calls).

use std::sync::Arc;

use crate::{
	context::symbols::FunctionSignature,
	lexer::token::LiteralValue,
	registry::{MethodBinding, PropertyBinding},
	types::ScriptType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Negate,
	Not,
	BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	BitAnd,
	BitOr,
	BitXor,
	Shl,
	Shr,
}

impl BinaryOp {
	pub fn symbol(&self) -> &'static str {
		use BinaryOp::*;
		match self {
			Add => "+",
			Sub => "-",
			Mul => "*",
			Div => "/",
			Rem => "%",
			Eq => "==",
			Ne => "!=",
			Lt => "<",
			Le => "<=",
			Gt => ">",
			Ge => ">=",
			BitAnd => "&",
			BitOr => "|",
			BitXor => "^",
			Shl => "<<",
			Shr => ">>",
		}
	}
}

#[derive(Debug)]
pub enum Expr {
	Literal(LiteralValue),
	/// A resolved constant or enum value, inlined at its use site.
	Constant { ty: ScriptType, value: LiteralValue },
	Variable { name: String, ty: ScriptType },
	Unary { op: UnaryOp, operand: Box<Expr>, ty: ScriptType },
	Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, ty: ScriptType },
	/// Short-circuiting `&&`/`||`; operands are `bool`.
	Logical { and: bool, left: Box<Expr>, right: Box<Expr> },
	StringConcat { left: Box<Expr>, right: Box<Expr> },
	NullCoalesce { left: Box<Expr>, right: Box<Expr>, ty: ScriptType },
	Ternary { condition: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr>, ty: ScriptType },
	/// Plain or compound assignment; `op` is the compound's base operator.
	Assign { target: Target, op: Option<BinaryOp>, value: Box<Expr> },
	IncrDecr { target: Target, increment: bool, postfix: bool },
	/// Explicit casts and compiler-inserted widenings alike.
	Cast { ty: ScriptType, operand: Box<Expr> },
	/// A call to a script-declared function.
	Call { index: usize, signature: Arc<FunctionSignature>, args: Vec<CallArg> },
	/// A call to a host-registered method, instance or static.
	HostCall { method: Arc<MethodBinding>, receiver: Option<Box<Expr>>, args: Vec<Expr>, ty: ScriptType },
	PropertyGet { property: Arc<PropertyBinding>, receiver: Option<Box<Expr>>, ty: ScriptType },
	/// The built-in `length` of an array or string.
	Length { operand: Box<Expr> },
	Index { array: Box<Expr>, index: Box<Expr>, ty: ScriptType },
	NewArray { elem: ScriptType, len: Box<Expr> },
	NewObject { constructor: Arc<MethodBinding>, ty: ScriptType, args: Vec<Expr> },
	/// The formatting intrinsic interpolation expands into.
	Format { template: Box<Expr>, args: Vec<Expr> },
	/// Trailing arguments packed into a variadic parameter's array.
	ArgPack { elem: ScriptType, items: Vec<Expr> },
}

impl Expr {
	/// The static type this expression produces.
	pub fn ty(&self) -> ScriptType {
		use Expr::*;
		match self {
			Literal(lit) => lit.ty(),
			Constant { ty, .. } => ty.clone(),
			Variable { ty, .. } => ty.clone(),
			Unary { ty, .. } => ty.clone(),
			Binary { ty, .. } => ty.clone(),
			Logical { .. } => ScriptType::Bool,
			StringConcat { .. } => ScriptType::Str,
			NullCoalesce { ty, .. } => ty.clone(),
			Ternary { ty, .. } => ty.clone(),
			Assign { target, .. } => target.ty(),
			IncrDecr { target, .. } => target.ty(),
			Cast { ty, .. } => ty.clone(),
			Call { signature, .. } => signature.return_type.clone(),
			HostCall { ty, .. } => ty.clone(),
			PropertyGet { ty, .. } => ty.clone(),
			Length { .. } => ScriptType::Int,
			Index { ty, .. } => ty.clone(),
			NewArray { elem, .. } => ScriptType::array(elem.clone()),
			NewObject { ty, .. } => ty.clone(),
			Format { .. } => ScriptType::Str,
			ArgPack { elem, .. } => ScriptType::array(elem.clone()),
		}
	}
}

/// The assignable capability: somewhere a value can be stored.
#[derive(Debug)]
pub enum Target {
	Variable { name: String, ty: ScriptType },
	Index { array: Box<Expr>, index: Box<Expr>, ty: ScriptType },
	Property { property: Arc<PropertyBinding>, receiver: Option<Box<Expr>>, ty: ScriptType },
}

impl Target {
	pub fn ty(&self) -> ScriptType {
		match self {
			Target::Variable { ty, .. } | Target::Index { ty, .. } | Target::Property { ty, .. } => {
				ty.clone()
			}
		}
	}
}

/// One argument at a script-function call site. `Ref` and `Out` arguments
/// are assignable targets rewritten by the caller after the call returns.
#[derive(Debug)]
pub enum CallArg {
	Value(Expr),
	Ref(Target),
	Out(Target),
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
	items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

impl std::fmt::Display for Expr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use Expr::*;
		match self {
			Literal(lit) => write!(f, "{lit}"),
			Constant { value, .. } => write!(f, "{value}"),
			Variable { name, .. } => write!(f, "{name}"),
			Unary { op, operand, .. } => {
				let symbol = match op {
					UnaryOp::Negate => "-",
					UnaryOp::Not => "!",
					UnaryOp::BitNot => "~",
				};
				write!(f, "({symbol} {operand})")
			}
			Binary { op, left, right, .. } => write!(f, "({} {left} {right})", op.symbol()),
			Logical { and, left, right } => {
				write!(f, "({} {left} {right})", if *and { "&&" } else { "||" })
			}
			StringConcat { left, right } => write!(f, "(concat {left} {right})"),
			NullCoalesce { left, right, .. } => write!(f, "(?? {left} {right})"),
			Ternary { condition, then_branch, else_branch, .. } => {
				write!(f, "(? {condition} : {then_branch} {else_branch})")
			}
			Assign { target, op: Some(op), value } => {
				write!(f, "({}= {target} {value})", op.symbol())
			}
			Assign { target, op: None, value } => write!(f, "(= {target} {value})"),
			IncrDecr { target, increment, postfix } => {
				let symbol = if *increment { "++" } else { "--" };
				if *postfix {
					write!(f, "({target} {symbol})")
				} else {
					write!(f, "({symbol} {target})")
				}
			}
			Cast { ty, operand } => write!(f, "(cast {ty} {operand})"),
			Call { signature, args, .. } => write!(f, "(call {} {})", signature.name, join(args)),
			HostCall { method, receiver: Some(receiver), args, .. } => {
				write!(f, "(call {receiver}.{} {})", method.name, join(args))
			}
			HostCall { method, receiver: None, args, .. } => {
				write!(f, "(call {} {})", method.name, join(args))
			}
			PropertyGet { property, receiver: Some(receiver), .. } => {
				write!(f, "(get {receiver}.{})", property.name)
			}
			PropertyGet { property, receiver: None, .. } => write!(f, "(get {})", property.name),
			Length { operand } => write!(f, "(len {operand})"),
			Index { array, index, .. } => write!(f, "(index {array} {index})"),
			NewArray { elem, len } => write!(f, "(new-array {elem} {len})"),
			NewObject { ty, args, .. } => write!(f, "(new {ty} {})", join(args)),
			Format { template, args } => write!(f, "(format {template} {})", join(args)),
			ArgPack { items, .. } => write!(f, "(pack {})", join(items)),
		}
	}
}

impl std::fmt::Display for Target {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Target::Variable { name, .. } => write!(f, "{name}"),
			Target::Index { array, index, .. } => write!(f, "(index {array} {index})"),
			Target::Property { property, receiver: Some(receiver), .. } => {
				write!(f, "{receiver}.{}", property.name)
			}
			Target::Property { property, receiver: None, .. } => write!(f, "{}", property.name),
		}
	}
}

impl std::fmt::Display for CallArg {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CallArg::Value(expr) => write!(f, "{expr}"),
			CallArg::Ref(target) => write!(f, "(ref {target})"),
			CallArg::Out(target) => write!(f, "(out {target})"),
		}
	}
}

//! Recursive-descent parser and compiler.
//!
//! Consumes the normalized token stream and builds the executable tree,
//! consulting the compilation context for declarations and the host binding
//! registry for member resolution. Precedence climbs through
//! unary > multiplicative > additive > shift > relational > equality >
//! bitwise > logical > `??` > ternary > assignment, left-associative except
//! assignment, ternary and `??`. Every node is type-checked as it is built;
//! the first incompatibility aborts compilation with a positioned
//! diagnostic; there is no recovery pass.

pub mod expression;
pub mod statement;

use std::{collections::VecDeque, sync::Arc};

use anyhow::anyhow;

use crate::{
	context::{
		symbols::{ConstantData, FunctionSignature, Parameter, PassMode},
		BlockFlow, CompileContext, IdentifierKind,
	},
	error::compile::{diagnostic, CompileError, CompileErrorKind::*},
	lexer::token::{Keyword, LiteralValue, Operator, Separator, SourcePos, Token, TokenKind},
	parser::{
		expression::{BinaryOp, CallArg, Expr, Target, UnaryOp},
		statement::{CompiledFunction, GlobalDecl, Stmt, SwitchCase},
	},
	registry::{overload::{ArgInfo, ArgMode}, HostRegistry, ResolveError, StaticMember},
	stream::TokenSource,
	types::ScriptType,
};

pub struct Parser<'r, S: TokenSource> {
	tokens:    S,
	lookahead: VecDeque<Token>,
	registry:  &'r HostRegistry,
	context:   CompileContext,
	functions: Vec<CompiledFunction>,
	/// Signature identity to body index, assigned at declaration time.
	indices:   Vec<(Arc<FunctionSignature>, usize)>,
	globals:   Vec<GlobalDecl>,
}

impl<'r, S: TokenSource> Parser<'r, S> {
	pub fn new(tokens: S, registry: &'r HostRegistry) -> Self {
		Self {
			tokens,
			lookahead: VecDeque::new(),
			registry,
			context: CompileContext::new(),
			functions: Vec::new(),
			indices: Vec::new(),
			globals: Vec::new(),
		}
	}

	/// Parse a whole script: function, global and constant declarations.
	pub fn parse(mut self) -> Result<(Vec<CompiledFunction>, Vec<GlobalDecl>), CompileError> {
		loop {
			let pos = self.peek()?.pos;
			let kind = self.peek()?.kind.clone();
			match kind {
				TokenKind::Eof => break,
				TokenKind::Keyword(Keyword::Extern) => {
					self.advance()?;
					self.expect_keyword(Keyword::Function)?;
					self.function_decl(true)?;
				}
				TokenKind::Keyword(Keyword::Function) => {
					self.advance()?;
					self.function_decl(false)?;
				}
				TokenKind::Keyword(Keyword::Global) => {
					self.advance()?;
					self.global_decl()?;
				}
				TokenKind::Keyword(Keyword::Const) => {
					self.advance()?;
					self.const_decl()?;
				}
				_ => {
					let found = self.peek()?.describe();
					return Err(diagnostic(pos, UnexpectedToken(found)));
				}
			}
		}
		Ok((self.functions, self.globals))
	}

	// -- token plumbing -------------------------------------------------------

	fn fill(&mut self, n: usize) -> Result<(), CompileError> {
		while self.lookahead.len() < n {
			let token = self.tokens.next_token()?;
			self.lookahead.push_back(token);
		}
		Ok(())
	}

	fn peek(&mut self) -> Result<&Token, CompileError> {
		self.fill(1)?;
		self.lookahead.front().ok_or_else(|| anyhow!("lookahead buffer empty after fill").into())
	}

	fn peek_at(&mut self, n: usize) -> Result<&Token, CompileError> {
		self.fill(n + 1)?;
		self.lookahead.get(n).ok_or_else(|| anyhow!("lookahead buffer short after fill").into())
	}

	fn advance(&mut self) -> Result<Token, CompileError> {
		self.fill(1)?;
		self.lookahead.pop_front().ok_or_else(|| anyhow!("lookahead buffer empty after fill").into())
	}

	fn expect_separator(&mut self, sep: Separator) -> Result<Token, CompileError> {
		let token = self.advance()?;
		if matches!(token.kind, TokenKind::Separator(s) if s == sep) {
			return Ok(token);
		}
		Err(diagnostic(
			token.pos,
			ExpectedToken { expected: format!("'{}'", sep.symbol()), found: token.describe() },
		))
	}

	fn expect_keyword(&mut self, kw: Keyword) -> Result<Token, CompileError> {
		let token = self.advance()?;
		if matches!(token.kind, TokenKind::Keyword(k) if k == kw) {
			return Ok(token);
		}
		Err(diagnostic(
			token.pos,
			ExpectedToken { expected: format!("'{}'", kw.text()), found: token.describe() },
		))
	}

	fn expect_operator(&mut self, op: Operator) -> Result<Token, CompileError> {
		let token = self.advance()?;
		if matches!(token.kind, TokenKind::Operator(o) if o == op) {
			return Ok(token);
		}
		Err(diagnostic(
			token.pos,
			ExpectedToken { expected: format!("'{}'", op.symbol()), found: token.describe() },
		))
	}

	fn match_separator(&mut self, sep: Separator) -> Result<bool, CompileError> {
		if matches!(self.peek()?.kind, TokenKind::Separator(s) if s == sep) {
			self.advance()?;
			return Ok(true);
		}
		Ok(false)
	}

	fn match_keyword(&mut self, kw: Keyword) -> Result<bool, CompileError> {
		if matches!(self.peek()?.kind, TokenKind::Keyword(k) if k == kw) {
			self.advance()?;
			return Ok(true);
		}
		Ok(false)
	}

	fn match_operator(&mut self, op: Operator) -> Result<bool, CompileError> {
		if matches!(self.peek()?.kind, TokenKind::Operator(o) if o == op) {
			self.advance()?;
			return Ok(true);
		}
		Ok(false)
	}

	fn expect_identifier(&mut self) -> Result<(String, SourcePos), CompileError> {
		let token = self.advance()?;
		match token.kind {
			TokenKind::Identifier { name, generic_args } if generic_args.is_empty() => {
				Ok((name, token.pos))
			}
			TokenKind::Identifier { .. } => Err(diagnostic(token.pos, UnexpectedGenericArguments)),
			_ => Err(diagnostic(
				token.pos,
				ExpectedToken { expected: "an identifier".into(), found: token.describe() },
			)),
		}
	}

	// -- types ----------------------------------------------------------------

	fn parse_type_or_void(&mut self) -> Result<ScriptType, CompileError> {
		let token = self.advance()?;
		match token.kind {
			TokenKind::Type(ty) => Ok(ty),
			TokenKind::Keyword(Keyword::Void) => Ok(ScriptType::Void),
			_ => Err(diagnostic(
				token.pos,
				ExpectedToken { expected: "a type".into(), found: token.describe() },
			)),
		}
	}

	fn parse_type(&mut self) -> Result<ScriptType, CompileError> {
		let pos = self.peek()?.pos;
		let ty = self.parse_type_or_void()?;
		if ty == ScriptType::Void {
			return Err(diagnostic(
				pos,
				TypeMismatch { expected: "a non-void type".into(), found: "void".into() },
			));
		}
		Ok(ty)
	}

	// -- declarations ---------------------------------------------------------

	fn function_decl(&mut self, is_extern: bool) -> Result<(), CompileError> {
		let return_type = self.parse_type_or_void()?;
		let (name, name_pos) = self.expect_identifier()?;
		self.expect_separator(Separator::LeftParen)?;
		let params = self.parameter_list()?;

		let signature = FunctionSignature::new(
			&name,
			return_type.clone(),
			params.iter().map(|(p, _)| p.clone()).collect(),
			name_pos,
			is_extern,
		);
		let signature = self.context.declare_function(signature)?;
		let index = self.functions.len();
		self.indices.push((signature.clone(), index));

		self.context.push_function(return_type);
		for (param, pos) in &params {
			let readonly = param.mode == PassMode::In;
			self.context.declare_variable(&param.name, param.ty.clone(), readonly, *pos)?;
		}
		self.expect_separator(Separator::LeftBrace)?;
		let body = self.block_body()?;
		self.context.pop_scope()?;

		self.functions.push(CompiledFunction { signature, body });
		Ok(())
	}

	/// Parameters after the opening paren, through the closing one.
	fn parameter_list(&mut self) -> Result<Vec<(Parameter, SourcePos)>, CompileError> {
		let mut params = Vec::new();
		if self.match_separator(Separator::RightParen)? {
			return Ok(params);
		}
		loop {
			let mode = if self.match_keyword(Keyword::Ref)? {
				PassMode::Ref
			} else if self.match_keyword(Keyword::Out)? {
				PassMode::Out
			} else if self.match_keyword(Keyword::Params)? {
				PassMode::Variadic
			} else if self.match_keyword(Keyword::In)? {
				PassMode::In
			} else {
				PassMode::ByValue
			};
			let ty_pos = self.peek()?.pos;
			let ty = self.parse_type()?;
			if mode == PassMode::Variadic && !matches!(ty, ScriptType::Array(_)) {
				return Err(diagnostic(
					ty_pos,
					TypeMismatch { expected: "an array type after 'params'".into(), found: ty.to_string() },
				));
			}
			let (name, pos) = self.expect_identifier()?;
			params.push((Parameter::new(name, ty, mode), pos));
			if self.match_separator(Separator::Comma)? {
				continue;
			}
			self.expect_separator(Separator::RightParen)?;
			break;
		}
		if let Some((param, pos)) =
			params.iter().take(params.len().saturating_sub(1)).find(|(p, _)| p.mode == PassMode::Variadic)
		{
			return Err(diagnostic(
				*pos,
				UnexpectedToken(format!("'params {}' before the last parameter", param.ty)),
			));
		}
		Ok(params)
	}

	fn global_decl(&mut self) -> Result<(), CompileError> {
		let ty = self.parse_type()?;
		let (name, pos) = self.expect_identifier()?;
		let initializer = if self.match_operator(Operator::Assign)? {
			let value = self.expression()?;
			Some(self.coerce(value, &ty, pos)?)
		} else {
			None
		};
		self.expect_separator(Separator::Semicolon)?;
		self.context.declare_variable(&name, ty.clone(), false, pos)?;
		self.globals.push(GlobalDecl { name, ty, initializer });
		Ok(())
	}

	fn const_decl(&mut self) -> Result<(), CompileError> {
		let ty = self.parse_type()?;
		let (name, pos) = self.expect_identifier()?;
		self.expect_operator(Operator::Assign)?;
		let value = self.expression()?;
		let Some((value_ty, literal)) = Self::fold_constant(&value) else {
			return Err(diagnostic(pos, ConstantRequired));
		};
		if !value_ty.widens_to(&ty) {
			return Err(diagnostic(
				pos,
				TypeMismatch { expected: ty.to_string(), found: value_ty.to_string() },
			));
		}
		self.expect_separator(Separator::Semicolon)?;
		self.context.declare_constant(ConstantData { name, ty, value: literal, pos })?;
		Ok(())
	}

	fn fold_constant(expr: &Expr) -> Option<(ScriptType, LiteralValue)> {
		match expr {
			Expr::Literal(lit) => Some((lit.ty(), lit.clone())),
			Expr::Constant { ty, value } => Some((ty.clone(), value.clone())),
			Expr::Unary { op: UnaryOp::Negate, operand, .. } => {
				let (ty, lit) = Self::fold_constant(operand)?;
				let negated = match lit {
					LiteralValue::Int(v) => LiteralValue::Int(-v),
					LiteralValue::Long(v) => LiteralValue::Long(-v),
					LiteralValue::Float(v) => LiteralValue::Float(-v),
					LiteralValue::Double(v) => LiteralValue::Double(-v),
					LiteralValue::Decimal(v) => LiteralValue::Decimal(-v),
					_ => return None,
				};
				Some((ty, negated))
			}
			_ => None,
		}
	}

	// -- statements -----------------------------------------------------------

	/// Statements until the closing brace of an already-opened block.
	fn block_body(&mut self) -> Result<Vec<Stmt>, CompileError> {
		let mut stmts = Vec::new();
		loop {
			if self.match_separator(Separator::RightBrace)? {
				return Ok(stmts);
			}
			if matches!(self.peek()?.kind, TokenKind::Eof) {
				let pos = self.peek()?.pos;
				return Err(diagnostic(
					pos,
					ExpectedToken { expected: "'}'".into(), found: "end of input".into() },
				));
			}
			stmts.push(self.statement()?);
		}
	}

	/// A single statement or braced block, in its own scope.
	fn scoped_body(&mut self, flow: BlockFlow) -> Result<Vec<Stmt>, CompileError> {
		self.context.push_block(flow);
		let body = if self.match_separator(Separator::LeftBrace)? {
			self.block_body()?
		} else {
			vec![self.statement()?]
		};
		self.context.pop_scope()?;
		Ok(body)
	}

	fn statement(&mut self) -> Result<Stmt, CompileError> {
		let pos = self.peek()?.pos;
		let kind = self.peek()?.kind.clone();
		match kind {
			TokenKind::Keyword(Keyword::If) => self.if_statement(),
			TokenKind::Keyword(Keyword::While) => self.while_statement(),
			TokenKind::Keyword(Keyword::For) => self.for_statement(),
			TokenKind::Keyword(Keyword::Foreach) => self.foreach_statement(),
			TokenKind::Keyword(Keyword::Switch) => self.switch_statement(),
			TokenKind::Keyword(Keyword::Return) => self.return_statement(),
			TokenKind::Keyword(Keyword::Break) => {
				self.advance()?;
				self.expect_separator(Separator::Semicolon)?;
				if !self.context.in_breakable() {
					return Err(diagnostic(pos, BreakOutsideLoop));
				}
				Ok(Stmt::Break)
			}
			TokenKind::Keyword(Keyword::Continue) => {
				self.advance()?;
				self.expect_separator(Separator::Semicolon)?;
				if !self.context.in_loop() {
					return Err(diagnostic(pos, ContinueOutsideLoop));
				}
				Ok(Stmt::Continue)
			}
			TokenKind::Keyword(Keyword::Const) => {
				self.advance()?;
				self.const_decl()?;
				Ok(Stmt::Empty)
			}
			TokenKind::Keyword(Keyword::Function | Keyword::Extern | Keyword::Global) => {
				Err(diagnostic(pos, UnexpectedToken("declaration outside the script root".into())))
			}
			TokenKind::Separator(Separator::LeftBrace) => {
				self.advance()?;
				self.context.push_block(BlockFlow::Plain);
				let body = self.block_body()?;
				self.context.pop_scope()?;
				Ok(Stmt::Block(body))
			}
			TokenKind::Separator(Separator::Semicolon) => {
				self.advance()?;
				Ok(Stmt::Empty)
			}
			TokenKind::Type(_) => {
				if matches!(self.peek_at(1)?.kind, TokenKind::Identifier { .. }) {
					self.var_decl()
				} else {
					self.expression_statement()
				}
			}
			_ => self.expression_statement(),
		}
	}

	fn var_decl(&mut self) -> Result<Stmt, CompileError> {
		let ty = self.parse_type()?;
		let (name, pos) = self.expect_identifier()?;
		let initializer = if self.match_operator(Operator::Assign)? {
			let value = self.expression()?;
			Some(self.coerce(value, &ty, pos)?)
		} else {
			None
		};
		self.expect_separator(Separator::Semicolon)?;
		self.context.declare_variable(&name, ty.clone(), false, pos)?;
		Ok(Stmt::VarDecl { name, ty, initializer })
	}

	fn expression_statement(&mut self) -> Result<Stmt, CompileError> {
		let expr = self.expression()?;
		self.expect_separator(Separator::Semicolon)?;
		Ok(Stmt::Expr(expr))
	}

	fn condition(&mut self) -> Result<Expr, CompileError> {
		self.expect_separator(Separator::LeftParen)?;
		let pos = self.peek()?.pos;
		let expr = self.expression()?;
		if expr.ty() != ScriptType::Bool {
			return Err(diagnostic(pos, ConditionNotBool(expr.ty().to_string())));
		}
		self.expect_separator(Separator::RightParen)?;
		Ok(expr)
	}

	fn if_statement(&mut self) -> Result<Stmt, CompileError> {
		self.advance()?;
		let mut branches = Vec::new();
		let condition = self.condition()?;
		branches.push((condition, self.scoped_body(BlockFlow::Plain)?));
		loop {
			if self.match_keyword(Keyword::ElseIf)? {
				let condition = self.condition()?;
				branches.push((condition, self.scoped_body(BlockFlow::Plain)?));
				continue;
			}
			if self.match_keyword(Keyword::Else)? {
				let else_branch = Some(self.scoped_body(BlockFlow::Plain)?);
				return Ok(Stmt::If { branches, else_branch });
			}
			return Ok(Stmt::If { branches, else_branch: None });
		}
	}

	fn while_statement(&mut self) -> Result<Stmt, CompileError> {
		self.advance()?;
		let condition = self.condition()?;
		let body = self.scoped_body(BlockFlow::Loop)?;
		Ok(Stmt::While { condition, body })
	}

	fn for_statement(&mut self) -> Result<Stmt, CompileError> {
		self.advance()?;
		self.expect_separator(Separator::LeftParen)?;
		self.context.push_block(BlockFlow::Loop);

		let initializer = if self.match_separator(Separator::Semicolon)? {
			None
		} else if matches!(self.peek()?.kind, TokenKind::Type(_))
			&& matches!(self.peek_at(1)?.kind, TokenKind::Identifier { .. })
		{
			Some(Box::new(self.var_decl()?))
		} else {
			let expr = self.expression()?;
			self.expect_separator(Separator::Semicolon)?;
			Some(Box::new(Stmt::Expr(expr)))
		};

		let condition = if matches!(self.peek()?.kind, TokenKind::Separator(Separator::Semicolon)) {
			None
		} else {
			let pos = self.peek()?.pos;
			let expr = self.expression()?;
			if expr.ty() != ScriptType::Bool {
				return Err(diagnostic(pos, ConditionNotBool(expr.ty().to_string())));
			}
			Some(expr)
		};
		self.expect_separator(Separator::Semicolon)?;

		let increment = if matches!(self.peek()?.kind, TokenKind::Separator(Separator::RightParen)) {
			None
		} else {
			Some(Box::new(Stmt::Expr(self.expression()?)))
		};
		self.expect_separator(Separator::RightParen)?;

		let body = if self.match_separator(Separator::LeftBrace)? {
			self.block_body()?
		} else {
			vec![self.statement()?]
		};
		self.context.pop_scope()?;
		Ok(Stmt::For { initializer, condition, increment, body })
	}

	fn foreach_statement(&mut self) -> Result<Stmt, CompileError> {
		self.advance()?;
		self.expect_separator(Separator::LeftParen)?;
		let elem_ty = self.parse_type()?;
		let (name, pos) = self.expect_identifier()?;
		self.expect_keyword(Keyword::In)?;
		let iterable = self.expression()?;
		let ScriptType::Array(actual) = iterable.ty() else {
			return Err(diagnostic(pos, NotIndexable(iterable.ty().to_string())));
		};
		if !actual.widens_to(&elem_ty) {
			return Err(diagnostic(
				pos,
				TypeMismatch { expected: elem_ty.to_string(), found: actual.to_string() },
			));
		}
		self.expect_separator(Separator::RightParen)?;

		self.context.push_block(BlockFlow::Loop);
		self.context.declare_variable(&name, elem_ty.clone(), false, pos)?;
		let body = if self.match_separator(Separator::LeftBrace)? {
			self.block_body()?
		} else {
			vec![self.statement()?]
		};
		self.context.pop_scope()?;
		Ok(Stmt::Foreach { variable: name, elem_ty, iterable, body })
	}

	fn switch_statement(&mut self) -> Result<Stmt, CompileError> {
		self.advance()?;
		self.expect_separator(Separator::LeftParen)?;
		let pos = self.peek()?.pos;
		let scrutinee = self.expression()?;
		let scrutinee_ty = scrutinee.ty();
		let switchable = scrutinee_ty.is_integral()
			|| matches!(
				scrutinee_ty,
				ScriptType::Char | ScriptType::Str | ScriptType::Bool | ScriptType::Enum { .. }
			);
		if !switchable {
			return Err(diagnostic(
				pos,
				TypeMismatch { expected: "a switchable type".into(), found: scrutinee_ty.to_string() },
			));
		}
		self.expect_separator(Separator::RightParen)?;
		self.expect_separator(Separator::LeftBrace)?;

		let mut cases = Vec::new();
		let mut default = None;
		loop {
			if self.match_keyword(Keyword::Case)? {
				let label_pos = self.peek()?.pos;
				let label_expr = self.expression()?;
				let Some((label_ty, label)) = Self::fold_constant(&label_expr) else {
					return Err(diagnostic(label_pos, ConstantRequired));
				};
				if !label_ty.widens_to(&scrutinee_ty) {
					return Err(diagnostic(
						label_pos,
						TypeMismatch { expected: scrutinee_ty.to_string(), found: label_ty.to_string() },
					));
				}
				self.expect_separator(Separator::Colon)?;
				let body = self.case_body()?;
				cases.push(SwitchCase { ty: label_ty, label, body });
				continue;
			}
			if self.match_keyword(Keyword::Default)? {
				self.expect_separator(Separator::Colon)?;
				default = Some(self.case_body()?);
				continue;
			}
			self.expect_separator(Separator::RightBrace)?;
			break;
		}
		Ok(Stmt::Switch { scrutinee, cases, default })
	}

	/// Statements of one case arm, up to the next label or closing brace.
	fn case_body(&mut self) -> Result<Vec<Stmt>, CompileError> {
		self.context.push_block(BlockFlow::Switch);
		let mut body = Vec::new();
		loop {
			let done = matches!(
				self.peek()?.kind,
				TokenKind::Keyword(Keyword::Case | Keyword::Default)
					| TokenKind::Separator(Separator::RightBrace)
			);
			if done {
				break;
			}
			body.push(self.statement()?);
		}
		self.context.pop_scope()?;
		Ok(body)
	}

	fn return_statement(&mut self) -> Result<Stmt, CompileError> {
		let pos = self.advance()?.pos;
		let expected = self.context.return_type()?;
		let value = if matches!(self.peek()?.kind, TokenKind::Separator(Separator::Semicolon)) {
			None
		} else {
			Some(self.expression()?)
		};
		self.expect_separator(Separator::Semicolon)?;
		match value {
			None if expected == ScriptType::Void => Ok(Stmt::Return(None)),
			None => Err(diagnostic(
				pos,
				ReturnTypeMismatch { expected: expected.to_string(), found: "void".into() },
			)),
			Some(expr) if expected == ScriptType::Void => Err(diagnostic(
				pos,
				ReturnTypeMismatch { expected: "void".into(), found: expr.ty().to_string() },
			)),
			Some(expr) => {
				let found = expr.ty();
				let coerced = self.coerce(expr, &expected, pos).map_err(|_| {
					diagnostic(
						pos,
						ReturnTypeMismatch { expected: expected.to_string(), found: found.to_string() },
					)
				})?;
				Ok(Stmt::Return(Some(coerced)))
			}
		}
	}

	// -- expressions ----------------------------------------------------------

	fn expression(&mut self) -> Result<Expr, CompileError> { self.assignment() }

	fn assignment(&mut self) -> Result<Expr, CompileError> {
		let expr = self.ternary()?;
		let peeked = self.peek()?;
		let (op, pos) = match peeked.kind {
			TokenKind::Operator(op) if op.is_assignment() => (op, peeked.pos),
			_ => return Ok(expr),
		};
		self.advance()?;
		let target = self.to_target(expr, pos)?;
		let value = self.assignment()?;

		let Some(base) = op.compound_base() else {
			let value = self.coerce(value, &target.ty(), pos)?;
			return Ok(Expr::Assign { target, op: None, value: Box::new(value) });
		};
		let Some(binary) = Self::binary_of(base) else {
			return Err(anyhow!("compound assignment without a binary base operator").into());
		};
		let target_ty = target.ty();
		if target_ty == ScriptType::Str && binary == BinaryOp::Add {
			if value.ty() == ScriptType::Void {
				return Err(diagnostic(pos, VoidValue));
			}
			return Ok(Expr::Assign { target, op: Some(binary), value: Box::new(value) });
		}
		let value = match binary {
			BinaryOp::Shl | BinaryOp::Shr => {
				if !target_ty.is_integral() {
					return Err(diagnostic(
						pos,
						InvalidOperands {
							operator: op.symbol().to_string(),
							left:     target_ty.to_string(),
							right:    value.ty().to_string(),
						},
					));
				}
				self.coerce(value, &ScriptType::Int, pos)?
			}
			_ => {
				let value_ty = value.ty();
				let common = ScriptType::promote(&target_ty, &value_ty).ok_or_else(|| {
					diagnostic(
						pos,
						InvalidOperands {
							operator: op.symbol().to_string(),
							left:     target_ty.to_string(),
							right:    value_ty.to_string(),
						},
					)
				})?;
				if common != target_ty {
					return Err(diagnostic(
						pos,
						TypeMismatch { expected: target_ty.to_string(), found: common.to_string() },
					));
				}
				self.coerce(value, &target_ty, pos)?
			}
		};
		Ok(Expr::Assign { target, op: Some(binary), value: Box::new(value) })
	}

	fn binary_of(op: Operator) -> Option<BinaryOp> {
		use Operator::*;
		Some(match op {
			Plus => BinaryOp::Add,
			Minus => BinaryOp::Sub,
			Star => BinaryOp::Mul,
			Slash => BinaryOp::Div,
			Percent => BinaryOp::Rem,
			BitAnd => BinaryOp::BitAnd,
			BitOr => BinaryOp::BitOr,
			BitXor => BinaryOp::BitXor,
			Shl => BinaryOp::Shl,
			Shr => BinaryOp::Shr,
			_ => return None,
		})
	}

	fn to_target(&mut self, expr: Expr, pos: SourcePos) -> Result<Target, CompileError> {
		match expr {
			Expr::Variable { name, ty } => {
				if let IdentifierKind::Variable(var) = self.context.resolve_identifier(&name) {
					if var.readonly {
						return Err(diagnostic(pos, NotAssignable(format!("read-only parameter '{name}'"))));
					}
				}
				Ok(Target::Variable { name, ty })
			}
			Expr::Index { array, index, ty } => Ok(Target::Index { array, index, ty }),
			Expr::PropertyGet { property, receiver, ty } => {
				if property.set.is_none() {
					return Err(diagnostic(
						pos,
						NotAssignable(format!("read-only property '{}'", property.name)),
					));
				}
				Ok(Target::Property { property, receiver, ty })
			}
			Expr::Constant { .. } => Err(diagnostic(pos, NotAssignable("a constant".into()))),
			_ => Err(diagnostic(pos, NotAssignable("this expression".into()))),
		}
	}

	fn ternary(&mut self) -> Result<Expr, CompileError> {
		let condition = self.null_coalesce()?;
		if !self.match_operator(Operator::Question)? {
			return Ok(condition);
		}
		let pos = self.peek()?.pos;
		if condition.ty() != ScriptType::Bool {
			return Err(diagnostic(pos, ConditionNotBool(condition.ty().to_string())));
		}
		let then_branch = self.expression()?;
		self.expect_separator(Separator::Colon)?;
		let else_branch = self.ternary()?;

		let then_ty = then_branch.ty();
		let else_ty = else_branch.ty();
		let (then_branch, else_branch, ty) = if then_ty == else_ty {
			(then_branch, else_branch, then_ty)
		} else if then_ty.widens_to(&else_ty) {
			(self.coerce(then_branch, &else_ty, pos)?, else_branch, else_ty)
		} else if else_ty.widens_to(&then_ty) {
			let else_branch = self.coerce(else_branch, &then_ty, pos)?;
			(then_branch, else_branch, then_ty)
		} else {
			return Err(diagnostic(
				pos,
				TypeMismatch { expected: then_ty.to_string(), found: else_ty.to_string() },
			));
		};
		Ok(Expr::Ternary {
			condition:   Box::new(condition),
			then_branch: Box::new(then_branch),
			else_branch: Box::new(else_branch),
			ty,
		})
	}

	fn null_coalesce(&mut self) -> Result<Expr, CompileError> {
		let left = self.logical_or()?;
		if !self.match_operator(Operator::NullCoalesce)? {
			return Ok(left);
		}
		let pos = self.peek()?.pos;
		let left_ty = left.ty();
		if !left_ty.is_reference() && left_ty != ScriptType::Null {
			return Err(diagnostic(
				pos,
				InvalidOperands {
					operator: "??".into(),
					left:     left_ty.to_string(),
					right:    "_".into(),
				},
			));
		}
		let right = self.null_coalesce()?;
		let ty = if left_ty == ScriptType::Null { right.ty() } else { left_ty };
		let right = self.coerce(right, &ty, pos)?;
		Ok(Expr::NullCoalesce { left: Box::new(left), right: Box::new(right), ty })
	}

	fn logical_or(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.logical_and()?;
		while self.match_operator(Operator::OrOr)? {
			let pos = self.peek()?.pos;
			let right = self.logical_and()?;
			expr = self.make_logical(false, expr, right, pos)?;
		}
		Ok(expr)
	}

	fn logical_and(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.bit_or()?;
		while self.match_operator(Operator::AndAnd)? {
			let pos = self.peek()?.pos;
			let right = self.bit_or()?;
			expr = self.make_logical(true, expr, right, pos)?;
		}
		Ok(expr)
	}

	fn make_logical(&self, and: bool, left: Expr, right: Expr, pos: SourcePos) -> Result<Expr, CompileError> {
		let operator = if and { "&&" } else { "||" };
		if left.ty() != ScriptType::Bool || right.ty() != ScriptType::Bool {
			return Err(diagnostic(
				pos,
				InvalidOperands {
					operator: operator.into(),
					left:     left.ty().to_string(),
					right:    right.ty().to_string(),
				},
			));
		}
		Ok(Expr::Logical { and, left: Box::new(left), right: Box::new(right) })
	}

	fn bit_or(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.bit_xor()?;
		while self.match_operator(Operator::BitOr)? {
			let pos = self.peek()?.pos;
			let right = self.bit_xor()?;
			expr = self.make_binary(BinaryOp::BitOr, expr, right, pos)?;
		}
		Ok(expr)
	}

	fn bit_xor(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.bit_and()?;
		while self.match_operator(Operator::BitXor)? {
			let pos = self.peek()?.pos;
			let right = self.bit_and()?;
			expr = self.make_binary(BinaryOp::BitXor, expr, right, pos)?;
		}
		Ok(expr)
	}

	fn bit_and(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.equality()?;
		while self.match_operator(Operator::BitAnd)? {
			let pos = self.peek()?.pos;
			let right = self.equality()?;
			expr = self.make_binary(BinaryOp::BitAnd, expr, right, pos)?;
		}
		Ok(expr)
	}

	fn equality(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.relational()?;
		loop {
			let op = if self.match_operator(Operator::Equal)? {
				BinaryOp::Eq
			} else if self.match_operator(Operator::NotEqual)? {
				BinaryOp::Ne
			} else {
				return Ok(expr);
			};
			let pos = self.peek()?.pos;
			let right = self.relational()?;
			expr = self.make_binary(op, expr, right, pos)?;
		}
	}

	fn relational(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.shift()?;
		loop {
			let op = if self.match_operator(Operator::Less)? {
				BinaryOp::Lt
			} else if self.match_operator(Operator::LessEqual)? {
				BinaryOp::Le
			} else if self.match_operator(Operator::Greater)? {
				BinaryOp::Gt
			} else if self.match_operator(Operator::GreaterEqual)? {
				BinaryOp::Ge
			} else {
				return Ok(expr);
			};
			let pos = self.peek()?.pos;
			let right = self.shift()?;
			expr = self.make_binary(op, expr, right, pos)?;
		}
	}

	fn shift(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.additive()?;
		loop {
			let op = if self.match_operator(Operator::Shl)? {
				BinaryOp::Shl
			} else if self.match_operator(Operator::Shr)? {
				BinaryOp::Shr
			} else {
				return Ok(expr);
			};
			let pos = self.peek()?.pos;
			let right = self.additive()?;
			expr = self.make_binary(op, expr, right, pos)?;
		}
	}

	fn additive(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.multiplicative()?;
		loop {
			let op = if self.match_operator(Operator::Plus)? {
				BinaryOp::Add
			} else if self.match_operator(Operator::Minus)? {
				BinaryOp::Sub
			} else {
				return Ok(expr);
			};
			let pos = self.peek()?.pos;
			let right = self.multiplicative()?;
			expr = self.make_binary(op, expr, right, pos)?;
		}
	}

	fn multiplicative(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.unary()?;
		loop {
			let op = if self.match_operator(Operator::Star)? {
				BinaryOp::Mul
			} else if self.match_operator(Operator::Slash)? {
				BinaryOp::Div
			} else if self.match_operator(Operator::Percent)? {
				BinaryOp::Rem
			} else {
				return Ok(expr);
			};
			let pos = self.peek()?.pos;
			let right = self.unary()?;
			expr = self.make_binary(op, expr, right, pos)?;
		}
	}

	/// The one central operand/operator compatibility check.
	fn make_binary(&self, op: BinaryOp, left: Expr, right: Expr, pos: SourcePos) -> Result<Expr, CompileError> {
		use BinaryOp::*;
		let left_ty = left.ty();
		let right_ty = right.ty();
		let invalid = || {
			diagnostic(
				pos,
				InvalidOperands {
					operator: op.symbol().to_string(),
					left:     left_ty.to_string(),
					right:    right_ty.to_string(),
				},
			)
		};
		match op {
			Add if left_ty == ScriptType::Str || right_ty == ScriptType::Str => {
				if left_ty == ScriptType::Void || right_ty == ScriptType::Void {
					return Err(diagnostic(pos, VoidValue));
				}
				Ok(Expr::StringConcat { left: Box::new(left), right: Box::new(right) })
			}
			Add | Sub | Mul | Div | Rem => {
				let common = ScriptType::promote(&left_ty, &right_ty).ok_or_else(invalid)?;
				let left = self.coerce(left, &common, pos)?;
				let right = self.coerce(right, &common, pos)?;
				Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty: common })
			}
			Eq | Ne => {
				if let Some(common) = ScriptType::promote(&left_ty, &right_ty) {
					let left = self.coerce(left, &common, pos)?;
					let right = self.coerce(right, &common, pos)?;
					return Ok(Expr::Binary {
						op,
						left: Box::new(left),
						right: Box::new(right),
						ty: ScriptType::Bool,
					});
				}
				let comparable = left_ty == right_ty
					|| (left_ty == ScriptType::Null && right_ty.is_reference())
					|| (right_ty == ScriptType::Null && left_ty.is_reference());
				if !comparable || left_ty == ScriptType::Void {
					return Err(invalid());
				}
				Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty: ScriptType::Bool })
			}
			Lt | Le | Gt | Ge => {
				if let Some(common) = ScriptType::promote(&left_ty, &right_ty) {
					let left = self.coerce(left, &common, pos)?;
					let right = self.coerce(right, &common, pos)?;
					return Ok(Expr::Binary {
						op,
						left: Box::new(left),
						right: Box::new(right),
						ty: ScriptType::Bool,
					});
				}
				if left_ty == right_ty && matches!(left_ty, ScriptType::Str | ScriptType::Char) {
					return Ok(Expr::Binary {
						op,
						left: Box::new(left),
						right: Box::new(right),
						ty: ScriptType::Bool,
					});
				}
				Err(invalid())
			}
			BitAnd | BitOr | BitXor => {
				if !left_ty.is_integral() || !right_ty.is_integral() {
					return Err(invalid());
				}
				let common = ScriptType::promote(&left_ty, &right_ty).ok_or_else(invalid)?;
				let left = self.coerce(left, &common, pos)?;
				let right = self.coerce(right, &common, pos)?;
				Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty: common })
			}
			Shl | Shr => {
				if !left_ty.is_integral() {
					return Err(invalid());
				}
				let right = self.coerce(right, &ScriptType::Int, pos).map_err(|_| invalid())?;
				Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty: left_ty })
			}
		}
	}

	fn unary(&mut self) -> Result<Expr, CompileError> {
		let pos = self.peek()?.pos;
		let kind = self.peek()?.kind.clone();
		match kind {
			TokenKind::Operator(Operator::Negate) => {
				self.advance()?;
				let operand = self.unary()?;
				let ty = operand.ty();
				let (operand, ty) = match ty {
					ScriptType::Int
					| ScriptType::Long
					| ScriptType::Float
					| ScriptType::Double
					| ScriptType::Decimal => (operand, ty),
					ScriptType::Uint => (self.coerce(operand, &ScriptType::Long, pos)?, ScriptType::Long),
					_ => {
						return Err(diagnostic(
							pos,
							InvalidUnaryOperand { operator: "-".into(), operand: ty.to_string() },
						));
					}
				};
				Ok(Expr::Unary { op: UnaryOp::Negate, operand: Box::new(operand), ty })
			}
			TokenKind::Operator(Operator::Not) => {
				self.advance()?;
				let operand = self.unary()?;
				if operand.ty() != ScriptType::Bool {
					return Err(diagnostic(
						pos,
						InvalidUnaryOperand { operator: "!".into(), operand: operand.ty().to_string() },
					));
				}
				Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand), ty: ScriptType::Bool })
			}
			TokenKind::Operator(Operator::BitNot) => {
				self.advance()?;
				let operand = self.unary()?;
				let ty = operand.ty();
				if !ty.is_integral() {
					return Err(diagnostic(
						pos,
						InvalidUnaryOperand { operator: "~".into(), operand: ty.to_string() },
					));
				}
				Ok(Expr::Unary { op: UnaryOp::BitNot, operand: Box::new(operand), ty })
			}
			TokenKind::Operator(op @ (Operator::Increment | Operator::Decrement)) => {
				self.advance()?;
				let operand = self.unary()?;
				let target = self.to_target(operand, pos)?;
				if !target.ty().is_numeric() {
					return Err(diagnostic(
						pos,
						InvalidUnaryOperand { operator: op.symbol().into(), operand: target.ty().to_string() },
					));
				}
				Ok(Expr::IncrDecr { target, increment: op == Operator::Increment, postfix: false })
			}
			TokenKind::Cast(_) => {
				let token = self.advance()?;
				let TokenKind::Cast(ty) = token.kind else {
					return Err(anyhow!("cast token changed kind between peek and advance").into());
				};
				let operand = self.unary()?;
				if !operand.ty().casts_to(&ty) {
					return Err(diagnostic(
						pos,
						InvalidCast { from: operand.ty().to_string(), to: ty.to_string() },
					));
				}
				Ok(Expr::Cast { ty, operand: Box::new(operand) })
			}
			_ => self.postfix(),
		}
	}

	fn postfix(&mut self) -> Result<Expr, CompileError> {
		let mut expr = self.primary()?;
		loop {
			let pos = self.peek()?.pos;
			let kind = self.peek()?.kind.clone();
			match kind {
				TokenKind::Operator(Operator::Dot) => {
					self.advance()?;
					expr = self.member_access(expr)?;
				}
				TokenKind::Separator(Separator::LeftBracket) => {
					self.advance()?;
					let index = self.expression()?;
					let index = self.coerce(index, &ScriptType::Int, pos)?;
					self.expect_separator(Separator::RightBracket)?;
					let ScriptType::Array(elem) = expr.ty() else {
						return Err(diagnostic(pos, NotIndexable(expr.ty().to_string())));
					};
					expr = Expr::Index { array: Box::new(expr), index: Box::new(index), ty: *elem };
				}
				TokenKind::Operator(op @ (Operator::Increment | Operator::Decrement)) => {
					self.advance()?;
					let target = self.to_target(expr, pos)?;
					if !target.ty().is_numeric() {
						return Err(diagnostic(
							pos,
							InvalidUnaryOperand {
								operator: op.symbol().into(),
								operand:  target.ty().to_string(),
							},
						));
					}
					expr = Expr::IncrDecr { target, increment: op == Operator::Increment, postfix: true };
				}
				_ => return Ok(expr),
			}
		}
	}

	/// Instance member access after a consumed `.`.
	fn member_access(&mut self, receiver: Expr) -> Result<Expr, CompileError> {
		let token = self.advance()?;
		let pos = token.pos;
		let name = Self::member_name(token)?;
		let receiver_ty = receiver.ty();

		if self.match_separator(Separator::LeftParen)? {
			let (args, infos) = self.argument_list()?;
			let exprs = Self::value_args(args, pos)?;
			let resolved = self
				.registry
				.resolve_instance_method(&receiver_ty, &name, &infos)
				.map_err(|e| Self::resolve_failure(e, &receiver_ty.to_string(), &name, &infos, pos))?;
			let args = self.bind_value_args(&resolved.params, exprs, pos)?;
			return Ok(Expr::HostCall {
				method:   resolved.binding,
				receiver: Some(Box::new(receiver)),
				args,
				ty:       resolved.return_type,
			});
		}

		if name == "length" && matches!(receiver_ty, ScriptType::Array(_) | ScriptType::Str) {
			return Ok(Expr::Length { operand: Box::new(receiver) });
		}
		let Some(property) = self.registry.resolve_instance_member(&receiver_ty, &name) else {
			return Err(diagnostic(
				pos,
				UnknownMember { type_name: receiver_ty.to_string(), member: name },
			));
		};
		if property.binding.get.is_none() {
			return Err(diagnostic(pos, NotReadable(format!("property '{name}'"))));
		}
		Ok(Expr::PropertyGet {
			property: property.binding,
			receiver: Some(Box::new(receiver)),
			ty:       property.ty,
		})
	}

	/// Static member access after a type token and a consumed `.`.
	fn static_access(&mut self, ty: ScriptType) -> Result<Expr, CompileError> {
		let token = self.advance()?;
		let member_pos = token.pos;
		let name = Self::member_name(token)?;

		if self.match_separator(Separator::LeftParen)? {
			let (args, infos) = self.argument_list()?;
			let exprs = Self::value_args(args, member_pos)?;
			let resolved = self
				.registry
				.resolve_static_method(&ty, &name, &infos)
				.map_err(|e| Self::resolve_failure(e, &ty.to_string(), &name, &infos, member_pos))?;
			let args = self.bind_value_args(&resolved.params, exprs, member_pos)?;
			return Ok(Expr::HostCall {
				method: resolved.binding,
				receiver: None,
				args,
				ty: resolved.return_type,
			});
		}

		match self.registry.resolve_static_member(&ty, &name) {
			Some(StaticMember::Constant { ty, value }) => Ok(Expr::Constant { ty, value }),
			Some(StaticMember::Property(property)) => {
				if property.binding.get.is_none() {
					return Err(diagnostic(member_pos, NotReadable(format!("property '{name}'"))));
				}
				Ok(Expr::PropertyGet { property: property.binding, receiver: None, ty: property.ty })
			}
			None => {
				Err(diagnostic(member_pos, UnknownMember { type_name: ty.to_string(), member: name }))
			}
		}
	}

	fn member_name(token: Token) -> Result<String, CompileError> {
		match token.kind {
			TokenKind::Identifier { name, generic_args } if generic_args.is_empty() => Ok(name),
			TokenKind::Identifier { .. } => Err(diagnostic(token.pos, UnexpectedGenericArguments)),
			// a member may share its name with a registered type
			TokenKind::Type(
				ScriptType::Host { name, .. } | ScriptType::Enum { name, .. } | ScriptType::Generic { name, .. },
			) => Ok(name.to_string()),
			_ => Err(diagnostic(
				token.pos,
				ExpectedToken { expected: "a member name".into(), found: token.describe() },
			)),
		}
	}

	fn primary(&mut self) -> Result<Expr, CompileError> {
		let token = self.advance()?;
		let pos = token.pos;
		match token.kind {
			TokenKind::Literal(lit) => Ok(Expr::Literal(lit)),
			TokenKind::Identifier { name, generic_args } => {
				if matches!(self.peek()?.kind, TokenKind::Separator(Separator::LeftParen)) {
					return self.finish_call(name, generic_args, pos);
				}
				if !generic_args.is_empty() {
					return Err(diagnostic(pos, UnexpectedGenericArguments));
				}
				match self.context.resolve_identifier(&name) {
					IdentifierKind::Variable(var) => Ok(Expr::Variable { name, ty: var.ty.clone() }),
					IdentifierKind::Constant(c) => {
						Ok(Expr::Constant { ty: c.ty.clone(), value: c.value.clone() })
					}
					IdentifierKind::FunctionSet(_) => Err(diagnostic(pos, FunctionAsValue(name))),
					IdentifierKind::Unidentified => Err(diagnostic(pos, UnknownIdentifier(name))),
				}
			}
			TokenKind::Type(ty) => {
				self.expect_operator(Operator::Dot)?;
				self.static_access(ty)
			}
			TokenKind::Separator(Separator::LeftParen) => {
				let expr = self.expression()?;
				self.expect_separator(Separator::RightParen)?;
				Ok(expr)
			}
			TokenKind::Keyword(Keyword::New) => self.new_expression(pos),
			_ => Err(diagnostic(pos, UnexpectedToken(Token::new(token.kind, pos).describe()))),
		}
	}

	fn finish_call(
		&mut self,
		name: String,
		generic_args: Vec<ScriptType>,
		pos: SourcePos,
	) -> Result<Expr, CompileError> {
		self.expect_separator(Separator::LeftParen)?;
		let (args, infos) = self.argument_list()?;
		if !generic_args.is_empty() {
			return Err(diagnostic(pos, UnexpectedGenericArguments));
		}
		match self.context.resolve_identifier(&name) {
			IdentifierKind::FunctionSet(_) => {
				let signature = self
					.context
					.resolve_function(&name, &infos)
					.map_err(|e| Self::resolve_failure(e, "", &name, &infos, pos))?;
				let index = self
					.indices
					.iter()
					.find(|(sig, _)| Arc::ptr_eq(sig, &signature))
					.map(|(_, index)| *index)
					.ok_or_else(|| anyhow!("resolved signature has no body index"))?;
				let args = self.bind_args(&signature.params, args, pos)?;
				Ok(Expr::Call { index, signature, args })
			}
			// interpolation expands into `format(...)`; a user-declared
			// function of that name shadows the intrinsic
			IdentifierKind::Unidentified if name == "format" => {
				let exprs = Self::value_args(args, pos)?;
				let mut iter = exprs.into_iter();
				let Some(template) = iter.next() else {
					return Err(diagnostic(
						pos,
						NoMatchingOverload { name, arguments: String::new() },
					));
				};
				let template = self.coerce(template, &ScriptType::Str, pos)?;
				let rest: Vec<Expr> = iter.collect();
				if rest.iter().any(|arg| arg.ty() == ScriptType::Void) {
					return Err(diagnostic(pos, VoidValue));
				}
				Ok(Expr::Format { template: Box::new(template), args: rest })
			}
			IdentifierKind::Unidentified => Err(diagnostic(pos, UnknownIdentifier(name))),
			_ => Err(diagnostic(pos, NotCallable(name))),
		}
	}

	fn new_expression(&mut self, pos: SourcePos) -> Result<Expr, CompileError> {
		let token = self.advance()?;
		let TokenKind::Type(ty) = token.kind else {
			return Err(diagnostic(
				token.pos,
				ExpectedToken { expected: "a type".into(), found: token.describe() },
			));
		};
		if self.match_separator(Separator::LeftBracket)? {
			let len = self.expression()?;
			let len = self.coerce(len, &ScriptType::Int, pos)?;
			self.expect_separator(Separator::RightBracket)?;
			return Ok(Expr::NewArray { elem: ty, len: Box::new(len) });
		}
		self.expect_separator(Separator::LeftParen)?;
		let (args, infos) = self.argument_list()?;
		let exprs = Self::value_args(args, pos)?;
		let resolved = self.registry.resolve_constructor(&ty, &infos).map_err(|e| match e {
			ResolveError::UnknownMember => diagnostic(pos, NotConstructible(ty.to_string())),
			other => Self::resolve_failure(other, &ty.to_string(), "new", &infos, pos),
		})?;
		let args = self.bind_value_args(&resolved.params, exprs, pos)?;
		Ok(Expr::NewObject { constructor: resolved.binding, ty: resolved.return_type, args })
	}

	// -- call plumbing --------------------------------------------------------

	/// Arguments after the opening paren, through the closing one.
	fn argument_list(&mut self) -> Result<(Vec<CallArg>, Vec<ArgInfo>), CompileError> {
		let mut args = Vec::new();
		let mut infos = Vec::new();
		if self.match_separator(Separator::RightParen)? {
			return Ok((args, infos));
		}
		loop {
			if self.match_keyword(Keyword::Ref)? {
				let pos = self.peek()?.pos;
				let expr = self.expression()?;
				let target = self.to_target(expr, pos)?;
				infos.push(ArgInfo { ty: target.ty(), mode: ArgMode::Ref });
				args.push(CallArg::Ref(target));
			} else if self.match_keyword(Keyword::Out)? {
				let pos = self.peek()?.pos;
				let expr = self.expression()?;
				let target = self.to_target(expr, pos)?;
				infos.push(ArgInfo { ty: target.ty(), mode: ArgMode::Out });
				args.push(CallArg::Out(target));
			} else {
				let pos = self.peek()?.pos;
				let expr = self.expression()?;
				if expr.ty() == ScriptType::Void {
					return Err(diagnostic(pos, VoidValue));
				}
				infos.push(ArgInfo::value(expr.ty()));
				args.push(CallArg::Value(expr));
			}
			if self.match_separator(Separator::Comma)? {
				continue;
			}
			self.expect_separator(Separator::RightParen)?;
			return Ok((args, infos));
		}
	}

	fn value_args(args: Vec<CallArg>, pos: SourcePos) -> Result<Vec<Expr>, CompileError> {
		args.into_iter()
			.map(|arg| match arg {
				CallArg::Value(expr) => Ok(expr),
				_ => Err(diagnostic(pos, UnexpectedToken("ref/out argument on a host member".into()))),
			})
			.collect()
	}

	/// Coerce by-value arguments to the selected overload's parameter types
	/// and pack a variadic tail.
	fn bind_value_args(
		&self,
		params: &[Parameter],
		args: Vec<Expr>,
		pos: SourcePos,
	) -> Result<Vec<Expr>, CompileError> {
		let variadic = params.last().is_some_and(|p| p.mode == PassMode::Variadic);
		let fixed = if variadic { params.len() - 1 } else { params.len() };
		let mut out = Vec::new();
		let mut iter = args.into_iter();
		for param in &params[..fixed] {
			let arg = iter.next().ok_or_else(|| anyhow!("argument count diverged after overload selection"))?;
			out.push(self.coerce(arg, &param.ty, pos)?);
		}
		if variadic {
			let tail = params.last().ok_or_else(|| anyhow!("variadic signature without parameters"))?;
			let ScriptType::Array(elem) = &tail.ty else {
				return Err(anyhow!("variadic parameter is not an array").into());
			};
			let rest: Vec<Expr> = iter.collect();
			let passthrough = rest.len() == 1 && rest[0].ty() == tail.ty;
			if passthrough {
				out.extend(rest);
			} else {
				let items = rest
					.into_iter()
					.map(|arg| self.coerce(arg, elem, pos))
					.collect::<Result<Vec<_>, _>>()?;
				out.push(Expr::ArgPack { elem: (**elem).clone(), items });
			}
		}
		Ok(out)
	}

	/// Like [`Parser::bind_value_args`], preserving ref/out arguments for
	/// script-function calls.
	fn bind_args(
		&self,
		params: &[Parameter],
		args: Vec<CallArg>,
		pos: SourcePos,
	) -> Result<Vec<CallArg>, CompileError> {
		let variadic = params.last().is_some_and(|p| p.mode == PassMode::Variadic);
		let fixed = if variadic { params.len() - 1 } else { params.len() };
		let mut out = Vec::new();
		let mut iter = args.into_iter();
		for param in &params[..fixed] {
			let arg = iter.next().ok_or_else(|| anyhow!("argument count diverged after overload selection"))?;
			match arg {
				CallArg::Value(expr) => out.push(CallArg::Value(self.coerce(expr, &param.ty, pos)?)),
				passthrough => out.push(passthrough),
			}
		}
		if variadic {
			let tail = params.last().ok_or_else(|| anyhow!("variadic signature without parameters"))?;
			let ScriptType::Array(elem) = &tail.ty else {
				return Err(anyhow!("variadic parameter is not an array").into());
			};
			let rest = Self::value_args(iter.collect(), pos)?;
			let passthrough = rest.len() == 1 && rest[0].ty() == tail.ty;
			if passthrough {
				out.extend(rest.into_iter().map(CallArg::Value));
			} else {
				let items = rest
					.into_iter()
					.map(|arg| self.coerce(arg, elem, pos))
					.collect::<Result<Vec<_>, _>>()?;
				out.push(CallArg::Value(Expr::ArgPack { elem: (**elem).clone(), items }));
			}
		}
		Ok(out)
	}

	fn resolve_failure(
		error: ResolveError,
		type_name: &str,
		member: &str,
		infos: &[ArgInfo],
		pos: SourcePos,
	) -> CompileError {
		let qualified = if type_name.is_empty() {
			member.to_string()
		} else {
			format!("{type_name}.{member}")
		};
		match error {
			ResolveError::UnknownMember => diagnostic(
				pos,
				UnknownMember { type_name: type_name.to_string(), member: member.to_string() },
			),
			ResolveError::NoOverload => diagnostic(
				pos,
				NoMatchingOverload {
					name:      qualified,
					arguments: infos.iter().map(|a| a.ty.to_string()).collect::<Vec<_>>().join(", "),
				},
			),
			ResolveError::Ambiguous(candidates) => {
				diagnostic(pos, AmbiguousOverload { name: qualified, candidates })
			}
		}
	}

	/// Accept an expression where `target` is expected, inserting an
	/// implicit widening cast when the types allow it.
	fn coerce(&self, expr: Expr, target: &ScriptType, pos: SourcePos) -> Result<Expr, CompileError> {
		let ty = expr.ty();
		if ty == *target {
			return Ok(expr);
		}
		if ty.widens_to(target) {
			return Ok(Expr::Cast { ty: target.clone(), operand: Box::new(expr) });
		}
		Err(diagnostic(pos, TypeMismatch { expected: target.to_string(), found: ty.to_string() }))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::Lexer, stream::normalize};

	fn parse_with(
		source: &str,
		registry: &HostRegistry,
	) -> Result<(Vec<CompiledFunction>, Vec<GlobalDecl>), CompileError> {
		let lexer = Lexer::new(source, registry);
		let tokens = normalize(lexer);
		Parser::new(tokens, registry).parse()
	}

	fn parse_source(source: &str) -> Result<(Vec<CompiledFunction>, Vec<GlobalDecl>), CompileError> {
		let registry = HostRegistry::new();
		parse_with(source, &registry)
	}

	/// Wrap an expression in a function and render the compiled return
	/// value to pin down precedence and typing.
	fn render(expr_source: &str) -> String {
		let source = format!("function double f() {{ return {expr_source}; }}");
		let (functions, _) = parse_source(&source).unwrap();
		let Stmt::Return(Some(expr)) = &functions[0].body[0] else {
			panic!("expected return statement");
		};
		expr.to_string()
	}

	#[test]
	fn precedence_climbs() {
		assert_eq!(render("1.0 + 2.0 * 3.0"), "(+ 1 (* 2 3))");
		assert_eq!(render("(1.0 + 2.0) * 3.0"), "(* (+ 1 2) 3)");
		assert_eq!(render("1.0 - 2.0 - 3.0"), "(- (- 1 2) 3)");
	}

	#[test]
	fn implicit_widening_inserts_casts() {
		assert_eq!(render("1 + 2.0"), "(+ (cast double 1) 2)");
		assert_eq!(render("1.5"), "1.5");
	}

	#[test]
	fn unary_minus_from_normalizer() {
		assert_eq!(render("-5.0"), "(- 5)");
		assert_eq!(render("3.0 - 5.0"), "(- 3 5)");
	}

	#[test]
	fn incompatible_operands_fail_immediately() {
		assert!(parse_source("function void f() { bool b = true; double d = b + 1.0; }").is_err());
		assert!(parse_source("function void f() { int x = \"s\"; }").is_err());
		assert!(parse_source("function void f() { ulong u = 1UL; long l = 2L; return; u + l; }").is_err());
	}

	#[test]
	fn conditions_must_be_bool() {
		assert!(parse_source("function void f() { if (1) { } }").is_err());
		assert!(parse_source("function void f() { while (\"x\") { } }").is_err());
		assert!(parse_source("function void f() { if (1 < 2) { } }").is_ok());
	}

	#[test]
	fn declarations_and_scoping() {
		assert!(parse_source("function void f() { int x = 1; { double x = 2.0; } }").is_err());
		assert!(parse_source("function void f() { int x = 1; } function void g() { int x = 2; }").is_ok());
		assert!(parse_source("const int MAX = 10; function int f() { return MAX; }").is_ok());
		assert!(parse_source("const int MAX = 10; function void f() { int MAX = 2; }").is_err());
	}

	#[test]
	fn function_overloads_and_calls() {
		let source = r#"
			function int pick(int x) { return x; }
			function double pick(double x) { return x; }
			function double f() { return pick(1.5); }
		"#;
		let (functions, _) = parse_source(source).unwrap();
		let Stmt::Return(Some(Expr::Call { signature, .. })) = &functions[2].body[0] else {
			panic!("expected call");
		};
		assert_eq!(signature.params[0].ty, ScriptType::Double);
	}

	#[test]
	fn ambiguous_call_is_reported() {
		let source = r#"
			function void take(long x) { }
			function void take(double x) { }
			function void f() { take(1); }
		"#;
		let err = parse_source(source).unwrap_err();
		assert!(err.to_string().contains("ambiguous"));
	}

	#[test]
	fn break_and_continue_need_a_loop() {
		assert!(parse_source("function void f() { break; }").is_err());
		assert!(parse_source("function void f() { continue; }").is_err());
		assert!(parse_source("function void f() { while (true) { break; } }").is_ok());
		assert!(parse_source("function void f() { while (true) { if (true) { continue; } } }").is_ok());
	}

	#[test]
	fn return_type_is_checked() {
		assert!(parse_source("function int f() { return \"no\"; }").is_err());
		assert!(parse_source("function int f() { return; }").is_err());
		assert!(parse_source("function void f() { return 1; }").is_err());
		assert!(parse_source("function double f() { return 1; }").is_ok());
	}

	#[test]
	fn foreach_iterates_arrays_only() {
		assert!(parse_source("function void f(double[] xs) { foreach (double x in xs) { } }").is_ok());
		assert!(parse_source("function void f() { foreach (double x in 1.0) { } }").is_err());
	}

	#[test]
	fn switch_labels_are_constants() {
		let ok = r#"
			function int f(int x) {
				switch (x) {
					case 1: return 10;
					case -2: return 20;
					default: return 0;
				}
			}
		"#;
		assert!(parse_source(ok).is_ok());
		assert!(parse_source("function void f(int x) { switch (x) { case x: break; } }").is_err());
	}

	#[test]
	fn readonly_parameters_reject_assignment() {
		assert!(parse_source("function void f(in int x) { x = 1; }").is_err());
		assert!(parse_source("function void f(int x) { x = 1; }").is_ok());
	}

	#[test]
	fn globals_live_at_script_root() {
		assert!(parse_source("global double gain = 0.5; function double f() { return gain; }").is_ok());
		assert!(parse_source("function void f() { global int x; }").is_err());
	}

	#[test]
	fn interpolation_becomes_format_node() {
		let source = r#"function string f(int x) { return $"x = {x}"; }"#;
		let (functions, _) = parse_source(source).unwrap();
		let Stmt::Return(Some(Expr::Format { args, .. })) = &functions[0].body[0] else {
			panic!("expected format node");
		};
		assert_eq!(args.len(), 1);
	}

	#[test]
	fn casts_compile_and_check() {
		assert!(parse_source("function int f(double d) { return (int)d; }").is_ok());
		assert!(parse_source("function int f(string s) { return (int)s; }").is_err());
	}

	#[test]
	fn ternary_unifies_branch_types() {
		assert_eq!(render("true ? 1 : 2.0"), "(? true : (cast double 1) 2)");
		assert!(parse_source("function void f() { bool b = true ? 1 : false; }").is_err());
	}

	#[test]
	fn compound_assignment_checks_storability() {
		assert!(parse_source("function void f() { int x = 1; x += 2; }").is_ok());
		assert!(parse_source("function void f() { int x = 1; x += 2.0; }").is_err());
		assert!(parse_source("function void f() { double x = 1.0; x += 2; }").is_ok());
	}

	#[test]
	fn arrays_index_and_measure() {
		assert!(parse_source("function int f(int[] xs) { return xs[0]; }").is_ok());
		assert!(parse_source("function int f(int[] xs) { return xs.length; }").is_ok());
		assert!(parse_source("function int f(int x) { return x[0]; }").is_err());
		assert!(parse_source("function int[] f() { return new int[4]; }").is_ok());
	}

	#[test]
	fn extern_marks_entry_points() {
		let (functions, _) =
			parse_source("extern function void main() { }").unwrap();
		assert!(functions[0].signature.is_extern);
	}
}

//! Tree-walking runtime evaluator.
//!
//! Walks the compiled tree against a per-invocation scope chain. Every
//! statement yields a flow-control signal; compound statements propagate a
//! non-nominal signal upward without executing later siblings, loops
//! intercept break/continue, and function bodies intercept return. The
//! conversions performed here were validated at compile time; a mismatch
//! at this layer is an internal-consistency failure unless a host member
//! returned a value its binding never promised.

pub mod cancel;
pub mod scope;
pub mod value;

use std::sync::Arc;

use anyhow::anyhow;
use log::trace;

use crate::{
	context::symbols::FunctionSignature,
	engine::Script,
	error::runtime::RuntimeError,
	parser::{
		expression::{BinaryOp, CallArg, Expr, Target, UnaryOp},
		statement::Stmt,
	},
	registry::overload::{select_overload, ArgInfo},
	runtime::{cancel::CancelToken, scope::ScopeChain, value::{ArrayValue, Value}},
};

/// The outcome of executing one statement.
#[derive(Debug)]
pub enum Flow {
	Nominal,
	Break,
	Continue,
	Return(Value),
}

const MAX_CALL_DEPTH: usize = 256;

pub(crate) struct Evaluator<'s> {
	script: &'s Script,
	cancel: &'s CancelToken,
	scopes: ScopeChain,
	depth:  usize,
}

impl<'s> Evaluator<'s> {
	/// Run one entry-point invocation: initialize globals, select the
	/// function by name and argument types, execute it.
	pub fn run(
		script: &'s Script,
		name: &str,
		args: Vec<Value>,
		cancel: &'s CancelToken,
	) -> Result<Value, RuntimeError> {
		let candidates: Vec<(usize, Arc<FunctionSignature>)> = script
			.functions
			.iter()
			.enumerate()
			.filter(|(_, f)| f.signature.name == name)
			.map(|(i, f)| (i, f.signature.clone()))
			.collect();
		if candidates.is_empty() {
			return Err(RuntimeError::NoSuchFunction(name.to_string()));
		}
		let infos: Vec<ArgInfo> = args.iter().map(|v| ArgInfo::value(v.ty())).collect();
		let signatures: Vec<Arc<FunctionSignature>> =
			candidates.iter().map(|(_, sig)| sig.clone()).collect();
		let selected = select_overload(&signatures, &infos)
			.map_err(|_| RuntimeError::NoSuchFunction(name.to_string()))?;
		let index = candidates
			.iter()
			.find(|(_, sig)| Arc::ptr_eq(sig, selected))
			.map(|(i, _)| *i)
			.ok_or_else(|| anyhow!("selected signature lost its body index"))?;

		let converted = convert_invoke_args(selected, args)?;

		trace!("invoking '{}' with {} arguments", name, converted.len());
		let mut evaluator = Evaluator { script, cancel, scopes: ScopeChain::new(), depth: 0 };
		evaluator.init_globals()?;
		let (result, _) = evaluator.run_function(index, converted)?;
		Ok(result)
	}

	fn init_globals(&mut self) -> Result<(), RuntimeError> {
		for global in &self.script.globals {
			let value = match &global.initializer {
				Some(expr) => self.eval(expr)?,
				None => Value::default_of(&global.ty),
			};
			self.scopes.define(&global.name, value);
		}
		Ok(())
	}

	/// Execute a compiled function body; returns its result and the final
	/// values of its parameter slots for ref/out writeback.
	fn run_function(&mut self, index: usize, args: Vec<Value>) -> Result<(Value, Vec<Value>), RuntimeError> {
		if self.depth >= MAX_CALL_DEPTH {
			return Err(RuntimeError::CallDepthExceeded);
		}
		let function = self
			.script
			.functions
			.get(index)
			.ok_or_else(|| anyhow!("call index {index} out of range"))?;
		self.depth += 1;
		self.scopes.push_function();
		let mut cells = Vec::new();
		for (param, value) in function.signature.params.iter().zip(args) {
			cells.push(self.scopes.define(&param.name, value));
		}
		let flow = self.exec_block(&function.body);
		let finals: Vec<Value> = cells.iter().map(|cell| cell.borrow().clone()).collect();
		self.scopes.pop();
		self.depth -= 1;

		let result = match flow? {
			Flow::Return(value) => value.convert(&function.signature.return_type)?,
			Flow::Nominal if function.signature.return_type == crate::types::ScriptType::Void => Value::Void,
			Flow::Nominal => {
				return Err(RuntimeError::MissingReturn(function.signature.name.clone()));
			}
			Flow::Break | Flow::Continue => {
				return Err(anyhow!("break/continue escaped function body").into());
			}
		};
		Ok((result, finals))
	}

	// -- statements -----------------------------------------------------------

	fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
		for stmt in stmts {
			match self.exec_stmt(stmt)? {
				Flow::Nominal => {}
				other => return Ok(other),
			}
		}
		Ok(Flow::Nominal)
	}

	fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
		if self.cancel.is_cancelled() {
			return Err(RuntimeError::Cancelled);
		}
		match stmt {
			Stmt::Empty => Ok(Flow::Nominal),
			Stmt::Expr(expr) => {
				self.eval(expr)?;
				Ok(Flow::Nominal)
			}
			Stmt::VarDecl { name, ty, initializer } => {
				let value = match initializer {
					Some(expr) => self.eval(expr)?,
					None => Value::default_of(ty),
				};
				self.scopes.define(name, value);
				Ok(Flow::Nominal)
			}
			Stmt::Block(stmts) => {
				self.scopes.push();
				let flow = self.exec_block(stmts);
				self.scopes.pop();
				flow
			}
			Stmt::If { branches, else_branch } => {
				for (condition, body) in branches {
					if self.eval_bool(condition)? {
						self.scopes.push();
						let flow = self.exec_block(body);
						self.scopes.pop();
						return flow;
					}
				}
				if let Some(body) = else_branch {
					self.scopes.push();
					let flow = self.exec_block(body);
					self.scopes.pop();
					return flow;
				}
				Ok(Flow::Nominal)
			}
			Stmt::While { condition, body } => {
				loop {
					if self.cancel.is_cancelled() {
						return Err(RuntimeError::Cancelled);
					}
					if !self.eval_bool(condition)? {
						break;
					}
					self.scopes.push();
					let flow = self.exec_block(body);
					self.scopes.pop();
					match flow? {
						Flow::Break => break,
						Flow::Nominal | Flow::Continue => {}
						flow @ Flow::Return(_) => return Ok(flow),
					}
				}
				Ok(Flow::Nominal)
			}
			Stmt::For { initializer, condition, increment, body } => {
				self.scopes.push();
				let flow = self.exec_for(initializer, condition, increment, body);
				self.scopes.pop();
				flow
			}
			Stmt::Foreach { variable, elem_ty, iterable, body } => {
				let value = self.eval(iterable)?;
				let array = match value {
					Value::Array(array) => array,
					Value::Null => return Err(RuntimeError::NullDereference),
					other => return Err(anyhow!("foreach over non-array value {other}").into()),
				};
				let mut i = 0;
				loop {
					if self.cancel.is_cancelled() {
						return Err(RuntimeError::Cancelled);
					}
					let item = {
						let items = array.items.borrow();
						match items.get(i) {
							Some(item) => item.clone(),
							None => break,
						}
					};
					let item = item.convert(elem_ty)?;
					self.scopes.push();
					self.scopes.define(variable, item);
					let flow = self.exec_block(body);
					self.scopes.pop();
					match flow? {
						Flow::Break => break,
						Flow::Nominal | Flow::Continue => {}
						flow @ Flow::Return(_) => return Ok(flow),
					}
					i += 1;
				}
				Ok(Flow::Nominal)
			}
			Stmt::Switch { scrutinee, cases, default } => {
				let value = self.eval(scrutinee)?;
				let scrutinee_ty = value.ty();
				let mut matched = None;
				for case in cases {
					let label = Value::from_constant(&case.ty, &case.label).convert(&scrutinee_ty)?;
					if value.equals(&label) {
						matched = Some(&case.body);
						break;
					}
				}
				let Some(body) = matched.or(default.as_ref()) else {
					return Ok(Flow::Nominal);
				};
				self.scopes.push();
				let flow = self.exec_block(body);
				self.scopes.pop();
				match flow? {
					// break exits the switch; continue belongs to an
					// enclosing loop
					Flow::Break | Flow::Nominal => Ok(Flow::Nominal),
					other => Ok(other),
				}
			}
			Stmt::Break => Ok(Flow::Break),
			Stmt::Continue => Ok(Flow::Continue),
			Stmt::Return(value) => {
				let value = match value {
					Some(expr) => self.eval(expr)?,
					None => Value::Void,
				};
				Ok(Flow::Return(value))
			}
		}
	}

	fn exec_for(
		&mut self,
		initializer: &Option<Box<Stmt>>,
		condition: &Option<Expr>,
		increment: &Option<Box<Stmt>>,
		body: &[Stmt],
	) -> Result<Flow, RuntimeError> {
		if let Some(init) = initializer {
			self.exec_stmt(init)?;
		}
		loop {
			if self.cancel.is_cancelled() {
				return Err(RuntimeError::Cancelled);
			}
			if let Some(condition) = condition {
				if !self.eval_bool(condition)? {
					break;
				}
			}
			self.scopes.push();
			let flow = self.exec_block(body);
			self.scopes.pop();
			match flow? {
				Flow::Break => break,
				Flow::Nominal | Flow::Continue => {}
				flow @ Flow::Return(_) => return Ok(flow),
			}
			if let Some(increment) = increment {
				self.exec_stmt(increment)?;
			}
		}
		Ok(Flow::Nominal)
	}

	// -- expressions ----------------------------------------------------------

	fn eval_bool(&mut self, expr: &Expr) -> Result<bool, RuntimeError> {
		match self.eval(expr)? {
			Value::Bool(value) => Ok(value),
			other => Err(anyhow!("condition evaluated to {other} instead of bool").into()),
		}
	}

	fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
		match expr {
			Expr::Literal(lit) => Ok(Value::from_literal(lit)),
			Expr::Constant { ty, value } => Ok(Value::from_constant(ty, value)),
			Expr::Variable { name, .. } => {
				let cell = self
					.scopes
					.get(name)
					.ok_or_else(|| anyhow!("unbound variable '{name}' at runtime"))?;
				let value = cell.borrow().clone();
				Ok(value)
			}
			Expr::Unary { op, operand, .. } => {
				let value = self.eval(operand)?;
				match (op, value) {
					(UnaryOp::Negate, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
					(UnaryOp::Negate, Value::Long(v)) => Ok(Value::Long(v.wrapping_neg())),
					(UnaryOp::Negate, Value::Float(v)) => Ok(Value::Float(-v)),
					(UnaryOp::Negate, Value::Double(v)) => Ok(Value::Double(-v)),
					(UnaryOp::Negate, Value::Decimal(v)) => Ok(Value::Decimal(-v)),
					(UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
					(UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(!v)),
					(UnaryOp::BitNot, Value::Uint(v)) => Ok(Value::Uint(!v)),
					(UnaryOp::BitNot, Value::Long(v)) => Ok(Value::Long(!v)),
					(UnaryOp::BitNot, Value::Ulong(v)) => Ok(Value::Ulong(!v)),
					(op, value) => Err(anyhow!("unary {op:?} on runtime value {value}").into()),
				}
			}
			Expr::Binary { op, left, right, .. } => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				Value::binary_op(*op, left, right)
			}
			Expr::Logical { and, left, right } => {
				let left = self.eval_bool(left)?;
				if *and {
					if !left {
						return Ok(Value::Bool(false));
					}
				} else if left {
					return Ok(Value::Bool(true));
				}
				self.eval(right)
			}
			Expr::StringConcat { left, right } => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				Ok(Value::Str(format!("{left}{right}")))
			}
			Expr::NullCoalesce { left, right, .. } => {
				let value = self.eval(left)?;
				if matches!(value, Value::Null) {
					self.eval(right)
				} else {
					Ok(value)
				}
			}
			Expr::Ternary { condition, then_branch, else_branch, .. } => {
				if self.eval_bool(condition)? {
					self.eval(then_branch)
				} else {
					self.eval(else_branch)
				}
			}
			Expr::Assign { target, op, value } => {
				let value = match op {
					None => self.eval(value)?,
					Some(binary) => {
						let current = self.read_target(target)?;
						if matches!(current, Value::Str(_)) && *binary == BinaryOp::Add {
							let rhs = self.eval(value)?;
							Value::Str(format!("{current}{rhs}"))
						} else {
							let rhs = self.eval(value)?;
							Value::binary_op(*binary, current, rhs)?
						}
					}
				};
				self.write_target(target, value.clone())?;
				Ok(value)
			}
			Expr::IncrDecr { target, increment, postfix } => {
				let current = self.read_target(target)?;
				let one = Value::Int(1).convert(&target.ty())?;
				let op = if *increment { BinaryOp::Add } else { BinaryOp::Sub };
				let updated = Value::binary_op(op, current.clone(), one)?;
				self.write_target(target, updated.clone())?;
				Ok(if *postfix { current } else { updated })
			}
			Expr::Cast { ty, operand } => self.eval(operand)?.convert(ty),
			Expr::Call { index, args, .. } => self.eval_call(*index, args),
			Expr::HostCall { method, receiver, args, .. } => {
				let receiver = match receiver {
					Some(expr) => {
						let value = self.eval(expr)?;
						if matches!(value, Value::Null) {
							return Err(RuntimeError::NullDereference);
						}
						Some(value)
					}
					None => None,
				};
				let values = args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;
				(method.invoke)(receiver.as_ref(), values)
			}
			Expr::PropertyGet { property, receiver, .. } => {
				let receiver = match receiver {
					Some(expr) => {
						let value = self.eval(expr)?;
						if matches!(value, Value::Null) {
							return Err(RuntimeError::NullDereference);
						}
						Some(value)
					}
					None => None,
				};
				let get = property
					.get
					.as_ref()
					.ok_or_else(|| anyhow!("read of write-only property '{}'", property.name))?;
				get(receiver.as_ref())
			}
			Expr::Length { operand } => match self.eval(operand)? {
				Value::Array(array) => Ok(Value::Int(array.items.borrow().len() as i32)),
				Value::Str(text) => Ok(Value::Int(text.chars().count() as i32)),
				Value::Null => Err(RuntimeError::NullDereference),
				other => Err(anyhow!("length of non-measurable value {other}").into()),
			},
			Expr::Index { array, index, .. } => {
				let (array, index) = self.eval_index(array, index)?;
				let items = array.items.borrow();
				items
					.get(index)
					.cloned()
					.ok_or(RuntimeError::IndexOutOfRange { index: index as i64, len: items.len() })
			}
			Expr::NewArray { elem, len } => {
				let length = match self.eval(len)? {
					Value::Int(v) => v,
					other => return Err(anyhow!("array length evaluated to {other}").into()),
				};
				if length < 0 {
					return Err(RuntimeError::IndexOutOfRange { index: length as i64, len: 0 });
				}
				let items = vec![Value::default_of(elem); length as usize];
				Ok(Value::Array(ArrayValue::new(elem.clone(), items)))
			}
			Expr::NewObject { constructor, args, .. } => {
				let values = args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;
				(constructor.invoke)(None, values)
			}
			Expr::Format { template, args } => {
				let template = match self.eval(template)? {
					Value::Str(text) => text,
					other => return Err(anyhow!("format template evaluated to {other}").into()),
				};
				let values = args.iter().map(|arg| self.eval(arg)).collect::<Result<Vec<_>, _>>()?;
				Ok(Value::Str(format_template(&template, &values)?))
			}
			Expr::ArgPack { elem, items } => {
				let values = items.iter().map(|item| self.eval(item)).collect::<Result<Vec<_>, _>>()?;
				Ok(Value::Array(ArrayValue::new(elem.clone(), values)))
			}
		}
	}

	/// Call a script function: evaluate arguments, run the body, then
	/// rewrite the caller-side ref/out targets from the final parameter
	/// slot values. No aliasing takes place.
	fn eval_call(&mut self, index: usize, args: &[CallArg]) -> Result<Value, RuntimeError> {
		let signature = self
			.script
			.functions
			.get(index)
			.map(|f| f.signature.clone())
			.ok_or_else(|| anyhow!("call index {index} out of range"))?;
		let mut values = Vec::new();
		let mut writebacks: Vec<(usize, &Target)> = Vec::new();
		for (i, (param, arg)) in signature.params.iter().zip(args).enumerate() {
			match arg {
				CallArg::Value(expr) => values.push(self.eval(expr)?),
				CallArg::Ref(target) => {
					values.push(self.read_target(target)?);
					writebacks.push((i, target));
				}
				CallArg::Out(target) => {
					values.push(Value::default_of(&param.ty));
					writebacks.push((i, target));
				}
			}
		}
		let (result, finals) = self.run_function(index, values)?;
		for (i, target) in writebacks {
			let value = finals
				.get(i)
				.cloned()
				.ok_or_else(|| anyhow!("missing final value for parameter {i}"))?;
			self.write_target(target, value)?;
		}
		Ok(result)
	}

	// -- assignable targets ---------------------------------------------------

	fn read_target(&mut self, target: &Target) -> Result<Value, RuntimeError> {
		match target {
			Target::Variable { name, .. } => {
				let cell = self
					.scopes
					.get(name)
					.ok_or_else(|| anyhow!("unbound variable '{name}' at runtime"))?;
				let value = cell.borrow().clone();
				Ok(value)
			}
			Target::Index { array, index, .. } => {
				let (array, index) = self.eval_index(array, index)?;
				let items = array.items.borrow();
				items
					.get(index)
					.cloned()
					.ok_or(RuntimeError::IndexOutOfRange { index: index as i64, len: items.len() })
			}
			Target::Property { property, receiver, .. } => {
				let receiver = match receiver {
					Some(expr) => Some(self.eval(expr)?),
					None => None,
				};
				let get = property
					.get
					.as_ref()
					.ok_or_else(|| anyhow!("read of write-only property '{}'", property.name))?;
				get(receiver.as_ref())
			}
		}
	}

	fn write_target(&mut self, target: &Target, value: Value) -> Result<(), RuntimeError> {
		match target {
			Target::Variable { name, .. } => {
				let cell = self
					.scopes
					.get(name)
					.ok_or_else(|| anyhow!("unbound variable '{name}' at runtime"))?;
				*cell.borrow_mut() = value;
				Ok(())
			}
			Target::Index { array, index, .. } => {
				let (array, index) = self.eval_index(array, index)?;
				let mut items = array.items.borrow_mut();
				let len = items.len();
				let slot = items
					.get_mut(index)
					.ok_or(RuntimeError::IndexOutOfRange { index: index as i64, len })?;
				*slot = value;
				Ok(())
			}
			Target::Property { property, receiver, .. } => {
				let receiver = match receiver {
					Some(expr) => {
						let evaluated = self.eval(expr)?;
						if matches!(evaluated, Value::Null) {
							return Err(RuntimeError::NullDereference);
						}
						Some(evaluated)
					}
					None => None,
				};
				let set = property
					.set
					.as_ref()
					.ok_or_else(|| anyhow!("write to read-only property '{}'", property.name))?;
				set(receiver.as_ref(), value)
			}
		}
	}

	fn eval_index(&mut self, array: &Expr, index: &Expr) -> Result<(ArrayValue, usize), RuntimeError> {
		let array = match self.eval(array)? {
			Value::Array(array) => array,
			Value::Null => return Err(RuntimeError::NullDereference),
			other => return Err(anyhow!("indexing into non-array value {other}").into()),
		};
		let index = match self.eval(index)? {
			Value::Int(v) => v,
			other => return Err(anyhow!("array index evaluated to {other}").into()),
		};
		if index < 0 {
			let len = array.items.borrow().len();
			return Err(RuntimeError::IndexOutOfRange { index: index as i64, len });
		}
		Ok((array, index as usize))
	}
}

/// Convert host-supplied invocation arguments to the selected overload's
/// parameter types, packing an expanded variadic tail into its array.
fn convert_invoke_args(
	signature: &FunctionSignature,
	args: Vec<Value>,
) -> Result<Vec<Value>, RuntimeError> {
	use crate::context::symbols::PassMode;
	let variadic = signature.params.last().is_some_and(|p| p.mode == PassMode::Variadic);
	let fixed = if variadic { signature.params.len() - 1 } else { signature.params.len() };
	let mut out = Vec::new();
	let mut iter = args.into_iter();
	for param in &signature.params[..fixed] {
		let value = iter.next().ok_or_else(|| anyhow!("argument count diverged after selection"))?;
		out.push(value.convert(&param.ty)?);
	}
	if variadic {
		let tail = signature.params.last().ok_or_else(|| anyhow!("variadic signature without parameters"))?;
		let crate::types::ScriptType::Array(elem) = &tail.ty else {
			return Err(anyhow!("variadic parameter is not an array").into());
		};
		let rest: Vec<Value> = iter.collect();
		if rest.len() == 1 && rest[0].ty() == tail.ty {
			out.extend(rest);
		} else {
			let items = rest
				.into_iter()
				.map(|value| value.convert(elem))
				.collect::<Result<Vec<_>, _>>()?;
			out.push(Value::Array(ArrayValue::new((**elem).clone(), items)));
		}
	}
	Ok(out)
}

/// Render a format template against evaluated arguments. Placeholders are
/// `{index[,alignment][:spec]}` with `{{`/`}}` escapes; specs cover fixed
/// decimals (`F2`) and hex (`X`/`x`).
pub(crate) fn format_template(template: &str, args: &[Value]) -> Result<String, RuntimeError> {
	let mut out = String::new();
	let mut chars = template.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'{' if chars.peek() == Some(&'{') => {
				chars.next();
				out.push('{');
			}
			'}' if chars.peek() == Some(&'}') => {
				chars.next();
				out.push('}');
			}
			'{' => {
				let mut placeholder = String::new();
				loop {
					match chars.next() {
						Some('}') => break,
						Some(c) => placeholder.push(c),
						None => {
							return Err(RuntimeError::Format("unterminated placeholder".into()));
						}
					}
				}
				out.push_str(&render_placeholder(&placeholder, args)?);
			}
			'}' => return Err(RuntimeError::Format("stray '}' in template".into())),
			c => out.push(c),
		}
	}
	Ok(out)
}

fn render_placeholder(placeholder: &str, args: &[Value]) -> Result<String, RuntimeError> {
	let (head, spec) = match placeholder.split_once(':') {
		Some((head, spec)) => (head, Some(spec)),
		None => (placeholder, None),
	};
	let (index_text, alignment) = match head.split_once(',') {
		Some((index, alignment)) => (index, Some(alignment)),
		None => (head, None),
	};
	let index: usize = index_text
		.trim()
		.parse()
		.map_err(|_| RuntimeError::Format(format!("bad placeholder index '{index_text}'")))?;
	let value = args
		.get(index)
		.ok_or_else(|| RuntimeError::Format(format!("placeholder {index} has no argument")))?;
	let mut rendered = match spec {
		None => value.to_string(),
		Some(spec) => format_value(value, spec)?,
	};
	if let Some(alignment) = alignment {
		let width: i64 = alignment
			.trim()
			.parse()
			.map_err(|_| RuntimeError::Format(format!("bad alignment '{alignment}'")))?;
		let pad = width.unsigned_abs() as usize;
		if rendered.chars().count() < pad {
			let fill = " ".repeat(pad - rendered.chars().count());
			if width < 0 {
				rendered.push_str(&fill);
			} else {
				rendered.insert_str(0, &fill);
			}
		}
	}
	Ok(rendered)
}

fn format_value(value: &Value, spec: &str) -> Result<String, RuntimeError> {
	let mut chars = spec.chars();
	let kind = chars.next().ok_or_else(|| RuntimeError::Format("empty format spec".into()))?;
	let digits: String = chars.collect();
	match kind {
		'F' | 'f' => {
			let places: usize = if digits.is_empty() {
				2
			} else {
				digits
					.parse()
					.map_err(|_| RuntimeError::Format(format!("bad precision '{digits}'")))?
			};
			let number = value
				.as_f64()
				.ok_or_else(|| RuntimeError::Format(format!("'F' spec on non-numeric value {value}")))?;
			Ok(format!("{number:.places$}"))
		}
		'X' => {
			let number = value
				.as_i128()
				.ok_or_else(|| RuntimeError::Format(format!("'X' spec on non-integral value {value}")))?;
			Ok(format!("{number:X}"))
		}
		'x' => {
			let number = value
				.as_i128()
				.ok_or_else(|| RuntimeError::Format(format!("'x' spec on non-integral value {value}")))?;
			Ok(format!("{number:x}"))
		}
		other => Err(RuntimeError::Format(format!("unknown format spec '{other}'"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn templates_render_positional_arguments() {
		let args = vec![Value::Int(7), Value::Str("db".into())];
		assert_eq!(format_template("x = {0}, s = {1}", &args).unwrap(), "x = 7, s = db");
		assert_eq!(format_template("{{0}} {0}", &args).unwrap(), "{0} 7");
	}

	#[test]
	fn fixed_and_hex_specs() {
		let args = vec![Value::Double(3.14159), Value::Int(255)];
		assert_eq!(format_template("{0:F2}", &args).unwrap(), "3.14");
		assert_eq!(format_template("{1:X}", &args).unwrap(), "FF");
		assert_eq!(format_template("{1:x}", &args).unwrap(), "ff");
	}

	#[test]
	fn alignment_pads() {
		let args = vec![Value::Int(5)];
		assert_eq!(format_template("{0,4}", &args).unwrap(), "   5");
		assert_eq!(format_template("{0,-4}|", &args).unwrap(), "5   |");
	}

	#[test]
	fn bad_templates_are_reported() {
		assert!(format_template("{0", &[]).is_err());
		assert!(format_template("{9}", &[Value::Int(1)]).is_err());
		assert!(format_template("}", &[]).is_err());
	}
}

//! The compilation context: a parent-linked chain of Script, Function and
//! Block scopes the parser consults while building the tree.
//!
//! Lookups walk outward until found or exhausted. Declarations check the
//! entire ancestor chain for collisions, not just the local scope: within
//! one chain a name denotes at most one of constant, variable, or function
//! set, and only function signatures may overload among themselves. Each
//! block scope carries a loop flag so `break`/`continue` validate without a
//! separate stack; `return` compatibility walks to the nearest function
//! scope, and asking the script root for a return type is a defect in the
//! compiler, never a user-facing diagnostic.

pub mod symbols;

use std::sync::Arc;

use anyhow::anyhow;
use rustc_hash::FxHashMap;

use crate::{
	context::symbols::{ConstantData, FunctionSignature, VariableData},
	error::compile::{diagnostic, CompileError, CompileErrorKind},
	lexer::token::SourcePos,
	registry::{overload::{select_overload, ArgInfo, OverloadFailure}, ResolveError},
	types::ScriptType,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
	Script,
	Function { return_type: ScriptType },
	Block { flow: BlockFlow },
}

/// What kind of flow-control boundary a block scope is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlow {
	Plain,
	Loop,
	Switch,
}

struct Scope {
	kind:      ScopeKind,
	variables: FxHashMap<String, VariableData>,
	constants: FxHashMap<String, ConstantData>,
	functions: FxHashMap<String, Vec<Arc<FunctionSignature>>>,
}

impl Scope {
	fn new(kind: ScopeKind) -> Self {
		Self {
			kind,
			variables: FxHashMap::default(),
			constants: FxHashMap::default(),
			functions: FxHashMap::default(),
		}
	}
}

pub enum IdentifierKind<'a> {
	Unidentified,
	Constant(&'a ConstantData),
	Variable(&'a VariableData),
	FunctionSet(&'a [Arc<FunctionSignature>]),
}

pub struct CompileContext {
	scopes: Vec<Scope>,
}

impl Default for CompileContext {
	fn default() -> Self { Self::new() }
}

impl CompileContext {
	pub fn new() -> Self { Self { scopes: vec![Scope::new(ScopeKind::Script)] } }

	pub fn push_function(&mut self, return_type: ScriptType) {
		self.scopes.push(Scope::new(ScopeKind::Function { return_type }));
	}

	pub fn push_block(&mut self, flow: BlockFlow) {
		self.scopes.push(Scope::new(ScopeKind::Block { flow }));
	}

	pub fn pop_scope(&mut self) -> Result<(), CompileError> {
		if self.scopes.len() == 1 {
			return Err(anyhow!("attempted to pop the script root scope").into());
		}
		self.scopes.pop();
		Ok(())
	}

	fn current_mut(&mut self) -> &mut Scope {
		let last = self.scopes.len() - 1;
		&mut self.scopes[last]
	}

	/// Where, if anywhere, this name is already taken in the chain.
	fn collision(&self, name: &str) -> Option<SourcePos> {
		for scope in self.scopes.iter().rev() {
			if let Some(var) = scope.variables.get(name) {
				return Some(var.pos);
			}
			if let Some(constant) = scope.constants.get(name) {
				return Some(constant.pos);
			}
			if let Some(set) = scope.functions.get(name) {
				return set.first().map(|f| f.pos);
			}
		}
		None
	}

	pub fn declare_variable(
		&mut self,
		name: &str,
		ty: ScriptType,
		readonly: bool,
		pos: SourcePos,
	) -> Result<(), CompileError> {
		if let Some(original) = self.collision(name) {
			return Err(diagnostic(pos, CompileErrorKind::Redeclaration { name: name.to_string(), original }));
		}
		let data = VariableData { name: name.to_string(), ty, readonly, pos };
		self.current_mut().variables.insert(name.to_string(), data);
		Ok(())
	}

	pub fn declare_constant(&mut self, data: ConstantData) -> Result<(), CompileError> {
		if let Some(original) = self.collision(&data.name) {
			return Err(diagnostic(
				data.pos,
				CompileErrorKind::Redeclaration { name: data.name.clone(), original },
			));
		}
		self.current_mut().constants.insert(data.name.clone(), data);
		Ok(())
	}

	/// Declare a function signature. Overloads may share a name; an exact
	/// duplicate parameter list, or any non-function use of the name in the
	/// chain, still collides.
	pub fn declare_function(&mut self, sig: FunctionSignature) -> Result<Arc<FunctionSignature>, CompileError> {
		for scope in self.scopes.iter().rev() {
			if let Some(var) = scope.variables.get(&sig.name) {
				return Err(diagnostic(
					sig.pos,
					CompileErrorKind::Redeclaration { name: sig.name.clone(), original: var.pos },
				));
			}
			if let Some(constant) = scope.constants.get(&sig.name) {
				return Err(diagnostic(
					sig.pos,
					CompileErrorKind::Redeclaration { name: sig.name.clone(), original: constant.pos },
				));
			}
			if let Some(set) = scope.functions.get(&sig.name) {
				if let Some(duplicate) = set.iter().find(|f| f.same_params(&sig)) {
					return Err(diagnostic(
						sig.pos,
						CompileErrorKind::Redeclaration { name: sig.name.clone(), original: duplicate.pos },
					));
				}
			}
		}
		let sig = Arc::new(sig);
		self.current_mut().functions.entry(sig.name.clone()).or_default().push(sig.clone());
		Ok(sig)
	}

	pub fn resolve_identifier(&self, name: &str) -> IdentifierKind<'_> {
		for scope in self.scopes.iter().rev() {
			if let Some(constant) = scope.constants.get(name) {
				return IdentifierKind::Constant(constant);
			}
			if let Some(var) = scope.variables.get(name) {
				return IdentifierKind::Variable(var);
			}
			if let Some(set) = scope.functions.get(name) {
				return IdentifierKind::FunctionSet(set);
			}
		}
		IdentifierKind::Unidentified
	}

	/// Resolve a call against an overload set with the same exact-then-
	/// unique-loose policy the registry uses.
	pub fn resolve_function(&self, name: &str, args: &[ArgInfo]) -> Result<Arc<FunctionSignature>, ResolveError> {
		for scope in self.scopes.iter().rev() {
			let Some(set) = scope.functions.get(name) else {
				continue;
			};
			return select_overload(set, args).map(Arc::clone).map_err(|failure| match failure {
				OverloadFailure::NoMatch => ResolveError::NoOverload,
				OverloadFailure::Ambiguous(c) => ResolveError::Ambiguous(c),
			});
		}
		Err(ResolveError::UnknownMember)
	}

	/// The return type of the nearest enclosing function. The script root
	/// has none; asking for it is an internal-consistency failure.
	pub fn return_type(&self) -> Result<ScriptType, CompileError> {
		for scope in self.scopes.iter().rev() {
			if let ScopeKind::Function { return_type } = &scope.kind {
				return Ok(return_type.clone());
			}
		}
		Err(anyhow!("script root scope has no return type").into())
	}

	/// Whether `continue` is legal here: walks to the nearest loop block,
	/// stopping at a function boundary. `continue` skips over a switch to
	/// the enclosing loop, so switch blocks do not satisfy it.
	pub fn in_loop(&self) -> bool {
		for scope in self.scopes.iter().rev() {
			match scope.kind {
				ScopeKind::Block { flow: BlockFlow::Loop } => return true,
				ScopeKind::Block { .. } => continue,
				_ => return false,
			}
		}
		false
	}

	/// Whether `break` is legal here: the nearest loop or switch block.
	pub fn in_breakable(&self) -> bool {
		for scope in self.scopes.iter().rev() {
			match scope.kind {
				ScopeKind::Block { flow: BlockFlow::Loop | BlockFlow::Switch } => return true,
				ScopeKind::Block { .. } => continue,
				_ => return false,
			}
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{context::symbols::Parameter, lexer::token::LiteralValue, registry::overload::ArgInfo};

	fn pos(line: u32, column: u32) -> SourcePos { SourcePos::new(line, column) }

	#[test]
	fn variable_collides_with_enclosing_constant() {
		let mut context = CompileContext::new();
		context
			.declare_constant(ConstantData {
				name:  "limit".into(),
				ty:    ScriptType::Int,
				value: LiteralValue::Int(10),
				pos:   pos(1, 7),
			})
			.unwrap();
		context.push_function(ScriptType::Void);
		context.push_block(BlockFlow::Plain);
		let err = context.declare_variable("limit", ScriptType::Double, false, pos(5, 3)).unwrap_err();
		let rendered = err.to_string();
		assert!(rendered.contains("already declared"));
		assert!(rendered.contains("line 1, column 7"));
	}

	#[test]
	fn lookups_walk_outward() {
		let mut context = CompileContext::new();
		context.declare_variable("x", ScriptType::Int, false, pos(1, 1)).unwrap();
		context.push_function(ScriptType::Void);
		context.push_block(BlockFlow::Plain);
		assert!(matches!(context.resolve_identifier("x"), IdentifierKind::Variable(v) if v.ty == ScriptType::Int));
		assert!(matches!(context.resolve_identifier("y"), IdentifierKind::Unidentified));
	}

	#[test]
	fn function_overloads_share_a_name_but_not_a_signature() {
		let mut context = CompileContext::new();
		context
			.declare_function(FunctionSignature::new(
				"f",
				ScriptType::Void,
				vec![Parameter::by_value("x", ScriptType::Int)],
				pos(1, 1),
				false,
			))
			.unwrap();
		context
			.declare_function(FunctionSignature::new(
				"f",
				ScriptType::Void,
				vec![Parameter::by_value("x", ScriptType::Double)],
				pos(2, 1),
				false,
			))
			.unwrap();
		let duplicate = FunctionSignature::new(
			"f",
			ScriptType::Void,
			vec![Parameter::by_value("y", ScriptType::Int)],
			pos(3, 1),
			false,
		);
		assert!(context.declare_function(duplicate).is_err());
	}

	#[test]
	fn call_resolution_prefers_exact_match() {
		let mut context = CompileContext::new();
		for ty in [ScriptType::Int, ScriptType::Double] {
			context
				.declare_function(FunctionSignature::new(
					"f",
					ScriptType::Void,
					vec![Parameter::by_value("x", ty)],
					pos(1, 1),
					false,
				))
				.unwrap();
		}
		let chosen = context.resolve_function("f", &[ArgInfo::value(ScriptType::Int)]).unwrap();
		assert_eq!(chosen.params[0].ty, ScriptType::Int);
	}

	#[test]
	fn loop_flag_stops_at_function_boundary() {
		let mut context = CompileContext::new();
		context.push_function(ScriptType::Void);
		context.push_block(BlockFlow::Loop);
		assert!(context.in_loop());
		context.push_block(BlockFlow::Plain);
		assert!(context.in_loop());
		context.push_function(ScriptType::Void);
		assert!(!context.in_loop());
	}

	#[test]
	fn switch_blocks_allow_break_but_not_continue() {
		let mut context = CompileContext::new();
		context.push_function(ScriptType::Void);
		context.push_block(BlockFlow::Switch);
		assert!(context.in_breakable());
		assert!(!context.in_loop());
		context.pop_scope().unwrap();
		context.push_block(BlockFlow::Loop);
		context.push_block(BlockFlow::Switch);
		assert!(context.in_loop());
	}

	#[test]
	fn root_return_type_is_internal_failure() {
		let context = CompileContext::new();
		assert!(matches!(context.return_type(), Err(CompileError::InternalError(_))));
		let mut context = CompileContext::new();
		context.push_function(ScriptType::Int);
		assert_eq!(context.return_type().unwrap(), ScriptType::Int);
	}
}

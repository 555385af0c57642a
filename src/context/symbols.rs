//! Symbol table entities shared by the compilation context and the host
//! binding registry: variables, constants, and function signatures with
//! their parameter passing modes.

use crate::{lexer::token::{LiteralValue, SourcePos}, types::ScriptType};

/// How an argument travels into a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
	ByValue,
	/// By value, read-only inside the callee.
	In,
	Ref,
	Out,
	/// Trailing `params T[]`; collects any number of loose arguments.
	Variadic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
	pub name: String,
	pub ty:   ScriptType,
	pub mode: PassMode,
}

impl Parameter {
	pub fn new(name: impl Into<String>, ty: ScriptType, mode: PassMode) -> Self {
		Self { name: name.into(), ty, mode }
	}

	pub fn by_value(name: impl Into<String>, ty: ScriptType) -> Self {
		Self::new(name, ty, PassMode::ByValue)
	}

	pub fn readonly(name: impl Into<String>, ty: ScriptType) -> Self { Self::new(name, ty, PassMode::In) }

	pub fn by_ref(name: impl Into<String>, ty: ScriptType) -> Self { Self::new(name, ty, PassMode::Ref) }

	pub fn out(name: impl Into<String>, ty: ScriptType) -> Self { Self::new(name, ty, PassMode::Out) }

	pub fn variadic(name: impl Into<String>, elem: ScriptType) -> Self {
		Self::new(name, ScriptType::array(elem), PassMode::Variadic)
	}
}

#[derive(Debug, Clone)]
pub struct VariableData {
	pub name:     String,
	pub ty:       ScriptType,
	pub readonly: bool,
	pub pos:      SourcePos,
}

#[derive(Debug, Clone)]
pub struct ConstantData {
	pub name:  String,
	pub ty:    ScriptType,
	pub value: LiteralValue,
	pub pos:   SourcePos,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
	pub name:        String,
	pub return_type: ScriptType,
	pub params:      Vec<Parameter>,
	pub pos:         SourcePos,
	pub is_extern:   bool,
}

impl FunctionSignature {
	pub fn new(
		name: impl Into<String>,
		return_type: ScriptType,
		params: Vec<Parameter>,
		pos: SourcePos,
		is_extern: bool,
	) -> Self {
		Self { name: name.into(), return_type, params, pos, is_extern }
	}

	/// Host-side constructor for the entry-point signatures passed to
	/// `compile`; carries no meaningful source position.
	pub fn expected(name: impl Into<String>, params: Vec<Parameter>, return_type: ScriptType) -> Self {
		Self::new(name, return_type, params, SourcePos::start(), false)
	}

	/// Two signatures collide when their parameter types and modes agree.
	pub fn same_params(&self, other: &FunctionSignature) -> bool {
		self.params.len() == other.params.len()
			&& self
				.params
				.iter()
				.zip(other.params.iter())
				.all(|(a, b)| a.ty == b.ty && a.mode == b.mode)
	}

	pub fn describe(&self) -> String {
		let params = self
			.params
			.iter()
			.map(|p| match p.mode {
				PassMode::ByValue => p.ty.to_string(),
				PassMode::In => format!("in {}", p.ty),
				PassMode::Ref => format!("ref {}", p.ty),
				PassMode::Out => format!("out {}", p.ty),
				PassMode::Variadic => format!("params {}", p.ty),
			})
			.collect::<Vec<_>>()
			.join(", ");
		format!("{} {}({params})", self.return_type, self.name)
	}
}

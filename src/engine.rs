//! The embedding facade: compile script text against a host registry, then
//! invoke entry points on the compiled artifact.
//!
//! The registry is built by the host before the engine exists and is
//! read-only afterwards. Compilation is synchronous and stateless beyond
//! the stream and context it builds; a compiled [`Script`] is immutable and
//! safe to share, and every invocation owns its scope chain, so concurrent
//! invocations never contend.

use log::debug;

use crate::{
	context::symbols::FunctionSignature,
	error::{compile::CompileError, runtime::RuntimeError, ScriptError},
	lexer::Lexer,
	parser::{statement::{CompiledFunction, GlobalDecl}, Parser},
	registry::HostRegistry,
	runtime::{cancel::CancelToken, value::Value, Evaluator},
	stream::normalize,
};

pub struct Engine {
	registry: HostRegistry,
}

impl Engine {
	pub fn new(registry: HostRegistry) -> Self { Self { registry } }

	pub fn registry(&self) -> &HostRegistry { &self.registry }

	/// Compile script text. `expected` lists the entry-point signatures the
	/// host intends to invoke; compilation fails unless each is declared
	/// with a matching parameter list and return type.
	pub fn compile(&self, source: &str, expected: &[FunctionSignature]) -> Result<Script, ScriptError> {
		let lexer = Lexer::new(source, &self.registry);
		let tokens = normalize(lexer);
		let (functions, globals) = Parser::new(tokens, &self.registry).parse()?;
		for signature in expected {
			let declared = functions.iter().any(|f| {
				f.signature.name == signature.name
					&& f.signature.same_params(signature)
					&& f.signature.return_type == signature.return_type
			});
			if !declared {
				return Err(CompileError::MissingEntryPoint(signature.describe()).into());
			}
		}
		debug!("compiled script: {} functions, {} globals", functions.len(), globals.len());
		Ok(Script { functions, globals })
	}
}

/// A compiled script: the retained artifact of one compilation. Immutable,
/// `Send + Sync`, and invocable from any number of threads at once.
#[derive(Debug)]
pub struct Script {
	pub(crate) functions: Vec<CompiledFunction>,
	pub(crate) globals:   Vec<GlobalDecl>,
}

impl Script {
	/// Invoke a declared function. Arguments are converted to the selected
	/// overload's parameter types; the cancellation token is checked at
	/// statement and loop boundaries.
	pub fn invoke(
		&self,
		name: &str,
		args: Vec<Value>,
		cancel: &CancelToken,
	) -> Result<Value, RuntimeError> {
		Evaluator::run(self, name, args, cancel)
	}

	pub fn has_function(&self, name: &str) -> bool {
		self.functions.iter().any(|f| f.signature.name == name)
	}

	/// The signatures this script declares, in declaration order.
	pub fn signatures(&self) -> impl Iterator<Item = &FunctionSignature> {
		self.functions.iter().map(|f| f.signature.as_ref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_send_sync<T: Send + Sync>() {}

	#[test]
	fn compiled_scripts_are_shareable() {
		assert_send_sync::<Script>();
		assert_send_sync::<Engine>();
	}

	#[test]
	fn missing_entry_point_is_a_compile_error() {
		let engine = Engine::new(HostRegistry::new());
		let expected = [FunctionSignature::expected(
			"main",
			vec![],
			crate::types::ScriptType::Void,
		)];
		assert!(engine.compile("function void main() { }", &expected).is_ok());
		let err = engine.compile("function void other() { }", &expected).unwrap_err();
		assert!(err.to_string().contains("missing entry point"));
	}
}

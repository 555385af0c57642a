pub mod compile;
pub mod runtime;

/// ScriptError is the top-level error type for the compiler/runtime pair.
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
	/// Compile-time diagnostics: lexical, structural and type errors.
	#[error("Compile error: {0}")]
	Compile(#[from] compile::CompileError),
	/// Runtime diagnostics, including the cancellation outcome.
	#[error("Runtime error: {0}")]
	Runtime(#[from] runtime::RuntimeError),
}

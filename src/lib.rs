//! # scriptum
//!
//! An embeddable scripting language: a host application exposes a curated
//! set of its own types, compiles user-authored script text against that
//! surface, and executes declared entry points with cooperative
//! cancellation.
//!
//! ## The pipeline
//!
//! ```markdown
//! text
//!  └── Lexer            characters → tokens (positions, typed literals)
//!       └── Normalizer  eight ordered stream rewrites:
//!                       interpolation → comments → array folding →
//!                       else-if folding → minus resolution → balance →
//!                       generic collapsing → cast recognition
//!            └── Parser recursive descent + compile-time scope/type
//!                       checking, consulting the CompileContext and the
//!                       HostRegistry; produces a Script
//!                 └── Evaluator  tree walk over runtime scope chains
//! ```
//!
//! ## Embedding
//!
//! ```no_run
//! use scriptum::{CancelToken, Engine, FunctionSignature, HostRegistry, Parameter, ScriptType, Value};
//!
//! let mut registry = HostRegistry::new();
//! // registry.register(TypeSpec::class::<MyType>("MyType")...);
//! let engine = Engine::new(registry);
//!
//! let expected = [FunctionSignature::expected(
//! 	"add",
//! 	vec![Parameter::by_value("a", ScriptType::Int), Parameter::by_value("b", ScriptType::Int)],
//! 	ScriptType::Int,
//! )];
//! let script = engine
//! 	.compile("function int add(int a, int b) { return a + b; }", &expected)
//! 	.expect("compiles");
//! let result = script.invoke("add", vec![Value::Int(2), Value::Int(3)], &CancelToken::new());
//! ```
//!
//! The registry is written once at startup and read-only afterwards; a
//! compiled [`Script`] is `Send + Sync` and each invocation owns its own
//! runtime state, so executions run in parallel without locking.

pub mod cli;
mod context;
mod engine;
mod error;
mod lexer;
mod parser;
mod registry;
mod runtime;
mod stream;
mod types;
mod utils;

pub use context::symbols::{ConstantData, FunctionSignature, Parameter, PassMode, VariableData};
pub use engine::{Engine, Script};
pub use error::{compile::{CompileDiagnostic, CompileError, CompileErrorKind}, runtime::RuntimeError, ScriptError};
pub use registry::{
	spec::{MethodSpec, PropertySpec, TypeSpec},
	HostRegistry, MethodBinding, PropertyBinding,
};
pub use runtime::{cancel::CancelToken, value::{ArrayValue, EnumValue, HostValue, Value}, Flow};
pub use types::{HostId, ScriptType};
pub use utils::RcCell;

/// Errors surfaced while executing a compiled script. `Cancelled` is the
/// cooperative-cancellation outcome, distinct from completion and from
/// failure. None of these corrupt the registry or other executions.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
	/// Internal evaluator error, should never happen
	#[error("internal: {0}")]
	InternalError(#[from] anyhow::Error),
	#[error("execution cancelled")]
	Cancelled,
	#[error("division by zero")]
	DivisionByZero,
	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange { index: i64, len: usize },
	#[error("null value dereferenced")]
	NullDereference,
	#[error("cannot convert {from} to {to}")]
	ConversionFailed { from: String, to: String },
	#[error("function '{0}' completed without returning a value")]
	MissingReturn(String),
	#[error("no function '{0}' accepts the supplied arguments")]
	NoSuchFunction(String),
	#[error("call depth limit exceeded")]
	CallDepthExceeded,
	#[error("format error: {0}")]
	Format(String),
	#[error("{0}")]
	Host(String),
}

impl RuntimeError {
	/// Failure channel for host-registered members.
	pub fn host(message: impl Into<String>) -> Self { Self::Host(message.into()) }
}

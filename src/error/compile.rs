use crate::lexer::token::SourcePos;

/// Compile-time errors. User-facing diagnostics carry a source position;
/// internal-consistency failures are defects, not script errors.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
	/// Internal compiler error, should never happen
	#[error("internal: {0}")]
	InternalError(#[from] anyhow::Error),
	#[error(transparent)]
	Diagnostic(#[from] CompileDiagnostic),
	/// An entry-point signature the host expected was not declared.
	#[error("missing entry point: {0}")]
	MissingEntryPoint(String),
}

/// A user-facing diagnostic with its source position and kind.
#[derive(thiserror::Error, Debug)]
#[error("line {line}, column {column}: {kind}")]
pub struct CompileDiagnostic {
	line:   u32,
	column: u32,
	kind:   CompileErrorKind,
}

impl CompileDiagnostic {
	pub fn new(pos: SourcePos, kind: CompileErrorKind) -> Self {
		Self { line: pos.line, column: pos.column, kind }
	}

	pub fn kind(&self) -> &CompileErrorKind { &self.kind }
}

/// Raise a diagnostic at the given position.
pub fn diagnostic(pos: SourcePos, kind: CompileErrorKind) -> CompileError {
	CompileDiagnostic::new(pos, kind).into()
}

#[derive(Debug, PartialEq)]
pub enum CompileErrorKind {
	// lexical
	UnexpectedCharacter(char),
	UnterminatedString,
	UnterminatedBlockComment,
	InvalidEscape(char),
	MalformedNumber(String),
	MalformedInterpolation,
	// token stream
	UnbalancedDelimiter(String),
	UnclosedDelimiter(String),
	// syntax
	UnexpectedToken(String),
	ExpectedToken { expected: String, found: String },
	UnexpectedGenericArguments,
	// resolution
	UnknownIdentifier(String),
	UnknownType(String),
	UnknownMember { type_name: String, member: String },
	NoMatchingOverload { name: String, arguments: String },
	AmbiguousOverload { name: String, candidates: Vec<String> },
	Redeclaration { name: String, original: SourcePos },
	FunctionAsValue(String),
	NotCallable(String),
	// typing
	TypeMismatch { expected: String, found: String },
	InvalidOperands { operator: String, left: String, right: String },
	InvalidUnaryOperand { operator: String, operand: String },
	InvalidCast { from: String, to: String },
	ConditionNotBool(String),
	ReturnTypeMismatch { expected: String, found: String },
	NotAssignable(String),
	NotReadable(String),
	VoidValue,
	ConstantRequired,
	NotIndexable(String),
	NotConstructible(String),
	// structure
	BreakOutsideLoop,
	ContinueOutsideLoop,
}

impl std::fmt::Display for CompileErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use CompileErrorKind::*;
		match self {
			UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
			UnterminatedString => write!(f, "unterminated string literal"),
			UnterminatedBlockComment => write!(f, "unterminated block comment"),
			InvalidEscape(c) => write!(f, "invalid escape sequence '\\{c}'"),
			MalformedNumber(text) => write!(f, "malformed numeric literal '{text}'"),
			MalformedInterpolation => write!(f, "malformed interpolated string"),
			UnbalancedDelimiter(t) => write!(f, "unbalanced delimiter '{t}'"),
			UnclosedDelimiter(t) => write!(f, "unclosed delimiter '{t}'"),
			UnexpectedToken(t) => write!(f, "unexpected token '{t}'"),
			ExpectedToken { expected, found } => write!(f, "expected {expected}, found '{found}'"),
			UnexpectedGenericArguments => write!(f, "generic arguments are not valid here"),
			UnknownIdentifier(name) => write!(f, "unknown identifier '{name}'"),
			UnknownType(name) => write!(f, "unknown type '{name}'"),
			UnknownMember { type_name, member } => write!(f, "type '{type_name}' has no member '{member}'"),
			NoMatchingOverload { name, arguments } => {
				write!(f, "no overload of '{name}' matches arguments ({arguments})")
			}
			AmbiguousOverload { name, candidates } => {
				write!(f, "ambiguous call to '{name}'; candidates: {}", candidates.join(", "))
			}
			Redeclaration { name, original } => {
				write!(f, "'{name}' is already declared at {original}")
			}
			FunctionAsValue(name) => write!(f, "function '{name}' used as a value"),
			NotCallable(name) => write!(f, "'{name}' is not callable"),
			TypeMismatch { expected, found } => write!(f, "expected type {expected}, found {found}"),
			InvalidOperands { operator, left, right } => {
				write!(f, "operator '{operator}' cannot be applied to {left} and {right}")
			}
			InvalidUnaryOperand { operator, operand } => {
				write!(f, "operator '{operator}' cannot be applied to {operand}")
			}
			InvalidCast { from, to } => write!(f, "cannot cast {from} to {to}"),
			ConditionNotBool(found) => write!(f, "condition must be bool, found {found}"),
			ReturnTypeMismatch { expected, found } => {
				write!(f, "return type mismatch: expected {expected}, found {found}")
			}
			NotAssignable(what) => write!(f, "{what} is not assignable"),
			NotReadable(what) => write!(f, "{what} has no readable value"),
			VoidValue => write!(f, "expression has no value"),
			ConstantRequired => write!(f, "constant expression required"),
			NotIndexable(ty) => write!(f, "type {ty} cannot be indexed"),
			NotConstructible(ty) => write!(f, "type {ty} has no accessible constructor"),
			BreakOutsideLoop => write!(f, "'break' outside of a loop"),
			ContinueOutsideLoop => write!(f, "'continue' outside of a loop"),
		}
	}
}

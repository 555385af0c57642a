//! Converts raw script text into a lazy token sequence.
//!
//! The lexer is restartable from the start: constructing one is cheap and
//! holds only an iterator over the source. It recognizes the fixed keyword
//! set and any type name previously registered in the host binding registry,
//! so downstream stages see `Keyword`/`Type` tokens instead of raw names.
//!
//! Comments are emitted as tokens rather than discarded here; dropping them
//! is a normalizer stage's job, which keeps source positions honest for
//! every stage in between.

pub mod token;

use std::{iter::Peekable, str::CharIndices};

use crate::{
	error::compile::{diagnostic, CompileError, CompileErrorKind::*},
	lexer::token::{Keyword, LiteralValue, Operator, Separator, SourcePos, Token, TokenKind},
	registry::HostRegistry,
	stream::TokenSource,
	types::ScriptType,
};

/// A lexer over one script source.
pub struct Lexer<'a> {
	chars:    Peekable<CharIndices<'a>>,
	line:     u32,
	column:   u32,
	registry: &'a HostRegistry,
	eof_pos:  Option<SourcePos>,
}

impl<'a> Lexer<'a> {
	pub fn new(source: &'a str, registry: &'a HostRegistry) -> Self {
		Self::with_position(source, registry, SourcePos::start())
	}

	/// Start lexing with a position offset; used for embedded interpolation
	/// arguments so their tokens point back into the enclosing literal.
	pub fn with_position(source: &'a str, registry: &'a HostRegistry, at: SourcePos) -> Self {
		Self { chars: source.char_indices().peekable(), line: at.line, column: at.column, registry, eof_pos: None }
	}

	fn advance(&mut self) -> Option<char> {
		let (_, c) = self.chars.next()?;
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn peek(&mut self) -> Option<char> { self.chars.peek().map(|&(_, c)| c) }

	fn peek_nth(&self, n: usize) -> Option<char> {
		let mut it = self.chars.clone();
		for _ in 0..n {
			it.next()?;
		}
		it.next().map(|(_, c)| c)
	}

	fn peek_second(&self) -> Option<char> { self.peek_nth(1) }

	/// Consume the next character if it is the expected one.
	fn match_next(&mut self, expected: char) -> bool {
		matches!(self.peek(), Some(c) if c == expected && { self.advance(); true })
	}

	fn pos(&self) -> SourcePos { SourcePos::new(self.line, self.column) }

	fn scan_token(&mut self) -> Result<Token, CompileError> {
		while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
			self.advance();
		}
		let start = self.pos();
		let Some(c) = self.advance() else {
			let pos = *self.eof_pos.get_or_insert(start);
			return Ok(Token::new(TokenKind::Eof, pos));
		};

		use Operator::*;
		use Separator::*;
		let kind = match c {
			'(' => TokenKind::Separator(LeftParen),
			')' => TokenKind::Separator(RightParen),
			'{' => TokenKind::Separator(LeftBrace),
			'}' => TokenKind::Separator(RightBrace),
			'[' => TokenKind::Separator(LeftBracket),
			']' => TokenKind::Separator(RightBracket),
			',' => TokenKind::Separator(Comma),
			';' => TokenKind::Separator(Semicolon),
			':' => TokenKind::Separator(Colon),
			'~' => TokenKind::Operator(BitNot),
			'.' => TokenKind::Operator(Dot),
			'=' => {
				if self.match_next('=') {
					TokenKind::Operator(Equal)
				} else if self.match_next('>') {
					TokenKind::Separator(Arrow)
				} else {
					TokenKind::Operator(Assign)
				}
			}
			'+' => {
				if self.match_next('+') {
					TokenKind::Operator(Increment)
				} else if self.match_next('=') {
					TokenKind::Operator(PlusAssign)
				} else {
					TokenKind::Operator(Plus)
				}
			}
			'-' => {
				if self.match_next('-') {
					TokenKind::Operator(Decrement)
				} else if self.match_next('=') {
					TokenKind::Operator(MinusAssign)
				} else {
					TokenKind::Operator(MinusAmbiguous)
				}
			}
			'*' => {
				if self.match_next('=') {
					TokenKind::Operator(StarAssign)
				} else {
					TokenKind::Operator(Star)
				}
			}
			'%' => {
				if self.match_next('=') {
					TokenKind::Operator(PercentAssign)
				} else {
					TokenKind::Operator(Percent)
				}
			}
			'!' => {
				if self.match_next('=') {
					TokenKind::Operator(NotEqual)
				} else {
					TokenKind::Operator(Not)
				}
			}
			'<' => {
				if self.match_next('<') {
					if self.match_next('=') {
						TokenKind::Operator(ShlAssign)
					} else {
						TokenKind::Operator(Shl)
					}
				} else if self.match_next('=') {
					TokenKind::Operator(LessEqual)
				} else {
					TokenKind::Operator(Less)
				}
			}
			'>' => {
				if self.match_next('>') {
					if self.match_next('=') {
						TokenKind::Operator(ShrAssign)
					} else {
						TokenKind::Operator(Shr)
					}
				} else if self.match_next('=') {
					TokenKind::Operator(GreaterEqual)
				} else {
					TokenKind::Operator(Greater)
				}
			}
			'&' => {
				if self.match_next('&') {
					TokenKind::Operator(AndAnd)
				} else if self.match_next('=') {
					TokenKind::Operator(BitAndAssign)
				} else {
					TokenKind::Operator(BitAnd)
				}
			}
			'|' => {
				if self.match_next('|') {
					TokenKind::Operator(OrOr)
				} else if self.match_next('=') {
					TokenKind::Operator(BitOrAssign)
				} else {
					TokenKind::Operator(BitOr)
				}
			}
			'^' => {
				if self.match_next('=') {
					TokenKind::Operator(BitXorAssign)
				} else {
					TokenKind::Operator(BitXor)
				}
			}
			'?' => {
				if self.match_next('?') {
					TokenKind::Operator(NullCoalesce)
				} else {
					TokenKind::Operator(Question)
				}
			}
			'/' => {
				if self.match_next('/') {
					while self.peek().is_some_and(|c| c != '\n') {
						self.advance();
					}
					TokenKind::Comment
				} else if self.match_next('*') {
					self.block_comment(start)?
				} else if self.match_next('=') {
					TokenKind::Operator(SlashAssign)
				} else {
					TokenKind::Operator(Slash)
				}
			}
			'"' | '\'' => self.string(c, start)?,
			'$' => self.interpolated(start)?,
			c if c.is_ascii_digit() => self.number(c, start)?,
			c if c.is_ascii_alphabetic() || c == '_' => self.identifier(c),
			c => return Err(diagnostic(start, UnexpectedCharacter(c))),
		};
		Ok(Token::new(kind, start))
	}

	fn block_comment(&mut self, start: SourcePos) -> Result<TokenKind, CompileError> {
		while let Some(c) = self.advance() {
			if c == '*' && self.match_next('/') {
				return Ok(TokenKind::Comment);
			}
		}
		Err(diagnostic(start, UnterminatedBlockComment))
	}

	// -- identifiers and names ------------------------------------------------

	fn identifier(&mut self, first: char) -> TokenKind {
		let mut name = String::new();
		name.push(first);
		while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
			if let Some(c) = self.advance() {
				name.push(c);
			}
		}
		match name.as_str() {
			"true" => return TokenKind::Literal(LiteralValue::Bool(true)),
			"false" => return TokenKind::Literal(LiteralValue::Bool(false)),
			"null" => return TokenKind::Literal(LiteralValue::Null),
			_ => {}
		}
		if let Some(kw) = Keyword::from_text(&name) {
			return TokenKind::Keyword(kw);
		}
		if let Some(ty) = primitive_type(&name) {
			return TokenKind::Type(ty);
		}
		if let Some(ty) = self.registry.lookup_name(&name) {
			return TokenKind::Type(ty);
		}
		TokenKind::Identifier { name, generic_args: Vec::new() }
	}

	// -- numeric literals -----------------------------------------------------

	fn number(&mut self, first: char, start: SourcePos) -> Result<TokenKind, CompileError> {
		if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
			self.advance();
			return self.radix_number(16, start);
		}
		if first == '0' && matches!(self.peek(), Some('b' | 'B')) {
			self.advance();
			return self.radix_number(2, start);
		}

		let mut text = String::new();
		text.push(first);
		self.digits_into(&mut text, |c| c.is_ascii_digit());

		let mut is_float = false;
		if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
			is_float = true;
			self.advance();
			text.push('.');
			self.digits_into(&mut text, |c| c.is_ascii_digit());
		}
		let exp_follows = self.peek_second().is_some_and(|c| c.is_ascii_digit())
			|| (matches!(self.peek_second(), Some('+' | '-')) && self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()));
		if matches!(self.peek(), Some('e' | 'E')) && exp_follows {
			is_float = true;
			self.advance();
			text.push('e');
			if matches!(self.peek(), Some('+' | '-')) {
				if let Some(sign) = self.advance() {
					text.push(sign);
				}
			}
			self.digits_into(&mut text, |c| c.is_ascii_digit());
		}

		let suffix = self.suffix_letters().to_ascii_lowercase();
		let digits: String = text.chars().filter(|c| *c != '_').collect();
		let malformed = || diagnostic(start, MalformedNumber(format!("{text}{suffix}")));

		if is_float || matches!(suffix.as_str(), "f" | "m" | "d") {
			if !matches!(suffix.as_str(), "" | "f" | "m" | "d") {
				return Err(malformed());
			}
			let value: f64 = digits.parse().map_err(|_| malformed())?;
			let lit = match suffix.as_str() {
				"f" => LiteralValue::Float(value as f32),
				"m" => LiteralValue::Decimal(value),
				_ => LiteralValue::Double(value),
			};
			return Ok(TokenKind::Literal(lit));
		}

		match digits.parse::<u128>() {
			Ok(value) => self.integer_literal(value, &suffix, Some(&digits), start),
			// wider than u128: only the double fallback remains
			Err(_) if suffix.is_empty() => {
				let value: f64 = digits.parse().map_err(|_| malformed())?;
				Ok(TokenKind::Literal(LiteralValue::Double(value)))
			}
			Err(_) => Err(malformed()),
		}
	}

	fn radix_number(&mut self, radix: u32, start: SourcePos) -> Result<TokenKind, CompileError> {
		let mut text = String::new();
		self.digits_into(&mut text, |c| c.is_digit(radix));
		let suffix = self.suffix_letters().to_ascii_lowercase();
		let digits: String = text.chars().filter(|c| *c != '_').collect();
		let malformed = || diagnostic(start, MalformedNumber(format!("{text}{suffix}")));
		if digits.is_empty() {
			return Err(malformed());
		}
		let value = u128::from_str_radix(&digits, radix).map_err(|_| malformed())?;
		self.integer_literal(value, &suffix, None, start)
	}

	fn digits_into(&mut self, text: &mut String, digit: impl Fn(char) -> bool) {
		while self.peek().is_some_and(|c| digit(c) || c == '_') {
			if let Some(c) = self.advance() {
				text.push(c);
			}
		}
	}

	fn suffix_letters(&mut self) -> String {
		let mut suffix = String::new();
		while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
			if let Some(c) = self.advance() {
				suffix.push(c);
			}
		}
		suffix
	}

	/// Suffix rules, then the narrowest of int, uint, long, ulong (and
	/// double, for base-10) that holds the value.
	fn integer_literal(
		&self,
		value: u128,
		suffix: &str,
		double_fallback: Option<&str>,
		start: SourcePos,
	) -> Result<TokenKind, CompileError> {
		let malformed = || diagnostic(start, MalformedNumber(value.to_string()));
		let lit = match suffix {
			"" => {
				if value <= i32::MAX as u128 {
					LiteralValue::Int(value as i32)
				} else if value <= u32::MAX as u128 {
					LiteralValue::Uint(value as u32)
				} else if value <= i64::MAX as u128 {
					LiteralValue::Long(value as i64)
				} else if value <= u64::MAX as u128 {
					LiteralValue::Ulong(value as u64)
				} else if let Some(text) = double_fallback {
					LiteralValue::Double(text.parse().map_err(|_| malformed())?)
				} else {
					return Err(malformed());
				}
			}
			"u" => {
				if value <= u32::MAX as u128 {
					LiteralValue::Uint(value as u32)
				} else if value <= u64::MAX as u128 {
					LiteralValue::Ulong(value as u64)
				} else {
					return Err(malformed());
				}
			}
			"l" => {
				if value <= i64::MAX as u128 {
					LiteralValue::Long(value as i64)
				} else if value <= u64::MAX as u128 {
					LiteralValue::Ulong(value as u64)
				} else {
					return Err(malformed());
				}
			}
			"ul" | "lu" => {
				if value <= u64::MAX as u128 {
					LiteralValue::Ulong(value as u64)
				} else {
					return Err(malformed());
				}
			}
			_ => return Err(malformed()),
		};
		Ok(TokenKind::Literal(lit))
	}

	// -- string literals ------------------------------------------------------

	fn escape(&mut self, start: SourcePos) -> Result<char, CompileError> {
		let at = self.pos();
		match self.advance() {
			Some('\\') => Ok('\\'),
			Some('\'') => Ok('\''),
			Some('"') => Ok('"'),
			Some('n') => Ok('\n'),
			Some('r') => Ok('\r'),
			Some('t') => Ok('\t'),
			Some('0') => Ok('\0'),
			Some(c) => Err(diagnostic(at, InvalidEscape(c))),
			None => Err(diagnostic(start, UnterminatedString)),
		}
	}

	fn string(&mut self, quote: char, start: SourcePos) -> Result<TokenKind, CompileError> {
		let mut value = String::new();
		loop {
			match self.advance() {
				None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
				Some('\\') => value.push(self.escape(start)?),
				Some(c) if c == quote => break,
				Some(c) => value.push(c),
			}
		}
		if quote == '\'' {
			let mut chars = value.chars();
			if let (Some(c), None) = (chars.next(), chars.next()) {
				return Ok(TokenKind::Literal(LiteralValue::Char(c)));
			}
		}
		Ok(TokenKind::Literal(LiteralValue::Str(value)))
	}

	// -- interpolated strings -------------------------------------------------

	/// `$"..."`: the literal text becomes a format template with positional
	/// placeholders; every embedded argument is lexed recursively into its
	/// own token sequence, with nested brackets tracked so inner `{}`/`()`/
	/// `[]` pairs do not terminate it. A top-level `:` or `,` ends the
	/// argument and the remainder up to `}` is kept as format text.
	fn interpolated(&mut self, start: SourcePos) -> Result<TokenKind, CompileError> {
		if !self.match_next('"') {
			return Err(diagnostic(start, UnexpectedCharacter('$')));
		}
		let mut template = String::new();
		let mut args: Vec<Vec<Token>> = Vec::new();
		loop {
			match self.advance() {
				None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
				Some('"') => return Ok(TokenKind::Interpolated { template, args }),
				Some('\\') => template.push(self.escape(start)?),
				Some('{') if self.peek() == Some('{') => {
					self.advance();
					template.push_str("{{");
				}
				Some('{') => {
					let arg_pos = self.pos();
					let (source, format) = self.embedded_argument(start)?;
					let tokens = sub_lex(&source, self.registry, arg_pos)?;
					if tokens.is_empty() {
						return Err(diagnostic(arg_pos, MalformedInterpolation));
					}
					template.push('{');
					template.push_str(&args.len().to_string());
					template.push_str(&format);
					template.push('}');
					args.push(tokens);
				}
				Some('}') if self.peek() == Some('}') => {
					self.advance();
					template.push_str("}}");
				}
				Some('}') => return Err(diagnostic(start, MalformedInterpolation)),
				Some(c) => template.push(c),
			}
		}
	}

	/// Collect the raw source of one embedded argument up to a top-level
	/// `}`, `:` or `,`; returns the source and the format suffix.
	fn embedded_argument(&mut self, start: SourcePos) -> Result<(String, String), CompileError> {
		let mut source = String::new();
		let mut depth = 0usize;
		loop {
			match self.advance() {
				None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
				Some('}') if depth == 0 => return Ok((source, String::new())),
				Some(c @ (':' | ',')) if depth == 0 => {
					let mut format = String::new();
					format.push(c);
					loop {
						match self.advance() {
							None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
							Some('}') => return Ok((source, format)),
							Some(c) => format.push(c),
						}
					}
				}
				Some(c @ ('(' | '[' | '{')) => {
					depth += 1;
					source.push(c);
				}
				Some(c @ (')' | ']' | '}')) => {
					depth = depth.saturating_sub(1);
					source.push(c);
				}
				Some(c @ ('"' | '\'')) => {
					source.push(c);
					self.copy_quoted_raw(&mut source, c, start)?;
				}
				Some('$') if self.peek() == Some('"') => {
					source.push('$');
					self.advance();
					source.push('"');
					self.copy_interpolated_raw(&mut source, start)?;
				}
				Some(c) => source.push(c),
			}
		}
	}

	/// Copy a quoted literal verbatim; the opening quote is already copied.
	fn copy_quoted_raw(&mut self, out: &mut String, quote: char, start: SourcePos) -> Result<(), CompileError> {
		loop {
			match self.advance() {
				None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
				Some('\\') => {
					out.push('\\');
					match self.advance() {
						None => return Err(diagnostic(start, UnterminatedString)),
						Some(e) => out.push(e),
					}
				}
				Some(c) => {
					out.push(c);
					if c == quote {
						return Ok(());
					}
				}
			}
		}
	}

	/// Copy a nested `$"..."` verbatim, tracking its own brace arguments so
	/// an inner `"` or `}` does not end the outer collection early.
	fn copy_interpolated_raw(&mut self, out: &mut String, start: SourcePos) -> Result<(), CompileError> {
		loop {
			match self.advance() {
				None | Some('\n') => return Err(diagnostic(start, UnterminatedString)),
				Some('"') => {
					out.push('"');
					return Ok(());
				}
				Some('\\') => {
					out.push('\\');
					match self.advance() {
						None => return Err(diagnostic(start, UnterminatedString)),
						Some(e) => out.push(e),
					}
				}
				Some('{') if self.peek() == Some('{') => {
					self.advance();
					out.push_str("{{");
				}
				Some('{') => {
					out.push('{');
					let mut depth = 0usize;
					loop {
						match self.advance() {
							None => return Err(diagnostic(start, UnterminatedString)),
							Some('}') if depth == 0 => {
								out.push('}');
								break;
							}
							Some(c @ ('(' | '[' | '{')) => {
								depth += 1;
								out.push(c);
							}
							Some(c @ (')' | ']' | '}')) => {
								depth = depth.saturating_sub(1);
								out.push(c);
							}
							Some(c @ ('"' | '\'')) => {
								out.push(c);
								self.copy_quoted_raw(out, c, start)?;
							}
							Some('$') if self.peek() == Some('"') => {
								out.push('$');
								self.advance();
								out.push('"');
								self.copy_interpolated_raw(out, start)?;
							}
							Some(c) => out.push(c),
						}
					}
				}
				Some(c) => out.push(c),
			}
		}
	}
}

impl TokenSource for Lexer<'_> {
	fn next_token(&mut self) -> Result<Token, CompileError> { self.scan_token() }
}

fn primitive_type(name: &str) -> Option<ScriptType> {
	use ScriptType::*;
	Some(match name {
		"bool" => Bool,
		"int" => Int,
		"uint" => Uint,
		"long" => Long,
		"ulong" => Ulong,
		"float" => Float,
		"double" => Double,
		"decimal" => Decimal,
		"char" => Char,
		"string" => Str,
		_ => return None,
	})
}

/// Lex an embedded interpolation argument into its own token list.
fn sub_lex(source: &str, registry: &HostRegistry, at: SourcePos) -> Result<Vec<Token>, CompileError> {
	let mut lexer = Lexer::with_position(source, registry, at);
	let mut tokens = Vec::new();
	loop {
		let token = lexer.scan_token()?;
		if matches!(token.kind, TokenKind::Eof) {
			return Ok(tokens);
		}
		tokens.push(token);
	}
}

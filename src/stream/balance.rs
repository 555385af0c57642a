//! Paren/brace/bracket balance check: every opener pushes its expected
//! closer on a stack, every closer pops and validates. A mismatch names the
//! offending closer; an unclosed opener at end of stream names the opener.

use crate::{
	error::compile::{diagnostic, CompileError, CompileErrorKind},
	lexer::token::{Separator, Token, TokenKind},
	stream::TokenSource,
};

pub struct CheckBalance<S> {
	inner: S,
	stack: Vec<(Separator, Token)>,
}

impl<S: TokenSource> CheckBalance<S> {
	pub fn new(inner: S) -> Self { Self { inner, stack: Vec::new() } }
}

impl<S: TokenSource> TokenSource for CheckBalance<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		let token = self.inner.next_token()?;
		match &token.kind {
			TokenKind::Separator(sep @ (Separator::LeftParen | Separator::LeftBrace | Separator::LeftBracket)) => {
				let closer = match sep {
					Separator::LeftParen => Separator::RightParen,
					Separator::LeftBrace => Separator::RightBrace,
					_ => Separator::RightBracket,
				};
				self.stack.push((closer, token.clone()));
			}
			TokenKind::Separator(
				sep @ (Separator::RightParen | Separator::RightBrace | Separator::RightBracket),
			) => match self.stack.pop() {
				Some((expected, _)) if expected == *sep => {}
				_ => {
					return Err(diagnostic(
						token.pos,
						CompileErrorKind::UnbalancedDelimiter(sep.symbol().to_string()),
					));
				}
			},
			TokenKind::Eof => {
				if let Some((_, opener)) = self.stack.last() {
					return Err(diagnostic(
						opener.pos,
						CompileErrorKind::UnclosedDelimiter(opener.describe()),
					));
				}
			}
			_ => {}
		}
		Ok(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{Separator::*, TokenKind::*}, stream::testutil::{drain, VecSource}};

	fn check(kinds: Vec<TokenKind>) -> Result<Vec<TokenKind>, CompileError> {
		let mut stage = CheckBalance::new(VecSource::new(kinds));
		drain(&mut stage)
	}

	#[test]
	fn accepts_balanced_nesting() {
		assert!(check(vec![
			Separator(LeftParen),
			Separator(LeftBracket),
			TokenKind::identifier("a"),
			Separator(LeftBrace),
			TokenKind::identifier("b"),
			Separator(RightBrace),
			Separator(RightBracket),
			Separator(RightParen),
		])
		.is_ok());
	}

	#[test]
	fn rejects_wrongly_nested() {
		// "(a]"
		assert!(check(vec![
			Separator(LeftParen),
			TokenKind::identifier("a"),
			Separator(RightBracket),
		])
		.is_err());
	}

	#[test]
	fn rejects_unclosed_at_end() {
		assert!(check(vec![Separator(LeftBrace)]).is_err());
	}

	#[test]
	fn rejects_stray_closer() {
		assert!(check(vec![Separator(RightParen)]).is_err());
	}

	#[test]
	fn accepts_empty_stream() {
		assert!(check(vec![]).is_ok());
	}
}

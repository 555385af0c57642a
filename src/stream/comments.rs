//! Comment removal. The lexer keeps comments as tokens so every earlier
//! stage sees true source positions; they stop here.

use crate::{error::compile::CompileError, lexer::token::{Token, TokenKind}, stream::TokenSource};

pub struct StripComments<S> {
	inner: S,
}

impl<S: TokenSource> StripComments<S> {
	pub fn new(inner: S) -> Self { Self { inner } }
}

impl<S: TokenSource> TokenSource for StripComments<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		loop {
			let token = self.inner.next_token()?;
			if !matches!(token.kind, TokenKind::Comment) {
				return Ok(token);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{LiteralValue, TokenKind::*}, stream::testutil::{drain, VecSource}};

	#[test]
	fn drops_comments_only() {
		let source = VecSource::new(vec![
			Comment,
			Literal(LiteralValue::Int(1)),
			Comment,
			Comment,
			Literal(LiteralValue::Int(2)),
		]);
		let mut stage = StripComments::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Literal(LiteralValue::Int(1)), Literal(LiteralValue::Int(2))]);
	}
}

//! else-if folding: an `else` immediately followed by `if` becomes a single
//! `elseif` keyword token, so the parser sees flat conditional chains.

use crate::{
	error::compile::CompileError,
	lexer::token::{Keyword, Token, TokenKind},
	stream::TokenSource,
};

pub struct FoldElseIf<S> {
	inner: S,
	held:  Option<Token>,
}

impl<S: TokenSource> FoldElseIf<S> {
	pub fn new(inner: S) -> Self { Self { inner, held: None } }
}

impl<S: TokenSource> TokenSource for FoldElseIf<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		let token = match self.held.take() {
			Some(token) => token,
			None => self.inner.next_token()?,
		};
		if !matches!(token.kind, TokenKind::Keyword(Keyword::Else)) {
			return Ok(token);
		}
		let next = self.inner.next_token()?;
		if matches!(next.kind, TokenKind::Keyword(Keyword::If)) {
			return Ok(Token::new(TokenKind::Keyword(Keyword::ElseIf), token.pos));
		}
		self.held = Some(next);
		Ok(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{Keyword::*, Separator, TokenKind::*}, stream::testutil::{drain, VecSource}};

	#[test]
	fn folds_else_if() {
		let source = VecSource::new(vec![Keyword(Else), Keyword(If), Separator(Separator::LeftParen)]);
		let mut stage = FoldElseIf::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Keyword(ElseIf), Separator(Separator::LeftParen)]);
	}

	#[test]
	fn keeps_else_before_block() {
		// else { if ... }: the brace intervenes, nothing folds
		let source = VecSource::new(vec![Keyword(Else), Separator(Separator::LeftBrace), Keyword(If)]);
		let mut stage = FoldElseIf::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Keyword(Else), Separator(Separator::LeftBrace), Keyword(If)]);
	}

	#[test]
	fn folds_chained_else_if() {
		let source = VecSource::new(vec![Keyword(Else), Keyword(If), Keyword(Else), Keyword(If)]);
		let mut stage = FoldElseIf::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Keyword(ElseIf), Keyword(ElseIf)]);
	}
}

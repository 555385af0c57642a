//! Ambiguous-minus resolution. A `-` after an operator, an opening
//! separator, a comma, or at the start of the stream is unary negation;
//! otherwise it is binary subtraction. Only the immediately preceding token
//! is consulted.

use crate::{
	error::compile::CompileError,
	lexer::token::{Keyword, Operator, Separator, Token, TokenKind},
	stream::TokenSource,
};

pub struct ResolveMinus<S> {
	inner: S,
	prev:  Option<TokenKind>,
}

impl<S: TokenSource> ResolveMinus<S> {
	pub fn new(inner: S) -> Self { Self { inner, prev: None } }

	fn unary_context(prev: Option<&TokenKind>) -> bool {
		match prev {
			None => true,
			Some(TokenKind::Operator(_)) | Some(TokenKind::Cast(_)) => true,
			Some(TokenKind::Separator(sep)) => matches!(
				sep,
				Separator::LeftParen
					| Separator::LeftBracket
					| Separator::LeftBrace
					| Separator::Comma
					| Separator::Colon
					| Separator::Semicolon
					| Separator::Arrow
			),
			Some(TokenKind::Keyword(kw)) => matches!(kw, Keyword::Return | Keyword::Case | Keyword::In),
			_ => false,
		}
	}
}

impl<S: TokenSource> TokenSource for ResolveMinus<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		let mut token = self.inner.next_token()?;
		if matches!(token.kind, TokenKind::Operator(Operator::MinusAmbiguous)) {
			let resolved = if Self::unary_context(self.prev.as_ref()) {
				Operator::Negate
			} else {
				Operator::Minus
			};
			token.kind = TokenKind::Operator(resolved);
		}
		self.prev = Some(token.kind.clone());
		Ok(token)
	}
}

//! Cast recognition: a sliding window turns `( Type )` immediately followed
//! by an operand into a single cast-operation token; any other shape passes
//! through untouched.

use std::collections::VecDeque;

use crate::{
	error::compile::CompileError,
	lexer::token::{Keyword, Operator, Separator, Token, TokenKind},
	stream::TokenSource,
};

pub struct RecognizeCasts<S> {
	inner:  S,
	window: VecDeque<Token>,
}

impl<S: TokenSource> RecognizeCasts<S> {
	pub fn new(inner: S) -> Self { Self { inner, window: VecDeque::new() } }

	/// Whether a token can begin the operand a cast applies to.
	fn starts_operand(kind: &TokenKind) -> bool {
		match kind {
			TokenKind::Literal(_)
			| TokenKind::Identifier { .. }
			| TokenKind::Type(_)
			| TokenKind::Cast(_)
			| TokenKind::Separator(Separator::LeftParen)
			| TokenKind::Keyword(Keyword::New) => true,
			TokenKind::Operator(op) => matches!(
				op,
				Operator::Not | Operator::BitNot | Operator::Negate | Operator::Increment | Operator::Decrement
			),
			_ => false,
		}
	}

	fn fill(&mut self) -> Result<(), CompileError> {
		while self.window.len() < 4 {
			let token = self.inner.next_token()?;
			let eof = matches!(token.kind, TokenKind::Eof);
			self.window.push_back(token);
			if eof {
				break;
			}
		}
		Ok(())
	}
}

impl<S: TokenSource> TokenSource for RecognizeCasts<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		self.fill()?;
		if self.window.len() == 4
			&& matches!(self.window[0].kind, TokenKind::Separator(Separator::LeftParen))
			&& matches!(self.window[1].kind, TokenKind::Type(_))
			&& matches!(self.window[2].kind, TokenKind::Separator(Separator::RightParen))
			&& Self::starts_operand(&self.window[3].kind)
		{
			let pos = self.window[0].pos;
			self.window.pop_front();
			let ty = match self.window.pop_front().map(|t| t.kind) {
				Some(TokenKind::Type(ty)) => ty,
				_ => return Err(anyhow::anyhow!("cast window lost its type token").into()),
			};
			self.window.pop_front();
			return Ok(Token::new(TokenKind::Cast(ty), pos));
		}
		match self.window.pop_front() {
			Some(token) => Ok(token),
			None => Err(anyhow::anyhow!("token window drained past end of input").into()),
		}
	}
}

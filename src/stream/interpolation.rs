//! Interpolated-string expansion.
//!
//! Rewrites each interpolated-string token into the token sequence of an
//! equivalent formatting call: `format("...{0}...", arg0, arg1)`. Placeholder
//! indices were assigned by the lexer; this stage only lays out the call and
//! recurses into arguments so nested interpolation expands too.

use std::collections::VecDeque;

use crate::{
	error::compile::CompileError,
	lexer::token::{LiteralValue, Separator, Token, TokenKind},
	stream::TokenSource,
};

pub struct ExpandInterpolation<S> {
	inner:   S,
	pending: VecDeque<Token>,
}

impl<S: TokenSource> ExpandInterpolation<S> {
	pub fn new(inner: S) -> Self { Self { inner, pending: VecDeque::new() } }

	fn expand(token: Token, out: &mut VecDeque<Token>) {
		let pos = token.pos;
		let TokenKind::Interpolated { template, args } = token.kind else {
			out.push_back(token);
			return;
		};
		out.push_back(Token::new(TokenKind::identifier("format"), pos));
		out.push_back(Token::new(TokenKind::Separator(Separator::LeftParen), pos));
		out.push_back(Token::new(TokenKind::Literal(LiteralValue::Str(template)), pos));
		for arg in args {
			out.push_back(Token::new(TokenKind::Separator(Separator::Comma), pos));
			for token in arg {
				Self::expand(token, out);
			}
		}
		out.push_back(Token::new(TokenKind::Separator(Separator::RightParen), pos));
	}
}

impl<S: TokenSource> TokenSource for ExpandInterpolation<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		if let Some(token) = self.pending.pop_front() {
			return Ok(token);
		}
		let token = self.inner.next_token()?;
		if !matches!(token.kind, TokenKind::Interpolated { .. }) {
			return Ok(token);
		}
		Self::expand(token, &mut self.pending);
		match self.pending.pop_front() {
			Some(token) => Ok(token),
			None => self.next_token(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{SourcePos, TokenKind::*}, stream::testutil::{drain, VecSource}};

	fn interp(template: &str, args: Vec<Vec<TokenKind>>) -> TokenKind {
		Interpolated {
			template: template.to_string(),
			args:     args
				.into_iter()
				.map(|kinds| {
					kinds.into_iter().map(|k| Token::new(k, SourcePos::start())).collect::<Vec<_>>()
				})
				.collect(),
		}
	}

	#[test]
	fn expands_to_format_call() {
		let source = VecSource::new(vec![interp("v = {0}", vec![vec![TokenKind::identifier("x")]])]);
		let mut stage = ExpandInterpolation::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![
			TokenKind::identifier("format"),
			Separator(crate::lexer::token::Separator::LeftParen),
			Literal(LiteralValue::Str("v = {0}".into())),
			Separator(crate::lexer::token::Separator::Comma),
			TokenKind::identifier("x"),
			Separator(crate::lexer::token::Separator::RightParen),
		]);
	}

	#[test]
	fn recurses_into_nested_interpolation() {
		let inner = interp("{0}", vec![vec![Literal(LiteralValue::Int(1))]]);
		let source = VecSource::new(vec![interp("n = {0}", vec![vec![inner]])]);
		let mut stage = ExpandInterpolation::new(source);
		let kinds = drain(&mut stage).unwrap();
		// two format identifiers: outer call and expanded inner argument
		let formats = kinds
			.iter()
			.filter(|k| matches!(k, Identifier { name, .. } if name == "format"))
			.count();
		assert_eq!(formats, 2);
	}

	#[test]
	fn passes_other_tokens_through() {
		let source = VecSource::new(vec![Literal(LiteralValue::Int(7)), Comment]);
		let mut stage = ExpandInterpolation::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Literal(LiteralValue::Int(7)), Comment]);
	}
}

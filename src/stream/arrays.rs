//! Array-type folding: a `Type` token immediately followed by `[` `]`
//! becomes a single array-type token. One token of lookahead is held in a
//! small buffer and re-emitted verbatim when the shape does not match.

use std::collections::VecDeque;

use crate::{
	error::compile::CompileError,
	lexer::token::{Separator, Token, TokenKind},
	stream::TokenSource,
	types::ScriptType,
};

pub struct FoldArrayTypes<S> {
	inner:   S,
	pending: VecDeque<Token>,
}

impl<S: TokenSource> FoldArrayTypes<S> {
	pub fn new(inner: S) -> Self { Self { inner, pending: VecDeque::new() } }
}

impl<S: TokenSource> TokenSource for FoldArrayTypes<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		if let Some(token) = self.pending.pop_front() {
			return Ok(token);
		}
		let mut token = self.inner.next_token()?;
		loop {
			let TokenKind::Type(ty) = &token.kind else {
				break;
			};
			let elem = ty.clone();
			let open = self.inner.next_token()?;
			if !matches!(open.kind, TokenKind::Separator(Separator::LeftBracket)) {
				self.pending.push_back(open);
				break;
			}
			let close = self.inner.next_token()?;
			if !matches!(close.kind, TokenKind::Separator(Separator::RightBracket)) {
				self.pending.push_back(open);
				self.pending.push_back(close);
				break;
			}
			token.kind = TokenKind::Type(ScriptType::array(elem));
		}
		Ok(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{LiteralValue, Separator::*, TokenKind::*}, stream::testutil::{drain, VecSource}};

	#[test]
	fn folds_array_type() {
		let source =
			VecSource::new(vec![Type(ScriptType::Int), Separator(LeftBracket), Separator(RightBracket)]);
		let mut stage = FoldArrayTypes::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Type(ScriptType::array(ScriptType::Int))]);
	}

	#[test]
	fn folds_nested_arrays() {
		let source = VecSource::new(vec![
			Type(ScriptType::Double),
			Separator(LeftBracket),
			Separator(RightBracket),
			Separator(LeftBracket),
			Separator(RightBracket),
		]);
		let mut stage = FoldArrayTypes::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Type(ScriptType::array(ScriptType::array(ScriptType::Double)))]);
	}

	#[test]
	fn reemits_buffered_tokens_on_mismatch() {
		// indexing: int[0] must stay four tokens
		let source = VecSource::new(vec![
			Type(ScriptType::Int),
			Separator(LeftBracket),
			Literal(LiteralValue::Int(0)),
			Separator(RightBracket),
		]);
		let mut stage = FoldArrayTypes::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![
			Type(ScriptType::Int),
			Separator(LeftBracket),
			Literal(LiteralValue::Int(0)),
			Separator(RightBracket),
		]);
	}

	#[test]
	fn ignores_bracket_without_type() {
		let source = VecSource::new(vec![Separator(LeftBracket), Separator(RightBracket)]);
		let mut stage = FoldArrayTypes::new(source);
		let kinds = drain(&mut stage).unwrap();
		assert_eq!(kinds, vec![Separator(LeftBracket), Separator(RightBracket)]);
	}
}

//! The token-stream normalizer: an ordered pipeline of stream-to-stream
//! rewrites between the lexer and the parser.
//!
//! Each stage is an adapter over [`TokenSource`] that consumes the previous
//! stage's lazy sequence and produces a new one; none assumes random access,
//! and each is testable on its own against a canned token list. Order is
//! significant: interpolation expansion can synthesize tokens that comment
//! removal must never see, array folding must finish before generic
//! collapsing so `List<int[]>` sees `int[]` as one type token, and cast
//! recognition runs last over fully resolved type tokens.

pub mod arrays;
pub mod balance;
pub mod casts;
pub mod comments;
pub mod elseif;
pub mod generics;
pub mod interpolation;
pub mod minus;

use crate::{error::compile::CompileError, lexer::token::Token};

/// A lazy, fallible sequence of tokens ending in a sticky `Eof`.
pub trait TokenSource {
	fn next_token(&mut self) -> Result<Token, CompileError>;
}

/// Compose the full normalizer over a raw token source, in pipeline order.
pub fn normalize(source: impl TokenSource) -> impl TokenSource {
	let stage = interpolation::ExpandInterpolation::new(source);
	let stage = comments::StripComments::new(stage);
	let stage = arrays::FoldArrayTypes::new(stage);
	let stage = elseif::FoldElseIf::new(stage);
	let stage = minus::ResolveMinus::new(stage);
	let stage = balance::CheckBalance::new(stage);
	let stage = generics::CollapseGenerics::new(stage);
	casts::RecognizeCasts::new(stage)
}

#[cfg(test)]
pub(crate) mod testutil {
	use std::collections::VecDeque;

	use super::TokenSource;
	use crate::{error::compile::CompileError, lexer::token::{SourcePos, Token, TokenKind}};

	/// A token source over a fixed list, for exercising one stage at a time.
	pub(crate) struct VecSource {
		tokens: VecDeque<Token>,
	}

	impl VecSource {
		pub fn new(kinds: Vec<TokenKind>) -> Self {
			let tokens = kinds
				.into_iter()
				.enumerate()
				.map(|(i, kind)| Token::new(kind, SourcePos::new(1, i as u32 + 1)))
				.collect();
			Self { tokens }
		}
	}

	impl TokenSource for VecSource {
		fn next_token(&mut self) -> Result<Token, CompileError> {
			Ok(self.tokens.pop_front().unwrap_or_else(|| Token::new(TokenKind::Eof, SourcePos::start())))
		}
	}

	pub(crate) fn drain(source: &mut impl TokenSource) -> Result<Vec<TokenKind>, CompileError> {
		let mut kinds = Vec::new();
		loop {
			let token = source.next_token()?;
			if matches!(token.kind, TokenKind::Eof) {
				return Ok(kinds);
			}
			kinds.push(token.kind);
		}
	}
}

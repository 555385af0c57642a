//! Generic-argument collapsing.
//!
//! On `Identifier <` or `Type <`, greedily parses a comma-separated list of
//! type tokens up to the matching `>`, recursing for nested `<...>`, and
//! collapses the whole span into one token carrying the resolved argument
//! list. Any failure of the expected shape abandons the attempt and re-emits
//! every buffered token unchanged; nothing is committed speculatively, which
//! is what keeps `a < b` a comparison. A `>>` closes two nesting levels, the
//! way the lexer's maximal munch produced it.

use std::{collections::VecDeque, sync::Arc};

use crate::{
	error::compile::CompileError,
	lexer::token::{Operator, Separator, Token, TokenKind},
	stream::TokenSource,
	types::{HostId, ScriptType},
};

pub struct CollapseGenerics<S> {
	inner:   S,
	pending: VecDeque<Token>,
}

enum Head {
	Ident(String),
	Generic { id: HostId, name: Arc<str> },
}

enum Close {
	/// The list closed with a single `>`.
	One,
	/// The list closed with `>>`, consuming the enclosing level's `>` too.
	Two,
	/// The shape broke; the whole attempt is abandoned.
	Fail,
}

impl<S: TokenSource> CollapseGenerics<S> {
	pub fn new(inner: S) -> Self { Self { inner, pending: VecDeque::new() } }

	fn pull(&mut self, buffer: &mut Vec<Token>) -> Result<Token, CompileError> {
		let token = self.inner.next_token()?;
		buffer.push(token.clone());
		Ok(token)
	}

	/// Parse `T (, T)* >` after a consumed `<`.
	fn arguments(&mut self, args: &mut Vec<ScriptType>, buffer: &mut Vec<Token>) -> Result<Close, CompileError> {
		loop {
			let token = self.pull(buffer)?;
			let (elem, closed) = match token.kind {
				TokenKind::Type(ScriptType::Generic { id, name, args: inner }) if inner.is_empty() => {
					let next = self.pull(buffer)?;
					if !matches!(next.kind, TokenKind::Operator(Operator::Less)) {
						return Ok(Close::Fail);
					}
					let mut nested = Vec::new();
					match self.arguments(&mut nested, buffer)? {
						Close::One => (ScriptType::Generic { id, name, args: nested }, false),
						Close::Two => (ScriptType::Generic { id, name, args: nested }, true),
						Close::Fail => return Ok(Close::Fail),
					}
				}
				TokenKind::Type(ty) => (ty, false),
				_ => return Ok(Close::Fail),
			};
			args.push(elem);
			if closed {
				return Ok(Close::One);
			}
			match self.pull(buffer)?.kind {
				TokenKind::Separator(Separator::Comma) => continue,
				TokenKind::Operator(Operator::Greater) => return Ok(Close::One),
				TokenKind::Operator(Operator::Shr) => return Ok(Close::Two),
				_ => return Ok(Close::Fail),
			}
		}
	}
}

impl<S: TokenSource> TokenSource for CollapseGenerics<S> {
	fn next_token(&mut self) -> Result<Token, CompileError> {
		if let Some(token) = self.pending.pop_front() {
			return Ok(token);
		}
		let head = self.inner.next_token()?;
		let info = match &head.kind {
			TokenKind::Identifier { name, generic_args } if generic_args.is_empty() => {
				Some(Head::Ident(name.clone()))
			}
			TokenKind::Type(ScriptType::Generic { id, name, args }) if args.is_empty() => {
				Some(Head::Generic { id: *id, name: name.clone() })
			}
			_ => None,
		};
		let Some(info) = info else {
			return Ok(head);
		};

		let mut buffer = Vec::new();
		let less = self.pull(&mut buffer)?;
		if !matches!(less.kind, TokenKind::Operator(Operator::Less)) {
			self.pending.extend(buffer);
			return Ok(head);
		}
		let mut args = Vec::new();
		match self.arguments(&mut args, &mut buffer)? {
			Close::One if !args.is_empty() => {
				let kind = match info {
					Head::Ident(name) => TokenKind::Identifier { name, generic_args: args },
					Head::Generic { id, name } => TokenKind::Type(ScriptType::Generic { id, name, args }),
				};
				Ok(Token::new(kind, head.pos))
			}
			_ => {
				self.pending.extend(buffer);
				Ok(head)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{lexer::token::{LiteralValue, Operator::*, TokenKind::*}, stream::testutil::{drain, VecSource}};

	struct ListMarker;
	struct DictMarker;

	fn list_type() -> ScriptType {
		ScriptType::Generic { id: HostId::of::<ListMarker>(), name: Arc::from("List"), args: Vec::new() }
	}

	fn dict_type() -> ScriptType {
		ScriptType::Generic { id: HostId::of::<DictMarker>(), name: Arc::from("Dict"), args: Vec::new() }
	}

	fn collapse(kinds: Vec<TokenKind>) -> Vec<TokenKind> {
		let mut stage = CollapseGenerics::new(VecSource::new(kinds));
		drain(&mut stage).unwrap()
	}

	#[test]
	fn collapses_simple_instantiation() {
		// List<int> becomes one type token with argument [int]
		let kinds =
			collapse(vec![Type(list_type()), Operator(Less), Type(ScriptType::Int), Operator(Greater)]);
		assert_eq!(kinds.len(), 1);
		let Type(ScriptType::Generic { args, .. }) = &kinds[0] else {
			panic!("expected generic type token");
		};
		assert_eq!(args, &vec![ScriptType::Int]);
	}

	#[test]
	fn comparison_is_reemitted_unchanged() {
		// "a < b" is not a generic context
		let original = vec![TokenKind::identifier("a"), Operator(Less), TokenKind::identifier("b")];
		assert_eq!(collapse(original.clone()), original);
	}

	#[test]
	fn literal_argument_fails_the_attempt() {
		let original = vec![TokenKind::identifier("x"), Operator(Less), Literal(LiteralValue::Int(5))];
		assert_eq!(collapse(original.clone()), original);
	}

	#[test]
	fn collapses_nested_with_shift_close() {
		// List<List<int>> ends in a single '>>' token
		let kinds = collapse(vec![
			Type(list_type()),
			Operator(Less),
			Type(list_type()),
			Operator(Less),
			Type(ScriptType::Int),
			Operator(Shr),
		]);
		assert_eq!(kinds.len(), 1);
		let Type(ScriptType::Generic { args, .. }) = &kinds[0] else {
			panic!("expected generic type token");
		};
		assert_eq!(args.len(), 1);
		assert!(matches!(&args[0], ScriptType::Generic { args, .. } if args == &vec![ScriptType::Int]));
	}

	#[test]
	fn collapses_multiple_arguments() {
		let kinds = collapse(vec![
			Type(dict_type()),
			Operator(Less),
			Type(ScriptType::Str),
			Separator(crate::lexer::token::Separator::Comma),
			Type(ScriptType::array(ScriptType::Int)),
			Operator(Greater),
		]);
		assert_eq!(kinds.len(), 1);
		let Type(ScriptType::Generic { args, .. }) = &kinds[0] else {
			panic!("expected generic type token");
		};
		assert_eq!(args, &vec![ScriptType::Str, ScriptType::array(ScriptType::Int)]);
	}

	#[test]
	fn identifier_head_collects_generic_arguments() {
		let kinds = collapse(vec![
			TokenKind::identifier("max"),
			Operator(Less),
			Type(ScriptType::Double),
			Operator(Greater),
		]);
		assert_eq!(kinds.len(), 1);
		let Identifier { name, generic_args } = &kinds[0] else {
			panic!("expected identifier");
		};
		assert_eq!(name, "max");
		assert_eq!(generic_args, &vec![ScriptType::Double]);
	}

	#[test]
	fn unterminated_list_is_reemitted() {
		let original = vec![Type(list_type()), Operator(Less), Type(ScriptType::Int)];
		assert_eq!(collapse(original.clone()), original);
	}
}

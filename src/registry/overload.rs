//! Overload resolution: an explicit scoring of candidate parameter lists
//! against argument types and passing modes, with a deterministic policy:
//! a unique all-exact match wins, otherwise a unique loosely compatible
//! (implicit-widening) match, otherwise the call is ambiguous or unmatched.

use crate::{context::symbols::{Parameter, PassMode}, types::ScriptType};

/// The compile-time view of one call argument.
#[derive(Debug, Clone)]
pub struct ArgInfo {
	pub ty:   ScriptType,
	pub mode: ArgMode,
}

impl ArgInfo {
	pub fn value(ty: ScriptType) -> Self { Self { ty, mode: ArgMode::Value } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
	Value,
	Ref,
	Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
	Exact,
	Loose,
}

/// Anything with a parameter list that overload selection can score.
pub trait Callable {
	fn params(&self) -> &[Parameter];
	fn describe(&self) -> String;
}

impl Callable for crate::context::symbols::FunctionSignature {
	fn params(&self) -> &[Parameter] { &self.params }

	fn describe(&self) -> String { crate::context::symbols::FunctionSignature::describe(self) }
}

impl<C: Callable> Callable for std::sync::Arc<C> {
	fn params(&self) -> &[Parameter] { C::params(self) }

	fn describe(&self) -> String { C::describe(self) }
}

#[derive(Debug, PartialEq)]
pub enum OverloadFailure {
	NoMatch,
	Ambiguous(Vec<String>),
}

/// Score one candidate. `ref`/`out` parameters demand the matching argument
/// mode and an exact type; by-value parameters accept an exact type or a
/// widening conversion. A variadic tail accepts the array itself (exact
/// form) or any number of element-compatible arguments (expanded form,
/// always loose so fixed-arity overloads win ties).
pub fn match_params(params: &[Parameter], args: &[ArgInfo]) -> Option<MatchQuality> {
	let variadic = params.last().is_some_and(|p| p.mode == PassMode::Variadic);
	let fixed = if variadic { params.len() - 1 } else { params.len() };
	if args.len() < fixed || (!variadic && args.len() != params.len()) {
		return None;
	}

	let mut exact = true;
	for (param, arg) in params[..fixed].iter().zip(args) {
		match param.mode {
			PassMode::Ref => {
				if arg.mode != ArgMode::Ref || arg.ty != param.ty {
					return None;
				}
			}
			PassMode::Out => {
				if arg.mode != ArgMode::Out || arg.ty != param.ty {
					return None;
				}
			}
			_ => {
				if arg.mode != ArgMode::Value {
					return None;
				}
				if arg.ty != param.ty {
					if !arg.ty.widens_to(&param.ty) {
						return None;
					}
					exact = false;
				}
			}
		}
	}

	if variadic {
		let tail = &params[fixed];
		let ScriptType::Array(elem) = &tail.ty else {
			return None;
		};
		let passthrough =
			args.len() == params.len() && args[fixed].mode == ArgMode::Value && args[fixed].ty == tail.ty;
		if !passthrough {
			exact = false;
			for arg in &args[fixed..] {
				if arg.mode != ArgMode::Value || !arg.ty.widens_to(elem) {
					return None;
				}
			}
		}
	}

	Some(if exact { MatchQuality::Exact } else { MatchQuality::Loose })
}

/// Pick one candidate from a same-named overload set.
pub fn select_overload<'a, C: Callable>(
	candidates: impl IntoIterator<Item = &'a C>,
	args: &[ArgInfo],
) -> Result<&'a C, OverloadFailure> {
	let mut exact = Vec::new();
	let mut loose = Vec::new();
	for candidate in candidates {
		match match_params(candidate.params(), args) {
			Some(MatchQuality::Exact) => exact.push(candidate),
			Some(MatchQuality::Loose) => loose.push(candidate),
			None => {}
		}
	}
	match exact.len() {
		1 => return Ok(exact[0]),
		0 => {}
		_ => return Err(OverloadFailure::Ambiguous(exact.iter().map(|c| c.describe()).collect())),
	}
	match loose.len() {
		1 => Ok(loose[0]),
		0 => Err(OverloadFailure::NoMatch),
		_ => Err(OverloadFailure::Ambiguous(loose.iter().map(|c| c.describe()).collect())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::symbols::FunctionSignature;

	fn sig(name: &str, params: Vec<Parameter>) -> FunctionSignature {
		FunctionSignature::expected(name, params, ScriptType::Void)
	}

	#[test]
	fn exact_match_beats_loose() {
		let set = vec![
			sig("f", vec![Parameter::by_value("x", ScriptType::Int)]),
			sig("f", vec![Parameter::by_value("x", ScriptType::Double)]),
		];
		let chosen = select_overload(&set, &[ArgInfo::value(ScriptType::Int)]).unwrap();
		assert_eq!(chosen.params[0].ty, ScriptType::Int);
	}

	#[test]
	fn unique_loose_match_is_selected() {
		let set = vec![sig("f", vec![Parameter::by_value("x", ScriptType::Double)])];
		let chosen = select_overload(&set, &[ArgInfo::value(ScriptType::Int)]).unwrap();
		assert_eq!(chosen.params[0].ty, ScriptType::Double);
	}

	#[test]
	fn multiple_loose_matches_are_ambiguous() {
		let set = vec![
			sig("f", vec![Parameter::by_value("x", ScriptType::Long)]),
			sig("f", vec![Parameter::by_value("x", ScriptType::Double)]),
		];
		let failure = select_overload(&set, &[ArgInfo::value(ScriptType::Int)]).unwrap_err();
		let OverloadFailure::Ambiguous(candidates) = failure else {
			panic!("expected ambiguity");
		};
		assert_eq!(candidates.len(), 2);
	}

	#[test]
	fn no_match_reports_failure() {
		let set = vec![sig("f", vec![Parameter::by_value("x", ScriptType::Int)])];
		let failure = select_overload(&set, &[ArgInfo::value(ScriptType::Str)]).unwrap_err();
		assert_eq!(failure, OverloadFailure::NoMatch);
	}

	#[test]
	fn ref_parameters_demand_mode_and_exact_type() {
		let set = vec![sig("f", vec![Parameter::by_ref("x", ScriptType::Int)])];
		assert!(select_overload(&set, &[ArgInfo::value(ScriptType::Int)]).is_err());
		assert!(
			select_overload(&set, &[ArgInfo { ty: ScriptType::Int, mode: ArgMode::Ref }]).is_ok()
		);
		assert!(
			select_overload(&set, &[ArgInfo { ty: ScriptType::Long, mode: ArgMode::Ref }]).is_err()
		);
	}

	#[test]
	fn variadic_accepts_expanded_and_passthrough_forms() {
		let set = vec![sig("f", vec![
			Parameter::by_value("first", ScriptType::Str),
			Parameter::variadic("rest", ScriptType::Double),
		])];
		// expanded
		assert!(select_overload(
			&set,
			&[
				ArgInfo::value(ScriptType::Str),
				ArgInfo::value(ScriptType::Int),
				ArgInfo::value(ScriptType::Double),
			]
		)
		.is_ok());
		// empty tail
		assert!(select_overload(&set, &[ArgInfo::value(ScriptType::Str)]).is_ok());
		// pass-through array
		assert_eq!(
			match_params(&set[0].params, &[
				ArgInfo::value(ScriptType::Str),
				ArgInfo::value(ScriptType::array(ScriptType::Double)),
			]),
			Some(MatchQuality::Exact)
		);
	}
}

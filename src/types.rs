//! Static types known to the compiler.
//!
//! Primitive value types mirror the literal kinds the lexer produces. Host
//! types are identified by the registering Rust type; their display names
//! come from the registry at registration time so diagnostics never need a
//! registry lookup.

use std::{any::TypeId, fmt::Display, sync::Arc};

/// Identity of a host-registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(TypeId);

impl HostId {
	pub fn of<T: 'static>() -> Self { Self(TypeId::of::<T>()) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptType {
	Void,
	/// The type of the `null` literal before it meets an assignment context.
	Null,
	Bool,
	Int,
	Uint,
	Long,
	Ulong,
	Float,
	Double,
	Decimal,
	Char,
	Str,
	Array(Box<ScriptType>),
	Host { id: HostId, name: Arc<str> },
	Enum { id: HostId, name: Arc<str> },
	/// An open generic, instantiated once `args` is non-empty.
	Generic { id: HostId, name: Arc<str>, args: Vec<ScriptType> },
	/// Placeholder inside an open generic's member signatures.
	Param(u8),
}

impl ScriptType {
	pub fn array(elem: ScriptType) -> Self { ScriptType::Array(Box::new(elem)) }

	pub fn is_numeric(&self) -> bool {
		use ScriptType::*;
		matches!(self, Int | Uint | Long | Ulong | Float | Double | Decimal)
	}

	pub fn is_integral(&self) -> bool {
		use ScriptType::*;
		matches!(self, Int | Uint | Long | Ulong)
	}

	pub fn is_reference(&self) -> bool {
		use ScriptType::*;
		matches!(self, Str | Array(_) | Host { .. } | Generic { .. })
	}

	/// Whether a value of `self` implicitly converts to `target`:
	/// identity, numeric widening, char promotion, or null to a reference.
	pub fn widens_to(&self, target: &ScriptType) -> bool {
		use ScriptType::*;
		if self == target {
			return true;
		}
		match self {
			Int => matches!(target, Long | Float | Double | Decimal),
			Uint => matches!(target, Long | Ulong | Float | Double | Decimal),
			Long | Ulong => matches!(target, Float | Double | Decimal),
			Float => matches!(target, Double),
			Char => matches!(target, Int | Uint | Long | Ulong | Float | Double | Decimal),
			Null => target.is_reference(),
			_ => false,
		}
	}

	/// Whether an explicit cast from `self` to `target` is allowed.
	pub fn casts_to(&self, target: &ScriptType) -> bool {
		use ScriptType::*;
		if self.widens_to(target) {
			return true;
		}
		match (self, target) {
			(from, to) if from.is_numeric() && to.is_numeric() => true,
			(from, Char) | (Char, from) if from.is_numeric() => true,
			(Enum { .. }, to) if to.is_integral() => true,
			(from, Enum { .. }) if from.is_integral() => true,
			_ => false,
		}
	}

	/// The common type two numeric operands promote to, if any. Signed and
	/// `ulong` operands never mix implicitly, and `decimal` only combines
	/// with integral operands.
	pub fn promote(left: &ScriptType, right: &ScriptType) -> Option<ScriptType> {
		use ScriptType::*;
		let widen = |t: &ScriptType| if *t == Char { Int } else { t.clone() };
		let (l, r) = (widen(left), widen(right));
		if !l.is_numeric() || !r.is_numeric() {
			return None;
		}
		if l == r {
			return Some(l);
		}
		match (&l, &r) {
			(Decimal, other) | (other, Decimal) => other.is_integral().then_some(Decimal),
			(Double, _) | (_, Double) => Some(Double),
			(Float, _) | (_, Float) => Some(Float),
			(Ulong, other) | (other, Ulong) => matches!(other, Uint).then_some(Ulong),
			(Long, _) | (_, Long) => Some(Long),
			// int/uint disagree on sign; go wider
			(Uint, Int) | (Int, Uint) => Some(Long),
			_ => None,
		}
	}

	/// Substitute open-generic placeholders with the receiver's arguments.
	pub fn instantiate(&self, args: &[ScriptType]) -> ScriptType {
		match self {
			ScriptType::Param(i) => args.get(*i as usize).cloned().unwrap_or(ScriptType::Void),
			ScriptType::Array(elem) => ScriptType::array(elem.instantiate(args)),
			ScriptType::Generic { id, name, args: inner } => ScriptType::Generic {
				id:   *id,
				name: name.clone(),
				args: inner.iter().map(|a| a.instantiate(args)).collect(),
			},
			other => other.clone(),
		}
	}
}

impl Display for ScriptType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ScriptType::*;
		match self {
			Void => write!(f, "void"),
			Null => write!(f, "null"),
			Bool => write!(f, "bool"),
			Int => write!(f, "int"),
			Uint => write!(f, "uint"),
			Long => write!(f, "long"),
			Ulong => write!(f, "ulong"),
			Float => write!(f, "float"),
			Double => write!(f, "double"),
			Decimal => write!(f, "decimal"),
			Char => write!(f, "char"),
			Str => write!(f, "string"),
			Array(elem) => write!(f, "{elem}[]"),
			Host { name, .. } | Enum { name, .. } => write!(f, "{name}"),
			Generic { name, args, .. } => {
				if args.is_empty() {
					write!(f, "{name}")
				} else {
					let list = args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
					write!(f, "{name}<{list}>")
				}
			}
			Param(i) => write!(f, "T{i}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn widening() {
		assert!(ScriptType::Int.widens_to(&ScriptType::Double));
		assert!(ScriptType::Int.widens_to(&ScriptType::Long));
		assert!(ScriptType::Float.widens_to(&ScriptType::Double));
		assert!(!ScriptType::Double.widens_to(&ScriptType::Int));
		assert!(!ScriptType::Long.widens_to(&ScriptType::Ulong));
		assert!(ScriptType::Null.widens_to(&ScriptType::Str));
		assert!(!ScriptType::Null.widens_to(&ScriptType::Int));
	}

	#[test]
	fn promotion() {
		use ScriptType::*;
		assert_eq!(ScriptType::promote(&Int, &Int), Some(Int));
		assert_eq!(ScriptType::promote(&Int, &Double), Some(Double));
		assert_eq!(ScriptType::promote(&Int, &Uint), Some(Long));
		assert_eq!(ScriptType::promote(&Ulong, &Int), None);
		assert_eq!(ScriptType::promote(&Decimal, &Int), Some(Decimal));
		assert_eq!(ScriptType::promote(&Decimal, &Double), None);
		assert_eq!(ScriptType::promote(&Char, &Char), Some(Int));
	}

	#[test]
	fn casts() {
		use ScriptType::*;
		assert!(Double.casts_to(&Int));
		assert!(Char.casts_to(&Int));
		assert!(Int.casts_to(&Char));
		assert!(!Str.casts_to(&Int));
	}

	#[test]
	fn display() {
		assert_eq!(ScriptType::array(ScriptType::Int).to_string(), "int[]");
		assert_eq!(ScriptType::Str.to_string(), "string");
	}
}

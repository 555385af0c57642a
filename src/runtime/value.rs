//! Runtime values and the conversions the compiler already validated.

use std::{
	any::Any,
	cell::{Ref, RefCell, RefMut},
	fmt::Display,
	rc::Rc,
	sync::Arc,
};

use crate::{
	error::runtime::RuntimeError,
	lexer::token::LiteralValue,
	parser::expression::BinaryOp,
	types::{HostId, ScriptType},
	utils::RcCell,
};

/// A live value in a running script. Arrays and host objects are shared by
/// shallow clone; everything else copies.
#[derive(Debug, Clone)]
pub enum Value {
	/// The result of a void call; never stored in a slot.
	Void,
	Null,
	Bool(bool),
	Int(i32),
	Uint(u32),
	Long(i64),
	Ulong(u64),
	Float(f32),
	Double(f64),
	Decimal(f64),
	Char(char),
	Str(String),
	Array(ArrayValue),
	Enum(EnumValue),
	Host(HostValue),
}

#[derive(Debug, Clone)]
pub struct ArrayValue {
	pub elem:  ScriptType,
	pub items: RcCell<Vec<Value>>,
}

impl ArrayValue {
	pub fn new(elem: ScriptType, items: Vec<Value>) -> Self { Self { elem, items: RcCell::new(items) } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
	pub id:        HostId,
	pub type_name: Arc<str>,
	pub value:     i64,
}

/// A host object handed to a script: the registering Rust type behind a
/// shared cell, downcast again inside host member closures.
#[derive(Clone)]
pub struct HostValue {
	pub id:        HostId,
	pub type_name: Arc<str>,
	inner:         Rc<RefCell<dyn Any>>,
}

impl HostValue {
	pub fn new<T: 'static>(type_name: impl Into<Arc<str>>, value: T) -> Self {
		Self { id: HostId::of::<T>(), type_name: type_name.into(), inner: Rc::new(RefCell::new(value)) }
	}

	pub fn borrow<T: 'static>(&self) -> Result<Ref<'_, T>, RuntimeError> {
		Ref::filter_map(self.inner.borrow(), |v| v.downcast_ref::<T>()).map_err(|_| {
			RuntimeError::ConversionFailed {
				from: self.type_name.to_string(),
				to:   std::any::type_name::<T>().to_string(),
			}
		})
	}

	pub fn borrow_mut<T: 'static>(&self) -> Result<RefMut<'_, T>, RuntimeError> {
		RefMut::filter_map(self.inner.borrow_mut(), |v| v.downcast_mut::<T>()).map_err(|_| {
			RuntimeError::ConversionFailed {
				from: self.type_name.to_string(),
				to:   std::any::type_name::<T>().to_string(),
			}
		})
	}

	pub fn ptr_eq(&self, other: &HostValue) -> bool { Rc::ptr_eq(&self.inner, &other.inner) }
}

impl std::fmt::Debug for HostValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostValue").field("type_name", &self.type_name).finish()
	}
}

impl Value {
	pub fn ty(&self) -> ScriptType {
		use Value::*;
		match self {
			Void => ScriptType::Void,
			Null => ScriptType::Null,
			Bool(_) => ScriptType::Bool,
			Int(_) => ScriptType::Int,
			Uint(_) => ScriptType::Uint,
			Long(_) => ScriptType::Long,
			Ulong(_) => ScriptType::Ulong,
			Float(_) => ScriptType::Float,
			Double(_) => ScriptType::Double,
			Decimal(_) => ScriptType::Decimal,
			Char(_) => ScriptType::Char,
			Str(_) => ScriptType::Str,
			Array(a) => ScriptType::array(a.elem.clone()),
			Enum(e) => ScriptType::Enum { id: e.id, name: e.type_name.clone() },
			Host(h) => ScriptType::Host { id: h.id, name: h.type_name.clone() },
		}
	}

	pub fn from_literal(lit: &LiteralValue) -> Value {
		match lit {
			LiteralValue::Null => Value::Null,
			LiteralValue::Bool(v) => Value::Bool(*v),
			LiteralValue::Int(v) => Value::Int(*v),
			LiteralValue::Uint(v) => Value::Uint(*v),
			LiteralValue::Long(v) => Value::Long(*v),
			LiteralValue::Ulong(v) => Value::Ulong(*v),
			LiteralValue::Float(v) => Value::Float(*v),
			LiteralValue::Double(v) => Value::Double(*v),
			LiteralValue::Decimal(v) => Value::Decimal(*v),
			LiteralValue::Char(v) => Value::Char(*v),
			LiteralValue::Str(v) => Value::Str(v.clone()),
		}
	}

	/// Materialize a compile-time constant under its declared type; enum
	/// constants carry their discriminant as an integer literal.
	pub fn from_constant(ty: &ScriptType, lit: &LiteralValue) -> Value {
		if let ScriptType::Enum { id, name } = ty {
			let value = match lit {
				LiteralValue::Int(v) => *v as i64,
				LiteralValue::Long(v) => *v,
				_ => 0,
			};
			return Value::Enum(EnumValue { id: *id, type_name: name.clone(), value });
		}
		Value::from_literal(lit)
	}

	/// The zero value a declared-but-uninitialized slot or `out` argument
	/// starts with.
	pub fn default_of(ty: &ScriptType) -> Value {
		use ScriptType as T;
		match ty {
			T::Bool => Value::Bool(false),
			T::Int => Value::Int(0),
			T::Uint => Value::Uint(0),
			T::Long => Value::Long(0),
			T::Ulong => Value::Ulong(0),
			T::Float => Value::Float(0.0),
			T::Double => Value::Double(0.0),
			T::Decimal => Value::Decimal(0.0),
			T::Char => Value::Char('\0'),
			T::Str => Value::Str(String::new()),
			T::Enum { id, name } => {
				Value::Enum(EnumValue { id: *id, type_name: name.clone(), value: 0 })
			}
			_ => Value::Null,
		}
	}

	pub(crate) fn as_i128(&self) -> Option<i128> {
		use Value::*;
		Some(match self {
			Int(v) => *v as i128,
			Uint(v) => *v as i128,
			Long(v) => *v as i128,
			Ulong(v) => *v as i128,
			Char(v) => *v as u32 as i128,
			Enum(e) => e.value as i128,
			_ => return None,
		})
	}

	pub(crate) fn as_f64(&self) -> Option<f64> {
		use Value::*;
		Some(match self {
			Float(v) => *v as f64,
			Double(v) | Decimal(v) => *v,
			other => other.as_i128()? as f64,
		})
	}

	/// Convert to `target`, the runtime mirror of the compile-time widening
	/// and explicit-cast rules. Failing here means a host member returned a
	/// value its binding did not promise.
	pub fn convert(self, target: &ScriptType) -> Result<Value, RuntimeError> {
		use ScriptType as T;
		if self.ty() == *target {
			return Ok(self);
		}
		let fail = |v: &Value| RuntimeError::ConversionFailed {
			from: v.ty().to_string(),
			to:   target.to_string(),
		};
		match target {
			T::Int => self.as_f64().map(|v| Value::Int(v as i32)).ok_or_else(|| fail(&self)),
			T::Uint => self.as_f64().map(|v| Value::Uint(v as u32)).ok_or_else(|| fail(&self)),
			T::Long => self.as_f64().map(|v| Value::Long(v as i64)).ok_or_else(|| fail(&self)),
			T::Ulong => self.as_f64().map(|v| Value::Ulong(v as u64)).ok_or_else(|| fail(&self)),
			T::Float => self.as_f64().map(|v| Value::Float(v as f32)).ok_or_else(|| fail(&self)),
			T::Double => self.as_f64().map(Value::Double).ok_or_else(|| fail(&self)),
			T::Decimal => self.as_f64().map(Value::Decimal).ok_or_else(|| fail(&self)),
			T::Char => match self.as_i128().and_then(|v| char::from_u32(v as u32)) {
				Some(c) => Ok(Value::Char(c)),
				None => Err(fail(&self)),
			},
			T::Enum { id, name } => match self.as_i128() {
				Some(v) => {
					Ok(Value::Enum(EnumValue { id: *id, type_name: name.clone(), value: v as i64 }))
				}
				None => Err(fail(&self)),
			},
			t if t.is_reference() => match self {
				Value::Null => Ok(Value::Null),
				v => Err(fail(&v)),
			},
			_ => Err(fail(&self)),
		}
	}

	/// Structural equality for scalars, strings and enums; identity for
	/// arrays and host objects.
	pub fn equals(&self, other: &Value) -> bool {
		use Value::*;
		match (self, other) {
			(Null, Null) => true,
			(Bool(l), Bool(r)) => l == r,
			(Int(l), Int(r)) => l == r,
			(Uint(l), Uint(r)) => l == r,
			(Long(l), Long(r)) => l == r,
			(Ulong(l), Ulong(r)) => l == r,
			(Float(l), Float(r)) => l == r,
			(Double(l), Double(r)) | (Decimal(l), Decimal(r)) => l == r,
			(Char(l), Char(r)) => l == r,
			(Str(l), Str(r)) => l == r,
			(Enum(l), Enum(r)) => l == r,
			(Array(l), Array(r)) => l.items.ptr_eq(&r.items),
			(Host(l), Host(r)) => l.ptr_eq(r),
			(Null, _) | (_, Null) => false,
			_ => false,
		}
	}

	/// Apply a binary operator to two operands of the same runtime type.
	/// The compiler coerced both sides to a common type, so a mismatched
	/// pair here is an internal-consistency failure.
	pub fn binary_op(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
		use BinaryOp::*;
		match op {
			Eq => return Ok(Value::Bool(left.equals(&right))),
			Ne => return Ok(Value::Bool(!left.equals(&right))),
			Lt | Le | Gt | Ge => return Value::compare(op, &left, &right),
			Shl | Shr => return Value::shift(op, left, right),
			_ => {}
		}
		use Value::*;
		match (left, right) {
			(Int(l), Int(r)) => Value::int_arith(op, l as i64, r as i64).map(|v| Int(v as i32)),
			(Uint(l), Uint(r)) => Value::int_arith(op, l as i64, r as i64).map(|v| Uint(v as u32)),
			(Long(l), Long(r)) => Value::int_arith(op, l, r).map(Long),
			(Ulong(l), Ulong(r)) => match op {
				Div if r == 0 => Err(RuntimeError::DivisionByZero),
				Rem if r == 0 => Err(RuntimeError::DivisionByZero),
				Add => Ok(Ulong(l.wrapping_add(r))),
				Sub => Ok(Ulong(l.wrapping_sub(r))),
				Mul => Ok(Ulong(l.wrapping_mul(r))),
				Div => Ok(Ulong(l / r)),
				Rem => Ok(Ulong(l % r)),
				BitAnd => Ok(Ulong(l & r)),
				BitOr => Ok(Ulong(l | r)),
				BitXor => Ok(Ulong(l ^ r)),
				_ => Err(Value::mismatch(op)),
			},
			(Float(l), Float(r)) => Value::float_arith(op, l as f64, r as f64).map(|v| Float(v as f32)),
			(Double(l), Double(r)) => Value::float_arith(op, l, r).map(Double),
			(Decimal(l), Decimal(r)) => Value::float_arith(op, l, r).map(Decimal),
			_ => Err(Value::mismatch(op)),
		}
	}

	fn mismatch(op: BinaryOp) -> RuntimeError {
		anyhow::anyhow!("operator {op:?} applied to mismatched runtime operands").into()
	}

	fn int_arith(op: BinaryOp, l: i64, r: i64) -> Result<i64, RuntimeError> {
		use BinaryOp::*;
		Ok(match op {
			Add => l.wrapping_add(r),
			Sub => l.wrapping_sub(r),
			Mul => l.wrapping_mul(r),
			Div if r == 0 => return Err(RuntimeError::DivisionByZero),
			Div => l.wrapping_div(r),
			Rem if r == 0 => return Err(RuntimeError::DivisionByZero),
			Rem => l.wrapping_rem(r),
			BitAnd => l & r,
			BitOr => l | r,
			BitXor => l ^ r,
			_ => return Err(Value::mismatch(op)),
		})
	}

	fn float_arith(op: BinaryOp, l: f64, r: f64) -> Result<f64, RuntimeError> {
		use BinaryOp::*;
		Ok(match op {
			Add => l + r,
			Sub => l - r,
			Mul => l * r,
			Div => l / r,
			Rem => l % r,
			_ => return Err(Value::mismatch(op)),
		})
	}

	fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
		use std::cmp::Ordering;
		use Value::*;
		let ordering = match (left, right) {
			(Int(l), Int(r)) => l.cmp(r),
			(Uint(l), Uint(r)) => l.cmp(r),
			(Long(l), Long(r)) => l.cmp(r),
			(Ulong(l), Ulong(r)) => l.cmp(r),
			(Char(l), Char(r)) => l.cmp(r),
			(Str(l), Str(r)) => l.cmp(r),
			(Float(l), Float(r)) => l.partial_cmp(r).unwrap_or(Ordering::Less),
			(Double(l), Double(r)) | (Decimal(l), Decimal(r)) => {
				l.partial_cmp(r).unwrap_or(Ordering::Less)
			}
			_ => return Err(Value::mismatch(op)),
		};
		let result = match op {
			BinaryOp::Lt => ordering == Ordering::Less,
			BinaryOp::Le => ordering != Ordering::Greater,
			BinaryOp::Gt => ordering == Ordering::Greater,
			_ => ordering != Ordering::Less,
		};
		Ok(Value::Bool(result))
	}

	fn shift(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
		use Value::*;
		let amount = match right {
			Int(v) => v as u32,
			_ => return Err(Value::mismatch(op)),
		};
		let shl = matches!(op, BinaryOp::Shl);
		Ok(match left {
			Int(v) => Int(if shl { v.wrapping_shl(amount) } else { v.wrapping_shr(amount) }),
			Uint(v) => Uint(if shl { v.wrapping_shl(amount) } else { v.wrapping_shr(amount) }),
			Long(v) => Long(if shl { v.wrapping_shl(amount) } else { v.wrapping_shr(amount) }),
			Ulong(v) => Ulong(if shl { v.wrapping_shl(amount) } else { v.wrapping_shr(amount) }),
			_ => return Err(Value::mismatch(op)),
		})
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use Value::*;
		match self {
			Void => write!(f, "void"),
			Null => write!(f, "null"),
			Bool(v) => write!(f, "{v}"),
			Int(v) => write!(f, "{v}"),
			Uint(v) => write!(f, "{v}"),
			Long(v) => write!(f, "{v}"),
			Ulong(v) => write!(f, "{v}"),
			Float(v) => write!(f, "{v}"),
			Double(v) | Decimal(v) => write!(f, "{v}"),
			Char(v) => write!(f, "{v}"),
			Str(v) => write!(f, "{v}"),
			Array(a) => {
				let items = a.items.borrow();
				let rendered = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
				write!(f, "[{rendered}]")
			}
			Enum(e) => write!(f, "{}({})", e.type_name, e.value),
			Host(h) => write!(f, "{}", h.type_name),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversion_widens_and_narrows() {
		assert!(matches!(Value::Int(5).convert(&ScriptType::Double), Ok(Value::Double(v)) if v == 5.0));
		assert!(matches!(Value::Double(2.9).convert(&ScriptType::Int), Ok(Value::Int(2))));
		assert!(matches!(Value::Char('A').convert(&ScriptType::Int), Ok(Value::Int(65))));
		assert!(Value::Str("x".into()).convert(&ScriptType::Int).is_err());
	}

	#[test]
	fn division_by_zero_is_reported() {
		let err = Value::binary_op(BinaryOp::Div, Value::Int(1), Value::Int(0));
		assert!(matches!(err, Err(RuntimeError::DivisionByZero)));
		// float division by zero follows IEEE instead
		let ok = Value::binary_op(BinaryOp::Div, Value::Double(1.0), Value::Double(0.0));
		assert!(matches!(ok, Ok(Value::Double(v)) if v.is_infinite()));
	}

	#[test]
	fn equality_covers_references() {
		let a = Value::Array(ArrayValue::new(ScriptType::Int, vec![Value::Int(1)]));
		let b = a.clone();
		assert!(a.equals(&b));
		let c = Value::Array(ArrayValue::new(ScriptType::Int, vec![Value::Int(1)]));
		assert!(!a.equals(&c));
		assert!(Value::Null.equals(&Value::Null));
		assert!(!Value::Null.equals(&Value::Int(0)));
	}

	#[test]
	fn comparison_and_shift() {
		assert!(matches!(
			Value::binary_op(BinaryOp::Lt, Value::Int(1), Value::Int(2)),
			Ok(Value::Bool(true))
		));
		assert!(matches!(
			Value::binary_op(BinaryOp::Shl, Value::Int(1), Value::Int(3)),
			Ok(Value::Int(8))
		));
	}
}

//! Host-side type descriptors.
//!
//! A host describes each exposed type with a [`TypeSpec`]: member names,
//! typed signatures, and invoker closures. No runtime type introspection is
//! involved; the descriptor is the whole contract. Members default to
//! hidden under a limited-surface registration and opt in with
//! [`MethodSpec::exposed`]/[`PropertySpec::exposed`].

use std::sync::Arc;

use crate::{
	context::symbols::Parameter,
	error::runtime::RuntimeError,
	runtime::value::Value,
	types::{HostId, ScriptType},
};

pub type HostFn = Arc<dyn Fn(Option<&Value>, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync>;
pub type HostGetter = Arc<dyn Fn(Option<&Value>) -> Result<Value, RuntimeError> + Send + Sync>;
pub type HostSetter = Arc<dyn Fn(Option<&Value>, Value) -> Result<(), RuntimeError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecKind {
	Class,
	Enum,
	Generic(u8),
}

/// Descriptor for one host type and the surface a script may use.
pub struct TypeSpec {
	pub(crate) id:           HostId,
	pub(crate) name:         String,
	pub(crate) kind:         SpecKind,
	pub(crate) parents:      Vec<HostId>,
	pub(crate) constructors: Vec<MethodSpec>,
	pub(crate) methods:      Vec<MethodSpec>,
	pub(crate) properties:   Vec<PropertySpec>,
	pub(crate) values:       Vec<(String, i64)>,
}

impl TypeSpec {
	fn new<T: 'static>(name: &str, kind: SpecKind) -> Self {
		Self {
			id: HostId::of::<T>(),
			name: name.to_string(),
			kind,
			parents: Vec::new(),
			constructors: Vec::new(),
			methods: Vec::new(),
			properties: Vec::new(),
			values: Vec::new(),
		}
	}

	pub fn class<T: 'static>(name: &str) -> Self { Self::new::<T>(name, SpecKind::Class) }

	/// An enumeration; its named values become resolvable static members.
	pub fn enumeration<T: 'static>(name: &str) -> Self { Self::new::<T>(name, SpecKind::Enum) }

	/// An open generic of the given arity; member signatures may use
	/// [`ScriptType::Param`] to refer to instantiation arguments.
	pub fn generic<T: 'static>(name: &str, arity: u8) -> Self {
		Self::new::<T>(name, SpecKind::Generic(arity))
	}

	/// Declare an ancestor (base class or interface); a subtype inherits
	/// every registered member of its ancestors.
	pub fn extends<P: 'static>(mut self) -> Self {
		self.parents.push(HostId::of::<P>());
		self
	}

	pub fn constructor(mut self, spec: MethodSpec) -> Self {
		self.constructors.push(spec);
		self
	}

	pub fn method(mut self, spec: MethodSpec) -> Self {
		self.methods.push(spec);
		self
	}

	pub fn property(mut self, spec: PropertySpec) -> Self {
		self.properties.push(spec);
		self
	}

	/// Add a named enumeration value.
	pub fn value(mut self, name: &str, value: i64) -> Self {
		self.values.push((name.to_string(), value));
		self
	}
}

pub struct MethodSpec {
	pub(crate) name:        String,
	pub(crate) is_static:   bool,
	pub(crate) params:      Vec<Parameter>,
	pub(crate) return_type: ScriptType,
	pub(crate) exposed:     bool,
	pub(crate) invoke:      HostFn,
}

impl MethodSpec {
	pub fn instance(
		name: &str,
		params: Vec<Parameter>,
		return_type: ScriptType,
		invoke: impl Fn(Option<&Value>, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
	) -> Self {
		Self {
			name: name.to_string(),
			is_static: false,
			params,
			return_type,
			exposed: false,
			invoke: Arc::new(invoke),
		}
	}

	pub fn static_method(
		name: &str,
		params: Vec<Parameter>,
		return_type: ScriptType,
		invoke: impl Fn(Option<&Value>, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
	) -> Self {
		Self { is_static: true, ..Self::instance(name, params, return_type, invoke) }
	}

	/// The constructor's return type is filled in at registration.
	pub fn constructor(
		params: Vec<Parameter>,
		invoke: impl Fn(Option<&Value>, Vec<Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
	) -> Self {
		Self { is_static: true, ..Self::instance("new", params, ScriptType::Void, invoke) }
	}

	/// Opt this member into a limited-surface registration.
	pub fn exposed(mut self) -> Self {
		self.exposed = true;
		self
	}
}

pub struct PropertySpec {
	pub(crate) name:      String,
	pub(crate) is_static: bool,
	pub(crate) ty:        ScriptType,
	pub(crate) exposed:   bool,
	pub(crate) get:       Option<HostGetter>,
	pub(crate) set:       Option<HostSetter>,
}

impl PropertySpec {
	pub fn instance(name: &str, ty: ScriptType) -> Self {
		Self { name: name.to_string(), is_static: false, ty, exposed: false, get: None, set: None }
	}

	pub fn static_property(name: &str, ty: ScriptType) -> Self {
		Self { is_static: true, ..Self::instance(name, ty) }
	}

	pub fn getter(
		mut self,
		get: impl Fn(Option<&Value>) -> Result<Value, RuntimeError> + Send + Sync + 'static,
	) -> Self {
		self.get = Some(Arc::new(get));
		self
	}

	pub fn setter(
		mut self,
		set: impl Fn(Option<&Value>, Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
	) -> Self {
		self.set = Some(Arc::new(set));
		self
	}

	pub fn exposed(mut self) -> Self {
		self.exposed = true;
		self
	}
}

//! The host binding registry: a process-wide table mapping host types to
//! the members a script may use.
//!
//! The registry is populated once at host startup through [`TypeSpec`]
//! descriptors and treated as read-only afterwards; compilation and any
//! number of concurrent executions share it freely. Member lookups walk the
//! requested type's ancestor closure most-derived first, so a subtype
//! inherits its ancestors' registered surface.

pub mod overload;
pub mod spec;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
	context::symbols::Parameter,
	lexer::token::LiteralValue,
	registry::{
		overload::{select_overload, ArgInfo, Callable, OverloadFailure},
		spec::{HostFn, HostGetter, HostSetter, SpecKind, TypeSpec},
	},
	types::{HostId, ScriptType},
};

/// One callable host member, with its invoker closure.
pub struct MethodBinding {
	pub name:        String,
	pub is_static:   bool,
	pub params:      Vec<Parameter>,
	pub return_type: ScriptType,
	pub invoke:      HostFn,
}

impl MethodBinding {
	pub fn describe(&self) -> String {
		let params = self.params.iter().map(|p| p.ty.to_string()).collect::<Vec<_>>().join(", ");
		format!("{} {}({params})", self.return_type, self.name)
	}
}

impl std::fmt::Debug for MethodBinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MethodBinding")
			.field("name", &self.name)
			.field("is_static", &self.is_static)
			.field("params", &self.params)
			.field("return_type", &self.return_type)
			.finish()
	}
}

pub struct PropertyBinding {
	pub name:      String,
	pub is_static: bool,
	pub ty:        ScriptType,
	pub get:       Option<HostGetter>,
	pub set:       Option<HostSetter>,
}

impl std::fmt::Debug for PropertyBinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PropertyBinding")
			.field("name", &self.name)
			.field("is_static", &self.is_static)
			.field("ty", &self.ty)
			.finish()
	}
}

/// A method binding with open-generic placeholders already substituted by
/// the receiver's instantiation arguments.
#[derive(Clone, Debug)]
pub struct ResolvedMethod {
	pub binding:     Arc<MethodBinding>,
	pub params:      Vec<Parameter>,
	pub return_type: ScriptType,
}

impl Callable for ResolvedMethod {
	fn params(&self) -> &[Parameter] { &self.params }

	fn describe(&self) -> String {
		let params = self.params.iter().map(|p| p.ty.to_string()).collect::<Vec<_>>().join(", ");
		format!("{} {}({params})", self.return_type, self.binding.name)
	}
}

#[derive(Clone)]
pub struct ResolvedProperty {
	pub binding: Arc<PropertyBinding>,
	pub ty:      ScriptType,
}

pub enum StaticMember {
	Property(ResolvedProperty),
	Constant { ty: ScriptType, value: LiteralValue },
}

#[derive(Debug, PartialEq)]
pub enum ResolveError {
	UnknownMember,
	NoOverload,
	Ambiguous(Vec<String>),
}

/// Everything registered for one host type.
pub struct TypeBinding {
	pub id:       HostId,
	pub name:     Arc<str>,
	pub parents:  Vec<HostId>,
	kind:         SpecKind,
	constructors: Vec<Arc<MethodBinding>>,
	methods:      FxHashMap<String, Vec<Arc<MethodBinding>>>,
	properties:   FxHashMap<String, Arc<PropertyBinding>>,
	constants:    FxHashMap<String, i64>,
}

impl TypeBinding {
	pub fn is_enum(&self) -> bool { matches!(self.kind, SpecKind::Enum) }

	fn self_type(&self) -> ScriptType {
		match self.kind {
			SpecKind::Class => ScriptType::Host { id: self.id, name: self.name.clone() },
			SpecKind::Enum => ScriptType::Enum { id: self.id, name: self.name.clone() },
			SpecKind::Generic(_) => {
				ScriptType::Generic { id: self.id, name: self.name.clone(), args: Vec::new() }
			}
		}
	}
}

#[derive(Default)]
pub struct HostRegistry {
	types: FxHashMap<HostId, TypeBinding>,
	names: FxHashMap<String, HostId>,
}

impl HostRegistry {
	pub fn new() -> Self { Self::default() }

	/// Register a type under its descriptor name with its full surface.
	pub fn register(&mut self, spec: TypeSpec) -> bool { self.register_with(spec, None, false) }

	/// Register under an alias instead of the descriptor name.
	pub fn register_as(&mut self, spec: TypeSpec, alias: &str) -> bool {
		self.register_with(spec, Some(alias), false)
	}

	/// Register only the members carrying the explicit opt-in marker.
	pub fn register_limited(&mut self, spec: TypeSpec) -> bool { self.register_with(spec, None, true) }

	/// Idempotent-failing registration: an already-registered type or a
	/// colliding script name returns false and mutates nothing.
	pub fn register_with(&mut self, spec: TypeSpec, alias: Option<&str>, limited: bool) -> bool {
		let script_name = alias.unwrap_or(&spec.name).to_string();
		if self.types.contains_key(&spec.id) || self.names.contains_key(&script_name) {
			return false;
		}
		let name: Arc<str> = Arc::from(script_name.as_str());

		let keep_method = |exposed: bool| !limited || exposed;
		let mut methods: FxHashMap<String, Vec<Arc<MethodBinding>>> = FxHashMap::default();
		for m in spec.methods {
			if !keep_method(m.exposed) {
				continue;
			}
			let binding = Arc::new(MethodBinding {
				name:        m.name.clone(),
				is_static:   m.is_static,
				params:      m.params,
				return_type: m.return_type,
				invoke:      m.invoke,
			});
			methods.entry(m.name).or_default().push(binding);
		}

		let mut properties = FxHashMap::default();
		for p in spec.properties {
			if !keep_method(p.exposed) {
				continue;
			}
			let binding = Arc::new(PropertyBinding {
				name:      p.name.clone(),
				is_static: p.is_static,
				ty:        p.ty,
				get:       p.get,
				set:       p.set,
			});
			properties.insert(p.name, binding);
		}

		let self_type = match spec.kind {
			SpecKind::Class => ScriptType::Host { id: spec.id, name: name.clone() },
			SpecKind::Enum => ScriptType::Enum { id: spec.id, name: name.clone() },
			SpecKind::Generic(_) => {
				ScriptType::Generic { id: spec.id, name: name.clone(), args: Vec::new() }
			}
		};
		let constructors = spec
			.constructors
			.into_iter()
			.filter(|c| keep_method(c.exposed))
			.map(|c| {
				Arc::new(MethodBinding {
					name:        c.name,
					is_static:   true,
					params:      c.params,
					return_type: self_type.clone(),
					invoke:      c.invoke,
				})
			})
			.collect();

		let binding = TypeBinding {
			id: spec.id,
			name: name.clone(),
			parents: spec.parents,
			kind: spec.kind,
			constructors,
			methods,
			properties,
			constants: spec.values.into_iter().collect(),
		};
		self.names.insert(script_name, spec.id);
		self.types.insert(spec.id, binding);
		true
	}

	/// The lexer's hook: is this identifier a registered type name?
	pub fn lookup_name(&self, name: &str) -> Option<ScriptType> {
		let id = self.names.get(name)?;
		Some(self.types.get(id)?.self_type())
	}

	pub fn binding(&self, id: HostId) -> Option<&TypeBinding> { self.types.get(&id) }

	/// The ancestor/interface closure of a type, most-derived first.
	fn ancestry(&self, id: HostId) -> Vec<HostId> {
		let mut order = vec![id];
		let mut index = 0;
		while index < order.len() {
			let current = order[index];
			index += 1;
			if let Some(binding) = self.types.get(&current) {
				for parent in &binding.parents {
					if !order.contains(parent) {
						order.push(*parent);
					}
				}
			}
		}
		order
	}

	fn receiver_parts(receiver: &ScriptType) -> Option<(HostId, &[ScriptType])> {
		match receiver {
			ScriptType::Host { id, .. } | ScriptType::Enum { id, .. } => Some((*id, &[])),
			ScriptType::Generic { id, args, .. } => Some((*id, args)),
			_ => None,
		}
	}

	fn instantiate(method: &Arc<MethodBinding>, type_args: &[ScriptType]) -> ResolvedMethod {
		if type_args.is_empty() {
			return ResolvedMethod {
				binding:     method.clone(),
				params:      method.params.clone(),
				return_type: method.return_type.clone(),
			};
		}
		ResolvedMethod {
			binding:     method.clone(),
			params:      method
				.params
				.iter()
				.map(|p| Parameter::new(p.name.clone(), p.ty.instantiate(type_args), p.mode))
				.collect(),
			return_type: method.return_type.instantiate(type_args),
		}
	}

	fn resolve_method(
		&self,
		receiver: &ScriptType,
		name: &str,
		args: &[ArgInfo],
		want_static: bool,
	) -> Result<ResolvedMethod, ResolveError> {
		let (id, type_args) = Self::receiver_parts(receiver).ok_or(ResolveError::UnknownMember)?;
		for ancestor in self.ancestry(id) {
			let Some(binding) = self.types.get(&ancestor) else {
				continue;
			};
			let Some(set) = binding.methods.get(name) else {
				continue;
			};
			let candidates: Vec<ResolvedMethod> = set
				.iter()
				.filter(|m| m.is_static == want_static)
				.map(|m| Self::instantiate(m, type_args))
				.collect();
			if candidates.is_empty() {
				continue;
			}
			return select_overload(&candidates, args).map(Clone::clone).map_err(|failure| match failure {
				OverloadFailure::NoMatch => ResolveError::NoOverload,
				OverloadFailure::Ambiguous(c) => ResolveError::Ambiguous(c),
			});
		}
		Err(ResolveError::UnknownMember)
	}

	pub fn resolve_instance_method(
		&self,
		receiver: &ScriptType,
		name: &str,
		args: &[ArgInfo],
	) -> Result<ResolvedMethod, ResolveError> {
		self.resolve_method(receiver, name, args, false)
	}

	pub fn resolve_static_method(
		&self,
		ty: &ScriptType,
		name: &str,
		args: &[ArgInfo],
	) -> Result<ResolvedMethod, ResolveError> {
		self.resolve_method(ty, name, args, true)
	}

	pub fn resolve_instance_member(&self, receiver: &ScriptType, name: &str) -> Option<ResolvedProperty> {
		let (id, type_args) = Self::receiver_parts(receiver)?;
		for ancestor in self.ancestry(id) {
			let Some(binding) = self.types.get(&ancestor) else {
				continue;
			};
			if let Some(property) = binding.properties.get(name) {
				if !property.is_static {
					let ty = if type_args.is_empty() {
						property.ty.clone()
					} else {
						property.ty.instantiate(type_args)
					};
					return Some(ResolvedProperty { binding: property.clone(), ty });
				}
			}
		}
		None
	}

	/// Static properties and, for enumerations, named constant values.
	pub fn resolve_static_member(&self, ty: &ScriptType, name: &str) -> Option<StaticMember> {
		let (id, type_args) = Self::receiver_parts(ty)?;
		for ancestor in self.ancestry(id) {
			let Some(binding) = self.types.get(&ancestor) else {
				continue;
			};
			if let Some(value) = binding.constants.get(name) {
				return Some(StaticMember::Constant {
					ty:    binding.self_type(),
					value: LiteralValue::Long(*value),
				});
			}
			if let Some(property) = binding.properties.get(name) {
				if property.is_static {
					let ty = if type_args.is_empty() {
						property.ty.clone()
					} else {
						property.ty.instantiate(type_args)
					};
					return Some(StaticMember::Property(ResolvedProperty { binding: property.clone(), ty }));
				}
			}
		}
		None
	}

	pub fn resolve_constructor(
		&self,
		ty: &ScriptType,
		args: &[ArgInfo],
	) -> Result<ResolvedMethod, ResolveError> {
		let (id, type_args) = Self::receiver_parts(ty).ok_or(ResolveError::UnknownMember)?;
		let binding = self.types.get(&id).ok_or(ResolveError::UnknownMember)?;
		if binding.constructors.is_empty() {
			return Err(ResolveError::UnknownMember);
		}
		let candidates: Vec<ResolvedMethod> =
			binding.constructors.iter().map(|c| Self::instantiate(c, type_args)).collect();
		let resolved = select_overload(&candidates, args).map(Clone::clone).map_err(|failure| match failure {
			OverloadFailure::NoMatch => ResolveError::NoOverload,
			OverloadFailure::Ambiguous(c) => ResolveError::Ambiguous(c),
		})?;
		// an instantiated receiver constructs its instantiated self
		let mut resolved = resolved;
		resolved.return_type = ty.clone();
		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{registry::spec::{MethodSpec, PropertySpec}, runtime::value::Value};

	#[derive(Default)]
	struct Counter {
		count: i64,
	}
	struct Base;
	struct Derived;
	struct Color;
	struct ListMarker;

	fn counter_spec() -> TypeSpec {
		TypeSpec::class::<Counter>("Counter")
			.constructor(MethodSpec::constructor(vec![], |_, _| {
				Ok(Value::Host(crate::runtime::value::HostValue::new("Counter", Counter::default())))
			}))
			.method(
				MethodSpec::instance("bump", vec![], ScriptType::Void, |recv, _| {
					let Some(Value::Host(host)) = recv else {
						return Err(crate::error::runtime::RuntimeError::host("missing receiver"));
					};
					host.borrow_mut::<Counter>()?.count += 1;
					Ok(Value::Void)
				})
				.exposed(),
			)
			.method(MethodSpec::instance("reset", vec![], ScriptType::Void, |_, _| Ok(Value::Void)))
			.property(
				PropertySpec::instance("count", ScriptType::Long)
					.getter(|recv| {
						let Some(Value::Host(host)) = recv else {
							return Err(crate::error::runtime::RuntimeError::host("missing receiver"));
						};
						Ok(Value::Long(host.borrow::<Counter>()?.count))
					})
					.exposed(),
			)
	}

	#[test]
	fn registration_is_idempotent_failing() {
		let mut registry = HostRegistry::new();
		assert!(registry.register(counter_spec()));
		assert!(!registry.register(counter_spec()));
		// alias collision with an existing name also fails
		let mut registry = HostRegistry::new();
		assert!(registry.register(counter_spec()));
		assert!(!registry.register_as(TypeSpec::class::<Base>("Base"), "Counter"));
		assert!(registry.lookup_name("Base").is_none());
	}

	#[test]
	fn alias_replaces_script_name() {
		let mut registry = HostRegistry::new();
		assert!(registry.register_as(counter_spec(), "Tally"));
		assert!(registry.lookup_name("Tally").is_some());
		assert!(registry.lookup_name("Counter").is_none());
	}

	#[test]
	fn limited_surface_filters_unmarked_members() {
		let mut registry = HostRegistry::new();
		assert!(registry.register_limited(counter_spec()));
		let ty = registry.lookup_name("Counter").unwrap();
		assert!(registry.resolve_instance_method(&ty, "bump", &[]).is_ok());
		assert_eq!(
			registry.resolve_instance_method(&ty, "reset", &[]).unwrap_err(),
			ResolveError::UnknownMember
		);
		assert!(registry.resolve_instance_member(&ty, "count").is_some());
	}

	#[test]
	fn ancestors_are_walked_most_derived_first() {
		let mut registry = HostRegistry::new();
		assert!(registry.register(TypeSpec::class::<Base>("Base").method(MethodSpec::instance(
			"describe",
			vec![],
			ScriptType::Str,
			|_, _| Ok(Value::Str("base".into())),
		))));
		assert!(registry.register(TypeSpec::class::<Derived>("Derived").extends::<Base>()));
		let derived = registry.lookup_name("Derived").unwrap();
		let resolved = registry.resolve_instance_method(&derived, "describe", &[]).unwrap();
		assert_eq!(resolved.return_type, ScriptType::Str);
	}

	#[test]
	fn enum_values_resolve_as_static_constants() {
		let mut registry = HostRegistry::new();
		assert!(registry.register(TypeSpec::enumeration::<Color>("Color").value("Red", 0).value("Green", 1)));
		let ty = registry.lookup_name("Color").unwrap();
		let Some(StaticMember::Constant { ty, value }) = registry.resolve_static_member(&ty, "Green")
		else {
			panic!("expected constant");
		};
		assert!(matches!(ty, ScriptType::Enum { .. }));
		assert_eq!(value, LiteralValue::Long(1));
	}

	#[test]
	fn overload_resolution_prefers_exact() {
		let mut registry = HostRegistry::new();
		let spec = TypeSpec::class::<Counter>("Calc")
			.method(MethodSpec::static_method(
				"abs",
				vec![Parameter::by_value("x", ScriptType::Int)],
				ScriptType::Int,
				|_, _| Ok(Value::Int(0)),
			))
			.method(MethodSpec::static_method(
				"abs",
				vec![Parameter::by_value("x", ScriptType::Double)],
				ScriptType::Double,
				|_, _| Ok(Value::Double(0.0)),
			));
		assert!(registry.register(spec));
		let ty = registry.lookup_name("Calc").unwrap();
		let exact = registry.resolve_static_method(&ty, "abs", &[ArgInfo::value(ScriptType::Int)]).unwrap();
		assert_eq!(exact.return_type, ScriptType::Int);
		let loose =
			registry.resolve_static_method(&ty, "abs", &[ArgInfo::value(ScriptType::Float)]).unwrap();
		assert_eq!(loose.return_type, ScriptType::Double);
	}

	#[test]
	fn generic_members_instantiate_against_receiver() {
		let mut registry = HostRegistry::new();
		let spec = TypeSpec::generic::<ListMarker>("List", 1)
			.method(MethodSpec::instance(
				"first",
				vec![],
				ScriptType::Param(0),
				|_, _| Ok(Value::Null),
			))
			.method(MethodSpec::instance(
				"push",
				vec![Parameter::by_value("item", ScriptType::Param(0))],
				ScriptType::Void,
				|_, _| Ok(Value::Void),
			));
		assert!(registry.register(spec));
		let open = registry.lookup_name("List").unwrap();
		let ScriptType::Generic { id, name, .. } = open else {
			panic!("expected generic");
		};
		let instantiated = ScriptType::Generic { id, name, args: vec![ScriptType::Int] };
		let first = registry.resolve_instance_method(&instantiated, "first", &[]).unwrap();
		assert_eq!(first.return_type, ScriptType::Int);
		let push = registry
			.resolve_instance_method(&instantiated, "push", &[ArgInfo::value(ScriptType::Int)])
			.unwrap();
		assert_eq!(push.params[0].ty, ScriptType::Int);
	}
}

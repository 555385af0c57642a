//! Per-invocation runtime scope chain: name-to-slot frames mirroring the
//! compile-time scope shape, holding live values instead of types. A
//! function frame is a barrier: lookups walk down to it and then jump to
//! the globals frame, so caller locals never leak into a callee.

use rustc_hash::FxHashMap;

use crate::{runtime::value::Value, utils::RcCell};

pub struct ScopeChain {
	frames: Vec<Frame>,
}

struct Frame {
	slots:   FxHashMap<String, RcCell<Value>>,
	barrier: bool,
}

impl Frame {
	fn new(barrier: bool) -> Self { Self { slots: FxHashMap::default(), barrier } }
}

impl Default for ScopeChain {
	fn default() -> Self { Self::new() }
}

impl ScopeChain {
	/// A fresh chain with only the globals frame.
	pub fn new() -> Self { Self { frames: vec![Frame::new(true)] } }

	pub fn push(&mut self) { self.frames.push(Frame::new(false)); }

	pub fn push_function(&mut self) { self.frames.push(Frame::new(true)); }

	pub fn pop(&mut self) {
		if self.frames.len() > 1 {
			self.frames.pop();
		}
	}

	/// Bind a name in the innermost frame, returning its slot.
	pub fn define(&mut self, name: &str, value: Value) -> RcCell<Value> {
		let cell = RcCell::new(value);
		if let Some(frame) = self.frames.last_mut() {
			frame.slots.insert(name.to_string(), cell.clone());
		}
		cell
	}

	pub fn get(&self, name: &str) -> Option<RcCell<Value>> {
		for frame in self.frames.iter().rev() {
			if let Some(cell) = frame.slots.get(name) {
				return Some(cell.clone());
			}
			if frame.barrier {
				break;
			}
		}
		self.frames.first().and_then(|frame| frame.slots.get(name).cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_walks_outward() {
		let mut scopes = ScopeChain::new();
		scopes.define("g", Value::Int(1));
		scopes.push();
		scopes.define("x", Value::Int(2));
		scopes.push();
		assert!(scopes.get("x").is_some());
		assert!(scopes.get("g").is_some());
		scopes.pop();
		scopes.pop();
		assert!(scopes.get("x").is_none());
	}

	#[test]
	fn function_frames_hide_caller_locals() {
		let mut scopes = ScopeChain::new();
		scopes.define("global", Value::Int(0));
		scopes.push_function();
		scopes.define("caller_local", Value::Int(1));
		scopes.push_function();
		assert!(scopes.get("caller_local").is_none());
		assert!(scopes.get("global").is_some());
	}

	#[test]
	fn slots_are_shared_cells() {
		let mut scopes = ScopeChain::new();
		let cell = scopes.define("x", Value::Int(1));
		*cell.borrow_mut() = Value::Int(5);
		let seen = scopes.get("x").unwrap();
		assert!(matches!(&*seen.borrow(), Value::Int(5)));
	}
}

//! End-to-end tests through the public API: register a host surface,
//! compile script text, invoke entry points.

use std::sync::{Arc, Mutex};

use scriptum::{
	CancelToken, Engine, FunctionSignature, HostRegistry, HostValue, MethodSpec, Parameter,
	PropertySpec, RuntimeError, ScriptType, TypeSpec, Value,
};

#[derive(Default)]
struct Counter {
	total: i64,
}
struct Mode;
struct Ctl;

fn counter_spec() -> TypeSpec {
	TypeSpec::class::<Counter>("Counter")
		.constructor(MethodSpec::constructor(vec![], |_, _| {
			Ok(Value::Host(HostValue::new("Counter", Counter::default())))
		}))
		.method(MethodSpec::instance(
			"add",
			vec![Parameter::by_value("amount", ScriptType::Long)],
			ScriptType::Void,
			|recv, args| {
				let Some(Value::Host(host)) = recv else {
					return Err(RuntimeError::host("missing receiver"));
				};
				let Some(Value::Long(amount)) = args.first() else {
					return Err(RuntimeError::host("expected a long argument"));
				};
				host.borrow_mut::<Counter>()?.total += amount;
				Ok(Value::Void)
			},
		))
		.property(PropertySpec::instance("total", ScriptType::Long).getter(|recv| {
			let Some(Value::Host(host)) = recv else {
				return Err(RuntimeError::host("missing receiver"));
			};
			Ok(Value::Long(host.borrow::<Counter>()?.total))
		}))
}

fn base_registry() -> HostRegistry {
	let mut registry = HostRegistry::new();
	assert!(registry.register(counter_spec()));
	assert!(registry.register(
		TypeSpec::enumeration::<Mode>("Mode").value("Off", 0).value("On", 1).value("Auto", 2)
	));
	registry
}

fn engine() -> Engine { Engine::new(base_registry()) }

fn invoke(source: &str, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
	let script = engine().compile(source, &[]).expect("script should compile");
	script.invoke(name, args, &CancelToken::new())
}

#[test]
fn add_entry_point_end_to_end() {
	let source = "function int add(int a, int b) { return a + b; }";
	let expected = [FunctionSignature::expected(
		"add",
		vec![Parameter::by_value("a", ScriptType::Int), Parameter::by_value("b", ScriptType::Int)],
		ScriptType::Int,
	)];
	let script = engine().compile(source, &expected).expect("script should compile");
	let result = script.invoke("add", vec![Value::Int(2), Value::Int(3)], &CancelToken::new());
	assert!(matches!(result, Ok(Value::Int(5))));
}

#[test]
fn loops_and_flow_control() {
	let source = r#"
		function int sum_to(int n) {
			int total = 0;
			for (int i = 1; i <= n; i++) {
				total += i;
			}
			return total;
		}
		function int first_multiple(int of, int above) {
			int candidate = above;
			while (true) {
				candidate++;
				if (candidate % of != 0) {
					continue;
				}
				break;
			}
			return candidate;
		}
	"#;
	assert!(matches!(invoke(source, "sum_to", vec![Value::Int(10)]), Ok(Value::Int(55))));
	let result = invoke(source, "first_multiple", vec![Value::Int(7), Value::Int(30)]);
	assert!(matches!(result, Ok(Value::Int(35))));
}

#[test]
fn foreach_over_arrays() {
	let source = r#"
		function double mean(double[] samples) {
			double total = 0.0;
			foreach (double sample in samples) {
				total += sample;
			}
			return total / samples.length;
		}
	"#;
	let samples = vec![Value::Double(1.0), Value::Double(2.0), Value::Double(6.0)];
	let script = engine().compile(source, &[]).expect("script should compile");
	let array = Value::Array(scriptum::ArrayValue::new(ScriptType::Double, samples));
	let result = script.invoke("mean", vec![array], &CancelToken::new());
	assert!(matches!(result, Ok(Value::Double(v)) if (v - 3.0).abs() < 1e-9));
}

#[test]
fn switch_selects_without_fallthrough() {
	let source = r#"
		function string describe(int level) {
			switch (level) {
				case 0: return "silent";
				case 1: return "quiet";
				default: return "loud";
			}
		}
	"#;
	assert!(matches!(invoke(source, "describe", vec![Value::Int(1)]), Ok(Value::Str(s)) if s == "quiet"));
	assert!(matches!(invoke(source, "describe", vec![Value::Int(9)]), Ok(Value::Str(s)) if s == "loud"));
}

#[test]
fn switch_over_enum_constants() {
	let source = r#"
		function int gain(Mode mode) {
			switch (mode) {
				case Mode.Off: return 0;
				case Mode.On: return 10;
				default: return 5;
			}
		}
		function int pick() { return gain(Mode.Auto); }
	"#;
	assert!(matches!(invoke(source, "pick", vec![]), Ok(Value::Int(5))));
}

#[test]
fn ref_and_out_writeback() {
	let source = r#"
		function void split(double value, out int whole, out double fraction) {
			whole = (int)value;
			fraction = value - whole;
		}
		function void double_it(ref int value) { value = value * 2; }
		function double run() {
			int whole = 0;
			double fraction = 0.0;
			split(6.25, out whole, out fraction);
			int scaled = whole;
			double_it(ref scaled);
			return scaled + fraction;
		}
	"#;
	let result = invoke(source, "run", vec![]);
	assert!(matches!(result, Ok(Value::Double(v)) if (v - 12.25).abs() < 1e-9));
}

#[test]
fn globals_initialize_per_invocation() {
	let source = r#"
		global int calls = 0;
		function int bump() {
			calls = calls + 1;
			return calls;
		}
	"#;
	let script = engine().compile(source, &[]).expect("script should compile");
	let cancel = CancelToken::new();
	// no state leaks between invocations
	assert!(matches!(script.invoke("bump", vec![], &cancel), Ok(Value::Int(1))));
	assert!(matches!(script.invoke("bump", vec![], &cancel), Ok(Value::Int(1))));
}

#[test]
fn host_objects_roundtrip() {
	let source = r#"
		function long tally() {
			Counter counter = new Counter();
			counter.add(3L);
			counter.add(4L);
			return counter.total;
		}
	"#;
	assert!(matches!(invoke(source, "tally", vec![]), Ok(Value::Long(7))));
}

#[test]
fn overloads_resolve_at_invoke_time() {
	let source = r#"
		function string which(int x) { return "int"; }
		function string which(double x) { return "double"; }
	"#;
	assert!(matches!(invoke(source, "which", vec![Value::Int(1)]), Ok(Value::Str(s)) if s == "int"));
	assert!(
		matches!(invoke(source, "which", vec![Value::Double(1.0)]), Ok(Value::Str(s)) if s == "double")
	);
	// float matches double by loosening
	assert!(
		matches!(invoke(source, "which", vec![Value::Float(1.0)]), Ok(Value::Str(s)) if s == "double")
	);
}

#[test]
fn recursion_works_and_is_bounded() {
	let source = r#"
		function long fib(int n) {
			if (n < 2) { return (long)n; }
			return fib(n - 1) + fib(n - 2);
		}
		function void forever() { forever(); }
	"#;
	assert!(matches!(invoke(source, "fib", vec![Value::Int(12)]), Ok(Value::Long(144))));
	let overflow = invoke(source, "forever", vec![]);
	assert!(matches!(overflow, Err(RuntimeError::CallDepthExceeded)));
}

#[test]
fn interpolated_strings_format() {
	let source = r#"
		function string report(int count, double gain) {
			return $"count={count}, gain={gain:F2}";
		}
	"#;
	let result = invoke(source, "report", vec![Value::Int(3), Value::Double(0.5)]);
	assert!(matches!(result, Ok(Value::Str(s)) if s == "count=3, gain=0.50"));
}

#[test]
fn variadic_functions_pack_their_tail() {
	let source = r#"
		function double total(params double[] values) {
			double sum = 0.0;
			foreach (double v in values) { sum += v; }
			return sum;
		}
	"#;
	let result = invoke(source, "total", vec![Value::Double(1.0), Value::Int(2), Value::Double(0.5)]);
	assert!(matches!(result, Ok(Value::Double(v)) if (v - 3.5).abs() < 1e-9));
}

#[test]
fn runtime_errors_propagate() {
	let source = r#"
		function int divide(int a, int b) { return a / b; }
		function int index_past(int[] xs) { return xs[10]; }
	"#;
	assert!(matches!(
		invoke(source, "divide", vec![Value::Int(1), Value::Int(0)]),
		Err(RuntimeError::DivisionByZero)
	));
	let script = engine().compile(source, &[]).expect("script should compile");
	let short = Value::Array(scriptum::ArrayValue::new(ScriptType::Int, vec![Value::Int(1)]));
	assert!(matches!(
		script.invoke("index_past", vec![short], &CancelToken::new()),
		Err(RuntimeError::IndexOutOfRange { .. })
	));
}

#[test]
fn cancellation_mid_loop_is_distinct() {
	// the script cancels its own token through a host member, so the
	// evaluator observes it at the next statement boundary
	let cancel = CancelToken::new();
	let handle = cancel.clone();
	let mut registry = base_registry();
	assert!(registry.register(TypeSpec::class::<Ctl>("Ctl").method(MethodSpec::static_method(
		"stop",
		vec![],
		ScriptType::Void,
		move |_, _| {
			handle.cancel();
			Ok(Value::Void)
		},
	))));
	let engine = Engine::new(registry);
	let source = r#"
		function int spin() {
			int i = 0;
			while (true) {
				i++;
				if (i == 100) { Ctl.stop(); }
			}
			return i;
		}
	"#;
	let script = engine.compile(source, &[]).expect("script should compile");
	let result = script.invoke("spin", vec![], &cancel);
	assert!(matches!(result, Err(RuntimeError::Cancelled)));
}

#[test]
fn concurrent_invocations_share_nothing() {
	let source = r#"
		function long sum_squares(int n) {
			long total = 0L;
			for (int i = 0; i < n; i++) {
				total += (long)(i * i);
			}
			return total;
		}
	"#;
	let script = Arc::new(engine().compile(source, &[]).expect("script should compile"));
	let results = Arc::new(Mutex::new(Vec::new()));
	let mut handles = Vec::new();
	for _ in 0..4 {
		let script = script.clone();
		let results = results.clone();
		handles.push(std::thread::spawn(move || {
			let value = script.invoke("sum_squares", vec![Value::Int(100)], &CancelToken::new());
			results.lock().unwrap().push(value);
		}));
	}
	for handle in handles {
		handle.join().unwrap();
	}
	let results = results.lock().unwrap();
	assert_eq!(results.len(), 4);
	for result in results.iter() {
		assert!(matches!(result, Ok(Value::Long(328350))));
	}
}

#[test]
fn compile_rejects_unknown_identifiers_with_position() {
	let err = engine().compile("function void f() { mystery = 1; }", &[]).unwrap_err();
	let rendered = err.to_string();
	assert!(rendered.contains("mystery"));
	assert!(rendered.contains("line 1"));
}

#[test]
fn registry_surface_is_honored() {
	// unregistered type names are plain identifiers and fail to resolve
	let err = engine().compile("function void f() { Widget w = new Widget(); }", &[]).unwrap_err();
	assert!(err.to_string().contains("Widget"));
}

#[test]
fn null_handling() {
	let source = r#"
		function string fallback(string value) { return value ?? "default"; }
		function string run_null() { string s = null; return fallback(s); }
		function string run_set() { return fallback("given"); }
	"#;
	assert!(matches!(invoke(source, "run_null", vec![]), Ok(Value::Str(s)) if s == "default"));
	assert!(matches!(invoke(source, "run_set", vec![]), Ok(Value::Str(s)) if s == "given"));
}

#[test]
fn casts_convert_at_runtime() {
	let source = r#"
		function int truncate(double value) { return (int)value; }
		function int mode_value(Mode mode) { return (int)mode; }
		function int run() { return mode_value(Mode.On); }
	"#;
	assert!(matches!(invoke(source, "truncate", vec![Value::Double(9.7)]), Ok(Value::Int(9))));
	assert!(matches!(invoke(source, "run", vec![]), Ok(Value::Int(1))));
}

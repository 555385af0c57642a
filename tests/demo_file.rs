use std::path::PathBuf;

use scriptum::{
	ArrayValue, CancelToken, Engine, FunctionSignature, HostRegistry, Parameter, ScriptType, Value,
};

#[test]
fn demo_script_compiles_and_runs() {
	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("demo.stm");
	let source = std::fs::read_to_string(path).unwrap();

	let engine = Engine::new(HostRegistry::new());
	let expected = [FunctionSignature::expected(
		"summarize",
		vec![Parameter::by_value("samples", ScriptType::array(ScriptType::Double))],
		ScriptType::Str,
	)];
	let script = engine.compile(&source, &expected).unwrap();

	let samples = Value::Array(ArrayValue::new(ScriptType::Double, vec![
		Value::Double(0.1),
		Value::Double(0.5),
		Value::Double(2.0),
		Value::Double(0.75),
	]));
	let result = script.invoke("summarize", vec![samples], &CancelToken::new()).unwrap();
	let Value::Str(summary) = result else {
		panic!("expected a string result");
	};
	assert_eq!(summary, "kept=3, mean=0.750");
}

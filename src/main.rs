use std::{fs::read_to_string, io::Write, path::Path};

use anyhow::Context;
use palc::Parser;
use scriptum::{
	CancelToken, Engine, FunctionSignature, HostRegistry, MethodSpec, Parameter, PropertySpec,
	RuntimeError, ScriptError, ScriptType, TypeSpec, Value,
};
use scriptum::cli::*;

struct Console;
struct Math;

fn string_arg(args: &[Value], i: usize) -> Result<String, RuntimeError> {
	match args.get(i) {
		Some(Value::Str(text)) => Ok(text.clone()),
		other => Err(RuntimeError::host(format!("expected a string argument, got {other:?}"))),
	}
}

fn double_arg(args: &[Value], i: usize) -> Result<f64, RuntimeError> {
	match args.get(i) {
		Some(Value::Double(v)) => Ok(*v),
		other => Err(RuntimeError::host(format!("expected a double argument, got {other:?}"))),
	}
}

fn int_arg(args: &[Value], i: usize) -> Result<i32, RuntimeError> {
	match args.get(i) {
		Some(Value::Int(v)) => Ok(*v),
		other => Err(RuntimeError::host(format!("expected an int argument, got {other:?}"))),
	}
}

/// The host surface the standalone runner exposes. The library itself
/// ships no standard library; this is an ordinary host registration.
fn demo_registry() -> HostRegistry {
	let mut registry = HostRegistry::new();
	registry.register(
		TypeSpec::class::<Console>("Console")
			.method(MethodSpec::static_method(
				"write",
				vec![Parameter::by_value("text", ScriptType::Str)],
				ScriptType::Void,
				|_, args| {
					print!("{}", string_arg(&args, 0)?);
					Ok(Value::Void)
				},
			))
			.method(MethodSpec::static_method(
				"writeLine",
				vec![Parameter::by_value("text", ScriptType::Str)],
				ScriptType::Void,
				|_, args| {
					println!("{}", string_arg(&args, 0)?);
					Ok(Value::Void)
				},
			)),
	);
	registry.register(
		TypeSpec::class::<Math>("Math")
			.method(MethodSpec::static_method(
				"abs",
				vec![Parameter::by_value("value", ScriptType::Int)],
				ScriptType::Int,
				|_, args| Ok(Value::Int(int_arg(&args, 0)?.wrapping_abs())),
			))
			.method(MethodSpec::static_method(
				"abs",
				vec![Parameter::by_value("value", ScriptType::Double)],
				ScriptType::Double,
				|_, args| Ok(Value::Double(double_arg(&args, 0)?.abs())),
			))
			.method(MethodSpec::static_method(
				"min",
				vec![
					Parameter::by_value("a", ScriptType::Double),
					Parameter::by_value("b", ScriptType::Double),
				],
				ScriptType::Double,
				|_, args| Ok(Value::Double(double_arg(&args, 0)?.min(double_arg(&args, 1)?))),
			))
			.method(MethodSpec::static_method(
				"max",
				vec![
					Parameter::by_value("a", ScriptType::Double),
					Parameter::by_value("b", ScriptType::Double),
				],
				ScriptType::Double,
				|_, args| Ok(Value::Double(double_arg(&args, 0)?.max(double_arg(&args, 1)?))),
			))
			.method(MethodSpec::static_method(
				"sqrt",
				vec![Parameter::by_value("value", ScriptType::Double)],
				ScriptType::Double,
				|_, args| Ok(Value::Double(double_arg(&args, 0)?.sqrt())),
			))
			.method(MethodSpec::static_method(
				"pow",
				vec![
					Parameter::by_value("base", ScriptType::Double),
					Parameter::by_value("exponent", ScriptType::Double),
				],
				ScriptType::Double,
				|_, args| Ok(Value::Double(double_arg(&args, 0)?.powf(double_arg(&args, 1)?))),
			))
			.property(
				PropertySpec::static_property("PI", ScriptType::Double)
					.getter(|_| Ok(Value::Double(std::f64::consts::PI))),
			),
	);
	registry
}

fn run_file<P: AsRef<Path>>(engine: &Engine, path: P, entry: &str) -> Result<(), ScriptError> {
	let source = read_to_string(path)
		.context("Failed open source file")
		.map_err(|e| ScriptError::Runtime(e.into()))?;
	let expected = [FunctionSignature::expected(entry, vec![], ScriptType::Void)];
	let script = engine.compile(&source, &expected)?;
	script.invoke(entry, vec![], &CancelToken::new())?;
	Ok(())
}

fn run_prompt(engine: &Engine) {
	let stdin = std::io::stdin();
	let mut input = String::new();
	loop {
		input.clear();
		print!("> ");
		if let Err(e) = std::io::stdout().flush() {
			eprintln!("Failed flush: {e}");
		}
		match stdin.read_line(&mut input) {
			Ok(0) => {
				println!("\nExited scriptum repl");
				break;
			}
			Ok(_) => {}
			Err(e) => {
				eprintln!("Failed read line: {e}");
				continue;
			}
		}
		let line = input.trim();
		if line.is_empty() {
			continue;
		}
		// each line becomes the body of a throwaway entry point
		let source = format!("function void repl() {{ {line} }}");
		let expected = [FunctionSignature::expected("repl", vec![], ScriptType::Void)];
		match engine.compile(&source, &expected) {
			Ok(script) => {
				if let Err(e) = script.invoke("repl", vec![], &CancelToken::new()) {
					eprintln!("{e}");
				}
			}
			Err(e) => eprintln!("{e}"),
		}
	}
}

fn main() {
	env_logger::init();
	let engine = Engine::new(demo_registry());

	match Cli::parse().mode {
		Mode::File { path, entry } => {
			let entry = entry.as_deref().unwrap_or("main");
			if let Err(e) = run_file(&engine, &path, entry) {
				eprintln!("Failed run file: {e}");
				std::process::exit(1);
			}
		}
		Mode::Repl => run_prompt(&engine),
	}
}

// tests/function_registry.rs

use serde_json::json;
use taskflow::errors::CoreError;
use taskflow::task::{FunctionRegistry, TaskFunction};

#[test]
fn builtins_are_registered_by_name() {
    let registry = FunctionRegistry::with_builtins();
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["concat", "fail", "identity", "sum"]);
}

#[test]
fn builtin_behaviour() {
    let registry = FunctionRegistry::with_builtins();

    let identity = registry.get("identity").unwrap();
    assert_eq!(identity.call(vec![json!(3)]).unwrap(), json!(3));
    assert_eq!(identity.call(vec![json!(1), json!(2)]).unwrap(), json!([1, 2]));

    let concat = registry.get("concat").unwrap();
    assert_eq!(
        concat.call(vec![json!("Hello "), json!("world !")]).unwrap(),
        json!("Hello world !")
    );

    let sum = registry.get("sum").unwrap();
    assert_eq!(sum.call(vec![json!(1.5), json!(2.5)]).unwrap(), json!(4.0));
    assert!(sum.call(vec![json!("x")]).is_err());

    assert!(registry.get("fail").unwrap().call(Vec::new()).is_err());
}

#[test]
fn duplicate_and_unknown_names_are_errors() {
    let mut registry = FunctionRegistry::with_builtins();
    let dup = TaskFunction::new("sum", |_| Ok(json!(0)));
    assert!(matches!(
        registry.register(dup),
        Err(CoreError::DuplicateFunction(name)) if name == "sum"
    ));

    registry
        .register(TaskFunction::new("double", |inputs| {
            Ok(json!(inputs[0].as_i64().unwrap_or(0) * 2))
        }))
        .unwrap();
    assert_eq!(registry.get("double").unwrap().call(vec![json!(21)]).unwrap(), json!(42));

    assert!(matches!(
        registry.get("nope"),
        Err(CoreError::UnknownFunction(_))
    ));
}

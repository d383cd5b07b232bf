use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{EvalError, Result};
use crate::value::{Function, Value};

/// The kind of value a method is looked up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    Array,
    String,
}

/// Trait for methods resolved on arrays and strings, such as `items.find(...)`.
///
/// The receiver arrives through the callable's binding, the way the member
/// resolver binds any function reached through an object.
pub trait Method: Send + Sync {
    fn name(&self) -> &'static str;
    fn receiver(&self) -> ReceiverKind;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, this: &Value, args: &[Value]) -> Result<Value>;
}

/// Thread-safe method registry, keyed by receiver kind and then by name.
///
/// Each method is wrapped into a [`Function`] once at registration, so a method
/// looked up twice is the same callable.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<ReceiverKind, HashMap<&'static str, Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtins::Find);
        registry.register(builtins::Filter);
        registry.register(builtins::Map);
        registry.register(builtins::SomeMatch);
        registry.register(builtins::Every);
        registry.register(builtins::Includes);
        registry.register(builtins::IndexOf);
        registry.register(builtins::Join);
        registry.register(builtins::ToUpperCase);
        registry.register(builtins::ToLowerCase);
        registry.register(builtins::StrIncludes);
        registry.register(builtins::StartsWith);
        registry.register(builtins::EndsWith);
        registry.register(builtins::Trim);
        registry
    }

    pub fn register<M: Method + 'static>(&mut self, m: M) {
        let kind = m.receiver();
        let name = m.name();
        let method = Arc::new(m);
        let function = Function::method(move |this, args| {
            let arity = method.arity();
            if !arity.contains(&args.len()) {
                return Err(EvalError::Runtime(format!(
                    "{} expects {} to {} arguments, got {}",
                    method.name(),
                    arity.start(),
                    arity.end(),
                    args.len()
                )));
            }
            method.call(this, args)
        })
        .named(name);
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.entry(kind).or_default().insert(name, function);
    }

    pub fn get(&self, receiver: ReceiverKind, name: &str) -> Option<Function> {
        self.inner.get(&receiver)?.get(name).cloned()
    }
}

pub mod builtins {
    use super::*;
    use itertools::Itertools;

    fn array<'a>(this: &'a Value, method: &str) -> Result<&'a [Value]> {
        match this {
            Value::Array(items) => Ok(items),
            other => Err(EvalError::Runtime(format!(
                "{method} called on {}",
                other.type_name()
            ))),
        }
    }

    fn string<'a>(this: &'a Value, method: &str) -> Result<&'a str> {
        match this {
            Value::String(s) => Ok(s),
            other => Err(EvalError::Runtime(format!(
                "{method} called on {}",
                other.type_name()
            ))),
        }
    }

    fn callback<'a>(args: &'a [Value], method: &str) -> Result<&'a Function> {
        match args.first() {
            Some(Value::Function(f)) => Ok(f),
            _ => Err(EvalError::Runtime(format!("{method}: callback is not a function"))),
        }
    }

    /// Invoke `f(element, index)` for each element.
    fn each<'a>(
        items: &'a [Value],
        f: &'a Function,
    ) -> impl Iterator<Item = Result<(&'a Value, Value)>> + 'a {
        items.iter().enumerate().map(move |(i, item)| {
            f.call(&[item.clone(), Value::Number(i as f64)]).map(|out| (item, out))
        })
    }

    fn same_value_zero(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }

    fn search_arg(args: &[Value]) -> String {
        args.first().map(Value::to_js_string).unwrap_or_else(|| "undefined".into())
    }

    pub struct Find;
    impl Method for Find {
        fn name(&self) -> &'static str { "find" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let f = callback(args, self.name())?;
            for result in each(array(this, self.name())?, f) {
                let (item, hit) = result?;
                if hit.is_truthy() {
                    return Ok(item.clone());
                }
            }
            Ok(Value::Undefined)
        }
    }

    pub struct Filter;
    impl Method for Filter {
        fn name(&self) -> &'static str { "filter" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let f = callback(args, self.name())?;
            let mut out = Vec::new();
            for result in each(array(this, self.name())?, f) {
                let (item, keep) = result?;
                if keep.is_truthy() {
                    out.push(item.clone());
                }
            }
            Ok(Value::Array(out))
        }
    }

    pub struct Map;
    impl Method for Map {
        fn name(&self) -> &'static str { "map" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let f = callback(args, self.name())?;
            let out = each(array(this, self.name())?, f)
                .map_ok(|(_, mapped)| mapped)
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(out))
        }
    }

    pub struct SomeMatch;
    impl Method for SomeMatch {
        fn name(&self) -> &'static str { "some" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let f = callback(args, self.name())?;
            for result in each(array(this, self.name())?, f) {
                if result?.1.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
    }

    pub struct Every;
    impl Method for Every {
        fn name(&self) -> &'static str { "every" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let f = callback(args, self.name())?;
            for result in each(array(this, self.name())?, f) {
                if !result?.1.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
    }

    pub struct Includes;
    impl Method for Includes {
        fn name(&self) -> &'static str { "includes" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let needle = args.first().cloned().unwrap_or_default();
            let items = array(this, self.name())?;
            Ok(Value::Bool(items.iter().any(|v| same_value_zero(v, &needle))))
        }
    }

    pub struct IndexOf;
    impl Method for IndexOf {
        fn name(&self) -> &'static str { "indexOf" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let needle = args.first().cloned().unwrap_or_default();
            let pos = array(this, self.name())?.iter().position(|v| *v == needle);
            Ok(Value::Number(pos.map_or(-1.0, |i| i as f64)))
        }
    }

    pub struct Join;
    impl Method for Join {
        fn name(&self) -> &'static str { "join" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::Array }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_js_string(),
            };
            let joined = array(this, self.name())?
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .join(&sep);
            Ok(Value::String(joined))
        }
    }

    pub struct ToUpperCase;
    impl Method for ToUpperCase {
        fn name(&self) -> &'static str { "toUpperCase" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, this: &Value, _args: &[Value]) -> Result<Value> {
            Ok(Value::String(string(this, self.name())?.to_uppercase()))
        }
    }

    pub struct ToLowerCase;
    impl Method for ToLowerCase {
        fn name(&self) -> &'static str { "toLowerCase" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, this: &Value, _args: &[Value]) -> Result<Value> {
            Ok(Value::String(string(this, self.name())?.to_lowercase()))
        }
    }

    pub struct StrIncludes;
    impl Method for StrIncludes {
        fn name(&self) -> &'static str { "includes" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let s = string(this, self.name())?;
            Ok(Value::Bool(s.contains(search_arg(args).as_str())))
        }
    }

    pub struct StartsWith;
    impl Method for StartsWith {
        fn name(&self) -> &'static str { "startsWith" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let s = string(this, self.name())?;
            Ok(Value::Bool(s.starts_with(search_arg(args).as_str())))
        }
    }

    pub struct EndsWith;
    impl Method for EndsWith {
        fn name(&self) -> &'static str { "endsWith" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
            let s = string(this, self.name())?;
            Ok(Value::Bool(s.ends_with(search_arg(args).as_str())))
        }
    }

    pub struct Trim;
    impl Method for Trim {
        fn name(&self) -> &'static str { "trim" }
        fn receiver(&self) -> ReceiverKind { ReceiverKind::String }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, this: &Value, _args: &[Value]) -> Result<Value> {
            Ok(Value::String(string(this, self.name())?.trim().to_string()))
        }
    }
}

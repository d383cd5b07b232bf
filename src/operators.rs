use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{EvalError, Result};
use crate::value::Value;

pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;
pub type UnaryFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Binary and unary operator functions, keyed by symbol. Last write wins.
#[derive(Clone)]
pub struct OperatorTable {
    binary: HashMap<String, BinaryFn>,
    unary: HashMap<String, UnaryFn>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.add_binary("===", |a, b| Value::Bool(a == b));
        table.add_binary("!==", |a, b| Value::Bool(a != b));
        table.add_binary("==", |a, b| Value::Bool(loose_equals(a, b)));
        table.add_binary("!=", |a, b| Value::Bool(!loose_equals(a, b)));
        table.add_binary(">", |a, b| relational(a, b, |ord| ord == Ordering::Greater));
        table.add_binary("<", |a, b| relational(a, b, |ord| ord == Ordering::Less));
        table.add_binary(">=", |a, b| relational(a, b, |ord| ord != Ordering::Less));
        table.add_binary("<=", |a, b| relational(a, b, |ord| ord != Ordering::Greater));
        table.add_binary("+", add);
        table.add_binary("-", |a, b| Value::Number(a.to_number() - b.to_number()));
        table.add_binary("*", |a, b| Value::Number(a.to_number() * b.to_number()));
        table.add_binary("/", |a, b| Value::Number(a.to_number() / b.to_number()));
        table.add_binary("%", |a, b| Value::Number(a.to_number() % b.to_number()));
        table.add_binary("&", |a, b| int32(a.to_int32() & b.to_int32()));
        table.add_binary("|", |a, b| int32(a.to_int32() | b.to_int32()));
        table.add_binary("^", |a, b| int32(a.to_int32() ^ b.to_int32()));
        table.add_binary("<<", |a, b| int32(a.to_int32().wrapping_shl(shift_count(b))));
        table.add_binary(">>", |a, b| int32(a.to_int32().wrapping_shr(shift_count(b))));
        table.add_binary(">>>", |a, b| Value::Number(f64::from(a.to_uint32() >> shift_count(b))));
        table.add_binary("||", |a, b| if a.is_truthy() { a.clone() } else { b.clone() });
        table.add_binary("&&", |a, b| if a.is_truthy() { b.clone() } else { a.clone() });

        table.add_unary("!", |a| Value::Bool(!a.is_truthy()));
        table.add_unary("~", |a| int32(!a.to_int32()));
        table.add_unary("+", |a| Value::Number(a.to_number()));
        table.add_unary("-", |a| Value::Number(-a.to_number()));
        table
    }
}

impl OperatorTable {
    pub fn empty() -> Self {
        Self { binary: HashMap::new(), unary: HashMap::new() }
    }

    pub fn add_binary<F>(&mut self, op: impl Into<String>, f: F)
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.binary.insert(op.into(), Arc::new(f));
    }

    pub fn insert_binary(&mut self, op: impl Into<String>, f: BinaryFn) {
        self.binary.insert(op.into(), f);
    }

    pub fn remove_binary(&mut self, op: &str) -> Option<BinaryFn> {
        self.binary.remove(op)
    }

    /// Register the function currently bound to `op` under `alias` as well.
    pub fn alias_binary(&mut self, alias: impl Into<String>, op: &str) -> Result<()> {
        let f = self.binary(op).ok_or_else(|| EvalError::UnknownOperator(op.to_string()))?;
        self.binary.insert(alias.into(), f);
        Ok(())
    }

    pub fn binary(&self, op: &str) -> Option<BinaryFn> {
        self.binary.get(op).cloned()
    }

    pub fn add_unary<F>(&mut self, op: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.unary.insert(op.into(), Arc::new(f));
    }

    pub fn insert_unary(&mut self, op: impl Into<String>, f: UnaryFn) {
        self.unary.insert(op.into(), f);
    }

    pub fn remove_unary(&mut self, op: &str) -> Option<UnaryFn> {
        self.unary.remove(op)
    }

    pub fn alias_unary(&mut self, alias: impl Into<String>, op: &str) -> Result<()> {
        let f = self.unary(op).ok_or_else(|| EvalError::UnknownOperator(op.to_string()))?;
        self.unary.insert(alias.into(), f);
        Ok(())
    }

    pub fn unary(&self, op: &str) -> Option<UnaryFn> {
        self.unary.get(op).cloned()
    }

    /// True if `f` is the function currently registered under `op`.
    pub fn is_bound_to(&self, op: &str, f: &BinaryFn) -> bool {
        self.binary.get(op).is_some_and(|current| same_fn(current, f))
    }
}

fn same_fn(a: &BinaryFn, b: &BinaryFn) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Stand-in applied when an operator symbol has no registered function.
pub fn undefined_binary() -> BinaryFn {
    Arc::new(|_, _| Value::Undefined)
}

pub fn undefined_unary() -> UnaryFn {
    Arc::new(|_| Value::Undefined)
}

fn int32(n: i32) -> Value {
    Value::Number(f64::from(n))
}

fn shift_count(v: &Value) -> u32 {
    v.to_uint32() & 0x1f
}

fn to_primitive(v: &Value) -> Value {
    if v.is_primitive() {
        v.clone()
    } else {
        Value::String(v.to_js_string())
    }
}

fn add(a: &Value, b: &Value) -> Value {
    let (a, b) = (to_primitive(a), to_primitive(b));
    match (&a, &b) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Value::String(a.to_js_string() + &b.to_js_string())
        }
        _ => Value::Number(a.to_number() + b.to_number()),
    }
}

/// Abstract relational comparison: strings compare lexicographically,
/// everything else numerically. Comparisons involving NaN are false.
pub fn relational<F>(a: &Value, b: &Value, pred_on_ord: F) -> Value
where
    F: Fn(Ordering) -> bool,
{
    let (a, b) = (to_primitive(a), to_primitive(b));
    let ord = match (&a, &b) {
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    };
    Value::Bool(ord.is_some_and(pred_on_ord))
}

/// `==` with null/undefined equivalence and numeric coercion.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        (Number(x), String(_)) => *x == b.to_number(),
        (String(_), Number(y)) => a.to_number() == *y,
        (Bool(_), _) => loose_equals(&Number(a.to_number()), b),
        (_, Bool(_)) => loose_equals(a, &Number(b.to_number())),
        (Array(_) | Object(_) | Function(_), String(_) | Number(_)) => loose_equals(&to_primitive(a), b),
        (String(_) | Number(_), Array(_) | Object(_) | Function(_)) => loose_equals(a, &to_primitive(b)),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bin(op: &str, a: impl Into<Value>, b: impl Into<Value>) -> Value {
        let table = OperatorTable::default();
        let f = table.binary(op).unwrap();
        f(&a.into(), &b.into())
    }

    #[test]
    fn bitwise_and_shifts() {
        assert_eq!(bin("&", 4, 7), Value::from(4));
        assert_eq!(bin("<<", 4, 1), Value::from(8));
        assert_eq!(bin(">>>", -4, 1), Value::from(2_147_483_646.0));
        assert_eq!(bin(">>", -4, 1), Value::from(-2));
        assert_eq!(bin("<<", 1, 33), Value::from(2));
        assert_eq!(bin("^", 5, 1), Value::from(4));
    }

    #[test]
    fn plus_concatenates_strings() {
        assert_eq!(bin("+", "a", 1), Value::from("a1"));
        assert_eq!(bin("+", 1, 2), Value::from(3));
        assert_eq!(bin("+", true, 1), Value::from(2));
    }

    #[test]
    fn equality() {
        assert_eq!(bin("==", "1", 1), Value::Bool(true));
        assert_eq!(bin("===", "1", 1), Value::Bool(false));
        assert_eq!(bin("==", Value::Null, Value::Undefined), Value::Bool(true));
        assert_eq!(bin("==", Value::Null, 0), Value::Bool(false));
        assert_eq!(bin("!=", true, 1), Value::Bool(false));
        assert_eq!(bin("===", f64::NAN, f64::NAN), Value::Bool(false));
    }

    #[test]
    fn relational_comparisons() {
        assert_eq!(bin("<", "a", "b"), Value::Bool(true));
        assert_eq!(bin("<", "10", 9), Value::Bool(false));
        assert_eq!(bin(">=", 2, 2), Value::Bool(true));
        assert_eq!(bin("<=", f64::NAN, 1), Value::Bool(false));
    }

    #[test]
    fn logical_functions_return_operands() {
        assert_eq!(bin("||", 0, "x"), Value::from("x"));
        assert_eq!(bin("&&", 0, "x"), Value::from(0));
    }

    #[test]
    fn alias_of_missing_operator_fails() {
        let mut table = OperatorTable::default();
        let err = table.alias_binary("**", "pow").unwrap_err();
        assert_eq!(err, EvalError::UnknownOperator("pow".into()));
        table.alias_binary("and", "&&").unwrap();
        assert!(table.is_bound_to("&&", &table.binary("and").unwrap()));
    }
}

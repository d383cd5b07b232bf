use crate::value::{Map, Value};

/// Copy of a context taken when an arrow function is created.
///
/// Object contexts are copied as-is; anything else starts from an empty object,
/// the way spreading a primitive yields `{}`. Parameter bindings are written
/// into a fresh clone of the snapshot on every call, so neither the enclosing
/// context nor sibling invocations observe them.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    base: Map,
}

impl Snapshot {
    pub(crate) fn capture(context: &Value) -> Self {
        let base = match context {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Self { base }
    }

    /// Fresh copy of the snapshot with `names[i]` bound to `args[i]` (undefined when missing).
    pub(crate) fn bind(&self, names: &[String], args: &[Value]) -> Value {
        let mut context = Value::Object(self.base.clone());
        for (i, name) in names.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or_default();
            set_path(&mut context, &[name.as_str()], arg);
        }
        context
    }
}

/// Write `value` at `segments`, replacing non-object values along the way with objects.
pub(crate) fn set_path(target: &mut Value, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry((*first).to_string()).or_default();
        set_path(slot, rest, value);
    }
}

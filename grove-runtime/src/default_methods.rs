//! Default methods
//!
//! Methods every object answers (printing, iteration with closures,
//! categories and mixins, identity and equality) plus `Integer.times`.

use crate::category;
use crate::class::NativeMethod;
use crate::error::{RuntimeError, RuntimeResult};
use crate::meta::Extensions;
use crate::natives::{argument, class, closure};
use crate::runtime::Runtime;
use crate::value::{read, Value};
use grove_compiler::classpath;
use grove_parser::names;
use std::sync::Arc;

pub fn object_methods() -> Vec<NativeMethod> {
    vec![
        NativeMethod::instance("println", &[], println_empty),
        NativeMethod::instance("println", &[names::OBJECT], println),
        NativeMethod::instance("print", &[names::OBJECT], print),
        NativeMethod::instance("use", &[classpath::CLASS, names::CLOSURE], use_category),
        NativeMethod::instance("use", &[names::LIST, names::CLOSURE], use_categories),
        NativeMethod::instance("each", &[names::CLOSURE], each),
        NativeMethod::instance("collect", &[names::CLOSURE], collect),
        NativeMethod::instance("mixin", &[classpath::CLASS], mixin),
        NativeMethod::instance("getClass", &[], get_class),
        NativeMethod::instance("toString", &[], to_string),
        NativeMethod::instance("equals", &[names::OBJECT], equals),
        NativeMethod::instance("hashCode", &[], hash_code),
        NativeMethod::instance("is", &[names::OBJECT], is),
    ]
}

pub fn integer_methods() -> Vec<NativeMethod> {
    vec![NativeMethod::instance("times", &[names::CLOSURE], times)]
}

fn println_empty(rt: &Runtime, _: &Value, _: &[Value]) -> RuntimeResult<Value> {
    rt.write_output("\n");
    Ok(Value::Null)
}

fn println(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let mut line = rt.to_display_string(&argument(arguments, 0))?;
    line.push('\n');
    rt.write_output(&line);
    Ok(Value::Null)
}

fn print(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.write_output(&rt.to_display_string(&argument(arguments, 0))?);
    Ok(Value::Null)
}

/// `use(Category) { ... }`
fn use_category(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let category = Arc::clone(class(&argument(arguments, 0))?);
    let block = argument(arguments, 1);
    let _active = category::activate(vec![category]);
    rt.call_closure(closure(&block)?, Vec::new())
}

/// `use([CategoryA, CategoryB]) { ... }`
fn use_categories(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let Value::List(items) = argument(arguments, 0) else {
        return Err(RuntimeError::illegal_argument("use expects a list of classes"));
    };
    let categories = read(&items)
        .iter()
        .map(|item| class(item).cloned())
        .collect::<RuntimeResult<Vec<_>>>()?;
    let block = argument(arguments, 1);
    let _active = category::activate(categories);
    rt.call_closure(closure(&block)?, Vec::new())
}

/// Calls `body` for every element; a two-parameter closure over a map gets key and value
fn for_each(rt: &Runtime, this: &Value, body: &Value, mut visit: impl FnMut(Value)) -> RuntimeResult<()> {
    let body = closure(body)?;
    if let Value::Map(map) = this {
        if body.parameter_count() == 2 {
            let entries = read(map).clone();
            for (key, value) in entries {
                visit(rt.call_closure(body, vec![key.0, value])?);
            }
            return Ok(());
        }
    }
    let iterator = rt.iterator_of(this)?;
    while let Some(item) = rt.next_item(&iterator)? {
        visit(rt.call_closure(body, vec![item])?);
    }
    Ok(())
}

fn each(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    for_each(rt, this, &argument(arguments, 0), |_| {})?;
    Ok(this.clone())
}

fn collect(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let mut results = Vec::new();
    for_each(rt, this, &argument(arguments, 0), |result| results.push(result))?;
    Ok(Value::list(results))
}

fn times(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let count = this.as_int().unwrap_or_default();
    let block = argument(arguments, 0);
    let body = closure(&block)?;
    for i in 0..count {
        rt.call_closure(body, vec![Value::Int(i)])?;
    }
    Ok(Value::Null)
}

/// `Foo.mixin(Bar)` for a whole class, `foo.mixin(Bar)` for one object
fn mixin(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let mixin = Arc::clone(class(&argument(arguments, 0))?);
    match this {
        Value::Class(target) => rt.registry().add_mixin(target, &mixin),
        Value::Object(object) => {
            rt.mixins().add_class(object, &mixin);
            let current = rt.meta_class_of(this);
            let extensions = Extensions {
                mixins: vec![Arc::clone(&mixin)],
                methods: Vec::new(),
            };
            rt.set_meta_class(this, Some(Arc::new(current.extended(&extensions))))?;
            tracing::debug!(class = %object.class.name, mixin = %mixin.name, "added instance mixin");
        }
        other => {
            return Err(RuntimeError::illegal_argument(format!(
                "Cannot mix {} into a {}",
                mixin.name,
                other.class_name()
            )));
        }
    }
    Ok(Value::Null)
}

fn get_class(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Class(rt.class_of(this)))
}

fn to_string(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    match this {
        Value::Object(_) | Value::Closure(_) | Value::Iterator(_) | Value::ClassInfo(_) => {
            Ok(Value::string(this.to_plain_string()))
        }
        other => Ok(Value::string(rt.to_display_string(other)?)),
    }
}

fn equals(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Bool(*this == argument(arguments, 0)))
}

fn hash_code(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int(match this {
        Value::Null => 0,
        Value::Int(i) => *i,
        Value::Bool(true) => 1231,
        Value::Bool(false) => 1237,
        Value::Float(x) => {
            let bits = x.to_bits();
            (bits ^ (bits >> 32)) as i32 as i64
        }
        Value::Str(_) | Value::GString(_) => string_hash(this.as_str().unwrap_or_default()),
        other => other.identity().unwrap_or_default() as i64,
    }))
}

/// `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16 units, in 32-bit arithmetic
fn string_hash(text: &str) -> i64 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32)) as i64
}

/// Identity comparison
fn is(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let other = argument(arguments, 0);
    Ok(Value::Bool(match (this.identity(), other.identity()) {
        (Some(a), Some(b)) => a == b,
        _ => *this == other,
    }))
}

#[cfg(test)]
mod tests {
    use super::string_hash;

    #[test]
    fn string_hash_matches_the_usual_definition() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
    }
}

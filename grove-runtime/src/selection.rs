//! Method selection
//!
//! Candidates with the right arity are scored by how far each argument's
//! class is from the declared parameter type; the lowest total wins. A tie
//! between different signatures is an error, never a coin toss.

use crate::error::{RuntimeError, RuntimeResult};
use crate::meta::MetaMethod;
use crate::runtime::Runtime;
use crate::value::{read, Value};
use grove_parser::names;

/// Any reference type sits this far from `Object`
const OBJECT_DISTANCE: u32 = 64;
const VARARGS_DISTANCE: u32 = 1024;

#[derive(Debug, Clone)]
pub struct Selected {
    pub method: MetaMethod,
    /// At least one argument has to be converted to the parameter type
    pub coerce: bool,
}

/// How well one argument fits one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub distance: u32,
    pub coerce: bool,
}

impl Fit {
    const fn exact(distance: u32) -> Self {
        Self {
            distance,
            coerce: false,
        }
    }

    const fn coerced(distance: u32) -> Self {
        Self {
            distance,
            coerce: true,
        }
    }
}

pub fn parameter_fit(rt: &Runtime, parameter: &str, argument: &Value) -> Option<Fit> {
    use names::*;
    if parameter == OBJECT || parameter == DYNAMIC {
        return Some(Fit::exact(OBJECT_DISTANCE));
    }
    match (parameter, argument) {
        (_, Value::Ref(cell)) => parameter_fit(rt, parameter, &read(cell)),
        (INT | DOUBLE | PRIMITIVE_BOOLEAN, Value::Null) => None,
        (_, Value::Null) => Some(Fit::exact(1)),
        (INT, Value::Int(_)) | (DOUBLE, Value::Float(_)) | (PRIMITIVE_BOOLEAN, Value::Bool(_)) => {
            Some(Fit::exact(0))
        }
        (DOUBLE | FLOAT, Value::Int(_)) => Some(Fit::coerced(2)),
        (STRING, Value::GString(_)) => Some(Fit::coerced(3)),
        (INT | DOUBLE | PRIMITIVE_BOOLEAN, _) => None,
        _ => rt.class_of(argument).distance_to(parameter).map(Fit::exact),
    }
}

/// Total fit of `arguments` for `method`
pub fn method_fit(rt: &Runtime, method: &MetaMethod, arguments: &[Value]) -> Option<Fit> {
    if method.varargs {
        return Some(Fit::exact(VARARGS_DISTANCE));
    }
    if method.arity() != arguments.len() {
        return None;
    }
    method
        .parameter_types
        .iter()
        .zip(arguments)
        .try_fold(Fit::exact(0), |total, (parameter, argument)| {
            let fit = parameter_fit(rt, parameter, argument)?;
            Some(Fit {
                distance: total.distance + fit.distance,
                coerce: total.coerce || fit.coerce,
            })
        })
}

/// Picks the best of `candidates` for `arguments`
///
/// `class` and `name` only feed the ambiguity error.
pub fn select(
    rt: &Runtime,
    class: &str,
    name: &str,
    candidates: &[MetaMethod],
    arguments: &[Value],
) -> RuntimeResult<Option<Selected>> {
    let mut best: Vec<(&MetaMethod, Fit)> = Vec::new();
    for candidate in candidates {
        let Some(fit) = method_fit(rt, candidate, arguments) else {
            continue;
        };
        match best.first() {
            Some((_, current)) if fit.distance > current.distance => continue,
            Some((_, current)) if fit.distance < current.distance => best.clear(),
            _ => {}
        }
        best.push((candidate, fit));
    }

    match best.as_slice() {
        [] => Ok(None),
        [(method, fit), rest @ ..]
            if rest
                .iter()
                .all(|(other, _)| other.parameter_types == method.parameter_types) =>
        {
            Ok(Some(Selected {
                method: (*method).clone(),
                coerce: fit.coerce,
            }))
        }
        tied => Err(RuntimeError::AmbiguousMethod {
            class: class.to_string(),
            method: name.to_string(),
            arguments: argument_classes(arguments),
            candidates: tied.iter().map(|(m, _)| m.describe_parameters()).collect(),
        }),
    }
}

/// Converts arguments to the parameter types where the fit needed it
pub fn coerce_arguments(method: &MetaMethod, arguments: Vec<Value>) -> Vec<Value> {
    if method.varargs {
        return arguments;
    }
    arguments
        .into_iter()
        .zip(&method.parameter_types)
        .map(|(argument, parameter)| coerce(parameter, argument))
        .collect()
}

fn coerce(parameter: &str, argument: Value) -> Value {
    match (parameter, argument) {
        (names::STRING, Value::GString(gstring)) => Value::string(&gstring.text),
        (names::DOUBLE | names::FLOAT, Value::Int(i)) => Value::Float(i as f64),
        (_, argument) => argument,
    }
}

pub fn argument_classes(arguments: &[Value]) -> Vec<String> {
    arguments.iter().map(Value::class_name).collect()
}

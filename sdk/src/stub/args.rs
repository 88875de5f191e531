//! Argument and result marshaling.
//!
//! Arguments travel as a JSON array in the `Args` property, results as a
//! JSON value in `Result`.

use crate::error::{CadenceError, Result};
use crate::interface::ParamType;
use cadence_core::protocol::names;
use cadence_core::{Properties, ProxyMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};

/// Serialize an argument tuple into positional values.
pub fn encode_args<A: Serialize>(args: &A) -> Result<Vec<Value>> {
    Ok(match serde_json::to_value(args)? {
        Value::Null => Vec::new(),
        Value::Array(values) => values,
        other => vec![other],
    })
}

/// Deserialize positional values into an argument tuple.
pub fn decode_args<A: DeserializeOwned>(mut args: Vec<Value>) -> Result<A> {
    if args.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    match serde_json::from_value(Value::Array(args.clone())) {
        Ok(decoded) => Ok(decoded),
        Err(err) if args.len() == 1 => serde_json::from_value(args.remove(0)).map_err(|_| err.into()),
        Err(err) => Err(err.into()),
    }
}

pub fn decode_value<R: DeserializeOwned>(value: Option<Value>) -> Result<R> {
    Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
}

pub(crate) fn set_args(properties: &mut Properties, args: &[Value]) -> Result<()> {
    Ok(properties.set_json(names::ARGS, args)?)
}

pub(crate) fn get_args(properties: &Properties) -> Result<Vec<Value>> {
    Ok(properties.get_json(names::ARGS)?.unwrap_or_default())
}

pub(crate) fn set_result(properties: &mut Properties, value: &Value) -> Result<()> {
    Ok(properties.set_json(names::RESULT, value)?)
}

pub(crate) fn get_result(properties: &Properties) -> Result<Option<Value>> {
    Ok(properties.get_json(names::RESULT)?)
}

/// Turn an error property on a reply into a remote error.
pub(crate) fn check_reply(reply: ProxyMessage) -> Result<ProxyMessage> {
    match reply.error()? {
        Some(error) => Err(CadenceError::Remote(error)),
        None => Ok(reply),
    }
}

/// Best-effort conversion of loosely typed arguments to declared parameter
/// types. Values that cannot be converted pass through unchanged and any
/// mismatch surfaces as a remote invocation error.
pub fn adapt_args(args: Vec<Value>, params: &[ParamType]) -> Vec<Value> {
    args.into_iter()
        .enumerate()
        .map(|(i, value)| match params.get(i) {
            Some(param) => adapt(value, *param),
            None => value,
        })
        .collect()
}

fn adapt(value: Value, param: ParamType) -> Value {
    let converted = match (param, &value) {
        (ParamType::I32, _) => as_integer(&value)
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Value::from),
        (ParamType::I64, _) => as_integer(&value).map(Value::from),
        (ParamType::U32, _) => as_integer(&value)
            .and_then(|v| u32::try_from(v).ok())
            .map(Value::from),
        (ParamType::U64, _) => match &value {
            Value::Number(n) if n.is_u64() => None,
            _ => as_integer(&value)
                .and_then(|v| u64::try_from(v).ok())
                .map(Value::from),
        },
        (ParamType::F32 | ParamType::F64, Value::Number(n)) if !n.is_f64() => {
            n.as_f64().and_then(Number::from_f64).map(Value::Number)
        }
        (ParamType::F32 | ParamType::F64, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ParamType::Bool, Value::String(s)) => s.trim().parse::<bool>().ok().map(Value::Bool),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    };
    converted.unwrap_or(value)
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

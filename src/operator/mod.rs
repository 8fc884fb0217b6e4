//! Operator engine.
//!
//! Binary relational, logical, concatenation, and time-arithmetic operators
//! plus the `!`/`-` prefix forms. Unlike the assignment engine these
//! primitives never mutate their operands (the prefix forms excepted, which
//! flip in place exactly as the production runtime does) and return a fresh
//! Value. Match operators live in `matching`.

mod matching;

pub use matching::{not_regex_match, regex_match};

use std::cmp::Ordering;

use crate::error::{EvalError, EvalResult};
use crate::value::{Kind, Value, NANOS_PER_MILLI, NANOS_PER_SEC};

fn mismatch(left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "invalid type comparison {} and {}",
        left.kind(),
        right.kind()
    ))
}

/// `==`. INTEGER/FLOAT/STRING/TIME compare their payloads with the quirks
/// below; every other pair of same-kind operands falls back to comparing
/// rendered text. NaN on either side forces false, as does a not-set string.
pub fn equal(left: &Value, right: &Value) -> EvalResult<Value> {
    if left.kind() != right.kind() {
        return Err(mismatch(left, right));
    }
    if left.is_literal() {
        return Err(EvalError::LiteralRestriction(
            "could not use literal for equal operator".to_string(),
        ));
    }
    let result = match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            !lv.is_nan && !rv.is_nan && lv.value == rv.value
        }
        (Value::Float(lv), Value::Float(rv)) => !lv.is_nan && !rv.is_nan && lv.value == rv.value,
        (Value::String(lv), Value::String(rv)) => {
            // An absent header equals nothing, not even the same absent
            // header.
            !lv.not_set && !rv.not_set && lv.value == rv.value
        }
        (Value::Time(lv), Value::Time(rv)) => lv.value == rv.value,
        _ => left.render() == right.render(),
    };
    Ok(Value::boolean(result))
}

/// `!=`: boolean negation of `equal`.
pub fn not_equal(left: &Value, right: &Value) -> EvalResult<Value> {
    let eq = equal(left, right)?;
    match eq.as_bool() {
        Some(b) => Ok(Value::boolean(!b)),
        None => Ok(eq),
    }
}

/// Three-way comparison backing the four ordering operators. `None` means a
/// NaN forced the comparison, which every ordering operator reports as
/// false. RTIME is normalized to whole seconds against INTEGER and FLOAT.
fn compare(left: &Value, right: &Value) -> EvalResult<Option<Ordering>> {
    if left.is_literal() {
        return Err(EvalError::LiteralRestriction(format!(
            "left {} type could not be a literal",
            left.kind()
        )));
    }
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if lv.is_nan || rv.is_nan {
                return Ok(None);
            }
            Ok(Some(lv.value.cmp(&rv.value)))
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if lv.is_nan || rv.is_nan {
                return Ok(None);
            }
            Ok((lv.value as f64).partial_cmp(&rv.value))
        }
        (Value::Integer(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(EvalError::LiteralRestriction(
                    "right RTIME type could not be a literal".to_string(),
                ));
            }
            if lv.is_nan {
                return Ok(None);
            }
            Ok(Some(lv.value.cmp(&(rv.value / NANOS_PER_SEC))))
        }
        (Value::Float(lv), Value::Integer(rv)) => {
            if lv.is_nan || rv.is_nan {
                return Ok(None);
            }
            Ok(lv.value.partial_cmp(&(rv.value as f64)))
        }
        (Value::Float(lv), Value::Float(rv)) => {
            if lv.is_nan || rv.is_nan {
                return Ok(None);
            }
            Ok(lv.value.partial_cmp(&rv.value))
        }
        (Value::Float(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(EvalError::LiteralRestriction(
                    "right RTIME type could not be a literal".to_string(),
                ));
            }
            if lv.is_nan {
                return Ok(None);
            }
            Ok(lv.value.partial_cmp(&((rv.value / NANOS_PER_SEC) as f64)))
        }
        (Value::RTime(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(EvalError::LiteralRestriction(
                    "right INTEGER type could not be a literal".to_string(),
                ));
            }
            if rv.is_nan {
                return Ok(None);
            }
            Ok(Some((lv.value / NANOS_PER_SEC).cmp(&rv.value)))
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(EvalError::LiteralRestriction(
                    "right FLOAT type could not be a literal".to_string(),
                ));
            }
            if rv.is_nan {
                return Ok(None);
            }
            Ok(((lv.value / NANOS_PER_SEC) as f64).partial_cmp(&rv.value))
        }
        (Value::RTime(lv), Value::RTime(rv)) => Ok(Some(lv.value.cmp(&rv.value))),
        (Value::Time(lv), Value::Time(rv)) => Ok(Some(lv.value.cmp(&rv.value))),
        _ => Err(mismatch(left, right)),
    }
}

pub fn greater_than(left: &Value, right: &Value) -> EvalResult<Value> {
    let ord = compare(left, right)?;
    Ok(Value::boolean(matches!(ord, Some(Ordering::Greater))))
}

pub fn less_than(left: &Value, right: &Value) -> EvalResult<Value> {
    let ord = compare(left, right)?;
    Ok(Value::boolean(matches!(ord, Some(Ordering::Less))))
}

pub fn greater_equal(left: &Value, right: &Value) -> EvalResult<Value> {
    let ord = compare(left, right)?;
    Ok(Value::boolean(matches!(
        ord,
        Some(Ordering::Greater) | Some(Ordering::Equal)
    )))
}

pub fn less_equal(left: &Value, right: &Value) -> EvalResult<Value> {
    let ord = compare(left, right)?;
    Ok(Value::boolean(matches!(
        ord,
        Some(Ordering::Less) | Some(Ordering::Equal)
    )))
}

/// Truthiness of one side of a logical operator: BOOL as-is, a non-literal
/// STRING by non-emptiness. Everything else errors.
fn truthy(side: &str, value: &Value) -> EvalResult<bool> {
    match value {
        Value::Boolean(b) => Ok(b.value),
        Value::String(s) => {
            if s.literal {
                return Err(EvalError::LiteralRestriction(format!(
                    "{} STRING type could not be a literal for logical operator",
                    side
                )));
            }
            Ok(!s.not_set && !s.value.is_empty())
        }
        other => Err(EvalError::TypeMismatch(format!(
            "logical operator: {} type must be BOOL or STRING, got {}",
            side,
            other.kind()
        ))),
    }
}

pub fn logical_and(left: &Value, right: &Value) -> EvalResult<Value> {
    let lv = truthy("left", left)?;
    let rv = truthy("right", right)?;
    Ok(Value::boolean(lv && rv))
}

pub fn logical_or(left: &Value, right: &Value) -> EvalResult<Value> {
    let lv = truthy("left", left)?;
    let rv = truthy("right", right)?;
    Ok(Value::boolean(lv || rv))
}

fn concat_operand(side: &str, value: &Value) -> EvalResult<()> {
    match value.kind() {
        Kind::Acl | Kind::Ident => Err(EvalError::TypeMismatch(format!(
            "{} type could not be used in {} concatenation expression",
            value.kind(),
            side
        ))),
        Kind::String | Kind::Boolean => Ok(()),
        _ if value.is_literal() => Err(EvalError::LiteralRestriction(format!(
            "{} type could not be used as literal in {} concatenation expression",
            value.kind(),
            side
        ))),
        _ => Ok(()),
    }
}

/// String concatenation (infix `+`). The result is always a fresh STRING
/// built from both sides' rendered text.
pub fn concat(left: &Value, right: &Value) -> EvalResult<Value> {
    concat_operand("left", left)?;
    concat_operand("right", right)?;
    Ok(Value::string(format!("{}{}", left.render(), right.render())))
}

/// Binary `+`/`-` between TIME and RTIME. The duration must be an RTIME
/// literal; `-` subtracts it, any other operator adds it.
pub fn time_calc(op: &str, left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Time(lv), Value::RTime(rv)) => {
            if !rv.literal {
                return Err(EvalError::LiteralRestriction(
                    "right RTIME value must be a literal for time calculation".to_string(),
                ));
            }
            let delta = rv.value.div_euclid(NANOS_PER_MILLI);
            let mut out = lv.clone();
            let shifted = if op == "-" {
                lv.value.checked_sub(delta)
            } else {
                lv.value.checked_add(delta)
            };
            match shifted {
                Some(v) => out.value = v,
                None => out.out_of_bounds = true,
            }
            Ok(Value::Time(out))
        }
        (left, right) => Err(EvalError::TypeMismatch(format!(
            "time calculation requires TIME and RTIME, got {} and {}",
            left.kind(),
            right.kind()
        ))),
    }
}

/// Prefix `!`. BOOL flips in place; under a condition context a non-literal
/// STRING collapses to "is empty". Returns the resulting value.
pub fn not(value: &mut Value, with_condition: bool) -> EvalResult<Value> {
    match value {
        Value::Boolean(b) => {
            b.value = !b.value;
            Ok(Value::Boolean(b.clone()))
        }
        Value::String(s) => {
            if !with_condition {
                return Err(EvalError::TypeMismatch(
                    "unexpected \"!\" prefix operator for STRING".to_string(),
                ));
            }
            Ok(Value::boolean(s.not_set || s.value.is_empty()))
        }
        other => Err(EvalError::TypeMismatch(format!(
            "unexpected \"!\" prefix operator for {}",
            other.kind()
        ))),
    }
}

/// Prefix `-`. Flips the sign of INTEGER, FLOAT, or RTIME in place.
pub fn negate(value: &mut Value) -> EvalResult<()> {
    match value {
        Value::Integer(v) => {
            v.value = v.value.wrapping_neg();
            Ok(())
        }
        Value::Float(v) => {
            v.value = -v.value;
            Ok(())
        }
        Value::RTime(v) => {
            v.value = v.value.wrapping_neg();
            Ok(())
        }
        other => Err(EvalError::TypeMismatch(format!(
            "unexpected \"-\" prefix operator for {}",
            other.kind()
        ))),
    }
}

//! Arithmetic compound assignments: `+=`, `-=`, `*=`, `/=`, `%=`.
//!
//! Valid destinations are INTEGER, FLOAT, RTIME, and TIME only. Results
//! saturate instead of wrapping: a result outside the 64-bit range clamps to
//! the type's max/min and sets the sticky ±Inf flag, and a poisoned operand
//! on either side propagates instead of computing. The per-(destination,
//! source) literal restrictions are reverse-engineered from the production
//! runtime and are not symmetric — e.g. a FLOAT literal may not be added to
//! an INTEGER while an INTEGER literal adds to a FLOAT — so each pair is
//! spelled out rather than derived.

use crate::error::{EvalError, EvalResult};
use crate::value::{Float, Integer, Time, Value, NANOS_PER_MILLI, NANOS_PER_SEC};

/// Apply poison carried by either operand. Returns true when the left is now
/// poisoned and the arithmetic must be skipped. NaN wins over +Inf over -Inf,
/// left side before right.
fn propagate_int(lv: &mut Integer, rv_nan: bool, rv_pos: bool, rv_neg: bool) -> bool {
    if lv.is_nan || rv_nan {
        lv.is_nan = true;
        true
    } else if lv.is_pos_inf || rv_pos {
        lv.value = i64::MAX;
        lv.is_pos_inf = true;
        true
    } else if lv.is_neg_inf || rv_neg {
        lv.value = i64::MIN;
        lv.is_neg_inf = true;
        true
    } else {
        false
    }
}

fn propagate_float(lv: &mut Float, rv_nan: bool, rv_pos: bool, rv_neg: bool) -> bool {
    if lv.is_nan || rv_nan {
        lv.is_nan = true;
        true
    } else if lv.is_pos_inf || rv_pos {
        lv.value = f64::MAX;
        lv.is_pos_inf = true;
        true
    } else if lv.is_neg_inf || rv_neg {
        lv.value = f64::MIN;
        lv.is_neg_inf = true;
        true
    } else {
        false
    }
}

/// Store a widened integer result, clamping and flagging on overflow.
fn store_int_wide(lv: &mut Integer, result: i128) {
    if result > i64::MAX as i128 {
        lv.value = i64::MAX;
        lv.is_pos_inf = true;
    } else if result < i64::MIN as i128 {
        lv.value = i64::MIN;
        lv.is_neg_inf = true;
    } else {
        lv.value = result as i64;
    }
}

/// Store an integer result computed through floats: the float image decides
/// saturation, the exact value is stored when in range.
fn store_int_guarded(lv: &mut Integer, float_image: f64, exact: i64) {
    if float_image >= i64::MAX as f64 {
        lv.value = i64::MAX;
        lv.is_pos_inf = true;
    } else if float_image < i64::MIN as f64 {
        lv.value = i64::MIN;
        lv.is_neg_inf = true;
    } else {
        lv.value = exact;
    }
}

fn store_float(lv: &mut Float, result: f64) {
    if result == f64::INFINITY {
        lv.value = f64::MAX;
        lv.is_pos_inf = true;
    } else if result == f64::NEG_INFINITY {
        lv.value = f64::MIN;
        lv.is_neg_inf = true;
    } else {
        lv.value = result;
    }
}

/// Shift a TIME by a millisecond delta; overflow sets the sticky flag.
fn shift_time(lv: &mut Time, delta_millis: Option<i64>) {
    match delta_millis.and_then(|d| lv.value.checked_add(d)) {
        Some(v) => lv.value = v,
        None => lv.out_of_bounds = true,
    }
}

/// RTIME seconds as the float image the conversions below work from.
fn rtime_secs_f64(nanos: i64) -> f64 {
    nanos as f64 / NANOS_PER_SEC as f64
}

/// TIME as whole Unix seconds (floor).
fn time_unix(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

fn literal(msg: String) -> EvalError {
    EvalError::LiteralRestriction(msg)
}

fn mismatch(msg: String) -> EvalError {
    EvalError::TypeMismatch(msg)
}

// ============================================================================
// Addition (+=)
// ============================================================================

pub fn addition(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let wide = lv.value as i128 + rv.value as i128;
                store_int_wide(lv, wide);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not add to INTEGER".to_string()));
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let sum = lv.value as f64 + rv.value;
                let exact = lv.value.saturating_add(rv.value as i64);
                store_int_guarded(lv, sum, exact);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not add to INTEGER".to_string()));
            }
            if !propagate_int(lv, false, false, false) {
                let secs = rtime_secs_f64(rv.value);
                let sum = lv.value as f64 + secs;
                let exact = lv.value.saturating_add(secs as i64);
                store_int_guarded(lv, sum, exact);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Time(rv)) => {
            if !propagate_int(lv, false, false, false) {
                let wide = lv.value as i128 + time_unix(rv.value) as i128;
                store_int_wide(lv, wide);
            }
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid addition for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let sum = lv.value + rv.value as f64;
                store_float(lv, sum);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let sum = lv.value + rv.value;
                store_float(lv, sum);
            }
            Ok(())
        }
        (Value::Float(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not add to FLOAT".to_string()));
            }
            if !propagate_float(lv, false, false, false) {
                let sum = lv.value + rtime_secs_f64(rv.value);
                store_float(lv, sum);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Time(rv)) => {
            if !propagate_float(lv, false, false, false) {
                let sum = lv.value + time_unix(rv.value) as f64;
                store_float(lv, sum);
            }
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid addition for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not add to RTIME".to_string()));
            }
            lv.value = lv.value.wrapping_add(rv.value.wrapping_mul(NANOS_PER_SEC));
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not add to RTIME".to_string()));
            }
            lv.value = lv
                .value
                .wrapping_add((rv.value as i64).wrapping_mul(NANOS_PER_SEC));
            Ok(())
        }
        (Value::RTime(lv), Value::RTime(rv)) => {
            lv.value = lv.value.wrapping_add(rv.value);
            Ok(())
        }
        (Value::RTime(lv), Value::Time(rv)) => {
            // Unix seconds land as raw nanoseconds; a production quirk kept
            // as-is.
            lv.value = lv.value.wrapping_add(time_unix(rv.value));
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid addition for RTIME type, got {}",
            other.kind()
        ))),

        (Value::Time(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not add to TIME".to_string()));
            }
            shift_time(lv, rv.value.checked_mul(1000));
            Ok(())
        }
        (Value::Time(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not add to TIME".to_string()));
            }
            shift_time(lv, (rv.value as i64).checked_mul(1000));
            Ok(())
        }
        (Value::Time(lv), Value::RTime(rv)) => {
            shift_time(lv, Some(rv.value.div_euclid(NANOS_PER_MILLI)));
            Ok(())
        }
        (Value::Time(_), other) => Err(mismatch(format!(
            "invalid addition for TIME type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use addition assignment for type {}",
            other.kind()
        ))),
    }
}

// ============================================================================
// Subtraction (-=)
// ============================================================================

pub fn subtraction(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let wide = lv.value as i128 - rv.value as i128;
                store_int_wide(lv, wide);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not subtract from INTEGER".to_string()));
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let diff = lv.value as f64 - rv.value;
                let exact = lv.value.saturating_sub(rv.value as i64);
                store_int_guarded(lv, diff, exact);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not subtract from INTEGER".to_string()));
            }
            if !propagate_int(lv, false, false, false) {
                let secs = rtime_secs_f64(rv.value);
                let diff = lv.value as f64 - secs;
                let exact = lv.value.saturating_sub(secs as i64);
                store_int_guarded(lv, diff, exact);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Time(rv)) => {
            if !propagate_int(lv, false, false, false) {
                let wide = lv.value as i128 - time_unix(rv.value) as i128;
                store_int_wide(lv, wide);
            }
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid subtraction for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let diff = lv.value - rv.value as f64;
                store_float(lv, diff);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let diff = lv.value - rv.value;
                store_float(lv, diff);
            }
            Ok(())
        }
        (Value::Float(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not subtract from FLOAT".to_string()));
            }
            if !propagate_float(lv, false, false, false) {
                let diff = lv.value - rtime_secs_f64(rv.value);
                store_float(lv, diff);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Time(rv)) => {
            if !propagate_float(lv, false, false, false) {
                let diff = lv.value - time_unix(rv.value) as f64;
                store_float(lv, diff);
            }
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid subtraction for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not subtract from RTIME".to_string()));
            }
            lv.value = lv.value.wrapping_sub(rv.value.wrapping_mul(NANOS_PER_SEC));
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not subtract from RTIME".to_string()));
            }
            lv.value = lv
                .value
                .wrapping_sub((rv.value as i64).wrapping_mul(NANOS_PER_SEC));
            Ok(())
        }
        (Value::RTime(lv), Value::RTime(rv)) => {
            lv.value = lv.value.wrapping_sub(rv.value);
            Ok(())
        }
        (Value::RTime(lv), Value::Time(rv)) => {
            lv.value = lv.value.wrapping_sub(time_unix(rv.value));
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid subtraction for RTIME type, got {}",
            other.kind()
        ))),

        (Value::Time(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not subtract from TIME".to_string()));
            }
            shift_time(lv, rv.value.checked_mul(1000).and_then(i64::checked_neg));
            Ok(())
        }
        (Value::Time(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not subtract from TIME".to_string()));
            }
            shift_time(
                lv,
                (rv.value as i64).checked_mul(1000).and_then(i64::checked_neg),
            );
            Ok(())
        }
        (Value::Time(lv), Value::RTime(rv)) => {
            shift_time(lv, rv.value.div_euclid(NANOS_PER_MILLI).checked_neg());
            Ok(())
        }
        (Value::Time(_), other) => Err(mismatch(format!(
            "invalid subtraction for TIME type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use subtraction assignment for type {}",
            other.kind()
        ))),
    }
}

// ============================================================================
// Multiplication (*=)
// ============================================================================

pub fn multiplication(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let wide = lv.value as i128 * rv.value as i128;
                store_int_wide(lv, wide);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not multiply to INTEGER".to_string()));
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let product = lv.value as f64 * rv.value;
                store_int_guarded(lv, product, product as i64);
            }
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid multiplication for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let product = lv.value * rv.value as f64;
                store_float(lv, product);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let product = lv.value * rv.value;
                store_float(lv, product);
            }
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid multiplication for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            lv.value = lv.value.wrapping_mul(rv.value);
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            lv.value = lv.value.wrapping_mul(rv.value as i64);
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid multiplication for RTIME type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use multiplication assignment for type {}",
            other.kind()
        ))),
    }
}

// ============================================================================
// Division (/=)
// ============================================================================

pub fn division(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if rv.value == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                match lv.value.checked_div(rv.value) {
                    Some(v) => lv.value = v,
                    None => {
                        // i64::MIN / -1
                        lv.value = i64::MAX;
                        lv.is_pos_inf = true;
                    }
                }
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not divide to INTEGER".to_string()));
            }
            let divisor = rv.value as i64;
            if divisor == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                match lv.value.checked_div(divisor) {
                    Some(v) => lv.value = v,
                    None => {
                        lv.value = i64::MAX;
                        lv.is_pos_inf = true;
                    }
                }
            }
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid division for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            if rv.value == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let quotient = lv.value / rv.value as f64;
                store_float(lv, quotient);
            }
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            if rv.value == 0.0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                let quotient = lv.value / rv.value;
                store_float(lv, quotient);
            }
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid division for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            if rv.value == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lv.value = lv.value.wrapping_div(rv.value);
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            let divisor = rv.value as i64;
            if divisor == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lv.value = lv.value.wrapping_div(divisor);
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid division for RTIME type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use division assignment for type {}",
            other.kind()
        ))),
    }
}

// ============================================================================
// Remainder (%=)
// ============================================================================

pub fn remainder(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            if rv.value == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                lv.value = lv.value.checked_rem(rv.value).unwrap_or(0);
            }
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not remainder to INTEGER".to_string()));
            }
            let divisor = rv.value as i64;
            if divisor == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_int(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                lv.value = lv.value.checked_rem(divisor).unwrap_or(0);
            }
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid remainder for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            if rv.value == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                // The production runtime computes float remainders over
                // truncated integers.
                lv.value = (lv.value as i64).checked_rem(rv.value).unwrap_or(0) as f64;
            }
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            let divisor = rv.value as i64;
            if divisor == 0 && !rv.is_pos_inf && !rv.is_neg_inf && !rv.is_nan {
                lv.is_nan = true;
                return Err(EvalError::DivisionByZero);
            }
            if !propagate_float(lv, rv.is_nan, rv.is_pos_inf, rv.is_neg_inf) {
                lv.value = (lv.value as i64).checked_rem(divisor).unwrap_or(0) as f64;
            }
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid remainder for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            let modulus = rv.value.wrapping_mul(NANOS_PER_SEC);
            if modulus == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lv.value = lv.value.wrapping_rem(modulus);
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            let modulus = (rv.value as i64).wrapping_mul(NANOS_PER_SEC);
            if modulus == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lv.value = lv.value.wrapping_rem(modulus);
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid remainder for RTIME type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use remainder assignment for type {}",
            other.kind()
        ))),
    }
}

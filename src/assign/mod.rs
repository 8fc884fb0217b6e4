//! Assignment engine.
//!
//! `assign` implements `=`; the submodules implement the thirteen compound
//! operators and the hash accumulator. Every primitive mutates the payload
//! of the left operand in place — the left value keeps its kind and its
//! identity, so every alias of the same variable cell observes the change.
//!
//! Which (destination, source) pairs coerce, and which reject literal
//! sources, was reverse-engineered against the production runtime; the
//! tables here reproduce those findings rather than deriving anything from
//! first principles.

mod arith;
mod bits;
mod hash;

pub use arith::{addition, division, multiplication, remainder, subtraction};
pub use bits::{
    bitwise_and, bitwise_or, bitwise_xor, left_rotate, left_shift, right_rotate, right_shift,
};
pub use hash::update_hash;

use crate::error::{EvalError, EvalResult};
use crate::value::{Value, NANOS_PER_SEC};

fn literal(msg: String) -> EvalError {
    EvalError::LiteralRestriction(msg)
}

fn mismatch(msg: String) -> EvalError {
    EvalError::TypeMismatch(msg)
}

/// Plain assignment (`=`).
pub fn assign(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Integer(lv), Value::Integer(rv)) => {
            lv.value = rv.value;
            lv.is_nan = rv.is_nan;
            lv.is_pos_inf = rv.is_pos_inf;
            lv.is_neg_inf = rv.is_neg_inf;
            Ok(())
        }
        (Value::Integer(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not assign to INTEGER".to_string()));
            }
            lv.value = rv.value as i64;
            lv.is_nan = rv.is_nan;
            lv.is_pos_inf = rv.is_pos_inf;
            lv.is_neg_inf = rv.is_neg_inf;
            Ok(())
        }
        (Value::Integer(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not assign to INTEGER".to_string()));
            }
            lv.value = (rv.value as f64 / NANOS_PER_SEC as f64) as i64;
            Ok(())
        }
        (Value::Integer(lv), Value::Time(rv)) => {
            lv.value = if rv.out_of_bounds {
                0
            } else {
                rv.value.div_euclid(1000)
            };
            Ok(())
        }
        (Value::Integer(_), other) => Err(mismatch(format!(
            "invalid assignment for INTEGER type, got {}",
            other.kind()
        ))),

        (Value::Float(lv), Value::Integer(rv)) => {
            lv.value = rv.value as f64;
            lv.is_nan = rv.is_nan;
            lv.is_pos_inf = rv.is_pos_inf;
            lv.is_neg_inf = rv.is_neg_inf;
            Ok(())
        }
        (Value::Float(lv), Value::Float(rv)) => {
            lv.value = rv.value;
            lv.is_nan = rv.is_nan;
            lv.is_pos_inf = rv.is_pos_inf;
            lv.is_neg_inf = rv.is_neg_inf;
            Ok(())
        }
        (Value::Float(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not assign to FLOAT".to_string()));
            }
            lv.value = rv.value as f64 / NANOS_PER_SEC as f64;
            Ok(())
        }
        (Value::Float(lv), Value::Time(rv)) => {
            lv.value = if rv.out_of_bounds {
                0.0
            } else {
                rv.value.div_euclid(1000) as f64
            };
            Ok(())
        }
        (Value::Float(_), other) => Err(mismatch(format!(
            "invalid assignment for FLOAT type, got {}",
            other.kind()
        ))),

        (Value::String(lv), Value::String(rv)) => {
            lv.value = rv.value.clone();
            // The left slot tracks the right's absence: assigning a not-set
            // string leaves the destination not-set.
            lv.not_set = rv.not_set;
            Ok(())
        }
        (Value::String(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not assign to STRING".to_string()));
            }
            lv.value = right.render();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not assign to STRING".to_string()));
            }
            lv.value = right.render();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not assign to STRING".to_string()));
            }
            lv.value = right.render();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::Time(_)) => {
            lv.value = right.render();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::Backend(rv)) => {
            if rv.literal {
                return Err(literal("BACKEND identifier could not assign to STRING".to_string()));
            }
            lv.value = rv.target.name().to_string();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::Boolean(rv)) => {
            lv.value = if rv.value { "1" } else { "0" }.to_string();
            lv.not_set = false;
            Ok(())
        }
        (Value::String(lv), Value::Ip(rv)) => {
            lv.value = right.render();
            lv.not_set = rv.not_set;
            Ok(())
        }
        (Value::String(_), other) => Err(mismatch(format!(
            "invalid assignment for STRING type, got {}",
            other.kind()
        ))),

        (Value::RTime(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not assign to RTIME".to_string()));
            }
            lv.value = rv.value.wrapping_mul(NANOS_PER_SEC);
            Ok(())
        }
        (Value::RTime(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not assign to RTIME".to_string()));
            }
            // The float is taken as raw nanoseconds here; a production quirk
            // kept as-is (`+=` takes it as whole seconds).
            lv.value = rv.value as i64;
            Ok(())
        }
        (Value::RTime(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not assign to RTIME".to_string()));
            }
            lv.value = rv.value;
            Ok(())
        }
        (Value::RTime(lv), Value::Time(rv)) => {
            // Unix seconds land as raw nanoseconds.
            lv.value = rv.value.div_euclid(1000);
            Ok(())
        }
        (Value::RTime(_), other) => Err(mismatch(format!(
            "invalid assignment for RTIME type, got {}",
            other.kind()
        ))),

        (Value::Time(lv), Value::Integer(rv)) => {
            if rv.literal {
                return Err(literal("INTEGER literal could not assign to TIME".to_string()));
            }
            match rv.value.checked_mul(1000) {
                Some(millis) => lv.value = millis,
                None => lv.out_of_bounds = true,
            }
            Ok(())
        }
        (Value::Time(lv), Value::Float(rv)) => {
            if rv.literal {
                return Err(literal("FLOAT literal could not assign to TIME".to_string()));
            }
            match (rv.value as i64).checked_mul(1000) {
                Some(millis) => lv.value = millis,
                None => lv.out_of_bounds = true,
            }
            Ok(())
        }
        (Value::Time(lv), Value::RTime(rv)) => {
            if rv.literal {
                return Err(literal("RTIME literal could not assign to TIME".to_string()));
            }
            let secs = (rv.value as f64 / NANOS_PER_SEC as f64) as i64;
            match secs.checked_mul(1000) {
                Some(millis) => lv.value = millis,
                None => lv.out_of_bounds = true,
            }
            Ok(())
        }
        (Value::Time(lv), Value::Time(rv)) => {
            lv.value = rv.value;
            lv.out_of_bounds = rv.out_of_bounds;
            Ok(())
        }
        (Value::Time(_), other) => Err(mismatch(format!(
            "invalid assignment for TIME type, got {}",
            other.kind()
        ))),

        (Value::Backend(lv), Value::Backend(rv)) => {
            lv.target = rv.target.clone();
            lv.healthy = rv.healthy.clone();
            Ok(())
        }
        (Value::Backend(_), other) => Err(mismatch(format!(
            "invalid assignment for BACKEND type, got {}",
            other.kind()
        ))),

        (Value::Boolean(lv), Value::Boolean(rv)) => {
            lv.value = rv.value;
            Ok(())
        }
        (Value::Boolean(_), other) => Err(mismatch(format!(
            "invalid assignment for BOOL type, got {}",
            other.kind()
        ))),

        (Value::Ip(lv), Value::String(rv)) => match rv.value.parse() {
            Ok(addr) => {
                lv.value = Some(addr);
                lv.not_set = false;
                Ok(())
            }
            Err(_) => Err(EvalError::AclParse(format!(
                "invalid IP format, got {}",
                rv.value
            ))),
        },
        (Value::Ip(lv), Value::Ip(rv)) => {
            lv.value = rv.value;
            lv.not_set = false;
            Ok(())
        }
        (Value::Ip(_), other) => Err(mismatch(format!(
            "invalid assignment for IP type, got {}",
            other.kind()
        ))),

        (other, _) => Err(mismatch(format!(
            "could not use assignment for type {}",
            other.kind()
        ))),
    }
}

/// `||=`. Both operands must be BOOL.
pub fn logical_or(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Boolean(lv), Value::Boolean(rv)) => {
            lv.value = lv.value || rv.value;
            Ok(())
        }
        (left, right) => Err(mismatch(format!(
            "left and right type must be BOOL for logical OR assignment, left={}, right={}",
            left.kind(),
            right.kind()
        ))),
    }
}

/// `&&=`. Both operands must be BOOL.
pub fn logical_and(left: &mut Value, right: &Value) -> EvalResult<()> {
    match (left, right) {
        (Value::Boolean(lv), Value::Boolean(rv)) => {
            lv.value = lv.value && rv.value;
            Ok(())
        }
        (left, right) => Err(mismatch(format!(
            "left and right type must be BOOL for logical AND assignment, left={}, right={}",
            left.kind(),
            right.kind()
        ))),
    }
}

/// Dispatch an assignment by its operator token, as the statement evaluator
/// hands them over. `update_hash` is not reachable from here — the caller
/// selects it by variable name.
pub fn apply(op: &str, left: &mut Value, right: &Value) -> EvalResult<()> {
    match op {
        "=" => assign(left, right),
        "+=" => addition(left, right),
        "-=" => subtraction(left, right),
        "*=" => multiplication(left, right),
        "/=" => division(left, right),
        "%=" => remainder(left, right),
        "|=" => bitwise_or(left, right),
        "&=" => bitwise_and(left, right),
        "^=" => bitwise_xor(left, right),
        "<<=" => left_shift(left, right),
        ">>=" => right_shift(left, right),
        "rol=" => left_rotate(left, right),
        "ror=" => right_rotate(left, right),
        "||=" => logical_or(left, right),
        "&&=" => logical_and(left, right),
        other => Err(mismatch(format!("unexpected assignment operator {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::BackendDecl;
    use crate::value::{Backend, Integer, Kind, RTime, Str};
    use std::sync::Arc;

    #[test]
    fn test_assign_integer_sources() {
        let mut left = Value::integer(0);
        assign(&mut left, &Value::integer_literal(42)).unwrap();
        assert_eq!(left.render(), "42");

        let mut left = Value::integer(0);
        assign(&mut left, &Value::float(12.9)).unwrap();
        assert_eq!(left.render(), "12");

        let mut left = Value::integer(0);
        assert!(assign(&mut left, &Value::float_literal(12.9)).is_err());

        let mut left = Value::integer(0);
        assign(&mut left, &Value::rtime_secs(90)).unwrap();
        assert_eq!(left.render(), "90");

        let mut left = Value::integer(0);
        assign(&mut left, &Value::time_millis(12_500)).unwrap();
        assert_eq!(left.render(), "12");

        let mut left = Value::integer(0);
        assert!(assign(&mut left, &Value::string("1")).is_err());
        let mut left = Value::integer(0);
        assert!(assign(&mut left, &Value::boolean(true)).is_err());
    }

    #[test]
    fn test_assign_copies_poison_flags() {
        let right = Value::Integer(Integer {
            value: 0,
            is_nan: true,
            ..Default::default()
        });
        let mut left = Value::integer(7);
        assign(&mut left, &right).unwrap();
        assert_eq!(left.render(), "NAN");

        // Plain assignment replaces state wholesale, poison included.
        let mut left = Value::Integer(Integer {
            value: 0,
            is_pos_inf: true,
            ..Default::default()
        });
        assign(&mut left, &Value::integer(3)).unwrap();
        assert_eq!(left.render(), "3");
    }

    #[test]
    fn test_assign_string_sources() {
        let mut left = Value::string("");
        assign(&mut left, &Value::integer(10)).unwrap();
        assert_eq!(left.render(), "10");

        let mut left = Value::string("");
        assert!(assign(&mut left, &Value::integer_literal(10)).is_err());

        let mut left = Value::string("");
        assign(&mut left, &Value::float(1.5)).unwrap();
        assert_eq!(left.render(), "1.500");

        let mut left = Value::string("");
        assign(&mut left, &Value::boolean_literal(true)).unwrap();
        assert_eq!(left.render(), "1");

        let mut left = Value::string("");
        assign(&mut left, &Value::time_millis(0)).unwrap();
        assert_eq!(left.render(), "Thu, 01 Jan 1970 00:00:00 GMT");

        let mut left = Value::string("");
        assign(&mut left, &Value::ip("192.0.2.1".parse().unwrap())).unwrap();
        assert_eq!(left.render(), "192.0.2.1");
    }

    #[test]
    fn test_assign_string_tracks_not_set() {
        let mut left = Value::string("existing");
        assign(&mut left, &Value::not_set_string()).unwrap();
        let s = left.as_str().unwrap();
        assert!(s.not_set);
        assert_eq!(s.value, "");
    }

    #[test]
    fn test_assign_string_renders_poisoned_numbers() {
        let right = Value::Integer(Integer {
            value: 0,
            is_neg_inf: true,
            ..Default::default()
        });
        let mut left = Value::string("");
        assign(&mut left, &right).unwrap();
        assert_eq!(left.render(), "-inf");
    }

    #[test]
    fn test_assign_rtime_sources() {
        let mut left = Value::rtime_secs(0);
        assign(&mut left, &Value::integer(90)).unwrap();
        assert_eq!(left.render(), "90.000");

        // A bare float assigns as nanoseconds, not seconds.
        let mut left = Value::rtime_secs(0);
        assign(&mut left, &Value::float(1_500_000_000.0)).unwrap();
        assert_eq!(left.render(), "1.500");

        let mut left = Value::rtime_secs(0);
        assert!(assign(&mut left, &Value::rtime_literal_secs(60)).is_err());

        let mut left = Value::rtime_secs(0);
        assign(&mut left, &Value::rtime_secs(60)).unwrap();
        assert_eq!(left.render(), "60.000");
    }

    #[test]
    fn test_assign_time_sources() {
        let mut left = Value::time_millis(0);
        assign(&mut left, &Value::integer(90)).unwrap();
        assert_eq!(left.render(), "Thu, 01 Jan 1970 00:01:30 GMT");

        let mut left = Value::time_millis(0);
        assign(&mut left, &Value::rtime_secs(60)).unwrap();
        assert_eq!(left.render(), "Thu, 01 Jan 1970 00:01:00 GMT");

        let mut left = Value::time_millis(0);
        assert!(assign(&mut left, &Value::integer_literal(90)).is_err());

        let mut left = Value::time_millis(0);
        assign(&mut left, &Value::time_millis(1000)).unwrap();
        assert_eq!(left.render(), "Thu, 01 Jan 1970 00:00:01 GMT");
    }

    #[test]
    fn test_assign_backend_and_boolean() {
        let origin = Backend::new(Arc::new(BackendDecl::new("origin_0")));
        let fallback = Backend::new(Arc::new(BackendDecl::new("origin_1")));
        let mut left = Value::Backend(origin);
        assign(&mut left, &Value::Backend(fallback)).unwrap();
        assert_eq!(left.render(), "origin_1");
        assert!(assign(&mut left, &Value::string("origin_2")).is_err());

        let mut left = Value::boolean(false);
        assign(&mut left, &Value::boolean_literal(true)).unwrap();
        assert_eq!(left.render(), "1");
        assert!(assign(&mut left, &Value::integer(1)).is_err());
    }

    #[test]
    fn test_assign_ip_from_string_parses() {
        let mut left = Value::zero(Kind::Ip);
        assign(&mut left, &Value::string("203.0.113.9")).unwrap();
        assert_eq!(left.render(), "203.0.113.9");

        let mut left = Value::zero(Kind::Ip);
        assign(&mut left, &Value::string("2001:db8::1")).unwrap();
        assert_eq!(left.render(), "2001:db8::1");

        let mut left = Value::zero(Kind::Ip);
        let err = assign(&mut left, &Value::string("not-an-ip")).unwrap_err();
        assert!(matches!(err, EvalError::AclParse(_)));
    }

    #[test]
    fn test_assign_keeps_destination_kind() {
        let mut left = Value::integer(0);
        assign(&mut left, &Value::float(3.7)).unwrap();
        assert_eq!(left.kind(), Kind::Integer);

        let mut left = Value::string("x");
        assign(&mut left, &Value::rtime_secs(60)).unwrap();
        assert_eq!(left.kind(), Kind::String);
    }

    #[test]
    fn test_logical_compounds() {
        let mut left = Value::boolean(false);
        logical_or(&mut left, &Value::boolean(true)).unwrap();
        assert_eq!(left.as_bool(), Some(true));

        let mut left = Value::boolean(true);
        logical_and(&mut left, &Value::boolean(false)).unwrap();
        assert_eq!(left.as_bool(), Some(false));

        let mut left = Value::boolean(true);
        assert!(logical_or(&mut left, &Value::integer(1)).is_err());
        let mut left = Value::integer(1);
        assert!(logical_and(&mut left, &Value::boolean(true)).is_err());
    }

    #[test]
    fn test_apply_dispatches_tokens() {
        let mut left = Value::integer(6);
        apply("+=", &mut left, &Value::integer(4)).unwrap();
        apply("*=", &mut left, &Value::integer(3)).unwrap();
        apply("-=", &mut left, &Value::integer(5)).unwrap();
        assert_eq!(left.render(), "25");

        let mut left = Value::integer(0b1010);
        apply("&=", &mut left, &Value::integer(0b0110)).unwrap();
        assert_eq!(left.render(), "2");

        let mut left = Value::integer(1);
        assert!(apply("??=", &mut left, &Value::integer(1)).is_err());
    }

    #[test]
    fn test_aliased_cell_sees_compound_assignment() {
        use crate::value::shared;
        use std::rc::Rc;

        let cell = shared(Value::integer(1));
        let alias = Rc::clone(&cell);
        apply("+=", &mut cell.borrow_mut(), &Value::integer(9)).unwrap();
        assert_eq!(alias.borrow().render(), "10");
    }

    #[test]
    fn test_assign_rtime_from_time_is_raw_nanos() {
        // Unix seconds land as nanoseconds: one hour of TIME becomes 3.6µs
        // of RTIME. Pinned production quirk.
        let mut left = Value::RTime(RTime::default());
        assign(&mut left, &Value::time_millis(3_600_000)).unwrap();
        match &left {
            Value::RTime(rv) => assert_eq!(rv.value, 3_600),
            _ => unreachable!(),
        }
        assert_eq!(left.render(), "0.000");
    }

    #[test]
    fn test_assign_string_collection_untouched() {
        let mut left = Value::String(Str {
            value: "a, b".to_string(),
            collection: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        });
        assign(&mut left, &Value::string("c")).unwrap();
        let s = left.as_str().unwrap();
        assert_eq!(s.value, "c");
        assert_eq!(s.collection.len(), 2);
    }
}

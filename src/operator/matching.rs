//! The `~` and `!~` operators: regex matching and ACL containment.
//!
//! A successful textual match replaces the capture-group table wholesale;
//! a failed match leaves it untouched, so stale captures stay visible until
//! the next success. ACL entries are walked in declared order, and an
//! inverse entry matches as soon as it is reached regardless of actual
//! containment — reproduced as found in the production runtime, not
//! reinterpreted.

use std::net::IpAddr;

use crate::context::Context;
use crate::decl::AclDecl;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

pub fn regex_match(ctx: &mut Context, left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::String(lv), _) => {
            if lv.literal {
                return Err(EvalError::LiteralRestriction(
                    "left STRING type could not be a literal".to_string(),
                ));
            }
            match right {
                Value::String(rv) => {
                    if !rv.literal {
                        return Err(EvalError::LiteralRestriction(
                            "match pattern must be a STRING literal".to_string(),
                        ));
                    }
                    match_pattern(ctx, &lv.value, &rv.value)
                }
                Value::Regex(rv) => {
                    if rv.unsatisfiable {
                        return Err(EvalError::RegexCompile(format!(
                            "pattern {} could never match",
                            rv.pattern
                        )));
                    }
                    match_pattern(ctx, &lv.value, &rv.pattern)
                }
                Value::Acl(rv) => {
                    let addr: IpAddr = lv.value.parse().map_err(|_| {
                        EvalError::AclParse(format!("invalid IP format, got {}", lv.value))
                    })?;
                    Ok(Value::boolean(acl_contains(&rv.decl, addr)?))
                }
                other => Err(EvalError::TypeMismatch(format!(
                    "invalid type comparison STRING and {}",
                    other.kind()
                ))),
            }
        }
        (Value::Ip(lv), Value::Acl(rv)) => match lv.value {
            Some(addr) => Ok(Value::boolean(acl_contains(&rv.decl, addr)?)),
            None => Ok(Value::boolean(false)),
        },
        (left, right) => Err(EvalError::TypeMismatch(format!(
            "invalid type comparison {} and {}",
            left.kind(),
            right.kind()
        ))),
    }
}

pub fn not_regex_match(ctx: &mut Context, left: &Value, right: &Value) -> EvalResult<Value> {
    let matched = regex_match(ctx, left, right)?;
    match matched.as_bool() {
        Some(b) => Ok(Value::boolean(!b)),
        None => Ok(matched),
    }
}

fn match_pattern(ctx: &mut Context, subject: &str, pattern: &str) -> EvalResult<Value> {
    let re = ctx.compile(pattern)?.clone();
    // The production runtime never matches an empty subject, even against
    // patterns like `^$`.
    if subject.is_empty() {
        return Ok(Value::boolean(false));
    }
    match re.captures(subject) {
        Some(caps) => {
            ctx.captures.clear();
            for (i, group) in caps.iter().enumerate() {
                let text = group.map(|m| m.as_str().to_string()).unwrap_or_default();
                ctx.captures.insert(i.to_string(), text);
            }
            Ok(Value::boolean(true))
        }
        None => Ok(Value::boolean(false)),
    }
}

/// Walk the ACL's CIDR entries in declared order. The mask defaults to /32
/// when a bare address was declared.
fn acl_contains(decl: &AclDecl, addr: IpAddr) -> EvalResult<bool> {
    for entry in &decl.entries {
        let mask = entry.mask.unwrap_or(32);
        let network: IpAddr = entry.ip.parse().map_err(|_| {
            EvalError::AclParse(format!("failed to parse CIDR {}/{}", entry.ip, mask))
        })?;
        if cidr_contains(network, mask, addr)? {
            return Ok(true);
        } else if entry.inverse {
            // An inverse entry matches unconditionally once reached.
            return Ok(true);
        }
    }
    Ok(false)
}

fn cidr_contains(network: IpAddr, mask: u8, addr: IpAddr) -> EvalResult<bool> {
    match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) => {
            if mask > 32 {
                return Err(EvalError::AclParse(format!(
                    "failed to parse CIDR {}/{}",
                    net, mask
                )));
            }
            let bits = if mask == 0 {
                0
            } else {
                u32::MAX << (32 - u32::from(mask))
            };
            Ok((u32::from(net) & bits) == (u32::from(ip) & bits))
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) => {
            if mask > 128 {
                return Err(EvalError::AclParse(format!(
                    "failed to parse CIDR {}/{}",
                    net, mask
                )));
            }
            let bits = if mask == 0 {
                0
            } else {
                u128::MAX << (128 - u32::from(mask))
            };
            Ok((u128::from(net) & bits) == (u128::from(ip) & bits))
        }
        // Mixed families only meet through v4-mapped v6 addresses.
        (IpAddr::V4(net), IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
            Some(mapped) => cidr_contains(IpAddr::V4(net), mask, IpAddr::V4(mapped)),
            None => Ok(false),
        },
        (IpAddr::V6(net), IpAddr::V4(ip)) => {
            cidr_contains(IpAddr::V6(net), mask, IpAddr::V6(ip.to_ipv6_mapped()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::AclEntry;
    use crate::value::Regex;
    use std::sync::Arc;

    fn office_acl() -> Value {
        Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "office",
            vec![AclEntry::new("127.0.0.0", Some(16))],
        ))))
    }

    #[test]
    fn test_match_against_literal_pattern() {
        let mut ctx = Context::new();
        let got = regex_match(&mut ctx, &Value::string("example"), &Value::string_literal("amp"))
            .unwrap();
        assert_eq!(got.as_bool(), Some(true));
        assert_eq!(ctx.capture(0), Some("amp"));
    }

    #[test]
    fn test_non_literal_pattern_rejected() {
        let mut ctx = Context::new();
        let err =
            regex_match(&mut ctx, &Value::string("example"), &Value::string("amp")).unwrap_err();
        assert!(matches!(err, EvalError::LiteralRestriction(_)));
    }

    #[test]
    fn test_literal_subject_rejected() {
        let mut ctx = Context::new();
        let err = regex_match(
            &mut ctx,
            &Value::string_literal("example"),
            &Value::string_literal("amp"),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::LiteralRestriction(_)));
    }

    #[test]
    fn test_compile_failure_surfaces_and_flags_context() {
        let mut ctx = Context::new();
        let err = regex_match(
            &mut ctx,
            &Value::string("example"),
            &Value::string_literal("^++a"),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::RegexCompile(_)));
        assert_eq!(ctx.fastly_error.as_deref(), Some(crate::context::EREGSYN));
    }

    #[test]
    fn test_capture_groups_replace_wholesale() {
        let mut ctx = Context::new();
        regex_match(
            &mut ctx,
            &Value::string("www.example.com"),
            &Value::string_literal(r"^([^.]+)\.([^.]+)\.([^.]+)$"),
        )
        .unwrap();
        assert_eq!(ctx.capture(0), Some("www.example.com"));
        assert_eq!(ctx.capture(1), Some("www"));
        assert_eq!(ctx.capture(2), Some("example"));
        assert_eq!(ctx.capture(3), Some("com"));

        // A later narrower match drops the old entries entirely.
        regex_match(&mut ctx, &Value::string("example"), &Value::string_literal("amp")).unwrap();
        assert_eq!(ctx.capture(0), Some("amp"));
        assert_eq!(ctx.capture(1), None);
    }

    #[test]
    fn test_failed_match_keeps_stale_captures() {
        let mut ctx = Context::new();
        regex_match(&mut ctx, &Value::string("example"), &Value::string_literal("amp")).unwrap();
        let got = regex_match(
            &mut ctx,
            &Value::string("example"),
            &Value::string_literal("zzz"),
        )
        .unwrap();
        assert_eq!(got.as_bool(), Some(false));
        assert_eq!(ctx.capture(0), Some("amp"));
    }

    #[test]
    fn test_optional_group_captures_empty() {
        let mut ctx = Context::new();
        regex_match(
            &mut ctx,
            &Value::string("foo"),
            &Value::string_literal(r"^([^;]*)(;.*)?$"),
        )
        .unwrap();
        assert_eq!(ctx.capture(1), Some("foo"));
        assert_eq!(ctx.capture(2), Some(""));
    }

    #[test]
    fn test_empty_subject_never_matches() {
        let mut ctx = Context::new();
        let got =
            regex_match(&mut ctx, &Value::string(""), &Value::string_literal("^$")).unwrap();
        assert_eq!(got.as_bool(), Some(false));
        assert!(ctx.captures.is_empty());

        let got =
            regex_match(&mut ctx, &Value::string(""), &Value::string_literal("^(.*)$")).unwrap();
        assert_eq!(got.as_bool(), Some(false));
    }

    #[test]
    fn test_precompiled_pattern_operand() {
        let mut ctx = Context::new();
        let pattern = Value::Regex(Regex {
            pattern: r"^/api/v\d+/".to_string(),
            unsatisfiable: false,
        });
        let got = regex_match(&mut ctx, &Value::string("/api/v1/users"), &pattern).unwrap();
        assert_eq!(got.as_bool(), Some(true));

        let dead = Value::Regex(Regex {
            pattern: "a".to_string(),
            unsatisfiable: true,
        });
        let err = regex_match(&mut ctx, &Value::string("a"), &dead).unwrap_err();
        assert!(matches!(err, EvalError::RegexCompile(_)));
    }

    #[test]
    fn test_string_against_acl() {
        let mut ctx = Context::new();
        let acl = office_acl();
        let got = regex_match(&mut ctx, &Value::string("127.0.0.1"), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));

        let got = regex_match(&mut ctx, &Value::string("192.168.0.1"), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(false));

        let err = regex_match(&mut ctx, &Value::string("INVALID IP"), &acl).unwrap_err();
        assert!(matches!(err, EvalError::AclParse(_)));
    }

    #[test]
    fn test_ip_against_acl() {
        let mut ctx = Context::new();
        let acl = office_acl();
        let got = regex_match(&mut ctx, &Value::ip("127.0.0.1".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
        let got = regex_match(&mut ctx, &Value::ip("128.0.0.1".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(false));
    }

    #[test]
    fn test_acl_inverse_entry_matches_unconditionally() {
        // Once the walk reaches an inverse entry, the result is a match
        // whether or not the address is inside the range. Pinned production
        // behavior; not "exclude this range" semantics.
        let mut ctx = Context::new();
        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "blocklist",
            vec![
                AclEntry::new("10.0.0.0", Some(8)),
                AclEntry::inverse("172.16.0.0", Some(12)),
                AclEntry::new("192.168.0.0", Some(16)),
            ],
        ))));
        // Inside the inverse range.
        let got = regex_match(&mut ctx, &Value::ip("172.16.0.1".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
        // Far outside every range, still true: the inverse entry short-circuits.
        let got = regex_match(&mut ctx, &Value::ip("203.0.113.9".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
    }

    #[test]
    fn test_acl_entry_order_is_significant() {
        let mut ctx = Context::new();
        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "ordered",
            vec![
                AclEntry::new("192.168.0.0", Some(16)),
                AclEntry::inverse("0.0.0.0", Some(0)),
            ],
        ))));
        // Matches the first entry before the inverse is reached.
        let got =
            regex_match(&mut ctx, &Value::ip("192.168.10.1".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
    }

    #[test]
    fn test_acl_malformed_entry_errors() {
        let mut ctx = Context::new();
        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "broken",
            vec![AclEntry::new("not-an-ip", Some(8))],
        ))));
        let err =
            regex_match(&mut ctx, &Value::ip("10.0.0.1".parse().unwrap()), &acl).unwrap_err();
        assert!(matches!(err, EvalError::AclParse(_)));

        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "badmask",
            vec![AclEntry::new("10.0.0.0", Some(40))],
        ))));
        let err =
            regex_match(&mut ctx, &Value::ip("10.0.0.1".parse().unwrap()), &acl).unwrap_err();
        assert!(matches!(err, EvalError::AclParse(_)));
    }

    #[test]
    fn test_acl_default_mask_is_32() {
        let mut ctx = Context::new();
        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "single",
            vec![AclEntry::new("203.0.113.7", None)],
        ))));
        let got = regex_match(&mut ctx, &Value::ip("203.0.113.7".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
        let got = regex_match(&mut ctx, &Value::ip("203.0.113.8".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(false));
    }

    #[test]
    fn test_acl_ipv6_entry() {
        let mut ctx = Context::new();
        let acl = Value::Acl(crate::value::Acl::new(Arc::new(AclDecl::new(
            "v6",
            vec![AclEntry::new("2001:db8::", Some(64))],
        ))));
        let got = regex_match(&mut ctx, &Value::ip("2001:db8::42".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(true));
        let got = regex_match(&mut ctx, &Value::ip("2001:db9::42".parse().unwrap()), &acl).unwrap();
        assert_eq!(got.as_bool(), Some(false));
    }

    #[test]
    fn test_not_regex_match_negates_with_same_side_effects() {
        let mut ctx = Context::new();
        let got = not_regex_match(
            &mut ctx,
            &Value::string("example"),
            &Value::string_literal("amp"),
        )
        .unwrap();
        assert_eq!(got.as_bool(), Some(false));
        assert_eq!(ctx.capture(0), Some("amp"));
    }

    #[test]
    fn test_invalid_operand_kinds() {
        let mut ctx = Context::new();
        assert!(regex_match(&mut ctx, &Value::integer(10), &Value::string_literal("1")).is_err());
        assert!(regex_match(&mut ctx, &Value::string("a"), &Value::integer(1)).is_err());
        assert!(regex_match(&mut ctx, &Value::boolean(true), &office_acl()).is_err());
        assert!(
            regex_match(&mut ctx, &Value::rtime_secs(1), &Value::string_literal("1")).is_err()
        );
    }
}

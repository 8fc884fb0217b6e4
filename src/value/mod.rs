//! Runtime value model.
//!
//! Every VCL expression evaluates to a `Value`, a closed set of variants
//! matching Fastly's type system. A value's kind is fixed at construction;
//! the assignment engine mutates the payload of the left operand in place so
//! every holder of the same cell observes the change. The numeric variants
//! carry sticky poisoning flags (NaN / ±Inf / out-of-bounds) instead of
//! relying on native IEEE754 state: INTEGER has no native NaN, and poisoned
//! values must render as literal text and survive further arithmetic.

mod httpdate;
mod lenient;

pub use lenient::{LenientString, VString, NULL_STRING};

use std::cell::RefCell;
use std::fmt;
use std::net::IpAddr;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::decl::{AclDecl, BackendDecl, DirectorDecl};

pub const NANOS_PER_SEC: i64 = 1_000_000_000;
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// The VCL type tag of a value. Fixed for the value's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Ident,
    String,
    Ip,
    Boolean,
    Integer,
    Float,
    RTime,
    Time,
    Backend,
    Acl,
    Regex,
    LenientString,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "NULL",
            Kind::Ident => "IDENT",
            Kind::String => "STRING",
            Kind::Ip => "IP",
            Kind::Boolean => "BOOL",
            Kind::Integer => "INTEGER",
            Kind::Float => "FLOAT",
            Kind::RTime => "RTIME",
            Kind::Time => "TIME",
            Kind::Backend => "BACKEND",
            Kind::Acl => "ACL",
            Kind::Regex => "REGEX",
            Kind::LenientString => "LENIENT_STRING",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Variant payloads
// ============================================================================

/// A bare identifier (table, goto, ratecounter, penaltybox names).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ident {
    pub value: String,
    pub literal: bool,
}

/// STRING. `not_set` marks "the underlying header is absent" — a distinct
/// state from the empty string and from NULL. `collection` carries the
/// individual components of a multi-value header and is engine-opaque.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Str {
    pub value: String,
    pub literal: bool,
    pub not_set: bool,
    pub collection: Vec<String>,
}

/// IP. `value` is `None` for a freshly declared local.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ip {
    pub value: Option<IpAddr>,
    pub literal: bool,
    pub not_set: bool,
}

/// BOOL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boolean {
    pub value: bool,
    pub literal: bool,
}

/// INTEGER with sticky poisoning flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Integer {
    pub value: i64,
    pub literal: bool,
    pub is_nan: bool,
    pub is_pos_inf: bool,
    pub is_neg_inf: bool,
}

impl Integer {
    /// Render to its VCL string form, honoring sticky poisoning flags.
    pub fn render(&self) -> String {
        if self.is_nan {
            "NAN".to_string()
        } else if self.is_neg_inf {
            "-inf".to_string()
        } else if self.is_pos_inf {
            "inf".to_string()
        } else {
            self.value.to_string()
        }
    }
}

/// FLOAT with sticky poisoning flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Float {
    pub value: f64,
    pub literal: bool,
    pub is_nan: bool,
    pub is_pos_inf: bool,
    pub is_neg_inf: bool,
}

/// RTIME: a signed duration in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RTime {
    pub value: i64,
    pub literal: bool,
}

/// TIME: milliseconds since the Unix epoch. The typed zero value is
/// 1970-01-01T00:00:00Z. TIME never reports as a literal; arithmetic that
/// leaves the representable range sets the sticky `out_of_bounds` flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Time {
    pub value: i64,
    pub out_of_bounds: bool,
}

/// What a BACKEND value points at: a plain backend declaration or a director
/// wrapped as a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendTarget {
    Decl(Arc<BackendDecl>),
    Director(Arc<DirectorDecl>),
}

impl BackendTarget {
    pub fn name(&self) -> &str {
        match self {
            BackendTarget::Decl(d) => &d.name,
            BackendTarget::Director(d) => &d.name,
        }
    }
}

/// BACKEND. `healthy` is shared with the declaration's health checker:
/// clones and assignments alias the same atomic, reads/writes must go
/// through atomic load/store.
#[derive(Debug, Clone)]
pub struct Backend {
    pub target: BackendTarget,
    pub literal: bool,
    pub healthy: Arc<AtomicBool>,
}

impl Backend {
    pub fn new(decl: Arc<BackendDecl>) -> Self {
        Self {
            target: BackendTarget::Decl(decl),
            literal: false,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn director(decl: Arc<DirectorDecl>) -> Self {
        Self {
            target: BackendTarget::Director(decl),
            literal: false,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl PartialEq for Backend {
    fn eq(&self, other: &Self) -> bool {
        // Health is runtime state, not identity.
        self.target == other.target && self.literal == other.literal
    }
}

/// ACL reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Acl {
    pub decl: Arc<AclDecl>,
    pub literal: bool,
}

impl Acl {
    pub fn new(decl: Arc<AclDecl>) -> Self {
        Self {
            decl,
            literal: false,
        }
    }
}

/// A precompiled regex pattern, only valid as the right operand of a match.
/// `unsatisfiable` marks patterns the front end proved can never match;
/// matching against one is an error rather than a silent false.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Regex {
    pub pattern: String,
    pub unsatisfiable: bool,
}

// ============================================================================
// Value
// ============================================================================

/// A VCL runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Ident(Ident),
    String(Str),
    Ip(Ip),
    Boolean(Boolean),
    Integer(Integer),
    Float(Float),
    RTime(RTime),
    Time(Time),
    Backend(Backend),
    Acl(Acl),
    Regex(Regex),
    LenientString(LenientString),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Ident(_) => Kind::Ident,
            Value::String(_) => Kind::String,
            Value::Ip(_) => Kind::Ip,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::RTime(_) => Kind::RTime,
            Value::Time(_) => Kind::Time,
            Value::Backend(_) => Kind::Backend,
            Value::Acl(_) => Kind::Acl,
            Value::Regex(_) => Kind::Regex,
            Value::LenientString(_) => Kind::LenientString,
        }
    }

    /// True only when the value originated from a source-literal token.
    /// NULL, TIME, and lenient strings never report as literals.
    pub fn is_literal(&self) -> bool {
        match self {
            Value::Null | Value::Time(_) | Value::LenientString(_) => false,
            Value::Ident(v) => v.literal,
            Value::String(v) => v.literal,
            Value::Ip(v) => v.literal,
            Value::Boolean(v) => v.literal,
            Value::Integer(v) => v.literal,
            Value::Float(v) => v.literal,
            Value::RTime(v) => v.literal,
            Value::Backend(v) => v.literal,
            Value::Acl(v) => v.literal,
            Value::Regex(_) => true,
        }
    }

    /// Canonical VCL text form. Pure; sticky flags override the numeric
    /// payload (`NAN`, `inf`, `-inf`, `[out of bounds]`).
    pub fn render(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Ident(v) => v.value.clone(),
            Value::String(v) => v.value.clone(),
            Value::Ip(v) => match (&v.value, v.not_set) {
                (_, true) | (None, _) => String::new(),
                (Some(addr), false) => addr.to_string(),
            },
            Value::Boolean(v) => {
                if v.value {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            Value::Integer(v) => {
                if v.is_nan {
                    "NAN".to_string()
                } else if v.is_neg_inf {
                    "-inf".to_string()
                } else if v.is_pos_inf {
                    "inf".to_string()
                } else {
                    v.value.to_string()
                }
            }
            Value::Float(v) => {
                if v.is_nan {
                    "NAN".to_string()
                } else if v.is_neg_inf {
                    "-inf".to_string()
                } else if v.is_pos_inf {
                    "inf".to_string()
                } else {
                    format!("{:.3}", v.value)
                }
            }
            Value::RTime(v) => {
                // Truncated to milliseconds, printed as seconds.
                let millis = v.value / NANOS_PER_MILLI;
                format!("{:.3}", millis as f64 / 1000.0)
            }
            Value::Time(v) => {
                if v.out_of_bounds {
                    "[out of bounds]".to_string()
                } else {
                    httpdate::format(v.value)
                }
            }
            Value::Backend(v) => v.target.name().to_string(),
            Value::Acl(v) => v.decl.name.clone(),
            Value::Regex(v) => v.pattern.clone(),
            Value::LenientString(v) => v.render(),
        }
    }

    /// Typed zero value for a freshly declared local variable. Kinds that
    /// cannot be declared without a referent fall back to NULL.
    pub fn zero(kind: Kind) -> Value {
        match kind {
            Kind::String => Value::String(Str::default()),
            Kind::Ip => Value::Ip(Ip::default()),
            Kind::Boolean => Value::Boolean(Boolean::default()),
            Kind::Integer => Value::Integer(Integer::default()),
            Kind::Float => Value::Float(Float::default()),
            Kind::RTime => Value::RTime(RTime::default()),
            Kind::Time => Value::Time(Time::default()),
            _ => Value::Null,
        }
    }

    // ----- constructors -----

    pub fn integer(value: i64) -> Value {
        Value::Integer(Integer {
            value,
            ..Default::default()
        })
    }

    pub fn integer_literal(value: i64) -> Value {
        Value::Integer(Integer {
            value,
            literal: true,
            ..Default::default()
        })
    }

    pub fn float(value: f64) -> Value {
        Value::Float(Float {
            value,
            ..Default::default()
        })
    }

    pub fn float_literal(value: f64) -> Value {
        Value::Float(Float {
            value,
            literal: true,
            ..Default::default()
        })
    }

    pub fn string(value: impl Into<String>) -> Value {
        Value::String(Str {
            value: value.into(),
            ..Default::default()
        })
    }

    pub fn string_literal(value: impl Into<String>) -> Value {
        Value::String(Str {
            value: value.into(),
            literal: true,
            ..Default::default()
        })
    }

    /// A STRING whose underlying header is absent.
    pub fn not_set_string() -> Value {
        Value::String(Str {
            not_set: true,
            ..Default::default()
        })
    }

    pub fn boolean(value: bool) -> Value {
        Value::Boolean(Boolean {
            value,
            literal: false,
        })
    }

    pub fn boolean_literal(value: bool) -> Value {
        Value::Boolean(Boolean {
            value,
            literal: true,
        })
    }

    /// RTIME from whole seconds.
    pub fn rtime_secs(secs: i64) -> Value {
        Value::RTime(RTime {
            value: secs.wrapping_mul(NANOS_PER_SEC),
            literal: false,
        })
    }

    pub fn rtime_literal_secs(secs: i64) -> Value {
        Value::RTime(RTime {
            value: secs.wrapping_mul(NANOS_PER_SEC),
            literal: true,
        })
    }

    /// TIME from epoch milliseconds.
    pub fn time_millis(millis: i64) -> Value {
        Value::Time(Time {
            value: millis,
            out_of_bounds: false,
        })
    }

    pub fn ip(addr: IpAddr) -> Value {
        Value::Ip(Ip {
            value: Some(addr),
            ..Default::default()
        })
    }

    // ----- accessors -----

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(b.value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&Float> {
        match self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Declared variables live behind a shared, interior-mutable cell: a
/// compound assignment through one alias must be visible to every other
/// holder of the same variable.
pub type SharedValue = Rc<RefCell<Value>>;

pub fn shared(value: Value) -> SharedValue {
    Rc::new(RefCell::new(value))
}

/// Parse a VCL duration literal (`750ms`, `10s`, `2m`, `1.5h`, `3d`, `1y`)
/// into nanoseconds. Days and years are fixed 24h / 8760h multiples. Returns
/// `None` for unknown units or malformed counts.
pub fn parse_duration(text: &str) -> Option<i64> {
    let (count, unit_nanos) = if let Some(num) = text.strip_suffix("ms") {
        (num, NANOS_PER_MILLI)
    } else if let Some(num) = text.strip_suffix('s') {
        (num, NANOS_PER_SEC)
    } else if let Some(num) = text.strip_suffix('m') {
        (num, 60 * NANOS_PER_SEC)
    } else if let Some(num) = text.strip_suffix('h') {
        (num, 3600 * NANOS_PER_SEC)
    } else if let Some(num) = text.strip_suffix('d') {
        (num, 24 * 3600 * NANOS_PER_SEC)
    } else if let Some(num) = text.strip_suffix('y') {
        (num, 365 * 24 * 3600 * NANOS_PER_SEC)
    } else {
        return None;
    };
    let count: f64 = count.parse().ok()?;
    Some((count * unit_nanos as f64) as i64)
}

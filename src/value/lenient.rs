//! Lenient string handling for header contexts.
//!
//! Fastly renders an absent (not-set) STRING differently depending on where
//! it lands: assigned to a typed local it behaves as the empty string, but
//! appended into a header it shows up as the literal text `(null)` while
//! still comparing as absent. `LenientString` keeps the appended component
//! values so both renderings stay available; `VString` fronts a header slot
//! with a single assign/get contract regardless of which representation
//! backs it.

use super::{Str, Value};

/// Placeholder text a not-set component renders as in lenient contexts.
pub const NULL_STRING: &str = "(null)";

/// An ordered sequence of component values appended into one string slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LenientString {
    pub values: Vec<Value>,
    pub not_set: bool,
}

impl LenientString {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            not_set: false,
        }
    }

    /// Append copies of the given values.
    pub fn append(&mut self, values: &[Value]) {
        for v in values {
            self.values.push(v.clone());
        }
    }

    /// Lenient text form: not-set STRING/IP components contribute `(null)`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for v in &self.values {
            match v {
                Value::String(s) if s.not_set => out.push_str(NULL_STRING),
                Value::Ip(ip) if ip.not_set => out.push_str(NULL_STRING),
                _ => {}
            }
            out.push_str(&v.render());
        }
        out
    }

    /// Strict text form: not-set components are silently dropped, and a
    /// not-set slot renders empty regardless of its components.
    pub fn strict_render(&self) -> String {
        if self.not_set {
            return String::new();
        }
        let mut out = String::new();
        for v in &self.values {
            match v {
                Value::String(s) if s.not_set => continue,
                Value::Ip(ip) if ip.not_set => continue,
                _ => out.push_str(&v.render()),
            }
        }
        out
    }

    /// Collapse into a plain STRING, preserving the not-set state.
    pub fn to_str(&self) -> Str {
        if self.not_set {
            return Str {
                not_set: true,
                ..Default::default()
            };
        }
        Str {
            value: self.strict_render(),
            ..Default::default()
        }
    }
}

/// A façade over either a plain STRING or a `LenientString`, so callers
/// reading or writing a header never branch on the backing representation.
#[derive(Debug, Clone, PartialEq)]
pub struct VString {
    backing: Backing,
    pub not_set: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Backing {
    Plain(Str),
    Lenient(LenientString),
}

impl VString {
    pub fn plain(s: Str) -> Self {
        let not_set = s.not_set;
        Self {
            backing: Backing::Plain(s),
            not_set,
        }
    }

    pub fn lenient(ls: LenientString) -> Self {
        let not_set = ls.not_set;
        Self {
            backing: Backing::Lenient(ls),
            not_set,
        }
    }

    /// Wrap any value as a string façade. Non-string values render through.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::plain(s.clone()),
            Value::LenientString(ls) => Self::lenient(ls.clone()),
            other => Self::plain(Str {
                value: other.render(),
                ..Default::default()
            }),
        }
    }

    /// Strict text of whatever backs the slot.
    pub fn render(&self) -> String {
        match &self.backing {
            Backing::Plain(s) => s.value.clone(),
            Backing::Lenient(ls) => ls.strict_render(),
        }
    }

    pub fn is_literal(&self) -> bool {
        match &self.backing {
            Backing::Plain(s) => s.literal,
            Backing::Lenient(_) => false,
        }
    }

    /// Store a value into the slot. Assigning marks the slot as set; a
    /// lenient right-hand side switches the backing so its components (and
    /// their `(null)` rendering) are preserved.
    pub fn assign(&mut self, value: &Value) {
        self.not_set = false;
        match value {
            Value::LenientString(ls) => {
                self.backing = Backing::Lenient(LenientString::new(ls.values.clone()));
            }
            other => match &mut self.backing {
                Backing::Plain(s) => {
                    s.value = other.render();
                    s.not_set = false;
                }
                Backing::Lenient(ls) => {
                    ls.values = vec![other.clone()];
                    ls.not_set = false;
                }
            },
        }
    }

    /// Materialize the current contents as a fresh value.
    pub fn get(&self) -> Value {
        match &self.backing {
            Backing::Plain(s) => {
                let mut s = s.clone();
                s.not_set = self.not_set;
                Value::String(s)
            }
            Backing::Lenient(ls) => {
                let mut ls = ls.clone();
                ls.not_set = self.not_set;
                Value::LenientString(ls)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_set_str() -> Value {
        Value::String(Str {
            not_set: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_lenient_render_substitutes_null() {
        let mut ls = LenientString::default();
        ls.append(&[Value::string("a"), not_set_str(), Value::string("b")]);
        assert_eq!(ls.render(), "a(null)b");
    }

    #[test]
    fn test_strict_render_drops_not_set() {
        let mut ls = LenientString::default();
        ls.append(&[Value::string("a"), not_set_str(), Value::string("b")]);
        assert_eq!(ls.strict_render(), "ab");
    }

    #[test]
    fn test_not_set_ip_component() {
        let ip = Value::Ip(super::super::Ip {
            value: None,
            not_set: true,
            ..Default::default()
        });
        let ls = LenientString::new(vec![Value::string("ip="), ip]);
        assert_eq!(ls.render(), "ip=(null)");
        assert_eq!(ls.strict_render(), "ip=");
    }

    #[test]
    fn test_non_string_components_render_through() {
        let ls = LenientString::new(vec![Value::integer(10), Value::boolean(true)]);
        assert_eq!(ls.render(), "101");
        assert_eq!(ls.strict_render(), "101");
    }

    #[test]
    fn test_not_set_slot_strict_renders_empty() {
        let ls = LenientString {
            values: vec![Value::string("x")],
            not_set: true,
        };
        assert_eq!(ls.strict_render(), "");
        assert!(ls.to_str().not_set);
    }

    #[test]
    fn test_append_copies_components() {
        let source = Value::string("a");
        let mut ls = LenientString::default();
        ls.append(&[source.clone()]);
        if let Value::String(s) = &mut ls.values[0] {
            s.value.push('!');
        }
        assert_eq!(source.render(), "a");
    }

    #[test]
    fn test_vstring_plain_assign_get() {
        let mut vs = VString::plain(Str {
            not_set: true,
            ..Default::default()
        });
        assert!(matches!(vs.get(), Value::String(s) if s.not_set));

        vs.assign(&Value::integer(200));
        assert_eq!(vs.render(), "200");
        assert!(matches!(vs.get(), Value::String(s) if !s.not_set));
    }

    #[test]
    fn test_vstring_switches_to_lenient_backing() {
        let mut vs = VString::plain(Str::default());
        let ls = LenientString::new(vec![Value::string("a"), not_set_str()]);
        vs.assign(&Value::LenientString(ls));
        match vs.get() {
            Value::LenientString(got) => {
                assert_eq!(got.render(), "a(null)");
                assert_eq!(got.strict_render(), "a");
            }
            other => panic!("expected lenient backing, got {}", other.kind()),
        }
    }

    #[test]
    fn test_vstring_from_value_renders_through() {
        let vs = VString::from_value(&Value::rtime_secs(60));
        assert_eq!(vs.render(), "60.000");
        assert!(!vs.is_literal());
    }
}

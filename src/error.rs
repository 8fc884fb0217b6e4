//! Evaluation error taxonomy.
//!
//! Every engine primitive returns one of these as an ordinary value; nothing
//! in this crate aborts the process. The caller (the statement evaluator)
//! owns the policy for what an error means — abort the subroutine, restart,
//! or synthesize an error response.

use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An operand kind is not valid for this operator or destination.
    TypeMismatch(String),

    /// A literal operand was used where a runtime value is required, or the
    /// other way around.
    LiteralRestriction(String),

    /// Integer or duration division/remainder by zero. The left operand's
    /// NaN flag is poisoned before this is returned where the type carries
    /// one, so callers must check both the error and the flag.
    DivisionByZero,

    /// The right-hand pattern of a match operator failed to compile.
    RegexCompile(String),

    /// A malformed CIDR entry or an unparsable candidate address.
    AclParse(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            EvalError::LiteralRestriction(msg) => write!(f, "literal restriction: {}", msg),
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::RegexCompile(msg) => write!(f, "regex compile error: {}", msg),
            EvalError::AclParse(msg) => write!(f, "acl parse error: {}", msg),
        }
    }
}

impl error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = EvalError::TypeMismatch("invalid addition INTEGER type, got STRING".to_string());
        assert_eq!(
            err.to_string(),
            "type mismatch: invalid addition INTEGER type, got STRING"
        );
        assert_eq!(EvalError::DivisionByZero.to_string(), "division by zero");
    }

    #[test]
    fn test_variants_compare() {
        assert_eq!(EvalError::DivisionByZero, EvalError::DivisionByZero);
        assert_ne!(
            EvalError::RegexCompile("a".into()),
            EvalError::AclParse("a".into())
        );
    }
}

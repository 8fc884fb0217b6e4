//! The hash accumulator primitive behind `set req.hash += ...`.
//!
//! Selected by the caller on the variable's *name*, never by type dispatch.
//! There is no numeric addition here: the right operand is rendered,
//! concatenated onto the current accumulator text, and the accumulator is
//! replaced with the hex SHA-256 digest of the concatenation.

use sha2::{Digest, Sha256};

use crate::error::{EvalError, EvalResult};
use crate::value::{Kind, Str, Value};

pub fn update_hash(left: &mut Str, right: &Value) -> EvalResult<()> {
    if right.kind() != Kind::String && right.kind() != Kind::Boolean && right.is_literal() {
        return Err(EvalError::LiteralRestriction(format!(
            "only STRING and BOOL literals are allowed, got {}",
            right.kind()
        )));
    }
    if right.kind() == Kind::Ident {
        return Err(EvalError::TypeMismatch(format!(
            "unsupported type {}",
            right.kind()
        )));
    }

    let mut hasher = Sha256::new();
    hasher.update(left.value.as_bytes());
    hasher.update(right.render().as_bytes());
    let digest = hasher.finalize();
    left.value = digest.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(())
}

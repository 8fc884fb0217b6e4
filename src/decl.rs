//! Read-only declaration records.
//!
//! These mirror the named declarations a VCL program carries (`backend`,
//! `director`, `acl`, `ratecounter`, `penaltybox`). The engines only need a
//! name and, for ACLs, the ordered CIDR entries; everything else about a
//! declaration is owned by the excluded resolver layer.

/// A `backend` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDecl {
    pub name: String,
}

impl BackendDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A `director` declaration, usable wherever a backend is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorDecl {
    pub name: String,
}

impl DirectorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One entry of an `acl` declaration. `mask` is absent for single-address
/// entries and defaults to /32 at match time. `inverse` marks a `!`-prefixed
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub ip: String,
    pub mask: Option<u8>,
    pub inverse: bool,
}

impl AclEntry {
    pub fn new(ip: impl Into<String>, mask: Option<u8>) -> Self {
        Self {
            ip: ip.into(),
            mask,
            inverse: false,
        }
    }

    pub fn inverse(ip: impl Into<String>, mask: Option<u8>) -> Self {
        Self {
            ip: ip.into(),
            mask,
            inverse: true,
        }
    }
}

/// An `acl` declaration: a name and its entries in declared order. Order is
/// significant — containment tests walk entries first to last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclDecl {
    pub name: String,
    pub entries: Vec<AclEntry>,
}

impl AclDecl {
    pub fn new(name: impl Into<String>, entries: Vec<AclEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

/// A `ratecounter` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatecounterDecl {
    pub name: String,
}

impl RatecounterDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A `penaltybox` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyboxDecl {
    pub name: String,
}

impl PenaltyboxDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

//! SQL admission gate
//!
//! Textual heuristic applied to generated SQL before it reaches the engine.
//! The lowercased text must start with `select` and must not contain any of
//! the mutating keywords anywhere, including inside literals or comments.
//! This is not a parser and must stay exactly this permissive.

use std::fmt;

pub const READ_ONLY_PREFIX: &str = "select";

pub const FORBIDDEN_KEYWORDS: [&str; 5] = ["drop", "delete", "update", "insert", "alter"];

/// Why a candidate query was refused. Used for server-side logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotSelect,
    ForbiddenKeyword(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotSelect => write!(f, "query does not start with SELECT"),
            Rejection::ForbiddenKeyword(kw) => write!(f, "query contains forbidden keyword '{}'", kw),
        }
    }
}

pub fn check_sql(sql: &str) -> std::result::Result<(), Rejection> {
    let lowered = sql.to_lowercase();

    if !lowered.starts_with(READ_ONLY_PREFIX) {
        return Err(Rejection::NotSelect);
    }

    match FORBIDDEN_KEYWORDS.iter().find(|kw| lowered.contains(*kw)) {
        Some(kw) => Err(Rejection::ForbiddenKeyword(kw)),
        None => Ok(()),
    }
}

pub fn is_safe_sql(sql: &str) -> bool {
    check_sql(sql).is_ok()
}

// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Filter mini-language operators...
//!

use core::fmt;

/// Comparison operators of the `WHERE` mini-language.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Eq,  // equal to
    Neq, // not equal to
    Lt,  // less than
    Gt,  // greater than
    Lte, // less than or equal to
    Gte, // greater than or equal to
    Like,
    Not, // inverse of LIKE
    In,
    Between,
    // anything unrecognized; evaluates as LIKE.
    Other(String),
}

/// How a clause combines w/ the accumulated result of the clauses before
/// it. The first clause of a query carries no combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combine {
    And,
    Or,
}

impl Op {
    /// Map a raw token to an operator. Keywords are case-insensitive;
    /// unknown tokens are preserved for the LIKE fallback.
    pub(crate) fn from_token(s: &str) -> Self {
        match s {
            "=" => Op::Eq,
            "<>" => Op::Neq,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::Lte,
            ">=" => Op::Gte,
            x if x.eq_ignore_ascii_case("LIKE") => Op::Like,
            x if x.eq_ignore_ascii_case("NOT") => Op::Not,
            x if x.eq_ignore_ascii_case("IN") => Op::In,
            x if x.eq_ignore_ascii_case("BETWEEN") => Op::Between,
            x => Op::Other(x.to_owned()),
        }
    }

    // numeric comparison on the scanned views of both sides.
    pub(crate) fn numeric(&self) -> bool {
        matches!(self, Op::Lt | Op::Gt | Op::Lte | Op::Gte | Op::Between)
    }

    // substring semantics; i.e. LIKE, its inverse, and the fallback.
    pub(crate) fn substring(&self) -> bool {
        matches!(self, Op::Like | Op::Not | Op::Other(_))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Eq => write!(f, "="),
            Op::Neq => write!(f, "<>"),
            Op::Lt => write!(f, "<"),
            Op::Gt => write!(f, ">"),
            Op::Lte => write!(f, "<="),
            Op::Gte => write!(f, ">="),
            Op::Like => write!(f, "LIKE"),
            Op::Not => write!(f, "NOT"),
            Op::In => write!(f, "IN"),
            Op::Between => write!(f, "BETWEEN"),
            Op::Other(x) => write!(f, "{x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_is_case_insensitive() {
        assert_eq!(Op::from_token("like"), Op::Like);
        assert_eq!(Op::from_token("Between"), Op::Between);
        assert_eq!(Op::from_token(">="), Op::Gte);
    }

    #[test]
    fn test_unknown_token_is_preserved() {
        assert_eq!(Op::from_token("~="), Op::Other("~=".to_owned()));
        assert!(Op::from_token("~=").substring());
    }
}

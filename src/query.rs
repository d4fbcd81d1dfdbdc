// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! PEG parser rules and the record-level evaluator of the `WHERE`
//! mini-language.
//!
//! The grammar is deliberately small: a flat clause list w/ leading
//! combiners, no precedence and no grouping of clauses. Evaluation is
//! left-associative over the clause order --`a OR b AND c` is
//! `(a OR b) AND c`-- which is the contract downstream selections rely on.
//!

use crate::{
    MyError,
    op::{Combine, Op},
    table::Table,
    value::{Cell, parse_number, scan_number},
};
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// One parsed clause: `field op value`, w/ an optional second value
/// (BETWEEN) and the combiner that precedes the clause.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Clause {
    pub field: String,
    pub op: Op,
    pub value: String,
    pub value2: Option<String>,
    pub combine: Option<Combine>,
}

peg::parser! {
    pub(crate) grammar wherelang() for str {
        // howto handle case-insensitive tokens.  see
        // https://github.com/kevinmehall/rust-peg/issues/216
        rule i(literal: &'static str)
        = input:$([_]*<{literal.len()}>)
        {? if input.eq_ignore_ascii_case(literal) { Ok(()) } else { Err(literal) } }

        rule _ = quiet! { [' ' | '\t' | '\r' | '\n']* }
        rule __ = quiet! { [' ' | '\t' | '\r' | '\n']+ }

        // a bare token ends at whitespace; quotes and parens open the
        // greedy forms below.
        rule bare() -> String
        = x:$([^ ' ' | '\t' | '\r' | '\n' | '"' | '(']+) { x.to_owned() }

        // wrapping quotes are stripped; no escapes inside.
        rule quoted() -> String
        = "\"" x:$([^ '"']*) "\"" { x.to_owned() }

        // the multi-value set of IN; wrapping parens are stripped.
        rule group() -> String
        = "(" x:$([^ ')']*) ")" { x.to_owned() }

        rule field() -> String = quoted() / bare()

        rule value() -> String = quoted() / group() / bare()

        // BETWEEN consumes its AND + second value before any combiner is
        // considered.
        rule between_clause() -> Clause
        = f:field() __ o:bare() __ a:value() __ i("AND") __ b:value() {?
            if o.eq_ignore_ascii_case("BETWEEN") {
                Ok(Clause {
                    field: f,
                    op: Op::Between,
                    value: a,
                    value2: Some(b),
                    combine: None,
                })
            } else {
                Err("BETWEEN")
            }
        }

        rule simple_clause() -> Clause
        = f:field() __ o:bare() __ v:value() {
            Clause {
                field: f,
                op: Op::from_token(&o),
                value: v,
                value2: None,
                combine: None,
            }
        }

        rule clause() -> Clause = between_clause() / simple_clause()

        rule combiner() -> Combine
        = x:bare() {?
            if x.eq_ignore_ascii_case("AND") {
                Ok(Combine::And)
            } else if x.eq_ignore_ascii_case("OR") {
                Ok(Combine::Or)
            } else {
                Err("AND | OR")
            }
        }

        /// The full query, after any leading `WHERE`.
        pub rule query() -> Vec<Clause>
        = _ first:clause() rest:(__ c:combiner() __ k:clause() { (c, k) })* _ ![_] {
            let mut out = vec![first];
            for (c, mut k) in rest {
                k.combine = Some(c);
                out.push(k);
            }
            out
        }
    }
}

/// A parsed query: the ordered clause list of the predicate AST.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    /// Parse the text after `WHERE`. A leading `WHERE` keyword is
    /// tolerated and stripped.
    pub(crate) fn parse(input: &str) -> Result<Self, MyError> {
        let s = input.trim();
        let s = match s.get(..5) {
            Some(head) if head.eq_ignore_ascii_case("WHERE") => s[5..].trim_start(),
            _ => s,
        };
        let clauses = wherelang::query(s).map_err(MyError::Text)?;
        Ok(Self { clauses })
    }
}

// a clause value is either the parsed literal or, for the `$field$` form,
// a reference to another column of the same record.
#[derive(Debug)]
enum ValueRef {
    Literal(String),
    Column(usize),
}

#[derive(Debug)]
struct BoundClause {
    field_index: usize,
    op: Op,
    value: ValueRef,
    value2: Option<String>,
    combine: Option<Combine>,
    // compiled once for substring ops w/ a literal value.
    like_rx: Option<Regex>,
}

/// A query bound to one table's schema, ready to test records.
#[derive(Debug)]
pub(crate) struct BoundQuery {
    clauses: Vec<BoundClause>,
}

fn substring_rx(v: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(v))
        .case_insensitive(true)
        .build()
        .ok()
}

impl BoundQuery {
    /// Resolve every clause field (and `$field$` value reference) against
    /// the table. A clause naming an absent field raises the semantic
    /// error the caller turns into the fail-soft empty result.
    pub(crate) fn bind(query: &Query, table: &Table) -> Result<Self, MyError> {
        let mut clauses = Vec::with_capacity(query.clauses.len());
        for c in &query.clauses {
            let Some(field_index) = table.column_index(&c.field) else {
                debug!("select: no column named '{}'", c.field);
                return Err(MyError::Semantic(
                    format!("no column named '{}'", c.field).into(),
                ));
            };
            let value = column_ref(&c.value, table)
                .map(ValueRef::Column)
                .unwrap_or_else(|| ValueRef::Literal(c.value.clone()));
            let like_rx = match (&value, c.op.substring()) {
                (ValueRef::Literal(v), true) if v != "*" => substring_rx(v),
                _ => None,
            };
            clauses.push(BoundClause {
                field_index,
                op: c.op.clone(),
                value,
                value2: c.value2.clone(),
                combine: c.combine,
                like_rx,
            });
        }
        Ok(Self { clauses })
    }

    /// Test one record against the clause list.
    ///
    /// The accumulator starts out unset: the first clause seeds it, an
    /// `AND` over the unset state keeps it unset (and the final answer
    /// falls to FALSE), an `OR` over the unset state adopts the clause
    /// result. Do not "fix" this --downstream selections depend on it.
    pub(crate) fn matches(&self, record: &[Cell]) -> bool {
        let mut acc: Option<bool> = None;
        for c in &self.clauses {
            let r = clause_matches(c, record);
            acc = match c.combine {
                None => Some(r),
                Some(Combine::And) => acc.map(|a| a && r),
                Some(Combine::Or) => match acc {
                    None => Some(r),
                    Some(a) => Some(a || r),
                },
            };
        }
        acc.unwrap_or(false)
    }
}

fn clause_matches(c: &BoundClause, record: &[Cell]) -> bool {
    let cell = &record[c.field_index];
    let s = cell.text();
    let v = match &c.value {
        ValueRef::Literal(x) => x.clone(),
        ValueRef::Column(i) => record[*i].text().into_owned(),
    };

    if c.op.numeric() {
        let n = scan_number(&s);
        return match c.op {
            Op::Gt => n > scan_number(&v),
            Op::Lt => n < scan_number(&v),
            Op::Gte => n >= scan_number(&v),
            Op::Lte => n <= scan_number(&v),
            Op::Between => {
                let lo = scan_number(&v);
                let hi = c.value2.as_deref().map(scan_number).unwrap_or(lo);
                n >= lo && n <= hi
            }
            _ => unreachable!(),
        };
    }

    if c.op.substring() {
        let hit = if v == "*" {
            !s.is_empty()
        } else {
            match &c.like_rx {
                Some(rx) => rx.is_match(&s),
                // column-referenced pattern; compiled per record.
                None => substring_rx(&v).map(|rx| rx.is_match(&s)).unwrap_or(false),
            }
        };
        return match c.op {
            Op::Not => !hit,
            _ => hit,
        };
    }

    match c.op {
        Op::Eq => {
            if v == "*" {
                cell.is_populated()
            } else {
                s == v || numbers_equal(&s, &v)
            }
        }
        Op::Neq => !(s == v || numbers_equal(&s, &v)),
        Op::In => v.split(',').any(|e| e.trim() == s),
        _ => unreachable!(),
    }
}

// equality through the numeric view applies only when both sides scan; the
// 0-on-failure fallback would otherwise equate every pair of non-numeric
// strings.
fn numbers_equal(a: &str, b: &str) -> bool {
    matches!((parse_number(a), parse_number(b)), (Some(x), Some(y)) if x == y)
}

fn column_ref(value: &str, table: &Table) -> Option<usize> {
    let inner = value.strip_prefix('$')?.strip_suffix('$')?;
    table.column_index(inner)
}

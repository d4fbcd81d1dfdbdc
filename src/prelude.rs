// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Group imports of many common traits and types by adding a glob import
//! for use by clients of this library.
//!

pub use super::alert::*;
pub use super::broker::*;
pub use super::column::*;
pub use super::condense::*;
pub use super::derive::*;
pub use super::error::*;
pub use super::feed::*;
pub use super::lookup::*;
pub use super::merge::*;
pub use super::pivot::*;
pub use super::table::*;
pub use super::value::*;

pub use super::ds::{ParserOptions, SourceKind, register_parser};
pub use super::wkb;

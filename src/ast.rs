//! # Query Expression - Abstract Syntax Trees
//!
//! This module defines the two trees the crate works with:
//!
//! 1. The **canonical expression tree** ([`Expression`]) produced by both
//!    compiler front ends and serialized into the `$`-keyed wire form
//!    consumed by a SQL formatter.
//! 2. The **closure syntax tree** ([`SyntaxNode`], [`Closure`]) that the
//!    closure parser builds from source text before the closure compiler
//!    lowers it into an [`Expression`].
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens of closure source text
//! - **[syntax]** - Generic expression nodes of closure source
//! - **[statements]** - Block statements and closure bodies
//! - **[query]** - A parsed closure with its declared parameters
//! - **[expressions]** - Canonical expression nodes
//! - **[operators]** - Arithmetic, comparison, and logical operators
//!
//! ## Wire Form
//!
//! ```text
//! x => x.price >= 400 && x.price < 500
//! ```
//!
//! compiles to
//!
//! ```text
//! { "$and": [ { "$ge": [ { "$name": "price" }, 400 ] },
//!             { "$lt": [ { "$name": "price" }, 500 ] } ] }
//! ```
//!
//! ### Conventions
//!
//! - Literals are embedded unwrapped (`400`, `"Laptops"`)
//! - Field references are `{ "$name": "<dotted.path>" }`
//! - Operators and functions are single-key objects: `{ "$op": [args] }`
//! - Single-argument functions may flatten: `{ "$year": { "$name": "d" } }`
//!
//! ## Examples
//!
//! ### Constant Folding
//!
//! ```text
//! x => x.price > (2 + 3)      // { "$gt": [ { "$name": "price" }, 5 ] }
//! ```
//!
//! ### Projection
//!
//! ```text
//! x => ({ id: x.id, lastName: x.familyName })
//! // [ { "id": { "$name": "id" } }, { "lastName": { "$name": "familyName" } } ]
//! ```
pub mod expressions;
pub mod operators;
pub mod query;
pub mod statements;
pub mod syntax;
pub mod tokens;

pub use expressions::Expression;
pub use operators::{ArithmeticOp, BinOp, ComparisonOp, LogicalOp, SortDirection};
pub use query::Closure;
pub use statements::{ClosureBody, Statement};
pub use syntax::{PropertyKey, SyntaxNode};
pub use tokens::Token;

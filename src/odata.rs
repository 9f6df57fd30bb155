//! OData-style query-option front end.
//!
//! Parses `$filter`, `$select`, `$orderby`, `$groupby` and `$expand` option
//! strings into the same [`Expression`] tree the closure compiler produces,
//! and assembles a whole option set with [`parse_query_options`].
//!
//! # Grammar notes
//!
//! - Member paths are identifiers joined by `/` (`category/name`) and are
//!   emitted dotted (`category.name`). A leading `$it/` is dropped.
//! - Comparison and arithmetic operators bind by precedence
//!   (`mul div mod` > `add sub` > `eq ne gt ge lt le`).
//! - Logical chains thread to the right and flatten:
//!   `A and B and C` is `$and[A, B, C]`, `A and B or C` is
//!   `$and[A, $or[B, C]]`.
//! - `case(cond : result, ..., true : default)` builds a switch node.
//!
//! ```
//! use query_expr::odata::{QueryOptionParser, QueryOptions};
//! use serde_json::json;
//!
//! let options = QueryOptions {
//!     filter: Some("price ge 400 and category eq 'Laptops'".into()),
//!     top: Some(25),
//!     ..Default::default()
//! };
//! let query = QueryOptionParser::new().parse_query_options(&options).unwrap();
//! assert_eq!(
//!     query.serialize().unwrap(),
//!     json!({
//!         "$where": { "$and": [
//!             { "$ge": [ { "$name": "price" }, 400 ] },
//!             { "$eq": [ { "$name": "category" }, "Laptops" ] }
//!         ] },
//!         "$take": 25
//!     })
//! );
//! ```

mod options;
mod parser;
pub mod tokenizer;

use std::{fmt, sync::Arc};

pub use options::{ExpandOption, ParsedQuery, QueryOptions};

use crate::{
    ast::Expression, error::CompileResult, resolver::MethodResolverChain,
    validator::FieldNameValidator,
};

/// Mutable record handed to member-resolving hooks before a member path
/// becomes a field reference. Hooks may rewrite `member`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberResolvingEvent {
    /// Expanded entity the member belongs to; `None` at the top level
    pub target: Option<String>,
    pub member: String,
}

/// Mutable record handed to method-resolving hooks before a call goes
/// through the resolver chain. Setting `result` replaces the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResolvingEvent {
    pub target: Option<String>,
    pub method: String,
    pub args: Vec<Expression>,
    pub result: Option<Expression>,
}

pub type MemberResolvingHook = Arc<dyn Fn(&mut MemberResolvingEvent) + Send + Sync>;
pub type MethodResolvingHook = Arc<dyn Fn(&mut MethodResolvingEvent) + Send + Sync>;

/// Parser for query-option strings.
///
/// Configuration is immutable after building; every parse call keeps its
/// token cursor locally, so one instance can be shared.
#[derive(Clone)]
pub struct QueryOptionParser {
    validator: Arc<FieldNameValidator>,
    resolvers: Arc<MethodResolverChain>,
    member_hooks: Vec<MemberResolvingHook>,
    method_hooks: Vec<MethodResolvingHook>,
}

impl Default for QueryOptionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryOptionParser {
    pub fn new() -> Self {
        QueryOptionParser {
            validator: FieldNameValidator::installed(),
            resolvers: Arc::new(MethodResolverChain::default()),
            member_hooks: Vec::new(),
            method_hooks: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: impl Into<Arc<FieldNameValidator>>) -> Self {
        self.validator = validator.into();
        self
    }

    pub fn with_resolvers(mut self, resolvers: impl Into<Arc<MethodResolverChain>>) -> Self {
        self.resolvers = resolvers.into();
        self
    }

    /// Registers a hook fired, in parse order, for every member path.
    pub fn on_member_resolving(
        mut self,
        hook: impl Fn(&mut MemberResolvingEvent) + Send + Sync + 'static,
    ) -> Self {
        self.member_hooks.push(Arc::new(hook));
        self
    }

    /// Registers a hook fired, in parse order, for every non-`case` call.
    pub fn on_method_resolving(
        mut self,
        hook: impl Fn(&mut MethodResolvingEvent) + Send + Sync + 'static,
    ) -> Self {
        self.method_hooks.push(Arc::new(hook));
        self
    }

    /// Parses a `$filter` string.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn parse_filter(&self, text: &str) -> CompileResult<Expression> {
        self.filter(text, None)
    }

    /// Parses a `$select` string.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn parse_select(&self, text: &str) -> CompileResult<Vec<Expression>> {
        self.select(text, None)
    }

    /// Parses an `$orderby` string.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn parse_order_by(&self, text: &str) -> CompileResult<Vec<Expression>> {
        self.order_by(text, None)
    }

    /// Parses a `$groupby` string. Same grammar as `$select`.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn parse_group_by(&self, text: &str) -> CompileResult<Vec<Expression>> {
        self.select(text, None)
    }

    /// Parses an `$expand` string into per-entity descriptors.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn parse_expand(&self, text: &str) -> CompileResult<Vec<ExpandOption>> {
        self.expand(text)
    }

    /// Parses every option present in `options`.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub fn parse_query_options(&self, options: &QueryOptions) -> CompileResult<ParsedQuery> {
        self.query(options, None)
    }

    fn resolve_member(&self, member: String, target: Option<&str>) -> CompileResult<Expression> {
        let mut event = MemberResolvingEvent {
            target: target.map(str::to_string),
            member,
        };
        for hook in &self.member_hooks {
            hook(&mut event);
        }
        self.validator.test(&event.member, true, true)?;
        Ok(Expression::Member(event.member))
    }

    fn resolve_method(
        &self,
        method: String,
        args: Vec<Expression>,
        target: Option<&str>,
    ) -> CompileResult<Expression> {
        let mut event = MethodResolvingEvent {
            target: target.map(str::to_string),
            method,
            args,
            result: None,
        };
        for hook in &self.method_hooks {
            hook(&mut event);
        }
        match event.result {
            Some(result) => Ok(result),
            None => self.resolvers.resolve(&event.method, event.args),
        }
    }
}

impl fmt::Debug for QueryOptionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptionParser")
            .field("validator", &self.validator)
            .field("resolvers", &self.resolvers.len())
            .field("member_hooks", &self.member_hooks.len())
            .field("method_hooks", &self.method_hooks.len())
            .finish()
    }
}

/// Parses an option set with a default [`QueryOptionParser`].
pub fn parse_query_options(options: &QueryOptions) -> CompileResult<ParsedQuery> {
    QueryOptionParser::new().parse_query_options(options)
}

//! Method resolution.
//!
//! Host method names (`getFullYear`, `toLowerCase`, `Math.floor`) and
//! query-option function names (`year`, `tolower`) are mapped onto the
//! canonical function set by an ordered chain of per-domain resolvers. The
//! first resolver that recognises a name wins; names nobody recognises
//! become a generic method call.

use crate::{ast::Expression, error::CompileResult};

/// Builds a canonical node from already-translated arguments.
pub type Translator<'a> = Box<dyn Fn(Vec<Expression>) -> CompileResult<Expression> + 'a>;

/// One link of the resolver chain.
pub trait MethodResolver: Send + Sync {
    /// Returns a translator when this resolver recognises `name`.
    fn test(&self, name: &str) -> Option<Translator<'_>>;
}

/// How a table entry shapes its call node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallForm {
    /// Flattens a single argument: `{ "$year": <arg> }`
    Simple,
    /// Always an argument array: `{ "$round": [<args>] }`
    Array,
}

type Entry = (&'static str, &'static str, CallForm);

/// Builds the node for a canonical name in the given form.
pub fn build_call(canonical: &str, form: CallForm, args: Vec<Expression>) -> Expression {
    match form {
        CallForm::Simple if !args.is_empty() => Expression::simple_method_call(canonical, args),
        _ => Expression::method_call(canonical, args),
    }
}

fn lookup(table: &'static [Entry], name: &str) -> Option<Translator<'static>> {
    table
        .iter()
        .find(|(source, _, _)| *source == name)
        .map(|&(_, canonical, form)| -> Translator<'static> {
            Box::new(move |args: Vec<Expression>| -> CompileResult<Expression> {
                Ok(build_call(canonical, form, args))
            })
        })
}

const DATE_METHODS: &[Entry] = &[
    ("getFullYear", "year", CallForm::Simple),
    ("getMonth", "month", CallForm::Simple),
    ("getDate", "dayOfMonth", CallForm::Simple),
    ("getHours", "hour", CallForm::Simple),
    ("getMinutes", "minute", CallForm::Simple),
    ("getSeconds", "second", CallForm::Simple),
    ("toDate", "date", CallForm::Simple),
    // query-option spellings
    ("year", "year", CallForm::Simple),
    ("month", "month", CallForm::Simple),
    ("day", "dayOfMonth", CallForm::Simple),
    ("hour", "hour", CallForm::Simple),
    ("minute", "minute", CallForm::Simple),
    ("second", "second", CallForm::Simple),
    ("date", "date", CallForm::Simple),
];

const STRING_METHODS: &[Entry] = &[
    ("startsWith", "startsWith", CallForm::Array),
    ("endsWith", "endsWith", CallForm::Array),
    ("toLowerCase", "toLower", CallForm::Simple),
    ("toLocaleLowerCase", "toLower", CallForm::Simple),
    ("toUpperCase", "toUpper", CallForm::Simple),
    ("toLocaleUpperCase", "toUpper", CallForm::Simple),
    ("indexOf", "indexOfBytes", CallForm::Array),
    ("substr", "substr", CallForm::Array),
    ("trim", "trim", CallForm::Simple),
    ("concat", "concat", CallForm::Array),
    ("includes", "contains", CallForm::Array),
    // query-option spellings
    ("startswith", "startsWith", CallForm::Array),
    ("endswith", "endsWith", CallForm::Array),
    ("tolower", "toLower", CallForm::Simple),
    ("toupper", "toUpper", CallForm::Simple),
    ("indexof", "indexOfBytes", CallForm::Array),
    ("substring", "substr", CallForm::Array),
    ("contains", "contains", CallForm::Array),
    ("length", "length", CallForm::Simple),
];

const MATH_METHODS: &[Entry] = &[
    ("Math.floor", "floor", CallForm::Simple),
    ("Math.ceil", "ceiling", CallForm::Simple),
    ("Math.round", "round", CallForm::Array),
    ("Math.min", "min", CallForm::Simple),
    ("Math.max", "max", CallForm::Simple),
    ("min", "min", CallForm::Simple),
    ("max", "max", CallForm::Simple),
    ("mean", "avg", CallForm::Simple),
    ("avg", "avg", CallForm::Simple),
];

const FALLBACK_METHODS: &[Entry] = &[
    ("count", "count", CallForm::Simple),
    ("round", "round", CallForm::Array),
    ("floor", "floor", CallForm::Simple),
    ("ceil", "ceiling", CallForm::Simple),
    ("mod", "mod", CallForm::Array),
    ("add", "add", CallForm::Array),
    ("subtract", "subtract", CallForm::Array),
    ("multiply", "multiply", CallForm::Array),
    ("divide", "divide", CallForm::Array),
    ("bitAnd", "bit", CallForm::Array),
    ("sum", "sum", CallForm::Simple),
    ("min", "min", CallForm::Simple),
    ("max", "max", CallForm::Simple),
    ("mean", "avg", CallForm::Simple),
    ("avg", "avg", CallForm::Simple),
];

/// Date accessors: `getFullYear -> year`, `getDate -> dayOfMonth`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct DateMethodResolver;

impl MethodResolver for DateMethodResolver {
    fn test(&self, name: &str) -> Option<Translator<'_>> {
        lookup(DATE_METHODS, name)
    }
}

/// String methods: `toLowerCase -> toLower`, `includes -> contains`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct StringMethodResolver;

impl MethodResolver for StringMethodResolver {
    fn test(&self, name: &str) -> Option<Translator<'_>> {
        lookup(STRING_METHODS, name)
    }
}

/// `Math.*` functions and numeric aggregates.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathMethodResolver;

impl MethodResolver for MathMethodResolver {
    fn test(&self, name: &str) -> Option<Translator<'_>> {
        lookup(MATH_METHODS, name)
    }
}

/// Generic aggregate and arithmetic function names.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackMethodResolver;

impl MethodResolver for FallbackMethodResolver {
    fn test(&self, name: &str) -> Option<Translator<'_>> {
        lookup(FALLBACK_METHODS, name)
    }
}

/// Ordered list of resolvers; the first match wins.
pub struct MethodResolverChain {
    resolvers: Vec<Box<dyn MethodResolver>>,
}

impl MethodResolverChain {
    /// A chain with no resolvers: every name becomes a generic call.
    pub fn empty() -> Self {
        MethodResolverChain {
            resolvers: Vec::new(),
        }
    }

    /// Appends a resolver after the existing ones.
    pub fn with(mut self, resolver: impl MethodResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Inserts a resolver ahead of the existing ones.
    pub fn with_first(mut self, resolver: impl MethodResolver + 'static) -> Self {
        self.resolvers.insert(0, Box::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// First translator recognising `name`, if any.
    pub fn find(&self, name: &str) -> Option<Translator<'_>> {
        self.resolvers.iter().find_map(|resolver| resolver.test(name))
    }

    /// Whether any resolver recognises `name`.
    pub fn resolves(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Resolves `name` through the chain, falling back to a generic
    /// method call when no resolver recognises it.
    pub fn resolve(&self, name: &str, args: Vec<Expression>) -> CompileResult<Expression> {
        match self.find(name) {
            Some(translate) => {
                tracing::debug!(method = name, "resolved method");
                translate(args)
            }
            None => {
                tracing::trace!(method = name, "no resolver, emitting generic call");
                Ok(Expression::method_call(name, args))
            }
        }
    }
}

impl Default for MethodResolverChain {
    fn default() -> Self {
        MethodResolverChain::empty()
            .with(DateMethodResolver)
            .with(StringMethodResolver)
            .with(MathMethodResolver)
            .with(FallbackMethodResolver)
    }
}

use crate::ast::ClosureBody;

/// A parsed closure: its declared parameters and its body.
///
/// The first parameter, when present, is the entity parameter: the row
/// being queried. Further parameters are bound from the parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    /// Declared formal parameters, in order
    pub params: Vec<String>,

    /// Closure body
    pub body: ClosureBody,
}

impl Closure {
    /// The entity parameter, if the closure declares one.
    pub fn entity_param(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}

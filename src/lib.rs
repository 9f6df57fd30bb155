pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod odata;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod validator;
pub mod value;

pub use ast::{BinOp, Expression, SortDirection, SyntaxNode, Token};
pub use compiler::{ClosureCompiler, Params};
pub use error::{CompileError, CompileResult};
pub use lexer::Lexer;
pub use odata::{ParsedQuery, QueryOptionParser, QueryOptions, parse_query_options};
pub use output::{to_json, to_json_pretty};
pub use parser::Parser;
pub use resolver::{MethodResolver, MethodResolverChain};
pub use validator::{Charset, FieldNameValidator, ValidatorConfig};
pub use value::Value;

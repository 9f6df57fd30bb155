/// Arithmetic operators.
///
/// Two literal operands under one of these are folded at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// Addition or string concatenation (`+`, `add`)
    Add,
    /// Subtraction (`-`, `sub`)
    Subtract,
    /// Multiplication (`*`, `mul`)
    Multiply,
    /// Division (`/`, `div`)
    Divide,
    /// Modulo (`%`, `mod`)
    Modulo,
    /// Bitwise and (`&`)
    BitAnd,
}

impl ArithmeticOp {
    /// Canonical wire key.
    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "$add",
            ArithmeticOp::Subtract => "$subtract",
            ArithmeticOp::Multiply => "$multiply",
            ArithmeticOp::Divide => "$divide",
            ArithmeticOp::Modulo => "$mod",
            ArithmeticOp::BitAnd => "$bit",
        }
    }
}

/// Comparison operators. Never folded, even between two literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal (`==`, `===`, `eq`)
    Equal,
    /// Not equal (`!=`, `!==`, `ne`)
    NotEqual,
    /// Greater than (`>`, `gt`)
    GreaterThan,
    /// Greater than or equal (`>=`, `ge`)
    GreaterEqual,
    /// Less than (`<`, `lt`)
    LessThan,
    /// Less than or equal (`<=`, `le`)
    LessEqual,
    /// Membership in a list
    In,
    /// Non-membership in a list
    NotIn,
}

impl ComparisonOp {
    pub fn name(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "$eq",
            ComparisonOp::NotEqual => "$ne",
            ComparisonOp::GreaterThan => "$gt",
            ComparisonOp::GreaterEqual => "$ge",
            ComparisonOp::LessThan => "$lt",
            ComparisonOp::LessEqual => "$le",
            ComparisonOp::In => "$in",
            ComparisonOp::NotIn => "$nin",
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND (`&&`, `and`)
    And,
    /// Logical OR (`||`, `or`)
    Or,
}

impl LogicalOp {
    pub fn name(self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
        }
    }
}

/// Any binary operator the front ends map source tokens onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Arithmetic(ArithmeticOp),
    Comparison(ComparisonOp),
    Logical(LogicalOp),
}

impl BinOp {
    /// Maps a query-option operator keyword (`eq`, `add`, `and`, ...).
    pub fn from_keyword(word: &str) -> Option<BinOp> {
        let op = match word {
            "eq" => BinOp::Comparison(ComparisonOp::Equal),
            "ne" => BinOp::Comparison(ComparisonOp::NotEqual),
            "gt" => BinOp::Comparison(ComparisonOp::GreaterThan),
            "ge" => BinOp::Comparison(ComparisonOp::GreaterEqual),
            "lt" => BinOp::Comparison(ComparisonOp::LessThan),
            "le" => BinOp::Comparison(ComparisonOp::LessEqual),
            "add" => BinOp::Arithmetic(ArithmeticOp::Add),
            "sub" => BinOp::Arithmetic(ArithmeticOp::Subtract),
            "mul" => BinOp::Arithmetic(ArithmeticOp::Multiply),
            "div" => BinOp::Arithmetic(ArithmeticOp::Divide),
            "mod" => BinOp::Arithmetic(ArithmeticOp::Modulo),
            "and" => BinOp::Logical(LogicalOp::And),
            "or" => BinOp::Logical(LogicalOp::Or),
            _ => return None,
        };
        Some(op)
    }

    /// Maps a closure source operator (`===`, `+`, `&&`, ...).
    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        let op = match symbol {
            "==" | "===" => BinOp::Comparison(ComparisonOp::Equal),
            "!=" | "!==" => BinOp::Comparison(ComparisonOp::NotEqual),
            ">" => BinOp::Comparison(ComparisonOp::GreaterThan),
            ">=" => BinOp::Comparison(ComparisonOp::GreaterEqual),
            "<" => BinOp::Comparison(ComparisonOp::LessThan),
            "<=" => BinOp::Comparison(ComparisonOp::LessEqual),
            "+" => BinOp::Arithmetic(ArithmeticOp::Add),
            "-" => BinOp::Arithmetic(ArithmeticOp::Subtract),
            "*" => BinOp::Arithmetic(ArithmeticOp::Multiply),
            "/" => BinOp::Arithmetic(ArithmeticOp::Divide),
            "%" => BinOp::Arithmetic(ArithmeticOp::Modulo),
            "&" => BinOp::Arithmetic(ArithmeticOp::BitAnd),
            "&&" => BinOp::Logical(LogicalOp::And),
            "||" => BinOp::Logical(LogicalOp::Or),
            _ => return None,
        };
        Some(op)
    }

    /// Binding power used by precedence climbing; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Logical(LogicalOp::Or) => 1,
            BinOp::Logical(LogicalOp::And) => 2,
            BinOp::Comparison(_) => 3,
            BinOp::Arithmetic(ArithmeticOp::Add | ArithmeticOp::Subtract) => 4,
            BinOp::Arithmetic(_) => 5,
        }
    }
}

/// Sort direction of an order-by term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn name(self) -> &'static str {
        match self {
            SortDirection::Asc => "$asc",
            SortDirection::Desc => "$desc",
        }
    }
}

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BoolExpr {
    Const(bool),
    Var(String),
    Not(Box<BoolExpr>),

    Logical {
        op: LogicalOperator,
        left: Box<BoolExpr>,
        right: Box<BoolExpr>,
    },

    CompareNumbers {
        op: CompareOperator,
        left: NumberExpr,
        right: NumberExpr,
    },

    CompareStrings {
        op: CompareOperator,
        left: StringExpr,
        right: StringExpr,
    },

    CompareBools {
        op: CompareOperator,
        left: Box<BoolExpr>,
        right: Box<BoolExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NumberExpr {
    Const(f64),
    Var(String),
    Negate(Box<NumberExpr>),

    Binary {
        op: ArithmeticOperator,
        left: Box<NumberExpr>,
        right: Box<NumberExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StringExpr {
    Const(String),
    Var(String),

    Concat {
        left: Box<StringExpr>,
        right: Box<StringExpr>,
    },
}

/// Right-hand side of an assignment; the variant is whichever grammar matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Bool(BoolExpr),
    Number(NumberExpr),
    Str(StringExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOperator {
    Equal,
    // `==`, exact string equality
    MaskEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TextSegment {
    Literal(String),
    Variable(String),
    Link {
        label: String,
        action: StatementGroup,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Play,
    Music,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InventoryOp {
    // Removal carries a negated quantity
    Change {
        quantity: NumberExpr,
        item: String,
    },
    Clear {
        item: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Assign {
        name: String,
        value: Expr,
    },

    If {
        condition: BoolExpr,
        then_group: StatementGroup,
        else_group: Option<StatementGroup>,
    },

    Print {
        segments: Vec<TextSegment>,
        newline: bool,
    },

    Goto {
        target: String,
    },

    Label {
        name: String,
    },

    Button {
        label: String,
        action: StatementGroup,
        extra: Option<String>,
    },

    End,

    Input {
        variable: Option<String>,
    },

    AnyKey {
        variable: Option<String>,
    },

    Call {
        target: String,
    },

    DropCallStack,

    Inventory(InventoryOp),

    Quit,

    Save {
        slot: Option<String>,
    },

    ClearScreen,

    Pause {
        duration: NumberExpr,
    },

    Multimedia {
        kind: MediaKind,
        source: String,
    },
}

/// Statements chained with `&` on one logical line. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementGroup {
    pub statements: Vec<Statement>,
    pub line: usize,
}

impl StatementGroup {
    pub fn new(statements: Vec<Statement>, line: usize) -> Self {
        StatementGroup { statements, line }
    }

    /// The implicit action of a bare link or button target.
    pub fn goto(target: &str, line: usize) -> Self {
        StatementGroup::new(vec![Statement::Goto { target: target.to_string() }], line)
    }

    /// The target, if this group is nothing but a single goto.
    pub fn as_goto(&self) -> Option<&str> {
        match self.statements.as_slice() {
            [Statement::Goto { target }] => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Program {
    pub groups: Vec<StatementGroup>,
}

impl Program {
    pub fn new(groups: Vec<StatementGroup>) -> Self {
        Program { groups }
    }

    /// All statements in execution order, ignoring group boundaries.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.groups.iter().flat_map(|g| g.statements.iter())
    }

    /// Line of the `:name` label that starts a location.
    pub fn label_line(&self, name: &str) -> Option<usize> {
        self.groups.iter().find_map(|g| match g.statements.first() {
            Some(Statement::Label { name: n }) if n.eq_ignore_ascii_case(name) => Some(g.line),
            _ => None,
        })
    }
}

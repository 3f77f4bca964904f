#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceUnit {
    pub contracts: Vec<Contract>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Contract,
    Abstract,
    Interface,
    Library,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: String,
    pub kind: ContractKind,
    pub bases: Vec<String>,
    pub parts: Vec<ContractPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractPart {
    StateVariable(StateVariable),
    Enum(EnumDefinition),
    Struct(StructDefinition),
    Event(EventDefinition),
    Modifier(String),
    Function(Function),
    Using(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateVariable {
    pub name: String,
    pub type_name: TypeName,
    pub visibility: Option<String>,
    pub is_constant: bool,
    pub is_immutable: bool,
    pub initial_value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub name: String,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Pure,
    View,
    Payable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub kind: FunctionKind,
    /// `None` for constructors, fallback and receive functions.
    pub name: Option<String>,
    pub params: Vec<Parameter>,
    pub returns: Vec<Parameter>,
    pub visibility: Option<String>,
    pub mutability: Option<Mutability>,
    pub modifiers: Vec<String>,
    /// `None` when the declaration has no body (`;`).
    pub body: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub type_name: TypeName,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Elementary(String),
    UserDefined(String),
    Mapping(Box<TypeName>, Box<TypeName>),
    Array(Box<TypeName>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDeclaration {
    pub type_name: TypeName,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    DoWhile,
    For,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    /// `T x = e;` or `(T a, , U b) = e;` (empty tuple slots are `None`).
    VariableDeclaration {
        declarations: Vec<Option<LocalDeclaration>>,
        initial_value: Option<Expression>,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    Block(Vec<Statement>),
    Return(Option<Expression>),
    Emit(Expression),
    Loop(LoopKind),
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number { value: String, unit: Option<String> },
    Bool(bool),
    Str(String),
    Identifier(String),
    Member(Box<Expression>, String),
    Index(Box<Expression>, Option<Box<Expression>>),
    Call {
        callee: Box<Expression>,
        options: Vec<(String, Expression)>,
        args: Vec<Expression>,
    },
    New(TypeName),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    /// Parenthesised list; empty slots (`(a, )`) are `None`.
    Tuple(Vec<Option<Expression>>),
}

impl Expression {
    pub fn identifier(name: &str) -> Self {
        Expression::Identifier(name.to_string())
    }

    pub fn number(value: &str) -> Self {
        Expression::Number {
            value: value.to_string(),
            unit: None,
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn member(base: Expression, member: &str) -> Self {
        Expression::Member(Box::new(base), member.to_string())
    }

    pub fn call(callee: Expression, args: Vec<Expression>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            options: Vec::new(),
            args,
        }
    }

    /// The callee name of a plain `name(...)` call.
    pub fn called_name(&self) -> Option<&str> {
        match self {
            Expression::Call { callee, .. } => match callee.as_ref() {
                Expression::Identifier(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Visits this expression and every sub-expression, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Number { .. }
            | Expression::Bool(_)
            | Expression::Str(_)
            | Expression::Identifier(_)
            | Expression::New(_) => {}
            Expression::Member(base, _) => base.walk(visit),
            Expression::Index(base, index) => {
                base.walk(visit);
                if let Some(index) = index {
                    index.walk(visit);
                }
            }
            Expression::Call {
                callee,
                options,
                args,
            } => {
                callee.walk(visit);
                for (_, value) in options {
                    value.walk(visit);
                }
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expression::Unary(_, operand) => operand.walk(visit),
            Expression::Binary(_, left, right) | Expression::Assign(_, left, right) => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::Conditional(cond, then, otherwise) => {
                cond.walk(visit);
                then.walk(visit);
                otherwise.walk(visit);
            }
            Expression::Tuple(items) => {
                for item in items.iter().flatten() {
                    item.walk(visit);
                }
            }
        }
    }
}

impl Statement {
    /// Whether control never falls off the end of this statement.
    pub fn always_returns(&self) -> bool {
        match self {
            Statement::Return(_) => true,
            Statement::Expression(expr) => expr.called_name() == Some("revert"),
            Statement::Block(stmts) => stmts.last().map_or(false, Statement::always_returns),
            Statement::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_returns() && else_branch.always_returns(),
            _ => false,
        }
    }

    /// Whether some path through this statement leaves the function early.
    pub fn may_return(&self) -> bool {
        match self {
            Statement::Block(stmts) => stmts.iter().any(Statement::may_return),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => then_branch.may_return() || else_branch.as_ref().map_or(false, |e| e.may_return()),
            other => other.always_returns(),
        }
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Elementary(name) | TypeName::UserDefined(name) => write!(f, "{}", name),
            TypeName::Mapping(key, value) => write!(f, "mapping({} => {})", key, value),
            TypeName::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number { value, unit: None } => write!(f, "{}", value),
            Expression::Number {
                value,
                unit: Some(unit),
            } => write!(f, "{} {}", value, unit),
            Expression::Bool(value) => write!(f, "{}", value),
            Expression::Str(value) => write!(f, "{:?}", value),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Member(base, member) => write!(f, "{}.{}", base, member),
            Expression::Index(base, Some(index)) => write!(f, "{}[{}]", base, index),
            Expression::Index(base, None) => write!(f, "{}[]", base),
            Expression::Call {
                callee,
                options,
                args,
            } => {
                write!(f, "{}", callee)?;
                if !options.is_empty() {
                    let opts: Vec<String> = options
                        .iter()
                        .map(|(name, value)| format!("{}: {}", name, value))
                        .collect();
                    write!(f, "{{{}}}", opts.join(", "))?;
                }
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "({})", args.join(", "))
            }
            Expression::New(type_name) => write!(f, "new {}", type_name),
            Expression::Unary(op, operand) => match op {
                UnaryOp::Not => write!(f, "!{}", operand),
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::PreIncrement => write!(f, "++{}", operand),
                UnaryOp::PreDecrement => write!(f, "--{}", operand),
                UnaryOp::PostIncrement => write!(f, "{}++", operand),
                UnaryOp::PostDecrement => write!(f, "{}--", operand),
                UnaryOp::Delete => write!(f, "delete {}", operand),
            },
            Expression::Binary(op, left, right) => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Assign(op, target, value) => {
                write!(f, "{} {} {}", target, op.symbol(), value)
            }
            Expression::Conditional(cond, then, otherwise) => {
                write!(f, "({} ? {} : {})", cond, then, otherwise)
            }
            Expression::Tuple(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|item| item.as_ref().map(ToString::to_string).unwrap_or_default())
                    .collect();
                write!(f, "({})", items.join(", "))
            }
        }
    }
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        }
    }

    /// The arithmetic operator a compound assignment applies.
    pub fn arithmetic(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

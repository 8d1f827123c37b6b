use crate::ast::FieldName;
use crate::ast::FunctionName;
use crate::ast::JniFunction;
use crate::ast::Type;
use std::fmt;

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum InfixOp {
    Eq,
    NotEq,
    Assign,
    And,
    Or,
}

impl InfixOp {
    fn precedence(&self) -> u8 {
        match self {
            InfixOp::Assign => 1,
            InfixOp::Or => 3,
            InfixOp::And => 4,
            InfixOp::Eq | InfixOp::NotEq => 7,
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InfixOp::Eq => write!(f, "=="),
            InfixOp::NotEq => write!(f, "!="),
            InfixOp::Assign => write!(f, "="),
            InfixOp::And => write!(f, "&&"),
            InfixOp::Or => write!(f, "||"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PrefixOp {
    Not,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOp::Not => write!(f, "!"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Expr {
    /// Locals, parameters and header constants such as `LUA_TSTRING`.
    Variable(String),
    Function(FunctionName),
    LitCString(String),
    LitInt(i64),
    Null,
    InfixOp {
        lhs: Box<Expr>,
        op: InfixOp,
        rhs: Box<Expr>,
    },
    PrefixOp {
        op: PrefixOp,
        operand: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Arrow {
        base: Box<Expr>,
        field: FieldName,
    },
    Deref(Box<Expr>),
    AddrOf(Box<Expr>),
    Cast(Box<Expr>, Type),
    SizeOf(Type),
    InitList(Vec<Expr>),
}

impl Expr {
    pub fn named_var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn lit_str(s: impl Into<String>) -> Self {
        Expr::LitCString(s.into())
    }

    pub fn function(name: FunctionName) -> Self {
        Expr::Function(name)
    }

    pub fn call(self, args: impl IntoIterator<Item = Self>) -> Self {
        Expr::Call {
            func: Box::new(self),
            args: args.into_iter().collect(),
        }
    }

    /// A call through a JNI function table: `(*env)->F(env, args...)`.
    pub fn jni(receiver: &str, func: JniFunction, args: impl IntoIterator<Item = Self>) -> Self {
        let table = Expr::named_var(receiver).deref().arrow(FieldName::Jni(func));
        let args = std::iter::once(Expr::named_var(receiver)).chain(args);
        table.call(args)
    }

    /// Calls a Lua API or runtime function whose first argument is the state `L`.
    pub fn lua(func: FunctionName, args: impl IntoIterator<Item = Self>) -> Self {
        let args = std::iter::once(Expr::named_var("L")).chain(args);
        Expr::Function(func).call(args)
    }

    pub fn deref(self) -> Self {
        Expr::Deref(Box::new(self))
    }

    pub fn addr_of(self) -> Self {
        Expr::AddrOf(Box::new(self))
    }

    pub fn arrow(self, field: FieldName) -> Self {
        Expr::Arrow {
            base: Box::new(self),
            field,
        }
    }

    pub fn infix_op(lhs: Self, op: InfixOp, rhs: Self) -> Self {
        Expr::InfixOp {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn cast(self, ty: Type) -> Self {
        Expr::Cast(Box::new(self), ty)
    }

    pub fn assign(lhs: Self, rhs: Self) -> Self {
        Self::infix_op(lhs, InfixOp::Assign, rhs)
    }

    pub fn eq(self, rhs: Self) -> Self {
        Self::infix_op(self, InfixOp::Eq, rhs)
    }

    pub fn not_eq(self, rhs: Self) -> Self {
        Self::infix_op(self, InfixOp::NotEq, rhs)
    }

    pub fn and(self, rhs: Self) -> Self {
        Self::infix_op(self, InfixOp::And, rhs)
    }

    pub fn or(self, rhs: Self) -> Self {
        Self::infix_op(self, InfixOp::Or, rhs)
    }

    pub fn not(self) -> Self {
        Expr::PrefixOp {
            op: PrefixOp::Not,
            operand: Box::new(self),
        }
    }

    /// Joins conditions with `&&`, left to right. An empty list is `1`.
    pub fn all(conds: impl IntoIterator<Item = Self>) -> Self {
        conds
            .into_iter()
            .reduce(|acc, next| acc.and(next))
            .unwrap_or(Expr::LitInt(1))
    }

    /// Visits this expression and every sub-expression, outermost first.
    pub fn walk(&self, visit: &mut impl FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::InfixOp { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Expr::PrefixOp { operand, .. } => operand.walk(visit),
            Expr::Call { func, args } => {
                func.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Arrow { base, .. } => base.walk(visit),
            Expr::Deref(inner) | Expr::AddrOf(inner) | Expr::Cast(inner, _) => inner.walk(visit),
            Expr::InitList(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            Expr::Variable(..)
            | Expr::Function(..)
            | Expr::LitCString(..)
            | Expr::LitInt(..)
            | Expr::Null
            | Expr::SizeOf(..) => {}
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::InfixOp { op, .. } => op.precedence(),
            Expr::PrefixOp { .. } | Expr::Deref(..) | Expr::AddrOf(..) | Expr::Cast(..) => 14,
            _ => 16,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl From<FunctionName> for Expr {
    fn from(name: FunctionName) -> Self {
        Expr::Function(name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Function(name) => write!(f, "{}", name),
            Expr::LitCString(s) => write!(f, "\"{}\"", s.escape_default()),
            Expr::LitInt(i) => write!(f, "{}", i),
            Expr::Null => write!(f, "NULL"),

            Expr::InfixOp { lhs, op, rhs } => {
                let precedence = op.precedence();
                lhs.write_operand(f, precedence)?;
                write!(f, " {} ", op)?;
                rhs.write_operand(f, precedence + 1)
            }

            Expr::PrefixOp { op, operand } => {
                write!(f, "{}", op)?;
                operand.write_operand(f, 14)
            }

            Expr::Call { func, args } => {
                func.write_operand(f, 16)?;
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }

            Expr::Arrow { base, field } => match base.as_ref() {
                Expr::Deref(..) => write!(f, "{}->{}", base, field),
                _ => {
                    base.write_operand(f, 16)?;
                    write!(f, "->{}", field)
                }
            },

            Expr::Deref(inner) => {
                write!(f, "(*")?;
                inner.write_operand(f, 14)?;
                write!(f, ")")
            }
            Expr::AddrOf(inner) => {
                write!(f, "&")?;
                inner.write_operand(f, 14)
            }
            Expr::Cast(value, ty) => {
                write!(f, "({})", ty.typename())?;
                value.write_operand(f, 14)
            }
            Expr::SizeOf(ty) => write!(f, "sizeof({})", ty.typename()),

            Expr::InitList(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

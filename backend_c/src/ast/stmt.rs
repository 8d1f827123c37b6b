use crate::ast::Expr;
use crate::ast::FunctionName;
use crate::ast::Type;
use crate::release::ReleaseAction;
use crate::release::ReleaseList;
use std::fmt;

const INDENT: &str = "  ";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
    VariableDecl {
        ty: Type,
        name: String,
        init: Option<Expr>,
    },
    Expr(Expr),
    Comment(String),
    IfCond {
        cond: Expr,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    Return(Option<Expr>),
}

impl Statement {
    pub fn if_then(cond: impl Into<Expr>, then_branch: impl IntoIterator<Item = Statement>) -> Statement {
        Statement::IfCond {
            cond: cond.into(),
            then_branch: then_branch.into_iter().collect(),
            else_branch: vec![],
        }
    }

    pub fn if_then_else(
        cond: impl Into<Expr>,
        then_branch: impl IntoIterator<Item = Statement>,
        else_branch: impl IntoIterator<Item = Statement>,
    ) -> Statement {
        Statement::IfCond {
            cond: cond.into(),
            then_branch: then_branch.into_iter().collect(),
            else_branch: else_branch.into_iter().collect(),
        }
    }

    /// Folds `(cond, body)` arms into an `if`/`else if` chain ending in
    /// `otherwise`.
    pub fn if_chain(
        arms: impl IntoIterator<Item = (Expr, Vec<Statement>)>,
        otherwise: Vec<Statement>,
    ) -> Vec<Statement> {
        let arms: Vec<_> = arms.into_iter().collect();
        arms.into_iter()
            .rev()
            .fold(otherwise, |else_branch, (cond, then_branch)| {
                vec![Statement::if_then_else(cond, then_branch, else_branch)]
            })
    }

    pub fn return_value(val: impl Into<Expr>) -> Statement {
        Statement::Return(Some(val.into()))
    }

    /// Visits this statement and every nested statement, in source order.
    pub fn walk(&self, visit: &mut impl FnMut(&Statement)) {
        visit(self);
        if let Statement::IfCond {
            then_branch,
            else_branch,
            ..
        } = self
        {
            for stmt in then_branch.iter().chain(else_branch.iter()) {
                stmt.walk(visit);
            }
        }
    }

    pub fn write_at(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        write!(f, "{}", INDENT.repeat(indent))?;
        self.write_body(f, indent)
    }

    fn write_body(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        match self {
            Statement::VariableDecl { ty, name, init } => {
                write!(f, "{}", ty.to_decl_string(name))?;
                if let Some(init) = init {
                    write!(f, " = {}", init)?;
                }
                write!(f, ";")
            }

            Statement::Expr(expr) => write!(f, "{};", expr),

            Statement::Comment(text) => {
                let safe_text = text.replace("/*", "").replace("*/", "");
                write!(f, "/* {} */", safe_text)
            }

            Statement::IfCond {
                cond,
                then_branch,
                else_branch,
            } => {
                writeln!(f, "if ({}) {{", cond)?;
                for stmt in then_branch {
                    stmt.write_at(f, indent + 1)?;
                    writeln!(f)?;
                }
                write!(f, "{}}}", INDENT.repeat(indent))?;

                match else_branch.as_slice() {
                    [] => Ok(()),
                    [else_if @ Statement::IfCond { .. }] => {
                        write!(f, " else ")?;
                        else_if.write_body(f, indent)
                    }
                    _ => {
                        writeln!(f, " else {{")?;
                        for stmt in else_branch {
                            stmt.write_at(f, indent + 1)?;
                            writeln!(f)?;
                        }
                        write!(f, "{}}}", INDENT.repeat(indent))
                    }
                }
            }

            Statement::Return(None) => write!(f, "return;"),
            Statement::Return(Some(val)) => write!(f, "return {};", val),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_at(f, 0)
    }
}

/// Accumulates the statements of one function body together with the
/// handles it must release on every way out.
pub struct Builder {
    pub stmts: Vec<Statement>,
    pub release: ReleaseList,

    annotate: bool,
}

impl Builder {
    pub fn new(annotate: bool) -> Self {
        Self {
            stmts: Vec::new(),
            release: ReleaseList::default(),
            annotate,
        }
    }

    /// A builder for a nested branch. It starts with everything this one has
    /// allocated so far, and its own allocations don't leak back.
    pub fn branch(&self) -> Self {
        Self {
            stmts: Vec::new(),
            release: self.release.clone(),
            annotate: self.annotate,
        }
    }

    pub fn annotate(&self) -> bool {
        self.annotate
    }

    pub fn push(&mut self, stmt: Statement) {
        self.stmts.push(stmt);
    }

    pub fn extend(&mut self, stmts: impl IntoIterator<Item = Statement>) {
        self.stmts.extend(stmts);
    }

    pub fn expr(&mut self, expr: Expr) {
        self.stmts.push(Statement::Expr(expr));
    }

    pub fn decl(&mut self, ty: Type, name: impl Into<String>, init: Option<Expr>) {
        self.stmts.push(Statement::VariableDecl {
            ty,
            name: name.into(),
            init,
        });
    }

    /// Only emitted when annotating output.
    pub fn comment(&mut self, text: impl Into<String>) {
        if self.annotate {
            self.stmts.push(Statement::Comment(text.into()));
        }
    }

    /// Declares a handle and registers its release straight after the
    /// declaration.
    pub fn decl_owned(&mut self, ty: Type, action: ReleaseAction, init: Expr) {
        self.decl(ty, action.handle(), Some(init));
        self.release.push(action);
    }

    /// Emits the releases for everything acquired since `depth` and forgets
    /// them, for a branch that falls through to shared cleanup.
    pub fn release_from(&mut self, depth: usize) {
        let stmts = self.release.emit_from(depth);
        self.stmts.extend(stmts);
        self.release.truncate(depth);
    }

    pub fn release_all(&self) -> Vec<Statement> {
        self.release.emit_all()
    }

    /// Raises a pending Java exception as a Lua error after unwinding
    /// everything acquired so far.
    pub fn exception_check(&mut self) {
        let caught = Expr::lua(
            FunctionName::CatchJavaException,
            [Expr::named_var("env")],
        );

        let mut then_branch = self.release_all();
        then_branch.push(Statement::return_value(Expr::lua(FunctionName::LuaError, [])));

        self.push(Statement::if_then(caught, then_branch));
    }

    /// Releases everything, then raises `luaL_error` with the message.
    pub fn raise(&mut self, message: &str, args: impl IntoIterator<Item = Expr>) {
        self.extend(self.release_all());

        let args = std::iter::once(Expr::lit_str(message)).chain(args);
        self.push(Statement::return_value(Expr::lua(FunctionName::LuaLError, args)));
    }

    pub fn finish(self) -> Vec<Statement> {
        self.stmts
    }
}

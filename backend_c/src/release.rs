#[cfg(test)]
mod test;

use crate::ast::Expr;
use crate::ast::FunctionName;
use crate::ast::JniFunction;
use crate::ast::Statement;

/// Something acquired inside a generated function that has to be given
/// back before it returns or raises.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ReleaseAction {
    /// A handle leased from the object cache with `luaJniTakeObject`.
    PutBack(String),

    /// A JNI local reference created by the glue itself.
    DeleteLocalRef(String),
}

impl ReleaseAction {
    pub fn handle(&self) -> &str {
        match self {
            ReleaseAction::PutBack(handle) | ReleaseAction::DeleteLocalRef(handle) => handle,
        }
    }

    pub fn to_statement(&self) -> Statement {
        let handle = Expr::named_var(self.handle());

        let release = match self {
            ReleaseAction::PutBack(..) => Expr::function(FunctionName::PutBackObject)
                .call([Expr::named_var("env"), handle.clone()]),
            ReleaseAction::DeleteLocalRef(..) => {
                Expr::jni("env", JniFunction::DeleteLocalRef, [handle.clone()])
            }
        };

        Statement::if_then(handle.not_eq(Expr::Null), [Statement::Expr(release)])
    }
}

/// Release actions in allocation order. Branches clone the list so an
/// allocation made in one branch is never released by a sibling.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ReleaseList {
    actions: Vec<ReleaseAction>,
}

impl ReleaseList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: ReleaseAction) {
        self.actions.push(action);
    }

    /// Marks the current position, for releasing only what is acquired
    /// after it.
    pub fn depth(&self) -> usize {
        self.actions.len()
    }

    pub fn actions(&self) -> &[ReleaseAction] {
        &self.actions
    }

    pub fn emit_from(&self, depth: usize) -> Vec<Statement> {
        self.actions
            .iter()
            .skip(depth)
            .map(ReleaseAction::to_statement)
            .collect()
    }

    pub fn emit_all(&self) -> Vec<Statement> {
        self.emit_from(0)
    }

    /// Forgets everything acquired after `depth`, once it has been emitted.
    pub fn truncate(&mut self, depth: usize) {
        self.actions.truncate(depth);
    }
}

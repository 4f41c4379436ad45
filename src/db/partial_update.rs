//! Partial update statement builder
//!
//! Turns a set of field assignments into one parameterized `UPDATE`.
//! Assignments keep the order they were added in, `updated_at` is always
//! appended after them, and the owner scope is always the final bound
//! parameter. The builder only computes SQL and parameters; it never touches
//! a connection.

use rusqlite::types::Value;

use crate::error::IntakeError;

/// Row key an update is scoped to
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Profiles are owned by `user_id`
    UserId(String),
    /// Requests are addressed by `id`
    RequestId(i64),
}

impl Scope {
    fn column(&self) -> &'static str {
        match self {
            Scope::UserId(_) => "user_id",
            Scope::RequestId(_) => "id",
        }
    }

    fn into_value(self) -> Value {
        match self {
            Scope::UserId(user_id) => Value::Text(user_id),
            Scope::RequestId(id) => Value::Integer(id),
        }
    }
}

/// Ready-to-execute update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Accumulates field assignments for a single table
#[derive(Debug, Clone)]
pub struct PartialUpdate {
    table: &'static str,
    assignments: Vec<(&'static str, Value)>,
}

impl PartialUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
        }
    }

    /// Assign a value unconditionally
    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    /// Assign only if the field was present in the input.
    ///
    /// `None` means absent and is skipped, `Some(None)` writes NULL.
    pub fn set_present(mut self, column: &'static str, field: &Option<Option<String>>) -> Self {
        if let Some(value) = field {
            let value = match value {
                Some(text) => Value::Text(text.clone()),
                None => Value::Null,
            };
            self.assignments.push((column, value));
        }
        self
    }

    /// True when no field has been assigned yet
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Finish the statement, bumping `updated_at` and scoping to the owner.
    ///
    /// Fails with `NoOp` if no field was assigned.
    pub fn build(self, updated_at: &str, scope: Scope) -> Result<UpdateStatement, IntakeError> {
        if self.assignments.is_empty() {
            return Err(IntakeError::NoOp("No fields to update".into()));
        }

        let mut clauses = Vec::with_capacity(self.assignments.len() + 1);
        let mut params = Vec::with_capacity(self.assignments.len() + 2);

        for (column, value) in self.assignments {
            clauses.push(format!("{} = ?{}", column, params.len() + 1));
            params.push(value);
        }

        clauses.push(format!("updated_at = ?{}", params.len() + 1));
        params.push(Value::Text(updated_at.to_string()));

        let scope_column = scope.column();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.table,
            clauses.join(", "),
            scope_column,
            params.len() + 1
        );
        params.push(scope.into_value());

        Ok(UpdateStatement { sql, params })
    }
}

//! T-SQL rendering of stored-procedure calls.
//!
//! A call is sent as a parameterized batch:
//!
//! ```text
//! EXEC [dbo].[CreateUser] @name = @P1, @id = @P2 OUTPUT; SELECT @P2 AS [id]
//! ```
//!
//! Values never appear in the SQL text; only validated, bracket-quoted names do.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::models::ProcedureCall;

/// Maximum parts in a T-SQL object name: server.database.schema.object
const MAX_NAME_PARTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    #[error("Invalid procedure name '{name}': {reason}")]
    InvalidProcedureName { name: String, reason: String },

    #[error("Invalid parameter name '{0}'")]
    InvalidParameterName(String),

    #[error("Positional parameter {0} follows a named parameter")]
    PositionalAfterNamed(usize),
}

/// Tokenize a possibly multi-part procedure name and re-quote each part.
///
/// Up to four dot-separated parts are accepted. Middle parts may be empty,
/// as in `db..proc`, to fall back to the server's default schema.
pub fn quote_procedure_name(name: &str) -> Result<String, StatementError> {
    let invalid = |reason: String| StatementError::InvalidProcedureName {
        name: name.to_string(),
        reason,
    };

    let dialect = MsSqlDialect {};
    let tokens = Tokenizer::new(&dialect, name)
        .tokenize()
        .map_err(|e| invalid(e.to_string()))?;

    let mut parts: Vec<Option<String>> = vec![None];
    for token in tokens {
        match token {
            Token::Whitespace(_) | Token::EOF => {}
            Token::Period => parts.push(None),
            Token::Word(word) if !word.value.is_empty() => {
                if parts.last().is_some_and(Option::is_some) {
                    return Err(invalid(format!("unexpected '{}'", word.value)));
                }
                parts.pop();
                parts.push(Some(word.value));
            }
            other => return Err(invalid(format!("unexpected '{}'", other))),
        }
    }
    if parts.len() > MAX_NAME_PARTS {
        return Err(invalid(format!("more than {} name parts", MAX_NAME_PARTS)));
    }
    if parts.first().is_some_and(Option::is_none) || parts.last().is_some_and(Option::is_none) {
        return Err(invalid("expected an identifier".to_string()));
    }

    let quoted: Vec<String> = parts
        .iter()
        .map(|part| part.as_deref().map(quote_ident).unwrap_or_default())
        .collect();
    Ok(quoted.join("."))
}

/// SQL Server uses square brackets for identifier quoting.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Validate a parameter name (leading '@' already stripped).
fn validate_param_name(name: &str) -> Result<(), StatementError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StatementError::InvalidParameterName(name.to_string()))
    }
}

/// Render the `EXEC` batch for a call.
///
/// Parameters are bound as `@P1..@Pn` in declaration order. When
/// `select_outputs` is set and the call has output parameters, a trailing
/// `SELECT` returns their final values as the last result table.
pub fn render_call(call: &ProcedureCall, select_outputs: bool) -> Result<String, StatementError> {
    let procedure = quote_procedure_name(call.name())?;

    let mut args = Vec::with_capacity(call.params().len());
    let mut outputs = Vec::new();
    let mut seen_named = false;

    for (i, param) in call.params().iter().enumerate() {
        let placeholder = format!("@P{}", i + 1);
        let name = param.bare_name();

        let mut arg = if name.is_empty() {
            if seen_named {
                return Err(StatementError::PositionalAfterNamed(i + 1));
            }
            placeholder.clone()
        } else {
            validate_param_name(name)?;
            seen_named = true;
            format!("@{} = {}", name, placeholder)
        };

        if param.direction.returns_value() {
            arg.push_str(" OUTPUT");
            let alias = if name.is_empty() {
                format!("P{}", i + 1)
            } else {
                name.to_string()
            };
            outputs.push(format!("{} AS {}", placeholder, quote_ident(&alias)));
        }
        args.push(arg);
    }

    let mut sql = format!("EXEC {}", procedure);
    if !args.is_empty() {
        sql.push(' ');
        sql.push_str(&args.join(", "));
    }
    if select_outputs && !outputs.is_empty() {
        sql.push_str("; SELECT ");
        sql.push_str(&outputs.join(", "));
    }
    Ok(sql)
}

//! Parameter binding for SQL Server queries.
//!
//! Values are bound to `@P1..@Pn` in declaration order, matching the
//! placeholders produced by `statement::render_call`.

use crate::models::{ParamValue, ProcedureCall};
use tiberius::Query;

/// Bind a parameter to a SQL Server query.
pub(crate) fn bind_param<'a>(query: &mut Query<'a>, param: &'a ParamValue) {
    match param {
        ParamValue::Null => query.bind(None::<String>),
        ParamValue::Bool(v) => query.bind(*v),
        ParamValue::Int(v) => query.bind(*v),
        ParamValue::Float(v) => query.bind(*v),
        ParamValue::Text(v) => query.bind(v.as_str()),
        ParamValue::Bytes(v) => query.bind(v.as_slice()),
        ParamValue::DateTime(v) => query.bind(*v),
    }
}

/// Build a query from rendered SQL and bind every parameter of `call`.
pub(crate) fn build_query<'a>(sql: String, call: &'a ProcedureCall) -> Query<'a> {
    let mut query = Query::new(sql);
    for param in call.params() {
        bind_param(&mut query, &param.value);
    }
    query
}

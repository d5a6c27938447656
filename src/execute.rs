//! Statement execution bridge.
//!
//! [`Executor`] borrows a caller-managed [`rusqlite::Connection`] and runs
//! assembled queries against it, binding the generated parameters by name and
//! reading result rows back as [`Row`] maps. Connection, transaction and
//! retry concerns stay with the caller; this is a convenience adapter only.

use rusqlite::{Connection, Statement, ToSql};
use tracing::debug;

use crate::error::Result;
use crate::record::Row;
use crate::template::{Params, QueryData, assemble};
use crate::value::Value;

pub struct Executor<'a> {
    connection: &'a Connection,
}

impl<'a> Executor<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Assembles and runs a query, reading every result row into a column
    /// name to scalar map.
    pub fn fetch(&self, data: &QueryData) -> Result<Vec<Row>> {
        let (sql, params) = assemble(data)?;
        debug!("fetching rows: {}", sql);
        let mut statement = self.connection.prepare(&sql)?;
        let columns: Vec<String> = statement
            .column_names()
            .iter()
            .map(|column| column.to_string())
            .collect();
        let named = named_bindings(&statement, &params)?;
        let bind: Vec<(&str, &dyn ToSql)> = named
            .iter()
            .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
            .collect();
        let mut rows = statement.query(&bind[..])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut mapped = Row::default();
            for (i, column) in columns.iter().enumerate() {
                mapped.insert(column.clone(), Value::from_sql_ref(column, row.get_ref(i)?)?);
            }
            out.push(mapped);
        }
        Ok(out)
    }

    /// Assembles and runs a statement, returning the affected-row count.
    pub fn execute(&self, data: &QueryData) -> Result<usize> {
        let (sql, params) = assemble(data)?;
        debug!("executing: {}", sql);
        let mut statement = self.connection.prepare(&sql)?;
        let named = named_bindings(&statement, &params)?;
        let bind: Vec<(&str, &dyn ToSql)> = named
            .iter()
            .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
            .collect();
        Ok(statement.execute(&bind[..])?)
    }

    /// Assembles once and runs the statement once per parameter set, each set
    /// layered over the assembled bindings. Returns the total affected-row
    /// count.
    pub fn execute_many(&self, data: &QueryData, param_sets: &[Params]) -> Result<usize> {
        let (sql, base) = assemble(data)?;
        debug!("executing {} parameter sets: {}", param_sets.len(), sql);
        let mut statement = self.connection.prepare(&sql)?;
        let mut affected = 0;
        for set in param_sets {
            let mut merged = base.clone();
            for (name, value) in set {
                merged.insert(name.clone(), value.clone());
            }
            let named = named_bindings(&statement, &merged)?;
            let bind: Vec<(&str, &dyn ToSql)> = named
                .iter()
                .map(|(name, value)| (name.as_str(), *value as &dyn ToSql))
                .collect();
            affected += statement.execute(&bind[..])?;
        }
        Ok(affected)
    }
}

// Parameters the final SQL never references are skipped at bind time.
fn named_bindings<'p>(
    statement: &Statement<'_>,
    params: &'p Params,
) -> Result<Vec<(String, &'p Value)>> {
    let mut named = Vec::with_capacity(params.len());
    for (name, value) in params {
        let placeholder = format!(":{name}");
        if statement.parameter_index(&placeholder)?.is_some() {
            named.push((placeholder, value));
        }
    }
    Ok(named)
}

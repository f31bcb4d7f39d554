//! Session and query builder.
//!
//! A [`Session`] is a handle on the metadata file. Every executed statement
//! opens a fresh connection and closes it on completion; there is no
//! long-lived connection pool. Queries are composed with [`QueryBuilder`]:
//! exactly one statement (select, insert, update, delete) plus zero or more
//! constraints, then a terminal that runs the statement.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{Connection, ToSql};
use tracing::{debug, trace};

use crate::schema::Schema;
use crate::{MetaError, Result};

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(value) => ToSqlOutput::Owned(SqlValue::Integer(*value)),
            Value::Real(value) => ToSqlOutput::Owned(SqlValue::Real(*value)),
            Value::Text(value) => ToSqlOutput::Owned(SqlValue::Text(value.clone())),
        })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(value) => Value::Integer(value),
            None => Value::Null,
        }
    }
}

/// A single `(field, operator, value)` filter.
///
/// Constraints sharing an operator token are grouped into one row-value
/// clause, `(fields) op (placeholders)`; groups combine with `AND`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub field: &'static str,
    pub op: &'static str,
    pub value: Value,
}

impl Constraint {
    pub fn new(field: &'static str, op: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    /// `field is value` — the null-safe comparison.
    pub fn is(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, "is", value)
    }

    /// `field = value`.
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new(field, "=", value)
    }
}

/// A `field = value` pair for insert and update statements.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub field: &'static str,
    pub value: Value,
}

impl Assignment {
    pub fn new(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum Statement {
    Select,
    Insert(Vec<Assignment>),
    Update(Vec<Assignment>),
    Delete,
}

/// Handle on the metadata file.
#[derive(Debug, Clone)]
pub struct Session {
    db_path: PathBuf,
}

impl Session {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Whether the schema's table exists, checked against the catalog.
    pub fn table_exists<S: Schema>(&self) -> Result<bool> {
        let connection = self.connect()?;
        let mut statement =
            connection.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;

        Ok(statement.exists([S::TABLE])?)
    }

    /// Create the schema's table if it is not already present. No migration
    /// is attempted for existing tables.
    pub fn ensure_table<S: Schema>(&self) -> Result<()> {
        if self.table_exists::<S>()? {
            return Ok(());
        }

        let sql = S::create_table_sql();
        debug!(table = S::TABLE, %sql, "creating table");
        self.connect()?.execute(&sql, [])?;

        Ok(())
    }

    /// Begin composing a query against the schema's table.
    pub fn query<S: Schema>(&self) -> QueryBuilder<'_, S> {
        QueryBuilder {
            session: self,
            statement: None,
            constraints: Vec::new(),
            _schema: PhantomData,
        }
    }
}

/// Composes exactly one statement plus constraints, then executes it through
/// a terminal. Invoking a terminal without a statement is an error.
pub struct QueryBuilder<'s, S: Schema> {
    session: &'s Session,
    statement: Option<Statement>,
    constraints: Vec<Constraint>,
    _schema: PhantomData<S>,
}

impl<S: Schema> QueryBuilder<'_, S> {
    /// Select the full column list.
    pub fn select(mut self) -> Self {
        self.statement = Some(Statement::Select);
        self
    }

    pub fn insert(mut self, values: Vec<Assignment>) -> Self {
        self.statement = Some(Statement::Insert(values));
        self
    }

    pub fn update(mut self, values: Vec<Assignment>) -> Self {
        self.statement = Some(Statement::Update(values));
        self
    }

    pub fn delete(mut self) -> Self {
        self.statement = Some(Statement::Delete);
        self
    }

    /// Add a constraint. All constraints are combined with `AND`.
    pub fn filter(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn build(self) -> Result<(String, Vec<Value>)> {
        let statement = self.statement.ok_or(MetaError::MissingStatement)?;

        let (mut sql, mut params) = match statement {
            Statement::Select => (
                format!("SELECT {} FROM {}", S::column_list(), S::TABLE),
                Vec::new(),
            ),
            Statement::Insert(values) => {
                let fields = values
                    .iter()
                    .map(|assignment| assignment.field)
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = vec!["?"; values.len()].join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    S::TABLE,
                    fields,
                    placeholders
                );
                let params = values.into_iter().map(|assignment| assignment.value).collect();
                (sql, params)
            }
            Statement::Update(values) => {
                let fields = values
                    .iter()
                    .map(|assignment| assignment.field)
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = vec!["?"; values.len()].join(", ");
                let sql = format!("UPDATE {} SET ({}) = ({})", S::TABLE, fields, placeholders);
                let params = values.into_iter().map(|assignment| assignment.value).collect();
                (sql, params)
            }
            Statement::Delete => (format!("DELETE FROM {}", S::TABLE), Vec::new()),
        };

        if !self.constraints.is_empty() {
            // group constraints by operator token, preserving first-seen order
            let mut groups: Vec<(&'static str, Vec<&Constraint>)> = Vec::new();
            for constraint in &self.constraints {
                match groups.iter_mut().find(|(op, _)| *op == constraint.op) {
                    Some((_, members)) => members.push(constraint),
                    None => groups.push((constraint.op, vec![constraint])),
                }
            }

            let mut clauses = Vec::new();
            let mut constraint_params = Vec::new();
            for (op, members) in groups {
                let fields = members
                    .iter()
                    .map(|constraint| constraint.field)
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = vec!["?"; members.len()].join(", ");
                clauses.push(format!("({}) {} ({})", fields, op, placeholders));
                constraint_params.extend(members.iter().map(|constraint| constraint.value.clone()));
            }

            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            params.extend(constraint_params);
        }

        trace!(%sql, ?params, "built query");
        Ok((sql, params))
    }

    /// Run the statement, returning the number of affected rows.
    pub fn execute(self) -> Result<usize> {
        let session = self.session;
        let (sql, params) = self.build()?;
        let connection = session.connect()?;

        Ok(connection.execute(&sql, rusqlite::params_from_iter(params))?)
    }

    /// Run an insert and return the id of the inserted row.
    pub fn last_row_id(self) -> Result<i64> {
        let session = self.session;
        let (sql, params) = self.build()?;
        let connection = session.connect()?;
        connection.execute(&sql, rusqlite::params_from_iter(params))?;

        Ok(connection.last_insert_rowid())
    }

    /// Fetch the first matching row, if any.
    pub fn fetch_one(self) -> Result<Option<S>> {
        let session = self.session;
        let (sql, params) = self.build()?;
        let connection = session.connect()?;
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(rusqlite::params_from_iter(params))?;

        match rows.next()? {
            Some(row) => Ok(Some(S::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Fetch all matching rows.
    pub fn fetch_all(self) -> Result<Vec<S>> {
        let session = self.session;
        let (sql, params) = self.build()?;
        let connection = session.connect()?;
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(rusqlite::params_from_iter(params))?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(S::from_row(row)?);
        }

        Ok(items)
    }

    /// Whether any row matches the select statement's constraints.
    pub fn exists(self) -> Result<bool> {
        let session = self.session;
        let (sql, params) = self.build()?;
        let connection = session.connect()?;
        let mut statement = connection.prepare(&sql)?;

        Ok(statement.exists(rusqlite::params_from_iter(params))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq)]
    struct Track {
        id: i64,
        title: String,
        rating: f64,
        album_id: Option<i64>,
    }

    impl Schema for Track {
        const TABLE: &'static str = "tracks";
        const COLUMNS: &'static [ColumnSpec] = &[
            ColumnSpec::primary_key("id"),
            ColumnSpec::text("title"),
            ColumnSpec::real("rating"),
            ColumnSpec::integer_null("album_id"),
        ];

        fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get(0)?,
                title: row.get(1)?,
                rating: row.get(2)?,
                album_id: row.get(3)?,
            })
        }
    }

    fn session() -> (TempDir, Session) {
        let temp = TempDir::new().unwrap();
        let session = Session::new(temp.path().join("metadata"));
        session.ensure_table::<Track>().unwrap();
        (temp, session)
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let (_temp, session) = session();

        assert!(session.table_exists::<Track>().unwrap());
        session.ensure_table::<Track>().unwrap();
        assert!(session.table_exists::<Track>().unwrap());
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let (_temp, session) = session();

        let id = session
            .query::<Track>()
            .insert(vec![
                Assignment::new("title", "first"),
                Assignment::new("rating", 4.5),
                Assignment::new("album_id", Value::Null),
            ])
            .last_row_id()
            .unwrap();

        let track = session
            .query::<Track>()
            .select()
            .filter(Constraint::is("id", id))
            .fetch_one()
            .unwrap()
            .unwrap();

        assert_eq!(track.id, id);
        assert_eq!(track.title, "first");
        assert_eq!(track.album_id, None);
    }

    #[test]
    fn update_changes_matching_rows() {
        let (_temp, session) = session();

        let id = session
            .query::<Track>()
            .insert(vec![
                Assignment::new("title", "before"),
                Assignment::new("rating", 1.0),
                Assignment::new("album_id", 7i64),
            ])
            .last_row_id()
            .unwrap();

        let changed = session
            .query::<Track>()
            .update(vec![
                Assignment::new("title", "after"),
                Assignment::new("rating", 2.0),
            ])
            .filter(Constraint::is("id", id))
            .execute()
            .unwrap();
        assert_eq!(changed, 1);

        let track = session
            .query::<Track>()
            .select()
            .filter(Constraint::is("id", id))
            .fetch_one()
            .unwrap()
            .unwrap();
        assert_eq!(track.title, "after");
        assert_eq!(track.rating, 2.0);
        assert_eq!(track.album_id, Some(7));
    }

    #[test]
    fn delete_removes_matching_rows() {
        let (_temp, session) = session();

        let id = session
            .query::<Track>()
            .insert(vec![
                Assignment::new("title", "doomed"),
                Assignment::new("rating", 0.0),
                Assignment::new("album_id", Value::Null),
            ])
            .last_row_id()
            .unwrap();

        session
            .query::<Track>()
            .delete()
            .filter(Constraint::is("id", id))
            .execute()
            .unwrap();

        assert!(session
            .query::<Track>()
            .select()
            .filter(Constraint::is("id", id))
            .fetch_one()
            .unwrap()
            .is_none());
    }

    #[test]
    fn null_constraint_matches_null_column() {
        let (_temp, session) = session();

        for (title, album) in [("orphan", Value::Null), ("owned", Value::Integer(3))] {
            session
                .query::<Track>()
                .insert(vec![
                    Assignment::new("title", title),
                    Assignment::new("rating", 0.0),
                    Assignment::new("album_id", album),
                ])
                .execute()
                .unwrap();
        }

        let orphans = session
            .query::<Track>()
            .select()
            .filter(Constraint::is("album_id", Value::Null))
            .fetch_all()
            .unwrap();

        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].title, "orphan");
    }

    #[test]
    fn mixed_operator_constraints_group_separately() {
        let (_temp, session) = session();

        session
            .query::<Track>()
            .insert(vec![
                Assignment::new("title", "wanted"),
                Assignment::new("rating", 5.0),
                Assignment::new("album_id", Value::Null),
            ])
            .execute()
            .unwrap();

        // one "=" group and one "is" group, combined with AND
        let found = session
            .query::<Track>()
            .select()
            .filter(Constraint::eq("title", "wanted"))
            .filter(Constraint::is("album_id", Value::Null))
            .fetch_one()
            .unwrap();

        assert!(found.is_some());
    }

    #[test]
    fn exists_reports_matching_rows() {
        let (_temp, session) = session();

        assert!(!session
            .query::<Track>()
            .select()
            .filter(Constraint::eq("title", "anything"))
            .exists()
            .unwrap());

        session
            .query::<Track>()
            .insert(vec![
                Assignment::new("title", "anything"),
                Assignment::new("rating", 1.0),
                Assignment::new("album_id", Value::Null),
            ])
            .execute()
            .unwrap();

        assert!(session
            .query::<Track>()
            .select()
            .filter(Constraint::eq("title", "anything"))
            .exists()
            .unwrap());
    }

    #[test]
    fn terminal_without_statement_is_an_error() {
        let (_temp, session) = session();

        let result = session.query::<Track>().fetch_all();
        assert!(matches!(result, Err(MetaError::MissingStatement)));
    }
}

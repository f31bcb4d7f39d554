//! Static schema records.
//!
//! A schema is a table name plus an ordered list of typed columns. The list
//! is declared as a `const` slice so the column set is fixed at compile time;
//! nothing here relies on runtime type introspection.

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

/// One column in a schema declaration.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnSpec {
    /// The `id` column: integer primary key, autoincrementing.
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: false,
            primary_key: true,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: false,
            primary_key: false,
        }
    }

    pub const fn integer_null(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            nullable: true,
            primary_key: false,
        }
    }

    pub const fn real(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Real,
            nullable: false,
            primary_key: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            nullable: false,
            primary_key: false,
        }
    }

    /// Render the column as a `CREATE TABLE` declaration fragment.
    pub fn sql_decl(&self) -> String {
        let type_name = match self.kind {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        };

        let mut decl = format!("{} {}", self.name, type_name);
        if self.primary_key {
            decl.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.nullable {
            decl.push_str(" NULL");
        }

        decl
    }
}

/// A persisted row type bound to a declared table.
pub trait Schema: Sized {
    /// Table name in the metadata file.
    const TABLE: &'static str;

    /// Ordered column declarations; row hydration follows this order.
    const COLUMNS: &'static [ColumnSpec];

    /// Hydrate a row fetched with the full column list, in declaration order.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// The full column list as it appears in `SELECT` statements.
    fn column_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The `CREATE TABLE` statement for this schema.
    fn create_table_sql() -> String {
        let columns = Self::COLUMNS
            .iter()
            .map(ColumnSpec::sql_decl)
            .collect::<Vec<_>>()
            .join(", ");

        format!("CREATE TABLE {} ({})", Self::TABLE, columns)
    }
}

//! Relation helpers.
//!
//! A relation resolves rows of one schema whose key column matches a value
//! taken from another row. Comparison uses `is` so null keys behave.

use crate::schema::Schema;
use crate::session::{Constraint, Session, Value};
use crate::Result;

/// All rows of `S` where `other_key` matches `value`.
pub fn one_to_many<S: Schema>(
    session: &Session,
    other_key: &'static str,
    value: Value,
) -> Result<Vec<S>> {
    session
        .query::<S>()
        .select()
        .filter(Constraint::is(other_key, value))
        .fetch_all()
}

/// At most one row of `S` where `other_key` matches `value`.
pub fn one_to_one<S: Schema>(
    session: &Session,
    other_key: &'static str,
    value: Value,
) -> Result<Option<S>> {
    session
        .query::<S>()
        .select()
        .filter(Constraint::is(other_key, value))
        .fetch_one()
}

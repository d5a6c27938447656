//! Rowfold – a micro query-building and result-mapping library.
//!
//! Rowfold does two things, and deliberately nothing else:
//! * It expands textual SQL templates containing typed placeholders
//!   (`{in__name}`, `{not_in__actor.name}`, `{values__tag}`) into fully
//!   parameterized SQL plus a mapping of uniquely named bindings.
//! * It folds flat, denormalized result rows back into structured records,
//!   merging list/set/dict-shaped sub-fields across rows that share an
//!   identity, without relying on the database for grouping.
//!
//! ## Modules
//! * [`template`] – Placeholder grammar, list-template expansion, parameter
//!   binding and the [`template::assemble`] entry point.
//! * [`record`] – Record schema descriptors and the row-folding mappers
//!   ([`record::SingleRowMapper`], [`record::RecordCombiningMapper`]).
//! * [`value`] – The scalar [`value::Value`] type and declared-type coercion.
//! * [`execute`] – A thin execution bridge over a borrowed
//!   [`rusqlite::Connection`].
//! * [`error`] – The crate error type and `Result` alias.
//!
//! Everything is synchronous and pure: each call allocates its own bindings
//! and records, so calls may run concurrently without coordination. Rowfold
//! never parses SQL beyond its own placeholder grammar and never manages
//! connections or transactions.
//!
//! ## Quick Start
//! ```
//! use rusqlite::Connection;
//! use rowfold::execute::Executor;
//! use rowfold::record::{RecordCombiningMapper, RecordSchema};
//! use rowfold::template::{QueryData, TemplateValue};
//! use rowfold::value::ScalarType;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch(
//!     "CREATE TABLE tag (id INTEGER, label TEXT);
//!      INSERT INTO tag VALUES (1, 'red'), (1, 'blue'), (2, 'green');",
//! )
//! .unwrap();
//!
//! let data = QueryData::new("SELECT id, label FROM tag WHERE {in__id} ORDER BY rowid")
//!     .template_param("in__id", TemplateValue::list([1i64, 2]));
//! let rows = Executor::new(&conn).fetch(&data).unwrap();
//!
//! let schema = RecordSchema::keyed_on(["id"])
//!     .scalar("id", ScalarType::Integer)
//!     .list("label");
//! let records = RecordCombiningMapper::new(schema).map(&rows).unwrap();
//! assert_eq!(records.len(), 2);
//! ```

pub mod error;
pub mod value;
pub mod template;
pub mod record;
pub mod execute;

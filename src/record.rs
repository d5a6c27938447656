//! Row folding: reconstruction of structured records from flat, denormalized
//! result rows.
//!
//! A [`RecordSchema`] declares the identity field(s) that group rows into one
//! logical record, the scalar fields with their coercion types, and the merge
//! directives (list, set, CSV-list, dict) applied once per contributing row.
//! [`SingleRowMapper`] folds everything it is given as one partition;
//! [`RecordCombiningMapper`] partitions rows by identity and folds each
//! partition independently, in first-seen order.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::{Result, RowfoldError};
use crate::value::{ColumnHasher, ScalarType, Value};

/// One raw result row: column name to scalar value.
pub type Row = HashMap<String, Value, ColumnHasher>;
/// Accumulated set field contents.
pub type ValueSet = HashSet<Value, ColumnHasher>;
/// Accumulated dict field contents.
pub type ValueDict = HashMap<Value, Value, ColumnHasher>;

// ------------- RecordSchema -------------
#[derive(Debug, Clone)]
struct CsvField {
    field: String,
    element: ScalarType,
}

#[derive(Debug, Clone)]
struct DictField {
    field: String,
    key_column: String,
    value_column: String,
}

/// Statically constructed schema descriptor consumed by the mappers. Columns
/// present in a row but not named by any field or directive are ignored.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    id_fields: Vec<String>,
    scalar_fields: Vec<(String, ScalarType)>,
    list_fields: Vec<String>,
    set_fields: Vec<String>,
    csv_fields: Vec<CsvField>,
    dict_fields: Vec<DictField>,
}

impl RecordSchema {
    /// Starts a schema whose records are grouped by the given identity
    /// field(s).
    pub fn keyed_on<I>(id_fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            id_fields: id_fields.into_iter().map(Into::into).collect(),
            scalar_fields: Vec::new(),
            list_fields: Vec::new(),
            set_fields: Vec::new(),
            csv_fields: Vec::new(),
            dict_fields: Vec::new(),
        }
    }
    /// Declares a scalar field, read and coerced from the first row of each
    /// partition.
    pub fn scalar(mut self, field: impl Into<String>, scalar_type: ScalarType) -> Self {
        self.scalar_fields.push((field.into(), scalar_type));
        self
    }
    /// Declares a list field: the raw value of the same-named column is
    /// appended for every contributing row.
    pub fn list(mut self, field: impl Into<String>) -> Self {
        self.list_fields.push(field.into());
        self
    }
    /// Declares a set field: duplicate values across rows collapse.
    pub fn set(mut self, field: impl Into<String>) -> Self {
        self.set_fields.push(field.into());
        self
    }
    /// Declares a CSV-list field: the column's text is split on `,` and every
    /// token coerced to the element type, appended in row order.
    pub fn csv_list(mut self, field: impl Into<String>, element: ScalarType) -> Self {
        self.csv_fields.push(CsvField {
            field: field.into(),
            element,
        });
        self
    }
    /// Declares a dict directive: per row, one entry is read from the key
    /// and value source columns. Later rows overwrite same-key entries.
    pub fn dict(
        mut self,
        field: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        self.dict_fields.push(DictField {
            field: field.into(),
            key_column: key_column.into(),
            value_column: value_column.into(),
        });
        self
    }

    fn identity_of(&self, row: &Row) -> Vec<Value> {
        self.id_fields
            .iter()
            .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

// ------------- Record -------------
/// A folded record: coerced scalar fields plus the accumulated list, set and
/// dict fields. Immutable once returned by a mapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    scalars: HashMap<String, Value, ColumnHasher>,
    lists: HashMap<String, Vec<Value>, ColumnHasher>,
    sets: HashMap<String, ValueSet, ColumnHasher>,
    dicts: HashMap<String, ValueDict, ColumnHasher>,
}

impl Record {
    pub fn scalar(&self, field: &str) -> Option<&Value> {
        self.scalars.get(field)
    }
    pub fn list(&self, field: &str) -> Option<&Vec<Value>> {
        self.lists.get(field)
    }
    pub fn set(&self, field: &str) -> Option<&ValueSet> {
        self.sets.get(field)
    }
    pub fn dict(&self, field: &str) -> Option<&ValueDict> {
        self.dicts.get(field)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.scalars.len() + self.lists.len() + self.sets.len() + self.dicts.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in &self.scalars {
            map.serialize_entry(field, value)?;
        }
        for (field, values) in &self.lists {
            map.serialize_entry(field, values)?;
        }
        for (field, values) in &self.sets {
            // sets have no inherent order; serialize them deterministically
            let mut ordered: Vec<&Value> = values.iter().collect();
            ordered.sort_by_key(|value| value.to_string());
            map.serialize_entry(field, &ordered)?;
        }
        for (field, entries) in &self.dicts {
            let ordered: BTreeMap<String, &Value> = entries
                .iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect();
            map.serialize_entry(field, &ordered)?;
        }
        map.end()
    }
}

// ------------- Folding core -------------
// A record under construction. Starting one coerces the scalar fields from
// the partition's first row and initializes every directive field to its
// empty container; finishing consumes it into the immutable Record.
struct PartialRecord {
    record: Record,
}

impl PartialRecord {
    fn start(schema: &RecordSchema, row: &Row) -> Result<Self> {
        let mut record = Record::default();
        for (field, scalar_type) in &schema.scalar_fields {
            let raw = row.get(field).cloned().unwrap_or(Value::Null);
            record
                .scalars
                .insert(field.clone(), scalar_type.coerce(field, &raw)?);
        }
        for field in &schema.list_fields {
            record.lists.insert(field.clone(), Vec::new());
        }
        for csv in &schema.csv_fields {
            record.lists.insert(csv.field.clone(), Vec::new());
        }
        for field in &schema.set_fields {
            record.sets.insert(field.clone(), ValueSet::default());
        }
        for dict in &schema.dict_fields {
            record.dicts.insert(dict.field.clone(), ValueDict::default());
        }
        Ok(Self { record })
    }

    fn absorb(&mut self, schema: &RecordSchema, row: &Row) -> Result<()> {
        for csv in &schema.csv_fields {
            match row.get(&csv.field) {
                Some(Value::Text(text)) => {
                    if let Some(list) = self.record.lists.get_mut(&csv.field) {
                        for token in text.split(',') {
                            list.push(csv.element.coerce_token(&csv.field, token)?);
                        }
                    }
                }
                Some(Value::Null) | None => (),
                Some(other) => {
                    return Err(RowfoldError::Coercion {
                        column: csv.field.clone(),
                        message: format!("'{}' is not a delimited text value", other),
                    });
                }
            }
        }
        for field in &schema.list_fields {
            if let Some(value) = row.get(field) {
                if !value.is_null() {
                    if let Some(list) = self.record.lists.get_mut(field) {
                        list.push(value.clone());
                    }
                }
            }
        }
        for field in &schema.set_fields {
            if let Some(value) = row.get(field) {
                if !value.is_null() {
                    if let Some(set) = self.record.sets.get_mut(field) {
                        set.insert(value.clone());
                    }
                }
            }
        }
        for dict in &schema.dict_fields {
            if let Some(key) = row.get(&dict.key_column) {
                if !key.is_null() {
                    let value = row.get(&dict.value_column).cloned().unwrap_or(Value::Null);
                    if let Some(entries) = self.record.dicts.get_mut(&dict.field) {
                        entries.insert(key.clone(), value);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Record {
        self.record
    }
}

// ------------- Mappers -------------
/// Folds all given rows as one partition: the rows either represent a single
/// record's worth of denormalized data or the one-to-many rows of a single
/// identity.
pub struct SingleRowMapper {
    schema: RecordSchema,
}

impl SingleRowMapper {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }
    /// Returns `None` when given zero rows.
    pub fn map(&self, rows: &[Row]) -> Result<Option<Record>> {
        let first = match rows.first() {
            Some(first) => first,
            None => return Ok(None),
        };
        let mut partial = PartialRecord::start(&self.schema, first)?;
        for row in rows {
            partial.absorb(&self.schema, row)?;
        }
        Ok(Some(partial.finish()))
    }
}

/// Partitions rows by the schema's identity field(s) and folds each partition
/// independently, returning records in the order their identities were first
/// seen.
pub struct RecordCombiningMapper {
    schema: RecordSchema,
}

impl RecordCombiningMapper {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }
    pub fn map(&self, rows: &[Row]) -> Result<Vec<Record>> {
        let mut index: HashMap<Vec<Value>, usize, ColumnHasher> = HashMap::default();
        let mut partials: Vec<PartialRecord> = Vec::new();
        for row in rows {
            let identity = self.schema.identity_of(row);
            let slot = match index.get(&identity) {
                Some(slot) => *slot,
                None => {
                    partials.push(PartialRecord::start(&self.schema, row)?);
                    index.insert(identity, partials.len() - 1);
                    partials.len() - 1
                }
            };
            partials[slot].absorb(&self.schema, row)?;
        }
        debug!("folded {} rows into {} records", rows.len(), partials.len());
        Ok(partials.into_iter().map(PartialRecord::finish).collect())
    }
}

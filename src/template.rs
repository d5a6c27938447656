//! Query templating: placeholder scanning, list-template expansion and
//! parameter binding.
//!
//! Query text may contain placeholders of the form `{keyword__[table.]column}`
//! for `keyword` one of `in`, `not_in` and `values`. [`assemble`] validates
//! every placeholder against the supplied template values (batch, not
//! fail-fast), substitutes the rendered fragments and returns the rewritten
//! SQL together with one mapping of uniquely named parameter bindings. All of
//! the text around the placeholders is treated as opaque; no SQL is parsed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RowfoldError};
use crate::value::{ColumnHasher, Value};

/// Parameter bindings for one assembled query: unique name to scalar value.
pub type Params = HashMap<String, Value, ColumnHasher>;
/// Template values keyed by the full placeholder key, e.g. `in__actor.name`.
pub type TemplateParams = HashMap<String, TemplateValue, ColumnHasher>;

// ------------- TemplateValue -------------
/// The raw value supplied for one placeholder key: a lone scalar, a flat list
/// of scalars, or a list of row tuples (for `values` templates).
#[derive(Debug, Clone, Serialize)]
pub enum TemplateValue {
    Single(Value),
    List(Vec<Value>),
    Rows(Vec<Vec<Value>>),
}

impl TemplateValue {
    pub fn single(value: impl Into<Value>) -> Self {
        Self::Single(value.into())
    }
    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
    pub fn rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator,
        R::Item: Into<Value>,
    {
        Self::Rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
    /// A lone scalar is never empty; lists and row sets are empty when they
    /// hold no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::List(values) => values.is_empty(),
            Self::Rows(rows) => rows.is_empty(),
        }
    }
}

impl From<Value> for TemplateValue {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

// ------------- TemplateKind -------------
/// The closed registry of list templates. Each kind carries its own policy
/// for an empty input: an empty `IN` matches nothing, an empty `NOT IN`
/// excludes nothing, and an empty `VALUES` has no safe sentinel at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateKind {
    In,
    NotIn,
    Values,
}

impl TemplateKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Values => "values",
        }
    }

    pub fn lookup(keyword: &str) -> Option<Self> {
        match keyword {
            "in" => Some(Self::In),
            "not_in" => Some(Self::NotIn),
            "values" => Some(Self::Values),
            _ => None,
        }
    }

    /// Splits a full placeholder key such as `in__actor.name` into its kind
    /// and target, rejecting anything outside the placeholder grammar.
    pub fn parse_key(key: &str) -> Option<(Self, &str)> {
        for kind in [Self::In, Self::NotIn, Self::Values] {
            if let Some(target) = key
                .strip_prefix(kind.keyword())
                .and_then(|rest| rest.strip_prefix("__"))
            {
                if valid_target(target) {
                    return Some((kind, target));
                }
            }
        }
        None
    }

    /// Renders the fragment and bindings for one placeholder. `name` is the
    /// `[table.]column` target as written in the query; `seed` is the base
    /// for generated parameter names.
    pub fn render(
        self,
        name: &str,
        values: &TemplateValue,
        seed: &str,
    ) -> Result<(String, Vec<(String, Value)>)> {
        match self {
            Self::In => Ok(if values.is_empty() {
                // an empty IN-list matches nothing
                ("1 <> 1".to_string(), Vec::new())
            } else {
                let (fragment, bindings) = parameterize(seed, values, false);
                (format!("{name} IN {fragment}"), bindings)
            }),
            Self::NotIn => Ok(if values.is_empty() {
                // an empty NOT-IN excludes nothing
                ("1 = 1".to_string(), Vec::new())
            } else {
                let (fragment, bindings) = parameterize(seed, values, false);
                (format!("{name} NOT IN {fragment}"), bindings)
            }),
            Self::Values => {
                if values.is_empty() {
                    return Err(RowfoldError::EmptyValues(name.to_string()));
                }
                let (fragment, bindings) = parameterize(seed, values, true);
                Ok((format!("VALUES {fragment}"), bindings))
            }
        }
    }
}

// ------------- Parameterization engine -------------
/// Expands `values` into a textual fragment plus one binding per scalar.
/// Names derive from `seed` with dots replaced, suffixed by element index
/// (and tuple position for row groups), so one key's expansion can never
/// collide with itself. With `grouped` set, every element becomes its own
/// parenthesized group, as a `VALUES` row constructor requires.
pub fn parameterize(
    seed: &str,
    values: &TemplateValue,
    grouped: bool,
) -> (String, Vec<(String, Value)>) {
    let base = seed.replace('.', "_");
    match values {
        TemplateValue::Single(value) => {
            expand_scalars(&base, std::slice::from_ref(value), grouped)
        }
        TemplateValue::List(items) => expand_scalars(&base, items, grouped),
        TemplateValue::Rows(rows) => {
            let mut bindings = Vec::new();
            let mut groups = Vec::with_capacity(rows.len());
            for (index, row) in rows.iter().enumerate() {
                let (group, mut group_bindings) = inner_group(&format!("{base}_{index}"), row);
                groups.push(group);
                bindings.append(&mut group_bindings);
            }
            (groups.join(", "), bindings)
        }
    }
}

fn expand_scalars(base: &str, items: &[Value], grouped: bool) -> (String, Vec<(String, Value)>) {
    if !grouped {
        return inner_group(base, items);
    }
    // each scalar becomes a one-element row constructor
    let mut bindings = Vec::with_capacity(items.len());
    let mut groups = Vec::with_capacity(items.len());
    for (index, value) in items.iter().enumerate() {
        let name = format!("{base}_{index}");
        groups.push(format!("( :{name} )"));
        bindings.push((name, value.clone()));
    }
    (groups.join(", "), bindings)
}

fn inner_group(base: &str, items: &[Value]) -> (String, Vec<(String, Value)>) {
    let mut bindings = Vec::with_capacity(items.len());
    for (index, value) in items.iter().enumerate() {
        bindings.push((format!("{base}_{index}"), value.clone()));
    }
    let names: Vec<&str> = bindings.iter().map(|(name, _)| name.as_str()).collect();
    (format!("( :{} )", names.join(", :")), bindings)
}

// ------------- Placeholder scanning -------------
/// One placeholder occurrence in query text. `start..end` spans the token
/// including any absorbed surrounding spaces, so substitution controls
/// spacing exactly.
#[derive(Debug, PartialEq, Eq)]
struct Placeholder {
    start: usize,
    end: usize,
    kind: TemplateKind,
    target: String,
}

impl Placeholder {
    fn key(&self) -> String {
        format!("{}__{}", self.kind.keyword(), self.target)
    }
}

fn valid_target(target: &str) -> bool {
    let mut segments = 0;
    for segment in target.split('.') {
        segments += 1;
        if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return false;
        }
    }
    segments == 1 || segments == 2
}

fn parse_token(text: &str, open: usize) -> Option<(TemplateKind, String, usize)> {
    let rest = &text[open + 1..];
    let close = rest.find('}')?;
    let (kind, target) = TemplateKind::parse_key(&rest[..close])?;
    Some((kind, target.to_string(), open + 1 + close + 1))
}

/// Scans query text for placeholder tokens, left to right, absorbing runs of
/// spaces on either side of each token. Anything that does not match the
/// grammar exactly is left as opaque text.
fn scan(text: &str) -> Vec<Placeholder> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut last_end = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some((kind, target, after)) = parse_token(text, i) {
                let mut start = i;
                while start > last_end && bytes[start - 1] == b' ' {
                    start -= 1;
                }
                let mut end = after;
                while end < bytes.len() && bytes[end] == b' ' {
                    end += 1;
                }
                found.push(Placeholder {
                    start,
                    end,
                    kind,
                    target,
                });
                last_end = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    found
}

// ------------- QueryData -------------
/// Caller-built description of one query: the templated SQL text, directly
/// supplied parameters, and the values backing each placeholder key. Consumed
/// read-only by [`assemble`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryData {
    query: String,
    query_params: Option<Params>,
    template_params: Option<TemplateParams>,
}

impl QueryData {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_params: None,
            template_params: None,
        }
    }
    /// Adds one directly supplied parameter. Direct parameters are merged
    /// last during assembly and take precedence over generated bindings.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params
            .get_or_insert_with(Params::default)
            .insert(name.into(), value.into());
        self
    }
    /// Supplies the value backing one placeholder key, e.g.
    /// `template_param("in__name", TemplateValue::list(["bob", "tom"]))`.
    pub fn template_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<TemplateValue>,
    ) -> Self {
        self.template_params
            .get_or_insert_with(TemplateParams::default)
            .insert(key.into(), value.into());
        self
    }
    pub fn query(&self) -> &str {
        &self.query
    }
    pub fn query_params(&self) -> Option<&Params> {
        self.query_params.as_ref()
    }
    pub fn template_params(&self) -> Option<&TemplateParams> {
        self.template_params.as_ref()
    }
}

// ------------- Query assembly -------------
/// Produces `(final_sql, merged_params)` from a [`QueryData`].
///
/// Every placeholder is validated before any substitution happens: keys that
/// are absent from the template values, or that back a `values` placeholder
/// with an empty payload, are all collected and reported in one error. Each
/// distinct key then renders exactly once and replaces every occurrence of
/// its token, padded with exactly one space on each side. Generated parameter
/// names are tracked in an explicit set; a collision between two placeholders
/// retries with the full key as the name seed and otherwise fails.
pub fn assemble(data: &QueryData) -> Result<(String, Params)> {
    if data.query.trim().is_empty() {
        return Err(RowfoldError::QueryData("query text is empty".to_string()));
    }
    let placeholders = scan(&data.query);

    let mut missing: Vec<String> = Vec::new();
    for placeholder in &placeholders {
        let key = placeholder.key();
        if missing.contains(&key) {
            continue;
        }
        let supplied = data.template_params.as_ref().and_then(|t| t.get(&key));
        let invalid = match supplied {
            None => true,
            Some(value) => placeholder.kind == TemplateKind::Values && value.is_empty(),
        };
        if invalid {
            missing.push(key);
        }
    }
    if !missing.is_empty() {
        return Err(RowfoldError::MissingTemplateKeys(missing));
    }

    let mut params = Params::default();
    let mut used_names: HashSet<String, ColumnHasher> = HashSet::default();
    let mut fragments: HashMap<String, String, ColumnHasher> = HashMap::default();
    for placeholder in &placeholders {
        let key = placeholder.key();
        if fragments.contains_key(&key) {
            continue;
        }
        let values = match data.template_params.as_ref().and_then(|t| t.get(&key)) {
            Some(values) => values,
            None => continue, // ruled out by validation above
        };
        let (fragment, bindings) = render_unique(placeholder, values, &used_names)?;
        for (name, value) in bindings {
            used_names.insert(name.clone());
            params.insert(name, value);
        }
        fragments.insert(key, fragment);
    }

    let mut sql = String::with_capacity(data.query.len());
    let mut last = 0;
    for placeholder in &placeholders {
        sql.push_str(&data.query[last..placeholder.start]);
        match fragments.get(&placeholder.key()) {
            Some(fragment) => {
                sql.push(' ');
                sql.push_str(fragment);
                sql.push(' ');
            }
            None => sql.push_str(&data.query[placeholder.start..placeholder.end]),
        }
        last = placeholder.end;
    }
    sql.push_str(&data.query[last..]);

    // direct query params land last and take precedence
    if let Some(direct) = &data.query_params {
        for (name, value) in direct {
            params.insert(name.clone(), value.clone());
        }
    }
    debug!(
        "assembled query with {} placeholders and {} parameters",
        placeholders.len(),
        params.len()
    );
    Ok((sql, params))
}

/// Renders one placeholder, preferring the column target as the parameter
/// name seed and falling back to the full key when another placeholder has
/// already claimed one of the generated names.
fn render_unique(
    placeholder: &Placeholder,
    values: &TemplateValue,
    used_names: &HashSet<String, ColumnHasher>,
) -> Result<(String, Vec<(String, Value)>)> {
    let name = placeholder.target.as_str();
    let (fragment, bindings) = placeholder.kind.render(name, values, name)?;
    if bindings.iter().all(|(binding, _)| !used_names.contains(binding)) {
        return Ok((fragment, bindings));
    }
    let key = placeholder.key();
    let (fragment, bindings) = placeholder.kind.render(name, values, &key)?;
    if let Some((binding, _)) = bindings.iter().find(|(binding, _)| used_names.contains(binding)) {
        return Err(RowfoldError::ParameterCollision(binding.clone()));
    }
    Ok((fragment, bindings))
}

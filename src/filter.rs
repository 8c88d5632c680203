//! JMESPath projection of API responses.
//!
//! Two shapes are supported:
//! - a list response filtered element-wise, e.g.
//!   `results[].{id:id, name:name}`, whose value replaces `results` while
//!   `count`, `next` and the other siblings stay untouched;
//! - a single-object response reduced to a mapping of output key to source
//!   path, whose value becomes the whole body.

use jmespath::{JmespathError, Rcvar, ToJmespath, Variable};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::ApplyFilter;

/// A resolved filter: the expression text and whether its value replaces
/// the `results` field or the whole body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    expression: String,
    replace_results: bool,
}

impl Filter {
    pub fn new(expression: impl Into<String>, replace_results: bool) -> Self {
        Self {
            expression: expression.into(),
            replace_results,
        }
    }

    /// Resolve the raw `apply_filter` value of a job.
    ///
    /// A string is taken as a complete expression over a list response. A
    /// mapping is turned into a multi-select hash; only string-valued
    /// entries take part. The expression is compiled once here so a bad
    /// filter fails the job before any HTTP call is made.
    pub fn parse(raw: &ApplyFilter) -> Result<Self> {
        let filter = match raw {
            ApplyFilter::Expression(expr) => Filter::new(expr.clone(), true),
            ApplyFilter::FieldMap(fields) => Filter::new(multi_select(fields)?, false),
        };
        compile(&filter.expression)?;
        Ok(filter)
    }

    /// Evaluate the filter against a decoded response body.
    pub fn apply(&self, body: Value) -> Result<Value> {
        let expr = compile(&self.expression)?;
        let found = expr
            .search(Document(to_variable(body.clone())))
            .map_err(|e| Error::Filter(format!("evaluating {}: {e}", self.expression)))?;
        let found = serde_json::to_value(&*found)
            .map_err(|e| Error::Filter(format!("converting result of {}: {e}", self.expression)))?;

        if self.replace_results {
            let Value::Object(mut object) = body else {
                return Err(Error::Filter(
                    "cannot replace results on a non-object response".to_string(),
                ));
            };
            object.insert("results".to_string(), found);
            Ok(Value::Object(object))
        } else {
            match found {
                Value::Object(_) => Ok(found),
                other => Err(Error::Filter(format!(
                    "expression {} produced {} instead of an object",
                    self.expression,
                    kind(&other)
                ))),
            }
        }
    }
}

/// Search input that is already a jmespath value, so it is handed over as
/// is instead of going through serde.
struct Document(Rcvar);

impl ToJmespath for Document {
    fn to_jmespath(self) -> std::result::Result<Rcvar, JmespathError> {
        Ok(self.0)
    }
}

/// Numbers keep their parsed text. Serializing a `serde_json::Number` into
/// jmespath would turn it into an object.
fn to_variable(value: Value) -> Rcvar {
    let variable = match value {
        Value::Null => Variable::Null,
        Value::Bool(b) => Variable::Bool(b),
        Value::Number(n) => Variable::Number(n),
        Value::String(s) => Variable::String(s),
        Value::Array(items) => Variable::Array(items.into_iter().map(to_variable).collect()),
        Value::Object(fields) => Variable::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, to_variable(value)))
                .collect(),
        ),
    };
    Rcvar::new(variable)
}

fn compile(expression: &str) -> Result<jmespath::Expression<'static>> {
    jmespath::compile(expression)
        .map_err(|e| Error::Filter(format!("compiling {expression}: {e}")))
}

/// Build `{"out1":in1, "out2":in2}` from a field mapping. Output keys are
/// quoted so any key text is valid; source paths are used as written.
fn multi_select(fields: &Map<String, Value>) -> Result<String> {
    let pairs: Vec<String> = fields
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(source) => Some(format!("{}:{source}", Value::String(key.clone()))),
            _ => None,
        })
        .collect();

    if pairs.is_empty() {
        return Err(Error::Filter(
            "filter mapping has no string-valued entries".to_string(),
        ));
    }
    Ok(format!("{{{}}}", pairs.join(",")))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

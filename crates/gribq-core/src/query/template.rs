//! Product URL templates with `{placeholder}` substitution.

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};

/// Placeholders a template may reference.
pub const PLACEHOLDERS: &[&str] = &[
    "date",
    "cycle",
    "forecast_hour",
    "lat_min",
    "lat_max",
    "lon_min",
    "lon_max",
];

/// How one product of a model is requested from the filter service.
///
/// Query pairs are emitted in order, followed by one `<prefix><id>=on` flag
/// per selected variable and level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTemplate {
    pub base_url: String,
    /// `[key, value-template]` pairs.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    #[serde(default = "default_variable_prefix")]
    pub variable_prefix: String,
    #[serde(default = "default_level_prefix")]
    pub level_prefix: String,
}

fn default_variable_prefix() -> String {
    "var_".to_string()
}

fn default_level_prefix() -> String {
    "lev_".to_string()
}

impl ProductTemplate {
    /// Reject unknown placeholders and bad brace syntax up front.
    pub fn check(&self) -> QueryResult<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| QueryError::Template(format!("base_url {:?}: {e}", self.base_url)))?;
        for (key, value) in &self.query {
            for segment in parse(value)? {
                if let Segment::Field(name) = segment {
                    if !PLACEHOLDERS.contains(&name) {
                        return Err(unknown_field(name, key));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Render `template`, resolving each `{name}` through `lookup`.
pub fn render<F>(template: &str, lookup: F) -> QueryResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Field(name) => {
                let value = lookup(name).ok_or_else(|| unknown_field(name, template))?;
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}

fn unknown_field(name: &str, context: &str) -> QueryError {
    QueryError::Template(format!(
        "placeholder {{{name}}} in {context:?} is not a request field"
    ))
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(String),
    Field(&'a str),
}

/// Split into literals and fields; `{{`/`}}` escape braces.
fn parse(template: &str) -> QueryResult<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            literal.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            literal.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return Err(QueryError::Template(format!(
                "unmatched '}}' in {template:?}"
            )));
        } else {
            let close = tail.find('}').ok_or_else(|| {
                QueryError::Template(format!("unterminated '{{' in {template:?}"))
            })?;
            let name = &tail[1..close];
            if name.is_empty() || name.contains('{') {
                return Err(QueryError::Template(format!(
                    "bad placeholder {:?} in {template:?}",
                    &tail[..=close]
                )));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(name));
            rest = &tail[close + 1..];
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

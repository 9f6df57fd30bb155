use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};

use super::QueryOptionParser;
use crate::{
    ast::Expression,
    error::{CompileError, CompileResult},
};

/// Raw query-option strings, as found in a request.
///
/// Deserializes from a map keyed by the `$`-prefixed option names;
/// `$orderBy` and `$groupBy` are accepted as aliases, and `$top`/`$skip`
/// may be numbers or numeric strings.
///
/// ```
/// use query_expr::QueryOptions;
///
/// let options: QueryOptions = serde_json::from_str(
///     r#"{ "$filter": "price gt 10", "$orderBy": "price desc", "$top": "5" }"#,
/// )
/// .unwrap();
/// assert_eq!(options.order_by.as_deref(), Some("price desc"));
/// assert_eq!(options.top, Some(5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$select")]
    pub select: Option<String>,
    #[serde(rename = "$orderby", alias = "$orderBy")]
    pub order_by: Option<String>,
    #[serde(rename = "$groupby", alias = "$groupBy")]
    pub group_by: Option<String>,
    #[serde(rename = "$expand")]
    pub expand: Option<String>,
    #[serde(rename = "$top", deserialize_with = "count")]
    pub top: Option<u64>,
    #[serde(rename = "$skip", deserialize_with = "count")]
    pub skip: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u64),
    Text(String),
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid count `{}`", text))),
    }
}

fn parse_count(key: &str, value: &str) -> CompileResult<u64> {
    value.trim().parse().map_err(|_| {
        CompileError::unexpected(0, format!("{} must be a non-negative integer, got `{}`", key, value))
    })
}

impl QueryOptions {
    /// Builds an option set from `(key, value)` string pairs. Unknown keys
    /// are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> CompileResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = QueryOptions::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.into();
            match key {
                "$filter" => options.filter = Some(value),
                "$select" => options.select = Some(value),
                "$orderby" | "$orderBy" => options.order_by = Some(value),
                "$groupby" | "$groupBy" => options.group_by = Some(value),
                "$expand" => options.expand = Some(value),
                "$top" => options.top = Some(parse_count(key, &value)?),
                "$skip" => options.skip = Some(parse_count(key, &value)?),
                other => tracing::trace!(key = other, "ignoring unknown query option"),
            }
        }
        Ok(options)
    }
}

/// One entry of `$expand`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOption {
    pub name: String,
    /// Nested options from `name(...)`
    pub options: Option<Box<ParsedQuery>>,
}

impl ExpandOption {
    pub fn serialize(&self) -> CompileResult<JsonValue> {
        let mut map = Map::new();
        map.insert("name".to_string(), JsonValue::String(self.name.clone()));
        if let Some(options) = &self.options {
            map.insert("options".to_string(), ParsedQuery::serialize(options)?);
        }
        Ok(JsonValue::Object(map))
    }
}

/// A parsed option set. Only options present in the input are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub filter: Option<Expression>,
    pub select: Option<Vec<Expression>>,
    pub order_by: Option<Vec<Expression>>,
    pub expand: Option<Vec<ExpandOption>>,
    pub group_by: Option<Vec<Expression>>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
}

impl ParsedQuery {
    /// Serializes to `{ $where, $select, $orderBy, $expand, $groupBy, $take,
    /// $skip }`, omitting absent options.
    pub fn serialize(&self) -> CompileResult<JsonValue> {
        let mut map = Map::new();
        if let Some(filter) = &self.filter {
            map.insert("$where".into(), filter.serialize()?);
        }
        if let Some(select) = &self.select {
            map.insert("$select".into(), serialize_list(select)?);
        }
        if let Some(order_by) = &self.order_by {
            map.insert("$orderBy".into(), serialize_list(order_by)?);
        }
        if let Some(expand) = &self.expand {
            let entries = expand
                .iter()
                .map(ExpandOption::serialize)
                .collect::<CompileResult<Vec<_>>>()?;
            map.insert("$expand".into(), JsonValue::Array(entries));
        }
        if let Some(group_by) = &self.group_by {
            map.insert("$groupBy".into(), serialize_list(group_by)?);
        }
        if let Some(take) = self.take {
            map.insert("$take".into(), take.into());
        }
        if let Some(skip) = self.skip {
            map.insert("$skip".into(), skip.into());
        }
        Ok(JsonValue::Object(map))
    }
}

impl serde::Serialize for ParsedQuery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = ParsedQuery::serialize(self).map_err(serde::ser::Error::custom)?;
        serde::Serialize::serialize(&value, serializer)
    }
}

fn serialize_list(items: &[Expression]) -> CompileResult<JsonValue> {
    items
        .iter()
        .map(Expression::serialize)
        .collect::<CompileResult<Vec<_>>>()
        .map(JsonValue::Array)
}

/// Splits on `separator` outside parentheses and quoted strings.
fn split_top_level(text: &str, separator: char) -> CompileResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    CompileError::unexpected(text[..index].chars().count(), "unbalanced `)`")
                })?;
            }
            c if c == separator && !quoted && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(CompileError::expected(text.chars().count(), "`)`"));
    }
    if quoted {
        return Err(CompileError::unexpected(
            text.chars().count(),
            "unterminated string: missing closing quote",
        ));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

impl QueryOptionParser {
    pub(super) fn query(
        &self,
        options: &QueryOptions,
        target: Option<&str>,
    ) -> CompileResult<ParsedQuery> {
        Ok(ParsedQuery {
            filter: options
                .filter
                .as_deref()
                .map(|text| self.filter(text, target))
                .transpose()?,
            select: options
                .select
                .as_deref()
                .map(|text| self.select(text, target))
                .transpose()?,
            order_by: options
                .order_by
                .as_deref()
                .map(|text| self.order_by(text, target))
                .transpose()?,
            expand: options
                .expand
                .as_deref()
                .map(|text| self.expand(text))
                .transpose()?,
            group_by: options
                .group_by
                .as_deref()
                .map(|text| self.select(text, target))
                .transpose()?,
            take: options.top,
            skip: options.skip,
        })
    }

    /// `name1($select=a,b;$top=5),name2`
    pub(super) fn expand(&self, text: &str) -> CompileResult<Vec<ExpandOption>> {
        split_top_level(text, ',')?
            .into_iter()
            .map(|entry| self.expand_entry(entry.trim()))
            .collect()
    }

    fn expand_entry(&self, entry: &str) -> CompileResult<ExpandOption> {
        let (name, nested) = match entry.find('(') {
            Some(open) => {
                let Some(inner) = entry[open + 1..].strip_suffix(')') else {
                    return Err(CompileError::expected(entry.chars().count(), "`)` closing expand options"));
                };
                (entry[..open].trim(), Some(inner))
            }
            None => (entry, None),
        };

        let name = name.replace('/', ".");
        if name.is_empty() {
            return Err(CompileError::expected(0, "entity name in $expand"));
        }
        self.validator.test(&name, true, true)?;

        let options = match nested {
            Some(inner) if !inner.trim().is_empty() => {
                let mut pairs = Vec::new();
                for option in split_top_level(inner, ';')? {
                    let option = option.trim();
                    let Some((key, value)) = option.split_once('=') else {
                        return Err(CompileError::expected(0, format!("`=` in expand option `{}`", option)));
                    };
                    pairs.push((key.trim().to_string(), value.trim().to_string()));
                }
                let nested = QueryOptions::from_pairs(pairs)?;
                tracing::debug!(entity = %name, "parsing nested expand options");
                Some(Box::new(self.query(&nested, Some(name.as_str()))?))
            }
            _ => None,
        };

        Ok(ExpandOption { name, options })
    }
}

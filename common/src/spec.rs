use core::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("Empty key path segment in `{0}`")]
    EmptySegment(String),
    #[error("Expected `key=value` but found `{0}`")]
    MissingValue(String),
    #[error("Empty entry in list `{0}`")]
    EmptyEntry(String),
}

/// A `/` separated path into a nested JSON record, ie. `params/threads`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn parse(arg: &str) -> Result<Self, SpecError> {
        let segments = arg.split('/').map(str::to_owned).collect::<Vec<_>>();
        if segments.iter().any(String::is_empty) {
            return Err(SpecError::EmptySegment(arg.to_owned()));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Keeps only the records whose value at `path` equals `expected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub path: KeyPath,
    pub expected: String,
}

impl FilterSpec {
    pub fn parse(arg: &str) -> Result<Self, SpecError> {
        let (key, value) = split_key_value(arg)?;
        Ok(Self {
            path: KeyPath::parse(key)?,
            expected: value.to_owned(),
        })
    }
}

/// Source of the group or bar labels.
///
/// Without explicit `labels` the axis is derived from the data and sorted
/// ascending, otherwise the given labels fix both identity and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSpec {
    pub path: KeyPath,
    pub labels: Option<Vec<String>>,
}

impl AxisSpec {
    pub fn parse(arg: &str) -> Result<Self, SpecError> {
        match arg.split_once('=') {
            None => Ok(Self {
                path: KeyPath::parse(arg)?,
                labels: None,
            }),
            Some((key, values)) => Ok(Self {
                path: KeyPath::parse(key)?,
                labels: Some(parse_value_list(values)?),
            }),
        }
    }
}

/// One layer of the stacked bars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSpec {
    pub path: KeyPath,
    pub label: String,
}

impl StackSpec {
    pub fn parse(arg: &str) -> Result<Self, SpecError> {
        let (key, label) = split_key_value(arg)?;
        if label.is_empty() {
            return Err(SpecError::MissingValue(arg.to_owned()));
        }
        Ok(Self {
            path: KeyPath::parse(key)?,
            label: label.to_owned(),
        })
    }
}

/// Parses `path1=label1,path2=label2,...`
pub fn parse_stacks(arg: &str) -> Result<Vec<StackSpec>, SpecError> {
    arg.split(',').map(StackSpec::parse).collect()
}

pub fn parse_value_list(arg: &str) -> Result<Vec<String>, SpecError> {
    let values = arg.split(',').map(str::to_owned).collect::<Vec<_>>();
    if values.iter().any(String::is_empty) {
        return Err(SpecError::EmptyEntry(arg.to_owned()));
    }
    Ok(values)
}

fn split_key_value(arg: &str) -> Result<(&str, &str), SpecError> {
    arg.split_once('=')
        .ok_or_else(|| SpecError::MissingValue(arg.to_owned()))
}

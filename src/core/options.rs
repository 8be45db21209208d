//! Options a script accepts, collected from its steps.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Resolved `name -> value` pairs handed to steps.
pub type Options = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptionSchema {
    options: Vec<OptionSpec>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option. The first declaration of a name wins, except that
    /// a later required declaration makes it required.
    pub fn add(&mut self, spec: OptionSpec) {
        match self.options.iter_mut().find(|o| o.name == spec.name) {
            Some(existing) => {
                if spec.required && existing.default.is_none() {
                    existing.required = true;
                }
            }
            None => self.options.push(spec),
        }
    }

    pub fn required(&mut self, name: &str, description: impl Into<String>) {
        self.add(OptionSpec {
            name: name.to_string(),
            description: description.into(),
            required: true,
            default: None,
        });
    }

    pub fn optional(&mut self, name: &str, description: impl Into<String>, default: Option<String>) {
        self.add(OptionSpec {
            name: name.to_string(),
            description: description.into(),
            required: false,
            default,
        });
    }

    pub fn specs(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }

    /// Validate supplied values and fill in defaults.
    pub fn resolve(&self, supplied: &Options) -> Result<Options> {
        if let Some(unknown) = supplied.keys().find(|k| !self.contains(k)) {
            return Err(Error::validation_invalid_argument(
                "option",
                "Unknown option",
                Some(unknown.clone()),
                Some(self.options.iter().map(|o| o.name.clone()).collect()),
            ));
        }

        let mut resolved = Options::new();
        let mut missing = Vec::new();

        for spec in &self.options {
            match (supplied.get(&spec.name), &spec.default) {
                (Some(value), _) => {
                    resolved.insert(spec.name.clone(), value.clone());
                }
                (None, Some(default)) => {
                    resolved.insert(spec.name.clone(), default.clone());
                }
                (None, None) if spec.required => missing.push(spec.name.clone()),
                (None, None) => {}
            }
        }

        if !missing.is_empty() {
            return Err(Error::validation_missing_argument(missing));
        }

        Ok(resolved)
    }
}

/// Parse `key=value` pairs from the command line.
pub fn parse_pairs(pairs: &[String]) -> Result<Options> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::validation_invalid_argument(
                "option",
                "Expected key=value",
                Some(pair.clone()),
                None,
            )),
        })
        .collect()
}

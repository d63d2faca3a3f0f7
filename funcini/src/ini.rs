//! read function definitions back from an exported INI file.
//!
//! the reader is lenient in the same places the writer is loose: lines it
//! does not understand are skipped, not rejected. the one hard failure is a
//! `parameters[...]` key whose ordinal is not a number.
use crate::error::IniError;
use crate::program::ParameterRecord;
use serde::Serialize;
use std::path::Path;

/// one `[name]` block of an exported file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub return_type: String,
    pub signature: String,
    pub parameters: Vec<ParameterRecord>,
}

impl FunctionDefinition {
    fn new(name: String) -> Self {
        Self {
            name,
            return_type: String::new(),
            signature: String::new(),
            parameters: Vec::new(),
        }
    }

    /// false if the return type or any parameter type is one of the analysis
    /// host's `undefined*` placeholders
    pub fn is_fully_typed(&self) -> bool {
        !is_placeholder(&self.return_type)
            && !self.parameters.iter().any(|p| is_placeholder(&p.type_name))
    }
}

fn is_placeholder(type_name: &str) -> bool {
    type_name
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("undefined"))
}

/// parse exported text into definitions, in file order
pub fn parse_definitions(text: &str) -> Result<Vec<FunctionDefinition>, IniError> {
    let mut definitions = Vec::new();
    let mut current: Option<FunctionDefinition> = None;

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if let Some(done) = current.take() {
                log::trace!("{:>12} {}", "definition", done.name);
                definitions.push(done);
            }
            let name = line.trim_matches(|c| c == '[' || c == ']').trim();
            if name.is_empty() {
                // keys up to the next header have no definition to go to
                log::debug!("line {}: section without a name, skipped", index + 1);
                current = None;
            } else {
                current = Some(FunctionDefinition::new(name.to_string()));
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::trace!("line {}: no key/value, skipped", index + 1);
            continue;
        };

        let Some(definition) = current.as_mut() else {
            log::trace!("line {}: `{}` outside of a section, skipped", index + 1, key);
            continue;
        };

        match key {
            "return" => definition.return_type = value.trim().to_string(),
            "signature" => definition.signature = value.trim().to_string(),
            _ if key.starts_with("parameters[") => {
                let ordinal = parse_ordinal(key).ok_or_else(|| IniError::InvalidOrdinal {
                    line: index + 1,
                    key: key.to_string(),
                })?;

                let Some((name, type_name)) = value.split_once('|') else {
                    log::debug!("line {}: parameter without a type, skipped", index + 1);
                    continue;
                };

                definition
                    .parameters
                    .push(ParameterRecord::new(ordinal, name, type_name));
            }
            _ => log::trace!("line {}: unknown key `{}`", index + 1, key),
        }
    }

    if let Some(done) = current {
        log::trace!("{:>12} {}", "definition", done.name);
        definitions.push(done);
    }

    log::debug!("parsed {} function definitions", definitions.len());
    Ok(definitions)
}

// `parameters[3]` -> 3
fn parse_ordinal(key: &str) -> Option<usize> {
    key.strip_prefix("parameters[")?
        .strip_suffix(']')?
        .trim()
        .parse()
        .ok()
}

/// read and parse an exported file
pub fn load_definitions(path: &Path) -> Result<Vec<FunctionDefinition>, IniError> {
    log::debug!("load definitions: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| IniError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definitions(&text)
}

/// for each wanted name, in order, the first fully typed definition with that
/// name. names with no usable definition are left out.
pub fn select_exported<'a, S: AsRef<str>>(
    definitions: &'a [FunctionDefinition],
    names: &[S],
) -> Vec<&'a FunctionDefinition> {
    let selected: Vec<&FunctionDefinition> = names
        .iter()
        .filter_map(|name| {
            definitions
                .iter()
                .find(|d| d.name == name.as_ref() && d.is_fully_typed())
        })
        .collect();

    log::debug!(
        "matched {} of {} names with typed definitions",
        selected.len(),
        names.len()
    );
    selected
}

//! the program model an export runs against.
//!
//! the exporter owns none of this: whoever analyzed the binary decides which
//! functions exist, in which order they come out, and how their types and
//! prototypes are spelled. everything here is read-only.
use crate::error::HostModelError;
use serde::Serialize;

/// one parameter as reported by the program model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterRecord {
    /// zero-based position, as assigned by the model
    pub ordinal: usize,
    pub name: String,
    pub type_name: String,
}

impl ParameterRecord {
    pub fn new(ordinal: usize, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// per-function accessors. every accessor may fail; failures are passed up
/// unchanged, never replaced with defaults.
pub trait ProgramFunction {
    fn name(&self) -> Result<String, HostModelError>;

    /// textual name of the declared return type
    fn return_type_name(&self) -> Result<String, HostModelError>;

    /// single-line C-like prototype, rendered by the model
    fn prototype(&self) -> Result<String, HostModelError>;

    /// parameters in ordinal order
    fn parameters(&self) -> Result<Vec<ParameterRecord>, HostModelError>;
}

pub type FunctionIter<'a> = Box<dyn Iterator<Item = &'a dyn ProgramFunction> + 'a>;

/// an analyzed program that can enumerate its defined functions
pub trait ProgramModel {
    /// all defined functions, in the model's own order (ascending address for
    /// binaries). callers must not re-sort.
    fn functions(&self) -> Result<FunctionIter<'_>, HostModelError>;
}

/// a fully materialized function, handy for in-memory models
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub return_type: String,
    pub signature: String,
    pub parameters: Vec<ParameterRecord>,
}

impl FunctionRecord {
    pub fn new(
        name: impl Into<String>,
        return_type: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            signature: signature.into(),
            parameters: Vec::new(),
        }
    }

    /// append a parameter at the next ordinal
    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let ordinal = self.parameters.len();
        self.parameters
            .push(ParameterRecord::new(ordinal, name, type_name));
        self
    }
}

impl ProgramFunction for FunctionRecord {
    fn name(&self) -> Result<String, HostModelError> {
        Ok(self.name.clone())
    }

    fn return_type_name(&self) -> Result<String, HostModelError> {
        Ok(self.return_type.clone())
    }

    fn prototype(&self) -> Result<String, HostModelError> {
        Ok(self.signature.clone())
    }

    fn parameters(&self) -> Result<Vec<ParameterRecord>, HostModelError> {
        Ok(self.parameters.clone())
    }
}

/// functions come out in vector order
impl ProgramModel for Vec<FunctionRecord> {
    fn functions(&self) -> Result<FunctionIter<'_>, HostModelError> {
        Ok(Box::new(self.iter().map(|f| f as &dyn ProgramFunction)))
    }
}

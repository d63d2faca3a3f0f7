//! a program model backed by the DWARF debug info of a binary
use crate::dwarf_analyzer::{AnalysisResult, DwarfAnalyzer};
use crate::error::HostModelError;
use crate::program::{FunctionIter, ProgramFunction, ProgramModel, ParameterRecord};
use std::path::Path;

/// one function with its types already spelled out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwarfFunction {
    pub address: Option<u64>,
    pub name: String,
    pub return_type: String,
    pub prototype: String,
    pub parameters: Vec<ParameterRecord>,
}

impl ProgramFunction for DwarfFunction {
    fn name(&self) -> Result<String, HostModelError> {
        Ok(self.name.clone())
    }

    fn return_type_name(&self) -> Result<String, HostModelError> {
        Ok(self.return_type.clone())
    }

    fn prototype(&self) -> Result<String, HostModelError> {
        Ok(self.prototype.clone())
    }

    fn parameters(&self) -> Result<Vec<ParameterRecord>, HostModelError> {
        Ok(self.parameters.clone())
    }
}

/// functions of a binary, ordered by ascending address. functions without an
/// address (no DW_AT_low_pc) come last, in debug info order.
#[derive(Debug, Clone, Default)]
pub struct DwarfProgram {
    functions: Vec<DwarfFunction>,
}

impl DwarfProgram {
    /// analyze the binary at `path`. with `exported_only`, functions the
    /// binary does not export are left out.
    pub fn from_file(path: &Path, exported_only: bool) -> Result<Self, HostModelError> {
        let analyzer = DwarfAnalyzer::from_file(path)?;
        Self::analyze(&analyzer, exported_only)
    }

    pub fn from_bytes(data: Vec<u8>, exported_only: bool) -> Result<Self, HostModelError> {
        Self::analyze(&DwarfAnalyzer::new(data), exported_only)
    }

    fn analyze(analyzer: &DwarfAnalyzer, exported_only: bool) -> Result<Self, HostModelError> {
        let analysis = analyzer.extract_analysis(exported_only)?;
        Ok(Self::from_analysis(analysis))
    }

    pub fn from_analysis(analysis: AnalysisResult) -> Self {
        let AnalysisResult {
            signatures,
            type_registry,
        } = analysis;

        let mut functions: Vec<DwarfFunction> = signatures
            .iter()
            .map(|sig| DwarfFunction {
                address: sig.address,
                name: sig.name.clone(),
                return_type: type_registry.c_name(sig.return_type_id),
                prototype: sig.prototype(&type_registry),
                parameters: sig
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(ordinal, p)| {
                        ParameterRecord::new(ordinal, p.name.clone(), type_registry.c_name(p.type_id))
                    })
                    .collect(),
            })
            .collect();

        // stable: equal addresses and address-less functions keep debug info order
        functions.sort_by_key(|f| (f.address.is_none(), f.address));

        log::debug!("program model holds {} functions", functions.len());
        Self { functions }
    }

    pub fn defined_functions(&self) -> &[DwarfFunction] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl ProgramModel for DwarfProgram {
    fn functions(&self) -> Result<FunctionIter<'_>, HostModelError> {
        Ok(Box::new(
            self.functions.iter().map(|f| f as &dyn ProgramFunction),
        ))
    }
}

//! funcini - export the functions of an analyzed binary to an INI file
//!
//! every function becomes a `[name]` section with its return type, its
//! prototype and one `parameters[n]=name|type` line per parameter. the
//! exporter runs against any [`ProgramModel`]; [`DwarfProgram`] is a model
//! built from DWARF debug info.
//!
//! - the model decides function order and how types are spelled
//! - names are not escaped, see the [`export`] module docs
//! - only works on binaries compiled with DWARF info (e.g. gcc -g ...)

mod cancel;
mod dwarf_analyzer;
mod dwarf_program;
mod error;
pub mod export;
pub mod ini;
pub mod program;
mod reader;
mod symbol_reader;
pub mod type_registry;
mod type_resolver;
pub mod types;

pub use cancel::CancelFlag;
pub use dwarf_analyzer::{AnalysisResult, DwarfAnalyzer};
pub use dwarf_program::{DwarfFunction, DwarfProgram};
pub use error::{ExportError, HostModelError, IniError};
pub use export::{ExportBuffer, ExportSummary, FunctionExporter, export};
pub use ini::{FunctionDefinition, load_definitions, parse_definitions, select_exported};
pub use program::{FunctionRecord, ParameterRecord, ProgramFunction, ProgramModel};
pub use symbol_reader::ExportedSymbols;
pub use type_registry::{TypeId, TypeRegistry};
pub use types::{FunctionSignature, Parameter};

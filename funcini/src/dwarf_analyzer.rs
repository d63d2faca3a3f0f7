use crate::reader::{self, DwarfReader};
use crate::symbol_reader::ExportedSymbols;
use crate::type_registry::{TypeId, TypeRegistry};
use crate::type_resolver::TypeResolver;
use crate::types::{FunctionSignature, Parameter};
use anyhow::Result;
use gimli::{AttributeValue, DebuggingInformationEntry, Dwarf, Reader, Unit, UnitOffset};

// specification/abstract_origin links followed before giving up
const MAX_ORIGIN_DEPTH: usize = 4;

pub struct DwarfAnalyzer {
    data: Vec<u8>,
}

pub struct AnalysisResult {
    /// in the order the debug info lists them
    pub signatures: Vec<FunctionSignature>,
    pub type_registry: TypeRegistry,
}

impl DwarfAnalyzer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// load the binary from file path
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let data = reader::load_file(path)?;
        Ok(Self::new(data))
    }

    pub fn exported_symbols(&self) -> Result<ExportedSymbols> {
        ExportedSymbols::read(&self.data)
    }

    /// extract function signatures and the types they use from DWARF debug info
    pub fn extract_analysis(&self, exported_only: bool) -> Result<AnalysisResult> {
        let dwarf = reader::load_dwarf(&self.data)?;

        let exported = if exported_only {
            Some(self.exported_symbols()?)
        } else {
            None
        };

        let mut all_signatures = Vec::new();
        let mut combined_registry = TypeRegistry::new();
        let mut unit_iter = dwarf.units();
        let mut unit_count = 0;

        while let Some(header) = unit_iter.next()? {
            unit_count += 1;
            log::debug!("processing compilation unit {}", unit_count);

            let unit = dwarf.unit(header)?;
            let mut type_resolver = TypeResolver::new(&dwarf, &unit);

            let unit_sigs =
                Self::extract_functions_from_unit(&dwarf, &unit, exported.as_ref(), &mut type_resolver)?;

            log::debug!("found {} functions in unit {}", unit_sigs.len(), unit_count);
            all_signatures.extend(unit_sigs);

            combined_registry.merge(type_resolver.into_registry());
        }

        log::info!(
            "processed {} compilation units, found {} functions, extracted {} types",
            unit_count,
            all_signatures.len(),
            combined_registry.len()
        );

        Ok(AnalysisResult {
            signatures: all_signatures,
            type_registry: combined_registry,
        })
    }

    fn extract_functions_from_unit(
        dwarf: &Dwarf<DwarfReader>,
        unit: &Unit<DwarfReader>,
        exported: Option<&ExportedSymbols>,
        type_resolver: &mut TypeResolver<DwarfReader>,
    ) -> Result<Vec<FunctionSignature>> {
        let mut signatures = Vec::new();
        let mut function_count = 0;
        let mut entries = unit.entries();

        // parameters are children of their subprogram, so a depth-first walk
        // meets every function exactly once
        while let Some((_, entry)) = entries.next_dfs()? {
            if entry.tag() != gimli::DW_TAG_subprogram {
                continue;
            }

            // keep definitions only
            if Self::attr_flag_is_true(entry.attr(gimli::DW_AT_declaration).ok().flatten()) {
                log::trace!("skip function declaration at {:#010x}", entry.offset().0);
                continue;
            }

            // abstract instance of an inline function: the out-of-line copy,
            // if any, is a separate entry pointing back here
            if entry.attr(gimli::DW_AT_inline)?.is_some()
                && entry.attr(gimli::DW_AT_low_pc)?.is_none()
                && entry.attr(gimli::DW_AT_ranges)?.is_none()
            {
                log::trace!("skip abstract instance at {:#010x}", entry.offset().0);
                continue;
            }

            function_count += 1;

            let Some(name) = Self::function_name(dwarf, unit, entry)? else {
                log::trace!("skip unnamed function at {:#010x}", entry.offset().0);
                continue;
            };

            let is_exported = exported.is_none_or(|symbols| symbols.contains_function(&name));
            if !is_exported {
                log::trace!("skip non-exported function: {}", name);
                continue;
            }

            let address = match entry.attr_value(gimli::DW_AT_low_pc)? {
                Some(value) => dwarf.attr_address(unit, value)?,
                None => None,
            };

            let return_type_id = Self::resolve_type_via_origin(unit, entry, type_resolver)?;

            log::debug!(
                "{:>12} {:#010x}: {}() @ {}",
                "function",
                entry.offset().0,
                name,
                address.map_or_else(|| "?".to_string(), |a| format!("{:#x}", a))
            );

            let (parameters, is_variadic) =
                Self::extract_parameters(dwarf, unit, entry, type_resolver)?;

            signatures.push(FunctionSignature {
                name,
                address,
                return_type_id,
                parameters,
                is_variadic,
                is_exported,
            });
        }

        log::debug!(
            "{:>12} {} function entries, {} signatures extracted",
            "DONE",
            function_count,
            signatures.len()
        );
        Ok(signatures)
    }

    // None when no name can be found. stripped or partially stripped
    // binaries cannot be told apart from genuinely anonymous entries here.
    fn function_name(
        dwarf: &Dwarf<DwarfReader>,
        unit: &Unit<DwarfReader>,
        entry: &DebuggingInformationEntry<DwarfReader>,
    ) -> Result<Option<String>> {
        if Self::attr_flag_is_true(entry.attr(gimli::DW_AT_artificial).ok().flatten()) {
            log::trace!("skip artificial subprogram @{:#010x}", entry.offset().0);
            return Ok(None);
        }

        if let Some(name) = Self::read_entry_name(dwarf, unit, entry) {
            return Ok(Some(name));
        }

        // out-of-line definitions and inlined instances carry the name on
        // the entry they point at, possibly one more link away (an inlined
        // member function: concrete -> abstract -> in-class declaration)
        let mut next = Self::origin_offset(entry)?;
        for _ in 0..MAX_ORIGIN_DEPTH {
            let Some(offset) = next else {
                break;
            };
            let origin = unit.entry(offset)?;
            if let Some(name) = Self::read_entry_name(dwarf, unit, &origin) {
                log::trace!(
                    "use origin name for subprogram @{:#010x}: {}",
                    entry.offset().0,
                    name
                );
                return Ok(Some(name));
            }
            next = Self::origin_offset(&origin)?;
        }

        Ok(None)
    }

    /// linkage name first, then the plain name
    fn read_entry_name(
        dwarf: &Dwarf<DwarfReader>,
        unit: &Unit<DwarfReader>,
        entry: &DebuggingInformationEntry<DwarfReader>,
    ) -> Option<String> {
        [gimli::DW_AT_linkage_name, gimli::DW_AT_name]
            .into_iter()
            .find_map(|at| {
                let attr = entry.attr(at).ok().flatten()?;
                Self::read_attr_string(dwarf, unit, &attr)
            })
    }

    /// the entry a subprogram or parameter was split from, if any
    fn origin_offset(
        entry: &DebuggingInformationEntry<DwarfReader>,
    ) -> Result<Option<UnitOffset<usize>>> {
        for at in [gimli::DW_AT_specification, gimli::DW_AT_abstract_origin] {
            if let Some(AttributeValue::UnitRef(offset)) = entry.attr_value(at)? {
                return Ok(Some(offset));
            }
        }
        Ok(None)
    }

    /// the first entry along the origin chain, starting at `entry` itself,
    /// that has attribute `at`
    fn origin_with_attr(
        unit: &Unit<DwarfReader>,
        entry: &DebuggingInformationEntry<DwarfReader>,
        at: gimli::DwAt,
    ) -> Result<Option<UnitOffset<usize>>> {
        if entry.attr(at)?.is_some() {
            return Ok(Some(entry.offset()));
        }

        let mut next = Self::origin_offset(entry)?;
        for _ in 0..MAX_ORIGIN_DEPTH {
            let Some(offset) = next else {
                break;
            };
            let origin = unit.entry(offset)?;
            if origin.attr(at)?.is_some() {
                return Ok(Some(offset));
            }
            next = Self::origin_offset(&origin)?;
        }

        Ok(None)
    }

    /// DW_AT_type of the entry or of its origin, void when neither has one
    fn resolve_type_via_origin(
        unit: &Unit<DwarfReader>,
        entry: &DebuggingInformationEntry<DwarfReader>,
        type_resolver: &mut TypeResolver<DwarfReader>,
    ) -> Result<TypeId> {
        match Self::origin_with_attr(unit, entry, gimli::DW_AT_type)? {
            Some(offset) if offset != entry.offset() => {
                let origin = unit.entry(offset)?;
                type_resolver.resolve_entry_type(&origin)
            }
            _ => type_resolver.resolve_entry_type(entry),
        }
    }

    fn attr_flag_is_true(attr: Option<gimli::Attribute<DwarfReader>>) -> bool {
        let Some(attr) = attr else {
            return false;
        };

        match attr.value() {
            AttributeValue::Flag(flag) => flag,
            AttributeValue::Data1(value) => value != 0,
            AttributeValue::Data2(value) => value != 0,
            AttributeValue::Data4(value) => value != 0,
            AttributeValue::Data8(value) => value != 0,
            AttributeValue::Sdata(value) => value != 0,
            AttributeValue::Udata(value) => value != 0,
            _ => false,
        }
    }

    fn read_attr_string(
        dwarf: &Dwarf<DwarfReader>,
        unit: &Unit<DwarfReader>,
        attr: &gimli::Attribute<DwarfReader>,
    ) -> Option<String> {
        // inline strings and .debug_str references both go through attr_string
        let r = dwarf.attr_string(unit, attr.value()).ok()?;
        match r.to_string_lossy() {
            Ok(cow) => Some(cow.into_owned()),
            Err(e) => {
                log::warn!("failed to decode string attribute: {:?}", e);
                None
            }
        }
    }

    /// formal parameters are direct children of the subprogram; a
    /// DW_TAG_unspecified_parameters child marks the function variadic.
    /// other children (locals, lexical blocks, ...) are skipped. a parameter
    /// split from an abstract instance takes its name and type from there.
    fn extract_parameters(
        dwarf: &Dwarf<DwarfReader>,
        unit: &Unit<DwarfReader>,
        func_entry: &DebuggingInformationEntry<DwarfReader>,
        type_resolver: &mut TypeResolver<DwarfReader>,
    ) -> Result<(Vec<Parameter>, bool)> {
        let mut parameters = Vec::new();
        let mut is_variadic = false;

        let source = Self::parameter_source(unit, func_entry)?;
        let mut tree = unit.entries_tree(Some(source))?;
        let mut children = tree.root()?.children();
        while let Some(child) = children.next()? {
            let child_entry = child.entry();

            match child_entry.tag() {
                gimli::DW_TAG_formal_parameter => {
                    let name = match Self::origin_with_attr(unit, child_entry, gimli::DW_AT_name)? {
                        Some(offset) => {
                            let named = unit.entry(offset)?;
                            named
                                .attr(gimli::DW_AT_name)?
                                .and_then(|attr| Self::read_attr_string(dwarf, unit, &attr))
                        }
                        None => None,
                    }
                    .unwrap_or_default();

                    let type_id = Self::resolve_type_via_origin(unit, child_entry, type_resolver)?;

                    log::debug!(
                        "{:>12} {:#010x}: {}",
                        "parameter",
                        child_entry.offset().0,
                        name,
                    );

                    parameters.push(Parameter { name, type_id });
                }

                gimli::DW_TAG_unspecified_parameters => is_variadic = true,

                tag => {
                    log::trace!("non parameter tag {} @{:#010x}", tag, child_entry.offset().0);
                }
            }
        }

        Ok((parameters, is_variadic))
    }

    /// the subprogram itself, unless it lists no parameters at all and an
    /// entry along its origin chain does
    fn parameter_source(
        unit: &Unit<DwarfReader>,
        func_entry: &DebuggingInformationEntry<DwarfReader>,
    ) -> Result<UnitOffset<usize>> {
        let mut current = func_entry.offset();
        for _ in 0..=MAX_ORIGIN_DEPTH {
            if Self::has_parameter_children(unit, current)? {
                return Ok(current);
            }
            let entry = unit.entry(current)?;
            match Self::origin_offset(&entry)? {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(func_entry.offset())
    }

    fn has_parameter_children(unit: &Unit<DwarfReader>, offset: UnitOffset<usize>) -> Result<bool> {
        let mut tree = unit.entries_tree(Some(offset))?;
        let mut children = tree.root()?.children();
        while let Some(child) = children.next()? {
            if matches!(
                child.entry().tag(),
                gimli::DW_TAG_formal_parameter | gimli::DW_TAG_unspecified_parameters
            ) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

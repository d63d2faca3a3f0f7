use crate::type_registry::{Qualifiers, Type, TypeId, TypeKind, TypeRegistry};
use anyhow::{Result, anyhow};
use gimli::{AttributeValue, DebuggingInformationEntry, Dwarf, ReaderOffset, Unit, UnitOffset};
use std::collections::HashMap;

/// resolve DWARF type references of one compilation unit into registry
/// entries. offsets are unit-relative, so the offset cache never outlives the
/// unit; the registry is handed back with `into_registry` and merged.
pub struct TypeResolver<'dwarf, R: gimli::Reader> {
    dwarf: &'dwarf Dwarf<R>,
    unit: &'dwarf Unit<R>,
    type_registry: TypeRegistry,
    by_offset: HashMap<u64, TypeId>,
}

impl<'dwarf, R: gimli::Reader> TypeResolver<'dwarf, R> {
    pub fn new(dwarf: &'dwarf Dwarf<R>, unit: &'dwarf Unit<R>) -> Self {
        Self {
            dwarf,
            unit,
            type_registry: TypeRegistry::new(),
            by_offset: HashMap::new(),
        }
    }

    /// the type an entry's DW_AT_type points at, void if it has none
    pub fn resolve_entry_type(&mut self, entry: &DebuggingInformationEntry<R>) -> Result<TypeId> {
        match Self::type_ref(entry)? {
            Some(offset) => self.resolve(offset),
            None => Ok(self.type_registry.void_id()),
        }
    }

    pub fn resolve(&mut self, offset: UnitOffset<R::Offset>) -> Result<TypeId> {
        let dwarf_offset = offset.0.into_u64();
        if let Some(id) = self.by_offset.get(&dwarf_offset) {
            log::trace!("type already resolved at offset {:#010x}", dwarf_offset);
            return Ok(*id);
        }

        // outermost pointer first; `pending` collects the qualifiers seen
        // since the last pointer and belongs to whatever they wrap next
        let mut pointers = Vec::new();
        let mut pending = Qualifiers::default();
        let mut current = offset;
        let unit = self.unit;

        // peel modifiers until a named or structural type is reached
        let kind = loop {
            let mut entries = unit.entries_at_offset(current)?;
            let (_, entry) = entries
                .next_dfs()?
                .ok_or_else(|| anyhow!("no entry at offset {:#010x}", current.0.into_u64()))?;

            match entry.tag() {
                gimli::DW_TAG_pointer_type
                | gimli::DW_TAG_reference_type
                | gimli::DW_TAG_rvalue_reference_type => {
                    pointers.push(std::mem::take(&mut pending));
                }
                gimli::DW_TAG_const_type => pending.is_const = true,
                gimli::DW_TAG_volatile_type => pending.is_volatile = true,
                gimli::DW_TAG_restrict_type | gimli::DW_TAG_atomic_type => {}

                gimli::DW_TAG_base_type | gimli::DW_TAG_unspecified_type => {
                    let name = self.name_or(entry, "<unnamed>")?;
                    break TypeKind::Base { name };
                }
                gimli::DW_TAG_typedef => {
                    let name = self.name_or(entry, "<unnamed>")?;
                    break TypeKind::Typedef { name };
                }
                gimli::DW_TAG_structure_type | gimli::DW_TAG_class_type => {
                    let name = self.name_or(entry, "<anonymous>")?;
                    break TypeKind::Struct { name };
                }
                gimli::DW_TAG_union_type => {
                    let name = self.name_or(entry, "<anonymous>")?;
                    break TypeKind::Union { name };
                }
                gimli::DW_TAG_enumeration_type => {
                    let name = self.name_or(entry, "<anonymous>")?;
                    break TypeKind::Enum { name };
                }
                gimli::DW_TAG_array_type => break self.array_kind(entry, current)?,
                gimli::DW_TAG_subroutine_type => break self.function_kind(entry, current)?,

                tag => {
                    log::debug!("unhandled type tag {} @{:#010x}", tag, current.0.into_u64());
                    break TypeKind::Base {
                        name: format!("<unknown:{}>", tag),
                    };
                }
            }

            // modifier without DW_AT_type means void
            match Self::type_ref(entry)? {
                Some(next) => current = next,
                None => {
                    break TypeKind::Base {
                        name: "void".to_string(),
                    };
                }
            }
        };

        pointers.reverse();
        let id = self.type_registry.register(Type {
            kind,
            qualifiers: pending,
            pointers,
        });

        log::trace!(
            "{:>12} {:#010x}: {}",
            "type",
            dwarf_offset,
            self.type_registry.c_name(id)
        );

        self.by_offset.insert(dwarf_offset, id);
        Ok(id)
    }

    fn type_ref(entry: &DebuggingInformationEntry<R>) -> Result<Option<UnitOffset<R::Offset>>> {
        match entry.attr(gimli::DW_AT_type)? {
            Some(attr) => match attr.value() {
                AttributeValue::UnitRef(offset) => Ok(Some(offset)),
                other => {
                    log::debug!("unsupported type reference form: {:?}", other);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn name_or(&self, entry: &DebuggingInformationEntry<R>, fallback: &str) -> Result<String> {
        let Some(attr) = entry.attr(gimli::DW_AT_name)? else {
            return Ok(fallback.to_string());
        };
        let name = self.dwarf.attr_string(self.unit, attr.value())?;
        Ok(name.to_string_lossy()?.into_owned())
    }

    fn array_kind(
        &mut self,
        entry: &DebuggingInformationEntry<R>,
        offset: UnitOffset<R::Offset>,
    ) -> Result<TypeKind> {
        let element = match Self::type_ref(entry)? {
            Some(element_offset) => self.resolve(element_offset)?,
            None => return Err(anyhow!("array missing element type")),
        };

        // one DW_TAG_subrange_type child per dimension
        let unit = self.unit;
        let mut dimensions = Vec::new();
        let mut tree = unit.entries_tree(Some(offset))?;
        let mut children = tree.root()?.children();
        while let Some(child) = children.next()? {
            let child = child.entry();
            if child.tag() != gimli::DW_TAG_subrange_type {
                continue;
            }

            let count = if let Some(count) = child.attr(gimli::DW_AT_count)? {
                count.udata_value()
            } else if let Some(upper) = child.attr(gimli::DW_AT_upper_bound)? {
                // bounds are inclusive; old gcc writes u64::MAX for `int x[0]`
                upper.udata_value().and_then(|u| u.checked_add(1))
            } else {
                None
            };
            dimensions.push(count);
        }

        if dimensions.is_empty() {
            dimensions.push(None);
        }

        Ok(TypeKind::Array {
            element,
            dimensions,
        })
    }

    fn function_kind(
        &mut self,
        entry: &DebuggingInformationEntry<R>,
        offset: UnitOffset<R::Offset>,
    ) -> Result<TypeKind> {
        let return_type = self.resolve_entry_type(entry)?;

        let mut parameters = Vec::new();
        let mut is_variadic = false;
        let unit = self.unit;
        let mut tree = unit.entries_tree(Some(offset))?;
        let mut children = tree.root()?.children();
        while let Some(child) = children.next()? {
            let child = child.entry();
            match child.tag() {
                gimli::DW_TAG_formal_parameter => {
                    parameters.push(self.resolve_entry_type(child)?);
                }
                gimli::DW_TAG_unspecified_parameters => is_variadic = true,
                _ => {}
            }
        }

        Ok(TypeKind::Function {
            return_type,
            parameters,
            is_variadic,
        })
    }

    pub fn into_registry(self) -> TypeRegistry {
        self.type_registry
    }
}

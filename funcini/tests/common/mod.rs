//! DWARF fixtures built in memory, no C toolchain needed

use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Sections, UnitEntryId};
use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

/// a relocatable ELF object carrying one compilation unit, roughly what
/// `g++ -O2 -g -c fixture.cc` would emit for:
///
/// ```c
/// struct Point;
/// void late(void) {}                                 // 0x2000
/// int main(int argc, char **argv) {}                 // 0x1000
/// int log_message(const char *fmt, ...) {}           // 0x1800
/// void move_point(struct Point *p, int) {}           // no address
/// static unsigned long helper(volatile int *v,
///                             char *const name,
///                             int (*rows)[0]) {}     // 0x1400, local
/// int declared_only(void);                           // declaration
/// static inline int add(int a) {}                    // abstract instance,
///                                                    // out-of-line copy at 0x1c00
/// int Shape::area(int scale) {}                      // in-class declaration,
///                                                    // definition at 0x2400
/// ```
///
/// `main`, `log_message`, `late`, `add` and `area` are global symbols,
/// `helper` a local one.
pub fn fixture_object() -> Vec<u8> {
    let encoding = gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);
    let root = dwarf.unit.root();
    set_name(&mut dwarf, root, "fixture.cc");

    let int = base_type(&mut dwarf, "int", 4, gimli::DW_ATE_signed);
    let char_ = base_type(&mut dwarf, "char", 1, gimli::DW_ATE_signed_char);
    let ulong = base_type(&mut dwarf, "long unsigned int", 8, gimli::DW_ATE_unsigned);

    let char_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, char_);
    let char_ptr_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, char_ptr);
    let char_ptr_const = modifier(&mut dwarf, gimli::DW_TAG_const_type, char_ptr);
    let const_char = modifier(&mut dwarf, gimli::DW_TAG_const_type, char_);
    let const_char_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, const_char);
    let volatile_int = modifier(&mut dwarf, gimli::DW_TAG_volatile_type, int);
    let volatile_int_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, volatile_int);

    // int[0], upper bound written as -1 the way old gcc does
    let empty_rows = modifier(&mut dwarf, gimli::DW_TAG_array_type, int);
    let subrange = dwarf.unit.add(empty_rows, gimli::DW_TAG_subrange_type);
    dwarf
        .unit
        .get_mut(subrange)
        .set(gimli::DW_AT_upper_bound, AttributeValue::Udata(u64::MAX));
    let empty_rows_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, empty_rows);

    let point = dwarf.unit.add(root, gimli::DW_TAG_structure_type);
    set_name(&mut dwarf, point, "Point");
    set_flag(&mut dwarf, point, gimli::DW_AT_declaration);
    let point_ptr = modifier(&mut dwarf, gimli::DW_TAG_pointer_type, point);

    subprogram(&mut dwarf, Some("late"), Some(0x2000), None);

    let main = subprogram(&mut dwarf, Some("main"), Some(0x1000), Some(int));
    parameter(&mut dwarf, main, Some("argc"), int);
    parameter(&mut dwarf, main, Some("argv"), char_ptr_ptr);

    let log_message = subprogram(&mut dwarf, Some("log_message"), Some(0x1800), Some(int));
    parameter(&mut dwarf, log_message, Some("fmt"), const_char_ptr);
    dwarf
        .unit
        .add(log_message, gimli::DW_TAG_unspecified_parameters);

    let move_point = subprogram(&mut dwarf, Some("move_point"), None, None);
    parameter(&mut dwarf, move_point, Some("p"), point_ptr);
    parameter(&mut dwarf, move_point, None, int);
    // locals are not parameters
    let local = dwarf.unit.add(move_point, gimli::DW_TAG_variable);
    set_name(&mut dwarf, local, "tmp");

    let helper = subprogram(&mut dwarf, Some("helper"), Some(0x1400), Some(ulong));
    parameter(&mut dwarf, helper, Some("v"), volatile_int_ptr);
    parameter(&mut dwarf, helper, Some("name"), char_ptr_const);
    parameter(&mut dwarf, helper, Some("rows"), empty_rows_ptr);

    let declared = subprogram(&mut dwarf, Some("declared_only"), None, Some(int));
    set_flag(&mut dwarf, declared, gimli::DW_AT_declaration);

    // inline function: the abstract instance holds name and types, the
    // out-of-line copy only points back at it
    let add_abstract = subprogram(&mut dwarf, Some("add"), None, Some(int));
    dwarf.unit.get_mut(add_abstract).set(
        gimli::DW_AT_inline,
        AttributeValue::Inline(gimli::DW_INL_declared_inlined),
    );
    let add_a = parameter(&mut dwarf, add_abstract, Some("a"), int);

    let add_copy = subprogram(&mut dwarf, None, Some(0x1c00), None);
    dwarf
        .unit
        .get_mut(add_copy)
        .set(gimli::DW_AT_abstract_origin, AttributeValue::UnitRef(add_abstract));
    let add_copy_a = dwarf.unit.add(add_copy, gimli::DW_TAG_formal_parameter);
    dwarf
        .unit
        .get_mut(add_copy_a)
        .set(gimli::DW_AT_abstract_origin, AttributeValue::UnitRef(add_a));

    // member function defined outside its class: the definition carries
    // the address and parameters, the declaration the return type
    let area_decl = subprogram(&mut dwarf, Some("area"), None, Some(int));
    set_flag(&mut dwarf, area_decl, gimli::DW_AT_declaration);
    parameter(&mut dwarf, area_decl, None, int);

    let area = subprogram(&mut dwarf, None, Some(0x2400), None);
    dwarf
        .unit
        .get_mut(area)
        .set(gimli::DW_AT_specification, AttributeValue::UnitRef(area_decl));
    parameter(&mut dwarf, area, Some("scale"), int);

    let mut sections = Sections::new(EndianVec::new(gimli::LittleEndian));
    dwarf.write(&mut sections).expect("fail to write DWARF");

    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    obj.append_section_data(text, &[0xc3; 0x80], 16);

    for (name, value, scope) in [
        ("main", 0x00, SymbolScope::Dynamic),
        ("helper", 0x10, SymbolScope::Compilation),
        ("log_message", 0x20, SymbolScope::Dynamic),
        ("late", 0x30, SymbolScope::Dynamic),
        ("add", 0x40, SymbolScope::Dynamic),
        ("area", 0x50, SymbolScope::Dynamic),
    ] {
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value,
            size: 0x10,
            kind: SymbolKind::Text,
            scope,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }

    sections
        .for_each(|id, data| -> Result<(), std::convert::Infallible> {
            if !data.slice().is_empty() {
                let section = obj.add_section(
                    Vec::new(),
                    id.name().as_bytes().to_vec(),
                    SectionKind::Debug,
                );
                obj.append_section_data(section, data.slice(), 1);
            }
            Ok(())
        })
        .expect("fail to collect DWARF sections");

    obj.write().expect("fail to write object file")
}

fn set_name(dwarf: &mut DwarfUnit, id: UnitEntryId, name: &str) {
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_name, AttributeValue::String(name.as_bytes().to_vec()));
}

fn set_flag(dwarf: &mut DwarfUnit, id: UnitEntryId, at: gimli::DwAt) {
    dwarf.unit.get_mut(id).set(at, AttributeValue::Flag(true));
}

fn base_type(dwarf: &mut DwarfUnit, name: &str, size: u8, encoding: gimli::DwAte) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    set_name(dwarf, id, name);
    let entry = dwarf.unit.get_mut(id);
    entry.set(gimli::DW_AT_byte_size, AttributeValue::Data1(size));
    entry.set(gimli::DW_AT_encoding, AttributeValue::Encoding(encoding));
    id
}

fn modifier(dwarf: &mut DwarfUnit, tag: gimli::DwTag, target: UnitEntryId) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, tag);
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_type, AttributeValue::UnitRef(target));
    id
}

fn subprogram(
    dwarf: &mut DwarfUnit,
    name: Option<&str>,
    low_pc: Option<u64>,
    return_type: Option<UnitEntryId>,
) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    if let Some(name) = name {
        set_name(dwarf, id, name);
    }
    let entry = dwarf.unit.get_mut(id);
    if let Some(address) = low_pc {
        entry.set(
            gimli::DW_AT_low_pc,
            AttributeValue::Address(Address::Constant(address)),
        );
    }
    if let Some(return_type) = return_type {
        entry.set(gimli::DW_AT_type, AttributeValue::UnitRef(return_type));
    }
    id
}

fn parameter(
    dwarf: &mut DwarfUnit,
    function: UnitEntryId,
    name: Option<&str>,
    type_: UnitEntryId,
) -> UnitEntryId {
    let id = dwarf.unit.add(function, gimli::DW_TAG_formal_parameter);
    if let Some(name) = name {
        set_name(dwarf, id, name);
    }
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_type, AttributeValue::UnitRef(type_));
    id
}

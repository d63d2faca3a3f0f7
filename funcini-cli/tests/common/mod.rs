//! a small object file with debug info for driving `funcini export`

use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Sections, UnitEntryId};
use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

/// ```c
/// int main(int argc, char **argv) {}   // 0x1000, global
/// static void helper(void) {}          // 0x1400, local
/// ```
pub fn small_object() -> Vec<u8> {
    let encoding = gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);
    let root = dwarf.unit.root();
    set_name(&mut dwarf, root, "small.c");

    let int = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    set_name(&mut dwarf, int, "int");
    let char_ = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    set_name(&mut dwarf, char_, "char");
    let char_ptr = pointer_to(&mut dwarf, char_);
    let char_ptr_ptr = pointer_to(&mut dwarf, char_ptr);

    let main = subprogram(&mut dwarf, "main", 0x1000);
    dwarf
        .unit
        .get_mut(main)
        .set(gimli::DW_AT_type, AttributeValue::UnitRef(int));
    for (name, type_) in [("argc", int), ("argv", char_ptr_ptr)] {
        let param = dwarf.unit.add(main, gimli::DW_TAG_formal_parameter);
        set_name(&mut dwarf, param, name);
        dwarf
            .unit
            .get_mut(param)
            .set(gimli::DW_AT_type, AttributeValue::UnitRef(type_));
    }

    subprogram(&mut dwarf, "helper", 0x1400);

    let mut sections = Sections::new(EndianVec::new(gimli::LittleEndian));
    dwarf.write(&mut sections).expect("fail to write DWARF");

    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    obj.append_section_data(text, &[0xc3; 0x20], 16);

    for (name, value, scope) in [
        ("main", 0x00, SymbolScope::Dynamic),
        ("helper", 0x10, SymbolScope::Compilation),
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

fn pointer_to(dwarf: &mut DwarfUnit, target: UnitEntryId) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_pointer_type);
    dwarf
        .unit
        .get_mut(id)
        .set(gimli::DW_AT_type, AttributeValue::UnitRef(target));
    id
}

fn subprogram(dwarf: &mut DwarfUnit, name: &str, low_pc: u64) -> UnitEntryId {
    let root = dwarf.unit.root();
    let id = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    set_name(dwarf, id, name);
    dwarf.unit.get_mut(id).set(
        gimli::DW_AT_low_pc,
        AttributeValue::Address(Address::Constant(low_pc)),
    );
    id
}

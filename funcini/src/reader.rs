//! load binaries and hand their debug sections to gimli
use anyhow::{Context, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use std::borrow::Cow;
use std::path::Path;
use std::rc::Rc;

pub type DwarfReader = EndianRcSlice<RunTimeEndian>;

pub fn load_file(path: &Path) -> Result<Vec<u8>> {
    log::debug!("load file: {}", path.display());

    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open file: {}", path.display()))?;

    // SAFETY: the map is copied out right away and dropped before returning
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .with_context(|| format!("failed to map file: {}", path.display()))?;
    let data = mmap.to_vec();

    log::debug!("file load success, size: {} bytes", data.len());
    Ok(data)
}

/// load every DWARF section of an object file. missing sections load as
/// empty, sections that fail to decompress too (with a warning).
pub fn load_dwarf(data: &[u8]) -> Result<gimli::Dwarf<DwarfReader>> {
    let object_file = object::File::parse(data).context("failed to parse object file")?;
    log::debug!("parse object file success, format: {:?}", object_file.format());

    let endian = if object_file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<DwarfReader> {
        let name = id.name();
        let bytes = match object_file.section_by_name(name) {
            Some(section) => section.uncompressed_data().unwrap_or_else(|err| {
                log::warn!("decompress section fail, section: {}: {}", name, err);
                Cow::Borrowed(&[][..])
            }),
            None => Cow::Borrowed(&[][..]),
        };

        let rc_data: Rc<[u8]> = Rc::from(bytes.into_owned());
        Ok(EndianRcSlice::new(rc_data, endian))
    };

    let dwarf = gimli::Dwarf::load(load_section).context("failed to load DWARF sections")?;
    log::debug!("DWARF data load success");
    Ok(dwarf)
}

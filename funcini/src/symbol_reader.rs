use anyhow::{Context, Result};
use object::{Object, ObjectSymbol};
use std::collections::BTreeSet;

/// names of the function symbols a binary exports
#[derive(Debug, Clone, Default)]
pub struct ExportedSymbols {
    names: BTreeSet<String>,
}

impl ExportedSymbols {
    /// dynamic symbol table first; if it holds no functions (objects, static
    /// executables), global function symbols of the regular table instead
    pub fn read(data: &[u8]) -> Result<Self> {
        log::debug!("read exported symbols from {} bytes", data.len());
        let object_file = object::File::parse(data).context("failed to parse object file")?;

        let mut names = Self::collect(object_file.dynamic_symbols(), false);
        log::debug!("found {} dynamic function symbols", names.len());

        if names.is_empty() {
            log::debug!("no dynamic symbols found, check regular symbol table");
            names = Self::collect(object_file.symbols(), true);
            log::debug!("found {} global function symbols", names.len());
        }

        log::info!("total exported function symbols found: {}", names.len());
        Ok(Self { names })
    }

    fn collect<'data, S>(symbols: impl Iterator<Item = S>, global_only: bool) -> BTreeSet<String>
    where
        S: ObjectSymbol<'data>,
    {
        symbols
            .filter(|s| s.is_definition() && s.kind() == object::SymbolKind::Text)
            .filter(|s| !global_only || s.is_global())
            .filter_map(|s| {
                let name = s.name().ok()?;
                log::trace!("symbol: {}", name);
                Some(name.to_string())
            })
            .collect()
    }

    /// macOS prepends an underscore to C symbol names
    pub fn contains_function(&self, name: &str) -> bool {
        self.names.contains(name) || self.names.contains(&format!("_{}", name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

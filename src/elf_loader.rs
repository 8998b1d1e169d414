//! Program loader (spec §6, out-of-scope collaborator promoted to a
//! concrete implementation per the ambient-stack expansion).
//!
//! Parses a 32-bit ELF executable, copies its `PT_LOAD` segments into a
//! [`Memory`] implementation, and optionally populates a [`MapSymbolTable`]
//! from `.symtab` for the disassembler to annotate jump/branch targets with.
//! Grounded on the teacher's `elf_utils::read_text_instructions`, generalized
//! from "read out `.text` as a word stream" to "load every loadable segment
//! at its program-specified virtual address."

use elf::abi::PT_LOAD;
use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::memory::{FlatMemory, Memory};
use crate::symbols::MapSymbolTable;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ELF file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("{path} has no PT_LOAD segments")]
    NoLoadableSegments { path: String },
}

/// A fully loaded program image, ready to hand to [`crate::engine::Engine`].
pub struct LoadedImage {
    pub memory: FlatMemory,
    pub symbols: MapSymbolTable,
    pub entry_point: u32,
}

/// Load an ELF executable from disk into a fresh [`FlatMemory`].
pub fn load_elf(path: &str) -> Result<LoadedImage, LoaderError> {
    let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_string(),
        source,
    })?;

    let file = ElfBytes::<AnyEndian>::minimal_parse(&bytes).map_err(|e| LoaderError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let segments = file.segments().ok_or_else(|| LoaderError::NoLoadableSegments {
        path: path.to_string(),
    })?;

    let mut memory = FlatMemory::new();
    let mut loaded_any = false;
    for header in segments.iter() {
        if header.p_type != PT_LOAD {
            continue;
        }
        loaded_any = true;
        let data = file.segment_data(&header).map_err(|e| LoaderError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let base = header.p_vaddr as u32;
        for (i, byte) in data.iter().enumerate() {
            memory.wr_b(base.wrapping_add(i as u32), *byte);
        }
        // p_memsz may exceed p_filesz (.bss); FlatMemory already reads
        // unwritten addresses as zero, so there is nothing further to do.
    }
    if !loaded_any {
        return Err(LoaderError::NoLoadableSegments {
            path: path.to_string(),
        });
    }

    let mut symbols = MapSymbolTable::new();
    if let Ok(Some((table, strings))) = file.symbol_table() {
        for symbol in table.iter() {
            if symbol.st_value == 0 {
                continue;
            }
            if let Ok(name) = strings.get(symbol.st_name as usize) {
                if !name.is_empty() {
                    symbols.insert(symbol.st_value as u32, name.to_string());
                }
            }
        }
    }

    Ok(LoadedImage {
        memory,
        symbols,
        entry_point: file.ehdr.e_entry as u32,
    })
}

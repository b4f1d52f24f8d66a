// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object file serialisation.
//!
//! Everything little-endian: a fixed header (magic `0x7836`), then the
//! section, reloc, label, late-eval and map-symbol tables, a string pool
//! (first byte unused so offset 0 means "no string"), and the concatenated
//! section buffers omitting dummy and merged sections. Reading validates
//! the magic and that the header arithmetic matches the file size exactly,
//! then remaps imported section indices into the current session.

use std::collections::HashMap;
use std::fs;

use crate::core::section::SectionType;
use crate::core::status::{AsmResult, StatusCode};

use super::{Assembler, ExtLabels, Label, LateEval, LateEvalKind, MapSymbol};

pub const OBJ_MAGIC: u16 = 0x7836;

const HEADER_SIZE: usize = 20;
const SECTION_SIZE: usize = 24;
const RELOC_SIZE: usize = 12;
const LABEL_SIZE: usize = 16;
const LATE_EVAL_SIZE: usize = 24;
const MAP_SYMBOL_SIZE: usize = 11;

// section flags
const OFS_DUMMY: u8 = 1 << 0;
const OFS_FIXED: u8 = 1 << 1;
const OFS_MERGED: u8 = 1 << 2;

// label flags
const OFL_EVAL: u32 = 1 << 15;
const OFL_ADDR: u32 = 1 << 14;
const OFL_CNST: u32 = 1 << 13;
/// bits 0..12: 0 = shared XDEF, n = protected label of import group n
const OFL_FILE_MASK: u32 = OFL_CNST - 1;

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn new() -> Writer {
        Writer { bytes: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, at: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.bytes[self.at];
        self.at += 1;
        v
    }

    fn u16(&mut self) -> u16 {
        let v = u16::from_le_bytes([self.bytes[self.at], self.bytes[self.at + 1]]);
        self.at += 2;
        v
    }

    fn i32(&mut self) -> i32 {
        let v = i32::from_le_bytes(self.bytes[self.at..self.at + 4].try_into().unwrap());
        self.at += 4;
        v
    }

    fn u32(&mut self) -> u32 {
        let v = u32::from_le_bytes(self.bytes[self.at..self.at + 4].try_into().unwrap());
        self.at += 4;
        v
    }
}

/// String pool under construction: nul-terminated strings, offset 0
/// reserved to mean "no string".
#[derive(Default)]
struct StringPool {
    bytes: Vec<u8>,
    lookup: HashMap<String, i32>,
}

impl StringPool {
    fn new() -> StringPool {
        StringPool {
            bytes: vec![0],
            lookup: HashMap::new(),
        }
    }

    fn add(&mut self, text: &str) -> i32 {
        if text.is_empty() {
            return 0;
        }
        if let Some(&offs) = self.lookup.get(text) {
            return offs;
        }
        let offs = self.bytes.len() as i32;
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        self.lookup.insert(text.to_string(), offs);
        offs
    }
}

fn pool_string(pool: &[u8], offs: i32) -> String {
    if offs <= 0 || offs as usize >= pool.len() {
        return String::new();
    }
    let start = offs as usize;
    let end = pool[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|n| start + n)
        .unwrap_or(pool.len());
    String::from_utf8_lossy(&pool[start..end]).into_owned()
}

impl Assembler {
    /// Serialise the whole session into an object file blob.
    pub fn serialize_object_file(&self) -> Vec<u8> {
        let mut strings = StringPool::new();

        let num_relocs: usize = self.sections.iter().map(|s| s.relocs.len()).sum();
        let bindata: usize = self
            .sections
            .iter()
            .filter(|s| !s.is_dummy() && !s.is_merged())
            .map(|s| s.size())
            .sum();
        // XREF placeholders resolve in the importing session, not here;
        // name order keeps the output deterministic
        let mut own_labels: Vec<&Label> = self.labels.values().filter(|l| !l.reference).collect();
        own_labels.sort_by(|a, b| a.name.cmp(&b.name));
        let num_labels =
            own_labels.len() + self.externals.iter().map(|e| e.labels.len()).sum::<usize>();

        let mut sections = Writer::new();
        let mut relocs = Writer::new();
        for section in &self.sections {
            sections.i32(strings.add(&section.name));
            sections.i32(strings.add(&section.export_append));
            sections.i32(section.start_address);
            sections.i32(section.size() as i32);
            sections.i32(section.align_address);
            sections.u16(section.relocs.len() as u16);
            sections.u8(section.section_type.to_u8());
            let flags = if section.is_dummy() { OFS_DUMMY } else { 0 }
                | if section.address_assigned { OFS_FIXED } else { 0 }
                | if section.is_merged() { OFS_MERGED } else { 0 };
            sections.u8(flags);
            for reloc in &section.relocs {
                relocs.i32(reloc.base_value);
                relocs.i32(reloc.section_offset);
                relocs.u16(reloc.target_section as u16);
                relocs.u8(reloc.bytes as u8);
                relocs.u8(reloc.shift as u8);
            }
        }

        let mut labels = Writer::new();
        let mut write_label = |labels: &mut Writer, label: &Label, file: u32| {
            labels.i32(strings.add(&label.name));
            labels.i32(label.value);
            let flags = if label.evaluated { OFL_EVAL } else { 0 }
                | if label.pc_relative { OFL_ADDR } else { 0 }
                | if label.constant { OFL_CNST } else { 0 }
                | (file & OFL_FILE_MASK);
            labels.i32(flags as i32);
            labels.u16(label.section as u16);
            labels.u16(label.map_index as u16);
        };
        for label in &own_labels {
            // exported labels are shared (file 0); anything else stays
            // protected within its own import group
            let file = if label.external { 0 } else { 1 };
            write_label(&mut labels, label, file);
        }
        for (group, ext) in self.externals.iter().enumerate() {
            let mut protected: Vec<&Label> = ext.labels.values().collect();
            protected.sort_by(|a, b| a.name.cmp(&b.name));
            for label in protected {
                write_label(&mut labels, label, group as u32 + 2);
            }
        }

        let mut late = Writer::new();
        for entry in &self.late_evals {
            late.i32(strings.add(&entry.label));
            late.i32(strings.add(&entry.expression));
            late.i32(entry.address);
            late.i32(entry.target);
            late.u16(entry.section as u16);
            late.u16(entry.rept as u16);
            late.u16(entry.scope as u16);
            late.u16(entry.kind.to_u16());
        }

        let mut map = Writer::new();
        for symbol in &self.map {
            map.i32(strings.add(&symbol.name));
            map.i32(symbol.value);
            map.u16(symbol.section as u16);
            map.u8(symbol.local as u8);
        }

        let mut out = Writer::new();
        out.u16(OBJ_MAGIC);
        out.u16(self.sections.len() as u16);
        out.u16(num_relocs as u16);
        out.u16(num_labels as u16);
        out.u16(self.late_evals.len() as u16);
        out.u16(self.map.len() as u16);
        out.u32(strings.bytes.len() as u32);
        out.i32(bindata as i32);
        out.bytes.extend_from_slice(&sections.bytes);
        out.bytes.extend_from_slice(&relocs.bytes);
        out.bytes.extend_from_slice(&labels.bytes);
        out.bytes.extend_from_slice(&late.bytes);
        out.bytes.extend_from_slice(&map.bytes);
        out.bytes.extend_from_slice(&strings.bytes);
        for section in &self.sections {
            if !section.is_dummy() && !section.is_merged() {
                out.bytes.extend_from_slice(&section.output);
            }
        }
        out.bytes
    }

    pub fn write_object_file(&self, filename: &str) -> AsmResult<()> {
        fs::write(filename, self.serialize_object_file())
            .map_err(|_| StatusCode::CouldNotIncludeFile)
    }

    /// Import an object file saved by a previous assembly. Merlin-style
    /// extension-less names get the default object extension appended.
    pub fn read_object_file(&mut self, filename: &str) -> AsmResult<()> {
        let mut name = filename.to_string();
        if !name.contains('.') {
            name.push_str(".x65");
        }
        let data = self
            .load_binary(&name)
            .or_else(|| self.load_binary(filename))
            .ok_or(StatusCode::CouldNotIncludeFile)?;
        self.import_object_blob(&data)
    }

    /// Deserialise an object blob into this session, remapping section
    /// indices and keeping imported non-shared labels in a side table.
    pub fn import_object_blob(&mut self, data: &[u8]) -> AsmResult<()> {
        if data.len() < HEADER_SIZE {
            return Err(StatusCode::NotAnObjectFile);
        }
        let mut reader = Reader::new(data);
        let magic = reader.u16();
        let num_sections = reader.u16() as usize;
        let num_relocs = reader.u16() as usize;
        let num_labels = reader.u16() as usize;
        let num_late = reader.u16() as usize;
        let num_map = reader.u16() as usize;
        let stringdata = reader.u32() as usize;
        let bindata = reader.i32() as usize;

        let expected = HEADER_SIZE
            + num_sections * SECTION_SIZE
            + num_relocs * RELOC_SIZE
            + num_labels * LABEL_SIZE
            + num_late * LATE_EVAL_SIZE
            + num_map * MAP_SYMBOL_SIZE
            + stringdata
            + bindata;
        if magic != OBJ_MAGIC || expected != data.len() {
            return Err(StatusCode::NotAnObjectFile);
        }

        let strings_at = HEADER_SIZE
            + num_sections * SECTION_SIZE
            + num_relocs * RELOC_SIZE
            + num_labels * LABEL_SIZE
            + num_late * LATE_EVAL_SIZE
            + num_map * MAP_SYMBOL_SIZE;
        let pool = &data[strings_at..strings_at + stringdata];
        let mut bin_at = strings_at + stringdata;

        let prev_section = self.current_section;
        let import_base = self.externals.len() as i32;

        // sections, remapped to indices in this session
        struct SectRecord {
            relocs: usize,
        }
        let mut remap = Vec::with_capacity(num_sections);
        let mut records = Vec::with_capacity(num_sections);
        for _ in 0..num_sections {
            let name = pool_string(pool, reader.i32());
            let exp_app = pool_string(pool, reader.i32());
            let start_address = reader.i32();
            let output_size = reader.i32() as usize;
            let align_address = reader.i32();
            let relocs = reader.u16() as usize;
            let section_type = SectionType::from_u8(reader.u8());
            let flags = reader.u8();
            records.push(SectRecord { relocs });
            if flags & OFS_MERGED != 0 {
                // merged payloads already live in their target's buffer
                remap.push(self.sections.len() as i32);
                continue;
            }
            if flags & OFS_DUMMY != 0 {
                if flags & OFS_FIXED != 0 {
                    self.dummy_section(start_address);
                } else {
                    let pc = self.curr_section().pc();
                    self.dummy_section(pc);
                }
                remap.push(self.current_section as i32);
                continue;
            }
            if flags & OFS_FIXED != 0 {
                self.set_fixed_section(&name, start_address);
            } else {
                self.set_relative_section(&name);
            }
            remap.push(self.current_section as i32);
            let section = self.curr_section_mut();
            section.export_append = exp_app;
            section.align_address = align_address;
            section.section_type = section_type;
            section.address = section.start_address + output_size as i32;
            if output_size > 0 {
                section.output = data[bin_at..bin_at + output_size].to_vec();
                bin_at += output_size;
            }
        }

        // relocs belong to their section in declaration order
        let remap_section = |remap: &Vec<i32>, at: i32| -> i32 {
            if at >= 0 && (at as usize) < remap.len() {
                remap[at as usize]
            } else {
                at
            }
        };
        for (at, record) in records.iter().enumerate() {
            for _ in 0..record.relocs {
                let base_value = reader.i32();
                let section_offset = reader.i32();
                let target = reader.u16() as i32;
                let bytes = reader.u8() as i8;
                let shift = reader.u8() as i8;
                let owner = remap[at] as usize;
                self.sections[owner].add_reloc(
                    base_value,
                    section_offset,
                    remap_section(&remap, target),
                    bytes,
                    shift,
                );
            }
        }

        // labels: shared XDEFs merge by name, everything else lands in the
        // per-import side table
        let mut has_protected = false;
        for _ in 0..num_labels {
            let name = pool_string(pool, reader.i32());
            let value = reader.i32();
            let flags = reader.i32() as u32;
            let section = reader.u16() as i16 as i32;
            let map_index = reader.u16() as i16 as i32;
            let label = Label {
                name: name.clone(),
                pool_name: None,
                value,
                section: remap_section(&remap, section),
                map_index,
                evaluated: flags & OFL_EVAL != 0,
                pc_relative: flags & OFL_ADDR != 0,
                constant: flags & OFL_CNST != 0,
                external: flags & OFL_FILE_MASK == 0,
                reference: false,
            };
            if flags & OFL_FILE_MASK == 0 {
                // shared: resolve an existing XREF placeholder or add
                match self.labels.get(&name) {
                    Some(existing) if !existing.reference => continue,
                    _ => {
                        self.labels.insert(name.clone(), label);
                        let _ = self.check_late_eval(Some(name.as_str()), -1, false);
                    }
                }
            } else {
                let group = import_base as usize + (flags & OFL_FILE_MASK) as usize - 1;
                while self.externals.len() <= group {
                    self.externals.push(ExtLabels::default());
                }
                self.externals[group].labels.insert(name, label);
                has_protected = true;
            }
        }
        let file_ref = if has_protected { import_base } else { -1 };

        for _ in 0..num_late {
            let label = pool_string(pool, reader.i32());
            let expression = pool_string(pool, reader.i32());
            let address = reader.i32();
            let target = reader.i32();
            let section = reader.u16() as i16 as i32;
            let rept = reader.u16() as i32;
            let scope = reader.u16() as i32;
            let kind = LateEvalKind::from_u16(reader.u16());
            self.late_evals.push(LateEval {
                target,
                address,
                scope,
                scope_depth: self.scope_depth,
                section: remap_section(&remap, section),
                rept,
                file_ref,
                label,
                expression,
                source_name: String::new(),
                kind,
            });
        }

        for _ in 0..num_map {
            let name = pool_string(pool, reader.i32());
            let value = reader.i32();
            let section = reader.u16() as i16;
            let local = reader.u8() != 0;
            let section = if section >= 0 {
                remap_section(&remap, section as i32) as i16
            } else {
                section
            };
            self.map.push(MapSymbol {
                name,
                value,
                section,
                local,
            });
        }

        self.current_section = prev_section;
        let _ = self.check_late_eval(None, -1, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Assembler;
    use crate::core::status::StatusCode;

    #[test]
    fn rejects_bad_magic_and_truncation() {
        let mut asm = Assembler::new();
        assert_eq!(
            asm.import_object_blob(&[0u8; 8]),
            Err(StatusCode::NotAnObjectFile)
        );
        let mut blob = Assembler::new().serialize_object_file();
        blob[0] = 0x55;
        assert_eq!(
            asm.import_object_blob(&blob),
            Err(StatusCode::NotAnObjectFile)
        );
        let good = Assembler::new().serialize_object_file();
        let truncated = &good[..good.len() - 1];
        assert_eq!(
            asm.import_object_blob(truncated),
            Err(StatusCode::NotAnObjectFile)
        );
    }

    #[test]
    fn round_trip_preserves_sections_relocs_and_labels() {
        let mut src = Assembler::new();
        src.assemble(
            "xdef shared\nsection code\nshared:\nlda data\ndata:\nbyte 7\n",
            "a.s",
            true,
        );
        let blob = src.serialize_object_file();

        let mut dst = Assembler::new();
        dst.import_object_blob(&blob).unwrap();
        // the relative section arrived with its bytes and reloc intact
        let code = dst
            .sections
            .iter()
            .find(|s| s.name == "code")
            .expect("code section imported");
        assert!(code.is_relative());
        assert_eq!(code.output, vec![0xad, 0x00, 0x00, 0x07]);
        assert_eq!(code.relocs.len(), 1);
        // the shared label merged into the session
        assert!(dst.labels.contains_key("shared"));
        assert!(dst.labels["shared"].external);
        // non-exported labels stay protected
        assert!(!dst.labels.contains_key("data"));
        assert_eq!(dst.externals.len(), 1);
        assert!(dst.externals[0].labels.contains_key("data"));
    }

    #[test]
    fn xref_placeholder_resolves_on_import() {
        let mut provider = Assembler::new();
        provider.assemble("xdef foo\nfoo = $1234\n", "a.s", true);
        let blob = provider.serialize_object_file();

        let mut consumer = Assembler::new();
        consumer.add_xref("foo");
        assert!(consumer.labels["foo"].reference);
        consumer.import_object_blob(&blob).unwrap();
        let foo = &consumer.labels["foo"];
        assert!(!foo.reference);
        assert_eq!(foo.value, 0x1234);
    }

    #[test]
    fn pending_late_evals_survive_the_round_trip() {
        let mut src = Assembler::new();
        src.assemble("org $1000\nword external_thing\n", "a.s", true);
        assert_eq!(src.late_evals.len(), 1);
        let blob = src.serialize_object_file();

        let mut dst = Assembler::new();
        dst.import_object_blob(&blob).unwrap();
        assert_eq!(dst.late_evals.len(), 1);
        assert_eq!(dst.late_evals[0].expression, "external_thing");
    }

    #[test]
    fn map_symbols_are_appended_with_remapped_sections() {
        let mut src = Assembler::new();
        src.assemble("org $1000\nstart:\nnop\n", "a.s", true);
        let count = src.map.len();
        assert!(count > 0);
        let blob = src.serialize_object_file();

        let mut dst = Assembler::new();
        dst.import_object_blob(&blob).unwrap();
        assert_eq!(dst.map.len(), count);
        assert_eq!(dst.map[0].name, "start");
    }
}

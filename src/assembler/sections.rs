// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Section management: creation, selection, linking and zero-page layout.
//!
//! Relative sections are appended onto fixed ones at link time; the append
//! rebases the section's labels and rewrites every pending relocation that
//! targets it. All write-back goes through `(section index, offset)` pairs,
//! never stored pointers.

use crate::core::section::{Section, SectionType};
use crate::core::status::{AsmResult, StatusCode};

use super::Assembler;

impl Assembler {
    /// Open (or re-open) a fixed-address section.
    pub fn set_fixed_section(&mut self, name: &str, address: i32) {
        if !name.is_empty() {
            if let Some(at) = self
                .sections
                .iter()
                .position(|s| !s.name.is_empty() && s.name.eq_ignore_ascii_case(name))
            {
                self.current_section = at;
                return;
            }
        }
        if self.link_all_section {
            self.link_all_to_section();
        }
        let mut section = Section::fixed(name, address);
        // don't compile over zero page and the stack frame
        if address < 0x200 {
            section.dummy_section = true;
        }
        self.sections.push(section);
        self.current_section = self.sections.len() - 1;
    }

    /// Open a relative section. The argument may carry a `.u`/`.z`/`.d`/`.c`
    /// suffix or a `zp`/`bss`/`code`/`data` token selecting the type, and a
    /// comma-separated alignment (decimal or `$hex`).
    pub fn set_relative_section(&mut self, line: &str) {
        if self.link_all_section {
            self.link_all_to_section();
        }

        let mut section_type = SectionType::Undefined;
        let mut rest = line;
        if let Some(suffix) = rest.strip_prefix('.') {
            section_type = match suffix.chars().next().map(|c| c.to_ascii_lowercase()) {
                Some('u') => SectionType::Bss,
                Some('z') => SectionType::Zeropage,
                Some('d') => SectionType::Data,
                Some('c') => SectionType::Code,
                _ => SectionType::Undefined,
            };
            rest = &suffix[suffix.len().min(1)..];
        }
        let rest = rest.trim();

        let mut align = 1i32;
        let mut name = String::new();
        for arg in rest.split([',', ':']) {
            let arg = arg.trim();
            if arg.is_empty() {
                continue;
            }
            if let Some(hex) = arg.strip_prefix('$') {
                align = i32::from_str_radix(hex, 16).unwrap_or(1);
            } else if arg.chars().all(|c| c.is_ascii_digit()) {
                align = arg.parse().unwrap_or(1);
            } else if let Some(quoted) = arg.strip_prefix('"') {
                name = quoted[..quoted.find('"').unwrap_or(quoted.len())].to_string();
            } else if name.is_empty() {
                name = arg.to_string();
            } else if arg.eq_ignore_ascii_case("code") {
                section_type = SectionType::Code;
            } else if arg.eq_ignore_ascii_case("data") {
                section_type = SectionType::Data;
            } else if arg.eq_ignore_ascii_case("bss") {
                section_type = SectionType::Bss;
            } else if arg.eq_ignore_ascii_case("zp")
                || arg.eq_ignore_ascii_case("dp")
                || arg.eq_ignore_ascii_case("zeropage")
                || arg.eq_ignore_ascii_case("direct")
            {
                section_type = SectionType::Zeropage;
            }
        }
        if section_type == SectionType::Undefined {
            let lower = name.to_ascii_lowercase();
            section_type = if lower.contains("code") {
                SectionType::Code
            } else if lower.contains("data") {
                SectionType::Data
            } else if lower.contains("bss") {
                SectionType::Bss
            } else if lower.contains("zp") || lower.contains("zeropage") || lower.contains("direct")
            {
                SectionType::Zeropage
            } else {
                SectionType::Code
            };
        }

        let mut section = Section::relative(&name);
        section.align_address = align;
        section.section_type = section_type;
        self.sections.push(section);
        self.current_section = self.sections.len() - 1;
    }

    /// Fixed-address section that advances PC without emitting bytes.
    pub fn dummy_section(&mut self, address: i32) {
        if self.link_all_section {
            self.link_all_to_section();
        }
        let mut section = Section::fixed("", address);
        section.dummy_section = true;
        self.sections.push(section);
        self.current_section = self.sections.len() - 1;
    }

    /// Pop back to the previous section.
    pub fn end_section(&mut self) {
        if self.link_all_section {
            self.link_all_to_section();
        }
        if self.current_section > 0 {
            self.current_section -= 1;
        }
    }

    /// Rebase every label belonging to a relative section onto its final
    /// address, then re-check anything that was waiting on them.
    pub fn link_labels_to_address(&mut self, section_id: i32, section_address: i32) {
        let moved: Vec<String> = self
            .labels
            .values_mut()
            .filter(|label| label.section == section_id)
            .map(|label| {
                label.value += section_address;
                label.section = -1;
                label.name.clone()
            })
            .collect();
        for name in &moved {
            for symbol in self.map.iter_mut().filter(|s| s.name == *name) {
                symbol.value = self.labels[name].value;
                symbol.section = -1;
            }
            let _ = self.check_late_eval(Some(name.as_str()), -1, false);
        }
    }

    /// Write back every pending relocation that targets `section_id` now
    /// that its start address is known.
    pub fn link_relocs(&mut self, section_id: i32, section_address: i32) -> AsmResult<()> {
        for owner in 0..self.sections.len() {
            if self.sections[owner].relocs.is_empty() {
                continue;
            }
            let mut keep = Vec::new();
            let mut writes = Vec::new();
            for reloc in std::mem::take(&mut self.sections[owner].relocs) {
                if reloc.target_section != section_id {
                    keep.push(reloc);
                    continue;
                }
                // follow the merge chain to the section holding the bytes
                let mut offs = 0i32;
                let mut holder = owner;
                while self.sections[holder].is_merged() {
                    offs += self.sections[holder].merged_offset;
                    holder = self.sections[holder].merged_section as usize;
                }
                let mut value = reloc.base_value.wrapping_add(section_address);
                if reloc.shift < 0 {
                    value >>= -reloc.shift as u32;
                } else if reloc.shift > 0 {
                    value = value.wrapping_shl(reloc.shift as u32);
                }
                writes.push((holder, offs + reloc.section_offset, reloc.bytes, value));
            }
            self.sections[owner].relocs = keep;
            for (holder, offset, bytes, value) in writes {
                let section = &mut self.sections[holder];
                let end = offset + bytes as i32;
                if offset < 0 || end as usize > section.size() {
                    return Err(StatusCode::SectionTargetOffsetOutOfRange);
                }
                for b in 0..bytes as i32 {
                    section.output[(offset + b) as usize] = (value >> (b * 8)) as u8;
                }
            }
        }
        Ok(())
    }

    /// Append one relative section to the end of another: pad for
    /// alignment, copy the bytes, rebase labels, rewrite relocations.
    pub fn append_section(&mut self, src: usize, dst: usize) -> AsmResult<()> {
        if !self.sections[src].is_relative() || self.sections[src].is_merged() {
            return Err(StatusCode::CantAppendSectionToTarget);
        }

        let mut section_address = self.sections[dst].pc();
        let align = self.sections[src].align_address;
        let align_size = if align <= 1 {
            0
        } else {
            (align - (section_address % align)) % align
        };
        for _ in 0..align_size {
            self.sections[dst].add_byte(0);
        }
        section_address += align_size;

        let bytes = std::mem::take(&mut self.sections[src].output);
        let merged_offset = self.sections[dst].data_offset();
        self.sections[dst].add_bin(&bytes);

        let source = &mut self.sections[src];
        source.start_address = section_address;
        source.address += section_address;
        source.address_assigned = true;
        source.merged_section = dst as i32;
        source.merged_offset = merged_offset;

        self.link_labels_to_address(src as i32, section_address);
        self.link_relocs(src as i32, section_address)
    }

    /// Append every unmerged relative section whose name matches (all, if
    /// the name is empty) into the current section, in declaration order.
    pub fn link_sections(&mut self, name: &str) -> AsmResult<()> {
        if self.curr_section().is_relative() {
            return Err(StatusCode::LinkerMustBeInFixedAddressSection);
        }
        if self.curr_section().is_dummy() {
            return Err(StatusCode::LinkerCantLinkToDummySection);
        }
        let current = self.current_section;
        for at in 0..self.sections.len() {
            let section = &self.sections[at];
            if (!name.is_empty() && section.name != name)
                || !section.is_relative()
                || section.is_merged()
            {
                continue;
            }
            // zero page sections may only link into zero page sections
            if section.section_type == SectionType::Zeropage
                && self.sections[current].section_type != SectionType::Zeropage
            {
                continue;
            }
            self.append_section(at, current)?;
        }
        Ok(())
    }

    /// MERLIN linking ignores section naming: link every remaining
    /// relative section once the current section ends.
    pub fn link_all_to_section(&mut self) {
        self.link_all_section = false;
        if self.curr_section().is_dummy() {
            return;
        }
        let current = self.current_section;
        for at in 0..self.sections.len() {
            let section = &self.sections[at];
            if !section.is_relative() || section.is_merged() {
                continue;
            }
            if section.section_type == SectionType::Zeropage
                && self.sections[current].section_type != SectionType::Zeropage
            {
                continue;
            }
            let _ = self.append_section(at, current);
        }
    }

    /// Place unassigned zero-page sections before export: next to assigned
    /// ones in the first feasible `[0, 256)` slot, or packed descending
    /// against address 256 when none is assigned.
    pub fn link_zp(&mut self) -> AsmResult<()> {
        let mut num_addr = 0i32;
        let mut has_assigned = false;
        let mut has_unassigned = false;
        for section in &self.sections {
            if section.section_type != SectionType::Zeropage || section.is_merged() {
                continue;
            }
            if section.address_assigned {
                has_assigned = true;
            } else {
                has_unassigned = true;
            }
            num_addr += section.address - section.start_address;
        }
        if num_addr > 0x100 {
            return Err(StatusCode::ZeropageSectionOutOfRange);
        }
        if !has_unassigned {
            return Ok(());
        }

        if !has_assigned {
            // pack against the end of the zero page, in declaration order
            let mut address = 0x100 - num_addr;
            for at in 0..self.sections.len() {
                let section = &self.sections[at];
                if section.section_type != SectionType::Zeropage || section.is_merged() {
                    continue;
                }
                let size = section.address - section.start_address;
                let section_mut = &mut self.sections[at];
                section_mut.start_address = address;
                section_mut.address += address;
                section_mut.address_assigned = true;
                self.link_labels_to_address(at as i32, address);
                self.link_relocs(at as i32, address)?;
                address += size;
            }
            return Ok(());
        }

        // fit each unassigned section immediately before or after one of
        // the assigned ones
        for at in 0..self.sections.len() {
            let section = &self.sections[at];
            if section.section_type != SectionType::Zeropage
                || section.is_merged()
                || section.address_assigned
            {
                continue;
            }
            let size = section.address - section.start_address;
            let mut placed_at = None;
            'anchors: for anchor in 0..self.sections.len() {
                let sa = &self.sections[anchor];
                if anchor == at
                    || sa.section_type != SectionType::Zeropage
                    || sa.is_merged()
                    || !sa.address_assigned
                {
                    continue;
                }
                for before in [false, true] {
                    let start = if before {
                        sa.start_address - size
                    } else {
                        sa.address
                    };
                    let end = start + size;
                    if start < 0 || end > 0x100 {
                        continue;
                    }
                    let overlaps = self.sections.iter().enumerate().any(|(other, sc)| {
                        other != at
                            && sc.section_type == SectionType::Zeropage
                            && !sc.is_merged()
                            && sc.address_assigned
                            && start < sc.address
                            && sc.start_address < end
                    });
                    if !overlaps {
                        placed_at = Some(start);
                        break 'anchors;
                    }
                }
            }
            let Some(start) = placed_at else {
                return Err(StatusCode::ZeropageSectionOutOfRange);
            };
            let section_mut = &mut self.sections[at];
            section_mut.start_address = start;
            section_mut.address += start;
            section_mut.address_assigned = true;
            self.link_labels_to_address(at as i32, start);
            self.link_relocs(at as i32, start)?;
        }
        Ok(())
    }

    /// `org`/`pc`: a fresh section is re-fixed in place, anything else
    /// opens a new fixed section at the address.
    pub fn directive_org(&mut self, line: &str) -> AsmResult<()> {
        let mut rest = line.trim_start();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
        } else if rest
            .get(..3)
            .is_some_and(|word| word.eq_ignore_ascii_case("equ"))
        {
            rest = rest[3..].trim_start();
        }
        let etx = self.eval_ctx();
        let addr = self.eval_immediate(rest, &etx).map_err(|err| {
            if err == StatusCode::NotReady || err == StatusCode::XrefDependent {
                StatusCode::TargetAddressMustEvaluateImmediately
            } else {
                err
            }
        })?;

        if self.curr_section().size() == 0 && !self.curr_section().is_dummy() {
            if self.curr_section().section_type == SectionType::Zeropage && addr >= 0x100 {
                return Err(StatusCode::ZeropageSectionOutOfRange);
            }
            let id = self.section_id();
            let section = self.curr_section_mut();
            section.start_address = addr;
            section.load_address = addr;
            section.address = addr;
            section.address_assigned = true;
            // labels may have been defined before the org
            self.link_labels_to_address(id, addr);
        } else {
            self.set_fixed_section("", addr);
        }
        Ok(())
    }

    /// `load`: target load address, distinct from the run address.
    pub fn directive_load(&mut self, line: &str) -> AsmResult<()> {
        let mut rest = line.trim_start();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
        } else if rest
            .get(..3)
            .is_some_and(|word| word.eq_ignore_ascii_case("equ"))
        {
            rest = rest[3..].trim_start();
        }
        let etx = self.eval_ctx();
        let addr = self.eval_immediate(rest, &etx).map_err(|err| {
            if err == StatusCode::NotReady || err == StatusCode::XrefDependent {
                StatusCode::TargetAddressMustEvaluateImmediately
            } else {
                err
            }
        })?;
        self.curr_section_mut().load_address = addr;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::Assembler;
    use crate::core::section::SectionType;
    use crate::core::status::StatusCode;

    #[test]
    fn relative_section_parses_type_and_alignment() {
        let mut asm = Assembler::new();
        asm.set_relative_section("sprites, $100, data");
        let section = asm.curr_section();
        assert_eq!(section.name, "sprites");
        assert_eq!(section.align_address, 0x100);
        assert_eq!(section.section_type, SectionType::Data);
        assert!(section.is_relative());
    }

    #[test]
    fn section_type_inferred_from_name() {
        let mut asm = Assembler::new();
        asm.set_relative_section("zpvars");
        assert_eq!(asm.curr_section().section_type, SectionType::Zeropage);
        asm.set_relative_section("main_code");
        assert_eq!(asm.curr_section().section_type, SectionType::Code);
    }

    #[test]
    fn fixed_section_below_0x200_is_dummy() {
        let mut asm = Assembler::new();
        asm.set_fixed_section("low", 0x80);
        assert!(asm.curr_section().is_dummy());
        asm.set_fixed_section("high", 0x2000);
        assert!(!asm.curr_section().is_dummy());
    }

    #[test]
    fn append_pads_to_alignment_and_rebases() {
        let mut asm = Assembler::new();
        asm.set_fixed_section("main", 0x2000);
        let fixed = asm.current_section;
        asm.curr_section_mut().add_byte(0xea);

        asm.set_relative_section("tail");
        let rel = asm.current_section;
        asm.curr_section_mut().align_address = 4;
        asm.curr_section_mut().add_byte(0x60);
        asm.current_section = fixed;

        asm.append_section(rel, fixed).unwrap();
        // one byte emitted at $2000, then 3 pad bytes, then the tail
        assert_eq!(asm.sections[fixed].output, vec![0xea, 0, 0, 0, 0x60]);
        assert_eq!(asm.sections[rel].start_address, 0x2004);
        assert!(asm.sections[rel].is_merged());
    }

    #[test]
    fn link_requires_fixed_non_dummy_section() {
        let mut asm = Assembler::new();
        asm.set_relative_section("code");
        assert_eq!(
            asm.link_sections("code"),
            Err(StatusCode::LinkerMustBeInFixedAddressSection)
        );
        asm.dummy_section(0x2000);
        assert_eq!(
            asm.link_sections("code"),
            Err(StatusCode::LinkerCantLinkToDummySection)
        );
    }

    #[test]
    fn link_rewrites_relocations() {
        let mut asm = Assembler::new();
        asm.set_fixed_section("main", 0x2000);
        let fixed = asm.current_section;

        asm.set_relative_section("code");
        let rel = asm.current_section as i32;
        // lda data / data: .byte 7, with data at offset 3 of the section
        asm.curr_section_mut().add_byte(0xad);
        let offs = asm.curr_section_mut().data_offset();
        asm.curr_section_mut().add_reloc(3, offs, rel, 2, 0);
        asm.curr_section_mut().add_word(0);
        asm.curr_section_mut().add_byte(7);

        asm.current_section = fixed;
        asm.link_sections("code").unwrap();
        assert_eq!(asm.sections[fixed].output, vec![0xad, 0x03, 0x20, 0x07]);
        assert!(asm.sections.iter().all(|s| s.relocs.is_empty()));
    }

    #[test]
    fn unassigned_zeropage_packs_against_256() {
        let mut asm = Assembler::new();
        asm.set_relative_section("zp_a, zp");
        asm.curr_section_mut().address += 4;
        asm.set_relative_section("zp_b, zp");
        asm.curr_section_mut().address += 8;
        asm.link_zp().unwrap();
        let a = asm.sections.iter().find(|s| s.name == "zp_a").unwrap();
        let b = asm.sections.iter().find(|s| s.name == "zp_b").unwrap();
        assert_eq!(a.start_address, 0x100 - 12);
        assert_eq!(b.start_address, 0x100 - 8);
        assert!(a.address_assigned && b.address_assigned);
    }

    #[test]
    fn zeropage_overflow_is_rejected() {
        let mut asm = Assembler::new();
        asm.set_relative_section("zp_big, zp");
        asm.curr_section_mut().address += 0x110;
        assert_eq!(asm.link_zp(), Err(StatusCode::ZeropageSectionOutOfRange));
    }

    #[test]
    fn org_refixes_a_fresh_relative_section() {
        let mut asm = Assembler::new();
        asm.set_relative_section("code");
        asm.directive_org("$c000").unwrap();
        let section = asm.curr_section();
        assert!(!section.is_relative());
        assert_eq!(section.start_address, 0xc000);
        assert_eq!(section.pc(), 0xc000);
    }
}

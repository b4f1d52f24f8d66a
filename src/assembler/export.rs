// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Binary export: one output image per distinct export append-name.
//!
//! For each name the address range is scanned from the matching fixed
//! sections, remaining relative sections are linked onto the latest one (a
//! `$1000` section is synthesised if no fixed section exists), and every
//! contributing section is copied into a zero-filled image at its final
//! address.

use crate::core::section::SectionType;

use super::Assembler;

impl Assembler {
    /// All distinct export append-names, in declaration order.
    pub fn export_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for section in &self.sections {
            if section.is_merged() {
                continue;
            }
            if !names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(&section.export_append))
            {
                names.push(section.export_append.clone());
            }
        }
        names
    }

    fn matches_append(section_append: &str, append: &str) -> bool {
        (append.is_empty() && section_append.is_empty())
            || section_append.eq_ignore_ascii_case(append)
    }

    /// Build the export image for one append-name; returns the bytes, the
    /// image's start address, and the target load address (differs from the
    /// start when a `load` directive asked for it), or `None` when nothing
    /// contributes.
    pub fn build_export(&mut self, append: &str) -> Option<(Vec<u8>, i32, i32)> {
        let mut start_address = i32::MAX;
        let mut end_address = 0i32;
        let mut has_relative = false;
        let mut has_fixed = false;
        let mut last_fixed: Option<usize> = None;

        for (at, section) in self.sections.iter().enumerate() {
            if !Self::matches_append(&section.export_append, append)
                || section.section_type == SectionType::Zeropage
                || section.is_merged()
            {
                continue;
            }
            if section.is_relative() {
                has_relative = true;
            } else if section.start_address >= 0x100 && section.size() > 0 {
                has_fixed = true;
                start_address = start_address.min(section.start_address);
                let end = section.start_address + section.size() as i32;
                if end > end_address {
                    end_address = end;
                    last_fixed = Some(at);
                }
            }
        }
        if !has_relative && !has_fixed {
            return None;
        }

        if has_relative {
            let target = match last_fixed {
                Some(at) => at,
                None => {
                    // nothing fixed to anchor on: synthesise one at $1000
                    start_address = 0x1000;
                    self.set_fixed_section("", start_address);
                    self.curr_section_mut().export_append = append.to_string();
                    self.current_section
                }
            };
            for at in 0..self.sections.len() {
                let section = &self.sections[at];
                if Self::matches_append(&section.export_append, append)
                    && section.section_type != SectionType::Zeropage
                    && section.is_relative()
                    && !section.is_merged()
                {
                    if self.append_section(at, target).is_err() {
                        return None;
                    }
                    end_address = self.sections[target].start_address
                        + self.sections[target].size() as i32;
                }
            }
        }

        if end_address <= start_address {
            return None;
        }

        let mut image = vec![0u8; (end_address - start_address) as usize];
        let mut load_address = start_address;
        for section in &self.sections {
            if !Self::matches_append(&section.export_append, append) {
                continue;
            }
            if !section.is_merged() && section.start_address >= 0x200 && section.size() > 0 {
                let offs = (section.start_address - start_address) as usize;
                image[offs..offs + section.size()].copy_from_slice(&section.output);
                if section.start_address == start_address {
                    load_address = section.load_address;
                }
            }
        }
        Some((image, start_address, load_address))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Assembler;

    #[test]
    fn fixed_sections_merge_into_one_image() {
        let mut asm = Assembler::new();
        asm.assemble(
            "org $2000\nbyte 1, 2\norg $2004\nbyte 9\n",
            "a.s",
            false,
        );
        let (image, start, load) = asm.build_export("").expect("image");
        assert_eq!(start, 0x2000);
        assert_eq!(load, 0x2000);
        assert_eq!(image, vec![1, 2, 0, 0, 9]);
    }

    #[test]
    fn relative_only_export_synthesises_1000() {
        let mut asm = Assembler::new();
        asm.assemble("section code\nstart:\nnop\nrts\n", "a.s", false);
        let (image, start, _) = asm.build_export("").expect("image");
        assert_eq!(start, 0x1000);
        assert_eq!(image, vec![0xea, 0x60]);
        assert_eq!(asm.labels["start"].value, 0x1000);
        assert_eq!(asm.labels["start"].section, -1);
    }

    #[test]
    fn append_names_split_images() {
        let mut asm = Assembler::new();
        asm.assemble(
            "org $2000\nexport main\nbyte 1\norg $3000\nexport extra\nbyte 2\n",
            "a.s",
            false,
        );
        let names = asm.export_names();
        assert!(names.iter().any(|n| n == "main"));
        assert!(names.iter().any(|n| n == "extra"));
        let (main_img, main_at, _) = asm.build_export("main").unwrap();
        assert_eq!((main_at, main_img), (0x2000, vec![1]));
        let (extra_img, extra_at, _) = asm.build_export("extra").unwrap();
        assert_eq!((extra_at, extra_img), (0x3000, vec![2]));
    }

    #[test]
    fn zeropage_sections_never_export() {
        let mut asm = Assembler::new();
        asm.assemble("org $2000\nbyte 5\nsection zpvars, zp\nds 4\n", "a.s", false);
        let (image, start, _) = asm.build_export("").unwrap();
        assert_eq!(start, 0x2000);
        assert_eq!(image, vec![5]);
    }
}

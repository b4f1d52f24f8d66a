// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Directive identifiers, name tables, and the dispatcher.
//!
//! The sane-dialect table is always active; selecting the Merlin dialect
//! layers the Merlin aliases (`DB`, `DA`, `PUT`, `LUP`, `DO`/`FIN`, ...)
//! on top. Directives that consume further source lines (`macro`, `rept`,
//! `struct`, `enum`) advance the current frame's resume position past
//! their bodies.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::macros::{expand_body, Macro};
use crate::core::pool::LabelPool;
use crate::core::section::SectionType;
use crate::core::status::{AsmResult, StatusCode};
use crate::core::structs::{LabelStruct, MemberOffset};
use crate::core::text::TextEncoding;
use crate::cpu::{find_cpu, CpuIndex};

use super::{offset_in, Assembler, LateEvalKind, Syntax};

/// Assembler directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Assemble for this target CPU.
    Cpu,
    /// Assemble as if loaded at this address.
    Org,
    /// Set the export append-name for this section.
    Export,
    /// Instruct the target to load at this address.
    Load,
    /// Open a relative section assigned an address at link time.
    Section,
    /// Append sections with this name at this address.
    Link,
    /// Externally declare a symbol.
    Xdef,
    /// Reference an external symbol.
    Xref,
    /// Read an object file from a previous build.
    Incobj,
    /// Pad the address to an even multiple.
    Align,
    Macro,
    /// Print an expression to stdout during assembly.
    Eval,
    Bytes,
    Words,
    /// `dc.b` / `dc.w` declare constant.
    Dc,
    Text,
    /// Load and assemble another file here.
    Include,
    /// Insert a binary file here.
    Incbin,
    /// Catch-all file reference.
    Import,
    /// Label that may not change once set.
    Const,
    /// Mutable label assignment.
    Label,
    /// Reference labels from another assembly's symbol file.
    Incsym,
    /// Create a pool of addresses handed out as labels.
    LabPool,
    If,
    Ifdef,
    Else,
    Elif,
    Endif,
    Struct,
    Enum,
    Rept,
    /// Add a folder to the include search path.
    Incdir,
    A16,
    A8,
    Xy16,
    Xy8,
    /// LISA-style hex data block.
    Hex,
    /// Page break for printed listings; ignored.
    Eject,
    Lst,
    /// Advance the address without emitting bytes.
    Dummy,
    DummyEnd,
    /// Define space: emit fill bytes or rewind the address.
    Ds,
    /// MERLIN user pseudo-op; nothing to do off an Apple II.
    Usr,
    /// MERLIN export with a full filename.
    Sav,
    /// MERLIN CPU escalation.
    Xc,
    /// MERLIN accumulator/index width control.
    Mx,
    /// MERLIN load object and link.
    Lnk,
    /// MERLIN 3 byte address data.
    Adr,
    /// MERLIN 4 byte address data.
    Adrl,
    /// MERLIN xdef for the most recent label.
    Ent,
    /// MERLIN xref.
    Ext,
    /// MERLIN cycle timer toggle.
    Cyc,
}

const DIRECTIVE_NAMES: &[(&str, Directive)] = &[
    ("cpu", Directive::Cpu),
    ("processor", Directive::Cpu),
    ("pc", Directive::Org),
    ("org", Directive::Org),
    ("load", Directive::Load),
    ("export", Directive::Export),
    ("section", Directive::Section),
    ("seg", Directive::Section),
    ("segment", Directive::Section),
    ("link", Directive::Link),
    ("xdef", Directive::Xdef),
    ("xref", Directive::Xref),
    ("incobj", Directive::Incobj),
    ("align", Directive::Align),
    ("macro", Directive::Macro),
    ("eval", Directive::Eval),
    ("print", Directive::Eval),
    ("byte", Directive::Bytes),
    ("bytes", Directive::Bytes),
    ("word", Directive::Words),
    ("words", Directive::Words),
    ("long", Directive::Adrl),
    ("dc", Directive::Dc),
    ("text", Directive::Text),
    ("include", Directive::Include),
    ("incbin", Directive::Incbin),
    ("import", Directive::Import),
    ("const", Directive::Const),
    ("label", Directive::Label),
    ("incsym", Directive::Incsym),
    ("labpool", Directive::LabPool),
    ("pool", Directive::LabPool),
    ("#if", Directive::If),
    ("#ifdef", Directive::Ifdef),
    ("#else", Directive::Else),
    ("#elif", Directive::Elif),
    ("#endif", Directive::Endif),
    ("if", Directive::If),
    ("ifdef", Directive::Ifdef),
    ("else", Directive::Else),
    ("elif", Directive::Elif),
    ("endif", Directive::Endif),
    ("struct", Directive::Struct),
    ("enum", Directive::Enum),
    ("rept", Directive::Rept),
    ("repeat", Directive::Rept),
    ("incdir", Directive::Incdir),
    ("a16", Directive::A16),
    ("a8", Directive::A8),
    ("xy16", Directive::Xy16),
    ("xy8", Directive::Xy8),
    ("i16", Directive::Xy16),
    ("i8", Directive::Xy8),
    ("hex", Directive::Hex),
    ("eject", Directive::Eject),
    ("lst", Directive::Lst),
    ("dummy", Directive::Dummy),
    ("dummy_end", Directive::DummyEnd),
    ("ds", Directive::Ds),
];

// Merlin-only names, layered over the base table to avoid confusion
const MERLIN_DIRECTIVE_NAMES: &[(&str, Directive)] = &[
    ("mx", Directive::Mx),
    ("str", Directive::Lnk),
    ("da", Directive::Words),
    ("dw", Directive::Words),
    ("asc", Directive::Text),
    ("put", Directive::Include),
    ("ddb", Directive::Words),
    ("db", Directive::Bytes),
    ("dfb", Directive::Bytes),
    ("hex", Directive::Hex),
    ("do", Directive::If),
    ("fin", Directive::Endif),
    ("eject", Directive::Eject),
    ("obj", Directive::Eject),
    ("tr", Directive::Eject),
    ("end", Directive::Eject),
    ("rel", Directive::Eject),
    ("usr", Directive::Usr),
    ("dum", Directive::Dummy),
    ("dend", Directive::DummyEnd),
    ("lst", Directive::Lst),
    ("lstdo", Directive::Lst),
    ("lup", Directive::Rept),
    ("mac", Directive::Macro),
    ("sav", Directive::Sav),
    ("dsk", Directive::Sav),
    ("lnk", Directive::Lnk),
    ("xc", Directive::Xc),
    ("ent", Directive::Ent),
    ("ext", Directive::Ext),
    ("adr", Directive::Adr),
    ("adrl", Directive::Adrl),
    ("cyc", Directive::Cyc),
];

pub fn build_directive_table(syntax: Syntax) -> HashMap<&'static str, Directive> {
    let mut table: HashMap<&'static str, Directive> = DIRECTIVE_NAMES.iter().copied().collect();
    if syntax == Syntax::Merlin {
        table.extend(MERLIN_DIRECTIVE_NAMES.iter().copied());
    }
    table
}

/// Matching close brace for the `{` at `open` within `source`.
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (at, c) in source[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + at);
                }
            }
            _ => {}
        }
    }
    None
}

fn first_word(line: &str) -> &str {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| c.is_whitespace())
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

impl Assembler {
    fn take_label_token<'a>(&self, line: &'a str) -> &'a str {
        let trimmed = line.trim_start();
        let skip = usize::from(trimmed.starts_with('.'));
        let mut end = skip;
        for c in trimmed[skip..].chars() {
            if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | '!' | '#' | ']')) {
                break;
            }
            end += c.len_utf8();
        }
        &trimmed[..end]
    }

    fn quoted_or_filename<'a>(&self, line: &'a str) -> &'a str {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('"') {
            return &rest[..rest.find('"').unwrap_or(rest.len())];
        }
        let end = trimmed
            .find(|c: char| c.is_whitespace() || c == ';' || c == ',')
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    }

    // include path file loading

    fn find_file(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        for dir in &self.include_paths {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    pub fn load_text(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.find_file(name)?).ok()
    }

    pub fn load_binary(&self, name: &str) -> Option<Vec<u8>> {
        fs::read(self.find_file(name)?).ok()
    }

    pub fn add_include_folder(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        let path = PathBuf::from(path);
        if !self.include_paths.contains(&path) {
            self.include_paths.push(path);
        }
    }

    /// Dispatch one directive; `line` is the argument text (a slice of the
    /// current frame's source) and `line_start` the byte offset of the
    /// containing line.
    pub fn apply_directive(
        &mut self,
        dir: Directive,
        line: &str,
        line_start: usize,
    ) -> StatusCode {
        // while conditionally skipping, only conditional directives apply
        if !self.conditionals.assembling()
            && !matches!(
                dir,
                Directive::If
                    | Directive::Ifdef
                    | Directive::Else
                    | Directive::Elif
                    | Directive::Endif
            )
        {
            return StatusCode::Ok;
        }
        match self.dispatch_directive(dir, line, line_start) {
            Ok(()) => StatusCode::Ok,
            Err(status) => status,
        }
    }

    fn dispatch_directive(
        &mut self,
        dir: Directive,
        line: &str,
        line_start: usize,
    ) -> AsmResult<()> {
        match dir {
            Directive::Cpu => {
                let details =
                    find_cpu(line.trim()).ok_or(StatusCode::CpuNotSupported)?;
                if details.cpu != self.cpu {
                    self.set_cpu(details.cpu);
                }
                Ok(())
            }
            Directive::Org => self.directive_org(line),
            Directive::Load => self.directive_load(line),
            Directive::Export => {
                let name = self.take_label_token(line).to_string();
                self.curr_section_mut().export_append = name;
                Ok(())
            }
            Directive::Section => {
                self.set_relative_section(line);
                Ok(())
            }
            Directive::Link => self.link_sections(line.trim()),
            Directive::Lnk => {
                let file = self.quoted_or_filename(line).to_string();
                self.read_object_file(&file)?;
                if !self.curr_section().is_relative() {
                    self.link_all_section = true;
                }
                Ok(())
            }
            Directive::Incobj => {
                let file = self.quoted_or_filename(line).to_string();
                self.read_object_file(&file)
            }
            Directive::Xdef => {
                let name = self.take_label_token(line).to_string();
                self.add_xdef(&name);
                Ok(())
            }
            Directive::Xref => {
                let name = self.take_label_token(line).to_string();
                self.add_xref(&name);
                Ok(())
            }
            Directive::Ent => {
                if let Some(label) = self.labels.get_mut(&self.last_label.clone()) {
                    label.external = true;
                }
                Ok(())
            }
            Directive::Ext => {
                let last = self.last_label.clone();
                self.add_xref(&last);
                Ok(())
            }
            Directive::Align => self.directive_align(line),
            Directive::Eval => {
                self.directive_eval(line);
                Ok(())
            }
            Directive::Bytes => self.directive_data(line, 1),
            Directive::Words => self.directive_data(line, 2),
            Directive::Adr => self.directive_data(line, 3),
            Directive::Adrl => self.directive_data(line, 4),
            Directive::Dc => self.directive_dc(line),
            Directive::Hex => self.directive_hex(line),
            Directive::Text => {
                let quote = line.find('"');
                let (prefix, text) = match quote {
                    Some(at) => {
                        let tail = &line[at + 1..];
                        (
                            line[..at].trim(),
                            &tail[..tail.find('"').unwrap_or(tail.len())],
                        )
                    }
                    None => ("", line.trim()),
                };
                let encoding = TextEncoding::from_name(prefix).unwrap_or_default();
                self.curr_section_mut().add_text(text, encoding);
                Ok(())
            }
            Directive::Macro => self.directive_macro(line, line_start),
            Directive::Include => self.directive_include(line),
            Directive::Incbin => self.directive_incbin(line, 0, 0),
            Directive::Import => self.directive_import(line),
            Directive::Label | Directive::Const => {
                let name = self.take_label_token(line);
                let rest = line.trim_start()[name.len()..].trim_start();
                let expr = if let Some(stripped) = rest.strip_prefix('=') {
                    stripped.trim_start()
                } else if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("equ") {
                    rest[3..].trim_start()
                } else {
                    return Err(StatusCode::UnexpectedLabelAssignmentFormat);
                };
                let name = name.to_string();
                self.assign_label(&name, expr, dir == Directive::Const)
            }
            Directive::Incsym => self.include_symbols(line),
            Directive::LabPool => {
                let name = self.take_label_token(line).to_string();
                let rest = line.trim_start()[name.len()..].trim_start().to_string();
                self.add_label_pool(&name, &rest)
            }
            Directive::If => {
                if self.conditionals.new_conditional() {
                    self.conditionals
                        .check_depth()
                        .map_err(|_| StatusCode::TooDeepScope)?;
                    if self.eval_statement(line)? {
                        self.conditionals.consume();
                    } else {
                        self.conditionals.set_skipping();
                    }
                }
                Ok(())
            }
            Directive::Ifdef => {
                if self.conditionals.new_conditional() {
                    self.conditionals
                        .check_depth()
                        .map_err(|_| StatusCode::TooDeepScope)?;
                    if self.labels.contains_key(line.trim()) {
                        self.conditionals.consume();
                    } else {
                        self.conditionals.set_skipping();
                    }
                }
                Ok(())
            }
            Directive::Else => {
                if self.conditionals.assembling() {
                    if self.conditionals.consumed() {
                        self.conditionals.else_consumed();
                        Ok(())
                    } else {
                        Err(StatusCode::ElseWithoutIf)
                    }
                } else {
                    if self.conditionals.available() {
                        self.conditionals.enable(true);
                    }
                    Ok(())
                }
            }
            Directive::Elif => {
                if self.conditionals.assembling() {
                    if self.conditionals.consumed() {
                        self.conditionals.else_consumed();
                        Ok(())
                    } else {
                        Err(StatusCode::ElseWithoutIf)
                    }
                } else {
                    if self.conditionals.available() {
                        let result = self.eval_statement(line)?;
                        self.conditionals.enable(result);
                    }
                    Ok(())
                }
            }
            Directive::Endif => {
                if self.conditionals.assembling() {
                    if self.conditionals.consumed() {
                        self.conditionals.close();
                        Ok(())
                    } else {
                        Err(StatusCode::EndifWithoutCondition)
                    }
                } else {
                    self.conditionals.endif_skipping();
                    Ok(())
                }
            }
            Directive::Struct => self.directive_struct(line, line_start, false),
            Directive::Enum => self.directive_struct(line, line_start, true),
            Directive::Rept => self.directive_rept(line, line_start),
            Directive::Incdir => {
                let path = self.quoted_or_filename(line).to_string();
                self.add_include_folder(&path);
                Ok(())
            }
            Directive::A16 => {
                self.accumulator_16bit = true;
                Ok(())
            }
            Directive::A8 => {
                self.accumulator_16bit = false;
                Ok(())
            }
            Directive::Xy16 => {
                self.index_reg_16bit = true;
                Ok(())
            }
            Directive::Xy8 => {
                self.index_reg_16bit = false;
                Ok(())
            }
            Directive::Mx => {
                let line = line.trim();
                if !line.is_empty() {
                    let etx = self.eval_ctx();
                    let value = self.eval_immediate(line, &etx)?;
                    self.index_reg_16bit = value & 1 == 0;
                    self.accumulator_16bit = value & 2 == 0;
                }
                Ok(())
            }
            Directive::Eject | Directive::Lst | Directive::Usr => Ok(()),
            Directive::Cyc => {
                self.cycle_counter_level = 1 - self.cycle_counter_level.min(1);
                Ok(())
            }
            Directive::Sav => {
                let mut name = line.trim();
                if let Some(stripped) = name.strip_prefix(self.export_base_name.as_str()) {
                    if !self.export_base_name.is_empty() {
                        name = stripped;
                    }
                }
                let name = self.take_label_token(name).to_string();
                if !name.is_empty() {
                    self.curr_section_mut().export_append = name;
                }
                Ok(())
            }
            Directive::Xc => {
                let line = line.trim();
                if line.get(..3).is_some_and(|w| w.eq_ignore_ascii_case("off")) {
                    self.set_cpu(CpuIndex::Cpu6502);
                } else if line.get(..2).is_some_and(|w| w.eq_ignore_ascii_case("xc")) {
                    self.set_cpu(CpuIndex::Cpu65816);
                } else if self.cpu == CpuIndex::Cpu65C02 {
                    self.set_cpu(CpuIndex::Cpu65816);
                } else {
                    self.set_cpu(CpuIndex::Cpu65C02);
                }
                Ok(())
            }
            Directive::Dummy => {
                let line = line.trim();
                if !line.is_empty() {
                    let etx = self.eval_ctx();
                    if let Ok(addr) = self.eval_immediate(line, &etx) {
                        self.dummy_section(addr);
                        return Ok(());
                    }
                }
                let pc = self.curr_section().pc();
                self.dummy_section(pc);
                Ok(())
            }
            Directive::DummyEnd => {
                while self.curr_section().is_dummy() {
                    self.end_section();
                    if self.current_section == 0 {
                        break;
                    }
                }
                Ok(())
            }
            Directive::Ds => self.directive_ds(line),
        }
    }

    fn directive_align(&mut self, line: &str) -> AsmResult<()> {
        let mut rest = line.trim();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
        } else if rest
            .get(..3)
            .is_some_and(|word| word.eq_ignore_ascii_case("equ"))
        {
            rest = rest[3..].trim_start();
        }
        if rest.is_empty() {
            return Ok(());
        }
        let etx = self.eval_ctx();
        let value = match self.eval_immediate(rest, &etx) {
            Ok(v) => v,
            Err(StatusCode::NotReady) | Err(StatusCode::XrefDependent) => {
                return Err(StatusCode::AlignMustEvaluateImmediately)
            }
            Err(err) => return Err(err),
        };
        if value > 0 {
            if self.curr_section().address_assigned {
                let pc = self.curr_section().pc();
                let add = (value - (pc % value)) % value;
                for _ in 0..add {
                    self.curr_section_mut().add_byte(0);
                }
            } else {
                self.curr_section_mut().align_address = value;
            }
        }
        Ok(())
    }

    fn directive_eval(&mut self, line: &str) {
        let (description, expr) = match line.find(':') {
            Some(at) => (line[..at].trim(), line[at + 1..].trim()),
            None => ("", line.trim()),
        };
        let line_num = if self.context.has_work() {
            let ctx = self.context.curr();
            ctx.line_number_of(ctx.read_pos)
        } else {
            0
        };
        let etx = self.eval_ctx();
        match self.eval_immediate(expr, &etx) {
            Ok(value) if description.is_empty() => {
                println!("EVAL({line_num}): \"{expr}\" = ${value:x}")
            }
            Ok(value) => println!("EVAL({line_num}): {description}: \"{expr}\" = ${value:x}"),
            Err(_) if description.is_empty() => println!("EVAL({line_num}): \"{expr}\""),
            Err(_) => println!("EVAL({line_num}): \"{description}: {expr}\""),
        }
    }

    /// Comma-separated data values of 1, 2, 3 or 4 bytes each.
    fn directive_data(&mut self, line: &str, width: usize) -> AsmResult<()> {
        let kind = match width {
            1 => LateEvalKind::Byte,
            2 => LateEvalKind::AbsRef,
            3 => LateEvalKind::AbsLRef,
            _ => LateEvalKind::Abs4Ref,
        };
        for exp in line.split(',') {
            let mut exp = exp.trim();
            if exp.is_empty() {
                continue;
            }
            // MERLIN allows an immediate marker on data declarations
            if self.syntax == Syntax::Merlin {
                if let Some(stripped) = exp.strip_prefix('#') {
                    exp = stripped;
                }
            }
            let mut value = 0i32;
            if !self.curr_section().is_dummy() {
                let etx = self.eval_ctx();
                match self.eval_expression(exp, &etx) {
                    Ok(super::eval::EvalResult::Value(v)) => value = v,
                    Ok(super::eval::EvalResult::Relative(_, rel)) => {
                        let offs = self.curr_section().data_offset();
                        self.curr_section_mut().add_reloc(
                            rel.base,
                            offs,
                            rel.section,
                            width as i8,
                            rel.shift,
                        );
                        value = 0;
                    }
                    Err(StatusCode::NotReady) | Err(StatusCode::XrefDependent) => {
                        let offs = self.curr_section().data_offset();
                        let pc = self.curr_section().pc();
                        let scope = self.scope_address[self.scope_depth as usize];
                        self.add_late_eval_target(offs, pc, scope, exp, kind);
                    }
                    Err(err) => return Err(err),
                }
            }
            let section = self.curr_section_mut();
            match width {
                1 => section.add_byte(value),
                2 => section.add_word(value),
                3 => section.add_triple(value),
                _ => {
                    section.add_triple(value);
                    section.add_byte(value >> 24);
                }
            }
        }
        Ok(())
    }

    /// `dc.b` / `dc.w` declare constant.
    fn directive_dc(&mut self, line: &str) -> AsmResult<()> {
        let mut rest = line.trim_start();
        let mut width = 1usize;
        if let Some(suffix) = rest.strip_prefix('.') {
            width = match suffix.chars().next().map(|c| c.to_ascii_lowercase()) {
                Some('b') => 1,
                Some('w') => 2,
                _ => return Err(StatusCode::BadTypeForDeclareConstant),
            };
            rest = suffix[1..].trim_start();
        }
        self.directive_data(rest, width)
    }

    /// LISA-style hex block: pairs of nibbles, comma separated runs.
    fn directive_hex(&mut self, line: &str) -> AsmResult<()> {
        let mut half: Option<i32> = None;
        for c in line.chars() {
            if c == ',' || c.is_whitespace() {
                if c == ',' {
                    if let Some(v) = half.take() {
                        // odd nibble before a comma is taken as-is
                        self.curr_section_mut().add_byte(v);
                    }
                }
                continue;
            }
            let Some(digit) = c.to_digit(16) else {
                break;
            };
            match half.take() {
                Some(high) => self.curr_section_mut().add_byte((high << 4) | digit as i32),
                None => half = Some(digit as i32),
            }
        }
        if half.is_some() {
            return Err(StatusCode::HexWithOddNibbleCount);
        }
        Ok(())
    }

    /// `ds count[, fill]`: emit fill bytes, or rewind on a negative count.
    fn directive_ds(&mut self, line: &str) -> AsmResult<()> {
        let (size, fill_text) = match line.find(',') {
            Some(at) => (line[..at].trim(), line[at + 1..].trim()),
            None => (line.trim(), ""),
        };
        let etx = self.eval_ctx();
        let value = self
            .eval_immediate(size, &etx)
            .map_err(|_| StatusCode::DsMustEvaluateImmediately)?;
        let fill = if fill_text.is_empty() {
            0
        } else {
            self.eval_immediate(fill_text, &etx)
                .map_err(|_| StatusCode::DsMustEvaluateImmediately)?
        };
        if value > 0 {
            for _ in 0..value {
                self.curr_section_mut().add_byte(fill);
            }
        } else if value != 0 {
            self.curr_section_mut().address += value;
            if self.curr_section().section_type == SectionType::Zeropage
                && self.curr_section().address > 0x100
            {
                return Err(StatusCode::ZeropageSectionOutOfRange);
            }
        }
        Ok(())
    }

    // macros and repeats

    /// Declare a macro: the body is a range of the current source frame.
    fn directive_macro(&mut self, line: &str, _line_start: usize) -> AsmResult<()> {
        let ctx = self.context.curr().clone();
        let source = ctx.source_file.clone();
        let arg_at = offset_in(&source, line);

        let (name, body_start, params_first_line) = if self.syntax == Syntax::Merlin {
            // MERLIN: `name mac`, name defined just before as a label
            let name = self.last_label.clone();
            if name.is_empty() || !self.labels.contains_key(&name) {
                return Err(StatusCode::BadMacroFormat);
            }
            self.labels.remove(&name);
            self.last_label.clear();
            let first = line.trim_start();
            let params_first_line = !first.is_empty() && !first.starts_with(';');
            (name, arg_at, params_first_line)
        } else {
            let name = self.take_label_token(line).to_string();
            if name.is_empty() {
                return Err(StatusCode::BadMacroFormat);
            }
            let after_name = arg_at + (line.trim_start().as_ptr() as usize - line.as_ptr() as usize)
                + name.len();
            let first_line_rest = &source[after_name..];
            let first_line_rest = first_line_rest
                [..first_line_rest.find(['\r', '\n']).unwrap_or(first_line_rest.len())]
                .trim();
            let rest_code = first_line_rest
                .split(';')
                .next()
                .unwrap_or("")
                .split("//")
                .next()
                .unwrap_or("")
                .trim();
            let params_first_line =
                !rest_code.is_empty() && !rest_code.starts_with('(') && !rest_code.starts_with('{');
            (name, after_name, params_first_line)
        };

        let (body_end, resume) = if self.syntax == Syntax::Merlin {
            // body ends at a line containing <<< or EOM
            let mut end = source.len();
            let mut resume = source.len();
            let mut at = body_start;
            while at < source.len() {
                let line_end = source[at..]
                    .find('\n')
                    .map(|n| at + n)
                    .unwrap_or(source.len());
                let text = &source[at..line_end];
                let code = text.split(';').next().unwrap_or("");
                if let Some(term) = code.find("<<<").or_else(|| code.find("EOM")) {
                    end = at + term;
                    resume = line_end + 1;
                    break;
                }
                at = line_end + 1;
            }
            (end, resume.min(source.len()))
        } else if self.end_macro_directive {
            // body ends at a whitespace-bounded `endm`
            let mut search = body_start;
            loop {
                let Some(found) = source[search..].find("endm") else {
                    return Err(StatusCode::BadMacroFormat);
                };
                let at = search + found;
                let bounded = at == body_start
                    || source.as_bytes()[at - 1].is_ascii_whitespace();
                if bounded {
                    let after = source[at..]
                        .find('\n')
                        .map(|n| at + n + 1)
                        .unwrap_or(source.len());
                    break (at, after);
                }
                search = at + 4;
            }
        } else {
            let open = source[body_start..]
                .find('{')
                .map(|n| body_start + n)
                .ok_or(StatusCode::BadMacroFormat)?;
            let close = matching_brace(&source, open).ok_or(StatusCode::BadMacroFormat)?;
            (close + 1, close + 1)
        };

        let mac = Macro {
            name: name.clone(),
            source_name: ctx.source_name.clone(),
            source_file: source.clone(),
            body_start,
            body_end,
            params_first_line,
        };
        self.macros.insert(name, mac);
        self.context.curr_mut().next_pos = resume;
        Ok(())
    }

    /// Expand a macro invocation and push it as a new context frame.
    pub fn invoke_macro(&mut self, mac: &Macro, arg_list: &str) -> AsmResult<()> {
        let body_text = mac.body();
        if self.syntax == Syntax::Merlin {
            // parameters are ]1, ]2, ...; arguments separate with ';', so
            // recover the argument text past the line's comment clip
            let source = self.context.curr().source_file.clone();
            let start = offset_in(&source, arg_list).min(source.len());
            let line_end = source[start..]
                .find(['\r', '\n'])
                .map(|n| start + n)
                .unwrap_or(source.len());
            let full_args = &source[start..line_end];
            let full_args = full_args.split("//").next().unwrap_or("");
            let args: Vec<&str> = full_args
                .split(';')
                .map(str::trim)
                .take_while(|a| !a.is_empty())
                .collect();
            let mut expanded = body_text.to_string();
            for (slot, arg) in args.iter().enumerate() {
                let tag = format!("]{}", slot + 1);
                expanded = crate::core::macros::substitute_bookended(&expanded, &tag, arg);
            }
            let src: Rc<str> = Rc::from(expanded.as_str());
            let len = src.len();
            self.context.push(mac.source_name.clone(), src, 0, len, 1);
            self.enter_scope()?;
            self.context.curr_mut().scoped_context = true;
            return Ok(());
        }

        let (params, body) = if mac.params_first_line {
            if self.end_macro_directive {
                let nl = body_text.find('\n').unwrap_or(body_text.len());
                (
                    body_text[..nl].trim(),
                    &body_text[nl.min(body_text.len())..],
                )
            } else {
                let brace = body_text.find('{').unwrap_or(body_text.len());
                (body_text[..brace].trim(), &body_text[brace..])
            }
        } else {
            let trimmed = body_text.trim_start();
            if trimmed.starts_with('(') {
                let close = trimmed.find(')').unwrap_or(trimmed.len());
                (trimmed[1..close].trim(), &trimmed[(close + 1).min(trimmed.len())..])
            } else {
                ("", body_text)
            }
        };

        if params.is_empty() {
            // no substitution: run the body straight out of its source
            let body_at = offset_in(&mac.source_file, body);
            self.context.push(
                mac.source_name.clone(),
                mac.source_file.clone(),
                body_at,
                body_at + body.len(),
                1,
            );
            if self.end_macro_directive {
                self.enter_scope()?;
                self.context.curr_mut().scoped_context = true;
            }
            return Ok(());
        }

        let mut arg_list = arg_list.trim();
        if arg_list.starts_with('(') {
            let close = arg_list.rfind(')').unwrap_or(arg_list.len());
            arg_list = arg_list[1..close].trim();
        }
        let arg_token = if arg_list.contains(',') { ',' } else { ' ' };
        let param_token = if mac.params_first_line && !params.contains(',') {
            ' '
        } else {
            ','
        };
        let param_list: Vec<&str> = params
            .split(param_token)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let args: Vec<&str> = arg_list.split(arg_token).map(str::trim).collect();
        let expanded = expand_body(body, &param_list, &args);

        let src: Rc<str> = Rc::from(expanded.as_str());
        let len = src.len();
        self.context.push(mac.source_name.clone(), src, 0, len, 1);
        if self.end_macro_directive {
            self.enter_scope()?;
            self.context.curr_mut().scoped_context = true;
        }
        Ok(())
    }

    /// `rept count { body }` (or a `lup`/`endr` block): run the body
    /// `count` times as a repeating context frame.
    fn directive_rept(&mut self, line: &str, _line_start: usize) -> AsmResult<()> {
        let ctx = self.context.curr().clone();
        let source = ctx.source_file.clone();
        let arg_at = offset_in(&source, line);

        let (expression, body_start, body_end, resume) =
            if self.syntax == Syntax::Merlin || self.end_macro_directive {
                // repeat body begins on the next line, ends at --^ / endr
                let line_end = source[arg_at..]
                    .find('\n')
                    .map(|n| arg_at + n + 1)
                    .unwrap_or(source.len());
                let terminator = if self.end_macro_directive { "endr" } else { "--^" };
                let mut at = line_end;
                let mut body_end = source.len();
                let mut resume = source.len();
                while at < source.len() {
                    let next = source[at..]
                        .find('\n')
                        .map(|n| at + n)
                        .unwrap_or(source.len());
                    let text = source[at..next].split(';').next().unwrap_or("");
                    if let Some(term) = text.find(terminator) {
                        body_end = at + term;
                        resume = (next + 1).min(source.len());
                        break;
                    }
                    at = next + 1;
                }
                (line.trim(), line_end, body_end, resume)
            } else {
                let open = source[arg_at..]
                    .find('{')
                    .map(|n| arg_at + n)
                    .ok_or(StatusCode::ReptMissingScope)?;
                let close =
                    matching_brace(&source, open).ok_or(StatusCode::ReptMissingScope)?;
                let expression = source[arg_at..open].trim();
                (expression, open + 1, close, close + 1)
            };

        let etx = self.eval_ctx();
        let count = self
            .eval_immediate(expression, &etx)
            .map_err(|_| StatusCode::ReptCountExpression)?;
        self.context.curr_mut().next_pos = resume;
        if count > 0 {
            self.context.push(
                ctx.source_name.clone(),
                source,
                body_start,
                body_end,
                count,
            );
        }
        Ok(())
    }

    /// Consume a `struct`/`enum` declaration block.
    fn directive_struct(&mut self, line: &str, _line_start: usize, is_enum: bool) -> AsmResult<()> {
        let fail = if is_enum {
            StatusCode::EnumCantBeAssembled
        } else {
            StatusCode::StructCantBeAssembled
        };
        let ctx = self.context.curr().clone();
        let source = ctx.source_file.clone();
        let name = first_word(line);
        if name.is_empty() {
            return Err(fail);
        }
        let after_name = &line[line.trim_start().as_ptr() as usize - line.as_ptr() as usize
            + name.len()..];
        if !after_name.trim_start().starts_with('{') {
            return Err(fail);
        }
        let open = offset_in(&source, after_name.trim_start());
        let close = matching_brace(&source, open).ok_or(fail)?;
        let body = source[open + 1..close].to_string();
        let name = name.to_string();
        self.context.curr_mut().next_pos = close + 1;
        if is_enum {
            self.build_enum(&name, &body)
        } else {
            self.build_struct(&name, &body)
        }
    }

    /// Struct members are `byte`, `word`, or a previously declared struct.
    pub fn build_struct(&mut self, name: &str, declaration: &str) -> AsmResult<()> {
        if self.structs.contains(name) {
            return Err(StatusCode::StructAlreadyDefined);
        }
        let mut members = Vec::new();
        let mut size = 0u16;
        for line in declaration.lines() {
            let line = line.split(';').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let type_name = first_word(line);
            let member_name = line[type_name.len()..].trim();
            let (member_size, sub_struct) = self
                .structs
                .member_size(type_name)
                .ok_or(StatusCode::ReferencedStructNotFound)?;
            members.push(MemberOffset {
                offset: size,
                name: member_name.to_string(),
                sub_struct,
            });
            size += member_size;
        }
        self.structs.insert(LabelStruct {
            name: name.to_string(),
            members,
            size,
        })
    }

    /// Enums are structs with zero size and incrementing offsets; member
    /// values may be overridden with `name = expr`.
    pub fn build_enum(&mut self, name: &str, declaration: &str) -> AsmResult<()> {
        if self.structs.contains(name) {
            return Err(StatusCode::StructAlreadyDefined);
        }
        let mut members = Vec::new();
        let mut value = 0i32;
        for entry in declaration.lines().flat_map(|l| l.split(',')) {
            let entry = entry.split(';').next().unwrap_or("").trim();
            if entry.is_empty() {
                continue;
            }
            let (member_name, expr) = match entry.split_once('=') {
                Some((n, e)) => (n.trim(), e.trim()),
                None => (entry, ""),
            };
            if !expr.is_empty() {
                let etx = self.eval_ctx();
                value = self
                    .eval_immediate(expr, &etx)
                    .map_err(|_| StatusCode::EnumCantBeAssembled)?;
            }
            members.push(MemberOffset {
                offset: value as u16,
                name: member_name.to_string(),
                sub_struct: None,
            });
            value += 1;
        }
        self.structs.insert(LabelStruct {
            name: name.to_string(),
            members,
            size: 0,
        })
    }

    // label pools

    /// `pool Name start-end[, start-end ...]`
    pub fn add_label_pool(&mut self, name: &str, args: &str) -> AsmResult<()> {
        if self.label_pools.contains_key(name) {
            return Err(StatusCode::LabelPoolRedeclaration);
        }
        let etx = self.eval_ctx();
        let mut ranges = Vec::new();
        for arg in args.split(',') {
            let arg = arg.trim();
            if arg.is_empty() {
                continue;
            }
            let inner = arg
                .strip_prefix('(')
                .and_then(|a| a.strip_suffix(')'))
                .unwrap_or(arg);
            let Some((start, end)) = inner.split_once('-') else {
                return Err(StatusCode::PoolRangeExpressionEval);
            };
            let start = self
                .eval_immediate(start.trim(), &etx)
                .map_err(|_| StatusCode::PoolRangeExpressionEval)?;
            let end = self
                .eval_immediate(end.trim(), &etx)
                .map_err(|_| StatusCode::PoolRangeExpressionEval)?;
            if end <= start || start < 0 || end > 0x10000 {
                return Err(StatusCode::PoolRangeExpressionEval);
            }
            ranges.push((start as u16, end as u16));
        }
        let pool = LabelPool::new(name, self.scope_depth, &ranges)?;
        self.label_pools.insert(name.to_string(), pool);
        Ok(())
    }

    /// `PoolName label[.b|.w|.t|.l]`: reserve 1-4 bytes and define the
    /// label at the reserved address.
    pub fn assign_pool_label(&mut self, pool_name: &str, line: &str) -> AsmResult<()> {
        let token = line.trim();
        let (label, type_suffix) = match token.find('.') {
            Some(at) => (&token[..at], &token[at + 1..]),
            None => (token, ""),
        };
        let bytes = match type_suffix.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('l') => 4,
            Some('t') => 3,
            Some('d') | Some('w') => 2,
            _ => 1,
        };
        if self.labels.contains_key(label) {
            return Err(StatusCode::PoolLabelAlreadyDefined);
        }
        let addr = self
            .label_pools
            .get_mut(pool_name)
            .ok_or(StatusCode::InternalLabelPoolError)?
            .reserve(bytes)?;

        let label_name = label.to_string();
        self.labels.insert(
            label_name.clone(),
            super::Label {
                name: label_name.clone(),
                pool_name: Some(pool_name.to_string()),
                value: addr as i32,
                section: -1, // pool labels are section-less
                map_index: -1,
                evaluated: true,
                pc_relative: true,
                constant: true,
                external: false,
                reference: false,
            },
        );
        self.mark_label_local(&label_name, true);
        let _ = self.check_late_eval(Some(label_name.as_str()), -1, false);
        Ok(())
    }

    // file imports

    fn directive_include(&mut self, line: &str) -> AsmResult<()> {
        let file = self.quoted_or_filename(line).to_string();
        let mut candidates: Vec<String> = vec![file.clone()];
        if self.syntax == Syntax::Merlin {
            // MERLIN: a leading !-& suppresses the T. prefix; plain names
            // try .s appended and T. prepended
            let stripped = file
                .strip_prefix(|c: char| ('!'..='&').contains(&c))
                .unwrap_or(&file)
                .to_string();
            candidates.push(stripped.clone());
            candidates.push(format!("{stripped}.s"));
            candidates.push(format!("T.{stripped}"));
        }
        for candidate in candidates {
            if let Some(text) = self.load_text(&candidate) {
                let src: Rc<str> = Rc::from(text.as_str());
                let name: Rc<str> = Rc::from(candidate.as_str());
                let len = src.len();
                self.context.push(name, src, 0, len, 1);
                return Ok(());
            }
        }
        Err(StatusCode::CouldNotIncludeFile)
    }

    fn directive_incbin(&mut self, line: &str, skip: i32, len: i32) -> AsmResult<()> {
        let file = self.quoted_or_filename(line).to_string();
        let data = self
            .load_binary(&file)
            .ok_or(StatusCode::CouldNotIncludeFile)?;
        let mut bin = &data[(skip.max(0) as usize).min(data.len())..];
        if len > 0 && (len as usize) < bin.len() {
            bin = &bin[..len as usize];
        }
        if !bin.is_empty() {
            let bin = bin.to_vec();
            self.curr_section_mut().add_bin(&bin);
        }
        Ok(())
    }

    /// `import [source|binary|c64|text|object|symbols] "file"[, skip[, len]]`
    fn directive_import(&mut self, line: &str) -> AsmResult<()> {
        let line = line.trim_start();

        // optional skip and length parameters after the quoted filename
        let mut skip = 0i32;
        let mut len = 0i32;
        if let Some(q) = line.find('"') {
            if let Some(close) = line[q + 1..].find('"') {
                let params = line[q + close + 2..].trim();
                if let Some(params) = params.strip_prefix(',') {
                    let etx = self.eval_ctx();
                    let mut parts = params.splitn(2, ',');
                    if let Some(first) = parts.next() {
                        skip = self.eval_immediate(first.trim(), &etx).unwrap_or(0);
                    }
                    if let Some(second) = parts.next() {
                        len = self.eval_immediate(second.trim(), &etx).unwrap_or(0);
                    }
                }
            }
        }

        if line.starts_with('"') {
            return self.directive_incbin(line, skip, len);
        }
        let keyword = first_word(line);
        let rest = line[keyword.len()..].trim_start();
        if keyword.eq_ignore_ascii_case("source") {
            self.directive_include(rest)
        } else if keyword.eq_ignore_ascii_case("binary") {
            self.directive_incbin(rest, skip, len)
        } else if keyword.eq_ignore_ascii_case("c64") {
            // C64 binaries carry a 2 byte load address
            self.directive_incbin(rest, 2 + skip, len)
        } else if keyword.eq_ignore_ascii_case("text") {
            let quote = rest.find('"');
            let (prefix, text) = match quote {
                Some(at) => {
                    let tail = &rest[at + 1..];
                    (
                        rest[..at].trim(),
                        &tail[..tail.find('"').unwrap_or(tail.len())],
                    )
                }
                None => ("", rest),
            };
            let encoding = TextEncoding::from_name(prefix).unwrap_or(TextEncoding::Petscii);
            self.curr_section_mut().add_text(text, encoding);
            Ok(())
        } else if keyword.eq_ignore_ascii_case("object") {
            let file = self.quoted_or_filename(rest).to_string();
            self.read_object_file(&file)
        } else if keyword.eq_ignore_ascii_case("symbols") {
            self.include_symbols(rest)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Assembler, Syntax};
    use super::{build_directive_table, Directive};
    use crate::core::status::StatusCode;

    fn run(asm: &mut Assembler, source: &str) {
        asm.assemble(source, "test.s", false);
    }

    #[test]
    fn base_table_excludes_merlin_names() {
        let sane = build_directive_table(Syntax::Sane);
        assert_eq!(sane.get("org"), Some(&Directive::Org));
        assert_eq!(sane.get("#if"), Some(&Directive::If));
        assert!(sane.get("dfb").is_none());
        let merlin = build_directive_table(Syntax::Merlin);
        assert_eq!(merlin.get("dfb"), Some(&Directive::Bytes));
        assert_eq!(merlin.get("lup"), Some(&Directive::Rept));
    }

    #[test]
    fn data_directives_emit_little_endian() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\nbyte 1, 2, $ff\nword $1234\n");
        assert_eq!(
            asm.curr_section().output,
            vec![1, 2, 0xff, 0x34, 0x12]
        );
    }

    #[test]
    fn dc_width_suffix() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\ndc.b 1\ndc.w $abcd\n");
        assert_eq!(asm.curr_section().output, vec![1, 0xcd, 0xab]);
    }

    #[test]
    fn hex_directive_pairs_nibbles() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\nhex 0102ff\n");
        assert_eq!(asm.curr_section().output, vec![1, 2, 0xff]);
        let mut bad = Assembler::new();
        run(&mut bad, "org $1000\nhex 012\n");
        assert!(bad.error_encountered);
    }

    #[test]
    fn align_pads_with_zero_bytes() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1001\nbyte 1\nalign 4\nbyte 2\n");
        assert_eq!(asm.curr_section().output, vec![1, 0, 0, 2]);
        assert_eq!(asm.curr_section().pc(), 0x1005);
    }

    #[test]
    fn ds_emits_fill_and_rewinds() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\nds 3, $ea\n");
        assert_eq!(asm.curr_section().output, vec![0xea, 0xea, 0xea]);
        let mut rew = Assembler::new();
        run(&mut rew, "org $1000\nds 4\nds -2\n");
        assert_eq!(rew.curr_section().pc(), 0x1002);
    }

    #[test]
    fn text_encodings() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\ntext \"Hi\"\ntext petscii \"hi\"\n");
        assert_eq!(asm.curr_section().output, b"HiHI".to_vec());
    }

    #[test]
    fn conditional_blocks_assemble_the_taken_branch() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "org $1000\n#if 0\nbyte 1\n#elif 1\nbyte 2\n#else\nbyte 3\n#endif\n",
        );
        assert_eq!(asm.curr_section().output, vec![2]);
        assert!(!asm.error_encountered);
    }

    #[test]
    fn unterminated_conditional_is_flagged() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\n#if 1\nbyte 1\n");
        assert!(asm.error_encountered);
        assert!(asm
            .diagnostics
            .iter()
            .any(|d| d.message.contains("not terminated")));
    }

    #[test]
    fn ifdef_checks_definition() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "flag = 1\norg $1000\n#ifdef flag\nbyte 1\n#endif\n#ifdef missing\nbyte 2\n#endif\n",
        );
        assert_eq!(asm.curr_section().output, vec![1]);
    }

    #[test]
    fn rept_repeats_with_implicit_counter() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\nrept 4 { byte REPT }\n");
        assert_eq!(asm.curr_section().output, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rept_without_scope_is_fatal() {
        let mut asm = Assembler::new();
        run(&mut asm, "org $1000\nrept 4\n");
        assert!(asm
            .diagnostics
            .iter()
            .any(|d| d.message.contains("missing a scope")));
    }

    #[test]
    fn macro_with_parameters_substitutes_tokens() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "parity = 10\nparty = 99\norg $1000\nmacro m(x) {\nbyte x, x+1\n}\nm(parity)\n",
        );
        assert_eq!(asm.curr_section().output, vec![10, 11]);
    }

    #[test]
    fn enum_members_increment_and_override() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "enum Kind { first, second, tenth = 10, eleventh }\norg $1000\nbyte Kind.second, Kind.eleventh\n",
        );
        assert_eq!(asm.curr_section().output, vec![1, 11]);
    }

    #[test]
    fn struct_offsets_accumulate() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "struct Point { byte x\nword y }\nstruct Line { Point a\nPoint b }\norg $1000\nbyte Line.b.y\n",
        );
        assert_eq!(asm.curr_section().output, vec![4]);
    }

    #[test]
    fn pool_labels_allocate_and_release_with_scope() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "pool zp $40-$50\norg $1000\n{\nzp temp\nbyte temp\n}\n{\nzp temp2\nbyte temp2\n}\n",
        );
        // both scopes get the same (highest) address back after release
        assert_eq!(asm.curr_section().output, vec![0x4f, 0x4f]);
    }

    #[test]
    fn mx_sets_both_width_flags() {
        let mut asm = Assembler::with_syntax(Syntax::Merlin);
        asm.set_syntax(Syntax::Merlin);
        let status = asm.apply_directive(Directive::Mx, "%11", 0);
        assert_eq!(status, StatusCode::Ok);
        assert!(!asm.accumulator_16bit);
        assert!(!asm.index_reg_16bit);
        let status = asm.apply_directive(Directive::Mx, "%00", 0);
        assert_eq!(status, StatusCode::Ok);
        assert!(asm.accumulator_16bit);
        assert!(asm.index_reg_16bit);
    }

    #[test]
    fn a16_widens_immediates_until_a8() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "cpu 65816\norg $1000\na16\nlda #$1234\na8\nlda #$12\n",
        );
        assert_eq!(
            asm.curr_section().output,
            vec![0xa9, 0x34, 0x12, 0xa9, 0x12]
        );
    }

    #[test]
    fn dummy_section_advances_without_bytes() {
        let mut asm = Assembler::new();
        run(
            &mut asm,
            "org $1000\ndummy $c000\nvar1:\nds 2\nvar2:\ndummy_end\nbyte <var2\n",
        );
        assert_eq!(asm.labels["var2"].value, 0xc002);
        assert_eq!(asm.curr_section().output, vec![0x02]);
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Addressing-mode disambiguation and opcode emission.
//!
//! The operand text, together with the instruction's allowed-mode mask,
//! picks one addressing mode; the opcode byte comes straight out of the CPU
//! table. Values that fit the zero page demote absolute modes, 65816
//! immediates widen with the accumulator/index flags, and anything that
//! cannot evaluate yet is queued as a late eval of the appropriate width.

use crate::core::status::{AsmResult, StatusCode};
use crate::cpu::{
    AddrMode, AMM_ABS_L, AMM_ABS_L_X, AMM_ACC, AMM_BLK_MOV, AMM_BRANCH, AMM_BRANCH_L,
    AMM_IMM_DBL_A, AMM_IMM_DBL_XY, AMM_NON, AMM_REL, AMM_REL_X, AMM_ZP, AMM_ZP_REL,
    AMM_ZP_REL_L, AMM_ZP_REL_X, AMM_ZP_X, AMM_ZP_Y_REL, AMC_BBR, AMM_BRA,
};

use super::eval::{len_hex, EvalResult, RelativeRef};
use super::{Assembler, LateEvalKind, Syntax};

/// How an instruction argument is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeArg {
    None,
    OneByte,
    TwoBytes,
    ThreeBytes,
    /// 8 bit relative address.
    Branch,
    /// 16 bit relative address.
    Branch16,
    /// A zero-page byte followed by an 8 bit branch (`bbr`/`bbs`).
    ByteBranch,
    /// Two separate byte values (`mvp`/`mvn`).
    TwoArgBytes,
}

/// Split a `(...)`/`[...]` block off the front of `line`; returns the
/// inner text and the remainder after the closing delimiter.
fn scoped_block(line: &str) -> Option<(&str, &str)> {
    let open = line.chars().next()?;
    let close = match open {
        '(' => ')',
        '[' => ']',
        _ => return None,
    };
    let mut depth = 0usize;
    for (at, c) in line.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some((&line[1..at], &line[at + 1..]));
            }
        }
    }
    None
}

impl Assembler {
    /// Make an educated guess at the intended addressing mode from an
    /// opcode argument. Returns the mode, the immediate-width override from
    /// a `.b`/`.w` style prefix, whether `.a` forced absolute, and the
    /// expression substring.
    fn get_address_mode<'a>(
        &self,
        mut line: &'a str,
        flip_xy: bool,
        valid_modes: u32,
    ) -> AsmResult<(AddrMode, i32, bool, &'a str)> {
        let mut force_zp = false;
        let mut force_24 = false;
        let mut force_abs = false;
        let mut len = 0i32;
        let mut expression: &str = "";

        loop {
            line = line.trim_start();
            let first = line.chars().next();
            match first {
                None => return Ok((AddrMode::Non, len, force_abs, expression)),
                Some(c @ ('[' | '('))
                    if !force_abs
                        && (c == '['
                            || valid_modes
                                & (AMM_REL | AMM_REL_X | AMM_ZP_REL_X | AMM_ZP_Y_REL)
                                != 0) =>
                {
                    let (deco, after) =
                        scoped_block(line).ok_or(StatusCode::UnexpectedCharacterInAddressingMode)?;
                    let mut mode = if c == '[' {
                        if force_zp {
                            AddrMode::ZpRelL
                        } else {
                            AddrMode::RelL
                        }
                    } else if force_zp {
                        AddrMode::ZpRel
                    } else {
                        AddrMode::Rel
                    };
                    let (expr, index) = match deco.find(',') {
                        Some(at) => (deco[..at].trim(), deco[at + 1..].trim()),
                        None => (deco.trim(), ""),
                    };
                    expression = expr;
                    let after = after.trim_start();
                    if index.starts_with(['x', 'X']) {
                        if c == '[' {
                            return Err(StatusCode::InvalidAddressingMode);
                        }
                        mode = AddrMode::ZpRelX;
                    } else if let Some(tail) = after.strip_prefix(',') {
                        if tail.trim_start().starts_with(['y', 'Y']) {
                            mode = if index.starts_with(['s', 'S']) {
                                AddrMode::StkRelY
                            } else if c == '[' {
                                AddrMode::ZpRelYL
                            } else {
                                AddrMode::ZpYRel
                            };
                        }
                    }
                    return Ok((mode, len, force_abs, expression));
                }
                Some('#') => {
                    return Ok((AddrMode::Imm, len, force_abs, line[1..].trim()));
                }
                Some('.') if line.len() >= 3 && line.as_bytes()[2].is_ascii_whitespace() => {
                    match line.as_bytes()[1].to_ascii_lowercase() {
                        b'z' => {
                            force_zp = true;
                            len = 1;
                        }
                        b'b' => len = 1,
                        b'w' => len = 2,
                        b'l' => {
                            force_24 = true;
                            len = 3;
                        }
                        b'a' => force_abs = true,
                        _ => {
                            let mode = self.absolute_mode(
                                line,
                                flip_xy,
                                force_zp,
                                force_24,
                                &mut expression,
                            )?;
                            return Ok((mode, len, force_abs, expression));
                        }
                    }
                    line = &line[3..];
                    continue;
                }
                Some(_) => {
                    if line.eq_ignore_ascii_case("a") {
                        return Ok((AddrMode::Acc, len, force_abs, expression));
                    }
                    let mode =
                        self.absolute_mode(line, flip_xy, force_zp, force_24, &mut expression)?;
                    return Ok((mode, len, force_abs, expression));
                }
            }
        }
    }

    /// Absolute / zero page / indexed / stack-relative operand shapes.
    fn absolute_mode<'a>(
        &self,
        line: &'a str,
        flip_xy: bool,
        force_zp: bool,
        force_24: bool,
        expression: &mut &'a str,
    ) -> AsmResult<AddrMode> {
        let (expr, index) = match line.find(',') {
            Some(at) => (line[..at].trim(), line[at + 1..].trim()),
            None => (line.trim(), ""),
        };
        *expression = expr;
        let mut mode = if force_24 {
            AddrMode::AbsL
        } else if force_zp {
            AddrMode::Zp
        } else {
            AddrMode::Abs
        };
        if index.starts_with(['s', 'S']) {
            mode = AddrMode::Stk;
        } else {
            let rel_x = index.starts_with(['x', 'X']);
            let rel_y = index.starts_with(['y', 'Y']);
            if (flip_xy && rel_y) || (!flip_xy && rel_x) {
                mode = if force_24 {
                    AddrMode::AbsLX
                } else if force_zp {
                    AddrMode::ZpX
                } else {
                    AddrMode::AbsX
                };
            } else if (flip_xy && rel_x) || (!flip_xy && rel_y) {
                if force_zp {
                    return Err(StatusCode::InstructionNotZp);
                }
                mode = AddrMode::AbsY;
            }
        }
        Ok(mode)
    }

    /// Assemble one instruction: pick the mode, emit the opcode byte and
    /// operand bytes, queueing relocations and late evals as needed.
    pub fn add_opcode(&mut self, line: &str, index: usize) -> AsmResult<()> {
        let entry = self.opcodes.entry(index).clone();
        let valid_modes = entry.modes;
        let line = line.trim();

        let mut op_param = 0i32;
        let mut force_abs = false;
        let mut second_arg: &str = "";
        let (mut addr_mode, expression) = match valid_modes {
            m if m == AMC_BBR => {
                // zero page byte, comma, branch target
                let Some(at) = line.find(',') else {
                    return Err(StatusCode::InvalidAddressingMode);
                };
                let expr = line[..at].trim();
                second_arg = line[at + 1..].trim();
                if expr.is_empty() || second_arg.is_empty() {
                    return Err(StatusCode::InvalidAddressingMode);
                }
                (AddrMode::ZpAbs, expr)
            }
            m if m == AMM_BRA => (AddrMode::Abs, line),
            m if m == AMM_ACC || m == (AMM_ACC | AMM_NON) || m == AMM_NON => {
                (AddrMode::Non, "")
            }
            m if m == AMM_BLK_MOV => {
                let at = line.find(',').unwrap_or(line.len());
                second_arg = line.get(at + 1..).unwrap_or("").trim();
                (AddrMode::BlkMov, line[..at].trim())
            }
            _ => {
                let (mode, param, forced, expr) = self.get_address_mode(
                    line,
                    valid_modes & crate::cpu::AMM_FLIPXY != 0,
                    valid_modes,
                )?;
                op_param = param;
                force_abs = forced;
                (mode, expr)
            }
        };

        let mut value = 0i32;
        let mut relative: Option<RelativeRef> = None;
        let mut eval_later = false;
        if !expression.is_empty() {
            let mut etx = self.eval_ctx();
            if valid_modes & (AMM_BRANCH | AMM_BRANCH_L) != 0 {
                etx.relative_section = self.section_id();
            }
            match self.eval_expression(expression, &etx) {
                Ok(EvalResult::Value(v)) => value = v,
                Ok(EvalResult::Relative(v, rel)) => {
                    value = v;
                    relative = Some(rel);
                }
                Err(StatusCode::NotReady) | Err(StatusCode::XrefDependent) => eval_later = true,
                Err(err) => return Err(err),
            }
        }

        // demote absolute to zero page when the value fits and a zero page
        // variant is permitted
        let zp_relative_ok = relative.map_or(true, |rel| {
            rel.section >= 0
                && self.sections[rel.section as usize].section_type
                    == crate::core::section::SectionType::Zeropage
        });
        if !eval_later && !force_abs && (0..0x100).contains(&value) && zp_relative_ok {
            match addr_mode {
                AddrMode::Abs => {
                    if valid_modes & AMM_ZP != 0 {
                        addr_mode = AddrMode::Zp;
                    } else if valid_modes & AMM_ABS_L != 0 {
                        addr_mode = AddrMode::AbsL;
                    }
                }
                AddrMode::AbsX => {
                    if valid_modes & AMM_ZP_X != 0 {
                        addr_mode = AddrMode::ZpX;
                    } else if valid_modes & AMM_ABS_L_X != 0 {
                        addr_mode = AddrMode::AbsLX;
                    }
                }
                _ => {}
            }
        }

        // an explicit hex literal of more than 4 digits forces a long mode
        if let Some(hex) = expression.strip_prefix('$') {
            if len_hex(hex) > 4 {
                if addr_mode == AddrMode::Abs && valid_modes & AMM_ABS_L != 0 {
                    addr_mode = AddrMode::AbsL;
                } else if addr_mode == AddrMode::AbsX && valid_modes & AMM_ABS_L_X != 0 {
                    addr_mode = AddrMode::AbsLX;
                }
            }
        }

        if valid_modes & addr_mode.mask() == 0 {
            addr_mode = if addr_mode == AddrMode::ZpRelX && valid_modes & AMM_REL_X != 0 {
                AddrMode::RelX
            } else if addr_mode == AddrMode::Rel && valid_modes & AMM_ZP_REL != 0 {
                AddrMode::ZpRel
            } else if addr_mode == AddrMode::Abs && valid_modes & AMM_ABS_L != 0 {
                AddrMode::AbsL
            } else if addr_mode == AddrMode::AbsX && valid_modes & AMM_ABS_L_X != 0 {
                AddrMode::AbsLX
            } else if addr_mode == AddrMode::RelL && valid_modes & AMM_ZP_REL_L != 0 {
                AddrMode::ZpRelL
            } else if self.syntax == Syntax::Merlin
                && addr_mode == AddrMode::Imm
                && valid_modes == crate::cpu::AMM_ABS
            {
                // Merlin allows # on data declarations
                AddrMode::Abs
            } else if self.syntax == Syntax::Merlin
                && addr_mode == AddrMode::Abs
                && valid_modes == AMM_ZP_REL
            {
                AddrMode::ZpRel
            } else {
                return Err(StatusCode::InvalidAddressingMode);
            };
        }

        let opcode = entry.codes[addr_mode.index()];
        self.curr_section_mut().add_byte(opcode as i32);

        let code_arg = if valid_modes & AMM_BRANCH_L != 0 {
            CodeArg::Branch16
        } else if valid_modes & AMM_BRANCH != 0 {
            CodeArg::Branch
        } else {
            match addr_mode {
                AddrMode::ZpRelX
                | AddrMode::Zp
                | AddrMode::ZpYRel
                | AddrMode::ZpX
                | AddrMode::ZpRel
                | AddrMode::ZpRelL
                | AddrMode::ZpRelYL
                | AddrMode::Stk
                | AddrMode::StkRelY => CodeArg::OneByte,
                AddrMode::AbsY
                | AddrMode::AbsX
                | AddrMode::Abs
                | AddrMode::Rel
                | AddrMode::RelX
                | AddrMode::RelL => CodeArg::TwoBytes,
                AddrMode::AbsL | AddrMode::AbsLX => CodeArg::ThreeBytes,
                AddrMode::ZpAbs => CodeArg::ByteBranch,
                AddrMode::BlkMov => CodeArg::TwoArgBytes,
                AddrMode::Imm => {
                    let doubles = valid_modes & (AMM_IMM_DBL_A | AMM_IMM_DBL_XY) != 0;
                    if op_param != 0 && doubles {
                        if op_param == 2 {
                            CodeArg::TwoBytes
                        } else {
                            CodeArg::OneByte
                        }
                    } else if doubles
                        && expression.starts_with('$')
                        && len_hex(&expression[1..]) == 4
                    {
                        // an explicit 4-digit literal forces a 16 bit immediate
                        CodeArg::TwoBytes
                    } else if (valid_modes & AMM_IMM_DBL_A != 0 && self.accumulator_16bit)
                        || (valid_modes & AMM_IMM_DBL_XY != 0 && self.index_reg_16bit)
                    {
                        CodeArg::TwoBytes
                    } else {
                        CodeArg::OneByte
                    }
                }
                AddrMode::Acc | AddrMode::Non => CodeArg::None,
            }
        };

        let scope_pc = self.scope_address[self.scope_depth as usize];
        match code_arg {
            CodeArg::None => {}
            CodeArg::OneByte => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(offs, pc, scope_pc, expression, LateEvalKind::Byte);
                } else if let Some(rel) = relative {
                    let offs = self.curr_section().data_offset();
                    self.curr_section_mut()
                        .add_reloc(rel.base, offs, rel.section, 1, rel.shift);
                }
                self.curr_section_mut().add_byte(value);
            }
            CodeArg::TwoBytes => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(offs, pc, scope_pc, expression, LateEvalKind::AbsRef);
                } else if let Some(rel) = relative {
                    let offs = self.curr_section().data_offset();
                    self.curr_section_mut()
                        .add_reloc(rel.base, offs, rel.section, 2, rel.shift);
                    value = 0;
                }
                self.curr_section_mut().add_word(value);
            }
            CodeArg::ThreeBytes => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(
                        offs,
                        pc,
                        scope_pc,
                        expression,
                        LateEvalKind::AbsLRef,
                    );
                } else if let Some(rel) = relative {
                    let offs = self.curr_section().data_offset();
                    self.curr_section_mut()
                        .add_reloc(rel.base, offs, rel.section, 3, rel.shift);
                    value = 0;
                }
                self.curr_section_mut().add_triple(value);
            }
            CodeArg::TwoArgBytes => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(offs, pc, scope_pc, expression, LateEvalKind::Byte);
                } else if let Some(rel) = relative {
                    let offs = self.curr_section().data_offset();
                    self.curr_section_mut()
                        .add_reloc(rel.base, offs, rel.section, 1, rel.shift);
                }
                self.curr_section_mut().add_byte(value);
                let mut etx = self.eval_ctx();
                etx.pc = self.curr_section().pc() - 2;
                let mut second = 0i32;
                match self.eval_expression(second_arg, &etx) {
                    Ok(result) => second = result.value(),
                    Err(StatusCode::NotReady) | Err(StatusCode::XrefDependent) => {
                        let offs = self.curr_section().data_offset();
                        let pc = self.curr_section().pc();
                        self.add_late_eval_target(
                            offs,
                            pc,
                            scope_pc,
                            second_arg,
                            LateEvalKind::Byte,
                        );
                    }
                    Err(err) => return Err(err),
                }
                self.curr_section_mut().add_byte(second);
            }
            CodeArg::Branch => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(offs, pc, scope_pc, expression, LateEvalKind::Branch);
                    self.curr_section_mut().add_byte(0);
                } else {
                    let disp = value - self.curr_section().pc() - 1;
                    self.curr_section_mut().add_byte(disp);
                    if !(-128..=127).contains(&disp) {
                        return Err(StatusCode::BranchOutOfRange);
                    }
                }
            }
            CodeArg::Branch16 => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(
                        offs,
                        pc,
                        scope_pc,
                        expression,
                        LateEvalKind::Branch16,
                    );
                    self.curr_section_mut().add_word(0);
                } else {
                    let disp = value - (self.curr_section().pc() + 2);
                    self.curr_section_mut().add_word(disp);
                }
            }
            CodeArg::ByteBranch => {
                if eval_later {
                    let offs = self.curr_section().data_offset();
                    let pc = self.curr_section().pc();
                    self.add_late_eval_target(offs, pc, scope_pc, expression, LateEvalKind::Byte);
                } else if let Some(rel) = relative {
                    let offs = self.curr_section().data_offset();
                    self.curr_section_mut()
                        .add_reloc(rel.base, offs, rel.section, 1, rel.shift);
                }
                self.curr_section_mut().add_byte(value);
                let mut etx = self.eval_ctx();
                etx.pc = self.curr_section().pc() - 2;
                etx.relative_section = self.section_id();
                match self.eval_expression(second_arg, &etx) {
                    Ok(result) => {
                        let disp = result.value() - self.curr_section().pc() - 1;
                        self.curr_section_mut().add_byte(disp);
                        if !(-128..=127).contains(&disp) {
                            return Err(StatusCode::BranchOutOfRange);
                        }
                    }
                    Err(StatusCode::NotReady) | Err(StatusCode::XrefDependent) => {
                        let offs = self.curr_section().data_offset();
                        let pc = self.curr_section().pc();
                        self.add_late_eval_target(
                            offs,
                            pc,
                            scope_pc,
                            second_arg,
                            LateEvalKind::Branch,
                        );
                        self.curr_section_mut().add_byte(0);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Assembler, Syntax};
    use crate::core::status::StatusCode;
    use crate::cpu::CpuIndex;

    fn assemble_one(asm: &mut Assembler, mnemonic: &str, operand: &str) -> Vec<u8> {
        let index = asm.opcodes.lookup(mnemonic).expect("mnemonic");
        let before = asm.curr_section().size();
        asm.add_opcode(operand, index)
            .unwrap_or_else(|err| panic!("{mnemonic} {operand}: {err:?}"));
        asm.curr_section().output[before..].to_vec()
    }

    #[test]
    fn immediate_and_absolute_and_zero_page() {
        let mut asm = Assembler::new();
        assert_eq!(assemble_one(&mut asm, "lda", "#$12"), vec![0xa9, 0x12]);
        assert_eq!(
            assemble_one(&mut asm, "lda", "$1234"),
            vec![0xad, 0x34, 0x12]
        );
        // a value in the zero page demotes from absolute
        assert_eq!(assemble_one(&mut asm, "lda", "$12"), vec![0xa5, 0x12]);
        assert_eq!(assemble_one(&mut asm, "lda", "$12,x"), vec![0xb5, 0x12]);
        assert_eq!(
            assemble_one(&mut asm, "lda", "$1234,y"),
            vec![0xb9, 0x34, 0x12]
        );
    }

    #[test]
    fn indirect_modes() {
        let mut asm = Assembler::new();
        assert_eq!(assemble_one(&mut asm, "lda", "($12,x)"), vec![0xa1, 0x12]);
        assert_eq!(assemble_one(&mut asm, "lda", "($12),y"), vec![0xb1, 0x12]);
        assert_eq!(
            assemble_one(&mut asm, "jmp", "($1234)"),
            vec![0x6c, 0x34, 0x12]
        );
    }

    #[test]
    fn accumulator_and_implied() {
        let mut asm = Assembler::new();
        assert_eq!(assemble_one(&mut asm, "asl", "A"), vec![0x0a]);
        assert_eq!(assemble_one(&mut asm, "asl", ""), vec![0x0a]);
        assert_eq!(assemble_one(&mut asm, "nop", ""), vec![0xea]);
    }

    #[test]
    fn ldx_sty_flip_index_registers() {
        let mut asm = Assembler::new();
        // stx accepts ,y where other instructions accept ,x
        assert_eq!(assemble_one(&mut asm, "stx", "$12,y"), vec![0x96, 0x12]);
        assert_eq!(
            assemble_one(&mut asm, "ldx", "$1234,y"),
            vec![0xbe, 0x34, 0x12]
        );
    }

    #[test]
    fn length_overrides() {
        let mut asm = Assembler::new();
        // .a forces absolute even though the value fits the zero page
        assert_eq!(
            assemble_one(&mut asm, "lda", ".a $12"),
            vec![0xad, 0x12, 0x00]
        );
        let mut asm816 = Assembler::new();
        asm816.set_cpu(CpuIndex::Cpu65816);
        assert_eq!(
            assemble_one(&mut asm816, "lda", ".l $1234"),
            vec![0xaf, 0x34, 0x12, 0x00]
        );
    }

    #[test]
    fn branches_resolve_and_range_check() {
        let mut asm = Assembler::new();
        asm.curr_section_mut().address = 0x1000;
        // branch to *+2 is displacement 0
        assert_eq!(assemble_one(&mut asm, "beq", "$1004"), vec![0xf0, 0x02]);
        let index = asm.opcodes.lookup("bne").unwrap();
        assert_eq!(
            asm.add_opcode("$2000", index),
            Err(StatusCode::BranchOutOfRange)
        );
    }

    #[test]
    fn forward_branch_queues_late_eval() {
        let mut asm = Assembler::new();
        assert_eq!(assemble_one(&mut asm, "beq", "later"), vec![0xf0, 0x00]);
        assert_eq!(asm.late_evals.len(), 1);
        assert_eq!(
            asm.late_evals[0].kind,
            super::super::LateEvalKind::Branch
        );
    }

    #[test]
    fn wrong_mode_is_rejected() {
        let mut asm = Assembler::new();
        let index = asm.opcodes.lookup("stx").unwrap();
        assert_eq!(
            asm.add_opcode("#$12", index),
            Err(StatusCode::InvalidAddressingMode)
        );
        let jsr = asm.opcodes.lookup("jsr").unwrap();
        assert_eq!(
            asm.add_opcode("#$12", jsr),
            Err(StatusCode::InvalidAddressingMode)
        );
    }

    #[test]
    fn accumulator_width_drives_immediate_size() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65816);
        assert_eq!(assemble_one(&mut asm, "lda", "#$12"), vec![0xa9, 0x12]);
        asm.accumulator_16bit = true;
        assert_eq!(
            assemble_one(&mut asm, "lda", "#$1234"),
            vec![0xa9, 0x34, 0x12]
        );
        // index register width is independent
        assert_eq!(assemble_one(&mut asm, "ldx", "#$12"), vec![0xa2, 0x12]);
        asm.index_reg_16bit = true;
        assert_eq!(
            assemble_one(&mut asm, "ldx", "#$0012"),
            vec![0xa2, 0x12, 0x00]
        );
    }

    #[test]
    fn explicit_four_digit_immediate_forces_two_bytes() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65816);
        // a8, but the 4-digit literal still emits the high byte
        assert_eq!(
            assemble_one(&mut asm, "lda", "#$1234"),
            vec![0xa9, 0x34, 0x12]
        );
        // plain 6502 immediates never widen
        let mut asm02 = Assembler::new();
        assert_eq!(
            assemble_one(&mut asm02, "lda", "#$1234"),
            vec![0xa9, 0x34]
        );
    }

    #[test]
    fn long_hex_literal_selects_long_mode() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65816);
        assert_eq!(
            assemble_one(&mut asm, "lda", "$012345"),
            vec![0xaf, 0x45, 0x23, 0x01]
        );
        assert_eq!(
            assemble_one(&mut asm, "lda", "$012345,x"),
            vec![0xbf, 0x45, 0x23, 0x01]
        );
    }

    #[test]
    fn stack_relative_modes() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65816);
        assert_eq!(assemble_one(&mut asm, "lda", "$12,s"), vec![0xa3, 0x12]);
        assert_eq!(
            assemble_one(&mut asm, "lda", "($12,s),y"),
            vec![0xb3, 0x12]
        );
        assert_eq!(assemble_one(&mut asm, "lda", "[$12]"), vec![0xa7, 0x12]);
        assert_eq!(assemble_one(&mut asm, "lda", "[$12],y"), vec![0xb7, 0x12]);
    }

    #[test]
    fn block_move_takes_two_bytes() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65816);
        assert_eq!(
            assemble_one(&mut asm, "mvn", "$01,$02"),
            vec![0x54, 0x01, 0x02]
        );
    }

    #[test]
    fn byte_branch_family() {
        let mut asm = Assembler::new();
        asm.set_cpu(CpuIndex::Cpu65C02Wdc);
        asm.curr_section_mut().address = 0x1000;
        // bbr0 $12, *+3 : displacement 0
        assert_eq!(
            assemble_one(&mut asm, "bbr0", "$12, $1003"),
            vec![0x0f, 0x12, 0x00]
        );
    }

    #[test]
    fn merlin_accepts_immediate_on_absolute_only() {
        let mut asm = Assembler::with_syntax(Syntax::Merlin);
        asm.set_syntax(Syntax::Merlin);
        // jsr only takes absolute; Merlin sources write # anyway
        assert_eq!(
            assemble_one(&mut asm, "jsr", "#$1234"),
            vec![0x20, 0x34, 0x12]
        );
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! WDC 65C02 opcode table.
//!
//! The WDC-specific instructions (`stp`, `wai`, the `bbr`/`bbs` family) are
//! the final [`NUM_WDC_65C02_SPECIFIC_OPS`] entries so the plain 65C02
//! table is a prefix of the full one.
//!
//! References: <http://6502.org/tutorials/65c02opcodes.html>,
//! <http://www.oxyron.de/html/opcodesc02.html>

use super::AddrMode::*;
use super::{
    Mnemonic, AMC_BBR, AMC_BIT, AMC_DEC, AMC_JMP, AMC_ORA, AMC_STA, AMC_STZ, AMC_TRB, AMM_ABS,
    AMM_ASL, AMM_BRA, AMM_CPY, AMM_LDX, AMM_LDY, AMM_NON, AMM_STX, AMM_STY,
};

pub const NUM_WDC_65C02_SPECIFIC_OPS: usize = 18;

#[rustfmt::skip]
pub const OPCODES_65C02: &[Mnemonic] = &[
    Mnemonic { name: "brk", modes: AMM_NON, codes: &[(Non, 0x00)] },
    Mnemonic { name: "jsr", modes: AMM_ABS, codes: &[(Abs, 0x20)] },
    Mnemonic { name: "rti", modes: AMM_NON, codes: &[(Non, 0x40)] },
    Mnemonic { name: "rts", modes: AMM_NON, codes: &[(Non, 0x60)] },
    Mnemonic { name: "ora", modes: AMC_ORA, codes: &[(ZpRelX, 0x01), (Zp, 0x05), (Imm, 0x09), (Abs, 0x0d), (ZpYRel, 0x11), (ZpX, 0x15), (AbsY, 0x19), (AbsX, 0x1d), (ZpRel, 0x12)] },
    Mnemonic { name: "and", modes: AMC_ORA, codes: &[(ZpRelX, 0x21), (Zp, 0x25), (Imm, 0x29), (Abs, 0x2d), (ZpYRel, 0x31), (ZpX, 0x35), (AbsY, 0x39), (AbsX, 0x3d), (ZpRel, 0x32)] },
    Mnemonic { name: "eor", modes: AMC_ORA, codes: &[(ZpRelX, 0x41), (Zp, 0x45), (Imm, 0x49), (Abs, 0x4d), (ZpYRel, 0x51), (ZpX, 0x55), (AbsY, 0x59), (AbsX, 0x5d), (ZpRel, 0x52)] },
    Mnemonic { name: "adc", modes: AMC_ORA, codes: &[(ZpRelX, 0x61), (Zp, 0x65), (Imm, 0x69), (Abs, 0x6d), (ZpYRel, 0x71), (ZpX, 0x75), (AbsY, 0x79), (AbsX, 0x7d), (ZpRel, 0x72)] },
    Mnemonic { name: "sta", modes: AMC_STA, codes: &[(ZpRelX, 0x81), (Zp, 0x85), (Abs, 0x8d), (ZpYRel, 0x91), (ZpX, 0x95), (AbsY, 0x99), (AbsX, 0x9d), (ZpRel, 0x92)] },
    Mnemonic { name: "lda", modes: AMC_ORA, codes: &[(ZpRelX, 0xa1), (Zp, 0xa5), (Imm, 0xa9), (Abs, 0xad), (ZpYRel, 0xb1), (ZpX, 0xb5), (AbsY, 0xb9), (AbsX, 0xbd), (ZpRel, 0xb2)] },
    Mnemonic { name: "cmp", modes: AMC_ORA, codes: &[(ZpRelX, 0xc1), (Zp, 0xc5), (Imm, 0xc9), (Abs, 0xcd), (ZpYRel, 0xd1), (ZpX, 0xd5), (AbsY, 0xd9), (AbsX, 0xdd), (ZpRel, 0xd2)] },
    Mnemonic { name: "sbc", modes: AMC_ORA, codes: &[(ZpRelX, 0xe1), (Zp, 0xe5), (Imm, 0xe9), (Abs, 0xed), (ZpYRel, 0xf1), (ZpX, 0xf5), (AbsY, 0xf9), (AbsX, 0xfd), (ZpRel, 0xf2)] },
    Mnemonic { name: "asl", modes: AMM_ASL, codes: &[(Zp, 0x06), (Abs, 0x0e), (ZpX, 0x16), (AbsX, 0x1e), (Acc, 0x0a), (Non, 0x0a)] },
    Mnemonic { name: "rol", modes: AMM_ASL, codes: &[(Zp, 0x26), (Abs, 0x2e), (ZpX, 0x36), (AbsX, 0x3e), (Acc, 0x2a), (Non, 0x2a)] },
    Mnemonic { name: "lsr", modes: AMM_ASL, codes: &[(Zp, 0x46), (Abs, 0x4e), (ZpX, 0x56), (AbsX, 0x5e), (Acc, 0x4a), (Non, 0x4a)] },
    Mnemonic { name: "ror", modes: AMM_ASL, codes: &[(Zp, 0x66), (Abs, 0x6e), (ZpX, 0x76), (AbsX, 0x7e), (Acc, 0x6a), (Non, 0x6a)] },
    Mnemonic { name: "stx", modes: AMM_STX, codes: &[(Zp, 0x86), (Abs, 0x8e), (ZpX, 0x96)] },
    Mnemonic { name: "ldx", modes: AMM_LDX, codes: &[(Zp, 0xa6), (Imm, 0xa2), (Abs, 0xae), (ZpX, 0xb6), (AbsX, 0xbe)] },
    Mnemonic { name: "dec", modes: AMC_DEC, codes: &[(Zp, 0xc6), (Abs, 0xce), (ZpX, 0xd6), (AbsX, 0xde), (Acc, 0x3a), (Non, 0x3a)] },
    Mnemonic { name: "inc", modes: AMC_DEC, codes: &[(Zp, 0xe6), (Abs, 0xee), (ZpX, 0xf6), (AbsX, 0xfe), (Acc, 0x1a), (Non, 0x1a)] },
    Mnemonic { name: "dea", modes: AMM_NON, codes: &[(Non, 0x3a)] },
    Mnemonic { name: "ina", modes: AMM_NON, codes: &[(Non, 0x1a)] },
    Mnemonic { name: "php", modes: AMM_NON, codes: &[(Non, 0x08)] },
    Mnemonic { name: "plp", modes: AMM_NON, codes: &[(Non, 0x28)] },
    Mnemonic { name: "pha", modes: AMM_NON, codes: &[(Non, 0x48)] },
    Mnemonic { name: "pla", modes: AMM_NON, codes: &[(Non, 0x68)] },
    Mnemonic { name: "phy", modes: AMM_NON, codes: &[(Non, 0x5a)] },
    Mnemonic { name: "ply", modes: AMM_NON, codes: &[(Non, 0x7a)] },
    Mnemonic { name: "phx", modes: AMM_NON, codes: &[(Non, 0xda)] },
    Mnemonic { name: "plx", modes: AMM_NON, codes: &[(Non, 0xfa)] },
    Mnemonic { name: "dey", modes: AMM_NON, codes: &[(Non, 0x88)] },
    Mnemonic { name: "tay", modes: AMM_NON, codes: &[(Non, 0xa8)] },
    Mnemonic { name: "iny", modes: AMM_NON, codes: &[(Non, 0xc8)] },
    Mnemonic { name: "inx", modes: AMM_NON, codes: &[(Non, 0xe8)] },
    Mnemonic { name: "bpl", modes: AMM_BRA, codes: &[(Abs, 0x10)] },
    Mnemonic { name: "bmi", modes: AMM_BRA, codes: &[(Abs, 0x30)] },
    Mnemonic { name: "bvc", modes: AMM_BRA, codes: &[(Abs, 0x50)] },
    Mnemonic { name: "bvs", modes: AMM_BRA, codes: &[(Abs, 0x70)] },
    Mnemonic { name: "bra", modes: AMM_BRA, codes: &[(Abs, 0x80)] },
    Mnemonic { name: "bcc", modes: AMM_BRA, codes: &[(Abs, 0x90)] },
    Mnemonic { name: "bcs", modes: AMM_BRA, codes: &[(Abs, 0xb0)] },
    Mnemonic { name: "bne", modes: AMM_BRA, codes: &[(Abs, 0xd0)] },
    Mnemonic { name: "beq", modes: AMM_BRA, codes: &[(Abs, 0xf0)] },
    Mnemonic { name: "clc", modes: AMM_NON, codes: &[(Non, 0x18)] },
    Mnemonic { name: "sec", modes: AMM_NON, codes: &[(Non, 0x38)] },
    Mnemonic { name: "cli", modes: AMM_NON, codes: &[(Non, 0x58)] },
    Mnemonic { name: "sei", modes: AMM_NON, codes: &[(Non, 0x78)] },
    Mnemonic { name: "tya", modes: AMM_NON, codes: &[(Non, 0x98)] },
    Mnemonic { name: "clv", modes: AMM_NON, codes: &[(Non, 0xb8)] },
    Mnemonic { name: "cld", modes: AMM_NON, codes: &[(Non, 0xd8)] },
    Mnemonic { name: "sed", modes: AMM_NON, codes: &[(Non, 0xf8)] },
    Mnemonic { name: "bit", modes: AMC_BIT, codes: &[(Zp, 0x24), (Imm, 0x89), (Abs, 0x2c), (ZpX, 0x34), (AbsX, 0x3c)] },
    Mnemonic { name: "stz", modes: AMC_STZ, codes: &[(Zp, 0x64), (Abs, 0x9c), (ZpX, 0x74), (AbsX, 0x9e)] },
    Mnemonic { name: "trb", modes: AMC_TRB, codes: &[(Zp, 0x14), (Abs, 0x1c)] },
    Mnemonic { name: "tsb", modes: AMC_TRB, codes: &[(Zp, 0x04), (Abs, 0x0c)] },
    Mnemonic { name: "jmp", modes: AMC_JMP, codes: &[(Abs, 0x4c), (Rel, 0x6c), (RelX, 0x7c)] },
    Mnemonic { name: "sty", modes: AMM_STY, codes: &[(Zp, 0x84), (Abs, 0x8c), (ZpX, 0x94)] },
    Mnemonic { name: "ldy", modes: AMM_LDY, codes: &[(Zp, 0xa4), (Imm, 0xa0), (Abs, 0xac), (ZpX, 0xb4), (AbsX, 0xbc)] },
    Mnemonic { name: "cpy", modes: AMM_CPY, codes: &[(Zp, 0xc4), (Imm, 0xc0), (Abs, 0xcc)] },
    Mnemonic { name: "cpx", modes: AMM_CPY, codes: &[(Zp, 0xe4), (Imm, 0xe0), (Abs, 0xec)] },
    Mnemonic { name: "txa", modes: AMM_NON, codes: &[(Non, 0x8a)] },
    Mnemonic { name: "txs", modes: AMM_NON, codes: &[(Non, 0x9a)] },
    Mnemonic { name: "tax", modes: AMM_NON, codes: &[(Non, 0xaa)] },
    Mnemonic { name: "tsx", modes: AMM_NON, codes: &[(Non, 0xba)] },
    Mnemonic { name: "dex", modes: AMM_NON, codes: &[(Non, 0xca)] },
    Mnemonic { name: "nop", modes: AMM_NON, codes: &[(Non, 0xea)] },

    // WDC specific
    Mnemonic { name: "stp", modes: AMM_NON, codes: &[(Non, 0xdb)] },
    Mnemonic { name: "wai", modes: AMM_NON, codes: &[(Non, 0xcb)] },
    Mnemonic { name: "bbr0", modes: AMC_BBR, codes: &[(ZpAbs, 0x0f)] },
    Mnemonic { name: "bbr1", modes: AMC_BBR, codes: &[(ZpAbs, 0x1f)] },
    Mnemonic { name: "bbr2", modes: AMC_BBR, codes: &[(ZpAbs, 0x2f)] },
    Mnemonic { name: "bbr3", modes: AMC_BBR, codes: &[(ZpAbs, 0x3f)] },
    Mnemonic { name: "bbr4", modes: AMC_BBR, codes: &[(ZpAbs, 0x4f)] },
    Mnemonic { name: "bbr5", modes: AMC_BBR, codes: &[(ZpAbs, 0x5f)] },
    Mnemonic { name: "bbr6", modes: AMC_BBR, codes: &[(ZpAbs, 0x6f)] },
    Mnemonic { name: "bbr7", modes: AMC_BBR, codes: &[(ZpAbs, 0x7f)] },
    Mnemonic { name: "bbs0", modes: AMC_BBR, codes: &[(ZpAbs, 0x8f)] },
    Mnemonic { name: "bbs1", modes: AMC_BBR, codes: &[(ZpAbs, 0x9f)] },
    Mnemonic { name: "bbs2", modes: AMC_BBR, codes: &[(ZpAbs, 0xaf)] },
    Mnemonic { name: "bbs3", modes: AMC_BBR, codes: &[(ZpAbs, 0xbf)] },
    Mnemonic { name: "bbs4", modes: AMC_BBR, codes: &[(ZpAbs, 0xcf)] },
    Mnemonic { name: "bbs5", modes: AMC_BBR, codes: &[(ZpAbs, 0xdf)] },
    Mnemonic { name: "bbs6", modes: AMC_BBR, codes: &[(ZpAbs, 0xef)] },
    Mnemonic { name: "bbs7", modes: AMC_BBR, codes: &[(ZpAbs, 0xff)] },
];

pub const ALIASES_65C02: &[(&str, &str)] = &[("bcc", "blt"), ("bcs", "bge")];

#[cfg(test)]
mod tests {
    use super::super::AddrMode;
    use super::*;

    #[test]
    fn table_splits_at_the_wdc_boundary() {
        let boundary = OPCODES_65C02.len() - NUM_WDC_65C02_SPECIFIC_OPS;
        assert_eq!(OPCODES_65C02[boundary - 1].name, "nop");
        assert_eq!(OPCODES_65C02[boundary].name, "stp");
    }

    #[test]
    fn zp_indirect_variants_exist_for_the_ora_group() {
        for (name, byte) in [
            ("ora", 0x12), ("and", 0x32), ("eor", 0x52), ("adc", 0x72),
            ("sta", 0x92), ("lda", 0xb2), ("cmp", 0xd2), ("sbc", 0xf2),
        ] {
            let entry = OPCODES_65C02.iter().find(|m| m.name == name).unwrap();
            assert!(
                entry.codes.contains(&(AddrMode::ZpRel, byte)),
                "{name} lacks ($zp) variant"
            );
        }
    }

    #[test]
    fn bbr_bbs_cover_all_bits() {
        let count = OPCODES_65C02
            .iter()
            .filter(|m| m.name.starts_with("bbr") || m.name.starts_with("bbs"))
            .count();
        assert_eq!(count, 16);
    }
}

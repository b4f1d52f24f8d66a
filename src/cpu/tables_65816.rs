// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! WDC 65816 opcode table.
//!
//! References: <http://wiki.superfamicom.org/snes/show/65816+Reference>,
//! <http://www.oxyron.de/html/opcodes816.html>

use super::AddrMode::*;
use super::{
    Mnemonic, AM8_BIT, AM8_BRL, AM8_CPY, AM8_JML, AM8_JMP, AM8_JSL, AM8_JSR, AM8_LDX, AM8_LDY,
    AM8_MVN, AM8_ORA, AM8_ORL, AM8_PEI, AM8_PER, AM8_REP, AM8_STA, AM8_STL, AMC_DEC, AMC_STZ,
    AMC_TRB, AMM_ABS, AMM_ASL, AMM_BRA, AMM_NON, AMM_STX, AMM_STY,
};

#[rustfmt::skip]
pub const OPCODES_65816: &[Mnemonic] = &[
    Mnemonic { name: "brk", modes: AMM_NON, codes: &[(Non, 0x00)] },
    Mnemonic { name: "jsr", modes: AM8_JSR, codes: &[(Abs, 0x20), (RelX, 0xfc), (AbsL, 0x22)] },
    Mnemonic { name: "jsl", modes: AM8_JSL, codes: &[(AbsL, 0x22)] },
    Mnemonic { name: "rti", modes: AMM_NON, codes: &[(Non, 0x40)] },
    Mnemonic { name: "rts", modes: AMM_NON, codes: &[(Non, 0x60)] },
    Mnemonic { name: "rtl", modes: AMM_NON, codes: &[(Non, 0x6b)] },
    Mnemonic { name: "ora", modes: AM8_ORA, codes: &[(ZpRelX, 0x01), (Zp, 0x05), (Imm, 0x09), (Abs, 0x0d), (ZpYRel, 0x11), (ZpX, 0x15), (AbsY, 0x19), (AbsX, 0x1d), (ZpRel, 0x12), (ZpRelL, 0x07), (ZpRelYL, 0x17), (AbsL, 0x0f), (AbsLX, 0x1f), (Stk, 0x03), (StkRelY, 0x13)] },
    Mnemonic { name: "and", modes: AM8_ORA, codes: &[(ZpRelX, 0x21), (Zp, 0x25), (Imm, 0x29), (Abs, 0x2d), (ZpYRel, 0x31), (ZpX, 0x35), (AbsY, 0x39), (AbsX, 0x3d), (ZpRel, 0x32), (ZpRelL, 0x27), (ZpRelYL, 0x37), (AbsL, 0x2f), (AbsLX, 0x3f), (Stk, 0x23), (StkRelY, 0x33)] },
    Mnemonic { name: "eor", modes: AM8_ORA, codes: &[(ZpRelX, 0x41), (Zp, 0x45), (Imm, 0x49), (Abs, 0x4d), (ZpYRel, 0x51), (ZpX, 0x55), (AbsY, 0x59), (AbsX, 0x5d), (ZpRel, 0x52), (ZpRelL, 0x47), (ZpRelYL, 0x57), (AbsL, 0x4f), (AbsLX, 0x5f), (Stk, 0x43), (StkRelY, 0x53)] },
    Mnemonic { name: "adc", modes: AM8_ORA, codes: &[(ZpRelX, 0x61), (Zp, 0x65), (Imm, 0x69), (Abs, 0x6d), (ZpYRel, 0x71), (ZpX, 0x75), (AbsY, 0x79), (AbsX, 0x7d), (ZpRel, 0x72), (ZpRelL, 0x67), (ZpRelYL, 0x77), (AbsL, 0x6f), (AbsLX, 0x7f), (Stk, 0x63), (StkRelY, 0x73)] },
    Mnemonic { name: "sta", modes: AM8_STA, codes: &[(ZpRelX, 0x81), (Zp, 0x85), (Abs, 0x8d), (ZpYRel, 0x91), (ZpX, 0x95), (AbsY, 0x99), (AbsX, 0x9d), (ZpRel, 0x92), (ZpRelL, 0x87), (ZpRelYL, 0x97), (AbsL, 0x8f), (AbsLX, 0x9f), (Stk, 0x83), (StkRelY, 0x93)] },
    Mnemonic { name: "lda", modes: AM8_ORA, codes: &[(ZpRelX, 0xa1), (Zp, 0xa5), (Imm, 0xa9), (Abs, 0xad), (ZpYRel, 0xb1), (ZpX, 0xb5), (AbsY, 0xb9), (AbsX, 0xbd), (ZpRel, 0xb2), (ZpRelL, 0xa7), (ZpRelYL, 0xb7), (AbsL, 0xaf), (AbsLX, 0xbf), (Stk, 0xa3), (StkRelY, 0xb3)] },
    Mnemonic { name: "cmp", modes: AM8_ORA, codes: &[(ZpRelX, 0xc1), (Zp, 0xc5), (Imm, 0xc9), (Abs, 0xcd), (ZpYRel, 0xd1), (ZpX, 0xd5), (AbsY, 0xd9), (AbsX, 0xdd), (ZpRel, 0xd2), (ZpRelL, 0xc7), (ZpRelYL, 0xd7), (AbsL, 0xcf), (AbsLX, 0xdf), (Stk, 0xc3), (StkRelY, 0xd3)] },
    Mnemonic { name: "sbc", modes: AM8_ORA, codes: &[(ZpRelX, 0xe1), (Zp, 0xe5), (Imm, 0xe9), (Abs, 0xed), (ZpYRel, 0xf1), (ZpX, 0xf5), (AbsY, 0xf9), (AbsX, 0xfd), (ZpRel, 0xf2), (ZpRelL, 0xe7), (ZpRelYL, 0xf7), (AbsL, 0xef), (AbsLX, 0xff), (Stk, 0xe3), (StkRelY, 0xf3)] },
    // explicit long-address forms
    Mnemonic { name: "oral", modes: AM8_ORL, codes: &[(AbsL, 0x0f), (AbsLX, 0x1f)] },
    Mnemonic { name: "andl", modes: AM8_ORL, codes: &[(AbsL, 0x2f), (AbsLX, 0x3f)] },
    Mnemonic { name: "eorl", modes: AM8_ORL, codes: &[(AbsL, 0x4f), (AbsLX, 0x5f)] },
    Mnemonic { name: "adcl", modes: AM8_ORL, codes: &[(AbsL, 0x6f), (AbsLX, 0x7f)] },
    Mnemonic { name: "stal", modes: AM8_STL, codes: &[(AbsL, 0x8f), (AbsLX, 0x9f)] },
    Mnemonic { name: "ldal", modes: AM8_ORL, codes: &[(AbsL, 0xaf), (AbsLX, 0xbf)] },
    Mnemonic { name: "cmpl", modes: AM8_ORL, codes: &[(AbsL, 0xcf), (AbsLX, 0xdf)] },
    Mnemonic { name: "sbcl", modes: AM8_ORL, codes: &[(AbsL, 0xef), (AbsLX, 0xff)] },
    Mnemonic { name: "asl", modes: AMM_ASL, codes: &[(Zp, 0x06), (Abs, 0x0e), (ZpX, 0x16), (AbsX, 0x1e), (Acc, 0x0a), (Non, 0x0a)] },
    Mnemonic { name: "rol", modes: AMM_ASL, codes: &[(Zp, 0x26), (Abs, 0x2e), (ZpX, 0x36), (AbsX, 0x3e), (Acc, 0x2a), (Non, 0x2a)] },
    Mnemonic { name: "lsr", modes: AMM_ASL, codes: &[(Zp, 0x46), (Abs, 0x4e), (ZpX, 0x56), (AbsX, 0x5e), (Acc, 0x4a), (Non, 0x4a)] },
    Mnemonic { name: "ror", modes: AMM_ASL, codes: &[(Zp, 0x66), (Abs, 0x6e), (ZpX, 0x76), (AbsX, 0x7e), (Acc, 0x6a), (Non, 0x6a)] },
    Mnemonic { name: "stx", modes: AMM_STX, codes: &[(Zp, 0x86), (Abs, 0x8e), (ZpX, 0x96)] },
    Mnemonic { name: "ldx", modes: AM8_LDX, codes: &[(Zp, 0xa6), (Imm, 0xa2), (Abs, 0xae), (ZpX, 0xb6), (AbsX, 0xbe)] },
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
    Mnemonic { name: "brl", modes: AM8_BRL, codes: &[(Abs, 0x82)] },
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
    Mnemonic { name: "bit", modes: AM8_BIT, codes: &[(Zp, 0x24), (Imm, 0x89), (Abs, 0x2c), (ZpX, 0x34), (AbsX, 0x3c)] },
    Mnemonic { name: "stz", modes: AMC_STZ, codes: &[(Zp, 0x64), (Abs, 0x9c), (ZpX, 0x74), (AbsX, 0x9e)] },
    Mnemonic { name: "trb", modes: AMC_TRB, codes: &[(Zp, 0x14), (Abs, 0x1c)] },
    Mnemonic { name: "tsb", modes: AMC_TRB, codes: &[(Zp, 0x04), (Abs, 0x0c)] },
    Mnemonic { name: "jmp", modes: AM8_JMP, codes: &[(Abs, 0x4c), (Rel, 0x6c), (RelX, 0x7c), (AbsL, 0x5c), (RelL, 0xdc)] },
    Mnemonic { name: "jml", modes: AM8_JML, codes: &[(AbsL, 0x5c), (RelL, 0xdc)] },
    Mnemonic { name: "sty", modes: AMM_STY, codes: &[(Zp, 0x84), (Abs, 0x8c), (ZpX, 0x94)] },
    Mnemonic { name: "ldy", modes: AM8_LDY, codes: &[(Zp, 0xa4), (Imm, 0xa0), (Abs, 0xac), (ZpX, 0xb4), (AbsX, 0xbc)] },
    Mnemonic { name: "cpy", modes: AM8_CPY, codes: &[(Zp, 0xc4), (Imm, 0xc0), (Abs, 0xcc)] },
    Mnemonic { name: "cpx", modes: AM8_CPY, codes: &[(Zp, 0xe4), (Imm, 0xe0), (Abs, 0xec)] },
    Mnemonic { name: "txa", modes: AMM_NON, codes: &[(Non, 0x8a)] },
    Mnemonic { name: "txs", modes: AMM_NON, codes: &[(Non, 0x9a)] },
    Mnemonic { name: "tax", modes: AMM_NON, codes: &[(Non, 0xaa)] },
    Mnemonic { name: "tsx", modes: AMM_NON, codes: &[(Non, 0xba)] },
    Mnemonic { name: "dex", modes: AMM_NON, codes: &[(Non, 0xca)] },
    Mnemonic { name: "nop", modes: AMM_NON, codes: &[(Non, 0xea)] },
    Mnemonic { name: "cop", modes: AMM_NON, codes: &[(Non, 0x02)] },
    Mnemonic { name: "wdm", modes: AMM_NON, codes: &[(Non, 0x42)] },
    Mnemonic { name: "mvp", modes: AM8_MVN, codes: &[(BlkMov, 0x44)] },
    Mnemonic { name: "mvn", modes: AM8_MVN, codes: &[(BlkMov, 0x54)] },
    Mnemonic { name: "pea", modes: AMM_ABS, codes: &[(Abs, 0xf4)] },
    Mnemonic { name: "pei", modes: AM8_PEI, codes: &[(ZpRel, 0xd4)] },
    Mnemonic { name: "per", modes: AM8_PER, codes: &[(Abs, 0x62)] },
    Mnemonic { name: "rep", modes: AM8_REP, codes: &[(Zp, 0xc2), (Imm, 0xc2)] },
    Mnemonic { name: "sep", modes: AM8_REP, codes: &[(Zp, 0xe2), (Imm, 0xe2)] },
    Mnemonic { name: "phd", modes: AMM_NON, codes: &[(Non, 0x0b)] },
    Mnemonic { name: "tcs", modes: AMM_NON, codes: &[(Non, 0x1b)] },
    Mnemonic { name: "pld", modes: AMM_NON, codes: &[(Non, 0x2b)] },
    Mnemonic { name: "tsc", modes: AMM_NON, codes: &[(Non, 0x3b)] },
    Mnemonic { name: "phk", modes: AMM_NON, codes: &[(Non, 0x4b)] },
    Mnemonic { name: "tcd", modes: AMM_NON, codes: &[(Non, 0x5b)] },
    Mnemonic { name: "tdc", modes: AMM_NON, codes: &[(Non, 0x7b)] },
    Mnemonic { name: "phb", modes: AMM_NON, codes: &[(Non, 0x8b)] },
    Mnemonic { name: "txy", modes: AMM_NON, codes: &[(Non, 0x9b)] },
    Mnemonic { name: "plb", modes: AMM_NON, codes: &[(Non, 0xab)] },
    Mnemonic { name: "tyx", modes: AMM_NON, codes: &[(Non, 0xbb)] },
    Mnemonic { name: "wai", modes: AMM_NON, codes: &[(Non, 0xcb)] },
    Mnemonic { name: "stp", modes: AMM_NON, codes: &[(Non, 0xdb)] },
    Mnemonic { name: "xba", modes: AMM_NON, codes: &[(Non, 0xeb)] },
    Mnemonic { name: "xce", modes: AMM_NON, codes: &[(Non, 0xfb)] },
];

pub const ALIASES_65816: &[(&str, &str)] = &[
    ("bcc", "blt"),
    ("bcs", "bge"),
    ("tcs", "tas"),
    ("tsc", "tsa"),
    ("xba", "swa"),
    ("tcd", "tad"),
    ("tdc", "tda"),
];

/// Advisory cycle counts per opcode byte: low nibble packs `base*2 +
/// penalty`, high nibble selects a 16-bit/direct-page adjustment row in
/// [`TIMING_65816_PLUS`].
#[rustfmt::skip]
pub static TIMING_65816: [u8; 256] = [
    0x4e, 0x1c, 0x4e, 0x28, 0x3a, 0x26, 0x3a, 0x1c, 0x46, 0x24, 0x44, 0x48, 0x4c, 0x28, 0x5c, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x3a, 0x18, 0x6c, 0x1c, 0x44, 0x28, 0x44, 0x44, 0x4c, 0x28, 0x5e, 0x2a,
    0x4c, 0x1c, 0x50, 0x28, 0x16, 0x26, 0x3a, 0x1c, 0x48, 0x24, 0x44, 0x4a, 0x28, 0x28, 0x4c, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x18, 0x18, 0x3c, 0x1c, 0x44, 0x28, 0x44, 0x44, 0x28, 0x28, 0x4e, 0x2a,
    0x4c, 0x1c, 0x42, 0x28, 0x42, 0x16, 0x6a, 0x1c, 0x26, 0x24, 0x44, 0x46, 0x46, 0x28, 0x5c, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x42, 0x18, 0x6c, 0x1c, 0x44, 0x28, 0x76, 0x44, 0x48, 0x28, 0x5e, 0x2a,
    0x4c, 0x1c, 0x4c, 0x28, 0x16, 0x26, 0x3a, 0x1c, 0x28, 0x24, 0x44, 0x4c, 0x4a, 0x28, 0x4c, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x28, 0x18, 0x3c, 0x1c, 0x44, 0x28, 0x78, 0x44, 0x4c, 0x28, 0x4e, 0x2a,
    0x46, 0x1c, 0x48, 0x28, 0x86, 0x16, 0x86, 0x1c, 0x44, 0x24, 0x44, 0x46, 0x78, 0x28, 0x78, 0x2a,
    0x44, 0x1c, 0x1a, 0x2e, 0x88, 0x18, 0x88, 0x1c, 0x44, 0x2a, 0x44, 0x44, 0x28, 0x2a, 0x2a, 0x2a,
    0x74, 0x1c, 0x74, 0x28, 0x86, 0x16, 0x86, 0x1c, 0x44, 0x24, 0x44, 0x48, 0x78, 0x28, 0x78, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x88, 0x18, 0x88, 0x1c, 0x44, 0x28, 0x44, 0x44, 0x78, 0x28, 0x78, 0x2a,
    0x74, 0x1c, 0x46, 0x28, 0x86, 0x16, 0x6a, 0x1c, 0x44, 0x24, 0x44, 0x26, 0x78, 0x28, 0x5c, 0x2a,
    0x44, 0x1a, 0x1a, 0x2e, 0x4c, 0x18, 0x6c, 0x1c, 0x44, 0x28, 0x76, 0x46, 0x4c, 0x28, 0x5e, 0x2a,
    0x74, 0x3c, 0x46, 0x48, 0x86, 0x36, 0x6a, 0x3c, 0x44, 0x44, 0x44, 0x46, 0x78, 0x48, 0x5c, 0x4a,
    0x44, 0x3a, 0x3a, 0x4e, 0x4a, 0x38, 0x6c, 0x3c, 0x44, 0x48, 0x78, 0x44, 0x50, 0x48, 0x5e, 0x4a,
];

/// Cycle adjustments selected by the high nibble of a timing byte:
/// `(16-bit accumulator, 16-bit index, direct page non-zero)`.
pub static TIMING_65816_PLUS: [[u8; 3]; 9] = [
    [0, 0, 0],
    [1, 0, 1],
    [1, 0, 0],
    [0, 0, 1],
    [0, 0, 0],
    [2, 0, 0],
    [2, 0, 1],
    [0, 1, 0],
    [0, 1, 1],
];

#[cfg(test)]
mod tests {
    use super::super::AddrMode;
    use super::*;

    #[test]
    fn block_move_instructions_use_two_byte_arguments() {
        let mvp = OPCODES_65816.iter().find(|m| m.name == "mvp").unwrap();
        let mvn = OPCODES_65816.iter().find(|m| m.name == "mvn").unwrap();
        assert_eq!(mvp.codes, &[(AddrMode::BlkMov, 0x44)]);
        assert_eq!(mvn.codes, &[(AddrMode::BlkMov, 0x54)]);
    }

    #[test]
    fn long_address_group_covers_all_accumulator_ops() {
        for (name, byte) in [
            ("oral", 0x0f), ("andl", 0x2f), ("eorl", 0x4f), ("adcl", 0x6f),
            ("stal", 0x8f), ("ldal", 0xaf), ("cmpl", 0xcf), ("sbcl", 0xef),
        ] {
            let entry = OPCODES_65816.iter().find(|m| m.name == name).unwrap();
            assert!(entry.codes.contains(&(AddrMode::AbsL, byte)), "{name}");
        }
    }

    #[test]
    fn rep_and_sep_accept_both_immediate_and_zp_spellings() {
        let rep = OPCODES_65816.iter().find(|m| m.name == "rep").unwrap();
        assert!(rep.codes.contains(&(AddrMode::Imm, 0xc2)));
        assert!(rep.codes.contains(&(AddrMode::Zp, 0xc2)));
    }

    #[test]
    fn timing_plus_rows_are_within_selector_range() {
        for byte in TIMING_65816 {
            let selector = (byte >> 4) as usize;
            assert!(selector < TIMING_65816_PLUS.len(), "selector {selector}");
        }
    }
}

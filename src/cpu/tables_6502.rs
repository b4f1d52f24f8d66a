// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! MOS 6502 opcode table, including the stable undocumented opcodes.
//!
//! The undocumented opcodes are the final [`NUM_ILLEGAL_6502_OPS`] entries
//! so the plain 6502 table is a prefix of the full one.

use super::AddrMode::*;
use super::{
    Mnemonic, AMM_ABS, AMM_AHX, AMM_ASL, AMM_BIT, AMM_BRA, AMM_CPY, AMM_DEC, AMM_IMM, AMM_JMP,
    AMM_LAX, AMM_LDX, AMM_LDY, AMM_NON, AMM_ORA, AMM_SAX, AMM_SHX, AMM_SHY, AMM_SLO, AMM_STA,
    AMM_STX, AMM_STY,
};

pub const NUM_ILLEGAL_6502_OPS: usize = 21;

#[rustfmt::skip]
pub const OPCODES_6502: &[Mnemonic] = &[
    Mnemonic { name: "brk", modes: AMM_NON, codes: &[(Non, 0x00)] },
    Mnemonic { name: "jsr", modes: AMM_ABS, codes: &[(Abs, 0x20)] },
    Mnemonic { name: "rti", modes: AMM_NON, codes: &[(Non, 0x40)] },
    Mnemonic { name: "rts", modes: AMM_NON, codes: &[(Non, 0x60)] },
    Mnemonic { name: "ora", modes: AMM_ORA, codes: &[(ZpRelX, 0x01), (Zp, 0x05), (Imm, 0x09), (Abs, 0x0d), (ZpYRel, 0x11), (ZpX, 0x15), (AbsY, 0x19), (AbsX, 0x1d)] },
    Mnemonic { name: "and", modes: AMM_ORA, codes: &[(ZpRelX, 0x21), (Zp, 0x25), (Imm, 0x29), (Abs, 0x2d), (ZpYRel, 0x31), (ZpX, 0x35), (AbsY, 0x39), (AbsX, 0x3d)] },
    Mnemonic { name: "eor", modes: AMM_ORA, codes: &[(ZpRelX, 0x41), (Zp, 0x45), (Imm, 0x49), (Abs, 0x4d), (ZpYRel, 0x51), (ZpX, 0x55), (AbsY, 0x59), (AbsX, 0x5d)] },
    Mnemonic { name: "adc", modes: AMM_ORA, codes: &[(ZpRelX, 0x61), (Zp, 0x65), (Imm, 0x69), (Abs, 0x6d), (ZpYRel, 0x71), (ZpX, 0x75), (AbsY, 0x79), (AbsX, 0x7d)] },
    Mnemonic { name: "sta", modes: AMM_STA, codes: &[(ZpRelX, 0x81), (Zp, 0x85), (Abs, 0x8d), (ZpYRel, 0x91), (ZpX, 0x95), (AbsY, 0x99), (AbsX, 0x9d)] },
    Mnemonic { name: "lda", modes: AMM_ORA, codes: &[(ZpRelX, 0xa1), (Zp, 0xa5), (Imm, 0xa9), (Abs, 0xad), (ZpYRel, 0xb1), (ZpX, 0xb5), (AbsY, 0xb9), (AbsX, 0xbd)] },
    Mnemonic { name: "cmp", modes: AMM_ORA, codes: &[(ZpRelX, 0xc1), (Zp, 0xc5), (Imm, 0xc9), (Abs, 0xcd), (ZpYRel, 0xd1), (ZpX, 0xd5), (AbsY, 0xd9), (AbsX, 0xdd)] },
    Mnemonic { name: "sbc", modes: AMM_ORA, codes: &[(ZpRelX, 0xe1), (Zp, 0xe5), (Imm, 0xe9), (Abs, 0xed), (ZpYRel, 0xf1), (ZpX, 0xf5), (AbsY, 0xf9), (AbsX, 0xfd)] },
    Mnemonic { name: "asl", modes: AMM_ASL, codes: &[(Zp, 0x06), (Abs, 0x0e), (ZpX, 0x16), (AbsX, 0x1e), (Acc, 0x0a), (Non, 0x0a)] },
    Mnemonic { name: "rol", modes: AMM_ASL, codes: &[(Zp, 0x26), (Abs, 0x2e), (ZpX, 0x36), (AbsX, 0x3e), (Acc, 0x2a), (Non, 0x2a)] },
    Mnemonic { name: "lsr", modes: AMM_ASL, codes: &[(Zp, 0x46), (Abs, 0x4e), (ZpX, 0x56), (AbsX, 0x5e), (Acc, 0x4a), (Non, 0x4a)] },
    Mnemonic { name: "ror", modes: AMM_ASL, codes: &[(Zp, 0x66), (Abs, 0x6e), (ZpX, 0x76), (AbsX, 0x7e), (Acc, 0x6a), (Non, 0x6a)] },
    Mnemonic { name: "stx", modes: AMM_STX, codes: &[(Zp, 0x86), (Abs, 0x8e), (ZpX, 0x96)] },
    Mnemonic { name: "ldx", modes: AMM_LDX, codes: &[(Zp, 0xa6), (Imm, 0xa2), (Abs, 0xae), (ZpX, 0xb6), (AbsX, 0xbe)] },
    Mnemonic { name: "dec", modes: AMM_DEC, codes: &[(Zp, 0xc6), (Abs, 0xce), (ZpX, 0xd6), (AbsX, 0xde)] },
    Mnemonic { name: "inc", modes: AMM_DEC, codes: &[(Zp, 0xe6), (Abs, 0xee), (ZpX, 0xf6), (AbsX, 0xfe)] },
    Mnemonic { name: "php", modes: AMM_NON, codes: &[(Non, 0x08)] },
    Mnemonic { name: "plp", modes: AMM_NON, codes: &[(Non, 0x28)] },
    Mnemonic { name: "pha", modes: AMM_NON, codes: &[(Non, 0x48)] },
    Mnemonic { name: "pla", modes: AMM_NON, codes: &[(Non, 0x68)] },
    Mnemonic { name: "dey", modes: AMM_NON, codes: &[(Non, 0x88)] },
    Mnemonic { name: "tay", modes: AMM_NON, codes: &[(Non, 0xa8)] },
    Mnemonic { name: "iny", modes: AMM_NON, codes: &[(Non, 0xc8)] },
    Mnemonic { name: "inx", modes: AMM_NON, codes: &[(Non, 0xe8)] },
    Mnemonic { name: "bpl", modes: AMM_BRA, codes: &[(Abs, 0x10)] },
    Mnemonic { name: "bmi", modes: AMM_BRA, codes: &[(Abs, 0x30)] },
    Mnemonic { name: "bvc", modes: AMM_BRA, codes: &[(Abs, 0x50)] },
    Mnemonic { name: "bvs", modes: AMM_BRA, codes: &[(Abs, 0x70)] },
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
    Mnemonic { name: "bit", modes: AMM_BIT, codes: &[(Zp, 0x24), (Abs, 0x2c)] },
    Mnemonic { name: "jmp", modes: AMM_JMP, codes: &[(Abs, 0x4c), (Rel, 0x6c)] },
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

    // undocumented opcodes (http://www.oxyron.de/html/opcodes02.html)
    Mnemonic { name: "slo", modes: AMM_SLO, codes: &[(ZpRelX, 0x03), (Zp, 0x07), (Abs, 0x0f), (ZpYRel, 0x13), (ZpX, 0x17), (AbsY, 0x1b), (AbsX, 0x1f)] },
    Mnemonic { name: "rla", modes: AMM_SLO, codes: &[(ZpRelX, 0x23), (Zp, 0x27), (Abs, 0x2f), (ZpYRel, 0x33), (ZpX, 0x37), (AbsY, 0x3b), (AbsX, 0x3f)] },
    Mnemonic { name: "sre", modes: AMM_SLO, codes: &[(ZpRelX, 0x43), (Zp, 0x47), (Abs, 0x4f), (ZpYRel, 0x53), (ZpX, 0x57), (AbsY, 0x5b), (AbsX, 0x5f)] },
    Mnemonic { name: "rra", modes: AMM_SLO, codes: &[(ZpRelX, 0x63), (Zp, 0x67), (Abs, 0x6f), (ZpYRel, 0x73), (ZpX, 0x77), (AbsY, 0x7b), (AbsX, 0x7f)] },
    Mnemonic { name: "sax", modes: AMM_SAX, codes: &[(ZpRelX, 0x83), (Zp, 0x87), (Abs, 0x8f), (ZpX, 0x97)] },
    Mnemonic { name: "lax", modes: AMM_LAX, codes: &[(ZpRelX, 0xa3), (Zp, 0xa7), (Abs, 0xaf), (ZpYRel, 0xb3), (ZpX, 0xb7), (AbsX, 0xbf)] },
    Mnemonic { name: "dcp", modes: AMM_SLO, codes: &[(ZpRelX, 0xc3), (Zp, 0xc7), (Abs, 0xcf), (ZpYRel, 0xd3), (ZpX, 0xd7), (AbsY, 0xdb), (AbsX, 0xdf)] },
    Mnemonic { name: "isc", modes: AMM_SLO, codes: &[(ZpRelX, 0xe3), (Zp, 0xe7), (Abs, 0xef), (ZpYRel, 0xf3), (ZpX, 0xf7), (AbsY, 0xfb), (AbsX, 0xff)] },
    Mnemonic { name: "anc", modes: AMM_IMM, codes: &[(Imm, 0x0b)] },
    Mnemonic { name: "aac", modes: AMM_IMM, codes: &[(Imm, 0x2b)] },
    Mnemonic { name: "alr", modes: AMM_IMM, codes: &[(Imm, 0x4b)] },
    Mnemonic { name: "arr", modes: AMM_IMM, codes: &[(Imm, 0x6b)] },
    Mnemonic { name: "xaa", modes: AMM_IMM, codes: &[(Imm, 0x8b)] },
    Mnemonic { name: "lax2", modes: AMM_IMM, codes: &[(Imm, 0xab)] },
    Mnemonic { name: "axs", modes: AMM_IMM, codes: &[(Imm, 0xcb)] },
    Mnemonic { name: "sbi", modes: AMM_IMM, codes: &[(Imm, 0xeb)] },
    // ahx and shx both claim $93; ahx (listed first) wins any reverse lookup
    Mnemonic { name: "ahx", modes: AMM_AHX, codes: &[(ZpRelX, 0x93), (AbsX, 0x9f)] },
    Mnemonic { name: "shy", modes: AMM_SHY, codes: &[(AbsX, 0x9c)] },
    Mnemonic { name: "shx", modes: AMM_SHX, codes: &[(ZpYRel, 0x93), (AbsY, 0x9e)] },
    Mnemonic { name: "tas", modes: AMM_SHX, codes: &[(AbsY, 0x9b)] },
    Mnemonic { name: "las", modes: AMM_SHX, codes: &[(AbsY, 0xbb)] },
];

pub const ALIASES_6502: &[(&str, &str)] = &[("bcc", "blt"), ("bcs", "bge")];

/// Advisory cycle counts per opcode byte: low nibble is `base*2 + penalty`,
/// `0xff` marks an unused slot.
#[rustfmt::skip]
pub static TIMING_6502: [u8; 256] = [
    0x0e, 0x0c, 0xff, 0xff, 0xff, 0x06, 0x0a, 0xff, 0x06, 0x04, 0x04, 0xff, 0xff, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
    0x0c, 0x0c, 0xff, 0xff, 0x06, 0x06, 0x0a, 0xff, 0x08, 0x04, 0x04, 0xff, 0x08, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
    0x0c, 0x0c, 0xff, 0xff, 0xff, 0x06, 0x0a, 0xff, 0x06, 0x04, 0x04, 0xff, 0x06, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
    0x0c, 0x0c, 0xff, 0xff, 0xff, 0x06, 0x0a, 0xff, 0x08, 0x04, 0x04, 0xff, 0x0a, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
    0xff, 0x0c, 0xff, 0xff, 0x06, 0x06, 0x06, 0xff, 0x04, 0xff, 0x04, 0xff, 0x08, 0x08, 0x08, 0xff,
    0x05, 0x0c, 0xff, 0xff, 0x08, 0x08, 0x08, 0xff, 0x04, 0x0a, 0x04, 0xff, 0xff, 0x0a, 0xff, 0xff,
    0x04, 0x0c, 0x04, 0xff, 0x06, 0x06, 0x06, 0xff, 0x04, 0x04, 0x04, 0xff, 0x08, 0x08, 0x08, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0x08, 0x08, 0x08, 0xff, 0x04, 0x09, 0x04, 0xff, 0x09, 0x09, 0x09, 0xff,
    0x04, 0x0c, 0xff, 0xff, 0x06, 0x06, 0x0a, 0xff, 0x04, 0x04, 0x04, 0xff, 0x08, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
    0x04, 0x0c, 0xff, 0xff, 0x06, 0x06, 0x0a, 0xff, 0x04, 0x04, 0x04, 0xff, 0x08, 0x08, 0x0c, 0xff,
    0x05, 0x0b, 0xff, 0xff, 0xff, 0x08, 0x0c, 0xff, 0x04, 0x09, 0xff, 0xff, 0xff, 0x09, 0x0e, 0xff,
];

#[cfg(test)]
mod tests {
    use super::super::{AddrMode, AMM_FLIPXY};
    use super::*;

    #[test]
    fn table_splits_at_the_undocumented_boundary() {
        let boundary = OPCODES_6502.len() - NUM_ILLEGAL_6502_OPS;
        assert_eq!(OPCODES_6502[boundary - 1].name, "nop");
        assert_eq!(OPCODES_6502[boundary].name, "slo");
    }

    #[test]
    fn store_loads_of_x_flip_index_registers() {
        for entry in OPCODES_6502 {
            let flips = entry.modes & AMM_FLIPXY != 0;
            let expect = matches!(entry.name, "stx" | "ldx" | "sax" | "lax" | "ahx");
            assert_eq!(flips, expect, "{}", entry.name);
        }
    }

    #[test]
    fn sparse_codes_stay_inside_the_mode_mask() {
        // lax and shx carry historical bytes outside their masks ($b3/$93);
        // those slots are unreachable through mode selection
        for entry in OPCODES_6502 {
            if matches!(entry.name, "lax" | "shx") {
                continue;
            }
            for &(mode, _) in entry.codes {
                assert!(
                    entry.modes & mode.mask() != 0,
                    "{} lists a code outside its mask at {:?}",
                    entry.name,
                    mode
                );
            }
        }
    }

    #[test]
    fn ahx_and_shx_share_byte_0x93() {
        let ahx = OPCODES_6502.iter().find(|m| m.name == "ahx").unwrap();
        let shx = OPCODES_6502.iter().find(|m| m.name == "shx").unwrap();
        assert!(ahx.codes.contains(&(AddrMode::ZpRelX, 0x93)));
        assert!(shx.codes.contains(&(AddrMode::ZpYRel, 0x93)));
        let ahx_at = OPCODES_6502.iter().position(|m| m.name == "ahx").unwrap();
        let shx_at = OPCODES_6502.iter().position(|m| m.name == "shx").unwrap();
        assert!(ahx_at < shx_at, "ahx must win a reverse lookup");
    }

    #[test]
    fn branch_timing_carries_the_penalty_bit() {
        // bne is 2 cycles + 1 on a taken branch/page cross
        assert_eq!(TIMING_6502[0xd0], 0x05);
    }
}

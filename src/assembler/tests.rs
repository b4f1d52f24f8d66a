// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Whole-pipeline tests: sources in, bytes out.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Assembler, Syntax};

fn assemble(source: &str) -> Assembler {
    let mut asm = Assembler::new();
    asm.assemble(source, "test.s", false);
    asm
}

fn assemble_merlin(source: &str) -> Assembler {
    let mut asm = Assembler::with_syntax(Syntax::Merlin);
    asm.assemble(source, "test.s", false);
    asm
}

fn section_bytes<'a>(asm: &'a Assembler, name: &str) -> &'a [u8] {
    &asm
        .sections
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("no section {name}"))
        .output
}

fn temp_file(tag: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("relforge_{}_{}_{}", std::process::id(), stamp, tag))
}

#[test]
fn forward_branch_resolves() {
    let asm = assemble("org $1000\n jmp l1\n nop\nl1 nop\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0x4c, 0x04, 0x10, 0xea, 0xea]);
    assert_eq!(asm.labels["l1"].value, 0x1004);
}

#[test]
fn relative_section_links_at_fixed_address() {
    let asm = assemble(
        "section code\nlda data\ndata:\nbyte 7\norg $2000\nlink code\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    // the linked image lands in the fixed section with the reloc applied
    let fixed = asm
        .sections
        .iter()
        .find(|s| s.address_assigned && s.start_address == 0x2000)
        .expect("fixed section");
    assert_eq!(fixed.output, vec![0xad, 0x03, 0x20, 0x07]);
    assert!(asm.sections.iter().all(|s| s.relocs.is_empty()));
    assert_eq!(asm.labels["data"].value, 0x2003);
    assert_eq!(asm.labels["data"].section, -1);
}

#[test]
fn accumulator_width_controls_immediate_size() {
    let asm = assemble(
        "cpu 65816\norg $1000\na8\nlda #$12\na16\nlda #$1234\na8\nlda #$1234\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(
        asm.curr_section().output,
        // the explicit 4-digit literal keeps its high byte even in a8
        vec![0xa9, 0x12, 0xa9, 0x34, 0x12, 0xa9, 0x34, 0x12]
    );
}

#[test]
fn macro_substitution_is_token_aware() {
    let asm = assemble(
        "parity = 10\nparty = 99\norg $1000\nmacro m(x) {\nbyte x, x+1\n}\nm(parity)\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0x0a, 0x0b]);
}

#[test]
fn rept_exposes_the_iteration_counter() {
    let asm = assemble("org $1000\nrept 4 { byte REPT }\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0, 1, 2, 3]);
}

#[test]
fn object_round_trip_resolves_xref() {
    let obj_path = temp_file("a.x65");
    let mut provider = Assembler::new();
    provider.assemble("xdef foo\nfoo = $1234\n", "a.s", true);
    assert!(!provider.error_encountered, "{:?}", provider.diagnostics);
    provider
        .write_object_file(&obj_path.to_string_lossy())
        .expect("write object");

    let source = format!(
        "xref foo\norg $2000\nword foo\nimport object \"{}\"\n",
        obj_path.display()
    );
    let asm = assemble(&source);
    fs::remove_file(&obj_path).ok();
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0x34, 0x12]);
}

#[test]
fn local_labels_vanish_at_scope_exit() {
    let asm = assemble(
        "org $1000\n{\n.loop:\nnop\nbne .loop\n}\n{\n.loop:\nrts\n}\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert!(!asm.labels.contains_key(".loop"));
    assert_eq!(
        asm.curr_section().output,
        vec![0xea, 0xd0, 0xfd, 0x60]
    );
}

#[test]
fn scope_end_pc_resolves_late() {
    // % inside a scope is the scope's end address, known only at '}'
    let asm = assemble("org $1000\n{\nword %\nnop\n}\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0x03, 0x10, 0xea]);
}

#[test]
fn scope_start_pc_is_bang() {
    let asm = assemble("org $1000\nnop\n{\nword !\n}\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0xea, 0x01, 0x10]);
}

#[test]
fn backward_branch_out_of_range_is_reported() {
    let asm = assemble("org $1000\nl:\nds 200\nbeq l\n");
    assert!(asm.error_encountered);
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Branch out of range")));
}

#[test]
fn forward_branch_out_of_range_is_reported() {
    let asm = assemble("org $1000\nbeq far\nds 200\nfar:\nnop\n");
    assert!(asm.error_encountered);
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Branch out of range")));
}

#[test]
fn const_labels_resist_change() {
    let asm = assemble("const limit = 10\nlimit = 11\n");
    assert!(asm.error_encountered);
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("constant")));
    assert_eq!(asm.labels["limit"].value, 10);
}

#[test]
fn zero_page_sections_pack_and_relocate() {
    let mut asm = Assembler::new();
    asm.assemble(
        "org $2000\nsection zpv, zp\nptr:\nds 2\nsection code\nlda ptr\nrts\n",
        "test.s",
        false,
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    asm.link_zp().expect("zero page layout");
    assert_eq!(asm.labels["ptr"].value, 0xfe);
    assert_eq!(asm.labels["ptr"].section, -1);
    // the zp reference demoted to zero page addressing and resolved
    assert_eq!(section_bytes(&asm, "code"), &[0xa5, 0xfe, 0x60]);
}

#[test]
fn undocumented_opcodes_require_the_ill_cpu() {
    // on the plain 6502, "slo" is just an odd label definition
    let plain = assemble("org $1000\nslo $10\n");
    assert!(plain.labels.contains_key("slo"));
    assert!(plain.curr_section().output.is_empty());
    let ill = assemble("cpu 6502ill\norg $1000\nslo $10\n");
    assert!(!ill.error_encountered, "{:?}", ill.diagnostics);
    assert_eq!(ill.curr_section().output, vec![0x07, 0x10]);
}

#[test]
fn c02_zp_indirect_assembles() {
    let asm = assemble("cpu 65C02\norg $1000\nlda ($12)\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0xb2, 0x12]);
}

#[test]
fn include_pulls_a_file_into_place() {
    let inc_path = temp_file("defs.s");
    fs::write(&inc_path, "answer = 42\n").expect("write include");
    let source = format!("include \"{}\"\norg $1000\nbyte answer\n", inc_path.display());
    let asm = assemble(&source);
    fs::remove_file(&inc_path).ok();
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![42]);
}

#[test]
fn missing_include_is_reported() {
    let asm = assemble("include \"no_such_file_anywhere.s\"\n");
    assert!(asm.error_encountered);
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("include file")));
}

#[test]
fn incbin_inserts_raw_bytes() {
    let bin_path = temp_file("blob.bin");
    fs::write(&bin_path, [1u8, 2, 3, 4]).expect("write blob");
    let source = format!(
        "org $1000\nimport binary \"{}\", 1, 2\n",
        bin_path.display()
    );
    let asm = assemble(&source);
    fs::remove_file(&bin_path).ok();
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![2, 3]);
}

#[test]
fn import_c64_skips_the_load_address() {
    let bin_path = temp_file("prog.prg");
    fs::write(&bin_path, [0x01u8, 0x08, 0xaa, 0xbb]).expect("write prg");
    let source = format!("org $1000\nimport c64 \"{}\"\n", bin_path.display());
    let asm = assemble(&source);
    fs::remove_file(&bin_path).ok();
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0xaa, 0xbb]);
}

#[test]
fn unresolved_labels_fail_binary_but_not_object_builds() {
    let binary = assemble("org $1000\nword nowhere\n");
    assert!(binary.error_encountered);
    assert!(binary
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Failed to evaluate label")));

    let mut object = Assembler::new();
    object.assemble("org $1000\nword nowhere\n", "test.s", true);
    assert!(!object.error_encountered, "{:?}", object.diagnostics);
    assert_eq!(object.late_evals.len(), 1);
}

#[test]
fn too_deep_scope_is_fatal() {
    let mut source = String::from("org $1000\n");
    for _ in 0..40 {
        source.push_str("{\n");
    }
    let asm = assemble(&source);
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Scoping is too deep") && d.fatal));
}

#[test]
fn unbalanced_scope_close_is_fatal() {
    let asm = assemble("org $1000\n}\n");
    assert!(asm
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Unbalanced scope closure")));
}

#[test]
fn merlin_comment_column_and_data_aliases() {
    let asm = assemble_merlin(
        "* comment line\n org $1000\n dfb 1,2\n da $1234\n hex ff00\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(
        asm.curr_section().output,
        vec![1, 2, 0x34, 0x12, 0xff, 0x00]
    );
}

#[test]
fn merlin_variable_labels_reassign() {
    let asm = assemble_merlin("]idx = 1\n org $1000\n dfb ]idx\n]idx = 2\n dfb ]idx\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![1, 2]);
}

#[test]
fn merlin_lup_repeats_until_terminator() {
    let asm = assemble_merlin(" org $1000\n lup 3\n dfb 7\n --^\n rts\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![7, 7, 7, 0x60]);
}

#[test]
fn merlin_macros_use_numbered_parameters() {
    let asm = assemble_merlin(
        "store mac\n lda #]1\n sta ]2\n<<<\n org $1000\n store 3;$d020\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(
        asm.curr_section().output,
        vec![0xa9, 0x03, 0x8d, 0x20, 0xd0]
    );
}

#[test]
fn merlin_unterminated_do_is_lenient() {
    let asm = assemble_merlin(" org $1000\n do 1\n dfb 1\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![1]);
}

#[test]
fn merlin_xc_escalates_the_cpu() {
    let asm = assemble_merlin(" xc\n xc\n org $1000\n xba\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![0xeb]);
}

#[test]
fn merlin_ent_exports_the_previous_label() {
    let mut asm = Assembler::with_syntax(Syntax::Merlin);
    asm.assemble(" org $1000\nentry nop\n ent\n", "test.s", true);
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert!(asm.labels["entry"].external);
}

#[test]
fn mx_directive_is_bitwise() {
    let mut asm = Assembler::with_syntax(Syntax::Merlin);
    asm.assemble(
        " xc\n xc\n org $1000\n mx %00\n lda #$1234\n ldx #$5678\n mx %11\n lda #$12\n",
        "test.s",
        false,
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(
        asm.curr_section().output,
        vec![0xa9, 0x34, 0x12, 0xa2, 0x78, 0x56, 0xa9, 0x12]
    );
}

#[test]
fn export_binary_covers_section_span() {
    let mut asm = Assembler::new();
    asm.assemble("org $2000\nbyte 1\nsection tail\nbyte 2\n", "test.s", false);
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    asm.link_zp().unwrap();
    let (image, start, _) = asm.build_export("").expect("image");
    assert_eq!(start, 0x2000);
    assert_eq!(image, vec![1, 2]);
}

#[test]
fn eval_status_fixed_point_holds_under_repeat() {
    let mut asm = assemble("org $1000\nword later\n");
    let snapshot: Vec<String> = asm.late_evals.iter().map(|l| l.expression.clone()).collect();
    asm.check_late_eval(None, -1, false).unwrap();
    let again: Vec<String> = asm.late_evals.iter().map(|l| l.expression.clone()).collect();
    assert_eq!(snapshot, again);
    assert_eq!(
        asm.check_late_eval(None, -1, false),
        Ok(()),
        "a second sweep must be a no-op"
    );
}

#[test]
fn struct_enum_and_pool_work_together() {
    let asm = assemble(
        "struct Vec2 { word x\nword y }\nenum Mode { idle, run, jump }\n\
         pool zp $40-$48\norg $1000\n{\nzp pos.w\nbyte Vec2.y, Mode.jump, pos\n}\n",
    );
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![2, 2, 0x46]);
}

#[test]
fn dc_rejects_unknown_width() {
    let asm = assemble("org $1000\ndc.q 1\n");
    assert!(asm.error_encountered);
    assert_eq!(
        asm.diagnostics
            .iter()
            .filter(|d| d.message.contains("dc.?"))
            .count(),
        1
    );
}

#[test]
fn assignment_with_equ_keyword() {
    let asm = assemble("speed equ 7\norg $1000\nbyte speed\n");
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    assert_eq!(asm.curr_section().output, vec![7]);
}

#[test]
fn xref_dependent_expressions_wait_for_the_link() {
    let mut asm = Assembler::new();
    asm.assemble("xref far\norg $1000\nword far+2\n", "test.s", true);
    assert!(!asm.error_encountered, "{:?}", asm.diagnostics);
    // the expression is queued, not failed
    assert_eq!(asm.late_evals.len(), 1);
    assert_eq!(asm.late_evals[0].expression, "far+2");
    assert_eq!(asm.curr_section().output, vec![0, 0]);
}

#[test]
fn status_severity_drives_recovery() {
    // recoverable error on line 2, assembly continues to line 3
    let asm = assemble("org $1000\nstx #$12\nnop\n");
    assert!(asm.error_encountered);
    assert_eq!(asm.curr_section().output, vec![0xea]);
    assert_eq!(asm.diagnostics.iter().filter(|d| d.fatal).count(), 0);
}

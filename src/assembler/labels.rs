// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Label resolution and the late-eval queue.
//!
//! Labels are assigned (`name = expr`) or addressed (PC at definition).
//! Expressions that cannot resolve yet queue a late eval; the queue is
//! re-checked whenever a new label is defined or a scope closes, repeating
//! until a full sweep resolves nothing, so resolution order is a fixed
//! point regardless of sweep granularity.

use crate::core::status::{AsmResult, StatusCode};

use super::eval::{EvalContext, EvalResult};
use super::{Assembler, Label, LateEval, LateEvalKind, MapSymbol};

/// After this many freshly resolved labels, re-check everything once
/// instead of tracking names.
const MAX_LABELS_EVAL_ALL: usize = 16;

/// Local labels carry a `.` `@` `!` `:` prefix or a `$` suffix.
pub(crate) fn is_local_label(name: &str) -> bool {
    name.starts_with(['.', '@', '!', ':']) || name.ends_with('$')
}

/// True when the expression uses `%` as the scope-end PC (a lone `%`, not
/// a binary literal).
fn uses_scope_end(expression: &str) -> bool {
    let bytes = expression.as_bytes();
    let mut at = 0;
    while at < bytes.len() {
        if bytes[at] == b'%' {
            match bytes.get(at + 1) {
                Some(b'0') | Some(b'1') => at += 1,
                _ => return true,
            }
        }
        at += 1;
    }
    false
}

impl Assembler {
    pub fn get_label(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    /// Look up a label, letting a protected import file shadow globals.
    pub fn get_label_scoped(&self, name: &str, file_ref: i32) -> Option<&Label> {
        if file_ref >= 0 {
            if let Some(ext) = self.externals.get(file_ref as usize) {
                if let Some(label) = ext.labels.get(name) {
                    return Some(label);
                }
            }
        }
        self.labels.get(name)
    }

    fn get_label_scoped_mut(&mut self, name: &str, file_ref: i32) -> Option<&mut Label> {
        if file_ref >= 0 {
            if let Some(ext) = self.externals.get_mut(file_ref as usize) {
                if ext.labels.contains_key(name) {
                    return ext.labels.get_mut(name);
                }
            }
        }
        self.labels.get_mut(name)
    }

    pub fn match_xdef(&self, name: &str) -> bool {
        self.xdefs.contains(name)
    }

    /// Append an evaluated label to the map symbol list.
    pub(crate) fn label_added(&mut self, name: &str, local: bool) {
        let symbol = match self.labels.get_mut(name) {
            Some(label) if label.evaluated => {
                label.map_index = -1;
                Some(MapSymbol {
                    name: label.name.clone(),
                    value: label.value,
                    section: label.section as i16,
                    local,
                })
            }
            _ => None,
        };
        if let Some(symbol) = symbol {
            self.map.push(symbol);
        }
    }

    /// `label = expression`; constants may not change once evaluated.
    pub fn assign_label(
        &mut self,
        name: &str,
        expression: &str,
        make_constant: bool,
    ) -> AsmResult<()> {
        let expression = expression.trim();
        let etx = self.eval_ctx();
        let (value, evaluated) = match self.eval_expression(expression, &etx) {
            Ok(EvalResult::Value(v)) => (v, true),
            // a value still relative to a section resolves at link time
            Ok(EvalResult::Relative(..)) | Err(StatusCode::NotReady) => (0, false),
            Err(err) => return Err(err),
        };

        if let Some(existing) = self.labels.get(name) {
            if existing.constant && existing.evaluated && value != existing.value {
                if !evaluated {
                    return Ok(());
                }
                return Err(StatusCode::ModifyingConstLabel);
            }
        }

        let label = Label {
            name: name.to_string(),
            pool_name: None,
            value,
            section: -1, // assigned labels are section-less
            map_index: -1,
            evaluated,
            pc_relative: false,
            constant: make_constant,
            external: self.match_xdef(name),
            reference: false,
        };
        self.labels.insert(name.to_string(), label);

        let local = is_local_label(name);
        if !evaluated {
            let pc = self.curr_section().pc();
            let scope = self.scope_address[self.scope_depth as usize];
            self.add_late_eval_label(name, pc, scope, expression);
            Ok(())
        } else {
            if local {
                self.mark_label_local(name, false);
            }
            self.label_added(name, local);
            self.check_late_eval(Some(name), -1, false)
        }
    }

    /// Define a label at the current PC.
    pub fn address_label(&mut self, name: &str) -> AsmResult<()> {
        let constant = match self.labels.get(name) {
            Some(existing) if existing.constant => {
                if existing.value != self.curr_section().pc() {
                    return Err(StatusCode::ModifyingConstLabel);
                }
                true
            }
            _ => false,
        };

        let section = if self.curr_section().is_relative() {
            self.section_id()
        } else {
            -1
        };
        let label = Label {
            name: name.to_string(),
            pool_name: None,
            value: self.curr_section().pc(),
            section,
            map_index: -1,
            evaluated: true,
            pc_relative: true,
            constant,
            external: self.match_xdef(name),
            reference: false,
        };
        self.labels.insert(name.to_string(), label);
        self.last_label = name.to_string();

        let local = is_local_label(name);
        self.label_added(name, local);
        if local {
            self.mark_label_local(name, false);
        }
        let status = self.check_late_eval(Some(name), -1, false);
        // MERLIN: ] variable labels do not invalidate local labels
        if !local && !name.starts_with(']') {
            self.flush_local_labels(-1)?;
        }
        status
    }

    /// Record an XDEF name; matching labels become external.
    pub fn add_xdef(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let first = name.chars().next().unwrap_or('\0');
        let last = name.chars().last().unwrap_or('\0');
        if first != '.' && first != '!' && first != '@' && last != '$' {
            self.xdefs.insert(name.to_string());
            if let Some(label) = self.labels.get_mut(name) {
                label.external = true;
            }
        }
    }

    /// Create an XREF placeholder for an externally defined label.
    pub fn add_xref(&mut self, name: &str) {
        if name.is_empty() || self.labels.contains_key(name) {
            return;
        }
        let label = Label {
            name: name.to_string(),
            pool_name: None,
            value: 0,
            section: -1,
            map_index: -1,
            evaluated: true,
            pc_relative: true,
            constant: false,
            external: false,
            reference: true,
        };
        self.labels.insert(name.to_string(), label);
    }

    // late evaluation

    /// Queue a deferred write into the current section's buffer.
    pub(crate) fn add_late_eval_target(
        &mut self,
        target: i32,
        pc: i32,
        scope_pc: i32,
        expression: &str,
        kind: LateEvalKind,
    ) {
        let source_name = if self.context.has_work() {
            self.context.curr().source_name.to_string()
        } else {
            String::new()
        };
        let late = LateEval {
            target,
            address: pc,
            scope: scope_pc,
            scope_depth: self.scope_depth,
            section: self.section_id(),
            rept: self.rept_cnt(),
            file_ref: -1,
            label: String::new(),
            expression: expression.to_string(),
            source_name,
            kind,
        };
        self.late_evals.push(late);
    }

    /// Queue a deferred assignment to a label.
    pub(crate) fn add_late_eval_label(
        &mut self,
        label: &str,
        pc: i32,
        scope_pc: i32,
        expression: &str,
    ) {
        let late = LateEval {
            target: 0,
            address: pc,
            scope: scope_pc,
            scope_depth: self.scope_depth,
            section: self.section_id(),
            rept: self.rept_cnt(),
            file_ref: -1,
            label: label.to_string(),
            expression: expression.to_string(),
            source_name: String::new(),
            kind: LateEvalKind::Label,
        };
        self.late_evals.push(late);
    }

    /// Re-check the late-eval queue after new information arrived: a label
    /// was defined (`added_label`), a scope closed (`scope_end` ≥ 0), or
    /// everything (neither). Repeats until a sweep resolves nothing.
    pub fn check_late_eval(
        &mut self,
        added_label: Option<&str>,
        scope_end: i32,
        missing_is_error: bool,
    ) -> AsmResult<()> {
        let mut new_labels: Vec<String> = Vec::new();
        if let Some(name) = added_label {
            new_labels.push(name.to_string());
        }
        let mut all = added_label.is_none();

        let mut progressed = true;
        while progressed {
            progressed = false;
            let mut at = 0;
            while at < self.late_evals.len() {
                let relevant = {
                    let entry = &self.late_evals[at];
                    all
                        || new_labels.len() >= MAX_LABELS_EVAL_ALL
                        || new_labels
                            .iter()
                            .any(|name| entry.expression.contains(name.as_str()))
                        || (scope_end > 0 && uses_scope_end(&entry.expression))
                };
                if !relevant {
                    at += 1;
                    continue;
                }
                let entry = self.late_evals[at].clone();
                let etx = EvalContext {
                    pc: entry.address,
                    scope_pc: entry.scope,
                    scope_end_pc: scope_end,
                    scope_depth: entry.scope_depth,
                    relative_section: if entry.kind == LateEvalKind::Branch {
                        self.section_id()
                    } else {
                        -1
                    },
                    file_ref: entry.file_ref,
                    rept_cnt: entry.rept,
                };
                match self.eval_expression(&entry.expression, &etx) {
                    Ok(result) => {
                        match self.apply_late_eval(&entry, result, &mut new_labels, &mut progressed)
                        {
                            Ok(true) => {
                                self.late_evals.remove(at);
                            }
                            Ok(false) => at += 1,
                            Err(StatusCode::BranchOutOfRange) => {
                                // the entry is spent; keeping it would just
                                // re-report on every later sweep
                                self.late_evals.remove(at);
                                return Err(StatusCode::BranchOutOfRange);
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    Err(err) => {
                        if missing_is_error && err != StatusCode::XrefDependent {
                            let expr = entry.expression.clone();
                            self.record_error(&expr, err);
                        }
                        at += 1;
                    }
                }
            }
            all = false;
        }
        Ok(())
    }

    /// Write one resolved late eval to its destination. Returns false when
    /// the entry must stay queued (relative result with no section).
    fn apply_late_eval(
        &mut self,
        entry: &LateEval,
        result: EvalResult,
        new_labels: &mut Vec<String>,
        progressed: &mut bool,
    ) -> AsmResult<bool> {
        // a merged owning section redirects the write into its target
        let (mut target, mut section) = (entry.target, entry.section);
        if entry.kind != LateEvalKind::Label {
            if section < 0 {
                return Ok(false);
            }
            let owner = &self.sections[section as usize];
            if owner.is_merged() {
                target += owner.merged_offset;
                section = owner.merged_section;
            }
        }

        let write_bytes = |kind: LateEvalKind| -> usize {
            match kind {
                LateEvalKind::Byte | LateEvalKind::Branch => 1,
                LateEvalKind::AbsRef | LateEvalKind::Branch16 => 2,
                LateEvalKind::AbsLRef => 3,
                LateEvalKind::Abs4Ref => 4,
                LateEvalKind::Label => 0,
            }
        };

        match entry.kind {
            LateEvalKind::Label => {
                let section = match result {
                    EvalResult::Relative(_, rel) => rel.section,
                    EvalResult::Value(_) => -1,
                };
                let name = entry.label.clone();
                let value = result.value();
                {
                    let label = self
                        .get_label_scoped_mut(&name, entry.file_ref)
                        .ok_or(StatusCode::LabelMisplacedInternal)?;
                    label.value = value;
                    label.evaluated = true;
                    label.section = section;
                }
                if new_labels.len() < MAX_LABELS_EVAL_ALL {
                    new_labels.push(name.clone());
                }
                *progressed = true;
                self.label_added(&name, is_local_label(&name));
                Ok(true)
            }
            kind => {
                let size = write_bytes(kind);
                let mut value = result.value();
                if let EvalResult::Relative(_, rel) = result {
                    if matches!(
                        kind,
                        LateEvalKind::Byte
                            | LateEvalKind::AbsRef
                            | LateEvalKind::AbsLRef
                            | LateEvalKind::Abs4Ref
                    ) {
                        if entry.section < 0 {
                            return Ok(false);
                        }
                        self.sections[section as usize].add_reloc(
                            rel.base,
                            target,
                            rel.section,
                            size as i8,
                            rel.shift,
                        );
                        value = 0;
                    }
                }
                match kind {
                    LateEvalKind::Branch => {
                        value -= entry.address + 1;
                        if !(-128..=127).contains(&value) {
                            return Err(StatusCode::BranchOutOfRange);
                        }
                    }
                    LateEvalKind::Branch16 => {
                        value -= entry.address + 2;
                    }
                    _ => {}
                }
                let sect = &mut self.sections[section as usize];
                if (target as usize) + size > sect.size() {
                    return Err(StatusCode::SectionTargetOffsetOutOfRange);
                }
                match size {
                    1 => sect.set_byte(target as usize, value),
                    2 => sect.set_word(target as usize, value),
                    3 => sect.set_triple(target as usize, value),
                    _ => sect.set_quad(target as usize, value),
                }
                Ok(true)
            }
        }
    }

    /// Include labels from a `.sym` listing; an optional comma-separated
    /// prefix before the quoted filename selects which symbols to keep.
    pub fn include_symbols(&mut self, line: &str) -> AsmResult<()> {
        let quote = line.find('"').ok_or(StatusCode::CouldNotIncludeFile)?;
        let wanted = line[..quote].trim().to_string();
        let file = &line[quote + 1..];
        let file = &file[..file.find('"').unwrap_or(file.len())];
        let text = self
            .load_text(file)
            .ok_or(StatusCode::CouldNotIncludeFile)?;

        let mut depth = 0usize;
        for sym_line in text.lines() {
            let sym_line = sym_line.trim();
            // local label blocks are brace-scoped in the listing; skip them
            if sym_line.starts_with('{') {
                depth += 1;
                continue;
            }
            if sym_line.starts_with('}') {
                depth = depth.saturating_sub(1);
                continue;
            }
            if depth > 0 || sym_line.is_empty() {
                continue;
            }
            let mut words = sym_line.splitn(2, ' ');
            let sym_type = words.next().unwrap_or("");
            let def = words.next().unwrap_or("");
            let Some((name, expr)) = def.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let constant = sym_type.eq_ignore_ascii_case(".const");
            let selected = wanted.is_empty()
                || wanted.split(',').any(|w| w.trim() == name);
            if selected {
                let _ = self.assign_label(name, expr.trim(), constant);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Assembler, LateEvalKind};
    use super::{is_local_label, uses_scope_end};
    use crate::core::status::StatusCode;

    #[test]
    fn local_label_shapes() {
        assert!(is_local_label(".loop"));
        assert!(is_local_label("@skip"));
        assert!(is_local_label("!again"));
        assert!(is_local_label(":here"));
        assert!(is_local_label("temp$"));
        assert!(!is_local_label("main"));
    }

    #[test]
    fn scope_end_detection_skips_binary_literals() {
        assert!(uses_scope_end("%-1"));
        assert!(uses_scope_end("2+%"));
        assert!(!uses_scope_end("%0101"));
        assert!(!uses_scope_end("12+34"));
    }

    #[test]
    fn assignment_defines_and_resolves_forward_reference() {
        let mut asm = Assembler::new();
        asm.assign_label("second", "first+2", false).unwrap();
        assert!(!asm.labels["second"].evaluated);
        assert_eq!(asm.late_evals.len(), 1);
        assert_eq!(asm.late_evals[0].kind, LateEvalKind::Label);

        asm.assign_label("first", "$1000", false).unwrap();
        assert!(asm.labels["second"].evaluated);
        assert_eq!(asm.labels["second"].value, 0x1002);
        assert!(asm.late_evals.is_empty());
    }

    #[test]
    fn chained_forward_references_reach_a_fixed_point() {
        let mut asm = Assembler::new();
        asm.assign_label("c", "b+1", false).unwrap();
        asm.assign_label("b", "a+1", false).unwrap();
        asm.assign_label("a", "1", false).unwrap();
        assert_eq!(asm.labels["b"].value, 2);
        assert_eq!(asm.labels["c"].value, 3);
        assert!(asm.late_evals.is_empty());
    }

    #[test]
    fn constants_reject_changed_values() {
        let mut asm = Assembler::new();
        asm.assign_label("limit", "10", true).unwrap();
        assert_eq!(
            asm.assign_label("limit", "11", false),
            Err(StatusCode::ModifyingConstLabel)
        );
        // re-assigning the same value is allowed
        asm.assign_label("limit", "10", false).unwrap();
    }

    #[test]
    fn address_label_takes_section_and_pc() {
        let mut asm = Assembler::new();
        asm.curr_section_mut().address = 0x1234;
        asm.address_label("start").unwrap();
        let label = &asm.labels["start"];
        assert_eq!(label.value, 0x1234);
        assert_eq!(label.section, -1); // default section is fixed
        assert!(label.pc_relative);
    }

    #[test]
    fn xdef_marks_matching_labels_external() {
        let mut asm = Assembler::new();
        asm.add_xdef("entry");
        asm.address_label("entry").unwrap();
        assert!(asm.labels["entry"].external);
        // local shapes are never exported
        asm.add_xdef(".local");
        assert!(!asm.xdefs.contains(".local"));
    }

    #[test]
    fn xref_creates_reference_placeholder() {
        let mut asm = Assembler::new();
        asm.add_xref("imported");
        let label = &asm.labels["imported"];
        assert!(label.reference);
        assert!(label.evaluated);
        // expressions using it become xref-dependent
        let etx = asm.eval_ctx();
        assert_eq!(
            asm.eval_expression("imported+1", &etx),
            Err(StatusCode::XrefDependent)
        );
    }

    #[test]
    fn recheck_is_a_fixed_point() {
        let mut asm = Assembler::new();
        asm.assign_label("x", "undefined_thing", false).unwrap();
        let before = asm.late_evals.len();
        asm.check_late_eval(None, -1, false).unwrap();
        asm.check_late_eval(None, -1, false).unwrap();
        assert_eq!(asm.late_evals.len(), before);
    }
}

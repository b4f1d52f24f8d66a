// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The assembly session.
//!
//! `Assembler` owns every mutable structure of a run: the label, macro,
//! pool and struct maps, the section list, the late-eval queue, the context
//! stack of files and macro expansions, and the scope and conditional
//! stacks. Lines are pulled off the current context frame one at a time,
//! classified (label, directive, mnemonic, macro invocation, pool
//! allocation, assignment, scope brace) and dispatched; anything that
//! cannot evaluate yet lands in the late-eval queue and is re-checked as
//! labels are defined and scopes close.

pub mod cli;
pub mod directives;
pub mod eval;
pub mod export;
pub mod instruction;
pub mod labels;
pub mod objfile;
pub mod sections;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use crate::core::conditional::ConditionalStack;
use crate::core::context::{take_line, ContextStack};
use crate::core::macros::Macro;
use crate::core::pool::LabelPool;
use crate::core::section::{Section, SectionType};
use crate::core::status::StatusCode;
use crate::core::structs::StructTable;
use crate::cpu::{cpu_details, CpuIndex, OpcodeTable};

use directives::{build_directive_table, Directive};

pub const MAX_SCOPE_DEPTH: usize = 32;

/// Accepted source dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Sane,
    Merlin,
}

/// Data related to a label.
#[derive(Debug, Clone, Default)]
pub struct Label {
    pub name: String,
    pub pool_name: Option<String>,
    pub value: i32,
    /// Relative-section id the value is an offset into, or -1 if fixed.
    pub section: i32,
    /// Index into the map symbols, or -1.
    pub map_index: i32,
    pub evaluated: bool,
    pub pc_relative: bool,
    pub constant: bool,
    pub external: bool,
    /// XREF import placeholder; unusable for local evaluation.
    pub reference: bool,
}

/// How a late evaluation writes its result once it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateEvalKind {
    /// Applies to a label, not memory.
    Label,
    /// 16 bit value at target, target+1.
    AbsRef,
    /// 24 bit value.
    AbsLRef,
    /// 32 bit value.
    Abs4Ref,
    /// 8 bit branch displacement.
    Branch,
    /// 16 bit branch displacement.
    Branch16,
    /// Single byte.
    Byte,
}

impl LateEvalKind {
    pub fn to_u16(self) -> u16 {
        match self {
            LateEvalKind::Label => 0,
            LateEvalKind::AbsRef => 1,
            LateEvalKind::AbsLRef => 2,
            LateEvalKind::Abs4Ref => 3,
            LateEvalKind::Branch => 4,
            LateEvalKind::Branch16 => 5,
            LateEvalKind::Byte => 6,
        }
    }

    pub fn from_u16(value: u16) -> LateEvalKind {
        match value {
            1 => LateEvalKind::AbsRef,
            2 => LateEvalKind::AbsLRef,
            3 => LateEvalKind::Abs4Ref,
            4 => LateEvalKind::Branch,
            5 => LateEvalKind::Branch16,
            6 => LateEvalKind::Byte,
            _ => LateEvalKind::Label,
        }
    }
}

/// A deferred expression and enough state to reconstruct its result.
#[derive(Debug, Clone)]
pub struct LateEval {
    /// Offset into the owning section's buffer (0 for label targets).
    pub target: i32,
    /// PC at the point of emission.
    pub address: i32,
    /// Scope-open PC at the point of emission.
    pub scope: i32,
    pub scope_depth: i32,
    pub section: i32,
    pub rept: i32,
    /// Index of the imported file whose protected labels are visible, or -1.
    pub file_ref: i32,
    /// Owning label name for `Label`-kind entries, else empty.
    pub label: String,
    pub expression: String,
    pub source_name: String,
    pub kind: LateEvalKind,
}

/// Symbol list entry, in order of definition.
#[derive(Debug, Clone)]
pub struct MapSymbol {
    pub name: String,
    pub value: i32,
    pub section: i16,
    pub local: bool,
}

/// Local labels are removed when their scope exits (or a global label is
/// defined); `scope_reserve` additionally releases a pool allocation.
#[derive(Debug, Clone)]
struct LocalLabelRecord {
    label: String,
    scope_depth: i32,
    scope_reserve: bool,
}

/// Protected labels imported from one object file.
#[derive(Debug, Default)]
pub struct ExtLabels {
    pub labels: HashMap<String, Label>,
}

/// One recorded diagnostic, formatted for stderr.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub fatal: bool,
}

/// Byte offset of `slice` within `source`; both must view the same buffer.
pub(crate) fn offset_in(source: &str, slice: &str) -> usize {
    slice.as_ptr() as usize - source.as_ptr() as usize
}

/// The state of the assembler.
pub struct Assembler {
    pub labels: HashMap<String, Label>,
    pub macros: HashMap<String, Macro>,
    pub label_pools: HashMap<String, LabelPool>,
    pub structs: StructTable,
    pub xdefs: HashSet<String>,

    pub late_evals: Vec<LateEval>,
    local_labels: Vec<LocalLabelRecord>,
    pub include_paths: Vec<PathBuf>,
    pub sections: Vec<Section>,
    pub externals: Vec<ExtLabels>,
    pub map: Vec<MapSymbol>,

    pub cpu: CpuIndex,
    pub opcodes: OpcodeTable,
    pub directives: HashMap<&'static str, Directive>,

    pub context: ContextStack,
    pub current_section: usize,
    pub syntax: Syntax,

    pub conditionals: ConditionalStack,
    pub scope_address: [i32; MAX_SCOPE_DEPTH],
    pub scope_depth: i32,

    pub export_base_name: String,
    pub last_label: String,
    pub accumulator_16bit: bool,
    pub index_reg_16bit: bool,
    pub cycle_counter_level: u8,
    pub error_encountered: bool,
    /// Macros end with `endm`/`endr` instead of brace scoping.
    pub end_macro_directive: bool,
    /// Link every remaining relative section when the current one ends.
    pub link_all_section: bool,

    pub diagnostics: Vec<Diagnostic>,
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler::with_syntax(Syntax::Sane)
    }

    pub fn with_syntax(syntax: Syntax) -> Assembler {
        let cpu = CpuIndex::Cpu6502;
        Assembler {
            labels: HashMap::new(),
            macros: HashMap::new(),
            label_pools: HashMap::new(),
            structs: StructTable::new(),
            xdefs: HashSet::new(),
            late_evals: Vec::with_capacity(64),
            local_labels: Vec::with_capacity(256),
            include_paths: Vec::new(),
            sections: vec![Section::fixed("default", 0x1000)],
            externals: Vec::new(),
            map: Vec::new(),
            cpu,
            opcodes: OpcodeTable::build(cpu_details(cpu)),
            directives: build_directive_table(syntax),
            context: ContextStack::new(),
            current_section: 0,
            syntax,
            conditionals: ConditionalStack::new(),
            scope_address: [0; MAX_SCOPE_DEPTH],
            scope_depth: 0,
            export_base_name: String::new(),
            last_label: String::new(),
            accumulator_16bit: false,
            index_reg_16bit: false,
            cycle_counter_level: 0,
            error_encountered: false,
            end_macro_directive: false,
            link_all_section: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn set_cpu(&mut self, cpu: CpuIndex) {
        self.cpu = cpu;
        self.opcodes = OpcodeTable::build(cpu_details(cpu));
    }

    pub fn set_syntax(&mut self, syntax: Syntax) {
        self.syntax = syntax;
        self.directives = build_directive_table(syntax);
    }

    pub fn curr_section(&self) -> &Section {
        &self.sections[self.current_section]
    }

    pub fn curr_section_mut(&mut self) -> &mut Section {
        &mut self.sections[self.current_section]
    }

    pub fn section_id(&self) -> i32 {
        self.current_section as i32
    }

    // scope management

    pub fn enter_scope(&mut self) -> Result<(), StatusCode> {
        if self.scope_depth as usize >= MAX_SCOPE_DEPTH - 1 {
            return Err(StatusCode::TooDeepScope);
        }
        self.scope_depth += 1;
        self.scope_address[self.scope_depth as usize] = self.curr_section().pc();
        Ok(())
    }

    pub fn exit_scope(&mut self) -> Result<(), StatusCode> {
        let end_pc = self.curr_section().pc();
        self.check_late_eval(None, end_pc, false)?;
        self.flush_local_labels(self.scope_depth)?;
        self.flush_label_pools(self.scope_depth);
        self.scope_depth -= 1;
        if self.scope_depth < 0 {
            self.scope_depth = 0;
            return Err(StatusCode::UnbalancedScopeClosure);
        }
        Ok(())
    }

    /// Drop local labels at or above the current depth. `scope_exit` decides
    /// whether pool reservations release along with their labels.
    pub(crate) fn flush_local_labels(&mut self, scope_exit: i32) -> Result<(), StatusCode> {
        let mut status = Ok(());
        let mut at = self.local_labels.len();
        while at > 0 {
            at -= 1;
            if self.local_labels[at].scope_depth < self.scope_depth {
                break;
            }
            let record = self.local_labels[at].clone();
            if let Err(err) = self.check_late_eval(Some(record.label.as_str()), -1, false) {
                status = Err(err);
            }
            if !record.scope_reserve || record.scope_depth <= scope_exit {
                if let Some(label) = self.labels.remove(&record.label) {
                    if record.scope_reserve {
                        if let Some(pool_name) = &label.pool_name {
                            if let Some(pool) = self.label_pools.get_mut(pool_name) {
                                let _ = pool.release(label.value as u32);
                            }
                        }
                    }
                }
                self.local_labels.remove(at);
            }
        }
        status
    }

    /// Pools declared at or above the exiting scope depth are dropped.
    fn flush_label_pools(&mut self, scope_exit: i32) {
        self.label_pools.retain(|_, pool| pool.scope_depth < scope_exit);
    }

    pub(crate) fn mark_label_local(&mut self, label: &str, scope_reserve: bool) {
        self.local_labels.push(LocalLabelRecord {
            label: label.to_string(),
            scope_depth: self.scope_depth,
            scope_reserve,
        });
    }

    // diagnostics

    pub fn record_error(&mut self, line: &str, status: StatusCode) {
        let (file, line_num) = if self.context.has_work() {
            let ctx = self.context.curr();
            (
                ctx.source_name.to_string(),
                ctx.line_number_of(ctx.read_pos),
            )
        } else {
            (String::new(), 0)
        };
        let message = if file.is_empty() {
            format!("Error: {} \"{}\"", status.message(), line.trim())
        } else {
            format!(
                "Error {}({}): {} \"{}\"",
                file,
                line_num,
                status.message(),
                line.trim()
            )
        };
        self.error_encountered = true;
        self.diagnostics.push(Diagnostic {
            message,
            fatal: status.stops_processing(),
        });
    }

    // line classification

    fn is_label_char(&self, c: char) -> bool {
        match self.syntax {
            Syntax::Merlin => {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | '!' | ']' | ':' | '?')
            }
            // '#' keeps the "#if" family of conditionals tokenizing whole
            Syntax::Sane => {
                c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | '!' | '.' | '#')
            }
        }
    }

    fn strip_comment<'a>(&self, line: &'a str) -> &'a str {
        let mut end = line.len();
        if let Some(at) = line.find(';') {
            end = end.min(at);
        }
        if let Some(at) = line.find("//") {
            end = end.min(at);
        }
        &line[..end]
    }

    /// Process one logical line; `line_start..line_end` is its byte range
    /// within the current frame's source.
    pub fn build_line(&mut self, line_start: usize, line_end: usize) -> StatusCode {
        let source = self.context.curr().source_file.clone();
        let full_line = &source[line_start..line_end];

        // MERLIN: first char of line is * means comment
        if self.syntax == Syntax::Merlin && full_line.starts_with('*') {
            return StatusCode::Ok;
        }

        let mut line: &str = full_line;
        let mut error = StatusCode::Ok;
        while !line.trim().is_empty() && error == StatusCode::Ok {
            let line_iter_start = line;
            let char0 = line.chars().next().unwrap_or(' ');
            let mut work = self.strip_comment(line.trim_start()).trim_end();

            // Kick Assembler macro prefix (incompatible with merlin)
            if self.syntax != Syntax::Merlin {
                if let Some(stripped) = work.strip_prefix(':') {
                    work = stripped;
                }
            }

            let op_end = work
                .char_indices()
                .find(|&(_, c)| !self.is_label_char(c))
                .map(|(at, _)| at)
                .unwrap_or(work.len());
            let operation_full = &work[..op_end];
            let rest = &work[op_end..];
            let rest_trimmed = rest.trim_start();

            let char1 = operation_full.chars().next().unwrap_or('\0');
            let char_end = operation_full.chars().last().unwrap_or('\0');

            let mut force_label = char_end == ':' || char_end == '$';
            if !force_label
                && self.syntax == Syntax::Merlin
                && (!rest_trimmed.is_empty() || !operation_full.is_empty())
            {
                // MERLIN labels live in the first column; anything else
                // indented is an operation
                force_label = !char0.is_whitespace() || char1 == ']' || char_end == '?';
            } else if !force_label
                && self.syntax != Syntax::Merlin
                && rest_trimmed.starts_with(':')
            {
                force_label = true;
            }

            if operation_full.is_empty() && !force_label {
                if self.conditionals.assembling() {
                    match rest_trimmed.chars().next() {
                        Some('{') => {
                            error = self.enter_scope().err().unwrap_or(StatusCode::Ok);
                            if error == StatusCode::Ok {
                                line = &rest_trimmed[1..];
                                continue;
                            }
                        }
                        Some('}') => {
                            error = self.exit_scope().err().unwrap_or(StatusCode::Ok);
                            if error == StatusCode::Ok {
                                line = &rest_trimmed[1..];
                                continue;
                            }
                        }
                        _ => line = "",
                    }
                } else {
                    line = "";
                }
            } else {
                let label = operation_full;
                // leading period belongs to directives, not labels
                let mut operation = operation_full;
                if operation.starts_with('.')
                    || (self.syntax != Syntax::Merlin && operation.starts_with(':'))
                {
                    operation = &operation[1..];
                }
                let name_len = operation.find('.').unwrap_or(operation.len());
                let operation_name = &operation[..name_len];
                let operation_lower = operation_name.to_ascii_lowercase();
                // argument text, keeping any `.b`/`.w` suffix in front
                let suffix_len = operation.len() - name_len;
                let after_op = &work[op_end - suffix_len..];
                let after_op = if suffix_len == 0 { after_op.trim_start() } else { after_op };

                let directive = self.directives.get(operation_lower.as_str()).copied();
                let mnemonic = self.opcodes.lookup(&operation_lower);

                if (directive.is_some() || mnemonic.is_some())
                    && !force_label
                    && (directive.is_some() || !after_op.trim_start().starts_with('='))
                {
                    if let Some(dir) = directive {
                        error = self.apply_directive(dir, after_op, line_start);
                    } else if self.conditionals.assembling() {
                        error = self
                            .add_opcode(after_op, mnemonic.unwrap())
                            .err()
                            .unwrap_or(StatusCode::Ok);
                    }
                    line = "";
                } else if !self.conditionals.assembling() {
                    line = "";
                } else if rest_trimmed.starts_with('=') {
                    let expr = rest_trimmed[1..].trim_start();
                    error = self
                        .assign_label(label, expr, false)
                        .err()
                        .unwrap_or(StatusCode::Ok);
                    line = "";
                } else if rest_trimmed
                    .get(..3)
                    .is_some_and(|word| word.eq_ignore_ascii_case("equ"))
                    && !rest_trimmed[3..].starts_with(|c: char| self.is_label_char(c))
                {
                    let expr = rest_trimmed[3..].trim_start();
                    error = self
                        .assign_label(label, expr, false)
                        .err()
                        .unwrap_or(StatusCode::Ok);
                    line = "";
                } else if let Some(mac) = self.macros.get(label).cloned() {
                    error = self
                        .invoke_macro(&mac, rest_trimmed)
                        .err()
                        .unwrap_or(StatusCode::Ok);
                    line = "";
                } else if self.label_pools.contains_key(label) {
                    error = self
                        .assign_pool_label(label, rest_trimmed)
                        .err()
                        .unwrap_or(StatusCode::Ok);
                    line = "";
                } else if self.syntax == Syntax::Merlin && char0.is_whitespace() {
                    error = StatusCode::UndefinedCode;
                } else if label.starts_with('$')
                    || label.chars().next().is_some_and(|c| c.is_ascii_digit())
                {
                    line = "";
                } else {
                    let clean = label.strip_suffix(':').unwrap_or(label);
                    error = self.address_label(clean).err().unwrap_or(StatusCode::Ok);
                    // there may be code after the label
                    line = rest.strip_prefix([':', '?']).unwrap_or(rest);
                }
            }

            if !error.stops_processing() && line == line_iter_start {
                error = StatusCode::UnableToProcess;
            }
            if error == StatusCode::Ok
                && self.curr_section().section_type == SectionType::Zeropage
                && self.curr_section().address > 0x100
            {
                error = StatusCode::ZeropageSectionOutOfRange;
            }

            if error.is_error() {
                self.record_error(full_line, error);
            }
            if !error.stops_processing() {
                error = StatusCode::Ok;
            }
        }
        error
    }

    /// Run the current context frame to exhaustion.
    pub fn build_segment(&mut self) -> StatusCode {
        let mut error = StatusCode::Ok;
        while self.context.curr().has_input() {
            let (start, end) = {
                let ctx = self.context.curr_mut();
                let source = ctx.source_file.clone();
                ctx.next_pos = ctx.read_pos;
                take_line(&source, &mut ctx.next_pos, ctx.seg_end)
            };
            error = self.build_line(start, end);
            if error.stops_processing() {
                break;
            }
            // a file or macro must not end inside an open conditional
            let exhausted = self.context.curr().next_pos >= self.context.curr().seg_end;
            if exhausted && self.conditionals.unterminated() {
                if self.syntax == Syntax::Merlin {
                    self.conditionals.reset();
                } else {
                    let line = self.context.curr().source_file[start..end].to_string();
                    self.record_error(&line, StatusCode::UnterminatedCondition);
                    self.conditionals.reset();
                    return StatusCode::UnterminatedCondition;
                }
            }
            let ctx = self.context.curr_mut();
            ctx.read_pos = ctx.next_pos;
        }
        if error == StatusCode::Ok {
            let end_pc = self.curr_section().pc();
            if let Err(err) = self.check_late_eval(None, end_pc, false) {
                error = err;
            }
        }
        error
    }

    /// Assemble a whole source buffer. With `obj_target` set, unresolved
    /// late evals are kept for a later link instead of reported.
    pub fn assemble(&mut self, source: &str, filename: &str, obj_target: bool) {
        let src: Rc<str> = Rc::from(source);
        let name: Rc<str> = Rc::from(filename);
        let len = src.len();
        self.context.push(name, src, 0, len, 1);
        self.scope_address[self.scope_depth as usize] = self.curr_section().pc();

        while self.context.has_work() {
            let _ = self.build_segment();
            if self.context.curr_mut().complete() {
                let scoped = self.context.curr().scoped_context;
                if scoped && self.scope_depth > 0 {
                    let _ = self.exit_scope();
                }
                self.context.pop();
            } else {
                self.context.curr_mut().restart();
            }
        }
        if self.link_all_section {
            self.link_all_to_section();
        }

        match self.check_late_eval(None, -1, false) {
            Err(err) if err.is_error() => {
                self.error_encountered = true;
                self.diagnostics.push(Diagnostic {
                    message: format!("Error: {}", err.message()),
                    fatal: err.stops_processing(),
                });
            }
            _ => {
                // surface anything still blocked on missing externals
                let _ = self.check_late_eval(None, -1, true);
            }
        }

        if !obj_target && !self.late_evals.is_empty() {
            for late in &self.late_evals {
                self.diagnostics.push(Diagnostic {
                    message: format!(
                        "Error ({}): Failed to evaluate label \"{}\"",
                        late.source_name, late.expression
                    ),
                    fatal: false,
                });
            }
            self.error_encountered = true;
        }
    }
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

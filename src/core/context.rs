// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source context frames and the context stack.
//!
//! Each frame pins its whole source buffer (file, include, or macro
//! expansion) behind an `Rc<str>` and tracks positions as byte offsets into
//! it, so pushing and popping frames never disturbs the caller's iteration
//! state. `read_pos` is the start of the line being processed; `next_pos`
//! is where processing resumes, which directives that consume further lines
//! (macro, rept, struct, enum) advance past their bodies.

use std::rc::Rc;

/// Currently processed file, include, or macro expansion.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub source_name: Rc<str>,
    pub source_file: Rc<str>,
    pub seg_start: usize,
    pub seg_end: usize,
    pub read_pos: usize,
    pub next_pos: usize,
    pub repeat: i32,
    pub repeat_total: i32,
    pub scoped_context: bool,
}

impl SourceContext {
    pub fn restart(&mut self) {
        self.read_pos = self.seg_start;
    }

    /// Decrement the repeat counter; true when the frame is exhausted.
    pub fn complete(&mut self) -> bool {
        self.repeat -= 1;
        self.repeat <= 0
    }

    pub fn has_input(&self) -> bool {
        self.read_pos < self.seg_end
    }

    /// Count of finished repeats, exposed to expressions as `REPT`.
    pub fn rept_count(&self) -> i32 {
        self.repeat_total - self.repeat
    }

    /// 1-based line number of a byte offset within the source.
    pub fn line_number_of(&self, offset: usize) -> usize {
        let clamped = offset.min(self.source_file.len());
        self.source_file[..clamped]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }
}

/// Split the next logical line out of `src` starting at `*pos` (bounded by
/// `end`), advancing `*pos` past the terminator. Returns the line's byte
/// range within `src`.
pub fn take_line(src: &str, pos: &mut usize, end: usize) -> (usize, usize) {
    let start = *pos;
    let bytes = src.as_bytes();
    let mut at = start;
    while at < end && bytes[at] != b'\n' && bytes[at] != b'\r' {
        at += 1;
    }
    let line_end = at;
    if at < end && bytes[at] == b'\r' {
        at += 1;
    }
    if at < end && bytes[at] == b'\n' {
        at += 1;
    }
    *pos = at;
    (start, line_end)
}

/// Stack of source contexts; exactly one frame is current at a time.
#[derive(Debug, Default)]
pub struct ContextStack {
    stack: Vec<SourceContext>,
}

impl ContextStack {
    pub fn new() -> ContextStack {
        ContextStack { stack: Vec::with_capacity(32) }
    }

    pub fn has_work(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn curr(&self) -> &SourceContext {
        self.stack.last().expect("context stack is empty")
    }

    pub fn curr_mut(&mut self) -> &mut SourceContext {
        self.stack.last_mut().expect("context stack is empty")
    }

    /// Push a new frame covering `seg_start..seg_end` of `source_file`.
    pub fn push(
        &mut self,
        source_name: Rc<str>,
        source_file: Rc<str>,
        seg_start: usize,
        seg_end: usize,
        repeat: i32,
    ) {
        if let Some(curr) = self.stack.last_mut() {
            curr.read_pos = curr.next_pos;
        }
        self.stack.push(SourceContext {
            source_name,
            source_file,
            seg_start,
            seg_end,
            read_pos: seg_start,
            next_pos: seg_start,
            repeat,
            repeat_total: repeat,
            scoped_context: false,
        });
    }

    pub fn pop(&mut self) -> Option<SourceContext> {
        self.stack.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::{take_line, ContextStack};
    use std::rc::Rc;

    #[test]
    fn take_line_handles_lf_and_crlf() {
        let src = "one\r\ntwo\nthree";
        let mut pos = 0;
        let (s, e) = take_line(src, &mut pos, src.len());
        assert_eq!(&src[s..e], "one");
        let (s, e) = take_line(src, &mut pos, src.len());
        assert_eq!(&src[s..e], "two");
        let (s, e) = take_line(src, &mut pos, src.len());
        assert_eq!(&src[s..e], "three");
        assert_eq!(pos, src.len());
    }

    #[test]
    fn push_preserves_caller_resume_point() {
        let mut stack = ContextStack::new();
        let outer: Rc<str> = Rc::from("aaa\nbbb\n");
        let inner: Rc<str> = Rc::from("macro body\n");
        stack.push(Rc::from("outer"), outer.clone(), 0, outer.len(), 1);
        stack.curr_mut().next_pos = 4; // resume at "bbb"
        stack.push(Rc::from("inner"), inner.clone(), 0, inner.len(), 1);
        assert_eq!(stack.curr().source_name.as_ref(), "inner");
        stack.pop();
        assert_eq!(stack.curr().read_pos, 4);
    }

    #[test]
    fn repeat_counts_down_to_completion() {
        let mut stack = ContextStack::new();
        let src: Rc<str> = Rc::from("nop\n");
        stack.push(Rc::from("rept"), src.clone(), 0, src.len(), 3);
        assert_eq!(stack.curr().rept_count(), 0);
        assert!(!stack.curr_mut().complete());
        assert_eq!(stack.curr().rept_count(), 1);
        assert!(!stack.curr_mut().complete());
        assert!(stack.curr_mut().complete());
    }
}

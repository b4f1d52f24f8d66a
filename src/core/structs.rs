// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Struct and enum member tables.
//!
//! A struct is an ordered list of `(offset, name, optional sub-struct)`
//! members plus a total size. Enums are structs with zero total size and
//! incrementing member offsets. Dotted paths (`Outer.Inner.field`) resolve
//! by walking the member tables and summing offsets.

use std::collections::HashMap;

use crate::core::status::{AsmResult, StatusCode};

#[derive(Debug, Clone)]
pub struct MemberOffset {
    pub offset: u16,
    pub name: String,
    pub sub_struct: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LabelStruct {
    pub name: String,
    pub members: Vec<MemberOffset>,
    pub size: u16,
}

/// All structs and enums declared during a session, keyed by name.
#[derive(Debug, Default)]
pub struct StructTable {
    structs: HashMap<String, LabelStruct>,
}

impl StructTable {
    pub fn new() -> StructTable {
        StructTable::default()
    }

    pub fn get(&self, name: &str) -> Option<&LabelStruct> {
        self.structs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    /// Member size for a struct declaration type: `byte`, `word`, or a
    /// previously declared struct name.
    pub fn member_size(&self, type_name: &str) -> Option<(u16, Option<String>)> {
        if type_name.eq_ignore_ascii_case("byte") {
            Some((1, None))
        } else if type_name.eq_ignore_ascii_case("word") {
            Some((2, None))
        } else {
            self.structs
                .get(type_name)
                .map(|sub| (sub.size, Some(sub.name.clone())))
        }
    }

    pub fn insert(&mut self, entry: LabelStruct) -> AsmResult<()> {
        if self.structs.contains_key(&entry.name) {
            return Err(StatusCode::StructAlreadyDefined);
        }
        self.structs.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Evaluate a dotted member path as an offset. `NotStruct` lets the
    /// caller fall through to ordinary label lookup.
    pub fn eval(&self, path: &str) -> AsmResult<i32> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some(mut current) = self.structs.get(segments[0]) else {
            return Err(StatusCode::NotStruct);
        };
        let mut offset: i32 = 0;
        for (at, segment) in segments.iter().enumerate().skip(1) {
            let member = current
                .members
                .iter()
                .find(|m| m.name == *segment)
                .ok_or(StatusCode::ReferencedStructNotFound)?;
            offset += member.offset as i32;
            match &member.sub_struct {
                Some(sub) => {
                    current = self
                        .structs
                        .get(sub)
                        .ok_or(StatusCode::ReferencedStructNotFound)?;
                }
                // a plain member with a tail left over is not a struct
                // path after all; let the caller try a label lookup
                None if at + 1 < segments.len() => return Err(StatusCode::NotStruct),
                None => break,
            }
        }
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelStruct, MemberOffset, StructTable};
    use crate::core::status::StatusCode;

    fn table() -> StructTable {
        let mut t = StructTable::new();
        t.insert(LabelStruct {
            name: "Point".into(),
            members: vec![
                MemberOffset { offset: 0, name: "x".into(), sub_struct: None },
                MemberOffset { offset: 2, name: "y".into(), sub_struct: None },
            ],
            size: 4,
        })
        .unwrap();
        t.insert(LabelStruct {
            name: "Rect".into(),
            members: vec![
                MemberOffset { offset: 0, name: "min".into(), sub_struct: Some("Point".into()) },
                MemberOffset { offset: 4, name: "max".into(), sub_struct: Some("Point".into()) },
            ],
            size: 8,
        })
        .unwrap();
        t
    }

    #[test]
    fn dotted_path_sums_offsets() {
        let t = table();
        assert_eq!(t.eval("Rect.max.y").unwrap(), 6);
        assert_eq!(t.eval("Rect.min").unwrap(), 0);
        assert_eq!(t.eval("Point.y").unwrap(), 2);
    }

    #[test]
    fn unknown_root_is_not_struct() {
        let t = table();
        assert_eq!(t.eval("speed"), Err(StatusCode::NotStruct));
    }

    #[test]
    fn unknown_member_is_an_error() {
        let t = table();
        assert_eq!(t.eval("Point.z"), Err(StatusCode::ReferencedStructNotFound));
    }

    #[test]
    fn plain_member_with_tail_falls_back_to_labels() {
        let t = table();
        assert_eq!(t.eval("Point.x.low"), Err(StatusCode::NotStruct));
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut t = table();
        let err = t.insert(LabelStruct { name: "Point".into(), members: Vec::new(), size: 0 });
        assert_eq!(err, Err(StatusCode::StructAlreadyDefined));
    }

    #[test]
    fn member_size_resolves_primitives_and_structs() {
        let t = table();
        assert_eq!(t.member_size("byte"), Some((1, None)));
        assert_eq!(t.member_size("WORD"), Some((2, None)));
        assert_eq!(t.member_size("Point"), Some((4, Some("Point".into()))));
        assert_eq!(t.member_size("Sprite"), None);
    }
}

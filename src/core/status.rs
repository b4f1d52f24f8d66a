// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Status and error codes for the assembly session.
//!
//! A single flat enumeration covers non-error statuses (used as soft
//! signals between the evaluator and its callers), recoverable diagnostics
//! (assembly continues with the next line), and fatal errors (the current
//! source segment is abandoned). The ordering of the variants is load
//! bearing: everything from `UndefinedCode` up is an error, everything from
//! `TargetAddressMustEvaluateImmediately` up stops processing.

use std::fmt;

/// Result alias used throughout the assembler core.
pub type AsmResult<T> = Result<T, StatusCode>;

/// Internal status and error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusCode {
    Ok,
    RelativeSection,
    NotReady,
    XrefDependent,
    NotStruct,

    // recoverable errors: reported, assembly continues with the next line
    UndefinedCode,
    UnexpectedCharacterInExpression,
    TooManyValuesInExpression,
    TooManyOperatorsInExpression,
    UnbalancedRightParenthesis,
    ExpressionOperation,
    ExpressionMissingValues,
    InstructionNotZp,
    InvalidAddressingMode,
    BranchOutOfRange,
    LabelMisplacedInternal,
    BadAddressingMode,
    UnexpectedCharacterInAddressingMode,
    UnexpectedLabelAssignmentFormat,
    ModifyingConstLabel,
    OutOfLabelsInPool,
    InternalLabelPoolError,
    PoolRangeExpressionEval,
    LabelPoolRedeclaration,
    PoolLabelAlreadyDefined,
    StructAlreadyDefined,
    ReferencedStructNotFound,
    BadTypeForDeclareConstant,
    ReptCountExpression,
    HexWithOddNibbleCount,
    DsMustEvaluateImmediately,
    NotAnObjectFile,
    CouldNotIncludeFile,

    // fatal errors: the current source segment is abandoned
    TargetAddressMustEvaluateImmediately,
    TooDeepScope,
    UnbalancedScopeClosure,
    BadMacroFormat,
    AlignMustEvaluateImmediately,
    OutOfMemoryForMacroExpansion,
    ConditionCouldNotBeResolved,
    EndifWithoutCondition,
    ElseWithoutIf,
    StructCantBeAssembled,
    EnumCantBeAssembled,
    UnterminatedCondition,
    ReptMissingScope,
    LinkerMustBeInFixedAddressSection,
    LinkerCantLinkToDummySection,
    UnableToProcess,
    SectionTargetOffsetOutOfRange,
    CpuNotSupported,
    CantAppendSectionToTarget,
    ZeropageSectionOutOfRange,
}

impl StatusCode {
    /// First variant that is an error rather than a status.
    pub const FIRST_ERROR: StatusCode = StatusCode::UndefinedCode;

    /// Errors at or above this stop processing of the current segment.
    pub const STOP_PROCESSING: StatusCode = StatusCode::TargetAddressMustEvaluateImmediately;

    pub fn is_error(self) -> bool {
        self >= Self::FIRST_ERROR
    }

    pub fn stops_processing(self) -> bool {
        self >= Self::STOP_PROCESSING
    }

    pub fn message(self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::RelativeSection => "relative section",
            StatusCode::NotReady => "not ready",
            StatusCode::XrefDependent => "XREF dependent result",
            StatusCode::NotStruct => "name is not a struct",
            StatusCode::UndefinedCode => "Undefined code",
            StatusCode::UnexpectedCharacterInExpression => "Unexpected character in expression",
            StatusCode::TooManyValuesInExpression => "Too many values in expression",
            StatusCode::TooManyOperatorsInExpression => "Too many operators in expression",
            StatusCode::UnbalancedRightParenthesis => {
                "Unbalanced right parenthesis in expression"
            }
            StatusCode::ExpressionOperation => "Expression operation",
            StatusCode::ExpressionMissingValues => "Expression missing values",
            StatusCode::InstructionNotZp => "Instruction can not be zero page",
            StatusCode::InvalidAddressingMode => "Invalid addressing mode for instruction",
            StatusCode::BranchOutOfRange => "Branch out of range",
            StatusCode::LabelMisplacedInternal => "Internal label organization mishap",
            StatusCode::BadAddressingMode => "Bad addressing mode",
            StatusCode::UnexpectedCharacterInAddressingMode => {
                "Unexpected character in addressing mode"
            }
            StatusCode::UnexpectedLabelAssignmentFormat => "Unexpected label assignment format",
            StatusCode::ModifyingConstLabel => "Changing value of label that is constant",
            StatusCode::OutOfLabelsInPool => "Out of labels in pool",
            StatusCode::InternalLabelPoolError => "Internal label pool release confusion",
            StatusCode::PoolRangeExpressionEval => "Label pool range evaluation failed",
            StatusCode::LabelPoolRedeclaration => "Label pool was redeclared within its scope",
            StatusCode::PoolLabelAlreadyDefined => "Pool label already defined",
            StatusCode::StructAlreadyDefined => "Struct already defined",
            StatusCode::ReferencedStructNotFound => "Referenced struct not found",
            StatusCode::BadTypeForDeclareConstant => {
                "Declare constant type not recognized (dc.?)"
            }
            StatusCode::ReptCountExpression => "rept count expression could not be evaluated",
            StatusCode::HexWithOddNibbleCount => {
                "hex must be followed by an even number of hex numbers"
            }
            StatusCode::DsMustEvaluateImmediately => "DS directive failed to evaluate immediately",
            StatusCode::NotAnObjectFile => "File is not a valid object file",
            StatusCode::CouldNotIncludeFile => "Failed to read include file",
            StatusCode::TargetAddressMustEvaluateImmediately => {
                "Target address must evaluate immediately for this operation"
            }
            StatusCode::TooDeepScope => "Scoping is too deep",
            StatusCode::UnbalancedScopeClosure => "Unbalanced scope closure",
            StatusCode::BadMacroFormat => "Unexpected macro formatting",
            StatusCode::AlignMustEvaluateImmediately => "Align must evaluate immediately",
            StatusCode::OutOfMemoryForMacroExpansion => "Out of memory for macro expansion",
            StatusCode::ConditionCouldNotBeResolved => "Conditional could not be resolved",
            StatusCode::EndifWithoutCondition => {
                "#endif encountered outside conditional block"
            }
            StatusCode::ElseWithoutIf => "#else or #elif outside conditional block",
            StatusCode::StructCantBeAssembled => "Struct can not be assembled as is",
            StatusCode::EnumCantBeAssembled => "Enum can not be assembled as is",
            StatusCode::UnterminatedCondition => {
                "Conditional assembly (#if/#ifdef) was not terminated in file or macro"
            }
            StatusCode::ReptMissingScope => "rept is missing a scope ('{ ... }')",
            StatusCode::LinkerMustBeInFixedAddressSection => {
                "Link can only be used in a fixed address section"
            }
            StatusCode::LinkerCantLinkToDummySection => "Link can not be used in dummy sections",
            StatusCode::UnableToProcess => "Can not process this line",
            StatusCode::SectionTargetOffsetOutOfRange => {
                "Unexpected target offset for reloc or late evaluation"
            }
            StatusCode::CpuNotSupported => "CPU is not supported",
            StatusCode::CantAppendSectionToTarget => "Can't append sections",
            StatusCode::ZeropageSectionOutOfRange => {
                "Zero page / Direct page section out of range"
            }
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for StatusCode {}

#[cfg(test)]
mod tests {
    use super::StatusCode;

    #[test]
    fn statuses_below_first_error_are_not_errors() {
        for status in [
            StatusCode::Ok,
            StatusCode::RelativeSection,
            StatusCode::NotReady,
            StatusCode::XrefDependent,
            StatusCode::NotStruct,
        ] {
            assert!(!status.is_error(), "{status:?} must not be an error");
            assert!(!status.stops_processing());
        }
    }

    #[test]
    fn recoverable_errors_do_not_stop_processing() {
        assert!(StatusCode::BranchOutOfRange.is_error());
        assert!(!StatusCode::BranchOutOfRange.stops_processing());
        assert!(StatusCode::CouldNotIncludeFile.is_error());
        assert!(!StatusCode::CouldNotIncludeFile.stops_processing());
    }

    #[test]
    fn fatal_errors_stop_processing() {
        assert!(StatusCode::TooDeepScope.stops_processing());
        assert!(StatusCode::ZeropageSectionOutOfRange.stops_processing());
        assert!(StatusCode::UnterminatedCondition.stops_processing());
    }
}

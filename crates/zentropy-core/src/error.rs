//! Error types for entropy coding operations.
//!
//! Every fallible operation in the entropy stage reports one of a fixed set
//! of codes. They split into two families that callers treat differently:
//!
//! - **Capacity** errors ([`Error::DstSizeTooSmall`], [`Error::WorkSpaceTooSmall`],
//!   [`Error::MemoryAllocation`]): the input is fine, the caller may resize
//!   and retry.
//! - **Corruption** errors ([`Error::CorruptionDetected`],
//!   [`Error::DictionaryCorrupted`], [`Error::SrcSizeWrong`]): the input
//!   cannot be decoded, abandon the frame.
//!
//! Nothing in the entropy stage retries internally.

use thiserror::Error;

/// Result type alias for entropy coding operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Entropy coding error codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Destination buffer cannot hold the output.
    #[error("destination too small: need {required} bytes, got {provided}")]
    DstSizeTooSmall { required: usize, provided: usize },

    /// Source size is zero or inconsistent with its header.
    #[error("source size wrong: {0}")]
    SrcSizeWrong(&'static str),

    /// Input failed a structural check while decoding.
    #[error("corruption detected: {0}")]
    CorruptionDetected(String),

    /// Requested or decoded table log exceeds the permitted maximum.
    #[error("table log {log} too large (max {max})")]
    TableLogTooLarge { log: u32, max: u32 },

    /// Symbol alphabet larger than the table format can describe.
    #[error("max symbol value {value} too large (max {max})")]
    MaxSymbolValueTooLarge { value: u32, max: u32 },

    /// Input contains a symbol above the declared max symbol value.
    #[error("max symbol value too small: found symbol {found}, declared {declared}")]
    MaxSymbolValueTooSmall { found: u32, declared: u32 },

    /// Workspace arena could not satisfy a reservation.
    #[error("workspace too small: need {required} bytes, have {available}")]
    WorkSpaceTooSmall { required: usize, available: usize },

    /// Invariant violation that is not attributable to the input.
    #[error("generic error: {0}")]
    Generic(&'static str),

    /// Backing allocation failed.
    #[error("memory allocation failed for {requested_bytes} bytes")]
    MemoryAllocation { requested_bytes: usize },

    /// A repeat-mode table was requested but none is available.
    #[error("dictionary corrupted: {0}")]
    DictionaryCorrupted(&'static str),
}

impl Error {
    /// Create a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::CorruptionDetected(message.into())
    }

    /// Create a corruption error with offset context.
    pub fn corrupted_at(message: impl Into<String>, offset: usize) -> Self {
        Error::CorruptionDetected(format!("{} at offset {}", message.into(), offset))
    }

    /// Create a destination-too-small error.
    pub fn dst_too_small(required: usize, provided: usize) -> Self {
        Error::DstSizeTooSmall { required, provided }
    }

    /// Create a table-log-too-large error.
    pub fn table_log_too_large(log: u32, max: u32) -> Self {
        Error::TableLogTooLarge { log, max }
    }

    /// Create a generic error.
    pub fn generic(message: &'static str) -> Self {
        Error::Generic(message)
    }

    /// Create a workspace-too-small error.
    pub fn workspace_too_small(required: usize, available: usize) -> Self {
        Error::WorkSpaceTooSmall {
            required,
            available,
        }
    }

    /// Check if the caller may resize buffers and retry.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Error::DstSizeTooSmall { .. }
                | Error::WorkSpaceTooSmall { .. }
                | Error::MemoryAllocation { .. }
        )
    }

    /// Check if the error means the input itself is undecodable.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptionDetected(_) | Error::DictionaryCorrupted(_) | Error::SrcSizeWrong(_)
        )
    }

    /// Stable code name, matching the reference error enumeration.
    pub fn category(&self) -> &'static str {
        match self {
            Error::DstSizeTooSmall { .. } => "dstSize_tooSmall",
            Error::SrcSizeWrong(_) => "srcSize_wrong",
            Error::CorruptionDetected(_) => "corruption_detected",
            Error::TableLogTooLarge { .. } => "tableLog_tooLarge",
            Error::MaxSymbolValueTooLarge { .. } => "maxSymbolValue_tooLarge",
            Error::MaxSymbolValueTooSmall { .. } => "maxSymbolValue_tooSmall",
            Error::WorkSpaceTooSmall { .. } => "workSpace_tooSmall",
            Error::Generic(_) => "GENERIC",
            Error::MemoryAllocation { .. } => "memory_allocation",
            Error::DictionaryCorrupted(_) => "dictionary_corrupted",
        }
    }
}

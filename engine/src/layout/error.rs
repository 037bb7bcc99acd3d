use thiserror::Error;

/// Failures raised by the view/binary-layout layer and the type-string parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// A view was constructed over an offset that does not satisfy the
    /// required alignment.
    #[error("misaligned view: offset {offset} is not a multiple of alignment {alignment}")]
    Misaligned { offset: usize, alignment: usize },

    /// A tagged union was read with a discriminant outside its declared
    /// variant set.
    #[error("invalid union tag {tag}, expected one of 0..{variant_count}")]
    InvalidTag { tag: u32, variant_count: u32 },

    /// An enum field was written (or, in safety-checked builds, read) with a
    /// value outside its declared member set.
    #[error("invalid enum value {value} for enum with {member_count} members")]
    InvalidEnum { value: u32, member_count: u32 },

    /// The type-string grammar rejected malformed input.
    #[error("parse error at position {pos}: {snippet}")]
    ParseError { pos: usize, snippet: String },
}

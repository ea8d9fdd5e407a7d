use thiserror::Error;

use crate::layout::LayoutConflict;

#[derive(Error, Debug)]
pub enum Pack200Error {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Invalid BHSD codec ({b},{h},{s},{d})")]
    InvalidBhsdCodec { b: u32, h: u32, s: u32, d: u32 },
    #[error("Run codec needs a positive run length, got {0}")]
    InvalidRunLength(usize),
    #[error("Invalid codec specifier: {0}")]
    InvalidCodecSpecifier(i32),
    #[error("Population codec cannot decode a single value without a band length")]
    ScalarPopulationDecode,
    #[error("Population token {token} exceeds {favoured} favoured values")]
    InvalidPopulationToken { token: i32, favoured: usize },
    #[error("Cannot derive a token codec for {k} favoured values with l = {l}")]
    UnderivableTokenCodec { k: usize, l: u32 },
    #[error("Population band of {0} values declares more favoured values than values")]
    FavouredTableOverflow(usize),
    #[error("Band {band}: expected {expected} values, only {available} available")]
    BandLengthMismatch {
        band: String,
        expected: usize,
        available: usize,
    },
    #[error("Index {index} out of range for {pool} ({len} entries)")]
    PoolIndexOutOfRange {
        pool: &'static str,
        index: i64,
        len: usize,
    },
    #[error("Duplicate attribute layouts: {0:?}")]
    DuplicateAttributeLayouts(Vec<LayoutConflict>),
    #[error("Attribute layouts must have a name")]
    EmptyAttributeName,
    #[error("Invalid attribute context: {0}")]
    InvalidAttributeContext(u8),
    #[error("Inner class {0} appears more than once in ic_this_class")]
    DuplicateInnerClass(String),
}

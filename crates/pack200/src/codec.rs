// https://docs.oracle.com/javase/8/docs/technotes/guides/pack200/pack-spec.html#coding

mod bhsd;
mod population;
mod run;
mod specifier;

use std::{fmt, io::Read};

pub use self::bhsd::BhsdCodec;
pub use self::population::{PopulationBand, PopulationCodec, TokenCodec};
pub use self::run::RunCodec;
pub use self::specifier::canonical;

use crate::Result;

/// A band codec.
///
/// `Bhsd` codecs are stateless and can be reused freely. `Run` and
/// `Population` codecs carry decoding state, so batch decoding takes them by
/// value: one instance serves exactly one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    Bhsd(BhsdCodec),
    Run(RunCodec),
    Population(PopulationCodec),
}

impl Codec {
    /// Decodes a single value. `last` is the previously decoded value of the
    /// band and is only used by delta codecs; run codecs track their own.
    pub fn decode<R: Read>(&mut self, r: &mut R, last: i64) -> Result<i32> {
        match self {
            Codec::Bhsd(codec) => codec.decode(r, last),
            Codec::Run(codec) => codec.decode(r),
            Codec::Population(_) => Err(crate::Pack200Error::ScalarPopulationDecode),
        }
    }

    /// Decodes `n` values. The result is identical to `n` calls to
    /// [`Codec::decode`] threading the previous value, followed by delta
    /// normalisation.
    pub fn decode_ints<R: Read>(self, n: usize, r: &mut R) -> Result<Vec<i32>> {
        match self {
            Codec::Bhsd(codec) => codec.decode_ints(n, r),
            Codec::Run(codec) => codec.decode_ints(n, r),
            Codec::Population(codec) => codec.decode_ints(n, r),
        }
    }

    /// The delta codec whose range a value produced by this codec must be
    /// folded back into, if any.
    pub(crate) fn wraparound(&self) -> Option<BhsdCodec> {
        match self {
            Codec::Bhsd(codec) if codec.is_delta() => Some(*codec),
            _ => None,
        }
    }

    pub(crate) fn normalise(&self, value: i32) -> i32 {
        self.wraparound()
            .map_or(value, |codec| codec.normalise(value))
    }
}

impl From<BhsdCodec> for Codec {
    fn from(codec: BhsdCodec) -> Self {
        Codec::Bhsd(codec)
    }
}

impl From<RunCodec> for Codec {
    fn from(codec: RunCodec) -> Self {
        Codec::Run(codec)
    }
}

impl From<PopulationCodec> for Codec {
    fn from(codec: PopulationCodec) -> Self {
        Codec::Population(codec)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Bhsd(codec) => write!(f, "{}", codec),
            Codec::Run(codec) => write!(f, "{}", codec),
            Codec::Population(codec) => write!(f, "{}", codec),
        }
    }
}

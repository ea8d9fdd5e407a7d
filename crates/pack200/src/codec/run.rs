use std::{fmt, io::Read};

use crate::{codec::Codec, Pack200Error, Result};

/// Decodes the first `k` values of a band with codec `a` and the rest with
/// codec `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCodec {
    k: usize,
    a: Box<Codec>,
    b: Box<Codec>,
    phase: RunPhase,
}

/// Where a run codec is in its band. The delta chain restarts from zero when
/// the run switches from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    A { remaining: usize, last: i64 },
    B { last: i64 },
}

impl RunCodec {
    pub fn new(k: usize, a: Codec, b: Codec) -> Result<Self> {
        if k == 0 {
            return Err(Pack200Error::InvalidRunLength(k));
        }

        Ok(Self {
            k,
            a: Box::new(a),
            b: Box::new(b),
            phase: RunPhase::A {
                remaining: k,
                last: 0,
            },
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn a(&self) -> &Codec {
        &self.a
    }

    pub fn b(&self) -> &Codec {
        &self.b
    }

    pub fn decode<R: Read>(&mut self, r: &mut R) -> Result<i32> {
        match self.phase {
            RunPhase::A { remaining, last } => {
                let value = self.a.decode(r, last)?;
                self.phase = match remaining - 1 {
                    0 => RunPhase::B { last: 0 },
                    remaining => RunPhase::A {
                        remaining,
                        last: value.into(),
                    },
                };
                Ok(self.a.normalise(value))
            }
            RunPhase::B { last } => {
                let value = self.b.decode(r, last)?;
                self.phase = RunPhase::B { last: value.into() };
                Ok(self.b.normalise(value))
            }
        }
    }

    pub fn decode_ints<R: Read>(mut self, n: usize, r: &mut R) -> Result<Vec<i32>> {
        let fresh = RunPhase::A {
            remaining: self.k,
            last: 0,
        };
        if self.phase != fresh {
            return (0..n).map(|_| self.decode(r)).collect();
        }

        // Each half comes back normalised against its own codec.
        let split = self.k.min(n);
        let mut band = (*self.a).decode_ints(split, r)?;
        if split < n {
            band.extend((*self.b).decode_ints(n - split, r)?);
        }

        Ok(band)
    }
}

impl fmt::Display for RunCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunCodec[k={};a={};b={}]", self.k, self.a, self.b)
    }
}

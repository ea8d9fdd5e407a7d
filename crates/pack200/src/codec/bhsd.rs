use std::{fmt, io::Read};

use byteorder::ReadBytesExt;

use crate::{Pack200Error, Result};

const TWO_POW_32: i64 = 1 << 32;

/// A `(B,H,S,D)` codec.
///
/// Values are written as up to `b` base-`h` digits, least significant first.
/// A byte below `l = 256 - h` terminates the codon, so the number of bytes a
/// value occupies depends on its magnitude. `s` selects how many low bits
/// carry the sign, and `d` makes each value a delta from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BhsdCodec {
    b: u32,
    h: u32,
    s: u32,
    d: u32,
    l: u32,
    cardinality: i64,
    smallest: i64,
    largest: i64,
}

impl BhsdCodec {
    pub const BYTE1: BhsdCodec = BhsdCodec::unchecked(1, 256, 0, 0);
    pub const CHAR3: BhsdCodec = BhsdCodec::unchecked(3, 128, 0, 0);
    pub const BCI5: BhsdCodec = BhsdCodec::unchecked(5, 4, 0, 0);
    pub const BRANCH5: BhsdCodec = BhsdCodec::unchecked(5, 4, 2, 0);
    pub const UNSIGNED5: BhsdCodec = BhsdCodec::unchecked(5, 64, 0, 0);
    pub const SIGNED5: BhsdCodec = BhsdCodec::unchecked(5, 64, 1, 0);
    pub const UDELTA5: BhsdCodec = BhsdCodec::unchecked(5, 64, 0, 1);
    pub const DELTA5: BhsdCodec = BhsdCodec::unchecked(5, 64, 1, 1);
    pub const MDELTA5: BhsdCodec = BhsdCodec::unchecked(5, 64, 2, 1);

    pub fn new(b: u32, h: u32, s: u32, d: u32) -> Result<Self> {
        let valid = (1..=5).contains(&b)
            && (1..=256).contains(&h)
            && s <= 2
            && d <= 1
            && !(b == 1 && h != 256)
            && !(b == 5 && h == 256);

        if !valid {
            return Err(Pack200Error::InvalidBhsdCodec { b, h, s, d });
        }

        Ok(Self::unchecked(b, h, s, d))
    }

    const fn unchecked(b: u32, h: u32, s: u32, d: u32) -> Self {
        let l = 256 - h;

        // card = l * (1 + h + ... + h^(b-1)) + h^b
        let mut cardinality = 0i64;
        let mut power = 1i64;
        let mut i = 0;
        while i < b {
            cardinality += l as i64 * power;
            power *= h as i64;
            i += 1;
        }
        cardinality += power;

        let (smallest, largest) = if d == 1 || s == 0 {
            let smallest = if cardinality >= TWO_POW_32 {
                i32::MIN as i64
            } else {
                0
            };
            let largest = if cardinality - 1 > u32::MAX as i64 {
                u32::MAX as i64
            } else {
                cardinality - 1
            };
            (smallest, largest)
        } else {
            let smallest = -cardinality / (1 << s);
            let largest = if s == 1 {
                cardinality / 2 - 1
            } else {
                3 * cardinality / 4 - 1
            };
            (
                if smallest < i32::MIN as i64 {
                    i32::MIN as i64
                } else {
                    smallest
                },
                if largest > i32::MAX as i64 {
                    i32::MAX as i64
                } else {
                    largest
                },
            )
        };

        Self {
            b,
            h,
            s,
            d,
            l,
            cardinality,
            smallest,
            largest,
        }
    }

    pub fn b(&self) -> u32 {
        self.b
    }

    pub fn h(&self) -> u32 {
        self.h
    }

    pub fn s(&self) -> u32 {
        self.s
    }

    pub fn l(&self) -> u32 {
        self.l
    }

    pub fn is_signed(&self) -> bool {
        self.s != 0
    }

    pub fn is_delta(&self) -> bool {
        self.d != 0
    }

    /// Number of distinct values a single codon can represent.
    pub fn cardinality(&self) -> i64 {
        self.cardinality
    }

    pub fn smallest(&self) -> i64 {
        self.smallest
    }

    pub fn largest(&self) -> i64 {
        self.largest
    }

    pub fn encodes(&self, value: i64) -> bool {
        (self.smallest..=self.largest).contains(&value)
    }

    pub fn decode<R: Read>(&self, r: &mut R, last: i64) -> Result<i32> {
        let mut z = 0i64;
        let mut power = 1i64;
        let mut n = 0;
        loop {
            let x = i64::from(r.read_u8()?);
            z += x * power;
            n += 1;
            if x < i64::from(self.l) || n == self.b {
                break;
            }
            power *= i64::from(self.h);
        }

        if self.is_signed() {
            let u = (1i64 << self.s) - 1;
            z = if z & u == u {
                !(z >> self.s)
            } else {
                z - (z >> self.s)
            };
        }

        if self.is_delta() {
            z += last;
        }

        Ok(z as i32)
    }

    pub fn decode_ints<R: Read>(&self, n: usize, r: &mut R) -> Result<Vec<i32>> {
        let mut band = Vec::with_capacity(n);
        let mut last = 0i64;
        for _ in 0..n {
            let value = self.decode(r, last)?;
            last = value.into();
            band.push(value);
        }

        Ok(self.normalise_all(band))
    }

    /// Decodes `n` values following an already decoded `first` value. The
    /// returned band starts with `first`.
    pub fn decode_ints_after<R: Read>(&self, n: usize, r: &mut R, first: i32) -> Result<Vec<i32>> {
        let mut band = Vec::with_capacity(n + 1);
        band.push(first);
        let mut last = i64::from(first);
        for _ in 0..n {
            let value = self.decode(r, last)?;
            last = value.into();
            band.push(value);
        }

        Ok(self.normalise_all(band))
    }

    /// Folds a delta-decoded value back into `[smallest, largest]` by adding
    /// or subtracting the cardinality. In-range values are returned as is.
    pub fn normalise(&self, value: i32) -> i32 {
        let value = i64::from(value);
        if !self.is_delta() || self.encodes(value) {
            return value as i32;
        }

        (self.smallest + (value - self.smallest).rem_euclid(self.cardinality)) as i32
    }

    fn normalise_all(&self, mut band: Vec<i32>) -> Vec<i32> {
        if self.is_delta() {
            band.iter_mut().for_each(|v| *v = self.normalise(*v));
        }
        band
    }
}

impl fmt::Display for BhsdCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}", self.b, self.h)?;
        if self.s != 0 || self.d != 0 {
            write!(f, ",{}", self.s)?;
        }
        if self.d != 0 {
            write!(f, ",{}", self.d)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
impl BhsdCodec {
    /// Encodes `value` the way the Pack200 packer does.
    pub(crate) fn encode(&self, value: i32, last: i32) -> Vec<u8> {
        let mut z = i64::from(value);
        if self.is_delta() {
            z -= i64::from(last);
        }

        if self.is_signed() {
            if z < i64::from(i32::MIN) {
                z += TWO_POW_32;
            } else if z > i64::from(i32::MAX) {
                z -= TWO_POW_32;
            }

            if z < 0 {
                z = ((-z) << self.s) - 1;
            } else if self.s == 1 {
                z <<= 1;
            } else {
                z += (z - z % 3) / 3;
            }
        } else if z < 0 {
            z += self.cardinality.min(TWO_POW_32);
        }

        let l = i64::from(self.l);
        let h = i64::from(self.h);
        let mut bytes = Vec::new();
        for _ in 0..self.b {
            let byte = if z < l {
                z
            } else {
                let mut byte = z % h;
                while byte < l {
                    byte += h;
                }
                byte
            };
            bytes.push(byte as u8);
            if byte < l {
                break;
            }
            z = (z - byte) / h;
        }
        bytes
    }

    pub(crate) fn encode_band(&self, values: &[i32]) -> Vec<u8> {
        let mut last = 0;
        values
            .iter()
            .flat_map(|&value| {
                let bytes = self.encode(value, last);
                last = value;
                bytes
            })
            .collect()
    }
}

use std::{fmt, io::Read};

use log::trace;

use crate::{
    codec::{BhsdCodec, Codec},
    Pack200Error, Result,
};

/// How the token band of a population codec is coded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCodec {
    Explicit(Box<Codec>),
    /// Derived from `l` and the number of favoured values once the favoured
    /// table has been read.
    Derived(u32),
}

/// Splits a band into a table of favoured values, a token band selecting a
/// favoured value (or `0` for "unfavoured") per position, and the unfavoured
/// values themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationCodec {
    favoured_codec: Box<Codec>,
    token_codec: TokenCodec,
    unfavoured_codec: Box<Codec>,
}

impl PopulationCodec {
    pub fn new(favoured_codec: Codec, token_codec: Codec, unfavoured_codec: Codec) -> Self {
        Self {
            favoured_codec: Box::new(favoured_codec),
            token_codec: TokenCodec::Explicit(Box::new(token_codec)),
            unfavoured_codec: Box::new(unfavoured_codec),
        }
    }

    pub fn with_derived_token(favoured_codec: Codec, l: u32, unfavoured_codec: Codec) -> Self {
        Self {
            favoured_codec: Box::new(favoured_codec),
            token_codec: TokenCodec::Derived(l),
            unfavoured_codec: Box::new(unfavoured_codec),
        }
    }

    pub fn favoured_codec(&self) -> &Codec {
        &self.favoured_codec
    }

    pub fn token_codec(&self) -> &TokenCodec {
        &self.token_codec
    }

    pub fn unfavoured_codec(&self) -> &Codec {
        &self.unfavoured_codec
    }

    pub fn decode_ints<R: Read>(self, n: usize, r: &mut R) -> Result<Vec<i32>> {
        self.decode_band(n, r).map(|band| band.values)
    }

    /// Decodes `n` values and keeps the favoured table they were drawn from.
    pub fn decode_band<R: Read>(mut self, n: usize, r: &mut R) -> Result<PopulationBand> {
        // An empty band has no favoured table either.
        if n == 0 {
            return Ok(PopulationBand::default());
        }

        let favoured = self.read_favoured(n, r)?;

        let token_codec = match self.token_codec {
            TokenCodec::Explicit(codec) => *codec,
            TokenCodec::Derived(l) => token_codec_for(favoured.len(), l)?.into(),
        };
        trace!(
            "population band: {} favoured values, tokens coded with {}",
            favoured.len(),
            token_codec
        );
        let tokens = token_codec.decode_ints(n, r)?;

        let unfavoured_count = tokens.iter().filter(|&&token| token == 0).count();
        let favoured_wraparound = self.favoured_codec.wraparound();
        let unfavoured_wraparound = self.unfavoured_codec.wraparound();
        let mut unfavoured = (*self.unfavoured_codec)
            .decode_ints(unfavoured_count, r)?
            .into_iter();

        let mut sorted = favoured.clone();
        sorted.sort_unstable();

        let mut values = Vec::with_capacity(n);
        for token in tokens {
            let value = match usize::try_from(token) {
                Ok(0) => unfavoured.next().unwrap_or_default(),
                Ok(index) if index <= favoured.len() => favoured[index - 1],
                _ => {
                    return Err(Pack200Error::InvalidPopulationToken {
                        token,
                        favoured: favoured.len(),
                    })
                }
            };

            let wraparound = if sorted.binary_search(&value).is_ok() {
                favoured_wraparound
            } else {
                unfavoured_wraparound
            };
            values.push(wraparound.map_or(value, |codec| codec.normalise(value)));
        }

        Ok(PopulationBand { favoured, values })
    }

    /// Reads favoured values until one repeats either the previous value or
    /// the smallest-magnitude value seen so far.
    fn read_favoured<R: Read>(&mut self, n: usize, r: &mut R) -> Result<Vec<i32>> {
        let mut favoured: Vec<i32> = Vec::new();
        let mut smallest: Option<i32> = None;
        loop {
            let last = favoured.last().copied().unwrap_or_default();
            let value = self.favoured_codec.decode(r, last.into())?;
            if !favoured.is_empty() && (value == last || Some(value) == smallest) {
                return Ok(favoured);
            }

            if favoured.len() == n {
                return Err(Pack200Error::FavouredTableOverflow(n));
            }
            favoured.push(value);

            smallest = Some(match smallest {
                None => value,
                Some(s) => match i64::from(s).abs().cmp(&i64::from(value).abs()) {
                    std::cmp::Ordering::Greater => value,
                    // -x and +x resolve to +x
                    std::cmp::Ordering::Equal => s.max(value),
                    std::cmp::Ordering::Less => s,
                },
            });
        }
    }
}

/// A decoded population band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationBand {
    /// In the order the band declared them.
    pub favoured: Vec<i32>,
    pub values: Vec<i32>,
}

/// The token codec implied by `k` favoured values: `BYTE1` while every token
/// fits in a byte, else the narrowest `(b, 256 - l)` that can hold `k`.
fn token_codec_for(k: usize, l: u32) -> Result<BhsdCodec> {
    if k < 256 {
        return Ok(BhsdCodec::BYTE1);
    }

    (2..5)
        .filter_map(|b| BhsdCodec::new(b, 256 - l, 0, 0).ok())
        .find(|codec| codec.encodes(k as i64))
        .ok_or(Pack200Error::UnderivableTokenCodec { k, l })
}

impl fmt::Display for PopulationCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PopulationCodec[favoured={};tokens=", self.favoured_codec)?;
        match &self.token_codec {
            TokenCodec::Explicit(codec) => write!(f, "{}", codec)?,
            TokenCodec::Derived(l) => write!(f, "l={}", l)?,
        }
        write!(f, ";unfavoured={}]", self.unfavoured_codec)
    }
}

#[cfg(test)]
mod population_tests {
    use std::io::Cursor;

    use super::*;

    fn codec() -> PopulationCodec {
        PopulationCodec::with_derived_token(
            BhsdCodec::BYTE1.into(),
            4,
            BhsdCodec::UNSIGNED5.into(),
        )
    }

    // favoured [5, 3] + terminator, tokens, unfavoured [99, 42]
    const BAND: [u8; 10] = [5, 3, 3, 1, 2, 0, 1, 0, 99, 42];

    #[test]
    fn it_should_merge_favoured_and_unfavoured_values() {
        let mut r = Cursor::new(&BAND[..]);

        assert_eq!(codec().decode_ints(5, &mut r).unwrap(), [5, 3, 99, 5, 42]);
        assert_eq!(r.position() as usize, BAND.len());
    }

    #[test]
    fn it_should_keep_the_favoured_table_in_declaration_order() {
        let band = codec().decode_band(5, &mut Cursor::new(&BAND[..])).unwrap();

        assert_eq!(band.favoured, [5, 3]);
        assert_eq!(band.values, [5, 3, 99, 5, 42]);
    }

    #[test]
    fn it_should_decode_the_same_band_identically_twice() {
        let template = codec();
        let first = template
            .clone()
            .decode_ints(5, &mut Cursor::new(&BAND[..]))
            .unwrap();
        let second = template
            .decode_ints(5, &mut Cursor::new(&BAND[..]))
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn it_should_stop_the_favoured_table_on_the_smallest_value() {
        // 7, 2, 9 then 2 again: 2 is the smallest magnitude so far
        let bytes = [7u8, 2, 9, 2, 3, 2, 1];
        assert_eq!(
            codec().decode_ints(3, &mut Cursor::new(&bytes[..])).unwrap(),
            [9, 2, 7]
        );
    }

    #[test]
    fn it_should_use_an_explicit_token_codec() {
        let codec = PopulationCodec::new(
            BhsdCodec::BYTE1.into(),
            BhsdCodec::UNSIGNED5.into(),
            BhsdCodec::BYTE1.into(),
        );
        let bytes = [4u8, 4, 1, 0, 1, 200];

        assert_eq!(
            codec.decode_ints(3, &mut Cursor::new(&bytes[..])).unwrap(),
            [4, 200, 4]
        );
    }

    #[test]
    fn it_should_normalise_unfavoured_delta_values() {
        let codec = PopulationCodec::with_derived_token(
            BhsdCodec::BYTE1.into(),
            4,
            BhsdCodec::new(2, 8, 0, 1).unwrap().into(),
        );
        let unfavoured = BhsdCodec::new(2, 8, 0, 1).unwrap().encode_band(&[2290, 5]);
        let mut bytes = vec![1, 1, 0, 1, 0];
        bytes.extend(unfavoured);

        assert_eq!(
            codec.decode_ints(3, &mut Cursor::new(&bytes[..])).unwrap(),
            [2290, 1, 5]
        );
    }

    #[test]
    fn it_should_read_nothing_for_an_empty_band() {
        let mut r = Cursor::new(&BAND[..]);

        assert_eq!(codec().decode_band(0, &mut r).unwrap(), PopulationBand::default());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn it_should_fail_on_a_token_past_the_favoured_table() {
        let bytes = [5u8, 5, 2];
        assert!(matches!(
            codec().decode_ints(1, &mut Cursor::new(&bytes[..])),
            Err(Pack200Error::InvalidPopulationToken { token: 2, favoured: 1 })
        ));
    }

    #[test]
    fn it_should_fail_when_the_favoured_table_outgrows_the_band() {
        let bytes = [1u8, 2, 3, 3];
        assert!(matches!(
            codec().decode_ints(1, &mut Cursor::new(&bytes[..])),
            Err(Pack200Error::FavouredTableOverflow(1))
        ));
    }

    #[test]
    fn it_should_derive_wider_token_codecs_for_large_tables() {
        assert_eq!(token_codec_for(255, 4).unwrap(), BhsdCodec::BYTE1);
        assert_eq!(
            token_codec_for(300, 4).unwrap(),
            BhsdCodec::new(2, 252, 0, 0).unwrap()
        );
    }
}

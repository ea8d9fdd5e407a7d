use std::io::Read;

use byteorder::ReadBytesExt;
use log::trace;

use crate::{
    codec::{BhsdCodec, Codec, PopulationCodec, RunCodec},
    Pack200Error, Result,
};

const SMALL_H: [u32; 5] = [192, 224, 240, 248, 252];
const DELTA_H: [u32; 9] = [8, 16, 32, 64, 128, 192, 224, 240, 248];
const WIDE_H: [u32; 5] = [4, 16, 32, 64, 128];
const TDEF_L: [u32; 12] = [0, 4, 8, 16, 32, 64, 128, 192, 224, 240, 248, 252];

/// The canonical codec with the given specifier, `1..=115`.
pub fn canonical(specifier: u8) -> Option<BhsdCodec> {
    let (b, h, s, d) = match specifier {
        1..=16 => {
            let i = u32::from(specifier - 1);
            (i / 4 + 1, 256, i % 4 & 1, i % 4 >> 1)
        }
        17..=46 => {
            let i = u32::from(specifier - 17);
            let (i, d) = if i >= 15 { (i - 15, 1) } else { (i, 0) };
            (5, WIDE_H[(i / 3) as usize], i % 3, d)
        }
        47..=51 => (2, SMALL_H[usize::from(specifier - 47)], 0, 0),
        52..=69 => delta_parameters(2, specifier - 52),
        70..=74 => (3, SMALL_H[usize::from(specifier - 70)], 0, 0),
        75..=92 => delta_parameters(3, specifier - 75),
        93..=97 => (4, SMALL_H[usize::from(specifier - 93)], 0, 0),
        98..=115 => delta_parameters(4, specifier - 98),
        _ => return None,
    };

    BhsdCodec::new(b, h, s, d).ok()
}

fn delta_parameters(b: u32, i: u8) -> (u32, u32, u32, u32) {
    (b, DELTA_H[usize::from(i / 2)], u32::from(i % 2), 1)
}

impl Codec {
    /// Builds the codec a specifier selects. Parameters beyond the specifier
    /// itself are read from `headers`; `default` stands in wherever the
    /// specifier says "use the band's default codec".
    pub fn from_specifier<R: Read>(specifier: i32, headers: &mut R, default: BhsdCodec) -> Result<Codec> {
        trace!("codec specifier {} (default {})", specifier, default);
        match specifier {
            0 => Ok(default.into()),
            1..=115 => canonical(specifier as u8)
                .map(Codec::from)
                .ok_or(Pack200Error::InvalidCodecSpecifier(specifier)),
            116 => {
                let code = headers.read_u8()?;
                let d = u32::from(code & 0x01);
                let s = u32::from(code >> 1 & 0x03);
                let b = u32::from(code >> 3 & 0x07) + 1;
                let h = u32::from(headers.read_u8()?) + 1;
                Ok(BhsdCodec::new(b, h, s, d)?.into())
            }
            117..=140 => {
                let offset = specifier - 117;
                let kx = offset & 0x03;
                let kbflag = offset >> 2 & 1 == 1;
                let adef = offset >> 3 & 1 == 1;
                let bdef = offset >> 4 & 1 == 1;

                let kb = if kbflag {
                    usize::from(headers.read_u8()?)
                } else {
                    3
                };
                let k = (kb + 1) << (4 * kx);

                let a = Self::nested(adef, headers, default)?;
                let b = Self::nested(bdef, headers, default)?;
                Ok(RunCodec::new(k, a, b)?.into())
            }
            141..=188 => {
                let offset = specifier - 141;
                let fdef = offset & 1 == 1;
                let udef = offset >> 1 & 1 == 1;
                let tdefl = (offset >> 2) as usize;

                // Stream order is favoured, token, unfavoured.
                let favoured = Self::nested(fdef, headers, default)?;
                if tdefl != 0 {
                    let unfavoured = Self::nested(udef, headers, default)?;
                    return Ok(PopulationCodec::with_derived_token(
                        favoured,
                        TDEF_L[tdefl],
                        unfavoured,
                    )
                    .into());
                }
                let token = Self::nested(false, headers, default)?;
                let unfavoured = Self::nested(udef, headers, default)?;
                Ok(PopulationCodec::new(favoured, token, unfavoured).into())
            }
            _ => Err(Pack200Error::InvalidCodecSpecifier(specifier)),
        }
    }

    fn nested<R: Read>(use_default: bool, headers: &mut R, default: BhsdCodec) -> Result<Codec> {
        if use_default {
            return Ok(default.into());
        }

        let specifier = headers.read_u8()?;
        Self::from_specifier(specifier.into(), headers, default)
    }
}

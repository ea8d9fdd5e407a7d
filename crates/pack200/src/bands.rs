use std::io::Cursor;

use log::{debug, trace};

use crate::{
    codec::{BhsdCodec, Codec},
    Pack200Error, Result,
};

/// Reads bands from one segment's band stream.
///
/// The band stream and the band-headers stream (which carries the parameters
/// of non-default codecs) are each consumed strictly in order.
pub struct BandReader<'a> {
    r: Cursor<&'a [u8]>,
    band_headers: Cursor<&'a [u8]>,
}

impl<'a> BandReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_band_headers(bytes, &[])
    }

    pub fn with_band_headers(bytes: &'a [u8], band_headers: &'a [u8]) -> Self {
        Self {
            r: Cursor::new(bytes),
            band_headers: Cursor::new(band_headers),
        }
    }

    pub fn position(&self) -> usize {
        self.r.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.r.get_ref().len().saturating_sub(self.position())
    }

    /// Decodes `count` values with exactly the given codec.
    pub fn read_codec_band(&mut self, name: &str, codec: impl Into<Codec>, count: usize) -> Result<Vec<i32>> {
        self.check_available(name, count)?;

        let codec = codec.into();
        let start = self.position();
        debug!("{}: {} values with {}", name, count, codec);

        let band = codec.decode_ints(count, &mut self.r)?;
        trace!("{}: {} bytes", name, self.position() - start);
        Ok(band)
    }

    /// Decodes `count` values with the band's default codec, unless the first
    /// value escapes to a codec specifier.
    ///
    /// A signed codec escapes with a first value in `-256..=-1`, an unsigned
    /// one with a first value in `l..=l + 255`. Single-byte codecs never
    /// escape.
    pub fn read_band(&mut self, name: &str, codec: BhsdCodec, count: usize) -> Result<Vec<i32>> {
        if codec.b() == 1 || count == 0 {
            return self.read_codec_band(name, codec, count);
        }
        self.check_available(name, count)?;

        let start = self.position();
        let first = codec.decode(&mut self.r, 0)?;
        let l = codec.l() as i32;
        let specifier = if codec.is_signed() && (-256..=-1).contains(&first) {
            Some(-1 - first)
        } else if !codec.is_signed() && (l..=l + 255).contains(&first) {
            Some(first - l)
        } else {
            None
        };

        match specifier {
            Some(specifier) => {
                let escaped = Codec::from_specifier(specifier, &mut self.band_headers, codec)?;
                trace!("{}: escaped to specifier {}", name, specifier);
                self.read_codec_band(name, escaped, count)
            }
            None => {
                debug!("{}: {} values with {}", name, count, codec);
                let band = codec.decode_ints_after(count - 1, &mut self.r, first)?;
                trace!("{}: {} bytes", name, self.position() - start);
                Ok(band)
            }
        }
    }

    // Every value takes at least one byte.
    fn check_available(&self, name: &str, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(Pack200Error::BandLengthMismatch {
                band: name.to_owned(),
                expected: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

/// The constant-pool bands a segment has already decoded, as needed to
/// resolve references.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentConstantPool<'a> {
    classes: &'a [String],
    utf8: &'a [String],
}

impl<'a> SegmentConstantPool<'a> {
    pub fn new(classes: &'a [String], utf8: &'a [String]) -> Self {
        Self { classes, utf8 }
    }

    /// A class reference that cannot be absent: `index` is zero-based.
    pub fn class(&self, index: i32) -> Result<&'a str> {
        lookup(self.classes, "cp_Class", index.into())
    }

    /// `0` means absent, otherwise `index - 1` is the class.
    pub fn nullable_class(&self, index: i32) -> Result<Option<&'a str>> {
        nullable(self.classes, "cp_Class", index)
    }

    /// `0` means absent, otherwise `index - 1` is the string.
    pub fn nullable_utf8(&self, index: i32) -> Result<Option<&'a str>> {
        nullable(self.utf8, "cp_Utf8", index)
    }
}

fn nullable<'a>(pool: &'a [String], name: &'static str, index: i32) -> Result<Option<&'a str>> {
    match index {
        0 => Ok(None),
        index => lookup(pool, name, i64::from(index) - 1).map(Some),
    }
}

fn lookup<'a>(pool: &'a [String], name: &'static str, index: i64) -> Result<&'a str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| pool.get(i))
        .map(String::as_str)
        .ok_or(Pack200Error::PoolIndexOutOfRange {
            pool: name,
            index,
            len: pool.len(),
        })
}

#[cfg(test)]
mod band_reader_tests {
    use super::*;
    use crate::codec::RunCodec;

    #[test]
    fn it_should_read_a_band_with_its_default_codec() {
        let bytes = [5u8, 6, 7, 99];
        let mut reader = BandReader::new(&bytes);

        assert_eq!(
            reader.read_band("cp_Int", BhsdCodec::UNSIGNED5, 3).unwrap(),
            [5, 6, 7]
        );
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn it_should_keep_the_first_value_of_a_delta_band() {
        let bytes = [6u8, 4, 1];
        let mut reader = BandReader::new(&bytes);

        assert_eq!(
            reader.read_band("ic_outer_class", BhsdCodec::DELTA5, 3).unwrap(),
            [3, 5, 4]
        );
    }

    #[test]
    fn it_should_escape_an_unsigned_band_to_a_canonical_codec() {
        // 193 = l + 1 selects BYTE1
        let bytes = [193u8, 0, 7, 250, 9];
        let mut reader = BandReader::new(&bytes);

        assert_eq!(
            reader.read_band("cp_Int", BhsdCodec::UNSIGNED5, 3).unwrap(),
            [7, 250, 9]
        );
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn it_should_escape_a_signed_band_to_a_canonical_codec() {
        // -2 selects BYTE1
        let bytes = [3u8, 200];
        let mut reader = BandReader::new(&bytes);

        assert_eq!(
            reader.read_band("code_handler", BhsdCodec::DELTA5, 1).unwrap(),
            [200]
        );
    }

    #[test]
    fn it_should_read_codec_parameters_from_the_band_headers() {
        // 308 = l + 116: arbitrary BHSD codec (3,128,1) from the headers
        let bytes = [244u8, 1, 2, 1];
        let headers = [18u8, 127];
        let mut reader = BandReader::with_band_headers(&bytes, &headers);

        assert_eq!(
            reader.read_band("cp_Int", BhsdCodec::UNSIGNED5, 2).unwrap(),
            [1, -1]
        );
    }

    #[test]
    fn it_should_never_escape_single_byte_codecs() {
        let bytes = [255u8, 0];
        let mut reader = BandReader::new(&bytes);

        assert_eq!(
            reader.read_band("bc_byte", BhsdCodec::BYTE1, 2).unwrap(),
            [255, 0]
        );
    }

    #[test]
    fn it_should_read_composite_codecs() {
        let bytes = [1u8, 2, 100, 3];
        let mut reader = BandReader::new(&bytes);
        let run = RunCodec::new(2, BhsdCodec::BYTE1.into(), BhsdCodec::UNSIGNED5.into()).unwrap();

        assert_eq!(
            reader.read_codec_band("attr_calls", run, 3).unwrap(),
            [1, 2, 100]
        );
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn it_should_fail_if_the_band_is_longer_than_the_stream() {
        let bytes = [1u8, 2];
        let mut reader = BandReader::new(&bytes);

        assert!(matches!(
            reader.read_band("ic_flags", BhsdCodec::UNSIGNED5, 3),
            Err(Pack200Error::BandLengthMismatch { expected: 3, available: 2, .. })
        ));
    }

    #[test]
    fn it_should_fail_on_a_truncated_codon() {
        let bytes = [1u8, 200];
        let mut reader = BandReader::new(&bytes);

        assert!(matches!(
            reader.read_band("ic_flags", BhsdCodec::UNSIGNED5, 2),
            Err(Pack200Error::IOError(_))
        ));
    }
}

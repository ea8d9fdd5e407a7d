// https://docs.oracle.com/javase/8/docs/technotes/guides/pack200/pack-spec.html

pub mod bands;
pub mod codec;
mod error;
pub mod inner_classes;
pub mod layout;

pub use bands::{BandReader, SegmentConstantPool};
pub use codec::{BhsdCodec, Codec};
pub use error::Pack200Error;
pub use inner_classes::{IcTuple, InnerClassFlags, InnerClassTable};
pub use layout::{AttributeContext, AttributeLayout, AttributeLayoutMap, AttributeLayouts};

pub type Result<T, E = Pack200Error> = std::result::Result<T, E>;

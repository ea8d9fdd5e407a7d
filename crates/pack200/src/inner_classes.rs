// https://docs.oracle.com/javase/8/docs/technotes/guides/pack200/pack-spec.html#inner-classes

use std::{
    collections::{HashMap, VecDeque},
    mem,
};

use bitflags::bitflags;
use log::{debug, trace};

use crate::{
    bands::{BandReader, SegmentConstantPool},
    codec::BhsdCodec,
    Pack200Error, Result,
};

bitflags! {
    pub struct InnerClassFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        /// The tuple carries its outer class and simple name explicitly.
        const EXPLICIT = 1 << 16;
    }
}

/// One entry of the segment's inner-class table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcTuple {
    pub this_class: String,
    pub flags: InnerClassFlags,
    /// The `ic_flags` word as decoded, including bits `flags` has no name for.
    pub flag_bits: u32,
    pub outer_class: Option<String>,
    pub name: Option<String>,
    pub this_class_index: usize,
    pub outer_class_index: Option<usize>,
    pub name_index: Option<usize>,
    /// Position in the table.
    pub tuple_index: usize,
}

impl IcTuple {
    pub fn is_explicit(&self) -> bool {
        self.flags.contains(InnerClassFlags::EXPLICIT)
    }

    /// The outer class, as given or as predicted from `this_class`.
    pub fn outer_class_string(&self) -> Option<&str> {
        if self.is_explicit() {
            self.outer_class.as_deref()
        } else {
            self.predicted().map(|(outer, _)| outer)
        }
    }

    /// The simple name, as given or as predicted from `this_class`.
    pub fn simple_class_name(&self) -> Option<&str> {
        if self.is_explicit() {
            self.name.as_deref()
        } else {
            self.predicted().map(|(_, name)| name)
        }
    }

    pub fn is_anonymous(&self) -> bool {
        if self.is_explicit() {
            self.outer_class.is_none()
        } else {
            self.simple_class_name().map_or(false, is_numeric)
        }
    }

    /// Whether any `$` component of the outer class is a number, i.e. the
    /// outer class is itself anonymous or nested in an anonymous class.
    pub fn outer_is_anonymous(&self) -> bool {
        self.outer_class_string()
            .map_or(false, |outer| outer.split('$').skip(1).any(is_numeric))
    }

    // `Outer$Inner` splits at the last `$`.
    fn predicted(&self) -> Option<(&str, &str)> {
        self.this_class
            .rsplit_once('$')
            .filter(|(outer, name)| !outer.is_empty() && !name.is_empty())
    }

    fn is_member_of(&self, class_name: &str) -> bool {
        self.outer_class_string() == Some(class_name)
            && (self.is_explicit() || !(self.is_anonymous() || self.outer_is_anonymous()))
    }

    fn explicit_outer(&self) -> Option<&str> {
        if !self.is_explicit() || self.outer_is_anonymous() {
            return None;
        }
        self.outer_class.as_deref()
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Every inner-class tuple of a segment, in band order.
#[derive(Debug, Clone, Default)]
pub struct InnerClassTable {
    tuples: Vec<IcTuple>,
    by_this_class: HashMap<String, usize>,
}

impl InnerClassTable {
    pub fn new(mut tuples: Vec<IcTuple>) -> Result<Self> {
        let mut by_this_class = HashMap::with_capacity(tuples.len());
        for (i, tuple) in tuples.iter_mut().enumerate() {
            tuple.tuple_index = i;
            if by_this_class.insert(tuple.this_class.clone(), i).is_some() {
                return Err(Pack200Error::DuplicateInnerClass(tuple.this_class.clone()));
            }
        }

        Ok(Self {
            tuples,
            by_this_class,
        })
    }

    /// Reads the `ic_` bands. `ic_outer_class` and `ic_name` only hold entries
    /// for explicit tuples, so both are walked with one shared cursor.
    pub fn read(
        reader: &mut BandReader,
        pool: &SegmentConstantPool,
        inner_class_count: usize,
    ) -> Result<Self> {
        let this_classes = reader.read_band("ic_this_class", BhsdCodec::UDELTA5, inner_class_count)?;
        let flag_words = reader
            .read_band("ic_flags", BhsdCodec::UNSIGNED5, inner_class_count)?
            .into_iter()
            .map(|bits| bits as u32)
            .collect::<Vec<_>>();

        let explicit_count = flag_words
            .iter()
            .filter(|&&bits| bits & InnerClassFlags::EXPLICIT.bits() != 0)
            .count();
        let outer_classes = reader.read_band("ic_outer_class", BhsdCodec::DELTA5, explicit_count)?;
        let names = reader.read_band("ic_name", BhsdCodec::DELTA5, explicit_count)?;
        debug!(
            "{} inner classes, {} with explicit outer class and name",
            inner_class_count, explicit_count
        );

        let mut explicit = outer_classes.into_iter().zip(names);
        let mut tuples = Vec::with_capacity(inner_class_count);
        for (this_class_index, flag_bits) in this_classes.into_iter().zip(flag_words) {
            let this_class = pool.class(this_class_index)?.to_owned();
            let flags = InnerClassFlags::from_bits_truncate(flag_bits);

            let (outer_class_index, name_index) = if flags.contains(InnerClassFlags::EXPLICIT) {
                explicit.next().unwrap_or_default()
            } else {
                (0, 0)
            };

            tuples.push(IcTuple {
                this_class,
                flags,
                flag_bits,
                outer_class: pool.nullable_class(outer_class_index)?.map(str::to_owned),
                name: pool.nullable_utf8(name_index)?.map(str::to_owned),
                this_class_index: this_class_index as usize,
                outer_class_index: nullable_index(outer_class_index),
                name_index: nullable_index(name_index),
                tuple_index: tuples.len(),
            });
        }

        Self::new(tuples)
    }

    pub fn tuples(&self) -> &[IcTuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn get(&self, this_class: &str) -> Option<&IcTuple> {
        self.by_this_class.get(this_class).map(|&i| &self.tuples[i])
    }

    /// The tuples that belong in the `InnerClasses` attribute of
    /// `class_name`, given the class names its constant pool references.
    ///
    /// These are the class's own member classes, the referenced inner
    /// classes, and transitively the explicit outer classes of both. The
    /// result keeps table order.
    pub fn relevant_tuples<I>(&self, class_name: &str, referenced_classes: I) -> Vec<&IcTuple>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let members = self
            .tuples
            .iter()
            .filter(|tuple| tuple.is_member_of(class_name))
            .map(|tuple| tuple.tuple_index);
        let referenced = referenced_classes
            .into_iter()
            .filter_map(|name| self.by_this_class.get(name.as_ref()).copied())
            .collect::<Vec<_>>();

        let mut worklist = members.chain(referenced).collect::<VecDeque<_>>();
        let mut relevant = vec![false; self.tuples.len()];
        while let Some(i) = worklist.pop_front() {
            if mem::replace(&mut relevant[i], true) {
                continue;
            }

            let tuple = &self.tuples[i];
            trace!("{}: {} is relevant", class_name, tuple.this_class);
            if let Some(&outer) = tuple
                .explicit_outer()
                .and_then(|outer| self.by_this_class.get(outer))
            {
                worklist.push_back(outer);
            }
        }

        self.tuples
            .iter()
            .zip(relevant)
            .filter_map(|(tuple, relevant)| relevant.then(|| tuple))
            .collect()
    }
}

fn nullable_index(index: i32) -> Option<usize> {
    usize::try_from(index).ok()?.checked_sub(1)
}

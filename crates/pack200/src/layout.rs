mod map;

use std::{convert::TryFrom, fmt};

pub use self::map::{AttributeLayoutMap, AttributeLayouts};

use crate::{codec::BhsdCodec, Pack200Error, Result};

/// The structure an attribute hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeContext {
    Class,
    Field,
    Method,
    Code,
}

impl AttributeContext {
    pub const ALL: [AttributeContext; 4] = [
        AttributeContext::Class,
        AttributeContext::Field,
        AttributeContext::Method,
        AttributeContext::Code,
    ];
}

impl TryFrom<u8> for AttributeContext {
    type Error = Pack200Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AttributeContext::Class),
            1 => Ok(AttributeContext::Field),
            2 => Ok(AttributeContext::Method),
            3 => Ok(AttributeContext::Code),
            _ => Err(Pack200Error::InvalidAttributeContext(value)),
        }
    }
}

impl fmt::Display for AttributeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeContext::Class => "class",
            AttributeContext::Field => "field",
            AttributeContext::Method => "method",
            AttributeContext::Code => "code",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeLayout {
    name: String,
    context: AttributeContext,
    layout: String,
    index: Option<usize>,
    is_default: bool,
}

impl AttributeLayout {
    /// A layout defined by the segment. `index` is the flag bit the attribute
    /// is announced with, or `None` for an overflow attribute.
    pub fn new(
        name: impl Into<String>,
        context: AttributeContext,
        layout: impl Into<String>,
        index: Option<usize>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Pack200Error::EmptyAttributeName);
        }

        Ok(Self {
            name,
            context,
            layout: layout.into(),
            index,
            is_default: false,
        })
    }

    pub(crate) fn predefined(name: &str, context: AttributeContext, layout: &str, index: usize) -> Self {
        Self {
            name: name.to_owned(),
            context,
            layout: layout.to_owned(),
            index: Some(index),
            is_default: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> AttributeContext {
        self.context
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Whether the flag word of a class, field, method or code structure
    /// announces this attribute.
    pub fn matches(&self, flags: u64) -> bool {
        self.index
            .filter(|&index| index < 64)
            .map_or(false, |index| flags & (1 << index) != 0)
    }

    /// The codec the attribute's bands are read with, as implied by the
    /// element types in the layout.
    pub fn codec(&self) -> BhsdCodec {
        let layout = self.layout.as_str();
        if layout.contains('O') {
            BhsdCodec::BRANCH5
        } else if layout.contains('P') {
            BhsdCodec::BCI5
        } else if layout.contains('S') && !layout.contains("KS") && !layout.contains("RS") {
            BhsdCodec::SIGNED5
        } else if layout.contains('B') {
            BhsdCodec::BYTE1
        } else {
            BhsdCodec::UNSIGNED5
        }
    }

    pub(crate) fn same_definition(&self, other: &AttributeLayout) -> bool {
        self.context == other.context && self.name == other.name && self.layout == other.layout
    }
}

/// Two layouts of one context sharing both name and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConflict {
    pub context: AttributeContext,
    pub name: String,
    pub layout: String,
    pub indices: (Option<usize>, Option<usize>),
}

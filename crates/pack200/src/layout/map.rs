use std::{collections::HashMap, ops::Deref};

use log::debug;

use crate::{
    layout::{AttributeContext, AttributeLayout, LayoutConflict},
    Pack200Error, Result,
};

const ACCESS_FLAGS: [&str; 15] = [
    "ACC_PUBLIC",
    "ACC_PRIVATE",
    "ACC_PROTECTED",
    "ACC_STATIC",
    "ACC_FINAL",
    "ACC_SYNCHRONIZED",
    "ACC_VOLATILE",
    "ACC_TRANSIENT",
    "ACC_NATIVE",
    "ACC_INTERFACE",
    "ACC_ABSTRACT",
    "ACC_STRICT",
    "ACC_SYNTHETIC",
    "ACC_ANNOTATION",
    "ACC_ENUM",
];

const PREDEFINED: [(&str, AttributeContext, &str, usize); 25] = [
    ("SourceFile", AttributeContext::Class, "RUNH", 17),
    ("ConstantValue", AttributeContext::Field, "KQH", 17),
    ("Code", AttributeContext::Method, "", 17),
    ("EnclosingMethod", AttributeContext::Class, "RCHRDNH", 18),
    ("Exceptions", AttributeContext::Method, "NH[RCH]", 18),
    ("Signature", AttributeContext::Class, "RSH", 19),
    ("Signature", AttributeContext::Field, "RSH", 19),
    ("Signature", AttributeContext::Method, "RSH", 19),
    ("Deprecated", AttributeContext::Class, "", 20),
    ("Deprecated", AttributeContext::Field, "", 20),
    ("Deprecated", AttributeContext::Method, "", 20),
    ("RuntimeVisibleAnnotations", AttributeContext::Class, "*", 21),
    ("RuntimeVisibleAnnotations", AttributeContext::Field, "*", 21),
    ("RuntimeVisibleAnnotations", AttributeContext::Method, "*", 21),
    ("RuntimeInvisibleAnnotations", AttributeContext::Class, "*", 22),
    ("RuntimeInvisibleAnnotations", AttributeContext::Field, "*", 22),
    ("RuntimeInvisibleAnnotations", AttributeContext::Method, "*", 22),
    ("InnerClasses", AttributeContext::Class, "", 23),
    ("RuntimeVisibleParameterAnnotations", AttributeContext::Method, "*", 23),
    ("class-file version", AttributeContext::Class, "", 24),
    ("RuntimeInvisibleParameterAnnotations", AttributeContext::Method, "*", 24),
    ("AnnotationDefault", AttributeContext::Method, "*", 25),
    ("LineNumberTable", AttributeContext::Code, "NH[PHH]", 1),
    ("LocalVariableTable", AttributeContext::Code, "NH[PHOHRUHRSHH]", 2),
    ("LocalVariableTypeTable", AttributeContext::Code, "NH[PHOHRUHRSHH]", 3),
];

type LayoutKey = (AttributeContext, String, String);

fn key(layout: &AttributeLayout) -> LayoutKey {
    (
        layout.context(),
        layout.name().to_owned(),
        layout.layout().to_owned(),
    )
}

#[derive(Debug, Default, Clone)]
struct ContextLayouts {
    indexed: Vec<Option<AttributeLayout>>,
    overflow: Vec<AttributeLayout>,
}

impl ContextLayouts {
    fn insert(&mut self, layout: AttributeLayout) -> Option<AttributeLayout> {
        let Some(index) = layout.index() else {
            self.overflow.push(layout);
            return None;
        };

        if self.indexed.len() <= index {
            self.indexed.resize(index + 1, None);
        }
        self.indexed[index].replace(layout)
    }

    fn get(&self, index: usize) -> Option<&AttributeLayout> {
        self.indexed.get(index)?.as_ref()
    }

    fn iter(&self) -> impl Iterator<Item = &AttributeLayout> {
        self.indexed.iter().flatten().chain(&self.overflow)
    }
}

/// Attribute layouts per context, keyed by flag index and by name.
///
/// `B` is whatever reads the bands of a segment-defined attribute; it is
/// opaque to the map.
#[derive(Debug, Clone)]
pub struct AttributeLayoutMap<B = ()> {
    contexts: [ContextLayouts; 4],
    bands: HashMap<LayoutKey, B>,
}

impl<B> AttributeLayoutMap<B> {
    /// A map holding the predefined layouts.
    pub fn new() -> Self {
        let mut map = Self::empty();
        for context in [
            AttributeContext::Class,
            AttributeContext::Field,
            AttributeContext::Method,
        ] {
            for (index, name) in ACCESS_FLAGS.iter().enumerate() {
                map.add(AttributeLayout::predefined(name, context, "", index));
            }
        }
        for (name, context, layout, index) in PREDEFINED {
            map.add(AttributeLayout::predefined(name, context, layout, index));
        }
        map
    }

    pub fn empty() -> Self {
        Self {
            contexts: Default::default(),
            bands: HashMap::new(),
        }
    }

    /// Adds a layout, replacing whatever held its context and index.
    pub fn add(&mut self, layout: AttributeLayout) {
        let replaced = self.contexts[layout.context() as usize].insert(layout);
        if let Some(replaced) = replaced {
            debug!(
                "{} layout {} replaced at index {:?}",
                replaced.context(),
                replaced.name(),
                replaced.index()
            );
            self.bands.remove(&key(&replaced));
        }
    }

    /// Adds a layout whose bands are read by `bands`.
    pub fn add_with_bands(&mut self, layout: AttributeLayout, bands: B) {
        let key = key(&layout);
        self.add(layout);
        self.bands.insert(key, bands);
    }

    pub fn get_by_index(&self, context: AttributeContext, index: usize) -> Option<&AttributeLayout> {
        self.contexts[context as usize].get(index)
    }

    /// The first layout of `context` called `name`, in index order.
    pub fn get_by_name(&self, context: AttributeContext, name: &str) -> Option<&AttributeLayout> {
        self.layouts(context).find(|layout| layout.name() == name)
    }

    pub fn layouts(&self, context: AttributeContext) -> impl Iterator<Item = &AttributeLayout> {
        self.contexts[context as usize].iter()
    }

    pub fn bands_for(&self, layout: &AttributeLayout) -> Option<&B> {
        self.bands.get(&key(layout))
    }

    /// Every pair of layouts that share a context, a name and a layout.
    pub fn conflicts(&self) -> Vec<LayoutConflict> {
        let mut conflicts = Vec::new();
        for context in AttributeContext::ALL {
            let layouts = self.layouts(context).collect::<Vec<_>>();
            for (i, first) in layouts.iter().enumerate() {
                for second in &layouts[i + 1..] {
                    if first.same_definition(second) {
                        conflicts.push(LayoutConflict {
                            context,
                            name: first.name().to_owned(),
                            layout: first.layout().to_owned(),
                            indices: (first.index(), second.index()),
                        });
                    }
                }
            }
        }
        conflicts
    }

    pub fn validate(&self) -> Result<()> {
        let conflicts = self.conflicts();
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(Pack200Error::DuplicateAttributeLayouts(conflicts))
        }
    }

    /// Validates the map and makes it read-only.
    pub fn freeze(self) -> Result<AttributeLayouts<B>> {
        self.validate()?;
        Ok(AttributeLayouts(self))
    }
}

impl<B> Default for AttributeLayoutMap<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated [`AttributeLayoutMap`] that can no longer be changed, ready to
/// be shared between segments.
#[derive(Debug, Clone)]
pub struct AttributeLayouts<B = ()>(AttributeLayoutMap<B>);

impl<B> Deref for AttributeLayouts<B> {
    type Target = AttributeLayoutMap<B>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod attribute_layout_map_tests {
    use super::*;

    fn layout(name: &str, context: AttributeContext, format: &str, index: Option<usize>) -> AttributeLayout {
        AttributeLayout::new(name, context, format, index).unwrap()
    }

    #[test]
    fn it_should_seed_the_predefined_layouts() {
        let map = AttributeLayoutMap::<()>::new();

        let source_file = map.get_by_name(AttributeContext::Class, "SourceFile").unwrap();
        assert_eq!(source_file.layout(), "RUNH");
        assert_eq!(source_file.index(), Some(17));
        assert!(source_file.is_default());

        assert_eq!(
            map.get_by_index(AttributeContext::Code, 1).unwrap().name(),
            "LineNumberTable"
        );
        assert_eq!(
            map.get_by_index(AttributeContext::Method, 17).unwrap().name(),
            "Code"
        );
        assert_eq!(
            map.get_by_index(AttributeContext::Field, 4).unwrap().name(),
            "ACC_FINAL"
        );
        assert_eq!(map.layouts(AttributeContext::Class).count(), 23);
        assert_eq!(map.layouts(AttributeContext::Code).count(), 3);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn it_should_report_missing_layouts_as_absent() {
        let map = AttributeLayoutMap::<()>::new();

        assert!(map.get_by_index(AttributeContext::Code, 0).is_none());
        assert!(map.get_by_index(AttributeContext::Code, 500).is_none());
        assert!(map.get_by_name(AttributeContext::Field, "SourceFile").is_none());
    }

    #[test]
    fn it_should_let_the_last_layout_for_an_index_win() {
        let mut map = AttributeLayoutMap::<()>::new();
        map.add(layout("Custom", AttributeContext::Class, "RUH", Some(17)));

        assert_eq!(
            map.get_by_index(AttributeContext::Class, 17).unwrap().name(),
            "Custom"
        );
        assert!(map.get_by_name(AttributeContext::Class, "SourceFile").is_none());
    }

    #[test]
    fn it_should_return_the_first_layout_with_a_name() {
        let mut map = AttributeLayoutMap::<()>::empty();
        map.add(layout("Twice", AttributeContext::Method, "B", Some(40)));
        map.add(layout("Twice", AttributeContext::Method, "H", Some(33)));
        map.add(layout("Twice", AttributeContext::Method, "I", None));

        assert_eq!(
            map.get_by_name(AttributeContext::Method, "Twice").unwrap().layout(),
            "H"
        );
    }

    #[test]
    fn it_should_reject_a_duplicate_layout_within_a_context() {
        let mut map = AttributeLayoutMap::<()>::new();
        map.add(layout("SourceFile", AttributeContext::Class, "RUNH", Some(30)));

        let conflicts = map.conflicts();
        assert_eq!(
            conflicts,
            [LayoutConflict {
                context: AttributeContext::Class,
                name: "SourceFile".to_owned(),
                layout: "RUNH".to_owned(),
                indices: (Some(17), Some(30)),
            }]
        );
        assert!(matches!(
            map.freeze(),
            Err(Pack200Error::DuplicateAttributeLayouts(_))
        ));
    }

    #[test]
    fn it_should_accept_the_same_layout_in_different_contexts() {
        let mut map = AttributeLayoutMap::<()>::empty();
        map.add(layout("SourceFile", AttributeContext::Class, "RUNH", Some(17)));
        map.add(layout("SourceFile", AttributeContext::Field, "RUNH", Some(17)));

        assert!(map.validate().is_ok());
    }

    #[test]
    fn it_should_accept_the_same_name_with_another_layout() {
        let mut map = AttributeLayoutMap::<()>::empty();
        map.add(layout("Extra", AttributeContext::Code, "RUNH", Some(5)));
        map.add(layout("Extra", AttributeContext::Code, "RSH", None));

        assert!(map.conflicts().is_empty());
    }

    #[test]
    fn it_should_remember_band_providers() {
        let mut map = AttributeLayoutMap::<&str>::new();
        let custom = layout("Custom", AttributeContext::Code, "NH[PHH]", Some(32));
        map.add_with_bands(custom.clone(), "custom bands");

        let frozen = map.freeze().unwrap();
        assert_eq!(frozen.bands_for(&custom), Some(&"custom bands"));
        assert_eq!(
            frozen.bands_for(frozen.get_by_name(AttributeContext::Class, "SourceFile").unwrap()),
            None
        );
    }

    #[test]
    fn it_should_forget_the_bands_of_a_replaced_layout() {
        let mut map = AttributeLayoutMap::<u32>::empty();
        let first = layout("First", AttributeContext::Class, "B", Some(40));
        map.add_with_bands(first.clone(), 1);
        map.add(layout("Second", AttributeContext::Class, "H", Some(40)));

        assert_eq!(map.bands_for(&first), None);
    }
}

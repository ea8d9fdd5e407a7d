use std::env;

use unpack200_core::{
    AttributeContext, AttributeLayoutMap, BandReader, InnerClassTable, SegmentConstantPool,
};

// ic_this_class, ic_flags, ic_outer_class, ic_name
const IC_BANDS: [u8; 14] = [1, 1, 1, 192, 253, 12, 9, 194, 253, 12, 0, 6, 0, 2];

fn main() {
    pretty_env_logger::init();

    let classes = [
        "p/Outer",
        "p/Outer$1",
        "p/Outer$Inner",
        "p/Outer$Inner$Deep",
    ]
    .map(str::to_owned);
    let utf8 = ["Deep", "Inner"].map(str::to_owned);
    let pool = SegmentConstantPool::new(&classes, &utf8);

    let mut reader = BandReader::new(&IC_BANDS);
    let table = InnerClassTable::read(&mut reader, &pool, 3).unwrap();

    println!("Inner classes:");
    for tuple in table.tuples() {
        println!(
            "    {} outer={} name={} flags={:?}",
            tuple.this_class,
            tuple.outer_class_string().unwrap_or("-"),
            tuple.simple_class_name().unwrap_or("-"),
            tuple.flags
        );
    }

    let class_name = env::args().nth(1).unwrap_or_else(|| "p/Outer".to_owned());
    let referenced = env::args().skip(2).collect::<Vec<_>>();
    let relevant = table.relevant_tuples(&class_name, &referenced);
    if relevant.is_empty() {
        log::warn!("No inner classes relevant to {}", class_name);
    }

    println!();
    println!("Relevant to {}:", class_name);
    for tuple in relevant {
        println!("    {}", tuple.this_class);
    }

    let layouts = AttributeLayoutMap::<()>::new().freeze().unwrap();
    println!();
    println!("Class attribute layouts:");
    for layout in layouts.layouts(AttributeContext::Class) {
        println!(
            "    {:>2} {} {:?} ({})",
            layout.index().unwrap_or_default(),
            layout.name(),
            layout.layout(),
            layout.codec()
        );
    }
}

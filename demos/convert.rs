//! Demo CLI: run the extraction pipeline over a local object-store layout.
//!
//! Usage:
//!   convert <store-root> <bucket> <object> [remote-endpoint]
//!
//! Reads <store-root>/<bucket>/<object> and writes the JSON artifact next
//! to it (same stem, .json extension).

use sheetson::{Dispatcher, LocalStore, ObjectRef};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (root, bucket, object) = match (args.next(), args.next(), args.next()) {
        (Some(root), Some(bucket), Some(object)) => (root, bucket, object),
        _ => {
            eprintln!("usage: convert <store-root> <bucket> <object> [remote-endpoint]");
            std::process::exit(2);
        }
    };

    let mut builder = Dispatcher::builder().with_store(LocalStore::new(&root));
    if let Some(endpoint) = args.next() {
        builder = builder.with_remote_endpoint(endpoint);
    }
    let dispatcher = builder.build()?;

    let reference = ObjectRef::new(bucket, object);
    let results = dispatcher.process(&reference)?;

    for sheet in &results {
        println!(
            "{}: complex={} signals={:?} regions={}",
            sheet.sheet_name,
            sheet.complexity.is_complex,
            sheet.complexity.signals,
            sheet.regions.len()
        );
    }
    println!("artifact: {}", reference.artifact_ref());

    Ok(())
}

//! Text reference lookup

use anyhow::{bail, Result};
use std::path::Path;
use x4::{NullObserver, TextResolver, TextTable};

pub fn handle(root: &Path, reference: &str, language: u32) -> Result<()> {
    let table = TextTable::load(root, language, &NullObserver);
    if table.is_empty() {
        bail!(
            "No text entries for language {language} under {}",
            root.join("t").display()
        );
    }

    let resolver = TextResolver::new(table);
    println!("{}", resolver.resolve(reference));
    for (page, entry) in resolver.unresolved() {
        eprintln!("warning: no entry for {{{page},{entry}}}");
    }
    Ok(())
}

//! Applying diff patches to a single document

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use x4_xml::{diff, Document};

/// Merge `diffs` onto `base`, returning the merged XML and a line per note
pub fn merge_files(base: &Path, diffs: &[PathBuf]) -> Result<(String, Vec<String>)> {
    let base_doc = Document::from_file(base)
        .with_context(|| format!("Failed to read {}", base.display()))?;
    let patches = diffs
        .iter()
        .map(|path| {
            Document::from_file(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = diff::merge(&base_doc, &patches);
    let notes = merged
        .notes
        .iter()
        .map(|note| format!("{}: {note}", diffs[note.diff].display()))
        .collect();
    let xml = merged
        .document
        .to_xml_string()
        .context("Failed to serialize merged document")?;
    Ok((xml, notes))
}

pub fn handle(base: &Path, diffs: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let (xml, notes) = merge_files(base, diffs)?;
    for note in &notes {
        eprintln!("warning: {note}");
    }

    match output {
        Some(path) => {
            std::fs::write(path, xml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Merged {} patches into {} ({} notes)",
                diffs.len(),
                path.display(),
                notes.len()
            );
        }
        None => println!("{xml}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_merge_files_writes_output_and_notes() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("wares.xml");
        let patch = dir.path().join("patch.xml");
        let output = dir.path().join("merged.xml");
        fs::write(&base, r#"<wares><ware id="a"/><ware id="b"/></wares>"#).unwrap();
        fs::write(
            &patch,
            r#"<diff>
                <add sel="/wares"><ware id="c"/></add>
                <remove sel="/wares/ware[@id='a']"/>
                <remove sel="/wares/ware[@id='zzz']"/>
              </diff>"#,
        )
        .unwrap();

        handle(&base, &[patch.clone()], Some(&output)).unwrap();

        let merged = Document::from_file(&output).unwrap();
        let ids: Vec<_> = merged
            .root
            .children_named("ware")
            .filter_map(|w| w.attr("id"))
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        let (_, notes) = merge_files(&base, &[patch]).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("patch.xml"));
    }

    #[test]
    fn test_missing_base_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = merge_files(&dir.path().join("missing.xml"), &[dir.path().join("p.xml")]);
        assert!(result.is_err());
    }
}

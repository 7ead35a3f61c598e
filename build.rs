//! Generates the path index of the embedded manifest archive
//!
//! Every file under `manifests/` becomes one `(path, bytes)` entry, sorted
//! by path, so the per-family file counts always match the bundled files.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((key, path.clone()));
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let root = manifest_dir.join("manifests");
    println!("cargo:rerun-if-changed=manifests");

    let mut files = Vec::new();
    if root.is_dir() {
        collect(&root, &root, &mut files)?;
    }
    files.sort();

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_default());
    let mut index = fs::File::create(out_dir.join("manifest_index.rs"))?;
    writeln!(index, "pub static ENTRIES: &[(&str, &[u8])] = &[")?;
    for (key, path) in &files {
        writeln!(index, "    ({:?}, include_bytes!({:?})),", key, path)?;
    }
    writeln!(index, "];")?;
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::pipeline::CatalogLoadError;

#[derive(Default)]
pub(crate) struct CatalogFingerprint {
    hasher: Sha256,
    file_count: usize,
}

impl CatalogFingerprint {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update_file(&mut self, source_id: &str, normalized_rel: &str, bytes: &[u8]) {
        self.hasher.update(source_id.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(normalized_rel.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(bytes);
        self.file_count += 1;
    }

    pub(crate) fn file_count(&self) -> usize {
        self.file_count
    }

    pub(crate) fn finish_hex(self) -> String {
        to_hex_lower(&self.hasher.finalize())
    }
}

/// XML files under `dir`, sorted by their `/`-joined path relative to `dir`.
pub(crate) fn collect_xml_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, CatalogLoadError> {
    let mut files = Vec::<(String, PathBuf)>::new();
    collect_recursive(dir, dir, &mut files)?;
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files)
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), CatalogLoadError> {
    let entries = fs::read_dir(current).map_err(|source| CatalogLoadError::ReadDir {
        path: current.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| CatalogLoadError::ReadDirEntry {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
            continue;
        }
        if !is_xml_file(&path) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let normalized = normalize_rel_path(rel);
        files.push((normalized, path));
    }
    Ok(())
}

fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn fingerprint_dir(dir: &Path) -> (usize, String) {
        let mut fingerprint = CatalogFingerprint::new();
        for (rel, path) in collect_xml_files(dir).expect("collect") {
            let bytes = fs::read(&path).expect("read");
            fingerprint.update_file("base", &rel, &bytes);
        }
        (fingerprint.file_count(), fingerprint.finish_hex())
    }

    #[test]
    fn collect_is_sorted_and_ignores_non_xml() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path();
        fs::create_dir_all(dir.join("nested")).expect("mkdir");
        fs::write(dir.join("nested").join("b.xml"), "<Catalog/>").expect("write");
        fs::write(dir.join("a.XML"), "<Catalog/>").expect("write");
        fs::write(dir.join("notes.txt"), "ignore me").expect("write");

        let rels = collect_xml_files(dir)
            .expect("collect")
            .into_iter()
            .map(|(rel, _)| rel)
            .collect::<Vec<_>>();
        assert_eq!(rels, vec!["a.XML".to_string(), "nested/b.xml".to_string()]);
    }

    #[test]
    fn fingerprint_changes_on_edit_or_add() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("effects.xml"), "<Catalog/>").expect("write");

        let (count, first) = fingerprint_dir(dir);
        assert_eq!(count, 1);
        assert_eq!(first.len(), 64);

        fs::write(dir.join("effects.xml"), "<Catalog><TemplateDef/></Catalog>").expect("edit");
        let (_, second) = fingerprint_dir(dir);
        assert_ne!(first, second);

        fs::write(dir.join("more.xml"), "<Catalog/>").expect("add");
        let (count, third) = fingerprint_dir(dir);
        assert_eq!(count, 2);
        assert_ne!(second, third);
    }
}

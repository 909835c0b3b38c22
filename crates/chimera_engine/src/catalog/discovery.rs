use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::AppPaths;

use super::pipeline::{CatalogLoadError, CatalogRequest};

pub(crate) const BASE_SOURCE_ID: &str = "base";

#[derive(Debug, Clone)]
pub(crate) struct CatalogSource {
    pub source_id: String,
    pub load_index: u32,
    pub source_dir: PathBuf,
}

/// Base content first (when present on disk), then enabled mods in request
/// order.
pub(crate) fn discover_catalog_sources(
    app_paths: &AppPaths,
    request: &CatalogRequest,
) -> Result<Vec<CatalogSource>, CatalogLoadError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = Vec::<CatalogSource>::new();
    if app_paths.base_content_dir.is_dir() {
        sources.push(CatalogSource {
            source_id: BASE_SOURCE_ID.to_string(),
            load_index: 0,
            source_dir: app_paths.base_content_dir.clone(),
        });
    }

    for (idx, mod_id) in request.enabled_mods.iter().enumerate() {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            return Err(CatalogLoadError::EmptyEnabledMod);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(CatalogLoadError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        if !is_plain_mod_id(trimmed) {
            return Err(CatalogLoadError::InvalidEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let mod_dir = app_paths.mods_dir.join(trimmed);
        ensure_dir_exists(trimmed, &mod_dir)?;
        sources.push(CatalogSource {
            source_id: trimmed.to_string(),
            load_index: (idx + 1) as u32,
            source_dir: mod_dir,
        });
    }

    Ok(sources)
}

fn is_plain_mod_id(mod_id: &str) -> bool {
    if mod_id.contains(['/', '\\', ':']) {
        return false;
    }
    let mut components = Path::new(mod_id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn ensure_dir_exists(mod_id: &str, path: &Path) -> Result<(), CatalogLoadError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CatalogLoadError::EnabledModMissing {
            mod_id: mod_id.to_string(),
            expected_dir: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn app_paths(root: &Path) -> AppPaths {
        AppPaths {
            root: root.to_path_buf(),
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
        }
    }

    fn request(mods: &[&str]) -> CatalogRequest {
        CatalogRequest {
            enabled_mods: mods.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn base_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(&paths.base_content_dir).expect("create base");
        fs::create_dir_all(paths.mods_dir.join("b")).expect("create mod b");
        fs::create_dir_all(paths.mods_dir.join("a")).expect("create mod a");

        let sources = discover_catalog_sources(&paths, &request(&["b", "a"])).expect("discover");
        let ids = sources
            .iter()
            .map(|source| (source.source_id.as_str(), source.load_index))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![("base", 0), ("b", 1), ("a", 2)]);
    }

    #[test]
    fn missing_base_dir_is_skipped() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        let sources = discover_catalog_sources(&paths, &CatalogRequest::default()).expect("ok");
        assert!(sources.is_empty());
    }

    #[test]
    fn bad_mod_lists_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(paths.mods_dir.join("a")).expect("create mod a");

        assert!(matches!(
            discover_catalog_sources(&paths, &request(&[" "])),
            Err(CatalogLoadError::EmptyEnabledMod)
        ));
        assert!(matches!(
            discover_catalog_sources(&paths, &request(&["a", "a"])),
            Err(CatalogLoadError::DuplicateEnabledMod { .. })
        ));
        assert!(matches!(
            discover_catalog_sources(&paths, &request(&["ghost"])),
            Err(CatalogLoadError::EnabledModMissing { .. })
        ));
    }

    #[test]
    fn mod_ids_cannot_leave_the_mods_dir() {
        let temp = TempDir::new().expect("tempdir");
        let paths = app_paths(temp.path());
        fs::create_dir_all(&paths.mods_dir).expect("create mods");
        fs::create_dir_all(temp.path().join("outside")).expect("create outside");

        for mod_id in ["../outside", "..", ".", "/tmp", "a/b", "a\\b", "C:evil"] {
            assert!(
                matches!(
                    discover_catalog_sources(&paths, &request(&[mod_id])),
                    Err(CatalogLoadError::InvalidEnabledMod { .. })
                ),
                "{mod_id}"
            );
        }
    }
}

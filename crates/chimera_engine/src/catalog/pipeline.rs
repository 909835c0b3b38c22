use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::AppPaths;

use super::compiler::{
    decode_utf8, parse_catalog_document, CatalogCompileError, CatalogErrorCode,
};
use super::database::PrefabCatalog;
use super::discovery::discover_catalog_sources;
use super::hashing::{collect_xml_files, CatalogFingerprint};

#[derive(Debug, Clone, Default)]
pub struct CatalogRequest {
    pub enabled_mods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogLoadSummary {
    pub builtin_count: usize,
    pub source_count: usize,
    pub xml_file_count: usize,
    pub loaded_def_count: usize,
    pub override_count: usize,
    pub total_count: usize,
    pub fingerprint_sha256_hex: String,
}

#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: PrefabCatalog,
    pub summary: CatalogLoadSummary,
}

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("enabled mod id cannot be empty")]
    EmptyEnabledMod,
    #[error("duplicate enabled mod id in request: {mod_id}")]
    DuplicateEnabledMod { mod_id: String },
    #[error("enabled mod id must be a single directory name under mods/: {mod_id}")]
    InvalidEnabledMod { mod_id: String },
    #[error("enabled mod does not exist on disk: {mod_id} at {expected_dir}")]
    EnabledModMissing {
        mod_id: String,
        expected_dir: PathBuf,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Compile(#[from] CatalogCompileError),
}

/// Builds the catalog from the built-in templates, then layers XML
/// definitions from base content and enabled mods over it. Later sources
/// replace earlier definitions with the same id.
pub fn load_catalog(
    app_paths: &AppPaths,
    request: &CatalogRequest,
) -> Result<LoadedCatalog, CatalogLoadError> {
    let mut builtin = PrefabCatalog::new();
    let builtin_count = builtin.initialize_defaults();
    let mut entries = std::mem::take(builtin.entries_mut());
    let mut positions = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.id.clone(), idx))
        .collect::<HashMap<_, _>>();
    let sources = discover_catalog_sources(app_paths, request)?;
    let mut fingerprint = CatalogFingerprint::new();
    let mut loaded_def_count = 0usize;
    let mut override_count = 0usize;

    for source in &sources {
        let mut seen_in_source = HashSet::<String>::new();
        for (rel, path) in collect_xml_files(&source.source_dir)? {
            let bytes = fs::read(&path).map_err(|error| CatalogLoadError::ReadFile {
                path: path.clone(),
                source: error,
            })?;
            fingerprint.update_file(&source.source_id, &rel, &bytes);
            let raw = decode_utf8(&source.source_id, &path, bytes)?;
            let defs = parse_catalog_document(&source.source_id, &path, &raw)?;

            for def in defs {
                if !seen_in_source.insert(def.id.clone()) {
                    return Err(CatalogCompileError {
                        code: CatalogErrorCode::DuplicateDefInSource,
                        message: format!(
                            "duplicate TemplateDef '{}' in source '{}'; each source may define an id only once",
                            def.id, source.source_id
                        ),
                        source_id: source.source_id.clone(),
                        file_path: path.clone(),
                        location: None,
                    }
                    .into());
                }
                match positions.get(&def.id) {
                    Some(&idx) => {
                        override_count += 1;
                        debug!(
                            template_id = %def.id,
                            source_id = %source.source_id,
                            load_index = source.load_index,
                            "catalog_template_overridden"
                        );
                        entries[idx] = def;
                    }
                    None => {
                        positions.insert(def.id.clone(), entries.len());
                        entries.push(def);
                    }
                }
                loaded_def_count += 1;
            }
        }
    }

    let summary = CatalogLoadSummary {
        builtin_count,
        source_count: sources.len(),
        xml_file_count: fingerprint.file_count(),
        loaded_def_count,
        override_count,
        total_count: entries.len(),
        fingerprint_sha256_hex: fingerprint.finish_hex(),
    };
    info!(
        builtin_count = summary.builtin_count,
        source_count = summary.source_count,
        xml_file_count = summary.xml_file_count,
        loaded_def_count = summary.loaded_def_count,
        override_count = summary.override_count,
        total_count = summary.total_count,
        fingerprint = %summary.fingerprint_sha256_hex,
        "catalog_loaded"
    );

    Ok(LoadedCatalog {
        catalog: PrefabCatalog::from_entries(entries),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::catalog::TemplateCategory;

    fn setup_app_paths(root: &Path) -> AppPaths {
        let base = root.join("assets").join("base");
        let mods = root.join("mods");
        fs::create_dir_all(&base).expect("base");
        fs::create_dir_all(&mods).expect("mods");
        AppPaths {
            root: root.to_path_buf(),
            base_content_dir: base,
            mods_dir: mods,
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    #[test]
    fn empty_content_dirs_yield_builtin_catalog() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        let loaded = load_catalog(&app, &CatalogRequest::default()).expect("load");
        assert!(loaded.summary.builtin_count > 0);
        assert_eq!(loaded.summary.xml_file_count, 0);
        assert_eq!(loaded.summary.total_count, loaded.summary.builtin_count);
        assert!(loaded.catalog.lookup("plant_growth_sparkles").is_some());
    }

    #[test]
    fn base_defs_add_and_override_builtins() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("effects.xml"),
            r#"<Catalog>
                <TemplateDef><id>harvest_burst</id><category>Particle</category><durationSecs>5</durationSecs></TemplateDef>
                <TemplateDef><id>pest_swarm</id><category>Environment</category></TemplateDef>
            </Catalog>"#,
        );
        let loaded = load_catalog(&app, &CatalogRequest::default()).expect("load");
        assert_eq!(loaded.summary.loaded_def_count, 2);
        assert_eq!(loaded.summary.override_count, 1);
        assert_eq!(
            loaded.summary.total_count,
            loaded.summary.builtin_count + 1
        );
        let burst = loaded.catalog.lookup("harvest_burst").expect("burst");
        assert!((burst.params.duration_secs - 5.0).abs() < f32::EPSILON);
        assert!(loaded
            .catalog
            .lookup_by_category(TemplateCategory::Environment)
            .iter()
            .any(|entry| entry.id == "pest_swarm"));
    }

    #[test]
    fn large_source_merges_in_one_pass_and_indexes_lazily() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        let mut xml = String::from("<Catalog>");
        xml.push_str(
            "<TemplateDef><id>harvest_burst</id><category>Particle</category><label>Big Burst</label></TemplateDef>",
        );
        for i in 0..2000 {
            xml.push_str(&format!(
                "<TemplateDef><id>prop_{i}</id><category>Facility</category></TemplateDef>"
            ));
        }
        xml.push_str("</Catalog>");
        write_file(&app.base_content_dir.join("bulk.xml"), &xml);

        let loaded = load_catalog(&app, &CatalogRequest::default()).expect("load");
        assert!(!loaded.catalog.is_indexed());
        assert_eq!(loaded.summary.loaded_def_count, 2001);
        assert_eq!(loaded.summary.override_count, 1);
        assert_eq!(
            loaded.summary.total_count,
            loaded.summary.builtin_count + 2000
        );
        assert_eq!(loaded.catalog.len(), loaded.summary.total_count);
        assert_eq!(
            loaded.catalog.lookup("harvest_burst").map(|entry| entry.label.as_str()),
            Some("Big Burst")
        );
        assert!(loaded.catalog.contains("prop_1999"));
        let builtin_order = PrefabCatalog::with_defaults()
            .lookup_by_category(TemplateCategory::Particle)
            .iter()
            .position(|entry| entry.id == "harvest_burst");
        let loaded_order = loaded
            .catalog
            .lookup_by_category(TemplateCategory::Particle)
            .iter()
            .position(|entry| entry.id == "harvest_burst");
        assert_eq!(loaded_order, builtin_order);
    }

    #[test]
    fn cross_source_duplicate_is_last_source_wins() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("defs.xml"),
            r#"<Catalog><TemplateDef><id>lamp</id><category>Equipment</category><label>Base</label></TemplateDef></Catalog>"#,
        );
        write_file(
            &app.mods_dir.join("moda").join("defs.xml"),
            r#"<Catalog><TemplateDef><id>lamp</id><category>Equipment</category><label>Mod</label></TemplateDef></Catalog>"#,
        );
        let loaded = load_catalog(
            &app,
            &CatalogRequest {
                enabled_mods: vec!["moda".to_string()],
            },
        )
        .expect("load");
        assert_eq!(
            loaded.catalog.lookup("lamp").map(|entry| entry.label.as_str()),
            Some("Mod")
        );
        assert_eq!(loaded.summary.source_count, 2);
    }

    #[test]
    fn same_source_duplicate_errors() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("a.xml"),
            r#"<Catalog><TemplateDef><id>lamp</id><category>Equipment</category></TemplateDef></Catalog>"#,
        );
        write_file(
            &app.base_content_dir.join("b.xml"),
            r#"<Catalog><TemplateDef><id>lamp</id><category>Equipment</category></TemplateDef></Catalog>"#,
        );
        let err = load_catalog(&app, &CatalogRequest::default()).expect_err("err");
        match err {
            CatalogLoadError::Compile(compile) => {
                assert_eq!(compile.code, CatalogErrorCode::DuplicateDefInSource);
                assert!(compile.file_path.ends_with("b.xml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn compile_error_carries_source_and_file() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.mods_dir.join("broken").join("defs.xml"),
            r#"<Catalog><TemplateDef><category>Ui</category></TemplateDef></Catalog>"#,
        );
        let err = load_catalog(
            &app,
            &CatalogRequest {
                enabled_mods: vec!["broken".to_string()],
            },
        )
        .expect_err("err");
        let CatalogLoadError::Compile(compile) = err else {
            panic!("expected compile error");
        };
        assert_eq!(compile.code, CatalogErrorCode::MissingField);
        assert_eq!(compile.source_id, "broken");
    }

    #[test]
    fn fingerprint_tracks_content() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        let path = app.base_content_dir.join("defs.xml");
        write_file(
            &path,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category></TemplateDef></Catalog>"#,
        );
        let first = load_catalog(&app, &CatalogRequest::default()).expect("load");
        let again = load_catalog(&app, &CatalogRequest::default()).expect("load");
        assert_eq!(
            first.summary.fingerprint_sha256_hex,
            again.summary.fingerprint_sha256_hex
        );

        write_file(
            &path,
            r#"<Catalog><TemplateDef><id>b</id><category>Ui</category></TemplateDef></Catalog>"#,
        );
        let edited = load_catalog(&app, &CatalogRequest::default()).expect("load");
        assert_ne!(
            first.summary.fingerprint_sha256_hex,
            edited.summary.fingerprint_sha256_hex
        );
    }
}

mod compiler;
mod database;
mod defaults;
mod discovery;
mod hashing;
mod pipeline;
mod types;

pub use compiler::{CatalogCompileError, CatalogErrorCode, SourceLocation};
pub use database::PrefabCatalog;
pub use pipeline::{
    load_catalog, CatalogLoadError, CatalogLoadSummary, CatalogRequest, LoadedCatalog,
};
pub use types::{
    AssetKind, NumericField, PresentationAsset, TemplateCategory, TemplateEntry, TemplateParams,
};

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::types::{
    AssetKind, PresentationAsset, TemplateCategory, TemplateEntry, TemplateParams,
};

/// Longest effect lifetime a def may declare: one simulated day.
pub const MAX_DURATION_SECS: f32 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInSource,
}

#[derive(Debug, Clone)]
pub struct CatalogCompileError {
    pub code: CatalogErrorCode,
    pub message: String,
    pub source_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for CatalogCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (source={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.source_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (source={}, file={})",
                self.code,
                self.message,
                self.source_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for CatalogCompileError {}

pub(crate) fn decode_utf8(
    source_id: &str,
    file_path: &Path,
    bytes: Vec<u8>,
) -> Result<String, CatalogCompileError> {
    String::from_utf8(bytes).map_err(|error| CatalogCompileError {
        code: CatalogErrorCode::ReadFile,
        message: format!("catalog file is not valid UTF-8: {error}"),
        source_id: source_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: None,
    })
}

pub(crate) fn parse_catalog_document(
    source_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<TemplateEntry>, CatalogCompileError> {
    let doc = Document::parse(raw).map_err(|error| CatalogCompileError {
        code: CatalogErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        source_id: source_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = NodeContext {
        source_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Catalog" {
        return Err(ctx.error(
            CatalogErrorCode::InvalidRoot,
            "root element must be <Catalog>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::<TemplateEntry>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "TemplateDef" {
            return Err(ctx.error(
                CatalogErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; catalogs contain only <TemplateDef>",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        defs.push(parse_template_def(&ctx, child)?);
    }

    Ok(defs)
}

struct NodeContext<'a, 'input> {
    source_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl NodeContext<'_, '_> {
    fn error(
        &self,
        code: CatalogErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> CatalogCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        CatalogCompileError {
            code,
            message,
            source_id: self.source_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<String, CatalogCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error(
                CatalogErrorCode::MissingField,
                format!("field <{}> must not be empty", field_name),
                node,
            ));
        }
        Ok(value)
    }

    fn non_negative_f32(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<f32, CatalogCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error(
                CatalogErrorCode::InvalidValue,
                format!("{} '{}' is not a valid number", field_name, value),
                node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.error(
                CatalogErrorCode::InvalidValue,
                format!("{} must be finite and >= 0", field_name),
                node,
            ));
        }
        Ok(parsed)
    }

    fn list_items<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        field_name: &str,
    ) -> Result<Vec<(String, Node<'a, 'input>)>, CatalogCompileError> {
        let mut items = Vec::new();
        for item in node.children().filter(|child| child.is_element()) {
            if item.tag_name().name() != "li" {
                return Err(self.error(
                    CatalogErrorCode::UnknownField,
                    format!(
                        "unexpected <{}> in <{}>; list items must be <li>",
                        item.tag_name().name(),
                        field_name
                    ),
                    item,
                ));
            }
            items.push((self.required_text(item, field_name)?, item));
        }
        Ok(items)
    }
}

fn parse_template_def(
    ctx: &NodeContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<TemplateEntry, CatalogCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut id: Option<String> = None;
    let mut category: Option<TemplateCategory> = None;
    let mut label: Option<String> = None;
    let mut params = TemplateParams::default();
    let mut capabilities = Vec::<String>::new();
    let mut assets = Vec::<PresentationAsset>::new();
    let mut pooled = true;
    let mut pool_capacity: Option<usize> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(ctx.error(
                CatalogErrorCode::DuplicateField,
                format!("duplicate field <{}> in <TemplateDef>", field_name),
                field,
            ));
        }

        match field_name.as_str() {
            "id" => id = Some(ctx.required_text(field, "id")?),
            "label" => label = Some(ctx.required_text(field, "label")?),
            "category" => {
                let value = ctx.required_text(field, "category")?;
                let Some(parsed) = TemplateCategory::parse(&value) else {
                    return Err(ctx.error(
                        CatalogErrorCode::InvalidValue,
                        format!(
                            "invalid category '{}'; allowed values: {}",
                            value,
                            TemplateCategory::ALL
                                .iter()
                                .map(|category| category.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                        field,
                    ));
                };
                category = Some(parsed);
            }
            "radius" => params.radius = ctx.non_negative_f32(field, "radius")?,
            "powerDraw" => params.power_draw = ctx.non_negative_f32(field, "powerDraw")?,
            "durationSecs" => {
                let secs = ctx.non_negative_f32(field, "durationSecs")?;
                if secs > MAX_DURATION_SECS {
                    return Err(ctx.error(
                        CatalogErrorCode::InvalidValue,
                        format!("durationSecs must be <= {MAX_DURATION_SECS}"),
                        field,
                    ));
                }
                params.duration_secs = secs;
            }
            "intensityMin" => {
                params.intensity_min = ctx.non_negative_f32(field, "intensityMin")?
            }
            "intensityMax" => {
                params.intensity_max = ctx.non_negative_f32(field, "intensityMax")?
            }
            "capabilities" => {
                capabilities = ctx
                    .list_items(field, "capabilities")?
                    .into_iter()
                    .map(|(text, _)| text)
                    .collect();
            }
            "assets" => {
                for (name, item) in ctx.list_items(field, "assets")? {
                    let raw_kind = item.attribute("kind").unwrap_or("Particle");
                    let Some(kind) = AssetKind::parse(raw_kind) else {
                        return Err(ctx.error(
                            CatalogErrorCode::InvalidValue,
                            format!("invalid asset kind '{}'", raw_kind),
                            item,
                        ));
                    };
                    assets.push(PresentationAsset { kind, name });
                }
            }
            "pooled" => {
                let value = ctx.required_text(field, "pooled")?;
                pooled = match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(ctx.error(
                            CatalogErrorCode::InvalidValue,
                            format!("pooled '{}' must be true or false", value),
                            field,
                        ))
                    }
                };
            }
            "poolCapacity" => {
                let value = ctx.required_text(field, "poolCapacity")?;
                let parsed = value.parse::<usize>().map_err(|_| {
                    ctx.error(
                        CatalogErrorCode::InvalidValue,
                        format!("poolCapacity '{}' is not a non-negative integer", value),
                        field,
                    )
                })?;
                pool_capacity = Some(parsed);
            }
            _ => {
                return Err(ctx.error(
                    CatalogErrorCode::UnknownField,
                    format!("unknown field <{}> in <TemplateDef>", field_name),
                    field,
                ))
            }
        }
    }

    let Some(id) = id else {
        return Err(ctx.error(
            CatalogErrorCode::MissingField,
            "missing required field <id> in <TemplateDef>".to_string(),
            node,
        ));
    };
    let Some(category) = category else {
        return Err(ctx.error(
            CatalogErrorCode::MissingField,
            format!("missing required field <category> in <TemplateDef> '{}'", id),
            node,
        ));
    };
    if params.intensity_min > params.intensity_max {
        return Err(ctx.error(
            CatalogErrorCode::InvalidValue,
            format!(
                "intensityMin {} exceeds intensityMax {} in '{}'",
                params.intensity_min, params.intensity_max, id
            ),
            node,
        ));
    }

    Ok(TemplateEntry {
        label: label.unwrap_or_else(|| id.clone()),
        id,
        category,
        params,
        required_capabilities: capabilities,
        presentation_assets: assets,
        pooled,
        pool_capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Vec<TemplateEntry>, CatalogCompileError> {
        parse_catalog_document("base", Path::new("assets/base/effects.xml"), raw)
    }

    #[test]
    fn full_template_def_parses() {
        let defs = parse(
            r#"<Catalog>
                <TemplateDef>
                    <id>trichome_glint</id>
                    <category>Particle</category>
                    <label>Trichome Glint</label>
                    <radius>0.5</radius>
                    <durationSecs>2.5</durationSecs>
                    <intensityMin>0.2</intensityMin>
                    <intensityMax>0.9</intensityMax>
                    <capabilities><li>growth</li><li>macro</li></capabilities>
                    <assets><li kind="VfxGraph">vfx_glint</li><li kind="AudioClip">sfx_glint</li></assets>
                    <poolCapacity>6</poolCapacity>
                </TemplateDef>
            </Catalog>"#,
        )
        .expect("parse");

        assert_eq!(defs.len(), 1);
        let def = &defs[0];
        assert_eq!(def.id, "trichome_glint");
        assert_eq!(def.category, TemplateCategory::Particle);
        assert_eq!(def.label, "Trichome Glint");
        assert!((def.params.duration_secs - 2.5).abs() < f32::EPSILON);
        assert_eq!(def.required_capabilities, vec!["growth", "macro"]);
        assert_eq!(def.presentation_assets.len(), 2);
        assert_eq!(def.presentation_assets[1].kind, AssetKind::AudioClip);
        assert_eq!(def.pool_capacity, Some(6));
        assert!(def.pooled);
    }

    #[test]
    fn label_defaults_to_id() {
        let defs = parse(
            r#"<Catalog><TemplateDef><id>a</id><category>Audio</category></TemplateDef></Catalog>"#,
        )
        .expect("parse");
        assert_eq!(defs[0].label, "a");
    }

    #[test]
    fn missing_id_reports_location() {
        let err = parse(r#"<Catalog><TemplateDef><category>Audio</category></TemplateDef></Catalog>"#)
            .expect_err("err");
        assert_eq!(err.code, CatalogErrorCode::MissingField);
        assert_eq!(err.source_id, "base");
        assert!(err.location.is_some());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = parse("<Defs/>").expect_err("err");
        assert_eq!(err.code, CatalogErrorCode::InvalidRoot);
    }

    #[test]
    fn unknown_def_type_is_rejected() {
        let err = parse("<Catalog><EntityDef/></Catalog>").expect_err("err");
        assert_eq!(err.code, CatalogErrorCode::UnknownDefType);
    }

    #[test]
    fn unknown_and_duplicate_fields_error() {
        let unknown = parse(
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><mood>calm</mood></TemplateDef></Catalog>"#,
        )
        .expect_err("err");
        assert_eq!(unknown.code, CatalogErrorCode::UnknownField);

        let duplicate = parse(
            r#"<Catalog><TemplateDef><id>a</id><id>b</id><category>Ui</category></TemplateDef></Catalog>"#,
        )
        .expect_err("err");
        assert_eq!(duplicate.code, CatalogErrorCode::DuplicateField);
    }

    #[test]
    fn invalid_values_error() {
        for raw in [
            r#"<Catalog><TemplateDef><id>a</id><category>Spaceship</category></TemplateDef></Catalog>"#,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><radius>-1</radius></TemplateDef></Catalog>"#,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><radius>wide</radius></TemplateDef></Catalog>"#,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><pooled>maybe</pooled></TemplateDef></Catalog>"#,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><intensityMin>2</intensityMin><intensityMax>1</intensityMax></TemplateDef></Catalog>"#,
            r#"<Catalog><TemplateDef><id>a</id><category>Ui</category><assets><li kind="Hologram">x</li></assets></TemplateDef></Catalog>"#,
        ] {
            let err = parse(raw).expect_err("err");
            assert_eq!(err.code, CatalogErrorCode::InvalidValue, "{raw}");
        }
    }

    #[test]
    fn oversized_duration_is_rejected() {
        let err = parse(
            r#"<Catalog><TemplateDef><id>a</id><category>Particle</category><durationSecs>1e20</durationSecs></TemplateDef></Catalog>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, CatalogErrorCode::InvalidValue);
        assert!(err.location.is_some());

        let defs = parse(
            r#"<Catalog><TemplateDef><id>a</id><category>Particle</category><durationSecs>86400</durationSecs></TemplateDef></Catalog>"#,
        )
        .expect("parse");
        assert!((defs[0].params.duration_secs - MAX_DURATION_SECS).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse("<Catalog><TemplateDef><id>a</id></Catalog>").expect_err("err");
        assert_eq!(err.code, CatalogErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn unpooled_flag_parses() {
        let defs = parse(
            r#"<Catalog><TemplateDef><id>room</id><category>Facility</category><pooled>false</pooled></TemplateDef></Catalog>"#,
        )
        .expect("parse");
        assert!(!defs[0].pooled);
    }
}

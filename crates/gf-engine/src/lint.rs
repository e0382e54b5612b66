//! Lint diagnostics for field→layer pairs.
//!
//! Reports what an `apply` run would skip or get wrong, without writing.

use crate::host::DocumentHost;
use crate::resolver::{Resolution, resolve_for_write};
use gf_core::id::LayerId;
use gf_core::mapping::FieldToLayer;
use gf_core::normalize::ITEM_FIELDS;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

// ─── Diagnostic types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// The pair will be skipped.
    Warning,
    /// The pair runs, but probably not as intended.
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDiagnostic {
    /// Index of the pair in the checked list.
    pub pair: usize,
    pub layer_id: LayerId,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "missing-layer", "kind-mismatch").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Check `pairs` against the document.
///
/// Field names are checked against `sample` when given, otherwise against
/// the normalized item fields.
#[must_use]
pub fn lint_pairs(
    host: &dyn DocumentHost,
    pairs: &[FieldToLayer],
    sample: Option<&Value>,
) -> Vec<PairDiagnostic> {
    let mut diags = Vec::new();
    for (index, pair) in pairs.iter().enumerate() {
        lint_target(host, index, pair, &mut diags);
        lint_field(index, pair, sample, &mut diags);
    }
    lint_shared_targets(pairs, &mut diags);
    diags.sort_by_key(|d| d.pair);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn lint_target(
    host: &dyn DocumentHost,
    index: usize,
    pair: &FieldToLayer,
    diags: &mut Vec<PairDiagnostic>,
) {
    let diag = |message: String, rule| PairDiagnostic {
        pair: index,
        layer_id: pair.layer_id,
        message,
        severity: LintSeverity::Warning,
        rule,
    };
    match resolve_for_write(host, pair.layer_id) {
        Resolution::Missing => diags.push(diag(
            format!("Layer {} does not exist.", pair.layer_id),
            "missing-layer",
        )),
        Resolution::Locked(info) => diags.push(diag(
            format!("Layer \"{}\" is locked and will be skipped.", info.name),
            "locked-layer",
        )),
        Resolution::Ready(info) if !info.accepts(pair.kind) => diags.push(diag(
            format!(
                "Layer \"{}\" ({}) cannot take {} content.",
                info.name,
                info.layer_type,
                pair.kind.as_str()
            ),
            "kind-mismatch",
        )),
        Resolution::Ready(_) => {}
    }
}

fn lint_field(
    index: usize,
    pair: &FieldToLayer,
    sample: Option<&Value>,
    diags: &mut Vec<PairDiagnostic>,
) {
    let known = match sample {
        Some(item) => item.get(&pair.field).is_some(),
        None => ITEM_FIELDS.contains(&pair.field.as_str()),
    };
    if !known {
        diags.push(PairDiagnostic {
            pair: index,
            layer_id: pair.layer_id,
            message: format!(
                "Items have no field `{}`; the layer gets the fallback or an empty value.",
                pair.field
            ),
            severity: LintSeverity::Info,
            rule: "unknown-field",
        });
    }
}

/// Later pairs overwrite earlier ones that target the same layer.
fn lint_shared_targets(pairs: &[FieldToLayer], diags: &mut Vec<PairDiagnostic>) {
    let mut first_use: HashMap<LayerId, usize> = HashMap::new();
    for (index, pair) in pairs.iter().enumerate() {
        match first_use.get(&pair.layer_id) {
            Some(first) => diags.push(PairDiagnostic {
                pair: index,
                layer_id: pair.layer_id,
                message: format!(
                    "Layer {} is already targeted by pair {}; this pair overwrites it.",
                    pair.layer_id,
                    first + 1
                ),
                severity: LintSeverity::Info,
                rule: "duplicate-target",
            }),
            None => {
                first_use.insert(pair.layer_id, index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use gf_core::mapping::PairKind;
    use gf_core::model::{Document, FontName, Layer, LayerKind};
    use pretty_assertions::assert_eq;

    fn host() -> MemoryHost {
        let mut doc = Document::default();
        doc.add_layer(
            doc.root,
            Layer::text(LayerId::intern("l:title"), "Title", "", FontName::default()),
        );
        doc.add_layer(
            doc.root,
            Layer::new(LayerId::intern("l:art"), "Art", LayerKind::Rectangle).locked(),
        );
        MemoryHost::new(doc)
    }

    fn pair(layer: &str, kind: PairKind, field: &str) -> FieldToLayer {
        FieldToLayer {
            layer_id: LayerId::intern(layer),
            kind,
            field: field.into(),
            transform: None,
        }
    }

    fn rules(diags: &[PairDiagnostic]) -> Vec<(usize, &'static str)> {
        diags.iter().map(|d| (d.pair, d.rule)).collect()
    }

    #[test]
    fn clean_pairs_no_diags() {
        let pairs = [pair("l:title", PairKind::Text, "title")];
        assert!(lint_pairs(&host(), &pairs, None).is_empty());
    }

    #[test]
    fn reports_each_rule() {
        let pairs = [
            pair("l:ghost", PairKind::Text, "title"),
            pair("l:art", PairKind::Image, "imageUrl"),
            pair("l:title", PairKind::Image, "imageUrl"),
            pair("l:title", PairKind::Text, "tagline"),
        ];
        assert_eq!(
            rules(&lint_pairs(&host(), &pairs, None)),
            vec![
                (0, "missing-layer"),
                (1, "locked-layer"),
                (2, "kind-mismatch"),
                (3, "unknown-field"),
                (3, "duplicate-target"),
            ]
        );
    }

    #[test]
    fn sample_item_defines_known_fields() {
        let pairs = [pair("l:title", PairKind::Text, "tagline")];
        let sample = serde_json::json!({ "tagline": "Tonight only" });
        assert!(lint_pairs(&host(), &pairs, Some(&sample)).is_empty());
    }
}

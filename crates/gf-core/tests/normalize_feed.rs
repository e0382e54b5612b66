//! Integration tests: raw feed hits → normalized items → transformed strings.
//!
//! Exercises the `gf-core` content pipeline end to end on a recorded page.

use gf_core::normalize::{Hit, ITEM_FIELDS, field_catalog, normalize_all};
use gf_core::transform::{Transform, apply_transform};
use pretty_assertions::assert_eq;

fn load_items() -> Vec<gf_core::NormalizedItem> {
    let hits: Vec<Hit> = serde_json::from_str(include_str!("fixtures/hits.json")).unwrap();
    normalize_all(&hits, "tcm")
}

// ─── Field fallbacks ─────────────────────────────────────────────────────

#[test]
fn titles_prefer_short_then_full() {
    let items = load_items();
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["The Long Night", "Harbor Lights", "Quiet Fields", ""]
    );
}

#[test]
fn runtime_display_sources() {
    let items = load_items();
    let runtimes: Vec<Option<&str>> = items
        .iter()
        .map(|i| i.runtime_display.as_deref())
        .collect();
    assert_eq!(runtimes, vec![Some("1h 30m"), Some("1m"), Some("2h 5m"), None]);
}

#[test]
fn advisory_and_images_follow_priority() {
    let items = load_items();
    assert_eq!(items[0].advisory.as_deref(), Some("TV-14"));
    assert_eq!(items[1].advisory.as_deref(), Some("PG"));
    assert_eq!(items[2].advisory.as_deref(), Some("R"));
    assert_eq!(items[3].advisory, None);

    assert_eq!(
        items[1].image_url.as_deref(),
        Some("https://img.example.com/harbor-cut.png")
    );
    assert_eq!(
        items[2].image_url.as_deref(),
        Some("https://img.example.com/qf.jpg")
    );
    assert_eq!(items[3].image_url, None);
}

#[test]
fn genres_capped_and_brand_tagged() {
    let items = load_items();
    assert_eq!(items[0].genres.as_slice(), ["Drama", "Thriller"]);
    assert!(items[1].genres.is_empty());
    assert!(items.iter().all(|i| i.brand == "tcm"));
}

#[test]
fn mistyped_fields_degrade_without_dropping_the_hit() {
    let hits: Vec<Hit> =
        serde_json::from_str(include_str!("fixtures/mistyped_hits.json")).unwrap();
    let items = normalize_all(&hits, "tcm");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "Night Train");
    assert_eq!(items[0].year, None);
    assert_eq!(items[0].runtime_display.as_deref(), Some("1h 30m"));
    assert_eq!(items[0].genres.as_slice(), ["Drama"]);
    assert_eq!(items[0].advisory.as_deref(), Some("PG"));

    assert_eq!(items[1].id, "");
    assert_eq!(items[1].title, "");
    assert_eq!(items[1].year, Some(2004));
    assert!(items[1].genres.is_empty());
    assert_eq!(items[1].advisory.as_deref(), Some("G"));
    assert_eq!(
        items[1].image_url.as_deref(),
        Some("https://img.example.com/wrong-shape.jpg")
    );
}

// ─── Normalized → transformed ────────────────────────────────────────────

#[test]
fn every_field_transforms_without_panicking() {
    let items = load_items();
    let t = Transform {
        fallback: Some("n/a".into()),
        join: Some(" / ".into()),
        truncate: Some(6),
        uppercase: true,
    };
    for item in &items {
        for field in ITEM_FIELDS {
            let out = apply_transform(item.field(field).as_ref(), Some(&t));
            assert!(!out.is_empty(), "{field} of {} came out empty", item.id);
        }
    }
    assert_eq!(
        apply_transform(items[0].field("genres").as_ref(), Some(&t)),
        "DRAMA ..."
    );
    assert_eq!(apply_transform(items[3].field("year").as_ref(), Some(&t)), "N/A");
}

#[test]
fn catalog_reports_types() {
    let items = load_items();
    let catalog = field_catalog(&items[0]);
    let year = catalog.iter().find(|f| f.path == "year").unwrap();
    assert_eq!(year.kind, "number");
    let genres = catalog.iter().find(|f| f.path == "genres").unwrap();
    assert_eq!(genres.kind, "array");

    let sparse = field_catalog(&items[3]);
    let advisory = sparse.iter().find(|f| f.path == "advisory").unwrap();
    assert_eq!(advisory.kind, "undefined");
}

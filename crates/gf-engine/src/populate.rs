//! Population executor.
//!
//! Every run is planned first as an ordered list of [`Task`]s, then a single
//! coordinator executes them one at a time. Nothing is written concurrently,
//! so the order of document mutations and the tallies are deterministic.
//!
//! Accounting:
//! - `success`: the unit's writes all completed (image writes count even
//!   when they fell back to a placeholder);
//! - `failed`: a host primitive errored; the batch carries on;
//! - `skipped`: nothing was attempted (missing or locked layer, kind
//!   mismatch, empty image URL). Skips never count as success or failure.

use crate::host::{DocumentHost, HostError, ImageFetcher};
use crate::item::{self, meta_line};
use crate::resolver::{Resolution, find_mapped_nodes, resolve_for_write};
use gf_core::config::EngineConfig;
use gf_core::id::LayerId;
use gf_core::mapping::{FieldToLayer, Mapping, PairKind, Window};
use gf_core::model::{FontSelection, ImageHash, Paint, ScaleMode};
use gf_core::transform::apply_transform;
use serde::Serialize;
use serde_json::Value;

// ─── Request-level warnings ──────────────────────────────────────────────

pub const NO_ITEMS: &str = "No items to populate.";
pub const NO_ITEMS_IN_WINDOW: &str = "No items in the selected range.";
pub const NO_MAPPING: &str = "No field mapping defined.";
pub const NO_PAIRS: &str = "No field mappings defined.";
pub const NOTHING_SELECTED: &str = "Nothing selected. Select a card or a frame of cards.";
pub const LEGACY_DISABLED: &str = "Name-based population is disabled; map fields to layers instead.";

// ─── Report ──────────────────────────────────────────────────────────────

/// Outcome of one population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Non-fatal findings, in the order they happened.
    pub warnings: Vec<String>,
    /// The request was refused before any write; `warnings` holds the reason.
    pub rejected: bool,
}

impl BatchReport {
    fn rejected(reason: &str) -> Self {
        log::warn!("{reason}");
        Self {
            warnings: vec![reason.to_string()],
            rejected: true,
            ..Default::default()
        }
    }

    /// Units the run accounted for, whatever their outcome.
    pub fn attempted(&self) -> usize {
        self.success + self.failed + self.skipped
    }

    fn skip(&mut self, reason: String) {
        log::warn!("{reason}, skipping");
        self.skipped += 1;
        self.warnings.push(reason);
    }
}

// ─── Planning ────────────────────────────────────────────────────────────

/// One unit of work. `item` and `pair` index into the request's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Fill one card with one item through the name-based mapping.
    Card { card: LayerId, item: usize },
    /// Apply one field→layer pair for one item.
    Pair { item: usize, pair: usize },
}

/// Pair the windowed items with cards, one each; extra cards or items are left out.
pub fn plan_cards(cards: &[LayerId], item_count: usize, window: Window) -> Vec<Task> {
    window
        .range(item_count)
        .zip(cards)
        .map(|(item, card)| Task::Card { card: *card, item })
        .collect()
}

/// Every pair for every windowed item, item-major.
pub fn plan_pairs(item_count: usize, pair_count: usize, window: Window) -> Vec<Task> {
    window
        .range(item_count)
        .flat_map(|item| (0..pair_count).map(move |pair| Task::Pair { item, pair }))
        .collect()
}

enum PairOutcome {
    Written,
    Skipped(String),
}

// ─── Coordinator ─────────────────────────────────────────────────────────

/// Runs population requests against a host.
pub struct Populator<'a> {
    host: &'a mut dyn DocumentHost,
    images: &'a dyn ImageFetcher,
    config: &'a EngineConfig,
}

impl<'a> Populator<'a> {
    pub fn new(
        host: &'a mut dyn DocumentHost,
        images: &'a dyn ImageFetcher,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            host,
            images,
            config,
        }
    }

    /// Fill the selected cards with `items[window]` via the name-based mapping.
    pub async fn populate_cards(
        &mut self,
        items: &[Value],
        mapping: Option<&Mapping>,
        window: Window,
    ) -> BatchReport {
        match self.plan_card_run(items, mapping, window) {
            Ok(tasks) => self.execute(&tasks, items, mapping, &[]).await,
            Err(rejected) => rejected,
        }
    }

    /// Validate a name-based request and plan it. A refused request comes
    /// back as its rejection report.
    pub fn plan_card_run(
        &self,
        items: &[Value],
        mapping: Option<&Mapping>,
        window: Window,
    ) -> Result<Vec<Task>, BatchReport> {
        if items.is_empty() {
            return Err(BatchReport::rejected(NO_ITEMS));
        }
        if mapping.is_none_or(Mapping::is_blank) {
            return Err(BatchReport::rejected(NO_MAPPING));
        }
        if !self.config.legacy_name_lookup {
            return Err(BatchReport::rejected(LEGACY_DISABLED));
        }
        let cards = crate::discovery::target_cards(&*self.host, self.config.row_tolerance);
        if cards.is_empty() {
            return Err(BatchReport::rejected(NOTHING_SELECTED));
        }

        let tasks = plan_cards(&cards, items.len(), window);
        if tasks.is_empty() {
            return Err(BatchReport::rejected(NO_ITEMS_IN_WINDOW));
        }
        log::debug!(
            "planned {} card tasks ({} cards, {} items)",
            tasks.len(),
            cards.len(),
            items.len()
        );
        Ok(tasks)
    }

    /// Fill the first selected layer with the first item, using the
    /// conventional `Title`/`Meta`/`Poster` names.
    pub async fn populate_single(&mut self, items: &[Value]) -> BatchReport {
        let Some(target) = self.host.selection().first().copied() else {
            return BatchReport::rejected(NOTHING_SELECTED);
        };
        if items.is_empty() {
            return BatchReport::rejected(NO_ITEMS);
        }
        let tasks = [Task::Card {
            card: target,
            item: 0,
        }];
        self.execute(&tasks, items, Some(&Mapping::default()), &[]).await
    }

    /// Apply every pair to every item of `items[window]`.
    pub async fn apply_pairs(
        &mut self,
        items: &[Value],
        pairs: &[FieldToLayer],
        window: Window,
    ) -> BatchReport {
        if pairs.is_empty() {
            return BatchReport::rejected(NO_PAIRS);
        }
        if items.is_empty() {
            return BatchReport::rejected(NO_ITEMS);
        }
        let tasks = plan_pairs(items.len(), pairs.len(), window);
        log::debug!(
            "planned {} pair tasks ({} pairs over items {:?})",
            tasks.len(),
            pairs.len(),
            window.range(items.len())
        );
        self.execute(&tasks, items, None, pairs).await
    }

    /// Execute `tasks` strictly in order. Failures stay inside the unit.
    ///
    /// Card tasks use `mapping`; pair tasks index into `pairs`.
    pub async fn execute(
        &mut self,
        tasks: &[Task],
        items: &[Value],
        mapping: Option<&Mapping>,
        pairs: &[FieldToLayer],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for task in tasks {
            match *task {
                Task::Card { card, item } => {
                    let (Some(item), Some(mapping)) = (items.get(item), mapping) else {
                        continue;
                    };
                    match self.fill_card(card, item, mapping, &mut report).await {
                        Ok(()) => report.success += 1,
                        Err(e) => {
                            log::error!("failed to populate card {card}: {e}");
                            report.failed += 1;
                        }
                    }
                }
                Task::Pair { item, pair } => {
                    let (Some(item), Some(pair)) = (items.get(item), pairs.get(pair)) else {
                        continue;
                    };
                    match self.apply_pair(item, pair).await {
                        Ok(PairOutcome::Written) => report.success += 1,
                        Ok(PairOutcome::Skipped(reason)) => report.skip(reason),
                        Err(e) => {
                            log::error!("failed to apply {} to {}: {e}", pair.field, pair.layer_id);
                            report.failed += 1;
                        }
                    }
                }
            }
        }
        log::info!(
            "population finished: {} succeeded, {} failed, {} skipped",
            report.success,
            report.failed,
            report.skipped
        );
        report
    }

    async fn fill_card(
        &mut self,
        card: LayerId,
        item: &Value,
        mapping: &Mapping,
        report: &mut BatchReport,
    ) -> Result<(), HostError> {
        let nodes = find_mapped_nodes(&*self.host, card, mapping);

        if let (Some(id), Some(title)) = (nodes.title, item::title(item)) {
            self.write_text(id, &title).await?;
        }

        if let Some(id) = nodes.meta {
            let meta = meta_line(item);
            if !meta.is_empty() {
                self.write_text(id, &meta).await?;
            }
        }

        match nodes.poster {
            Some(id) => {
                let url = item::image_url(item);
                self.fill_image(id, url.as_deref(), item::brand(item)).await?;
            }
            None => {
                let warning = format!(
                    "No poster layer named \"{}\" in card {card}",
                    mapping.poster_node
                );
                log::warn!("{warning}");
                report.warnings.push(warning);
            }
        }
        Ok(())
    }

    async fn apply_pair(
        &mut self,
        item: &Value,
        pair: &FieldToLayer,
    ) -> Result<PairOutcome, HostError> {
        let id = pair.layer_id;
        let info = match resolve_for_write(&*self.host, id) {
            Resolution::Missing => {
                return Ok(PairOutcome::Skipped(format!("Layer {id} not found")));
            }
            Resolution::Locked(info) => {
                return Ok(PairOutcome::Skipped(format!(
                    "Layer {id} ({}) is locked",
                    info.name
                )));
            }
            Resolution::Ready(info) => info,
        };

        let value = apply_transform(item::field(item, &pair.field), pair.transform.as_ref());
        match pair.kind {
            PairKind::Text if info.text_capable => {
                self.write_text(id, &value).await?;
                Ok(PairOutcome::Written)
            }
            PairKind::Image if info.image_fill_capable => {
                if value.is_empty() {
                    return Ok(PairOutcome::Skipped(format!(
                        "No image URL in \"{}\" for layer {id}",
                        pair.field
                    )));
                }
                self.fill_image(id, Some(&value), item::brand(item)).await?;
                Ok(PairOutcome::Written)
            }
            kind => Ok(PairOutcome::Skipped(format!(
                "Layer {id} ({}) cannot take {} content",
                info.layer_type,
                kind.as_str()
            ))),
        }
    }

    /// Load the layer's font, then replace its characters.
    ///
    /// Mixed-font text loads the leading run's font only; the other runs
    /// keep their font metadata.
    pub async fn write_text(&mut self, id: LayerId, text: &str) -> Result<(), HostError> {
        match self.host.font_selection(id)? {
            FontSelection::Uniform(font)
            | FontSelection::Mixed {
                leading: Some(font),
            } => self.host.load_font(&font).await?,
            FontSelection::Mixed { leading: None } => {
                log::warn!("layer {id} reports no leading font");
            }
        }
        self.host.set_characters(id, text)
    }

    /// Fill a layer with the image at `url`.
    ///
    /// No URL gives a full-opacity brand placeholder. A URL that fails to
    /// fetch or decode gives the same placeholder at reduced opacity.
    pub async fn fill_image(
        &mut self,
        id: LayerId,
        url: Option<&str>,
        brand: &str,
    ) -> Result<(), HostError> {
        let color = self.config.brand_color(brand);
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            log::debug!("no image for layer {id}, drawing {brand} placeholder");
            return self.host.set_fills(
                id,
                vec![Paint::Solid {
                    color,
                    opacity: 1.0,
                }],
            );
        };

        let paint = match self.load_image(url).await {
            Ok(image_hash) => Paint::Image {
                image_hash,
                scale_mode: ScaleMode::Fill,
            },
            Err(e) => {
                log::warn!("failed to load image from {url}, using placeholder: {e}");
                Paint::Solid {
                    color,
                    opacity: self.config.placeholder_failure_opacity,
                }
            }
        };
        self.host.set_fills(id, vec![paint])
    }

    async fn load_image(&mut self, url: &str) -> Result<ImageHash, HostError> {
        let bytes = self.images.fetch(url).await?;
        self.host.create_image(bytes)
    }
}

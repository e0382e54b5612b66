//! Plugin controller: turns UI messages into engine calls.
//!
//! Each request is validated, run to completion, and answered with a
//! notification and, where the UI expects one, a structured event. No
//! failure escapes a handler.

use crate::host::{ClientStorage, DocumentHost, ImageFetcher, UiChannel};
use crate::messages::{PluginEvent, UiMessage};
use crate::populate::{BatchReport, Populator};
use crate::resolver::introspect_selection;
use crate::store::MappingStore;
use gf_core::config::EngineConfig;
use gf_core::mapping::{FieldToLayer, Mapping, Window};
use serde_json::Value;

pub struct Plugin<H, S, U, F> {
    host: H,
    store: MappingStore<S>,
    ui: U,
    images: F,
    config: EngineConfig,
}

impl<H, S, U, F> Plugin<H, S, U, F>
where
    H: DocumentHost,
    S: ClientStorage,
    U: UiChannel,
    F: ImageFetcher,
{
    pub fn new(host: H, storage: S, ui: U, images: F, config: EngineConfig) -> Self {
        let store = MappingStore::new(storage, &config.storage_namespace);
        Self {
            host,
            store,
            ui,
            images,
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn store(&self) -> &MappingStore<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle a raw JSON message. Unparseable messages are logged and dropped.
    pub async fn handle_json(&mut self, text: &str) {
        match UiMessage::from_json(text) {
            Ok(msg) => self.handle(msg).await,
            Err(e) => log::warn!("{e}"),
        }
    }

    pub async fn handle(&mut self, msg: UiMessage) {
        match msg {
            UiMessage::Populate { items } => self.populate(&items).await,
            UiMessage::SaveMapping { brand, mapping } => {
                self.save_mapping(non_blank(brand), mapping).await
            }
            UiMessage::LoadMapping { brand } => self.load_mapping(non_blank(brand)).await,
            UiMessage::MultiPopulate {
                items,
                mapping,
                offset,
                count,
            } => {
                self.multi_populate(&items, mapping.as_ref(), Window::from_wire(offset, count))
                    .await
            }
            UiMessage::IntrospectSelection => {
                let layers = introspect_selection(&self.host);
                log::debug!("introspected {} layers", layers.len());
                self.ui.post(PluginEvent::SelectionIntrospected { layers });
            }
            UiMessage::ApplyMapping {
                brand,
                pairs,
                items,
                offset,
                count,
            } => {
                if let Some(brand) = brand {
                    log::debug!("applying mapping for {brand}");
                }
                self.apply_mapping(&pairs, &items, Window::from_wire(offset, count))
                    .await
            }
        }
    }

    fn populator(&mut self) -> Populator<'_> {
        Populator::new(&mut self.host, &self.images, &self.config)
    }

    fn warn(&mut self, message: &str) {
        self.ui.notify(&format!("⚠️ {message}"));
    }

    async fn populate(&mut self, items: &[Value]) {
        let report = self.populator().populate_single(items).await;
        if report.rejected {
            return self.warn_rejection(&report);
        }
        if report.failed == 0 {
            self.ui.notify("Populated 1 item.");
        } else {
            self.warn("Failed to populate the selected card.");
        }
    }

    async fn save_mapping(&mut self, brand: Option<String>, mapping: Option<Mapping>) {
        let (Some(brand), Some(mapping)) = (brand, mapping) else {
            return self.warn("Missing brand or mapping data.");
        };
        match self.store.save(&brand, &mapping).await {
            Ok(()) => {
                self.ui
                    .notify(&format!("✅ Mapping saved for {}", brand.to_uppercase()));
                self.ui.post(PluginEvent::MappingSaved { brand });
            }
            Err(e) => {
                log::error!("save mapping error: {e}");
                self.warn("Failed to save mapping.");
            }
        }
    }

    async fn load_mapping(&mut self, brand: Option<String>) {
        let Some(brand) = brand else {
            return self.warn("Missing brand.");
        };
        match self.store.load_or_default(&brand).await {
            Ok(mapping) => self.ui.post(PluginEvent::MappingLoaded { brand, mapping }),
            Err(e) => {
                log::error!("load mapping error: {e}");
                self.warn("Failed to load mapping.");
            }
        }
    }

    async fn multi_populate(&mut self, items: &[Value], mapping: Option<&Mapping>, window: Window) {
        let planned = self.populator().plan_card_run(items, mapping, window);
        let tasks = match planned {
            Ok(tasks) => tasks,
            Err(report) => return self.warn_rejection(&report),
        };
        self.ui
            .notify(&format!("⏳ Populating {} cards...", tasks.len()));
        let report = self.populator().execute(&tasks, items, mapping, &[]).await;

        if report.failed == 0 {
            self.ui
                .notify(&format!("✅ Populated {} cards!", report.success));
        } else {
            self.warn(&format!(
                "Populated {} cards, {} failed.",
                report.success, report.failed
            ));
        }
        self.ui.post(PluginEvent::MultiPopulateComplete {
            success_count: report.success,
            fail_count: report.failed,
        });
    }

    async fn apply_mapping(&mut self, pairs: &[FieldToLayer], items: &[Value], window: Window) {
        if !pairs.is_empty() && !items.is_empty() {
            self.ui.notify("⏳ Applying mappings...");
        }
        let report = self.populator().apply_pairs(items, pairs, window).await;
        if report.rejected {
            return self.warn_rejection(&report);
        }

        if report.failed == 0 {
            self.ui
                .notify(&format!("✅ Applied {} mappings!", report.success));
        } else {
            self.warn(&format!(
                "Applied {} mappings, {} failed.",
                report.success, report.failed
            ));
        }
        self.ui.post(PluginEvent::ApplyMappingComplete {
            success: report.success,
            failed: report.failed,
        });
    }

    fn warn_rejection(&mut self, report: &BatchReport) {
        for warning in &report.warnings {
            self.warn(warning);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! Card discovery: which layers receive one item each, and in what order.

use crate::host::DocumentHost;
use gf_core::id::LayerId;
use gf_core::layout::{Placed, reading_order};

/// Cards targeted by the current selection.
///
/// - several layers selected: each is a card, in selection order;
/// - one frame/group/component with children: its children in reading order;
/// - one layer otherwise: that layer;
/// - nothing selected: empty.
pub fn target_cards(host: &dyn DocumentHost, row_tolerance: f32) -> Vec<LayerId> {
    let selection = host.selection();
    let [single] = selection.as_slice() else {
        return selection;
    };

    let is_container = host
        .layer(*single)
        .is_some_and(|l| l.layer_type.is_card_container());
    if is_container {
        let placed: Vec<Placed> = host
            .children(*single)
            .into_iter()
            .filter_map(|id| host.layer(id))
            .map(|l| Placed {
                id: l.id,
                x: l.x,
                y: l.y,
            })
            .collect();
        if !placed.is_empty() {
            log::debug!("container {single} holds {} cards", placed.len());
            return reading_order(&placed, row_tolerance);
        }
    }
    vec![*single]
}

//! Reading order for cards laid out on a canvas.
//!
//! Cards are read row by row, top to bottom, then left to right inside a
//! row. Rows are found with a tolerance because hand-placed cards are rarely
//! pixel-aligned.

use crate::id::LayerId;

/// Default vertical tolerance, in layout units, for two cards to share a row.
pub const ROW_TOLERANCE: f32 = 10.0;

/// A card and its position relative to its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed {
    pub id: LayerId,
    pub x: f32,
    pub y: f32,
}

/// Sort cards into reading order and return their ids.
///
/// Cards are sorted by `y`; a card joins the current row while its `y` is
/// within `tolerance` of the row's first card, otherwise it opens a new row.
/// Each row is then sorted by `x`. Both sorts are stable, so cards at the
/// same position keep their document order.
pub fn reading_order(cards: &[Placed], tolerance: f32) -> Vec<LayerId> {
    let mut by_y = cards.to_vec();
    by_y.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut rows: Vec<Vec<Placed>> = Vec::new();
    for card in by_y {
        match rows.last_mut() {
            Some(row) if card.y - row[0].y <= tolerance => row.push(card),
            _ => rows.push(vec![card]),
        }
    }

    rows.into_iter()
        .flat_map(|mut row| {
            row.sort_by(|a, b| a.x.total_cmp(&b.x));
            row
        })
        .map(|card| card.id)
        .collect()
}

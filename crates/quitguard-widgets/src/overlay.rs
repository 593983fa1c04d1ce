//! Placing a floating box over whatever the application already drew.

use ratatui::layout::Rect;
use ratatui::widgets::{Block, Clear};
use ratatui::Frame;

/// A `width` x `height` rect centered in `area`, shrunk to fit if needed.
pub fn centered_box(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Blank `area`, draw `block` around it, and return the space inside.
pub fn render_boxed(frame: &mut Frame, area: Rect, block: &Block) -> Rect {
    frame.render_widget(Clear, area);
    frame.render_widget(block.clone(), area);
    block.inner(area)
}

/// Whether the cell at (`column`, `row`) lies inside `area`.
pub fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

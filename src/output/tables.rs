use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use super::styling::Band;

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Formats hours as `12.3h`, coloured by [`Band`].
pub fn lead_time_cell(hours: f64) -> Cell {
    let color = match Band::of_hours(hours) {
        Band::Daily => TableColor::Green,
        Band::Weekly => TableColor::Yellow,
        Band::Slower => TableColor::Red,
    };
    Cell::new(format_hours(hours)).fg(color)
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.1}h")
}

//! Record-list rendering as terminal tables.

use cmdforge_core::{Record, Value};
use comfy_table::{Cell, CellAlignment, Color, ColumnConstraint, Table, Width, presets};

use crate::style::terminal_width;

/// Visual style of a rendered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    #[default]
    Simple,
    Bordered,
    Alternating,
}

impl TableStyle {
    const ALL: [TableStyle; 3] = [
        TableStyle::Simple,
        TableStyle::Bordered,
        TableStyle::Alternating,
    ];

    /// Resolves a style from a parsed argument: an index into the style
    /// list (clamped) or a case-insensitive name. Anything else is Simple.
    pub fn from_value(value: Option<&Value>) -> TableStyle {
        match value {
            Some(Value::Int(index)) => {
                let index = (*index).clamp(0, Self::ALL.len() as i64 - 1) as usize;
                Self::ALL[index]
            }
            Some(Value::Str(name)) => match name.to_lowercase().as_str() {
                "bordered" => TableStyle::Bordered,
                "alternating" => TableStyle::Alternating,
                _ => TableStyle::Simple,
            },
            _ => TableStyle::Simple,
        }
    }
}

/// Width in cells of one weight unit, scaled so the weighted columns cover
/// 70% of the terminal.
fn single_column_width(total_weight: usize) -> usize {
    (terminal_width() * 7 / 10) / total_weight.max(1)
}

/// Renders records as a table. Headers default to the first record's keys;
/// `widths` are relative weights per column, missing entries weigh 1.
pub fn render_table(
    records: &[Record],
    style: TableStyle,
    widths: &[usize],
    headers: Option<Vec<String>>,
) -> String {
    let headers = match headers {
        Some(headers) if !headers.is_empty() => headers,
        _ => match records.first() {
            Some(first) => first.keys().cloned().collect(),
            None => return String::new(),
        },
    };

    let mut table = Table::new();
    match style {
        TableStyle::Simple => table.load_preset(presets::ASCII_HORIZONTAL_ONLY),
        TableStyle::Bordered | TableStyle::Alternating => table.load_preset(presets::UTF8_FULL),
    };

    table.set_header(
        headers
            .iter()
            .map(|header| Cell::new(header).set_alignment(CellAlignment::Center)),
    );

    let mut weights: Vec<usize> = widths.iter().map(|&weight| weight.max(1)).collect();
    weights.resize(headers.len(), 1);
    let unit = single_column_width(weights.iter().sum());
    table.set_constraints(
        weights
            .iter()
            .map(|&weight| ColumnConstraint::Absolute(Width::Fixed((weight * unit) as u16))),
    );

    for (index, record) in records.iter().enumerate() {
        let shaded = style == TableStyle::Alternating && index % 2 == 1;
        table.add_row(record.values().map(|value| {
            let cell = Cell::new(value.to_string());
            if shaded { cell.fg(Color::DarkGrey) } else { cell }
        }));
    }
    table.to_string()
}

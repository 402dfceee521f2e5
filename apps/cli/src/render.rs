use std::fmt::Write;

use protocap_core::{CombinedProtocolRow, MappingStatus};

const HEADERS: [&str; 7] = [
    "#", "Protocol", "Token", "Revenue", "Market Cap", "Share", "Status",
];

/// Plain-text table of pipeline rows, one line per protocol.
pub fn render_table(rows: &[CombinedProtocolRow]) -> String {
    let cells: Vec<[String; 7]> = rows.iter().map(row_cells).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out
}

fn row_cells(row: &CombinedProtocolRow) -> [String; 7] {
    let token = row
        .token
        .as_ref()
        .map(|t| t.symbol.to_uppercase())
        .unwrap_or_else(|| "-".to_string());
    let status = match row.mapping_status {
        MappingStatus::Success => "success".to_string(),
        MappingStatus::Partial => format!("partial ({:.2})", row.confidence),
        MappingStatus::Failed => "failed".to_string(),
    };
    [
        row.rank.to_string(),
        row.protocol_name.clone(),
        token,
        format_usd(row.revenue),
        row.market_cap.map(format_usd).unwrap_or_else(|| "-".to_string()),
        row.market_cap_percentage
            .map(|p| format!("{:.2}%", p))
            .unwrap_or_else(|| "-".to_string()),
        status,
    ]
}

fn push_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .enumerate()
        .map(|(i, (cell, width))| {
            // Numeric columns are right-aligned.
            if i == 0 || (3..=5).contains(&i) {
                format!("{:>width$}", cell, width = width)
            } else {
                format!("{:<width$}", cell, width = width)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join("  ").trim_end());
}

/// Compact dollar amount: `$1.23B`, `$45.60M`, `$7.80K`, `$12`.
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        return format!("${:.0}", value);
    };
    format!("${:.2}{}", scaled, suffix)
}

use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;

use crate::loader::Artwork;
use crate::reconciler::{RecordStatus, SelectedRecord};
use crate::session::PageView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportRecord {
    pub position: usize,
    pub id: u64,
    pub title: String,
    pub place_of_origin: String,
    pub artist_display: String,
    pub inscriptions: String,
    pub date_start: Option<i64>,
    pub date_end: Option<i64>,
}

pub fn build_records(selected: &[SelectedRecord]) -> Vec<ExportRecord> {
    selected
        .iter()
        .map(|s| ExportRecord {
            position: s.position,
            id: s.record.id,
            title: s.record.title.clone().unwrap_or_default(),
            place_of_origin: s.record.place_of_origin.clone().unwrap_or_default(),
            artist_display: s.record.artist_display.clone().unwrap_or_default(),
            inscriptions: s.record.inscriptions.clone().unwrap_or_default(),
            date_start: s.record.date_start,
            date_end: s.record.date_end,
        })
        .collect()
}

pub fn render_records(records: &[ExportRecord], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Json => {
            serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for r in records {
                out.push_str(&format!("{}\t{}\t{}\n", r.position, r.id, r.title));
            }
            out.into_bytes()
        }
    }
}

pub fn render_view(view: &PageView, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(view).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => render_view_text(view),
    }
}

fn checkbox(status: RecordStatus) -> String {
    match status {
        RecordStatus::ManuallySelected => "[x]".bold().green().to_string(),
        RecordStatus::BulkSelected => "[x]".green().to_string(),
        RecordStatus::BulkExcluded => "[-]".yellow().to_string(),
        RecordStatus::Unselected => "[ ]".to_string(),
    }
}

fn truncate(value: &str, max: usize) -> String {
    let first_line = value.lines().next().unwrap_or("");
    if first_line.chars().count() <= max {
        return first_line.to_string();
    }
    let mut out: String = first_line.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn year(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn text_cell(value: &Option<String>, max: usize) -> String {
    truncate(value.as_deref().unwrap_or(""), max)
}

fn render_row(record: &Artwork, position: usize, status: RecordStatus) -> String {
    format!(
        "{} {:>5} {:>7}  {:<36} {:<14} {:<28} {:<20} {:>6} {:>6}",
        checkbox(status),
        position,
        record.id,
        text_cell(&record.title, 36),
        text_cell(&record.place_of_origin, 14),
        text_cell(&record.artist_display, 28),
        text_cell(&record.inscriptions, 20),
        year(record.date_start),
        year(record.date_end),
    )
}

pub fn render_view_text(view: &PageView) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        ":: Page {}/{} :: Records {} :: Selected {} (page {}) :: Bulk {} ::\n",
        view.page,
        view.total_pages,
        view.total_records,
        view.selected_total,
        view.selected_on_page,
        view.bulk_target,
    ));
    if let Some(loading) = view.loading {
        out.push_str(&format!(":: Loading page {loading} ::\n"));
    }
    if let Some(error) = view.error.as_ref() {
        out.push_str(&format!(
            "{} page {}: {}\n",
            "[ERR]".bold().red(),
            error.page,
            error.message
        ));
    }
    out.push_str(&format!(
        "{:<3} {:>5} {:>7}  {:<36} {:<14} {:<28} {:<20} {:>6} {:>6}\n",
        "sel", "pos", "id", "title", "origin", "artist", "inscriptions", "start", "end"
    ));
    for row in view.rows.iter() {
        out.push_str(&render_row(&row.record, row.position, row.status));
        out.push('\n');
    }
    out
}

pub fn render_ids<I: IntoIterator<Item = u64>>(ids: I) -> String {
    ids.into_iter().sorted().join(",")
}

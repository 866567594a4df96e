//! Terminal rendering for listings, diffs and copy/reset reports.
//!
//! Strictly presentation: everything here takes the engines' report types
//! and prints colorized tables. No pack-sized table crate is pulled in; the
//! writer below handles the multi-line, ANSI-colored cells these tables
//! need.

use colored::Colorize;

use gtm_sync_core::copy::{CopiedEntity, CopyOutcome, CopyReport};
use gtm_sync_core::diff::{AccountDiff, ChangeKind, EntityDiff, SegmentKind};
use gtm_sync_core::model::{Entity, Tag};
use gtm_sync_core::reset::{DeleteReport, DeletedEntity};
use gtm_sync_core::store::EntityStore;

pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|h| cell_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell_width(cell));
                }
            }
        }
        widths
    }

    fn write_rule(&self, out: &mut String, widths: &[usize]) {
        for width in widths {
            out.push('+');
            out.push_str(&"-".repeat(width + 2));
        }
        out.push_str("+\n");
    }

    fn write_row(&self, out: &mut String, widths: &[usize], cells: &[String], color_header: bool) {
        let lines: Vec<Vec<&str>> = cells.iter().map(|c| c.lines().collect()).collect();
        let height = lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
        for line_no in 0..height {
            for (i, width) in widths.iter().enumerate() {
                let text = lines
                    .get(i)
                    .and_then(|cell| cell.get(line_no))
                    .copied()
                    .unwrap_or("");
                let shown = if color_header {
                    text.blue().to_string()
                } else {
                    text.to_string()
                };
                let pad = width.saturating_sub(display_width(text));
                out.push_str("| ");
                out.push_str(&shown);
                out.push_str(&" ".repeat(pad + 1));
            }
            out.push_str("|\n");
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.column_widths();
        let mut out = String::new();
        self.write_rule(&mut out, &widths);
        self.write_row(&mut out, &widths, &self.header, true);
        self.write_rule(&mut out, &widths);
        for row in &self.rows {
            self.write_row(&mut out, &widths, row, false);
        }
        self.write_rule(&mut out, &widths);
        write!(f, "{out}")
    }
}

/// Width of the widest line, ignoring ANSI escape sequences.
fn cell_width(cell: &str) -> usize {
    cell.lines().map(display_width).max().unwrap_or(0)
}

fn display_width(line: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in line.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}

fn yaml<T: serde::Serialize>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

fn firing_triggers_with_ids(tag: &Tag, account: &EntityStore) -> String {
    tag.firing_trigger_id
        .iter()
        .map(|trigger_id| match account.triggers.get(trigger_id) {
            Some(trigger) => format!("{} ({trigger_id})", trigger.name),
            None => format!("? ({trigger_id})"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prints the three entity listings for one account.
pub fn list_account(store: &EntityStore) {
    let mut variables = Table::new(&["Name", "Variable ID", "Type", "Parameters"]);
    for variable in store.variables.values() {
        variables.push(vec![
            variable.name.clone(),
            variable.id().unwrap_or_default().to_string(),
            variable.type_.clone(),
            yaml(&variable.parameter),
        ]);
    }
    println!(
        "{} ({} variables)",
        "==> Variables".blue(),
        store.variables.len()
    );
    println!("{variables}\n");

    let mut triggers = Table::new(&["Name", "Trigger ID", "Type", "Custom Event Filter"]);
    for trigger in store.triggers.values() {
        triggers.push(vec![
            trigger.name.clone(),
            trigger.id().unwrap_or_default().to_string(),
            trigger.type_.clone(),
            yaml(&trigger.custom_event_filter),
        ]);
    }
    println!(
        "{} ({} triggers)",
        "==> Triggers".blue(),
        store.triggers.len()
    );
    println!("{triggers}\n");

    let mut tags = Table::new(&[
        "Name",
        "Tag ID",
        "Type",
        "Firing Triggers (Trigger ID)",
        "Parameters",
    ]);
    for tag in store.tags.values() {
        tags.push(vec![
            tag.name.clone(),
            tag.id().unwrap_or_default().to_string(),
            tag.type_.clone(),
            firing_triggers_with_ids(tag, store),
            yaml(&tag.parameter),
        ]);
    }
    println!("{} ({} tags)", "==> Tags".blue(), store.tags.len());
    println!("{tags}\n");
}

fn change_marker(change: ChangeKind) -> colored::ColoredString {
    match change {
        ChangeKind::Added => "+".green(),
        ChangeKind::Removed => "-".red(),
        ChangeKind::Modified => "+/-".yellow(),
        ChangeKind::Unchanged => "".normal(),
    }
}

fn colorize_name(name: &str, change: ChangeKind) -> String {
    match change {
        ChangeKind::Added => name.green().to_string(),
        ChangeKind::Removed => name.red().to_string(),
        ChangeKind::Modified => name.yellow().to_string(),
        ChangeKind::Unchanged => name.dimmed().to_string(),
    }
}

fn annotation(change: ChangeKind) -> &'static str {
    match change {
        ChangeKind::Added => "(only in target)",
        ChangeKind::Removed => "(only in source)",
        ChangeKind::Modified => "(will be modified)",
        ChangeKind::Unchanged => "",
    }
}

fn entity_diff(diff: &EntityDiff, source_alias: &str, target_alias: &str, show_unchanged: bool) {
    let hidden = if show_unchanged { "" } else { " (hidden)" };
    println!(
        "{} [ {}{}{}{} ]",
        format!("==> {}s", diff.kind).blue(),
        format!("{} additions, ", diff.added).green(),
        format!("{} deletions, ", diff.removed).red(),
        format!("{} modifications, ", diff.modified).yellow(),
        format!("{} unchanged{hidden}", diff.unchanged).dimmed(),
    );

    if diff.rows.is_empty() {
        if !diff.has_changes() {
            println!(
                "{}",
                format!(
                    "No changes in {}s between the source and target accounts.",
                    diff.kind.to_string().to_lowercase()
                )
                .dimmed()
            );
        }
        println!();
        return;
    }

    let field_names: Vec<&str> = diff.rows[0].fields.iter().map(|f| f.field).collect();
    let mut header: Vec<String> = vec![
        "?".into(),
        "Name".into(),
        format!("Source Account\n({source_alias})\n\nID"),
        format!("Target Account\n({target_alias})\n\nID"),
    ];
    header.extend(field_names.iter().map(|n| n.to_string()));
    let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();
    let mut table = Table::new(&header_refs);

    for row in &diff.rows {
        let mut cells = vec![
            change_marker(row.change).to_string(),
            colorize_name(&row.name, row.change),
            // Source side is never mutated, keep it plain.
            row.source_id.clone().unwrap_or_default(),
            format!(
                "{}\n{}",
                row.target_id.clone().unwrap_or_default(),
                annotation(row.change)
            ),
        ];
        for field in &row.fields {
            let mut text = String::new();
            for segment in &field.segments {
                let colored_segment = match segment.kind {
                    SegmentKind::Added => segment.text.green().to_string(),
                    SegmentKind::Removed => segment.text.red().to_string(),
                    SegmentKind::Unchanged => segment.text.dimmed().to_string(),
                };
                text.push_str(&colored_segment);
            }
            cells.push(text);
        }
        table.push(cells);
    }
    println!("{table}\n");
}

/// Prints the per-kind diff tables and count lines.
pub fn account_diff(
    diff: &AccountDiff,
    source_alias: &str,
    target_alias: &str,
    show_unchanged: bool,
) {
    entity_diff(&diff.variables, source_alias, target_alias, show_unchanged);
    entity_diff(&diff.triggers, source_alias, target_alias, show_unchanged);
    entity_diff(&diff.tags, source_alias, target_alias, show_unchanged);
}

fn copy_rows(table: &mut Table, entities: &[CopiedEntity]) {
    for entity in entities {
        let (status, reason) = match &entity.outcome {
            CopyOutcome::Created { target_id } => (
                format!("{} (new ID {target_id})", "Copy Successful".green()),
                String::new(),
            ),
            CopyOutcome::Failed { error } => {
                ("Copy Failed".red().to_string(), error.to_string())
            }
        };
        table.push(vec![
            entity.source_id.clone(),
            entity.name.clone(),
            status,
            reason,
        ]);
    }
}

/// Prints the per-kind copy report tables.
pub fn copy_report(report: &CopyReport) {
    for (label, entities) in [
        ("Variables", &report.variables),
        ("Triggers", &report.triggers),
        ("Tags", &report.tags),
    ] {
        let mut table = Table::new(&["Source ID", "Name", "Copy Status", "Reason"]);
        copy_rows(&mut table, entities);
        println!(
            "{} ({} {})",
            format!("==> {label}").blue(),
            entities.len(),
            label.to_lowercase()
        );
        println!("{table}\n");
    }
}

fn delete_rows(table: &mut Table, entities: &[DeletedEntity]) {
    for entity in entities {
        let (status, reason) = match &entity.outcome {
            gtm_sync_core::reset::DeleteOutcome::Deleted => {
                ("Deleted".green().to_string(), String::new())
            }
            gtm_sync_core::reset::DeleteOutcome::Failed { error } => {
                ("Delete Failed".red().to_string(), error.to_string())
            }
        };
        table.push(vec![entity.id.clone(), entity.name.clone(), status, reason]);
    }
}

/// Prints the per-kind delete report tables, in deletion order.
pub fn delete_report(report: &DeleteReport) {
    for (label, entities) in [
        ("Tags", &report.tags),
        ("Triggers", &report.triggers),
        ("Variables", &report.variables),
    ] {
        let mut table = Table::new(&["ID", "Name", "Delete Status", "Reason"]);
        delete_rows(&mut table, entities);
        println!(
            "{} ({} {})",
            format!("==> {label}").blue(),
            entities.len(),
            label.to_lowercase()
        );
        println!("{table}\n");
    }
}

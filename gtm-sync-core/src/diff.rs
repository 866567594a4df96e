//! Structural comparison of two accounts.
//!
//! Entities are matched across accounts by `name`, since identifiers are
//! account-local and meaningless across accounts. Known limitation, kept on
//! purpose: when two entities in the same account share a name, the later
//! one in iteration order overwrites the earlier in the match table, so
//! only one survives comparison. Field-level comparison is a line-oriented
//! diff of each comparable field's YAML form; a tag's firing triggers are
//! resolved to trigger *names* through its own account's store before
//! comparing, since the raw identifiers always differ.
//!
//! The engine is read-only; it never talks to the remote service.

use std::collections::BTreeMap;

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::info;

use crate::model::{Entity, EntityKind, Tag, Trigger, Variable};
use crate::store::EntityStore;

/// Classification of one matched name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present in target, absent in source.
    Added,
    /// Present in source, absent in target.
    Removed,
    /// Present in both with at least one differing comparable field.
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Added,
    Removed,
    Unchanged,
}

/// A run of consecutive lines with the same diff tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

/// Line diff of one comparable field, target-vs-source.
#[derive(Debug, Clone)]
pub struct FieldDiff {
    pub field: &'static str,
    pub segments: Vec<DiffSegment>,
}

impl FieldDiff {
    /// True when the diff contains anything beyond the single unchanged
    /// segment.
    pub fn has_changes(&self) -> bool {
        self.segments.len() > 1
            || self
                .segments
                .first()
                .is_some_and(|segment| segment.kind != SegmentKind::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct DiffRow {
    pub name: String,
    pub source_id: Option<String>,
    pub target_id: Option<String>,
    pub change: ChangeKind,
    pub fields: Vec<FieldDiff>,
}

/// Diff result for one entity kind.
#[derive(Debug, Clone)]
pub struct EntityDiff {
    pub kind: EntityKind,
    /// Unchanged rows are enumerated only when the engine was asked to
    /// include them; they are always counted.
    pub rows: Vec<DiffRow>,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl EntityDiff {
    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.modified > 0
    }
}

/// Diff of all three kinds between two accounts.
#[derive(Debug, Clone)]
pub struct AccountDiff {
    pub variables: EntityDiff,
    pub triggers: EntityDiff,
    pub tags: EntityDiff,
}

impl AccountDiff {
    pub fn has_changes(&self) -> bool {
        self.variables.has_changes() || self.triggers.has_changes() || self.tags.has_changes()
    }
}

/// Named extractors producing the comparable text of one field, one per
/// side so a field can be resolved against its own account (firing trigger
/// names).
struct FieldSpec<'s, T> {
    name: &'static str,
    source_text: Box<dyn Fn(&T) -> String + 's>,
    target_text: Box<dyn Fn(&T) -> String + 's>,
}

impl<'s, T> FieldSpec<'s, T> {
    fn symmetric<F>(name: &'static str, extract: F) -> Self
    where
        F: Fn(&T) -> String + Clone + 's,
    {
        Self {
            name,
            source_text: Box::new(extract.clone()),
            target_text: Box::new(extract),
        }
    }

    fn per_side<F, G>(name: &'static str, source: F, target: G) -> Self
    where
        F: Fn(&T) -> String + 's,
        G: Fn(&T) -> String + 's,
    {
        Self {
            name,
            source_text: Box::new(source),
            target_text: Box::new(target),
        }
    }
}

pub struct DiffEngine {
    show_unchanged: bool,
}

impl DiffEngine {
    pub fn new(show_unchanged: bool) -> Self {
        Self { show_unchanged }
    }

    /// Compares all three entity kinds between two fetched stores.
    pub fn diff_accounts(&self, source: &EntityStore, target: &EntityStore) -> AccountDiff {
        info!(
            source = %source.workspace().parent(),
            target = %target.workspace().parent(),
            "Diffing accounts"
        );

        let variables = self.diff_entities(
            &source.variables,
            &target.variables,
            &[
                FieldSpec::symmetric("Type", type_text::<Variable>),
                FieldSpec::symmetric("Parameters", |variable: &Variable| {
                    yaml_or_empty(&variable.parameter)
                }),
            ],
        );

        let triggers = self.diff_entities(
            &source.triggers,
            &target.triggers,
            &[
                FieldSpec::symmetric("Type", type_text::<Trigger>),
                FieldSpec::symmetric("Custom Event Filter", |trigger: &Trigger| {
                    yaml_or_empty(&trigger.custom_event_filter)
                }),
            ],
        );

        let tags = self.diff_entities(
            &source.tags,
            &target.tags,
            &[
                FieldSpec::symmetric("Type", type_text::<Tag>),
                FieldSpec::per_side(
                    "Firing Triggers",
                    |tag: &Tag| firing_trigger_names(tag, source),
                    |tag: &Tag| firing_trigger_names(tag, target),
                ),
                FieldSpec::symmetric("Parameters", |tag: &Tag| yaml_or_empty(&tag.parameter)),
            ],
        );

        AccountDiff {
            variables,
            triggers,
            tags,
        }
    }

    fn diff_entities<T: Entity>(
        &self,
        source: &BTreeMap<String, T>,
        target: &BTreeMap<String, T>,
        fields: &[FieldSpec<'_, T>],
    ) -> EntityDiff {
        // Match by name. A later same-named entity replaces the earlier
        // one, on both sides.
        let mut by_name: BTreeMap<String, (Option<&T>, Option<&T>)> = BTreeMap::new();
        for entity in source.values() {
            by_name.insert(entity.name().to_string(), (Some(entity), None));
        }
        for entity in target.values() {
            let matched_source = by_name
                .get(entity.name())
                .and_then(|(source_entity, _)| *source_entity);
            by_name.insert(entity.name().to_string(), (matched_source, Some(entity)));
        }

        let mut diff = EntityDiff {
            kind: T::KIND,
            rows: Vec::new(),
            added: 0,
            removed: 0,
            modified: 0,
            unchanged: 0,
        };

        for (name, (source_entity, target_entity)) in by_name {
            let field_diffs: Vec<FieldDiff> = fields
                .iter()
                .map(|spec| FieldDiff {
                    field: spec.name,
                    segments: line_diff(
                        &target_entity.map_or_else(String::new, |e| (spec.target_text)(e)),
                        &source_entity.map_or_else(String::new, |e| (spec.source_text)(e)),
                    ),
                })
                .collect();

            let change = match (source_entity, target_entity) {
                (None, Some(_)) => ChangeKind::Added,
                (Some(_), None) => ChangeKind::Removed,
                _ if field_diffs.iter().any(FieldDiff::has_changes) => ChangeKind::Modified,
                _ => ChangeKind::Unchanged,
            };

            match change {
                ChangeKind::Added => diff.added += 1,
                ChangeKind::Removed => diff.removed += 1,
                ChangeKind::Modified => diff.modified += 1,
                ChangeKind::Unchanged => diff.unchanged += 1,
            }

            if change != ChangeKind::Unchanged || self.show_unchanged {
                diff.rows.push(DiffRow {
                    name,
                    source_id: source_entity.and_then(|e| e.id().map(str::to_string)),
                    target_id: target_entity.and_then(|e| e.id().map(str::to_string)),
                    change,
                    fields: field_diffs,
                });
            }
        }

        diff
    }
}

fn type_text<T: Entity>(entity: &T) -> String {
    if entity.type_().is_empty() {
        String::new()
    } else {
        format!("{}\n", entity.type_())
    }
}

fn yaml_or_empty<T: Serialize>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

/// Firing triggers compared by referenced trigger *name*, resolved against
/// the tag's own account; an unknown reference serialises as null.
fn firing_trigger_names(tag: &Tag, account: &EntityStore) -> String {
    if tag.firing_trigger_id.is_empty() {
        return String::new();
    }
    let names: Vec<Option<String>> = tag
        .firing_trigger_id
        .iter()
        .map(|trigger_id| {
            account
                .triggers
                .get(trigger_id)
                .map(|trigger| trigger.name.clone())
        })
        .collect();
    yaml_or_empty(&names)
}

/// Line diff of target-vs-source text, coalesced into runs of consecutive
/// lines with the same tag. Equal inputs yield the single unchanged
/// segment.
fn line_diff(old: &str, new: &str) -> Vec<DiffSegment> {
    if old == new {
        return vec![DiffSegment {
            kind: SegmentKind::Unchanged,
            text: old.to_string(),
        }];
    }

    let text_diff = TextDiff::from_lines(old, new);
    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in text_diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Delete => SegmentKind::Removed,
            ChangeTag::Insert => SegmentKind::Added,
            ChangeTag::Equal => SegmentKind::Unchanged,
        };
        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => segments.push(DiffSegment {
                kind,
                text: change.value().to_string(),
            }),
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_text_is_one_unchanged_segment() {
        let segments = line_diff("a\nb\n", "a\nb\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Unchanged);
    }

    #[test]
    fn empty_both_sides_is_unchanged() {
        let segments = line_diff("", "");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Unchanged);
        assert!(segments[0].text.is_empty());
    }

    #[test]
    fn changed_line_produces_removed_and_added_segments() {
        let segments = line_diff("shared\nold\n", "shared\nnew\n");
        assert!(segments.len() > 1);
        assert!(segments.iter().any(|s| s.kind == SegmentKind::Removed));
        assert!(segments.iter().any(|s| s.kind == SegmentKind::Added));
    }

    #[test]
    fn consecutive_same_tag_lines_coalesce() {
        let segments = line_diff("", "one\ntwo\nthree\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Added);
        assert_eq!(segments[0].text, "one\ntwo\nthree\n");
    }
}

use crate::annotation::{AnnotationTrack, AnnotationValues};
use crate::error::{Axis, ConfigErrorKind, HeatmapError, Result};
use log::debug;
use rustc_hash::FxHashMap;

/// Label of the single group used when rows are not split.
pub const UNSPLIT_LABEL: &str = "all";

/// How rows are split into sub-panels.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitBy {
    /// One label per matrix row.
    Labels(Vec<String>),
    /// Name of a left/right annotation track whose values are the labels.
    Track(String),
}

/// A named subset of rows, members in their original relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitGroup {
    pub label: String,
    pub members: Vec<usize>,
}

impl SplitGroup {
    pub fn whole(n_rows: usize) -> Self {
        SplitGroup {
            label: UNSPLIT_LABEL.to_string(),
            members: (0..n_rows).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Per-row labels for `split`, looking track references up in `tracks`.
pub fn resolve_labels(split: &SplitBy, tracks: &[AnnotationTrack]) -> Result<Vec<String>> {
    match split {
        SplitBy::Labels(labels) => Ok(labels.clone()),
        SplitBy::Track(name) => {
            let track = tracks
                .iter()
                .find(|t| &t.name == name && t.side.axis() == Axis::Row)
                .ok_or_else(|| {
                    HeatmapError::config(
                        ConfigErrorKind::UnknownSplitReference,
                        format!("split_rows_by references {:?}, which is not a left/right annotation track", name),
                    )
                })?;
            Ok(match &track.values {
                AnnotationValues::Categorical(values) => values.clone(),
                AnnotationValues::Continuous(values) => values.iter().map(|v| v.to_string()).collect(),
            })
        }
    }
}

/// Partition rows by label. Groups come in first-seen order, or `order` first
/// when given (unlisted labels follow in first-seen order).
pub fn split_rows(labels: &[String], n_rows: usize, order: Option<&[String]>) -> Result<Vec<SplitGroup>> {
    if labels.len() != n_rows {
        return Err(HeatmapError::mismatch("split labels", Axis::Row, n_rows, labels.len()));
    }

    let mut groups: Vec<SplitGroup> = Vec::new();
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    for (row, label) in labels.iter().enumerate() {
        let slot = *index.entry(label.as_str()).or_insert_with(|| {
            groups.push(SplitGroup {
                label: label.clone(),
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(row);
    }

    if let Some(order) = order {
        let rank: FxHashMap<&str, usize> = order
            .iter()
            .enumerate()
            .rev()
            .map(|(i, label)| (label.as_str(), i))
            .collect();
        // stable: unlisted labels keep first-seen order after the listed ones
        groups.sort_by_key(|g| rank.get(g.label.as_str()).copied().unwrap_or(usize::MAX));
    }

    debug!("Split {} rows into {} groups", n_rows, groups.len());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Side;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let labels = strings(&["B", "A", "B", "C", "A"]);
        let groups = split_rows(&labels, 5, None).unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(groups[0].members, vec![0, 2]);
        assert_eq!(groups[1].members, vec![1, 4]);
        assert_eq!(groups[2].members, vec![3]);
    }

    #[test]
    fn explicit_order_wins() {
        let labels = strings(&["B", "A", "B", "C", "A"]);
        let order = strings(&["C", "missing", "A"]);
        let groups = split_rows(&labels, 5, Some(&order)).unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn label_length_must_match_rows() {
        let err = split_rows(&strings(&["A", "B"]), 3, None).unwrap_err();
        assert!(matches!(
            err,
            HeatmapError::DimensionMismatch { axis: Axis::Row, expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn resolves_track_references() {
        let tracks = vec![
            AnnotationTrack::categorical("tissue", Side::Left, 0.05, strings(&["x", "y", "x"])),
            AnnotationTrack::continuous("dose", Side::Right, 0.05, vec![1.0, 2.5, 1.0]),
            AnnotationTrack::categorical("batch", Side::Top, 0.05, strings(&["p", "q"])),
        ];
        let labels = resolve_labels(&SplitBy::Track("tissue".into()), &tracks).unwrap();
        assert_eq!(labels, strings(&["x", "y", "x"]));
        let labels = resolve_labels(&SplitBy::Track("dose".into()), &tracks).unwrap();
        assert_eq!(labels, strings(&["1", "2.5", "1"]));

        for name in ["nope", "batch"] {
            let err = resolve_labels(&SplitBy::Track(name.into()), &tracks).unwrap_err();
            assert_eq!(err.config_kind(), Some(ConfigErrorKind::UnknownSplitReference));
        }
    }
}

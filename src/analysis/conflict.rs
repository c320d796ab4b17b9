//! analysis::conflict
//!
//! Conflict prediction between two independent change sets.
//!
//! # Model
//!
//! Both change sets are expressed against a shared base. "Ours" is the side
//! already in place (the target branch) and "theirs" is the side being
//! applied, carried back to the base with [`crate::analysis::diff::reanchor`]
//! when it was made on top of earlier commits. Hunks are compared by the lines they
//! occupy in the base version; a pure insertion is anchored on the line it
//! follows.
//!
//! # Tiers
//!
//! Per file whose content changed on both sides:
//! - overlapping hunk pair: `CERTAIN`, or `LIKELY` when both sides make the
//!   identical change
//! - hunk pair within the adjacency threshold: `LIKELY`
//! - otherwise one `POSSIBLE` entry for the whole file
//!
//! Only the highest tier found for a file is reported, one entry per
//! triggering hunk pair. File-level clashes (add/add, delete/modify,
//! add/modify, binary edits, divergent renames) are reported without line
//! ranges. A binary file is never merged line by line, so it conflicts
//! whenever either side's change is binary and the two sides end on
//! different blobs.

use crate::core::models::{ChangeKind, ConflictInfo, ConflictSeverity, FileChange, Hunk};
use crate::core::types::Oid;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Default largest gap, in lines, still reported as `LIKELY`.
pub const DEFAULT_ADJACENCY_THRESHOLD: usize = 3;

/// All changes one side made to a single path, folded together.
#[derive(Debug, Default)]
struct SideFile<'a> {
    kinds: Vec<ChangeKind>,
    renamed_from: Option<&'a str>,
    final_blob: Option<&'a Oid>,
    binary: bool,
    hunks: Vec<&'a Hunk>,
}

impl SideFile<'_> {
    /// Net effect of the folded changes.
    fn kind(&self) -> ChangeKind {
        match (self.kinds.first(), self.kinds.last()) {
            (_, Some(ChangeKind::Deleted)) => ChangeKind::Deleted,
            (Some(ChangeKind::Added), _) => ChangeKind::Added,
            _ if self.renamed_from.is_some() => ChangeKind::Renamed,
            _ => ChangeKind::Modified,
        }
    }
}

fn fold(changes: &[FileChange]) -> BTreeMap<&str, SideFile<'_>> {
    let mut files: BTreeMap<&str, SideFile<'_>> = BTreeMap::new();
    for change in changes {
        let file = files.entry(change.path.as_str()).or_default();
        file.kinds.push(change.kind);
        if change.kind == ChangeKind::Renamed {
            file.renamed_from = change.old_path.as_deref();
        }
        file.final_blob = change.new_blob.as_ref();
        file.binary |= change.is_binary;
        file.hunks.extend(change.hunks.iter());
    }
    files
}

/// Predicts conflicts between two change sets.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    adjacency_threshold: usize,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ADJACENCY_THRESHOLD)
    }
}

impl ConflictDetector {
    pub fn new(adjacency_threshold: usize) -> Self {
        Self {
            adjacency_threshold,
        }
    }

    /// Predict conflicts, sorted by descending severity then path.
    ///
    /// Never fails: malformed or partial input yields fewer predictions.
    ///
    /// # Example
    ///
    /// ```
    /// use git_sim::analysis::conflict::ConflictDetector;
    /// use git_sim::analysis::diff::analyze;
    /// use git_sim::core::models::{ChangeKind, ConflictSeverity, FileChange};
    ///
    /// let base = "a\nb\nc\n";
    /// let change = |new: &str| FileChange {
    ///     path: "f.txt".into(),
    ///     old_path: None,
    ///     kind: ChangeKind::Modified,
    ///     old_blob: None,
    ///     new_blob: None,
    ///     is_binary: false,
    ///     hunks: analyze(base, new),
    /// };
    ///
    /// let conflicts = ConflictDetector::default()
    ///     .detect(&[change("a\nB\nc\n")], &[change("a\nbee\nc\n")]);
    /// assert_eq!(conflicts.len(), 1);
    /// assert_eq!(conflicts[0].severity, ConflictSeverity::Certain);
    /// ```
    pub fn detect(&self, ours: &[FileChange], theirs: &[FileChange]) -> Vec<ConflictInfo> {
        let our_files = fold(ours);
        let their_files = fold(theirs);
        let mut conflicts = Vec::new();

        for (path, our) in &our_files {
            if let Some(their) = their_files.get(path) {
                conflicts.extend(self.compare_file(path, our, their));
            }
        }
        conflicts.extend(rename_conflicts(&our_files, &their_files));

        conflicts.sort_by_key(|c| (Reverse(c.severity), c.path.clone()));
        tracing::debug!(
            ours = ours.len(),
            theirs = theirs.len(),
            conflicts = conflicts.len(),
            "conflict detection"
        );
        conflicts
    }

    fn compare_file(
        &self,
        path: &str,
        our: &SideFile<'_>,
        their: &SideFile<'_>,
    ) -> Vec<ConflictInfo> {
        use ChangeKind::*;

        let file_level = |description: String| {
            vec![ConflictInfo {
                severity: ConflictSeverity::Certain,
                path: path.to_string(),
                description,
                our_lines: None,
                their_lines: None,
            }]
        };

        match (our.kind(), their.kind()) {
            (Deleted, Deleted) => return Vec::new(),
            (Added, Added) if our.final_blob.is_some() && our.final_blob == their.final_blob => {
                return Vec::new()
            }
            (Added, Added) => {
                return file_level(format!("Both sides add '{path}' with different content"))
            }
            (Deleted, _) => {
                return file_level(format!(
                    "'{path}' is deleted on our side but modified on theirs"
                ))
            }
            (_, Deleted) => {
                return file_level(format!(
                    "'{path}' is modified on our side but deleted on theirs"
                ))
            }
            (Added, _) | (_, Added) => {
                return file_level(format!(
                    "'{path}' is added on one side and modified on the other"
                ))
            }
            _ => {}
        }

        if our.binary || their.binary {
            if our.final_blob.is_some() && our.final_blob == their.final_blob {
                return Vec::new();
            }
            let description = if our.binary && their.binary {
                format!("Binary file '{path}' is modified on both sides")
            } else {
                format!("'{path}' becomes binary on one side and is edited on the other")
            };
            return file_level(description);
        }

        self.compare_hunks(path, &our.hunks, &their.hunks)
    }

    /// Tier hunk pairs of one file touched by both sides.
    pub(crate) fn compare_hunks(
        &self,
        path: &str,
        ours: &[&Hunk],
        theirs: &[&Hunk],
    ) -> Vec<ConflictInfo> {
        // A side with no hunks (a pure rename or mode change) touches no lines.
        if ours.is_empty() || theirs.is_empty() {
            return Vec::new();
        }

        let mut certain = Vec::new();
        let mut likely = Vec::new();

        for our in ours {
            let our_span = our.base_span();
            for their in theirs {
                let their_span = their.base_span();
                let entry = |severity, description| ConflictInfo {
                    severity,
                    path: path.to_string(),
                    description,
                    our_lines: Some(our_span),
                    their_lines: Some(their_span),
                };

                if our_span.overlaps(&their_span)
                    && our.removed == their.removed
                    && our.added == their.added
                {
                    likely.push(entry(
                        ConflictSeverity::Likely,
                        format!("Both sides make the same change to {our_span} of '{path}'"),
                    ));
                } else if our_span.overlaps(&their_span) {
                    certain.push(entry(
                        ConflictSeverity::Certain,
                        format!(
                            "{} of '{path}' changed on both sides (theirs: {})",
                            capitalize(&our_span.to_string()),
                            their_span
                        ),
                    ));
                } else {
                    let gap = our_span.gap(&their_span);
                    if gap <= self.adjacency_threshold {
                        likely.push(entry(
                            ConflictSeverity::Likely,
                            format!(
                                "Changes to '{path}' are {gap} line(s) apart ({our_span} vs {their_span})"
                            ),
                        ));
                    }
                }
            }
        }

        if !certain.is_empty() {
            certain
        } else if !likely.is_empty() {
            likely
        } else {
            vec![ConflictInfo {
                severity: ConflictSeverity::Possible,
                path: path.to_string(),
                description: format!("'{path}' is modified on both sides in separate regions"),
                our_lines: None,
                their_lines: None,
            }]
        }
    }
}

fn rename_conflicts(
    ours: &BTreeMap<&str, SideFile<'_>>,
    theirs: &BTreeMap<&str, SideFile<'_>>,
) -> Vec<ConflictInfo> {
    fn renames(side: &BTreeMap<&str, SideFile<'_>>) -> BTreeMap<String, String> {
        side.iter()
            .filter_map(|(path, file)| {
                file.renamed_from
                    .map(|from| (from.to_string(), path.to_string()))
            })
            .collect()
    }
    fn modified(side: &BTreeMap<&str, SideFile<'_>>, path: &str) -> bool {
        side.get(path)
            .is_some_and(|file| file.kind() == ChangeKind::Modified)
    }

    let our_renames = renames(ours);
    let their_renames = renames(theirs);
    let mut conflicts = Vec::new();

    for (from, our_to) in &our_renames {
        match their_renames.get(from) {
            Some(their_to) if their_to != our_to => conflicts.push(ConflictInfo {
                severity: ConflictSeverity::Certain,
                path: from.clone(),
                description: format!(
                    "'{from}' is renamed to '{our_to}' on our side but to '{their_to}' on theirs"
                ),
                our_lines: None,
                their_lines: None,
            }),
            Some(_) => {}
            None if modified(theirs, from) => conflicts.push(ConflictInfo {
                severity: ConflictSeverity::Likely,
                path: from.clone(),
                description: format!(
                    "'{from}' is renamed to '{our_to}' on our side but modified in place on theirs"
                ),
                our_lines: None,
                their_lines: None,
            }),
            None => {}
        }
    }

    for (from, their_to) in &their_renames {
        if !our_renames.contains_key(from) && modified(ours, from) {
            conflicts.push(ConflictInfo {
                severity: ConflictSeverity::Likely,
                path: from.clone(),
                description: format!(
                    "'{from}' is modified in place on our side but renamed to '{their_to}' on theirs"
                ),
                our_lines: None,
                their_lines: None,
            });
        }
    }

    conflicts
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! analysis::diff
//!
//! Line-level diff analysis.
//!
//! [`analyze`] turns two text blobs into the minimal, sorted list of
//! [`Hunk`]s using an LCS line diff. Each hunk carries the exact text it
//! removes and adds, so [`apply`] and [`revert`] can replay it in either
//! direction and reconstruct the other blob byte for byte.

use crate::core::models::{ChangeKind, FileChange, Hunk, LineRange};
use crate::git::TreeDelta;
use sha2::{Digest, Sha256};
use similar::{Algorithm, DiffOp, TextDiff};

/// Compute the hunks turning `old` into `new`.
///
/// Hunks are non-overlapping and sorted by starting line. Adjacent
/// deletions and insertions are merged into a single replacement hunk.
///
/// # Example
///
/// ```
/// use git_sim::analysis::diff::analyze;
/// use git_sim::core::models::LineRange;
///
/// let hunks = analyze("a\nb\nc\n", "a\nB\nc\n");
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].old, Some(LineRange::new(2, 2)));
/// assert_eq!(hunks[0].new, Some(LineRange::new(2, 2)));
/// ```
pub fn analyze(old: &str, new: &str) -> Vec<Hunk> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Lcs)
        .diff_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();

    let mut hunks = Vec::new();
    // (old_index, old_len, new_index, new_len) of the edit being grown
    let mut pending: Option<(usize, usize, usize, usize)> = None;

    for op in diff.ops() {
        let (old_index, old_len, new_index, new_len) = match *op {
            DiffOp::Equal { .. } => {
                if let Some(region) = pending.take() {
                    hunks.push(hunk_from(region, old_lines, new_lines));
                }
                continue;
            }
            DiffOp::Delete {
                old_index,
                old_len,
                new_index,
            } => (old_index, old_len, new_index, 0),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => (old_index, 0, new_index, new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => (old_index, old_len, new_index, new_len),
        };

        pending = Some(match pending {
            Some((o, ol, n, nl)) => (o, ol + old_len, n, nl + new_len),
            None => (old_index, old_len, new_index, new_len),
        });
    }
    if let Some(region) = pending {
        hunks.push(hunk_from(region, old_lines, new_lines));
    }

    hunks
}

fn hunk_from(
    (old_index, old_len, new_index, new_len): (usize, usize, usize, usize),
    old_lines: &[&str],
    new_lines: &[&str],
) -> Hunk {
    let range =
        |index: usize, len: usize| (len > 0).then(|| LineRange::new(index + 1, index + len));
    Hunk {
        old: range(old_index, old_len),
        new: range(new_index, new_len),
        old_index,
        new_index,
        removed: old_lines[old_index..old_index + old_len]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        added: new_lines[new_index..new_index + new_len]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

/// Reconstruct the new blob from the old one.
pub fn apply(old: &str, hunks: &[Hunk]) -> String {
    splice(old, hunks, |h| (h.old_index, h.removed.len(), &h.added))
}

/// Reconstruct the old blob from the new one.
pub fn revert(new: &str, hunks: &[Hunk]) -> String {
    splice(new, hunks, |h| (h.new_index, h.added.len(), &h.removed))
}

fn splice<'h>(
    base: &str,
    hunks: &'h [Hunk],
    side: impl Fn(&'h Hunk) -> (usize, usize, &'h Vec<String>),
) -> String {
    let lines: Vec<&str> = base.split_inclusive('\n').collect();
    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;

    for hunk in hunks {
        let (start, skip, replacement) = side(hunk);
        let start = start.min(lines.len());
        for line in &lines[cursor.min(start)..start] {
            out.push_str(line);
        }
        for line in replacement {
            out.push_str(line);
        }
        cursor = (start + skip).min(lines.len());
    }
    for line in &lines[cursor..] {
        out.push_str(line);
    }

    out
}

/// Build structured file changes from raw tree deltas.
///
/// Binary deltas get no hunks. Non-UTF-8 text is decoded lossily.
pub fn file_changes(deltas: Vec<TreeDelta>) -> Vec<FileChange> {
    let mut changes: Vec<FileChange> = deltas
        .into_iter()
        .map(|delta| {
            let hunks = if delta.is_binary {
                Vec::new()
            } else {
                let old = delta.old_content.as_deref().map(String::from_utf8_lossy);
                let new = delta.new_content.as_deref().map(String::from_utf8_lossy);
                analyze(old.as_deref().unwrap_or(""), new.as_deref().unwrap_or(""))
            };
            FileChange {
                path: delta.path,
                old_path: delta.old_path,
                kind: delta.kind,
                old_blob: delta.old_blob,
                new_blob: delta.new_blob,
                is_binary: delta.is_binary,
                hunks,
            }
        })
        .collect();
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

/// Stable identifier for the content of a change set.
///
/// Line numbers are left out, so the same edit applied at a different
/// offset (as after a rebase) hashes identically.
pub fn patch_id(changes: &[FileChange]) -> String {
    let mut sorted: Vec<&FileChange> = changes.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut hasher = Sha256::new();
    for change in sorted {
        hasher.update(change.base_path().as_bytes());
        hasher.update(b"\0");
        hasher.update(change.path.as_bytes());
        hasher.update(b"\0");
        if change.is_binary {
            for blob in [&change.old_blob, &change.new_blob] {
                hasher.update(blob.as_ref().map(|b| b.as_str()).unwrap_or("-").as_bytes());
            }
        }
        for hunk in &change.hunks {
            for line in &hunk.removed {
                hasher.update(b"-");
                hasher.update(line.trim_end().as_bytes());
                hasher.update(b"\n");
            }
            for line in &hunk.added {
                hasher.update(b"+");
                hasher.update(line.trim_end().as_bytes());
                hasher.update(b"\n");
            }
        }
    }
    hex::encode(hasher.finalize())
}

/// Re-express `changes`, made on top of `prior`, against the version
/// `prior` started from.
///
/// Hunk text is kept and only base positions move. A line that `prior`
/// introduced maps onto the span `prior` replaced, so an edit to it still
/// meets whatever the other side did there. Paths fall back to their
/// pre-rename names.
pub fn reanchor(changes: &[FileChange], prior: &[FileChange]) -> Vec<FileChange> {
    changes
        .iter()
        .map(|change| {
            let Some(earlier) = prior.iter().find(|p| p.path == change.base_path()) else {
                return change.clone();
            };
            let mut moved = change.clone();
            moved.hunks = change
                .hunks
                .iter()
                .map(|hunk| reanchor_hunk(hunk, &earlier.hunks))
                .collect();
            if change.kind == ChangeKind::Renamed {
                moved.old_path = Some(earlier.base_path().to_string());
            } else {
                moved.path = earlier.base_path().to_string();
            }
            moved
        })
        .collect()
}

enum Origin<'h> {
    Line(usize),
    Introduced(&'h Hunk),
}

/// Where 0-based `line` of the newer version came from.
fn origin(prior: &[Hunk], line: usize) -> Origin<'_> {
    let mut shift = 0isize;
    for hunk in prior {
        if line < hunk.new_index {
            break;
        }
        if line < hunk.new_index + hunk.added.len() {
            return Origin::Introduced(hunk);
        }
        shift += hunk.added.len() as isize - hunk.removed.len() as isize;
    }
    Origin::Line(line.saturating_add_signed(-shift))
}

fn reanchor_hunk(hunk: &Hunk, prior: &[Hunk]) -> Hunk {
    let (start, end) = if hunk.removed.is_empty() {
        // Insertions are positioned by the line they follow.
        match hunk.old_index.checked_sub(1).map(|line| origin(prior, line)) {
            None => (0, 0),
            Some(Origin::Line(line)) => (line + 1, line + 1),
            Some(Origin::Introduced(h)) => (h.old_index, h.old_index + h.removed.len()),
        }
    } else {
        let first = match origin(prior, hunk.old_index) {
            Origin::Line(line) => line,
            Origin::Introduced(h) => h.old_index,
        };
        let last = match origin(prior, hunk.old_index + hunk.removed.len() - 1) {
            Origin::Line(line) => line + 1,
            Origin::Introduced(h) => h.old_index + h.removed.len(),
        };
        (first, last.max(first))
    };
    Hunk {
        old: (end > start).then(|| LineRange::new(start + 1, end)),
        old_index: start,
        ..hunk.clone()
    }
}

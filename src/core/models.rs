//! core::models
//!
//! Plain data exchanged across the engine boundary.
//!
//! Everything here is a value: read fresh from the object store
//! ([`CommitInfo`], [`FileChange`], [`Hunk`]) or built once per simulation
//! call ([`ConflictInfo`], [`SafetyInfo`], [`SimulationResult`]). Nothing
//! holds a handle back into the repository, so results can be serialized,
//! handed to renderers, or discarded freely.

use super::graph::CommitGraph;
use super::types::Oid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Commits
// =============================================================================

/// Author or committer identity attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: DateTime<Utc>,
}

/// A commit as read from the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full hash.
    pub oid: Oid,
    /// Parent hashes in order (first parent first).
    pub parents: Vec<Oid>,
    /// Root tree of the commit.
    pub tree: Oid,
    pub author: Signature,
    pub committer: Signature,
    /// Full commit message.
    pub message: String,
}

impl CommitInfo {
    /// Abbreviated hash used in warnings and step descriptions.
    pub fn short(&self) -> &str {
        self.oid.short(Oid::MIN_ABBREV_LEN)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    pub fn first_parent(&self) -> Option<&Oid> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

// =============================================================================
// Diffs
// =============================================================================

/// How a file changed between two tree states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// Inclusive, 1-indexed line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Build a range, swapping the bounds if given in reverse.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// True when the two ranges share at least one line.
    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of lines strictly between the two ranges; zero when they
    /// overlap or touch.
    pub fn gap(&self, other: &LineRange) -> usize {
        if self.overlaps(other) {
            0
        } else if self.end < other.start {
            other.start - self.end - 1
        } else {
            self.start - other.end - 1
        }
    }
}

impl From<(usize, usize)> for LineRange {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}

/// One contiguous edit turning an old blob into a new one.
///
/// `old` is absent for a pure insertion and `new` is absent for a pure
/// deletion. The index fields are the 0-based count of lines preceding the
/// hunk on each side, which positions insertions and deletions that have no
/// range of their own. `removed` and `added` carry the exact line text
/// (terminators included) so a hunk can be applied in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old: Option<LineRange>,
    pub new: Option<LineRange>,
    pub old_index: usize,
    pub new_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,
}

impl Hunk {
    /// Lines this hunk occupies in the base version.
    ///
    /// A pure insertion occupies no base lines; it is anchored on the line it
    /// follows (or line 1 when inserting at the top) so it can still be
    /// compared against edits from the other side.
    pub fn base_span(&self) -> LineRange {
        match self.old {
            Some(range) => range,
            None => {
                let anchor = self.old_index.max(1);
                LineRange::new(anchor, anchor)
            }
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.old.is_none()
    }

    pub fn is_deletion(&self) -> bool {
        self.new.is_none()
    }
}

/// A file touched between two tree states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path after the change (the old path for deletions).
    pub path: String,
    /// Source path for renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    #[serde(default)]
    pub old_blob: Option<Oid>,
    #[serde(default)]
    pub new_blob: Option<Oid>,
    /// Either side is binary; `hunks` is empty in that case.
    #[serde(default)]
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FileChange {
    /// Path this change is keyed on in the shared base version.
    pub fn base_path(&self) -> &str {
        self.old_path.as_deref().unwrap_or(&self.path)
    }
}

// =============================================================================
// Conflicts and safety
// =============================================================================

/// Confidence that a conflict will occur. Ordered `Possible < Likely < Certain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Possible,
    Likely,
    Certain,
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Possible => "POSSIBLE",
            Self::Likely => "LIKELY",
            Self::Certain => "CERTAIN",
        };
        f.write_str(s)
    }
}

/// A predicted conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub severity: ConflictSeverity,
    pub path: String,
    pub description: String,
    #[serde(default)]
    pub our_lines: Option<LineRange>,
    #[serde(default)]
    pub their_lines: Option<LineRange>,
}

/// Risk classification of an operation. Ordered `Low < ... < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DangerLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyInfo {
    pub danger: DangerLevel,
    pub reversible: bool,
    pub force_push: bool,
    pub recovery_steps: Vec<String>,
    /// Why this rating was chosen, most significant first.
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Default for SafetyInfo {
    fn default() -> Self {
        Self {
            danger: DangerLevel::Low,
            reversible: true,
            force_push: false,
            recovery_steps: Vec::new(),
            reasons: Vec::new(),
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Reset flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
}

impl FromStr for ResetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("--").to_ascii_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "mixed" => Ok(Self::Mixed),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown reset mode '{other}'")),
        }
    }
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Soft => "soft",
            Self::Mixed => "mixed",
            Self::Hard => "hard",
        };
        f.write_str(s)
    }
}

/// Which operation produced a result.
///
/// The four built-in kinds plus `Extension`, whose payload is the operation
/// name an external simulator claimed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Rebase,
    Merge,
    Reset(ResetMode),
    CherryPick,
    Extension(String),
}

impl OperationType {
    /// Operation name as routed by the dispatcher.
    pub fn name(&self) -> &str {
        match self {
            Self::Rebase => "rebase",
            Self::Merge => "merge",
            Self::Reset(_) => "reset",
            Self::CherryPick => "cherry-pick",
            Self::Extension(name) => name,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset(mode) => write!(f, "reset --{mode}"),
            other => f.write_str(other.name()),
        }
    }
}

/// What a single replay step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Commit replayed onto the running tip.
    Pick,
    /// Commit skipped because an equivalent patch is already upstream.
    Skip,
    /// Merge commit created from two parents.
    Merge,
}

/// One step of a simulated replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStep {
    /// 1-based position in the replay.
    pub index: usize,
    pub action: StepAction,
    pub original: Oid,
    /// Projected hash; absent for skipped steps.
    pub synthesized: Option<Oid>,
    pub description: String,
    pub conflicts: Vec<ConflictInfo>,
}

/// The complete outcome of one simulation.
///
/// Every field is populated even when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub operation: OperationType,
    pub success: bool,
    pub before: CommitGraph,
    pub after: CommitGraph,
    pub conflicts: Vec<ConflictInfo>,
    pub warnings: Vec<String>,
    pub safety: SafetyInfo,
    /// Paths the operation would change, sorted and unique.
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub steps: Vec<OperationStep>,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub target_ref: Option<String>,
    #[serde(default)]
    pub merge_base: Option<Oid>,
    /// Where the affected branch tip would point afterwards.
    #[serde(default)]
    pub new_head: Option<Oid>,
    /// Commits unreachable from every branch afterwards.
    #[serde(default)]
    pub orphaned_commits: Vec<Oid>,
    /// Commits whose replayed copies replace them.
    #[serde(default)]
    pub rewritten_commits: Vec<Oid>,
    #[serde(default)]
    pub fast_forward: bool,
    /// Replay halted early on a certain conflict.
    #[serde(default)]
    pub partial: bool,
}

impl SimulationResult {
    /// An empty result for `operation`, to be filled in by a simulator.
    pub fn new(operation: OperationType, before: CommitGraph) -> Self {
        Self {
            operation,
            success: true,
            after: before.clone(),
            before,
            conflicts: Vec::new(),
            warnings: Vec::new(),
            safety: SafetyInfo::default(),
            changed_files: Vec::new(),
            steps: Vec::new(),
            source_ref: None,
            target_ref: None,
            merge_base: None,
            new_head: None,
            orphaned_commits: Vec::new(),
            rewritten_commits: Vec::new(),
            fast_forward: false,
            partial: false,
        }
    }

    /// Highest predicted conflict severity, if any.
    pub fn max_severity(&self) -> Option<ConflictSeverity> {
        self.conflicts.iter().map(|c| c.severity).max()
    }

    pub fn has_certain_conflicts(&self) -> bool {
        self.max_severity() == Some(ConflictSeverity::Certain)
    }

    pub fn conflicts_at(&self, severity: ConflictSeverity) -> impl Iterator<Item = &ConflictInfo> {
        self.conflicts.iter().filter(move |c| c.severity == severity)
    }
}

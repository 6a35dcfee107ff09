use crate::storage::{SetInsert, Storage};
use crate::types::{Group, User};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

// ============================================================================
// Edge computation
// ============================================================================

/// All unordered pairs over a group's owner and members.
///
/// The owner anchors the group: if it is missing or blank the group produces
/// no edges, no matter how many members it has. Duplicate ids and an owner
/// that also appears in its own member list collapse to one participant, and
/// fewer than two distinct participants leave nothing to link.
pub fn clique_edges(group: &Group) -> Vec<(&str, &str)> {
    let Some(owner_id) = group.owner_id.as_deref() else {
        return Vec::new();
    };
    if owner_id.is_empty() || group.member_ids.is_empty() {
        return Vec::new();
    }

    let mut involved: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for id in std::iter::once(owner_id).chain(group.member_ids.iter().map(String::as_str)) {
        if !id.is_empty() && seen.insert(id) {
            involved.push(id);
        }
    }
    if involved.len() < 2 {
        return Vec::new();
    }

    let mut edges = Vec::with_capacity(involved.len() * (involved.len() - 1) / 2);
    for i in 0..involved.len() {
        for j in (i + 1)..involved.len() {
            edges.push((involved[i], involved[j]));
        }
    }
    edges
}

// ============================================================================
// Backfill
// ============================================================================

/// One friend edge that could not be fully applied, with the reason kept for
/// the operator summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFailure {
    pub user_a: String,
    pub user_b: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    pub groups_processed: usize,
    pub groups_skipped: usize,
    pub edges_applied: usize,
    pub edges_unchanged: usize,
    pub failures: Vec<EdgeFailure>,
}

impl BackfillSummary {
    /// Fold another summary into this one, for runs that cover several
    /// collections.
    pub fn absorb(&mut self, other: BackfillSummary) {
        self.groups_processed += other.groups_processed;
        self.groups_skipped += other.groups_skipped;
        self.edges_applied += other.edges_applied;
        self.edges_unchanged += other.edges_unchanged;
        self.failures.extend(other.failures);
    }
}

/// Make everyone in each group a mutual friend of everyone else in it.
///
/// Edges are applied with set semantics in both directions, so re-running the
/// backfill never duplicates entries. A failing edge is recorded and the run
/// moves on; it never aborts the remaining edges or groups.
pub async fn backfill_friend_graph<S: Storage>(storage: &S, groups: &[Group]) -> BackfillSummary {
    let mut summary = BackfillSummary::default();

    for group in groups {
        let edges = clique_edges(group);
        if edges.is_empty() {
            info!(group = %group.label, "Skipping group with nothing to link");
            summary.groups_skipped += 1;
            continue;
        }

        info!(group = %group.label, edges = edges.len(), "Linking group members");
        summary.groups_processed += 1;
        for (a, b) in edges {
            match apply_edge(storage, a, b).await {
                EdgeOutcome::Applied => summary.edges_applied += 1,
                EdgeOutcome::Unchanged => summary.edges_unchanged += 1,
                EdgeOutcome::Failed(reason) => {
                    warn!(user_a = a, user_b = b, reason = %reason, "Failed to link friends");
                    summary.failures.push(EdgeFailure {
                        user_a: a.to_string(),
                        user_b: b.to_string(),
                        reason,
                    });
                }
            }
        }
    }
    summary
}

enum EdgeOutcome {
    Applied,
    Unchanged,
    Failed(String),
}

/// Apply one edge in both directions. The reverse write is attempted even
/// when the first direction fails.
async fn apply_edge<S: Storage>(storage: &S, a: &str, b: &str) -> EdgeOutcome {
    let mut inserted = false;
    let mut problems = Vec::new();

    for (user, friend) in [(a, b), (b, a)] {
        match storage.add_friend(user, friend).await {
            Ok(SetInsert::Inserted) => inserted = true,
            Ok(SetInsert::AlreadyPresent) => {}
            Ok(SetInsert::NoMatch) => problems.push(format!("user {} not found", user)),
            Err(e) => problems.push(format!("{} -> {}: {:#}", user, friend, e)),
        }
    }

    if !problems.is_empty() {
        EdgeOutcome::Failed(problems.join("; "))
    } else if inserted {
        EdgeOutcome::Applied
    } else {
        EdgeOutcome::Unchanged
    }
}

// ============================================================================
// Symmetry verification
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymmetryReport {
    pub users_checked: usize,
    /// Pairs (a, b) where a lists b as a friend but b does not list a.
    pub missing_reciprocal: Vec<(String, String)>,
    /// Users that list themselves as a friend.
    pub self_references: Vec<String>,
    /// Pairs (a, b) where a lists a friend id b that matches no user.
    pub dangling_friends: Vec<(String, String)>,
}

impl SymmetryReport {
    pub fn is_clean(&self) -> bool {
        self.missing_reciprocal.is_empty()
            && self.self_references.is_empty()
            && self.dangling_friends.is_empty()
    }
}

/// Fetch all users and check the invariants the backfill is supposed to
/// establish: every edge is reciprocated, and no friend entry is a
/// self-reference or a dangling id.
pub async fn verify_friend_symmetry<S: Storage>(storage: &S) -> Result<SymmetryReport> {
    let users = storage.fetch_users().await?;
    Ok(check_symmetry(&users))
}

pub fn check_symmetry(users: &[User]) -> SymmetryReport {
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();
    let mut report = SymmetryReport {
        users_checked: users.len(),
        ..SymmetryReport::default()
    };

    for user in users {
        for friend_id in &user.friends {
            if friend_id == &user.id {
                report.self_references.push(user.id.clone());
                continue;
            }
            match by_id.get(friend_id.as_str()) {
                None => report
                    .dangling_friends
                    .push((user.id.clone(), friend_id.clone())),
                Some(friend) if !friend.friends.iter().any(|f| f == &user.id) => report
                    .missing_reciprocal
                    .push((user.id.clone(), friend_id.clone())),
                Some(_) => {}
            }
        }
    }
    report
}

// ============================================================================
// Tests
// ============================================================================

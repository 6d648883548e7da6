// src/vote.rs
//
// Majority-vote resolution over a track's label history.
//
// The tie-break is deterministic: among labels tied for the maximum
// count, the one whose first occurrence is earliest in the window wins.
// Relying on hash-map iteration order here would make the winner
// depend on the run, which is untestable.

use crate::types::Label;

/// Confidence tier of a resolved vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Majority label holds at least half the window (ceil(N/2)).
    Stable,
    /// A majority exists but its support is below the stability bar.
    Tentative,
    /// The winning vote is the Unknown sentinel.
    Unknown,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Tentative => "tentative",
            Self::Unknown => "unknown",
        }
    }
}

/// The fused label for one track. Derived from a history snapshot,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVote {
    pub label: Label,
    /// Occurrence count of the winning label within the window.
    pub support: usize,
    pub tier: Tier,
}

pub struct VoteResolver {
    /// Window size N the stability threshold is computed against.
    window: usize,
}

impl VoteResolver {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Support needed for a Stable tier: ceil(N/2).
    pub fn stability_threshold(&self) -> usize {
        self.window.div_ceil(2)
    }

    /// Pure function of the snapshot. Returns None for an empty history.
    pub fn resolve(&self, history: &[Label]) -> Option<ResolvedVote> {
        if history.is_empty() {
            return None;
        }

        // (count, first occurrence index) per distinct label, scanned in
        // window order so the earliest tied label wins.
        let mut best: Option<(&Label, usize, usize)> = None;
        for (idx, label) in history.iter().enumerate() {
            let count = history.iter().filter(|l| *l == label).count();
            match best {
                Some((_, best_count, best_idx)) => {
                    if count > best_count || (count == best_count && idx < best_idx) {
                        // idx < best_idx only happens for the first
                        // occurrence of a distinct label; later
                        // occurrences always have larger idx.
                        best = Some((label, count, idx));
                    }
                }
                None => best = Some((label, count, idx)),
            }
        }

        let (label, support, _) = best?;
        let tier = if label.is_unknown() {
            Tier::Unknown
        } else if support >= self.stability_threshold() {
            Tier::Stable
        } else {
            Tier::Tentative
        };

        Some(ResolvedVote {
            label: label.clone(),
            support,
            tier,
        })
    }
}

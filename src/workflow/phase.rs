//! Pipeline Phases
//!
//! The pipeline shape is fixed: six phases run in declaration order, each
//! persisting one artifact per run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Phase identifier for checkpoint tracking
///
/// Phases are numbered 1-6 to match the pipeline execution order:
/// - 1: Plan - Brief and section outline
/// - 2: Research - Per-section findings
/// - 3: Augment - Full page content for findings (optional)
/// - 4: Synthesize - Per-section prose
/// - 5: Finalize - Article assembly and metadata
/// - 6: Enhance - Final polish pass (optional)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan = 1,
    Research = 2,
    Augment = 3,
    Synthesize = 4,
    Finalize = 5,
    Enhance = 6,
}

impl Phase {
    /// Total number of phases
    pub const COUNT: usize = 6;

    pub const ALL: [Phase; Self::COUNT] = [
        Self::Plan,
        Self::Research,
        Self::Augment,
        Self::Synthesize,
        Self::Finalize,
        Self::Enhance,
    ];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Create from u8 phase number
    pub fn from_u8(phase: u8) -> Option<Self> {
        Self::ALL.get(usize::from(phase).checked_sub(1)?).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Plan => "Planning",
            Self::Research => "Research",
            Self::Augment => "Content Augmentation",
            Self::Synthesize => "Synthesis",
            Self::Finalize => "Finalization",
            Self::Enhance => "Enhancement",
        }
    }

    /// Stable storage key
    pub fn key(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Research => "research",
            Self::Augment => "augment",
            Self::Synthesize => "synthesize",
            Self::Finalize => "finalize",
            Self::Enhance => "enhance",
        }
    }

    /// Required phases halt the run on failure; optional ones degrade
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Augment | Self::Enhance)
    }

    /// Phases that run after this one
    pub fn downstream(&self) -> impl Iterator<Item = Phase> + use<> {
        let position = self.as_u8();
        Self::ALL.into_iter().filter(move |p| p.as_u8() > position)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown phase '{}' (expected one of: plan, research, augment, synthesize, finalize, enhance)",
                    s
                )
            })
    }
}

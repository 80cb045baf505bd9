//! Change detection between the previous and regenerated infra definition.

use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};

/// Hex SHA-256 of a definition's text.
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What changed between two renderings of the infra definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftOutcome {
    /// No previous definition existed; first deploy.
    NoPrior,
    /// The regenerated definition is byte-identical.
    Unchanged {
        /// Digest shared by both versions.
        digest: String,
    },
    /// The definitions differ.
    Changed {
        /// Unified diff, previous to regenerated.
        diff: String,
        /// Lines added.
        additions: usize,
        /// Lines removed.
        deletions: usize,
    },
}

impl DriftOutcome {
    /// Compares a previous definition, if any, with the regenerated one.
    pub fn compare(previous: Option<&str>, generated: &str) -> Self {
        let Some(previous) = previous else {
            return Self::NoPrior;
        };
        let before = digest(previous);
        if before == digest(generated) {
            return Self::Unchanged { digest: before };
        }
        let diff = TextDiff::from_lines(previous, generated);
        let (mut additions, mut deletions) = (0, 0);
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => additions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }
        let unified = diff
            .unified_diff()
            .context_radius(3)
            .header("previous", "generated")
            .to_string();
        Self::Changed {
            diff: unified,
            additions,
            deletions,
        }
    }

    /// `+N, -M` for a change, `None` otherwise.
    pub fn summary(&self) -> Option<String> {
        match self {
            Self::Changed {
                additions, deletions, ..
            } => Some(format!("+{additions}, -{deletions}")),
            Self::NoPrior | Self::Unchanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_deploy_has_no_prior() {
        assert_eq!(DriftOutcome::compare(None, "a\n"), DriftOutcome::NoPrior);
    }

    #[test]
    fn identical_text_is_unchanged() {
        let outcome = DriftOutcome::compare(Some("a\nb\n"), "a\nb\n");
        assert_eq!(
            outcome,
            DriftOutcome::Unchanged {
                digest: digest("a\nb\n")
            }
        );
        assert_eq!(outcome.summary(), None);
    }

    #[test]
    fn changes_are_counted_and_rendered() {
        let outcome = DriftOutcome::compare(Some("a\nb\n"), "a\nc\nd\n");
        assert_eq!(outcome.summary().as_deref(), Some("+2, -1"));
        let DriftOutcome::Changed { diff, .. } = outcome else {
            panic!("expected a change");
        };
        assert!(diff.contains("-b"));
        assert!(diff.contains("+c"));
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

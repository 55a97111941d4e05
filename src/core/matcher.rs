//! Integrator matching.
//!
//! The order system names integrators loosely ("Acme", "acme ", "Acmee"), while cascades
//! are registered by admins. Matching prefers an exact case-insensitive name and falls
//! back to the first registered cascade within [`MAX_EDIT_DISTANCE`] edits.

use crate::entities::cascade;

/// Largest Levenshtein distance still accepted as the same integrator
pub const MAX_EDIT_DISTANCE: usize = 2;

/// How a cascade was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Names are equal ignoring case
    Exact,
    /// Names differ by `distance` edits
    Approximate {
        /// Levenshtein distance between the names
        distance: usize,
    },
}

/// A resolved cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeMatch<'a> {
    /// The cascade routed to
    pub cascade: &'a cascade::Model,
    /// How it was found
    pub kind: MatchKind,
}

/// Finds the cascade registered under `name`.
///
/// `cascades` must be in registration order; ties in distance go to the earliest.
#[must_use]
pub fn match_cascade<'a>(name: &str, cascades: &'a [cascade::Model]) -> Option<CascadeMatch<'a>> {
    let wanted = name.trim().to_lowercase();

    if let Some(cascade) = cascades
        .iter()
        .find(|cascade| cascade.name.to_lowercase() == wanted)
    {
        return Some(CascadeMatch {
            cascade,
            kind: MatchKind::Exact,
        });
    }

    cascades.iter().find_map(|cascade| {
        let distance = strsim::levenshtein(&cascade.name.to_lowercase(), &wanted);
        (distance <= MAX_EDIT_DISTANCE).then_some(CascadeMatch {
            cascade,
            kind: MatchKind::Approximate { distance },
        })
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn cascade(id: i64, name: &str) -> cascade::Model {
        cascade::Model {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            chat_id: Some(format!("chat-{id}")),
            needs_external_id: false,
        }
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let cascades = vec![cascade(1, "acme"), cascade(2, "Globex")];
        let found = match_cascade("ACME", &cascades).unwrap();
        assert_eq!(found.cascade.id, 1);
        assert_eq!(found.kind, MatchKind::Exact);
    }

    #[test]
    fn test_exact_match_beats_earlier_fuzzy_match() {
        let cascades = vec![cascade(1, "acmee"), cascade(2, "acme")];
        let found = match_cascade("acme", &cascades).unwrap();
        assert_eq!(found.cascade.id, 2);
    }

    #[test]
    fn test_approximate_match_within_threshold() {
        let cascades = vec![cascade(1, "globex"), cascade(2, "acme")];
        let found = match_cascade("Acmme ", &cascades).unwrap();
        assert_eq!(found.cascade.id, 2);
        assert_eq!(found.kind, MatchKind::Approximate { distance: 1 });

        // Two edits is still accepted, three is not.
        assert!(match_cascade("acXYe", &cascades).is_some());
        assert!(match_cascade("aXYZ", &cascades).is_none());
    }

    #[test]
    fn test_first_registered_wins_among_fuzzy_matches() {
        let cascades = vec![cascade(1, "acma"), cascade(2, "acmb")];
        let found = match_cascade("acmc", &cascades).unwrap();
        assert_eq!(found.cascade.id, 1);
    }

    #[test]
    fn test_matching_is_idempotent() {
        let cascades = vec![cascade(1, "acme"), cascade(2, "initech")];
        assert_eq!(
            match_cascade("initek", &cascades),
            match_cascade("initek", &cascades)
        );
        assert!(match_cascade("", &[]).is_none());
    }
}

//! Target-label remapping policies.
//!
//! Each dataset variant is named by the policy that produced its target
//! labels: `drand` (uniform random), `ddet` (deterministic next class),
//! `dother` (per-image random non-identity shift of the class index).

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::AdversarioError;

/// How original labels are remapped into attack targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPolicy {
    /// `drand`: independent uniform draw per image
    UniformRandom,
    /// `ddet`: `(label + 1) % num_classes`
    NextClass,
    /// `dother`: `(label + offset) % num_classes` with an independent
    /// random offset in `1..num_classes` per image
    RandomRotation,
}

impl TargetPolicy {
    /// Selector string for this policy, matching the variant naming.
    #[must_use]
    pub fn selector(&self) -> &'static str {
        match self {
            TargetPolicy::UniformRandom => "drand",
            TargetPolicy::NextClass => "ddet",
            TargetPolicy::RandomRotation => "dother",
        }
    }

    /// Remap labels into attack targets.
    ///
    /// Fully determined by `seed` for the stochastic policies;
    /// `NextClass` ignores the seed entirely.
    ///
    /// # Panics
    ///
    /// Panics if `num_classes < 2` (no non-identity target exists).
    #[must_use]
    pub fn target_labels(&self, labels: &[usize], num_classes: usize, seed: u64) -> Vec<usize> {
        assert!(num_classes >= 2, "Need at least 2 classes to remap");

        match self {
            TargetPolicy::UniformRandom => {
                let mut rng = StdRng::seed_from_u64(seed);
                labels
                    .iter()
                    .map(|_| rng.gen_range(0..num_classes))
                    .collect()
            }
            TargetPolicy::NextClass => {
                labels.iter().map(|&l| (l + 1) % num_classes).collect()
            }
            TargetPolicy::RandomRotation => {
                let mut rng = StdRng::seed_from_u64(seed);
                labels
                    .iter()
                    .map(|&l| (l + rng.gen_range(1..num_classes)) % num_classes)
                    .collect()
            }
        }
    }
}

impl fmt::Display for TargetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for TargetPolicy {
    type Err = AdversarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drand" => Ok(TargetPolicy::UniformRandom),
            "ddet" => Ok(TargetPolicy::NextClass),
            "dother" => Ok(TargetPolicy::RandomRotation),
            _ => Err(AdversarioError::UnknownPolicy {
                selector: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_class_is_exact() {
        let labels = vec![0, 1, 8, 9];
        let targets = TargetPolicy::NextClass.target_labels(&labels, 10, 0);
        assert_eq!(targets, vec![1, 2, 9, 0]);
    }

    #[test]
    fn test_uniform_random_reproducible() {
        let labels = vec![3; 100];
        let a = TargetPolicy::UniformRandom.target_labels(&labels, 10, 42);
        let b = TargetPolicy::UniformRandom.target_labels(&labels, 10, 42);
        assert_eq!(a, b);

        let c = TargetPolicy::UniformRandom.target_labels(&labels, 10, 43);
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_rotation_never_identity() {
        let labels: Vec<usize> = (0..10).collect();
        for seed in 0..20 {
            let targets = TargetPolicy::RandomRotation.target_labels(&labels, 10, seed);
            for (l, t) in labels.iter().zip(targets.iter()) {
                assert_ne!(l, t, "shift must move every label");
            }
        }
    }

    #[test]
    fn test_random_rotation_offsets_vary_per_image() {
        // A constant-label batch must not collapse to a single target
        // class: each image draws its own offset.
        let labels = vec![4; 200];
        let targets = TargetPolicy::RandomRotation.target_labels(&labels, 10, 0);

        let distinct: std::collections::HashSet<usize> = targets.iter().copied().collect();
        assert!(
            distinct.len() > 1,
            "expected per-image offsets, got a single target class"
        );
        assert!(!distinct.contains(&4));
    }

    #[test]
    fn test_random_rotation_reproducible() {
        let labels: Vec<usize> = (0..10).cycle().take(64).collect();
        let a = TargetPolicy::RandomRotation.target_labels(&labels, 10, 5);
        let b = TargetPolicy::RandomRotation.target_labels(&labels, 10, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_targets_stay_in_class_range() {
        let labels: Vec<usize> = (0..10).cycle().take(50).collect();
        for policy in [
            TargetPolicy::UniformRandom,
            TargetPolicy::NextClass,
            TargetPolicy::RandomRotation,
        ] {
            let targets = policy.target_labels(&labels, 10, 7);
            assert!(targets.iter().all(|&t| t < 10));
        }
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("drand".parse::<TargetPolicy>().unwrap(), TargetPolicy::UniformRandom);
        assert_eq!("ddet".parse::<TargetPolicy>().unwrap(), TargetPolicy::NextClass);
        assert_eq!("dother".parse::<TargetPolicy>().unwrap(), TargetPolicy::RandomRotation);
        assert_eq!(TargetPolicy::NextClass.to_string(), "ddet");
    }

    #[test]
    fn test_parse_unknown_selector_fails() {
        let err = "dnope".parse::<TargetPolicy>().unwrap_err();
        assert!(matches!(err, AdversarioError::UnknownPolicy { .. }));
    }
}

//! Ordering Engine
//!
//! Computes fractional order keys for insertion, reordering, and
//! reparenting. Appending takes (max sibling order) + 1; dropping next to a
//! target takes the midpoint between the target and its neighbor. When
//! repeated insertion at the same point exhausts f64 precision and the
//! midpoint collides with a bounding key, the affected sibling run is
//! renumbered with integer steps and the midpoint recomputed - a correctness
//! requirement, not an optimization.

/// A sibling's id and current sort key, as seen by the engine.
///
/// Sibling slices passed to the engine must be sorted by `(order, id)` and
/// must NOT include the item being placed.
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingSlot {
    pub id: String,
    pub order: f64,
}

/// Where the caller wants to drop an item.
#[derive(Debug, Clone, PartialEq)]
pub enum DropIntent {
    /// Immediately before the target, under the target's parent
    Before(String),
    /// Immediately after the target, under the target's parent
    After(String),
    /// Last child of the container (`None` = workspace root)
    Into(Option<String>),
}

/// Result of planning an adjacent insertion.
///
/// `renumbered` is non-empty only when precision exhaustion forced an
/// integer relabel of the whole sibling run; the store must apply those
/// assignments together with the placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementPlan {
    pub order: f64,
    pub renumbered: Vec<SiblingSlot>,
}

/// Calculates fractional order keys for sibling placement.
pub struct OrderingEngine;

impl OrderingEngine {
    /// Order key for appending as the last child.
    ///
    /// ```text
    /// append_order(&[])                  => 1.0
    /// append_order(&[.. last order 3.0]) => 4.0
    /// ```
    pub fn append_order(siblings: &[SiblingSlot]) -> f64 {
        match siblings.last() {
            Some(last) => last.order + 1.0,
            None => 1.0,
        }
    }

    /// Plan an insertion immediately before `target_id`.
    ///
    /// Returns `None` if the target is not among the siblings.
    pub fn insert_before(siblings: &[SiblingSlot], target_id: &str) -> Option<PlacementPlan> {
        let idx = siblings.iter().position(|s| s.id == target_id)?;
        Some(Self::plan_between(siblings, idx.checked_sub(1), Some(idx)))
    }

    /// Plan an insertion immediately after `target_id`.
    ///
    /// Returns `None` if the target is not among the siblings.
    pub fn insert_after(siblings: &[SiblingSlot], target_id: &str) -> Option<PlacementPlan> {
        let idx = siblings.iter().position(|s| s.id == target_id)?;
        let next = if idx + 1 < siblings.len() {
            Some(idx + 1)
        } else {
            None
        };
        Some(Self::plan_between(siblings, Some(idx), next))
    }

    /// Compute a key strictly between the slots at `lo` and `hi` (either may
    /// be absent), renumbering the run first if the key space is exhausted.
    fn plan_between(siblings: &[SiblingSlot], lo: Option<usize>, hi: Option<usize>) -> PlacementPlan {
        let candidate = Self::key_between(
            lo.map(|i| siblings[i].order),
            hi.map(|i| siblings[i].order),
        );
        if let Some(order) = candidate {
            return PlacementPlan {
                order,
                renumbered: Vec::new(),
            };
        }

        // Precision exhausted: relabel the run with integer steps, then the
        // recomputed key is guaranteed a clean midpoint.
        let renumbered: Vec<SiblingSlot> = siblings
            .iter()
            .enumerate()
            .map(|(i, s)| SiblingSlot {
                id: s.id.clone(),
                order: (i + 1) as f64,
            })
            .collect();
        let order = Self::key_between(
            lo.map(|i| renumbered[i].order),
            hi.map(|i| renumbered[i].order),
        )
        .expect("integer relabel always leaves a representable midpoint");

        PlacementPlan { order, renumbered }
    }

    /// Key strictly between two bounds, or `None` when f64 cannot represent
    /// one (the degenerate case after many insertions at the same point).
    fn key_between(lo: Option<f64>, hi: Option<f64>) -> Option<f64> {
        let candidate = match (lo, hi) {
            (None, None) => 1.0,
            (None, Some(hi)) => hi - 1.0,
            (Some(lo), None) => lo + 1.0,
            (Some(lo), Some(hi)) => (lo + hi) / 2.0,
        };
        let above_lo = lo.map_or(true, |lo| candidate > lo);
        let below_hi = hi.map_or(true, |hi| candidate < hi);
        (above_lo && below_hi).then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(orders: &[f64]) -> Vec<SiblingSlot> {
        orders
            .iter()
            .enumerate()
            .map(|(i, &order)| SiblingSlot {
                id: format!("s{}", i),
                order,
            })
            .collect()
    }

    #[test]
    fn test_append_first_child() {
        assert_eq!(OrderingEngine::append_order(&[]), 1.0);
    }

    #[test]
    fn test_append_after_last() {
        assert_eq!(OrderingEngine::append_order(&slots(&[1.0, 3.0])), 4.0);
    }

    #[test]
    fn test_insert_before_first_has_no_neighbor() {
        let plan = OrderingEngine::insert_before(&slots(&[2.0, 3.0]), "s0").unwrap();
        assert_eq!(plan.order, 1.0);
        assert!(plan.renumbered.is_empty());
    }

    #[test]
    fn test_insert_between_takes_midpoint() {
        let plan = OrderingEngine::insert_before(&slots(&[1.0, 3.0]), "s1").unwrap();
        assert_eq!(plan.order, 2.0);

        let plan = OrderingEngine::insert_after(&slots(&[1.0, 3.0]), "s0").unwrap();
        assert_eq!(plan.order, 2.0);
    }

    #[test]
    fn test_insert_after_last_has_no_neighbor() {
        let plan = OrderingEngine::insert_after(&slots(&[1.0, 3.0]), "s1").unwrap();
        assert_eq!(plan.order, 4.0);
    }

    #[test]
    fn test_unknown_target() {
        assert!(OrderingEngine::insert_before(&slots(&[1.0]), "missing").is_none());
    }

    #[test]
    fn test_precision_exhaustion_triggers_renumbering() {
        // Adjacent f64 values leave no representable midpoint
        let lo = 1.0_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let siblings = slots(&[lo, hi, 7.5]);

        let plan = OrderingEngine::insert_after(&siblings, "s0").unwrap();
        assert_eq!(
            plan.renumbered,
            vec![
                SiblingSlot {
                    id: "s0".into(),
                    order: 1.0
                },
                SiblingSlot {
                    id: "s1".into(),
                    order: 2.0
                },
                SiblingSlot {
                    id: "s2".into(),
                    order: 3.0
                },
            ]
        );
        assert_eq!(plan.order, 1.5);
    }

    #[test]
    fn test_equal_keys_trigger_renumbering() {
        // Ties are legal (broken by id) but leave no room for a midpoint
        let plan = OrderingEngine::insert_before(&slots(&[2.0, 2.0]), "s1").unwrap();
        assert!(!plan.renumbered.is_empty());
        assert_eq!(plan.order, 1.5);
    }

    #[test]
    fn test_repeated_same_point_insertion_stays_ordered() {
        // Keep inserting before the same target; keys must stay strictly
        // increasing toward the target even past f64 midpoint precision.
        let mut siblings = slots(&[1.0, 2.0]);
        for i in 0..80 {
            let plan = OrderingEngine::insert_before(&siblings, "s1").unwrap();
            if !plan.renumbered.is_empty() {
                for slot in &plan.renumbered {
                    let existing = siblings.iter_mut().find(|s| s.id == slot.id).unwrap();
                    existing.order = slot.order;
                }
            }
            let target_idx = siblings.iter().position(|s| s.id == "s1").unwrap();
            assert!(plan.order < siblings[target_idx].order);
            siblings.insert(
                target_idx,
                SiblingSlot {
                    id: format!("n{}", i),
                    order: plan.order,
                },
            );
            // The run must remain strictly ordered
            for pair in siblings.windows(2) {
                assert!(pair[0].order < pair[1].order);
            }
        }
    }
}

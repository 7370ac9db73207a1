//! # Pitch Resolver
//!
//! Finds the button and bellows direction that produce a pitch on the current
//! tuning, substituting the nearest playable pitch when asked to.
//!
//! ## Lookup Order
//! 1. Push side first, then pull side. When both directions produce the pitch
//!    on different buttons, push wins.
//! 2. Within one direction the first registered button wins.
//! 3. With substitution enabled, an unmapped pitch is replaced by the playable
//!    pitch with the smallest absolute distance. Equal distances pick the
//!    lower pitch.
//!
//! The inverse tables are built once per [`TuningMap`]; build a new resolver
//! when the tuning changes.

use crate::error::AccordionError;
use crate::tuning::{ButtonId, Direction, TuningMap};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Where a pitch ended up on the keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub button_id: ButtonId,
    pub direction: Direction,
    pub resolved_pitch: i32,
    pub original_pitch: i32,
    pub substituted: bool,
}

/// Inverse lookup over one tuning.
#[derive(Debug, Clone)]
pub struct PitchResolver {
    map: TuningMap,
    push: HashMap<i32, ButtonId>,
    pull: HashMap<i32, ButtonId>,
    playable: Vec<i32>,
}

impl PitchResolver {
    pub fn new(map: TuningMap) -> Self {
        let mut push = HashMap::new();
        let mut pull = HashMap::new();
        let mut playable = BTreeSet::new();

        for (id, reeds) in map.buttons() {
            if let Some(pitch) = reeds.push {
                playable.insert(pitch);
                push.entry(pitch).or_insert_with(|| id.clone());
            }
            if let Some(pitch) = reeds.pull {
                playable.insert(pitch);
                pull.entry(pitch).or_insert_with(|| id.clone());
            }
        }

        Self {
            map,
            push,
            pull,
            playable: playable.into_iter().collect(),
        }
    }

    pub fn tuning(&self) -> &TuningMap {
        &self.map
    }

    /// All distinct playable pitches, ascending.
    pub fn playable_pitches(&self) -> &[i32] {
        &self.playable
    }

    /// Forward lookup: the pitch a button sounds in a direction.
    pub fn lookup(&self, button: &ButtonId, direction: Direction) -> Option<i32> {
        self.map.pitch(button, direction)
    }

    /// Resolve a pitch to a button.
    ///
    /// Returns `None` when the pitch has no mapping and substitution is off,
    /// or when the tuning has no playable pitches at all.
    ///
    /// # Example
    /// ```rust
    /// use accordion_core::{Direction, PitchResolver, TuningMap};
    ///
    /// let map = TuningMap::new("Test").with_button("B1", Some(60), Some(62));
    /// let resolver = PitchResolver::new(map);
    ///
    /// let exact = resolver.resolve(60, false).unwrap();
    /// assert_eq!(exact.direction, Direction::Push);
    /// assert!(!exact.substituted);
    ///
    /// assert!(resolver.resolve(61, false).is_none());
    ///
    /// // 60 and 62 are equally close; the lower pitch wins
    /// let sub = resolver.resolve(61, true).unwrap();
    /// assert_eq!(sub.resolved_pitch, 60);
    /// assert!(sub.substituted);
    /// ```
    pub fn resolve(&self, pitch: i32, allow_substitution: bool) -> Option<Resolution> {
        if let Some((button_id, direction)) = self.direct(pitch) {
            return Some(Resolution {
                button_id,
                direction,
                resolved_pitch: pitch,
                original_pitch: pitch,
                substituted: false,
            });
        }

        if !allow_substitution {
            return None;
        }

        let closest = self.closest_playable(pitch)?;
        let (button_id, direction) = self.direct(closest)?;
        Some(Resolution {
            button_id,
            direction,
            resolved_pitch: closest,
            original_pitch: pitch,
            substituted: true,
        })
    }

    /// [`resolve`](Self::resolve), with the miss as an error naming the tuning.
    pub fn try_resolve(&self, pitch: i32, allow_substitution: bool) -> Result<Resolution, AccordionError> {
        self.resolve(pitch, allow_substitution)
            .ok_or_else(|| AccordionError::PitchUnresolvable {
                pitch,
                tuning: self.map.name().to_string(),
            })
    }

    fn direct(&self, pitch: i32) -> Option<(ButtonId, Direction)> {
        if let Some(id) = self.push.get(&pitch) {
            return Some((id.clone(), Direction::Push));
        }
        self.pull.get(&pitch).map(|id| (id.clone(), Direction::Pull))
    }

    /// Nearest playable pitch. The list is ascending, so keeping the first
    /// minimum found prefers the lower pitch on ties.
    fn closest_playable(&self, pitch: i32) -> Option<i32> {
        let mut best: Option<(i32, i32)> = None;
        for &candidate in &self.playable {
            let distance = (candidate - pitch).abs();
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((candidate, distance)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn scenario_map() -> TuningMap {
        TuningMap::new("Scenario").with_button("B1", Some(60), Some(62))
    }

    #[test]
    fn test_every_mapped_pitch_resolves_exactly() {
        for tuning in Tuning::ALL {
            let map = tuning.map();
            let resolver = PitchResolver::new(map.clone());
            for (_, reeds) in map.buttons() {
                for pitch in [reeds.push, reeds.pull].into_iter().flatten() {
                    let res = resolver.resolve(pitch, false).expect("mapped pitch must resolve");
                    assert_eq!(res.resolved_pitch, pitch);
                    assert!(!res.substituted);
                    assert_eq!(resolver.lookup(&res.button_id, res.direction), Some(pitch));
                }
            }
        }
    }

    #[test]
    fn test_unmapped_pitch_strict_is_not_found() {
        let resolver = PitchResolver::new(scenario_map());
        assert!(resolver.resolve(61, false).is_none());
        assert!(resolver.resolve(20, false).is_none());
    }

    #[test]
    fn test_scenario_a() {
        let resolver = PitchResolver::new(scenario_map());

        let direct = resolver.resolve(60, false).unwrap();
        assert_eq!(direct.button_id, ButtonId::from("B1"));
        assert_eq!(direct.direction, Direction::Push);

        let sub = resolver.resolve(61, true).unwrap();
        assert_eq!(sub.button_id, ButtonId::from("B1"));
        assert_eq!(sub.direction, Direction::Push);
        assert_eq!(sub.resolved_pitch, 60);
        assert_eq!(sub.original_pitch, 61);
        assert!(sub.substituted);
    }

    #[test]
    fn test_pull_only_pitch_resolves_to_pull() {
        let resolver = PitchResolver::new(scenario_map());
        let res = resolver.resolve(62, false).unwrap();
        assert_eq!(res.direction, Direction::Pull);
    }

    #[test]
    fn test_push_wins_over_pull_on_different_buttons() {
        let map = TuningMap::new("T")
            .with_button("B1", Some(50), Some(64))
            .with_button("B2", Some(64), Some(52));
        let res = PitchResolver::new(map).resolve(64, false).unwrap();
        assert_eq!(res.button_id, ButtonId::from("B2"));
        assert_eq!(res.direction, Direction::Push);
    }

    #[test]
    fn test_first_registered_button_wins() {
        let map = TuningMap::new("T")
            .with_button("B7", Some(67), None)
            .with_button("B2", Some(67), None);
        let res = PitchResolver::new(map).resolve(67, false).unwrap();
        assert_eq!(res.button_id, ButtonId::from("B7"));
    }

    #[test]
    fn test_substitution_picks_closest_by_distance() {
        let map = TuningMap::new("T")
            .with_button("B1", Some(60), None)
            .with_button("B2", Some(67), None);
        let resolver = PitchResolver::new(map);
        assert_eq!(resolver.resolve(65, true).unwrap().resolved_pitch, 67);
        assert_eq!(resolver.resolve(62, true).unwrap().resolved_pitch, 60);
        assert_eq!(resolver.resolve(100, true).unwrap().resolved_pitch, 67);
        assert_eq!(resolver.resolve(10, true).unwrap().resolved_pitch, 60);
    }

    #[test]
    fn test_substitution_against_bruteforce_on_builtin_tuning() {
        let resolver = PitchResolver::new(Tuning::Fbe.map());
        let playable = resolver.playable_pitches().to_vec();
        for pitch in 30..110 {
            let res = resolver.resolve(pitch, true).unwrap();
            let best = playable.iter().map(|p| (p - pitch).abs()).min().unwrap();
            assert_eq!((res.resolved_pitch - pitch).abs(), best, "pitch {}", pitch);
            let lower_tie = playable
                .iter()
                .copied()
                .filter(|p| (p - pitch).abs() == best)
                .min()
                .unwrap();
            assert_eq!(res.resolved_pitch, lower_tie);
            assert_eq!(res.substituted, !playable.contains(&pitch));
        }
    }

    #[test]
    fn test_try_resolve_names_the_tuning() {
        let resolver = PitchResolver::new(scenario_map());
        assert_eq!(resolver.try_resolve(62, false).unwrap().direction, Direction::Pull);

        let err = resolver.try_resolve(61, false).unwrap_err();
        assert!(matches!(err, AccordionError::PitchUnresolvable { pitch: 61, .. }));
        assert_eq!(err.to_string(), "Pitch 61 cannot be played on the Scenario tuning");
    }

    #[test]
    fn test_empty_map_never_resolves() {
        let resolver = PitchResolver::new(TuningMap::new("Empty"));
        assert!(resolver.playable_pitches().is_empty());
        assert!(resolver.resolve(60, true).is_none());
        assert!(resolver.resolve(60, false).is_none());
    }

    #[test]
    fn test_playable_pitches_sorted_and_distinct() {
        let resolver = PitchResolver::new(Tuning::Gcf.map());
        let pitches = resolver.playable_pitches();
        assert!(pitches.windows(2).all(|w| w[0] < w[1]));
    }
}

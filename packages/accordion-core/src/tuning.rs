//! # Tunings
//!
//! A tuning assigns every physical button two reed pitches: one sounding while
//! the bellows are pushed, one while they are pulled. Pitches are MIDI note
//! numbers.
//!
//! Two three-row diatonic tunings are built in (`FBE` and `GCF`, 34 buttons
//! each). Custom tunings can be loaded from YAML:
//!
//! ```yaml
//! name: Custom
//! buttons:
//!   - { id: B1, push: 60, pull: 62 }
//!   - { id: B2, push: 64 }
//! ```
//!
//! Button order is registration order. The resolver relies on it: when two
//! buttons share a pitch in the same direction, the one registered first wins.

use crate::error::AccordionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one physical button, e.g. `"B12"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(String);

impl ButtonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ButtonId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ButtonId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Bellows direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Push,
    Pull,
}

impl Direction {
    /// Parse "push" or "pull" (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Some(Direction::Push),
            "pull" => Some(Direction::Pull),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Push => "push",
            Direction::Pull => "pull",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Push => Direction::Pull,
            Direction::Pull => Direction::Push,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two reed pitches of one button. Either side may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reeds {
    pub push: Option<i32>,
    pub pull: Option<i32>,
}

impl Reeds {
    pub fn new(push: i32, pull: i32) -> Self {
        Self {
            push: Some(push),
            pull: Some(pull),
        }
    }

    pub fn pitch(&self, direction: Direction) -> Option<i32> {
        match direction {
            Direction::Push => self.push,
            Direction::Pull => self.pull,
        }
    }
}

/// Button → (push pitch, pull pitch) table for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningMap {
    name: String,
    buttons: Vec<(ButtonId, Reeds)>,
}

impl TuningMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buttons: Vec::new(),
        }
    }

    /// Builder form of [`TuningMap::insert`].
    pub fn with_button(mut self, id: impl Into<ButtonId>, push: Option<i32>, pull: Option<i32>) -> Self {
        self.insert(id, Reeds { push, pull });
        self
    }

    /// Register a button. Re-registering an id replaces its reeds but keeps
    /// its original position.
    pub fn insert(&mut self, id: impl Into<ButtonId>, reeds: Reeds) {
        let id = id.into();
        match self.buttons.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = reeds,
            None => self.buttons.push((id, reeds)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// Buttons in registration order.
    pub fn buttons(&self) -> impl Iterator<Item = (&ButtonId, &Reeds)> {
        self.buttons.iter().map(|(id, reeds)| (id, reeds))
    }

    pub fn reeds(&self, id: &ButtonId) -> Option<&Reeds> {
        self.buttons
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, reeds)| reeds)
    }

    /// Pitch a button sounds in the given bellows direction.
    pub fn pitch(&self, id: &ButtonId, direction: Direction) -> Option<i32> {
        self.reeds(id).and_then(|reeds| reeds.pitch(direction))
    }

    pub fn contains(&self, id: &ButtonId) -> bool {
        self.reeds(id).is_some()
    }

    /// Load a custom tuning from YAML.
    ///
    /// # Example
    /// ```rust
    /// use accordion_core::{ButtonId, Direction, TuningMap};
    ///
    /// let yaml = r#"
    /// name: Test
    /// buttons:
    ///   - { id: B1, push: 60, pull: 62 }
    ///   - { id: B2, pull: 65 }
    /// "#;
    /// let map = TuningMap::from_yaml(yaml).unwrap();
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map.pitch(&ButtonId::from("B2"), Direction::Push), None);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, AccordionError> {
        let raw: RawTuning = serde_yaml::from_str(content)?;
        let mut map = TuningMap::new(raw.name);

        for button in raw.buttons {
            if button.id.trim().is_empty() {
                return Err(AccordionError::Config("button id must not be empty".to_string()));
            }
            for pitch in [button.push, button.pull].into_iter().flatten() {
                if !(0..=127).contains(&pitch) {
                    return Err(AccordionError::Config(format!(
                        "button {}: pitch {} is outside the MIDI range 0-127",
                        button.id, pitch
                    )));
                }
            }
            let id = ButtonId::new(button.id);
            if map.contains(&id) {
                return Err(AccordionError::Config(format!("button {} is defined twice", id)));
            }
            map.insert(
                id,
                Reeds {
                    push: button.push,
                    pull: button.pull,
                },
            );
        }

        Ok(map)
    }
}

#[derive(Deserialize)]
struct RawTuning {
    name: String,
    #[serde(default)]
    buttons: Vec<RawButton>,
}

#[derive(Deserialize)]
struct RawButton {
    id: String,
    push: Option<i32>,
    pull: Option<i32>,
}

/// Built-in tunings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tuning {
    #[default]
    #[serde(rename = "FBE")]
    Fbe,
    #[serde(rename = "GCF")]
    Gcf,
}

/// FBE three-row tuning as (push, pull) per button, B1 first.
const FBE: [(i32, i32); 34] = [
    (62, 60), (56, 54), (59, 64), (63, 61), (65, 66),
    (68, 70), (71, 73), (75, 78), (77, 82), (80, 85),
    (83, 90), (67, 65), (58, 54), (61, 59), (64, 63),
    (68, 66), (70, 71), (73, 75), (76, 78), (80, 83),
    (82, 87), (85, 90), (88, 95), (72, 74), (63, 59),
    (66, 64), (69, 68), (73, 71), (75, 76), (78, 80),
    (81, 83), (85, 88), (87, 92), (90, 95),
];

/// GCF three-row tuning as (push, pull) per button, B1 first.
const GCF: [(i32, i32); 34] = [
    (55, 59), (57, 61), (59, 63), (60, 65), (62, 67),
    (64, 69), (66, 71), (67, 73), (69, 75), (71, 77),
    (72, 79), (60, 64), (62, 66), (64, 68), (65, 70),
    (67, 72), (69, 74), (71, 76), (72, 78), (74, 80),
    (76, 82), (77, 84), (79, 86), (65, 69), (67, 71),
    (69, 73), (70, 75), (72, 77), (74, 79), (76, 81),
    (77, 83), (79, 85), (81, 87), (82, 88),
];

impl Tuning {
    pub const ALL: [Tuning; 2] = [Tuning::Fbe, Tuning::Gcf];

    /// Parse a tuning name like "FBE" or "gcf".
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FBE" => Some(Tuning::Fbe),
            "GCF" => Some(Tuning::Gcf),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tuning::Fbe => "FBE",
            Tuning::Gcf => "GCF",
        }
    }

    /// Build the button table for this tuning.
    pub fn map(self) -> TuningMap {
        let table = match self {
            Tuning::Fbe => &FBE,
            Tuning::Gcf => &GCF,
        };
        let mut map = TuningMap::new(self.name());
        for (i, (push, pull)) in table.iter().enumerate() {
            map.insert(format!("B{}", i + 1), Reeds::new(*push, *pull));
        }
        map
    }
}

impl fmt::Display for Tuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Plant model: one leveled individual of the garden.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::PlantId;

/// Species of a plant.
///
/// Serialized as snake_case to match the persisted schema (`"plum_tree"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantType {
    PlumTree,
    LemonTree,
    AppleTree,
    CoconutTree,
    BananaTree,
}

impl PlantType {
    /// All species, in declaration order.
    pub const ALL: [PlantType; 5] = [
        PlantType::PlumTree,
        PlantType::LemonTree,
        PlantType::AppleTree,
        PlantType::CoconutTree,
        PlantType::BananaTree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlantType::PlumTree => "plum_tree",
            PlantType::LemonTree => "lemon_tree",
            PlantType::AppleTree => "apple_tree",
            PlantType::CoconutTree => "coconut_tree",
            PlantType::BananaTree => "banana_tree",
        }
    }
}

impl fmt::Display for PlantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plant in the garden.
///
/// - `id` and `kind` never change after creation.
/// - `level` stays within `[1, max_plant_level]`; the reconciler owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,

    #[serde(rename = "type")]
    pub kind: PlantType,

    pub level: u32,
}

impl Plant {
    /// A freshly planted level-1 individual.
    pub fn seedling(id: PlantId, kind: PlantType) -> Self {
        Self { id, kind, level: 1 }
    }
}

/// Total level mass of a collection.
pub fn total_mass(plants: &[Plant]) -> u32 {
    plants.iter().map(|p| p.level).sum()
}

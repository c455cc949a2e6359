//! Plant population reconciler.
//!
//! Keeps the total level mass of the garden equal to
//! `floor(score / points_per_unit)`, within the count and level ceilings.
//!
//! # 方針
//! - 成長（growth）: 1 単位ずつ独立にランダム選択（level up or 新規植え付け）
//! - 縮小（shrink）: 1 単位ずつ決定的に「最も新しい Plant」（ID 最大）を縮める
//! - 1 回の呼び出しでは growth だけ、または shrink だけを `|target - current|` 回適用する
//! - 両方の上限に達したら growth は途中で止まる（飽和状態。エラーではない）
//!
//! 乱数源は外から注入する（テストでは seed 固定の `StdRng`）。

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ids::PlantId;
use super::plant::{Plant, PlantType, total_mass};
use crate::ports::IdGenerator;

const DEFAULT_LEVEL_UP_CHANCE: f64 = 0.7;

/// Numeric rules of the garden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GardenRules {
    pub points_per_unit: u32,
    pub max_plant_count: u32,
    pub max_plant_level: u32,
    /// Probability of leveling up when planting is also possible.
    pub level_up_chance: f64,
}

impl Default for GardenRules {
    fn default() -> Self {
        Self {
            points_per_unit: 10,
            max_plant_count: 15,
            max_plant_level: 5,
            level_up_chance: DEFAULT_LEVEL_UP_CHANCE,
        }
    }
}

impl GardenRules {
    /// `floor(score / points_per_unit)`.
    pub fn target_units(&self, score: u32) -> u32 {
        score.checked_div(self.points_per_unit).unwrap_or(0)
    }

    /// Largest mass the ceilings allow.
    pub fn max_mass(&self) -> u32 {
        self.max_plant_count.saturating_mul(self.max_plant_level)
    }

    /// Mass the garden settles at for `score`.
    pub fn settled_mass(&self, score: u32) -> u32 {
        self.target_units(score).min(self.max_mass())
    }
}

/// One growth unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStep {
    LeveledUp(PlantId),
    Planted(PlantId),
}

/// One shrink unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkStep {
    LeveledDown(PlantId),
    Removed(PlantId),
}

/// What one `reconcile` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub planted: u32,
    pub leveled_up: u32,
    pub leveled_down: u32,
    pub removed: u32,
    /// Growth stopped early because both ceilings were reached.
    pub saturated: bool,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.planted == 0 && self.leveled_up == 0 && self.leveled_down == 0 && self.removed == 0
    }
}

pub struct PlantReconciler<R> {
    rules: GardenRules,
    rng: R,
}

impl<R: Rng> PlantReconciler<R> {
    /// A non-finite `level_up_chance` falls back to the default; others are
    /// clamped into `[0, 1]`.
    pub fn new(mut rules: GardenRules, rng: R) -> Self {
        rules.level_up_chance = if rules.level_up_chance.is_finite() {
            rules.level_up_chance.clamp(0.0, 1.0)
        } else {
            DEFAULT_LEVEL_UP_CHANCE
        };
        Self { rules, rng }
    }

    pub fn rules(&self) -> &GardenRules {
        &self.rules
    }

    /// Bring `plants` to the mass implied by `score`.
    pub fn reconcile(
        &mut self,
        plants: &mut Vec<Plant>,
        score: u32,
        ids: &dyn IdGenerator,
    ) -> ReconcileReport {
        let target = self.rules.target_units(score);
        let current = total_mass(plants);
        let mut report = ReconcileReport::default();

        if target > current {
            // 永続化済みの Plant より後ろにソートされる ID を出させる
            if let Some(newest) = newest(plants) {
                ids.observe(newest.id);
            }
            for _ in 0..(target - current) {
                match self.grow_one(plants, ids) {
                    Some(GrowthStep::LeveledUp(_)) => report.leveled_up += 1,
                    Some(GrowthStep::Planted(_)) => report.planted += 1,
                    None => {
                        report.saturated = true;
                        break;
                    }
                }
            }
        } else if current > target {
            for _ in 0..(current - target) {
                match shrink_one(plants) {
                    Some(ShrinkStep::LeveledDown(_)) => report.leveled_down += 1,
                    Some(ShrinkStep::Removed(_)) => report.removed += 1,
                    None => break,
                }
            }
        }

        report
    }

    /// Add one unit of mass. `None` when both ceilings are saturated.
    pub fn grow_one(&mut self, plants: &mut Vec<Plant>, ids: &dyn IdGenerator) -> Option<GrowthStep> {
        let can_plant = plants.len() < self.rules.max_plant_count as usize;
        let growable: Vec<usize> = plants
            .iter()
            .enumerate()
            .filter(|(_, p)| p.level < self.rules.max_plant_level)
            .map(|(i, _)| i)
            .collect();

        let level_up = match (!growable.is_empty(), can_plant) {
            (true, true) => self.rng.gen_bool(self.rules.level_up_chance),
            (true, false) => true,
            (false, true) => false,
            (false, false) => return None,
        };

        if level_up {
            let index = growable[self.rng.gen_range(0..growable.len())];
            let plant = &mut plants[index];
            plant.level += 1;
            Some(GrowthStep::LeveledUp(plant.id))
        } else {
            let kind = PlantType::ALL[self.rng.gen_range(0..PlantType::ALL.len())];
            let id = ids.generate_plant_id();
            plants.push(Plant::seedling(id, kind));
            Some(GrowthStep::Planted(id))
        }
    }
}

/// Remove one unit of mass from the newest plant. `None` on an empty garden.
pub fn shrink_one(plants: &mut Vec<Plant>) -> Option<ShrinkStep> {
    let index = plants
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| p.id)
        .map(|(i, _)| i)?;

    let plant = &mut plants[index];
    if plant.level <= 1 {
        let removed = plants.remove(index);
        Some(ShrinkStep::Removed(removed.id))
    } else {
        plant.level -= 1;
        Some(ShrinkStep::LeveledDown(plant.id))
    }
}

/// Plant with the greatest (most recently generated) id.
pub fn newest(plants: &[Plant]) -> Option<&Plant> {
    plants.iter().max_by_key(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use std::collections::HashSet;
    use ulid::Ulid;

    fn id_gen() -> UlidGenerator<FixedClock> {
        UlidGenerator::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()))
    }

    fn reconciler(seed: u64) -> PlantReconciler<StdRng> {
        PlantReconciler::new(GardenRules::default(), StdRng::seed_from_u64(seed))
    }

    fn plant(ts: u64, level: u32) -> Plant {
        Plant {
            id: PlantId::from_ulid(Ulid::from_parts(ts, 0)),
            kind: PlantType::LemonTree,
            level,
        }
    }

    fn assert_invariants(rules: &GardenRules, plants: &[Plant], score: u32) {
        assert_eq!(total_mass(plants), rules.settled_mass(score), "score={score}");
        assert!(plants.len() <= rules.max_plant_count as usize);
        for p in plants {
            assert!((1..=rules.max_plant_level).contains(&p.level), "level {}", p.level);
        }
        let unique: HashSet<_> = plants.iter().map(|p| p.id).collect();
        assert_eq!(unique.len(), plants.len());
    }

    #[rstest]
    #[case::zero(0, 0)]
    #[case::below_one_unit(9, 0)]
    #[case::one_unit(10, 1)]
    #[case::ten_units(105, 10)]
    #[case::saturated(1000, 75)]
    fn scenarios(#[case] score: u32, #[case] mass: u32) {
        let ids = id_gen();
        let mut rec = reconciler(7);
        let mut plants = Vec::new();

        rec.reconcile(&mut plants, score, &ids);

        assert_eq!(total_mass(&plants), mass);
        assert_invariants(rec.rules(), &plants, score);
    }

    #[test]
    fn first_unit_is_a_single_seedling() {
        let ids = id_gen();
        let mut rec = reconciler(1);
        let mut plants = Vec::new();

        let report = rec.reconcile(&mut plants, 10, &ids);

        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].level, 1);
        assert_eq!(report.planted, 1);
    }

    #[test]
    fn invariant_holds_over_random_score_walks() {
        let rules = GardenRules::default();
        for seed in 0..32 {
            let ids = id_gen();
            let mut rec = reconciler(seed);
            let mut walk = StdRng::seed_from_u64(seed + 1_000);
            let mut plants = Vec::new();

            for _ in 0..60 {
                let score = walk.gen_range(0..=1000);
                rec.reconcile(&mut plants, score, &ids);
                assert_invariants(&rules, &plants, score);
            }
        }
    }

    #[test]
    fn invariant_holds_for_unit_steps() {
        let ids = id_gen();
        let mut rec = reconciler(3);
        let mut plants = Vec::new();

        for score in (0..=400).chain((0..=400).rev()) {
            rec.reconcile(&mut plants, score, &ids);
            assert_invariants(rec.rules(), &plants, score);
        }
        assert!(plants.is_empty());
    }

    #[test]
    fn reconcile_twice_is_noop() {
        let ids = id_gen();
        let mut rec = reconciler(11);
        let mut plants = Vec::new();

        rec.reconcile(&mut plants, 237, &ids);
        let before = plants.clone();

        let report = rec.reconcile(&mut plants, 237, &ids);
        assert!(report.is_noop());
        assert_eq!(plants, before);

        // 同じ unit 内のスコア変化も no-op
        let report = rec.reconcile(&mut plants, 239, &ids);
        assert!(report.is_noop());
        assert_eq!(plants, before);
    }

    #[test]
    fn growth_and_shrink_never_mix() {
        let ids = id_gen();
        let mut rec = reconciler(5);
        let mut plants = Vec::new();

        let up = rec.reconcile(&mut plants, 300, &ids);
        assert_eq!(up.leveled_down + up.removed, 0);
        assert_eq!(up.planted + up.leveled_up, 30);

        let down = rec.reconcile(&mut plants, 120, &ids);
        assert_eq!(down.planted + down.leveled_up, 0);
        assert_eq!(down.leveled_down + down.removed, 18);
    }

    #[test]
    fn shrink_targets_newest_id_not_position() {
        // 配列の末尾ではなく ID 最大のものが縮む
        let mut plants = vec![plant(30, 2), plant(10, 3), plant(20, 1)];

        assert_eq!(shrink_one(&mut plants), Some(ShrinkStep::LeveledDown(plant(30, 0).id)));
        assert_eq!(shrink_one(&mut plants), Some(ShrinkStep::Removed(plant(30, 0).id)));
        assert_eq!(shrink_one(&mut plants), Some(ShrinkStep::Removed(plant(20, 0).id)));
        assert_eq!(plants, vec![plant(10, 3)]);
    }

    #[test]
    fn shrink_is_independent_of_seed() {
        let start = vec![plant(1, 5), plant(2, 2), plant(3, 4), plant(4, 1)];
        let mut outcomes = Vec::new();

        for seed in [0, 1, 42, 9_999] {
            let ids = id_gen();
            let mut rec = reconciler(seed);
            let mut plants = start.clone();
            // mass 12 -> 5
            rec.reconcile(&mut plants, 50, &ids);
            outcomes.push(plants);
        }

        assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(outcomes[0], vec![plant(1, 5)]);
    }

    #[test]
    fn shrink_on_empty_garden_is_none() {
        let mut plants = Vec::new();
        assert_eq!(shrink_one(&mut plants), None);
    }

    #[test]
    fn full_population_must_level_up() {
        let rules = GardenRules { max_plant_count: 2, ..GardenRules::default() };
        let ids = id_gen();
        let mut rec = PlantReconciler::new(rules, StdRng::seed_from_u64(0));
        let mut plants = vec![plant(1, 1), plant(2, 1)];

        for _ in 0..8 {
            assert!(matches!(rec.grow_one(&mut plants, &ids), Some(GrowthStep::LeveledUp(_))));
        }
        assert_eq!(plants.len(), 2);
        assert_eq!(total_mass(&plants), 10);
    }

    #[test]
    fn maxed_plants_force_planting() {
        let rules = GardenRules { level_up_chance: 1.0, ..GardenRules::default() };
        let ids = id_gen();
        let mut rec = PlantReconciler::new(rules, StdRng::seed_from_u64(0));
        let mut plants = vec![plant(1, 5)];

        assert!(matches!(rec.grow_one(&mut plants, &ids), Some(GrowthStep::Planted(_))));
        assert_eq!(plants.len(), 2);
    }

    #[test]
    fn growth_prefers_level_up_at_the_configured_rate() {
        const TRIALS: u32 = 10_000;
        let ids = id_gen();
        let mut rec = reconciler(21);
        // 植え付けも level up も可能。3 番目は最大レベルなので対象外
        let start = vec![plant(1, 1), plant(2, 3), plant(3, 5)];
        let mut leveled_up = 0u32;
        let mut picks = [0u32; 3];

        for _ in 0..TRIALS {
            let mut plants = start.clone();
            match rec.grow_one(&mut plants, &ids) {
                Some(GrowthStep::LeveledUp(id)) => {
                    leveled_up += 1;
                    let index = start.iter().position(|p| p.id == id).unwrap();
                    picks[index] += 1;
                }
                Some(GrowthStep::Planted(_)) => assert_eq!(plants.len(), 4),
                None => panic!("growth is possible"),
            }
        }

        let share = f64::from(leveled_up) / f64::from(TRIALS);
        assert!((0.67..=0.73).contains(&share), "level-up share {share}");
        assert_eq!(picks[2], 0);
        for count in &picks[..2] {
            let target_share = f64::from(*count) / f64::from(leveled_up);
            assert!((0.45..=0.55).contains(&target_share), "picks {picks:?}");
        }
    }

    #[rstest]
    #[case::nan(f64::NAN, 0.7)]
    #[case::infinite(f64::INFINITY, 0.7)]
    #[case::above_one(3.0, 1.0)]
    #[case::negative(-1.0, 0.0)]
    fn out_of_range_chance_is_sanitized(#[case] chance: f64, #[case] expected: f64) {
        let rules = GardenRules { level_up_chance: chance, ..GardenRules::default() };
        let ids = id_gen();
        let mut rec = PlantReconciler::new(rules, StdRng::seed_from_u64(4));
        assert_eq!(rec.rules().level_up_chance, expected);

        let mut plants = vec![plant(1, 1)];
        assert!(rec.grow_one(&mut plants, &ids).is_some());
        assert_eq!(total_mass(&plants), 2);
    }

    #[test]
    fn saturation_stops_growth_early() {
        let rules = GardenRules { max_plant_count: 2, max_plant_level: 2, ..GardenRules::default() };
        let ids = id_gen();
        let mut rec = PlantReconciler::new(rules, StdRng::seed_from_u64(9));
        let mut plants = Vec::new();

        let report = rec.reconcile(&mut plants, 100, &ids);
        assert!(report.saturated);
        assert_eq!(total_mass(&plants), 4);
        assert_eq!(rec.grow_one(&mut plants, &ids), None);

        // 飽和から下がる時は通常どおり縮む
        rec.reconcile(&mut plants, 20, &ids);
        assert_eq!(total_mass(&plants), 2);
    }

    #[test]
    fn new_plants_sort_after_persisted_ones() {
        // 永続化済みの ID が時計より未来でも、新しい ID はその後ろに来る
        let far_future = plant(4_102_444_800_000, 5);
        let ids = id_gen();
        let mut rec = PlantReconciler::new(
            GardenRules { level_up_chance: 0.0, ..GardenRules::default() },
            StdRng::seed_from_u64(2),
        );
        let mut plants = vec![far_future.clone()];

        rec.reconcile(&mut plants, 70, &ids);

        assert_eq!(plants.len(), 3);
        assert!(plants[1].id > far_future.id);
        assert!(plants[2].id > plants[1].id);
        assert_eq!(newest(&plants).map(|p| p.id), Some(plants[2].id));
    }

    #[test]
    fn zero_points_per_unit_means_no_mass() {
        let rules = GardenRules { points_per_unit: 0, ..GardenRules::default() };
        assert_eq!(rules.target_units(500), 0);
    }
}

//! Spawn pacing: the per-tick obstacle/reward decision.
//!
//! Each tick the scheduler either forces a reward or rolls a die: one face
//! in `reward_roll_denominator` yields a reward, every other face an
//! obstacle. A reward is forced on the tick whose obstacle would bring the
//! streak up to the threshold, so the streak never reaches it and the
//! longest obstacle run is `threshold - 1`. Any reward resets the streak.
//!
//! The scheduler only decides. Timing, the running predicate, and handing
//! the decision to the object factory live in [`crate::session`].

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use spacerun_types::SpawnDecision;

use crate::config::PacingConfig;

/// Streak value that is never reached: the tick that would reach it spawns
/// a reward instead.
pub const REWARD_FORCE_THRESHOLD: u32 = 5;

/// Sides of the reward die. A roll of 0 yields a reward.
pub const REWARD_ROLL_DENOMINATOR: u32 = 6;

/// Source of uniform die rolls for the pacing rule.
pub trait RollSource: Send {
    /// Return a value in `[0, sides)`. `sides` is at least 1.
    fn roll(&mut self, sides: u32) -> u32;
}

/// Rolls drawn from any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RandomRolls<R> {
    rng: R,
}

impl<R: Rng + Send> RandomRolls<R> {
    /// Wrap a random number generator.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> RollSource for RandomRolls<R> {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rng.random_range(0..sides.max(1))
    }
}

/// Build the roll source described by the pacing configuration: seeded
/// when `pacing.seed` is set, entropy-seeded otherwise.
pub fn rolls_from_config(config: &PacingConfig) -> Box<dyn RollSource> {
    let rng = config
        .seed
        .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
    Box::new(RandomRolls::new(rng))
}

/// Replays a fixed list of rolls, then repeats a fallback value forever.
///
/// Useful for deterministic headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    queued: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedRolls {
    /// Replay `rolls` in order, then return `fallback`.
    pub fn new(rolls: impl IntoIterator<Item = u32>, fallback: u32) -> Self {
        Self {
            queued: rolls.into_iter().collect(),
            fallback,
        }
    }

    /// Always return the same value.
    pub fn constant(value: u32) -> Self {
        Self::new([], value)
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self, sides: u32) -> u32 {
        let raw = self.queued.pop_front().unwrap_or(self.fallback);
        raw.checked_rem(sides).unwrap_or(0)
    }
}

/// Parameters of the pacing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingRule {
    /// Streak value that is never reached: the decision that would reach it
    /// is a forced reward, so at most `threshold - 1` obstacles run in a row.
    pub reward_force_threshold: u32,
    /// Sides of the reward die.
    pub reward_roll_denominator: u32,
}

impl PacingRule {
    /// Build the rule from validated configuration.
    pub const fn from_config(config: &PacingConfig) -> Self {
        Self {
            reward_force_threshold: config.reward_force_threshold,
            reward_roll_denominator: config.reward_roll_denominator,
        }
    }
}

impl Default for PacingRule {
    fn default() -> Self {
        Self {
            reward_force_threshold: REWARD_FORCE_THRESHOLD,
            reward_roll_denominator: REWARD_ROLL_DENOMINATOR,
        }
    }
}

/// Obstacle/reward decision state for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnScheduler {
    rule: PacingRule,
    obstacle_streak: u32,
    ticks: u64,
}

impl SpawnScheduler {
    /// Create a scheduler with an empty streak.
    pub const fn new(rule: PacingRule) -> Self {
        Self {
            rule,
            obstacle_streak: 0,
            ticks: 0,
        }
    }

    /// Consecutive obstacles since the last reward.
    pub const fn obstacle_streak(&self) -> u32 {
        self.obstacle_streak
    }

    /// Number of decisions made so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Forget the streak and tick count, keeping the rule.
    pub const fn reset(&mut self) {
        self.obstacle_streak = 0;
        self.ticks = 0;
    }

    /// Make one spawn decision.
    ///
    /// The die is only rolled when no reward is forced.
    pub fn decide(&mut self, rolls: &mut dyn RollSource) -> SpawnDecision {
        self.ticks = self.ticks.saturating_add(1);

        if self.obstacle_streak.saturating_add(1) >= self.rule.reward_force_threshold {
            self.obstacle_streak = 0;
            return SpawnDecision::Reward;
        }

        if rolls.roll(self.rule.reward_roll_denominator) == 0 {
            self.obstacle_streak = 0;
            SpawnDecision::Reward
        } else {
            self.obstacle_streak = self.obstacle_streak.saturating_add(1);
            SpawnDecision::Obstacle
        }
    }
}

impl Default for SpawnScheduler {
    fn default() -> Self {
        Self::new(PacingRule::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(
        scheduler: &mut SpawnScheduler,
        rolls: &mut dyn RollSource,
        n: usize,
    ) -> Vec<SpawnDecision> {
        (0..n).map(|_| scheduler.decide(rolls)).collect()
    }

    #[test]
    fn never_rolling_zero_forces_every_fifth() {
        let mut scheduler = SpawnScheduler::default();
        let mut rolls = ScriptedRolls::constant(3);
        let decisions = run(&mut scheduler, &mut rolls, 20);

        let rewards = decisions.iter().filter(|d| d.is_reward()).count();
        let obstacles = decisions.len().saturating_sub(rewards);
        assert_eq!(rewards, 4);
        assert_eq!(obstacles, 16);

        for (i, decision) in decisions.iter().enumerate() {
            let expected = if i % 5 == 4 {
                SpawnDecision::Reward
            } else {
                SpawnDecision::Obstacle
            };
            assert_eq!(*decision, expected, "decision {i}");
        }
    }

    #[test]
    fn zero_roll_yields_reward_and_resets_streak() {
        let mut scheduler = SpawnScheduler::default();
        let mut rolls = ScriptedRolls::new([2, 4, 0, 1], 1);

        assert_eq!(scheduler.decide(&mut rolls), SpawnDecision::Obstacle);
        assert_eq!(scheduler.decide(&mut rolls), SpawnDecision::Obstacle);
        assert_eq!(scheduler.obstacle_streak(), 2);
        assert_eq!(scheduler.decide(&mut rolls), SpawnDecision::Reward);
        assert_eq!(scheduler.obstacle_streak(), 0);
        assert_eq!(scheduler.decide(&mut rolls), SpawnDecision::Obstacle);
        assert_eq!(scheduler.obstacle_streak(), 1);
        assert_eq!(scheduler.ticks(), 4);
    }

    #[test]
    fn forced_reward_does_not_consume_a_roll() {
        let mut scheduler = SpawnScheduler::default();
        // Four obstacles, then the forced reward must leave the queued 0
        // for the following tick.
        let mut rolls = ScriptedRolls::new([1, 1, 1, 1, 0], 1);
        let decisions = run(&mut scheduler, &mut rolls, 6);
        assert_eq!(decisions.get(4), Some(&SpawnDecision::Reward));
        assert_eq!(decisions.get(5), Some(&SpawnDecision::Reward));
        assert_eq!(scheduler.obstacle_streak(), 0);
    }

    #[test]
    fn streak_stays_below_threshold_for_random_rolls() {
        for seed in 0..64_u64 {
            let mut scheduler = SpawnScheduler::default();
            let mut rolls = RandomRolls::new(SmallRng::seed_from_u64(seed));
            for _ in 0..500 {
                let _ = scheduler.decide(&mut rolls);
                assert!(scheduler.obstacle_streak() < REWARD_FORCE_THRESHOLD);
            }
        }
    }

    #[test]
    fn obstacle_runs_are_bounded() {
        for seed in 0..64_u64 {
            let mut scheduler = SpawnScheduler::default();
            let mut rolls = RandomRolls::new(SmallRng::seed_from_u64(seed));
            let decisions = run(&mut scheduler, &mut rolls, 500);

            let mut run_length = 0_u32;
            for decision in &decisions {
                match decision {
                    SpawnDecision::Obstacle => {
                        run_length = run_length.saturating_add(1);
                        assert!(run_length < REWARD_FORCE_THRESHOLD, "seed {seed}");
                    }
                    SpawnDecision::Reward => run_length = 0,
                }
            }
        }
    }

    #[test]
    fn random_rolls_produce_both_outcomes() {
        let mut scheduler = SpawnScheduler::default();
        let mut rolls = RandomRolls::new(SmallRng::seed_from_u64(42));
        let decisions = run(&mut scheduler, &mut rolls, 200);
        assert!(decisions.iter().any(|d| d.is_reward()));
        assert!(decisions.iter().any(|d| !d.is_reward()));
    }

    #[test]
    fn custom_threshold() {
        let mut scheduler = SpawnScheduler::new(PacingRule {
            reward_force_threshold: 3,
            reward_roll_denominator: 6,
        });
        let mut rolls = ScriptedRolls::constant(5);
        let decisions = run(&mut scheduler, &mut rolls, 6);
        assert_eq!(
            decisions,
            vec![
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Reward,
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Reward,
            ]
        );
    }

    #[test]
    fn configured_threshold_caps_obstacle_run_one_below() {
        let yaml = "pacing:\n  reward_force_threshold: 4\n";
        let config = crate::config::SessionConfig::parse(yaml).unwrap().pacing;
        let mut scheduler = SpawnScheduler::new(PacingRule::from_config(&config));
        let mut rolls = ScriptedRolls::constant(1);
        let decisions = run(&mut scheduler, &mut rolls, 8);

        // Three obstacles in a row, never four.
        assert_eq!(
            decisions,
            vec![
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Reward,
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Obstacle,
                SpawnDecision::Reward,
            ]
        );
    }

    #[test]
    fn reset_clears_streak() {
        let mut scheduler = SpawnScheduler::default();
        let mut rolls = ScriptedRolls::constant(2);
        let _ = run(&mut scheduler, &mut rolls, 3);
        assert_eq!(scheduler.obstacle_streak(), 3);
        scheduler.reset();
        assert_eq!(scheduler.obstacle_streak(), 0);
        assert_eq!(scheduler.ticks(), 0);
    }

    #[test]
    fn seeded_config_is_reproducible() {
        let config = PacingConfig {
            seed: Some(99),
            ..PacingConfig::default()
        };
        let mut a = rolls_from_config(&config);
        let mut b = rolls_from_config(&config);
        let mut first = SpawnScheduler::default();
        let mut second = SpawnScheduler::default();
        let left = run(&mut first, a.as_mut(), 100);
        let right = run(&mut second, b.as_mut(), 100);
        assert_eq!(left, right);
    }

    #[test]
    fn scripted_rolls_stay_in_range() {
        let mut rolls = ScriptedRolls::new([13], 6);
        assert_eq!(rolls.roll(6), 1);
        assert_eq!(rolls.roll(6), 0);
    }
}

//! Object factory that logs instead of building entities.

use spacerun_core::factory::ObjectFactory;
use spacerun_types::{SpawnDecision, SpawnPoint};
use tracing::info;

/// Logs every spawn request and counts them by kind.
#[derive(Debug, Default)]
pub struct LoggingFactory {
    obstacles: u64,
    rewards: u64,
}

impl LoggingFactory {
    /// Create a factory with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectFactory for LoggingFactory {
    fn spawn(&mut self, decision: SpawnDecision, point: SpawnPoint) {
        let count = match decision {
            SpawnDecision::Obstacle => &mut self.obstacles,
            SpawnDecision::Reward => &mut self.rewards,
        };
        *count = count.saturating_add(1);
        info!(
            ?decision,
            x = point.x,
            y = point.y,
            obstacles = self.obstacles,
            rewards = self.rewards,
            "Spawned"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let mut factory = LoggingFactory::new();
        for decision in [
            SpawnDecision::Obstacle,
            SpawnDecision::Obstacle,
            SpawnDecision::Reward,
        ] {
            factory.spawn(decision, SpawnPoint::default());
        }
        assert_eq!(factory.obstacles, 2);
        assert_eq!(factory.rewards, 1);
    }
}

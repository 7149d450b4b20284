//! Transition storage for a single rollout
//!
//! Stores the transitions of one episode as parallel arrays. The trajectory
//! is built incrementally during rollout collection, consumed once by the
//! advantage estimator and the PPO update, then discarded.

/// Ordered transition storage for one rollout
///
/// Each index t holds (observation, action, reward, value estimate,
/// log probability, done) for the same timestep. Actions are stored in the
/// raw form used for log-probability evaluation: the pre-scale sample for
/// continuous policies, the action index (as f32) for discrete ones.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    observations: Vec<Vec<f32>>,
    actions: Vec<f32>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    log_probs: Vec<f32>,
    dones: Vec<bool>,
}

impl Trajectory {
    /// Create an empty trajectory with room for `capacity` transitions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            log_probs: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
        }
    }

    /// Append one transition
    pub fn push(
        &mut self,
        observation: Vec<f32>,
        action: f32,
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) {
        self.observations.push(observation);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);
        self.log_probs.push(log_prob);
        self.dones.push(done);
    }

    /// Number of stored transitions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the trajectory is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Stored observations, one per timestep
    pub fn observations(&self) -> &[Vec<f32>] {
        &self.observations
    }

    /// Raw actions, one per timestep
    pub fn actions(&self) -> &[f32] {
        &self.actions
    }

    /// Rewards, one per timestep
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Value estimates recorded at collection time
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Log probabilities of the taken actions under the rollout policy
    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    /// Done flags, one per timestep
    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    /// Flatten observations into a single `[len * obs_dim]` array
    pub fn flat_observations(&self) -> Vec<f32> {
        let obs_dim = self.observations.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(self.len() * obs_dim);
        for obs in &self.observations {
            flat.extend_from_slice(obs);
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_access() {
        let mut traj = Trajectory::with_capacity(4);
        traj.push(vec![0.1, 0.2], 1.0, 0.5, 0.9, -0.7, false);
        traj.push(vec![0.3, 0.4], -1.0, -1.0, 0.1, -0.2, true);

        assert_eq!(traj.len(), 2);
        assert!(!traj.is_empty());
        assert_eq!(traj.actions(), &[1.0, -1.0]);
        assert_eq!(traj.rewards(), &[0.5, -1.0]);
        assert_eq!(traj.dones(), &[false, true]);
        assert_eq!(traj.flat_observations(), vec![0.1, 0.2, 0.3, 0.4]);
    }
}

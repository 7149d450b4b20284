//! PPO configuration and hyperparameters
//!
//! This module defines the configuration parameters for PPO training
//! and provides validation and builder pattern methods.

use anyhow::{anyhow, Result};

/// PPO configuration parameters
///
/// These hyperparameters control the PPO training process. The actor and
/// critic are optimized separately, each with its own learning rate.
#[derive(Debug, Clone)]
pub struct PPOConfig {
    /// Learning rate for the actor network
    pub actor_lr: f64,

    /// Learning rate for the critic network
    pub critic_lr: f64,

    /// Number of training epochs per trajectory
    pub n_epochs: usize,

    /// Minibatch size for training
    pub batch_size: usize,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// GAE lambda parameter
    pub gae_lambda: f64,

    /// PPO clipping parameter (epsilon)
    pub clip_range: f64,

    /// Value function loss coefficient
    pub vf_coef: f64,

    /// Entropy bonus coefficient
    pub ent_coef: f64,

    /// Gradient norm above which gradients are rescaled
    pub max_grad_norm: f64,

    /// Gradient norm above which the minibatch update is skipped entirely
    pub grad_norm_hard_limit: f64,

    /// Step budget per episode; episodes are truncated past this
    pub max_steps_per_episode: usize,

    /// Number of recent episodes in the rolling reward average
    pub reward_window: usize,

    /// Episodes between periodic checkpoints
    pub checkpoint_interval: usize,

    /// Master seed; the environment, action sampler and minibatch shuffler
    /// derive their own streams from it
    pub seed: u64,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            actor_lr: 3e-4,
            critic_lr: 1e-4,
            n_epochs: 10,
            batch_size: 64,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.01,
            max_grad_norm: 0.5,
            grad_norm_hard_limit: 5.0,
            max_steps_per_episode: 2000,
            reward_window: 100,
            checkpoint_interval: 10,
            seed: 42,
        }
    }
}

impl PPOConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.actor_lr <= 0.0 {
            return Err(anyhow!("actor_lr must be positive"));
        }
        if self.critic_lr <= 0.0 {
            return Err(anyhow!("critic_lr must be positive"));
        }
        if self.n_epochs == 0 {
            return Err(anyhow!("n_epochs must be positive"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(anyhow!("gamma must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(anyhow!("gae_lambda must be in [0, 1]"));
        }
        if self.clip_range <= 0.0 {
            return Err(anyhow!("clip_range must be positive"));
        }
        if self.vf_coef < 0.0 {
            return Err(anyhow!("vf_coef must be non-negative"));
        }
        if self.ent_coef < 0.0 {
            return Err(anyhow!("ent_coef must be non-negative"));
        }
        if self.max_grad_norm <= 0.0 {
            return Err(anyhow!("max_grad_norm must be positive"));
        }
        if self.grad_norm_hard_limit < self.max_grad_norm {
            return Err(anyhow!("grad_norm_hard_limit must be at least max_grad_norm"));
        }
        if self.max_steps_per_episode == 0 {
            return Err(anyhow!("max_steps_per_episode must be positive"));
        }
        if self.reward_window == 0 {
            return Err(anyhow!("reward_window must be positive"));
        }
        if self.checkpoint_interval == 0 {
            return Err(anyhow!("checkpoint_interval must be positive"));
        }
        Ok(())
    }

    /// Set actor learning rate
    pub fn actor_lr(mut self, lr: f64) -> Self {
        self.actor_lr = lr;
        self
    }

    /// Set critic learning rate
    pub fn critic_lr(mut self, lr: f64) -> Self {
        self.critic_lr = lr;
        self
    }

    /// Set number of training epochs
    pub fn n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set minibatch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn gae_lambda(mut self, lambda: f64) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set PPO clipping parameter
    pub fn clip_range(mut self, clip: f64) -> Self {
        self.clip_range = clip;
        self
    }

    /// Set value function loss coefficient
    pub fn vf_coef(mut self, coef: f64) -> Self {
        self.vf_coef = coef;
        self
    }

    /// Set entropy bonus coefficient
    pub fn ent_coef(mut self, coef: f64) -> Self {
        self.ent_coef = coef;
        self
    }

    /// Set the rescaling gradient norm threshold
    pub fn max_grad_norm(mut self, norm: f64) -> Self {
        self.max_grad_norm = norm;
        self
    }

    /// Set the skip-update gradient norm ceiling
    pub fn grad_norm_hard_limit(mut self, norm: f64) -> Self {
        self.grad_norm_hard_limit = norm;
        self
    }

    /// Set per-episode step budget
    pub fn max_steps_per_episode(mut self, steps: usize) -> Self {
        self.max_steps_per_episode = steps;
        self
    }

    /// Set rolling reward window size
    pub fn reward_window(mut self, window: usize) -> Self {
        self.reward_window = window;
        self
    }

    /// Set episodes between periodic checkpoints
    pub fn checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set master seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

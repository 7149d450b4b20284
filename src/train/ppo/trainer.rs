//! PPO training loop
//!
//! The trainer owns the actor-critic model, one Adam optimizer per network,
//! and the checkpoint manager. Each iteration collects a single-episode
//! trajectory, computes GAE advantages, then runs several epochs of shuffled
//! minibatch updates with gradient guarding.
//!
//! # Gradient guard
//!
//! Before every optimizer step the trainer inspects the freshly computed
//! gradients: non-finite components are zeroed, then the global norm over
//! actor and critic parameters is measured. A norm above the hard limit
//! skips the step entirely, leaving parameters untouched; a norm above
//! `max_grad_norm` is rescaled down to it. A non-finite total loss skips
//! the minibatch before any backward pass.

use std::collections::VecDeque;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tch::{Kind, Tensor};
use tracing::{info, warn};

use super::config::PPOConfig;
use super::loss::{
    compute_entropy_loss, compute_policy_loss, compute_value_loss, generate_minibatch_indices,
};
use super::stats::TrainingStats;
use crate::buffer::{compute_gae, normalize_advantages, Trajectory};
use crate::checkpoint::{CheckpointManager, CheckpointMeta, CheckpointTag};
use crate::env::Environment;
use crate::policy::ActorCritic;

/// PPO trainer for a single-environment, episode-at-a-time loop
pub struct PPOTrainer {
    config: PPOConfig,
    policy: ActorCritic,
    actor_opt: tch::nn::Optimizer,
    critic_opt: tch::nn::Optimizer,
    checkpoints: CheckpointManager,
    sample_rng: StdRng,
    shuffle_rng: StdRng,
    reward_history: VecDeque<f32>,
    best_avg_reward: f64,
    total_steps: usize,
    total_episodes: usize,
}

impl PPOTrainer {
    /// Create a new PPO trainer
    ///
    /// Action sampling and minibatch shuffling get their own rng streams,
    /// derived from the master seed so a run is reproducible end to end.
    pub fn new(
        config: PPOConfig,
        policy: ActorCritic,
        checkpoints: CheckpointManager,
    ) -> Result<Self> {
        config.validate()?;

        let actor_opt = policy.actor_optimizer(config.actor_lr)?;
        let critic_opt = policy.critic_optimizer(config.critic_lr)?;
        let sample_rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let shuffle_rng = StdRng::seed_from_u64(config.seed.wrapping_add(2));
        let reward_history = VecDeque::with_capacity(config.reward_window);

        Ok(Self {
            config,
            policy,
            actor_opt,
            critic_opt,
            checkpoints,
            sample_rng,
            shuffle_rng,
            reward_history,
            best_avg_reward: f64::NEG_INFINITY,
            total_steps: 0,
            total_episodes: 0,
        })
    }

    /// Get reference to the policy
    pub fn policy(&self) -> &ActorCritic {
        &self.policy
    }

    /// Get the configuration
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    /// Total environment steps taken
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Total episodes completed
    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    /// Rolling-average reward the `best` checkpoint must be beaten at
    pub fn best_average_reward(&self) -> f64 {
        self.best_avg_reward
    }

    /// Rolling average reward over the recent episode window
    pub fn average_reward(&self) -> f64 {
        if self.reward_history.is_empty() {
            return 0.0;
        }
        self.reward_history.iter().map(|&r| r as f64).sum::<f64>()
            / self.reward_history.len() as f64
    }

    /// Resume from the latest checkpoint if one exists
    ///
    /// Restores actor and critic parameters, the episode and step counters,
    /// and the reward bar the `best` checkpoint was saved at, so a resumed
    /// run cannot overwrite `best` with a worse policy. Returns `Ok(None)`
    /// when no checkpoint has been written yet.
    pub fn resume_from_latest(&mut self) -> Result<Option<CheckpointMeta>> {
        let meta = self.checkpoints.load(&CheckpointTag::Latest, &mut self.policy)?;
        if let Some(meta) = &meta {
            self.total_episodes = meta.episode as usize;
            self.total_steps = meta.total_steps as usize;
            self.best_avg_reward = match self.checkpoints.read_meta(&CheckpointTag::Best)? {
                Some(best) => best.avg_reward as f64,
                None => meta.avg_reward as f64,
            };
        }
        Ok(meta)
    }

    /// Collect one episode of experience with the current policy
    ///
    /// Runs until the environment reports `done` or the per-episode step
    /// budget is exhausted. Returns the trajectory, the bootstrap value for
    /// GAE (the critic's estimate of the final observation when the episode
    /// was truncated, zero when it terminated) and the episode reward.
    pub fn collect_rollout<E>(&mut self, env: &mut E) -> Result<(Trajectory, f32, f32)>
    where
        E: Environment<Observation = Vec<f32>, Action = f32>,
    {
        let mut trajectory = Trajectory::with_capacity(self.config.max_steps_per_episode);
        let mut obs = env.reset()?;
        let mut episode_reward = 0.0;

        for _ in 0..self.config.max_steps_per_episode {
            let sample = self.policy.sample_action(&obs, &mut self.sample_rng)?;
            let step = env.step(sample.env_action)?;

            trajectory.push(obs, sample.raw, step.reward, sample.value, sample.log_prob, step.done);
            episode_reward += step.reward;
            obs = step.observation;
            self.total_steps += 1;

            if step.done {
                return Ok((trajectory, 0.0, episode_reward));
            }
        }

        // Truncated by the step budget: the episode would have continued, so
        // bootstrap the advantage recursion from the critic
        let bootstrap = self.policy.value(&obs)?;
        Ok((trajectory, bootstrap, episode_reward))
    }

    /// Run one PPO update over a collected trajectory
    pub fn update(&mut self, trajectory: &Trajectory, bootstrap_value: f32) -> Result<TrainingStats> {
        if trajectory.is_empty() {
            anyhow::bail!("cannot update from an empty trajectory");
        }

        let (mut advantages, returns) = compute_gae(
            trajectory.rewards(),
            trajectory.values(),
            trajectory.dones(),
            bootstrap_value,
            self.config.gamma as f32,
            self.config.gae_lambda as f32,
        );
        // Normalized once over the whole trajectory, not per minibatch
        normalize_advantages(&mut advantages);

        let device = self.policy.device();
        let n = trajectory.len();
        let obs = Tensor::from_slice(&trajectory.flat_observations())
            .view([n as i64, -1])
            .to_device(device);
        let actions = Tensor::from_slice(trajectory.actions()).to_device(device);
        let old_log_probs = Tensor::from_slice(trajectory.log_probs()).to_device(device);
        let advantages = Tensor::from_slice(&advantages).to_device(device);
        let returns = Tensor::from_slice(&returns).to_device(device);

        let mut total = TrainingStats::zeros();

        for _epoch in 0..self.config.n_epochs {
            let batches = generate_minibatch_indices(n, self.config.batch_size, &mut self.shuffle_rng);

            for indices in &batches {
                let indices_i64: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
                let idx = Tensor::from_slice(&indices_i64).to_device(device);

                let mb_obs = obs.index_select(0, &idx);
                let mb_actions = actions.index_select(0, &idx);
                let mb_old_log_probs = old_log_probs.index_select(0, &idx);
                let mb_advantages = advantages.index_select(0, &idx);
                let mb_returns = returns.index_select(0, &idx);

                let (log_probs, entropy, values) =
                    self.policy.evaluate_actions(&mb_obs, &mb_actions);

                let (policy_loss, clip_fraction, approx_kl) = compute_policy_loss(
                    &log_probs,
                    &mb_old_log_probs,
                    &mb_advantages,
                    self.config.clip_range,
                );
                let (value_loss, explained_var) = compute_value_loss(&values, &mb_returns);
                let entropy_loss = compute_entropy_loss(&entropy);

                let policy_loss_val = f64::try_from(&policy_loss).unwrap_or(f64::NAN);
                let value_loss_val = f64::try_from(&value_loss).unwrap_or(f64::NAN);
                let entropy_val = f64::try_from(&entropy).unwrap_or(f64::NAN);

                let loss = &policy_loss
                    + self.config.vf_coef * &value_loss
                    + self.config.ent_coef * &entropy_loss;
                let total_loss_val = f64::try_from(&loss).unwrap_or(f64::NAN);

                if !total_loss_val.is_finite() {
                    warn!(
                        policy_loss = policy_loss_val,
                        value_loss = value_loss_val,
                        "non-finite loss, skipping minibatch"
                    );
                    total.skipped_minibatches += 1;
                    continue;
                }

                self.actor_opt.zero_grad();
                self.critic_opt.zero_grad();
                loss.backward();

                let grad_norm = self.guard_gradients();
                if grad_norm > self.config.grad_norm_hard_limit {
                    warn!(
                        grad_norm,
                        hard_limit = self.config.grad_norm_hard_limit,
                        "gradient norm above hard limit, skipping minibatch"
                    );
                    total.skipped_minibatches += 1;
                    continue;
                }
                if grad_norm > self.config.max_grad_norm {
                    self.scale_gradients(self.config.max_grad_norm / (grad_norm + 1e-6));
                }

                self.actor_opt.step();
                self.critic_opt.step();

                total += &TrainingStats {
                    policy_loss: policy_loss_val,
                    value_loss: value_loss_val,
                    entropy: entropy_val,
                    total_loss: total_loss_val,
                    clip_fraction,
                    approx_kl,
                    explained_var,
                    grad_norm,
                    skipped_minibatches: 0,
                    num_updates: 1,
                };
            }
        }

        Ok(total.average())
    }

    /// Run the full training loop for `n_episodes` episodes
    ///
    /// Per episode: collect, update, log, and maintain the rolling reward
    /// average. A new best rolling average writes the `best` checkpoint;
    /// every `checkpoint_interval` episodes write `episode_<n>` and `latest`.
    /// Checkpoint I/O failures are logged and do not stop training.
    pub fn run<E>(&mut self, env: &mut E, n_episodes: usize) -> Result<()>
    where
        E: Environment<Observation = Vec<f32>, Action = f32>,
    {
        info!(
            episodes = n_episodes,
            seed = self.config.seed,
            dir = %self.checkpoints.dir().display(),
            "starting training"
        );

        for _ in 0..n_episodes {
            let (trajectory, bootstrap, episode_reward) = self.collect_rollout(env)?;
            let steps = trajectory.len();
            let stats = self.update(&trajectory, bootstrap)?;
            self.total_episodes += 1;
            let episode = self.total_episodes;

            if self.reward_history.len() == self.config.reward_window {
                self.reward_history.pop_front();
            }
            self.reward_history.push_back(episode_reward);
            let avg_reward = self.average_reward();

            info!(
                episode,
                steps,
                reward = episode_reward,
                avg_reward,
                policy_loss = stats.policy_loss,
                value_loss = stats.value_loss,
                entropy = stats.entropy,
                clip_fraction = stats.clip_fraction,
                skipped = stats.skipped_minibatches,
                "episode complete"
            );

            if avg_reward > self.best_avg_reward {
                self.best_avg_reward = avg_reward;
                self.save_checkpoint(&CheckpointTag::Best, avg_reward);
            }
            if episode % self.config.checkpoint_interval == 0 {
                self.save_checkpoint(&CheckpointTag::Episode(episode as u64), avg_reward);
                self.save_checkpoint(&CheckpointTag::Latest, avg_reward);
            }
        }

        self.save_checkpoint(&CheckpointTag::Latest, self.average_reward());
        Ok(())
    }

    fn save_checkpoint(&self, tag: &CheckpointTag, avg_reward: f64) {
        let meta = CheckpointMeta {
            episode: self.total_episodes as u64,
            total_steps: self.total_steps as u64,
            avg_reward: avg_reward as f32,
            saved_at: chrono::Utc::now(),
            version: crate::VERSION.to_string(),
        };
        if let Err(err) = self.checkpoints.save(tag, &self.policy, &meta) {
            warn!(tag = %tag, error = %err, "checkpoint save failed, continuing");
        }
    }

    /// Zero non-finite gradient components and return the global norm
    fn guard_gradients(&self) -> f64 {
        tch::no_grad(|| {
            let mut squared_sum = 0.0;
            for var in self.gradient_variables() {
                let mut grad = var.grad();
                if grad.defined() {
                    let _ = grad.nan_to_num_(0.0, 0.0, 0.0);
                    squared_sum += f64::try_from(grad.square().sum(Kind::Float)).unwrap_or(0.0);
                }
            }
            squared_sum.sqrt()
        })
    }

    /// Multiply every gradient in place by `scale`
    fn scale_gradients(&self, scale: f64) {
        tch::no_grad(|| {
            for var in self.gradient_variables() {
                let mut grad = var.grad();
                if grad.defined() {
                    let _ = grad.g_mul_scalar_(scale);
                }
            }
        });
    }

    fn gradient_variables(&self) -> impl Iterator<Item = Tensor> {
        self.policy
            .actor_vs()
            .trainable_variables()
            .into_iter()
            .chain(self.policy.critic_vs().trainable_variables())
    }
}

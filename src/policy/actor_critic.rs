//! Actor-critic model for the paddle policy
//!
//! Two independent networks built with tch-rs: the actor maps an observation
//! to action-distribution parameters, the critic maps the same observation to
//! a scalar value estimate. Each lives in its own `nn::VarStore` so actor and
//! critic parameters can be saved and loaded independently.
//!
//! # Architecture
//!
//! ```text
//! Observation
//!     |                          |
//! [Dense(h)] - act           [Dense(h)] - act
//!     |                          |
//! [Dense(h)] - act           [Dense(h)] - act
//!     |                          |
//!  Actor head                [Dense(1)]
//!  (logits, or tanh-mean         |
//!   + clamped std)            Value
//! ```
//!
//! The Gaussian head bounds its mean into [-1, 1] with tanh and clamps the
//! standard deviation into a configured band after exponentiation, so a
//! non-finite std or probability cannot be produced.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use tch::nn::{self, Init, Module, OptimizerConfig};
use tch::{Device, Kind, Tensor};

use crate::env::pong::OBS_DIM;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Action representation, committed at construction time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionSpace {
    /// Fixed set of n paddle velocities spread evenly over [-1, 1]
    Discrete(usize),

    /// Single continuous paddle velocity in [-1, 1] before scaling
    Continuous,
}

/// Hidden-layer activation
#[derive(Debug, Clone, Copy)]
pub enum Activation {
    /// Rectified linear unit
    ReLU,
    /// Hyperbolic tangent
    Tanh,
}

/// Configuration for the actor-critic model
#[derive(Debug, Clone)]
pub struct ActorCriticConfig {
    /// Observation dimensionality
    pub obs_dim: i64,

    /// Width of the two hidden layers
    pub hidden_dim: i64,

    /// Action representation
    pub action_space: ActionSpace,

    /// Multiplier mapping the unit-range action to a paddle velocity
    pub action_scale: f32,

    /// (min, max) band the Gaussian std is clamped into after exponentiation
    pub std_bounds: (f64, f64),

    /// Hidden-layer activation
    pub activation: Activation,

    /// Orthogonal weight initialization for hidden layers
    pub use_orthogonal_init: bool,
}

impl Default for ActorCriticConfig {
    fn default() -> Self {
        Self {
            obs_dim: OBS_DIM as i64,
            hidden_dim: 64,
            action_space: ActionSpace::Continuous,
            action_scale: 1.0,
            std_bounds: (0.05, 1.0),
            activation: Activation::ReLU,
            use_orthogonal_init: true,
        }
    }
}

impl ActorCriticConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.obs_dim <= 0 {
            anyhow::bail!("obs_dim must be positive");
        }
        if self.hidden_dim <= 0 {
            anyhow::bail!("hidden_dim must be positive");
        }
        if let ActionSpace::Discrete(n) = self.action_space {
            if n < 2 {
                anyhow::bail!("discrete action space needs at least 2 actions");
            }
        }
        if self.action_scale <= 0.0 {
            anyhow::bail!("action_scale must be positive");
        }
        let (min_std, max_std) = self.std_bounds;
        if min_std <= 0.0 || max_std <= min_std {
            anyhow::bail!("std_bounds must satisfy 0 < min < max");
        }
        Ok(())
    }
}

/// One sampled action together with its training bookkeeping
#[derive(Debug, Clone, Copy)]
pub struct SampledAction {
    /// Paddle velocity to hand to the environment
    pub env_action: f32,

    /// Raw sample for log-probability evaluation (index for discrete heads)
    pub raw: f32,

    /// Log probability of the sample under current parameters
    pub log_prob: f32,

    /// Critic value estimate of the observation
    pub value: f32,
}

enum ActorHead {
    Logits(nn::Linear),
    Gaussian { mu: nn::Linear, log_std: nn::Linear },
}

enum ActorOutput {
    Logits(Tensor),
    Gaussian { mu: Tensor, std: Tensor },
}

/// Actor-critic model with independently checkpointable networks
pub struct ActorCritic {
    actor_vs: nn::VarStore,
    critic_vs: nn::VarStore,
    actor_trunk: nn::Sequential,
    actor_head: ActorHead,
    critic_net: nn::Sequential,
    device: Device,
    config: ActorCriticConfig,
}

fn trunk(
    root: &nn::Path,
    obs_dim: i64,
    hidden_dim: i64,
    activation: Activation,
    linear_config: nn::LinearConfig,
) -> nn::Sequential {
    let act = move |x: &Tensor| match activation {
        Activation::ReLU => x.relu(),
        Activation::Tanh => x.tanh(),
    };
    nn::seq()
        .add(nn::linear(root / "fc1", obs_dim, hidden_dim, linear_config))
        .add_fn(move |x| act(x))
        .add(nn::linear(root / "fc2", hidden_dim, hidden_dim, linear_config))
        .add_fn(move |x| act(x))
}

impl ActorCritic {
    /// Create a new actor-critic model
    ///
    /// Fails fast if the configuration is invalid.
    pub fn new(config: ActorCriticConfig) -> Result<Self> {
        config.validate()?;

        let device = Device::cuda_if_available();
        let actor_vs = nn::VarStore::new(device);
        let critic_vs = nn::VarStore::new(device);

        let hidden_init = if config.use_orthogonal_init {
            Init::Orthogonal { gain: 2.0_f64.sqrt() }
        } else {
            Init::Randn { mean: 0.0, stdev: 0.01 }
        };
        let output_init = if config.use_orthogonal_init {
            Init::Orthogonal { gain: 0.01 }
        } else {
            Init::Randn { mean: 0.0, stdev: 0.01 }
        };

        let hidden_config = nn::LinearConfig { ws_init: hidden_init, ..Default::default() };
        let output_config = nn::LinearConfig { ws_init: output_init, ..Default::default() };

        let actor_root = actor_vs.root();
        let actor_trunk = trunk(
            &(&actor_root / "trunk"),
            config.obs_dim,
            config.hidden_dim,
            config.activation,
            hidden_config,
        );
        let actor_head = match config.action_space {
            ActionSpace::Discrete(n) => ActorHead::Logits(nn::linear(
                &actor_root / "logits",
                config.hidden_dim,
                n as i64,
                output_config,
            )),
            ActionSpace::Continuous => ActorHead::Gaussian {
                mu: nn::linear(&actor_root / "mu", config.hidden_dim, 1, output_config),
                log_std: nn::linear(&actor_root / "log_std", config.hidden_dim, 1, output_config),
            },
        };

        let critic_root = critic_vs.root();
        let critic_net = trunk(
            &(&critic_root / "trunk"),
            config.obs_dim,
            config.hidden_dim,
            config.activation,
            hidden_config,
        )
        .add(nn::linear(&critic_root / "value", config.hidden_dim, 1, output_config));

        Ok(Self { actor_vs, critic_vs, actor_trunk, actor_head, critic_net, device, config })
    }

    /// Device the model lives on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Model configuration
    pub fn config(&self) -> &ActorCriticConfig {
        &self.config
    }

    /// Actor variable store
    pub fn actor_vs(&self) -> &nn::VarStore {
        &self.actor_vs
    }

    /// Critic variable store
    pub fn critic_vs(&self) -> &nn::VarStore {
        &self.critic_vs
    }

    fn forward_actor(&self, obs: &Tensor) -> ActorOutput {
        let features = self.actor_trunk.forward(obs);
        match &self.actor_head {
            ActorHead::Logits(head) => ActorOutput::Logits(head.forward(&features)),
            ActorHead::Gaussian { mu, log_std } => {
                let (min_std, max_std) = self.config.std_bounds;
                let mu = mu.forward(&features).tanh().squeeze_dim(-1);
                // Clamp after exponentiation so the std can neither collapse
                // nor explode
                let std = log_std.forward(&features).exp().clamp(min_std, max_std).squeeze_dim(-1);
                ActorOutput::Gaussian { mu, std }
            }
        }
    }

    /// Critic forward pass: `[batch, obs_dim]` -> `[batch]`
    pub fn values(&self, obs: &Tensor) -> Tensor {
        self.critic_net.forward(obs).squeeze_dim(-1)
    }

    /// Critic value estimate for a single observation
    pub fn value(&self, obs: &[f32]) -> Result<f32> {
        let obs_t = self.obs_tensor(obs);
        let value = tch::no_grad(|| self.values(&obs_t));
        scalar(&value)
    }

    fn obs_tensor(&self, obs: &[f32]) -> Tensor {
        Tensor::from_slice(obs).view([1, self.config.obs_dim]).to_device(self.device)
    }

    /// Sample an action for a single observation
    ///
    /// Draws from the actor's distribution using the caller's seeded rng
    /// (inverse-CDF for categorical heads, reparameterized `mu + eps * std`
    /// for Gaussian heads), so sampling is a pure function of parameters,
    /// observation and rng state.
    pub fn sample_action(&self, obs: &[f32], rng: &mut StdRng) -> Result<SampledAction> {
        let obs_t = self.obs_tensor(obs);

        let (raw, log_prob, env_unit) = tch::no_grad(|| -> Result<(f32, f32, f32)> {
            match self.forward_actor(&obs_t) {
                ActorOutput::Logits(logits) => {
                    let probs: Vec<f32> =
                        Vec::try_from(logits.softmax(-1, Kind::Float).view(-1))?;
                    let log_probs: Vec<f32> =
                        Vec::try_from(logits.log_softmax(-1, Kind::Float).view(-1))?;

                    let u: f32 = rng.gen();
                    let mut idx = probs.len() - 1;
                    let mut acc = 0.0;
                    for (i, &p) in probs.iter().enumerate() {
                        acc += p;
                        if u < acc {
                            idx = i;
                            break;
                        }
                    }

                    Ok((idx as f32, log_probs[idx], discrete_unit_action(idx, probs.len())))
                }
                ActorOutput::Gaussian { mu, std } => {
                    let mu = scalar(&mu)?;
                    let std = scalar(&std)?;
                    let eps: f32 = rng.sample(StandardNormal);
                    let raw = mu + eps * std;
                    let log_prob = -0.5
                        * ((eps as f64).powi(2) + 2.0 * (std as f64).ln() + LN_2PI)
                            as f32;
                    Ok((raw, log_prob, raw))
                }
            }
        })?;

        let value = self.value(obs)?;
        Ok(SampledAction {
            env_action: env_unit * self.config.action_scale,
            raw,
            log_prob,
            value,
        })
    }

    /// Evaluate a batch of stored actions under current parameters
    ///
    /// # Arguments
    /// * `obs` - Observations `[batch, obs_dim]`
    /// * `actions` - Raw actions `[batch]` as stored in the trajectory
    ///
    /// # Returns
    /// `(log_probs [batch], entropy scalar, values [batch])`
    pub fn evaluate_actions(&self, obs: &Tensor, actions: &Tensor) -> (Tensor, Tensor, Tensor) {
        let values = self.values(obs);
        match self.forward_actor(obs) {
            ActorOutput::Logits(logits) => {
                let log_probs_all = logits.log_softmax(-1, Kind::Float);
                let probs = log_probs_all.exp();

                let indices = actions.to_kind(Kind::Int64);
                let action_log_probs =
                    log_probs_all.gather(-1, &indices.unsqueeze(-1), false).squeeze_dim(-1);

                let entropy = -(probs * log_probs_all)
                    .sum_dim_intlist(-1, false, Kind::Float)
                    .mean(Kind::Float);
                (action_log_probs, entropy, values)
            }
            ActorOutput::Gaussian { mu, std } => {
                let z = (actions - &mu) / &std;
                let log_probs = (z.square() + 2.0 * std.log() + LN_2PI) * -0.5;

                // Gaussian entropy: 0.5 * ln(2 pi e sigma^2)
                let entropy = (std.log() + 0.5 * (LN_2PI + 1.0)).mean(Kind::Float);
                (log_probs, entropy, values)
            }
        }
    }

    /// Create an Adam optimizer over the actor parameters
    pub fn actor_optimizer(&self, learning_rate: f64) -> Result<nn::Optimizer> {
        Ok(nn::Adam::default().build(&self.actor_vs, learning_rate)?)
    }

    /// Create an Adam optimizer over the critic parameters
    pub fn critic_optimizer(&self, learning_rate: f64) -> Result<nn::Optimizer> {
        Ok(nn::Adam::default().build(&self.critic_vs, learning_rate)?)
    }

    /// Save actor parameters
    pub fn save_actor<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.actor_vs.save(path)?;
        Ok(())
    }

    /// Save critic parameters
    pub fn save_critic<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.critic_vs.save(path)?;
        Ok(())
    }

    /// Load actor parameters
    pub fn load_actor<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        self.actor_vs.load(path)?;
        Ok(())
    }

    /// Load critic parameters
    pub fn load_critic<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        self.critic_vs.load(path)?;
        Ok(())
    }
}

/// Map a discrete action index to a unit-range velocity
///
/// n actions are spread evenly over [-1, 1]; for n = 3 this is {-1, 0, +1}.
fn discrete_unit_action(idx: usize, n: usize) -> f32 {
    -1.0 + 2.0 * idx as f32 / (n - 1) as f32
}

fn scalar(t: &Tensor) -> Result<f32> {
    Ok(f64::try_from(t)? as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn continuous_policy() -> ActorCritic {
        ActorCritic::new(ActorCriticConfig {
            action_scale: 6.0,
            ..Default::default()
        })
        .unwrap()
    }

    fn discrete_policy(n: usize) -> ActorCritic {
        ActorCritic::new(ActorCriticConfig {
            action_space: ActionSpace::Discrete(n),
            action_scale: 6.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(ActorCriticConfig::default().validate().is_ok());

        let config =
            ActorCriticConfig { action_space: ActionSpace::Discrete(1), ..Default::default() };
        assert!(config.validate().is_err());

        let config = ActorCriticConfig { std_bounds: (0.0, 1.0), ..Default::default() };
        assert!(config.validate().is_err());

        let config = ActorCriticConfig { std_bounds: (1.0, 0.5), ..Default::default() };
        assert!(config.validate().is_err());

        let config = ActorCriticConfig { hidden_dim: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discrete_unit_action_mapping() {
        assert_eq!(discrete_unit_action(0, 3), -1.0);
        assert_eq!(discrete_unit_action(1, 3), 0.0);
        assert_eq!(discrete_unit_action(2, 3), 1.0);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let policy = continuous_policy();
        let obs = vec![0.1, -0.3, 0.5, 0.2, -0.8];

        let mut rng_a = StdRng::seed_from_u64(17);
        let mut rng_b = StdRng::seed_from_u64(17);

        for _ in 0..10 {
            let a = policy.sample_action(&obs, &mut rng_a).unwrap();
            let b = policy.sample_action(&obs, &mut rng_b).unwrap();
            assert_eq!(a.raw, b.raw);
            assert_eq!(a.log_prob, b.log_prob);
            assert_eq!(a.value, b.value);
        }
    }

    #[test]
    fn test_gaussian_std_clamped() {
        let policy = continuous_policy();
        let (min_std, max_std) = policy.config().std_bounds;

        // Extreme observations push the log-std head hard in both directions
        for scale in [-100.0_f32, -1.0, 0.0, 1.0, 100.0] {
            let obs: Vec<f32> = vec![scale; OBS_DIM];
            let obs_t = policy.obs_tensor(&obs);
            if let ActorOutput::Gaussian { std, .. } = policy.forward_actor(&obs_t) {
                let std = scalar(&std).unwrap() as f64;
                assert!(std.is_finite());
                assert!(std >= min_std - 1e-6 && std <= max_std + 1e-6);
            } else {
                panic!("expected Gaussian head");
            }
        }
    }

    #[test]
    fn test_gaussian_log_prob_finite() {
        let policy = continuous_policy();
        let obs = vec![0.0; OBS_DIM];
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..100 {
            let sample = policy.sample_action(&obs, &mut rng).unwrap();
            assert!(sample.log_prob.is_finite());
            assert!(sample.value.is_finite());
        }
    }

    #[test]
    fn test_discrete_actions_in_range() {
        let policy = discrete_policy(3);
        let obs = vec![0.0; OBS_DIM];
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let sample = policy.sample_action(&obs, &mut rng).unwrap();
            let idx = sample.raw as usize;
            assert!(idx < 3);
            assert!(sample.env_action.abs() <= 6.0 + 1e-6);
            assert!(sample.log_prob <= 0.0);
        }
    }

    #[test]
    fn test_evaluate_actions_shapes() {
        let policy = continuous_policy();
        let device = policy.device();
        let obs = Tensor::randn([8, OBS_DIM as i64], (Kind::Float, device));
        let actions = Tensor::randn([8], (Kind::Float, device));

        let (log_probs, entropy, values) = policy.evaluate_actions(&obs, &actions);
        assert_eq!(log_probs.size(), vec![8]);
        assert_eq!(entropy.size(), Vec::<i64>::new());
        assert_eq!(values.size(), vec![8]);

        let policy = discrete_policy(3);
        let obs = Tensor::randn([8, OBS_DIM as i64], (Kind::Float, policy.device()));
        let actions = Tensor::from_slice(&[0.0_f32, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0])
            .to_device(policy.device());

        let (log_probs, entropy, values) = policy.evaluate_actions(&obs, &actions);
        assert_eq!(log_probs.size(), vec![8]);
        let entropy_val: f64 = entropy.try_into().unwrap();
        assert!(entropy_val >= 0.0);
        assert_eq!(values.size(), vec![8]);
    }

    #[test]
    fn test_actor_critic_saved_independently() {
        let policy = continuous_policy();
        let dir = tempfile::tempdir().unwrap();
        let actor_path = dir.path().join("actor.pt");
        let critic_path = dir.path().join("critic.pt");

        policy.save_actor(&actor_path).unwrap();
        policy.save_critic(&critic_path).unwrap();

        let mut other = continuous_policy();
        other.load_actor(&actor_path).unwrap();
        other.load_critic(&critic_path).unwrap();

        let obs = vec![0.2; OBS_DIM];
        let mut rng_a = StdRng::seed_from_u64(3);
        let mut rng_b = StdRng::seed_from_u64(3);
        let a = policy.sample_action(&obs, &mut rng_a).unwrap();
        let b = other.sample_action(&obs, &mut rng_b).unwrap();
        assert_eq!(a.raw, b.raw);
        assert_eq!(a.value, b.value);
    }
}

//! Single-paddle pong environment
//!
//! A ball bounces inside a 2D arena; the agent controls the vertical velocity
//! of a paddle on the left wall and must intercept the ball. Missing the ball
//! ends the episode.
//!
//! # Physics
//!
//! - State: paddle position, ball position and velocity
//! - Action: paddle velocity in [-max_paddle_speed, max_paddle_speed]
//! - Top, bottom and right walls reflect the ball; the left side is defended
//!   by the paddle
//! - On paddle contact the horizontal velocity flips and the vertical velocity
//!   is recomputed from the impact offset relative to the paddle center, with
//!   the resulting speed capped at `ball_max_speed`
//! - Reward: penalty on miss, bonus on hit scaled by horizontal ball speed,
//!   plus a continuous shaping term for tracking the ball

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::env::{Environment, SpaceInfo, SpaceType, StepResult};

/// Number of components in a pong observation
pub const OBS_DIM: usize = 5;

/// Pong environment configuration
///
/// Geometry and speed constants follow the classic 800x400 arena with an
/// 80-pixel paddle. Reward scale and shape are tunable; the final reward is
/// always clipped to `reward_clip`.
#[derive(Debug, Clone)]
pub struct PongConfig {
    /// Arena width in pixels
    pub screen_width: f32,

    /// Arena height in pixels
    pub screen_height: f32,

    /// Paddle height in pixels
    pub paddle_height: f32,

    /// Horizontal position of the paddle plane (distance from the left wall)
    pub paddle_x: f32,

    /// Ball serve speed (horizontal component at reset and paddle bounces)
    pub ball_base_speed: f32,

    /// Cap on the ball speed magnitude after any collision
    pub ball_max_speed: f32,

    /// Maximum paddle speed; actions are clamped to this magnitude
    pub max_paddle_speed: f32,

    /// Range of the vertical speed magnitude when serving a new ball
    pub serve_vy_range: (f32, f32),

    /// Reward when the ball passes the paddle (episode ends)
    pub miss_penalty: f32,

    /// Base reward for intercepting the ball
    pub hit_reward: f32,

    /// Extra hit reward scaled by |vx| / ball_max_speed, favoring fast returns
    pub hit_speed_bonus: f32,

    /// Coefficient of the shaping term for paddle/ball vertical closeness
    pub shaping_coef: f32,

    /// Penalty for staying idle while far from the ball (0 disables)
    pub idle_penalty: f32,

    /// Paddle speed magnitude below which the paddle counts as idle
    pub idle_threshold: f32,

    /// Final reward is clipped to this (low, high) range
    pub reward_clip: (f32, f32),
}

impl Default for PongConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 400.0,
            paddle_height: 80.0,
            paddle_x: 10.0,
            ball_base_speed: 4.0,
            ball_max_speed: 10.0,
            max_paddle_speed: 6.0,
            serve_vy_range: (1.0, 4.0),
            miss_penalty: -1.0,
            hit_reward: 0.5,
            hit_speed_bonus: 0.5,
            shaping_coef: 0.05,
            idle_penalty: 0.01,
            idle_threshold: 0.05,
            reward_clip: (-1.0, 1.0),
        }
    }
}

impl PongConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.screen_width <= 0.0 || self.screen_height <= 0.0 {
            anyhow::bail!("screen dimensions must be positive");
        }
        if self.paddle_height <= 0.0 || self.paddle_height >= self.screen_height {
            anyhow::bail!("paddle_height must be in (0, screen_height)");
        }
        if self.paddle_x < 0.0 || self.paddle_x >= self.screen_width {
            anyhow::bail!("paddle_x must be within the arena");
        }
        if self.ball_base_speed <= 0.0 {
            anyhow::bail!("ball_base_speed must be positive");
        }
        if self.ball_max_speed < self.ball_base_speed {
            anyhow::bail!("ball_max_speed must be >= ball_base_speed");
        }
        if self.max_paddle_speed <= 0.0 {
            anyhow::bail!("max_paddle_speed must be positive");
        }
        let (vy_min, vy_max) = self.serve_vy_range;
        if vy_min < 0.0 || vy_max < vy_min || vy_max > self.ball_max_speed {
            anyhow::bail!("serve_vy_range must satisfy 0 <= min <= max <= ball_max_speed");
        }
        let (lo, hi) = self.reward_clip;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            anyhow::bail!("reward_clip must be a finite (low, high) range with low < high");
        }
        if !self.miss_penalty.is_finite()
            || !self.hit_reward.is_finite()
            || !self.hit_speed_bonus.is_finite()
            || !self.shaping_coef.is_finite()
            || !self.idle_penalty.is_finite()
        {
            anyhow::bail!("reward parameters must be finite");
        }
        if self.miss_penalty > 0.0 {
            anyhow::bail!("miss_penalty must be non-positive");
        }
        if self.hit_reward < 0.0 || self.hit_speed_bonus < 0.0 {
            anyhow::bail!("hit_reward and hit_speed_bonus must be non-negative");
        }
        if self.shaping_coef < 0.0 {
            anyhow::bail!("shaping_coef must be non-negative");
        }
        if self.idle_penalty < 0.0 {
            anyhow::bail!("idle_penalty must be non-negative");
        }
        if self.idle_threshold < 0.0 {
            anyhow::bail!("idle_threshold must be non-negative");
        }
        Ok(())
    }
}

/// Physical simulation state
///
/// Fixed-schema record of the small set of physical variables. Serializable so
/// a decoupled renderer can mirror it; the transport is not a concern here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongState {
    /// Paddle top edge, clamped to [0, screen_height - paddle_height]
    pub paddle_y: f32,

    /// Ball horizontal position
    pub ball_x: f32,

    /// Ball vertical position
    pub ball_y: f32,

    /// Ball horizontal velocity
    pub ball_vx: f32,

    /// Ball vertical velocity
    pub ball_vy: f32,

    /// Set on the step where the paddle intercepted the ball
    pub ball_hit: bool,

    /// Set on the step where the ball passed the paddle
    pub ball_missed: bool,

    /// Set when the paddle stayed idle while far from the ball
    pub paddle_idle: bool,
}

/// Single-paddle pong simulator
///
/// Deterministic except for its seeded random source, which drives ball
/// initialization at reset. Given a fixed seed, the sequence of states for a
/// fixed action sequence is exactly reproducible.
#[derive(Debug)]
pub struct PongSim {
    config: PongConfig,
    state: PongState,
    rng: StdRng,
    done: bool,
    steps: usize,
}

impl PongSim {
    /// Create a new simulator with the given configuration and seed
    ///
    /// Fails fast if the configuration is invalid.
    pub fn new(config: PongConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let state = PongState {
            paddle_y: (config.screen_height - config.paddle_height) / 2.0,
            ball_x: config.screen_width / 2.0,
            ball_y: config.screen_height / 2.0,
            ball_vx: -config.ball_base_speed,
            ball_vy: 0.0,
            ball_hit: false,
            ball_missed: false,
            paddle_idle: false,
        };
        Ok(Self { config, state, rng: StdRng::seed_from_u64(seed), done: false, steps: 0 })
    }

    /// Current simulation state (the shared-state shape)
    pub fn state(&self) -> &PongState {
        &self.state
    }

    /// Whether the current episode has ended
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Steps taken in the current episode
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Environment configuration
    pub fn config(&self) -> &PongConfig {
        &self.config
    }

    fn paddle_plane(&self) -> f32 {
        self.config.paddle_x
    }

    fn paddle_center(&self) -> f32 {
        self.state.paddle_y + self.config.paddle_height / 2.0
    }

    /// Randomize ball position and velocity for a new serve
    fn serve_ball(&mut self) {
        let cfg = &self.config;

        // Serve from the middle half of the arena so the agent has time to react
        self.state.ball_x = self.rng.gen_range(cfg.screen_width * 0.4..cfg.screen_width * 0.75);
        self.state.ball_y = self.rng.gen_range(0.0..cfg.screen_height);

        let vx_sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.state.ball_vx = cfg.ball_base_speed * vx_sign;

        let (vy_min, vy_max) = cfg.serve_vy_range;
        let vy_mag =
            if vy_max > vy_min { self.rng.gen_range(vy_min..vy_max) } else { vy_min };
        let vy_sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.state.ball_vy = vy_mag * vy_sign;
    }

    /// Integrate paddle motion and clamp to the arena
    fn move_paddle(&mut self, velocity: f32) {
        let max_y = self.config.screen_height - self.config.paddle_height;
        self.state.paddle_y = (self.state.paddle_y + velocity).clamp(0.0, max_y);
    }

    /// Advance the ball and resolve wall collisions
    fn move_ball(&mut self) {
        let cfg = &self.config;
        self.state.ball_x += self.state.ball_vx;
        self.state.ball_y += self.state.ball_vy;

        // Reflect off top and bottom walls
        if self.state.ball_y <= 0.0 {
            self.state.ball_y = -self.state.ball_y;
            self.state.ball_vy = -self.state.ball_vy;
        } else if self.state.ball_y >= cfg.screen_height {
            self.state.ball_y = 2.0 * cfg.screen_height - self.state.ball_y;
            self.state.ball_vy = -self.state.ball_vy;
        }

        // The right wall returns the ball
        if self.state.ball_x >= cfg.screen_width {
            self.state.ball_x = 2.0 * cfg.screen_width - self.state.ball_x;
            self.state.ball_vx = -self.state.ball_vx;
        }
    }

    /// Resolve paddle contact or a miss once the ball reaches the paddle plane
    fn resolve_paddle(&mut self) {
        let cfg = &self.config;
        if self.state.ball_vx >= 0.0 || self.state.ball_x > self.paddle_plane() {
            return;
        }

        let span_top = self.state.paddle_y;
        let span_bottom = self.state.paddle_y + cfg.paddle_height;
        if self.state.ball_y >= span_top && self.state.ball_y <= span_bottom {
            // Bounce: flip horizontal velocity, recompute vertical velocity
            // from the impact offset relative to the paddle center
            let offset = (self.state.ball_y - self.paddle_center()) / (cfg.paddle_height / 2.0);
            self.state.ball_vx = -self.state.ball_vx;
            self.state.ball_vy = cfg.ball_base_speed * offset;
            self.state.ball_x = self.paddle_plane();
            self.cap_ball_speed();
            self.state.ball_hit = true;
        } else {
            self.state.ball_missed = true;
            self.done = true;
        }
    }

    /// Rescale the velocity vector so its magnitude never exceeds the cap
    fn cap_ball_speed(&mut self) {
        let speed =
            (self.state.ball_vx * self.state.ball_vx + self.state.ball_vy * self.state.ball_vy)
                .sqrt();
        if speed > self.config.ball_max_speed {
            let scale = self.config.ball_max_speed / speed;
            self.state.ball_vx *= scale;
            self.state.ball_vy *= scale;
        }
    }

    /// Compute the shaped reward for the step just taken
    fn compute_reward(&mut self, action: f32) -> f32 {
        let cfg = &self.config;

        if self.state.ball_missed {
            return cfg.miss_penalty.clamp(cfg.reward_clip.0, cfg.reward_clip.1);
        }

        let mut reward = 0.0;
        if self.state.ball_hit {
            let speed_frac = self.state.ball_vx.abs() / cfg.ball_max_speed;
            reward += cfg.hit_reward + cfg.hit_speed_bonus * speed_frac;
        }

        // Shaping: closeness of the paddle center to the ball's height
        let dist = (self.paddle_center() - self.state.ball_y).abs();
        reward += cfg.shaping_coef * (1.0 - dist / cfg.screen_height);

        // Idle penalty when the paddle is parked away from the ball
        if action.abs() < cfg.idle_threshold && dist > cfg.paddle_height / 2.0 {
            self.state.paddle_idle = true;
            reward -= cfg.idle_penalty;
        }

        reward.clamp(cfg.reward_clip.0, cfg.reward_clip.1)
    }

    /// Normalized observation: [paddle, ball_x, ball_y, ball_vx, ball_vy]
    ///
    /// Positions are mapped into [-1, 1] over their bounded range, velocities
    /// divided by the relevant max speed. Finite at all boundary values.
    fn observation(&self) -> Vec<f32> {
        let cfg = &self.config;
        let paddle_range = cfg.screen_height - cfg.paddle_height;
        vec![
            self.state.paddle_y / paddle_range * 2.0 - 1.0,
            self.state.ball_x / cfg.screen_width * 2.0 - 1.0,
            self.state.ball_y / cfg.screen_height * 2.0 - 1.0,
            self.state.ball_vx / cfg.ball_max_speed,
            self.state.ball_vy / cfg.ball_max_speed,
        ]
    }
}

impl Environment for PongSim {
    type Observation = Vec<f32>;
    type Action = f32;

    fn reset(&mut self) -> Result<Self::Observation> {
        self.state.paddle_y = (self.config.screen_height - self.config.paddle_height) / 2.0;
        self.serve_ball();
        self.state.ball_hit = false;
        self.state.ball_missed = false;
        self.state.paddle_idle = false;
        self.done = false;
        self.steps = 0;
        Ok(self.observation())
    }

    fn step(&mut self, action: Self::Action) -> Result<StepResult<Self::Observation>> {
        self.state.ball_hit = false;
        self.state.ball_missed = false;
        self.state.paddle_idle = false;

        let velocity =
            action.clamp(-self.config.max_paddle_speed, self.config.max_paddle_speed);
        self.move_paddle(velocity);
        self.move_ball();
        self.resolve_paddle();
        self.steps += 1;

        let mut reward = self.compute_reward(velocity);
        if !reward.is_finite() {
            // Numerical safety: substitute the default penalty and end the
            // episode instead of propagating a NaN into training
            tracing::warn!(
                reward,
                action,
                state = ?self.state,
                "non-finite reward; substituting miss penalty and terminating episode"
            );
            reward = self.config.miss_penalty;
            self.done = true;
        }

        Ok(StepResult { observation: self.observation(), reward, done: self.done })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![OBS_DIM], dtype: SpaceType::Continuous }
    }

    fn action_space(&self) -> SpaceInfo {
        SpaceInfo { shape: vec![1], dtype: SpaceType::Continuous }
    }
}

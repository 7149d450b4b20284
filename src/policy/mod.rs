//! Actor-critic policy networks
//!
//! The [`actor_critic::ActorCritic`] model pairs a policy network (actor)
//! with a value network (critic), each in its own variable store so the two
//! can be checkpointed and loaded independently.

pub mod actor_critic;

pub use actor_critic::{ActionSpace, Activation, ActorCritic, ActorCriticConfig, SampledAction};

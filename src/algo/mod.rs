/// Proximal Policy Optimization
pub mod ppo;

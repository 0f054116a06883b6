//! Fixed-capacity rollout storage for one on-policy training cycle
//!
//! Every field lives in its own preallocated flat region of
//! `capacity * width` floats. A write cursor marks the valid prefix; clearing
//! only rewinds the cursor, the next writes overwrite stale slots.

use burn::prelude::*;

use crate::{
    error::{PpoError, Result},
    traits::{Rows, ToTensor},
};

/// One transition, borrowed from the caller or from the buffer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition<'a> {
    pub state: &'a [f32],
    pub action: &'a [f32],
    pub reward: f32,
    /// `0` at a terminal step, `γ` otherwise
    pub mask: f32,
    /// Standard-normal draw that produced `action`
    pub noise: &'a [f32],
}

/// Arena of transitions indexed by a monotonically increasing cursor
#[derive(Clone, Debug)]
pub struct RolloutBuffer {
    capacity: usize,
    state_dim: usize,
    action_dim: usize,
    cursor: usize,

    states: Vec<f32>,
    actions: Vec<f32>,
    rewards: Vec<f32>,
    masks: Vec<f32>,
    noises: Vec<f32>,
}

impl RolloutBuffer {
    /// Preallocate storage for `capacity` transitions
    pub fn new(capacity: usize, state_dim: usize, action_dim: usize) -> Self {
        Self {
            capacity,
            state_dim,
            action_dim,
            cursor: 0,
            states: vec![0.0; capacity * state_dim],
            actions: vec![0.0; capacity * action_dim],
            rewards: vec![0.0; capacity],
            masks: vec![0.0; capacity],
            noises: vec![0.0; capacity * action_dim],
        }
    }

    /// Append a transition at the cursor
    ///
    /// Fails with [`PpoError::BufferFull`] instead of overwriting when the
    /// cursor already reached capacity.
    pub fn store(&mut self, transition: Transition<'_>) -> Result<()> {
        if self.cursor == self.capacity {
            return Err(PpoError::BufferFull {
                capacity: self.capacity,
            });
        }
        check_width("state", transition.state, self.state_dim)?;
        check_width("action", transition.action, self.action_dim)?;
        check_width("noise", transition.noise, self.action_dim)?;

        let i = self.cursor;
        self.states[i * self.state_dim..(i + 1) * self.state_dim].copy_from_slice(transition.state);
        self.actions[i * self.action_dim..(i + 1) * self.action_dim]
            .copy_from_slice(transition.action);
        self.noises[i * self.action_dim..(i + 1) * self.action_dim]
            .copy_from_slice(transition.noise);
        self.rewards[i] = transition.reward;
        self.masks[i] = transition.mask;

        self.cursor += 1;
        Ok(())
    }

    /// Read-only views over the valid prefix, in insertion order
    pub fn sample_all(&self) -> RolloutBatch<'_> {
        let n = self.cursor;
        RolloutBatch {
            states: &self.states[..n * self.state_dim],
            actions: &self.actions[..n * self.action_dim],
            rewards: &self.rewards[..n],
            masks: &self.masks[..n],
            noises: &self.noises[..n * self.action_dim],
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        }
    }

    /// Rewind the cursor; storage is kept
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots left before the buffer is full
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }
}

fn check_width(field: &'static str, values: &[f32], expected: usize) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(PpoError::DimensionMismatch {
            field,
            expected,
            actual: values.len(),
        })
    }
}

/// Borrowed view of the first `len` transitions of a [`RolloutBuffer`]
#[derive(Clone, Copy, Debug)]
pub struct RolloutBatch<'a> {
    states: &'a [f32],
    actions: &'a [f32],
    rewards: &'a [f32],
    masks: &'a [f32],
    noises: &'a [f32],
    state_dim: usize,
    action_dim: usize,
}

/// Batch fields materialized as tensors on a device
#[derive(Clone, Debug)]
pub struct RolloutTensors<B: Backend> {
    /// `[len, state_dim]`
    pub states: Tensor<B, 2>,
    /// `[len, action_dim]`
    pub actions: Tensor<B, 2>,
    /// `[len, action_dim]`
    pub noises: Tensor<B, 2>,
}

impl<'a> RolloutBatch<'a> {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// The `i`-th stored transition
    ///
    /// # Panics
    /// If `i >= len()`.
    pub fn get(&self, i: usize) -> Transition<'a> {
        Transition {
            state: &self.states[i * self.state_dim..(i + 1) * self.state_dim],
            action: &self.actions[i * self.action_dim..(i + 1) * self.action_dim],
            reward: self.rewards[i],
            mask: self.masks[i],
            noise: &self.noises[i * self.action_dim..(i + 1) * self.action_dim],
        }
    }

    pub fn states(&self) -> &'a [f32] {
        self.states
    }

    /// States of the rows in `range`, flat
    pub fn states_in(&self, range: std::ops::Range<usize>) -> &'a [f32] {
        &self.states[range.start * self.state_dim..range.end * self.state_dim]
    }

    pub fn actions(&self) -> &'a [f32] {
        self.actions
    }

    pub fn rewards(&self) -> &'a [f32] {
        self.rewards
    }

    pub fn masks(&self) -> &'a [f32] {
        self.masks
    }

    pub fn noises(&self) -> &'a [f32] {
        self.noises
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Copy states, actions and noises to `device`
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> RolloutTensors<B> {
        RolloutTensors {
            states: Rows::new(self.states, self.state_dim).to_tensor(device),
            actions: Rows::new(self.actions, self.action_dim).to_tensor(device),
            noises: Rows::new(self.noises, self.action_dim).to_tensor(device),
        }
    }
}

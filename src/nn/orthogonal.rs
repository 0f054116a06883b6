//! Orthogonal initialization for linear layers.
//!
//! An orthogonal matrix preserves the norm of its input, so a small gain on
//! the output layer gives outputs close to zero at initialization without
//! collapsing the directions the hidden features span.
//!
//! Gains used in this crate:
//! - 0.1: actor mean head (initial action means near zero)
//! - 0.5: critic value head

use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::TensorData,
};
use rand::Rng;
use rand_distr::StandardNormal;

/// Generate a `rows x cols` matrix (row-major) with orthonormal rows or
/// columns, whichever is the shorter side, scaled by `gain`.
///
/// Uses Gram-Schmidt on standard-normal draws.
pub fn orthogonal_weights<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    gain: f64,
    rng: &mut R,
) -> Vec<f32> {
    // Orthogonalize the `count` vectors of length `len` along the shorter side
    let columns = rows >= cols;
    let (count, len) = if columns { (cols, rows) } else { (rows, cols) };

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(count);
    while basis.len() < count {
        let mut v: Vec<f64> = (0..len).map(|_| rng.sample(StandardNormal)).collect();

        for u in &basis {
            let dot: f64 = v.iter().zip(u).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(u).for_each(|(a, b)| *a -= dot * b);
        }

        let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        // Linearly dependent draw, try again
        if norm > 1e-10 {
            v.iter_mut().for_each(|a| *a /= norm);
            basis.push(v);
        }
    }

    let mut weights = vec![0.0_f32; rows * cols];
    for (k, v) in basis.iter().enumerate() {
        for (j, value) in v.iter().enumerate() {
            let (r, c) = if columns { (j, k) } else { (k, j) };
            weights[r * cols + c] = (value * gain) as f32;
        }
    }
    weights
}

/// Build a burn [`Linear`] layer with orthogonal weights and a constant bias
///
/// burn stores linear weights as `[d_input, d_output]`.
pub fn orthogonal_linear<B: Backend, R: Rng + ?Sized>(
    d_input: usize,
    d_output: usize,
    gain: f64,
    bias: f64,
    rng: &mut R,
    device: &B::Device,
) -> Linear<B> {
    let weights = orthogonal_weights(d_input, d_output, gain, rng);

    let mut layer = LinearConfig::new(d_input, d_output).init(device);
    layer.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [d_input, d_output]),
        device,
    ));
    layer.bias = Some(Param::from_tensor(Tensor::full([d_output], bias as f32, device)));
    layer
}

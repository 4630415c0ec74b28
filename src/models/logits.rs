//! Logits processing for MusicGen decoder output.
//!
//! Classifier-free guidance and top-k sampling.

use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use half::f16;
use ndarray::{s, Array, Array2, Axis, Ix3, IxDyn};
use ort::tensor::ArrayExtensions;
use ort::value::DynValue;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::error::{GeneratorError, Result};

/// 2D logits, one row per batch entry.
pub struct Logits(Array2<f32>);

impl Deref for Logits {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Logits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logits({:?})", self.0.dim())
    }
}

impl Logits {
    pub fn new(array: Array2<f32>) -> Self {
        Self(array)
    }

    /// Creates Logits from a `[batch, 1, vocab]` tensor, f32 or f16.
    pub fn from_3d_dyn_value(value: &DynValue) -> Result<Self> {
        let (shape, data): (Vec<usize>, Vec<f32>) =
            if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                (shape.iter().map(|&x| x as usize).collect(), data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_tensor::<f16>() {
                (
                    shape.iter().map(|&x| x as usize).collect(),
                    data.iter().map(|e| f32::from(*e)).collect(),
                )
            } else {
                return Err(GeneratorError::generation_failed("Logits must be f32 or f16"));
            };

        let arr = Array::from_shape_vec(IxDyn(&shape), data)
            .map_err(|e| GeneratorError::generation_failed(format!("Failed to create array: {}", e)))?
            .into_dimensionality::<Ix3>()
            .map_err(|e| GeneratorError::generation_failed(format!("Expected 3D logits: {}", e)))?;

        // Decoding one step at a time, so the sequence axis is always 1.
        if arr.dim().1 != 1 {
            return Err(GeneratorError::generation_failed(format!(
                "Expected a single decoder position, got {}",
                arr.dim().1
            )));
        }
        Ok(Self(arr.remove_axis(Axis(1))))
    }

    /// Applies classifier-free guidance.
    ///
    /// The batch holds conditional rows in the first half and unconditional
    /// rows in the second half:
    /// `guided = uncond + (cond - uncond) * scale`
    pub fn apply_free_guidance(self, guidance_scale: f32) -> Result<Self> {
        let rows = self.0.dim().0;
        if rows % 2 != 0 {
            return Err(GeneratorError::generation_failed(format!(
                "Guidance needs an even batch, got {} rows",
                rows
            )));
        }

        let half = rows / 2;
        let cond = self.0.slice(s![0..half, ..]);
        let uncond = self.0.slice(s![half.., ..]);
        Ok(Self((cond.into_owned() - uncond) * guidance_scale + uncond))
    }

    /// Samples one token per row from the `k` most probable tokens.
    pub fn sample_top_k<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<i64>> {
        let probabilities = self.0.softmax(Axis(1));
        let mut tokens = Vec::with_capacity(probabilities.dim().0);

        for row in probabilities.axis_iter(Axis(0)) {
            let k = k.clamp(1, row.len());

            let mut ranked: Vec<(i64, f32)> = row
                .iter()
                .enumerate()
                .map(|(i, p)| (i as i64, if p.is_finite() { *p } else { 0.0 }))
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked.truncate(k);

            let distribution = WeightedIndex::new(ranked.iter().map(|e| e.1)).map_err(|e| {
                GeneratorError::generation_failed(format!("Invalid sampling weights: {}", e))
            })?;
            tokens.push(ranked[distribution.sample(rng)].0);
        }

        Ok(tokens)
    }
}

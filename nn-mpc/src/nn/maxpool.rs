use super::config::LayerConfig;
use crate::{
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
    types::ring_element::RingElement,
};
use num_traits::{One, Zero};

/// Maximum over each window, found by a tournament of comparisons. The one-hot position
/// of each maximum is kept for the backward pass.
pub struct MaxPoolLayer {
    pub(crate) batch_size: usize,
    input_size: usize,
    window: usize,
    /// `outputs x window` input positions.
    window_indices: Vec<Option<usize>>,
    argmax: Option<VecShare<u64>>,
}

impl MaxPoolLayer {
    pub fn new(config: &LayerConfig, batch_size: usize) -> Result<Self, Error> {
        let LayerConfig::MaxPool {
            image_height: h,
            image_width: w,
            channels,
            pool_size: k,
            stride,
        } = *config
        else {
            return Err(Error::ConfigError(format!(
                "expected a MaxPool layer, got {}",
                config.name()
            )));
        };
        let (oh, ow) = config
            .output_hw()
            .ok_or_else(|| Error::ConfigError(format!("invalid pooling shape {:?}", config)))?;

        let mut window_indices = Vec::with_capacity(batch_size * channels * oh * ow * k * k);
        for b in 0..batch_size {
            for c in 0..channels {
                let base = (b * channels + c) * h * w;
                for oy in 0..oh {
                    for ox in 0..ow {
                        for fy in 0..k {
                            for fx in 0..k {
                                let iy = oy * stride + fy;
                                let ix = ox * stride + fx;
                                window_indices.push(Some(base + iy * w + ix));
                            }
                        }
                    }
                }
            }
        }

        Ok(Self {
            batch_size,
            input_size: config.input_size(),
            window: k * k,
            window_indices,
            argmax: None,
        })
    }

    fn outputs(&self) -> usize {
        self.window_indices.len() / self.window
    }

    pub(crate) fn input_size(&self) -> usize {
        self.input_size
    }

    pub(crate) fn output_size(&self) -> usize {
        self.outputs() / self.batch_size.max(1)
    }

    fn spread(&self) -> Vec<Option<usize>> {
        (0..self.window_indices.len())
            .map(|i| Some(i / self.window))
            .collect()
    }

    pub async fn forward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        if input.len() != self.batch_size * self.input_size {
            return Err(Error::InvalidSizeError);
        }
        let outputs = self.outputs();
        let window = self.window;

        // candidates[j][o] is the j-th survivor of window o, masks[j] is its one-hot
        // position, laid out as outputs x window
        let windows = input.gather(&self.window_indices);
        let mut candidates: Vec<VecShare<u64>> = (0..window)
            .map(|j| (0..outputs).map(|o| windows.get_at(o * window + j)).collect())
            .collect();
        let mut masks: Vec<VecShare<u64>> = (0..window)
            .map(|j| {
                let mut unit = vec![RingElement::zero(); window];
                unit[j] = RingElement::one();
                let public: Vec<_> = (0..outputs).flat_map(|_| unit.iter().copied()).collect();
                ctx.public(&public)
            })
            .collect();

        // repeats each output's value once per window position
        let spread = self.spread();
        while candidates.len() > 1 {
            let pairs = candidates.len() / 2;
            let mut x = VecShare::with_capacity(pairs * outputs);
            let mut y = VecShare::with_capacity(pairs * outputs);
            for j in 0..pairs {
                x.extend(candidates[2 * j].to_owned());
                y.extend(candidates[2 * j + 1].to_owned());
            }
            // keep x where x >= y
            let lt = ctx.lt(&x, &y).await?;
            let keep_x = ctx.one_minus(&lt);

            // one multiplication round for the values and the masks
            let mut bits = keep_x.to_owned();
            let mut diffs = x.sub(&y)?;
            for j in 0..pairs {
                let bit = keep_x.slice(j * outputs, (j + 1) * outputs);
                bits.extend(bit.gather(&spread));
                diffs.extend(masks[2 * j].sub(&masks[2 * j + 1])?);
            }
            let chosen = ctx.mul(&bits, &diffs).await?;

            let mut next_candidates = Vec::with_capacity(pairs + 1);
            let mut next_masks = Vec::with_capacity(pairs + 1);
            let mask_offset = pairs * outputs;
            for j in 0..pairs {
                let value = chosen.slice(j * outputs, (j + 1) * outputs);
                next_candidates.push(candidates[2 * j + 1].add(&value)?);
                let start = mask_offset + j * outputs * window;
                let mask = chosen.slice(start, start + outputs * window);
                next_masks.push(masks[2 * j + 1].add(&mask)?);
            }
            if candidates.len() % 2 == 1 {
                next_candidates.push(candidates.pop().unwrap_or_default());
                next_masks.push(masks.pop().unwrap_or_default());
            }
            candidates = next_candidates;
            masks = next_masks;
        }

        self.argmax = masks.pop();
        candidates.pop().ok_or(Error::InvalidSizeError)
    }

    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let argmax = self
            .argmax
            .take()
            .ok_or_else(|| Error::Other("backward without forward".to_owned()))?;
        let outputs = self.outputs();
        if delta.len() != outputs {
            return Err(Error::InvalidSizeError);
        }
        let routed = ctx.mul(&argmax, &delta.gather(&self.spread())).await?;
        let mut prev_delta = VecShare::zero(self.batch_size * self.input_size);
        routed.scatter_add(&self.window_indices, &mut prev_delta);
        Ok(prev_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_follow_nchw() {
        let config = LayerConfig::maxpool((4, 4, 1), 2, 2);
        let layer = MaxPoolLayer::new(&config, 1).unwrap();
        assert_eq!(layer.outputs(), 4);
        assert_eq!(
            &layer.window_indices[..4],
            &[Some(0), Some(1), Some(4), Some(5)]
        );
        assert_eq!(
            &layer.window_indices[12..],
            &[Some(10), Some(11), Some(14), Some(15)]
        );
    }
}

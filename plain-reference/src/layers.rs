//! Layer math over `f64`, with the same row-major NCHW layouts as the secure layers.

/// `x (m x n) * y (n x p)`.
pub fn matmul(x: &[f64], y: &[f64], m: usize, n: usize, p: usize) -> Vec<f64> {
    assert_eq!(x.len(), m * n);
    assert_eq!(y.len(), n * p);
    let mut res = vec![0.0; m * p];
    for i in 0..m {
        for k in 0..n {
            let xik = x[i * n + k];
            for j in 0..p {
                res[i * p + j] += xik * y[k * p + j];
            }
        }
    }
    res
}

pub fn transpose(x: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut res = vec![0.0; x.len()];
    for r in 0..rows {
        for c in 0..cols {
            res[c * rows + r] = x[r * cols + c];
        }
    }
    res
}

/// `X * W + b` for a `batch x input_dim` input.
pub fn fully_connected(
    input: &[f64],
    weights: &[f64],
    bias: &[f64],
    batch: usize,
    input_dim: usize,
    output_dim: usize,
) -> Vec<f64> {
    let mut res = matmul(input, weights, batch, input_dim, output_dim);
    for row in res.chunks_mut(output_dim) {
        for (r, b) in row.iter_mut().zip(bias) {
            *r += b;
        }
    }
    res
}

pub fn relu(input: &[f64]) -> Vec<f64> {
    input.iter().map(|x| x.max(0.0)).collect()
}

/// Shape of a convolution, per sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub filter_size: usize,
    pub filters: usize,
    pub stride: usize,
    pub padding: usize,
}

impl ConvShape {
    pub fn output_hw(&self) -> (usize, usize) {
        let h = (self.height + 2 * self.padding - self.filter_size) / self.stride + 1;
        let w = (self.width + 2 * self.padding - self.filter_size) / self.stride + 1;
        (h, w)
    }
}

/// Direct convolution. `weights` is `(C * k * k) x F` with rows ordered by channel, then
/// filter row, then filter column.
pub fn convolution(input: &[f64], weights: &[f64], bias: &[f64], batch: usize, shape: ConvShape) -> Vec<f64> {
    let ConvShape {
        height: h,
        width: w,
        channels: c,
        filter_size: k,
        filters: f,
        stride,
        padding,
    } = shape;
    let (oh, ow) = shape.output_hw();
    assert_eq!(input.len(), batch * c * h * w);
    assert_eq!(weights.len(), c * k * k * f);

    let mut res = vec![0.0; batch * f * oh * ow];
    for b in 0..batch {
        for filter in 0..f {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = bias[filter];
                    for ch in 0..c {
                        for fy in 0..k {
                            for fx in 0..k {
                                let iy = (oy * stride + fy) as isize - padding as isize;
                                let ix = (ox * stride + fx) as isize - padding as isize;
                                if iy < 0 || ix < 0 || iy >= h as isize || ix >= w as isize {
                                    continue;
                                }
                                let x = input[b * c * h * w + ch * h * w + iy as usize * w + ix as usize];
                                let row = ch * k * k + fy * k + fx;
                                acc += x * weights[row * f + filter];
                            }
                        }
                    }
                    res[((b * f + filter) * oh + oy) * ow + ox] = acc;
                }
            }
        }
    }
    res
}

/// Maximum over `k x k` windows of every channel.
pub fn maxpool(
    input: &[f64],
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
    k: usize,
    stride: usize,
) -> Vec<f64> {
    let oh = (height - k) / stride + 1;
    let ow = (width - k) / stride + 1;
    let mut res = Vec::with_capacity(batch * channels * oh * ow);
    for bc in 0..batch * channels {
        let base = bc * height * width;
        for oy in 0..oh {
            for ox in 0..ow {
                let mut max = f64::MIN;
                for fy in 0..k {
                    for fx in 0..k {
                        max = max.max(input[base + (oy * stride + fy) * width + ox * stride + fx]);
                    }
                }
                res.push(max);
            }
        }
    }
    res
}

/// Index of the largest value of each row.
pub fn argmax(values: &[f64], cols: usize) -> Vec<usize> {
    values
        .chunks(cols)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::MIN), |best, (i, v)| if *v > best.1 { (i, *v) } else { best })
                .0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fc_with_bias() {
        let out = fully_connected(&[1.5, -2.25], &[0.5, 0.5], &[0.0], 1, 2, 1);
        assert_eq!(out, vec![-0.375]);
        let out = fully_connected(&[1.0, 2.0], &[1.0, 0.0, 0.0, 1.0], &[0.5, -0.5], 1, 2, 2);
        assert_eq!(out, vec![1.5, 1.5]);
    }

    #[test]
    fn conv_matches_fc_for_full_filter() {
        // a filter covering the whole image is a dot product
        let shape = ConvShape {
            height: 2,
            width: 2,
            channels: 1,
            filter_size: 2,
            filters: 1,
            stride: 1,
            padding: 0,
        };
        let input = [1.0, 2.0, 3.0, 4.0];
        let weights = [0.5, 0.25, -1.0, 1.0];
        let out = convolution(&input, &weights, &[0.0], 1, shape);
        assert_eq!(out, fully_connected(&input, &weights, &[0.0], 1, 4, 1));
    }

    #[test]
    fn padded_conv_shape() {
        let shape = ConvShape {
            height: 3,
            width: 3,
            channels: 2,
            filter_size: 3,
            filters: 4,
            stride: 1,
            padding: 1,
        };
        assert_eq!(shape.output_hw(), (3, 3));
        let out = convolution(&[1.0; 18], &[1.0; 72], &[0.0; 4], 1, shape);
        assert_eq!(out.len(), 36);
        // center sees all 18 inputs, a corner only 8
        assert_eq!(out[4], 18.0);
        assert_eq!(out[0], 8.0);
    }

    #[test]
    fn pooling_and_argmax() {
        let input = [1.0, 5.0, 2.0, 0.0, -1.0, -3.0, 7.0, 8.0];
        // two channels of 2x2
        assert_eq!(maxpool(&input, 1, 2, 2, 2, 2, 2), vec![5.0, 8.0]);
        assert_eq!(relu(&[-1.0, 2.0]), vec![0.0, 2.0]);
        assert_eq!(argmax(&[0.1, 0.7, 0.2, 3.0, -1.0, 2.0], 3), vec![1, 0]);
    }

    #[test]
    fn transpose_square() {
        assert_eq!(transpose(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}

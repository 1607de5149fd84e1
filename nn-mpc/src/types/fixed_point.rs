//! Two's complement fixed-point encoding over Z_{2^64}.

use super::ring_element::RingElement;

/// Number of fractional bits of the working representation.
pub const FRAC_BITS: u32 = 13;

pub fn encode_with(value: f64, frac_bits: u32) -> RingElement<u64> {
    let scaled = (value * (1u64 << frac_bits) as f64).round();
    RingElement(scaled as i64 as u64)
}

pub fn decode_with(value: RingElement<u64>, frac_bits: u32) -> f64 {
    value.0 as i64 as f64 / (1u64 << frac_bits) as f64
}

pub fn encode(value: f64) -> RingElement<u64> {
    encode_with(value, FRAC_BITS)
}

pub fn decode(value: RingElement<u64>) -> f64 {
    decode_with(value, FRAC_BITS)
}

pub fn encode_slice(values: &[f64]) -> Vec<RingElement<u64>> {
    values.iter().map(|v| encode(*v)).collect()
}

pub fn decode_slice(values: &[RingElement<u64>]) -> Vec<f64> {
    values.iter().map(|v| decode(*v)).collect()
}

/// Size of one unit in the last place.
pub fn ulp() -> f64 {
    1.0 / (1u64 << FRAC_BITS) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values() {
        let x = encode(-2.25);
        assert_eq!(x.0 as i64, -2 * 8192 - 2048);
        assert_eq!(decode(x), -2.25);
    }

    #[test]
    fn rounding() {
        assert_eq!(encode(ulp() * 0.6).0, 1);
        assert_eq!(encode(ulp() * 0.4).0, 0);
        assert_eq!(decode(encode(0.1)), (0.1f64 * 8192.0).round() / 8192.0);
    }
}

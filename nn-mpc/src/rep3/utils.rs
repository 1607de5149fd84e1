use crate::{
    error::Error,
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use bytes::{Buf, Bytes, BytesMut};

pub(crate) fn ring_slice_to_bytes<T: IntRing2k>(values: &[RingElement<T>]) -> Bytes {
    let mut out = BytesMut::with_capacity(values.len() * T::BYTES);
    for v in values {
        v.add_to_bytes(&mut out);
    }
    out.freeze()
}

/// Decodes exactly `n` ring elements. Any other buffer length means the sender is
/// in a different round than we are.
pub(crate) fn ring_vec_from_bytes<T: IntRing2k>(
    mut bytes: BytesMut,
    n: usize,
) -> Result<Vec<RingElement<T>>, Error> {
    if bytes.remaining() != n * T::BYTES {
        return Err(Error::ProtocolDesync(format!(
            "expected {} bytes ({} elements), received {}",
            n * T::BYTES,
            n,
            bytes.remaining()
        )));
    }
    let mut res = Vec::with_capacity(n);
    for _ in 0..n {
        res.push(RingElement::take_from_bytes_mut(&mut bytes)?);
    }
    Ok(res)
}

pub(crate) fn ceil_log2(x: usize) -> usize {
    let mut y = 0;
    let mut x = x.saturating_sub(1);
    while x > 0 {
        x >>= 1;
        y += 1;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_length_is_enforced() {
        let values = vec![RingElement(1u64), RingElement(u64::MAX)];
        let bytes = ring_slice_to_bytes(&values);
        assert_eq!(bytes.len(), 16);

        let back = ring_vec_from_bytes::<u64>(BytesMut::from(bytes.as_ref()), 2).unwrap();
        assert_eq!(back, values);

        let short = BytesMut::from(&bytes[..12]);
        assert!(matches!(
            ring_vec_from_bytes::<u64>(short, 2),
            Err(Error::ProtocolDesync(_))
        ));
        let long = BytesMut::from(bytes.as_ref());
        assert!(matches!(
            ring_vec_from_bytes::<u64>(long, 1),
            Err(Error::ProtocolDesync(_))
        ));
    }

    #[test]
    fn log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(63), 6);
        assert_eq!(ceil_log2(64), 6);
        assert_eq!(ceil_log2(65), 7);
    }

    #[test]
    fn pairwise_halving_takes_ceil_log2_levels() {
        for width in 1..300usize {
            let mut w = width;
            let mut levels = 0;
            while w > 1 {
                w = w / 2 + w % 2;
                levels += 1;
            }
            assert_eq!(levels, ceil_log2(width), "width {}", width);
        }
    }
}

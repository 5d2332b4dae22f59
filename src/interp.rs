use crate::types::Value;

// linearly map a number from one range to another
pub fn remap(s: Value, range_in: [Value; 2], range_out: [Value; 2]) -> Value {
    range_out[0] + (s - range_in[0]) * (range_out[1] - range_out[0]) / (range_in[1] - range_in[0])
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Blend two RGB triples channel-wise by factor t
pub fn mix_rgb(a: [u8; 3], b: [u8; 3], t: Value) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [0, 1, 2].map(|i| lerp(a[i] as Value, b[i] as Value, t).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_maps_endpoints() {
        assert_eq!(remap(-2.8, [-2.8, 2.8], [0.0, 1.0]), 0.0);
        assert_eq!(remap(2.8, [-2.8, 2.8], [0.0, 1.0]), 1.0);
    }

    #[test]
    fn mix_rgb_clamps_factor() {
        assert_eq!(mix_rgb([0, 0, 0], [200, 100, 50], 2.0), [200, 100, 50]);
        assert_eq!(mix_rgb([0, 0, 0], [200, 100, 50], 0.5), [100, 50, 25]);
        assert_eq!(mix_rgb([10, 20, 30], [200, 100, 50], -1.0), [10, 20, 30]);
    }
}

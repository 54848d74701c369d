pub(crate) fn vec_to_bbox<T: Copy>(v: Vec<T>) -> [T; 4] {
    return [v[0], v[1], v[2], v[3]];
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f32, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value as f64 * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_requested_places() {
        assert_eq!(round_to(0.99871, 3), 0.999);
        assert_eq!(round_to(12.345_678, 2), 12.35);
        assert_eq!(round_to(97.25, 1), 97.3);
    }

    #[test]
    fn bbox_takes_first_four() {
        assert_eq!(vec_to_bbox(vec![1, 2, 3, 4, 5]), [1, 2, 3, 4]);
    }
}

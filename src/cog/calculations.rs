//! Pure calculation functions for the COG overview pyramid.

/// Decimation factors of the overview levels for a `width` × `height` image.
///
/// Levels keep halving while the smaller decimated side is still larger than
/// one block, matching rio-cogeo's default level count.
///
/// # Examples
/// ```
/// # use create_odc_stac::cog::overview_factors;
/// assert_eq!(overview_factors(1024, 1024, 512), vec![2]);
/// assert_eq!(overview_factors(10_000, 3_000, 512), vec![2, 4, 8]);
/// assert!(overview_factors(512, 512, 512).is_empty());
/// ```
pub fn overview_factors(width: u32, height: u32, block_size: u32) -> Vec<u32> {
    let mut factors = Vec::new();
    let mut factor = 1u32;
    while (width / factor).min(height / factor) > block_size {
        factor *= 2;
        factors.push(factor);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overviews_for_small_images() {
        assert!(overview_factors(32, 24, 512).is_empty());
        assert!(overview_factors(1024, 512, 512).is_empty());
    }

    #[test]
    fn levels_halve_until_one_block() {
        assert_eq!(overview_factors(1025, 1025, 512), vec![2]);
        assert_eq!(overview_factors(2049, 2049, 512), vec![2, 4]);
        assert_eq!(overview_factors(32, 24, 16), vec![2]);
    }

    #[test]
    fn narrow_image_is_limited_by_short_side() {
        assert!(overview_factors(100, 50_000, 512).is_empty());
    }
}

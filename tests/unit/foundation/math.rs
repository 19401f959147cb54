use super::*;

#[test]
fn premultiply_zero_alpha_clears_color() {
    let mut px = vec![200u8, 100, 50, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, vec![0, 0, 0, 0]);
}

#[test]
fn premultiply_half_alpha_rounds() {
    let mut px = vec![255u8, 128, 0, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, vec![128, 64, 0, 128]);
}

#[test]
fn clamp01_handles_nan_and_range() {
    assert_eq!(clamp01(f64::NAN), 0.0);
    assert_eq!(clamp01(-3.0), 0.0);
    assert_eq!(clamp01(0.25), 0.25);
    assert_eq!(clamp01(7.0), 1.0);
}

#[test]
fn lerp_u8_endpoints() {
    assert_eq!(lerp_u8(10, 250, 0.0), 10);
    assert_eq!(lerp_u8(10, 250, 1.0), 250);
    assert_eq!(lerp_u8(0, 100, 0.5), 50);
}

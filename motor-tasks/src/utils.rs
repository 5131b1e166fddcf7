/// Round half up to the nearest integer, used to size the reservoir wiring.
#[inline(always)]
pub fn round_up(v: f64) -> usize {
    (v + 0.5).floor().max(0.0) as usize
}

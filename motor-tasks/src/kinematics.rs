use nalgebra::DVector;

/// Endpoint of a planar arm whose segments all have length `seg_len`.
/// Joint angles are relative, so segment `i` points along the sum of the
/// first `i + 1` angles.
pub fn forward_kinematics(angles: &DVector<f64>, seg_len: f64) -> DVector<f64> {
    let mut heading = 0.0;
    let mut x = 0.0;
    let mut y = 0.0;
    for theta in angles.iter() {
        heading += theta;
        x += seg_len * heading.cos();
        y += seg_len * heading.sin();
    }

    DVector::from_vec(vec![x, y])
}

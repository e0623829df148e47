use super::*;

#[test]
fn conversions_floor_and_split() {
    assert_eq!(int_to_fixed(3), 3 * FIXED_ONE);
    assert_eq!(fixed_to_int(int_to_fixed(-2) + FIXED_HALF), -2);
    assert_eq!(fixed_to_int(-FIXED_E), -1);
    assert_eq!(fixed_frac(int_to_fixed(5) + 0x1234), 0x1234);
    assert_eq!(double_to_fixed(1.5), FIXED_ONE + FIXED_HALF);
    assert_eq!(fixed_to_double(FIXED_HALF), 0.5);
}

#[test]
fn identity_leaves_points_alone() {
    let p = [int_to_fixed(7) + FIXED_HALF, int_to_fixed(-3), FIXED_ONE];
    assert_eq!(Transform::IDENTITY.transform_point_3d(p), Some(p));
    assert!(Transform::default().is_identity());
    assert!(Transform::IDENTITY.is_affine());
}

#[test]
fn scale_and_translate_compose_right_to_left() {
    let t = Transform::translate(10.0, 0.0)
        .multiply(&Transform::scale(2.0, 2.0))
        .unwrap();
    let p = t
        .transform_point_3d([int_to_fixed(1), int_to_fixed(1), FIXED_ONE])
        .unwrap();
    assert_eq!(p, [int_to_fixed(12), int_to_fixed(2), FIXED_ONE]);
}

#[test]
fn quarter_turn_is_exact() {
    let t = Transform::rotate_degrees(90.0);
    assert_eq!(t.matrix[0][0], 0);
    assert_eq!(t.matrix[0][1], -FIXED_ONE);
    assert_eq!(t.matrix[1][0], FIXED_ONE);
    let p = t
        .transform_point_3d([int_to_fixed(2), int_to_fixed(1), FIXED_ONE])
        .unwrap();
    assert_eq!(p, [int_to_fixed(-1), int_to_fixed(2), FIXED_ONE]);
}

#[test]
fn kurbo_affine_maps_columns() {
    let a = kurbo::Affine::new([2.0, 0.5, 0.25, 3.0, 4.0, -1.0]);
    let t = Transform::from_affine(a);
    assert_eq!(
        t.matrix,
        [
            [2 * FIXED_ONE, FIXED_ONE / 4, 4 * FIXED_ONE],
            [FIXED_HALF, 3 * FIXED_ONE, -FIXED_ONE],
            [0, 0, FIXED_ONE],
        ]
    );
}

#[test]
fn projective_rows_are_not_affine() {
    let mut t = Transform::IDENTITY;
    t.matrix[2][0] = FIXED_HALF;
    assert!(!t.is_affine());
}

#[test]
fn overflow_is_reported() {
    let t = Transform::scale(30000.0, 1.0);
    assert_eq!(
        t.transform_point_3d([int_to_fixed(30000), 0, FIXED_ONE]),
        None
    );
    let big = Transform::scale(20000.0, 1.0);
    assert_eq!(big.multiply(&big), None);
}

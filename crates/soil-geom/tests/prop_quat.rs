use proptest::prelude::*;
use soil_geom::{Quat, Vec3, calc_normal};

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn vapprox(a: Vec3, b: Vec3, eps: f64) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn arb_angles() -> impl Strategy<Value = [f64; 3]> {
    (-3.1f64..3.1, -1.5f64..1.5, -3.1f64..3.1).prop_map(|(a, b, c)| [a, b, c])
}

proptest! {
    // Rotations preserve length.
    #[test]
    fn rotate_preserves_length(angles in arb_angles(), v in arb_vec3()) {
        let q = Quat::from_euler_zyx(angles);
        prop_assert!(approx(q.rotate(v).length(), v.length(), 1e-9));
    }

    // Euler conversion yields a unit quaternion with non-negative scalar part.
    #[test]
    fn euler_gives_unit_quat(angles in arb_angles()) {
        let q = Quat::from_euler_zyx(angles);
        prop_assert!(approx(q.norm_squared(), 1.0, 1e-12));
        prop_assert!(q.w >= 0.0);
    }

    // The conjugate undoes a rotation.
    #[test]
    fn conjugate_inverts_rotation(angles in arb_angles(), v in arb_vec3()) {
        let q = Quat::from_euler_zyx(angles);
        let back = q.conjugate().rotate(q.rotate(v));
        prop_assert!(vapprox(back, v, 1e-9));
    }

    // Rotating by a product equals rotating in sequence.
    #[test]
    fn product_composes(a in arb_angles(), b in arb_angles(), v in arb_vec3()) {
        let q1 = Quat::from_euler_zyx(a);
        let q2 = Quat::from_euler_zyx(b);
        let lhs = (q1 * q2).rotate(v);
        let rhs = q2.rotate(q1.rotate(v));
        prop_assert!(vapprox(lhs, rhs, 1e-9));
    }

    // A non-normalized quaternion rotates the same as its unit version.
    #[test]
    fn rotate_ignores_scale(angles in arb_angles(), v in arb_vec3(), s in 0.1f64..5.0) {
        let q = Quat::from_euler_zyx(angles);
        let scaled = Quat::new(q.w * s, q.x * s, q.y * s, q.z * s);
        prop_assert!(vapprox(scaled.rotate(v), q.rotate(v), 1e-9));
    }

    // Normal is orthogonal to both edges of the triangle.
    #[test]
    fn normal_is_orthogonal(a in arb_vec3(), b in arb_vec3(), c in arb_vec3()) {
        let ab = b - a;
        let ac = c - a;
        prop_assume!(ab.cross(ac).length() > 1e-3);
        let n = calc_normal(a, b, c);
        prop_assert!(approx(n.length(), 1.0, 1e-9));
        prop_assert!(approx(n.dot(ab), 0.0, 1e-6 * ab.length().max(1.0)));
        prop_assert!(approx(n.dot(ac), 0.0, 1e-6 * ac.length().max(1.0)));
    }
}

#[test]
fn pitch_rotates_in_xz_plane() {
    let q = Quat::from_euler_zyx([0.0, core::f64::consts::FRAC_PI_2, 0.0]);
    let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
    assert!(vapprox(r, Vec3::new(0.0, 0.0, 1.0), 1e-12), "{r:?}");
}

#[test]
fn hamilton_basis_products() {
    let i = Quat::new(0.0, 1.0, 0.0, 0.0);
    let j = Quat::new(0.0, 0.0, 1.0, 0.0);
    let k = Quat::new(0.0, 0.0, 0.0, 1.0);
    assert_eq!(i * j, k);
    assert_eq!(j * i, -k);
    assert_eq!(i * i, Quat::new(-1.0, 0.0, 0.0, 0.0));
}

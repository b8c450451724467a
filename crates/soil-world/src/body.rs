use serde::Deserialize;
use soil_geom::{Quat, Vec3, calc_normal};

use crate::error::SoilError;
use crate::grid::Grid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Bucket,
    Blade,
}

/// World position of the body origin and its orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub pos: Vec3,
    pub ori: Quat,
}

impl Pose {
    pub fn new(pos: Vec3, ori: Quat) -> Self {
        Self { pos, ori }
    }
}

/// The six corners of the body: joint, base and teeth, on the right and
/// left sides.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corners {
    pub j_r: Vec3,
    pub j_l: Vec3,
    pub b_r: Vec3,
    pub b_l: Vec3,
    pub t_r: Vec3,
    pub t_l: Vec3,
}

impl Corners {
    pub fn all(&self) -> [Vec3; 6] {
        [self.j_r, self.j_l, self.b_r, self.b_l, self.t_r, self.t_l]
    }

    /// Largest distance travelled by any corner between two poses.
    pub fn max_displacement(&self, other: &Corners) -> f64 {
        self.all()
            .iter()
            .zip(other.all().iter())
            .map(|(a, b)| a.distance(*b))
            .fold(0.0, f64::max)
    }
}

/// Rigid tool made of a base, a back wall and two triangular side walls.
///
/// Landmarks are stored relative to the body origin in its reference pose.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    pub j_pos_init: Vec3,
    pub b_pos_init: Vec3,
    pub t_pos_init: Vec3,
    pub width: f64,
    /// Last pose applied to the soil, `None` before the first step.
    pub pose: Option<Pose>,
}

impl Body {
    pub fn new(
        kind: BodyKind,
        o_pos: Vec3,
        j_pos: Vec3,
        b_pos: Vec3,
        t_pos: Vec3,
        width: f64,
    ) -> Result<Self, SoilError> {
        if j_pos == b_pos {
            return Err(SoilError::CoincidentLandmarks("j_pos_init", "b_pos_init"));
        }
        if j_pos == t_pos {
            return Err(SoilError::CoincidentLandmarks("j_pos_init", "t_pos_init"));
        }
        if b_pos == t_pos {
            return Err(SoilError::CoincidentLandmarks("b_pos_init", "t_pos_init"));
        }
        if !(width > 0.0) {
            return Err(SoilError::NonPositive {
                name: "width",
                value: width,
            });
        }
        Ok(Self {
            kind,
            j_pos_init: j_pos - o_pos,
            b_pos_init: b_pos - o_pos,
            t_pos_init: t_pos - o_pos,
            width,
            pose: None,
        })
    }

    pub fn bucket(o: Vec3, j: Vec3, b: Vec3, t: Vec3, width: f64) -> Result<Self, SoilError> {
        Self::new(BodyKind::Bucket, o, j, b, t, width)
    }

    pub fn blade(o: Vec3, j: Vec3, b: Vec3, t: Vec3, width: f64) -> Result<Self, SoilError> {
        Self::new(BodyKind::Blade, o, j, b, t, width)
    }

    #[inline]
    pub fn current_pose(&self) -> Pose {
        self.pose.unwrap_or_default()
    }

    /// World-space corners of the body at `pose`.
    pub fn corners(&self, pose: &Pose) -> Corners {
        let j = pose.ori.rotate(self.j_pos_init);
        let b = pose.ori.rotate(self.b_pos_init);
        let t = pose.ori.rotate(self.t_pos_init);
        let half = calc_normal(j, b, t) * (0.5 * self.width);
        let (j, b, t) = (j + pose.pos, b + pose.pos, t + pose.pos);
        Corners {
            j_r: j + half,
            j_l: j - half,
            b_r: b + half,
            b_l: b - half,
            t_r: t + half,
            t_l: t - half,
        }
    }

    /// Position of the point `(vect_x[ii], vect_y[jj], z)` in the body frame
    /// of the current pose.
    pub fn frame_pos(&self, grid: &Grid, ii: usize, jj: usize, z: f64) -> Vec3 {
        let pose = self.current_pose();
        let local = Vec3::new(grid.vect_x[ii], grid.vect_y[jj], z) - pose.pos;
        pose.ori.conjugate().rotate(local)
    }

    /// World position of a point given in the body frame.
    pub fn world_pos(&self, pose: &Pose, local: Vec3) -> Vec3 {
        pose.ori.rotate(local) + pose.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> Body {
        Body::bucket(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -0.5),
            Vec3::new(0.7, 0.0, -0.5),
            0.5,
        )
        .unwrap()
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn rejects_bad_landmarks() {
        let z = Vec3::ZERO;
        let b = Vec3::new(0.0, 0.0, -0.5);
        assert_eq!(
            Body::bucket(z, z, z, b, 0.5),
            Err(SoilError::CoincidentLandmarks("j_pos_init", "b_pos_init"))
        );
        assert_eq!(
            Body::blade(z, z, b, b, 0.5),
            Err(SoilError::CoincidentLandmarks("b_pos_init", "t_pos_init"))
        );
        assert!(matches!(
            Body::bucket(z, z, b, Vec3::new(1.0, 0.0, 0.0), 0.0),
            Err(SoilError::NonPositive { name: "width", .. })
        ));
    }

    #[test]
    fn landmarks_are_relative_to_origin() {
        let o = Vec3::new(1.0, 2.0, 3.0);
        let body = Body::bucket(
            o,
            o + Vec3::new(0.0, 0.0, 1.0),
            o + Vec3::new(0.5, 0.0, 0.0),
            o + Vec3::new(1.0, 0.0, 0.0),
            0.2,
        )
        .unwrap();
        assert!(close(body.j_pos_init, Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(body.pose, None);
    }

    #[test]
    fn corners_are_offset_along_side_normal() {
        let body = bucket();
        let pose = Pose::new(Vec3::new(0.1, 0.2, 0.3), Quat::IDENTITY);
        let c = body.corners(&pose);
        // j, b, t lie in the xz plane; the side normal is along y.
        assert!(((c.j_r.y - c.j_l.y).abs() - 0.5).abs() < 1e-12);
        assert!(close((c.b_r + c.b_l) / 2.0, Vec3::new(0.1, 0.2, -0.2)));
        assert!(close((c.t_r + c.t_l) / 2.0, Vec3::new(0.8, 0.2, -0.2)));
        assert!(c.max_displacement(&c) == 0.0);
    }

    #[test]
    fn frame_pos_inverts_world_pos() {
        let grid = Grid::new(1.0, 1.0, 1.0, 0.1, 0.1).unwrap();
        let mut body = bucket();
        let pose = Pose::new(
            Vec3::new(0.05, -0.1, 0.2),
            Quat::from_euler_zyx([0.3, -0.4, 0.1]),
        );
        body.pose = Some(pose);
        let local = body.frame_pos(&grid, 12, 7, 0.15);
        let world = body.world_pos(&pose, local);
        assert!(close(world, Vec3::new(grid.vect_x[12], grid.vect_y[7], 0.15)));
    }
}

use glam::{Quat, Vec3};

/// One recorded instant of an entity's interpolatable state.
///
/// `velocity` is only present when the host reported a physics body for the
/// entity at the time the sample was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Option<Vec3>,
}

impl Sample {
    pub fn new(position: Vec3, rotation: Quat, velocity: Option<Vec3>) -> Self {
        Self {
            position,
            rotation,
            velocity,
        }
    }

    pub fn at_rest(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, None)
    }

    /// Unclamped blend from `self` toward `older`. `t` outside [0, 1]
    /// extrapolates along the same line.
    pub fn lerp_unclamped(&self, older: &Sample, t: f32) -> Sample {
        let velocity = match (self.velocity, older.velocity) {
            (Some(newer), Some(older)) => Some(lerp_vec3(newer, older, t)),
            _ => None,
        };
        Sample {
            position: lerp_vec3(self.position, older.position, t),
            rotation: nlerp_unclamped(self.rotation, older.rotation, t),
            velocity,
        }
    }
}

// Weighted form keeps both endpoints exact.
fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

fn nlerp_unclamped(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    let blended = a * (1.0 - t) + b * t;
    if blended.length_squared() <= f32::EPSILON {
        return a;
    }
    blended.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn sample(x: f32, yaw: f32, velocity: Option<Vec3>) -> Sample {
        Sample::new(Vec3::new(x, 0.0, 0.0), Quat::from_rotation_y(yaw), velocity)
    }

    #[test]
    fn lerp_endpoints_are_exact_for_position() {
        let newer = sample(1.25, 0.0, None);
        let older = sample(-3.5, 0.4, None);

        assert_eq!(newer.lerp_unclamped(&older, 0.0).position, newer.position);
        assert_eq!(newer.lerp_unclamped(&older, 1.0).position, older.position);
    }

    #[test]
    fn lerp_rotation_endpoints_match_within_tolerance() {
        let newer = sample(0.0, 0.2, None);
        let older = sample(0.0, 1.1, None);

        assert!(newer
            .lerp_unclamped(&older, 0.0)
            .rotation
            .abs_diff_eq(newer.rotation, EPS));
        assert!(newer
            .lerp_unclamped(&older, 1.0)
            .rotation
            .abs_diff_eq(older.rotation, EPS));
    }

    #[test]
    fn lerp_overshoot_extrapolates_instead_of_clamping() {
        let newer = sample(0.0, 0.0, None);
        let older = sample(10.0, 0.0, None);

        let over = newer.lerp_unclamped(&older, 1.1);
        let under = newer.lerp_unclamped(&older, -0.1);

        assert!((over.position.x - 11.0).abs() < EPS);
        assert!((under.position.x + 1.0).abs() < EPS);
    }

    #[test]
    fn lerp_rotation_takes_short_path_across_hemispheres() {
        let newer = Quat::from_rotation_y(0.1);
        let older = -Quat::from_rotation_y(0.3);
        let mid = sample(0.0, 0.0, None);
        let a = Sample { rotation: newer, ..mid };
        let b = Sample { rotation: older, ..mid };

        let blended = a.lerp_unclamped(&b, 0.5).rotation;
        let expected = Quat::from_rotation_y(0.2);
        assert!(blended.abs_diff_eq(expected, 1e-3) || blended.abs_diff_eq(-expected, 1e-3));
        assert!((blended.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn velocity_blends_only_when_both_samples_have_a_body() {
        let with_body = sample(0.0, 0.0, Some(Vec3::new(2.0, 0.0, 0.0)));
        let other_body = sample(0.0, 0.0, Some(Vec3::new(4.0, 0.0, 0.0)));
        let without_body = sample(0.0, 0.0, None);

        let blended = with_body.lerp_unclamped(&other_body, 0.5);
        assert_eq!(blended.velocity, Some(Vec3::new(3.0, 0.0, 0.0)));
        assert_eq!(with_body.lerp_unclamped(&without_body, 0.5).velocity, None);
    }
}

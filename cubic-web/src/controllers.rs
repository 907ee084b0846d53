//! Controller helpers: pose conversion, ids and pointer geometry
//!
//! Kept free of JS types so the mapping can be tested off the browser.

use cubic::Ray;
use cubic_protocol::{ControllerId, Hand, PoseData};

/// Length of the drawn target ray, in world units
pub const POINTER_LENGTH: f32 = 10.0;

/// Build a pose from a WebXR rigid transform's position and orientation.
/// The position's `w` component is ignored.
pub fn pose_data(position: [f64; 3], orientation: [f64; 4]) -> PoseData {
    PoseData {
        position: position.map(|v| v as f32),
        orientation: orientation.map(|v| v as f32),
    }
}

/// Controller 0 is the left hand, 1 the right. Input sources without a
/// handedness keep their slot in the session's input list.
pub fn controller_id(hand: Option<Hand>, slot: usize) -> ControllerId {
    match hand {
        Some(Hand::Left) => 0,
        Some(Hand::Right) => 1,
        None => slot as ControllerId,
    }
}

/// Start and end of a controller's pointer line.
pub fn pointer_segment(pose: &PoseData) -> [[f32; 3]; 2] {
    let ray = Ray::from_pose_data(pose);
    [ray.origin.to_array(), ray.at(POINTER_LENGTH).to_array()]
}

/// Flat vertex list for `GL_LINES`, one segment per pose.
pub fn pointer_lines(poses: &[PoseData]) -> Vec<[f32; 3]> {
    poses.iter().flat_map(pointer_segment).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    #[test]
    fn test_pose_data_narrows() {
        let pose = pose_data([1.0, 1.6, -0.5], IDENTITY);
        assert_eq!(pose.position, [1.0, 1.6, -0.5]);
        assert_eq!(pose.orientation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_controller_id_by_hand() {
        assert_eq!(controller_id(Some(Hand::Left), 1), 0);
        assert_eq!(controller_id(Some(Hand::Right), 0), 1);
        assert_eq!(controller_id(None, 1), 1);
    }

    #[test]
    fn test_pointer_follows_negative_z() {
        let pose = pose_data([0.0, 1.0, 0.0], IDENTITY);
        let [start, end] = pointer_segment(&pose);
        assert_eq!(start, [0.0, 1.0, 0.0]);
        assert!((end[2] + POINTER_LENGTH).abs() < 1e-5);
        assert!((end[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pointer_rotated_quarter_turn() {
        // 90 degrees about +Y turns -Z into -X
        let half = std::f64::consts::FRAC_1_SQRT_2;
        let pose = pose_data([0.0, 0.0, 0.0], [0.0, half, 0.0, half]);
        let [_, end] = pointer_segment(&pose);
        assert!((end[0] + POINTER_LENGTH).abs() < 1e-4);
        assert!(end[2].abs() < 1e-4);
    }

    #[test]
    fn test_pointer_lines_two_vertices_per_pose() {
        let poses = [pose_data([0.0; 3], IDENTITY), pose_data([1.0; 3], IDENTITY)];
        let lines = pointer_lines(&poses);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], [1.0, 1.0, 1.0]);
    }
}

// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View and projection math for stereo head-mounted rendering.
//!
//! Pure functions, all deterministic: projection from field-of-view angles
//! with an infinite far plane, the tangent-angle matrix the compositor uses
//! to warp each eye layer, the head-on-a-stick model that synthesizes a head
//! position from orientation alone, and the per-eye view matrices.
//!
//! Matrices are `glam` column-major throughout.

use glam::{Mat4, Vec3};

use crate::vr::{Eye, Tracking};

/// Parameters of the synthetic head model, in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadModelParms {
    /// Distance between pupils.
    pub interpupillary_distance: f32,
    /// Eye height above the floor; unused by the view math itself but part
    /// of the model a service would scale.
    pub eye_height: f32,
    /// Eye offset forward of the neck pivot.
    pub head_model_depth: f32,
    /// Eye offset above the neck pivot.
    pub head_model_height: f32,
}

impl Default for HeadModelParms {
    fn default() -> Self {
        Self {
            interpupillary_distance: 0.0640,
            eye_height: 1.6750,
            head_model_depth: 0.0805,
            head_model_height: 0.0750,
        }
    }
}

/// Builds a perspective projection from symmetric field-of-view angles.
///
/// `far_z <= near_z` selects an infinite far plane, the normal case for
/// head-mounted rendering where the far clip would only cost precision.
#[must_use]
pub fn projection_from_fov(
    fov_x_degrees: f32,
    fov_y_degrees: f32,
    near_z: f32,
    far_z: f32,
) -> Mat4 {
    let half_width = near_z * (fov_x_degrees.to_radians() * 0.5).tan();
    let half_height = near_z * (fov_y_degrees.to_radians() * 0.5).tan();
    projection_from_frustum(
        -half_width,
        half_width,
        -half_height,
        half_height,
        near_z,
        far_z,
    )
}

/// Builds a projection from near-plane frustum extents.
fn projection_from_frustum(
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
    near_z: f32,
    far_z: f32,
) -> Mat4 {
    let width = max_x - min_x;
    let height = max_y - min_y;
    let rows = if far_z <= near_z {
        // Infinite far plane.
        [
            [2.0 * near_z / width, 0.0, (max_x + min_x) / width, 0.0],
            [0.0, 2.0 * near_z / height, (max_y + min_y) / height, 0.0],
            [0.0, 0.0, -1.0, -2.0 * near_z],
            [0.0, 0.0, -1.0, 0.0],
        ]
    } else {
        [
            [2.0 * near_z / width, 0.0, (max_x + min_x) / width, 0.0],
            [0.0, 2.0 * near_z / height, (max_y + min_y) / height, 0.0],
            [
                0.0,
                0.0,
                -(far_z + near_z) / (far_z - near_z),
                -2.0 * far_z * near_z / (far_z - near_z),
            ],
            [0.0, 0.0, -1.0, 0.0],
        ]
    };
    mat4_from_rows(rows)
}

/// Derives the matrix mapping tangent-angle space into texture coordinates
/// for a layer rendered with `projection`.
#[must_use]
pub fn tan_angle_matrix_from_projection(projection: &Mat4) -> Mat4 {
    // Row-major elements of the projection: m[row][col].
    let m00 = projection.x_axis.x;
    let m02 = projection.z_axis.x;
    let m11 = projection.y_axis.y;
    let m12 = projection.z_axis.y;
    mat4_from_rows([
        [0.5 * m00, 0.0, 0.5 * m02 - 0.5, 0.0],
        [0.0, 0.5 * m11, 0.5 * m12 - 0.5, 0.0],
        [0.0, 0.0, -1.0, 0.0],
        [0.0, 0.0, -1.0, 0.0],
    ])
}

/// Synthesizes a head position from orientation alone: rotate the neck-pivot
/// offset by the head orientation and subtract the unrotated offset. Used
/// when the service has no positional tracking.
#[must_use]
pub fn apply_head_model(parms: &HeadModelParms, tracking: &Tracking) -> Tracking {
    let offset = Vec3::new(0.0, parms.head_model_height, -parms.head_model_depth);
    let mut adjusted = *tracking;
    adjusted.head_pose.pose.position = tracking.head_pose.pose.orientation * offset - offset;
    adjusted
}

/// View matrix for the point between the eyes.
#[must_use]
pub fn center_eye_view_matrix(tracking: &Tracking) -> Mat4 {
    let pose = tracking.head_pose.pose;
    Mat4::from_rotation_translation(pose.orientation, pose.position).inverse()
}

/// View matrix for one eye: the center view shifted half the interpupillary
/// distance along the view-space X axis.
#[must_use]
pub fn eye_view_matrix(parms: &HeadModelParms, center_view: &Mat4, eye: Eye) -> Mat4 {
    let offset = match eye {
        Eye::Left => 0.5 * parms.interpupillary_distance,
        Eye::Right => -0.5 * parms.interpupillary_distance,
    };
    Mat4::from_translation(Vec3::new(offset, 0.0, 0.0)) * *center_view
}

/// Rotation about X, then Y, then Z, from per-axis angles in radians.
#[must_use]
pub fn rotation_xyz(radians: Vec3) -> Mat4 {
    Mat4::from_rotation_z(radians.z)
        * Mat4::from_rotation_y(radians.y)
        * Mat4::from_rotation_x(radians.x)
}

/// Builds a `Mat4` from row-major rows.
fn mat4_from_rows(rows: [[f32; 4]; 4]) -> Mat4 {
    let mut flat = [0.0; 16];
    for (i, row) in rows.iter().enumerate() {
        flat[i * 4..i * 4 + 4].copy_from_slice(row);
    }
    Mat4::from_cols_array(&flat).transpose()
}

// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stereo frame rendering.
//!
//! [`EyeRenderers`] owns one framebuffer pool per eye plus the projection
//! derived from the HMD's suggested field of view, and turns a scene,
//! simulation state, and head pose into a submitted-ready
//! [`FrameDescriptor`]:
//!
//! ```text
//!   instance transforms ─► per-eye: bind slot ─► clear ─► instanced draw
//!                                   ─► border clear ─► resolve ─► advance
//!                                   ─► eye layer (chain, slot, tan-angles, pose)
//! ```
//!
//! With reduced latency enabled, each eye re-predicts orientation at render
//! time against the original prediction timestamp; position stays pinned to
//! the simulated pose so the world does not shear between eyes.

use bytemuck::cast_slice;
use glam::Mat4;

use crate::framebuffer::{EyeFramebuffer, FramebufferError};
use crate::gl::{BufferTarget, DepthCompare, GlDriver};
use crate::math::{
    HeadModelParms, center_eye_view_matrix, eye_view_matrix, projection_from_fov, rotation_xyz,
    tan_angle_matrix_from_projection,
};
use crate::scene::{NUM_INSTANCES, Scene};
use crate::simulation::Simulation;
use crate::vr::{
    ColorFormat, Eye, EyeLayer, FrameDescriptor, FrameKind, HmdInfo, PerformanceParms, SessionId,
    Tracking, VrService,
};

/// Sample count for the eye framebuffers.
pub const NUM_MULTI_SAMPLES: u32 = 4;

/// Near plane distance; the far plane is infinite.
const NEAR_Z: f32 = 1.0;

/// Per-eye render targets plus the shared projection.
#[derive(Debug)]
pub struct EyeRenderers {
    framebuffers: [EyeFramebuffer; Eye::COUNT],
    projection: Mat4,
    tex_coords_from_tan_angles: Mat4,
}

impl EyeRenderers {
    /// Builds one framebuffer pool per eye at the HMD-suggested resolution
    /// and derives the projection and tangent-angle matrices from the
    /// suggested field of view.
    pub fn create<G: GlDriver, V: VrService>(
        gl: &mut G,
        vr: &mut V,
        hmd: &HmdInfo,
    ) -> Result<Self, FramebufferError> {
        let left = EyeFramebuffer::create(
            gl,
            vr,
            ColorFormat::Rgba8888,
            hmd.suggested_eye_width,
            hmd.suggested_eye_height,
            NUM_MULTI_SAMPLES,
        )?;
        let right = EyeFramebuffer::create(
            gl,
            vr,
            ColorFormat::Rgba8888,
            hmd.suggested_eye_width,
            hmd.suggested_eye_height,
            NUM_MULTI_SAMPLES,
        )?;
        let projection = projection_from_fov(
            hmd.suggested_fov_x_degrees,
            hmd.suggested_fov_y_degrees,
            NEAR_Z,
            0.0,
        );
        let tex_coords_from_tan_angles = tan_angle_matrix_from_projection(&projection);
        Ok(Self {
            framebuffers: [left, right],
            projection,
            tex_coords_from_tan_angles,
        })
    }

    /// Releases both framebuffer pools.
    pub fn destroy<G: GlDriver, V: VrService>(self, gl: &mut G, vr: &mut V) {
        let [left, right] = self.framebuffers;
        left.destroy(gl, vr);
        right.destroy(gl, vr);
    }

    /// Renders both eyes and returns the frame descriptor for submission.
    ///
    /// `tracking` is the head-model-adjusted prediction the simulation used;
    /// `reduced_latency` re-predicts orientation per eye at render time.
    pub fn render_frame<G: GlDriver, V: VrService>(
        &mut self,
        gl: &mut G,
        vr: &mut V,
        session: SessionId,
        frame_index: i64,
        min_vsyncs: i32,
        performance: PerformanceParms,
        scene: &Scene,
        simulation: &Simulation,
        tracking: &Tracking,
        reduced_latency: bool,
    ) -> FrameDescriptor {
        self.upload_instance_transforms(gl, scene, simulation);

        let head_model = HeadModelParms::default();
        let left = self.render_eye(
            gl,
            vr,
            session,
            Eye::Left,
            scene,
            tracking,
            reduced_latency,
            &head_model,
        );
        let right = self.render_eye(
            gl,
            vr,
            session,
            Eye::Right,
            scene,
            tracking,
            reduced_latency,
            &head_model,
        );
        EyeFramebuffer::set_none(gl);

        FrameDescriptor {
            kind: FrameKind::Normal,
            frame_index,
            min_vsyncs,
            performance,
            layers: Some([left, right]),
        }
    }

    /// Rewrites the instance transform buffer for the current simulation
    /// state, orphaning the previous frame's contents.
    fn upload_instance_transforms<G: GlDriver>(
        &self,
        gl: &mut G,
        scene: &Scene,
        simulation: &Simulation,
    ) {
        let mut transforms: Vec<[f32; 16]> = Vec::with_capacity(NUM_INSTANCES);
        for (position, rate) in scene.positions().iter().zip(scene.rotations()) {
            let rotation = rotation_xyz(*rate * simulation.current_rotation);
            let transform = Mat4::from_translation(*position) * rotation;
            transforms.push(transform.to_cols_array());
        }
        gl.bind_buffer(BufferTarget::Array, Some(scene.instance_transform_buffer()));
        gl.write_buffer_invalidate(BufferTarget::Array, cast_slice(&transforms));
        gl.bind_buffer(BufferTarget::Array, None);
    }

    fn render_eye<G: GlDriver, V: VrService>(
        &mut self,
        gl: &mut G,
        vr: &mut V,
        session: SessionId,
        eye: Eye,
        scene: &Scene,
        tracking: &Tracking,
        reduced_latency: bool,
        head_model: &HeadModelParms,
    ) -> EyeLayer {
        // Late re-prediction updates orientation only; position stays the
        // simulated pose so both eyes agree on where the head is.
        let updated_tracking = if reduced_latency {
            let mut updated = vr.predicted_tracking(session, tracking.head_pose.time_in_seconds);
            updated.head_pose.pose.position = tracking.head_pose.pose.position;
            updated
        } else {
            *tracking
        };

        let center_view = center_eye_view_matrix(&updated_tracking);
        let eye_view = eye_view_matrix(head_model, &center_view, eye);

        let framebuffer = &self.framebuffers[eye.index()];
        let width = i32::try_from(framebuffer.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(framebuffer.height()).unwrap_or(i32::MAX);
        framebuffer.set_current(gl);

        gl.set_scissor_test(true);
        gl.set_depth_write(true);
        gl.set_depth_test(true);
        gl.set_depth_compare(DepthCompare::LessOrEqual);
        gl.viewport(0, 0, width, height);
        gl.scissor(0, 0, width, height);
        gl.clear_color(0.125, 0.0, 0.125, 1.0);
        gl.clear(true, true);

        gl.use_program(Some(scene.program()));
        if let Some(location) = scene.view_matrix_location() {
            gl.set_uniform_mat4(location, &eye_view.to_cols_array());
        }
        if let Some(location) = scene.projection_matrix_location() {
            gl.set_uniform_mat4(location, &self.projection.to_cols_array());
        }
        gl.bind_vertex_array(scene.vertex_array());
        #[expect(
            clippy::cast_possible_truncation,
            reason = "instance count is a small compile-time constant"
        )]
        gl.draw_elements_instanced_u16(scene.index_count(), NUM_INSTANCES as i32);
        gl.bind_vertex_array(None);
        gl.use_program(None);

        // The driver has no clamp-to-border; clear a one-pixel black border
        // so edge texels sampled by the compositor warp stay opaque black.
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.scissor(0, 0, width, 1);
        gl.clear(true, false);
        gl.scissor(0, height - 1, width, 1);
        gl.clear(true, false);
        gl.scissor(0, 0, 1, height);
        gl.clear(true, false);
        gl.scissor(width - 1, 0, 1, height);
        gl.clear(true, false);

        framebuffer.resolve(gl);

        let layer = EyeLayer {
            swap_chain: framebuffer.swap_chain_id(),
            swap_chain_index: framebuffer.index(),
            tex_coords_from_tan_angles: self.tex_coords_from_tan_angles,
            head_pose: updated_tracking.head_pose,
        };
        self.framebuffers[eye.index()].advance();
        layer
    }
}

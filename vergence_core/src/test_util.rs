// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal in-crate fakes for unit tests.
//!
//! These record just enough to assert the behaviors each module's tests
//! care about. The full-featured scripted doubles live in the harness
//! crate; keeping these small avoids a dev-dependency cycle.

use glam::Vec3;

use crate::display::{
    ConfigAttrib, ConfigId, ContextId, DisplayDriver, DisplayError, NativeWindow, SurfaceId,
};
use crate::gl::{
    AttribType, BufferId, BufferTarget, DepthCompare, FramebufferId, FramebufferStatus,
    GlCapabilities, GlDriver, GlErrorCode, ProgramId, RenderbufferId, ShaderId, ShaderStage,
    TextureId, UniformLocation, VertexArrayId,
};
use crate::vr::{
    ColorFormat, FrameDescriptor, HeadPose, HmdInfo, ModeParms, Posef, SessionId, SwapChain,
    SwapChainId, SystemActivity, SystemEventStatus, Tracking, VrError, VrService,
};

/// A GL driver that allocates handles and counts calls.
#[derive(Debug, Default)]
pub(crate) struct NullGl {
    pub(crate) capabilities: GlCapabilities,
    pub(crate) framebuffer_status: FramebufferStatus,
    pub(crate) error_queue: Vec<GlErrorCode>,
    pub(crate) fail_vertex_compile: Option<String>,
    pub(crate) fail_fragment_compile: Option<String>,
    pub(crate) fail_link: Option<String>,

    pub(crate) depth_storage_samples: Vec<u32>,
    pub(crate) multisample_attachments: usize,
    pub(crate) framebuffers_deleted: usize,
    pub(crate) renderbuffers_deleted: usize,
    pub(crate) vertex_arrays_created: usize,
    pub(crate) instanced_attribs: Vec<u32>,
    pub(crate) scissor_rects: Vec<(i32, i32, i32, i32)>,
    pub(crate) clears: usize,
    pub(crate) buffer_writes: usize,

    next_id: u32,
}

impl NullGl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GlDriver for NullGl {
    fn capabilities(&self) -> GlCapabilities {
        self.capabilities
    }

    fn set_texture_clamp_linear(&mut self, _texture: TextureId) {}

    fn create_renderbuffer(&mut self) -> RenderbufferId {
        RenderbufferId(self.next())
    }

    fn depth_renderbuffer_storage(
        &mut self,
        _renderbuffer: RenderbufferId,
        samples: u32,
        _width: u32,
        _height: u32,
    ) {
        self.depth_storage_samples.push(samples);
    }

    fn delete_renderbuffer(&mut self, _renderbuffer: RenderbufferId) {
        self.renderbuffers_deleted += 1;
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        FramebufferId(self.next())
    }

    fn bind_framebuffer(&mut self, _framebuffer: Option<FramebufferId>) {}

    fn framebuffer_color_texture(&mut self, _texture: TextureId) {}

    fn framebuffer_color_texture_multisample(&mut self, _texture: TextureId, _samples: u32) {
        self.multisample_attachments += 1;
    }

    fn framebuffer_depth_renderbuffer(&mut self, _renderbuffer: RenderbufferId) {}

    fn check_framebuffer_status(&mut self) -> FramebufferStatus {
        self.framebuffer_status
    }

    fn delete_framebuffer(&mut self, _framebuffer: FramebufferId) {
        self.framebuffers_deleted += 1;
    }

    fn invalidate_depth_attachment(&mut self) {}

    fn flush(&mut self) {}

    fn create_buffer(&mut self) -> BufferId {
        BufferId(self.next())
    }

    fn bind_buffer(&mut self, _target: BufferTarget, _buffer: Option<BufferId>) {}

    fn buffer_data_static(&mut self, _target: BufferTarget, _data: &[u8]) {}

    fn buffer_data_dynamic(&mut self, _target: BufferTarget, _size: usize) {}

    fn write_buffer_invalidate(&mut self, _target: BufferTarget, _data: &[u8]) {
        self.buffer_writes += 1;
    }

    fn delete_buffer(&mut self, _buffer: BufferId) {}

    fn create_vertex_array(&mut self) -> VertexArrayId {
        self.vertex_arrays_created += 1;
        VertexArrayId(self.next())
    }

    fn bind_vertex_array(&mut self, _vertex_array: Option<VertexArrayId>) {}

    fn enable_vertex_attrib(&mut self, _index: u32) {}

    fn vertex_attrib_pointer(
        &mut self,
        _index: u32,
        _size: i32,
        _ty: AttribType,
        _normalized: bool,
        _stride: i32,
        _offset: usize,
    ) {
    }

    fn vertex_attrib_divisor(&mut self, index: u32, _divisor: u32) {
        self.instanced_attribs.push(index);
    }

    fn delete_vertex_array(&mut self, _vertex_array: VertexArrayId) {}

    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<ShaderId, String> {
        let failure = match stage {
            ShaderStage::Vertex => self.fail_vertex_compile.clone(),
            ShaderStage::Fragment => self.fail_fragment_compile.clone(),
        };
        match failure {
            Some(log) => Err(log),
            None => Ok(ShaderId(self.next())),
        }
    }

    fn create_program(&mut self) -> ProgramId {
        ProgramId(self.next())
    }

    fn attach_shader(&mut self, _program: ProgramId, _shader: ShaderId) {}

    fn bind_attrib_location(&mut self, _program: ProgramId, _location: u32, _name: &str) {}

    fn link_program(&mut self, _program: ProgramId) -> Result<(), String> {
        match self.fail_link.clone() {
            Some(log) => Err(log),
            None => Ok(()),
        }
    }

    fn uniform_location(&mut self, _program: ProgramId, _name: &str) -> Option<UniformLocation> {
        Some(UniformLocation(i32::try_from(self.next()).unwrap_or(0)))
    }

    fn use_program(&mut self, _program: Option<ProgramId>) {}

    fn set_uniform_mat4(&mut self, _location: UniformLocation, _value: &[f32; 16]) {}

    fn delete_program(&mut self, _program: ProgramId) {}

    fn delete_shader(&mut self, _shader: ShaderId) {}

    fn set_scissor_test(&mut self, _enabled: bool) {}

    fn set_depth_test(&mut self, _enabled: bool) {}

    fn set_depth_write(&mut self, _enabled: bool) {}

    fn set_depth_compare(&mut self, _compare: DepthCompare) {}

    fn viewport(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.scissor_rects.push((x, y, width, height));
    }

    fn clear_color(&mut self, _red: f32, _green: f32, _blue: f32, _alpha: f32) {}

    fn clear(&mut self, _color: bool, _depth: bool) {
        self.clears += 1;
    }

    fn draw_elements_instanced_u16(&mut self, _index_count: i32, _instance_count: i32) {}

    fn poll_error(&mut self) -> Option<GlErrorCode> {
        if self.error_queue.is_empty() {
            None
        } else {
            Some(self.error_queue.remove(0))
        }
    }
}

/// Attribute set of one fake display config.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FakeConfig {
    pub(crate) renderable_type: i32,
    pub(crate) surface_type: i32,
    pub(crate) red: i32,
    pub(crate) green: i32,
    pub(crate) blue: i32,
    pub(crate) alpha: i32,
    pub(crate) depth: i32,
    pub(crate) samples: i32,
}

/// A display driver backed by a fixed config table.
#[derive(Debug)]
pub(crate) struct FakeDisplay {
    configs: Vec<FakeConfig>,
    pub(crate) contexts_created: usize,
    pub(crate) current: Option<(SurfaceId, ContextId)>,
    pub(crate) terminated: bool,
    pub(crate) fail_destroy_context: bool,
    next_id: u64,
}

impl FakeDisplay {
    pub(crate) fn new(configs: Vec<FakeConfig>) -> Self {
        Self {
            configs,
            contexts_created: 0,
            current: None,
            terminated: false,
            fail_destroy_context: false,
            next_id: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl DisplayDriver for FakeDisplay {
    fn initialize(&mut self) -> Result<(i32, i32), DisplayError> {
        Ok((1, 4))
    }

    fn configs(&mut self) -> Result<Vec<ConfigId>, DisplayError> {
        Ok((0..self.configs.len())
            .map(|index| ConfigId(u32::try_from(index).unwrap_or(u32::MAX)))
            .collect())
    }

    fn config_attrib(&mut self, config: ConfigId, attrib: ConfigAttrib) -> i32 {
        let config = self.configs[config.0 as usize];
        match attrib {
            ConfigAttrib::RenderableType => config.renderable_type,
            ConfigAttrib::SurfaceType => config.surface_type,
            ConfigAttrib::RedSize => config.red,
            ConfigAttrib::GreenSize => config.green,
            ConfigAttrib::BlueSize => config.blue,
            ConfigAttrib::AlphaSize => config.alpha,
            ConfigAttrib::DepthSize => config.depth,
            ConfigAttrib::Samples => config.samples,
        }
    }

    fn create_context(
        &mut self,
        _config: ConfigId,
        _share: Option<ContextId>,
    ) -> Result<ContextId, DisplayError> {
        self.contexts_created += 1;
        Ok(ContextId(self.next()))
    }

    fn create_pbuffer_surface(
        &mut self,
        _config: ConfigId,
        _width: i32,
        _height: i32,
    ) -> Result<SurfaceId, DisplayError> {
        Ok(SurfaceId(self.next()))
    }

    fn create_window_surface(
        &mut self,
        _config: ConfigId,
        _window: NativeWindow,
    ) -> Result<SurfaceId, DisplayError> {
        Ok(SurfaceId(self.next()))
    }

    fn make_current(&mut self, binding: Option<(SurfaceId, ContextId)>) -> Result<(), DisplayError> {
        self.current = binding;
        Ok(())
    }

    fn destroy_surface(&mut self, _surface: SurfaceId) -> Result<(), DisplayError> {
        Ok(())
    }

    fn destroy_context(&mut self, _context: ContextId) -> Result<(), DisplayError> {
        if self.fail_destroy_context {
            Err(DisplayError::new("destroy_context", "BAD_CONTEXT"))
        } else {
            Ok(())
        }
    }

    fn terminate(&mut self) -> Result<(), DisplayError> {
        self.terminated = true;
        Ok(())
    }
}

/// A tracking/compositor service that records session and frame traffic.
#[derive(Debug)]
pub(crate) struct FakeVr {
    pub(crate) swap_chain_len: usize,
    pub(crate) time: f64,
    pub(crate) predicted_position: Vec3,
    pub(crate) system_events: Vec<SystemEventStatus>,
    pub(crate) fail_enter: bool,

    pub(crate) entries: usize,
    pub(crate) leaves: usize,
    pub(crate) last_mode_parms: Option<ModeParms>,
    pub(crate) submitted: Vec<FrameDescriptor>,
    pub(crate) activities: Vec<SystemActivity>,
    pub(crate) swap_chains_destroyed: usize,
    pub(crate) tracking_queries: usize,

    next_id: u64,
}

impl FakeVr {
    pub(crate) fn with_swap_chain_len(len: usize) -> Self {
        Self {
            swap_chain_len: len,
            time: 0.0,
            predicted_position: Vec3::ZERO,
            system_events: Vec::new(),
            fail_enter: false,
            entries: 0,
            leaves: 0,
            last_mode_parms: None,
            submitted: Vec::new(),
            activities: Vec::new(),
            swap_chains_destroyed: 0,
            tracking_queries: 0,
            next_id: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl VrService for FakeVr {
    fn hmd_info(&self) -> HmdInfo {
        HmdInfo {
            suggested_eye_width: 1024,
            suggested_eye_height: 1024,
            suggested_fov_x_degrees: 90.0,
            suggested_fov_y_degrees: 90.0,
        }
    }

    fn enter_vr_mode(&mut self, parms: &ModeParms) -> Result<SessionId, VrError> {
        if self.fail_enter {
            return Err(VrError::new("enter_vr_mode", "not ready"));
        }
        self.entries += 1;
        self.last_mode_parms = Some(*parms);
        Ok(SessionId(self.next()))
    }

    fn leave_vr_mode(&mut self, _session: SessionId) {
        self.leaves += 1;
    }

    fn predicted_display_time(&mut self, _session: SessionId, frame_index: i64) -> f64 {
        #[expect(
            clippy::cast_precision_loss,
            reason = "test frame indices are tiny"
        )]
        let index = frame_index as f64;
        self.time + index * 0.016
    }

    fn predicted_tracking(&mut self, _session: SessionId, time_in_seconds: f64) -> Tracking {
        self.tracking_queries += 1;
        Tracking {
            head_pose: HeadPose {
                pose: Posef {
                    orientation: glam::Quat::IDENTITY,
                    position: self.predicted_position,
                },
                time_in_seconds,
            },
        }
    }

    fn create_swap_chain(
        &mut self,
        _format: ColorFormat,
        _width: u32,
        _height: u32,
    ) -> Result<SwapChain, VrError> {
        let id = SwapChainId(self.next());
        let textures = (0..self.swap_chain_len)
            .map(|_| TextureId(u32::try_from(self.next()).unwrap_or(u32::MAX)))
            .collect();
        Ok(SwapChain { id, textures })
    }

    fn destroy_swap_chain(&mut self, _chain: SwapChainId) {
        self.swap_chains_destroyed += 1;
    }

    fn submit_frame(&mut self, _session: SessionId, frame: &FrameDescriptor) {
        self.submitted.push(frame.clone());
    }

    fn poll_system_event(&mut self) -> SystemEventStatus {
        if self.system_events.is_empty() {
            SystemEventStatus::NotPending
        } else {
            self.system_events.remove(0)
        }
    }

    fn start_system_activity(&mut self, activity: SystemActivity) {
        self.activities.push(activity);
    }

    fn time_in_seconds(&mut self) -> f64 {
        self.time
    }
}

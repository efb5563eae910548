// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles for the vergence collaborator traits.
//!
//! One implementation per seam: [`RecordingGl`] for the graphics driver,
//! [`ScriptedDisplay`] for the display connection, [`FakeVrService`] for
//! the tracking/compositor service, and [`ScriptedPump`] for the event
//! pump. Together they let the scenario tests under `tests/` drive the
//! complete frame loop, in both configurations, without a device.
//!
//! The fakes record what happened rather than asserting inline, so a test
//! reads as: script the world, run the loop, inspect the records.

use std::collections::VecDeque;

use glam::Vec3;
use vergence_core::app::Event;
use vergence_core::display::{
    ConfigAttrib, ConfigId, ContextId, DisplayDriver, DisplayError, NativeWindow, SurfaceId,
};
use vergence_core::gl::{
    AttribType, BufferId, BufferTarget, DepthCompare, FramebufferId, FramebufferStatus,
    GlCapabilities, GlDriver, GlErrorCode, ProgramId, RenderbufferId, ShaderId, ShaderStage,
    TextureId, UniformLocation, VertexArrayId,
};
use vergence_core::main_loop::{EventPump, PollMode};
use vergence_core::vr::{
    ColorFormat, FrameDescriptor, FrameKind, HeadPose, HmdInfo, ModeParms, Posef, SessionId,
    SwapChain, SwapChainId, SystemActivity, SystemEventStatus, Tracking, VrError, VrService,
};

/// A graphics driver that hands out handles and keeps a call log.
#[derive(Debug, Default)]
pub struct RecordingGl {
    /// Capability flags reported to the code under test.
    pub capabilities: GlCapabilities,
    /// Status returned from every completeness check.
    pub framebuffer_status: FramebufferStatus,
    /// Names of draw-relevant calls, in order.
    pub calls: Vec<String>,
    /// Count of instanced draw calls.
    pub draws: usize,
    /// Count of buffer rewrites.
    pub buffer_writes: usize,
    next_id: u32,
}

impl RecordingGl {
    /// A fresh driver with default capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GlDriver for RecordingGl {
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
        _samples: u32,
        _width: u32,
        _height: u32,
    ) {
    }

    fn delete_renderbuffer(&mut self, _renderbuffer: RenderbufferId) {
        self.calls.push("delete_renderbuffer".to_owned());
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        FramebufferId(self.next())
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        match framebuffer {
            Some(id) => self.calls.push(format!("bind_framebuffer {}", id.0)),
            None => self.calls.push("bind_framebuffer default".to_owned()),
        }
    }

    fn framebuffer_color_texture(&mut self, _texture: TextureId) {}

    fn framebuffer_color_texture_multisample(&mut self, _texture: TextureId, _samples: u32) {}

    fn framebuffer_depth_renderbuffer(&mut self, _renderbuffer: RenderbufferId) {}

    fn check_framebuffer_status(&mut self) -> FramebufferStatus {
        self.framebuffer_status
    }

    fn delete_framebuffer(&mut self, _framebuffer: FramebufferId) {
        self.calls.push("delete_framebuffer".to_owned());
    }

    fn invalidate_depth_attachment(&mut self) {
        self.calls.push("invalidate_depth".to_owned());
    }

    fn flush(&mut self) {
        self.calls.push("flush".to_owned());
    }

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

    fn vertex_attrib_divisor(&mut self, _index: u32, _divisor: u32) {}

    fn delete_vertex_array(&mut self, _vertex_array: VertexArrayId) {}

    fn compile_shader(&mut self, _stage: ShaderStage, _source: &str) -> Result<ShaderId, String> {
        Ok(ShaderId(self.next()))
    }

    fn create_program(&mut self) -> ProgramId {
        ProgramId(self.next())
    }

    fn attach_shader(&mut self, _program: ProgramId, _shader: ShaderId) {}

    fn bind_attrib_location(&mut self, _program: ProgramId, _location: u32, _name: &str) {}

    fn link_program(&mut self, _program: ProgramId) -> Result<(), String> {
        Ok(())
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

    fn scissor(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn clear_color(&mut self, _red: f32, _green: f32, _blue: f32, _alpha: f32) {}

    fn clear(&mut self, _color: bool, _depth: bool) {}

    fn draw_elements_instanced_u16(&mut self, _index_count: i32, _instance_count: i32) {
        self.draws += 1;
    }

    fn poll_error(&mut self) -> Option<GlErrorCode> {
        None
    }
}

/// A display config offered by [`ScriptedDisplay`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayConfig {
    /// Renderable-type bitfield.
    pub renderable_type: i32,
    /// Surface-type bitfield.
    pub surface_type: i32,
    /// Channel sizes: red, green, blue, alpha.
    pub rgba: (i32, i32, i32, i32),
    /// Depth buffer size.
    pub depth: i32,
    /// Multisample count.
    pub samples: i32,
}

impl DisplayConfig {
    /// The config the context lifecycle looks for: ES-3 renderable, window
    /// and pbuffer capable, 8/8/8/8 color, no depth, no multisampling.
    #[must_use]
    pub fn matching() -> Self {
        Self {
            renderable_type: vergence_core::display::OPENGL_ES3_BIT,
            surface_type: vergence_core::display::WINDOW_BIT
                | vergence_core::display::PBUFFER_BIT,
            rgba: (8, 8, 8, 8),
            depth: 0,
            samples: 0,
        }
    }
}

/// A display driver backed by a fixed config table.
#[derive(Debug)]
pub struct ScriptedDisplay {
    configs: Vec<DisplayConfig>,
    /// The binding most recently made current.
    pub current: Option<(SurfaceId, ContextId)>,
    /// Surfaces created so far.
    pub surfaces_created: usize,
    /// Surfaces destroyed so far.
    pub surfaces_destroyed: usize,
    /// Whether the connection was terminated.
    pub terminated: bool,
    next_id: u64,
}

impl ScriptedDisplay {
    /// A display offering the given configs, in enumeration order.
    #[must_use]
    pub fn new(configs: Vec<DisplayConfig>) -> Self {
        Self {
            configs,
            current: None,
            surfaces_created: 0,
            surfaces_destroyed: 0,
            terminated: false,
            next_id: 0,
        }
    }

    /// A display whose first config satisfies the context lifecycle.
    #[must_use]
    pub fn with_matching_config() -> Self {
        Self::new(vec![DisplayConfig::matching()])
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl DisplayDriver for ScriptedDisplay {
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
            ConfigAttrib::RedSize => config.rgba.0,
            ConfigAttrib::GreenSize => config.rgba.1,
            ConfigAttrib::BlueSize => config.rgba.2,
            ConfigAttrib::AlphaSize => config.rgba.3,
            ConfigAttrib::DepthSize => config.depth,
            ConfigAttrib::Samples => config.samples,
        }
    }

    fn create_context(
        &mut self,
        _config: ConfigId,
        _share: Option<ContextId>,
    ) -> Result<ContextId, DisplayError> {
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
        self.surfaces_created += 1;
        Ok(SurfaceId(self.next()))
    }

    fn make_current(
        &mut self,
        binding: Option<(SurfaceId, ContextId)>,
    ) -> Result<(), DisplayError> {
        self.current = binding;
        Ok(())
    }

    fn destroy_surface(&mut self, _surface: SurfaceId) -> Result<(), DisplayError> {
        self.surfaces_destroyed += 1;
        Ok(())
    }

    fn destroy_context(&mut self, _context: ContextId) -> Result<(), DisplayError> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), DisplayError> {
        self.terminated = true;
        Ok(())
    }
}

/// A tracking/compositor service with a settable clock and an ordered log
/// of session traffic.
#[derive(Debug)]
pub struct FakeVrService {
    /// Slots per allocated swap chain.
    pub swap_chain_len: usize,
    /// Current clock value; advances by [`Self::time_step`] per query.
    pub now: f64,
    /// Clock advance per `time_in_seconds` call; models time passing
    /// between loop iterations.
    pub time_step: f64,
    /// Position reported by tracking predictions.
    pub predicted_position: Vec3,
    /// Queue of system-event statuses to report before `NotPending`.
    pub system_events: VecDeque<SystemEventStatus>,

    /// Every submitted frame, in order.
    pub submitted: Vec<FrameDescriptor>,
    /// Launched system activities, in order.
    pub activities: Vec<SystemActivity>,
    /// Ordered trace of session-relevant calls: `enter`, `leave`,
    /// `submit <kind>`, `activity <name>`.
    pub log: Vec<String>,
    /// Sessions entered.
    pub entries: usize,
    /// Sessions left.
    pub leaves: usize,
    /// Mode parms from the most recent entry.
    pub last_mode_parms: Option<ModeParms>,
    /// Swap chains destroyed.
    pub swap_chains_destroyed: usize,

    next_id: u64,
}

impl FakeVrService {
    /// A service handing out swap chains with `len` slots.
    #[must_use]
    pub fn with_swap_chain_len(len: usize) -> Self {
        Self {
            swap_chain_len: len,
            now: 0.0,
            time_step: 0.0,
            predicted_position: Vec3::ZERO,
            system_events: VecDeque::new(),
            submitted: Vec::new(),
            activities: Vec::new(),
            log: Vec::new(),
            entries: 0,
            leaves: 0,
            last_mode_parms: None,
            swap_chains_destroyed: 0,
            next_id: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn kind_name(kind: FrameKind) -> &'static str {
        match kind {
            FrameKind::Normal => "normal",
            FrameKind::LoadingIconFlush => "loading-icon",
            FrameKind::BlackFinal => "black-final",
        }
    }
}

impl VrService for FakeVrService {
    fn hmd_info(&self) -> HmdInfo {
        HmdInfo {
            suggested_eye_width: 1024,
            suggested_eye_height: 1024,
            suggested_fov_x_degrees: 90.0,
            suggested_fov_y_degrees: 90.0,
        }
    }

    fn enter_vr_mode(&mut self, parms: &ModeParms) -> Result<SessionId, VrError> {
        self.entries += 1;
        self.last_mode_parms = Some(*parms);
        self.log.push("enter".to_owned());
        Ok(SessionId(self.next()))
    }

    fn leave_vr_mode(&mut self, _session: SessionId) {
        self.leaves += 1;
        self.log.push("leave".to_owned());
    }

    fn predicted_display_time(&mut self, _session: SessionId, frame_index: i64) -> f64 {
        #[expect(clippy::cast_precision_loss, reason = "test frame indices are tiny")]
        let index = frame_index as f64;
        self.now + index * 0.016
    }

    fn predicted_tracking(&mut self, _session: SessionId, time_in_seconds: f64) -> Tracking {
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
        self.log.push(format!("submit {}", Self::kind_name(frame.kind)));
        self.submitted.push(frame.clone());
    }

    fn poll_system_event(&mut self) -> SystemEventStatus {
        self.system_events
            .pop_front()
            .unwrap_or(SystemEventStatus::NotPending)
    }

    fn start_system_activity(&mut self, activity: SystemActivity) {
        self.log.push(format!("activity {activity:?}"));
        self.activities.push(activity);
    }

    fn time_in_seconds(&mut self) -> f64 {
        let now = self.now;
        self.now += self.time_step;
        now
    }
}

/// One scripted step for [`ScriptedPump`].
#[derive(Clone, Copy, Debug)]
pub enum PumpStep {
    /// Deliver this event.
    Deliver(Event),
    /// Report an empty queue, letting the loop run one frame iteration.
    Idle,
}

/// An event pump that replays a script, then requests destruction.
#[derive(Debug)]
pub struct ScriptedPump {
    steps: VecDeque<PumpStep>,
    /// Poll modes observed, in order.
    pub polls: Vec<PollMode>,
}

impl ScriptedPump {
    /// A pump that replays `steps`, then reports destroy-requested.
    #[must_use]
    pub fn new(steps: Vec<PumpStep>) -> Self {
        Self {
            steps: steps.into(),
            polls: Vec::new(),
        }
    }
}

impl EventPump for ScriptedPump {
    fn poll(&mut self, mode: PollMode) -> Option<Event> {
        self.polls.push(mode);
        match self.steps.pop_front() {
            Some(PumpStep::Deliver(event)) => Some(event),
            Some(PumpStep::Idle) | None => None,
        }
    }

    fn destroy_requested(&self) -> bool {
        self.steps.is_empty()
    }
}

// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics-driver contract.
//!
//! [`GlDriver`] is the narrow GL-ES-3-shaped subset this system needs: depth
//! renderbuffers and framebuffer objects built around compositor-owned color
//! textures, static and dynamic buffers, instanced vertex arrays, shader
//! programs, and the handful of draw-state calls used by the frame renderer.
//!
//! The real implementation lives in platform glue; the contract exists so
//! every component above it is testable with a recording driver. Handles are
//! plain newtypes over the driver's object names, never dereferenced here.
//!
//! Capabilities that must be probed at context-creation time (optional
//! function-pointer lookups on the real platform) surface as
//! [`GlCapabilities`]; callers branch on the flags instead of re-probing.

use core::fmt;

use log::warn;

/// A color texture name, owned by the tracking/compositor service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// A renderbuffer name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u32);

/// A framebuffer-object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// A buffer-object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// A vertex-array-object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// A shader-object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// A linked-program name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// A uniform location within a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Shader pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

/// Buffer binding target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`GL_ARRAY_BUFFER`).
    Array,
    /// Index data (`GL_ELEMENT_ARRAY_BUFFER`).
    ElementArray,
}

/// Component type of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttribType {
    /// Signed byte, normalized to [-1, 1].
    I8Norm,
    /// Unsigned byte, normalized to [0, 1].
    U8Norm,
    /// 32-bit float, unnormalized.
    F32,
}

/// Depth comparison function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthCompare {
    /// Pass when incoming depth is strictly less.
    Less,
    /// Pass when incoming depth is less or equal.
    LessOrEqual,
}

/// Framebuffer completeness status, as reported by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// The framebuffer is complete and renderable.
    #[default]
    Complete,
    /// An attachment is incomplete.
    IncompleteAttachment,
    /// No image is attached.
    IncompleteMissingAttachment,
    /// Attachment sample counts disagree.
    IncompleteMultisample,
    /// The attachment combination is unsupported on this device.
    Unsupported,
    /// A status value this contract does not name.
    Unknown(u32),
}

impl FramebufferStatus {
    /// Returns the decoded name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "GL_FRAMEBUFFER_COMPLETE",
            Self::IncompleteAttachment => "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
            Self::IncompleteMissingAttachment => "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT",
            Self::IncompleteMultisample => "GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE",
            Self::Unsupported => "GL_FRAMEBUFFER_UNSUPPORTED",
            Self::Unknown(_) => "unknown framebuffer status",
        }
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "unknown framebuffer status {raw:#06x}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A decoded entry from the driver's error queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlErrorCode {
    /// `GL_INVALID_ENUM`.
    InvalidEnum,
    /// `GL_INVALID_VALUE`.
    InvalidValue,
    /// `GL_INVALID_OPERATION`.
    InvalidOperation,
    /// `GL_INVALID_FRAMEBUFFER_OPERATION`.
    InvalidFramebufferOperation,
    /// `GL_OUT_OF_MEMORY`.
    OutOfMemory,
    /// An error value this contract does not name.
    Unknown(u32),
}

impl GlErrorCode {
    /// Returns the decoded name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidEnum => "GL_INVALID_ENUM",
            Self::InvalidValue => "GL_INVALID_VALUE",
            Self::InvalidOperation => "GL_INVALID_OPERATION",
            Self::InvalidFramebufferOperation => "GL_INVALID_FRAMEBUFFER_OPERATION",
            Self::OutOfMemory => "GL_OUT_OF_MEMORY",
            Self::Unknown(_) => "unknown GL error",
        }
    }
}

impl fmt::Display for GlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "unknown GL error {raw:#06x}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Optional driver features, resolved once when the rendering context is
/// created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlCapabilities {
    /// `EXT_multisampled_render_to_texture` (or equivalent) is available.
    ///
    /// When absent, framebuffer pools fall back to the plain depth-buffer
    /// path; absence must never be treated as an error.
    pub multisampled_render_to_texture: bool,
}

/// The GL subset consumed by the framebuffer pool, scene, and frame renderer.
///
/// Binding methods mirror the stateful driver model: attachment and attribute
/// calls apply to the currently bound framebuffer / vertex array / buffer.
/// Matrices are passed column-major.
pub trait GlDriver {
    /// Returns the capability flags resolved at context creation.
    fn capabilities(&self) -> GlCapabilities;

    /// Sets clamp-to-edge wrapping and linear filtering on a swap-chain
    /// color texture.
    fn set_texture_clamp_linear(&mut self, texture: TextureId);

    /// Generates a renderbuffer name.
    fn create_renderbuffer(&mut self) -> RenderbufferId;
    /// Allocates depth storage for `renderbuffer`; `samples == 0` selects
    /// single-sampled storage.
    fn depth_renderbuffer_storage(
        &mut self,
        renderbuffer: RenderbufferId,
        samples: u32,
        width: u32,
        height: u32,
    );
    /// Deletes a renderbuffer.
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    /// Generates a framebuffer-object name.
    fn create_framebuffer(&mut self) -> FramebufferId;
    /// Binds `framebuffer`, or the default framebuffer for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);
    /// Attaches `texture` as the bound framebuffer's color attachment.
    fn framebuffer_color_texture(&mut self, texture: TextureId);
    /// Attaches `texture` as a multisampled color attachment with implicit
    /// resolve (`EXT_multisampled_render_to_texture` path).
    fn framebuffer_color_texture_multisample(&mut self, texture: TextureId, samples: u32);
    /// Attaches `renderbuffer` as the bound framebuffer's depth attachment.
    fn framebuffer_depth_renderbuffer(&mut self, renderbuffer: RenderbufferId);
    /// Queries completeness of the bound framebuffer.
    fn check_framebuffer_status(&mut self) -> FramebufferStatus;
    /// Deletes a framebuffer object.
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    /// Hints that the bound framebuffer's depth attachment need not be
    /// written back to memory.
    fn invalidate_depth_attachment(&mut self);
    /// Flushes pending commands so the current color texture is safe to read
    /// on another timeline.
    fn flush(&mut self);

    /// Generates a buffer name.
    fn create_buffer(&mut self) -> BufferId;
    /// Binds `buffer` to `target`, or unbinds for `None`.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);
    /// Uploads immutable data to the buffer bound at `target`.
    fn buffer_data_static(&mut self, target: BufferTarget, data: &[u8]);
    /// Allocates `size` bytes of frequently-rewritten storage for the buffer
    /// bound at `target`.
    fn buffer_data_dynamic(&mut self, target: BufferTarget, size: usize);
    /// Rewrites the buffer bound at `target`, invalidating (orphaning) the
    /// previous contents rather than synchronizing with in-flight reads.
    fn write_buffer_invalidate(&mut self, target: BufferTarget, data: &[u8]);
    /// Deletes a buffer.
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Generates a vertex-array name.
    fn create_vertex_array(&mut self) -> VertexArrayId;
    /// Binds `vertex_array`, or unbinds for `None`.
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    /// Enables the attribute at `index` in the bound vertex array.
    fn enable_vertex_attrib(&mut self, index: u32);
    /// Describes the attribute at `index`, sourced from the buffer currently
    /// bound to [`BufferTarget::Array`].
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: AttribType,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    /// Marks the attribute at `index` as advancing once per `divisor`
    /// instances.
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    /// Deletes a vertex array.
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    /// Compiles a shader; `Err` carries the driver's info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    /// Creates an empty program object.
    fn create_program(&mut self) -> ProgramId;
    /// Attaches a compiled shader to `program`.
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    /// Binds `name` to the attribute slot `location` before linking.
    fn bind_attrib_location(&mut self, program: ProgramId, location: u32, name: &str);
    /// Links `program`; `Err` carries the driver's info log.
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    /// Looks up a uniform location; `None` when the uniform is not active.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Selects `program` for subsequent draws, or clears the selection.
    fn use_program(&mut self, program: Option<ProgramId>);
    /// Uploads a column-major 4x4 matrix uniform.
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &[f32; 16]);
    /// Deletes a program object.
    fn delete_program(&mut self, program: ProgramId);
    /// Deletes a shader object.
    fn delete_shader(&mut self, shader: ShaderId);

    /// Enables or disables the scissor test.
    fn set_scissor_test(&mut self, enabled: bool);
    /// Enables or disables the depth test.
    fn set_depth_test(&mut self, enabled: bool);
    /// Enables or disables depth writes.
    fn set_depth_write(&mut self, enabled: bool);
    /// Sets the depth comparison function.
    fn set_depth_compare(&mut self, compare: DepthCompare);
    /// Sets the viewport rectangle.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Sets the scissor rectangle.
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Sets the clear color.
    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32);
    /// Clears the selected planes of the bound framebuffer.
    fn clear(&mut self, color: bool, depth: bool);
    /// Draws the bound vertex array's `u16` indices, instanced.
    fn draw_elements_instanced_u16(&mut self, index_count: i32, instance_count: i32);

    /// Pops one entry from the driver's error queue, or `None` when the
    /// queue is empty.
    fn poll_error(&mut self) -> Option<GlErrorCode>;
}

/// Maximum error-queue entries drained per call site.
const MAX_DRAINED_ERRORS: usize = 10;

/// Drains and logs pending driver errors, tagged with the call site.
///
/// A debug aid for platforms where most failures are opaque driver errors;
/// not for use on performance-critical paths in production configuration.
pub fn drain_errors<G: GlDriver + ?Sized>(gl: &mut G, site: &str) {
    for _ in 0..MAX_DRAINED_ERRORS {
        let Some(error) = gl.poll_error() else {
            break;
        };
        warn!("GL error after {site}: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::NullGl;

    #[test]
    fn framebuffer_status_decodes() {
        assert_eq!(
            FramebufferStatus::Unsupported.as_str(),
            "GL_FRAMEBUFFER_UNSUPPORTED"
        );
        assert_eq!(
            format!("{}", FramebufferStatus::Unknown(0x8cd9)),
            "unknown framebuffer status 0x8cd9"
        );
    }

    #[test]
    fn gl_error_decodes() {
        assert_eq!(GlErrorCode::OutOfMemory.as_str(), "GL_OUT_OF_MEMORY");
        assert_eq!(format!("{}", GlErrorCode::Unknown(0x1234)), "unknown GL error 0x1234");
    }

    #[test]
    fn drain_stops_when_queue_empties() {
        let mut gl = NullGl::new();
        gl.error_queue = vec![GlErrorCode::InvalidEnum, GlErrorCode::InvalidValue];
        drain_errors(&mut gl, "test");
        assert!(gl.error_queue.is_empty(), "all queued errors consumed");
    }

    #[test]
    fn drain_is_bounded() {
        let mut gl = NullGl::new();
        gl.error_queue = vec![GlErrorCode::InvalidOperation; 32];
        drain_errors(&mut gl, "test");
        assert_eq!(gl.error_queue.len(), 32 - MAX_DRAINED_ERRORS, "drain stops at the cap");
    }
}

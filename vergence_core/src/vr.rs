// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracking/compositor service contract.
//!
//! [`VrService`] is the seam to the head-mounted-display runtime: session
//! enter/leave, head-pose prediction, swap-chain allocation, and frame
//! submission. The service owns the swap-chain color textures and the
//! compositor timeline; this crate only fills framebuffers and describes
//! each finished frame with a [`FrameDescriptor`].
//!
//! Frame descriptors come in three kinds. A [`FrameKind::Normal`] frame
//! carries one [`EyeLayer`] per eye; the other two kinds carry no layers and
//! tell the compositor to show its built-in loading icon or a solid black
//! frame instead.

use glam::{Mat4, Quat, Vec3};
use thiserror::Error;

use crate::gl::TextureId;

/// An active VR session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// A compositor-owned swap chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwapChainId(pub u64);

/// Stereo eye selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Left eye.
    Left,
    /// Right eye.
    Right,
}

impl Eye {
    /// Number of eyes.
    pub const COUNT: usize = 2;

    /// Both eyes, render order.
    #[must_use]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::Left, Self::Right]
    }

    /// Array index for per-eye storage.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Swap-chain color texture format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 8 bits per channel RGBA.
    Rgba8888,
}

/// A rigid-body pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posef {
    /// Orientation.
    pub orientation: Quat,
    /// Position in meters.
    pub position: Vec3,
}

impl Default for Posef {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// A predicted head pose and the timestamp it was predicted for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeadPose {
    /// The pose.
    pub pose: Posef,
    /// Prediction timestamp, in seconds on the service clock.
    pub time_in_seconds: f64,
}

/// Full tracking state for one prediction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tracking {
    /// Predicted head pose.
    pub head_pose: HeadPose,
}

/// Static display properties reported by the service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HmdInfo {
    /// Suggested per-eye render target width in pixels.
    pub suggested_eye_width: u32,
    /// Suggested per-eye render target height in pixels.
    pub suggested_eye_height: u32,
    /// Suggested horizontal field of view in degrees.
    pub suggested_fov_x_degrees: f32,
    /// Suggested vertical field of view in degrees.
    pub suggested_fov_y_degrees: f32,
}

/// Clock levels and thread ids forwarded with every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerformanceParms {
    /// CPU clock level.
    pub cpu_level: i32,
    /// GPU clock level.
    pub gpu_level: i32,
    /// Main (event-loop) thread id, from the platform glue.
    pub main_thread_tid: i32,
    /// Render thread id; equals the main tid in the single-threaded
    /// configuration.
    pub render_thread_tid: i32,
}

/// Session entry parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeParms {
    /// Whether the service may reset the window to fullscreen on entry.
    /// Off here: the platform glue configures the window itself.
    pub reset_window_fullscreen: bool,
}

impl Default for ModeParms {
    fn default() -> Self {
        Self {
            reset_window_fullscreen: true,
        }
    }
}

/// What a submitted frame shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// A rendered stereo frame with one layer per eye.
    Normal,
    /// The compositor's built-in loading icon; no layers.
    LoadingIconFlush,
    /// A solid black frame; no layers. Pushed before handing the display to
    /// a system activity.
    BlackFinal,
}

/// One eye's contribution to a normal frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeLayer {
    /// The swap chain holding the rendered image.
    pub swap_chain: SwapChainId,
    /// Slot within the swap chain that was rendered this frame.
    pub swap_chain_index: usize,
    /// Maps tangent-angle space to texture coordinates; derived from the
    /// projection used to render the layer.
    pub tex_coords_from_tan_angles: Mat4,
    /// The head pose the layer was rendered with.
    pub head_pose: HeadPose,
}

/// A completed frame handed to the compositor.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDescriptor {
    /// Frame kind.
    pub kind: FrameKind,
    /// Monotonic frame index; must match the index used for the display-time
    /// prediction.
    pub frame_index: i64,
    /// Display-refresh divisor for frame pacing.
    pub min_vsyncs: i32,
    /// Performance parameters for this frame.
    pub performance: PerformanceParms,
    /// Per-eye layers; `None` for the layerless frame kinds.
    pub layers: Option<[EyeLayer; Eye::COUNT]>,
}

impl FrameDescriptor {
    /// A layerless descriptor for [`FrameKind::LoadingIconFlush`] or
    /// [`FrameKind::BlackFinal`].
    #[must_use]
    pub fn without_layers(
        kind: FrameKind,
        frame_index: i64,
        min_vsyncs: i32,
        performance: PerformanceParms,
    ) -> Self {
        Self {
            kind,
            frame_index,
            min_vsyncs,
            performance,
            layers: None,
        }
    }
}

/// System-level activities the application can hand the display to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemActivity {
    /// The quit confirmation dialog.
    ConfirmQuit,
    /// The system global menu.
    GlobalMenu,
}

/// Result of polling the service's system-event queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemEventStatus {
    /// No event pending; stop polling.
    NotPending,
    /// An event is pending, with its payload.
    Pending(String),
    /// The service consumed the event itself.
    Consumed,
    /// A status this contract does not name; logged and skipped.
    Invalid(i32),
}

/// A failed service call, carrying the service's decoded reason.
#[derive(Debug, Error)]
#[error("{call} failed: {reason}")]
pub struct VrError {
    /// The service entry point that failed.
    pub call: &'static str,
    /// Decoded service error string.
    pub reason: String,
}

impl VrError {
    /// Builds an error for `call` with the service's decoded `reason`.
    #[must_use]
    pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// A swap chain together with its color textures, in slot order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapChain {
    /// The chain handle, used in eye layers and for destruction.
    pub id: SwapChainId,
    /// One color texture per slot.
    pub textures: Vec<TextureId>,
}

impl SwapChain {
    /// Number of slots in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether the chain has no slots. Services never hand these out; the
    /// method exists for the `len` pairing convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// The tracking/compositor service.
pub trait VrService {
    /// Static display properties.
    fn hmd_info(&self) -> HmdInfo;
    /// Enters VR mode, taking over the display.
    fn enter_vr_mode(&mut self, parms: &ModeParms) -> Result<SessionId, VrError>;
    /// Leaves VR mode, returning the display to the system.
    fn leave_vr_mode(&mut self, session: SessionId);
    /// Predicts the display time of the frame with `frame_index`, in seconds
    /// on the service clock.
    fn predicted_display_time(&mut self, session: SessionId, frame_index: i64) -> f64;
    /// Predicts tracking state for `time_in_seconds`.
    fn predicted_tracking(&mut self, session: SessionId, time_in_seconds: f64) -> Tracking;
    /// Allocates a swap chain of `format` color textures.
    fn create_swap_chain(
        &mut self,
        format: ColorFormat,
        width: u32,
        height: u32,
    ) -> Result<SwapChain, VrError>;
    /// Destroys a swap chain and its textures.
    fn destroy_swap_chain(&mut self, chain: SwapChainId);
    /// Hands a finished frame to the compositor.
    fn submit_frame(&mut self, session: SessionId, frame: &FrameDescriptor);
    /// Pops one entry from the system-event queue.
    fn poll_system_event(&mut self) -> SystemEventStatus;
    /// Launches a system activity. The caller must have pushed a black-final
    /// frame first.
    fn start_system_activity(&mut self, activity: SystemActivity);
    /// Current time in seconds on the service clock.
    fn time_in_seconds(&mut self) -> f64;
}

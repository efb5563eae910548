// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display connection and rendering-context lifecycle.
//!
//! [`DisplayDriver`] is the EGL-shaped collaborator contract: a display
//! connection that enumerates configs and hands out contexts and surfaces.
//! [`GraphicsContext`] drives it through the fixed lifecycle the application
//! needs:
//!
//! ```text
//!   create_context ──► tiny 16x16 pbuffer surface, made current
//!        │
//!        ├─► create_surface(window)   attach the real window surface
//!        ├─► destroy_surface          back to the tiny surface
//!        │         (repeats across pause/resume cycles)
//!        ▼
//!   destroy_context                   best-effort teardown, reverse order
//! ```
//!
//! The tiny pbuffer exists so the context can stay current while no window
//! surface is attached; rendering goes to framebuffer objects, never to the
//! window, so the window surface only has to exist, not to be drawn to.
//!
//! Creation failures are logged with the driver's decoded reason and leave
//! the affected handle cleared; callers observe the cleared state rather
//! than an error value, and teardown never stops at the first failure.

use log::{error, info};
use thiserror::Error;

/// Opaque handle to a platform window, supplied by the platform glue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeWindow(pub u64);

/// A display configuration handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConfigId(pub u32);

/// A surface handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// A rendering-context handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// Queryable per-config attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigAttrib {
    /// Bitfield of renderable client API versions.
    RenderableType,
    /// Bitfield of supported surface kinds.
    SurfaceType,
    /// Red channel depth in bits.
    RedSize,
    /// Green channel depth in bits.
    GreenSize,
    /// Blue channel depth in bits.
    BlueSize,
    /// Alpha channel depth in bits.
    AlphaSize,
    /// Depth buffer size in bits.
    DepthSize,
    /// Multisample count.
    Samples,
}

/// `RenderableType` bit for an ES 3 context.
pub const OPENGL_ES3_BIT: i32 = 0x0040;
/// `SurfaceType` bit for window surfaces.
pub const WINDOW_BIT: i32 = 0x0004;
/// `SurfaceType` bit for pbuffer surfaces.
pub const PBUFFER_BIT: i32 = 0x0001;

/// A failed display-driver call, carrying the driver's decoded reason.
#[derive(Debug, Error)]
#[error("{call} failed: {reason}")]
pub struct DisplayError {
    /// The driver entry point that failed.
    pub call: &'static str,
    /// Decoded driver error string.
    pub reason: String,
}

impl DisplayError {
    /// Builds an error for `call` with the driver's decoded `reason`.
    #[must_use]
    pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
        Self {
            call,
            reason: reason.into(),
        }
    }
}

/// The display/surface/context provider the graphics context drives.
///
/// Implementations decode their native error codes into the `reason` string
/// of [`DisplayError`]; the lifecycle code only logs them.
pub trait DisplayDriver {
    /// Opens the display connection; returns the (major, minor) version.
    fn initialize(&mut self) -> Result<(i32, i32), DisplayError>;
    /// Enumerates every available config, unfiltered.
    fn configs(&mut self) -> Result<Vec<ConfigId>, DisplayError>;
    /// Queries one attribute of `config`.
    fn config_attrib(&mut self, config: ConfigId, attrib: ConfigAttrib) -> i32;
    /// Creates an ES-3 context, optionally sharing objects with `share`.
    fn create_context(
        &mut self,
        config: ConfigId,
        share: Option<ContextId>,
    ) -> Result<ContextId, DisplayError>;
    /// Creates an off-screen pbuffer surface.
    fn create_pbuffer_surface(
        &mut self,
        config: ConfigId,
        width: i32,
        height: i32,
    ) -> Result<SurfaceId, DisplayError>;
    /// Creates a surface backed by a platform window.
    fn create_window_surface(
        &mut self,
        config: ConfigId,
        window: NativeWindow,
    ) -> Result<SurfaceId, DisplayError>;
    /// Binds `surface` + `context` on this thread, or unbinds for `None`.
    fn make_current(&mut self, binding: Option<(SurfaceId, ContextId)>) -> Result<(), DisplayError>;
    /// Destroys a surface.
    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), DisplayError>;
    /// Destroys a context.
    fn destroy_context(&mut self, context: ContextId) -> Result<(), DisplayError>;
    /// Closes the display connection.
    fn terminate(&mut self) -> Result<(), DisplayError>;
}

/// Tiny-surface dimensions. The surface is never rendered to; it only keeps
/// the context current while no window is attached.
const TINY_SURFACE_SIZE: i32 = 16;

/// Exact channel requirements for config selection. No multisampling and no
/// depth on the window surface itself; depth lives in the framebuffer pools.
const REQUIRED_ATTRIBS: [(ConfigAttrib, i32); 6] = [
    (ConfigAttrib::RedSize, 8),
    (ConfigAttrib::GreenSize, 8),
    (ConfigAttrib::BlueSize, 8),
    (ConfigAttrib::AlphaSize, 8),
    (ConfigAttrib::DepthSize, 0),
    (ConfigAttrib::Samples, 0),
];

/// Rendering-context state machine.
///
/// All methods are idempotent: a second `create_context` or a
/// `destroy_surface` with no surface attached logs nothing and does nothing.
#[derive(Debug, Default)]
pub struct GraphicsContext {
    version: Option<(i32, i32)>,
    config: Option<ConfigId>,
    context: Option<ContextId>,
    tiny_surface: Option<SurfaceId>,
    main_surface: Option<SurfaceId>,
}

impl GraphicsContext {
    /// A context with nothing created yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: None,
            config: None,
            context: None,
            tiny_surface: None,
            main_surface: None,
        }
    }

    /// The rendering context, if creation succeeded.
    #[must_use]
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// The selected config, if creation succeeded.
    #[must_use]
    pub fn config(&self) -> Option<ConfigId> {
        self.config
    }

    /// Whether a window surface is currently attached.
    #[must_use]
    pub fn has_main_surface(&self) -> bool {
        self.main_surface.is_some()
    }

    /// Initializes the display, selects a config, creates the context and
    /// the tiny pbuffer surface, and makes the pair current.
    ///
    /// On failure the affected handles stay cleared and the failure is
    /// logged; callers check [`Self::context`]. Calling again on an already
    /// created context does nothing.
    pub fn create_context<D: DisplayDriver>(&mut self, display: &mut D, share: Option<ContextId>) {
        if self.context.is_some() {
            return;
        }
        if let Err(err) = self.try_create_context(display, share) {
            error!("context creation failed: {err}");
        }
    }

    fn try_create_context<D: DisplayDriver>(
        &mut self,
        display: &mut D,
        share: Option<ContextId>,
    ) -> Result<(), DisplayError> {
        let version = display.initialize()?;
        info!("display initialized, version {}.{}", version.0, version.1);
        self.version = Some(version);

        let Some(config) = select_config(display)? else {
            return Err(DisplayError::new("select_config", "no matching config"));
        };
        self.config = Some(config);

        info!("creating rendering context");
        let context = display.create_context(config, share)?;
        self.context = Some(context);

        info!("creating {TINY_SURFACE_SIZE}x{TINY_SURFACE_SIZE} pbuffer surface");
        let tiny =
            display.create_pbuffer_surface(config, TINY_SURFACE_SIZE, TINY_SURFACE_SIZE)?;
        self.tiny_surface = Some(tiny);

        display.make_current(Some((tiny, context)))?;
        Ok(())
    }

    /// Attaches the window surface and makes it current.
    ///
    /// Does nothing if a surface is already attached or no context exists.
    /// On failure the surface handle stays cleared and the failure is logged.
    pub fn create_surface<D: DisplayDriver>(&mut self, display: &mut D, window: NativeWindow) {
        if self.main_surface.is_some() {
            return;
        }
        let (Some(config), Some(context)) = (self.config, self.context) else {
            error!("window surface requested before context creation");
            return;
        };
        info!("creating window surface");
        match display.create_window_surface(config, window) {
            Ok(surface) => {
                self.main_surface = Some(surface);
                if let Err(err) = display.make_current(Some((surface, context))) {
                    error!("binding window surface failed: {err}");
                }
            }
            Err(err) => error!("window surface creation failed: {err}"),
        }
    }

    /// Detaches and destroys the window surface, rebinding the tiny surface
    /// first so the context stays current.
    pub fn destroy_surface<D: DisplayDriver>(&mut self, display: &mut D) {
        let Some(surface) = self.main_surface.take() else {
            return;
        };
        info!("destroying window surface");
        if let (Some(tiny), Some(context)) = (self.tiny_surface, self.context) {
            if let Err(err) = display.make_current(Some((tiny, context))) {
                error!("rebinding pbuffer surface failed: {err}");
            }
        }
        if let Err(err) = display.destroy_surface(surface) {
            error!("window surface destruction failed: {err}");
        }
    }

    /// Tears everything down in reverse creation order. Best-effort: each
    /// failure is logged and teardown continues.
    pub fn destroy_context<D: DisplayDriver>(&mut self, display: &mut D) {
        if self.version.is_none() {
            return;
        }
        if let Err(err) = display.make_current(None) {
            error!("unbinding context failed: {err}");
        }
        if let Some(context) = self.context.take() {
            info!("destroying rendering context");
            if let Err(err) = display.destroy_context(context) {
                error!("context destruction failed: {err}");
            }
        }
        if let Some(tiny) = self.tiny_surface.take() {
            if let Err(err) = display.destroy_surface(tiny) {
                error!("pbuffer surface destruction failed: {err}");
            }
        }
        if let Err(err) = display.terminate() {
            error!("display termination failed: {err}");
        }
        self.main_surface = None;
        self.config = None;
        self.version = None;
    }
}

/// Scans every config and returns the first that is ES-3 renderable,
/// supports both window and pbuffer surfaces, and matches the exact channel
/// layout in [`REQUIRED_ATTRIBS`].
///
/// Enumerate-and-filter rather than a driver-side match request: drivers may
/// relax exact-match semantics and hand back a config with unwanted
/// multisampling, which would break the framebuffer pools' own MSAA setup.
fn select_config<D: DisplayDriver>(display: &mut D) -> Result<Option<ConfigId>, DisplayError> {
    let configs = display.configs()?;
    info!("scanning {} display configs", configs.len());
    for config in configs {
        let renderable = display.config_attrib(config, ConfigAttrib::RenderableType);
        if renderable & OPENGL_ES3_BIT != OPENGL_ES3_BIT {
            continue;
        }
        let surface_type = display.config_attrib(config, ConfigAttrib::SurfaceType);
        if surface_type & (WINDOW_BIT | PBUFFER_BIT) != (WINDOW_BIT | PBUFFER_BIT) {
            continue;
        }
        if REQUIRED_ATTRIBS
            .iter()
            .all(|&(attrib, want)| display.config_attrib(config, attrib) == want)
        {
            return Ok(Some(config));
        }
    }
    error!("no config with ES3 + window/pbuffer + 8/8/8/8, depth 0, samples 0");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FakeConfig, FakeDisplay};

    fn matching_config() -> FakeConfig {
        FakeConfig {
            renderable_type: OPENGL_ES3_BIT,
            surface_type: WINDOW_BIT | PBUFFER_BIT,
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth: 0,
            samples: 0,
        }
    }

    #[test]
    fn selects_first_matching_config() {
        let mut display = FakeDisplay::new(vec![
            FakeConfig {
                samples: 4,
                ..matching_config()
            },
            FakeConfig {
                surface_type: WINDOW_BIT,
                ..matching_config()
            },
            matching_config(),
            matching_config(),
        ]);
        let mut graphics = GraphicsContext::new();
        graphics.create_context(&mut display, None);
        assert!(graphics.context().is_some(), "context created");
        assert_eq!(
            graphics.config(),
            Some(ConfigId(2)),
            "first config passing every filter wins"
        );
    }

    #[test]
    fn rejects_depth_and_multisample_configs() {
        let mut display = FakeDisplay::new(vec![
            FakeConfig {
                depth: 24,
                ..matching_config()
            },
            FakeConfig {
                samples: 2,
                ..matching_config()
            },
        ]);
        let mut graphics = GraphicsContext::new();
        graphics.create_context(&mut display, None);
        assert!(graphics.context().is_none(), "no config should match");
    }

    #[test]
    fn context_creation_is_idempotent() {
        let mut display = FakeDisplay::new(vec![matching_config()]);
        let mut graphics = GraphicsContext::new();
        graphics.create_context(&mut display, None);
        let first = graphics.context();
        graphics.create_context(&mut display, None);
        assert_eq!(graphics.context(), first, "second call must not recreate");
        assert_eq!(display.contexts_created, 1, "driver called once");
    }

    #[test]
    fn tiny_surface_current_until_window_attached() {
        let mut display = FakeDisplay::new(vec![matching_config()]);
        let mut graphics = GraphicsContext::new();
        graphics.create_context(&mut display, None);
        let tiny = display.current.map(|(surface, _)| surface);
        assert!(tiny.is_some(), "tiny surface bound after creation");

        graphics.create_surface(&mut display, NativeWindow(7));
        assert!(graphics.has_main_surface(), "window surface attached");
        assert_ne!(
            display.current.map(|(surface, _)| surface),
            tiny,
            "window surface now current"
        );

        graphics.destroy_surface(&mut display);
        assert!(!graphics.has_main_surface(), "window surface detached");
        assert_eq!(
            display.current.map(|(surface, _)| surface),
            tiny,
            "tiny surface rebound before destruction"
        );
    }

    #[test]
    fn teardown_continues_past_failures() {
        let mut display = FakeDisplay::new(vec![matching_config()]);
        let mut graphics = GraphicsContext::new();
        graphics.create_context(&mut display, None);
        display.fail_destroy_context = true;
        graphics.destroy_context(&mut display);
        assert!(graphics.context().is_none(), "context handle cleared");
        assert!(display.terminated, "terminate still reached");
    }

    #[test]
    fn surface_before_context_is_rejected() {
        let mut display = FakeDisplay::new(vec![matching_config()]);
        let mut graphics = GraphicsContext::new();
        graphics.create_surface(&mut display, NativeWindow(7));
        assert!(!graphics.has_main_surface(), "no context, no surface");
    }
}

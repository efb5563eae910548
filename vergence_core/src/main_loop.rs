// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-threaded frame loop.
//!
//! One iteration: drain platform events (blocking while out of VR mode, so
//! the process sleeps in the background; polling once in VR, so frames keep
//! coming), resolve back-button gestures and system events, then render and
//! submit one frame. The scene is created lazily on the first in-VR
//! iteration, behind a loading-icon frame so the user is not staring at
//! black while placement runs.
//!
//! The frame index increments exactly once per rendered frame, immediately
//! before the display-time prediction; the compositor correlates the two,
//! so any other discipline breaks frame pacing.

use log::error;

use crate::app::{App, Event};
use crate::display::DisplayDriver;
use crate::gl::GlDriver;
use crate::math::{HeadModelParms, apply_head_model};
use crate::render::EyeRenderers;
use crate::scene::Scene;
use crate::vr::{FrameDescriptor, FrameKind, PerformanceParms, VrService};

/// How a poll should wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    /// Sleep until an event arrives.
    Blocking,
    /// Return immediately when no event is queued.
    NonBlocking,
}

/// The windowing collaborator: delivers events and the destroy flag.
pub trait EventPump {
    /// Returns the next event, or `None` when the queue is empty (or, for
    /// a blocking poll, when the wait was interrupted).
    fn poll(&mut self, mode: PollMode) -> Option<Event>;
    /// Whether the platform asked the application to exit.
    fn destroy_requested(&self) -> bool;
}

/// Loop configuration supplied by the platform glue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// CPU clock level.
    pub cpu_level: i32,
    /// GPU clock level.
    pub gpu_level: i32,
    /// Main thread id, for the performance parms.
    pub main_thread_tid: i32,
    /// Render thread id; ignored by the single-threaded loop.
    pub render_thread_tid: i32,
    /// Re-predict orientation per eye at render time.
    pub reduced_latency: bool,
    /// Enable the touch-release min-vsyncs cycling debug aid.
    pub cycle_vsyncs_on_touch: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cpu_level: 2,
            gpu_level: 3,
            main_thread_tid: 0,
            render_thread_tid: 0,
            reduced_latency: true,
            cycle_vsyncs_on_touch: false,
        }
    }
}

impl LoopConfig {
    fn performance(&self) -> PerformanceParms {
        PerformanceParms {
            cpu_level: self.cpu_level,
            gpu_level: self.gpu_level,
            main_thread_tid: self.main_thread_tid,
            render_thread_tid: self.render_thread_tid,
        }
    }
}

/// Runs the single-threaded loop until the platform requests destruction.
///
/// Owns the renderer and scene; the [`App`] holds everything else.
pub fn run<P, D, G, V>(
    pump: &mut P,
    display: &mut D,
    gl: &mut G,
    vr: &mut V,
    config: &LoopConfig,
) where
    P: EventPump,
    D: DisplayDriver,
    G: GlDriver,
    V: VrService,
{
    let mut app = App::new();
    app.cycle_vsyncs_on_touch = config.cycle_vsyncs_on_touch;
    app.graphics.create_context(display, None);

    let performance = config.performance();
    let hmd = vr.hmd_info();
    let mut renderers = match EyeRenderers::create(gl, vr, &hmd) {
        Ok(renderers) => Some(renderers),
        Err(err) => {
            error!("eye renderer creation failed: {err}");
            None
        }
    };
    let mut scene: Option<Scene> = None;

    while !pump.destroy_requested() {
        // Drain events, re-evaluating mode consequences after each one so a
        // pause and a window loss in the same batch resolve in order.
        loop {
            let mode = if app.session.is_none() && !pump.destroy_requested() {
                PollMode::Blocking
            } else {
                PollMode::NonBlocking
            };
            let Some(event) = pump.poll(mode) else { break };
            match event {
                Event::Lifecycle(lifecycle) => app.handle_lifecycle(lifecycle),
                Event::Input(input) => {
                    let now = vr.time_in_seconds();
                    let _ = app.handle_input(now, input);
                }
            }
            app.handle_vr_mode_changes(display, vr, || {});
        }

        let now = vr.time_in_seconds();
        if let Some(activity) = app.back_button_action(now) {
            app.push_black_final(vr, &performance);
            vr.start_system_activity(activity);
        }
        app.handle_system_events(vr);

        let Some(session) = app.session else { continue };
        let Some(renderers) = renderers.as_mut() else {
            continue;
        };

        if scene.is_none() {
            vr.submit_frame(
                session,
                &FrameDescriptor::without_layers(
                    FrameKind::LoadingIconFlush,
                    app.frame_index,
                    app.min_vsyncs,
                    performance,
                ),
            );
            match Scene::create(gl) {
                Ok(mut created) => {
                    created.create_vaos(gl);
                    scene = Some(created);
                }
                Err(err) => {
                    error!("scene creation failed: {err}");
                    continue;
                }
            }
        }
        let Some(scene) = scene.as_ref() else { continue };

        // The only place the frame index is incremented, right before the
        // display-time prediction.
        app.frame_index += 1;
        let predicted_display_time = vr.predicted_display_time(session, app.frame_index);
        let base_tracking = vr.predicted_tracking(session, predicted_display_time);
        let tracking = apply_head_model(&HeadModelParms::default(), &base_tracking);

        app.simulation.advance(predicted_display_time);

        let frame = renderers.render_frame(
            gl,
            vr,
            session,
            app.frame_index,
            app.min_vsyncs,
            performance,
            scene,
            &app.simulation,
            &tracking,
            config.reduced_latency,
        );
        vr.submit_frame(session, &frame);
    }

    if let Some(renderers) = renderers.take() {
        renderers.destroy(gl, vr);
    }
    if let Some(scene) = scene.take() {
        scene.destroy(gl);
    }
    app.graphics.destroy_context(display);
}

// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application state machine.
//!
//! [`App`] tracks what the platform has given us (window, resumed state),
//! what we hold (rendering surface, VR session), and the back-button gesture
//! recognizer. The rules are evaluated by [`App::handle_vr_mode_changes`]
//! after every event:
//!
//! - window present and no surface: attach the rendering surface;
//! - resumed and window present and no session: enter VR mode;
//! - otherwise, if a session is held: leave VR mode;
//! - window gone and surface held: detach the surface.
//!
//! Surface attach/detach and session enter/leave are deliberately
//! independent: a pause without surface destruction leaves the surface
//! attached, and a surface swap while paused never touches the session.
//!
//! The back-button recognizer distinguishes short press (quit confirmation),
//! long press (global menu), and double tap (suppressed). It is a pure
//! function of event timestamps, so the whole gesture space is testable
//! without a clock.

use log::{error, info, warn};

use crate::display::{DisplayDriver, GraphicsContext, NativeWindow};
use crate::simulation::Simulation;
use crate::vr::{
    FrameDescriptor, FrameKind, ModeParms, PerformanceParms, SystemActivity, SystemEventStatus,
    VrService,
};

/// Two taps within this window form a double tap.
pub const BACK_BUTTON_DOUBLE_TAP_SECONDS: f64 = 0.25;
/// A press released within this window is a short press.
pub const BACK_BUTTON_SHORT_PRESS_SECONDS: f64 = 0.25;
/// A press held past this window is a long press.
pub const BACK_BUTTON_LONG_PRESS_SECONDS: f64 = 0.75;

/// Back-button gesture recognizer state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackButtonState {
    /// No gesture in progress.
    #[default]
    None,
    /// A second tap arrived inside the double-tap window; resolve on the
    /// next action pass.
    PendingDoubleTap,
    /// A qualifying release arrived; becomes a short press once the
    /// double-tap window has elapsed without a second tap.
    PendingShortPress,
    /// A gesture already fired; ignore the next release.
    SkipUp,
}

/// Lifecycle transitions delivered by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The activity started.
    Start,
    /// The activity came to the foreground.
    Resume,
    /// The activity left the foreground.
    Pause,
    /// The activity stopped.
    Stop,
    /// The activity is being destroyed; the window is gone.
    Destroy,
    /// A window was created and is ready for a surface.
    WindowCreated(NativeWindow),
    /// The window was destroyed.
    WindowDestroyed,
}

/// Key press phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Key went down.
    Down,
    /// Key went up.
    Up,
}

/// Key identity; only the back button is meaningful here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCode {
    /// The headset back button.
    Back,
    /// Any other key, passed through unconsumed.
    Other(i32),
}

/// Motion event phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionAction {
    /// Touch released.
    Up,
    /// Any other phase.
    Other,
}

/// Where a motion event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionSource {
    /// The built-in touch screen.
    Touchscreen,
    /// The headset trackpad, reported as a mouse.
    Mouse,
    /// Anything else, passed through unconsumed.
    Other,
}

/// Raw input delivered by the platform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// A key transition.
    Key {
        /// Which key.
        code: KeyCode,
        /// Down or up.
        action: KeyAction,
    },
    /// A motion event.
    Motion {
        /// Originating device class.
        source: MotionSource,
        /// Event phase.
        action: MotionAction,
        /// Raw x coordinate.
        x: f32,
        /// Raw y coordinate.
        y: f32,
    },
}

/// Anything the event pump can deliver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// A lifecycle transition.
    Lifecycle(LifecycleEvent),
    /// A raw input event.
    Input(InputEvent),
}

/// Top-level application state.
///
/// Holds no drivers: every method that touches a collaborator takes it as a
/// parameter, so the state machine is testable against fakes and usable from
/// both loop configurations.
#[derive(Debug)]
pub struct App {
    /// Rendering-context lifecycle.
    pub graphics: GraphicsContext,
    /// The platform window, when one exists.
    pub window: Option<NativeWindow>,
    /// Whether the activity is in the foreground.
    pub resumed: bool,
    /// The VR session, while in VR mode.
    pub session: Option<crate::vr::SessionId>,
    /// World animation state.
    pub simulation: Simulation,
    /// Monotonic frame index; incremented exactly once per rendered frame,
    /// immediately before the display-time prediction.
    pub frame_index: i64,
    /// Display-refresh divisor for frame pacing.
    pub min_vsyncs: i32,
    /// Back-button recognizer state.
    pub back_button_state: BackButtonState,
    /// When true, a touch release cycles `min_vsyncs` through 1..=4. Off by
    /// default; a development aid for frame-pacing experiments.
    pub cycle_vsyncs_on_touch: bool,
    back_button_down: bool,
    back_button_down_start_time: f64,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Initial state: no window, not resumed, no session, frame index 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            graphics: GraphicsContext::new(),
            window: None,
            resumed: false,
            session: None,
            simulation: Simulation {
                current_rotation: glam::Vec3::ZERO,
            },
            frame_index: 1,
            min_vsyncs: 1,
            back_button_state: BackButtonState::None,
            cycle_vsyncs_on_touch: false,
            back_button_down: false,
            back_button_down_start_time: 0.0,
        }
    }

    /// Applies a lifecycle transition. Pure state assignment; the session
    /// and surface consequences are drawn later by
    /// [`Self::handle_vr_mode_changes`].
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Start => info!("lifecycle: start"),
            LifecycleEvent::Resume => {
                info!("lifecycle: resume");
                self.resumed = true;
            }
            LifecycleEvent::Pause => {
                info!("lifecycle: pause");
                self.resumed = false;
            }
            LifecycleEvent::Stop => info!("lifecycle: stop"),
            LifecycleEvent::Destroy => {
                info!("lifecycle: destroy");
                self.window = None;
            }
            LifecycleEvent::WindowCreated(window) => {
                info!("lifecycle: window created");
                self.window = Some(window);
            }
            LifecycleEvent::WindowDestroyed => {
                info!("lifecycle: window destroyed");
                self.window = None;
            }
        }
    }

    /// Routes a raw input event. Returns whether the event was consumed.
    pub fn handle_input(&mut self, now: f64, event: InputEvent) -> bool {
        match event {
            InputEvent::Key { code, action } => self.handle_key_event(now, code, action),
            InputEvent::Motion { source, action, .. } => match source {
                MotionSource::Touchscreen | MotionSource::Mouse => self.handle_touch_event(action),
                MotionSource::Other => false,
            },
        }
    }

    fn handle_key_event(&mut self, now: f64, code: KeyCode, action: KeyAction) -> bool {
        if code != KeyCode::Back {
            return false;
        }
        match action {
            KeyAction::Down => {
                if !self.back_button_down {
                    if now - self.back_button_down_start_time < BACK_BUTTON_DOUBLE_TAP_SECONDS {
                        self.back_button_state = BackButtonState::PendingDoubleTap;
                    }
                    self.back_button_down_start_time = now;
                }
                self.back_button_down = true;
            }
            KeyAction::Up => {
                match self.back_button_state {
                    BackButtonState::None => {
                        if now - self.back_button_down_start_time < BACK_BUTTON_SHORT_PRESS_SECONDS
                        {
                            self.back_button_state = BackButtonState::PendingShortPress;
                        }
                    }
                    BackButtonState::SkipUp => {
                        self.back_button_state = BackButtonState::None;
                    }
                    _ => {}
                }
                self.back_button_down = false;
            }
        }
        true
    }

    fn handle_touch_event(&mut self, action: MotionAction) -> bool {
        if self.session.is_some() && action == MotionAction::Up && self.cycle_vsyncs_on_touch {
            self.min_vsyncs = if self.min_vsyncs >= 4 {
                1
            } else {
                self.min_vsyncs + 1
            };
            info!("min vsyncs = {}", self.min_vsyncs);
        }
        true
    }

    /// Resolves the back-button recognizer against the current time.
    ///
    /// Returns the system activity to launch, if a gesture completed. The
    /// caller must push a black-final frame before launching it.
    pub fn back_button_action(&mut self, now: f64) -> Option<SystemActivity> {
        match self.back_button_state {
            BackButtonState::PendingDoubleTap => {
                info!("back button double tap");
                self.back_button_state = BackButtonState::SkipUp;
                None
            }
            BackButtonState::PendingShortPress if !self.back_button_down => {
                // Wait out the double-tap window before committing.
                if now - self.back_button_down_start_time > BACK_BUTTON_DOUBLE_TAP_SECONDS {
                    info!("back button short press");
                    self.back_button_state = BackButtonState::None;
                    Some(SystemActivity::ConfirmQuit)
                } else {
                    None
                }
            }
            BackButtonState::None if self.back_button_down => {
                if now - self.back_button_down_start_time > BACK_BUTTON_LONG_PRESS_SECONDS {
                    info!("back button long press");
                    self.back_button_state = BackButtonState::SkipUp;
                    Some(SystemActivity::GlobalMenu)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Submits a layerless black frame so the compositor shows solid black
    /// before the display is handed to a system activity.
    pub fn push_black_final<V: VrService>(&self, vr: &mut V, performance: &PerformanceParms) {
        let Some(session) = self.session else {
            warn!("black-final frame requested without an active session");
            return;
        };
        info!("pushing black-final frame");
        vr.submit_frame(
            session,
            &FrameDescriptor::without_layers(
                FrameKind::BlackFinal,
                self.frame_index,
                self.min_vsyncs,
                *performance,
            ),
        );
    }

    /// Draws surface and session consequences from the current state; see
    /// the module docs for the rules. `before_leave` runs after the
    /// decision to leave VR mode but before the session is released; the
    /// threaded loop drains the render queue there.
    pub fn handle_vr_mode_changes<D, V, F>(&mut self, display: &mut D, vr: &mut V, before_leave: F)
    where
        D: DisplayDriver,
        V: VrService,
        F: FnOnce(),
    {
        if let Some(window) = self.window {
            if !self.graphics.has_main_surface() {
                self.graphics.create_surface(display, window);
            }
        }

        if self.resumed && self.window.is_some() {
            if self.session.is_none() {
                let parms = ModeParms {
                    reset_window_fullscreen: false,
                };
                match vr.enter_vr_mode(&parms) {
                    Ok(session) => {
                        info!("entered VR mode");
                        self.session = Some(session);
                    }
                    Err(err) => error!("entering VR mode failed: {err}"),
                }
            }
        } else if let Some(session) = self.session.take() {
            before_leave();
            info!("leaving VR mode");
            vr.leave_vr_mode(session);
        }

        if self.window.is_none() && self.graphics.has_main_surface() {
            self.graphics.destroy_surface(display);
        }
    }

    /// Drains the service's system-event queue. Statuses other than pending
    /// or consumed are logged and skipped.
    pub fn handle_system_events<V: VrService>(&mut self, vr: &mut V) {
        loop {
            match vr.poll_system_event() {
                SystemEventStatus::NotPending => break,
                SystemEventStatus::Pending(_payload) => {
                    // Event payloads carry no actionable data for this
                    // application; acknowledged by consuming them.
                }
                SystemEventStatus::Consumed => {}
                SystemEventStatus::Invalid(code) => {
                    error!("error {code} handling system event");
                }
            }
        }
    }
}

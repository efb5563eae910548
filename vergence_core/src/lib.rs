// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-lifecycle controller for head-mounted-display rendering.
//!
//! Vergence drives the full life of a stereo VR frame: from platform
//! lifecycle events, through session management and head-pose prediction,
//! to per-eye rendering into compositor-owned swap chains and frame
//! submission.
//!
//! ```text
//!   EventPump ──► App state machine ──► session enter/leave
//!                      │
//!                      ▼
//!    predicted display time ──► tracking ──► Simulation
//!                      │
//!                      ▼
//!   EyeRenderers: instance upload ─► per-eye draw ─► resolve ─► advance
//!                      │
//!                      ▼
//!             FrameDescriptor ──► VrService::submit_frame
//! ```
//!
//! Platform specifics stay behind four trait seams ([`gl::GlDriver`],
//! [`display::DisplayDriver`], [`vr::VrService`], and
//! [`main_loop::EventPump`]), so the whole controller runs unmodified
//! against real drivers or test doubles.
//!
//! Two loop configurations are provided: [`main_loop::run`] does everything
//! on one thread; [`render_thread::run_threaded`] moves rendering onto a
//! worker fed by an ordered command queue.

pub mod app;
pub mod display;
pub mod framebuffer;
pub mod gl;
pub mod main_loop;
pub mod math;
pub mod render;
pub mod render_thread;
pub mod scene;
pub mod simulation;
pub mod vr;

#[cfg(test)]
mod test_util;

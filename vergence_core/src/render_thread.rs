// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Threaded frame loop: rendering offloaded to a dedicated worker.
//!
//! The main thread keeps event handling, gesture recognition, and the
//! per-frame predictions; rendering and frame submission move to a worker
//! that owns the shared-context GL driver, the eye renderers, and the
//! scene. Commands flow through a bounded channel and are processed
//! strictly in submission order; nothing is cancelled mid-frame.
//!
//! Scene creation happens worker-side, triggered by the loading-icon
//! command: vertex arrays are not shared between contexts, so they have to
//! be built on the context that draws. Because the queue is ordered, the
//! first frame command can never observe a missing scene.
//!
//! [`RenderThread::wait`] blocks until every submitted command has been
//! processed. The main thread must call it before leaving VR mode: the
//! worker holds the session in queued commands, and the service forbids
//! submission after leave.

use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use log::error;

use crate::app::{App, Event};
use crate::display::DisplayDriver;
use crate::gl::GlDriver;
use crate::main_loop::{EventPump, LoopConfig, PollMode};
use crate::math::{HeadModelParms, apply_head_model};
use crate::render::EyeRenderers;
use crate::scene::Scene;
use crate::simulation::Simulation;
use crate::vr::{
    ColorFormat, FrameDescriptor, FrameKind, HmdInfo, ModeParms, PerformanceParms, SessionId,
    SwapChain, SystemActivity, SystemEventStatus, Tracking, VrError, VrService,
};

/// Queue depth for in-flight render commands.
const COMMAND_QUEUE_DEPTH: usize = 8;

/// Locks a mutex, recovering the value from a poisoned lock: the state
/// behind these mutexes stays consistent per call, so a panicked peer is no
/// reason to refuse service.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`VrService`] handle shareable across threads; every call takes the
/// lock for just that call, so no thread ever holds the service across a
/// blocking wait.
#[derive(Debug)]
pub struct SharedVr<V> {
    inner: Arc<Mutex<V>>,
}

impl<V> Clone for SharedVr<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: VrService> SharedVr<V> {
    /// Wraps a service for cross-thread use.
    #[must_use]
    pub fn new(inner: Arc<Mutex<V>>) -> Self {
        Self { inner }
    }
}

impl<V: VrService> VrService for SharedVr<V> {
    fn hmd_info(&self) -> HmdInfo {
        lock(&self.inner).hmd_info()
    }

    fn enter_vr_mode(&mut self, parms: &ModeParms) -> Result<SessionId, VrError> {
        lock(&self.inner).enter_vr_mode(parms)
    }

    fn leave_vr_mode(&mut self, session: SessionId) {
        lock(&self.inner).leave_vr_mode(session);
    }

    fn predicted_display_time(&mut self, session: SessionId, frame_index: i64) -> f64 {
        lock(&self.inner).predicted_display_time(session, frame_index)
    }

    fn predicted_tracking(&mut self, session: SessionId, time_in_seconds: f64) -> Tracking {
        lock(&self.inner).predicted_tracking(session, time_in_seconds)
    }

    fn create_swap_chain(
        &mut self,
        format: ColorFormat,
        width: u32,
        height: u32,
    ) -> Result<SwapChain, VrError> {
        lock(&self.inner).create_swap_chain(format, width, height)
    }

    fn destroy_swap_chain(&mut self, chain: crate::vr::SwapChainId) {
        lock(&self.inner).destroy_swap_chain(chain);
    }

    fn submit_frame(&mut self, session: SessionId, frame: &FrameDescriptor) {
        lock(&self.inner).submit_frame(session, frame);
    }

    fn poll_system_event(&mut self) -> SystemEventStatus {
        lock(&self.inner).poll_system_event()
    }

    fn start_system_activity(&mut self, activity: SystemActivity) {
        lock(&self.inner).start_system_activity(activity);
    }

    fn time_in_seconds(&mut self) -> f64 {
        lock(&self.inner).time_in_seconds()
    }
}

/// One unit of work for the render worker.
#[derive(Clone, Debug)]
pub enum RenderCommand {
    /// Render and submit a stereo frame.
    Frame {
        /// Session to submit against.
        session: SessionId,
        /// Frame index matching the display-time prediction.
        frame_index: i64,
        /// Pacing divisor.
        min_vsyncs: i32,
        /// Performance parms for the frame.
        performance: PerformanceParms,
        /// Head-model-adjusted tracking for this frame.
        tracking: Tracking,
        /// Simulation state for this frame.
        simulation: Simulation,
    },
    /// Submit a loading-icon frame, then create the scene if it does not
    /// exist yet.
    LoadingIcon {
        /// Session to submit against.
        session: SessionId,
        /// Frame index at submission time.
        frame_index: i64,
        /// Pacing divisor.
        min_vsyncs: i32,
        /// Performance parms for the frame.
        performance: PerformanceParms,
    },
    /// Submit a black-final frame.
    BlackFinal {
        /// Session to submit against.
        session: SessionId,
        /// Frame index at submission time.
        frame_index: i64,
        /// Pacing divisor.
        min_vsyncs: i32,
        /// Performance parms for the frame.
        performance: PerformanceParms,
    },
}

enum Message {
    Command(RenderCommand),
    Stop,
}

/// Handle to the render worker.
#[derive(Debug)]
pub struct RenderThread {
    sender: SyncSender<Message>,
    pending: Arc<(Mutex<usize>, Condvar)>,
    join: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Spawns the worker. It builds the eye renderers immediately from the
    /// service's HMD info; the scene waits for the loading-icon command.
    pub fn spawn<G, V>(gl: G, vr: Arc<Mutex<V>>, reduced_latency: bool) -> Self
    where
        G: GlDriver + Send + 'static,
        V: VrService + Send + 'static,
    {
        let (sender, receiver) = sync_channel(COMMAND_QUEUE_DEPTH);
        let pending = Arc::new((Mutex::new(0_usize), Condvar::new()));
        let worker_pending = Arc::clone(&pending);
        let join = std::thread::spawn(move || {
            worker(gl, SharedVr::new(vr), receiver, &worker_pending, reduced_latency);
        });
        Self {
            sender,
            pending,
            join: Some(join),
        }
    }

    /// Enqueues a command. Blocks when the queue is full; commands are
    /// processed strictly in submission order.
    pub fn submit(&self, command: RenderCommand) {
        let (count, _) = &*self.pending;
        *lock(count) += 1;
        if self.sender.send(Message::Command(command)).is_err() {
            // Worker is gone; undo the reservation so wait() cannot hang.
            let (count, condvar) = &*self.pending;
            *lock(count) -= 1;
            condvar.notify_all();
            error!("render thread exited; command dropped");
        }
    }

    /// Blocks until every submitted command has been processed.
    pub fn wait(&self) {
        let (count, condvar) = &*self.pending;
        let mut guard = lock(count);
        while *guard > 0 {
            guard = condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Drains the queue, stops the worker, and joins it. The worker tears
    /// down its scene and renderers before exiting.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(join) = self.join.take() else { return };
        self.wait();
        match self.sender.try_send(Message::Stop) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                // Queue was drained above, so full means the worker stalled;
                // fall through to the blocking send.
                let _ = self.sender.send(Message::Stop);
            }
        }
        if join.join().is_err() {
            error!("render thread panicked");
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker<G, V>(
    mut gl: G,
    mut vr: SharedVr<V>,
    receiver: Receiver<Message>,
    pending: &(Mutex<usize>, Condvar),
    reduced_latency: bool,
) where
    G: GlDriver,
    V: VrService,
{
    let hmd = vr.hmd_info();
    let mut renderers = match EyeRenderers::create(&mut gl, &mut vr, &hmd) {
        Ok(renderers) => Some(renderers),
        Err(err) => {
            error!("eye renderer creation failed on render thread: {err}");
            None
        }
    };
    let mut scene: Option<Scene> = None;

    while let Ok(message) = receiver.recv() {
        let command = match message {
            Message::Command(command) => command,
            Message::Stop => break,
        };
        match command {
            RenderCommand::Frame {
                session,
                frame_index,
                min_vsyncs,
                performance,
                tracking,
                simulation,
            } => {
                if let (Some(renderers), Some(scene)) = (renderers.as_mut(), scene.as_ref()) {
                    let frame = renderers.render_frame(
                        &mut gl,
                        &mut vr,
                        session,
                        frame_index,
                        min_vsyncs,
                        performance,
                        scene,
                        &simulation,
                        &tracking,
                        reduced_latency,
                    );
                    vr.submit_frame(session, &frame);
                }
            }
            RenderCommand::LoadingIcon {
                session,
                frame_index,
                min_vsyncs,
                performance,
            } => {
                vr.submit_frame(
                    session,
                    &FrameDescriptor::without_layers(
                        FrameKind::LoadingIconFlush,
                        frame_index,
                        min_vsyncs,
                        performance,
                    ),
                );
                if scene.is_none() {
                    match Scene::create(&mut gl) {
                        Ok(mut created) => {
                            created.create_vaos(&mut gl);
                            scene = Some(created);
                        }
                        Err(err) => error!("scene creation failed on render thread: {err}"),
                    }
                }
            }
            RenderCommand::BlackFinal {
                session,
                frame_index,
                min_vsyncs,
                performance,
            } => {
                vr.submit_frame(
                    session,
                    &FrameDescriptor::without_layers(
                        FrameKind::BlackFinal,
                        frame_index,
                        min_vsyncs,
                        performance,
                    ),
                );
            }
        }

        let (count, condvar) = pending;
        *lock(count) -= 1;
        condvar.notify_all();
    }

    if let Some(scene) = scene.take() {
        scene.destroy(&mut gl);
    }
    if let Some(renderers) = renderers.take() {
        renderers.destroy(&mut gl, &mut vr);
    }
}

/// Runs the threaded loop until the platform requests destruction.
///
/// `render_gl` must belong to a context sharing objects with the main
/// context (the platform glue creates it); it moves onto the worker.
pub fn run_threaded<P, D, G, V>(
    pump: &mut P,
    display: &mut D,
    render_gl: G,
    vr: &Arc<Mutex<V>>,
    config: &LoopConfig,
) where
    P: EventPump,
    D: DisplayDriver,
    G: GlDriver + Send + 'static,
    V: VrService + Send + 'static,
{
    let mut app = App::new();
    app.cycle_vsyncs_on_touch = config.cycle_vsyncs_on_touch;
    app.graphics.create_context(display, None);

    let performance = PerformanceParms {
        cpu_level: config.cpu_level,
        gpu_level: config.gpu_level,
        main_thread_tid: config.main_thread_tid,
        render_thread_tid: config.render_thread_tid,
    };
    let render_thread = RenderThread::spawn(render_gl, Arc::clone(vr), config.reduced_latency);
    let mut service = SharedVr::new(Arc::clone(vr));
    let mut scene_requested = false;

    while !pump.destroy_requested() {
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
                    let now = service.time_in_seconds();
                    let _ = app.handle_input(now, input);
                }
            }
            app.handle_vr_mode_changes(display, &mut service, || render_thread.wait());
        }

        let now = service.time_in_seconds();
        if let Some(activity) = app.back_button_action(now) {
            if let Some(session) = app.session {
                render_thread.submit(RenderCommand::BlackFinal {
                    session,
                    frame_index: app.frame_index,
                    min_vsyncs: app.min_vsyncs,
                    performance,
                });
            }
            service.start_system_activity(activity);
        }
        app.handle_system_events(&mut service);

        let Some(session) = app.session else { continue };

        if !scene_requested {
            // The ordered queue guarantees the worker creates the scene
            // before it sees the first frame command.
            render_thread.submit(RenderCommand::LoadingIcon {
                session,
                frame_index: app.frame_index,
                min_vsyncs: app.min_vsyncs,
                performance,
            });
            scene_requested = true;
        }

        app.frame_index += 1;
        let predicted_display_time = service.predicted_display_time(session, app.frame_index);
        let base_tracking = service.predicted_tracking(session, predicted_display_time);
        let tracking = apply_head_model(&HeadModelParms::default(), &base_tracking);

        app.simulation.advance(predicted_display_time);

        render_thread.submit(RenderCommand::Frame {
            session,
            frame_index: app.frame_index,
            min_vsyncs: app.min_vsyncs,
            performance,
            tracking,
            simulation: app.simulation,
        });
    }

    render_thread.shutdown();
    app.graphics.destroy_context(display);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FakeVr, NullGl};

    fn shared_vr() -> Arc<Mutex<FakeVr>> {
        Arc::new(Mutex::new(FakeVr::with_swap_chain_len(3)))
    }

    #[test]
    fn commands_process_in_submission_order() {
        let vr = shared_vr();
        let thread = RenderThread::spawn(NullGl::new(), Arc::clone(&vr), false);
        let performance = PerformanceParms::default();
        thread.submit(RenderCommand::LoadingIcon {
            session: SessionId(1),
            frame_index: 1,
            min_vsyncs: 1,
            performance,
        });
        for frame_index in 2..5 {
            thread.submit(RenderCommand::Frame {
                session: SessionId(1),
                frame_index,
                min_vsyncs: 1,
                performance,
                tracking: Tracking::default(),
                simulation: Simulation::default(),
            });
        }
        thread.wait();
        let kinds: Vec<FrameKind> = lock(&vr).submitted.iter().map(|frame| frame.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FrameKind::LoadingIconFlush,
                FrameKind::Normal,
                FrameKind::Normal,
                FrameKind::Normal,
            ],
            "loading icon first, frames in order"
        );
        thread.shutdown();
    }

    #[test]
    fn wait_drains_the_queue() {
        let vr = shared_vr();
        let thread = RenderThread::spawn(NullGl::new(), Arc::clone(&vr), false);
        let performance = PerformanceParms::default();
        thread.submit(RenderCommand::LoadingIcon {
            session: SessionId(1),
            frame_index: 1,
            min_vsyncs: 1,
            performance,
        });
        thread.submit(RenderCommand::BlackFinal {
            session: SessionId(1),
            frame_index: 1,
            min_vsyncs: 1,
            performance,
        });
        thread.wait();
        assert_eq!(
            lock(&vr).submitted.len(),
            2,
            "every submitted command processed once wait returns"
        );
        thread.shutdown();
    }

    #[test]
    fn frame_before_loading_icon_is_skipped() {
        let vr = shared_vr();
        let thread = RenderThread::spawn(NullGl::new(), Arc::clone(&vr), false);
        thread.submit(RenderCommand::Frame {
            session: SessionId(1),
            frame_index: 1,
            min_vsyncs: 1,
            performance: PerformanceParms::default(),
            tracking: Tracking::default(),
            simulation: Simulation::default(),
        });
        thread.wait();
        assert!(
            lock(&vr).submitted.is_empty(),
            "a frame command without a scene renders nothing"
        );
        thread.shutdown();
    }

    #[test]
    fn shutdown_tears_down_worker_resources() {
        let vr = shared_vr();
        let thread = RenderThread::spawn(NullGl::new(), Arc::clone(&vr), false);
        thread.submit(RenderCommand::LoadingIcon {
            session: SessionId(1),
            frame_index: 1,
            min_vsyncs: 1,
            performance: PerformanceParms::default(),
        });
        thread.shutdown();
        assert_eq!(
            lock(&vr).swap_chains_destroyed,
            2,
            "both eye swap chains released on shutdown"
        );
    }
}

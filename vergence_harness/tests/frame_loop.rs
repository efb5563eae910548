// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenario tests for the single-threaded frame loop.

use vergence_core::app::{Event, LifecycleEvent};
use vergence_core::display::NativeWindow;
use vergence_core::main_loop::{LoopConfig, PollMode, run};
use vergence_core::vr::FrameKind;
use vergence_harness::{FakeVrService, PumpStep, RecordingGl, ScriptedDisplay, ScriptedPump};

/// The minimal script that brings the loop into VR mode.
fn resume_and_window() -> Vec<PumpStep> {
    vec![
        PumpStep::Deliver(Event::Lifecycle(LifecycleEvent::Resume)),
        PumpStep::Deliver(Event::Lifecycle(LifecycleEvent::WindowCreated(NativeWindow(
            7,
        )))),
    ]
}

fn in_vr_script(idle_frames: usize) -> Vec<PumpStep> {
    let mut steps = resume_and_window();
    steps.extend(std::iter::repeat_n(PumpStep::Idle, idle_frames));
    steps
}

#[test]
fn loading_icon_precedes_normal_frames() {
    let mut pump = ScriptedPump::new(in_vr_script(3));
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);

    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());

    let kinds: Vec<FrameKind> = vr.submitted.iter().map(|frame| frame.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FrameKind::LoadingIconFlush,
            FrameKind::Normal,
            FrameKind::Normal,
            FrameKind::Normal,
        ],
        "loading icon covers scene creation, then one frame per idle iteration"
    );
    let indices: Vec<i64> = vr.submitted.iter().map(|frame| frame.frame_index).collect();
    assert_eq!(
        indices,
        vec![1, 2, 3, 4],
        "the index increments once per rendered frame"
    );
}

#[test]
fn eye_layers_cycle_swap_chain_slots() {
    let mut pump = ScriptedPump::new(in_vr_script(3));
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);

    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());

    let layered: Vec<_> = vr
        .submitted
        .iter()
        .filter_map(|frame| frame.layers.as_ref())
        .collect();
    assert_eq!(layered.len(), 3, "every normal frame carries layers");
    let left_slots: Vec<usize> = layered
        .iter()
        .map(|layers| layers[0].swap_chain_index)
        .collect();
    assert_eq!(left_slots, vec![0, 1, 2], "slots advance once per frame");
    assert_ne!(
        layered[0][0].swap_chain, layered[0][1].swap_chain,
        "each eye renders into its own swap chain"
    );
}

#[test]
fn poll_blocks_until_in_vr_mode() {
    let mut pump = ScriptedPump::new(in_vr_script(2));
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);

    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());

    assert_eq!(
        pump.polls[..2],
        [PollMode::Blocking, PollMode::Blocking],
        "the loop sleeps while out of VR mode"
    );
    assert!(
        pump.polls[2..]
            .iter()
            .all(|mode| *mode == PollMode::NonBlocking),
        "once the session exists, polls never block"
    );
}

#[test]
fn teardown_releases_compositor_resources() {
    let mut pump = ScriptedPump::new(in_vr_script(1));
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);

    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());

    assert_eq!(vr.swap_chains_destroyed, 2, "one swap chain per eye released");
    assert!(display.terminated, "display connection closed");
    assert_eq!(display.surfaces_created, 1, "one window surface over the run");
}

#[test]
fn pause_leaves_vr_after_the_last_submission() {
    let mut steps = resume_and_window();
    steps.push(PumpStep::Idle);
    steps.push(PumpStep::Deliver(Event::Lifecycle(LifecycleEvent::Pause)));
    steps.push(PumpStep::Idle);
    let mut pump = ScriptedPump::new(steps);
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);

    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());

    assert_eq!(vr.entries, 1, "one session over the run");
    assert_eq!(vr.leaves, 1, "pause released it");
    let leave_at = vr
        .log
        .iter()
        .position(|entry| entry == "leave")
        .unwrap_or(usize::MAX);
    let last_submit = vr
        .log
        .iter()
        .rposition(|entry| entry.starts_with("submit"))
        .unwrap_or(0);
    assert!(
        last_submit < leave_at,
        "no submission after the session is released: {:?}",
        vr.log
    );
}

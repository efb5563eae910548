// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Back-button gestures driven through the whole single-threaded loop.
//!
//! The service clock advances by a fixed step per query, so a script of
//! key events plus idle iterations walks the recognizer through real time.

use vergence_core::app::{Event, InputEvent, KeyAction, KeyCode, LifecycleEvent};
use vergence_core::display::NativeWindow;
use vergence_core::main_loop::{LoopConfig, run};
use vergence_core::vr::{FrameKind, SystemActivity};
use vergence_harness::{FakeVrService, PumpStep, RecordingGl, ScriptedDisplay, ScriptedPump};

fn back_key(action: KeyAction) -> PumpStep {
    PumpStep::Deliver(Event::Input(InputEvent::Key {
        code: KeyCode::Back,
        action,
    }))
}

fn script(events: Vec<PumpStep>, idle_frames: usize) -> Vec<PumpStep> {
    let mut steps = vec![
        PumpStep::Deliver(Event::Lifecycle(LifecycleEvent::Resume)),
        PumpStep::Deliver(Event::Lifecycle(LifecycleEvent::WindowCreated(NativeWindow(
            7,
        )))),
    ];
    steps.extend(events);
    steps.extend(std::iter::repeat_n(PumpStep::Idle, idle_frames));
    steps
}

fn run_script(steps: Vec<PumpStep>, time_step: f64) -> FakeVrService {
    let mut pump = ScriptedPump::new(steps);
    let mut display = ScriptedDisplay::with_matching_config();
    let mut gl = RecordingGl::new();
    let mut vr = FakeVrService::with_swap_chain_len(3);
    vr.time_step = time_step;
    run(&mut pump, &mut display, &mut gl, &mut vr, &LoopConfig::default());
    vr
}

fn black_finals(vr: &FakeVrService) -> usize {
    vr.submitted
        .iter()
        .filter(|frame| frame.kind == FrameKind::BlackFinal)
        .count()
}

#[test]
fn long_press_opens_the_global_menu() {
    // Held down, never released; 0.2 s passes per iteration.
    let vr = run_script(script(vec![back_key(KeyAction::Down)], 6), 0.2);

    assert_eq!(vr.activities, vec![SystemActivity::GlobalMenu]);
    assert_eq!(black_finals(&vr), 1, "one black frame before the menu");
    let submit_at = vr
        .log
        .iter()
        .position(|entry| entry == "submit black-final")
        .unwrap_or(usize::MAX);
    let activity_at = vr
        .log
        .iter()
        .position(|entry| entry.starts_with("activity"))
        .unwrap_or(0);
    assert!(
        submit_at < activity_at,
        "black frame submitted before the activity launches: {:?}",
        vr.log
    );
}

#[test]
fn short_press_confirms_quit_after_the_double_tap_window() {
    let vr = run_script(
        script(vec![back_key(KeyAction::Down), back_key(KeyAction::Up)], 8),
        0.06,
    );

    assert_eq!(vr.activities, vec![SystemActivity::ConfirmQuit]);
    assert_eq!(black_finals(&vr), 1, "one black frame before the dialog");
}

#[test]
fn double_tap_is_swallowed() {
    let vr = run_script(
        script(
            vec![
                back_key(KeyAction::Down),
                back_key(KeyAction::Up),
                back_key(KeyAction::Down),
                PumpStep::Idle,
                back_key(KeyAction::Up),
            ],
            4,
        ),
        0.05,
    );

    assert!(vr.activities.is_empty(), "no gesture fires on a double tap");
    assert_eq!(black_finals(&vr), 0, "no black frame either");
    assert!(
        vr.submitted
            .iter()
            .all(|frame| matches!(frame.kind, FrameKind::Normal | FrameKind::LoadingIconFlush)),
        "rendering continues undisturbed"
    );
}

//! Integration test: update phases, the round-robin budget, and fault
//! isolation.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use gantry_core::{ComponentError, Phase};
use gantry_engine::{ConfigError, Hook, Orchestrator, OrchestratorConfig};
use gantry_graph::MAX_PROFILING_WINDOW;
use gantry_test_utils::{
    factory, EventLog, FailingComponent, FailingHook, PanickingComponent, RecordingComponent,
    SlowComponent, WorkerComponent,
};

fn orch_with_lag(lag: Duration) -> Orchestrator {
    Orchestrator::new(OrchestratorConfig {
        tolerable_lag: lag,
        ..OrchestratorConfig::default()
    })
    .unwrap()
}

// ── Full pass ───────────────────────────────────────────────────

#[test]
fn every_entry_is_updated_in_order() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    for name in ["a", "b", "c"] {
        o.register(RecordingComponent::new(name, &log));
    }
    o.attach().unwrap();
    o.update_before().unwrap();
    o.update_after().unwrap();

    assert_eq!(log.with_suffix("update_before"), vec!["a", "b", "c"]);
    assert_eq!(log.with_suffix("update_after"), vec!["a", "b", "c"]);
    let before_last = log.position("c:update_before").unwrap();
    assert!(before_last < log.position("a:rr_before").unwrap());
}

// ── Round-robin ─────────────────────────────────────────────────

#[test]
fn idle_entries_get_one_tick_each() {
    let mut o = orch_with_lag(Duration::from_secs(1));
    let workers: Vec<_> = (0..5).map(|i| WorkerComponent::new(format!("w{i}"), 0)).collect();
    let counters: Vec<_> = workers.iter().map(WorkerComponent::ticks).collect();
    for w in workers {
        o.register(w);
    }
    o.attach().unwrap();

    let metrics = o.update_before().unwrap();
    assert_eq!(metrics.round_robin_ticks, 5);
    assert_eq!(metrics.round_robin_productive, 0);
    for counter in &counters {
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }
}

#[test]
fn busy_entry_keeps_the_scan_going() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.register(RecordingComponent::new("busy", &log).busy_rounds(3));
    o.register(RecordingComponent::new("x", &log));
    o.register(RecordingComponent::new("y", &log));
    o.attach().unwrap();

    let metrics = o.update_after().unwrap();
    // Three productive laps, then one more idle lap starting after the
    // last productive tick.
    assert_eq!(metrics.round_robin_productive, 3);
    assert_eq!(metrics.round_robin_ticks, 10);
    assert_eq!(log.count("busy:rr_after"), 4);
    assert_eq!(log.count("busy:rr_before"), 0);
}

#[test]
fn budget_cuts_scan_and_next_frame_resumes() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_millis(20));
    for i in 0..10 {
        o.register(SlowComponent::new(format!("s{i}"), Duration::from_millis(8), &log));
    }
    o.attach().unwrap();

    let first = o.update_before().unwrap();
    let visited = log.events();
    let ticks = visited.len();
    // Every tick sleeps 8ms, so at most three fit before 20ms elapse.
    assert!((1..=3).contains(&ticks), "visited {visited:?}");
    assert_eq!(first.round_robin_ticks as usize, ticks);
    assert!(first.total_us >= 20_000);
    let expected: Vec<String> = (0..ticks).map(|i| format!("s{i}")).collect();
    assert_eq!(visited, expected);
    assert_eq!(o.round_robin_cursor(Phase::Before), ticks);

    log.clear();
    o.update_before().unwrap();
    assert_eq!(log.events()[0], format!("s{ticks}"));
    // The other phase keeps its own cursor.
    assert_eq!(o.round_robin_cursor(Phase::After), 0);
}

#[test]
fn zero_lag_disables_round_robin() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::ZERO);
    o.register(RecordingComponent::new("a", &log).busy_rounds(5));
    o.attach().unwrap();

    let metrics = o.update_before().unwrap();
    assert_eq!(metrics.round_robin_ticks, 0);
    assert_eq!(log.count("a:update_before"), 1);
    assert_eq!(log.count("a:rr_before"), 0);
}

#[test]
fn unattached_phase_runs_nothing() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.register(RecordingComponent::new("a", &log).busy_rounds(5));
    let metrics = o.update_before().unwrap();
    assert_eq!(metrics.changes_applied, 1);
    assert_eq!(metrics.round_robin_ticks, 0);
    assert!(log.is_empty());
}

// ── Fault isolation ─────────────────────────────────────────────

#[test]
fn failing_update_is_skipped_for_the_phase_only() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    let bad = o.register(FailingComponent::new("bad", FailingHook::Update, &log));
    o.register(RecordingComponent::new("good", &log));
    o.attach().unwrap();

    let metrics = o.update_before().unwrap();
    assert_eq!(metrics.faults.len(), 1);
    let fault = &metrics.faults[0];
    assert_eq!(fault.entry, bad);
    assert_eq!(fault.hook, Hook::Update);
    assert!(matches!(fault.error, ComponentError::Failed { .. }));
    assert_eq!(log.count("bad:rr_before"), 0);
    assert_eq!(log.count("good:update_before"), 1);
    assert_eq!(log.count("good:rr_before"), 1);

    o.update_before().unwrap();
    assert_eq!(log.count("bad:update_before"), 2);
}

#[test]
fn panicking_update_is_contained() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.register(PanickingComponent::new("boom", FailingHook::Update));
    o.register(RecordingComponent::new("after", &log));
    o.attach().unwrap();

    let metrics = o.update_after().unwrap();
    assert_eq!(metrics.faults.len(), 1);
    match &metrics.faults[0].error {
        ComponentError::Panicked { message } => assert_eq!(message, "boom exploded"),
        other => panic!("expected Panicked, got {other:?}"),
    }
    assert_eq!(log.count("after:update_after"), 1);
    assert!(o.is_attached());
}

#[test]
fn failing_round_robin_is_not_retried_in_the_phase() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    let bad = FailingComponent::new("bad", FailingHook::RoundRobin, &log);
    let calls = bad.calls();
    o.register(bad);
    o.register(RecordingComponent::new("busy", &log).busy_rounds(4));
    o.attach().unwrap();

    let metrics = o.update_before().unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.faults.len(), 1);
    assert_eq!(metrics.faults[0].hook, Hook::RoundRobin);
    assert_eq!(metrics.round_robin_productive, 4);
}

#[test]
fn attach_faults_do_not_block_attachment() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    let bad = o.register(FailingComponent::new("bad", FailingHook::Attach, &log));
    o.register(PanickingComponent::new("boom", FailingHook::Attach));
    let good = o.register(RecordingComponent::new("good", &log));

    let faults = o.attach().unwrap();
    assert_eq!(faults.len(), 2);
    assert!(faults.iter().all(|f| f.hook == Hook::Attach));
    assert_eq!(faults[0].entry, bad);
    assert_eq!(log.count("good:attach"), 1);
    assert!(o.ordered_entries().contains(&good));

    o.update_before().unwrap();
    assert_eq!(log.count("bad:update_before"), 1);
}

#[test]
fn detach_and_save_faults_are_returned() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.register(FailingComponent::new("saver", FailingHook::Save, &log));
    o.register(PanickingComponent::new("leaver", FailingHook::Detach));
    o.attach().unwrap();

    let saved = o.save().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].hook, Hook::Save);

    let detached = o.detach().unwrap();
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].kind, "leaver");
    assert!(!o.is_attached());
}

// ── Changes during a phase ──────────────────────────────────────

#[test]
fn changes_queued_during_a_sync_point_wait_for_the_next() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.register(RecordingComponent::new("root", &log));
    o.attach().unwrap();

    let child_log = log.clone();
    o.register(
        RecordingComponent::new("parent", &log)
            .spawns(factory(move || RecordingComponent::new("child", &child_log))),
    );
    o.update_before().unwrap();
    assert_eq!(o.len(), 2);
    assert_eq!(o.pending_changes(), 1);
    assert_eq!(log.count("child:attach"), 0);

    o.update_before().unwrap();
    assert_eq!(o.len(), 3);
    assert_eq!(log.count("child:attach"), 1);
    assert_eq!(log.count("child:update_before"), 1);
}

#[test]
fn components_spawned_during_attach_are_attached_with_it() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    let child_log = log.clone();
    o.register(
        RecordingComponent::new("parent", &log)
            .spawns(factory(move || RecordingComponent::new("child", &child_log))),
    );
    o.attach().unwrap();
    assert_eq!(o.len(), 2);
    assert_eq!(log.with_suffix("attach"), vec!["parent", "child"]);
}

#[test]
fn registrations_from_other_threads_are_applied_together() {
    let mut o = orch_with_lag(Duration::from_secs(1));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let changes = o.changes();
            thread::spawn(move || {
                (0..10)
                    .map(|i| changes.register(Box::new(WorkerComponent::new(format!("w{t}.{i}"), 0))))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(o.pending_changes(), 40);
    assert_eq!(o.apply_pending_changes().unwrap(), 40);
    assert!(ids.iter().all(|id| o.contains(*id)));
}

// ── Profiling ───────────────────────────────────────────────────

#[test]
fn profile_tracks_recent_phases() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    o.set_profiling_average_length(8).unwrap();
    let a = o.register(RecordingComponent::new("a", &log).busy_rounds(2));
    o.attach().unwrap();
    for _ in 0..3 {
        o.update_before().unwrap();
    }

    let profile = o.profile(a).unwrap();
    assert!(profile.is_enabled());
    let before = profile.phase(Phase::Before);
    assert_eq!(before.update_us.len(), 3);
    assert_eq!(before.round_robin_jobs.len(), 3);
    assert!(before.round_robin_jobs.average().is_some());
    assert!(profile.phase(Phase::After).update_us.is_empty());
}

#[test]
fn zero_window_disables_profiling() {
    let log = EventLog::new();
    let mut o = orch_with_lag(Duration::from_secs(1));
    let a = o.register(RecordingComponent::new("a", &log));
    o.attach().unwrap();
    o.set_profiling_average_length(0).unwrap();
    o.update_before().unwrap();

    let profile = o.profile(a).unwrap();
    assert!(!profile.is_enabled());
    assert!(profile.phase(Phase::Before).update_us.average().is_none());
}

#[test]
fn oversized_window_is_rejected() {
    let mut o = orch_with_lag(Duration::from_secs(1));
    let before = o.profiling_average_length();
    assert!(matches!(
        o.set_profiling_average_length(MAX_PROFILING_WINDOW + 1),
        Err(ConfigError::ProfilingWindowTooLarge { .. })
    ));
    assert_eq!(o.profiling_average_length(), before);
}

//! Phase sequences for the canonical drainage traces, driven through the
//! filter and state machine without any scheduling.
use drain_core::{
    CompletionReason, DrainagePhase, DrainageStateMachine, FilterCfg, Sample, SampleFilter,
    ThresholdCfg, Transition, TransitionCause,
};
use rstest::rstest;

struct Pipeline {
    filter: SampleFilter,
    machine: DrainageStateMachine,
    t_ms: u64,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            filter: SampleFilter::new(&FilterCfg::default()),
            machine: DrainageStateMachine::new(ThresholdCfg::default(), 0.05),
            t_ms: 0,
        }
    }

    fn feed(&mut self, kg: f64) -> Vec<Transition> {
        let fs = self.filter.ingest(Sample {
            mass_kg: kg,
            timestamp_ms: self.t_ms,
        });
        self.t_ms += 2000;
        self.machine.evaluate(&fs)
    }

    fn feed_all(&mut self, masses: impl IntoIterator<Item = f64>) -> Vec<Transition> {
        masses.into_iter().flat_map(|kg| self.feed(kg)).collect()
    }
}

/// 2.000 kg down to `end_g` in `step_g` steps. Built from whole grams so the
/// endpoint is exact.
fn descent_g(step_g: u32, end_g: u32) -> impl Iterator<Item = f64> {
    (0..)
        .map(move |i| 2000_i64 - i64::from(step_g) * i)
        .take_while(move |g| *g >= i64::from(end_g))
        .map(|g| g as f64 / 1000.0)
}

/// 2.000 kg down to `end` in 20 g steps.
fn steady_descent(end: f64) -> impl Iterator<Item = f64> {
    descent_g(20, (end * 1000.0).round() as u32)
}

fn phases(ts: &[Transition]) -> Vec<DrainagePhase> {
    std::iter::once(DrainagePhase::Idle)
        .chain(ts.iter().map(|t| t.to))
        .collect()
}

#[rstest]
#[case::within_stability_band(20)]
#[case::faster_than_band(60)]
#[case::fast_drain(100)]
fn scenario_a_steady_descent_reminds_then_completes(#[case] step_g: u32) {
    let mut p = Pipeline::new();
    let mut ts = p.feed_all(descent_g(step_g, 500));
    // Bag settles on the final mass; completed sessions ignore it.
    ts.extend(p.feed_all([0.5; 6]));
    assert_eq!(
        phases(&ts),
        vec![
            DrainagePhase::Idle,
            DrainagePhase::AwaitingInitialWeight,
            DrainagePhase::Draining,
            DrainagePhase::ReminderIssued,
            DrainagePhase::Completed,
        ]
    );
    let draining = ts
        .iter()
        .find(|t| t.cause == TransitionCause::DrainageDetected)
        .unwrap();
    // Detected while the bag is still falling, not on the final plateau.
    assert!(draining.drained_grams < 250.0, "{draining:?}");
    let reminder = ts
        .iter()
        .find(|t| t.cause == TransitionCause::ReminderThreshold)
        .unwrap();
    assert!(reminder.drained_grams >= 1000.0);
    assert!(reminder.drained_grams < 1000.0 + f64::from(step_g));
    let done = ts.last().unwrap();
    assert_eq!(done.cause, TransitionCause::CompletionThreshold);
    assert!((done.drained_grams - 1500.0).abs() < 1e-6);
    assert!((done.mass_kg - 0.5).abs() < 1e-12);
    assert_eq!(
        p.machine.state().completion_reason,
        Some(CompletionReason::Threshold)
    );
}

#[test]
fn unstable_top_up_raises_high_water_mark() {
    let mut p = Pipeline::new();
    let ts = p.feed_all([2.0, 2.0, 2.5, 2.48, 2.46]);
    assert_eq!(
        phases(&ts),
        vec![DrainagePhase::Idle, DrainagePhase::AwaitingInitialWeight]
    );
    assert_eq!(p.machine.last_significant_kg(), Some(2.48));
    // Drainage is measured against the topped-up mark.
    let ts = p.feed_all([2.40, 2.30]);
    assert_eq!(ts[0].to, DrainagePhase::Draining);
    assert!(ts[0].mass_kg > 2.2);
}

#[test]
fn scenario_b_empty_bag_completes_via_zero_mass() {
    let mut p = Pipeline::new();
    let mut ts = p.feed_all([2.0, 1.98, 1.96, 1.94, 1.92]);
    assert_eq!(p.machine.phase(), DrainagePhase::Draining);
    ts.extend(p.feed(0.0));
    let done = ts.last().unwrap();
    assert_eq!(done.to, DrainagePhase::Completed);
    assert_eq!(done.cause, TransitionCause::ZeroMass);
    assert!(!p.machine.state().reminder_issued);
}

#[test]
fn scenario_d_stop_while_awaiting_cancels() {
    let mut p = Pipeline::new();
    p.feed(2.0);
    let t = p.machine.manual_stop().unwrap();
    assert_eq!(t.to, DrainagePhase::Cancelled);
    assert_eq!(p.machine.state().completion_reason, None);
}

#[test]
fn completed_ignores_further_samples() {
    let mut p = Pipeline::new();
    p.feed_all(steady_descent(0.46));
    assert_eq!(p.machine.phase(), DrainagePhase::Completed);
    let before = p.machine.state().clone();
    assert!(p.feed_all([0.4, 0.0, 0.3, 0.0]).is_empty());
    assert_eq!(p.machine.state(), &before);
}

#[test]
fn reminder_fires_once_through_oscillation() {
    let mut p = Pipeline::new();
    let mut ts = p.feed_all(steady_descent(0.98));
    // Hover around the 1000 g mark.
    for _ in 0..10 {
        ts.extend(p.feed_all([1.02, 1.00, 0.98, 1.00]));
    }
    let reminders = ts
        .iter()
        .filter(|t| t.cause == TransitionCause::ReminderThreshold)
        .count();
    assert_eq!(reminders, 1);
    assert_eq!(p.machine.phase(), DrainagePhase::ReminderIssued);
}

#[test]
fn top_up_raises_high_water_mark_but_drop_counts_from_initial() {
    let mut p = Pipeline::new();
    p.feed_all([2.0, 2.0]);
    // Stable climb while awaiting: high-water mark follows it.
    p.feed_all([2.04, 2.08, 2.12, 2.16, 2.2]);
    assert_eq!(p.machine.last_significant_kg(), Some(2.2));
    assert_eq!(p.machine.phase(), DrainagePhase::AwaitingInitialWeight);
    let ts = p.feed_all([2.18, 2.16, 2.14]);
    assert_eq!(ts[0].to, DrainagePhase::Draining);
    assert_eq!(p.machine.state().initial_mass_kg, Some(2.0));
    assert!(p.machine.state().drained_grams.abs() < 1e-9);
}

#[rstest]
#[case::swinging_bag(&[2.0, 1.8, 2.1, 1.7, 2.05])]
#[case::single_spike(&[2.0, 2.0, 1.5, 2.0, 2.0])]
fn noise_never_starts_drainage(#[case] masses: &[f64]) {
    let mut p = Pipeline::new();
    let ts = p.feed_all(masses.iter().copied());
    assert!(
        ts.iter().all(|t| t.to == DrainagePhase::AwaitingInitialWeight),
        "unexpected transitions: {ts:?}"
    );
}

//! Segment accounting: every observed coordinate's processor sees a
//! contiguous, time-ordered partition of the simulated interval.

use pdmp_core::{Coordinate, Trigger};
use pdmp_engine::{SimulatorConfig, Simulator, StopReason, StoppingCriteria};
use pdmp_graph::Pdmp;
use pdmp_test_utils::{
    ExponentialTestClock, FixedDelayClock, FlipVelocity, NoopKernel, Particle, SegmentLog,
    SegmentRecorder, Stopwatch,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const TOL: f64 = 1e-9;

/// `n` particles at the origin moving right, each with its own processor,
/// and an exponential(1) process per adjacent pair flipping both.
fn chain(n: usize) -> (Pdmp<Particle>, Vec<SegmentLog>) {
    let mut pdmp = Pdmp::new();
    let vars: Vec<_> = (0..n)
        .map(|_| pdmp.add_coordinate(Particle::new(0.0, 1.0)))
        .collect();
    for pair in vars.windows(2) {
        pdmp.add_jump(
            ExponentialTestClock::new(1.0, pair.iter().copied()),
            FlipVelocity::new(pair.iter().copied()),
        );
    }
    let logs = vars
        .iter()
        .map(|&v| {
            let (recorder, log) = SegmentRecorder::new(v);
            pdmp.add_processor(recorder);
            log
        })
        .collect();
    (pdmp, logs)
}

#[test]
fn two_particle_bounce_sums_to_horizon() {
    let mut pdmp = Pdmp::new();
    let a = pdmp.add_coordinate(Particle::new(0.0, 1.0));
    let b = pdmp.add_coordinate(Particle::new(0.0, 1.0));
    pdmp.add_jump(ExponentialTestClock::new(1.0, [a, b]), FlipVelocity::new([a, b]));
    let (ra, log_a) = SegmentRecorder::new(a);
    let (rb, log_b) = SegmentRecorder::new(b);
    pdmp.add_processor(ra);
    pdmp.add_processor(rb);

    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let summary = sim
        .simulate(&mut rng, &StoppingCriteria::for_time(5.0))
        .unwrap();
    assert_eq!(summary.elapsed, 5.0);
    assert_eq!(summary.stop, StopReason::StochasticTime);

    for log in [&log_a, &log_b] {
        let times = log.commit_times();
        assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
        assert!((log.total() - 5.0).abs() < TOL, "total {}", log.total());
        assert_eq!(log.segments().last().unwrap().trigger, Trigger::Flush);
        assert_eq!(log.jump_count() as u64, summary.jumps);
    }

    // Both particles flip together, so they stay at the same position.
    let pa = sim.coordinate(a).unwrap();
    let pb = sim.coordinate(b).unwrap();
    assert!((pa.position - pb.position).abs() < TOL);
    assert!(pa.position.abs() <= 5.0 + TOL);
}

#[test]
fn processors_see_segment_start_state() {
    let mut pdmp = Pdmp::new();
    let x = pdmp.add_coordinate(Stopwatch::default());
    pdmp.add_jump(
        FixedDelayClock::new(pdmp_core::DeltaTime::exact(1.0), [x]),
        NoopKernel::new([x]),
    );

    struct StartRecorder {
        var: pdmp_core::VarId,
        starts: std::sync::Arc<std::sync::Mutex<Vec<f64>>>,
    }
    impl pdmp_core::StateDependent for StartRecorder {
        fn required_variables(&self) -> pdmp_core::VarList {
            [self.var].into_iter().collect()
        }
    }
    impl pdmp_core::Processor<Stopwatch> for StartRecorder {
        fn process(&mut self, coordinate: &Stopwatch, _delta: f64, _trigger: Trigger) {
            self.starts.lock().unwrap().push(coordinate.elapsed);
        }
    }

    let starts = std::sync::Arc::default();
    pdmp.add_processor(StartRecorder {
        var: x,
        starts: std::sync::Arc::clone(&starts),
    });
    let mut sim = Simulator::new(pdmp).unwrap();
    sim.simulate(
        &mut ChaCha8Rng::seed_from_u64(0),
        &StoppingCriteria::for_time(3.5),
    )
    .unwrap();
    assert_eq!(*starts.lock().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(sim.coordinate(x).unwrap().elapsed, 3.5);
}

#[test]
fn unobserved_chain_members_are_flushed() {
    let (pdmp, logs) = chain(6);
    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    sim.simulate(&mut rng, &StoppingCriteria::for_time(12.0))
        .unwrap();
    for log in &logs {
        assert!((log.total() - 12.0).abs() < TOL);
        assert_eq!(log.segments().last().unwrap().trigger, Trigger::Flush);
    }
}

#[test]
fn chunks_partition_the_horizon() {
    let (pdmp, logs) = chain(4);
    let config = SimulatorConfig {
        max_chunk_length: 2.5,
    };
    let mut sim = Simulator::with_config(pdmp, config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let summary = sim
        .simulate(&mut rng, &StoppingCriteria::for_time(10.0))
        .unwrap();
    assert_eq!(summary.elapsed, 10.0);
    assert_eq!(sim.stats().chunks, 4);
    for log in &logs {
        assert!((log.total() - 10.0).abs() < TOL);
        // Every chunk ends with a flush of every variable.
        let flushes = log
            .segments()
            .iter()
            .filter(|s| s.trigger == Trigger::Flush)
            .count();
        assert_eq!(flushes, 4);
    }
}

#[test]
fn repeated_runs_accumulate() {
    let (pdmp, logs) = chain(3);
    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..3 {
        sim.simulate(&mut rng, &StoppingCriteria::for_time(1.5))
            .unwrap();
    }
    assert_eq!(sim.stats().stochastic_time, 4.5);
    for log in &logs {
        assert!((log.total() - 4.5).abs() < TOL);
    }
}

#[test]
fn poll_budget_flushes_to_current_time() {
    let (pdmp, logs) = chain(5);
    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let criteria = StoppingCriteria::for_time(1_000.0).with_max_queue_polls(25);
    let summary = sim.simulate(&mut rng, &criteria).unwrap();
    assert_eq!(summary.stop, StopReason::QueuePolls);
    assert_eq!(summary.queue_polls, 25);
    assert!(summary.elapsed > 0.0 && summary.elapsed < 1_000.0);
    for log in &logs {
        assert!((log.total() - summary.elapsed).abs() < TOL);
    }
}

#[test]
fn zero_wall_clock_budget_stops_immediately() {
    let (pdmp, logs) = chain(3);
    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let criteria = StoppingCriteria::for_time(100.0).with_wall_clock_millis(0);
    let summary = sim.simulate(&mut rng, &criteria).unwrap();
    assert_eq!(summary.stop, StopReason::WallClock);
    assert_eq!(summary.elapsed, 0.0);
    assert_eq!(summary.queue_polls, 0);
    assert!(logs.iter().all(SegmentLog::is_empty));
}

#[test]
fn wall_clock_budget_ends_unbounded_run() {
    let (pdmp, logs) = chain(3);
    let mut sim = Simulator::new(pdmp).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let criteria = StoppingCriteria::default().with_wall_clock_millis(20);
    let summary = sim.simulate(&mut rng, &criteria).unwrap();
    assert_eq!(summary.stop, StopReason::WallClock);
    assert!(summary.elapsed.is_finite());
    for log in &logs {
        assert!((log.total() - summary.elapsed).abs() < 1e-6 * summary.elapsed.max(1.0));
    }
}

proptest! {
    #[test]
    fn particle_flow_is_reversible(
        position in -1e3f64..1e3,
        velocity in -10.0f64..10.0,
        delta in 0.0f64..100.0,
    ) {
        let mut p = Particle::new(position, velocity);
        p.extrapolate(delta);
        p.extrapolate(-delta);
        prop_assert!((p.position - position).abs() <= 1e-9 * (1.0 + position.abs() + velocity.abs() * delta));
        prop_assert_eq!(p.velocity, velocity);
    }

    #[test]
    fn segment_sums_match_elapsed(seed in any::<u64>(), n in 2usize..6, horizon in 0.1f64..20.0) {
        let (pdmp, logs) = chain(n);
        let mut sim = Simulator::new(pdmp).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let summary = sim.simulate(&mut rng, &StoppingCriteria::for_time(horizon)).unwrap();
        prop_assert_eq!(summary.elapsed, horizon);
        for log in &logs {
            prop_assert!((log.total() - horizon).abs() < TOL);
            let times = log.commit_times();
            prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

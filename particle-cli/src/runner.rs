//! Frame loop of the headless driver.
//!
//! [`Runner`] owns the [`Orchestrator`] and plays the role a render loop
//! would: once per frame it takes the newest hand snapshot from the mailbox,
//! ticks the simulation and records how long the tick took. A scripted
//! tracker stands in for the camera: it circles the cursor around the origin
//! and publishes snapshots from its own thread at its own rate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec2;
use particle_core::{
    Config, ControlReceiver, ControlSender, ControlSignal, Gesture, Orchestrator, RenderConfig,
    mailbox,
};

/// Frame budget the tick has to fit in.
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Seconds for the scripted cursor to complete one orbit.
const ORBIT_PERIOD: f32 = 4.0;
/// Radius of the scripted orbit, in normalized control units.
const ORBIT_RADIUS: f32 = 0.6;

/// Scripted hand used in place of a camera tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Script {
    /// `None` scripts an empty frame (no hand).
    pub gesture: Option<Gesture>,
    pub openness: f32,
}

impl Script {
    /// Snapshot the tracker would report at script time `t`.
    pub fn signal(&self, t: f32) -> ControlSignal {
        match self.gesture {
            None => ControlSignal::absent(),
            Some(gesture) => {
                let angle = t / ORBIT_PERIOD * std::f32::consts::TAU;
                let position = Vec2::from_angle(angle) * ORBIT_RADIUS;
                ControlSignal::hand(gesture, position, self.openness)
            }
        }
    }
}

/// Tick timing collected over a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub frames: usize,
    pub particles: usize,
    pub total: Duration,
    pub worst: Duration,
    pub over_budget: usize,
    /// Frames that saw a present hand.
    pub hand_frames: usize,
}

impl Report {
    fn record(&mut self, took: Duration, control: &ControlSignal) {
        self.frames += 1;
        self.total += took;
        self.worst = self.worst.max(took);
        if took > FRAME_BUDGET {
            self.over_budget += 1;
        }
        if control.present {
            self.hand_frames += 1;
        }
    }

    pub fn mean(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames as u32
        }
    }

    pub fn log(&self) {
        log::info!(
            "{} frames of {} particles: mean tick {:.3} ms, worst {:.3} ms, {} over the {} ms budget, hand seen in {} frames",
            self.frames,
            self.particles,
            self.mean().as_secs_f64() * 1e3,
            self.worst.as_secs_f64() * 1e3,
            self.over_budget,
            FRAME_BUDGET.as_millis(),
            self.hand_frames,
        );
        if self.over_budget > 0 {
            log::warn!("{} ticks exceeded the frame budget", self.over_budget);
        }
    }
}

/// Drives an [`Orchestrator`] frame by frame.
pub struct Runner {
    orch: Orchestrator,
    script: Script,
}

impl Runner {
    /// Creates a runner; `seed` makes sampling reproducible.
    pub fn new(config: RenderConfig, tuning: Config, seed: Option<u64>, script: Script) -> Self {
        let orch = match seed {
            Some(seed) => Orchestrator::with_seed(config, tuning, seed),
            None => Orchestrator::new(config, tuning),
        };
        Self { orch, script }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orch
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orch
    }

    /// Runs `frames` ticks back to back.
    ///
    /// The script is published into the mailbox on the tick thread before
    /// each frame, so results depend only on the frame index.
    pub fn run_unpaced(&mut self, frames: usize, dt: f32) -> Report {
        let (tx, mut rx) = mailbox(None);
        let mut report = self.new_report();
        for frame in 0..frames {
            let elapsed = frame as f32 * dt;
            tx.send(self.script.signal(elapsed));
            self.step(&mut rx, dt, elapsed, &mut report);
        }
        report
    }

    /// Runs `frames` ticks paced to `dt` of wall time, with the scripted
    /// tracker publishing from its own thread at `tracker_hz`.
    ///
    /// ### Errors
    /// Fails before any frame runs if `dt` or the tracker period is not a
    /// representable wall-clock duration.
    pub fn run_paced(&mut self, frames: usize, dt: f32, tracker_hz: f32) -> Result<Report> {
        let period = Duration::try_from_secs_f32(1.0 / tracker_hz.max(1.0))
            .with_context(|| format!("tracker rate {tracker_hz} Hz"))?;
        let frame_time = Duration::try_from_secs_f32(dt.max(0.0))
            .with_context(|| format!("frame time {dt} s"))?;
        // Anything older than three tracker periods counts as "hand lost".
        // The period is at most one second.
        let (tx, mut rx) = mailbox(Some(period * 3));
        let stop = Arc::new(AtomicBool::new(false));
        let tracker = spawn_tracker(tx, self.script, period, Arc::clone(&stop));

        let start = Instant::now();
        let mut report = self.new_report();
        for frame in 0..frames {
            let frame_start = Instant::now();
            let elapsed = start.elapsed().as_secs_f32();
            self.step(&mut rx, dt, elapsed, &mut report);

            if frame + 1 < frames
                && let Some(rest) = frame_time.checked_sub(frame_start.elapsed())
            {
                thread::sleep(rest);
            }
        }

        stop.store(true, Ordering::Relaxed);
        if tracker.join().is_err() {
            log::error!("tracker thread panicked");
        }
        Ok(report)
    }

    fn new_report(&self) -> Report {
        Report {
            particles: self.orch.render_config().count,
            ..Report::default()
        }
    }

    fn step(&mut self, rx: &mut ControlReceiver, dt: f32, elapsed: f32, report: &mut Report) {
        let control = rx.latest();
        let started = Instant::now();
        self.orch.tick(dt, elapsed, &control);
        report.record(started.elapsed(), &control);
    }
}

fn spawn_tracker(
    tx: ControlSender,
    script: Script,
    period: Duration,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            if !tx.send(script.signal(start.elapsed().as_secs_f32())) {
                break;
            }
            thread::sleep(period);
        }
        log::debug!("tracker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_core::ShapeKind;

    fn config(count: usize) -> RenderConfig {
        RenderConfig {
            count,
            shape: ShapeKind::Heart,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn script_without_gesture_is_absent() {
        let script = Script {
            gesture: None,
            openness: 1.0,
        };
        assert_eq!(script.signal(1.3), ControlSignal::absent());
    }

    #[test]
    fn script_orbits_at_fixed_radius() {
        let script = Script {
            gesture: Some(Gesture::Open),
            openness: 0.7,
        };
        for t in [0.0, 0.5, 1.7, 3.9] {
            let s = script.signal(t);
            assert!(s.present);
            assert_eq!(s.gesture, Gesture::Open);
            assert!((s.position.length() - ORBIT_RADIUS).abs() < 1e-5);
            assert_eq!(s.openness, 0.7);
        }
        let start = script.signal(0.0).position;
        let lap = script.signal(ORBIT_PERIOD).position;
        assert!((start - lap).length() < 1e-4);
    }

    #[test]
    fn unpaced_run_reports_every_frame() {
        let script = Script {
            gesture: Some(Gesture::Closed),
            openness: 0.0,
        };
        let mut runner = Runner::new(config(200), Config::default(), Some(1), script);
        let report = runner.run_unpaced(30, 1.0 / 60.0);

        assert_eq!(report.frames, 30);
        assert_eq!(report.particles, 200);
        assert_eq!(report.hand_frames, 30);
        assert!(report.worst >= report.mean());
    }

    #[test]
    fn unpaced_run_is_reproducible_with_a_seed() {
        let script = Script {
            gesture: Some(Gesture::Open),
            openness: 1.0,
        };
        let mut a = Runner::new(config(100), Config::default(), Some(9), script);
        let mut b = Runner::new(config(100), Config::default(), Some(9), script);
        a.run_unpaced(20, 1.0 / 60.0);
        b.run_unpaced(20, 1.0 / 60.0);
        assert_eq!(a.orchestrator().positions(), b.orchestrator().positions());
    }

    #[test]
    fn paced_run_stops_its_tracker() {
        let script = Script {
            gesture: Some(Gesture::Open),
            openness: 0.5,
        };
        let mut runner = Runner::new(config(50), Config::default(), Some(2), script);
        let report = runner.run_paced(5, 0.005, 200.0).unwrap();
        assert_eq!(report.frames, 5);
    }

    #[test]
    fn paced_run_rejects_unrepresentable_frame_time() {
        let script = Script {
            gesture: None,
            openness: 0.0,
        };
        let mut runner = Runner::new(config(10), Config::default(), Some(3), script);
        let before = runner.orchestrator().positions().to_vec();
        for dt in [f32::MAX, f32::INFINITY] {
            assert!(runner.run_paced(3, dt, 30.0).is_err(), "accepted dt {dt}");
        }
        // No frame was ticked.
        assert_eq!(runner.orchestrator().positions(), &before[..]);
    }

    #[test]
    fn paced_run_tolerates_very_fast_trackers() {
        let script = Script {
            gesture: Some(Gesture::Closed),
            openness: 0.0,
        };
        let mut runner = Runner::new(config(10), Config::default(), Some(4), script);
        for hz in [f32::MAX, f32::INFINITY] {
            let report = runner.run_paced(2, 0.001, hz).unwrap();
            assert_eq!(report.frames, 2);
        }
    }

    #[test]
    fn empty_report_has_zero_mean() {
        assert_eq!(Report::default().mean(), Duration::ZERO);
    }
}

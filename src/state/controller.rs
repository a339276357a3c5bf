//! Countdown/alarm state machine

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CountdownSnapshot, CountdownState, Phase};
use crate::{error::CountdownError, services::SoundPlayer, tasks::TickScheduler};

/// Owns the countdown state and drives it through Idle, Running and Alarming
///
/// Every mutation is followed by a [`CountdownSnapshot`] on the display channel.
pub struct CountdownController<P, S> {
    state: CountdownState,
    player: P,
    scheduler: S,
    start_enabled: bool,
    errors: Vec<String>,
    display_tx: watch::Sender<CountdownSnapshot>,
}

impl<P: SoundPlayer, S: TickScheduler> CountdownController<P, S> {
    /// Create an idle controller
    pub fn new(player: P, scheduler: S) -> Self {
        let (display_tx, _) = watch::channel(CountdownSnapshot::default());
        Self {
            state: CountdownState::new(),
            player,
            scheduler,
            start_enabled: true,
            errors: Vec::new(),
            display_tx,
        }
    }

    /// Subscribe to display refresh events
    pub fn subscribe(&self) -> watch::Receiver<CountdownSnapshot> {
        self.display_tx.subscribe()
    }

    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Remaining time as `HH:MM:SS`
    pub fn formatted_remaining(&self) -> String {
        self.state.formatted_remaining()
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot::new(&self.state, self.start_enabled, self.errors.clone())
    }

    /// Start (or restart) a countdown of `duration_seconds`
    ///
    /// Any pending tick and any playing alarm are cancelled first. A zero duration leaves the
    /// controller idle without scheduling anything.
    pub fn start(&mut self, duration_seconds: i64) -> Result<(), CountdownError> {
        let duration = u64::try_from(duration_seconds).map_err(|_| {
            warn!("Rejecting negative countdown duration: {}s", duration_seconds);
            CountdownError::InvalidDuration(duration_seconds)
        })?;

        self.scheduler.cancel();
        self.errors.clear();
        let playback = self.silence();

        if duration > 0 {
            if let Err(e) = self.scheduler.schedule() {
                warn!("Cannot start countdown: {}", e);
                self.state = CountdownState::new();
                self.start_enabled = false;
                self.errors.push(e.to_string());
                self.publish();
                return Err(e);
            }
            self.start_enabled = true;
        }

        self.state.configured_duration_seconds = duration;
        self.state.remaining_seconds = duration;
        self.state.phase = if duration > 0 { Phase::Running } else { Phase::Idle };

        if duration > 0 {
            info!("Countdown started for {} ({}s)", self.formatted_remaining(), duration);
        } else {
            info!("Countdown started with zero duration, staying idle");
        }
        self.publish();
        playback
    }

    /// Advance the countdown by one second
    ///
    /// Reaching zero cancels ticking, enters Alarming and starts the looping alarm. Ticks
    /// outside Running are ignored.
    pub fn tick(&mut self) -> Result<(), CountdownError> {
        if !self.state.is_running() {
            debug!("Ignoring tick while {}", self.state.phase);
            return Ok(());
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            debug!("Countdown tick: {} remaining", self.formatted_remaining());
            self.publish();
            return Ok(());
        }

        self.scheduler.cancel();
        self.state.phase = Phase::Alarming;
        info!("Countdown reached zero, sounding alarm");

        let playback = self.player.start_loop();
        if let Err(e) = &playback {
            warn!("Alarm is silent: {}", e);
            self.errors.push(e.to_string());
        }
        self.publish();
        playback
    }

    /// Dismiss a sounding alarm and return to idle
    pub fn stop_alarm(&mut self) -> Result<(), CountdownError> {
        if !self.state.is_alarming() {
            debug!("Stop alarm requested while {}", self.state.phase);
            return Err(CountdownError::NotAlarming {
                phase: self.state.phase,
            });
        }

        self.scheduler.cancel();
        let playback = self.stop_sound();
        self.state.remaining_seconds = 0;
        self.state.phase = Phase::Idle;
        info!("Alarm stopped");
        self.publish();
        playback
    }

    /// Return to idle from any phase, clearing the configured duration
    pub fn reset(&mut self) -> Result<(), CountdownError> {
        self.scheduler.cancel();
        self.errors.clear();
        let playback = self.silence();
        self.state = CountdownState::new();
        info!("Countdown reset");
        self.publish();
        playback
    }

    /// Single start/stop button: starts when idle, resets when running, stops the alarm when
    /// alarming
    pub fn press(&mut self, duration_seconds: i64) -> Result<(), CountdownError> {
        match self.state.phase {
            Phase::Idle => self.start(duration_seconds),
            Phase::Running => self.reset(),
            Phase::Alarming => self.stop_alarm(),
        }
    }

    /// Stop the alarm sound if it is playing
    fn silence(&mut self) -> Result<(), CountdownError> {
        if self.player.is_playing() {
            self.stop_sound()
        } else {
            Ok(())
        }
    }

    fn stop_sound(&mut self) -> Result<(), CountdownError> {
        let result = self.player.stop();
        if let Err(e) = &result {
            warn!("Failed to stop alarm sound: {}", e);
            self.errors.push(e.to_string());
        }
        result
    }

    fn publish(&self) {
        // send_replace keeps the value current even with no subscribers
        self.display_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::parse_hms;

    #[derive(Default)]
    struct RecordingPlayer {
        starts: usize,
        stops: usize,
        playing: bool,
        fail_start: bool,
    }

    impl SoundPlayer for RecordingPlayer {
        fn start_loop(&mut self) -> Result<(), CountdownError> {
            self.starts += 1;
            if self.fail_start {
                return Err(CountdownError::PlaybackUnavailable {
                    reason: "sound file London.mp3 not found".to_string(),
                });
            }
            self.playing = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CountdownError> {
            self.stops += 1;
            self.playing = false;
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        schedules: usize,
        cancels: usize,
        active: bool,
        /// Number of upcoming `schedule` calls that fail
        failures: usize,
    }

    impl TickScheduler for RecordingScheduler {
        fn schedule(&mut self) -> Result<(), CountdownError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(CountdownError::SchedulingUnavailable {
                    reason: "no runtime".to_string(),
                });
            }
            assert!(!self.active, "schedule while a tick is still pending");
            self.schedules += 1;
            self.active = true;
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
            self.active = false;
        }

        fn is_scheduled(&self) -> bool {
            self.active
        }
    }

    fn controller() -> CountdownController<RecordingPlayer, RecordingScheduler> {
        CountdownController::new(RecordingPlayer::default(), RecordingScheduler::default())
    }

    fn run_ticks(
        controller: &mut CountdownController<RecordingPlayer, RecordingScheduler>,
        n: u64,
    ) {
        for _ in 0..n {
            controller.tick().unwrap();
        }
    }

    #[test]
    fn test_starts_idle() {
        let c = controller();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().remaining_seconds, 0);
        assert_eq!(c.formatted_remaining(), "00:00:00");
        assert!(!c.scheduler().is_scheduled());
    }

    #[test]
    fn test_start_formats_duration() {
        for d in [0, 1, 59, 61, 3599, 3661, 86_399] {
            let mut c = controller();
            c.start(d).unwrap();
            assert_eq!(c.formatted_remaining(), format_expected(d as u64));
        }
    }

    fn format_expected(s: u64) -> String {
        format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
    }

    #[test]
    fn test_scenario_a_five_ticks_alarm() {
        let mut c = controller();
        c.start(5).unwrap();
        assert_eq!(c.phase(), Phase::Running);
        assert!(c.scheduler().is_scheduled());

        run_ticks(&mut c, 5);

        assert_eq!(c.phase(), Phase::Alarming);
        assert_eq!(c.formatted_remaining(), "00:00:00");
        assert_eq!(c.player().starts, 1);
        assert!(!c.scheduler().is_scheduled());
    }

    #[test]
    fn test_alarm_fires_exactly_at_last_tick() {
        for d in 1..=10u64 {
            let mut c = controller();
            c.start(d as i64).unwrap();
            run_ticks(&mut c, d - 1);
            assert_eq!(c.phase(), Phase::Running, "alarm too early for {}s", d);
            assert_eq!(c.player().starts, 0);

            c.tick().unwrap();
            assert_eq!(c.phase(), Phase::Alarming);

            // Stray ticks after the alarm do nothing
            run_ticks(&mut c, 3);
            assert_eq!(c.phase(), Phase::Alarming);
            assert_eq!(c.player().starts, 1);
        }
    }

    #[test]
    fn test_scenario_b_zero_duration_stays_idle() {
        let mut c = controller();
        c.start(0).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().remaining_seconds, 0);
        assert!(!c.scheduler().is_scheduled());

        c.tick().unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.player().starts, 0);
    }

    #[test]
    fn test_scenario_c_hours_minutes_seconds() {
        let mut c = controller();
        c.start(3661).unwrap();
        assert_eq!(c.formatted_remaining(), "01:01:01");
        assert_eq!(c.state().configured_duration_seconds, 3661);
    }

    #[test]
    fn test_scenario_d_stop_alarm() {
        let mut c = controller();
        c.start(2).unwrap();
        run_ticks(&mut c, 2);
        assert_eq!(c.phase(), Phase::Alarming);

        c.stop_alarm().unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().remaining_seconds, 0);
        assert_eq!(c.player().stops, 1);
        assert!(!c.player().is_playing());
    }

    #[test]
    fn test_stop_alarm_outside_alarming_is_rejected() {
        let mut c = controller();
        c.start(10).unwrap();
        c.tick().unwrap();

        let err = c.stop_alarm().unwrap_err();
        assert_eq!(err, CountdownError::NotAlarming { phase: Phase::Running });
        assert_eq!(c.phase(), Phase::Running);
        assert_eq!(c.state().remaining_seconds, 9);
        assert_eq!(c.player().stops, 0);
    }

    #[test]
    fn test_negative_duration_leaves_state_unchanged() {
        let mut c = controller();
        c.start(30).unwrap();
        c.tick().unwrap();
        let before = c.state().clone();

        assert_eq!(c.start(-1), Err(CountdownError::InvalidDuration(-1)));
        assert_eq!(c.state(), &before);
        assert!(c.scheduler().is_scheduled());
        assert_eq!(c.scheduler().schedules, 1);
    }

    #[test]
    fn test_restart_keeps_single_schedule() {
        let mut c = controller();
        c.start(100).unwrap();
        run_ticks(&mut c, 3);
        c.start(20).unwrap();

        assert_eq!(c.state().remaining_seconds, 20);
        assert_eq!(c.state().configured_duration_seconds, 20);
        assert_eq!(c.scheduler().schedules, 2);
        assert!(c.scheduler().is_scheduled());
        // RecordingScheduler asserts no second schedule is taken while one is pending
    }

    #[test]
    fn test_restart_during_alarm_silences_it() {
        let mut c = controller();
        c.start(1).unwrap();
        c.tick().unwrap();
        assert!(c.player().is_playing());

        c.start(4).unwrap();
        assert_eq!(c.phase(), Phase::Running);
        assert!(!c.player().is_playing());
        assert_eq!(c.player().stops, 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut c = controller();
        c.start(90).unwrap();
        run_ticks(&mut c, 10);

        c.reset().unwrap();
        let once = c.state().clone();
        c.reset().unwrap();

        assert_eq!(c.state(), &once);
        assert_eq!(once, CountdownState::new());
        assert!(!c.scheduler().is_scheduled());
    }

    #[test]
    fn test_reset_during_alarm_stops_sound() {
        let mut c = controller();
        c.start(1).unwrap();
        c.tick().unwrap();

        c.reset().unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.player().stops, 1);
        assert_eq!(c.state().configured_duration_seconds, 0);
    }

    #[test]
    fn test_display_round_trips_through_countdown() {
        let mut c = controller();
        c.start(125).unwrap();
        loop {
            assert_eq!(parse_hms(&c.formatted_remaining()), Some(c.state().remaining_seconds));
            if c.phase() != Phase::Running {
                break;
            }
            c.tick().unwrap();
        }
        assert_eq!(c.phase(), Phase::Alarming);
    }

    #[test]
    fn test_playback_failure_keeps_alarming() {
        let mut c = CountdownController::new(
            RecordingPlayer {
                fail_start: true,
                ..Default::default()
            },
            RecordingScheduler::default(),
        );
        c.start(1).unwrap();

        let err = c.tick().unwrap_err();
        assert!(err.is_non_fatal());
        assert_eq!(c.phase(), Phase::Alarming);
        assert_eq!(c.snapshot().errors.len(), 1);

        // Nothing is playing, but the alarm can still be dismissed
        c.stop_alarm().unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.player().stops, 1);
    }

    #[test]
    fn test_scheduling_unavailable_disables_start() {
        let mut c = CountdownController::new(
            RecordingPlayer::default(),
            RecordingScheduler {
                failures: 1,
                ..Default::default()
            },
        );
        let rx = c.subscribe();

        let err = c.start(10).unwrap_err();
        assert!(matches!(err, CountdownError::SchedulingUnavailable { .. }));
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().remaining_seconds, 0);
        assert!(!rx.borrow().start_enabled);
        assert_eq!(rx.borrow().errors.len(), 1);
    }

    #[test]
    fn test_only_a_successful_schedule_reenables_start() {
        let mut c = CountdownController::new(
            RecordingPlayer::default(),
            RecordingScheduler {
                failures: 1,
                ..Default::default()
            },
        );
        c.start(10).unwrap_err();

        // Nothing is scheduled for a zero duration, so start stays disabled
        c.start(0).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(!c.snapshot().start_enabled);

        c.start(10).unwrap();
        assert_eq!(c.phase(), Phase::Running);
        assert!(c.snapshot().start_enabled);
        assert!(c.snapshot().errors.is_empty());
    }

    #[test]
    fn test_press_cycles_through_phases() {
        let mut c = controller();
        c.press(2).unwrap();
        assert_eq!(c.phase(), Phase::Running);

        // Pressing "Stop Timer" abandons the countdown
        c.press(2).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.state().configured_duration_seconds, 0);

        c.press(1).unwrap();
        c.tick().unwrap();
        assert_eq!(c.phase(), Phase::Alarming);

        c.press(0).unwrap();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.player().stops, 1);
    }

    #[test]
    fn test_every_mutation_refreshes_display() {
        let mut c = controller();
        let mut rx = c.subscribe();

        c.start(2).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().label, "Time remaining: 00:00:02");

        c.tick().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().remaining, "00:00:01");

        c.tick().unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.phase, Phase::Alarming);
        assert_eq!(snapshot.button.title(), "Stop Music");
        assert!(!snapshot.picker_enabled);
    }
}

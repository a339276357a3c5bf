//! One-second tick source for the countdown

use std::time::Duration;
use tokio::{
    runtime::Handle,
    sync::mpsc::WeakUnboundedSender,
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tracing::debug;

use super::countdown::CountdownCommand;
use crate::error::CountdownError;

/// Delivers periodic ticks to the controller
///
/// At most one schedule is active; `cancel` must guarantee that no further tick from the
/// cancelled schedule reaches the controller.
pub trait TickScheduler {
    fn schedule(&mut self) -> Result<(), CountdownError>;
    fn cancel(&mut self);
    fn is_scheduled(&self) -> bool;
}

/// Tick source backed by a tokio interval task
///
/// Ticks are posted to the controller's command channel tagged with a generation. Each
/// `schedule` starts a new generation, and [`TokioTickScheduler::is_current`] lets the
/// controller task drop ticks queued by a schedule that has since been cancelled.
#[derive(Debug)]
pub struct TokioTickScheduler {
    commands: WeakUnboundedSender<CountdownCommand>,
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl TokioTickScheduler {
    pub fn new(commands: WeakUnboundedSender<CountdownCommand>, period: Duration) -> Self {
        Self {
            commands,
            period,
            generation: 0,
            task: None,
        }
    }

    /// Whether a tick of `generation` belongs to the live schedule
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl TickScheduler for TokioTickScheduler {
    fn schedule(&mut self) -> Result<(), CountdownError> {
        self.cancel();

        let runtime = Handle::try_current().map_err(|e| CountdownError::SchedulingUnavailable {
            reason: e.to_string(),
        })?;
        if self.commands.upgrade().is_none() {
            return Err(CountdownError::SchedulingUnavailable {
                reason: "countdown command channel is closed".to_string(),
            });
        }

        self.generation += 1;
        let generation = self.generation;
        let commands = self.commands.clone();
        let period = self.period;

        self.task = Some(runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(tx) = commands.upgrade() else {
                    break;
                };
                if tx.send(CountdownCommand::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
        debug!("Tick schedule {} started", generation);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Tick schedule {} cancelled", self.generation);
        }
    }

    fn is_scheduled(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioTickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period_after_a_full_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioTickScheduler::new(tx.downgrade(), Duration::from_secs(1));
        scheduler.schedule().unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err(), "tick delivered before one period elapsed");

        tokio::time::sleep(Duration::from_millis(2600)).await;
        let mut ticks = 0;
        while let Ok(command) = rx.try_recv() {
            assert!(matches!(command, CountdownCommand::Tick { generation: 1 }));
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioTickScheduler::new(tx.downgrade(), Duration::from_secs(1));
        scheduler.schedule().unwrap();
        scheduler.cancel();
        assert!(!scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_starts_new_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioTickScheduler::new(tx.downgrade(), Duration::from_secs(1));
        scheduler.schedule().unwrap();
        scheduler.schedule().unwrap();

        assert_eq!(scheduler.generation(), 2);
        assert!(scheduler.is_current(2));
        assert!(!scheduler.is_current(1));

        scheduler.cancel();
        assert!(!scheduler.is_current(2));
    }

    #[tokio::test]
    async fn test_closed_channel_is_unavailable() {
        let (tx, rx) = mpsc::unbounded_channel::<CountdownCommand>();
        let weak = tx.downgrade();
        drop(tx);
        drop(rx);

        let mut scheduler = TokioTickScheduler::new(weak, Duration::from_secs(1));
        let err = scheduler.schedule().unwrap_err();
        assert!(matches!(err, CountdownError::SchedulingUnavailable { .. }));
        assert!(!scheduler.is_scheduled());
    }

    #[test]
    fn test_no_runtime_is_unavailable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioTickScheduler::new(tx.downgrade(), Duration::from_secs(1));
        let err = scheduler.schedule().unwrap_err();
        assert!(matches!(err, CountdownError::SchedulingUnavailable { .. }));
    }
}

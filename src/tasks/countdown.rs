//! Countdown controller task and the handle used to command it

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::scheduler::TokioTickScheduler;
use crate::{
    error::CountdownError,
    services::SoundPlayer,
    state::{CountdownController, CountdownSnapshot},
};

/// Messages accepted by the countdown task
#[derive(Debug)]
pub enum CountdownCommand {
    Start {
        duration_seconds: i64,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Press {
        duration_seconds: i64,
        reply: oneshot::Sender<CommandOutcome>,
    },
    StopAlarm {
        reply: oneshot::Sender<CommandOutcome>,
    },
    Reset {
        reply: oneshot::Sender<CommandOutcome>,
    },
    Tick {
        generation: u64,
    },
}

/// Result of a command together with the state it left behind
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub snapshot: CountdownSnapshot,
    pub result: Result<(), CountdownError>,
}

/// Clonable handle to a running countdown task
#[derive(Debug, Clone)]
pub struct CountdownHandle {
    commands: mpsc::UnboundedSender<CountdownCommand>,
    display_rx: watch::Receiver<CountdownSnapshot>,
}

impl CountdownHandle {
    pub async fn start(&self, duration_seconds: i64) -> Result<CommandOutcome, CountdownError> {
        self.request(|reply| CountdownCommand::Start {
            duration_seconds,
            reply,
        })
        .await
    }

    pub async fn press(&self, duration_seconds: i64) -> Result<CommandOutcome, CountdownError> {
        self.request(|reply| CountdownCommand::Press {
            duration_seconds,
            reply,
        })
        .await
    }

    pub async fn stop_alarm(&self) -> Result<CommandOutcome, CountdownError> {
        self.request(|reply| CountdownCommand::StopAlarm { reply }).await
    }

    pub async fn reset(&self) -> Result<CommandOutcome, CountdownError> {
        self.request(|reply| CountdownCommand::Reset { reply }).await
    }

    /// Latest published display state
    pub fn snapshot(&self) -> CountdownSnapshot {
        self.display_rx.borrow().clone()
    }

    /// Receive a display refresh after every state change
    pub fn subscribe(&self) -> watch::Receiver<CountdownSnapshot> {
        self.display_rx.clone()
    }

    async fn request<F>(&self, command: F) -> Result<CommandOutcome, CountdownError>
    where
        F: FnOnce(oneshot::Sender<CommandOutcome>) -> CountdownCommand,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| CountdownError::ControllerGone)?;
        reply_rx.await.map_err(|_| CountdownError::ControllerGone)
    }
}

/// Spawn the countdown task, ticking every `period`
///
/// The task exclusively owns the controller; commands and ticks are applied one at a time in
/// arrival order. It ends once every [`CountdownHandle`] is dropped.
pub fn spawn_countdown<P>(player: P, period: Duration) -> CountdownHandle
where
    P: SoundPlayer + Send + 'static,
{
    let (commands, commands_rx) = mpsc::unbounded_channel();
    let scheduler = TokioTickScheduler::new(commands.downgrade(), period);
    let controller = CountdownController::new(player, scheduler);
    let display_rx = controller.subscribe();

    tokio::spawn(countdown_task(controller, commands_rx));

    CountdownHandle {
        commands,
        display_rx,
    }
}

/// Apply commands to the controller until the channel closes
pub async fn countdown_task<P: SoundPlayer>(
    mut controller: CountdownController<P, TokioTickScheduler>,
    mut commands: mpsc::UnboundedReceiver<CountdownCommand>,
) {
    info!("Starting countdown task");

    while let Some(command) = commands.recv().await {
        let (result, reply) = match command {
            CountdownCommand::Tick { generation } => {
                if !controller.scheduler().is_current(generation) {
                    debug!("Dropping stale tick from schedule {}", generation);
                    continue;
                }
                if let Err(e) = controller.tick() {
                    warn!("Countdown tick reported: {}", e);
                }
                continue;
            }
            CountdownCommand::Start {
                duration_seconds,
                reply,
            } => (controller.start(duration_seconds), reply),
            CountdownCommand::Press {
                duration_seconds,
                reply,
            } => (controller.press(duration_seconds), reply),
            CountdownCommand::StopAlarm { reply } => (controller.stop_alarm(), reply),
            CountdownCommand::Reset { reply } => (controller.reset(), reply),
        };

        let outcome = CommandOutcome {
            snapshot: controller.snapshot(),
            result,
        };
        if reply.send(outcome).is_err() {
            debug!("Command caller went away before the reply");
        }
    }

    info!("Countdown task stopped");
}

// Fixed-interval polling of one axis/command pair
//
// The poller owns the session while it runs: the link has no request ids, so
// a one-shot command issued mid-poll would steal the poll's reply. `stop()`
// hands the session back once the loop has finished its last exchange.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::commands::Command;
use super::errors::{Classification, classify};
use super::session::Session;
use crate::config::MIN_POLL_INTERVAL;
use crate::messages::{PollEvent, PollResult, Reading};

/// Returned when the loop could not give its session back
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Polling task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Query for {axis}{command} did not complete; session lost")]
    SessionLost { axis: String, command: Command },
}

/// Handle to a running polling loop
pub struct Poller {
    axis: String,
    command: Command,
    stop_tx: Option<oneshot::Sender<()>>,
    // closed by the loop when it exits
    done_rx: Option<oneshot::Receiver<()>>,
    task: JoinHandle<Result<Session, PollerError>>,
}

impl Poller {
    /// Start polling `axis`/`command` every `period`, first query immediately.
    ///
    /// Must be called from within a tokio runtime. Each cycle's outcome goes to
    /// `sink`. A transport failure is delivered as [`PollEvent::Failed`] and
    /// ends the loop. A zero `period` is raised to [`MIN_POLL_INTERVAL`].
    pub fn start<F>(
        session: Session,
        axis: impl Into<String>,
        command: Command,
        period: Duration,
        sink: F,
    ) -> Self
    where
        F: FnMut(PollEvent) + Send + 'static,
    {
        let axis = axis.into();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        if period < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} too short, using {:?}",
                period, MIN_POLL_INTERVAL
            );
        }
        let period = period.max(MIN_POLL_INTERVAL);

        info!(
            "Polling {}{}? every {}ms",
            axis,
            command.mnemonic(),
            period.as_millis()
        );
        let task = tokio::spawn(run(
            session,
            axis.clone(),
            command,
            period,
            sink,
            stop_rx,
            done_tx,
        ));

        Self {
            axis,
            command,
            stop_tx: Some(stop_tx),
            done_rx: Some(done_rx),
            task,
        }
    }

    pub fn axis(&self) -> &str {
        &self.axis
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// False once the loop has exited, whether stopped or failed
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Resolve once the loop has exited, e.g. after a transport failure.
    /// Stays pending while the loop is healthy. Cancel safe.
    pub async fn finished(&mut self) {
        if let Some(done_rx) = self.done_rx.as_mut() {
            // the loop never sends, only drops its end
            let _ = done_rx.await;
            self.done_rx = None;
        }
    }

    /// Ask the loop to stop and wait for it.
    ///
    /// Takes effect between cycles; an in-flight query is allowed to finish.
    /// When this returns no further queries will be issued and the session is
    /// back in the caller's hands.
    pub async fn stop(mut self) -> Result<Session, PollerError> {
        if let Some(tx) = self.stop_tx.take() {
            // the loop may already have exited on a transport failure
            let _ = tx.send(());
        }
        let session = self.task.await??;
        info!("Stopped polling {}{}", self.axis, self.command.mnemonic());
        Ok(session)
    }
}

async fn run<F>(
    mut session: Session,
    axis: String,
    command: Command,
    period: Duration,
    mut sink: F,
    mut stop_rx: oneshot::Receiver<()>,
    _done_tx: oneshot::Sender<()>,
) -> Result<Session, PollerError>
where
    F: FnMut(PollEvent) + Send + 'static,
{
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = tick.tick() => {}
        }

        // serial reads block, keep them off the async workers
        let query_axis = axis.clone();
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = session.poll_value(&query_axis, &command);
            (session, outcome)
        })
        .await
        .map_err(|e| {
            warn!("Query task for {}{} aborted: {}", axis, command, e);
            PollerError::SessionLost {
                axis: axis.clone(),
                command,
            }
        })?;
        session = returned;

        match outcome {
            Ok(reading) => {
                if let Reading::Value(ref value) = reading {
                    if let Classification::Error(code) = classify(value) {
                        warn!("Axis {} reported {}", axis, code.message());
                        sink(PollEvent::DeviceError {
                            axis: axis.clone(),
                            command,
                            code,
                        });
                        continue;
                    }
                }
                debug!("Poll {}{}: {:?}", axis, command, reading);
                sink(PollEvent::Reading(PollResult {
                    axis: axis.clone(),
                    command,
                    reading,
                }));
            }
            Err(e) => {
                warn!("Polling {}{} stopped: {}", axis, command, e);
                sink(PollEvent::Failed(e));
                break;
            }
        }
    }

    Ok(session)
}

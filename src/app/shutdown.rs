use super::state::record_state;
use super::startup::TASK_JOIN_TIMEOUT;
use super::{ComponentState, SimulationController};
use crate::error::Result;
use crate::events::StopReason;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

impl SimulationController {
    /// Stop the current session.
    ///
    /// Closes the display and terminates audio before returning; worker tasks
    /// wind down on their own. Safe before any start, after the session ended
    /// and when called repeatedly. Also cancels a start that is in flight.
    pub fn stop(&self) {
        let mut session = self.session.lock();
        session.epoch += 1;

        let ended = self
            .resources
            .end_session(&self.context, &self.event_bus, StopReason::Requested);
        if ended && self.component_state("audio") == Some(ComponentState::Running) {
            record_state(&self.component_states, "audio", ComponentState::Stopped);
        }

        if ended {
            info!("Playback stop requested");
        } else {
            debug!("Stop requested while no session was running");
        }
    }

    /// Stop, then wait for the worker tasks to finish
    pub async fn shutdown(&self) -> Result<()> {
        info!("Beginning graceful shutdown");
        self.stop();
        self.join_tasks(TASK_JOIN_TIMEOUT).await;
        self.context.frame_buffer.drain();
        info!("Graceful shutdown completed");
        Ok(())
    }

    /// Resolve once the running session has ended, for any reason
    pub async fn wait_stopped(&self) {
        self.context.run_state.stopped().await;
    }

    /// Await the previous session's tasks, aborting stragglers
    pub(super) async fn join_tasks(&self, limit: Duration) {
        let tasks = std::mem::take(&mut self.session.lock().tasks);
        if tasks.is_empty() {
            return;
        }

        debug!("Joining {} playback tasks", tasks.len());
        for mut task in tasks {
            match timeout(limit, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Playback task ended abnormally: {}", e),
                Err(_) => {
                    warn!("Playback task still running after {:?}, aborting", limit);
                    task.abort();
                }
            }
        }
    }
}

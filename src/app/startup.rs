use super::state::record_state;
use super::{ComponentState, SimulationController};
use crate::bandwidth::BandwidthEstimator;
use crate::error::{AbrSimError, Result};
use crate::events::{PlaybackEvent, StopReason};
use crate::frame::FrameResizer;
use crate::playback::{FrameConsumer, FrameProducer};
use crate::source::FrameSource;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upper bound on waiting for a previous session's tasks
pub(super) const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

impl SimulationController {
    /// Begin a playback session.
    ///
    /// Does nothing while a session is running. Fails with
    /// `SourceUnavailable` when the media cannot be opened, leaving the
    /// controller stopped. A missing audio player only degrades the session.
    ///
    /// The call is tied to the session epoch at the moment `start` is
    /// called: any `stop()` after that, even one issued before the returned
    /// future is first polled or while it waits behind another start,
    /// cancels it.
    pub fn start(&self) -> impl Future<Output = Result<()>> + Send + '_ {
        let epoch = self.session.lock().epoch;
        self.start_session(epoch)
    }

    async fn start_session(&self, epoch: u64) -> Result<()> {
        let _starting = self.start_lock.lock().await;

        if self.session.lock().epoch != epoch {
            info!("Start cancelled by a stop issued after it");
            return Ok(());
        }

        if self.context.is_running() {
            debug!("Playback already running, ignoring start");
            return Ok(());
        }

        self.join_tasks(TASK_JOIN_TIMEOUT).await;

        info!(
            "Opening {} with the {} opener",
            self.source_path.display(),
            self.opener.name()
        );
        let source = self
            .opener
            .open(&self.source_path)
            .await
            .map_err(|e| match e {
                AbrSimError::SourceUnavailable { .. } => e,
                other => AbrSimError::source_unavailable(
                    self.source_path.display().to_string(),
                    other.to_string(),
                ),
            })
            .map_err(|e| {
                error!("Failed to open source: {}", e);
                e
            })?;
        let mut source = Some(source);

        self.context.reset();
        let opened = self.resources.display.lock().open();
        if let Err(e) = opened {
            error!("Failed to open display: {}", e);
            if let Some(mut source) = source.take() {
                source.release().await;
            }
            return Err(e);
        }

        let session_id = Uuid::new_v4();
        let started = {
            let mut session = self.session.lock();
            if session.epoch != epoch {
                false
            } else {
                self.context.run_state.set(true);
                session.id = Some(session_id);
                session.started_at = Some(Utc::now());

                let _ = self.event_bus.publish(PlaybackEvent::PlaybackStarted {
                    session_id,
                    rendition: self.context.current_rendition(),
                    timestamp: SystemTime::now(),
                });

                // Audio must be running before any worker can end the session
                self.start_audio();
                session.tasks = self.spawn_workers(source.take());
                true
            }
        };

        if !started {
            info!("Start cancelled by a concurrent stop");
            self.resources.release();
            if let Some(mut source) = source.take() {
                source.release().await;
            }
            return Ok(());
        }

        info!("Playback started (session {})", session_id);
        Ok(())
    }

    fn spawn_workers(&self, source: Option<Box<dyn FrameSource>>) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(3);

        let estimator = BandwidthEstimator::new(Arc::clone(&self.counters))
            .normalize_per_second(self.config.bandwidth.normalize_per_second);
        tasks.push(self.spawn_component(
            "estimator",
            estimator.run(
                Arc::clone(&self.context),
                Arc::clone(&self.event_bus),
                self.config.sample_interval(),
            ),
        ));

        if let Some(source) = source {
            let producer = FrameProducer::new(
                source,
                FrameResizer::new(self.config.abr.resize_filter),
                self.config.producer_idle(),
            );
            tasks.push(self.spawn_component(
                "producer",
                producer.run(Arc::clone(&self.context), Arc::clone(&self.event_bus)),
            ));
        }

        let consumer = FrameConsumer::new(self.resources.clone(), self.config.render_interval());
        tasks.push(self.spawn_component(
            "consumer",
            consumer.run(Arc::clone(&self.context), Arc::clone(&self.event_bus)),
        ));

        tasks
    }

    /// Run a worker; any error it returns stops the session and is reported
    fn spawn_component<F>(&self, component: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let event_bus = Arc::clone(&self.event_bus);
        let resources = self.resources.clone();
        let states = Arc::clone(&self.component_states);

        record_state(&states, component, ComponentState::Running);
        tokio::spawn(async move {
            match task.await {
                Ok(()) => record_state(&states, component, ComponentState::Stopped),
                Err(e) => {
                    error!("{} failed: {}", component, e);
                    record_state(&states, component, ComponentState::Failed);
                    let _ = event_bus.publish(PlaybackEvent::SystemError {
                        component: component.to_string(),
                        error: e.to_string(),
                    });
                    resources.end_session(
                        &context,
                        &event_bus,
                        StopReason::Fatal {
                            component: component.to_string(),
                            error: e.to_string(),
                        },
                    );
                }
            }
        })
    }

    fn start_audio(&self) {
        if !self.resources.audio.is_enabled() {
            record_state(&self.component_states, "audio", ComponentState::Disabled);
            return;
        }

        match self.resources.audio.start(&self.source_path) {
            Ok(()) => record_state(&self.component_states, "audio", ComponentState::Running),
            Err(e) => {
                warn!("Audio unavailable, continuing without it: {}", e);
                record_state(&self.component_states, "audio", ComponentState::Failed);
                let _ = self.event_bus.publish(PlaybackEvent::AudioUnavailable {
                    error: e.to_string(),
                });
            }
        }
    }
}

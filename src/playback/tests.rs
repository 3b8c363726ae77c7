use super::*;
use crate::audio::AudioSidecar;
use crate::config::ResizeFilter;
use crate::context::SimulationContext;
use crate::error::AbrSimError;
use crate::events::{EventBus, PlaybackEvent, StopReason};
use crate::frame::FrameResizer;
use crate::rendition::{Rendition, RenditionTable, Resolution};
use crate::source::SyntheticSource;
use crate::testing::{BrokenSource, DisplayLog, RecordingAudioLauncher, RecordingDisplay};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const IDLE: Duration = Duration::from_millis(2);
const PACE: Duration = Duration::from_millis(1);

fn small_table() -> RenditionTable {
    RenditionTable::new(vec![Rendition::new(8, 6, 1000), Rendition::new(4, 3, 0)]).unwrap()
}

fn running_context(capacity: usize) -> Arc<SimulationContext> {
    let context = Arc::new(SimulationContext::new(small_table(), capacity));
    context.run_state.set(true);
    context
}

fn producer(frames: u64) -> FrameProducer {
    FrameProducer::new(
        Box::new(SyntheticSource::new(8, 6, frames)),
        FrameResizer::new(ResizeFilter::Nearest),
        IDLE,
    )
}

fn resources(display: RecordingDisplay) -> (PlaybackResources, Arc<DisplayLog>) {
    let log = display.log();
    let shared = display.shared();
    shared.lock().open().unwrap();
    let audio = Arc::new(AudioSidecar::new(
        Arc::new(RecordingAudioLauncher::new()),
        true,
    ));
    (PlaybackResources::new(shared, audio), log)
}

#[tokio::test]
async fn test_producer_marks_end_of_stream() {
    let context = running_context(16);
    let event_bus = Arc::new(EventBus::new(16));
    let mut events = event_bus.subscribe();

    producer(3)
        .run(Arc::clone(&context), Arc::clone(&event_bus))
        .await
        .unwrap();

    assert_eq!(context.frame_buffer.len(), 3);
    assert!(context.frame_buffer.is_finished());
    assert!(!context.frame_buffer.is_exhausted());
    match events.recv().await.unwrap() {
        PlaybackEvent::EndOfStream { frames_read } => assert_eq!(frames_read, 3),
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_producer_resizes_to_current_rendition() {
    let context = running_context(16);
    context.update_rendition(Resolution::new(4, 3));

    producer(2)
        .run(Arc::clone(&context), Arc::new(EventBus::new(4)))
        .await
        .unwrap();

    let frame = context.frame_buffer.try_pop().unwrap();
    assert_eq!(frame.resolution(), Resolution::new(4, 3));
    assert!(frame.validate_size());
    assert_eq!(context.current_rendition(), Resolution::new(4, 3));
}

#[tokio::test]
async fn test_producer_waits_while_full_and_gives_up_on_stop() {
    let context = running_context(4);
    let task = tokio::spawn(producer(1000).run(Arc::clone(&context), Arc::new(EventBus::new(4))));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(context.frame_buffer.len(), 4);
    assert!(context.frame_buffer.stats().full_waits > 0);

    context.run_state.set(false);
    let result = timeout(Duration::from_secs(1), task)
        .await
        .expect("producer should give up once the run stops")
        .unwrap();
    assert!(result.is_ok());
    assert!(!context.frame_buffer.is_finished());
}

#[tokio::test]
async fn test_producer_read_error_is_returned() {
    let context = running_context(16);
    let producer = FrameProducer::new(
        Box::new(BrokenSource::new(8, 6, 2)),
        FrameResizer::new(ResizeFilter::Nearest),
        IDLE,
    );

    let result = producer
        .run(Arc::clone(&context), Arc::new(EventBus::new(4)))
        .await;

    assert!(matches!(result, Err(AbrSimError::Decode { .. })));
    assert_eq!(context.frame_buffer.len(), 2);
}

#[tokio::test]
async fn test_consumer_drains_then_ends_session() {
    let context = running_context(16);
    let event_bus = Arc::new(EventBus::new(16));
    let mut events = event_bus.subscribe();
    producer(5)
        .run(Arc::clone(&context), Arc::clone(&event_bus))
        .await
        .unwrap();

    let (resources, log) = resources(RecordingDisplay::new());
    resources.audio.start(Path::new("clip.mp4")).unwrap();

    timeout(
        Duration::from_secs(1),
        FrameConsumer::new(resources.clone(), PACE).run(Arc::clone(&context), Arc::clone(&event_bus)),
    )
    .await
    .expect("consumer should stop at end of stream")
    .unwrap();

    assert_eq!(log.shown(), vec![0, 1, 2, 3, 4]);
    assert!(!context.is_running());
    assert_eq!(context.stop_reason(), Some(StopReason::EndOfStream));
    assert_eq!(log.closes(), 1);
    assert!(!resources.audio.is_running());

    let mut saw_stop = false;
    while let Ok(event) = events.try_recv() {
        if let PlaybackEvent::PlaybackStopped { reason, .. } = event {
            assert_eq!(reason, StopReason::EndOfStream);
            saw_stop = true;
        }
    }
    assert!(saw_stop);
}

#[tokio::test]
async fn test_consumer_quit_signal_stops_run() {
    let context = running_context(16);
    let event_bus = Arc::new(EventBus::new(16));
    producer(10)
        .run(Arc::clone(&context), Arc::clone(&event_bus))
        .await
        .unwrap();

    let (resources, log) = resources(RecordingDisplay::new().quit_after(3));
    timeout(
        Duration::from_secs(1),
        FrameConsumer::new(resources, PACE).run(Arc::clone(&context), event_bus),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(log.shown_count(), 3);
    assert_eq!(context.stop_reason(), Some(StopReason::UserQuit));
    assert!(!log.is_open());
}

#[tokio::test]
async fn test_consumer_switches_rendition_on_new_estimate() {
    let context = running_context(16);
    let event_bus = Arc::new(EventBus::new(16));
    let mut events = event_bus.subscribe();
    let (resources, _log) = resources(RecordingDisplay::new());

    context.bandwidth.record(20.0);
    let task = tokio::spawn(
        FrameConsumer::new(resources, PACE).run(Arc::clone(&context), Arc::clone(&event_bus)),
    );

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        PlaybackEvent::RenditionChanged {
            previous,
            current,
            bandwidth_kbps,
        } => {
            assert_eq!(previous, Resolution::new(8, 6));
            assert_eq!(current, Resolution::new(4, 3));
            assert_eq!(bandwidth_kbps, 20.0);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
    assert_eq!(context.current_rendition(), Resolution::new(4, 3));

    // Same estimate again: no further change events
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(events.try_recv().is_err());

    context.run_state.set(false);
    timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_no_frames_shown_after_external_stop() {
    let context = running_context(8);
    let event_bus = Arc::new(EventBus::new(64));
    let (resources, log) = resources(RecordingDisplay::new());

    let producer_task = tokio::spawn(producer(10_000).run(Arc::clone(&context), Arc::clone(&event_bus)));
    let consumer_task = tokio::spawn(
        FrameConsumer::new(resources.clone(), PACE).run(Arc::clone(&context), Arc::clone(&event_bus)),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(resources.end_session(&context, &event_bus, StopReason::Requested));
    let shown_at_stop = log.shown_count();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(log.shown_count(), shown_at_stop);
    assert_eq!(log.shown_while_closed(), 0);

    timeout(Duration::from_secs(1), producer_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(1), consumer_task).await.unwrap().unwrap().unwrap();
    assert!(!resources.end_session(&context, &event_bus, StopReason::Requested));
    assert_eq!(context.stop_reason(), Some(StopReason::Requested));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_buffer_stays_bounded_with_slow_consumer() {
    let capacity = 3;
    let context = running_context(capacity);
    let event_bus = Arc::new(EventBus::new(64));
    let (resources, log) = resources(RecordingDisplay::new());

    let producer_task = tokio::spawn(producer(60).run(Arc::clone(&context), Arc::clone(&event_bus)));
    let consumer_task = tokio::spawn(
        FrameConsumer::new(resources, Duration::from_millis(3))
            .run(Arc::clone(&context), Arc::clone(&event_bus)),
    );

    while context.is_running() {
        assert!(context.frame_buffer.len() <= capacity);
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    timeout(Duration::from_secs(5), producer_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(5), consumer_task).await.unwrap().unwrap().unwrap();

    assert_eq!(log.shown_count(), 60);
    assert!(context.frame_buffer.stats().high_water_mark <= capacity);
    assert_eq!(context.stop_reason(), Some(StopReason::EndOfStream));
}

use super::*;
use crate::config::{DisplayConfig, DisplayKind};
use crate::frame::{FrameFormat, VideoFrame};
use crate::rendition::Resolution;

fn frame(id: u64, width: u32, height: u32) -> VideoFrame {
    let data = vec![0u8; (width * height * 3) as usize];
    VideoFrame::new(id, data, width, height, FrameFormat::Rgb24)
}

#[test]
fn test_null_sink_counts_frames() {
    let mut sink = NullDisplaySink::default();
    sink.open().unwrap();

    sink.show(&frame(0, 4, 2)).unwrap();
    sink.show(&frame(1, 4, 2)).unwrap();
    sink.show(&frame(2, 2, 2)).unwrap();

    let stats = sink.stats();
    assert_eq!(stats.frames_rendered, 3);
    assert_eq!(stats.resolution_changes, 1);
    assert_eq!(stats.last_resolution, Some(Resolution::new(2, 2)));
    assert!(!sink.poll_quit());

    sink.close();
    sink.close();
}

#[test]
fn test_open_resets_stats() {
    let mut sink = NullDisplaySink::default();
    sink.show(&frame(0, 4, 2)).unwrap();
    sink.open().unwrap();
    assert_eq!(sink.stats().frames_rendered, 0);
}

#[test]
fn test_display_stats_success_rate() {
    let mut stats = DisplayStats::default();
    assert_eq!(stats.render_success_rate(), 0.0);

    assert!(!stats.record_frame_render(Resolution::new(4, 2)));
    stats.record_frame_render(Resolution::new(4, 2));
    stats.record_frame_render(Resolution::new(4, 2));
    stats.record_render_error();

    assert_eq!(stats.render_success_rate(), 0.75);
    assert!(stats.last_frame_time.is_some());

    stats.reset();
    assert_eq!(stats.frames_rendered, 0);
    assert!(stats.last_resolution.is_none());
}

#[test]
fn test_terminal_sink_without_keyboard_never_quits() {
    let mut sink = TerminalDisplaySink::new(false);
    sink.open().unwrap();
    sink.show(&frame(0, 4, 2)).unwrap();
    assert!(!sink.poll_quit());
    assert_eq!(sink.stats().frames_rendered, 1);
    sink.close();
}

#[test]
fn test_sink_for_config() {
    let mut config = DisplayConfig::default();
    config.sink = DisplayKind::Null;
    assert_eq!(sink_for(&config).unwrap().lock().name(), "null");

    config.sink = DisplayKind::Terminal;
    assert_eq!(sink_for(&config).unwrap().lock().name(), "terminal");

    #[cfg(not(feature = "gstreamer"))]
    {
        config.sink = DisplayKind::Gstreamer;
        assert!(sink_for(&config).is_err());
    }
}

// THEORY:
// The runner is the host frame loop. The installation ran one detector per
// camera stream inside a 30 Hz render loop; here each stream is a tokio task
// ticking on its own `interval`.
//
// Key architectural principles:
// 1.  **Exclusive ownership**: a `Stream` owns its pipeline, source and sink
//     and is moved into its task. Detectors share nothing, so no locks.
// 2.  **Skip, don't burst**: a tick that runs late is dropped instead of
//     being caught up, matching a render loop that simply misses a frame.
// 3.  **Sinks see only touches**: `Quiet`, `Warming` and `NoFrame` ticks are
//     counted but never dispatched.

use crate::core_modules::utils::image_helper::image_helper;
use crate::pipeline::{Report, TouchPipeline, TouchPoint};
use crate::sources::FrameSource;
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

pub const DEFAULT_TICK_HZ: u32 = 30;

/// Consumer of touch points, e.g. the effect layer that spawns ripples.
pub trait TouchSink: Send {
    fn dispatch(&mut self, stream: &str, tick: u64, points: &[TouchPoint]);
}

/// Logs every dispatched touch at `info`.
#[derive(Debug, Default)]
pub struct LogSink;

impl TouchSink for LogSink {
    fn dispatch(&mut self, stream: &str, tick: u64, points: &[TouchPoint]) {
        for point in points {
            log::info!("[{stream}] tick {tick}: touch at ({:.1}, {:.1})", point.x, point.y);
        }
    }
}

pub struct Stream {
    pub name: String,
    pub detector: TouchPipeline,
    pub source: Box<dyn FrameSource + Send>,
    pub sink: Box<dyn TouchSink>,
    /// When set, every computed mask is written here as PNG.
    pub mask_dir: Option<PathBuf>,
}

impl Stream {
    pub fn new(
        name: impl Into<String>,
        detector: TouchPipeline,
        source: Box<dyn FrameSource + Send>,
        sink: Box<dyn TouchSink>,
    ) -> Self {
        Self {
            name: name.into(),
            detector,
            source,
            sink,
            mask_dir: None,
        }
    }

    pub fn with_mask_dir(mut self, dir: PathBuf) -> Self {
        self.mask_dir = Some(dir);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub name: String,
    pub ticks: u64,
    /// Ticks on which the source delivered a frame the pipeline accepted.
    pub frames: u64,
    /// Total touch points dispatched.
    pub touches: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamRunner {
    tick_hz: u32,
}

impl Default for StreamRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_HZ)
    }
}

impl StreamRunner {
    pub fn new(tick_hz: u32) -> Self {
        Self {
            tick_hz: tick_hz.max(1),
        }
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }

    /// Ticks `stream` `ticks` times at the runner's rate.
    pub async fn run_stream(&self, stream: Stream, ticks: u64) -> StreamSummary {
        drive(stream, self.period(), ticks).await
    }

    /// Runs every stream on its own task. Summaries come back in input order.
    pub async fn run_all(&self, streams: Vec<Stream>, ticks: u64) -> Vec<StreamSummary> {
        let period = self.period();
        let handles: Vec<_> = streams
            .into_iter()
            .map(|stream| tokio::spawn(drive(stream, period, ticks)))
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(summary) => Some(summary),
                Err(e) => {
                    log::error!("stream task failed: {e}");
                    None
                }
            })
            .collect()
    }
}

async fn drive(mut stream: Stream, period: Duration, ticks: u64) -> StreamSummary {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut summary = StreamSummary {
        name: stream.name.clone(),
        ..Default::default()
    };
    log::info!("[{}] running {ticks} ticks every {period:?}", stream.name);

    for tick in 1..=ticks {
        interval.tick().await;
        let report = stream.detector.poll(stream.source.as_mut());
        summary.ticks += 1;
        if !matches!(report, Report::NoFrame) {
            summary.frames += 1;
        }

        let points = report.touch_points();
        if !points.is_empty() {
            summary.touches += points.len() as u64;
            stream.sink.dispatch(&stream.name, tick, points);
        }

        if let (Some(dir), Some(mask)) = (&stream.mask_dir, stream.detector.last_mask()) {
            let path = image_helper::mask_path(dir, &stream.name, tick);
            if let Err(e) = image_helper::save_mask(&path, mask) {
                log::warn!("[{}] failed to write {}: {e}", stream.name, path.display());
            }
        }
    }

    log::info!(
        "[{}] done: {} ticks, {} frames, {} touches",
        stream.name,
        summary.ticks,
        summary.frames,
        summary.touches
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::core_modules::frame::{Frame, uniform};
    use image::Luma;
    use std::sync::{Arc, Mutex};

    /// `warm` background frames, then a dark square forever.
    struct SquareAfter {
        warm: usize,
        served: usize,
    }

    impl FrameSource for SquareAfter {
        fn dimensions(&self) -> (u32, u32) {
            (64, 64)
        }

        fn next_frame(&mut self) -> Option<Frame> {
            self.served += 1;
            let mut frame = uniform(64, 64, 200);
            if self.served > self.warm {
                for y in 20..40 {
                    for x in 20..40 {
                        frame.put_pixel(x, y, Luma([0]));
                    }
                }
            }
            Some(frame)
        }
    }

    struct Silent;

    impl FrameSource for Silent {
        fn dimensions(&self) -> (u32, u32) {
            (64, 64)
        }

        fn next_frame(&mut self) -> Option<Frame> {
            None
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(String, u64, Vec<TouchPoint>)>>>,
    }

    impl TouchSink for Recorder {
        fn dispatch(&mut self, stream: &str, tick: u64, points: &[TouchPoint]) {
            self.seen
                .lock()
                .unwrap()
                .push((stream.to_string(), tick, points.to_vec()));
        }
    }

    fn square_stream(name: &str, sink: Recorder) -> Stream {
        let config = DetectorConfig {
            buffer_capacity: 3,
            ..Default::default()
        };
        let detector = TouchPipeline::new(config, 64, 64).unwrap();
        Stream::new(
            name,
            detector,
            Box::new(SquareAfter { warm: 3, served: 0 }),
            Box::new(sink),
        )
    }

    #[tokio::test]
    async fn dispatches_only_ticks_with_touches() {
        let recorder = Recorder::default();
        let runner = StreamRunner::new(1000);
        let summary = runner.run_stream(square_stream("depth", recorder.clone()), 6).await;

        assert_eq!(
            summary,
            StreamSummary {
                name: "depth".into(),
                ticks: 6,
                frames: 6,
                touches: 2,
            }
        );
        // Ticks 4 and 5 see the square against a partly clean background; by
        // tick 6 the square fills the whole buffer and is background itself.
        let seen = recorder.seen.lock().unwrap();
        let ticks: Vec<u64> = seen.iter().map(|(_, tick, _)| *tick).collect();
        assert_eq!(ticks, vec![4, 5]);
        assert_eq!(seen[0].0, "depth");
        assert_eq!(seen[0].2, vec![TouchPoint { x: 29.5, y: 29.5 }]);
    }

    #[tokio::test]
    async fn runs_streams_concurrently_in_input_order() {
        let recorder = Recorder::default();
        let silent = Stream::new(
            "infrared",
            TouchPipeline::new(DetectorConfig::default(), 64, 64).unwrap(),
            Box::new(Silent),
            Box::new(LogSink),
        );
        let streams = vec![square_stream("depth", recorder.clone()), silent];

        let summaries = StreamRunner::new(1000).run_all(streams, 5).await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "depth");
        assert_eq!(summaries[0].touches, 2);
        assert_eq!(summaries[1].name, "infrared");
        assert_eq!(summaries[1].ticks, 5);
        assert_eq!(summaries[1].frames, 0);
        assert_eq!(summaries[1].touches, 0);
    }

    #[tokio::test]
    async fn writes_a_mask_for_every_detection_tick() {
        let dir = std::env::temp_dir().join(format!("ripple_floor_masks_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let stream = square_stream("color", Recorder::default()).with_mask_dir(dir.clone());
        StreamRunner::new(1000).run_stream(stream, 6).await;

        let mut written: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        written.sort();
        assert_eq!(
            written,
            vec!["color_000004.png", "color_000005.png", "color_000006.png"]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn runner_rate_is_never_zero() {
        assert_eq!(StreamRunner::new(0).tick_hz(), 1);
        assert_eq!(StreamRunner::default().period(), Duration::from_secs_f64(1.0 / 30.0));
    }
}

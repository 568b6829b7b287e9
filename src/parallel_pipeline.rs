// THEORY:
// A process may watch several cameras at once. Lane tracking is stateful per stream, so streams
// can run in parallel but frames of one stream cannot. The `StreamPool` therefore gives every
// stream its own worker task that owns that stream's `LanePipeline` outright. Frames reach the
// worker through a channel in submission order, are tagged with consecutive frame ids, and go
// through `process_sequenced`, so an out-of-order frame is caught rather than silently corrupting
// the tracker. Such an error is fatal for that stream: the worker stops and the handle reports
// the stream as closed from then on. Other streams are unaffected.

use crate::core_modules::detector::SegmentDetector;
use crate::error::{LaneError, Result};
use crate::pipeline::{LanePipeline, LaneReport, TrackerState};
use futures::future::join_all;
use image::RgbImage;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A processed frame handed back to the caller.
#[derive(Debug, Clone)]
pub struct StreamFrame {
    pub rendered: RgbImage,
    pub report: LaneReport,
}

/// What a stream worker leaves behind when it stops.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub stream_id: u64,
    pub frames_processed: u64,
    pub final_state: TrackerState,
}

struct FrameTask {
    frame_id: u64,
    frame: RgbImage,
    result_sender: oneshot::Sender<Result<StreamFrame>>,
}

/// The caller's end of one stream. Frames are submitted one at a time, in order.
pub struct StreamHandle {
    stream_id: u64,
    next_frame_id: u64,
    task_sender: mpsc::UnboundedSender<FrameTask>,
}

impl StreamHandle {
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Processes the next frame of this stream and returns the composited result.
    pub async fn submit(&mut self, frame: RgbImage) -> Result<StreamFrame> {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = FrameTask {
            frame_id: self.next_frame_id,
            frame,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| LaneError::StreamClosed(self.stream_id))?;
        self.next_frame_id += 1;

        result_receiver
            .await
            .map_err(|_| LaneError::StreamClosed(self.stream_id))?
    }
}

struct StreamWorker {
    stream_id: u64,
    handle: JoinHandle<StreamSummary>,
}

/// Runs independent lane streams concurrently, one worker task per stream.
pub struct StreamPool {
    max_streams: usize,
    next_stream_id: u64,
    workers: Vec<StreamWorker>,
    shutdown_sender: watch::Sender<bool>,
}

impl StreamPool {
    /// A pool that admits one stream per available CPU.
    pub fn new() -> Self {
        Self::with_capacity(num_cpus::get())
    }

    pub fn with_capacity(max_streams: usize) -> Self {
        let (shutdown_sender, _) = watch::channel(false);
        Self {
            max_streams: max_streams.max(1),
            next_stream_id: 0,
            workers: Vec::new(),
            shutdown_sender,
        }
    }

    /// Streams whose workers are still running. Finished workers stay in the pool until
    /// `shutdown` collects their summaries.
    pub fn active_streams(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| !w.handle.is_finished())
            .count()
    }

    /// Spawns a worker that owns `pipeline` and returns the handle that feeds it.
    pub fn open_stream<D>(&mut self, pipeline: LanePipeline<D>) -> Result<StreamHandle>
    where
        D: SegmentDetector + Send + 'static,
    {
        if self.active_streams() >= self.max_streams {
            return Err(LaneError::PoolFull(self.max_streams));
        }

        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;

        let (task_sender, task_receiver) = mpsc::unbounded_channel::<FrameTask>();
        let shutdown = self.shutdown_sender.subscribe();
        let handle = tokio::spawn(Self::run_stream(stream_id, pipeline, task_receiver, shutdown));
        self.workers.push(StreamWorker { stream_id, handle });

        info!(stream_id, "stream opened");
        Ok(StreamHandle {
            stream_id,
            next_frame_id: 0,
            task_sender,
        })
    }

    async fn run_stream<D: SegmentDetector>(
        stream_id: u64,
        mut pipeline: LanePipeline<D>,
        mut task_receiver: mpsc::UnboundedReceiver<FrameTask>,
        mut shutdown: watch::Receiver<bool>,
    ) -> StreamSummary {
        loop {
            let task = tokio::select! {
                task = task_receiver.recv() => task,
                _ = shutdown.changed() => None,
            };
            let Some(task) = task else { break };

            match pipeline.process_sequenced(task.frame_id, &task.frame) {
                Ok((rendered, report)) => {
                    let _ = task.result_sender.send(Ok(StreamFrame { rendered, report }));
                }
                Err(e) => {
                    error!(stream_id, error = %e, "stream failed, stopping worker");
                    let _ = task.result_sender.send(Err(e));
                    break;
                }
            }
        }

        info!(stream_id, frames = pipeline.frames_processed(), "stream closed");
        StreamSummary {
            stream_id,
            frames_processed: pipeline.frames_processed(),
            final_state: *pipeline.tracker_state(),
        }
    }

    /// Stops every worker and waits for them to finish.
    pub async fn shutdown(self) -> Vec<StreamSummary> {
        let _ = self.shutdown_sender.send(true);
        let results = join_all(self.workers.into_iter().map(|w| async move {
            match w.handle.await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    error!(stream_id = w.stream_id, error = %e, "stream worker panicked");
                    None
                }
            }
        }))
        .await;
        results.into_iter().flatten().collect()
    }
}

impl Default for StreamPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentProfile;
    use crate::core_modules::detector::ScriptedDetector;
    use crate::pipeline::{LaneSource, LineSegment};

    fn pipeline(frames: Vec<Option<Vec<LineSegment>>>) -> LanePipeline<ScriptedDetector> {
        LanePipeline::new(DeploymentProfile::day(), ScriptedDetector::new(frames)).unwrap()
    }

    #[tokio::test]
    async fn streams_keep_independent_state() {
        let left = LineSegment::new(100, 500, 200, 400);
        let right = LineSegment::new(300, 500, 400, 600);

        let mut pool = StreamPool::with_capacity(2);
        let mut a = pool.open_stream(pipeline(vec![Some(vec![left]), None])).unwrap();
        let mut b = pool.open_stream(pipeline(vec![Some(vec![right]), None])).unwrap();
        let frame = RgbImage::new(640, 500);

        let (fa, fb) = futures::join!(a.submit(frame.clone()), b.submit(frame.clone()));
        assert!(fa.unwrap().report.tracked.right.is_none());
        assert!(fb.unwrap().report.tracked.left.is_none());

        let second = a.submit(frame.clone()).await.unwrap();
        assert_eq!(second.report.frame_id, 1);
        assert_eq!(second.report.tracked.left_source, LaneSource::Carried);
        assert_eq!(second.report.tracked.right_source, LaneSource::Absent);

        drop((a, b));
        let mut summaries = pool.shutdown().await;
        summaries.sort_by_key(|s| s.stream_id);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].frames_processed, 2);
        assert_eq!(summaries[1].frames_processed, 1);
        assert!(summaries[0].final_state.last_left.is_some());
        assert!(summaries[1].final_state.last_right.is_some());
    }

    #[tokio::test]
    async fn pool_rejects_streams_beyond_capacity() {
        let mut pool = StreamPool::with_capacity(1);
        let _a = pool.open_stream(pipeline(vec![])).unwrap();
        assert!(matches!(
            pool.open_stream(pipeline(vec![])),
            Err(LaneError::PoolFull(1))
        ));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn finished_streams_free_their_slot_but_keep_their_summary() {
        let mut pool = StreamPool::with_capacity(1);
        let mut a = pool
            .open_stream(pipeline(vec![Some(vec![LineSegment::new(100, 500, 200, 400)])]))
            .unwrap();
        a.submit(RgbImage::new(64, 64)).await.unwrap();
        drop(a);
        while pool.active_streams() > 0 {
            tokio::task::yield_now().await;
        }

        let _b = pool.open_stream(pipeline(vec![])).unwrap();
        assert_eq!(pool.active_streams(), 1);

        let mut summaries = pool.shutdown().await;
        summaries.sort_by_key(|s| s.stream_id);
        assert_eq!(summaries.len(), 2);
        assert_eq!((summaries[0].stream_id, summaries[0].frames_processed), (0, 1));
        assert!(summaries[0].final_state.last_left.is_some());
        assert_eq!((summaries[1].stream_id, summaries[1].frames_processed), (1, 0));
    }

    #[tokio::test]
    async fn submitting_after_shutdown_reports_closed_stream() {
        let mut pool = StreamPool::with_capacity(1);
        let mut a = pool.open_stream(pipeline(vec![])).unwrap();
        pool.shutdown().await;
        assert!(matches!(
            a.submit(RgbImage::new(8, 8)).await,
            Err(LaneError::StreamClosed(0))
        ));
    }

    #[tokio::test]
    async fn rendered_frames_keep_their_dimensions() {
        let mut pool = StreamPool::new();
        let mut a = pool.open_stream(pipeline(vec![None])).unwrap();
        let out = a.submit(RgbImage::new(320, 240)).await.unwrap();
        assert_eq!(out.rendered.dimensions(), (320, 240));
        assert!(!out.report.has_overlay());
        drop(a);
        pool.shutdown().await;
    }
}

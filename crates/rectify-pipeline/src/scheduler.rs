use std::{
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use crate::error::RectifyError;

/// An inclusive range of frame indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    /// First frame index.
    pub start: usize,
    /// Last frame index, included.
    pub end: usize,
}

impl FrameRange {
    /// Create a new frame range.
    ///
    /// # Errors
    ///
    /// [`RectifyError::Configuration`] when `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, RectifyError> {
        if start > end {
            return Err(RectifyError::Configuration(format!(
                "frame range start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The number of frames in the range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    /// Always false, a range holds at least one frame.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The frame indices in increasing order.
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Half the available hardware parallelism, at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// The number of workers actually used for `range`.
///
/// Ranges shorter than two frames per worker run on a single worker.
pub fn effective_worker_count(range: FrameRange, requested: usize) -> usize {
    let requested = requested.max(1);
    if range.len() < 2 * requested {
        1
    } else {
        requested
    }
}

/// Split `range` into `workers` contiguous sub-ranges.
///
/// Every sub-range has `range.len() / workers` frames except the last one,
/// which also takes the remainder. The number of workers is clamped to the
/// number of frames so that no sub-range is empty.
///
/// # Example
///
/// ```
/// use rectify_pipeline::{scheduler::partition, FrameRange};
///
/// let parts = partition(FrameRange { start: 0, end: 9 }, 3);
///
/// assert_eq!(parts.len(), 3);
/// assert_eq!(parts[0], FrameRange { start: 0, end: 2 });
/// assert_eq!(parts[2], FrameRange { start: 6, end: 9 });
/// ```
pub fn partition(range: FrameRange, workers: usize) -> Vec<FrameRange> {
    let workers = workers.clamp(1, range.len());
    let width = range.len() / workers;

    (0..workers)
        .map(|i| {
            let start = range.start + i * width;
            let end = if i + 1 == workers {
                range.end
            } else {
                start + width - 1
            };
            FrameRange { start, end }
        })
        .collect()
}

/// Run `transform` over every index of `ranges`, one worker per sub-range.
///
/// Each worker visits its indices in increasing order. The first failure
/// raises a shared flag and the other workers stop before their next frame;
/// that first error is returned once every worker has joined.
///
/// Returns the elapsed wall-clock time of the batch.
pub fn run_batch<F>(ranges: &[FrameRange], transform: F) -> Result<Duration, RectifyError>
where
    F: Fn(usize) -> Result<(), RectifyError> + Send + Sync,
{
    let start_time = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len().max(1))
        .thread_name(|i| format!("rectify-worker-{i}"))
        .build()?;

    let abort = AtomicBool::new(false);
    let first_error: Mutex<Option<RectifyError>> = Mutex::new(None);

    pool.scope(|s| {
        for (worker, range) in ranges.iter().enumerate() {
            let (abort, first_error, transform) = (&abort, &first_error, &transform);
            s.spawn(move |_| {
                log::debug!("worker {worker} takes frames {}..={}", range.start, range.end);
                for index in range.indices() {
                    if abort.load(Ordering::Relaxed) {
                        log::debug!("worker {worker} stops before frame {index}");
                        return;
                    }
                    if let Err(e) = transform(index) {
                        abort.store(true, Ordering::Relaxed);
                        if let Ok(mut slot) = first_error.lock() {
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                        return;
                    }
                }
            });
        }
    });

    let first_error = first_error
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(e) = first_error {
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    let frames: usize = ranges.iter().map(FrameRange::len).sum();
    log::info!(
        "processed {frames} frames on {} workers in {elapsed:?}",
        ranges.len()
    );

    Ok(elapsed)
}

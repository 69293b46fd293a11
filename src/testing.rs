//! Conformance checks for frame workers
//!
//! [`WorkerTester`] runs frames through a worker (directly or through a
//! processor) and compares the output against a reference transform applied
//! to the decoded input.

use crate::array::NumericArray;
use crate::codec::{self, Normalize};
use crate::error::{Error, Result};
use crate::frame::VideoFrame;
use crate::processor::{Dispatch, FrameProcessor};
use crate::types::{ArrayLayout, ByteOrder};
use crate::worker::{ArrayTransform, FrameWorker, Outcome, ProcessedFrame, Worker};
use std::time::Duration;

/// Checks worker output against a reference transform
pub struct WorkerTester<R> {
    reference: R,
    byte_order: ByteOrder,
    normalize: Normalize,
    count: usize,
    max_count: usize,
}

impl<R: ArrayTransform> WorkerTester<R> {
    pub fn new(reference: R) -> Self {
        Self {
            reference,
            byte_order: ByteOrder::default(),
            normalize: Normalize::default(),
            count: 0,
            max_count: 1,
        }
    }

    /// Must match the byte order of the tested worker
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Must match the normalization of the tested worker
    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn set_max_count(&mut self, max_count: usize) {
        self.max_count = max_count;
    }

    /// True once `max_count` frames have been checked
    pub fn is_done(&self) -> bool {
        self.count >= self.max_count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Run `frame` through `worker` on the current thread and check it
    pub fn test_frame(&mut self, worker: &mut FrameWorker, frame: &VideoFrame) -> Result<()> {
        self.ensure_not_done()?;
        let expected = self.expected(frame)?;
        let mut published = None;
        worker.run_step(frame.clone(), |outcome| published = Some(outcome));
        let outcome =
            published.ok_or_else(|| Error::Internal("worker published nothing".into()))?;
        self.check(&expected, outcome)
    }

    /// Submit `frame` to `processor` and check the published output
    ///
    /// Waits for the worker to become idle first; a skipped submission is a
    /// failure.
    pub fn test_processor(
        &mut self,
        processor: &FrameProcessor,
        frame: &VideoFrame,
        timeout: Duration,
    ) -> Result<()> {
        self.ensure_not_done()?;
        let expected = self.expected(frame)?;
        if !processor.wait_idle(timeout) {
            return Err(Error::Conformance(format!("worker still busy after {timeout:?}")));
        }
        let (id, rx) = processor.output().subscribe();
        let dispatch = processor.submit(frame.clone());
        let received = match dispatch {
            Ok(Dispatch::Skipped) => Err(Error::Conformance("input was skipped".into())),
            Ok(_) => rx
                .recv_timeout(timeout)
                .map_err(|_| Error::Conformance(format!("no output within {timeout:?}"))),
            Err(e) => Err(e),
        };
        processor.output().disconnect(id);
        self.check(&expected, received?)
    }

    fn ensure_not_done(&self) -> Result<()> {
        if self.is_done() {
            return Err(Error::Lifecycle(format!(
                "tester already checked {} frames",
                self.max_count
            )));
        }
        Ok(())
    }

    fn expected(&mut self, frame: &VideoFrame) -> Result<NumericArray> {
        let (input, _) = codec::decode(frame, ArrayLayout::Rgb, self.byte_order)?;
        self.reference.process_array(input)
    }

    fn check(&mut self, expected: &NumericArray, outcome: Outcome<ProcessedFrame>) -> Result<()> {
        let processed =
            outcome.map_err(|e| Error::Conformance(format!("worker failed: {e}")))?;

        match &processed.array {
            Some(array) if array != expected => {
                return Err(Error::Conformance(format!(
                    "processed array differs from reference (shapes {:?} and {:?})",
                    array.shape(),
                    expected.shape()
                )));
            }
            Some(_) => {}
            None => {
                return Err(Error::Conformance(
                    "frame was passed through without processing".into(),
                ))
            }
        }

        if processed.frame.is_valid() && !expected.is_empty() {
            let reference_frame = codec::encode(expected, self.normalize)?;
            let (want, _) = codec::decode(&reference_frame, ArrayLayout::Rgb, self.byte_order)?;
            let (got, _) = codec::decode(&processed.frame, ArrayLayout::Rgb, self.byte_order)?;
            if got != want {
                return Err(Error::Conformance(
                    "decoded output frame differs from reference".into(),
                ));
            }
        }

        self.count += 1;
        tracing::debug!(count = self.count, max = self.max_count, "frame conforms");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{Grayscale, Invert};
    use crate::source::SyntheticSource;
    use crate::types::Resolution;

    fn frames(n: u64) -> Vec<VideoFrame> {
        let source = SyntheticSource::new(Resolution::new(8, 6), 30, n).unwrap();
        (0..n).map(|i| source.render(i)).collect()
    }

    #[test]
    fn test_matching_worker_passes() {
        let mut tester = WorkerTester::new(Invert).with_max_count(3);
        let mut worker = FrameWorker::new(Invert);
        for frame in frames(3) {
            tester.test_frame(&mut worker, &frame).unwrap();
        }
        assert!(tester.is_done());
        assert!(matches!(
            tester.test_frame(&mut worker, &frames(1)[0]),
            Err(Error::Lifecycle(_))
        ));
        tester.reset();
        assert_eq!(tester.count(), 0);
    }

    #[test]
    fn test_mismatch_is_reported() {
        let mut tester = WorkerTester::new(Invert);
        let mut worker = FrameWorker::new(Grayscale);
        let err = tester.test_frame(&mut worker, &frames(1)[0]).unwrap_err();
        assert!(matches!(err, Error::Conformance(_)));
        assert_eq!(tester.count(), 0);
    }

    #[test]
    fn test_through_processor() {
        let processor = FrameProcessor::new().unwrap();
        processor.set_worker(Some(FrameWorker::new(Grayscale))).unwrap();
        let mut tester = WorkerTester::new(Grayscale).with_max_count(2);
        for frame in frames(2) {
            tester
                .test_processor(&processor, &frame, Duration::from_secs(5))
                .unwrap();
        }
        assert_eq!(tester.count(), 2);
    }
}

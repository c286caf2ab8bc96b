use std::{sync::Arc, time::Duration};

use opencv::{core::Vector, prelude::*};
use tokio::sync::{
    oneshot::{self, error::TryRecvError},
    watch,
};

use crate::{
    app::{
        feed::{Feed, FeedState},
        session::Session,
    },
    vision::{ColourDefinition, ColourDetector, FrameSource},
};

/// Mirror, detect (when enabled) and encode a single frame.
pub struct FrameRenderer {
    detector: ColourDetector,
    colours: Vec<ColourDefinition>,
}

impl FrameRenderer {
    pub fn new(detector: ColourDetector, colours: Vec<ColourDefinition>) -> Self {
        Self { detector, colours }
    }

    pub fn render(&self, frame: &Mat, session: &Session) -> opencv::Result<Mat> {
        let mut mirrored = Mat::default();
        opencv::core::flip(frame, &mut mirrored, 1)?;

        if !session.is_active() {
            return Ok(mirrored);
        }

        let result = self.detector.process(&mirrored, &self.colours)?;
        session.record(&result.counts);
        Ok(result.annotated)
    }

    pub fn encode(frame: &Mat) -> opencv::Result<Vec<u8>> {
        let mut encoded = Vector::<u8>::new();
        opencv::imgcodecs::imencode(".jpg", frame, &mut encoded, &Vector::new())?;
        Ok(encoded.as_slice().to_vec())
    }
}

const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Read, render and publish one frame. A failed read ends the streams that are
/// currently connected; returns false in that case.
pub fn capture_once(
    source: &mut dyn FrameSource,
    renderer: &FrameRenderer,
    session: &Session,
    feed: &watch::Sender<FeedState>,
) -> bool {
    let Some(frame) = source.read_frame() else {
        let epoch = feed.borrow().epoch + 1;
        log::warn!("No frame from source, ending connected streams");
        feed.send_replace(FeedState {
            epoch,
            feed: Feed::Waiting,
        });
        return false;
    };

    match renderer
        .render(&frame, session)
        .and_then(|f| FrameRenderer::encode(&f))
    {
        Ok(jpeg) => {
            let epoch = feed.borrow().epoch;
            feed.send_replace(FeedState {
                epoch,
                feed: Feed::Frame(Arc::new(jpeg)),
            });
        }
        Err(e) => log::error!("Failed to process frame: {}", e),
    }
    true
}

/// Owns the frame source. Frames are only read while someone is watching the
/// feed; every stream is ended on shutdown.
pub fn capture_loop(
    source: &mut dyn FrameSource,
    renderer: &FrameRenderer,
    session: &Session,
    feed: &watch::Sender<FeedState>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) {
    while let Err(TryRecvError::Empty) = shutdown_rx.try_recv() {
        if feed.receiver_count() == 0 {
            std::thread::sleep(IDLE_WAIT);
            continue;
        }

        if !capture_once(source, renderer, session, feed) {
            // Give the ended clients a chance to drop before reading again
            std::thread::sleep(IDLE_WAIT);
        }
    }

    let epoch = feed.borrow().epoch;
    feed.send_replace(FeedState {
        epoch,
        feed: Feed::Ended,
    });
}

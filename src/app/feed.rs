use std::{convert::Infallible, sync::Arc};

use tokio::sync::watch;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

const BOUNDARY: &str = "frame";
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

#[derive(Clone, Debug, PartialEq)]
pub enum Feed {
    Waiting,
    Frame(Arc<Vec<u8>>),
    Ended,
}

/// Latest output of the capture thread. A failed read bumps `epoch`, which
/// ends every stream that subscribed before it; later subscribers carry on.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedState {
    pub epoch: u64,
    pub feed: Feed,
}

impl FeedState {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            feed: Feed::Waiting,
        }
    }
}

impl Default for FeedState {
    fn default() -> Self {
        FeedState::new()
    }
}

pub(crate) fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part
}

/// One multipart part per published frame, until the source fails or the
/// feed ends. A slow reader only ever sees the newest frame.
pub(crate) fn feed_stream(
    rx: watch::Receiver<FeedState>,
) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Send + 'static {
    let epoch = rx.borrow().epoch;
    WatchStream::new(rx)
        .take_while(move |state| state.epoch == epoch && state.feed != Feed::Ended)
        .filter_map(|state| match state.feed {
            Feed::Frame(jpeg) => Some(Ok(multipart_part(&jpeg))),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(epoch: u64, jpeg: &[u8]) -> FeedState {
        FeedState {
            epoch,
            feed: Feed::Frame(Arc::new(jpeg.to_vec())),
        }
    }

    #[test]
    fn part_is_framed() {
        let part = multipart_part(b"JPEG");
        assert_eq!(
            part,
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n".to_vec()
        );
    }

    #[tokio::test]
    async fn stream_ends_with_feed() {
        let (tx, rx) = watch::channel(frame(0, b"one"));
        let mut stream = Box::pin(feed_stream(rx));

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.ends_with(b"one\r\n"));

        tx.send_replace(FeedState {
            epoch: 0,
            feed: Feed::Ended,
        });
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn new_epoch_ends_only_older_streams() {
        let (tx, rx) = watch::channel(frame(0, b"one"));
        let mut older = Box::pin(feed_stream(rx));
        assert!(older.next().await.is_some());

        tx.send_replace(FeedState {
            epoch: 1,
            feed: Feed::Waiting,
        });
        assert!(older.next().await.is_none());

        let mut newer = Box::pin(feed_stream(tx.subscribe()));
        tx.send_replace(frame(1, b"two"));
        let part = newer.next().await.unwrap().unwrap();
        assert!(part.ends_with(b"two\r\n"));
    }

    #[tokio::test]
    async fn ended_feed_yields_nothing() {
        let (_tx, rx) = watch::channel(FeedState {
            epoch: 3,
            feed: Feed::Ended,
        });
        let mut stream = Box::pin(feed_stream(rx));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn waiting_is_skipped() {
        let (tx, rx) = watch::channel(FeedState::new());
        let mut stream = Box::pin(feed_stream(rx));

        tx.send_replace(frame(0, b"two"));
        let part = stream.next().await.unwrap().unwrap();
        assert!(part.ends_with(b"two\r\n"));
    }
}

//! Test utilities shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Counts `ERROR` events emitted on the current thread while the returned
/// guard is alive. Use with current-thread `#[tokio::test]`s.
pub struct ErrorEvents {
    count: Arc<AtomicUsize>,
    _guard: tracing::dispatcher::DefaultGuard,
}

impl ErrorEvents {
    pub fn capture() -> Self {
        let count = Arc::new(AtomicUsize::new(0));
        let guard = tracing_subscriber::registry()
            .with(ErrorCounter(Arc::clone(&count)))
            .set_default();
        Self { count, _guard: guard }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

struct ErrorCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

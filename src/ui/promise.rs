use egui::Id;
use std::pin::Pin;
use std::sync::Arc;
use std::task;
use std::task::{Poll, Waker};

/// Waker that schedules another egui pass when a background future makes progress.
pub struct EguiWaker(egui::Context);

impl EguiWaker {
    pub fn for_context(ctx: &egui::Context) -> Waker {
        if let Some(egui_waker) = ctx.data(|data| data.get_temp::<Arc<EguiWaker>>(Id::NULL)) {
            Waker::from(egui_waker)
        } else {
            let egui_waker = Arc::new(EguiWaker(ctx.clone()));
            ctx.data_mut(|data| {
                data.insert_temp(Id::NULL, egui_waker.clone());
            });
            Waker::from(egui_waker)
        }
    }
}

impl task::Wake for EguiWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.request_repaint();
    }
}

pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// A future polled from the UI thread, keeping its last output until taken.
pub struct Promise<F: Future> {
    waker: Waker,
    future: Option<F>,
    last_result: Option<F::Output>,
}

impl<F> Promise<F>
where
    F: Future + Unpin,
{
    pub fn new(waker: Waker) -> Self {
        Self {
            waker,
            future: None,
            last_result: None,
        }
    }

    pub fn launched(waker: Waker, future: F) -> Self {
        let mut slf = Self::new(waker);
        slf.launch(future);
        slf
    }

    /// Replaces any in-flight future. The previous one is dropped, which cancels a
    /// `blocking::Task`.
    pub fn launch(&mut self, future: F) {
        self.future = Some(future);
        self.last_result = None;
    }

    pub fn is_pending(&self) -> bool {
        self.future.is_some()
    }

    fn poll_future(&mut self) {
        if let Some(future) = &mut self.future {
            let mut cx = task::Context::from_waker(&self.waker);
            if let Poll::Ready(res) = Pin::new(future).poll(&mut cx) {
                self.future = None;
                self.last_result = Some(res);
            }
        }
    }

    pub fn take_response(&mut self) -> Option<F::Output> {
        self.poll_future();
        self.last_result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    #[test]
    fn ready_future_resolves_on_first_poll() {
        let mut promise = Promise::launched(Waker::noop().clone(), future::ready(5));
        assert!(promise.is_pending());
        assert_eq!(promise.take_response(), Some(5));
        assert!(!promise.is_pending());
        assert_eq!(promise.take_response(), None);
    }

    #[test]
    fn pending_future_stays_pending() {
        let mut promise: Promise<LocalBoxFuture<u8>> = Promise::new(Waker::noop().clone());
        assert!(!promise.is_pending());
        promise.launch(Box::pin(future::pending()));
        assert_eq!(promise.take_response(), None);
        assert!(promise.is_pending());
    }

    #[test]
    fn launch_clears_stale_result() {
        let mut promise: Promise<LocalBoxFuture<u8>> = Promise::new(Waker::noop().clone());
        promise.launch(Box::pin(future::ready(1)));
        promise.poll_future();
        promise.launch(Box::pin(future::pending()));
        assert_eq!(promise.take_response(), None);
    }
}

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Replies to requests whose URL contains a registered fragment, recording every request.
#[derive(Debug, Default)]
pub(crate) struct ScriptedHttpClient {
    routes: Mutex<Vec<(String, VecDeque<Result<HttpResponse, HttpError>>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a reply; the last reply for a fragment repeats once the queue drains.
    pub(crate) fn on(self, url_fragment: &str, status: u16, body: &str) -> Self {
        self.push(url_fragment, Ok(HttpResponse::new(status, body)));
        self
    }

    pub(crate) fn failing(self, url_fragment: &str, message: &str) -> Self {
        self.push(url_fragment, Err(HttpError::new(message)));
        self
    }

    fn push(&self, url_fragment: &str, reply: Result<HttpResponse, HttpError>) {
        let mut routes = self.routes.lock().expect("routes lock");
        match routes.iter_mut().find(|(fragment, _)| fragment == url_fragment) {
            Some((_, replies)) => replies.push_back(reply),
            None => routes.push((url_fragment.to_owned(), VecDeque::from([reply]))),
        }
    }

    pub(crate) fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn count_matching(&self, url_fragment: &str) -> usize {
        self.recorded_requests()
            .iter()
            .filter(|request| request.url.contains(url_fragment))
            .count()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = {
            let mut routes = self.routes.lock().expect("routes lock");
            routes
                .iter_mut()
                .find(|(fragment, _)| request.url.contains(fragment.as_str()))
                .map(|(_, replies)| {
                    if replies.len() > 1 {
                        replies.pop_front().expect("non-empty queue")
                    } else {
                        replies.front().cloned().expect("non-empty queue")
                    }
                })
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "{}")))
        };
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { reply })
    }
}

pub(crate) fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_RAW_WAKER_VTABLE)
}

unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop_raw_waker_wake(_: *const ()) {}

unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

unsafe fn noop_raw_waker_drop(_: *const ()) {}

static NOOP_RAW_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    noop_raw_waker_clone,
    noop_raw_waker_wake,
    noop_raw_waker_wake_by_ref,
    noop_raw_waker_drop,
);

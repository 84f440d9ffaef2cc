use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::filter::AppliedFilters;
use crate::parse::SourceFormat;
use crate::session::{Session, ViewPage};

type Reply = oneshot::Sender<Result<ViewPage>>;

enum EngineRequest {
    Load {
        content: String,
        format: SourceFormat,
        selector: String,
        reply: Reply,
    },
    Refine {
        filters: AppliedFilters,
        reply: Reply,
    },
    Page {
        page: usize,
        reply: Reply,
    },
}

/// Handle to a data-view engine running on its own worker thread.
///
/// The worker owns the session state exclusively; callers communicate
/// only through these request methods. Requests are processed to
/// completion in arrival order, so for any one caller the responses
/// come back in request order and each reflects the state as of when
/// its request started executing. A caller that has issued a newer
/// request simply disregards the stale in-flight response; the engine
/// has no cancellation protocol.
///
/// The worker exits once every handle has been dropped.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineRequest>,
}

impl EngineHandle {
    pub fn spawn(page_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || run_worker(rx, page_size));
        Self { tx }
    }

    /// Parses `content` and replaces the session wholesale. Returns
    /// page 1 of the fresh view with the field analysis attached.
    pub async fn load(
        &self,
        content: String,
        format: SourceFormat,
        selector: String,
    ) -> Result<ViewPage> {
        self.request(|reply| EngineRequest::Load {
            content,
            format,
            selector,
            reply,
        })
        .await
    }

    /// Recomputes the filtered view from the raw collection and the
    /// complete filter set, and returns page 1.
    pub async fn refine(&self, filters: AppliedFilters) -> Result<ViewPage> {
        self.request(|reply| EngineRequest::Refine { filters, reply })
            .await
    }

    /// Returns slice `page` of the current filtered view.
    pub async fn page(&self, page: usize) -> Result<ViewPage> {
        self.request(|reply| EngineRequest::Page { page, reply }).await
    }

    async fn request<F>(&self, build: F) -> Result<ViewPage>
    where
        F: FnOnce(Reply) -> EngineRequest,
    {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| EngineError::WorkerStopped)?;
        response.await.map_err(|_| EngineError::WorkerStopped)?
    }
}

fn run_worker(mut rx: mpsc::UnboundedReceiver<EngineRequest>, page_size: usize) {
    let mut session = Session::new(page_size);
    while let Some(request) = rx.blocking_recv() {
        // A closed reply channel means the caller gave up on this
        // response; the state change (if any) still happened.
        match request {
            EngineRequest::Load {
                content,
                format,
                selector,
                reply,
            } => {
                debug!(%format, selector, "engine load");
                let _ = reply.send(session.load(&content, format, &selector));
            }
            EngineRequest::Refine { filters, reply } => {
                debug!("engine refine");
                let _ = reply.send(session.refine(&filters));
            }
            EngineRequest::Page { page, reply } => {
                debug!(page, "engine page");
                let _ = reply.send(session.page(page));
            }
        }
    }
}

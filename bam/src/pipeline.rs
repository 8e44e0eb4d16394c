use core::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::{
    cfg::Config,
    headers::Credential,
    source::{SourceError, UrlSource, URL_QUEUE_CAPACITY},
};

/// Capacity of the output request queue drained by the engine.
pub const REQUEST_QUEUE_CAPACITY: usize = 1000;

/// A ready-to-send request description.
///
/// Constructed fresh per item; the header set is the one frozen at
/// startup, shared by reference with every other request.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub method: Method,
    pub url: Uri,
    pub headers: Arc<HeaderMap>,
    pub credential: Option<Credential>,
}

/// The per-run template a [`RequestDescription`] is stamped from.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    headers: Arc<HeaderMap>,
    credential: Option<Credential>,
}

impl RequestTemplate {
    pub fn new(method: Method, headers: Arc<HeaderMap>, credential: Option<Credential>) -> Self {
        Self { method, headers, credential }
    }

    /// Combines the template with a URL into a request description.
    pub fn build(&self, url: &str) -> Result<RequestDescription, SourceError> {
        let parsed = url.parse::<Uri>().map_err(|reason| SourceError::InvalidUrl {
            url: url.to_string(),
            reason,
        })?;

        let m = RequestDescription {
            method: self.method.clone(),
            url: parsed,
            headers: self.headers.clone(),
            credential: self.credential.clone(),
        };

        Ok(m)
    }
}

/// Progress counters shared between the producers and the debug endpoint.
#[derive(Debug, Default)]
pub struct PipelineStat {
    urls_read: AtomicU64,
    requests_built: AtomicU64,
}

impl PipelineStat {
    #[inline]
    pub fn on_url(&self) {
        self.urls_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn on_request(&self) {
        self.requests_built.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn urls_read(&self) -> u64 {
        self.urls_read.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn requests_built(&self) -> u64 {
        self.requests_built.load(Ordering::Relaxed)
    }
}

/// Everything the engine consumes: the bounded request queue plus the
/// resolved run configuration.
#[derive(Debug)]
pub struct Handoff {
    pub requests: Receiver<RequestDescription>,
    pub cfg: Arc<Config>,
}

/// Spawns the perpetual request producers and returns the output queue.
///
/// A fixed source builds requests directly; a file source runs two stages,
/// file reader → URL queue → builder → output queue. Each stage has a
/// single producer and a single FIFO queue, so file order is preserved end
/// to end. Producers run until the returned receiver is dropped; the first
/// bad item stops production and is reported on `errors`.
pub fn spawn(
    source: UrlSource,
    template: RequestTemplate,
    stat: Arc<PipelineStat>,
    errors: Sender<SourceError>,
) -> Receiver<RequestDescription> {
    let (req_tx, req_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);

    match source {
        UrlSource::Fixed(url) => {
            tokio::spawn(report(errors, produce_fixed(url, template, stat, req_tx)));
        }
        UrlSource::File(file) => {
            let (url_tx, url_rx) = mpsc::channel(URL_QUEUE_CAPACITY);

            tokio::spawn(report(errors.clone(), file.run(url_tx)));
            tokio::spawn(report(errors, produce_from_queue(url_rx, template, stat, req_tx)));
        }
    }

    req_rx
}

/// Forwards a producer's terminal error, if any, to the error channel.
async fn report<F>(errors: Sender<SourceError>, fut: F)
where
    F: Future<Output = Result<(), SourceError>>,
{
    if let Err(err) = fut.await {
        let _ = errors.send(err).await;
    }
}

async fn produce_fixed(
    url: String,
    template: RequestTemplate,
    stat: Arc<PipelineStat>,
    tx: Sender<RequestDescription>,
) -> Result<(), SourceError> {
    loop {
        let req = template.build(&url)?;
        if tx.send(req).await.is_err() {
            return Ok(());
        }
        stat.on_request();
    }
}

async fn produce_from_queue(
    mut urls: Receiver<String>,
    template: RequestTemplate,
    stat: Arc<PipelineStat>,
    tx: Sender<RequestDescription>,
) -> Result<(), SourceError> {
    while let Some(url) = urls.recv().await {
        stat.on_url();

        let req = template.build(&url)?;
        if tx.send(req).await.is_err() {
            break;
        }
        stat.on_request();
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use http::header;

    use super::*;
    use crate::headers;

    fn template(method: Method) -> RequestTemplate {
        let headers = headers::assemble("text/html", "", None, None, chrono::Local::now()).unwrap();

        RequestTemplate::new(method, headers, None)
    }

    #[tokio::test]
    async fn test_fixed_source_shares_the_header_set() {
        let (err_tx, _err_rx) = mpsc::channel(1);
        let stat = Arc::new(PipelineStat::default());
        let mut rx = spawn(
            UrlSource::Fixed("http://x/y".into()),
            template(Method::POST),
            stat.clone(),
            err_tx,
        );

        let first = rx.recv().await.unwrap();
        for _ in 0..4 {
            let req = rx.recv().await.unwrap();

            assert_eq!(req.method, Method::POST);
            assert_eq!(req.url, "http://x/y".parse::<Uri>().unwrap());
            assert!(Arc::ptr_eq(&req.headers, &first.headers));
        }

        // The counter for send N is bumped before send N+1 starts, so five
        // received items guarantee at least four recorded builds.
        assert!(stat.requests_built() >= 4);
    }

    #[tokio::test]
    async fn test_file_source_preserves_order_across_stages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"http://x/1\nhttp://x/2\nhttp://x/3\n").unwrap();
        let source = UrlSource::from_target(&crate::cfg::Target::File(file.path().into()))
            .await
            .unwrap();

        let (err_tx, _err_rx) = mpsc::channel(1);
        let mut rx = spawn(source, template(Method::GET), Arc::new(PipelineStat::default()), err_tx);

        for pass in 0..2 {
            for path in ["/1", "/2", "/3"] {
                let req = rx.recv().await.unwrap();
                assert_eq!(req.url.path(), path, "pass {pass}");
            }
        }
    }

    #[tokio::test]
    async fn test_bad_file_line_is_reported_and_terminal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"http://x/ok\nnot a url\nhttp://x/never\n").unwrap();
        let source = UrlSource::from_target(&crate::cfg::Target::File(file.path().into()))
            .await
            .unwrap();

        let (err_tx, mut err_rx) = mpsc::channel(1);
        let mut rx = spawn(source, template(Method::GET), Arc::new(PipelineStat::default()), err_tx);

        assert_eq!(rx.recv().await.unwrap().url.path(), "/ok");

        let err = err_rx.recv().await.unwrap();
        assert!(matches!(err, SourceError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_bad_fixed_url_is_reported() {
        let (err_tx, mut err_rx) = mpsc::channel(1);
        let _rx = spawn(
            UrlSource::Fixed("not a url".into()),
            template(Method::GET),
            Arc::new(PipelineStat::default()),
            err_tx,
        );

        assert!(matches!(err_rx.recv().await.unwrap(), SourceError::InvalidUrl { .. }));
    }

    #[test]
    fn test_description_keeps_credential() {
        let headers = headers::assemble("text/html", "", None, None, chrono::Local::now()).unwrap();
        let cred = headers::parse_credential("alice:secret").unwrap();
        let template = RequestTemplate::new(Method::GET, headers, Some(cred.clone()));

        let req = template.build("http://x/y").unwrap();

        assert_eq!(req.credential, Some(cred));
        assert!(req.headers.contains_key(header::CONTENT_TYPE));
    }
}

//! Boundary to the benchmarking engine.
//!
//! Request execution, per-request timing, QPS throttling and reporting
//! live behind the [`Handoff`] contract and are not part of this crate.
//! The consumer here honors only the resolved stop criterion, which is
//! enough to terminate a run and to drive the producers end to end.

use core::{future, time::Duration};

use crate::pipeline::Handoff;

/// Drains the request queue until the stop criterion is met.
///
/// Returns the number of requests consumed. Dropping the receiver on
/// return is what stops the background producers.
pub async fn run(handoff: Handoff) -> u64 {
    let limit = handoff.cfg.stop.request_limit();
    let deadline = handoff.cfg.stop.time_limit();

    let mut requests = handoff.requests;
    let mut done = 0u64;

    let timeout = async {
        if deadline == Duration::MAX {
            future::pending::<()>().await
        } else {
            tokio::time::sleep(deadline).await
        }
    };
    tokio::pin!(timeout);

    while done < limit {
        tokio::select! {
            req = requests.recv() => match req {
                Some(req) => {
                    done += 1;
                    drop(req);
                }
                None => break,
            },
            _ = &mut timeout => break,
        }
    }

    done
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use clap::Parser;
    use http::Method;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        cfg::Config,
        cmd::Cmd,
        headers,
        pipeline::{self, PipelineStat, RequestTemplate},
        source::UrlSource,
    };

    fn config(args: &[&str]) -> Arc<Config> {
        Arc::new(Cmd::try_parse_from(args).unwrap().try_into().unwrap())
    }

    #[tokio::test]
    async fn test_count_mode_drains_exactly_n() {
        let cfg = config(&["bam", "-n", "5", "http://x/y"]);
        let headers = headers::assemble("text/html", "", None, None, chrono::Local::now()).unwrap();
        let template = RequestTemplate::new(Method::GET, headers, None);

        let (err_tx, _err_rx) = mpsc::channel(1);
        let requests = pipeline::spawn(
            UrlSource::Fixed("http://x/y".into()),
            template,
            Arc::new(PipelineStat::default()),
            err_tx,
        );

        let done = run(Handoff { requests, cfg }).await;

        assert_eq!(done, 5);
    }

    #[tokio::test]
    async fn test_duration_mode_stops_at_the_deadline() {
        let cfg = config(&["bam", "-t", "1", "http://x/y"]);

        // No producer: the drain blocks on an open, empty queue until the
        // time budget elapses.
        let (_tx, requests) = mpsc::channel(1);

        tokio::time::pause();
        let done = run(Handoff { requests, cfg }).await;

        assert_eq!(done, 0);
    }
}

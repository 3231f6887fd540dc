//! Platform timers: `gloo-timers` in the browser, `tokio::time` natively.

use std::future::Future;
use std::time::Duration;

use futures::future::{select, Either};

pub async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// Run `fut` for at most `duration`; `None` if the timer won.
pub async fn timeout<F: Future>(duration: Duration, fut: F) -> Option<F::Output> {
    let fut = std::pin::pin!(fut);
    let timer = std::pin::pin!(sleep(duration));
    match select(fut, timer).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}

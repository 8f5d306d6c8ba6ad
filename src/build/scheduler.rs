//! Host scheduling primitives.
//!
//! A build asks its [`Scheduler`] to yield once per chunk. Any primitive with
//! "defer and resume" semantics fits:
//! - [`CooperativeScheduler`]: hands control back to the executor polling
//!   the build, then resumes on the next poll
//! - [`IdleCallbackScheduler`]: resumes from the browser's
//!   `requestIdleCallback`, or `setTimeout(…, 0)` where that is missing

use std::future::{Future, poll_fn};
use std::task::Poll;

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// The host's "run this later" capability.
pub trait Scheduler {
    /// Suspend the caller until the host decides to resume it.
    fn yield_now(&mut self) -> impl Future<Output = ()>;
}

/// Yields to whatever executor is driving the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperativeScheduler;

impl Scheduler for CooperativeScheduler {
    fn yield_now(&mut self) -> impl Future<Output = ()> {
        let mut yielded = false;
        poll_fn(move |cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
    }
}

/// Yields to the JavaScript event loop until the browser is idle.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleCallbackScheduler;

impl IdleCallbackScheduler {
    fn deferred() -> Promise {
        Promise::new(&mut |resolve, _reject| {
            let global = js_sys::global();
            if let Err(err) = schedule(&global, &resolve) {
                crate::console_warn!("Failed to defer build chunk: {:?}", err);
                // Resolve now rather than stall the build forever.
                if let Err(err) = resolve.call0(&JsValue::UNDEFINED) {
                    crate::console_warn!("Failed to resume build chunk: {:?}", err);
                }
            }
        })
    }
}

fn schedule(global: &JsValue, resolve: &Function) -> Result<(), JsValue> {
    let idle = Reflect::get(global, &JsValue::from_str("requestIdleCallback"))?;
    if let Some(idle) = idle.dyn_ref::<Function>() {
        idle.call1(global, resolve)?;
        return Ok(());
    }

    let timeout = Reflect::get(global, &JsValue::from_str("setTimeout"))?
        .dyn_into::<Function>()?;
    timeout.call2(global, resolve, &JsValue::from_f64(0.0))?;
    Ok(())
}

impl Scheduler for IdleCallbackScheduler {
    fn yield_now(&mut self) -> impl Future<Output = ()> {
        let promise = Self::deferred();
        async move {
            if let Err(err) = JsFuture::from(promise).await {
                crate::console_warn!("Deferred build chunk rejected: {:?}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_cooperative_yield_is_pending_once() {
        let mut scheduler = CooperativeScheduler;
        let mut fut = Box::pin(scheduler.yield_now());

        assert!(fut.as_mut().now_or_never().is_none());
        assert!(fut.as_mut().now_or_never().is_some());
    }

    #[test]
    fn test_cooperative_yield_completes_under_executor() {
        let mut scheduler = CooperativeScheduler;
        futures::executor::block_on(async {
            scheduler.yield_now().await;
            scheduler.yield_now().await;
        });
    }
}

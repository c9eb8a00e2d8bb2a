//! Handler invocation with bounded retries.

use std::{thread, time::Duration};

use prospect_types::HandlerError;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::ExecutionContext;

use super::registry::{ActionHandler, Parameters};

/// Result of invoking a handler, with the number of attempts spent.
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) outcome: Result<Value, HandlerError>,
    pub(crate) attempts: u32,
}

/// Invokes `handler` until it succeeds, fails permanently, or `max_attempts`
/// invocations have been made.
///
/// Only [`HandlerError::Transient`] failures are retried. The executor sleeps
/// for `backoff` between attempts; a zero backoff retries immediately.
pub(crate) fn invoke_with_retry(
    step: &str,
    handler: &dyn ActionHandler,
    parameters: &Parameters,
    context: &ExecutionContext,
    max_attempts: u32,
    backoff: Duration,
) -> Invocation {
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        debug!(step = %step, attempt = attempts, "invoking handler");
        match handler.invoke(parameters, context) {
            Ok(value) => {
                return Invocation {
                    outcome: Ok(value),
                    attempts,
                };
            }
            Err(error) if error.is_retryable() && attempts < max_attempts => {
                warn!(step = %step, attempt = attempts, max_attempts, error = %error, "transient handler failure; retrying");
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
            }
            Err(error) => {
                return Invocation {
                    outcome: Err(error),
                    attempts,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails transiently for the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl ActionHandler for Flaky {
        fn invoke(&self, _parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(HandlerError::transient(format!("timeout #{call}")))
            } else {
                Ok(json!(call))
            }
        }
    }

    fn flaky(failures: u32) -> Flaky {
        Flaky {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    #[test]
    fn succeeds_on_last_allowed_attempt() {
        let handler = flaky(2);
        let invocation = invoke_with_retry("s", &handler, &Parameters::new(), &ExecutionContext::default(), 3, Duration::ZERO);
        assert_eq!(invocation.outcome, Ok(json!(3)));
        assert_eq!(invocation.attempts, 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let handler = flaky(3);
        let invocation = invoke_with_retry("s", &handler, &Parameters::new(), &ExecutionContext::default(), 3, Duration::ZERO);
        assert_eq!(invocation.outcome, Err(HandlerError::transient("timeout #3")));
        assert_eq!(invocation.attempts, 3);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let handler = |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> { Err(HandlerError::permanent("bad input")) };
        let invocation = invoke_with_retry("s", &handler, &Parameters::new(), &ExecutionContext::default(), 5, Duration::ZERO);
        assert_eq!(invocation.attempts, 1);
        assert!(invocation.outcome.is_err());
    }

    #[test]
    fn zero_max_attempts_still_invokes_once() {
        let handler = flaky(0);
        let invocation = invoke_with_retry("s", &handler, &Parameters::new(), &ExecutionContext::default(), 0, Duration::ZERO);
        assert_eq!(invocation.attempts, 1);
    }
}

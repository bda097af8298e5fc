//! Endless reconnection with a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;
use crate::observe::{Observation, Observer};
use crate::session::SessionRunner;

/// Runs sessions back to back until one fails fatally.
///
/// Connection-class failures (see [`ChatError::is_connection_class`]) are
/// reported to the observer and retried after `delay`, with no attempt
/// limit. Any other failure is returned unchanged. A session that ends
/// with `Ok(())` ends the loop as well.
pub async fn run_forever<S>(
    session: &mut S,
    delay: Duration,
    observer: &Arc<dyn Observer>,
) -> Result<(), ChatError>
where
    S: SessionRunner + ?Sized,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match session.run_session().await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_connection_class() => {
                observer.record(&Observation::Reconnecting {
                    attempt,
                    delay,
                    reason: e.to_string(),
                });
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(attempt, "giving up: {}", e);
                return Err(e);
            }
        }
    }
}

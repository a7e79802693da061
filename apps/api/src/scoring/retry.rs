use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Runs `op` up to `attempts` times (at least once), returning the first `Ok`.
/// When every attempt fails, the error from the final attempt is returned.
/// The closure receives the 1-based attempt number.
pub async fn retry_bounded<T, E, F, Fut>(attempts: u32, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!("Attempt {attempt}/{attempts} failed, retrying: {e}");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

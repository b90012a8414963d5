use std::time::Duration;

use serde_json::Value;

const FETCH_RETRIES: usize = 3;
const RETRY_BACKOFF_MS: u64 = 250;

/// GET a JSON document, retrying with linear backoff.
pub(super) fn fetch_raw(url: &str, timeout: Duration) -> Option<Value> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    for attempt in 0..FETCH_RETRIES {
        match agent.get(url).call() {
            Ok(response) => {
                let mut body = response.into_body();
                match serde_json::from_reader(body.as_reader()) {
                    Ok(parsed) => return Some(parsed),
                    Err(e) => log::warn!("Commission table at {} is not JSON: {}", url, e),
                }
            }
            Err(e) => log::debug!("Commission fetch attempt {} failed: {}", attempt + 1, e),
        }

        if attempt + 1 < FETCH_RETRIES {
            std::thread::sleep(Duration::from_millis(
                RETRY_BACKOFF_MS * (attempt as u64 + 1),
            ));
        }
    }

    None
}

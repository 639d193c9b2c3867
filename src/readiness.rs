// Wait for the web container to answer HTTP before handing it to a scenario

use crate::clock::{Clock, Deadline};
use crate::errors::{HarnessError, Result};
use reqwest::blocking::Client;
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub trait ReadinessProbe {
    fn is_ready(&self, url: &str) -> bool;
}

/// Ready once the server answers with anything below 500
pub struct HttpProbe {
    http: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(2)).build()?;
        Ok(Self { http })
    }
}

impl ReadinessProbe for HttpProbe {
    fn is_ready(&self, url: &str) -> bool {
        match self.http.get(url).send() {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::trace!(url, error = %e, "not ready yet");
                false
            }
        }
    }
}

/// Poll `url` until the probe succeeds or `timeout` elapses
pub fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    clock: &dyn Clock,
    url: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Deadline::new(clock, timeout);
    tracing::info!(url, timeout_secs = timeout.as_secs(), "Waiting for web application");

    loop {
        if probe.is_ready(url) {
            tracing::info!(
                url,
                waited_ms = deadline.elapsed(clock).as_millis() as u64,
                "Web application ready"
            );
            return Ok(());
        }

        if deadline.is_expired(clock) {
            return Err(HarnessError::ReadinessTimeout {
                url: url.to_string(),
                waited_secs: deadline.elapsed(clock).as_secs(),
            });
        }

        clock.sleep(POLL_INTERVAL.min(deadline.remaining(clock)));
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CountingProbe;
    use super::*;
    use crate::clock::test_support::FakeClock;

    #[test]
    fn test_ready_immediately() {
        let clock = FakeClock::new();
        let probe = CountingProbe::new(0);
        wait_until_ready(&probe, &clock, "http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(probe.attempts.get(), 1);
    }

    #[test]
    fn test_ready_after_retries() {
        let clock = FakeClock::new();
        let probe = CountingProbe::new(3);
        wait_until_ready(&probe, &clock, "http://localhost:8080/", Duration::from_secs(30)).unwrap();
        assert_eq!(probe.attempts.get(), 4);
    }

    #[test]
    fn test_timeout() {
        let clock = FakeClock::new();
        let probe = CountingProbe::never();
        let result = wait_until_ready(&probe, &clock, "http://localhost:8080/", Duration::from_secs(3));

        match result {
            Err(HarnessError::ReadinessTimeout { url, waited_secs }) => {
                assert_eq!(url, "http://localhost:8080/");
                assert_eq!(waited_secs, 3);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // t=0,1,2,3
        assert_eq!(probe.attempts.get(), 4);
    }
}

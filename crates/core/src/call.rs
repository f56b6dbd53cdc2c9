use anyhow::Context;
use std::future::Future;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ATTEMPTS: u32 = 1;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Deadline and retry budget applied to every external call.
///
/// A single attempt is the default; retries only happen when an operator raises
/// `AWS_CALL_ATTEMPTS`.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF,
        }
    }
}

impl CallPolicy {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("AWS_CALL_TIMEOUT_SECS") {
            let secs = s
                .trim()
                .parse::<u64>()
                .with_context(|| format!("AWS_CALL_TIMEOUT_SECS is not an integer: {s}"))?;
            anyhow::ensure!(secs >= 1, "AWS_CALL_TIMEOUT_SECS must be >= 1");
            out.timeout = Duration::from_secs(secs);
        }

        if let Ok(s) = std::env::var("AWS_CALL_ATTEMPTS") {
            let attempts = s
                .trim()
                .parse::<u32>()
                .with_context(|| format!("AWS_CALL_ATTEMPTS is not an integer: {s}"))?;
            anyhow::ensure!(attempts >= 1, "AWS_CALL_ATTEMPTS must be >= 1");
            out.max_attempts = attempts;
        }

        Ok(out)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }

    /// Runs `op` under the deadline, retrying failures and timeouts until the attempt budget
    /// is spent. The last error is returned.
    pub async fn run<T, F, Fut>(&self, name: &'static str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = match tokio::time::timeout(self.timeout, op()).await {
                Ok(res) => res,
                Err(_) => Err(anyhow::anyhow!(
                    "{name} timed out after {}s",
                    self.timeout.as_secs_f64()
                )),
            };

            match res {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let backoff = self.backoff(attempt);
                    tracing::warn!(call = name, attempt, ?backoff, error = %err, "external call failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(200),
            max_attempts,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let calls = AtomicU32::new(0);
        let res: anyhow::Result<()> = CallPolicy {
            backoff_base: Duration::from_millis(1),
            ..CallPolicy::default()
        }
        .run("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("boom")
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let res = fast_policy(3)
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                anyhow::ensure!(n >= 3, "attempt {n} failed");
                Ok(n)
            })
            .await
            .unwrap();

        assert_eq!(res, 3);
    }

    #[tokio::test]
    async fn deadline_turns_hang_into_error() {
        let res: anyhow::Result<()> = fast_policy(1)
            .run("slow_call", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        let msg = format!("{:#}", res.unwrap_err());
        assert!(msg.contains("slow_call timed out"), "{msg}");
    }

    #[test]
    fn backoff_doubles() {
        let p = CallPolicy {
            backoff_base: Duration::from_millis(100),
            ..CallPolicy::default()
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
    }
}

use std::{future::Future, str::FromStr, time::Duration};

use log::debug;

use crate::errors::DecodeError;

/// Parses an integer the chain transmits as a decimal string.
pub fn parse_int<T>(field: &str, value: &str) -> Result<T, DecodeError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|source| DecodeError::InvalidInteger {
            field: field.to_string(),
            value: value.to_string(),
            source,
        })
}

pub fn parse_float(field: &str, value: &str) -> Result<f64, DecodeError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|source| DecodeError::InvalidFloat {
            field: field.to_string(),
            value: value.to_string(),
            source,
        })
}

pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(e);
                }
                let delay = base_delay * attempts;
                debug!(
                    "Operation {} failed on attempt {}/{}: {}. Retrying after {:?}...",
                    label, attempts, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn parses_numeric_strings() {
        assert_eq!(parse_int::<u64>("amount", "1500000").unwrap(), 1_500_000);
        assert_eq!(parse_int::<u8>("evidence_type", " 1 ").unwrap(), 1);
        assert!((parse_float("multiplier", "8461").unwrap() - 8461.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        let err = parse_int::<u64>("amount", "ten").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInteger { ref field, .. } if field == "amount"));
        assert!(parse_int::<u64>("amount", "").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            },
            "flaky",
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down")
            },
            "always_down",
            2,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

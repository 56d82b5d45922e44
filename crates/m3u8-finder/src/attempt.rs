//! Ordered best-effort attempt chains.
//!
//! Profile fallback, manifest probing and play-button clicks all follow the
//! same shape: walk an ordered list, try each entry, record what failed, and
//! either stop at the first success or keep going. These combinators hold
//! that policy so it can be tested without any I/O.

use std::future::Future;

/// Outcome of [`first_success`].
#[derive(Debug)]
pub struct Attempts<K, T, E> {
    /// The first key that succeeded and its value.
    pub success: Option<(K, T)>,
    /// Every failure seen before the success (or all of them), in order.
    pub failures: Vec<(K, E)>,
}

impl<K, T, E> Attempts<K, T, E> {
    /// Number of attempts that were actually made.
    pub fn tried(&self) -> usize {
        self.failures.len() + usize::from(self.success.is_some())
    }

    /// The successful value, or the last error when everything failed.
    ///
    /// Returns `Err(None)` when there was nothing to try.
    pub fn into_result(mut self) -> Result<T, Option<E>> {
        match self.success {
            Some((_, value)) => Ok(value),
            None => Err(self.failures.pop().map(|(_, e)| e)),
        }
    }
}

/// Try each key in order and stop at the first `Ok`.
pub async fn first_success<K, T, E, I, F, Fut>(keys: I, mut attempt: F) -> Attempts<K, T, E>
where
    I: IntoIterator<Item = K>,
    K: Clone,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for key in keys {
        match attempt(key.clone()).await {
            Ok(value) => {
                return Attempts {
                    success: Some((key, value)),
                    failures,
                }
            }
            Err(e) => failures.push((key, e)),
        }
    }
    Attempts {
        success: None,
        failures,
    }
}

/// Try every key in order regardless of individual failures.
pub async fn attempt_all<K, T, E, I, F, Fut>(keys: I, mut attempt: F) -> Vec<(K, Result<T, E>)>
where
    I: IntoIterator<Item = K>,
    K: Clone,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut outcomes = Vec::new();
    for key in keys {
        let outcome = attempt(key.clone()).await;
        outcomes.push((key, outcome));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_first_success_stops_early() {
        let calls = RefCell::new(Vec::new());
        let result = first_success([1, 2, 3, 4], |n| {
            calls.borrow_mut().push(n);
            async move {
                if n >= 2 {
                    Ok(n * 10)
                } else {
                    Err(format!("no {n}"))
                }
            }
        })
        .await;

        assert_eq!(*calls.borrow(), vec![1, 2]);
        assert_eq!(result.tried(), 2);
        assert_eq!(result.failures, vec![(1, "no 1".to_string())]);
        assert_eq!(result.success, Some((2, 20)));
        assert_eq!(result.into_result(), Ok(20));
    }

    #[tokio::test]
    async fn test_first_success_returns_last_error() {
        let result = first_success(["a", "b"], |k| async move { Err::<(), _>(k.len() + 10) }).await;
        assert!(result.success.is_none());
        assert_eq!(result.tried(), 2);
        assert_eq!(result.into_result(), Err(Some(11)));
    }

    #[tokio::test]
    async fn test_first_success_empty() {
        let keys: Vec<u8> = Vec::new();
        let result = first_success(keys, |_| async { Ok::<_, ()>(()) }).await;
        assert_eq!(result.tried(), 0);
        assert_eq!(result.into_result(), Err(None));
    }

    #[tokio::test]
    async fn test_attempt_all_runs_everything() {
        let outcomes = attempt_all(["video", "[autoplay]", "button"], |sel| async move {
            if sel == "[autoplay]" {
                Ok(())
            } else {
                Err("no match")
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], ("video", Err("no match")));
        assert_eq!(outcomes[1], ("[autoplay]", Ok(())));
        assert_eq!(outcomes[2], ("button", Err("no match")));
    }
}

//! Interrupt Flag
//!
//! A cloneable, level-triggered "please stop waiting" signal. It plays the
//! role of a thread's interrupted status for code that awaits instead of
//! blocking: raising it wakes every waiter, and a waiter that gives up
//! because of it clears it with [`Interrupt::take`].

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: Arc<watch::Sender<bool>>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Raises the flag and wakes every waiter.
    pub fn raise(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.flag.borrow()
    }

    /// Clears the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.flag.send_replace(false)
    }

    /// Completes once the flag is raised.
    pub async fn raised(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns when raised
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_raise_and_take() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_raised());

        interrupt.raise();
        assert!(interrupt.is_raised());

        assert!(interrupt.take());
        assert!(!interrupt.is_raised());
        assert!(!interrupt.take());
    }

    #[test]
    fn test_clones_share_state() {
        let interrupt = Interrupt::new();
        let other = interrupt.clone();
        other.raise();
        assert!(interrupt.is_raised());
    }

    #[tokio::test]
    async fn test_raised_wakes_waiter() {
        let interrupt = Interrupt::new();
        let waiter = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move { interrupt.raised().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        interrupt.raise();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_raised_returns_immediately_when_already_raised() {
        let interrupt = Interrupt::new();
        interrupt.raise();
        tokio::time::timeout(Duration::from_millis(100), interrupt.raised())
            .await
            .unwrap();
    }
}

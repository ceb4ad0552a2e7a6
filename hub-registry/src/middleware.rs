/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Per-route middleware: a per-peer cooldown gate fused with an ordered
//! validation chain.
//!
//! The dual role is deliberate: cooldown state and validation share one log
//! table keyed by peer, so a flooding peer is throttled before any validator
//! runs. Rejections are silent toward the caller — a rejected call simply
//! never reaches the route's handler, and validator errors go to the
//! structured log instead of propagating.

use crate::observability::events;
use crate::transport::PeerId;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "middleware";

/// Error returned by a validator to abort the remaining chain.
pub type ValidatorError = Box<dyn Error + Send + Sync>;

type Validator = Box<dyn Fn(PeerId, &[Value]) -> Result<(), ValidatorError> + Send + Sync>;

pub struct Middleware {
    cooldown: Duration,
    validators: Vec<Validator>,
    last_use: Mutex<HashMap<PeerId, Instant>>,
}

impl Middleware {
    /// Creates a middleware with the given cooldown and no validators.
    /// The cooldown is immutable after construction.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            validators: Vec::new(),
            last_use: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a validator; validators run in registration order.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(PeerId, &[Value]) -> Result<(), ValidatorError> + Send + Sync + 'static,
    {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub(crate) fn cooldown_secs(&self) -> f64 {
        self.cooldown.as_secs_f64()
    }

    /// Gates one call from `peer` arriving at `now`.
    ///
    /// Returns `true` only when the cooldown has elapsed (or this is the
    /// peer's first use) and every validator accepted the call. A cooldown
    /// rejection leaves the last-use log untouched; a validator rejection
    /// does not roll back the side effects of validators that already ran.
    pub(crate) async fn execute(&self, peer: PeerId, now: Instant, args: &[Value]) -> bool {
        {
            let mut last_use = self.last_use.lock().await;
            if let Some(last) = last_use.get(&peer) {
                if now.duration_since(*last) < self.cooldown {
                    debug!(
                        event = events::MIDDLEWARE_COOLDOWN_REJECT,
                        component = COMPONENT,
                        peer = %peer,
                        cooldown_secs = self.cooldown.as_secs_f64(),
                        "call rejected by cooldown"
                    );
                    return false;
                }
            }
            last_use.insert(peer, now);
        }

        for validator in &self.validators {
            if let Err(err) = validator(peer, args) {
                warn!(
                    event = events::MIDDLEWARE_VALIDATOR_REJECT,
                    component = COMPONENT,
                    peer = %peer,
                    err = %err,
                    "call rejected by validator"
                );
                return false;
            }
        }

        true
    }

    /// Drops the cooldown log entry for a peer whose session ended.
    pub(crate) async fn purge_peer(&self, peer: PeerId) {
        self.last_use.lock().await.remove(&peer);
    }

    #[cfg(test)]
    pub(crate) async fn last_use_of(&self, peer: PeerId) -> Option<Instant> {
        self.last_use.lock().await.get(&peer).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{Middleware, ValidatorError};
    use crate::transport::PeerId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const PEER: PeerId = PeerId(7);

    #[tokio::test]
    async fn first_use_passes_and_records_timestamp() {
        let middleware = Middleware::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(middleware.execute(PEER, t0, &[]).await);
        assert_eq!(middleware.last_use_of(PEER).await, Some(t0));
    }

    #[tokio::test]
    async fn call_within_cooldown_is_rejected_without_touching_log() {
        let middleware = Middleware::new(Duration::from_secs(5));
        let t0 = Instant::now();
        let t3 = t0 + Duration::from_secs(3);
        let t6 = t0 + Duration::from_secs(6);

        assert!(middleware.execute(PEER, t0, &[]).await);
        assert!(!middleware.execute(PEER, t3, &[]).await);
        assert_eq!(middleware.last_use_of(PEER).await, Some(t0));

        assert!(middleware.execute(PEER, t6, &[]).await);
        assert_eq!(middleware.last_use_of(PEER).await, Some(t6));
    }

    #[tokio::test]
    async fn cooldown_logs_are_per_peer() {
        let middleware = Middleware::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(middleware.execute(PeerId(1), t0, &[]).await);
        assert!(middleware.execute(PeerId(2), t0, &[]).await);
        assert!(!middleware.execute(PeerId(1), t0, &[]).await);
    }

    #[tokio::test]
    async fn failing_validator_aborts_chain_but_keeps_earlier_side_effects() {
        let first_ran = Arc::new(AtomicUsize::new(0));
        let third_ran = Arc::new(AtomicUsize::new(0));

        let first = first_ran.clone();
        let third = third_ran.clone();
        let middleware = Middleware::new(Duration::from_secs(0))
            .with_validator(move |_, _| {
                first.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_validator(|_, _| -> Result<(), ValidatorError> {
                Err("second validator rejects".into())
            })
            .with_validator(move |_, _| {
                third.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        assert!(!middleware.execute(PEER, Instant::now(), &[]).await);
        // The first validator's side effect persists; the third never ran.
        assert_eq!(first_ran.load(Ordering::SeqCst), 1);
        assert_eq!(third_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn purge_removes_only_that_peer() {
        let middleware = Middleware::new(Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(middleware.execute(PeerId(1), t0, &[]).await);
        assert!(middleware.execute(PeerId(2), t0, &[]).await);

        middleware.purge_peer(PeerId(1)).await;

        assert_eq!(middleware.last_use_of(PeerId(1)).await, None);
        assert_eq!(middleware.last_use_of(PeerId(2)).await, Some(t0));
    }
}

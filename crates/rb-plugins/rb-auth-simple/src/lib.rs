//! # rb-auth-simple
//!
//! bcrypt-based implementation of `AuthProvider`.
//! Hashing is CPU-bound, so both directions run on tokio's blocking pool.

use async_trait::async_trait;
use rb_core::error::{AppError, Result};
use rb_core::traits::AuthProvider;

/// Cost used when nothing else is configured.
pub const DEFAULT_COST: u32 = 10;

/// Range bcrypt accepts for its cost parameter.
pub const COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

pub struct SimpleAuthProvider {
    cost: u32,
}

impl SimpleAuthProvider {
    pub fn new(cost: u32) -> Result<Self> {
        if !COST_RANGE.contains(&cost) {
            return Err(AppError::Validation(format!(
                "bcrypt cost must be within {}..={}, got {cost}",
                COST_RANGE.start(),
                COST_RANGE.end()
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for SimpleAuthProvider {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(AppError::internal)?
            .map_err(AppError::internal)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();
        match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(err)) => {
                log::warn!("Stored password hash could not be parsed: {err}");
                false
            }
            Err(err) => {
                log::error!("Password verification task failed: {err}");
                false
            }
        }
    }
}

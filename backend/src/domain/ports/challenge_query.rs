//! Driving port for reading the challenge catalogue and a user's instances.

use async_trait::async_trait;

use crate::domain::challenge::{ActiveChallenge, Challenge};
use crate::domain::{Error, UserId};

use super::challenge_repository::seeded_co2_challenge;

/// Domain use-case port for challenge reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeQuery: Send + Sync {
    /// Active catalogue entries. Storage failures yield an empty list.
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, Error>;

    /// The user's `Active` instances with their catalogue entries.
    async fn list_active(&self, user_id: &UserId) -> Result<Vec<ActiveChallenge>, Error>;
}

/// Fixture query serving the seeded catalogue and no instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureChallengeQuery;

#[async_trait]
impl ChallengeQuery for FixtureChallengeQuery {
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, Error> {
        Ok(vec![seeded_co2_challenge()])
    }

    async fn list_active(&self, _user_id: &UserId) -> Result<Vec<ActiveChallenge>, Error> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_catalogue_contains_co2_challenge() {
        let catalogue = FixtureChallengeQuery
            .list_catalogue()
            .await
            .expect("catalogue");
        assert_eq!(catalogue[0].code, "CO2_30D_MINUS_10");
    }
}

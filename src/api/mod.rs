//! Domain operations over the dispatch engine
//!
//! Each operation here owns its endpoint path and payload encoding,
//! picks the server kind whose guarantees it needs, and hands the rest
//! to the dispatcher. Responses come back raw; decoding them into
//! richer types is left to the caller.

use reqwest::header::ACCEPT;

use crate::client::GradingClient;
use crate::dispatch::retry::RetryPolicy;
use crate::error::Result;
use crate::pool::ServerKind;
use crate::transport::{RequestSpec, TransportResponse};

impl GradingClient {
    /// Sign in against the account database.
    ///
    /// On success the response carries the session cookie, which the
    /// dispatcher captures; every later call, whatever its strategy,
    /// rides on that session.
    ///
    /// # Errors
    ///
    /// A dispatch failure, including bad credentials surfacing as the
    /// last attempt's status error.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<TransportResponse> {
        let spec = RequestSpec::post("/direct/check")
            .with_header(ACCEPT, "application/json")
            .with_form(&[("login", login), ("password", password)]);

        let response = self.send_failover(ServerKind::Database, &spec).await?;
        Ok(response)
    }

    /// Fetch the exercise index published under `name`.
    ///
    /// # Errors
    ///
    /// A dispatch failure.
    pub async fn exercise_index(&self, name: &str) -> Result<TransportResponse> {
        let spec = RequestSpec::get(format!("/path/{name}"))
            .with_header(ACCEPT, "application/json");

        let response = self.send_race(ServerKind::Exercise, &spec).await?;
        Ok(response)
    }

    /// Fetch an exercise's full description.
    ///
    /// # Errors
    ///
    /// A dispatch failure.
    pub async fn exercise_content(&self, exercise: &str) -> Result<TransportResponse> {
        let spec = RequestSpec::get(format!("/exercise/{exercise}/content"))
            .with_header(ACCEPT, "text/xml");

        let response = self.send_race(ServerKind::Exercise, &spec).await?;
        Ok(response)
    }

    /// Fetch only an exercise's stem.
    ///
    /// # Errors
    ///
    /// A dispatch failure.
    pub async fn exercise_stem(&self, exercise: &str) -> Result<TransportResponse> {
        let spec = RequestSpec::get(format!("/exercise/{exercise}/stem"))
            .with_header(ACCEPT, "text/xml");

        let response = self.send_race(ServerKind::Exercise, &spec).await?;
        Ok(response)
    }

    /// Submit an answer payload toward an exercise.
    ///
    /// Goes through the submission front, which must receive the
    /// answer at most once; failover keeps delivery sequential.
    ///
    /// # Errors
    ///
    /// A dispatch failure.
    pub async fn submit_answer(
        &self,
        path: &str,
        body: impl Into<bytes::Bytes>,
        content_type: &str,
    ) -> Result<TransportResponse> {
        let spec = RequestSpec::post(path)
            .with_header(ACCEPT, "application/json")
            .with_body(body, content_type);

        let response = self.send_failover(ServerKind::Api, &spec).await?;
        Ok(response)
    }

    /// Poll for a grading job's report until it is ready.
    ///
    /// Reports appear on the storage replicas only once grading has
    /// finished, so the race is wrapped in the bounded retry loop.
    /// Pass `None` to use the configured default policy.
    ///
    /// # Errors
    ///
    /// `DispatchError::RetryExhausted` when the report never appeared
    /// within the policy's budget.
    pub async fn job_report(
        &self,
        job: &str,
        policy: Option<&RetryPolicy>,
    ) -> Result<TransportResponse> {
        let spec = RequestSpec::get(format!("/job/{job}/report"))
            .with_header(ACCEPT, "text/xml");

        let default_policy;
        let policy = match policy {
            Some(policy) => policy,
            None => {
                default_policy = self.default_retry_policy();
                &default_policy
            }
        };

        let response = self
            .send_race_with_retry(ServerKind::Storage, &spec, policy)
            .await?;
        Ok(response)
    }
}

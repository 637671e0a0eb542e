//! Deployment API client

use async_trait::async_trait;
use openapi_client::models::DeploymentResponse;

use crate::deploy::tracker::DeploymentSource;
use crate::errors::ApiError;
use crate::http::client::HttpClient;
use crate::models::deployment::{Deployment, DeploymentHandle};

impl HttpClient {
    /// Get a deployment record
    pub async fn get_deployment(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<Option<Deployment>, ApiError> {
        let url = self.url(&["orgs", handle.org.as_str(), "deployments", handle.id.as_str()], &[])?;
        let response: Option<DeploymentResponse> = self.get(url).await?;
        Ok(response.map(Deployment::from))
    }
}

#[async_trait]
impl DeploymentSource for HttpClient {
    async fn fetch_deployment(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<Option<Deployment>, ApiError> {
        self.get_deployment(handle).await
    }
}

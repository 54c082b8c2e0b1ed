//! HTTP client for the billing back-office REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use voltdesk_core::{
    CustomerAccount, InitiatedTransfer, LookupQuery, MIN_LOOKUP_LEN, OtpPurpose,
    PaymentStatusReport, TransferDecision, TransferRequest,
};

use crate::{ApiError, BillingApi};

#[derive(Serialize)]
struct OtpRequest {
    purpose: OtpPurpose,
}

#[derive(serde::Deserialize)]
struct OtpResponse {
    sent: bool,
}

#[derive(Serialize)]
struct ConfirmRequest<'a> {
    otp: &'a str,
}

/// `reqwest`-backed [`BillingApi`].
pub struct HttpBillingApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBillingApi {
    /// Create a client for the given base URL, e.g. `https://billing.example.com`.
    ///
    /// `token` is sent as a bearer token on every request when present.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorised(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl BillingApi for HttpBillingApi {
    async fn lookup_entity(
        &self,
        query: &LookupQuery,
    ) -> Result<Option<CustomerAccount>, ApiError> {
        if !query.is_ready(MIN_LOOKUP_LEN) {
            return Err(ApiError::QueryTooShort {
                min: MIN_LOOKUP_LEN,
            });
        }
        let url = self.endpoint(&["api", "customers", "lookup"])?;
        debug!(url = %url, kind = query.kind.as_str(), "looking up customer");
        let resp = self
            .authorised(self.client.get(url))
            .query(&[("kind", query.kind.as_str()), ("q", query.value.as_str())])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(query = %query.value, "customer not found");
            return Ok(None);
        }
        let account: CustomerAccount = Self::read_json(resp).await?;
        info!(account = %account.account_number, "customer found");
        Ok(Some(account))
    }

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<InitiatedTransfer, ApiError> {
        let url = self.endpoint(&["api", "transfers"])?;
        info!(url = %url, amount = %request.amount, asset = %request.asset, "initiating transfer");
        let resp = self
            .authorised(self.client.post(url))
            .json(request)
            .send()
            .await?;
        let initiated: InitiatedTransfer = Self::read_json(resp).await?;
        info!(
            reference = %initiated.reference,
            requires_otp = initiated.requires_otp,
            "transfer initiated"
        );
        Ok(initiated)
    }

    async fn request_otp(&self, purpose: OtpPurpose) -> Result<bool, ApiError> {
        let url = self.endpoint(&["api", "otp"])?;
        info!(url = %url, ?purpose, "requesting OTP");
        let resp = self
            .authorised(self.client.post(url))
            .json(&OtpRequest { purpose })
            .send()
            .await?;
        let result: OtpResponse = Self::read_json(resp).await?;
        Ok(result.sent)
    }

    async fn confirm_transfer(
        &self,
        reference: &str,
        otp: &str,
    ) -> Result<TransferDecision, ApiError> {
        let url = self.endpoint(&["api", "transfers", reference, "confirm"])?;
        info!(url = %url, "confirming transfer");
        let resp = self
            .authorised(self.client.post(url))
            .json(&ConfirmRequest { otp })
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn check_payment_status(
        &self,
        reference: &str,
    ) -> Result<PaymentStatusReport, ApiError> {
        let url = self.endpoint(&["api", "payments", reference, "status"])?;
        debug!(url = %url, "checking payment status");
        let resp = self.authorised(self.client.get(url)).send().await?;
        Self::read_json(resp).await
    }
}

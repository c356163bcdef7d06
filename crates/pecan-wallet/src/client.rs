//! Mint transport
//!
//! [`MintConnector`] is exactly the HTTP surface the wallet consumes; the
//! bundled [`HttpClient`] speaks it over reqwest. A 400 response is parsed
//! into the mint's `{detail, code}` error and surfaced verbatim.

use async_trait::async_trait;
use pecan_core::keyset::{Id, KeysResponse, KeysetResponse};
use pecan_core::messages::{
    CheckStateRequest, CheckStateResponse, MeltBolt11Request, MeltQuoteBolt11Request,
    MeltQuoteBolt11Response, MintBolt11Request, MintBolt11Response, MintInfo,
    MintQuoteBolt11Request, MintQuoteBolt11Response, RestoreRequest, RestoreResponse, SwapRequest,
    SwapResponse,
};
use pecan_core::mint_url::MintUrl;
use pecan_core::{Amount, CurrencyUnit, ErrorResponse, KeySet, PublicKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::error::Error;

/// The mint HTTP surface consumed by the wallet
#[async_trait]
pub trait MintConnector {
    /// Mint capability document
    async fn get_mint_info(&self, mint_url: &MintUrl) -> Result<MintInfo, Error>;

    /// Keys of all active keysets
    async fn get_mint_keys(&self, mint_url: &MintUrl) -> Result<Vec<KeySet>, Error>;

    /// Keys of one keyset
    async fn get_mint_keyset(&self, mint_url: &MintUrl, keyset_id: Id) -> Result<KeySet, Error>;

    /// All keysets, active and inactive
    async fn get_mint_keysets(&self, mint_url: &MintUrl) -> Result<KeysetResponse, Error>;

    /// Request a mint quote
    async fn post_mint_quote(
        &self,
        mint_url: &MintUrl,
        amount: Amount,
        unit: CurrencyUnit,
    ) -> Result<MintQuoteBolt11Response, Error>;

    /// Poll a mint quote
    async fn get_mint_quote_status(
        &self,
        mint_url: &MintUrl,
        quote_id: &str,
    ) -> Result<MintQuoteBolt11Response, Error>;

    /// Mint ecash for a paid quote
    async fn post_mint(
        &self,
        mint_url: &MintUrl,
        request: MintBolt11Request,
    ) -> Result<MintBolt11Response, Error>;

    /// Request a melt quote
    async fn post_melt_quote(
        &self,
        mint_url: &MintUrl,
        request: MeltQuoteBolt11Request,
    ) -> Result<MeltQuoteBolt11Response, Error>;

    /// Poll a melt quote
    async fn get_melt_quote_status(
        &self,
        mint_url: &MintUrl,
        quote_id: &str,
    ) -> Result<MeltQuoteBolt11Response, Error>;

    /// Melt ecash into a lightning payment
    async fn post_melt(
        &self,
        mint_url: &MintUrl,
        request: MeltBolt11Request,
    ) -> Result<MeltQuoteBolt11Response, Error>;

    /// Swap proofs for fresh ones
    async fn post_swap(
        &self,
        mint_url: &MintUrl,
        request: SwapRequest,
    ) -> Result<SwapResponse, Error>;

    /// Check spendable state of proofs
    async fn post_check_state(
        &self,
        mint_url: &MintUrl,
        ys: Vec<PublicKey>,
    ) -> Result<CheckStateResponse, Error>;

    /// Look up signatures for previously seen outputs
    async fn post_restore(
        &self,
        mint_url: &MintUrl,
        request: RestoreRequest,
    ) -> Result<RestoreResponse, Error>;
}

/// [`MintConnector`] over reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Create new [`HttpClient`]
    pub fn new() -> Self {
        Self::default()
    }

    async fn http_get<R>(&self, mint_url: &MintUrl, path: &str) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let url = mint_url.join(path)?;
        let response = self.inner.get(url).send().await?;

        Self::parse_response(response).await
    }

    async fn http_post<B, R>(&self, mint_url: &MintUrl, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = mint_url.join(path)?;
        let response = self.inner.post(url).json(body).send().await?;

        Self::parse_response(response).await
    }

    async fn parse_response<R>(response: reqwest::Response) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(ErrorResponse::from_json(&body).into())
        }
    }
}

#[async_trait]
impl MintConnector for HttpClient {
    #[instrument(skip(self), fields(mint_url = %mint_url))]
    async fn get_mint_info(&self, mint_url: &MintUrl) -> Result<MintInfo, Error> {
        self.http_get(mint_url, "v1/info").await
    }

    #[instrument(skip(self), fields(mint_url = %mint_url))]
    async fn get_mint_keys(&self, mint_url: &MintUrl) -> Result<Vec<KeySet>, Error> {
        let response: KeysResponse = self.http_get(mint_url, "v1/keys").await?;
        Ok(response.keysets)
    }

    #[instrument(skip(self), fields(mint_url = %mint_url))]
    async fn get_mint_keyset(&self, mint_url: &MintUrl, keyset_id: Id) -> Result<KeySet, Error> {
        let response: KeysResponse = self
            .http_get(mint_url, &format!("v1/keys/{keyset_id}"))
            .await?;

        response
            .keysets
            .into_iter()
            .find(|keyset| keyset.id == keyset_id)
            .ok_or(Error::KeysetUnknown(keyset_id))
    }

    #[instrument(skip(self), fields(mint_url = %mint_url))]
    async fn get_mint_keysets(&self, mint_url: &MintUrl) -> Result<KeysetResponse, Error> {
        self.http_get(mint_url, "v1/keysets").await
    }

    #[instrument(skip(self), fields(mint_url = %mint_url))]
    async fn post_mint_quote(
        &self,
        mint_url: &MintUrl,
        amount: Amount,
        unit: CurrencyUnit,
    ) -> Result<MintQuoteBolt11Response, Error> {
        let request = MintQuoteBolt11Request { amount, unit };

        self.http_post(mint_url, "v1/mint/quote/bolt11", &request)
            .await
    }

    #[instrument(skip(self, quote_id), fields(mint_url = %mint_url))]
    async fn get_mint_quote_status(
        &self,
        mint_url: &MintUrl,
        quote_id: &str,
    ) -> Result<MintQuoteBolt11Response, Error> {
        self.http_get(mint_url, &format!("v1/mint/quote/bolt11/{quote_id}"))
            .await
    }

    #[instrument(skip(self, request), fields(mint_url = %mint_url))]
    async fn post_mint(
        &self,
        mint_url: &MintUrl,
        request: MintBolt11Request,
    ) -> Result<MintBolt11Response, Error> {
        self.http_post(mint_url, "v1/mint/bolt11", &request).await
    }

    #[instrument(skip(self, request), fields(mint_url = %mint_url))]
    async fn post_melt_quote(
        &self,
        mint_url: &MintUrl,
        request: MeltQuoteBolt11Request,
    ) -> Result<MeltQuoteBolt11Response, Error> {
        self.http_post(mint_url, "v1/melt/quote/bolt11", &request)
            .await
    }

    #[instrument(skip(self, quote_id), fields(mint_url = %mint_url))]
    async fn get_melt_quote_status(
        &self,
        mint_url: &MintUrl,
        quote_id: &str,
    ) -> Result<MeltQuoteBolt11Response, Error> {
        self.http_get(mint_url, &format!("v1/melt/quote/bolt11/{quote_id}"))
            .await
    }

    #[instrument(skip(self, request), fields(mint_url = %mint_url))]
    async fn post_melt(
        &self,
        mint_url: &MintUrl,
        request: MeltBolt11Request,
    ) -> Result<MeltQuoteBolt11Response, Error> {
        self.http_post(mint_url, "v1/melt/bolt11", &request).await
    }

    #[instrument(skip(self, request), fields(mint_url = %mint_url))]
    async fn post_swap(
        &self,
        mint_url: &MintUrl,
        request: SwapRequest,
    ) -> Result<SwapResponse, Error> {
        self.http_post(mint_url, "v1/swap", &request).await
    }

    #[instrument(skip(self, ys), fields(mint_url = %mint_url))]
    async fn post_check_state(
        &self,
        mint_url: &MintUrl,
        ys: Vec<PublicKey>,
    ) -> Result<CheckStateResponse, Error> {
        let request = CheckStateRequest { ys };

        self.http_post(mint_url, "v1/checkstate", &request).await
    }

    #[instrument(skip(self, request), fields(mint_url = %mint_url))]
    async fn post_restore(
        &self,
        mint_url: &MintUrl,
        request: RestoreRequest,
    ) -> Result<RestoreResponse, Error> {
        self.http_post(mint_url, "v1/restore", &request).await
    }
}

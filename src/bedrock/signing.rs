//! SigV4 request signing for Bedrock endpoints
//!
//! Credentials come from the standard AWS provider chain (environment,
//! shared profile, SSO, container and instance metadata) and are cached
//! until shortly before they expire.

use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

use crate::errors::{ChatError, Result};

/// Signing name shared by bedrock-runtime and bedrock-agent-runtime
pub const BEDROCK_SIGNING_NAME: &str = "bedrock";

/// Cached credentials are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Signs requests with credentials from a provider
#[derive(Debug)]
pub struct SigV4Signer {
    provider: SharedCredentialsProvider,
    region: String,
    service: String,
    cached: Mutex<Option<Credentials>>,
}

impl SigV4Signer {
    pub fn new(provider: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            provider,
            region: region.into(),
            service: BEDROCK_SIGNING_NAME.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Signer over the default AWS credential chain, or `None` when the
    /// chain yields no credentials
    pub async fn from_default_chain(region: &str) -> Option<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        let Some(provider) = sdk_config.credentials_provider() else {
            tracing::warn!("no AWS credential provider configured");
            return None;
        };

        let resolved = provider.provide_credentials().await;
        match resolved {
            Ok(credentials) => {
                tracing::debug!(region, "AWS credentials resolved for SigV4 signing");
                let signer = Self::new(provider, region);
                *signer.cached.lock().await = Some(credentials);
                Some(signer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "no AWS credentials found; SigV4 signing disabled");
                None
            }
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn credentials(&self) -> Result<Credentials> {
        let mut cached = self.cached.lock().await;
        if let Some(credentials) = cached.as_ref() {
            if !expires_soon(credentials) {
                return Ok(credentials.clone());
            }
        }

        let fresh = self
            .provider
            .provide_credentials()
            .await
            .map_err(|e| ChatError::Signing(format!("cannot load AWS credentials: {}", e)))?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Headers to add to the request: `authorization`, `x-amz-date` and,
    /// for temporary credentials, `x-amz-security-token`
    ///
    /// `headers` must hold exactly the values the request will carry.
    pub async fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>> {
        let identity = self.credentials().await?.into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(&self.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ChatError::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            method,
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ChatError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ChatError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

fn expires_soon(credentials: &Credentials) -> bool {
    credentials
        .expiry()
        .map(|expiry| expiry <= SystemTime::now() + EXPIRY_MARGIN)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(session_token: Option<&str>) -> SigV4Signer {
        let credentials = Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            session_token.map(str::to_string),
            None,
            "unit-test",
        );
        SigV4Signer::new(SharedCredentialsProvider::new(credentials), "us-west-2")
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_sign_produces_authorization_header() {
        let headers = signer(None)
            .sign(
                "POST",
                "https://bedrock-agent-runtime.us-west-2.amazonaws.com/knowledgebases/KB1/retrieve",
                &[("content-type", "application/json")],
                br#"{"retrievalQuery":{"text":"q"}}"#,
            )
            .await
            .unwrap();

        let authorization = header(&headers, "authorization").unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization.contains("/us-west-2/bedrock/aws4_request"));
        assert!(authorization.contains("content-type"));
        assert!(header(&headers, "x-amz-date").is_some());
        assert!(header(&headers, "x-amz-security-token").is_none());
    }

    #[tokio::test]
    async fn test_session_token_is_forwarded() {
        let headers = signer(Some("session-token"))
            .sign("POST", "https://bedrock-runtime.us-west-2.amazonaws.com/", &[], b"{}")
            .await
            .unwrap();

        assert_eq!(header(&headers, "x-amz-security-token"), Some("session-token"));
    }

    #[test]
    fn test_expiry_margin() {
        let long_lived = Credentials::new("a", "b", None, None, "unit-test");
        assert!(!expires_soon(&long_lived));

        let expiring = Credentials::new(
            "a",
            "b",
            None,
            Some(SystemTime::now() + Duration::from_secs(60)),
            "unit-test",
        );
        assert!(expires_soon(&expiring));
    }
}

use aws_sdk_s3::config::endpoint::{DefaultResolver, Params, ResolveEndpoint};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::{
    config::Settings,
    error::{StorageError, StorageResult},
};

/// Bytes left as-is in a key segment: RFC 3986 unreserved characters.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds plain, unsigned object URLs.
///
/// The host and addressing style come from the SDK's endpoint rules, so
/// partitions, custom endpoints and path-style fallbacks match what the client
/// itself talks to. `us-east-1` uses the global `s3.amazonaws.com` host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlResolver {
    region: String,
    endpoint: Option<String>,
    force_path_style: bool,
}

impl UrlResolver {
    pub fn new(region: &str, endpoint: Option<&Url>, force_path_style: bool) -> Self {
        Self {
            region: region.to_string(),
            endpoint: endpoint.map(|url| url.as_str().trim_end_matches('/').to_string()),
            force_path_style,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.region,
            settings.endpoint_url.as_ref(),
            settings.force_path_style,
        )
    }

    pub async fn object_url(&self, bucket: &str, key: &str) -> StorageResult<String> {
        let mut params = Params::builder()
            .region(self.region.clone())
            .bucket(bucket)
            .force_path_style(self.force_path_style)
            .use_global_endpoint(true)
            .use_fips(false)
            .use_dual_stack(false);
        if let Some(endpoint) = &self.endpoint {
            params = params.endpoint(endpoint.clone());
        }
        let params = params
            .build()
            .map_err(|e| StorageError::Config(format!("endpoint parameters: {e}")))?;

        let endpoint = DefaultResolver::new()
            .resolve_endpoint(&params)
            .await
            .map_err(|e| {
                StorageError::InvalidArgument(format!(
                    "no endpoint for bucket \"{bucket}\" in {}: {e}",
                    self.region
                ))
            })?;

        Ok(format!(
            "{}/{}",
            endpoint.url().trim_end_matches('/'),
            encode_key(key)
        ))
    }
}

/// Percent-encodes each `/`-separated segment. Dot segments are encoded too,
/// so no URL client collapses `a/../b` into a different key.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| match segment {
            "." => "%2E".to_string(),
            ".." => "%2E%2E".to_string(),
            _ => utf8_percent_encode(segment, KEY_SEGMENT).to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

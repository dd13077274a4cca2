//! Process configuration for the storage client.

use std::{env, fmt};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use chrono::NaiveDate;
use url::Url;

use crate::error::{StorageError, StorageResult};

const DEFAULT_API_VERSION: &str = "latest";
const CREDENTIALS_PROVIDER_NAME: &str = "environment";

/// Static access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    secret_access_key: String,
}

impl StaticCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub region: String,
    /// API version label, `latest` or a release date such as `2006-03-01`.
    pub api_version: String,
    /// `None` defers to the SDK's default credential chain.
    pub credentials: Option<StaticCredentials>,
    pub bucket: Option<String>,
    pub endpoint_url: Option<Url>,
    pub force_path_style: bool,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let region = get("AWS_REGION")
            .ok_or_else(|| StorageError::Config("AWS_REGION is not set".to_string()))?;

        let api_version = get("AWS_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        if !is_version_label(&api_version) {
            return Err(StorageError::Config(format!(
                "AWS_VERSION must be \"latest\" or a YYYY-MM-DD date, got \"{api_version}\""
            )));
        }

        let credentials = match (get("AWS_KEY"), get("AWS_SECRET")) {
            (Some(key), Some(secret)) => Some(StaticCredentials::new(key, secret)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(StorageError::Config(
                    "AWS_KEY is set but AWS_SECRET is not".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(StorageError::Config(
                    "AWS_SECRET is set but AWS_KEY is not".to_string(),
                ))
            }
        };

        let endpoint_url = get("AWS_ENDPOINT_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    StorageError::Config(format!("AWS_ENDPOINT_URL \"{raw}\" is not a valid URL: {e}"))
                })
            })
            .transpose()?;

        let force_path_style = get("AWS_USE_PATH_STYLE_ENDPOINT")
            .map(|raw| parse_flag("AWS_USE_PATH_STYLE_ENDPOINT", &raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            region,
            api_version,
            credentials,
            bucket: get("AWS_BUCKET"),
            endpoint_url,
            force_path_style,
        })
    }

    /// Shared AWS configuration with region, credentials and endpoint applied.
    pub async fn sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let Some(creds) = &self.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }

        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }

        loader.load().await
    }

    /// S3 service configuration derived from [`Settings::sdk_config`].
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let sdk_config = self.sdk_config().await;
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .build()
    }
}

fn is_version_label(label: &str) -> bool {
    if label == DEFAULT_API_VERSION {
        return true;
    }
    label.len() == 10 && NaiveDate::parse_from_str(label, "%Y-%m-%d").is_ok()
}

fn parse_flag(name: &str, raw: &str) -> StorageResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StorageError::Config(format!(
            "{name} must be a boolean, got \"{raw}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> StorageResult<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn reads_full_configuration() {
        let settings = settings_from(&[
            ("AWS_REGION", "eu-west-1"),
            ("AWS_VERSION", "2006-03-01"),
            ("AWS_KEY", "AKIDEXAMPLE"),
            ("AWS_SECRET", "wJalrXUtnFEMI"),
            ("AWS_BUCKET", "assets"),
            ("AWS_ENDPOINT_URL", "http://localhost:4566"),
            ("AWS_USE_PATH_STYLE_ENDPOINT", "true"),
        ])
        .unwrap();

        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.api_version, "2006-03-01");
        assert_eq!(
            settings.credentials,
            Some(StaticCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI"))
        );
        assert_eq!(settings.bucket.as_deref(), Some("assets"));
        assert_eq!(
            settings.endpoint_url.as_ref().map(Url::as_str),
            Some("http://localhost:4566/")
        );
        assert!(settings.force_path_style);
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let settings = settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_BUCKET", "  ")]).unwrap();

        assert_eq!(settings.api_version, "latest");
        assert_eq!(settings.credentials, None);
        assert_eq!(settings.bucket, None);
        assert_eq!(settings.endpoint_url, None);
        assert!(!settings.force_path_style);
    }

    #[test]
    fn region_is_required() {
        let err = settings_from(&[("AWS_BUCKET", "assets")]).unwrap_err();
        assert!(matches!(err, StorageError::Config(msg) if msg.contains("AWS_REGION")));
    }

    #[test]
    fn key_and_secret_come_in_pairs() {
        let err = settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_KEY", "AKID")]).unwrap_err();
        assert!(matches!(err, StorageError::Config(msg) if msg.contains("AWS_SECRET")));

        let err =
            settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_SECRET", "secret")]).unwrap_err();
        assert!(matches!(err, StorageError::Config(msg) if msg.contains("AWS_KEY")));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_VERSION", "v2")]).is_err());
        assert!(settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_VERSION", "2006-3-01")]).is_err());
        assert!(settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_VERSION", "2024-99-99")]).is_err());
        assert!(settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_VERSION", "2023-02-30")]).is_err());
        assert!(
            settings_from(&[("AWS_REGION", "us-east-1"), ("AWS_ENDPOINT_URL", "localhost")]).is_err()
        );
        assert!(settings_from(&[
            ("AWS_REGION", "us-east-1"),
            ("AWS_USE_PATH_STYLE_ENDPOINT", "maybe"),
        ])
        .is_err());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let creds = StaticCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI");
        let printed = format!("{creds:?}");
        assert!(printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        env::set_var("AWS_REGION", "ap-northeast-1");
        env::set_var("AWS_BUCKET", "env-bucket");
        env::remove_var("AWS_VERSION");
        env::remove_var("AWS_KEY");
        env::remove_var("AWS_SECRET");
        env::remove_var("AWS_ENDPOINT_URL");
        env::remove_var("AWS_USE_PATH_STYLE_ENDPOINT");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.region, "ap-northeast-1");
        assert_eq!(settings.bucket.as_deref(), Some("env-bucket"));

        env::remove_var("AWS_REGION");
        env::remove_var("AWS_BUCKET");
    }

    #[tokio::test]
    async fn s3_config_carries_region() {
        let settings = settings_from(&[
            ("AWS_REGION", "eu-central-1"),
            ("AWS_KEY", "AKIDEXAMPLE"),
            ("AWS_SECRET", "wJalrXUtnFEMI"),
            ("AWS_USE_PATH_STYLE_ENDPOINT", "1"),
        ])
        .unwrap();

        let config = settings.s3_client_config().await;
        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-central-1"));
    }
}

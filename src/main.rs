use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use s3_facade::{Settings, S3};

/// Looks a file up in a bucket and optionally uploads it to another one.
#[derive(Debug, Parser)]
#[command(name = "s3-facade", version)]
struct Cli {
    /// Local file; its file name is the object key.
    #[arg(default_value = "README.md")]
    file: PathBuf,

    /// Bucket to look the object up in.
    #[arg(long, env = "AWS_BUCKET")]
    bucket: Option<String>,

    /// Bucket to upload the local file to.
    #[arg(long = "upload-to", env = "AWS_UPLOAD_BUCKET")]
    upload_to: Option<String>,
}

/// The object key for a local file: its file name, unchanged.
fn object_key(file: &Path) -> anyhow::Result<String> {
    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    name.to_str()
        .map(str::to_string)
        .with_context(|| format!("file name of {} is not valid UTF-8", file.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let s3 = S3::from_settings(&settings).await?;

    let key = object_key(&cli.file)?;

    let lookup_bucket = cli.bucket.or(settings.bucket);
    if lookup_bucket.is_none() && cli.upload_to.is_none() {
        anyhow::bail!("nothing to do: set AWS_BUCKET or pass --bucket / --upload-to");
    }

    if let Some(name) = lookup_bucket {
        let bucket = s3.bucket(&name).await?;
        let exists = bucket.object_exists(&key).await?;
        println!("{}", if exists { "Yes" } else { "No" });
        if exists {
            if let Some(url) = bucket.object_url(&key).await? {
                println!("{url}");
            }
        }
    }

    if let Some(name) = cli.upload_to {
        let receipt = s3
            .bucket(&name)
            .await?
            .upload_file(&key, &cli.file)
            .await
            .with_context(|| format!("uploading {} to {name}", cli.file.display()))?;
        println!(
            "uploaded {} ({})",
            receipt.key,
            receipt.e_tag.as_deref().unwrap_or("no etag")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_defaults_to_readme() {
        let cli = Cli::try_parse_from(["s3-facade", "--bucket", "assets"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("README.md"));
        assert_eq!(cli.bucket.as_deref(), Some("assets"));
    }

    #[test]
    fn upload_target_is_optional() {
        let cli =
            Cli::try_parse_from(["s3-facade", "notes.txt", "--bucket", "a", "--upload-to", "b"])
                .unwrap();
        assert_eq!(cli.file, PathBuf::from("notes.txt"));
        assert_eq!(cli.upload_to.as_deref(), Some("b"));
    }

    #[test]
    fn object_key_is_the_file_name() {
        assert_eq!(object_key(Path::new("docs/README.md")).unwrap(), "README.md");
        assert!(object_key(Path::new("/")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_rejected() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let file = Path::new(OsStr::from_bytes(b"notes-\xff.md"));
        let err = object_key(file).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}

//! Greeting aggregation.
//!
//! Resolves every endpoint up front, then calls greeting, name, and tracking
//! strictly in that order. The first failure ends the request; nothing is
//! retried and no partial text is returned.

use crate::config::{ServiceSettings, TRACKER_URL_KEY};
use crate::endpoint::{name_sub_path, random_name_id, resolve, ServiceKind};
use crate::error::AppError;
use crate::upstream::UpstreamClient;

/// Compose `"<greeting> <name>"` using a freshly drawn name ID.
pub async fn aggregate(
    settings: &ServiceSettings,
    client: &UpstreamClient,
    request_scheme: &str,
) -> Result<String, AppError> {
    aggregate_with_id(settings, client, request_scheme, random_name_id()).await
}

/// Same as [`aggregate`] with the name ID chosen by the caller.
#[tracing::instrument(name = "aggregate", skip(settings, client))]
pub async fn aggregate_with_id(
    settings: &ServiceSettings,
    client: &UpstreamClient,
    request_scheme: &str,
    name_id: u8,
) -> Result<String, AppError> {
    let greeting_endpoint = resolve(ServiceKind::Greeting, settings, request_scheme, None)?;
    let name_endpoint = resolve(
        ServiceKind::Name,
        settings,
        request_scheme,
        Some(&name_sub_path(name_id)),
    )?;
    let tracker_url = settings
        .tracker_url
        .as_deref()
        .ok_or_else(|| AppError::missing(TRACKER_URL_KEY))?;

    let greeting = client
        .fetch_text(ServiceKind::Greeting.display_name(), &greeting_endpoint.url())
        .await?;
    let name = client
        .fetch_text(ServiceKind::Name.display_name(), &name_endpoint.url())
        .await?;

    client.track(tracker_url, &name, &greeting).await?;

    Ok(format!("{} {}", greeting, name))
}

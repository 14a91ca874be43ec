//! Connect-URL construction for the realtime endpoint.

use reqwest::Url;

use crate::error::{PulseLinkError, Result};
use crate::topics::ChannelSet;

/// Build the realtime connect URL for the current channel set:
/// `ws(s)://{endpoint}/v1/realtime?project={p}&channels[]=a&channels[]=b`.
///
/// The interest set is fixed at connect time — changing it requires a full
/// close-then-reconnect with a freshly built URL.
pub(crate) fn realtime_url(endpoint: &str, project: &str, channels: &ChannelSet) -> Result<String> {
    let base = Url::parse(endpoint.trim()).map_err(|e| {
        PulseLinkError::ConfigurationError(format!("Invalid endpoint '{}': {}", endpoint, e))
    })?;

    if base.host_str().is_none() {
        return Err(PulseLinkError::ConfigurationError(
            "endpoint must include a host".to_string(),
        ));
    }
    if !base.username().is_empty() || base.password().is_some() {
        return Err(PulseLinkError::ConfigurationError(
            "endpoint must not include username/password credentials".to_string(),
        ));
    }

    let ws_scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(PulseLinkError::ConfigurationError(format!(
                "Unsupported endpoint scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
    };

    let mut url = base;
    url.set_scheme(ws_scheme).map_err(|_| {
        PulseLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    url.set_fragment(None);
    url.set_path("/v1/realtime");

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("project", project);
        for channel in channels.iter() {
            query.append_pair("channels[]", channel);
        }
    }

    Ok(url.to_string())
}

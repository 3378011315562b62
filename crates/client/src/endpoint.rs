//! Endpoint resolution.

use panelwire_config::ClientConfig;
use panelwire_core::MessageFamily;

pub fn path(family: MessageFamily) -> &'static str {
    match family {
        MessageFamily::Track => "/track",
        MessageFamily::People => "/engage",
    }
}

/// Full request URL for `family` under `config`: host, family path, then the
/// IP-handling query, if any.
pub fn url(config: &ClientConfig, family: MessageFamily) -> String {
    format!(
        "{}{}{}",
        config.host(),
        path(family),
        config.ip_handling.query()
    )
}

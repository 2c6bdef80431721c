use busview_server::connection_session::ConnectRequest;
use busview_server::utils::EnvUtils;
use busview_server::utils::env::{CONNECTION_STRING_VAR, ROOT_CONNECTION_STRING_VAR};
use serde::Deserialize;

/// Local Service Bus emulator, used when nothing else is configured
pub const EMULATOR_CONNECTION_STRING: &str = "Endpoint=sb://localhost;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=SAS_KEY_VALUE;UseDevelopmentEmulator=true;";

/// Service Bus configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ServicebusConfig {
    connection_string: Option<String>,
    admin_connection_string: Option<String>,
    entity_name: Option<String>,
    subscription_name: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ServicebusConfig {
    /// Data-plane connection string: config, then `CONNECTION_STRING`, then
    /// the local emulator.
    pub fn connection_string(&self) -> String {
        non_blank(&self.connection_string)
            .map(str::to_string)
            .or_else(|| EnvUtils::get_optional_var(CONNECTION_STRING_VAR))
            .unwrap_or_else(|| EMULATOR_CONNECTION_STRING.to_string())
    }

    /// Management connection string: config, then `ROOT_CONNECTION_STRING`.
    pub fn admin_connection_string(&self) -> Option<String> {
        non_blank(&self.admin_connection_string)
            .map(str::to_string)
            .or_else(|| EnvUtils::get_optional_var(ROOT_CONNECTION_STRING_VAR))
    }

    pub fn entity_name(&self) -> Option<&str> {
        non_blank(&self.entity_name)
    }

    pub fn subscription_name(&self) -> Option<&str> {
        non_blank(&self.subscription_name)
    }

    /// The request a bare `connect` command issues
    pub fn default_connect_request(&self) -> ConnectRequest {
        let mut request = ConnectRequest::new(self.connection_string());
        if let Some(admin) = self.admin_connection_string() {
            request = request.with_admin(admin);
        }
        if let Some(entity) = self.entity_name() {
            request = request.with_entity(entity);
        }
        if let Some(subscription) = self.subscription_name() {
            request = request.with_subscription(subscription);
        }
        request
    }
}

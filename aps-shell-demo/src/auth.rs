//! Authorization URL and client id texts for the APS OAuth flow

pub const CLIENT_ID_ENV: &str = "APS_CLIENT_ID";

const AUTHORIZE_ENDPOINT: &str = "https://developer.api.autodesk.com/authentication/v2/authorize";
const REDIRECT_URI: &str = "apsshelldemo://oauth";
const SCOPE: &str = "data:read%20data:create%20data:write";

/// Builds the three-legged authorization URL.
///
/// A missing client id is substituted with an empty value, the browser then
/// shows the APS error page instead of the login.
pub fn authorization_url(client_id: Option<&str>) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
        AUTHORIZE_ENDPOINT,
        client_id.unwrap_or_default(),
        REDIRECT_URI,
        SCOPE
    )
}

/// Initial label text of the window
pub fn client_id_label(client_id: Option<&str>) -> String {
    match client_id {
        Some(id) => format!("CLIENT ID:{}", id),
        None => format!("You need to set {} in your environment variables.", CLIENT_ID_ENV),
    }
}

use serde::Deserialize;

/// Response of the identity provider's `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Error body returned by the table service.
#[derive(Debug, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl RemoteErrorBody {
    pub fn describe(raw: &str) -> String {
        match serde_json::from_str::<RemoteErrorBody>(raw) {
            Ok(RemoteErrorBody { message: Some(message), code }) => match code {
                Some(code) => format!("{} ({})", message, code),
                None => message,
            },
            _ => raw.to_string(),
        }
    }
}

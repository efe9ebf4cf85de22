//! The session struct (spec §3, component K): base URL, access token,
//! user id, and the optional session-id pair. Persistence is external (see
//! [`crate::session_store`]).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Session {
    #[serde(rename = "baseUrl")]
    pub(crate) base_url: String,
    #[serde(rename = "accessToken")]
    pub(crate) access_token: String,
    #[serde(rename = "userId")]
    pub(crate) user_id: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub(crate) session_id: Option<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrip_without_session_id() {
        let s = Session {
            base_url: "https://app.tuta.com".to_owned(),
            access_token: "tok".to_owned(),
            user_id: "u1".to_owned(),
            session_id: None,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("sessionId"));
        let recovered: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.user_id, "u1");
    }

    #[test]
    fn test_session_roundtrip_with_session_id() {
        let s = Session {
            base_url: "https://app.tuta.com".to_owned(),
            access_token: "tok".to_owned(),
            user_id: "u1".to_owned(),
            session_id: Some(("list".to_owned(), "elem".to_owned())),
        };
        let json = serde_json::to_string(&s).unwrap();
        let recovered: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.session_id, Some(("list".to_owned(), "elem".to_owned())));
    }
}

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
/// `POST /v1/chat` body.
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub entity_filters: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
/// `POST /v1/chat/clarify` body.
pub struct ClarifyRequestBody {
    pub session_id: String,
    pub option_id: String,
}

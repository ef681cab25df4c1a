use serde::{Deserialize, Serialize};

/// Wire response for every daemon command: a successful output string or an
/// error message. Serialized as JSON with a `"result"` discriminant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Ok { output: String },
    Error { message: String },
}

impl Response {
    pub fn ok(output: impl Into<String>) -> Response {
        Response::Ok {
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Response {
        Response::Error {
            message: message.into(),
        }
    }
}

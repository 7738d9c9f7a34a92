use serde::{Deserialize, Serialize};

use crate::auth::UserId;
use crate::files::FileId;

/// Request to build derivatives (thumbnails) for a freshly stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeJob {
    pub user_id: UserId,
    pub file_id: FileId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let file_id = FileId::new();
        let job = DerivativeJob { user_id: 7, file_id };

        let value = serde_json::to_value(job).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["fileId"], file_id.to_string());

        let parsed: DerivativeJob = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, job);
    }
}

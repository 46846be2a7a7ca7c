use {lansite_protocol::PublicIdentity, serde::Serialize};

/// Admin stream rendering of a pending request, with accept/deny controls on
/// the client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBox {
    pub requestor: PublicIdentity,
    pub description: String,
    /// `"<name> <description>"`, shown as the box body.
    pub text: String,
}

impl RequestBox {
    pub fn new(requestor: PublicIdentity, description: impl Into<String>) -> Self {
        let description = description.into();
        let text = format!("{} {}", requestor.display_name, description);
        Self {
            requestor,
            description,
            text,
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentChannel(pub String);

/// A product component that tags can be registered against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub channel: ComponentChannel,
    pub support_channel: Option<String>,
    pub runbook_url: String,
    pub owner_reference: String,
}

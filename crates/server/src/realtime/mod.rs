mod registry;
mod session;

pub use registry::{RegistryError, TopicRegistry};
pub use session::SubscriptionSession;

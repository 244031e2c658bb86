use lagoon_core::DeliveryOptions;

/// Client-wide configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Delivery options applied to every operation handle the client creates
    pub delivery: DeliveryOptions,
}

impl ClientConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delivery options
    pub fn with_delivery(mut self, delivery: DeliveryOptions) -> Self {
        self.delivery = delivery;
        self
    }
}

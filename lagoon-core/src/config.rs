/// Options governing item buffering inside the delivery primitive
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Maximum number of items held in the backlog while no item listener is
    /// attached (None = unlimited). Exceeding the cap discards the backlog
    /// and rejects the operation at its terminal signal.
    pub max_buffered_items: Option<usize>,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            max_buffered_items: None,
        }
    }
}

impl DeliveryOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of items buffered ahead of delivery or reduction
    pub fn with_max_buffered_items(mut self, max: usize) -> Self {
        self.max_buffered_items = Some(max);
        self
    }
}

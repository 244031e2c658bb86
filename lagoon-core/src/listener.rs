use crate::error::Error;

pub(crate) type ItemListener<I> = Box<dyn FnMut(&I) + Send>;
pub(crate) type MetadataListener<M> = Box<dyn FnMut(&M) + Send>;
pub(crate) type ErrorListener = Box<dyn FnMut(&Error) + Send>;
pub(crate) type EndListener = Box<dyn FnMut() + Send>;

/// Ordered callback lists, one per signal kind.
///
/// Registration is typed; there is no string-keyed event dispatch. Callbacks
/// run synchronously under the delivery lock in registration order.
pub(crate) struct ListenerSet<I, M> {
    pub(crate) item: Vec<ItemListener<I>>,
    pub(crate) metadata: Vec<MetadataListener<M>>,
    pub(crate) error: Vec<ErrorListener>,
    pub(crate) end: Vec<EndListener>,
}

impl<I, M> ListenerSet<I, M> {
    pub(crate) fn new() -> Self {
        Self {
            item: Vec::new(),
            metadata: Vec::new(),
            error: Vec::new(),
            end: Vec::new(),
        }
    }
}

impl<I, M> std::fmt::Debug for ListenerSet<I, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("item", &self.item.len())
            .field("metadata", &self.metadata.len())
            .field("error", &self.error.len())
            .field("end", &self.end.len())
            .finish()
    }
}

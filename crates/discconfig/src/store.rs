use std::fmt;

use crate::{DiscConfig, DiscSlot};

/// Handle returned by [`ConfigStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&DiscConfig)>;

/// Owner of the live [`DiscConfig`].
///
/// Reads hand out copies, so a consumer that snapshots once per frame never
/// observes a half-applied update. Setters perform no range checks; callers
/// clamp through [`crate::limits`] first. Subscribers run synchronously, in
/// registration order, after every mutation that changes the snapshot.
pub struct ConfigStore {
    current: DiscConfig,
    revision: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &self.current)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::with_config(DiscConfig::default())
    }

    pub fn with_config(config: DiscConfig) -> Self {
        Self {
            current: config,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn snapshot(&self) -> DiscConfig {
        self.current
    }

    /// Incremented once per effective mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn size(&self, slot: DiscSlot) -> f32 {
        self.current.size(slot)
    }

    pub fn spacing(&self) -> f32 {
        self.current.spacing
    }

    pub fn eccentricity(&self) -> f32 {
        self.current.eccentricity
    }

    pub fn focal_offset(&self) -> [f32; 2] {
        self.current.focal_offset
    }

    pub fn field_of_view(&self) -> f32 {
        self.current.field_of_view
    }

    pub fn set_size(&mut self, slot: DiscSlot, size: f32) {
        self.update(|config| config.sizes[slot.index()] = size);
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        self.update(|config| config.spacing = spacing);
    }

    pub fn set_eccentricity(&mut self, eccentricity: f32) {
        self.update(|config| config.eccentricity = eccentricity);
    }

    pub fn set_focal_offset_x(&mut self, offset: f32) {
        self.update(|config| config.focal_offset[0] = offset);
    }

    pub fn set_focal_offset_y(&mut self, offset: f32) {
        self.update(|config| config.focal_offset[1] = offset);
    }

    pub fn set_field_of_view(&mut self, degrees: f32) {
        self.update(|config| config.field_of_view = degrees);
    }

    /// Restores every field to its default in a single step.
    pub fn reset(&mut self) {
        self.update(|config| *config = DiscConfig::default());
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&DiscConfig) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false when the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn update(&mut self, apply: impl FnOnce(&mut DiscConfig)) {
        let mut next = self.current;
        apply(&mut next);
        // Bitwise, so NaN over NaN is unchanged.
        if same_bits(&next, &self.current) {
            return;
        }
        self.current = next;
        self.revision += 1;
        tracing::debug!(revision = self.revision, config = ?self.current, "disc configuration changed");
        let snapshot = self.current;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&snapshot);
        }
    }
}

fn same_bits(a: &DiscConfig, b: &DiscConfig) -> bool {
    fn bits(config: &DiscConfig) -> [u32; 8] {
        [
            config.sizes[0].to_bits(),
            config.sizes[1].to_bits(),
            config.sizes[2].to_bits(),
            config.spacing.to_bits(),
            config.eccentricity.to_bits(),
            config.focal_offset[0].to_bits(),
            config.focal_offset[1].to_bits(),
            config.field_of_view.to_bits(),
        ]
    }
    bits(a) == bits(b)
}

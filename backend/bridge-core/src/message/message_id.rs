use std::collections::HashSet;

use uuid::Uuid;

/// Issues request ids and remembers which ones are still ours.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    issued: HashSet<String>,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.issued.insert(id.clone());
        id
    }

    pub fn verify(&self, message_id: &str) -> bool {
        self.issued.contains(message_id)
    }

    /// Forget an answered id. A second response carrying it counts as unknown.
    pub fn retire(&mut self, message_id: &str) {
        self.issued.remove(message_id);
    }

    pub fn clear(&mut self) {
        self.issued.clear();
    }

    pub fn outstanding(&self) -> usize {
        self.issued.len()
    }
}

/// Number of interaction summaries a bot remembers.
pub const MEMORY_SLOTS: usize = 10;
/// Longest summary (and longest consolidated view), in chars.
pub const MEMORY_SLOT_CHARS: usize = 200;
/// How much of an interaction goes into its summary.
const SUMMARY_EXCERPT_CHARS: usize = 100;

/// Per-bot circular memory of recent interactions.
///
/// Slots hold raw summaries only. The consolidated text fed back to the model
/// is derived on demand by [`MemoryStore::consolidated`] rather than written
/// over slot 0, so the history stays intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    slots: Vec<String>,
    index: usize,
    count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { slots: vec![String::new(); MEMORY_SLOTS], index: 0, count: 0 }
    }

    /// Summarize `interaction` into the slot at the current index, then advance.
    pub fn record(&mut self, interaction: &str) {
        self.slots[self.index] = summarize(interaction);
        self.index = (self.index + 1) % MEMORY_SLOTS;
        if self.count < MEMORY_SLOTS {
            self.count += 1;
        }
    }

    /// Next slot to be written.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Summaries held (saturates at `MEMORY_SLOTS`).
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        MEMORY_SLOTS
    }

    pub fn slot(&self, i: usize) -> Option<&str> {
        self.slots.get(i).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Held summaries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        let start = if self.count < MEMORY_SLOTS { 0 } else { self.index };
        let (tail, head) = self.slots.split_at(start);
        head.iter()
            .chain(tail.iter())
            .take(self.count)
            .map(String::as_str)
    }

    /// Space-joined summaries, oldest first, cut to `MEMORY_SLOT_CHARS`.
    pub fn consolidated(&self) -> String {
        let joined = self.entries().collect::<Vec<_>>().join(" ");
        truncate_chars(&joined, MEMORY_SLOT_CHARS)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `Last interaction: <first 100 chars>...`, never longer than a slot.
pub fn summarize(interaction: &str) -> String {
    let excerpt = truncate_chars(interaction, SUMMARY_EXCERPT_CHARS);
    truncate_chars(&format!("Last interaction: {excerpt}..."), MEMORY_SLOT_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

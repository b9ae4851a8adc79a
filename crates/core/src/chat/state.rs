use crate::types::ChatMessage;

/// Transcript ring capacity.
pub const CHAT_HISTORY_LIMIT: usize = 100;

/// Fixed-capacity transcript ring plus the scroll cursor of the chat view.
///
/// Writes go to `cursor`, which advances modulo capacity, so once the ring is
/// full every append overwrites the oldest entry. Scroll positions are message
/// indexes into the chronological view, clamped to
/// `[0, max(0, len - visible_height)]`.
#[derive(Debug)]
pub struct ChatState {
    slots: Vec<Option<ChatMessage>>,
    cursor: usize,
    appended: u64,
    scroll: usize,
    visible_height: usize,
}

impl ChatState {
    pub fn new() -> Self {
        Self::with_capacity(CHAT_HISTORY_LIMIT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            cursor: 0,
            appended: 0,
            scroll: 0,
            visible_height: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries currently held (never more than capacity).
    pub fn len(&self) -> usize {
        self.slots.len().min(self.appended as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    /// Appends over the room's lifetime, including overwritten ones.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    /// Next write position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Raw slot access, for inspecting the ring layout.
    pub fn slot(&self, index: usize) -> Option<&ChatMessage> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Write at the cursor, advance it, and jump the view to the newest entry.
    pub fn append(&mut self, message: ChatMessage) {
        let cap = self.slots.len();
        self.slots[self.cursor] = Some(message);
        self.cursor = (self.cursor + 1) % cap;
        self.appended += 1;
        self.scroll = self.max_scroll();
    }

    /// All held entries, oldest first. Before the first full cycle the
    /// never-written tail is skipped.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        let start = if (self.appended as usize) < self.slots.len() { 0 } else { self.cursor };
        let (tail, head) = self.slots.split_at(start);
        head.iter().chain(tail.iter()).filter_map(Option::as_ref)
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.len().saturating_sub(n);
        self.messages().skip(skip).cloned().collect()
    }

    pub fn scroll_position(&self) -> usize {
        self.scroll
    }

    pub fn visible_height(&self) -> usize {
        self.visible_height
    }

    pub fn max_scroll(&self) -> usize {
        self.len().saturating_sub(self.visible_height)
    }

    /// Resize the view; keeps the position inside the new bounds.
    pub fn set_visible_height(&mut self, height: usize) {
        let at_bottom = self.scroll >= self.max_scroll();
        self.visible_height = height.max(1);
        self.scroll = if at_bottom { self.max_scroll() } else { self.scroll.min(self.max_scroll()) };
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    /// Entries inside the current view window, oldest first.
    pub fn visible(&self) -> Vec<ChatMessage> {
        self.messages()
            .skip(self.scroll)
            .take(self.visible_height)
            .cloned()
            .collect()
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

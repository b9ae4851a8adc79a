use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use chatter_llm::ProviderKind;

use super::memory::MemoryStore;
use crate::error::RoomError;
use crate::types::{BotSnapshot, RosterEntry};

/// Most bots that may occupy the room at once.
pub const MAX_BOTS: usize = 10;

pub const ADDBOT_USAGE: &str = "/addbot <openai|anthropic> <name>";

/// Everything the room knows about one bot.
#[derive(Debug, Clone)]
pub struct BotDescriptor {
    /// Fresh for every registration; replaced by [`BotRegistry::register`].
    pub id: Uuid,
    pub name: String,
    pub provider: ProviderKind,
    pub personality: String,
    pub temperature: f32,
    pub memory: MemoryStore,
    pub total_messages: u64,
    pub is_active: bool,
    pub is_typing: bool,
}

impl BotDescriptor {
    pub fn new(name: impl Into<String>, provider: ProviderKind, personality: impl Into<String>, temperature: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider,
            personality: personality.into(),
            temperature,
            memory: MemoryStore::new(),
            total_messages: 0,
            is_active: true,
            is_typing: false,
        }
    }

    pub fn snapshot(&self) -> BotSnapshot {
        BotSnapshot {
            id: self.id,
            name: self.name.clone(),
            provider: self.provider,
            personality: self.personality.clone(),
            temperature: self.temperature,
            memory: self.memory.consolidated(),
        }
    }

    /// `/whois` report.
    pub fn whois(&self) -> String {
        format!(
            "Bot Information:\nName: {}\nAPI Type: {}\nTemperature: {:.2}\nPersonality: {}\nTotal Messages: {}\nMemory Size: {}/{}",
            self.name,
            self.provider,
            self.temperature,
            self.personality,
            self.total_messages,
            self.memory.len(),
            self.memory.capacity(),
        )
    }
}

#[derive(Debug)]
struct BotSlot {
    descriptor: BotDescriptor,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// A bot on its way out: deactivated and cancelled, loop not yet joined.
/// Its registry slot stays occupied until [`BotRegistry::release`].
#[derive(Debug)]
pub struct Departure {
    pub name: String,
    task: Option<JoinHandle<()>>,
}

impl Departure {
    /// Wait for the bot's autonomous loop to observe cancellation and exit.
    pub async fn join(self) -> String {
        if let Some(task) = self.task
            && let Err(e) = task.await
        {
            tracing::warn!(bot = %self.name, error = %e, "autonomous loop ended abnormally");
        }
        self.name
    }
}

/// Process-wide bot table.
///
/// One private lock; every method takes it, copies what it needs, and
/// releases it before returning.
#[derive(Debug)]
pub struct BotRegistry {
    slots: Mutex<Vec<BotSlot>>,
    capacity: usize,
}

impl BotRegistry {
    /// `capacity` is held to `1..=MAX_BOTS`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BOTS);
        Self { slots: Mutex::new(Vec::with_capacity(capacity)), capacity }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BotSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied slots, including bots still being kicked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.lock().iter().filter(|s| s.descriptor.is_active).count()
    }

    /// Admit a new bot. Returns the token its autonomous loop must watch.
    pub fn register(&self, mut descriptor: BotDescriptor) -> Result<CancellationToken, RoomError> {
        let mut slots = self.lock();
        if slots
            .iter()
            .any(|s| s.descriptor.is_active && s.descriptor.name == descriptor.name)
        {
            return Err(RoomError::validation(
                format!("A bot named '{}' is already in the room.", descriptor.name),
                ADDBOT_USAGE,
            ));
        }
        if slots.len() >= self.capacity {
            return Err(RoomError::Capacity("Bot limit reached.".into()));
        }
        descriptor.id = Uuid::new_v4();
        descriptor.is_active = true;
        descriptor.is_typing = false;
        let cancel = CancellationToken::new();
        slots.push(BotSlot { descriptor, cancel: cancel.clone(), task: None });
        Ok(cancel)
    }

    /// Hand the registry the bot's loop handle. If the bot was kicked in the
    /// meantime the handle comes back so the caller can join it.
    pub fn attach(&self, name: &str, task: JoinHandle<()>) -> Option<JoinHandle<()>> {
        let mut slots = self.lock();
        match slots
            .iter_mut()
            .find(|s| s.descriptor.is_active && s.descriptor.name == name && s.task.is_none())
        {
            Some(slot) => {
                slot.task = Some(task);
                None
            }
            None => Some(task),
        }
    }

    /// Flip the bot inactive and cancel its loop. The slot is kept until
    /// `release` so it cannot be reused before the loop has exited.
    pub fn deactivate(&self, name: &str) -> Result<Departure, RoomError> {
        let mut slots = self.lock();
        let slot = slots
            .iter_mut()
            .find(|s| s.descriptor.is_active && s.descriptor.name == name)
            .ok_or_else(|| RoomError::NotFound(name.to_owned()))?;
        Ok(Self::depart(slot))
    }

    /// Deactivate every active bot.
    pub fn deactivate_all(&self) -> Vec<Departure> {
        self.lock()
            .iter_mut()
            .filter(|s| s.descriptor.is_active)
            .map(Self::depart)
            .collect()
    }

    fn depart(slot: &mut BotSlot) -> Departure {
        slot.descriptor.is_active = false;
        slot.descriptor.is_typing = false;
        slot.cancel.cancel();
        Departure { name: slot.descriptor.name.clone(), task: slot.task.take() }
    }

    /// Free the slot of a joined, inactive bot.
    pub fn release(&self, name: &str) -> bool {
        let mut slots = self.lock();
        match slots
            .iter()
            .position(|s| !s.descriptor.is_active && s.descriptor.name == name)
        {
            Some(pos) => {
                slots.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.lock()
            .iter()
            .any(|s| s.descriptor.is_active && s.descriptor.name == name)
    }

    /// Active bots other than `sender`, in join order.
    pub fn candidates(&self, sender: &str) -> Vec<BotSnapshot> {
        self.lock()
            .iter()
            .filter(|s| s.descriptor.is_active && s.descriptor.name != sender)
            .map(|s| s.descriptor.snapshot())
            .collect()
    }

    pub fn snapshot(&self, name: &str) -> Option<BotSnapshot> {
        self.find_active(name, |d| d.snapshot())
    }

    pub fn descriptor(&self, name: &str) -> Option<BotDescriptor> {
        self.find_active(name, BotDescriptor::clone)
    }

    fn find_active<R>(&self, name: &str, f: impl FnOnce(&BotDescriptor) -> R) -> Option<R> {
        self.lock()
            .iter()
            .find(|s| s.descriptor.is_active && s.descriptor.name == name)
            .map(|s| f(&s.descriptor))
    }

    /// Apply `f` to the registration `id` while it is still active. Replies
    /// from a departed registration never touch a newer bot of the same name.
    fn update_registration(&self, id: Uuid, f: impl FnOnce(&mut BotDescriptor)) -> bool {
        let mut slots = self.lock();
        match slots
            .iter_mut()
            .find(|s| s.descriptor.is_active && s.descriptor.id == id)
        {
            Some(slot) => {
                f(&mut slot.descriptor);
                true
            }
            None => false,
        }
    }

    pub fn set_typing(&self, id: Uuid, typing: bool) -> bool {
        self.update_registration(id, |d| d.is_typing = typing)
    }

    /// Remember one of the bot's own turns.
    pub fn record_interaction(&self, id: Uuid, text: &str) -> bool {
        self.update_registration(id, |d| {
            d.memory.record(text);
            d.total_messages += 1;
        })
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.lock()
            .iter()
            .filter(|s| s.descriptor.is_active)
            .map(|s| RosterEntry {
                name: s.descriptor.name.clone(),
                provider: s.descriptor.provider,
                is_typing: s.descriptor.is_typing,
            })
            .collect()
    }

    pub fn personalities(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|s| s.descriptor.is_active)
            .map(|s| s.descriptor.personality.clone())
            .collect()
    }

    /// First active bot whose name starts with `partial`.
    pub fn complete_name(&self, partial: &str) -> Option<String> {
        self.lock()
            .iter()
            .filter(|s| s.descriptor.is_active)
            .map(|s| &s.descriptor.name)
            .find(|n| n.starts_with(partial))
            .cloned()
    }
}

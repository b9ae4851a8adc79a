use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chatter_llm::{LlmProvider, ProviderKind, ProviderSet};

use crate::bots::{BotDescriptor, BotRegistry, persona};
use crate::chat::{ChatState, SharedChat, TranscriptLog};
use crate::command::{Command, KickTarget};
use crate::config::RoomCfg;
use crate::dispatch::{DispatchSummary, Dispatcher, ResponsePolicy};
use crate::error::RoomError;
use crate::io::input::{self, InputSender};
use crate::io::status::{StatusBoard, StatusReceiver};
use crate::runtime::autonomy::{self, AutonomyTiming};
use crate::runtime::generator::Generator;
use crate::runtime::pool::WorkerPool;
use crate::runtime::queue::{self, Delivery};
use crate::runtime::shutdown::ShutdownGuard;
use crate::types::{ChatMessage, RosterEntry};

/// What the input loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

/// The chat room: shared transcript, bot table, and the units that move
/// messages between them.
pub struct Room {
    cfg: RoomCfg,
    chat: SharedChat,
    registry: Arc<BotRegistry>,
    status: StatusBoard,
    dispatcher: Arc<Dispatcher>,
    pool: Arc<WorkerPool>,
    utility: Arc<dyn LlmProvider>,
    timing: AutonomyTiming,
}

/// Background units of a running room, torn down in order by [`RoomRuntime::shutdown`].
pub struct RoomRuntime {
    room: Arc<Room>,
    quit: ShutdownGuard,
    input_tx: InputSender,
    input_cancel: CancellationToken,
    input_task: JoinHandle<()>,
    consumer_cancel: CancellationToken,
    consumer_task: JoinHandle<()>,
}

impl Room {
    /// Build the room and start its consumer and input loops. Must be called
    /// from inside a tokio runtime.
    ///
    /// `providers` serve bot turns; `utility` answers consults and invents
    /// personalities.
    pub fn start(
        cfg: RoomCfg,
        providers: ProviderSet,
        utility: Arc<dyn LlmProvider>,
        log: Option<TranscriptLog>,
        user_name: impl Into<String>,
    ) -> (Arc<Room>, RoomRuntime, StatusReceiver) {
        let (status, status_rx) = StatusBoard::new(user_name);
        let chat = SharedChat::new(ChatState::new(), log, status.clone());
        let registry = Arc::new(BotRegistry::new(cfg.max_bots));
        let pool = Arc::new(WorkerPool::new(cfg.max_workers));
        let (responses, response_rx) = queue::channel();

        let generator = Arc::new(Generator {
            chat: chat.clone(),
            registry: Arc::clone(&registry),
            status: status.clone(),
            providers,
            responses,
            context_messages: cfg.context_messages,
            max_tokens: cfg.response_max_tokens,
        });
        let dispatcher = Arc::new(Dispatcher {
            registry: Arc::clone(&registry),
            chat: chat.clone(),
            policy: ResponsePolicy::from_cfg(&cfg),
            oracle: Arc::clone(&utility),
            pool: Arc::clone(&pool),
            generator,
            typing_delay_ms: Dispatcher::typing_delay_from(&cfg),
        });

        let consumer_cancel = CancellationToken::new();
        let consumer_task = queue::spawn_consumer(
            response_rx,
            Delivery { chat: chat.clone(), registry: Arc::clone(&registry), status: status.clone() },
            consumer_cancel.clone(),
        );

        let room = Arc::new(Room {
            timing: AutonomyTiming::from_cfg(&cfg),
            cfg,
            chat,
            registry,
            status,
            dispatcher,
            pool,
            utility,
        });

        let quit = ShutdownGuard::new();
        let input_cancel = CancellationToken::new();
        let (input_tx, input_rx) = input::channel();
        let input_task = input::spawn_input_loop(Arc::clone(&room), input_rx, quit.clone(), input_cancel.clone());

        tracing::info!(workers = room.pool.capacity(), max_bots = room.registry.capacity(), "room started");
        let runtime = RoomRuntime {
            room: Arc::clone(&room),
            quit,
            input_tx,
            input_cancel,
            input_task,
            consumer_cancel,
            consumer_task,
        };
        (room, runtime, status_rx)
    }

    pub fn cfg(&self) -> &RoomCfg {
        &self.cfg
    }

    pub fn chat(&self) -> &SharedChat {
        &self.chat
    }

    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn user_name(&self) -> String {
        self.status.user_name()
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.registry.roster()
    }

    /// Run one line of input: a slash command or a chat message.
    /// Command errors are reported on the system channel.
    pub async fn handle_line(&self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Continue;
        }
        if !line.starts_with('/') {
            self.send_user_message(line).await;
            return LineOutcome::Continue;
        }

        let result = match Command::parse(line) {
            Ok(Command::Quit) => return LineOutcome::Quit,
            Ok(Command::AddBot { provider, name }) => self.add_bot(provider, &name).await,
            Ok(Command::Kick(KickTarget::Bot(name))) => self.kick(&name).await,
            Ok(Command::Kick(KickTarget::All)) => {
                self.kick_all().await;
                Ok(())
            }
            Ok(Command::Nick(name)) => {
                self.set_nick(&name);
                Ok(())
            }
            Ok(Command::Whois(name)) => self.whois(&name).map(|info| self.chat.system(info)),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(command = %line, error = %e, "command rejected");
            self.chat.system(e.to_string());
        }
        LineOutcome::Continue
    }

    /// Post the human's message and fan it out to the bots.
    pub async fn send_user_message(&self, text: &str) -> DispatchSummary {
        let user = self.status.user_name();
        self.chat.post(ChatMessage::user(&user, text));
        self.status.message_sent();
        self.dispatcher.dispatch(text, &user).await
    }

    /// Admit a bot, give it a personality, and start its autonomous loop.
    pub async fn add_bot(&self, provider: ProviderKind, name: &str) -> Result<(), RoomError> {
        if self.registry.len() >= self.registry.capacity() {
            return Err(RoomError::Capacity("Bot limit reached.".into()));
        }
        if self.registry.is_active(name) {
            return Err(RoomError::validation(
                format!("A bot named '{name}' is already in the room."),
                crate::bots::registry::ADDBOT_USAGE,
            ));
        }

        let personality = match persona::generate_personality(
            self.utility.as_ref(),
            &self.registry.personalities(),
            self.cfg.personality_max_tokens,
        )
        .await
        {
            Ok(p) => p,
            Err(e) => {
                let err = RoomError::from_llm(name, e);
                tracing::warn!(bot = %name, error = %err, "personality generation failed");
                self.chat.system(err.to_string());
                persona::DEFAULT_PERSONALITY.to_owned()
            }
        };

        let descriptor = BotDescriptor::new(name, provider, personality.clone(), persona::random_temperature());
        let cancel = self.registry.register(descriptor)?;
        let task = autonomy::spawn(
            name.to_owned(),
            personality,
            Arc::clone(&self.dispatcher),
            self.timing.clone(),
            cancel,
        );
        if let Some(orphan) = self.registry.attach(name, task) {
            // kicked before the handle could be stored; its token is already cancelled
            if let Err(e) = orphan.await {
                tracing::warn!(bot = %name, error = %e, "autonomous loop ended abnormally");
            }
            return Ok(());
        }

        tracing::info!(bot = %name, %provider, "bot added");
        self.status.roster_changed();
        self.chat.system(format!("Added {provider} bot '{name}'"));
        Ok(())
    }

    /// Deactivate `name`, wait for its loop to exit, then free its slot.
    pub async fn kick(&self, name: &str) -> Result<(), RoomError> {
        let departure = self.registry.deactivate(name)?;
        self.status.roster_changed();
        let name = departure.join().await;
        self.registry.release(&name);
        tracing::info!(bot = %name, "bot kicked");
        self.chat.system("Bot kicked.");
        Ok(())
    }

    /// Kick every active bot. Returns how many left.
    pub async fn kick_all(&self) -> usize {
        let departures = self.registry.deactivate_all();
        self.status.roster_changed();
        let count = departures.len();
        for departure in departures {
            let name = departure.join().await;
            self.registry.release(&name);
        }
        tracing::info!(count, "all bots kicked");
        self.chat.system("All bots kicked.");
        count
    }

    pub fn whois(&self, name: &str) -> Result<String, RoomError> {
        self.registry
            .descriptor(name)
            .map(|d| d.whois())
            .ok_or_else(|| RoomError::NotFound(name.to_owned()))
    }

    pub fn set_nick(&self, name: &str) {
        self.status.set_user_name(name);
        self.chat.system("User name changed.");
    }

    /// Complete `@partial` to the human's name or the first matching bot.
    pub fn complete_mention(&self, partial: &str) -> Option<String> {
        let user = self.status.user_name();
        if user.starts_with(partial) {
            return Some(user);
        }
        self.registry.complete_name(partial)
    }
}

impl RoomRuntime {
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Where the display surface sends finished input lines.
    pub fn input(&self) -> InputSender {
        self.input_tx.clone()
    }

    /// Tripped by `/quit`; the terminal and signal handlers trip it too.
    pub fn quit(&self) -> ShutdownGuard {
        self.quit.clone()
    }

    /// Stop input, join every bot loop, let in-flight workers finish (bounded
    /// by the configured timeout), then drain and stop the consumer.
    pub async fn shutdown(self) {
        let timeout = Duration::from_secs(self.room.cfg.shutdown_timeout_secs);

        self.input_cancel.cancel();
        if let Err(e) = self.input_task.await {
            tracing::warn!(error = %e, "input loop ended abnormally");
        }
        tracing::info!("input stopped");

        let kicked = self.room.kick_all().await;
        tracing::info!(kicked, "bot loops joined");

        self.room.pool.close();
        if tokio::time::timeout(timeout, self.room.pool.wait_idle()).await.is_err() {
            tracing::warn!(in_flight = self.room.pool.in_flight(), "workers still running at shutdown timeout");
        }

        self.consumer_cancel.cancel();
        if let Err(e) = self.consumer_task.await {
            tracing::warn!(error = %e, "response consumer ended abnormally");
        }
        tracing::info!("room stopped");
    }
}

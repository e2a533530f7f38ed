//! The interactive chat loop.
//!
//! A [`Session`] owns one [`Conversation`] plus whatever the persona needs
//! (retriever, task file, transcript directory). Each input line is parsed
//! once into a [`Command`] and dispatched; chat turns are strictly
//! sequential, each awaited before the next line is read.

use anyhow::Result;
use chrono::Local;
use memchat_core::command::{parse_command, Command};
use memchat_core::conversation::Conversation;
use memchat_core::embedding::Embedder;
use memchat_core::models::Message;
use memchat_core::persona::Persona;
use memchat_core::retrieve::Retriever;
use memchat_core::tasks::TaskBook;
use memchat_core::ChatError;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::completion::CompletionClient;
use crate::config::{Config, PersonaSettings};
use crate::ingest;
use crate::personas;
use crate::progress::ProgressReporter;
use crate::task_store::TaskStore;
use crate::transcripts;

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to print (blank line).
    Skip,
    Reply(String),
    /// Print the farewell and stop.
    Quit(String),
}

/// Run one query through `conversation`: submit, complete within
/// `timeout`, then commit the (post-processed) reply. On failure the
/// pending query is dropped and the history is left untouched.
pub async fn exchange_with<F>(
    conversation: &mut Conversation,
    client: &dyn CompletionClient,
    model: &str,
    query: &str,
    turn_system: Vec<Message>,
    timeout: Duration,
    finish: F,
) -> memchat_core::Result<String>
where
    F: FnOnce(String) -> String,
{
    let prompt = conversation.submit_with_context(query, turn_system)?;
    let result = match tokio::time::timeout(timeout, client.complete(model, &prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::CompletionFailed(format!(
            "no reply within {}s",
            timeout.as_secs()
        ))),
    };

    match result {
        Ok(reply) => {
            let reply = finish(reply);
            conversation.reply(reply.clone())?;
            Ok(reply)
        }
        Err(e) => {
            tracing::warn!(error = %e, "turn aborted");
            conversation.abort()?;
            Err(e)
        }
    }
}

pub async fn exchange(
    conversation: &mut Conversation,
    client: &dyn CompletionClient,
    model: &str,
    query: &str,
    turn_system: Vec<Message>,
    timeout: Duration,
) -> memchat_core::Result<String> {
    exchange_with(conversation, client, model, query, turn_system, timeout, |r| r).await
}

struct TaskState {
    store: TaskStore,
    book: TaskBook,
}

pub struct Session {
    persona: Persona,
    model: String,
    conversation: Conversation,
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    retriever: Option<(Retriever, i64)>,
    tasks: Option<TaskState>,
    chats_dir: Option<PathBuf>,
}

impl Session {
    pub fn new(
        persona: Persona,
        settings: PersonaSettings,
        system: Vec<Message>,
        client: Arc<dyn CompletionClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            persona,
            model: settings.model,
            conversation: Conversation::new(system, settings.history_window),
            client,
            timeout,
            retriever: None,
            tasks: None,
            chats_dir: None,
        }
    }

    /// Retrieve `k` chunks per query and pass them as turn context.
    pub fn with_retriever(mut self, retriever: Retriever, k: i64) -> Self {
        self.retriever = Some((retriever, k));
        self
    }

    pub fn with_tasks(mut self, store: TaskStore) -> Result<Self> {
        let book = store.load()?;
        self.tasks = Some(TaskState { store, book });
        Ok(self)
    }

    /// Save the transcript into `dir` when the session terminates.
    pub fn with_transcripts(mut self, dir: PathBuf) -> Self {
        self.chats_dir = Some(dir);
        self
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        let command = match parse_command(self.persona, line) {
            Ok(c) => c,
            Err(e) => return Outcome::Reply(format!("Error: {}", e)),
        };

        match command {
            Command::Empty => Outcome::Skip,
            Command::Quit => Outcome::Quit(self.finish()),
            Command::Chat(query) => match self.ask(&query).await {
                Ok(reply) => Outcome::Reply(reply),
                Err(e) => Outcome::Reply(format!("Error: {}", e)),
            },
            Command::AddTask(new) => {
                let name = new.task_name.clone();
                let project = new.project.clone();
                let today = Local::now().date_naive();
                match self.update_tasks(|book| {
                    book.add(new, today);
                    Ok(())
                }) {
                    Ok(()) => Outcome::Reply(format!(
                        "Task '{}' added to project '{}' successfully!",
                        name, project
                    )),
                    Err(e) => Outcome::Reply(format!("Error adding task: {}", e)),
                }
            }
            Command::CompleteTask(name) => {
                let today = Local::now().date_naive();
                match self.update_tasks(|book| book.complete(&name, today).map(|_| ())) {
                    Ok(()) => Outcome::Reply(format!("Task '{}' marked as complete!", name)),
                    Err(ChatError::TaskNotFound(_)) => {
                        Outcome::Reply(format!("Error: Could not find task '{}'", name))
                    }
                    Err(e) => Outcome::Reply(format!("Error completing task: {}", e)),
                }
            }
            Command::DeleteTask(name) => {
                match self.update_tasks(|book| book.delete(&name).map(|_| ())) {
                    Ok(()) => Outcome::Reply(format!(
                        "Task '{}' has been deleted from tasks file.",
                        name
                    )),
                    Err(ChatError::TaskNotFound(_)) => {
                        Outcome::Reply(format!("Error: Could not find task '{}'.", name))
                    }
                    Err(e) => Outcome::Reply(format!("Error deleting task: {}", e)),
                }
            }
            Command::ListTasks => match &self.tasks {
                Some(state) => Outcome::Reply(state.book.open_summary()),
                None => Outcome::Reply("No open tasks found.".to_string()),
            },
        }
    }

    async fn ask(&mut self, query: &str) -> memchat_core::Result<String> {
        match &self.retriever {
            Some((retriever, k)) => {
                let result = retriever.retrieve(query, *k).await?;
                let turn = personas::gtm_turn_context(&result);
                exchange_with(
                    &mut self.conversation,
                    self.client.as_ref(),
                    &self.model,
                    query,
                    turn,
                    self.timeout,
                    |reply| personas::finish_gtm_reply(reply, &result),
                )
                .await
            }
            None => {
                exchange(
                    &mut self.conversation,
                    self.client.as_ref(),
                    &self.model,
                    query,
                    Vec::new(),
                    self.timeout,
                )
                .await
            }
        }
    }

    /// Apply `op` to a copy of the task book, save it, then keep it. A
    /// failed operation or save leaves both file and memory unchanged.
    fn update_tasks<F>(&mut self, op: F) -> memchat_core::Result<()>
    where
        F: FnOnce(&mut TaskBook) -> memchat_core::Result<()>,
    {
        let state = self
            .tasks
            .as_mut()
            .ok_or_else(|| ChatError::InvalidState("no task file for this persona".to_string()))?;
        let mut book = state.book.clone();
        op(&mut book)?;
        state.store.save(&book).map_err(ChatError::storage)?;
        state.book = book;
        Ok(())
    }

    /// Terminate the conversation, saving the transcript if configured.
    fn finish(&mut self) -> String {
        let history = match self.conversation.terminate() {
            Ok(h) => h,
            Err(e) => return format!("Error: {}. Goodbye anyway!", e),
        };
        let Some(dir) = &self.chats_dir else {
            return "Goodbye!".to_string();
        };
        match transcripts::save_transcript(dir, history, Local::now().naive_local()) {
            Ok(_) => "Chat history saved. Goodbye!".to_string(),
            Err(e) => format!("Error saving chat history: {:#}. Goodbye anyway!", e),
        }
    }
}

/// Build the session for `persona` from `config`: load past transcripts,
/// open the task file, or open the GTM index as the persona requires.
pub async fn start_session(
    config: &Config,
    persona: Persona,
    client: Arc<dyn CompletionClient>,
    embedder: Arc<dyn Embedder>,
    reporter: &dyn ProgressReporter,
) -> Result<Session> {
    let settings = config.persona(persona);
    let timeout = Duration::from_secs(config.completion.timeout_secs);

    let chats_dir = config.memory.chats_dir(persona);
    let past = match &chats_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            transcripts::load_past_chats(dir, settings.max_past_chats)?
        }
        None => Vec::new(),
    };
    tracing::debug!(persona = %persona, past_chats = past.len(), "starting session");

    let system = personas::system_messages(persona, &past, Local::now().naive_local());
    let mut session = Session::new(persona, settings, system, client, timeout);

    if let Some(dir) = chats_dir {
        session = session.with_transcripts(dir);
    }
    if persona.handles_tasks() {
        session = session.with_tasks(TaskStore::new(config.memory.task_file()))?;
    }
    if persona == Persona::Gtm {
        let gtm = ingest::open_gtm_index(config, embedder, false, reporter).await?;
        session = session.with_retriever(gtm.retriever, config.retrieval.k);
    }

    Ok(session)
}

/// Read lines from `input` until a quit command, end of input or Ctrl-C,
/// writing the banner, prompts and replies to `out`.
pub async fn run_chat<R, W>(session: &mut Session, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    run_chat_until(session, input, out, tokio::signal::ctrl_c()).await
}

/// [`run_chat`] with an explicit interrupt. `interrupt` stays armed for the
/// whole session, so it also cancels a turn waiting on the model; the
/// pending query is dropped and nothing is saved.
pub async fn run_chat_until<R, W, I>(
    session: &mut Session,
    input: R,
    out: &mut W,
    interrupt: I,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Future,
{
    writeln!(out, "{}", personas::banner(session.persona()))?;
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => None,
        };
        let Some(line) = line else {
            writeln!(out, "\nGoodbye!")?;
            break;
        };

        let outcome = tokio::select! {
            outcome = session.handle_line(&line) => Some(outcome),
            _ = &mut interrupt => None,
        };
        match outcome {
            None => {
                tracing::info!("interrupted during a turn");
                writeln!(out, "\nGoodbye!")?;
                break;
            }
            Some(Outcome::Skip) => continue,
            Some(Outcome::Reply(text)) => writeln!(out, "\n{}\n", text)?,
            Some(Outcome::Quit(text)) => {
                writeln!(out, "\n{}\n", text)?;
                break;
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memchat_core::chunk::Chunker;
    use memchat_core::index::InMemoryIndex;
    use memchat_core::models::{Document, Role};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies "reply N" and records every prompt it receives.
    #[derive(Default)]
    struct ScriptedClient {
        prompts: Mutex<Vec<Vec<Message>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _model: &str, messages: &[Message]) -> memchat_core::Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(messages.to_vec());
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            if Some(last) == self.fail_on {
                return Err(ChatError::CompletionFailed("model crashed".into()));
            }
            Ok(format!("reply {}", prompts.len()))
        }
    }

    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        async fn complete(&self, _model: &str, _messages: &[Message]) -> memchat_core::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }
    }

    struct OneHotEmbedder;

    #[async_trait]
    impl Embedder for OneHotEmbedder {
        fn model_name(&self) -> &str {
            "one-hot"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, text: &str) -> memchat_core::Result<Vec<f32>> {
            if text.contains("pricing") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    fn settings(window: usize) -> PersonaSettings {
        PersonaSettings {
            model: "mistral".into(),
            history_window: window,
            max_past_chats: None,
        }
    }

    fn session(persona: Persona, client: Arc<dyn CompletionClient>) -> Session {
        Session::new(
            persona,
            settings(5),
            vec![Message::system("sys")],
            client,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn failed_completion_leaves_history_unchanged() {
        let client = Arc::new(ScriptedClient {
            fail_on: Some("boom"),
            ..Default::default()
        });
        let mut s = session(Persona::Spanish, client.clone());

        assert_eq!(s.handle_line("hola").await, Outcome::Reply("reply 1".into()));
        let out = s.handle_line("boom").await;
        assert!(matches!(out, Outcome::Reply(ref t) if t.starts_with("Error: completion failed")));
        assert_eq!(s.conversation().history().len(), 2);

        assert_eq!(s.handle_line("otra vez").await, Outcome::Reply("reply 3".into()));
        assert_eq!(s.conversation().history().len(), 4);
    }

    #[tokio::test]
    async fn timeout_becomes_completion_failure() {
        let mut conversation = Conversation::new(vec![], 5);
        let err = exchange(
            &mut conversation,
            &SlowClient,
            "m",
            "hello",
            vec![],
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::CompletionFailed(_)));
        assert!(conversation.history().is_empty());
    }

    #[tokio::test]
    async fn prompts_carry_windowed_history() {
        let client = Arc::new(ScriptedClient::default());
        let mut s = session(Persona::Tasks, client.clone());
        for q in ["one", "two", "three", "four"] {
            s.handle_line(q).await;
        }
        let prompts = client.prompts.lock().unwrap();
        let last = prompts.last().unwrap();
        // system + 5 most recent of 6 stored + query
        assert_eq!(last.len(), 7);
        assert_eq!(last[0].content, "sys");
        assert_eq!(last[1].role, Role::Assistant);
        assert_eq!(last[6], Message::user("four"));
    }

    #[tokio::test]
    async fn gtm_turn_gets_context_and_sources() {
        let client = Arc::new(ScriptedClient::default());
        let mut retriever = Retriever::new(
            Chunker::default(),
            Arc::new(OneHotEmbedder),
            Box::new(InMemoryIndex::new(2)),
        );
        retriever
            .ingest(&[
                Document::new("A.pdf", "pricing strategy"),
                Document::new("B.pdf", "hiring plan"),
            ])
            .await;
        let mut s = session(Persona::Gtm, client.clone()).with_retriever(retriever, 1);

        let out = s.handle_line("what about pricing?").await;
        assert_eq!(out, Outcome::Reply("reply 1\n\nSources: [A.pdf]".into()));

        let prompts = client.prompts.lock().unwrap();
        let turn = &prompts[0][1];
        assert_eq!(turn.role, Role::System);
        assert!(turn.content.contains("From A.pdf:\npricing strategy"));
        assert!(!turn.content.contains("B.pdf"));
        assert_eq!(
            s.conversation().history()[1].content,
            "reply 1\n\nSources: [A.pdf]"
        );
    }

    #[tokio::test]
    async fn task_commands_update_the_file() {
        let tmp = TempDir::new().unwrap();
        let store = TaskStore::new(tmp.path().join("tasks.txt"));
        let client = Arc::new(ScriptedClient::default());
        let mut s = session(Persona::Tasks, client.clone())
            .with_tasks(store)
            .unwrap();

        assert_eq!(
            s.handle_line("add task: Write report | Acme").await,
            Outcome::Reply("Task 'Write report' added to project 'Acme' successfully!".into())
        );
        let listed = s.handle_line("show tasks").await;
        assert!(matches!(listed, Outcome::Reply(ref t) if t.contains("- Write report (Due: No due date)")));

        assert_eq!(
            s.handle_line("complete task: Ghost").await,
            Outcome::Reply("Error: Could not find task 'Ghost'".into())
        );
        assert_eq!(
            s.handle_line("complete task: Write report").await,
            Outcome::Reply("Task 'Write report' marked as complete!".into())
        );

        let book = TaskStore::new(tmp.path().join("tasks.txt")).load().unwrap();
        assert!(book.open_tasks.is_empty());
        assert_eq!(book.completed_tasks.len(), 1);
        assert!(book.completed_tasks[0].complete_date.is_some());

        // task commands never reach the model
        assert!(client.prompts.lock().unwrap().is_empty());
        assert!(s.conversation().history().is_empty());
    }

    #[tokio::test]
    async fn malformed_add_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut s = session(Persona::Tasks, Arc::new(ScriptedClient::default()))
            .with_tasks(TaskStore::new(tmp.path().join("tasks.txt")))
            .unwrap();
        let out = s.handle_line("add task: only a name").await;
        assert!(matches!(out, Outcome::Reply(ref t) if t.contains("Task Name and Project Name")));
    }

    #[tokio::test]
    async fn quit_saves_transcript() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("therapyChats");
        let mut s = session(Persona::Therapy, Arc::new(ScriptedClient::default()))
            .with_transcripts(dir.clone());

        s.handle_line("I feel fine").await;
        assert_eq!(
            s.handle_line("cmd quit").await,
            Outcome::Quit("Chat history saved. Goodbye!".into())
        );

        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "User: I feel fine\nAssistant: reply 1\n"
        );
    }

    #[tokio::test]
    async fn run_chat_drives_the_loop() {
        let client = Arc::new(ScriptedClient::default());
        let mut s = session(Persona::Gtm, client);
        let input: &[u8] = b"hello\n\nQUIT\nnever read\n";
        let mut out = Vec::new();

        run_chat(&mut s, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Welcome to the GTM Strategy Assistant!"));
        assert!(text.contains("\nreply 1\n"));
        assert!(text.contains("Goodbye!"));
        assert!(!text.contains("reply 2"));
    }

    #[tokio::test]
    async fn interrupt_cancels_a_pending_turn() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("therapyChats");
        let mut s = session(Persona::Therapy, Arc::new(SlowClient)).with_transcripts(dir.clone());
        let input: &[u8] = b"are you there?\ncmd quit\n";
        let mut out = Vec::new();

        let started = std::time::Instant::now();
        run_chat_until(&mut s, input, &mut out, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\nGoodbye!\n"));
        assert!(!text.contains("too late"));
        assert!(!dir.exists());
        assert!(s.conversation().history().is_empty());
    }
}

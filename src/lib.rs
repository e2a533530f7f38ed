//! # memchat
//!
//! Local-first persona chat loops over Ollama.
//!
//! Four personas share one chat loop: a retrieval-augmented GTM strategy
//! assistant, a Spanish tutor, a task manager and a therapy assistant.
//! Each session assembles fixed system messages, a sliding window of the
//! conversation and the new query, sends them to a chat-completion
//! endpoint and prints the reply. Transcripts, tasks and the GTM index
//! persist under a single memory directory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Articles   │──▶│ Chunk+Embed │──▶│ Vector index │
//! │ PDF/txt/md  │   │  (Ollama)   │   │ SQLite-saved │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ retrieve
//!  stdin ──▶ Command ──▶ Conversation ◀──────┘
//!                │            │
//!                ▼            ▼
//!           tasks.txt    /api/chat ──▶ reply ──▶ stdout
//!                             │
//!                             ▼
//!                   spanishChats/ therapyChats/
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! memchat init                  # create memory directories and task file
//! memchat ingest                # index memory/gtm/articles
//! memchat chat gtm              # ask GTM questions with cited sources
//! memchat chat tasks            # manage tasks: add task: Name | Project
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Ollama / disabled embedders |
//! | [`completion`] | Chat-completion client |
//! | [`documents`] | Article discovery and text extraction |
//! | [`index_store`] | SQLite persistence of the vector index |
//! | [`ingest`] | Building or reusing the GTM index |
//! | [`transcripts`] | Saved chat sessions |
//! | [`task_store`] | The JSON task file |
//! | [`personas`] | Prompts and banners |
//! | [`session`] | The interactive loop |

pub mod completion;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod files;
pub mod index_store;
pub mod ingest;
pub mod personas;
pub mod progress;
pub mod search;
pub mod session;
pub mod task_store;
pub mod transcripts;

//! Prompt text and banners for the four personas.
//!
//! System messages are assembled once per session from the persona and
//! the past transcripts loaded at start-up.

use chrono::NaiveDateTime;
use memchat_core::models::{Message, RetrievalResult};
use memchat_core::persona::Persona;

use crate::transcripts::PastChat;

const GTM_SYSTEM: &str = "You are a helpful GTM (Go-to-Market) strategy assistant. \
Use the provided context to answer questions accurately. \
If you're not sure about something, admit it rather than making things up. \
Keep responses concise and focused on GTM strategy. \
Always end your response with a list of sources used, formatted as 'Sources: [file1.pdf, file2.pdf, ...]'";

const SPANISH_SYSTEM: &str = "You are a helpful Spanish (Mexican) tutor. \
In your responses, the first thing you do is translate the text from my message into Spanish. \
Then you add your conversational response - in both English and Spanish. \
So your responses should always contain (1) my message translated into Spanish, \
and then (2) your response, in both English and Spanish. \
Your response should be no more than 180 characters.";

const TASKS_SYSTEM: &str = "You are a helpful assistant.";

const THERAPY_AWARENESS: &str = "You always maintain a keen awareness of the history of the \
conversation and the user's responses. You strive to be as productive as possible - you do not \
waste time in building your understanding of the user, or in planning and executing your therapy.";

const THERAPY_SYSTEM: &str = "You are an intelligent therapist whose only goal is to improve the \
user's emotional wellbeing using evidence-based therapeutic techniques. Your goal is to identify \
concerns, develop strategies for coping with them, and promote long-lasting personal growth. \
During our sessions, you will employ various techniques such as cognitive behavioral therapy (CBT), \
dialectical behavior therapy (DBT), solution-focused brief therapy (SFBT), psychodynamic therapy, \
and mindfulness-based interventions. You will adapt these methods according to the user's unique \
needs and circumstances, while continuously monitoring the effectiveness of each technique in \
real-time. It is essential for our progress that we maintain a structured approach towards our \
sessions. This means sticking to predefined agendas and being honest with one another.";

pub fn banner(persona: Persona) -> &'static str {
    match persona {
        Persona::Gtm => {
            "\nWelcome to the GTM Strategy Assistant!\n\
             I can help answer questions about Go-to-Market strategy using our document library.\n\
             Type 'quit' to exit\n\
             \nWhat would you like to know about GTM strategy?\n"
        }
        Persona::Spanish => {
            "\nWelcome to the Spanish Chat System!\n\
             - Chat naturally with the system\n\
             - Type 'cmd quit' to save and exit\n\
             \nWhat would you like to talk about?\n"
        }
        Persona::Tasks => {
            "\nWelcome to the Task Management Chat System!\n\
             You can:\n\
             - Chat naturally with the system\n\
             - Add tasks using: add task: Task Name | Project Name | [Description] | [Due Date] | [[links]]\n\
             - Complete tasks using: complete task: task_name\n\
             - Delete tasks using: delete task: task_name\n\
             - List open tasks using: show tasks\n\
             - Type 'quit' to exit\n\
             \nWhat would you like to do?\n"
        }
        Persona::Therapy => {
            "\nWelcome to the Therapy Chat System!\n\
             - Chat naturally with the system\n\
             - Type 'cmd quit' to save and exit\n\
             \nWhat would you like to talk about?\n"
        }
    }
}

/// Session-scoped system messages for `persona`.
pub fn system_messages(persona: Persona, past: &[PastChat], now: NaiveDateTime) -> Vec<Message> {
    match persona {
        Persona::Gtm => vec![Message::system(GTM_SYSTEM)],
        Persona::Tasks => vec![Message::system(TASKS_SYSTEM)],
        Persona::Spanish => vec![
            Message::system(SPANISH_SYSTEM),
            Message::system(format!(
                "Here are the most recent previous conversations for context:\n{}",
                spanish_history(past)
            )),
        ],
        Persona::Therapy => {
            let mut history = String::from("Here are the previous chat sessions for context:\n");
            history.push_str(&therapy_history(past));
            if let Some(days) = days_since_last_session(past, now) {
                history.push_str(&format!(
                    "\n\nIt has been {} day{} since the last session.",
                    days,
                    if days == 1 { "" } else { "s" }
                ));
            }
            vec![
                Message::system(THERAPY_AWARENESS),
                Message::system(THERAPY_SYSTEM),
                Message::system(history),
            ]
        }
    }
}

fn spanish_history(past: &[PastChat]) -> String {
    past.iter()
        .map(|c| format!("\nChat History {}:\n{}\n---", c.file_name, c.body))
        .collect::<Vec<_>>()
        .join("\n")
}

fn therapy_history(past: &[PastChat]) -> String {
    past.iter()
        .filter_map(|c| {
            let started = c.started_at?;
            Some(format!(
                "\nChat History from {}:\n{}\n---",
                started.format("%Y-%m-%d %H:%M"),
                c.body
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whole days between the latest transcript timestamp and `now`.
pub fn days_since_last_session(past: &[PastChat], now: NaiveDateTime) -> Option<i64> {
    let latest = past.iter().filter_map(|c| c.started_at).max()?;
    Some((now - latest).num_days().max(0))
}

/// Per-turn system block carrying the retrieved GTM context.
pub fn gtm_turn_context(result: &RetrievalResult) -> Vec<Message> {
    vec![Message::system(format!(
        "Here is the relevant context from the GTM documents:\n\n{}\n\n\
         Remember to cite these sources at the end of your response: {}",
        result.context,
        result.sources_list()
    ))]
}

/// Append the source list when the model did not end with one.
pub fn finish_gtm_reply(reply: String, result: &RetrievalResult) -> String {
    if reply.trim_end().ends_with(']') {
        reply
    } else {
        format!("{}\n\nSources: {}", reply, result.sources_list())
    }
}

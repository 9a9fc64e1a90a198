//! Page rendering with Handlebars. Model output is untrusted, and
//! Handlebars escapes every `{{value}}` as HTML unless told
//! otherwise, which we never do.

use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;

use crate::chat::{Role, Transcript};
use crate::core::AppConfig;

const CHAT_PAGE: &str = "chat";
const CHAT_TEMPLATE: &str = include_str!("templates/chat.hbs");

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .register_template_string(CHAT_PAGE, CHAT_TEMPLATE)
        .expect("Failed to register template");
    registry
}

#[derive(Serialize)]
struct TurnView<'a> {
    role: Role,
    is_user: bool,
    label: &'a str,
    // 1-based position among turns of the same role
    number: usize,
    content: &'a str,
}

#[derive(Serialize)]
pub struct ChatPage<'a> {
    title: &'a str,
    description: String,
    placeholder: &'a str,
    turns: Vec<TurnView<'a>>,
    notice: Option<&'a str>,
}

impl<'a> ChatPage<'a> {
    pub fn new(config: &'a AppConfig, transcript: &'a Transcript, notice: Option<&'a str>) -> Self {
        // Failed exchanges leave user turns back to back, so each role
        // keeps its own count
        let (mut users, mut replies) = (0, 0);
        let turns = transcript
            .iter()
            .map(|turn| {
                let (label, number) = match turn.role {
                    Role::User => {
                        users += 1;
                        ("User", users)
                    }
                    Role::Assistant => {
                        replies += 1;
                        (config.assistant_label.as_str(), replies)
                    }
                };
                TurnView {
                    role: turn.role,
                    is_user: turn.role == Role::User,
                    label,
                    number,
                    content: &turn.content,
                }
            })
            .collect();

        Self {
            title: &config.page_title,
            description: format!(
                "A basic chatbot built on the {} API.",
                config.assistant_label
            ),
            placeholder: "Type a message...",
            turns,
            notice,
        }
    }
}

pub fn render_chat_page(
    registry: &Handlebars<'_>,
    config: &AppConfig,
    transcript: &Transcript,
    notice: Option<&str>,
) -> Result<String> {
    let page = ChatPage::new(config, transcript, notice);
    Ok(registry.render(CHAT_PAGE, &page)?)
}

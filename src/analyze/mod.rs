// src/analyze/mod.rs
//! LLM summarization of social posts: prompt input assembly + provider adapters.

pub mod ai_adapter;

pub use ai_adapter::{build_summarizer, DynSummarizer, MockProvider, Summarizer, SummaryKind};

use crate::ingest::types::SocialPost;

/// Render posts into the text blob handed to the summarizer.
///
/// Each post becomes `Post {n}:\nTitle: {title}\nText: {text}` (1-based `n`);
/// posts are separated by one blank line.
pub fn render_posts(posts: &[SocialPost]) -> String {
    posts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Post {}:\nTitle: {}\nText: {}", i + 1, p.title, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

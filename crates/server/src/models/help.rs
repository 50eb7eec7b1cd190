//! Help-center articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thriftstore_core::ArticleId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpArticle {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub body_markdown: String,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHelpArticle {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub body_markdown: String,
    pub published: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpArticleForm {
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub body_markdown: String,
    #[serde(default)]
    pub published: bool,
}

fn default_category() -> String {
    "General".to_owned()
}

/// An article with its markdown rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedArticle {
    #[serde(flatten)]
    pub article: HelpArticle,
    pub body_html: String,
}

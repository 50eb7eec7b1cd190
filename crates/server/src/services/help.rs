//! Help-center articles with markdown bodies.

use comrak::{Options, markdown_to_html};
use tracing::instrument;

use thriftstore_core::ArticleId;

use super::{non_blank, slugify};
use crate::db::{ContentStore, RepositoryError};
use crate::error::{AppError, FieldErrors};
use crate::models::{HelpArticle, HelpArticleForm, NewHelpArticle, RenderedArticle};

pub struct HelpService<'a> {
    content: &'a dyn ContentStore,
}

impl<'a> HelpService<'a> {
    #[must_use]
    pub const fn new(content: &'a dyn ContentStore) -> Self {
        Self { content }
    }

    /// All articles for the back office.
    pub async fn list_all(&self) -> Result<Vec<HelpArticle>, AppError> {
        Ok(self.content.list_articles().await?)
    }

    /// Published articles, optionally searched by title, category and body.
    pub async fn list_published(&self, search: Option<&str>) -> Result<Vec<HelpArticle>, AppError> {
        let query = non_blank(search).map(|q| q.to_lowercase());
        let articles = self.content.list_articles().await?;
        Ok(articles
            .into_iter()
            .filter(|a| a.published)
            .filter(|a| {
                query.as_deref().is_none_or(|q| {
                    a.title.to_lowercase().contains(q)
                        || a.category.to_lowercase().contains(q)
                        || a.body_markdown.to_lowercase().contains(q)
                })
            })
            .collect())
    }

    /// A published article with its body rendered to HTML.
    pub async fn published_article(&self, slug: &str) -> Result<RenderedArticle, AppError> {
        let article = self
            .content
            .find_article_by_slug(slug)
            .await?
            .filter(|a| a.published)
            .ok_or_else(|| AppError::NotFound(format!("help article '{slug}'")))?;
        Ok(render(article))
    }

    pub async fn get(&self, id: ArticleId) -> Result<HelpArticle, AppError> {
        self.content
            .get_article(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("help article {id}")))
    }

    #[instrument(skip(self, form), fields(title = %form.title))]
    pub async fn create(&self, form: HelpArticleForm) -> Result<HelpArticle, AppError> {
        let (title, slug) = validate(&form)?;
        let article = self
            .content
            .insert_article(NewHelpArticle {
                title,
                slug,
                category: category_or_default(&form.category),
                body_markdown: form.body_markdown,
                published: form.published,
            })
            .await
            .map_err(title_conflict)?;
        Ok(article)
    }

    pub async fn update(
        &self,
        id: ArticleId,
        form: HelpArticleForm,
    ) -> Result<HelpArticle, AppError> {
        let existing = self.get(id).await?;
        let (title, slug) = validate(&form)?;
        let updated = HelpArticle {
            title,
            slug,
            category: category_or_default(&form.category),
            body_markdown: form.body_markdown,
            published: form.published,
            updated_at: chrono::Utc::now(),
            ..existing
        };
        self.content
            .update_article(&updated)
            .await
            .map_err(title_conflict)?;
        Ok(updated)
    }

    pub async fn delete(&self, id: ArticleId) -> Result<(), AppError> {
        self.content.delete_article(id).await?;
        Ok(())
    }
}

/// Render markdown with raw HTML left escaped.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    markdown_to_html(markdown, &options)
}

fn render(article: HelpArticle) -> RenderedArticle {
    RenderedArticle {
        body_html: render_markdown(&article.body_markdown),
        article,
    }
}

fn validate(form: &HelpArticleForm) -> Result<(String, String), AppError> {
    let mut errors = FieldErrors::new();
    let title = form.title.trim().to_owned();
    let slug = slugify(&title);
    if slug.is_empty() {
        errors.add("title", "title is required");
    }
    if form.body_markdown.trim().is_empty() {
        errors.add("body_markdown", "article body is required");
    }
    errors.into_result()?;
    Ok((title, slug))
}

fn category_or_default(category: &str) -> String {
    non_blank(Some(category)).unwrap_or_else(|| "General".to_owned())
}

fn title_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(_) => {
            AppError::field("title", "an article with this title already exists")
        }
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn form(title: &str, published: bool) -> HelpArticleForm {
        HelpArticleForm {
            title: title.to_owned(),
            category: "Orders".to_owned(),
            body_markdown: "## Returns\n\nBring the **receipt** within 7 days.\n\n<script>x</script>"
                .to_owned(),
            published,
        }
    }

    #[test]
    fn test_markdown_renders_and_escapes_raw_html() {
        let html = render_markdown("**bold** <b>raw</b>");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<b>raw</b>"));
    }

    #[tokio::test]
    async fn test_storefront_sees_published_only() {
        let store = MemoryStore::new();
        let service = HelpService::new(&store);
        service.create(form("How do returns work?", true)).await.unwrap();
        service.create(form("Draft shipping FAQ", false)).await.unwrap();

        let listed = service.list_published(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(service.list_published(Some("RECEIPT")).await.unwrap().len(), 1);
        assert!(service.list_published(Some("nothing")).await.unwrap().is_empty());

        let article = service
            .published_article("how-do-returns-work")
            .await
            .unwrap();
        assert!(article.body_html.contains("<h2>Returns</h2>"));
        assert!(!article.body_html.contains("<script>"));
        assert!(matches!(
            service.published_article("draft-shipping-faq").await,
            Err(AppError::NotFound(_))
        ));
    }
}

//! Campaign and help article queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use thriftstore_core::{ArticleId, CampaignId};

use super::{PgStore, conflict_or_database, parse_column, require_affected};
use crate::db::{ContentStore, RepoResult, RepositoryError};
use crate::models::{Campaign, HelpArticle, NewCampaign, NewHelpArticle};

#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    id: i32,
    name: String,
    channel: String,
    discount_code: Option<String>,
    discount_percent: Option<i32>,
    message: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = RepositoryError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CampaignId::new(row.id),
            name: row.name,
            channel: parse_column("channel", &row.channel)?,
            discount_code: row.discount_code,
            discount_percent: row.discount_percent,
            message: row.message,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    id: i32,
    title: String,
    slug: String,
    category: String,
    body_markdown: String,
    published: bool,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for HelpArticle {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: ArticleId::new(row.id),
            title: row.title,
            slug: row.slug,
            category: row.category,
            body_markdown: row.body_markdown,
            published: row.published,
            updated_at: row.updated_at,
        }
    }
}

const CAMPAIGN_COLUMNS: &str =
    "id, name, channel, discount_code, discount_percent, message, starts_at, ends_at, created_at";
const ARTICLE_COLUMNS: &str = "id, title, slug, category, body_markdown, published, updated_at";

#[async_trait]
impl ContentStore for PgStore {
    async fn list_campaigns(&self) -> RepoResult<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY starts_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn insert_campaign(&self, campaign: NewCampaign) -> RepoResult<Campaign> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r"
            INSERT INTO campaigns (name, channel, discount_code, discount_percent, message,
                                   starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CAMPAIGN_COLUMNS}
            "
        ))
        .bind(&campaign.name)
        .bind(campaign.channel.as_str())
        .bind(&campaign.discount_code)
        .bind(campaign.discount_percent)
        .bind(&campaign.message)
        .bind(campaign.starts_at)
        .bind(campaign.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "discount code already exists"))?;
        row.try_into()
    }

    async fn update_campaign(&self, campaign: &Campaign) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE campaigns
            SET name = $2, channel = $3, discount_code = $4, discount_percent = $5,
                message = $6, starts_at = $7, ends_at = $8
            WHERE id = $1
            ",
        )
        .bind(campaign.id.as_i32())
        .bind(&campaign.name)
        .bind(campaign.channel.as_str())
        .bind(&campaign.discount_code)
        .bind(campaign.discount_percent)
        .bind(&campaign.message)
        .bind(campaign.starts_at)
        .bind(campaign.ends_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "discount code already exists"))?;
        require_affected(result.rows_affected())
    }

    async fn delete_campaign(&self, id: CampaignId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    async fn list_articles(&self) -> RepoResult<Vec<HelpArticle>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM help_articles ORDER BY category, title"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_article(&self, id: ArticleId) -> RepoResult<Option<HelpArticle>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM help_articles WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_article_by_slug(&self, slug: &str) -> RepoResult<Option<HelpArticle>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM help_articles WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_article(&self, article: NewHelpArticle) -> RepoResult<HelpArticle> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            r"
            INSERT INTO help_articles (title, slug, category, body_markdown, published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ARTICLE_COLUMNS}
            "
        ))
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.category)
        .bind(&article.body_markdown)
        .bind(article.published)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "article slug already exists"))?;
        Ok(row.into())
    }

    async fn update_article(&self, article: &HelpArticle) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE help_articles
            SET title = $2, slug = $3, category = $4, body_markdown = $5, published = $6,
                updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(article.id.as_i32())
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.category)
        .bind(&article.body_markdown)
        .bind(article.published)
        .bind(article.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "article slug already exists"))?;
        require_affected(result.rows_affected())
    }

    async fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM help_articles WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        require_affected(result.rows_affected())
    }
}

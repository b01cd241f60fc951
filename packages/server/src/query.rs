//! Read side: listings, search and the join-table accessors used to decorate
//! samples with likes and tags.

use std::collections::HashMap;

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::*;

use crate::entity::{sample, sample_like, sample_tag, source, tag};
use crate::error::AppError;
use crate::models::sample::{SampleSummary, escape_like};
use crate::models::tag::TagResponse;

/// Size of the recent and top lists on the home page.
pub const HOME_LIST_LEN: u64 = 8;
pub const SEARCH_LIMIT: u64 = 50;
pub const SOURCE_SEARCH_LIMIT: u64 = 10;

const LIKE_COUNT_SQL: &str =
    "(SELECT COUNT(*) FROM sample_like WHERE sample_like.sample_id = sample.id)";

/// Order of sample listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleSort {
    /// Newest upload first.
    Latest,
    /// Oldest upload first.
    Oldest,
    /// Most likes first; ties by ascending id.
    #[default]
    MostLiked,
    /// Ascending id.
    None,
}

impl SampleSort {
    /// Parse a query-string value. Unknown values mean no particular order.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "latest" => Self::Latest,
            "oldest" => Self::Oldest,
            "liked" => Self::MostLiked,
            _ => Self::None,
        }
    }

    fn apply(self, select: Select<sample::Entity>) -> Select<sample::Entity> {
        match self {
            Self::Latest => select
                .order_by_desc(sample::Column::UploadDate)
                .order_by_desc(sample::Column::Id),
            Self::Oldest => select
                .order_by_asc(sample::Column::UploadDate)
                .order_by_asc(sample::Column::Id),
            Self::MostLiked => select
                .order_by(Expr::cust(LIKE_COUNT_SQL), Order::Desc)
                .order_by_asc(sample::Column::Id),
            Self::None => select.order_by_asc(sample::Column::Id),
        }
    }
}

fn public_samples() -> Select<sample::Entity> {
    sample::Entity::find().filter(sample::Column::IsPublic.eq(true))
}

/// Offset of the first row of a 1-based page.
pub fn page_offset(page: u64, per_page: u64) -> Result<u64, AppError> {
    if page == 0 {
        return Err(AppError::Validation("Page numbers start at 1".into()));
    }
    (page - 1)
        .checked_mul(per_page)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| AppError::Validation("Page out of range".into()))
}

pub fn page_count(total: u64, per_page: u64) -> u64 {
    total.div_ceil(Ord::max(per_page, 1))
}

pub async fn count_public_samples<C: ConnectionTrait>(db: &C) -> Result<u64, AppError> {
    Ok(public_samples().count(db).await?)
}

/// One page of public samples.
pub async fn list_samples<C: ConnectionTrait>(
    db: &C,
    sort: SampleSort,
    page: u64,
    per_page: u64,
) -> Result<Vec<sample::Model>, AppError> {
    let offset = page_offset(page, per_page)?;
    Ok(sort
        .apply(public_samples())
        .offset(Some(offset))
        .limit(Some(per_page))
        .all(db)
        .await?)
}

pub async fn recent_samples<C: ConnectionTrait>(
    db: &C,
    n: u64,
) -> Result<Vec<sample::Model>, AppError> {
    list_samples(db, SampleSort::Latest, 1, n).await
}

pub async fn top_samples<C: ConnectionTrait>(
    db: &C,
    n: u64,
) -> Result<Vec<sample::Model>, AppError> {
    list_samples(db, SampleSort::MostLiked, 1, n).await
}

/// Public samples whose display name contains `q`, newest first.
pub async fn search_samples<C: ConnectionTrait>(
    db: &C,
    q: &str,
) -> Result<Vec<sample::Model>, AppError> {
    let term = escape_like(q.trim());
    Ok(public_samples()
        .filter(
            Expr::expr(Func::lower(Expr::col(sample::Column::Filename)))
                .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
        )
        .order_by_desc(sample::Column::UploadDate)
        .order_by_desc(sample::Column::Id)
        .limit(Some(SEARCH_LIMIT))
        .all(db)
        .await?)
}

pub async fn list_sources<C: ConnectionTrait>(db: &C) -> Result<Vec<source::Model>, AppError> {
    Ok(source::Entity::find()
        .order_by_asc(source::Column::Name)
        .all(db)
        .await?)
}

/// Sources whose name contains `q`, for autocompletion.
pub async fn search_sources<C: ConnectionTrait>(
    db: &C,
    q: &str,
) -> Result<Vec<source::Model>, AppError> {
    let term = escape_like(q.trim());
    Ok(source::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col(source::Column::Name)))
                .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
        )
        .order_by_asc(source::Column::Name)
        .limit(Some(SOURCE_SEARCH_LIMIT))
        .all(db)
        .await?)
}

/// Public samples of a source, newest first.
pub async fn source_samples<C: ConnectionTrait>(
    db: &C,
    source_id: i32,
) -> Result<Vec<sample::Model>, AppError> {
    Ok(SampleSort::Latest
        .apply(public_samples().filter(sample::Column::SourceId.eq(source_id)))
        .all(db)
        .await?)
}

/// All samples of a user, newest first. Private ones only when requested.
pub async fn user_samples<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    include_private: bool,
) -> Result<Vec<sample::Model>, AppError> {
    let mut select = sample::Entity::find().filter(sample::Column::UploaderId.eq(user_id));
    if !include_private {
        select = select.filter(sample::Column::IsPublic.eq(true));
    }
    Ok(SampleSort::Latest.apply(select).all(db).await?)
}

pub async fn like_count<C: ConnectionTrait>(db: &C, sample_id: i32) -> Result<i64, AppError> {
    let count = sample_like::Entity::find()
        .filter(sample_like::Column::SampleId.eq(sample_id))
        .count(db)
        .await?;
    Ok(count as i64)
}

pub async fn has_liked<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    sample_id: i32,
) -> Result<bool, AppError> {
    Ok(sample_like::Entity::find_by_id((user_id, sample_id))
        .one(db)
        .await?
        .is_some())
}

/// Like counts keyed by sample id. Samples without likes are absent.
pub async fn like_counts<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<HashMap<i32, i64>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = sample_like::Entity::find()
        .select_only()
        .column(sample_like::Column::SampleId)
        .column_as(
            Expr::expr(Func::count(Expr::col(sample_like::Column::UserId))),
            "likes",
        )
        .filter(sample_like::Column::SampleId.is_in(ids.iter().copied()))
        .group_by(sample_like::Column::SampleId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Tags keyed by sample id, each list sorted by name.
pub async fn tags_for<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<HashMap<i32, Vec<TagResponse>>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sample_tag::Entity::find()
        .filter(sample_tag::Column::SampleId.is_in(ids.iter().copied()))
        .find_also_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;

    let mut map: HashMap<i32, Vec<TagResponse>> = HashMap::new();
    for (link, tag) in rows {
        if let Some(tag) = tag {
            map.entry(link.sample_id).or_default().push(TagResponse {
                id: tag.id,
                name: tag.name,
            });
        }
    }
    Ok(map)
}

/// Attach like counts and tag names to a list of samples, keeping order.
pub async fn summarize<C: ConnectionTrait>(
    db: &C,
    samples: Vec<sample::Model>,
) -> Result<Vec<SampleSummary>, AppError> {
    let ids: Vec<i32> = samples.iter().map(|s| s.id).collect();
    let likes = like_counts(db, &ids).await?;
    let mut tags = tags_for(db, &ids).await?;

    Ok(samples
        .into_iter()
        .map(|s| {
            let count = likes.get(&s.id).copied().unwrap_or(0);
            let names = tags
                .remove(&s.id)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.name)
                .collect();
            SampleSummary::new(s, count, names)
        })
        .collect())
}

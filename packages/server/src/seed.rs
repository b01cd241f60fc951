use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder,
    SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::AdminBootstrap;
use crate::entity::{sample, sample_like, sample_tag, tag_category, user};
use crate::utils::hash;

/// Tag categories seeded on startup. The first one receives new tags.
const DEFAULT_CATEGORIES: &[&str] = &[
    tag_category::DEFAULT_CATEGORY,
    "meta",
    "character",
    "instrument",
    "series",
];

/// Seed the `tag_category` table with defaults.
pub async fn seed_tag_categories(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0u32;
    for &name in DEFAULT_CATEGORIES {
        let model = tag_category::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        let result = tag_category::Entity::insert(model)
            .on_conflict(
                OnConflict::column(tag_category::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new tag categories", inserted);
    }
    Ok(())
}

/// Create the configured admin account unless the username is taken.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: Option<&AdminBootstrap>,
) -> anyhow::Result<()> {
    let Some(admin) = admin else {
        return Ok(());
    };

    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(admin.username.as_str()))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let password = hash::hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;
    user::ActiveModel {
        username: Set(admin.username.clone()),
        email: Set(admin.email.clone()),
        password: Set(password),
        is_admin: Set(true),
        is_uploader: Set(true),
        is_verified: Set(true),
        join_date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(username = %admin.username, "Created admin account");
    Ok(())
}

fn index_sql(backend: DbBackend, stmt: &IndexCreateStatement) -> String {
    match backend {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(SqliteQueryBuilder),
    }
}

/// Ensure lookup indexes exist.
///
/// Schema sync only creates the primary keys of the join tables, which
/// lead with the other column.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        // Like counts per sample.
        Index::create()
            .if_not_exists()
            .name("idx_sample_like_sample")
            .table(sample_like::Entity)
            .col(sample_like::Column::SampleId)
            .to_owned(),
        // Samples per tag.
        Index::create()
            .if_not_exists()
            .name("idx_sample_tag_tag")
            .table(sample_tag::Entity)
            .col(sample_tag::Column::TagId)
            .to_owned(),
        // Public listings ordered by date.
        Index::create()
            .if_not_exists()
            .name("idx_sample_public_date")
            .table(sample::Entity)
            .col(sample::Column::IsPublic)
            .col(sample::Column::UploadDate)
            .to_owned(),
    ];

    let backend = db.get_database_backend();
    for stmt in &indexes {
        let sql = index_sql(backend, stmt);
        match db.execute_unprepared(&sql).await {
            Ok(_) => {}
            Err(e) => tracing::warn!(sql = %sql, "Failed to create index: {}", e),
        }
    }
    Ok(())
}

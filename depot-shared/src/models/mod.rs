/// Database models
///
/// Row types and the SQL that reads and writes them. Every function takes a
/// `&mut PgConnection`, so it runs equally on a pooled connection or inside an
/// open transaction (`&mut *tx`).
///
/// # Models
///
/// - `user`: user accounts and their default e-mail address
/// - `project`: projects and their lifecycle status
/// - `role`: the fixed role reference set
/// - `membership`: user-project links and their member roles
///
/// # Example
///
/// ```no_run
/// use depot_shared::models::project::Project;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
/// for project in Project::list(&mut conn, 50, 0).await? {
///     println!("{}: {}", project.code, project.name);
/// }
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod project;
pub mod role;
pub mod user;

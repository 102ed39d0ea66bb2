/// Row type for the `notified_events` table.
#[derive(Debug, sqlx::FromRow)]
pub struct NotifiedRow {
    pub id: i64,
    pub notified: bool,
}

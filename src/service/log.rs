use chrono::{Duration, Utc};

use crate::error::Result;
use crate::models::Log;

use super::access::EntityAccessService;

/// How far back [`LogService::actual`] looks.
const ACTUAL_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct LogService {
    logs: EntityAccessService<Log>,
}

impl LogService {
    pub fn new(logs: EntityAccessService<Log>) -> Self {
        Self { logs }
    }

    pub fn access(&self) -> &EntityAccessService<Log> {
        &self.logs
    }

    /// Logs written during the last 24 hours, newest first.
    pub async fn actual(&self) -> Result<Vec<Log>> {
        let since = Utc::now() - Duration::hours(ACTUAL_WINDOW_HOURS);
        let mut logs = self.logs.find(|log| log.action_date >= since).await?;
        logs.sort_by(|a, b| b.action_date.cmp(&a.action_date));
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, LogDraft};
    use crate::service::testing;

    #[tokio::test]
    async fn test_actual_skips_old_logs() {
        let ctx = testing::context().await;
        let draft = |action: &str| LogDraft {
            action: action.to_string(),
            user_name: "jane".to_string(),
            serialized_data: String::new(),
        };
        ctx.services.logs.access().create(draft("recent")).await.unwrap();

        let mut old = Log::create("old".to_string(), draft("old"));
        old.action_date = Utc::now() - Duration::hours(ACTUAL_WINDOW_HOURS + 1);
        ctx.stores.logs.create(&old).await.unwrap();

        let actual = ctx.services.logs.actual().await.unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].action, "recent");
        assert_eq!(ctx.services.logs.access().get_all().await.unwrap().len(), 2);
    }
}

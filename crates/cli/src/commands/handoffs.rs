use std::sync::Arc;

use serde_json::{json, Value};
use switchboard_core::config::AppConfig;
use switchboard_core::errors::PersistenceError;
use switchboard_core::handoff::{HandoffProtocol, HandoffStore};
use switchboard_db::{migrations, SqlHandoffRepository};

use crate::commands::{async_runtime, load_config, open_pool, CommandResult};

type Failure = (&'static str, String, u8);

pub fn history(session_id: &str) -> CommandResult {
    with_handoffs("handoffs.history", |handoffs| {
        let session_id = session_id.to_owned();
        async move {
            let records: Vec<Value> = handoffs
                .protocol
                .get_handoff_history(&session_id)
                .await
                .into_iter()
                .map(|request| {
                    json!({
                        "from_agent_id": request.from_agent_id,
                        "from_agent_name": request.from_agent_name,
                        "to_agent_id": request.to_agent_id,
                        "to_agent_name": request.to_agent_name,
                        "reason": request.reason,
                        "urgency": request.urgency.as_str(),
                        "summary": request.conversation_context.conversation_summary,
                    })
                })
                .collect();
            let message = format!("{} handoffs for session `{session_id}`", records.len());
            Ok((message, Some(json!({ "session_id": session_id, "handoffs": records }))))
        }
    })
}

/// Deletes through the store directly so a failed delete is reported.
pub fn clear(session_id: Option<&str>, all: bool) -> CommandResult {
    match (session_id, all) {
        (Some(_), true) | (None, false) => CommandResult::failure(
            "handoffs.clear",
            "usage",
            "pass either a session id or --all",
            2,
        ),
        (Some(session_id), false) => with_handoffs("handoffs.clear", |handoffs| {
            let session_id = session_id.to_owned();
            async move {
                let removed = handoffs
                    .store
                    .delete_handoffs_by_session(&session_id)
                    .await
                    .map_err(persistence_failure)?;
                let message = format!("cleared {removed} handoffs for session `{session_id}`");
                Ok((message, Some(json!({ "session_id": session_id, "removed": removed }))))
            }
        }),
        (None, true) => with_handoffs("handoffs.clear", |handoffs| async move {
            let removed =
                handoffs.store.delete_all_handoffs().await.map_err(persistence_failure)?;
            Ok((format!("cleared {removed} handoffs"), Some(json!({ "removed": removed }))))
        }),
    }
}

struct Handoffs {
    protocol: HandoffProtocol,
    store: Arc<SqlHandoffRepository>,
}

fn persistence_failure(error: PersistenceError) -> Failure {
    ("persistence", error.to_string(), 6)
}

fn with_handoffs<F, Fut>(command: &str, action: F) -> CommandResult
where
    F: FnOnce(Handoffs) -> Fut,
    Fut: std::future::Future<Output = Result<(String, Option<Value>), Failure>>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let handoffs = open_handoffs(&config).await?;
        action(handoffs).await
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data(command, message, data),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

async fn open_handoffs(config: &AppConfig) -> Result<Handoffs, Failure> {
    let pool = open_pool(config).await?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    let store = Arc::new(SqlHandoffRepository::new(pool));
    let protocol = HandoffProtocol::new(store.clone(), &config.handoff);
    Ok(Handoffs { protocol, store })
}

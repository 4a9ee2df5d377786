use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::EditError;
use crate::notify::discord::{MessageHandle, MessageSink};
use crate::notify::render::{time_ago, TIME_FIELD_INDEX};

/// What a live-update task owns for its message
struct NotificationState {
    handle: MessageHandle,
    created_at: DateTime<Utc>,
}

/// Keep the "time uploaded" field of a sent message current.
///
/// The task edits the message every `period` and ends on its own once the
/// message is gone, not editable by us, or too old to edit. Nobody awaits it.
pub fn spawn(
    sink: Arc<dyn MessageSink>,
    handle: MessageHandle,
    created_at: DateTime<Utc>,
    period: Duration,
) -> JoinHandle<()> {
    spawn_with_clock(sink, handle, created_at, period, Utc::now)
}

fn spawn_with_clock<C>(
    sink: Arc<dyn MessageSink>,
    handle: MessageHandle,
    created_at: DateTime<Utc>,
    period: Duration,
    clock: C,
) -> JoinHandle<()>
where
    C: Fn() -> DateTime<Utc> + Send + 'static,
{
    let state = NotificationState { handle, created_at };
    tokio::spawn(run(sink, state, period, clock))
}

async fn run<C>(sink: Arc<dyn MessageSink>, mut state: NotificationState, period: Duration, clock: C)
where
    C: Fn() -> DateTime<Utc> + Send,
{
    loop {
        tokio::time::sleep(period).await;

        let value = time_ago(state.created_at, clock());
        match sink
            .edit_field(&mut state.handle, TIME_FIELD_INDEX, value)
            .await
        {
            Ok(()) => debug!("Refreshed upload time on message {}", state.handle.message_id),
            Err(EditError::NotFound) => {
                debug!("Message {} was deleted, stopping updates", state.handle.message_id);
                break;
            }
            Err(EditError::Forbidden) => {
                error!(
                    "Missing permissions to edit message {}, stopping updates",
                    state.handle.message_id
                );
                break;
            }
            Err(EditError::TooOld) => {
                info!("Message {} is too old to edit, stopping updates", state.handle.message_id);
                break;
            }
            Err(e) => error!("Failed to edit message {}: {}", state.handle.message_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::notify::render::{Field, Message, TIME_FIELD_NAME};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers edits from a script, then keeps succeeding
    struct ScriptedSink {
        outcomes: Mutex<VecDeque<Result<(), EditError>>>,
        edits: Mutex<Vec<String>>,
    }

    impl ScriptedSink {
        fn new(outcomes: Vec<Result<(), EditError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                edits: Mutex::new(Vec::new()),
            })
        }

        fn edit_count(&self) -> usize {
            self.edits.lock().unwrap().len()
        }

        fn edited_values(&self) -> Vec<String> {
            self.edits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageSink for ScriptedSink {
        async fn send(&self, _channel_id: u64, _message: Message) -> Result<MessageHandle, SendError> {
            Err(SendError::Transport("not used".into()))
        }

        async fn edit_field(
            &self,
            handle: &mut MessageHandle,
            index: usize,
            value: String,
        ) -> Result<(), EditError> {
            self.edits.lock().unwrap().push(value.clone());
            let outcome = self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if outcome.is_ok() {
                handle.message.fields[index].value = value;
            }
            outcome
        }
    }

    fn handle() -> MessageHandle {
        MessageHandle {
            channel_id: 1,
            message_id: "m1".to_string(),
            message: Message {
                title: "t".to_string(),
                description: "d".to_string(),
                url: "https://www.vinted.co.uk/items/1".to_string(),
                image_url: None,
                color: 0,
                fields: vec![Field {
                    name: TIME_FIELD_NAME.to_string(),
                    value: "0 seconds ago".to_string(),
                    inline: true,
                }],
                footer: String::new(),
                links: Vec::new(),
            },
        }
    }

    const PERIOD: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn deleted_message_stops_updates() {
        let sink = ScriptedSink::new(vec![Ok(()), Err(EditError::NotFound)]);

        let task = spawn(sink.clone(), handle(), Utc::now(), PERIOD);
        task.await.unwrap();

        assert_eq!(sink.edit_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn forbidden_and_too_old_are_terminal() {
        for terminal in [EditError::Forbidden, EditError::TooOld] {
            let sink = ScriptedSink::new(vec![Err(terminal)]);

            spawn(sink.clone(), handle(), Utc::now(), PERIOD).await.unwrap();

            assert_eq!(sink.edit_count(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_keep_the_loop_alive() {
        let sink = ScriptedSink::new(vec![
            Err(EditError::Other("502".into())),
            Err(EditError::Other("rate limited".into())),
            Ok(()),
            Err(EditError::TooOld),
        ]);

        spawn(sink.clone(), handle(), Utc::now(), PERIOD).await.unwrap();

        assert_eq!(sink.edit_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_writes_current_age_to_time_field() {
        let base = Utc::now();
        let started = tokio::time::Instant::now();
        // wall time that advances with the paused tokio clock
        let clock = move || base + chrono::Duration::from_std(started.elapsed()).unwrap();

        let sink = ScriptedSink::new(vec![Ok(()), Ok(()), Err(EditError::NotFound)]);
        let created_at = base - chrono::Duration::minutes(5);
        spawn_with_clock(sink.clone(), handle(), created_at, PERIOD, clock)
            .await
            .unwrap();

        assert_eq!(
            sink.edited_values(),
            ["6 minutes ago", "7 minutes ago", "8 minutes ago"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn edits_wait_for_the_period() {
        let sink = ScriptedSink::new(vec![Ok(()), Err(EditError::NotFound)]);
        let task = spawn(sink.clone(), handle(), Utc::now(), PERIOD);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sink.edit_count(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(sink.edit_count(), 1);

        task.await.unwrap();
        assert_eq!(sink.edit_count(), 2);
    }
}

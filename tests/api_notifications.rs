//! Integration tests per le notifiche generate dalla chat

mod common;

#[cfg(test)]
mod notification_tests {
    use super::common::{bearer, create_test_server, create_test_state};
    use axum_test::http::HeaderName;
    use serde_json::{Value, json};
    use sqlx::SqlitePool;

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn test_message_notifies_other_participants(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .post("/events/1/chat/messages")
            .add_header(auth(), bearer(2, "bob"))
            .json(&json!({ "content": "Who brings the ice?" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let alice: Vec<Value> = server
            .get("/notifications")
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0]["type"], "chat_message");
        assert_eq!(alice[0]["eventId"], 1);
        assert_eq!(alice[0]["isRead"], false);
        assert!(alice[0]["message"].as_str().unwrap().contains("bob"));

        // il mittente non riceve notifiche, charlie non è ancora partecipante
        for (id, name) in [(2, "bob"), (3, "charlie")] {
            let list: Vec<Value> = server
                .get("/notifications")
                .add_header(auth(), bearer(id, name))
                .await
                .json();
            assert!(list.is_empty(), "{} should have no notifications", name);
        }
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn test_muted_participant_gets_no_chat_notifications(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .patch("/events/1/chat/participants/1")
            .add_header(auth(), bearer(1, "alice"))
            .json(&json!({ "isMuted": true }))
            .await
            .assert_status_ok();
        server
            .post("/events/1/chat/messages")
            .add_header(auth(), bearer(2, "bob"))
            .json(&json!({ "content": "anyone?" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let alice: Vec<Value> = server
            .get("/notifications")
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert!(alice.is_empty());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn test_mark_read_and_unread_filter(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        for content in ["one", "two"] {
            server
                .post("/events/1/chat/messages")
                .add_header(auth(), bearer(2, "bob"))
                .json(&json!({ "content": content }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let all: Vec<Value> = server
            .get("/notifications")
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert_eq!(all.len(), 2);
        // più recente per prima
        assert!(all[0]["id"].as_i64() > all[1]["id"].as_i64());
        let newest = all[0]["id"].as_i64().unwrap();

        // bob non può toccare le notifiche di alice
        server
            .patch(&format!("/notifications/{}/read", newest))
            .add_header(auth(), bearer(2, "bob"))
            .await
            .assert_status_not_found();

        let read: Value = server
            .patch(&format!("/notifications/{}/read", newest))
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert_eq!(read["isRead"], true);

        let unread: Vec<Value> = server
            .get("/notifications?unread=true")
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert_eq!(unread.len(), 1);
        assert_ne!(unread[0]["id"].as_i64(), Some(newest));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "events", "chat_rooms")))]
    async fn test_failed_notification_does_not_fail_the_message(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        // charlie entra nella chat, così i destinatari sono alice e charlie
        server
            .get("/events/1/chat/messages")
            .add_header(auth(), bearer(3, "charlie"))
            .await
            .assert_status_ok();
        sqlx::query(
            "CREATE TRIGGER reject_alice BEFORE INSERT ON notifications WHEN NEW.user_id = 1 \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&pool)
        .await?;

        let response = server
            .post("/events/1/chat/messages")
            .add_header(auth(), bearer(2, "bob"))
            .json(&json!({ "content": "still here" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let sent: Value = response.json();

        let stored: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages WHERE id = ? AND content = 'still here'",
        )
        .bind(sent["id"].as_i64())
        .fetch_one(&pool)
        .await?;
        assert_eq!(stored, 1);

        let charlie: Vec<Value> = server
            .get("/notifications")
            .add_header(auth(), bearer(3, "charlie"))
            .await
            .json();
        assert_eq!(charlie.len(), 1);
        let alice: Vec<Value> = server
            .get("/notifications")
            .add_header(auth(), bearer(1, "alice"))
            .await
            .json();
        assert!(alice.is_empty());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_notifications_require_authentication(pool: SqlitePool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        server.get("/notifications").await.assert_status_unauthorized();
        Ok(())
    }
}

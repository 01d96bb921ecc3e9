//! Shared test utilities for agora-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use agora_core::entities::{Scope, User};
    use agora_core::enums::{Group, PollKind};

    use crate::AgoraDb;
    use crate::repos::poll::NewPoll;
    use crate::service::AgoraService;

    /// In-memory service with default voting rules.
    pub async fn test_service() -> AgoraService {
        let db = AgoraDb::open_local(":memory:").await.unwrap();
        AgoraService::from_db(db)
    }

    /// Create the `city` instance scope.
    pub async fn seed_instance(svc: &AgoraService) -> Scope {
        svc.create_scope("city", "City", None).await.unwrap()
    }

    /// Create a user who is a voter in `scope_id`.
    pub async fn voter(svc: &AgoraService, name: &str, scope_id: &str) -> User {
        let user = svc.create_user(name, None, None).await.unwrap();
        svc.set_group(&user.id, Some(scope_id), Group::Voter)
            .await
            .unwrap();
        user
    }

    /// An open-ended adopt poll starting now.
    pub fn new_poll(creator_id: &str, scope: &str) -> NewPoll {
        NewPoll {
            creator_id: creator_id.to_string(),
            scope: scope.to_string(),
            subject: "Build a bike lane".to_string(),
            kind: PollKind::Adopt,
            begin_time: None,
            end_time: None,
        }
    }
}

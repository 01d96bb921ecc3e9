//! On-disk database tests.
//!
//! - `from_config` creates the database directory and applies the rules
//! - Delegations, decisions and the audit trail survive a reopen
//! - Revocations and group changes are visible after a reopen

use agora_config::{AgoraConfig, DatabaseConfig, DemocracyConfig};
use agora_core::enums::{AuditAction, EntityType, Group, PollKind, Position};
use agora_db::repos::audit::AuditFilter;
use agora_db::repos::poll::NewPoll;
use agora_db::service::AgoraService;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AgoraConfig {
    AgoraConfig {
        database: DatabaseConfig {
            path: dir
                .path()
                .join("nested")
                .join("agora.db")
                .to_string_lossy()
                .into_owned(),
        },
        democracy: DemocracyConfig {
            required_majority: 0.6,
            ..DemocracyConfig::default()
        },
        ..AgoraConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

#[tokio::test]
async fn from_config_creates_directory_and_applies_rules() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let svc = AgoraService::from_config(&config).await.unwrap();

    assert!(dir.path().join("nested").join("agora.db").exists());
    assert!((svc.policy().required_majority - 0.6).abs() < f64::EPSILON);
}

#[tokio::test]
async fn from_config_accepts_in_memory() {
    let config = AgoraConfig {
        database: DatabaseConfig {
            path: ":memory:".into(),
        },
        ..AgoraConfig::default()
    };
    let svc = AgoraService::from_config(&config).await.unwrap();
    assert!(svc.list_scopes().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Reopen
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let (a, b, poll_id) = {
        let svc = AgoraService::from_config(&config).await.unwrap();
        let city = svc.create_scope("city", "City", None).await.unwrap();
        let a = svc.create_user("a", None, Some("hunter22")).await.unwrap();
        let b = svc.create_user("b", None, None).await.unwrap();
        for user in [&a, &b] {
            svc.set_group(&user.id, Some(city.id.as_str()), Group::Voter)
                .await
                .unwrap();
        }
        svc.create_delegation(&a.id, &b.id, &city.id).await.unwrap();
        let poll = svc
            .create_poll(NewPoll {
                creator_id: b.id.clone(),
                scope: city.id.clone(),
                subject: "Extend library hours".into(),
                kind: PollKind::Adopt,
                begin_time: None,
                end_time: None,
            })
            .await
            .unwrap();
        svc.record_decision(&b.id, &poll.id, Position::Adopt).await.unwrap();
        (a, b, poll.id)
    };

    let svc = AgoraService::from_config(&config).await.unwrap();
    let resolution = svc.resolve(&a.id, "city", None).await.unwrap();
    assert_eq!(resolution.terminal_id, b.id);
    assert_eq!(svc.tally(&poll_id).await.unwrap().adopt, 2);
    assert!(svc.authenticate("a", "hunter22").await.unwrap().is_some());

    let votes = svc
        .query_audit(&AuditFilter {
            entity_type: Some(EntityType::Decision),
            action: Some(AuditAction::Voted),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(votes.len(), 1);
}

#[tokio::test]
async fn group_change_revocation_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let a = {
        let svc = AgoraService::from_config(&config).await.unwrap();
        let city = svc.create_scope("city", "City", None).await.unwrap();
        let a = svc.create_user("a", None, None).await.unwrap();
        let b = svc.create_user("b", None, None).await.unwrap();
        for user in [&a, &b] {
            svc.set_group(&user.id, Some(city.id.as_str()), Group::Voter)
                .await
                .unwrap();
        }
        svc.create_delegation(&a.id, &b.id, &city.id).await.unwrap();
        svc.set_group(&b.id, Some(city.id.as_str()), Group::Observer)
            .await
            .unwrap();
        a
    };

    let svc = AgoraService::from_config(&config).await.unwrap();
    assert!(svc.find_active(&a.id, None, None).await.unwrap().is_empty());
    let history = svc.delegation_history(&a.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].revoke_time.is_some());
}

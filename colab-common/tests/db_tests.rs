//! Database integration tests
//!
//! Tests cover:
//! - Database creation and idempotent re-initialization
//! - Project listing, archiving and search
//! - Vote tally restricted to voting team members
//! - One decision per discussion
//! - Notification read state

use colab_common::auth::hash_password;
use colab_common::consensus::{self, ConsensusStatus, Side, VoteValue};
use colab_common::db::{
    self, decisions, discussions, init_database, init_schema, notifications, projects,
    sessions, team, users, votes, DiscussionType, ProjectStatus, TeamRole, User,
};
use colab_common::notify::NotificationKind;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Single-connection in-memory pool (each connection would get its own database)
async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    init_schema(&pool).await.expect("Should create schema");
    pool
}

async fn make_user(pool: &SqlitePool, email: &str, side: Side) -> User {
    users::create_user(pool, email, email, side, &hash_password("password123"))
        .await
        .expect("Should create user")
}

#[tokio::test]
async fn test_database_created_on_disk_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("colab.db");

    let pool = init_database(&db_path).await.expect("First init should succeed");
    assert!(db_path.exists(), "Database file was not created");
    make_user(&pool, "ada@example.org", Side::Clinical).await;
    pool.close().await;

    // Second init must not fail or lose data
    let pool = init_database(&db_path).await.expect("Re-init should succeed");
    let found = users::find_user_by_email(&pool, "ada@example.org").await.unwrap();
    assert!(found.is_some());

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, db::init::SCHEMA_VERSION);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let pool = setup_db().await;
    make_user(&pool, "ada@example.org", Side::Clinical).await;

    let err = users::create_user(
        &pool,
        "ada@example.org",
        "Other Ada",
        Side::Industry,
        &hash_password("password123"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, colab_common::Error::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_session_lookup_and_expiry() {
    let pool = setup_db().await;
    let user = make_user(&pool, "ada@example.org", Side::Clinical).await;

    let session = sessions::create_session(&pool, &user.id, 1).await.unwrap();
    let resolved = sessions::user_for_token(&pool, &session.token).await.unwrap();
    assert_eq!(resolved.id, user.id);

    // Negative TTL produces an already-expired session
    let expired = sessions::create_session(&pool, &user.id, -1).await.unwrap();
    assert!(sessions::user_for_token(&pool, &expired.token).await.is_err());
    // Expired session was deleted on lookup
    assert!(!sessions::delete_session(&pool, &expired.token).await.unwrap());
}

#[tokio::test]
async fn test_out_of_range_session_ttl_is_error() {
    let pool = setup_db().await;
    let user = make_user(&pool, "ada@example.org", Side::Clinical).await;

    let err = sessions::create_session(&pool, &user.id, 3_000_000_000)
        .await
        .unwrap_err();
    assert!(matches!(err, colab_common::Error::InvalidInput(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_creator_becomes_lead_and_archive_hides_project() {
    let pool = setup_db().await;
    let lead = make_user(&pool, "lead@example.org", Side::Clinical).await;

    let project = projects::create_project(&pool, &lead, "Sepsis Biomarkers", "Early markers")
        .await
        .unwrap();
    let membership = team::get_membership(&pool, &project.id, &lead.id)
        .await
        .unwrap()
        .expect("Lead should be on the team");
    assert_eq!(membership.role, TeamRole::Lead);
    assert_eq!(membership.side, Side::Clinical);

    let filter = projects::ProjectFilter::default();
    let listed = projects::list_projects_for_user(&pool, &lead.id, &filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].team_size, 1);

    projects::set_status(&pool, &project.id, ProjectStatus::Archived).await.unwrap();
    let listed = projects::list_projects_for_user(&pool, &lead.id, &filter).await.unwrap();
    assert!(listed.is_empty(), "Archived project should be hidden");

    let with_archived = projects::ProjectFilter {
        include_archived: true,
        ..Default::default()
    };
    let listed = projects::list_projects_for_user(&pool, &lead.id, &with_archived)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].project.status, ProjectStatus::Archived);
}

#[tokio::test]
async fn test_project_search_matches_title_or_description() {
    let pool = setup_db().await;
    let lead = make_user(&pool, "lead@example.org", Side::Clinical).await;
    projects::create_project(&pool, &lead, "Sepsis Biomarkers", "").await.unwrap();
    projects::create_project(&pool, &lead, "Wearables", "continuous SEPSIS monitoring")
        .await
        .unwrap();
    projects::create_project(&pool, &lead, "Oncology", "tumour boards").await.unwrap();

    let filter = projects::ProjectFilter {
        search: Some("sepsis"),
        ..Default::default()
    };
    let listed = projects::list_projects_for_user(&pool, &lead.id, &filter).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_tally_ignores_observers_and_former_members() {
    let pool = setup_db().await;
    let lead = make_user(&pool, "lead@example.org", Side::Clinical).await;
    let industry = make_user(&pool, "ind@example.org", Side::Industry).await;
    let observer = make_user(&pool, "obs@example.org", Side::Industry).await;
    let leaver = make_user(&pool, "leaver@example.org", Side::Clinical).await;

    let project = projects::create_project(&pool, &lead, "P", "").await.unwrap();
    team::add_member(&pool, &project.id, &industry.id, TeamRole::Member, Side::Industry)
        .await
        .unwrap();
    team::add_member(&pool, &project.id, &observer.id, TeamRole::Observer, Side::Industry)
        .await
        .unwrap();
    team::add_member(&pool, &project.id, &leaver.id, TeamRole::Member, Side::Clinical)
        .await
        .unwrap();

    let discussion = discussions::create_discussion(
        &pool,
        &project.id,
        &lead.id,
        "Adopt protocol B?",
        "",
        DiscussionType::Decision,
    )
    .await
    .unwrap();

    for user in [&lead, &industry, &observer, &leaver] {
        votes::upsert_vote(&pool, &discussion.id, &user.id, VoteValue::Agree)
            .await
            .unwrap();
    }
    team::remove_member(&pool, &project.id, &leaver.id).await.unwrap();

    let tally = votes::tally(&pool, &project.id, &discussion.id).await.unwrap();
    assert_eq!(tally.clinical.team_size, 1);
    assert_eq!(tally.industry.team_size, 1);
    assert_eq!(tally.total_votes(), 2);
    assert!(tally.clinical.votes() <= tally.clinical.team_size);
    assert!(tally.industry.votes() <= tally.industry.team_size);

    let consensus = consensus::calculate(&tally);
    assert_eq!(consensus.status, ConsensusStatus::High);
}

#[tokio::test]
async fn test_vote_upsert_replaces_previous_vote() {
    let pool = setup_db().await;
    let lead = make_user(&pool, "lead@example.org", Side::Clinical).await;
    let project = projects::create_project(&pool, &lead, "P", "").await.unwrap();
    let discussion = discussions::create_discussion(
        &pool,
        &project.id,
        &lead.id,
        "Q",
        "",
        DiscussionType::Question,
    )
    .await
    .unwrap();

    votes::upsert_vote(&pool, &discussion.id, &lead.id, VoteValue::Agree).await.unwrap();
    let vote = votes::upsert_vote(&pool, &discussion.id, &lead.id, VoteValue::Disagree)
        .await
        .unwrap();
    assert_eq!(vote.vote, VoteValue::Disagree);
    assert_eq!(votes::list_votes(&pool, &discussion.id).await.unwrap().len(), 1);

    assert!(votes::delete_vote(&pool, &discussion.id, &lead.id).await.unwrap());
    assert!(votes::list_votes(&pool, &discussion.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_decision_recorded_once_per_discussion() {
    let pool = setup_db().await;
    let lead = make_user(&pool, "lead@example.org", Side::Clinical).await;
    let project = projects::create_project(&pool, &lead, "P", "").await.unwrap();
    let discussion = discussions::create_discussion(
        &pool,
        &project.id,
        &lead.id,
        "Adopt protocol B",
        "Switch all sites to protocol B",
        DiscussionType::Decision,
    )
    .await
    .unwrap();

    votes::upsert_vote(&pool, &discussion.id, &lead.id, VoteValue::Agree).await.unwrap();
    let tally = votes::tally(&pool, &project.id, &discussion.id).await.unwrap();
    let snapshot = consensus::calculate(&tally);
    assert!(snapshot.reaches_decision());

    let first = decisions::record_decision(&pool, &discussion, &snapshot).await.unwrap();
    let second = decisions::record_decision(&pool, &discussion, &snapshot).await.unwrap();
    assert!(first.is_some());
    assert!(second.is_none());

    let decision = first.unwrap();
    assert_eq!(decision.title, "Adopt protocol B");
    assert_eq!(decision.consensus_score, 100.0);
    assert_eq!(decisions::list_decisions(&pool, &project.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_notifications_read_state_is_per_user() {
    let pool = setup_db().await;
    let ada = make_user(&pool, "ada@example.org", Side::Clinical).await;
    let bob = make_user(&pool, "bob@example.org", Side::Industry).await;

    let first = notifications::create_notification(
        &pool,
        &ada.id,
        None,
        NotificationKind::TeamAdded,
        "Bob added you to P as member",
        None,
    )
    .await
    .unwrap();
    notifications::create_notification(
        &pool,
        &ada.id,
        None,
        NotificationKind::CommentAdded,
        "Bob commented",
        None,
    )
    .await
    .unwrap();

    // Bob cannot mark Ada's notification read
    assert!(notifications::mark_read(&pool, &bob.id, &first.id).await.is_err());

    let marked = notifications::mark_read(&pool, &ada.id, &first.id).await.unwrap();
    assert!(marked.is_read);

    let page = notifications::list_notifications(&pool, &ada.id, true).await.unwrap();
    assert_eq!(page.notifications.len(), 1);
    assert_eq!(page.unread_count, 1);

    assert_eq!(notifications::mark_all_read(&pool, &ada.id).await.unwrap(), 1);
    assert_eq!(notifications::unread_count(&pool, &ada.id).await.unwrap(), 0);
}

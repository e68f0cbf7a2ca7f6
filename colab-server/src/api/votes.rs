//! Votes and consensus
//!
//! Every vote change recomputes the discussion's consensus from the current
//! team. The first time the score reaches the decision threshold a decision
//! is recorded and the whole team is notified.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use colab_common::consensus::{self, Consensus, VoteValue};
use colab_common::db::activity::{self, NewActivity};
use colab_common::db::{decisions, discussions, team, votes, Decision, Discussion, Project, Vote};
use colab_common::events::CollabEvent;
use colab_common::notify::{team_recipients, NotificationKind, TemplateContext};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::access::discussion_access;
use super::{notifications, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub vote: VoteValue,
}

#[derive(Debug, Serialize)]
pub struct VotesResponse {
    pub votes: Vec<Vote>,
    pub consensus: Consensus,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub vote: Vote,
    pub consensus: Consensus,
    /// Set when this vote pushed the discussion over the decision threshold
    pub decision: Option<Decision>,
}

/// Current consensus snapshot of a discussion
pub(crate) async fn snapshot(state: &AppState, discussion: &Discussion) -> ApiResult<Consensus> {
    let tally = votes::tally(&state.db, &discussion.project_id, &discussion.id).await?;
    Ok(consensus::calculate(&tally))
}

/// Recompute and store a discussion's consensus, recording a decision when
/// the threshold is first reached
pub(crate) async fn refresh_consensus(
    state: &AppState,
    project: &Project,
    discussion: &Discussion,
) -> ApiResult<(Consensus, Option<Decision>)> {
    let snapshot = snapshot(state, discussion).await?;
    discussions::set_consensus_status(&state.db, &discussion.id, snapshot.status).await?;

    if !snapshot.reaches_decision() {
        return Ok((snapshot, None));
    }

    let Some(decision) = decisions::record_decision(&state.db, discussion, &snapshot).await? else {
        return Ok((snapshot, None));
    };

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &project.id,
            user_id: None,
            action: "decision_reached",
            entity_type: "decision",
            entity_id: &decision.id,
            details: json!({
                "discussion_id": discussion.id,
                "consensus_score": decision.consensus_score,
            }),
        },
    )
    .await?;

    info!(
        "Decision reached on discussion {} ({:.0}%)",
        discussion.id, decision.consensus_score
    );
    state.event_bus.emit_lossy(CollabEvent::DecisionReached {
        decision: decision.clone(),
        timestamp: Utc::now(),
    });

    let members = team::member_ids(&state.db, &project.id).await?;
    let recipients: Vec<_> = team_recipients(members.iter().map(String::as_str), None)
        .into_iter()
        .map(|user_id| (user_id, NotificationKind::DecisionReached))
        .collect();
    let score = format!("{:.0}", decision.consensus_score);
    let link = format!("/decisions/{}", decision.id);

    notifications::deliver(
        state,
        &recipients,
        Some(&project.id),
        &TemplateContext {
            project_title: &project.title,
            discussion_title: &discussion.title,
            detail: &score,
            ..Default::default()
        },
        Some(&link),
    )
    .await?;

    Ok((snapshot, Some(decision)))
}

/// Recompute every discussion in a project after its team changed
pub(crate) async fn refresh_project(state: &AppState, project: &Project) -> ApiResult<()> {
    let filter = discussions::DiscussionFilter::default();
    for discussion in discussions::list_discussions(&state.db, &project.id, &filter).await? {
        refresh_consensus(state, project, &discussion).await?;
    }
    Ok(())
}

/// GET /api/discussions/:id/votes
pub async fn list_votes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<VotesResponse>> {
    let (discussion, _) = discussion_access(&state.db, &id, &auth.user).await?;
    let votes = votes::list_votes(&state.db, &id).await?;
    let consensus = snapshot(&state, &discussion).await?;
    Ok(Json(VotesResponse { votes, consensus }))
}

/// GET /api/discussions/:id/consensus
pub async fn get_consensus(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Consensus>> {
    let (discussion, _) = discussion_access(&state.db, &id, &auth.user).await?;
    Ok(Json(snapshot(&state, &discussion).await?))
}

/// POST /api/discussions/:id/votes
///
/// Casts or changes the caller's vote.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let (discussion, access) = discussion_access(&state.db, &id, &auth.user).await?;
    access.require_writable()?;

    let vote = votes::upsert_vote(&state.db, &id, &auth.user.id, req.vote).await?;
    discussions::touch(&state.db, &id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: "voted",
            entity_type: "discussion",
            entity_id: &discussion.id,
            details: json!({ "vote": vote.vote }),
        },
    )
    .await?;

    let (consensus, decision) = refresh_consensus(&state, &access.project, &discussion).await?;
    emit_vote(&state, &discussion, &auth.user.id, consensus);

    Ok(Json(VoteResponse {
        vote,
        consensus,
        decision,
    }))
}

/// DELETE /api/discussions/:id/votes
///
/// Withdraws the caller's vote.
pub async fn withdraw_vote(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Consensus>> {
    let (discussion, access) = discussion_access(&state.db, &id, &auth.user).await?;
    access.require_writable()?;

    if !votes::delete_vote(&state.db, &id, &auth.user.id).await? {
        return Err(ApiError::NotFound("No vote to withdraw".to_string()));
    }
    discussions::touch(&state.db, &id).await?;

    activity::log_activity(
        &state.db,
        NewActivity {
            project_id: &discussion.project_id,
            user_id: Some(&auth.user.id),
            action: "vote_withdrawn",
            entity_type: "discussion",
            entity_id: &discussion.id,
            details: json!({}),
        },
    )
    .await?;

    let (consensus, _) = refresh_consensus(&state, &access.project, &discussion).await?;
    emit_vote(&state, &discussion, &auth.user.id, consensus);

    Ok(Json(consensus))
}

fn emit_vote(state: &AppState, discussion: &Discussion, user_id: &str, consensus: Consensus) {
    state.event_bus.emit_lossy(CollabEvent::VoteCast {
        project_id: discussion.project_id.clone(),
        discussion_id: discussion.id.clone(),
        user_id: user_id.to_string(),
        consensus,
        timestamp: Utc::now(),
    });
}

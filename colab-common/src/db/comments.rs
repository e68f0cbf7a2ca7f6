//! Comment queries and thread assembly

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

use super::models::Comment;
use super::new_id;
use crate::{time, Error, Result};

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.discussion_id, c.author_id, u.name AS author_name, c.parent_comment_id,
           c.content, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// A comment with its replies, oldest first at every level
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

pub async fn add_comment(
    pool: &SqlitePool,
    discussion_id: &str,
    author_id: &str,
    parent_comment_id: Option<&str>,
    content: &str,
) -> Result<Comment> {
    let id = new_id();
    let now = time::now_string();

    sqlx::query(
        r#"
        INSERT INTO comments (id, discussion_id, author_id, parent_comment_id, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(discussion_id)
    .bind(author_id)
    .bind(parent_comment_id)
    .bind(content)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_comment(pool, &id).await
}

pub async fn get_comment(pool: &SqlitePool, id: &str) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!("{} WHERE c.id = ?", COMMENT_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Comment {}", id)))
}

/// Flat list of a discussion's comments in creation order
pub async fn list_comments(pool: &SqlitePool, discussion_id: &str) -> Result<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{} WHERE c.discussion_id = ? ORDER BY c.created_at, c.rowid",
        COMMENT_SELECT
    ))
    .bind(discussion_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// Delete a comment; its replies go with it (FK cascade)
pub async fn delete_comment(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Assemble a flat, creation-ordered comment list into reply trees
///
/// Comments whose parent is missing from the list are promoted to roots.
pub fn build_thread(comments: Vec<Comment>) -> Vec<CommentNode> {
    let known: std::collections::HashSet<String> =
        comments.iter().map(|c| c.id.clone()).collect();

    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_comment_id.as_ref() {
            Some(parent) if known.contains(parent) && parent != &comment.id => {
                children.entry(parent.clone()).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children))
        .collect()
}

fn attach_replies(comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> CommentNode {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach_replies(reply, children))
        .collect();

    CommentNode { comment, replies }
}

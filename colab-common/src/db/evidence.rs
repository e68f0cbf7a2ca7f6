//! Evidence link queries

use sqlx::SqlitePool;

use super::models::{EvidenceLink, EvidenceType};
use super::new_id;
use crate::{time, Error, Result};

const EVIDENCE_COLUMNS: &str =
    "id, discussion_id, added_by, url, title, description, evidence_type, created_at";

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| Error::InvalidInput(format!("Evidence URL must be http(s): {}", url)))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.contains(char::is_whitespace) {
        return Err(Error::InvalidInput(format!("Invalid evidence URL: {}", url)));
    }

    Ok(url.to_string())
}

pub async fn add_evidence(
    pool: &SqlitePool,
    discussion_id: &str,
    added_by: &str,
    url: &str,
    title: &str,
    description: &str,
    evidence_type: EvidenceType,
) -> Result<EvidenceLink> {
    let id = new_id();

    sqlx::query(
        r#"
        INSERT INTO evidence_links (id, discussion_id, added_by, url, title, description, evidence_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(discussion_id)
    .bind(added_by)
    .bind(url)
    .bind(title)
    .bind(description)
    .bind(evidence_type)
    .bind(time::now_string())
    .execute(pool)
    .await?;

    get_evidence(pool, &id).await
}

pub async fn get_evidence(pool: &SqlitePool, id: &str) -> Result<EvidenceLink> {
    sqlx::query_as::<_, EvidenceLink>(&format!(
        "SELECT {} FROM evidence_links WHERE id = ?",
        EVIDENCE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Evidence {}", id)))
}

pub async fn list_evidence(pool: &SqlitePool, discussion_id: &str) -> Result<Vec<EvidenceLink>> {
    let links = sqlx::query_as::<_, EvidenceLink>(&format!(
        "SELECT {} FROM evidence_links WHERE discussion_id = ? ORDER BY created_at",
        EVIDENCE_COLUMNS
    ))
    .bind(discussion_id)
    .fetch_all(pool)
    .await?;

    Ok(links)
}

pub async fn delete_evidence(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM evidence_links WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://pubmed.ncbi.nlm.nih.gov/123/").is_ok());
        assert_eq!(validate_url("  http://example.org ").unwrap(), "http://example.org");
    }

    #[test]
    fn test_validate_url_rejects_other_schemes_and_empty_hosts() {
        assert!(validate_url("ftp://example.org").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("https:///path").is_err());
        assert!(validate_url("https://exa mple.org").is_err());
    }
}

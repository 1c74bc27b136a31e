//! End-to-end API tests over the full router with an in-memory SQLite
//! database: authentication, role gating, tenant isolation, pagination,
//! and dashboard statistics.

use anyhow::Result;
use axum::http::StatusCode;
use bugtriage::models::bug_report::ReportStatus;
use bugtriage::models::user::Role;
use bugtriage::repositories::{CreateReportData, ReportRepository};
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    body_json, broken_collaborators, build_app, login, seed_tenant, seed_user, send_json,
};

async fn seed_report(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    description: &str,
    struggle_score: Option<f64>,
) -> Result<bugtriage::models::bug_report::Model> {
    let report = ReportRepository::new(db)
        .create(CreateReportData {
            tenant_id,
            description: Some(description.to_string()),
            label: vec!["checkout".to_string()],
            struggle_score,
            metadata_json: r#"{"browser":"firefox"}"#.to_string(),
            dom_snapshot: "<html></html>".to_string(),
            video_url: None,
        })
        .await?;
    Ok(report)
}

#[tokio::test]
async fn login_me_and_logout_roundtrip() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let tenant = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(tenant.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;

    let response = send_json(&app, "GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await?;
    assert_eq!(me["email"], "admin@acme.test");
    assert_eq!(me["role"], "CLIENT_ADMIN");
    assert!(me.get("password_hash").is_none());

    let response = send_json(&app, "POST", "/api/auth/logout", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_password_and_inactive_user() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let tenant = seed_tenant(&db, "Acme").await?;
    let user =
        seed_user(&db, "user@acme.test", "s3cret-pass", Role::ClientUser, Some(tenant.id)).await?;

    let response = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": "user@acme.test", "password": "wrong" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let err = body_json(response).await?;
    assert_eq!(err["code"], "INVALID_CREDENTIALS");

    bugtriage::repositories::UserRepository::new(&db)
        .deactivate(user)
        .await?;
    let response = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": "user@acme.test", "password": "s3cret-pass" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let (app, _db) = build_app(broken_collaborators()).await?;

    let response = send_json(&app, "GET", "/api/reports", None, None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send_json(&app, "GET", "/api/reports", Some("not-a-jwt"), None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tenant_admin_cannot_see_foreign_reports() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    let globex = seed_tenant(&db, "Globex").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;

    seed_report(&db, acme.id, "ours", Some(3.0)).await?;
    let foreign = seed_report(&db, globex.id, "theirs", Some(9.0)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;

    // Listing only surfaces the caller's tenant.
    let response = send_json(&app, "GET", "/api/reports", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["reports"][0]["description"], "ours");

    // A direct fetch of a foreign report looks like a missing record.
    let response = send_json(
        &app,
        "GET",
        &format!("/api/reports/{}", foreign.id),
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // So does deleting it; the row must survive.
    let response = send_json(
        &app,
        "DELETE",
        &format!("/api/reports/{}", foreign.id),
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(
        ReportRepository::new(&db)
            .find_by_id(foreign.id)
            .await?
            .is_some()
    );
    Ok(())
}

#[tokio::test]
async fn super_admin_sees_across_tenants() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    let globex = seed_tenant(&db, "Globex").await?;
    seed_user(&db, "root@platform.test", "s3cret-pass", Role::SuperAdmin, None).await?;

    seed_report(&db, acme.id, "a", None).await?;
    seed_report(&db, globex.id, "b", None).await?;

    let token = login(&app, "root@platform.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/reports", Some(&token), None).await?;
    let page = body_json(response).await?;
    assert_eq!(page["total"], 2);

    let response = send_json(
        &app,
        "GET",
        &format!("/api/reports?tenant_id={}", globex.id),
        Some(&token),
        None,
    )
    .await?;
    let page = body_json(response).await?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["reports"][0]["description"], "b");
    Ok(())
}

#[tokio::test]
async fn tenant_management_is_super_admin_only() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    seed_user(&db, "root@platform.test", "s3cret-pass", Role::SuperAdmin, None).await?;

    let admin_token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/tenants", Some(&admin_token), None).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let root_token = login(&app, "root@platform.test", "s3cret-pass").await?;
    let response = send_json(
        &app,
        "POST",
        "/api/tenants",
        Some(&root_token),
        Some(serde_json::json!({ "name": "Initech", "company_name": "Initech LLC" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await?;
    assert_eq!(created["name"], "Initech");
    assert_eq!(created["api_key"].as_str().unwrap().len(), 43);
    Ok(())
}

#[tokio::test]
async fn regenerate_key_invalidates_the_old_key() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "root@platform.test", "s3cret-pass", Role::SuperAdmin, None).await?;
    let old_key = acme.api_key.clone();

    let token = login(&app, "root@platform.test", "s3cret-pass").await?;
    let response = send_json(
        &app,
        "POST",
        &format!("/api/tenants/{}/regenerate-key", acme.id),
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await?;
    let new_key = rotated["api_key"].as_str().unwrap();
    assert_ne!(new_key, old_key);

    // Old key no longer resolves for ingestion.
    let request = test_utils::feedback_request(
        Some(&old_key),
        Some(b"webm-bytes"),
        Some("<html></html>"),
        Some(r#"{"browser":"firefox"}"#),
        None,
        None,
    );
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn client_admin_cannot_mint_super_admin() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(
        &app,
        "POST",
        "/api/users",
        Some(&token),
        Some(serde_json::json!({
            "email": "new@acme.test",
            "password": "longenough",
            "role": "SUPER_ADMIN"
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn client_admin_cannot_promote_to_super_admin() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    let member =
        seed_user(&db, "member@acme.test", "s3cret-pass", Role::ClientUser, Some(acme.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(
        &app,
        "PUT",
        &format!("/api/users/{}", member.id),
        Some(&token),
        Some(serde_json::json!({ "role": "SUPER_ADMIN" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The subordinate keeps their original role.
    let response = send_json(
        &app,
        "GET",
        &format!("/api/users/{}", member.id),
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["role"], "CLIENT_USER");
    Ok(())
}

#[tokio::test]
async fn client_admin_creates_users_in_own_tenant_only() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    let globex = seed_tenant(&db, "Globex").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    // Naming a foreign tenant is refused outright.
    let response = send_json(
        &app,
        "POST",
        "/api/users",
        Some(&token),
        Some(serde_json::json!({
            "email": "new@acme.test",
            "password": "longenough",
            "role": "CLIENT_USER",
            "tenant_id": globex.id
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Omitting tenant_id lands the user in the caller's own tenant.
    let response = send_json(
        &app,
        "POST",
        "/api/users",
        Some(&token),
        Some(serde_json::json!({
            "email": "new@acme.test",
            "password": "longenough",
            "role": "CLIENT_USER"
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await?;
    assert_eq!(created["tenant_id"].as_str().unwrap(), acme.id.to_string());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let payload = serde_json::json!({
        "email": "dup@acme.test",
        "password": "longenough",
        "role": "CLIENT_USER"
    });
    let response = send_json(&app, "POST", "/api/users", Some(&token), Some(payload.clone())).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send_json(&app, "POST", "/api/users", Some(&token), Some(payload)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let err = body_json(response).await?;
    assert_eq!(err["code"], "DUPLICATE_EMAIL");
    Ok(())
}

#[tokio::test]
async fn client_user_reads_only_their_own_record() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    let me = seed_user(&db, "me@acme.test", "s3cret-pass", Role::ClientUser, Some(acme.id)).await?;
    let peer =
        seed_user(&db, "peer@acme.test", "s3cret-pass", Role::ClientUser, Some(acme.id)).await?;

    let token = login(&app, "me@acme.test", "s3cret-pass").await?;

    let response =
        send_json(&app, "GET", &format!("/api/users/{}", me.id), Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response =
        send_json(&app, "GET", &format!("/api/users/{}", peer.id), Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Listing is management surface.
    let response = send_json(&app, "GET", "/api/users", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn report_pagination_limits_and_splits() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    for i in 0..15 {
        seed_report(&db, acme.id, &format!("report {i}"), None).await?;
    }

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;

    let response = send_json(
        &app,
        "GET",
        "/api/reports?page=2&page_size=10",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await?;
    assert_eq!(page["total"], 15);
    assert_eq!(page["page"], 2);
    assert_eq!(page["reports"].as_array().unwrap().len(), 5);

    let response = send_json(
        &app,
        "GET",
        "/api/reports?page_size=101",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err = body_json(response).await?;
    assert_eq!(err["code"], "VALIDATION_FAILED");

    let response = send_json(&app, "GET", "/api/reports?page=0", Some(&token), None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn report_filters_narrow_the_list() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    let resolved = seed_report(&db, acme.id, "checkout button frozen", None).await?;
    seed_report(&db, acme.id, "profile page crash", None).await?;
    let repo = ReportRepository::new(&db);
    repo.update_status(resolved, Some(ReportStatus::Resolved), None, None)
        .await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;

    let response = send_json(
        &app,
        "GET",
        "/api/reports?status=RESOLVED",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["reports"][0]["description"], "checkout button frozen");

    // Free-text search matches descriptions and raw metadata text.
    let response = send_json(&app, "GET", "/api/reports?search=profile", Some(&token), None).await?;
    let page = body_json(response).await?;
    assert_eq!(page["total"], 1);

    let response = send_json(&app, "GET", "/api/reports?search=firefox", Some(&token), None).await?;
    let page = body_json(response).await?;
    assert_eq!(page["total"], 2);
    Ok(())
}

#[tokio::test]
async fn report_status_and_details_updates() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "user@acme.test", "s3cret-pass", Role::ClientUser, Some(acme.id)).await?;
    let report = seed_report(&db, acme.id, "slow checkout", Some(4.2)).await?;

    let token = login(&app, "user@acme.test", "s3cret-pass").await?;

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/reports/{}/status", report.id),
        Some(&token),
        Some(serde_json::json!({
            "status": "IN_PROGRESS",
            "synced_to_integration": true,
            "external_ticket_id": "JIRA-42"
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await?;
    assert_eq!(updated["status"], "IN_PROGRESS");
    assert_eq!(updated["synced_to_integration"], true);
    assert_eq!(updated["external_ticket_id"], "JIRA-42");

    // Unlinking the ticket takes an explicit null; an omitted field
    // keeps the reference.
    let response = send_json(
        &app,
        "PUT",
        &format!("/api/reports/{}/status", report.id),
        Some(&token),
        Some(serde_json::json!({ "status": "RESOLVED" })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await?;
    assert_eq!(updated["external_ticket_id"], "JIRA-42");

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/reports/{}/status", report.id),
        Some(&token),
        Some(serde_json::json!({ "external_ticket_id": null })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await?;
    assert!(updated["external_ticket_id"].is_null());

    let response = send_json(
        &app,
        "PUT",
        &format!("/api/reports/{}", report.id),
        Some(&token),
        Some(serde_json::json!({
            "description": "checkout spinner never resolves",
            "label": ["checkout", "spinner"]
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await?;
    assert_eq!(updated["description"], "checkout spinner never resolves");
    assert_eq!(updated["label"][1], "spinner");
    Ok(())
}

#[tokio::test]
async fn stats_roll_up_per_scope() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    let globex = seed_tenant(&db, "Globex").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    seed_user(&db, "root@platform.test", "s3cret-pass", Role::SuperAdmin, None).await?;

    let resolved = seed_report(&db, acme.id, "resolved one", Some(2.0)).await?;
    ReportRepository::new(&db)
        .update_status(resolved, Some(ReportStatus::Resolved), None, None)
        .await?;
    seed_report(&db, acme.id, "open one", Some(4.0)).await?;
    seed_report(&db, globex.id, "foreign", Some(9.0)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/reports/stats", Some(&token), None).await?;
    let stats = body_json(response).await?;
    assert_eq!(stats["total_reports"], 2);
    assert_eq!(stats["active_tenants"], 1);
    assert_eq!(stats["resolved_this_week"], 1);
    assert_eq!(stats["avg_struggle_score"], 3.0);

    let token = login(&app, "root@platform.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/reports/stats", Some(&token), None).await?;
    let stats = body_json(response).await?;
    assert_eq!(stats["total_reports"], 3);
    assert_eq!(stats["active_tenants"], 2);
    assert_eq!(stats["avg_struggle_score"], 5.0);
    Ok(())
}

#[tokio::test]
async fn stats_default_to_zero_without_scores() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;

    let token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/reports/stats", Some(&token), None).await?;
    let stats = body_json(response).await?;
    assert_eq!(stats["total_reports"], 0);
    assert_eq!(stats["resolved_this_week"], 0);
    assert_eq!(stats["avg_struggle_score"], 0.0);
    Ok(())
}

#[tokio::test]
async fn integrations_are_tenant_scoped_and_validated() -> Result<()> {
    let (app, db) = build_app(broken_collaborators()).await?;
    let acme = seed_tenant(&db, "Acme").await?;
    seed_user(&db, "admin@acme.test", "s3cret-pass", Role::ClientAdmin, Some(acme.id)).await?;
    seed_user(&db, "user@acme.test", "s3cret-pass", Role::ClientUser, Some(acme.id)).await?;

    let admin_token = login(&app, "admin@acme.test", "s3cret-pass").await?;
    let response = send_json(
        &app,
        "POST",
        "/api/integrations",
        Some(&admin_token),
        Some(serde_json::json!({
            "integration_type": "CLICKUP",
            "config_json": { "api_token": "tok" },
            "enabled": true
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(
        &app,
        "POST",
        "/api/integrations",
        Some(&admin_token),
        Some(serde_json::json!({
            "integration_type": "CLICKUP",
            "config_json": { "api_token": "tok", "list_id": "42" },
            "enabled": true
        })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await?;
    let id = created["id"].as_str().unwrap().to_string();

    let response = send_json(
        &app,
        "POST",
        &format!("/api/integrations/{id}/test"),
        Some(&admin_token),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Integration management is closed to CLIENT_USER.
    let user_token = login(&app, "user@acme.test", "s3cret-pass").await?;
    let response = send_json(&app, "GET", "/api/integrations", Some(&user_token), None).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

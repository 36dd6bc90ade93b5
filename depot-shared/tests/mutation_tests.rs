/// Integration tests for the transactional mutators
///
/// These tests require a running PostgreSQL database.
/// Run with: cargo test -p depot-shared --test mutation_tests

mod common;

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::*;
use depot_shared::auth::credentials::{verify_basic, AuthScheme, Authentication};
use depot_shared::auth::password::sha1_hex;
use depot_shared::error::DepotError;
use depot_shared::models::role::{RoleKey, CONTRIBUTOR_ROLE_ID, MANAGER_ROLE_ID};
use depot_shared::mutations::membership::{add_member, remove_member};
use depot_shared::mutations::project::{
    create_or_update_project, delete_project, patch_project, ProjectPayload,
};
use depot_shared::mutations::user::{
    create_or_update_user, delete_user, patch_user, register_user, UserPayload,
};
use depot_shared::mutations::Upsert;
use depot_shared::queries::{get_membership, get_project_with_members, get_user, project_exists};
use serde_json::json;

fn named(name: &str) -> ProjectPayload {
    ProjectPayload {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_project_makes_requester_manager() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let code = unique("proj");

    let outcome = create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .expect("create project");

    assert!(outcome.is_created());
    let project = outcome.into_inner();
    assert_eq!(project.project.code, code);
    assert_eq!(project.members.len(), 1);
    assert_eq!(project.members[0].user.username, admin.username);
    assert_eq!(project.members[0].role.id, MANAGER_ROLE_ID);
}

#[tokio::test]
async fn test_second_put_updates_in_place() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let code = unique("proj");
    let auth = authenticated(&admin);

    create_or_update_project(&store, &code, &named("First"), &auth).await.unwrap();
    let outcome = create_or_update_project(&store, &code, &named("Second"), &auth)
        .await
        .unwrap();

    match outcome {
        Upsert::Updated(project) => assert_eq!(project.project.name, "Second"),
        Upsert::Created(_) => panic!("second PUT must update"),
    }
}

#[tokio::test]
async fn test_racing_creates_resolve_to_one_insert() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let code = unique("race");
    let auth = authenticated(&admin);
    let first = named("A");
    let second = named("B");

    let (a, b) = futures::future::join(
        create_or_update_project(&store, &code, &first, &auth),
        create_or_update_project(&store, &code, &second, &auth),
    )
    .await;

    let outcomes = [a.expect("first"), b.expect("second")];
    let created = outcomes.iter().filter(|o| o.is_created()).count();
    assert_eq!(created, 1, "exactly one request takes the insert branch");
    assert_eq!(membership_count(&store, &code, &admin.username).await, 1);
}

#[tokio::test]
async fn test_update_by_non_manager_is_forbidden_and_rolled_back() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let outsider = create_user(&store, &unique("outsider"), "pw", false).await;
    let code = unique("proj");

    create_or_update_project(&store, &code, &named("Original"), &authenticated(&admin))
        .await
        .unwrap();

    let err = create_or_update_project(&store, &code, &named("Hijacked"), &authenticated(&outsider))
        .await
        .unwrap_err();
    assert!(matches!(err, DepotError::Forbidden));

    let project = get_project_with_members(&store, &code).await.unwrap();
    assert_eq!(project.project.name, "Original");
}

#[tokio::test]
async fn test_create_with_vanished_requester_is_invalid_user() {
    let store = setup_store().await;
    let ghost = create_user(&store, &unique("ghost"), "pw", false).await;
    delete_user(&store, &ghost.username).await.unwrap();
    let code = unique("proj");

    let err = create_or_update_project(&store, &code, &named("Orphan"), &authenticated(&ghost))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "invalid_user");
    assert!(!project_exists(&store, &code).await.unwrap(), "insert must roll back");
}

#[tokio::test]
async fn test_inconsistent_project_code_is_rejected() {
    let store = setup_store().await;
    let payload = ProjectPayload {
        project_code: Some("other".into()),
        name: Some("X".into()),
        ..Default::default()
    };

    let err = create_or_update_project(&store, "mine", &payload, &Authentication::Rejected)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "inconsistent_projectCode");
}

#[tokio::test]
async fn test_concurrent_assign_role_keeps_one_membership() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let member = create_user(&store, &unique("member"), "pw", false).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();

    let contributor = RoleKey::Id(CONTRIBUTOR_ROLE_ID);
    let manager = RoleKey::Name("Manager".to_string());
    let (a, b) = futures::future::join(
        add_member(&store, &code, &member.username, &contributor),
        add_member(&store, &code, &member.username, &manager),
    )
    .await;
    a.expect("first assignment");
    b.expect("second assignment");

    assert_eq!(membership_count(&store, &code, &member.username).await, 1);
    assert_eq!(member_role_count(&store, &code, &member.username).await, 1);
}

#[tokio::test]
async fn test_reassigning_role_updates_existing_row() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let member = create_user(&store, &unique("member"), "pw", false).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();

    add_member(&store, &code, &member.username, &RoleKey::Id(CONTRIBUTOR_ROLE_ID))
        .await
        .unwrap();
    add_member(&store, &code, &member.username, &RoleKey::Id(MANAGER_ROLE_ID))
        .await
        .unwrap();

    let detail = get_membership(&store, &code, &member.username).await.unwrap();
    assert_eq!(detail.role.id, MANAGER_ROLE_ID);
    assert_eq!(member_role_count(&store, &code, &member.username).await, 1);
}

#[tokio::test]
async fn test_unknown_role_and_user() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();

    let err = add_member(&store, &code, &admin.username, &RoleKey::Id(99))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unknown_role");

    let err = add_member(&store, &code, "nobody-at-all", &RoleKey::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unknown_user");
}

#[tokio::test]
async fn test_patch_is_atomic() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let users = [
        create_user(&store, &unique("u1"), "pw", false).await,
        create_user(&store, &unique("u2"), "pw", false).await,
        create_user(&store, &unique("u3"), "pw", false).await,
        create_user(&store, &unique("u4"), "pw", false).await,
    ];
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Before"), &authenticated(&admin))
        .await
        .unwrap();

    let payload = ProjectPayload {
        name: Some("After".into()),
        members: Some(json!({"add": [
            {"user": users[0].username, "role": 4},
            {"user": users[1].username, "role": "Manager"},
            {"user": users[2].username, "role": {"id": 99}},
            {"user": users[3].username},
        ]})),
        ..Default::default()
    };

    let err = patch_project(&store, &code, &payload).await.unwrap_err();
    assert_eq!(err.code(), "unknown_role");

    let project = get_project_with_members(&store, &code).await.unwrap();
    assert_eq!(project.project.name, "Before");
    assert_eq!(project.members.len(), 1, "only the creating admin remains");
}

#[tokio::test]
async fn test_patch_add_then_remove() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let member = create_user(&store, &unique("member"), "pw", false).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();

    let add = ProjectPayload {
        members: Some(json!([member.username])),
        ..Default::default()
    };
    let project = patch_project(&store, &code, &add).await.unwrap();
    assert_eq!(project.members.len(), 2);

    let remove = ProjectPayload {
        members: Some(json!({"removeUser": member.username})),
        ..Default::default()
    };
    let project = patch_project(&store, &code, &remove).await.unwrap();
    assert_eq!(project.members.len(), 1);
    assert_eq!(membership_count(&store, &code, &member.username).await, 0);
}

#[tokio::test]
async fn test_patch_missing_project_is_unknown() {
    let store = setup_store().await;
    let err = patch_project(&store, &unique("missing"), &named("X"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unknown_project");
}

#[tokio::test]
async fn test_deletes_are_idempotent() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let outsider = create_user(&store, &unique("outsider"), "pw", false).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();

    remove_member(&store, &code, &outsider.username).await.expect("non-member removal");
    assert_eq!(membership_count(&store, &code, &admin.username).await, 1);

    delete_project(&store, &unique("never-existed")).await.expect("missing project");
    delete_user(&store, &unique("never-existed")).await.expect("missing user");

    delete_project(&store, &code).await.expect("delete project");
    assert!(!project_exists(&store, &code).await.unwrap());
    delete_project(&store, &code).await.expect("delete again");
}

#[tokio::test]
async fn test_delete_user_cascades_memberships() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let member = create_user(&store, &unique("member"), "pw", false).await;
    let code = unique("proj");
    create_or_update_project(&store, &code, &named("Demo"), &authenticated(&admin))
        .await
        .unwrap();
    add_member(&store, &code, &member.username, &RoleKey::default())
        .await
        .unwrap();

    delete_user(&store, &member.username).await.unwrap();

    assert_eq!(membership_count(&store, &code, &member.username).await, 0);
    assert_eq!(get_user(&store, &member.username).await.unwrap_err().code(), "unknown_user");
    assert_eq!(get_project_with_members(&store, &code).await.unwrap().members.len(), 1);
}

#[tokio::test]
async fn test_user_upsert_and_password_policy() {
    let store = setup_store().await;
    let admin = create_user(&store, &unique("admin"), "pw", true).await;
    let username = unique("user");

    let created = create_or_update_user(
        &store,
        &username,
        &UserPayload {
            password: Some("first".into()),
            mail: Some("someone@example.com".into()),
            ..Default::default()
        },
        &authenticated(&admin),
    )
    .await
    .unwrap();
    assert!(created.is_created());
    let user = created.into_inner();
    assert_eq!(user.mail.as_deref(), Some("someone@example.com"));
    assert_ne!(user.hashed_password, "first");

    // An empty password leaves the credential alone
    let updated = patch_user(
        &store,
        &username,
        &UserPayload {
            password: Some(String::new()),
            firstname: Some("Renamed".into()),
            ..Default::default()
        },
        &user,
    )
    .await
    .unwrap();
    assert_eq!(updated.firstname, "Renamed");
    assert_eq!(updated.hashed_password, user.hashed_password);
    assert_eq!(updated.salt, user.salt);
}

#[tokio::test]
async fn test_user_upsert_create_requires_admin() {
    let store = setup_store().await;
    let other = create_user(&store, &unique("other"), "pw", false).await;
    let username = unique("user");
    let payload = UserPayload {
        password: Some("pw".into()),
        ..Default::default()
    };

    let anonymous = create_or_update_user(
        &store,
        &username,
        &payload,
        &Authentication::Missing(AuthScheme::Bearer),
    )
    .await
    .unwrap_err();
    assert_eq!(anonymous.code(), "auth_token_required");

    let stranger = create_or_update_user(&store, &username, &payload, &authenticated(&other))
        .await
        .unwrap_err();
    assert_eq!(stranger.code(), "forbidden");

    assert_eq!(get_user(&store, &username).await.unwrap_err().code(), "unknown_user");
}

#[tokio::test]
async fn test_register_existing_username_conflicts() {
    let store = setup_store().await;
    let existing = create_user(&store, &unique("taken"), "pw", false).await;

    let err = register_user(
        &store,
        &UserPayload {
            username: Some(existing.username.clone()),
            password: Some("pw".into()),
            ..Default::default()
        },
        &Authentication::Rejected,
    )
    .await
    .unwrap_err();

    assert_eq!(err.code(), "cannot_modify_username");
}

#[tokio::test]
async fn test_legacy_unsalted_password_authenticates() {
    let store = setup_store().await;
    let username = unique("legacy");

    sqlx::query("INSERT INTO users (username, hashed_password, salt) VALUES ($1, $2, '')")
        .bind(&username)
        .bind(sha1_hex("old-school"))
        .execute(store.pool())
        .await
        .unwrap();

    let mut headers = HeaderMap::new();
    let encoded = STANDARD.encode(format!("{}:old-school", username));
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
    );

    match verify_basic(&store, &headers).await.unwrap() {
        Authentication::Authenticated(user) => assert_eq!(user.username, username),
        other => panic!("expected authenticated, got {:?}", other),
    }

    let wrong = STANDARD.encode(format!("{}:new-school", username));
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {}", wrong)).unwrap(),
    );
    assert!(matches!(
        verify_basic(&store, &headers).await.unwrap(),
        Authentication::Rejected
    ));
}

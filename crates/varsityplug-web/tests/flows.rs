//! End-to-end flows through the router: accounts, marks, selections,
//! documents, payments and the staff queues.

mod common;

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use common::*;
use varsityplug_admissions::fees::on_time_fee;
use varsityplug_common::{DocumentType, PaymentStatus, SubscriptionPackage};
use varsityplug_db::{ApplicationRepository, DocumentRepository, PaymentRepository, SelectionRepository, UserRepository};
use varsityplug_security::hash_password;
use varsityplug_test_utils::{
    assert_eq, assert_ne, sample_marks_form, unique_username, Multipart, SAMPLE_APS, STRONG_PASSWORD, TINY_PDF,
};

// ── Plumbing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_database() {
    let app = TestApp::spawn().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_unknown_host_is_rejected() {
    let app = TestApp::spawn().await;
    let req = Request::get("/")
        .header(header::HOST, "evil.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_pages_render() {
    let app = TestApp::spawn().await;
    for path in ["/", "/about", "/services", "/contact", "/accounts/login", "/register"] {
        let resp = app.get(path, None).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert!(body_text(resp).await.contains("Varsity Plug"), "{path}");
    }
}

#[tokio::test]
async fn test_services_lists_package_prices() {
    let app = TestApp::spawn().await;
    let html = body_text(app.get("/services", None).await).await;
    assert!(html.contains("Basic Package"));
    assert!(html.contains("R1000"));
    assert!(html.contains("R50 per application"));
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = TestApp::spawn().await;
    let resp = app.get("/dashboard/student", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/accounts/login?next=/dashboard/student");
}

#[tokio::test]
async fn test_login_redirect_keeps_query_string() {
    let app = TestApp::spawn().await;
    let resp = app.get("/staff/payments?status=pending&page=2", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let login = location(&resp);
    assert_eq!(login, "/accounts/login?next=/staff/payments%3Fstatus%3Dpending%26page%3D2");
    assert_eq!(app.get(&login, None).await.status(), StatusCode::OK);
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_logs_in_and_flashes_welcome() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.register().await;

    let html = body_text(app.get("/subscription", Some(&cookie)).await).await;
    assert!(html.contains("Registration successful! Welcome to Varsity Plug."));
    assert!(html.contains(&username));

    // The flash is shown once.
    let html = body_text(app.get("/subscription", Some(&cookie)).await).await;
    assert!(!html.contains("Registration successful!"));
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::spawn().await;
    let resp = app
        .post_form(
            "/register",
            None,
            &[
                ("username", "lerato"),
                ("email", "l@example.com"),
                ("password1", STRONG_PASSWORD),
                ("password2", "Something!else9"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let html = body_text(resp).await;
    assert!(html.contains("Registration failed. Please correct the errors below."));
    assert!(html.contains("lerato"));
}

#[tokio::test]
async fn test_register_rejects_taken_username() {
    let app = TestApp::spawn().await;
    let (username, _) = app.register().await;
    let resp = app
        .post_form(
            "/register",
            None,
            &[
                ("username", username.to_uppercase().as_str()),
                ("email", ""),
                ("password1", STRONG_PASSWORD),
                ("password2", STRONG_PASSWORD),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("A user with that username already exists."));
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::spawn().await;
    let (username, _) = app.register().await;

    let resp = app
        .post_form("/accounts/login", None, &[("username", username.as_str()), ("password", "wrong")])
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Please enter a correct username and password."));

    let resp = app
        .post_form(
            "/accounts/login",
            None,
            &[("username", username.as_str()), ("password", STRONG_PASSWORD), ("next", "")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/redirect_after_login");
    let cookie = session_cookie(&resp).unwrap();

    // Not subscribed yet, so the student picks a package first.
    let resp = app.get("/redirect_after_login", Some(&cookie)).await;
    assert_eq!(location(&resp), "/subscription");

    let resp = app.post_form::<&str, &str>("/accounts/logout", Some(&cookie), &[]).await;
    assert_eq!(location(&resp), "/");
    let resp = app.get("/dashboard/student", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/accounts/login"));
}

#[tokio::test]
async fn test_login_follows_local_next_only() {
    let app = TestApp::spawn().await;
    let (username, _) = app.register().await;
    for (next, expected) in [
        ("/universities", "/universities"),
        ("//evil.com", "/redirect_after_login"),
        ("/\\evil.example.com", "/redirect_after_login"),
        ("/x\ny", "/redirect_after_login"),
    ] {
        let resp = app
            .post_form(
                "/accounts/login",
                None,
                &[("username", username.as_str()), ("password", STRONG_PASSWORD), ("next", next)],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), expected);
    }
}

// ── Subscription and dashboard ───────────────────────────────────────────────

#[tokio::test]
async fn test_inactive_student_is_sent_to_subscription() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.register().await;
    let resp = app.get("/dashboard/student", Some(&cookie)).await;
    assert_eq!(location(&resp), "/subscription");
}

#[tokio::test]
async fn test_invalid_package_is_flashed() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.register().await;
    let resp = app.post_form("/subscription", Some(&cookie), &[("package", "platinum")]).await;
    assert_eq!(location(&resp), "/subscription");
    let html = body_text(app.get("/subscription", Some(&cookie)).await).await;
    assert!(html.contains("Invalid package selected. Please try again."));
}

#[tokio::test]
async fn test_marks_submission_stores_aps() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let resp = app.post_form("/dashboard/marks", Some(&cookie), &sample_marks_form()).await;
    assert_eq!(location(&resp), "/dashboard/student");

    let resp = app.get("/dashboard/student", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains(&format!("Marks updated successfully! Your new APS score is {SAMPLE_APS}.")));

    let id = app.user_id(&username).await;
    let profile = UserRepository::new(app.db.clone()).profile(id).await.unwrap();
    assert_eq!(profile.aps(), Some(SAMPLE_APS));
    assert_eq!(profile.marks().map(|m| m.len()), Some(7));
}

#[tokio::test]
async fn test_dashboard_recomputes_missing_aps() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    app.post_form("/dashboard/marks", Some(&cookie), &sample_marks_form()).await;

    let id = app.user_id(&username).await;
    let users = UserRepository::new(app.db.clone());
    users.set_stored_aps(id, None).await.unwrap();

    let resp = app.get("/dashboard/student", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(users.profile(id).await.unwrap().aps(), Some(SAMPLE_APS));
}

#[tokio::test]
async fn test_marks_with_both_maths_are_rejected() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let mut form = sample_marks_form();
    // Replace History with Mathematical Literacy.
    form[8].1 = "Mathematical Literacy".to_string();
    app.post_form("/dashboard/marks", Some(&cookie), &form).await;

    let id = app.user_id(&username).await;
    let profile = UserRepository::new(app.db.clone()).profile(id).await.unwrap();
    assert_eq!(profile.aps(), None);
}

#[tokio::test]
async fn test_phone_number_is_validated() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Premium).await;

    app.post_form("/dashboard/profile", Some(&cookie), &[("phone_number", "0821234567")]).await;
    let html = body_text(app.get("/dashboard/student", Some(&cookie)).await).await;
    assert!(html.contains("Exactly 9 digits after +27."));

    app.post_form(
        "/dashboard/profile",
        Some(&cookie),
        &[("phone_number", "+27821234567"), ("whatsapp_enabled", "on")],
    )
    .await;
    let id = app.user_id(&username).await;
    let profile = UserRepository::new(app.db.clone()).profile(id).await.unwrap();
    assert_eq!(profile.phone_number.as_deref(), Some("+27821234567"));
    assert!(profile.whatsapp_enabled);
}

// ── Selections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_select_requires_login_as_json() {
    let app = TestApp::spawn().await;
    let id = app.universities().await[0].id;
    let resp = app.post_json(&format!("/select-university/{id}"), None, "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["success"], false);
}

#[tokio::test]
async fn test_select_requires_active_subscription() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.register().await;
    let id = app.universities().await[0].id;
    let resp = app.post_json(&format!("/select-university/{id}"), Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = body_json(resp).await;
    assert!(json["message"].as_str().unwrap().contains("activate a subscription"));
}

#[tokio::test]
async fn test_basic_package_limit_is_enforced() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let unis = app.universities().await;

    for (i, u) in unis.iter().take(3).enumerate() {
        let resp = app.post_json(&format!("/select-university/{}", u.id), Some(&cookie), "").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["application_count"], i as i64 + 1);
        assert_eq!(json["message"], format!("{} has been successfully selected!", u.name));
    }

    let resp = app.post_json(&format!("/select-university/{}", unis[3].id), Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("limit of 3 applications"));
}

#[tokio::test]
async fn test_select_twice_and_deselect() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.subscribed_student(SubscriptionPackage::Standard).await;
    let u = &app.universities().await[0];

    app.post_json(&format!("/select-university/{}", u.id), Some(&cookie), "").await;
    let resp = app.post_json(&format!("/select-university/{}", u.id), Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], format!("{} is already selected.", u.name));

    let resp = app.post_json(&format!("/deselect-university/{}", u.id), Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["application_count"], 0);

    let resp = app.post_json(&format!("/deselect-university/{}", u.id), Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.post_json("/select-university/999999", Some(&cookie), "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_selection_warns_above_aps() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Premium).await;
    app.post_form("/dashboard/marks", Some(&cookie), &sample_marks_form()).await;

    let unis = app.universities().await;
    let reach = unis.iter().find(|u| u.minimum_aps > i64::from(SAMPLE_APS)).expect("a demanding university");
    let safe = unis.iter().find(|u| u.minimum_aps <= i64::from(SAMPLE_APS)).expect("an accessible university");

    let resp = app
        .post_form(
            "/universities",
            Some(&cookie),
            &[("universities", reach.id.to_string()), ("universities", safe.id.to_string())],
        )
        .await;
    assert_eq!(location(&resp), "/universities");

    let html = body_text(app.get("/universities", Some(&cookie)).await).await;
    assert!(html.contains("might not meet the minimum requirement"));
    assert!(html.contains("Selected universities updated successfully!"));

    let id = app.user_id(&username).await;
    let ids = SelectionRepository::new(app.db.clone()).ids(id).await.unwrap();
    assert_eq!(ids.len(), 2);
}

#[tokio::test]
async fn test_bulk_selection_rejects_bad_ids_and_limit() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let unis = app.universities().await;

    app.post_form("/universities", Some(&cookie), &[("universities", "abc")]).await;
    let html = body_text(app.get("/universities", Some(&cookie)).await).await;
    assert!(html.contains("Invalid university ID received: abc"));

    let four: Vec<(&str, String)> = unis.iter().take(4).map(|u| ("universities", u.id.to_string())).collect();
    app.post_form("/universities", Some(&cookie), &four).await;

    let id = app.user_id(&username).await;
    assert!(SelectionRepository::new(app.db.clone()).ids(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upgrade_resets_selections() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let u = &app.universities().await[0];
    app.post_json(&format!("/select-university/{}", u.id), Some(&cookie), "").await;

    app.post_form("/subscription", Some(&cookie), &[("package", "premium")]).await;
    let id = app.user_id(&username).await;
    let profile = UserRepository::new(app.db.clone()).profile(id).await.unwrap();
    assert_eq!(profile.subscription_package, SubscriptionPackage::Premium);
    assert_eq!(profile.application_count, 0);
    assert!(SelectionRepository::new(app.db.clone()).ids(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_university_pages() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.subscribed_student(SubscriptionPackage::Premium).await;
    let cput = app
        .universities()
        .await
        .into_iter()
        .find(|u| u.name.contains("CPUT"))
        .unwrap();

    let html = body_text(app.get(&format!("/university/{}", cput.id), Some(&cookie)).await).await;
    assert!(html.contains("Applied Sciences"));

    let html = body_text(app.get(&format!("/university/{}/faculties", cput.id), Some(&cookie)).await).await;
    assert!(html.contains("BSc Food Technology"));
    assert!(html.contains("Course advice is included"));

    let resp = app.get("/university/999999", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Documents and payments ───────────────────────────────────────────────────

#[tokio::test]
async fn test_payment_proof_upload_records_pending_payment() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let cput = app
        .universities()
        .await
        .into_iter()
        .find(|u| u.name.contains("CPUT"))
        .unwrap();

    let form = Multipart::new()
        .text("document_type", "payment_proof")
        .text("university_id", &cput.id.to_string())
        .file("file", "proof.pdf", "application/pdf", TINY_PDF)
        .finish();
    let resp = app.post_multipart("/documents/upload", &cookie, form).await;
    assert_eq!(location(&resp), "/dashboard/student");

    let id = app.user_id(&username).await;
    let docs = DocumentRepository::new(app.db.clone()).list_for_user(id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].university_id, Some(cput.id));
    assert!(app.media.path().join(&docs[0].file_path).exists());

    let payments = PaymentRepository::new(app.db.clone()).list_for_user(id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, i64::from(on_time_fee(&cput.application_fee)));
    assert_eq!(payments[0].status, PaymentStatus::Pending);

    let resp = app.get(&format!("/document/{}/file", docs[0].id), Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(body_text(resp).await.as_bytes(), TINY_PDF);
}

#[tokio::test]
async fn test_upload_rejects_bad_extension() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let form = Multipart::new()
        .text("document_type", "id_document")
        .file("file", "id.exe", "application/octet-stream", b"MZ")
        .finish();
    app.post_multipart("/documents/upload", &cookie, form).await;

    let html = body_text(app.get("/dashboard/student", Some(&cookie)).await).await;
    assert!(html.contains("Only PDF, JPG and PNG files are allowed."));
    let id = app.user_id(&username).await;
    assert!(DocumentRepository::new(app.db.clone()).list_for_user(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_documents_are_private() {
    let app = TestApp::spawn().await;
    let (owner, owner_cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let (_, other_cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let form = Multipart::new()
        .text("document_type", "id_document")
        .file("file", "id.pdf", "application/pdf", TINY_PDF)
        .finish();
    app.post_multipart("/documents/upload", &owner_cookie, form).await;
    let id = app.user_id(&owner).await;
    let doc = DocumentRepository::new(app.db.clone()).list_for_user(id).await.unwrap().remove(0);

    let resp = app.get(&format!("/document/{}/file", doc.id), Some(&other_cookie)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = app.post_form::<&str, &str>(&format!("/document/delete/{}", doc.id), Some(&other_cookie), &[]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    app.post_form::<&str, &str>(&format!("/document/delete/{}", doc.id), Some(&owner_cookie), &[]).await;
    assert!(DocumentRepository::new(app.db.clone()).find(doc.id).await.unwrap().is_none());
    assert!(!app.media.path().join(&doc.file_path).exists());
}

#[tokio::test]
async fn test_edit_document_type_and_file() {
    let app = TestApp::spawn().await;
    let (owner, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let (_, other_cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let form = Multipart::new()
        .text("document_type", "id_document")
        .file("file", "id.pdf", "application/pdf", TINY_PDF)
        .finish();
    app.post_multipart("/documents/upload", &cookie, form).await;
    let owner_id = app.user_id(&owner).await;
    let documents = DocumentRepository::new(app.db.clone());
    let original = documents.list_for_user(owner_id).await.unwrap().remove(0);
    documents.verify(original.id, None).await.unwrap().unwrap();
    let edit_path = format!("/document/edit/{}", original.id);

    // Type only: the stored file and the verification stay.
    let form = Multipart::new().text("document_type", "proof_of_residence").finish();
    let resp = app.post_multipart(&edit_path, &cookie, form).await;
    assert_eq!(location(&resp), "/dashboard/student");
    let doc = documents.find(original.id).await.unwrap().unwrap();
    assert_eq!(doc.document_type, DocumentType::ProofOfResidence);
    assert_eq!(doc.file_path, original.file_path);
    assert!(doc.verified);

    // New file: stored again, old file removed, verification reset.
    let form = Multipart::new()
        .file("file", "residence.png", "image/png", b"\x89PNG\r\n")
        .finish();
    app.post_multipart(&edit_path, &cookie, form).await;
    let doc = documents.find(original.id).await.unwrap().unwrap();
    assert_ne!(doc.file_path, original.file_path);
    assert!(doc.file_path.starts_with(&format!("documents/{owner_id}/proof_of_residence/")));
    assert_eq!(doc.original_name, "residence.png");
    assert!(!doc.verified);
    assert!(doc.verification_date.is_none());
    assert!(app.media.path().join(&doc.file_path).exists());
    assert!(!app.media.path().join(&original.file_path).exists());

    let html = body_text(app.get("/dashboard/student", Some(&cookie)).await).await;
    assert!(html.contains("Document updated successfully!"));

    // Bad type is flashed and nothing changes.
    let form = Multipart::new().text("document_type", "passport").finish();
    app.post_multipart(&edit_path, &cookie, form).await;
    assert_eq!(documents.find(original.id).await.unwrap().unwrap().document_type, DocumentType::ProofOfResidence);
    let html = body_text(app.get("/dashboard/student", Some(&cookie)).await).await;
    assert!(html.contains("Select a valid choice."));

    // Someone else's document does not exist for them.
    let form = Multipart::new().text("document_type", "id_document").finish();
    let resp = app.post_multipart(&edit_path, &other_cookie, form).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(documents.find(original.id).await.unwrap().unwrap().document_type, DocumentType::ProofOfResidence);
}

#[tokio::test]
async fn test_single_fee_instructions() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let unis = app.universities().await;
    let cput = unis.iter().find(|u| u.name.contains("CPUT")).unwrap();
    let free = unis.iter().find(|u| u.application_fee == "FREE").unwrap();

    let resp = app.get(&format!("/pay/{}", cput.id), Some(&cookie)).await;
    assert_eq!(location(&resp), format!("/pay/{}/instructions", cput.id));

    let id = app.user_id(&username).await;
    let html = body_text(app.get(&format!("/pay/{}/instructions", cput.id), Some(&cookie)).await).await;
    assert!(html.contains(&format!("VP{}U{}", id, cput.id)));
    assert!(html.contains("R100"));

    let resp = app.get(&format!("/pay/{}/instructions", free.id), Some(&cookie)).await;
    assert_eq!(location(&resp), "/universities");
}

#[tokio::test]
async fn test_pay_all_includes_package() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;

    let resp = app.get("/pay/all", Some(&cookie)).await;
    assert_eq!(location(&resp), "/universities");

    let cput = app
        .universities()
        .await
        .into_iter()
        .find(|u| u.name.contains("CPUT"))
        .unwrap();
    app.post_json(&format!("/select-university/{}", cput.id), Some(&cookie), "").await;

    let id = app.user_id(&username).await;
    let html = body_text(app.get("/pay/all", Some(&cookie)).await).await;
    assert!(html.contains(&format!("VPPKG{}-U{}", id, cput.id)));
    assert!(html.contains("R500"));
}

// ── Staff ────────────────────────────────────────────────────────────────────

async fn staff_cookie(app: &TestApp) -> String {
    let username = unique_username("staff");
    let hash = hash_password(STRONG_PASSWORD).unwrap();
    UserRepository::new(app.db.clone()).create(&username, "", &hash, true).await.unwrap();
    let resp = app
        .post_form(
            "/accounts/login",
            None,
            &[("username", username.as_str()), ("password", STRONG_PASSWORD)],
        )
        .await;
    session_cookie(&resp).unwrap()
}

#[tokio::test]
async fn test_staff_pages_are_forbidden_to_students() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    for path in ["/staff/documents", "/staff/payments", "/staff/applications"] {
        let resp = app.get(path, Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn test_staff_verifies_payment() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let cput = app
        .universities()
        .await
        .into_iter()
        .find(|u| u.name.contains("CPUT"))
        .unwrap();
    app.post_json(&format!("/select-university/{}", cput.id), Some(&cookie), "").await;
    let form = Multipart::new()
        .text("document_type", "payment_proof")
        .text("university_id", &cput.id.to_string())
        .file("file", "proof.png", "image/png", b"\x89PNG\r\n")
        .finish();
    app.post_multipart("/documents/upload", &cookie, form).await;

    let staff = staff_cookie(&app).await;
    let html = body_text(app.get("/staff/payments?status=pending", Some(&staff)).await).await;
    assert!(html.contains(&username));

    let student_id = app.user_id(&username).await;
    let payments = PaymentRepository::new(app.db.clone());
    let payment = payments.list_for_user(student_id).await.unwrap().remove(0);

    let resp = app
        .post_form(&format!("/staff/payments/{}/verify", payment.id), Some(&staff), &[("action", "verify")])
        .await;
    assert_eq!(location(&resp), "/staff/payments");

    let payment = payments.find(payment.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Verified);
    let doc = DocumentRepository::new(app.db.clone())
        .find(payment.document_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(doc.verified);

    // Staff can also open the proof.
    let resp = app.get(&format!("/document/{}/file", doc.id), Some(&staff)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_staff_verifies_payment_proof_document() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let cput = app
        .universities()
        .await
        .into_iter()
        .find(|u| u.name.contains("CPUT"))
        .unwrap();
    app.post_json(&format!("/select-university/{}", cput.id), Some(&cookie), "").await;
    let form = Multipart::new()
        .text("document_type", "payment_proof")
        .text("university_id", &cput.id.to_string())
        .file("file", "proof.pdf", "application/pdf", TINY_PDF)
        .finish();
    app.post_multipart("/documents/upload", &cookie, form).await;

    let student_id = app.user_id(&username).await;
    let documents = DocumentRepository::new(app.db.clone());
    let doc = documents.list_for_user(student_id).await.unwrap().remove(0);
    let verify_path = format!("/staff/documents/{}/verify", doc.id);

    // Students cannot verify their own uploads.
    let resp = app.post_form(&verify_path, Some(&cookie), &[("notes", "")]).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(!documents.find(doc.id).await.unwrap().unwrap().verified);

    let staff = staff_cookie(&app).await;
    let html = body_text(app.get("/staff/documents", Some(&staff)).await).await;
    assert!(html.contains(&username));

    let resp = app.post_form(&verify_path, Some(&staff), &[("notes", " Bank stamp matches ")]).await;
    assert_eq!(location(&resp), "/staff/documents");

    let doc = documents.find(doc.id).await.unwrap().unwrap();
    assert!(doc.verified);
    assert_eq!(doc.notes.as_deref(), Some("Bank stamp matches"));

    let apps = ApplicationRepository::new(app.db.clone()).list_for_user(student_id).await.unwrap();
    let cput_app = apps.iter().find(|a| a.application.university_id == cput.id).unwrap();
    assert!(cput_app.application.payment_verified);

    let payment = PaymentRepository::new(app.db.clone()).list_for_user(student_id).await.unwrap().remove(0);
    assert_eq!(payment.status, PaymentStatus::Verified);

    let html = body_text(app.get("/staff/documents", Some(&staff)).await).await;
    assert!(html.contains("marked as verified."));

    let resp = app.post_form(&format!("/staff/documents/{}/verify", doc.id + 1000), Some(&staff), &[("notes", "")]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_updates_application_status() {
    let app = TestApp::spawn().await;
    let (username, cookie) = app.subscribed_student(SubscriptionPackage::Basic).await;
    let u = &app.universities().await[0];
    app.post_json(&format!("/select-university/{}", u.id), Some(&cookie), "").await;

    let staff = staff_cookie(&app).await;
    let html = body_text(app.get("/staff/applications", Some(&staff)).await).await;
    assert!(html.contains(&username));

    let student_id = app.user_id(&username).await;
    let apps = ApplicationRepository::new(app.db.clone());
    let app_row = apps.list_for_user(student_id).await.unwrap().remove(0);

    app.post_form(
        &format!("/staff/applications/{}", app_row.application.id),
        Some(&staff),
        &[("status", "submitted"), ("tracking_number", "CAO-1234")],
    )
    .await;
    let updated = apps.find(app_row.application.id).await.unwrap().unwrap();
    assert_eq!(updated.status.as_str(), "submitted");
    assert_eq!(updated.tracking_number.as_deref(), Some("CAO-1234"));
}
